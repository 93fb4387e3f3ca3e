//! Quality gate conditions.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::errors::{QualgateError, Result};
use crate::gate::metric::Metric;

/// Metrics whose key starts with this prefix are evaluated on their variation
/// against the new-code period.
pub const NEW_CODE_METRIC_PREFIX: &str = "new_";

/// Comparison applied between a measure and a condition threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    /// Fails when the measure is strictly greater than the threshold
    GreaterThan,
    /// Fails when the measure is strictly lower than the threshold
    LessThan,
}

impl Operator {
    /// Database code of the operator.
    pub fn code(&self) -> &'static str {
        match self {
            Operator::GreaterThan => "GT",
            Operator::LessThan => "LT",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Operator {
    type Err = QualgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "GT" => Ok(Operator::GreaterThan),
            "LT" => Ok(Operator::LessThan),
            other => Err(QualgateError::configuration(format!(
                "Unsupported condition operator '{other}'"
            ))),
        }
    }
}

/// One threshold check on one metric.
///
/// Two conditions on the same metric are the same condition: equality and
/// hashing only look at the metric key, whatever the operator or threshold.
#[derive(Debug, Clone)]
pub struct Condition {
    metric: Arc<Metric>,
    operator: Operator,
    error_threshold: String,
    use_variation: bool,
}

impl Condition {
    /// Create a condition. `use_variation` is derived from the metric key.
    pub fn new(metric: Arc<Metric>, operator: Operator, error_threshold: impl Into<String>) -> Self {
        let use_variation = metric.key.starts_with(NEW_CODE_METRIC_PREFIX);
        Self {
            metric,
            operator,
            error_threshold: error_threshold.into(),
            use_variation,
        }
    }

    /// Create a condition from a stored operator code.
    pub fn from_code(metric: Arc<Metric>, operator_code: &str, error_threshold: impl Into<String>) -> Result<Self> {
        let operator = operator_code.parse::<Operator>().map_err(|_| {
            QualgateError::configuration_for_metric(
                format!(
                    "Unsupported condition operator '{operator_code}' on metric {}",
                    metric.key
                ),
                metric.key.clone(),
            )
        })?;
        Ok(Self::new(metric, operator, error_threshold))
    }

    /// Tested metric.
    pub fn metric(&self) -> &Arc<Metric> {
        &self.metric
    }

    /// Key of the tested metric.
    pub fn metric_key(&self) -> &str {
        &self.metric.key
    }

    /// Comparison applied to the measure.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Raw threshold, parsed at evaluation time.
    pub fn error_threshold(&self) -> &str {
        &self.error_threshold
    }

    /// Whether the measure variation is compared instead of its value.
    pub fn use_variation(&self) -> bool {
        self.use_variation
    }

    /// Whether both conditions test the same metric the same way.
    pub fn same_definition(&self, other: &Condition) -> bool {
        self == other && self.operator == other.operator && self.error_threshold == other.error_threshold
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.metric.key == other.metric.key
    }
}

impl Eq for Condition {}

impl Hash for Condition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.metric.key.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::metric::MetricType;
    use std::collections::HashSet;

    fn metric(key: &str) -> Arc<Metric> {
        Arc::new(Metric::new(1, key, key, MetricType::Int))
    }

    #[test]
    fn variation_is_derived_from_new_code_prefix() {
        assert!(Condition::new(metric("new_bugs"), Operator::GreaterThan, "0").use_variation());
        assert!(!Condition::new(metric("bugs"), Operator::GreaterThan, "0").use_variation());
        assert!(!Condition::new(metric("renew_count"), Operator::GreaterThan, "0").use_variation());
    }

    #[test]
    fn conditions_on_same_metric_are_equal() {
        let first = Condition::new(metric("coverage"), Operator::LessThan, "80");
        let second = Condition::new(metric("coverage"), Operator::GreaterThan, "10");
        assert_eq!(first, second);

        let set: HashSet<_> = [first, second].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn operator_codes_parse() {
        assert_eq!("GT".parse::<Operator>().unwrap(), Operator::GreaterThan);
        assert_eq!("LT".parse::<Operator>().unwrap(), Operator::LessThan);
        assert_eq!(Operator::LessThan.to_string(), "LT");
    }

    #[test]
    fn retired_operator_codes_are_configuration_errors() {
        for code in ["EQ", "NE", "gt", ""] {
            let err = Condition::from_code(metric("bugs"), code, "0").unwrap_err();
            assert!(err.is_configuration(), "{code} should be rejected");
        }
    }
}
