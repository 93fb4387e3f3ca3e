//! Condition evaluation.
//!
//! [`ConditionEvaluator`] compares one measure with one condition threshold.
//! It is a pure function of its inputs: no I/O, no shared state, safe to call
//! from any number of threads against the same immutable gate.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::{QualgateError, Result};
use crate::gate::condition::{Condition, Operator};
use crate::gate::measure::{Level, Measure, MeasureValue};
use crate::gate::metric::ValueType;

/// Value a condition compares, tagged with its native type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComparableValue {
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Double precision float
    Double(f64),
    /// Level name
    Level(String),
}

impl ComparableValue {
    /// Natural ordering of two values.
    ///
    /// Numbers promote `Int` to `Long` to `Double`; doubles use IEEE total
    /// ordering. Level names compare as strings. A level never compares with a
    /// number and yields `None`.
    pub fn compare(&self, other: &ComparableValue) -> Option<Ordering> {
        use ComparableValue::*;

        match (self, other) {
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Int(a), Long(b)) => Some(i64::from(*a).cmp(b)),
            (Long(a), Int(b)) => Some(a.cmp(&i64::from(*b))),
            (Long(a), Long(b)) => Some(a.cmp(b)),
            (Level(a), Level(b)) => Some(a.cmp(b)),
            (Level(_), _) | (_, Level(_)) => None,
            (a, b) => Some(a.as_f64()?.total_cmp(&b.as_f64()?)),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            ComparableValue::Int(v) => Some(f64::from(*v)),
            ComparableValue::Long(v) => Some(*v as f64),
            ComparableValue::Double(v) => Some(*v),
            ComparableValue::Level(_) => None,
        }
    }
}

impl fmt::Display for ComparableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparableValue::Int(v) => write!(f, "{v}"),
            ComparableValue::Long(v) => write!(f, "{v}"),
            ComparableValue::Double(v) => write!(f, "{v}"),
            ComparableValue::Level(v) => f.write_str(v),
        }
    }
}

/// Outcome of evaluating one condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Verdict
    pub level: Level,
    /// Compared measure value, `None` only when the measure had no value
    pub value: Option<ComparableValue>,
}

impl EvaluationResult {
    /// Create a result.
    pub fn new(level: Level, value: Option<ComparableValue>) -> Self {
        Self { level, value }
    }

    /// Passing result for a measure without value.
    pub fn no_value() -> Self {
        Self::new(Level::Ok, None)
    }
}

/// Evaluates conditions against measures.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Create an evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate `condition` against `measure`.
    ///
    /// Fails with a configuration error when the metric type cannot carry
    /// conditions, when variation is requested on a level metric, or when the
    /// threshold does not parse for the metric type.
    pub fn evaluate(&self, condition: &Condition, measure: &Measure) -> Result<EvaluationResult> {
        let value_type = supported_value_type(condition)?;

        let Some(value) = measure_value(condition, value_type, measure)? else {
            return Ok(EvaluationResult::no_value());
        };

        let threshold = parse_threshold(condition, value_type)?;
        let ordering = value.compare(&threshold).ok_or_else(|| {
            QualgateError::configuration_for_metric(
                format!(
                    "Value {value} of metric {} cannot be compared with threshold '{}'",
                    condition.metric().name,
                    condition.error_threshold()
                ),
                condition.metric_key(),
            )
        })?;

        let triggered = match condition.operator() {
            Operator::GreaterThan => ordering == Ordering::Greater,
            Operator::LessThan => ordering == Ordering::Less,
        };

        let level = if triggered { Level::Error } else { Level::Ok };
        Ok(EvaluationResult::new(level, Some(value)))
    }
}

fn supported_value_type(condition: &Condition) -> Result<ValueType> {
    let metric = condition.metric();
    metric.metric_type.value_type().ok_or_else(|| {
        QualgateError::configuration_for_metric(
            format!("Conditions on MetricType {} are not supported", metric.metric_type),
            metric.key.clone(),
        )
    })
}

fn measure_value(
    condition: &Condition,
    value_type: ValueType,
    measure: &Measure,
) -> Result<Option<ComparableValue>> {
    if condition.use_variation() {
        return variation_value(condition, value_type, measure);
    }

    let value = match measure.value() {
        MeasureValue::NoValue => return Ok(None),
        MeasureValue::Int(v) => ComparableValue::Int(*v),
        MeasureValue::Long(v) => ComparableValue::Long(*v),
        MeasureValue::Double(v) => ComparableValue::Double(*v),
        MeasureValue::Level(level) => ComparableValue::Level(level.as_str().to_string()),
        MeasureValue::String(_) => {
            return Err(QualgateError::configuration_for_metric(
                format!(
                    "Measure of metric {} holds a string and cannot be compared",
                    condition.metric().name
                ),
                condition.metric_key(),
            ))
        }
    };
    Ok(Some(value))
}

fn variation_value(
    condition: &Condition,
    value_type: ValueType,
    measure: &Measure,
) -> Result<Option<ComparableValue>> {
    let variation = measure.variation();

    // Float to int casts saturate and truncate toward zero.
    let value = match value_type {
        ValueType::Int => variation.map(|v| ComparableValue::Int(v as i32)),
        ValueType::Long => variation.map(|v| ComparableValue::Long(v as i64)),
        ValueType::Double => variation.map(ComparableValue::Double),
        ValueType::Level => {
            return Err(QualgateError::configuration_for_metric(
                format!(
                    "Variation cannot be evaluated on level metric {}",
                    condition.metric().name
                ),
                condition.metric_key(),
            ))
        }
    };
    Ok(value)
}

fn parse_threshold(condition: &Condition, value_type: ValueType) -> Result<ComparableValue> {
    let raw = condition.error_threshold();
    let parsed = match value_type {
        // Thresholds stored with decimals on integer metrics are truncated.
        ValueType::Int => truncate_decimals(raw).parse::<i32>().ok().map(ComparableValue::Int),
        ValueType::Long => raw.parse::<i64>().ok().map(ComparableValue::Long),
        ValueType::Double => raw.trim().parse::<f64>().ok().map(ComparableValue::Double),
        ValueType::Level => Some(ComparableValue::Level(raw.to_string())),
    };

    parsed.ok_or_else(|| {
        QualgateError::configuration_for_metric(
            format!(
                "Quality Gate: Unable to parse value '{raw}' to compare against {}",
                condition.metric().name
            ),
            condition.metric_key(),
        )
    })
}

fn truncate_decimals(raw: &str) -> &str {
    raw.split_once('.').map_or(raw, |(integral, _)| integral)
}

#[cfg(test)]
#[path = "evaluator_tests.rs"]
mod tests;
