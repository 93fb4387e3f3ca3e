//! Whole-gate evaluation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::errors::Result;
use crate::gate::condition::{Condition, Operator};
use crate::gate::evaluator::{ComparableValue, ConditionEvaluator};
use crate::gate::measure::{Level, Measure, MeasureLookup};
use crate::gate::quality_gate::QualityGate;

/// Result of one condition within an evaluated gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedCondition {
    /// Metric key
    pub metric_key: String,
    /// Comparison operator
    pub operator: Operator,
    /// Raw error threshold
    pub error_threshold: String,
    /// Verdict
    pub level: Level,
    /// Compared value, absent when the measure had no value
    pub value: Option<ComparableValue>,
}

/// Verdict of a whole gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedQualityGate {
    /// Gate id
    pub gate_id: i64,
    /// Gate name
    pub gate_name: String,
    /// Worst condition level, `OK` for a gate without conditions
    pub level: Level,
    /// Per-condition results in gate order
    pub conditions: Vec<EvaluatedCondition>,
}

impl EvaluatedQualityGate {
    /// Conditions that failed.
    pub fn failed_conditions(&self) -> impl Iterator<Item = &EvaluatedCondition> {
        self.conditions.iter().filter(|c| c.level == Level::Error)
    }
}

/// Evaluates every condition of a gate against a set of measures.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityGateEvaluator {
    evaluator: ConditionEvaluator,
}

impl QualityGateEvaluator {
    /// Create a gate evaluator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate `gate`. A missing measure counts as a measure without value;
    /// the first condition that fails to evaluate aborts the whole gate.
    pub fn evaluate(&self, gate: &QualityGate, measures: &dyn MeasureLookup) -> Result<EvaluatedQualityGate> {
        let mut evaluated = Vec::with_capacity(gate.len());

        for condition in gate.conditions() {
            let measure = measures
                .measure(condition.metric_key())?
                .unwrap_or_else(Measure::no_value);
            let result = self.evaluator.evaluate(condition, &measure)?;
            evaluated.push(evaluated_condition(condition, result.level, result.value));
        }

        let level = evaluated
            .iter()
            .map(|c| c.level)
            .max()
            .unwrap_or(Level::Ok);

        debug!(
            gate = gate.name(),
            level = %level,
            conditions = evaluated.len(),
            "Evaluated quality gate"
        );

        Ok(EvaluatedQualityGate {
            gate_id: gate.id(),
            gate_name: gate.name().to_string(),
            level,
            conditions: evaluated,
        })
    }
}

fn evaluated_condition(condition: &Condition, level: Level, value: Option<ComparableValue>) -> EvaluatedCondition {
    EvaluatedCondition {
        metric_key: condition.metric_key().to_string(),
        operator: condition.operator(),
        error_threshold: condition.error_threshold().to_string(),
        level,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::metric::{Metric, MetricType};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn condition(id: i64, key: &str, metric_type: MetricType, operator: Operator, threshold: &str) -> Condition {
        Condition::new(Arc::new(Metric::new(id, key, key, metric_type)), operator, threshold)
    }

    #[test]
    fn test_gate_level_is_worst_condition() {
        let gate = QualityGate::new(
            1,
            "default",
            vec![
                condition(1, "coverage", MetricType::Percent, Operator::LessThan, "80"),
                condition(2, "bugs", MetricType::Int, Operator::GreaterThan, "0"),
            ],
        );
        let mut measures = HashMap::new();
        measures.insert("coverage".to_string(), Measure::double(91.0));
        measures.insert("bugs".to_string(), Measure::int(3));

        let evaluated = QualityGateEvaluator::new().evaluate(&gate, &measures).unwrap();

        assert_eq!(evaluated.level, Level::Error);
        let failed: Vec<_> = evaluated.failed_conditions().map(|c| c.metric_key.as_str()).collect();
        assert_eq!(failed, vec!["bugs"]);
    }

    #[test]
    fn test_missing_measures_pass() {
        let gate = QualityGate::new(
            1,
            "default",
            vec![condition(2, "bugs", MetricType::Int, Operator::GreaterThan, "0")],
        );

        let evaluated = QualityGateEvaluator::new()
            .evaluate(&gate, &HashMap::<String, Measure>::new())
            .unwrap();

        assert_eq!(evaluated.level, Level::Ok);
        assert_eq!(evaluated.conditions[0].value, None);
    }

    #[test]
    fn test_empty_gate_is_ok() {
        let gate = QualityGate::new(3, "empty", Vec::new());

        let evaluated = QualityGateEvaluator::new()
            .evaluate(&gate, &HashMap::<String, Measure>::new())
            .unwrap();

        assert_eq!(evaluated.level, Level::Ok);
        assert!(evaluated.conditions.is_empty());
    }

    #[test]
    fn test_configuration_error_aborts_gate() {
        let gate = QualityGate::new(
            1,
            "broken",
            vec![condition(9, "ncloc_data", MetricType::Data, Operator::GreaterThan, "0")],
        );
        let mut measures = HashMap::new();
        measures.insert("ncloc_data".to_string(), Measure::int(1));

        let err = QualityGateEvaluator::new().evaluate(&gate, &measures).unwrap_err();

        assert!(err.is_configuration());
    }
}
