//! Quality gate value object.

use indexmap::IndexMap;
use tracing::debug;

use crate::gate::condition::Condition;

/// Immutable named set of conditions, unique by metric.
///
/// Conditions keep their registration order. When two conditions target the
/// same metric the first one registered is kept and later ones are dropped.
#[derive(Debug, Clone)]
pub struct QualityGate {
    id: i64,
    name: String,
    conditions: IndexMap<String, Condition>,
}

impl QualityGate {
    /// Build a gate from `conditions`, collapsing duplicates by metric key.
    pub fn new(id: i64, name: impl Into<String>, conditions: impl IntoIterator<Item = Condition>) -> Self {
        let name = name.into();
        let mut by_metric: IndexMap<String, Condition> = IndexMap::new();

        for condition in conditions {
            let key = condition.metric_key().to_string();
            if by_metric.contains_key(&key) {
                debug!(gate = %name, metric = %key, "Dropping duplicate condition");
                continue;
            }
            by_metric.insert(key, condition);
        }

        Self {
            id,
            name,
            conditions: by_metric,
        }
    }

    /// Database identifier.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Conditions in registration order.
    pub fn conditions(&self) -> impl ExactSizeIterator<Item = &Condition> {
        self.conditions.values()
    }

    /// Condition on `metric_key`, if any.
    pub fn condition(&self, metric_key: &str) -> Option<&Condition> {
        self.conditions.get(metric_key)
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Whether the gate has no condition.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

/// Gates are equal when every condition matches on metric, operator and
/// threshold, in the same order.
impl PartialEq for QualityGate {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.conditions.len() == other.conditions.len()
            && self
                .conditions
                .values()
                .zip(other.conditions.values())
                .all(|(a, b)| a.same_definition(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::condition::Operator;
    use crate::gate::metric::{Metric, MetricType};
    use std::sync::Arc;

    fn metric(id: i64, key: &str) -> Arc<Metric> {
        Arc::new(Metric::new(id, key, key, MetricType::Int))
    }

    #[test]
    fn test_same_metric_collapses_to_first_condition() {
        let bugs = metric(1, "bugs");
        let gate = QualityGate::new(
            7,
            "Sonar way",
            vec![
                Condition::new(Arc::clone(&bugs), Operator::GreaterThan, "0"),
                Condition::new(metric(2, "coverage"), Operator::LessThan, "80"),
                Condition::new(bugs, Operator::LessThan, "5"),
            ],
        );

        assert_eq!(gate.len(), 2);
        let kept = gate.condition("bugs").expect("bugs condition");
        assert_eq!(kept.operator(), Operator::GreaterThan);
        assert_eq!(kept.error_threshold(), "0");
    }

    #[test]
    fn test_conditions_keep_registration_order() {
        let gate = QualityGate::new(
            1,
            "ordered",
            vec![
                Condition::new(metric(3, "new_coverage"), Operator::LessThan, "80"),
                Condition::new(metric(1, "bugs"), Operator::GreaterThan, "0"),
                Condition::new(metric(2, "code_smells"), Operator::GreaterThan, "10"),
            ],
        );

        let keys: Vec<_> = gate.conditions().map(Condition::metric_key).collect();
        assert_eq!(keys, vec!["new_coverage", "bugs", "code_smells"]);
    }

    #[test]
    fn test_equality_compares_whole_conditions() {
        let bugs = metric(1, "bugs");
        let gate = |operator, threshold: &str| {
            QualityGate::new(1, "gate", vec![Condition::new(Arc::clone(&bugs), operator, threshold)])
        };

        assert_eq!(gate(Operator::GreaterThan, "0"), gate(Operator::GreaterThan, "0"));
        assert_ne!(gate(Operator::GreaterThan, "0"), gate(Operator::GreaterThan, "5"));
        assert_ne!(gate(Operator::GreaterThan, "0"), gate(Operator::LessThan, "0"));
    }

    #[test]
    fn test_empty_gate() {
        let gate = QualityGate::new(1, "empty", Vec::new());
        assert!(gate.is_empty());
        assert_eq!(gate.name(), "empty");
        assert_eq!(gate.id(), 1);
    }
}
