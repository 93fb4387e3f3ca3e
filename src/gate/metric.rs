//! Metric definitions and the metric repository.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::errors::{QualgateError, Result};
use crate::core::snapshot::Snapshot;

/// Kind of value a metric produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    /// 32-bit integer
    Int,
    /// Floating point number
    Float,
    /// Floating point percentage
    Percent,
    /// Boolean flag
    Bool,
    /// Free text
    String,
    /// Duration in milliseconds
    Millisec,
    /// Opaque data blob
    Data,
    /// Quality level (OK, WARN, ERROR)
    Level,
    /// Distribution blob
    Distrib,
    /// Rating stored as an integer (1 = A .. 5 = E)
    Rating,
    /// Technical debt duration in minutes
    WorkDur,
}

/// Native comparable representation of a metric's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// Double precision float
    Double,
    /// Level name
    Level,
}

impl MetricType {
    /// Every metric type, in declaration order.
    pub const ALL: [MetricType; 11] = [
        MetricType::Int,
        MetricType::Float,
        MetricType::Percent,
        MetricType::Bool,
        MetricType::String,
        MetricType::Millisec,
        MetricType::Data,
        MetricType::Level,
        MetricType::Distrib,
        MetricType::Rating,
        MetricType::WorkDur,
    ];

    /// Database code of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Int => "INT",
            MetricType::Float => "FLOAT",
            MetricType::Percent => "PERCENT",
            MetricType::Bool => "BOOL",
            MetricType::String => "STRING",
            MetricType::Millisec => "MILLISEC",
            MetricType::Data => "DATA",
            MetricType::Level => "LEVEL",
            MetricType::Distrib => "DISTRIB",
            MetricType::Rating => "RATING",
            MetricType::WorkDur => "WORK_DUR",
        }
    }

    /// Comparable value type, `None` for types conditions cannot use.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            MetricType::Int | MetricType::Rating => Some(ValueType::Int),
            MetricType::Millisec | MetricType::WorkDur => Some(ValueType::Long),
            MetricType::Float | MetricType::Percent => Some(ValueType::Double),
            MetricType::Level => Some(ValueType::Level),
            MetricType::Bool | MetricType::String | MetricType::Data | MetricType::Distrib => None,
        }
    }

    /// Whether quality gate conditions may target this type.
    pub fn supports_conditions(&self) -> bool {
        self.value_type().is_some()
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = QualgateError;

    fn from_str(s: &str) -> Result<Self> {
        MetricType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| QualgateError::configuration(format!("Unknown metric type '{s}'")))
    }
}

/// A measurable quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Database identifier
    pub id: i64,
    /// Unique key, e.g. `coverage` or `new_bugs`
    pub key: String,
    /// Display name
    pub name: String,
    /// Value type
    pub metric_type: MetricType,
}

impl Metric {
    /// Create a metric definition.
    pub fn new(id: i64, key: impl Into<String>, name: impl Into<String>, metric_type: MetricType) -> Self {
        Self {
            id,
            key: key.into(),
            name: name.into(),
            metric_type,
        }
    }
}

/// Lookup of metric definitions.
///
/// Lookups return `Ok(None)` for metrics that no longer exist; callers decide
/// whether a stale reference matters.
pub trait MetricRepository: Send + Sync {
    /// Find a metric by database id.
    fn find_by_id(&self, id: i64) -> Result<Option<Arc<Metric>>>;

    /// Find a metric by key.
    fn find_by_key(&self, key: &str) -> Result<Option<Arc<Metric>>>;
}

/// Immutable set of metrics indexed by key and id.
#[derive(Debug, Default)]
pub struct MetricCatalog {
    by_key: IndexMap<String, Arc<Metric>>,
    key_by_id: HashMap<i64, String>,
}

impl MetricCatalog {
    /// Build a catalog; a later metric with an already seen key replaces it.
    pub fn new(metrics: impl IntoIterator<Item = Metric>) -> Self {
        let mut catalog = Self::default();
        for metric in metrics {
            catalog.key_by_id.insert(metric.id, metric.key.clone());
            catalog.by_key.insert(metric.key.clone(), Arc::new(metric));
        }
        catalog
    }

    /// Number of metrics.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Metrics in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Metric>> {
        self.by_key.values()
    }
}

/// In-memory [`MetricRepository`] serving reads from a refreshable snapshot.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    snapshot: Snapshot<MetricCatalog>,
}

impl MetricRegistry {
    /// Create a registry holding `metrics`.
    pub fn new(metrics: impl IntoIterator<Item = Metric>) -> Self {
        Self {
            snapshot: Snapshot::new(MetricCatalog::new(metrics)),
        }
    }

    /// Replace every metric at once.
    pub fn replace_all(&self, metrics: impl IntoIterator<Item = Metric>) {
        self.snapshot.replace(MetricCatalog::new(metrics));
    }

    /// Current catalog.
    pub fn catalog(&self) -> Arc<MetricCatalog> {
        self.snapshot.load()
    }
}

impl MetricRepository for MetricRegistry {
    fn find_by_id(&self, id: i64) -> Result<Option<Arc<Metric>>> {
        let catalog = self.snapshot.load();
        Ok(catalog
            .key_by_id
            .get(&id)
            .and_then(|key| catalog.by_key.get(key))
            .cloned())
    }

    fn find_by_key(&self, key: &str) -> Result<Option<Arc<Metric>>> {
        Ok(self.snapshot.load().by_key.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_type_codes_round_trip() {
        for metric_type in MetricType::ALL {
            let parsed: MetricType = metric_type.as_str().parse().expect("known code");
            assert_eq!(parsed, metric_type);
        }
        assert!("BIGINT".parse::<MetricType>().is_err());
    }

    #[test]
    fn only_comparable_types_support_conditions() {
        let supported: Vec<_> = MetricType::ALL
            .into_iter()
            .filter(MetricType::supports_conditions)
            .collect();
        assert_eq!(
            supported,
            vec![
                MetricType::Int,
                MetricType::Float,
                MetricType::Percent,
                MetricType::Millisec,
                MetricType::Level,
                MetricType::Rating,
                MetricType::WorkDur,
            ]
        );
    }

    #[test]
    fn registry_serves_lookups_by_id_and_key() {
        let registry = MetricRegistry::new(vec![
            Metric::new(1, "coverage", "Coverage", MetricType::Percent),
            Metric::new(2, "new_bugs", "New Bugs", MetricType::Int),
        ]);

        let by_id = registry.find_by_id(2).unwrap().expect("metric 2");
        assert_eq!(by_id.key, "new_bugs");
        let by_key = registry.find_by_key("coverage").unwrap().expect("coverage");
        assert_eq!(by_key.id, 1);
        assert!(registry.find_by_id(99).unwrap().is_none());
    }

    #[test]
    fn registry_replace_drops_removed_metrics() {
        let registry = MetricRegistry::new(vec![Metric::new(1, "coverage", "Coverage", MetricType::Percent)]);
        registry.replace_all(vec![Metric::new(3, "bugs", "Bugs", MetricType::Int)]);

        assert!(registry.find_by_key("coverage").unwrap().is_none());
        assert!(registry.find_by_id(1).unwrap().is_none());
        assert_eq!(registry.catalog().len(), 1);
    }
}
