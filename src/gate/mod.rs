//! Quality gates: metrics, measures, conditions and their evaluation.
//!
//! A [`QualityGate`] is rebuilt for every evaluation pass by the
//! [`QualityGateService`] and never mutated afterwards, so it can be shared
//! freely between evaluation threads.

pub mod condition;
pub mod evaluator;
pub mod gate_evaluator;
pub mod measure;
pub mod metric;
pub mod quality_gate;
pub mod repository;
pub mod service;

pub use condition::{Condition, Operator, NEW_CODE_METRIC_PREFIX};
pub use evaluator::{ComparableValue, ConditionEvaluator, EvaluationResult};
pub use gate_evaluator::{EvaluatedCondition, EvaluatedQualityGate, QualityGateEvaluator};
pub use measure::{Level, Measure, MeasureLookup, MeasureValue};
pub use metric::{Metric, MetricRegistry, MetricRepository, MetricType, ValueType};
pub use quality_gate::QualityGate;
pub use repository::{
    ConditionRow, GateBindingLookup, InMemoryGateStore, QualityGateDao, QualityGateRow,
    QualityGateSession,
};
pub use service::{QualityGateService, QualityGateServiceImpl, MISSING_DEFAULT_GATE};
