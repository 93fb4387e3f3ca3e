//! Measures, quality levels and measure lookup.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::errors::{QualgateError, Result};

/// Quality level of a condition or a whole gate.
///
/// `Warn` is kept so stored levels and serialized results written by older
/// evaluators still parse; current evaluation never produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Level {
    /// Passed
    Ok,
    /// Legacy warning level
    Warn,
    /// Failed
    Error,
}

impl Level {
    /// Level name as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Ok => "OK",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = QualgateError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OK" => Ok(Level::Ok),
            "WARN" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            other => Err(QualgateError::configuration(format!("Unknown level '{other}'"))),
        }
    }
}

/// Value carried by a measure, tagged with its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasureValue {
    /// No value was computed
    NoValue,
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Floating point number
    Double(f64),
    /// Quality level
    Level(Level),
    /// Text (not comparable by conditions)
    String(String),
}

/// Computed value of one metric on one analyzed entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    value: MeasureValue,
    variation: Option<f64>,
}

impl Measure {
    /// Measure with the given value and no variation.
    pub fn new(value: MeasureValue) -> Self {
        Self {
            value,
            variation: None,
        }
    }

    /// Measure without a value.
    pub fn no_value() -> Self {
        Self::new(MeasureValue::NoValue)
    }

    /// Integer measure.
    pub fn int(value: i32) -> Self {
        Self::new(MeasureValue::Int(value))
    }

    /// Long measure.
    pub fn long(value: i64) -> Self {
        Self::new(MeasureValue::Long(value))
    }

    /// Double measure.
    pub fn double(value: f64) -> Self {
        Self::new(MeasureValue::Double(value))
    }

    /// Level measure.
    pub fn level(value: Level) -> Self {
        Self::new(MeasureValue::Level(value))
    }

    /// Attach the variation against the comparison period.
    pub fn with_variation(mut self, variation: f64) -> Self {
        self.variation = Some(variation);
        self
    }

    /// Tagged value.
    pub fn value(&self) -> &MeasureValue {
        &self.value
    }

    /// Variation against the comparison period, if computed.
    pub fn variation(&self) -> Option<f64> {
        self.variation
    }

    /// Whether the measure has a value.
    pub fn has_value(&self) -> bool {
        !matches!(self.value, MeasureValue::NoValue)
    }
}

/// Source of measures for one analyzed entity, keyed by metric key.
pub trait MeasureLookup {
    /// Measure of `metric_key`, `None` when nothing was computed.
    fn measure(&self, metric_key: &str) -> Result<Option<Measure>>;
}

impl MeasureLookup for HashMap<String, Measure> {
    fn measure(&self, metric_key: &str) -> Result<Option<Measure>> {
        Ok(self.get(metric_key).cloned())
    }
}
