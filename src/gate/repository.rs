//! Persistence collaborators of the quality gate service.
//!
//! The service never talks to a database directly. It opens a short-lived
//! read session per call through [`QualityGateDao`], reads gate and condition
//! rows from it, and drops the session before returning. Project bindings are
//! resolved through [`GateBindingLookup`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

/// Persisted quality gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityGateRow {
    /// Gate id
    pub id: i64,
    /// Gate name
    pub name: String,
}

/// Persisted condition of a quality gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRow {
    /// Condition id
    pub id: i64,
    /// Owning gate
    pub gate_id: i64,
    /// Referenced metric, which may no longer exist
    pub metric_id: i64,
    /// Operator code (`GT`, `LT`)
    pub operator: String,
    /// Threshold in the metric's textual form
    pub error_threshold: String,
}

/// Scoped read session. Dropping it releases the underlying resources.
pub trait QualityGateSession {
    /// Gate row by id.
    fn select_gate(&mut self, gate_id: i64) -> Result<Option<QualityGateRow>>;

    /// Condition rows of a gate, in insertion order.
    fn select_conditions(&mut self, gate_id: i64) -> Result<Vec<ConditionRow>>;
}

/// Opens read sessions on the quality gate tables.
pub trait QualityGateDao: Send + Sync {
    /// Open a read session, released when dropped.
    fn open_session(&self) -> Result<Box<dyn QualityGateSession + '_>>;
}

/// Project to gate assignments.
pub trait GateBindingLookup: Send + Sync {
    /// Gate explicitly assigned to `project_uuid`.
    fn project_gate_id(&self, project_uuid: &str) -> Result<Option<i64>>;

    /// Instance-wide default gate.
    fn default_gate_id(&self) -> Result<Option<i64>>;
}

#[derive(Debug, Default)]
struct GateTables {
    gates: IndexMap<i64, QualityGateRow>,
    conditions: Vec<ConditionRow>,
    project_gates: HashMap<String, i64>,
    default_gate: Option<i64>,
}

/// In-memory gate tables for embedding and tests.
///
/// Counts opened and released sessions so callers can check that every
/// session is scoped to one call.
#[derive(Debug, Default)]
pub struct InMemoryGateStore {
    tables: RwLock<GateTables>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl InMemoryGateStore {
    /// Create empty tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a gate row.
    pub fn insert_gate(&self, id: i64, name: impl Into<String>) {
        self.tables.write().gates.insert(
            id,
            QualityGateRow {
                id,
                name: name.into(),
            },
        );
    }

    /// Append a condition row.
    pub fn insert_condition(&self, row: ConditionRow) {
        self.tables.write().conditions.push(row);
    }

    /// Assign `gate_id` to `project_uuid`.
    pub fn bind_project(&self, project_uuid: impl Into<String>, gate_id: i64) {
        self.tables.write().project_gates.insert(project_uuid.into(), gate_id);
    }

    /// Set or clear the default gate.
    pub fn set_default_gate(&self, gate_id: Option<i64>) {
        self.tables.write().default_gate = gate_id;
    }

    /// Number of sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of sessions released so far.
    pub fn sessions_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct InMemorySession<'a> {
    store: &'a InMemoryGateStore,
}

impl QualityGateSession for InMemorySession<'_> {
    fn select_gate(&mut self, gate_id: i64) -> Result<Option<QualityGateRow>> {
        Ok(self.store.tables.read().gates.get(&gate_id).cloned())
    }

    fn select_conditions(&mut self, gate_id: i64) -> Result<Vec<ConditionRow>> {
        Ok(self
            .store
            .tables
            .read()
            .conditions
            .iter()
            .filter(|row| row.gate_id == gate_id)
            .cloned()
            .collect())
    }
}

impl Drop for InMemorySession<'_> {
    fn drop(&mut self) {
        self.store.closed.fetch_add(1, Ordering::SeqCst);
    }
}

impl QualityGateDao for InMemoryGateStore {
    fn open_session(&self) -> Result<Box<dyn QualityGateSession + '_>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemorySession { store: self }))
    }
}

impl GateBindingLookup for InMemoryGateStore {
    fn project_gate_id(&self, project_uuid: &str) -> Result<Option<i64>> {
        Ok(self.tables.read().project_gates.get(project_uuid).copied())
    }

    fn default_gate_id(&self) -> Result<Option<i64>> {
        Ok(self.tables.read().default_gate)
    }
}
