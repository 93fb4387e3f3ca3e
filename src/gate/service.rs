//! Quality gate resolution.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::core::errors::{QualgateError, Result};
use crate::gate::condition::Condition;
use crate::gate::metric::MetricRepository;
use crate::gate::quality_gate::QualityGate;
use crate::gate::repository::{GateBindingLookup, QualityGateDao, QualityGateSession};

/// Message of the error raised when no gate applies to a project.
pub const MISSING_DEFAULT_GATE: &str = "The default Quality gate is missing";

/// Resolves quality gates from persisted configuration.
pub trait QualityGateService: Send + Sync {
    /// Load gate `gate_id`, `None` when it does not exist.
    fn find_by_id(&self, gate_id: i64) -> Result<Option<QualityGate>>;

    /// Gate that applies to `project_uuid`: its own gate when one is bound,
    /// the default gate otherwise.
    fn find_effective_quality_gate(&self, project_uuid: &str) -> Result<QualityGate>;
}

/// [`QualityGateService`] reading through a [`QualityGateDao`].
pub struct QualityGateServiceImpl {
    dao: Arc<dyn QualityGateDao>,
    bindings: Arc<dyn GateBindingLookup>,
    metrics: Arc<dyn MetricRepository>,
}

impl QualityGateServiceImpl {
    /// Create a service over the given collaborators.
    pub fn new(
        dao: Arc<dyn QualityGateDao>,
        bindings: Arc<dyn GateBindingLookup>,
        metrics: Arc<dyn MetricRepository>,
    ) -> Self {
        Self {
            dao,
            bindings,
            metrics,
        }
    }

    /// Rebuild gate `gate_id` from its rows.
    ///
    /// Conditions whose metric no longer resolves are left out: a removed
    /// metric must not make the whole gate unusable.
    fn hydrate(&self, session: &mut dyn QualityGateSession, gate_id: i64) -> Result<Option<QualityGate>> {
        let Some(gate_row) = session.select_gate(gate_id)? else {
            return Ok(None);
        };

        let rows = session.select_conditions(gate_id)?;
        let mut conditions = Vec::with_capacity(rows.len());
        for row in rows {
            let Some(metric) = self.metrics.find_by_id(row.metric_id)? else {
                debug!(
                    gate = %gate_row.name,
                    condition_id = row.id,
                    metric_id = row.metric_id,
                    "Skipping condition on removed metric"
                );
                continue;
            };
            conditions.push(Condition::from_code(metric, &row.operator, row.error_threshold)?);
        }

        Ok(Some(QualityGate::new(gate_row.id, gate_row.name, conditions)))
    }
}

impl QualityGateService for QualityGateServiceImpl {
    fn find_by_id(&self, gate_id: i64) -> Result<Option<QualityGate>> {
        let mut session = self.dao.open_session()?;
        self.hydrate(session.as_mut(), gate_id)
    }

    fn find_effective_quality_gate(&self, project_uuid: &str) -> Result<QualityGate> {
        let mut session = self.dao.open_session()?;

        if let Some(gate_id) = self.bindings.project_gate_id(project_uuid)? {
            if let Some(gate) = self.hydrate(session.as_mut(), gate_id)? {
                debug!(project = project_uuid, gate = gate.name(), "Using project quality gate");
                return Ok(gate);
            }
            warn!(
                project = project_uuid,
                gate_id, "Project is bound to a missing quality gate, using the default one"
            );
        }

        let default_id = self
            .bindings
            .default_gate_id()?
            .ok_or_else(|| QualgateError::configuration(MISSING_DEFAULT_GATE))?;
        let gate = self
            .hydrate(session.as_mut(), default_id)?
            .ok_or_else(|| QualgateError::configuration(MISSING_DEFAULT_GATE))?;

        info!(project = project_uuid, gate = gate.name(), "Using default quality gate");
        Ok(gate)
    }
}
