//! Rule activation write path.
//!
//! Every write updates the primary store first and then the active rule index,
//! in the same call. The call only succeeds once the index reflects the write.
//! When indexing fails the store write may already be committed: the failure
//! is reported as a failed write and the next incremental pass repairs the
//! index.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::errors::{QualgateError, Result};
use crate::index::active_rules::{ActiveRuleChange, ActiveRuleIndexer, ActiveRuleRow, SEVERITIES};
use crate::rules::finder::{RuleDefinition, RuleFinder};

/// Stores active rules.
pub trait ActiveRuleWriter: Send + Sync {
    /// Activate `rule` in `profile_key`, or update the existing activation.
    /// Returns the stored row and whether it was created.
    fn save_activation(
        &self,
        profile_key: &str,
        rule: &RuleDefinition,
        severity: Option<&str>,
        now: i64,
    ) -> Result<(ActiveRuleRow, bool)>;

    /// Remove the activation of `rule_id` in `profile_key`, returning its id.
    fn delete_activation(&self, profile_key: &str, rule_id: i64) -> Result<Option<i64>>;

    /// Remove every activation of `profile_key`, returning how many existed.
    fn delete_profile(&self, profile_key: &str) -> Result<usize>;
}

/// Activates and deactivates rules in quality profiles.
pub struct RuleActivator {
    finder: Arc<RuleFinder>,
    writer: Arc<dyn ActiveRuleWriter>,
    indexer: Arc<ActiveRuleIndexer>,
}

impl RuleActivator {
    /// Create an activator writing through `writer` and indexing with `indexer`.
    pub fn new(finder: Arc<RuleFinder>, writer: Arc<dyn ActiveRuleWriter>, indexer: Arc<ActiveRuleIndexer>) -> Self {
        Self {
            finder,
            writer,
            indexer,
        }
    }

    /// Activate `rule_key` in `profile_key`, optionally overriding its
    /// severity. Activating an active rule updates it.
    pub fn activate(&self, profile_key: &str, rule_key: &str, severity: Option<&str>) -> Result<ActiveRuleChange> {
        let rule = self.rule(rule_key)?;
        if let Some(severity) = severity {
            if !SEVERITIES.contains(&severity) {
                return Err(QualgateError::validation_field(
                    format!("Unknown severity '{severity}'"),
                    "severity",
                ));
            }
        }

        let now = chrono::Utc::now().timestamp_millis();
        let (row, created) = self.writer.save_activation(profile_key, &rule, severity, now)?;
        let change = if created {
            ActiveRuleChange::Activated(row)
        } else {
            ActiveRuleChange::Updated(row)
        };

        self.index("Rule activation", profile_key, rule_key, change.clone())?;
        Ok(change)
    }

    /// Deactivate `rule_key` in `profile_key`. Returns `None` when the rule
    /// was not active.
    pub fn deactivate(&self, profile_key: &str, rule_key: &str) -> Result<Option<ActiveRuleChange>> {
        let rule = self.rule(rule_key)?;
        let Some(active_rule_id) = self.writer.delete_activation(profile_key, rule.id)? else {
            debug!(profile = profile_key, rule = rule_key, "Rule was not active");
            return Ok(None);
        };

        let change = ActiveRuleChange::Deactivated { active_rule_id };
        self.index("Rule deactivation", profile_key, rule_key, change.clone())?;
        Ok(Some(change))
    }

    /// Delete every activation of a profile and its documents.
    pub fn delete_profile(&self, profile_key: &str) -> Result<usize> {
        let removed = self.writer.delete_profile(profile_key)?;
        self.indexer
            .delete_by_parent_keys(&[profile_key.to_string()])
            .map_err(|e| {
                warn!(profile = profile_key, error = %e, "Profile deleted but its active rules are still indexed");
                QualgateError::write_failed("Profile deletion", e)
            })?;
        Ok(removed)
    }

    fn rule(&self, rule_key: &str) -> Result<Arc<RuleDefinition>> {
        self.finder
            .find_by_key(rule_key)
            .ok_or_else(|| QualgateError::validation_field(format!("Rule not found: {rule_key}"), "rule_key"))
    }

    fn index(&self, operation: &str, profile_key: &str, rule_key: &str, change: ActiveRuleChange) -> Result<()> {
        self.indexer.index_changes([change]).map_err(|e| {
            warn!(
                profile = profile_key,
                rule = rule_key,
                error = %e,
                "Active rule stored but not indexed"
            );
            QualgateError::write_failed(operation, e)
        })?;
        Ok(())
    }
}
