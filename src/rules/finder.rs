//! In-memory rule lookup.
//!
//! [`RuleFinder`] loads every rule definition once and answers lookups from
//! memory. A refresh builds a complete new catalog and swaps it in; readers
//! holding the previous catalog keep a consistent view.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::errors::Result;
use crate::core::snapshot::Snapshot;

/// A rule definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Rule id
    pub id: i64,
    /// Rule repository, e.g. `java`
    pub repository: String,
    /// Key within the repository, e.g. `S1481`
    pub key: String,
    /// Display name
    pub name: String,
    /// Language key
    pub language: String,
    /// Severity applied when an activation does not override it
    pub default_severity: String,
}

impl RuleDefinition {
    /// `<repository>:<key>`
    pub fn rule_key(&self) -> String {
        format!("{}:{}", self.repository, self.key)
    }
}

/// Reads rule definitions from the primary store.
pub trait RuleLoader: Send + Sync {
    /// Every rule definition, in id order.
    fn load_rules(&self) -> Result<Vec<RuleDefinition>>;
}

/// Immutable set of rules indexed by rule key and id.
#[derive(Debug, Default)]
pub struct RuleCatalog {
    by_key: IndexMap<String, Arc<RuleDefinition>>,
    by_id: HashMap<i64, Arc<RuleDefinition>>,
}

impl RuleCatalog {
    /// Index `rules` by key and id.
    pub fn new(rules: impl IntoIterator<Item = RuleDefinition>) -> Self {
        let mut catalog = Self::default();
        for rule in rules {
            let rule = Arc::new(rule);
            catalog.by_id.insert(rule.id, Arc::clone(&rule));
            catalog.by_key.insert(rule.rule_key(), rule);
        }
        catalog
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether the catalog has no rule.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Thread-safe, read-only view of every rule definition.
pub struct RuleFinder {
    loader: Arc<dyn RuleLoader>,
    snapshot: Snapshot<RuleCatalog>,
}

impl RuleFinder {
    /// Create an empty finder. Call [`RuleFinder::refresh`] to load rules.
    pub fn new(loader: Arc<dyn RuleLoader>) -> Self {
        Self {
            loader,
            snapshot: Snapshot::default(),
        }
    }

    /// Create a finder and load rules immediately.
    pub fn load(loader: Arc<dyn RuleLoader>) -> Result<Self> {
        let finder = Self::new(loader);
        finder.refresh()?;
        Ok(finder)
    }

    /// Reload every rule and swap the new catalog in.
    ///
    /// On failure the previous catalog stays in place.
    pub fn refresh(&self) -> Result<usize> {
        let catalog = self
            .snapshot
            .refresh_with(|| Ok(RuleCatalog::new(self.loader.load_rules()?)))?;
        info!(
            rules = catalog.len(),
            generation = self.snapshot.generation(),
            "Rule finder refreshed"
        );
        Ok(catalog.len())
    }

    /// Rule by `<repository>:<key>`.
    pub fn find_by_key(&self, rule_key: &str) -> Option<Arc<RuleDefinition>> {
        self.snapshot.load().by_key.get(rule_key).cloned()
    }

    /// Rule by id.
    pub fn find_by_id(&self, id: i64) -> Option<Arc<RuleDefinition>> {
        self.snapshot.load().by_id.get(&id).cloned()
    }

    /// Every rule, in load order.
    pub fn find_all(&self) -> Vec<Arc<RuleDefinition>> {
        self.snapshot.load().by_key.values().cloned().collect()
    }

    /// Rules of one language.
    pub fn find_by_language(&self, language: &str) -> Vec<Arc<RuleDefinition>> {
        self.snapshot
            .load()
            .by_key
            .values()
            .filter(|rule| rule.language == language)
            .cloned()
            .collect()
    }

    /// Current catalog.
    pub fn catalog(&self) -> Arc<RuleCatalog> {
        self.snapshot.load()
    }

    /// Number of successful refreshes.
    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }
}
