//! Search index client abstraction.

use std::collections::HashSet;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::core::errors::{QualgateError, Result};
use crate::index::document::IndexDocument;

/// Document store answering read queries without joins.
///
/// Upserts replace documents by id, never append. Deletes of unknown ids or
/// parents succeed and report zero removals.
pub trait SearchIndex<D: IndexDocument>: Send + Sync {
    /// Index name.
    fn name(&self) -> &str;

    /// Insert or replace documents by id.
    fn bulk_upsert(&self, docs: &[D]) -> Result<()>;

    /// Remove documents by id, returning how many existed.
    fn delete_by_ids(&self, ids: &[String]) -> Result<usize>;

    /// Remove documents by parent key, returning how many existed.
    fn delete_by_parents(&self, parent_keys: &[String]) -> Result<usize>;

    /// Document by id.
    fn get_by_id(&self, id: &str) -> Result<Option<D>>;

    /// Ids of the documents with one of the given parent keys.
    fn ids_by_parent(&self, parent_keys: &[String]) -> Result<Vec<String>>;

    /// Ids of the documents with one of the given scope keys.
    fn ids_by_scope(&self, scope_keys: &[String]) -> Result<Vec<String>>;

    /// Number of documents.
    fn count(&self) -> Result<usize>;

    /// Highest row update already indexed, in epoch milliseconds.
    fn watermark(&self) -> Result<Option<i64>>;

    /// Persist the watermark of the last successful pass.
    fn store_watermark(&self, watermark: i64) -> Result<()>;
}

#[derive(Debug)]
struct IndexState<D> {
    docs: IndexMap<String, D>,
    watermark: Option<i64>,
    available: bool,
}

/// In-process [`SearchIndex`].
///
/// Can be switched unavailable to reproduce a failing index cluster.
#[derive(Debug)]
pub struct InMemorySearchIndex<D> {
    name: String,
    state: RwLock<IndexState<D>>,
}

impl<D: IndexDocument> InMemorySearchIndex<D> {
    /// Create an empty, available index.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(IndexState {
                docs: IndexMap::new(),
                watermark: None,
                available: true,
            }),
        }
    }

    /// Make every following call fail (or succeed again).
    pub fn set_available(&self, available: bool) {
        self.state.write().available = available;
    }

    /// Snapshot of every document, in insertion order.
    pub fn documents(&self) -> Vec<D> {
        self.state.read().docs.values().cloned().collect()
    }

    fn check(&self, state: &IndexState<D>) -> Result<()> {
        if state.available {
            Ok(())
        } else {
            Err(QualgateError::index(&self.name, "index is unavailable"))
        }
    }
}

impl<D: IndexDocument> SearchIndex<D> for InMemorySearchIndex<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn bulk_upsert(&self, docs: &[D]) -> Result<()> {
        let mut state = self.state.write();
        self.check(&state)?;
        for doc in docs {
            state.docs.insert(doc.id().to_string(), doc.clone());
        }
        Ok(())
    }

    fn delete_by_ids(&self, ids: &[String]) -> Result<usize> {
        let mut state = self.state.write();
        self.check(&state)?;
        Ok(ids
            .iter()
            .filter(|id| state.docs.shift_remove(id.as_str()).is_some())
            .count())
    }

    fn delete_by_parents(&self, parent_keys: &[String]) -> Result<usize> {
        let mut state = self.state.write();
        self.check(&state)?;
        let parents: HashSet<&str> = parent_keys.iter().map(String::as_str).collect();
        let before = state.docs.len();
        state.docs.retain(|_, doc| !parents.contains(doc.parent_key()));
        Ok(before - state.docs.len())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<D>> {
        let state = self.state.read();
        self.check(&state)?;
        Ok(state.docs.get(id).cloned())
    }

    fn ids_by_parent(&self, parent_keys: &[String]) -> Result<Vec<String>> {
        let state = self.state.read();
        self.check(&state)?;
        Ok(state
            .docs
            .values()
            .filter(|doc| parent_keys.iter().any(|k| k == doc.parent_key()))
            .map(|doc| doc.id().to_string())
            .collect())
    }

    fn ids_by_scope(&self, scope_keys: &[String]) -> Result<Vec<String>> {
        let state = self.state.read();
        self.check(&state)?;
        Ok(state
            .docs
            .values()
            .filter(|doc| scope_keys.iter().any(|k| k == doc.scope_key()))
            .map(|doc| doc.id().to_string())
            .collect())
    }

    fn count(&self) -> Result<usize> {
        let state = self.state.read();
        self.check(&state)?;
        Ok(state.docs.len())
    }

    fn watermark(&self) -> Result<Option<i64>> {
        let state = self.state.read();
        self.check(&state)?;
        Ok(state.watermark)
    }

    fn store_watermark(&self, watermark: i64) -> Result<()> {
        let mut state = self.state.write();
        self.check(&state)?;
        state.watermark = Some(watermark);
        Ok(())
    }
}
