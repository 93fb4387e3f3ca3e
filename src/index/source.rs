//! Row sources feeding the indexers.

use parking_lot::RwLock;

use crate::core::errors::Result;
use crate::index::document::SourceRow;

/// Which rows a pass reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowScope {
    /// Every row, ignoring the watermark
    All,
    /// Rows updated at or after the given epoch milliseconds
    UpdatedSince(i64),
    /// Rows whose scope key is one of the given keys
    Scopes(Vec<String>),
}

impl RowScope {
    /// Whether `row` falls in this scope.
    pub fn matches<R: SourceRow>(&self, row: &R) -> bool {
        match self {
            RowScope::All => true,
            RowScope::UpdatedSince(since) => row.updated_at() >= *since,
            RowScope::Scopes(keys) => keys.iter().any(|k| k == row.scope_key()),
        }
    }
}

/// Streams rows of one table.
///
/// Rows are handed to `visit` one at a time; an error returned by `visit`
/// stops the stream and is returned as is.
pub trait RowSource<R>: Send + Sync {
    /// Visit every row in `scope`.
    fn for_each_row(&self, scope: &RowScope, visit: &mut dyn FnMut(R) -> Result<()>) -> Result<()>;
}

/// Row source over a vector, for embedding and tests.
#[derive(Debug)]
pub struct VecRowSource<R> {
    rows: RwLock<Vec<R>>,
}

impl<R: SourceRow + Clone> VecRowSource<R> {
    /// Create a source over `rows`.
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Insert `row`, replacing the row with the same key.
    pub fn upsert(&self, row: R) {
        let mut rows = self.rows.write();
        let key = row.row_key();
        match rows.iter_mut().find(|r| r.row_key() == key) {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
    }

    /// Remove the row with `key`.
    pub fn remove(&self, key: &str) -> Option<R> {
        let mut rows = self.rows.write();
        let position = rows.iter().position(|r| r.row_key() == key)?;
        Some(rows.remove(position))
    }

    /// Copy of every row.
    pub fn rows(&self) -> Vec<R> {
        self.rows.read().clone()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the source has no row.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

impl<R: SourceRow + Clone> RowSource<R> for VecRowSource<R> {
    fn for_each_row(&self, scope: &RowScope, visit: &mut dyn FnMut(R) -> Result<()>) -> Result<()> {
        let selected: Vec<R> = self
            .rows
            .read()
            .iter()
            .filter(|row| scope.matches(*row))
            .cloned()
            .collect();

        for row in selected {
            visit(row)?;
        }
        Ok(())
    }
}
