//! Rows, documents and the conversion between them.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::core::errors::Result;

/// Denormalized document stored in a search index.
///
/// Two keys group documents besides their id: the parent key, used by
/// cascade deletes (the owning profile or file), and the scope key, used by
/// targeted re-indexing (the profile or project a write touched). Most
/// documents use the same key for both.
pub trait IndexDocument: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Stable document id.
    fn id(&self) -> &str;

    /// Key of the entity whose deletion removes this document.
    fn parent_key(&self) -> &str;

    /// Key of the re-indexing scope this document belongs to.
    fn scope_key(&self) -> &str {
        self.parent_key()
    }

    /// Last update of the source row, in epoch milliseconds.
    fn updated_at(&self) -> i64;
}

/// Primary-store row feeding an index.
pub trait SourceRow: Send + Sync {
    /// Primary key of the row.
    fn row_key(&self) -> String;

    /// Key of the re-indexing scope the row belongs to.
    fn scope_key(&self) -> &str;

    /// Last update of the row, in epoch milliseconds.
    fn updated_at(&self) -> i64;
}

/// A row change produced by a write operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RowChange<R> {
    /// Row created or modified
    Upsert(R),
    /// Row deleted
    Delete {
        /// Primary key of the deleted row
        key: String,
    },
}

/// Maps rows of one table to documents of one index.
pub trait DocumentConverter: Send + Sync {
    /// Source row type
    type Row: SourceRow;
    /// Produced document type
    type Doc: IndexDocument;

    /// Name of the target index, used in logs and errors.
    fn index_name(&self) -> &str;

    /// Convert one row. Pure: same row, same documents.
    ///
    /// A row that cannot be converted fails with a data error naming it.
    fn convert(&self, row: &Self::Row) -> Result<Vec<Self::Doc>>;

    /// Whether a row owns every document whose parent key is its row key.
    ///
    /// Rows expanding to several documents (one per source line) set this so
    /// stale documents of a shrunk row are pruned and a row delete removes all
    /// of them.
    fn owns_parent(&self) -> bool {
        false
    }
}

/// Empty strings read from the store are normalized to `None`.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
