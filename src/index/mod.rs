//! Incremental search indexing.
//!
//! The generic [`Indexer`] streams primary-store rows through a
//! [`DocumentConverter`] into a [`SearchIndex`]. It is instantiated for
//! active rules and for source lines.

pub mod active_rules;
pub mod document;
pub mod indexer;
pub mod search_index;
pub mod source;
pub mod source_lines;

pub use active_rules::{
    ActiveRuleChange, ActiveRuleConverter, ActiveRuleDoc, ActiveRuleIndexer, ActiveRuleInheritance,
    ActiveRuleRow, ACTIVE_RULES_INDEX,
};
pub use document::{DocumentConverter, IndexDocument, RowChange, SourceRow};
pub use indexer::{Indexer, IndexingReport};
pub use search_index::{InMemorySearchIndex, SearchIndex};
pub use source::{RowScope, RowSource, VecRowSource};
pub use source_lines::{
    FileSourceRow, SourceLineConverter, SourceLineDoc, SourceLineIndexer, SOURCE_LINES_INDEX,
};
