//! SQLite reference implementations of the store and search index.

pub mod sqlite;
pub mod sqlite_index;

pub use sqlite::{SqliteStore, SCHEMA_VERSION};
pub use sqlite_index::SqliteSearchIndex;
