//! Persistent [`SearchIndex`] backed by SQLite.
//!
//! Every index shares the `index_documents` table and is told apart by name.
//! Documents are stored as JSON next to the keys the indexer queries by.

use std::marker::PhantomData;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::core::config::StoreConfig;
use crate::core::errors::{QualgateError, Result};
use crate::index::document::IndexDocument;
use crate::index::search_index::SearchIndex;
use crate::store::sqlite::open_connection;

const INDEX_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS index_documents (
        index_name TEXT NOT NULL,
        doc_id TEXT NOT NULL,
        parent_key TEXT NOT NULL,
        scope_key TEXT NOT NULL,
        updated_at INTEGER NOT NULL,
        body TEXT NOT NULL,
        PRIMARY KEY (index_name, doc_id)
    );
    CREATE INDEX IF NOT EXISTS idx_index_documents_parent ON index_documents (index_name, parent_key);
    CREATE INDEX IF NOT EXISTS idx_index_documents_scope ON index_documents (index_name, scope_key);
    CREATE TABLE IF NOT EXISTS index_watermarks (
        index_name TEXT PRIMARY KEY,
        watermark INTEGER NOT NULL
    );
";

/// SQLite-backed search index for documents of type `D`.
pub struct SqliteSearchIndex<D> {
    name: String,
    connection: Mutex<Connection>,
    _docs: PhantomData<fn() -> D>,
}

impl<D: IndexDocument> SqliteSearchIndex<D> {
    /// Open the index `name` in the database described by `config`.
    pub fn open(config: &StoreConfig, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let connection = open_connection(&config.path, Duration::from_millis(config.busy_timeout_ms))?;
        connection.execute_batch(INDEX_SCHEMA)?;
        Ok(Self {
            name,
            connection: Mutex::new(connection),
            _docs: PhantomData,
        })
    }

    fn failed(&self, operation: &str, err: impl std::fmt::Display) -> QualgateError {
        QualgateError::index(&self.name, format!("{operation} failed: {err}"))
    }

    fn delete_where(&self, operation: &str, column: &str, keys: &[String]) -> Result<usize> {
        let mut connection = self.connection.lock();
        let run = |connection: &mut Connection| -> rusqlite::Result<usize> {
            let tx = connection.transaction()?;
            let mut removed = 0;
            {
                let mut statement =
                    tx.prepare(&format!("DELETE FROM index_documents WHERE index_name = ?1 AND {column} = ?2"))?;
                for key in keys {
                    removed += statement.execute(params![self.name, key])?;
                }
            }
            tx.commit()?;
            Ok(removed)
        };
        run(&mut connection).map_err(|e| self.failed(operation, e))
    }

    fn ids_where(&self, operation: &str, column: &str, keys: &[String]) -> Result<Vec<String>> {
        let connection = self.connection.lock();
        let run = || -> rusqlite::Result<Vec<String>> {
            let mut statement = connection.prepare(&format!(
                "SELECT doc_id FROM index_documents WHERE index_name = ?1 AND {column} = ?2 ORDER BY doc_id"
            ))?;
            let mut ids = Vec::new();
            for key in keys {
                let rows = statement.query_map(params![self.name, key], |row| row.get(0))?;
                for id in rows {
                    ids.push(id?);
                }
            }
            Ok(ids)
        };
        run().map_err(|e| self.failed(operation, e))
    }
}

impl<D: IndexDocument> SearchIndex<D> for SqliteSearchIndex<D> {
    fn name(&self) -> &str {
        &self.name
    }

    fn bulk_upsert(&self, docs: &[D]) -> Result<()> {
        let bodies = docs
            .iter()
            .map(serde_json::to_string)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut connection = self.connection.lock();
        let run = |connection: &mut Connection| -> rusqlite::Result<()> {
            let tx = connection.transaction()?;
            {
                let mut statement = tx.prepare(
                    "INSERT OR REPLACE INTO index_documents
                         (index_name, doc_id, parent_key, scope_key, updated_at, body)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for (doc, body) in docs.iter().zip(&bodies) {
                    statement.execute(params![
                        self.name,
                        doc.id(),
                        doc.parent_key(),
                        doc.scope_key(),
                        doc.updated_at(),
                        body
                    ])?;
                }
            }
            tx.commit()
        };
        run(&mut connection).map_err(|e| self.failed("Bulk upsert", e))
    }

    fn delete_by_ids(&self, ids: &[String]) -> Result<usize> {
        self.delete_where("Delete by id", "doc_id", ids)
    }

    fn delete_by_parents(&self, parent_keys: &[String]) -> Result<usize> {
        self.delete_where("Delete by parent", "parent_key", parent_keys)
    }

    fn get_by_id(&self, id: &str) -> Result<Option<D>> {
        let body: Option<String> = self
            .connection
            .lock()
            .query_row(
                "SELECT body FROM index_documents WHERE index_name = ?1 AND doc_id = ?2",
                params![self.name, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| self.failed("Get", e))?;
        Ok(body.map(|body| serde_json::from_str(&body)).transpose()?)
    }

    fn ids_by_parent(&self, parent_keys: &[String]) -> Result<Vec<String>> {
        self.ids_where("Ids by parent", "parent_key", parent_keys)
    }

    fn ids_by_scope(&self, scope_keys: &[String]) -> Result<Vec<String>> {
        self.ids_where("Ids by scope", "scope_key", scope_keys)
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self
            .connection
            .lock()
            .query_row(
                "SELECT COUNT(*) FROM index_documents WHERE index_name = ?1",
                params![self.name],
                |row| row.get(0),
            )
            .map_err(|e| self.failed("Count", e))?;
        usize::try_from(count).map_err(|e| self.failed("Count", e))
    }

    fn watermark(&self) -> Result<Option<i64>> {
        self.connection
            .lock()
            .query_row(
                "SELECT watermark FROM index_watermarks WHERE index_name = ?1",
                params![self.name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| self.failed("Read watermark", e))
    }

    fn store_watermark(&self, watermark: i64) -> Result<()> {
        self.connection
            .lock()
            .execute(
                "INSERT OR REPLACE INTO index_watermarks (index_name, watermark) VALUES (?1, ?2)",
                params![self.name, watermark],
            )
            .map_err(|e| self.failed("Store watermark", e))?;
        Ok(())
    }
}
