//! Generic incremental indexer.
//!
//! An [`Indexer`] keeps one search index consistent with one table of the
//! primary store. It supports three triggers:
//!
//! - a full rebuild at startup when the index is empty (or when forced),
//! - targeted indexing of the rows a write operation just changed, or of every
//!   row of a bounded set of scopes,
//! - incremental catch-up of rows updated since the stored watermark.
//!
//! Delivery from store to index is at-least-once. Upserts replace documents
//! by id, so replaying rows after a crash is harmless, and the watermark only
//! moves forward once a whole pass has been written.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::config::IndexingConfig;
use crate::core::errors::Result;
use crate::index::document::{DocumentConverter, IndexDocument, RowChange, SourceRow};
use crate::index::search_index::SearchIndex;
use crate::index::source::{RowScope, RowSource};

/// Counters of one indexing call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexingReport {
    /// Source rows read
    pub rows: usize,
    /// Documents written
    pub upserted: usize,
    /// Documents removed
    pub deleted: usize,
    /// Startup indexing found a populated index and did nothing
    pub skipped: bool,
    /// Watermark after the pass, when the pass maintains one
    pub watermark: Option<i64>,
}

impl IndexingReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Incremental indexer for one converter.
///
/// Calls on one indexer are serialized; each one blocks until the index
/// reflects the rows it was given.
pub struct Indexer<C: DocumentConverter> {
    converter: C,
    source: Arc<dyn RowSource<C::Row>>,
    index: Arc<dyn SearchIndex<C::Doc>>,
    config: IndexingConfig,
    pass_lock: Mutex<()>,
}

impl<C: DocumentConverter> Indexer<C> {
    /// Create an indexer feeding `index` from `source`.
    pub fn new(
        converter: C,
        source: Arc<dyn RowSource<C::Row>>,
        index: Arc<dyn SearchIndex<C::Doc>>,
        config: IndexingConfig,
    ) -> Self {
        Self {
            converter,
            source,
            index,
            config,
            pass_lock: Mutex::new(()),
        }
    }

    /// Row to document converter.
    pub fn converter(&self) -> &C {
        &self.converter
    }

    /// Target index.
    pub fn index(&self) -> &Arc<dyn SearchIndex<C::Doc>> {
        &self.index
    }

    /// Rebuild the index from every row.
    ///
    /// Does nothing when the index already holds documents, unless startup
    /// indexing is forced. Rows whose scope key is in `excluded_scopes` are
    /// skipped.
    pub fn index_on_startup(&self, excluded_scopes: &[String]) -> Result<IndexingReport> {
        let _pass = self.pass_lock.lock();
        let name = self.converter.index_name();

        if !self.config.force_startup_indexing && self.index.count()? > 0 {
            info!(index = name, "Index already populated, skipping startup indexing");
            return Ok(IndexingReport::skipped());
        }

        info!(index = name, excluded = excluded_scopes.len(), "Starting full reindex");
        let excluded: HashSet<&str> = excluded_scopes.iter().map(String::as_str).collect();
        let mut report = IndexingReport::default();

        let highest = self.stream(&RowScope::All, &excluded, &mut report, None)?;
        report.watermark = self.advance_watermark(highest)?;

        info!(
            index = name,
            rows = report.rows,
            documents = report.upserted,
            "Full reindex complete"
        );
        Ok(report)
    }

    /// Apply the changes of one write operation.
    ///
    /// When a row appears several times only its last change is applied. The
    /// watermark is neither read nor written.
    pub fn index_changes<I>(&self, changes: I) -> Result<IndexingReport>
    where
        I: IntoIterator,
        I::Item: Into<RowChange<C::Row>>,
    {
        let _pass = self.pass_lock.lock();

        let mut latest: IndexMap<String, RowChange<C::Row>> = IndexMap::new();
        for change in changes {
            let change = change.into();
            let key = match &change {
                RowChange::Upsert(row) => row.row_key(),
                RowChange::Delete { key } => key.clone(),
            };
            latest.insert(key, change);
        }

        let mut upserts = Vec::new();
        let mut deletes = Vec::new();
        for (key, change) in latest {
            match change {
                RowChange::Upsert(row) => upserts.push(row),
                RowChange::Delete { .. } => deletes.push(key),
            }
        }

        let mut report = IndexingReport::default();
        if !deletes.is_empty() {
            report.deleted += if self.converter.owns_parent() {
                self.delete_chunked(&deletes, |chunk| self.index.delete_by_parents(chunk))?
            } else {
                self.delete_chunked(&deletes, |chunk| self.index.delete_by_ids(chunk))?
            };
        }
        for batch in upserts.chunks(self.bulk_size()) {
            self.flush(batch, &mut report, None)?;
        }

        debug!(
            index = self.converter.index_name(),
            upserted = report.upserted,
            deleted = report.deleted,
            "Indexed row changes"
        );
        Ok(report)
    }

    /// Index rows updated since the stored watermark, then advance it.
    ///
    /// Without a watermark every row is read.
    pub fn index_incremental(&self) -> Result<IndexingReport> {
        let _pass = self.pass_lock.lock();
        let name = self.converter.index_name();

        let scope = match self.index.watermark()? {
            Some(since) => RowScope::UpdatedSince(since),
            None => RowScope::All,
        };
        debug!(index = name, ?scope, "Starting incremental indexing");

        let mut report = IndexingReport::default();
        let highest = self.stream(&scope, &HashSet::new(), &mut report, None)?;
        report.watermark = self.advance_watermark(highest)?;

        info!(
            index = name,
            rows = report.rows,
            watermark = ?report.watermark,
            "Incremental indexing complete"
        );
        Ok(report)
    }

    /// Re-index every row of the given scopes and prune documents of those
    /// scopes whose row no longer exists.
    pub fn index_scopes(&self, scope_keys: &[String]) -> Result<IndexingReport> {
        let _pass = self.pass_lock.lock();
        let mut report = IndexingReport::default();
        if scope_keys.is_empty() {
            return Ok(report);
        }

        let mut seen = HashSet::new();
        self.stream(
            &RowScope::Scopes(scope_keys.to_vec()),
            &HashSet::new(),
            &mut report,
            Some(&mut seen),
        )?;

        let stale: Vec<String> = self
            .index
            .ids_by_scope(scope_keys)?
            .into_iter()
            .filter(|id| !seen.contains(id))
            .collect();
        report.deleted += self.delete_chunked(&stale, |chunk| self.index.delete_by_ids(chunk))?;

        debug!(
            index = self.converter.index_name(),
            scopes = scope_keys.len(),
            upserted = report.upserted,
            deleted = report.deleted,
            "Re-indexed scopes"
        );
        Ok(report)
    }

    /// Remove documents by id. Unknown ids are ignored.
    pub fn delete_by_keys(&self, keys: &[String]) -> Result<usize> {
        let _pass = self.pass_lock.lock();
        self.delete_chunked(keys, |chunk| self.index.delete_by_ids(chunk))
    }

    /// Remove every document of the given parents. Unknown parents are ignored.
    pub fn delete_by_parent_keys(&self, parent_keys: &[String]) -> Result<usize> {
        let _pass = self.pass_lock.lock();
        self.delete_chunked(parent_keys, |chunk| self.index.delete_by_parents(chunk))
    }

    fn bulk_size(&self) -> usize {
        self.config.bulk_size.max(1)
    }

    /// Stream rows of `scope` into the index in batches. Returns the highest
    /// `updated_at` read.
    fn stream(
        &self,
        scope: &RowScope,
        excluded: &HashSet<&str>,
        report: &mut IndexingReport,
        mut seen: Option<&mut HashSet<String>>,
    ) -> Result<Option<i64>> {
        let bulk_size = self.bulk_size();
        let mut batch: Vec<C::Row> = Vec::with_capacity(bulk_size);
        let mut highest: Option<i64> = None;

        self.source.for_each_row(scope, &mut |row| {
            if excluded.contains(row.scope_key()) {
                return Ok(());
            }
            highest = highest.max(Some(row.updated_at()));
            batch.push(row);
            if batch.len() >= bulk_size {
                let rows = std::mem::take(&mut batch);
                self.flush(&rows, report, seen.as_deref_mut())?;
            }
            Ok(())
        })?;

        if !batch.is_empty() {
            self.flush(&batch, report, seen.as_deref_mut())?;
        }
        Ok(highest)
    }

    /// Convert one batch in parallel and write it.
    fn flush(
        &self,
        rows: &[C::Row],
        report: &mut IndexingReport,
        seen: Option<&mut HashSet<String>>,
    ) -> Result<()> {
        let converter = &self.converter;
        let converted: Vec<Vec<C::Doc>> = rows
            .par_iter()
            .map(|row| converter.convert(row))
            .collect::<Result<_>>()?;
        let docs: Vec<C::Doc> = converted.into_iter().flatten().collect();

        if self.converter.owns_parent() {
            report.deleted += self.prune_owned(rows, &docs)?;
        }
        if !docs.is_empty() {
            self.index.bulk_upsert(&docs)?;
        }

        if let Some(seen) = seen {
            seen.extend(docs.iter().map(|doc| doc.id().to_string()));
        }
        report.rows += rows.len();
        report.upserted += docs.len();
        Ok(())
    }

    /// Remove documents owned by `rows` that their new conversion no longer
    /// produces.
    fn prune_owned(&self, rows: &[C::Row], docs: &[C::Doc]) -> Result<usize> {
        let parents: Vec<String> = rows.iter().map(|row| row.row_key()).collect();
        let fresh: HashSet<&str> = docs.iter().map(|doc| doc.id()).collect();
        let stale: Vec<String> = self
            .index
            .ids_by_parent(&parents)?
            .into_iter()
            .filter(|id| !fresh.contains(id.as_str()))
            .collect();
        self.delete_chunked(&stale, |chunk| self.index.delete_by_ids(chunk))
    }

    fn delete_chunked<F>(&self, keys: &[String], delete: F) -> Result<usize>
    where
        F: Fn(&[String]) -> Result<usize>,
    {
        let mut removed = 0;
        for chunk in keys.chunks(self.config.delete_chunk_size.max(1)) {
            removed += delete(chunk)?;
        }
        Ok(removed)
    }

    /// Store `highest` unless the index already has a later watermark.
    fn advance_watermark(&self, highest: Option<i64>) -> Result<Option<i64>> {
        let current = self.index.watermark()?;
        match (current, highest) {
            (Some(current), Some(highest)) if highest <= current => Ok(Some(current)),
            (_, Some(highest)) => {
                self.index.store_watermark(highest)?;
                Ok(Some(highest))
            }
            (current, None) => Ok(current),
        }
    }
}

#[cfg(test)]
#[path = "indexer_tests.rs"]
mod tests;
