//! SQLite reference store.
//!
//! [`SqliteStore`] implements every collaborator the engine reads from or
//! writes to: metric and rule lookups, the quality gate tables, project
//! bindings, measures, active rules and file sources.
//!
//! Writes and short lookups go through one writer connection. Quality gate
//! sessions and row streams each open their own read-only connection, so a
//! long indexing pass never holds the writer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexSet;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row};
use tracing::{debug, info};

use crate::core::config::StoreConfig;
use crate::core::errors::{QualgateError, Result};
use crate::gate::condition::Operator;
use crate::gate::measure::{Level, Measure, MeasureValue};
use crate::gate::metric::{Metric, MetricRepository, MetricType};
use crate::gate::repository::{
    ConditionRow, GateBindingLookup, QualityGateDao, QualityGateRow, QualityGateSession,
};
use crate::index::active_rules::ActiveRuleRow;
use crate::index::source::{RowScope, RowSource};
use crate::index::source_lines::FileSourceRow;
use crate::rules::activation::ActiveRuleWriter;
use crate::rules::finder::{RuleDefinition, RuleLoader};

/// Current schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// Scope keys bound by one row-stream statement.
pub(crate) const SCOPE_KEYS_PER_QUERY: usize = 500;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS metrics (
        id INTEGER PRIMARY KEY,
        metric_key TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        value_type TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS quality_gates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        is_default INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS quality_gate_conditions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        gate_id INTEGER NOT NULL REFERENCES quality_gates(id) ON DELETE CASCADE,
        metric_id INTEGER NOT NULL,
        operator TEXT NOT NULL,
        error_threshold TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_conditions_gate ON quality_gate_conditions (gate_id);
    CREATE TABLE IF NOT EXISTS project_gates (
        project_uuid TEXT PRIMARY KEY,
        gate_id INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS measures (
        project_uuid TEXT NOT NULL,
        metric_key TEXT NOT NULL,
        value_type TEXT NOT NULL,
        int_value INTEGER,
        real_value REAL,
        text_value TEXT,
        variation REAL,
        PRIMARY KEY (project_uuid, metric_key)
    );
    CREATE TABLE IF NOT EXISTS rules (
        id INTEGER PRIMARY KEY,
        repository TEXT NOT NULL,
        rule_key TEXT NOT NULL,
        name TEXT NOT NULL,
        language TEXT NOT NULL,
        default_severity TEXT NOT NULL,
        UNIQUE (repository, rule_key)
    );
    CREATE TABLE IF NOT EXISTS active_rules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        profile_key TEXT NOT NULL,
        rule_id INTEGER NOT NULL REFERENCES rules(id),
        severity TEXT,
        inheritance TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE (profile_key, rule_id)
    );
    CREATE INDEX IF NOT EXISTS idx_active_rules_updated ON active_rules (updated_at);
    CREATE TABLE IF NOT EXISTS file_sources (
        file_uuid TEXT PRIMARY KEY,
        project_uuid TEXT NOT NULL,
        line_data TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_file_sources_project ON file_sources (project_uuid);
    CREATE INDEX IF NOT EXISTS idx_file_sources_updated ON file_sources (updated_at);
";

const ACTIVE_RULE_SELECT: &str = "
    SELECT ar.id, ar.profile_key, r.id, r.repository, r.rule_key, r.name, r.language,
           ar.severity, ar.inheritance, ar.created_at, ar.updated_at
    FROM active_rules ar
    JOIN rules r ON r.id = ar.rule_id";

const FILE_SOURCE_SELECT: &str =
    "SELECT project_uuid, file_uuid, updated_at, line_data FROM file_sources";

/// Open a read-write connection with the store pragmas applied.
pub(crate) fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = Connection::open_with_flags(path, flags)
        .map_err(|e| QualgateError::store_operation(format!("Opening {}", path.display()), e))?;
    connection.busy_timeout(busy_timeout)?;
    connection.pragma_update(None, "foreign_keys", "ON")?;
    let mode: String = connection.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    debug!(path = %path.display(), journal_mode = %mode, "Opened SQLite connection");
    connection.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(connection)
}

/// SQLite implementation of the primary store collaborators.
pub struct SqliteStore {
    path: PathBuf,
    busy_timeout: Duration,
    writer: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the store described by `config`.
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                QualgateError::io(format!("Failed to create store directory: {}", parent.display()), e)
            })?;
        }

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let mut connection = open_connection(&config.path, busy_timeout)?;
        initialize_schema(&mut connection)?;
        info!(path = %config.path.display(), "SQLite store ready");

        Ok(Self {
            path: config.path.clone(),
            busy_timeout,
            writer: Mutex::new(connection),
        })
    }

    /// Database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reader(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(&self.path, flags)
            .map_err(|e| QualgateError::store_operation("Opening read session", e))?;
        connection.busy_timeout(self.busy_timeout)?;
        Ok(connection)
    }

    // Metrics

    /// Insert or replace a metric definition.
    pub fn save_metric(&self, metric: &Metric) -> Result<()> {
        self.writer.lock().execute(
            "INSERT OR REPLACE INTO metrics (id, metric_key, name, value_type) VALUES (?1, ?2, ?3, ?4)",
            params![metric.id, metric.key, metric.name, metric.metric_type.as_str()],
        )?;
        Ok(())
    }

    /// Remove a metric. Conditions referencing it are left in place.
    pub fn delete_metric(&self, metric_id: i64) -> Result<bool> {
        let removed = self
            .writer
            .lock()
            .execute("DELETE FROM metrics WHERE id = ?1", params![metric_id])?;
        Ok(removed > 0)
    }

    /// Every stored metric, in id order.
    pub fn load_metrics(&self) -> Result<Vec<Metric>> {
        let connection = self.writer.lock();
        let mut statement =
            connection.prepare("SELECT id, metric_key, name, value_type FROM metrics ORDER BY id")?;
        let raw = statement.query_map([], raw_metric)?.collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(metric_from_raw).collect()
    }

    // Quality gates

    /// Create a gate and return its id.
    pub fn create_quality_gate(&self, name: &str) -> Result<i64> {
        let connection = self.writer.lock();
        connection.execute("INSERT INTO quality_gates (name) VALUES (?1)", params![name])?;
        Ok(connection.last_insert_rowid())
    }

    /// Add a condition to a gate and return its id.
    pub fn add_condition(&self, gate_id: i64, metric_id: i64, operator: Operator, error_threshold: &str) -> Result<i64> {
        let connection = self.writer.lock();
        connection.execute(
            "INSERT INTO quality_gate_conditions (gate_id, metric_id, operator, error_threshold)
             VALUES (?1, ?2, ?3, ?4)",
            params![gate_id, metric_id, operator.code(), error_threshold],
        )?;
        Ok(connection.last_insert_rowid())
    }

    /// Make `gate_id` the default gate, or clear the default with `None`.
    pub fn set_default_gate(&self, gate_id: Option<i64>) -> Result<()> {
        self.writer.lock().execute(
            "UPDATE quality_gates SET is_default = CASE WHEN id = ?1 THEN 1 ELSE 0 END",
            params![gate_id],
        )?;
        Ok(())
    }

    /// Assign a gate to a project, replacing any earlier assignment.
    pub fn bind_project(&self, project_uuid: &str, gate_id: i64) -> Result<()> {
        self.writer.lock().execute(
            "INSERT OR REPLACE INTO project_gates (project_uuid, gate_id) VALUES (?1, ?2)",
            params![project_uuid, gate_id],
        )?;
        Ok(())
    }

    // Measures

    /// Insert or replace the measure of `metric_key` on a project.
    pub fn save_measure(&self, project_uuid: &str, metric_key: &str, measure: &Measure) -> Result<()> {
        let (value_type, int_value, real_value, text_value) = measure_columns(measure.value());
        self.writer.lock().execute(
            "INSERT OR REPLACE INTO measures
                 (project_uuid, metric_key, value_type, int_value, real_value, text_value, variation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project_uuid,
                metric_key,
                value_type,
                int_value,
                real_value,
                text_value,
                measure.variation()
            ],
        )?;
        Ok(())
    }

    /// Every measure of a project, keyed by metric key.
    pub fn project_measures(&self, project_uuid: &str) -> Result<HashMap<String, Measure>> {
        let connection = self.writer.lock();
        let mut statement = connection.prepare(
            "SELECT metric_key, value_type, int_value, real_value, text_value, variation
             FROM measures WHERE project_uuid = ?1",
        )?;
        let mut rows = statement.query(params![project_uuid])?;

        let mut measures = HashMap::new();
        while let Some(row) = rows.next()? {
            let metric_key: String = row.get(0)?;
            let measure = measure_from_row(&metric_key, row)?;
            measures.insert(metric_key, measure);
        }
        Ok(measures)
    }

    // Rules

    /// Insert or replace a rule definition.
    pub fn save_rule(&self, rule: &RuleDefinition) -> Result<()> {
        self.writer.lock().execute(
            "INSERT OR REPLACE INTO rules (id, repository, rule_key, name, language, default_severity)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                rule.id,
                rule.repository,
                rule.key,
                rule.name,
                rule.language,
                rule.default_severity
            ],
        )?;
        Ok(())
    }

    // File sources

    /// Insert or replace the source of one file.
    pub fn save_file_source(&self, source: &FileSourceRow) -> Result<()> {
        self.writer.lock().execute(
            "INSERT OR REPLACE INTO file_sources (file_uuid, project_uuid, line_data, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![source.file_uuid, source.project_uuid, source.line_data, source.updated_at],
        )?;
        Ok(())
    }

    /// Delete the source of a file. Returns whether it existed.
    pub fn delete_file_source(&self, file_uuid: &str) -> Result<bool> {
        let removed = self
            .writer
            .lock()
            .execute("DELETE FROM file_sources WHERE file_uuid = ?1", params![file_uuid])?;
        Ok(removed > 0)
    }

    fn stream_rows<R>(
        &self,
        select: &str,
        columns: ScopeColumns,
        scope: &RowScope,
        map: fn(&Row<'_>) -> rusqlite::Result<R>,
        visit: &mut dyn FnMut(R) -> Result<()>,
    ) -> Result<()> {
        let connection = self.reader()?;
        let RowScope::Scopes(keys) = scope else {
            return query_rows(&connection, select, columns, scope, map, visit);
        };

        // One statement per chunk keeps the bound variables under SQLite's limit.
        let keys: Vec<String> = keys.iter().cloned().collect::<IndexSet<_>>().into_iter().collect();
        for chunk in keys.chunks(SCOPE_KEYS_PER_QUERY) {
            query_rows(&connection, select, columns, &RowScope::Scopes(chunk.to_vec()), map, visit)?;
        }
        Ok(())
    }
}

fn query_rows<R>(
    connection: &Connection,
    select: &str,
    columns: ScopeColumns,
    scope: &RowScope,
    map: fn(&Row<'_>) -> rusqlite::Result<R>,
    visit: &mut dyn FnMut(R) -> Result<()>,
) -> Result<()> {
    let (filter, values) = scope_filter(columns, scope);
    let mut statement = connection.prepare(&format!("{select}{filter}"))?;
    let mut rows = statement.query(params_from_iter(values))?;
    while let Some(row) = rows.next()? {
        visit(map(row)?)?;
    }
    Ok(())
}

fn initialize_schema(connection: &mut Connection) -> Result<()> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", [], |row| row.get(0))
        .optional()?;

    match version {
        None => {
            tx.execute_batch(SCHEMA)?;
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(QualgateError::store(format!(
                "Unsupported store schema version {other} (expected {SCHEMA_VERSION})"
            )))
        }
    }
    tx.commit()?;
    Ok(())
}

#[derive(Clone, Copy)]
struct ScopeColumns {
    updated_at: &'static str,
    scope: &'static str,
}

const ACTIVE_RULE_COLUMNS: ScopeColumns = ScopeColumns {
    updated_at: "ar.updated_at",
    scope: "ar.profile_key",
};

const FILE_SOURCE_COLUMNS: ScopeColumns = ScopeColumns {
    updated_at: "updated_at",
    scope: "project_uuid",
};

fn scope_filter(columns: ScopeColumns, scope: &RowScope) -> (String, Vec<Value>) {
    match scope {
        RowScope::All => (String::new(), Vec::new()),
        RowScope::UpdatedSince(since) => (
            format!(" WHERE {} >= ?1", columns.updated_at),
            vec![Value::Integer(*since)],
        ),
        RowScope::Scopes(keys) if keys.is_empty() => (" WHERE 0".to_string(), Vec::new()),
        RowScope::Scopes(keys) => {
            let placeholders: Vec<String> = (1..=keys.len()).map(|i| format!("?{i}")).collect();
            (
                format!(" WHERE {} IN ({})", columns.scope, placeholders.join(", ")),
                keys.iter().cloned().map(Value::Text).collect(),
            )
        }
    }
}

type RawMetric = (i64, String, String, String);

fn raw_metric(row: &Row<'_>) -> rusqlite::Result<RawMetric> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn metric_from_raw((id, key, name, value_type): RawMetric) -> Result<Metric> {
    let metric_type = value_type.parse::<MetricType>().map_err(|_| {
        QualgateError::configuration_for_metric(format!("Unknown value type '{value_type}' of metric {key}"), key.clone())
    })?;
    Ok(Metric::new(id, key, name, metric_type))
}

fn measure_columns(value: &MeasureValue) -> (&'static str, Option<i64>, Option<f64>, Option<String>) {
    match value {
        MeasureValue::NoValue => ("NO_VALUE", None, None, None),
        MeasureValue::Int(v) => ("INT", Some(i64::from(*v)), None, None),
        MeasureValue::Long(v) => ("LONG", Some(*v), None, None),
        MeasureValue::Double(v) => ("DOUBLE", None, Some(*v), None),
        MeasureValue::Level(level) => ("LEVEL", None, None, Some(level.as_str().to_string())),
        MeasureValue::String(text) => ("STRING", None, None, Some(text.clone())),
    }
}

fn measure_from_row(metric_key: &str, row: &Row<'_>) -> Result<Measure> {
    let value_type: String = row.get(1)?;
    let int_value: Option<i64> = row.get(2)?;
    let real_value: Option<f64> = row.get(3)?;
    let text_value: Option<String> = row.get(4)?;
    let variation: Option<f64> = row.get(5)?;

    let corrupt = || QualgateError::store(format!("Corrupt {value_type} measure of metric {metric_key}"));
    let value = match value_type.as_str() {
        "NO_VALUE" => MeasureValue::NoValue,
        "INT" => MeasureValue::Int(int_value.and_then(|v| i32::try_from(v).ok()).ok_or_else(corrupt)?),
        "LONG" => MeasureValue::Long(int_value.ok_or_else(corrupt)?),
        "DOUBLE" => MeasureValue::Double(real_value.ok_or_else(corrupt)?),
        "LEVEL" => MeasureValue::Level(text_value.ok_or_else(corrupt)?.parse::<Level>()?),
        "STRING" => MeasureValue::String(text_value.ok_or_else(corrupt)?),
        _ => return Err(corrupt()),
    };

    let measure = Measure::new(value);
    Ok(match variation {
        Some(variation) => measure.with_variation(variation),
        None => measure,
    })
}

fn active_rule_from_row(row: &Row<'_>) -> rusqlite::Result<ActiveRuleRow> {
    Ok(ActiveRuleRow {
        id: row.get(0)?,
        profile_key: row.get(1)?,
        rule_id: row.get(2)?,
        rule_repository: row.get(3)?,
        rule_key: row.get(4)?,
        rule_name: row.get(5)?,
        language: row.get(6)?,
        severity: row.get(7)?,
        inheritance: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn file_source_from_row(row: &Row<'_>) -> rusqlite::Result<FileSourceRow> {
    Ok(FileSourceRow {
        project_uuid: row.get(0)?,
        file_uuid: row.get(1)?,
        updated_at: row.get(2)?,
        line_data: row.get(3)?,
    })
}

impl MetricRepository for SqliteStore {
    fn find_by_id(&self, id: i64) -> Result<Option<Arc<Metric>>> {
        let raw = self
            .writer
            .lock()
            .query_row(
                "SELECT id, metric_key, name, value_type FROM metrics WHERE id = ?1",
                params![id],
                raw_metric,
            )
            .optional()?;
        raw.map(|raw| metric_from_raw(raw).map(Arc::new)).transpose()
    }

    fn find_by_key(&self, key: &str) -> Result<Option<Arc<Metric>>> {
        let raw = self
            .writer
            .lock()
            .query_row(
                "SELECT id, metric_key, name, value_type FROM metrics WHERE metric_key = ?1",
                params![key],
                raw_metric,
            )
            .optional()?;
        raw.map(|raw| metric_from_raw(raw).map(Arc::new)).transpose()
    }
}

/// Read-only session on the quality gate tables.
struct SqliteGateSession {
    connection: Connection,
}

impl QualityGateSession for SqliteGateSession {
    fn select_gate(&mut self, gate_id: i64) -> Result<Option<QualityGateRow>> {
        Ok(self
            .connection
            .query_row(
                "SELECT id, name FROM quality_gates WHERE id = ?1",
                params![gate_id],
                |row| {
                    Ok(QualityGateRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn select_conditions(&mut self, gate_id: i64) -> Result<Vec<ConditionRow>> {
        let mut statement = self.connection.prepare(
            "SELECT id, gate_id, metric_id, operator, error_threshold
             FROM quality_gate_conditions WHERE gate_id = ?1 ORDER BY id",
        )?;
        let rows = statement.query_map(params![gate_id], |row| {
            Ok(ConditionRow {
                id: row.get(0)?,
                gate_id: row.get(1)?,
                metric_id: row.get(2)?,
                operator: row.get(3)?,
                error_threshold: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl QualityGateDao for SqliteStore {
    fn open_session(&self) -> Result<Box<dyn QualityGateSession + '_>> {
        Ok(Box::new(SqliteGateSession {
            connection: self.reader()?,
        }))
    }
}

impl GateBindingLookup for SqliteStore {
    fn project_gate_id(&self, project_uuid: &str) -> Result<Option<i64>> {
        Ok(self
            .writer
            .lock()
            .query_row(
                "SELECT gate_id FROM project_gates WHERE project_uuid = ?1",
                params![project_uuid],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn default_gate_id(&self) -> Result<Option<i64>> {
        Ok(self
            .writer
            .lock()
            .query_row(
                "SELECT id FROM quality_gates WHERE is_default = 1 ORDER BY id LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?)
    }
}

impl RuleLoader for SqliteStore {
    fn load_rules(&self) -> Result<Vec<RuleDefinition>> {
        let connection = self.writer.lock();
        let mut statement = connection.prepare(
            "SELECT id, repository, rule_key, name, language, default_severity FROM rules ORDER BY id",
        )?;
        let rows = statement.query_map([], |row| {
            Ok(RuleDefinition {
                id: row.get(0)?,
                repository: row.get(1)?,
                key: row.get(2)?,
                name: row.get(3)?,
                language: row.get(4)?,
                default_severity: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl ActiveRuleWriter for SqliteStore {
    fn save_activation(
        &self,
        profile_key: &str,
        rule: &RuleDefinition,
        severity: Option<&str>,
        now: i64,
    ) -> Result<(ActiveRuleRow, bool)> {
        let mut connection = self.writer.lock();
        let tx = connection.transaction()?;

        let existing: Option<(i64, i64, Option<String>)> = tx
            .query_row(
                "SELECT id, created_at, inheritance FROM active_rules WHERE profile_key = ?1 AND rule_id = ?2",
                params![profile_key, rule.id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (id, created_at, inheritance, created) = match existing {
            Some((id, created_at, inheritance)) => {
                tx.execute(
                    "UPDATE active_rules SET severity = ?1, updated_at = ?2 WHERE id = ?3",
                    params![severity, now, id],
                )?;
                (id, created_at, inheritance, false)
            }
            None => {
                tx.execute(
                    "INSERT INTO active_rules (profile_key, rule_id, severity, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?4)",
                    params![profile_key, rule.id, severity, now],
                )?;
                (tx.last_insert_rowid(), now, None, true)
            }
        };
        tx.commit()?;

        let row = ActiveRuleRow {
            id,
            profile_key: profile_key.to_string(),
            rule_id: rule.id,
            rule_repository: rule.repository.clone(),
            rule_key: rule.key.clone(),
            rule_name: rule.name.clone(),
            language: rule.language.clone(),
            severity: severity.map(str::to_string),
            inheritance,
            created_at,
            updated_at: now,
        };
        Ok((row, created))
    }

    fn delete_activation(&self, profile_key: &str, rule_id: i64) -> Result<Option<i64>> {
        let mut connection = self.writer.lock();
        let tx = connection.transaction()?;
        let id: Option<i64> = tx
            .query_row(
                "SELECT id FROM active_rules WHERE profile_key = ?1 AND rule_id = ?2",
                params![profile_key, rule_id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = id {
            tx.execute("DELETE FROM active_rules WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(id)
    }

    fn delete_profile(&self, profile_key: &str) -> Result<usize> {
        Ok(self
            .writer
            .lock()
            .execute("DELETE FROM active_rules WHERE profile_key = ?1", params![profile_key])?)
    }
}

impl RowSource<ActiveRuleRow> for SqliteStore {
    fn for_each_row(&self, scope: &RowScope, visit: &mut dyn FnMut(ActiveRuleRow) -> Result<()>) -> Result<()> {
        self.stream_rows(ACTIVE_RULE_SELECT, ACTIVE_RULE_COLUMNS, scope, active_rule_from_row, visit)
    }
}

impl RowSource<FileSourceRow> for SqliteStore {
    fn for_each_row(&self, scope: &RowScope, visit: &mut dyn FnMut(FileSourceRow) -> Result<()>) -> Result<()> {
        self.stream_rows(FILE_SOURCE_SELECT, FILE_SOURCE_COLUMNS, scope, file_source_from_row, visit)
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
