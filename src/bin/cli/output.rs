//! Console output for gate verdicts, indexing reports and configuration.

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{settings::Style as TableStyle, Table, Tabled};

use qualgate_rs::core::config::QualgateConfig;
use qualgate_rs::gate::{EvaluatedQualityGate, Level};
use qualgate_rs::index::IndexingReport;

/// Report of one index, as printed.
#[derive(Serialize)]
pub struct NamedReport {
    pub index: &'static str,
    #[serde(flatten)]
    pub report: IndexingReport,
}

fn level_label(level: Level) -> String {
    match level {
        Level::Ok => "✅ OK".green().to_string(),
        Level::Warn => "⚠️  WARN".yellow().to_string(),
        Level::Error => "❌ ERROR".red().bold().to_string(),
    }
}

/// Print a gate verdict with one row per condition.
pub fn display_verdict(project: &str, verdict: &EvaluatedQualityGate) {
    println!(
        "{} {} {}",
        "🚦 Quality gate".bright_blue().bold(),
        verdict.gate_name.cyan(),
        format!("(project {project})").dimmed()
    );
    println!();

    if verdict.conditions.is_empty() {
        println!("{}", "   Gate has no conditions".dimmed());
    } else {
        #[derive(Tabled)]
        struct ConditionRow {
            metric: String,
            operator: String,
            threshold: String,
            value: String,
            status: String,
        }

        let rows: Vec<ConditionRow> = verdict
            .conditions
            .iter()
            .map(|condition| ConditionRow {
                metric: condition.metric_key.clone(),
                operator: condition.operator.to_string(),
                threshold: condition.error_threshold.clone(),
                value: condition
                    .value
                    .as_ref()
                    .map_or_else(|| "-".to_string(), ToString::to_string),
                status: level_label(condition.level),
            })
            .collect();

        let mut table = Table::new(rows);
        table.with(TableStyle::rounded());
        println!("{table}");
    }

    println!();
    println!("{} {}", "Verdict:".bold(), level_label(verdict.level));
    let failed = verdict.failed_conditions().count();
    if failed > 0 {
        println!("   {failed} condition(s) failed");
    }
}

/// Print indexing reports as a table.
pub fn display_reports(reports: &[NamedReport]) {
    #[derive(Tabled)]
    struct ReportRow {
        index: String,
        rows: usize,
        upserted: usize,
        deleted: usize,
        skipped: bool,
        watermark: String,
    }

    let rows: Vec<ReportRow> = reports
        .iter()
        .map(|named| ReportRow {
            index: named.index.to_string(),
            rows: named.report.rows,
            upserted: named.report.upserted,
            deleted: named.report.deleted,
            skipped: named.report.skipped,
            watermark: named
                .report
                .watermark
                .map_or_else(|| "-".to_string(), |w| w.to_string()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");
}

/// Print the effective settings of a configuration.
pub fn display_config_summary(config: &QualgateConfig) {
    #[derive(Tabled)]
    struct SettingRow {
        setting: &'static str,
        value: String,
    }

    let rows = vec![
        SettingRow {
            setting: "indexing.bulk_size",
            value: config.indexing.bulk_size.to_string(),
        },
        SettingRow {
            setting: "indexing.delete_chunk_size",
            value: config.indexing.delete_chunk_size.to_string(),
        },
        SettingRow {
            setting: "indexing.force_startup_indexing",
            value: config.indexing.force_startup_indexing.to_string(),
        },
        SettingRow {
            setting: "store.path",
            value: config.store.path.display().to_string(),
        },
        SettingRow {
            setting: "store.busy_timeout_ms",
            value: config.store.busy_timeout_ms.to_string(),
        },
        SettingRow {
            setting: "logging.level",
            value: config.logging.level.clone(),
        },
        SettingRow {
            setting: "logging.format",
            value: format!("{:?}", config.logging.format).to_lowercase(),
        },
    ];

    let mut table = Table::new(rows);
    table.with(TableStyle::rounded());
    println!("{table}");
}
