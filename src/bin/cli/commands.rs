//! Command Execution Logic
//!
//! Each command opens the SQLite store named by the configuration, runs one
//! operation of the library and prints its outcome.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use owo_colors::OwoColorize;
use tracing::info;

use qualgate_rs::core::config::QualgateConfig;
use qualgate_rs::gate::{Level, MetricRegistry, QualityGateEvaluator, QualityGateService, QualityGateServiceImpl};
use qualgate_rs::index::{
    ActiveRuleConverter, ActiveRuleDoc, ActiveRuleIndexer, DocumentConverter, Indexer, IndexingReport,
    SourceLineConverter, SourceLineDoc, SourceLineIndexer, ACTIVE_RULES_INDEX, SOURCE_LINES_INDEX,
};
use qualgate_rs::store::{SqliteSearchIndex, SqliteStore, SCHEMA_VERSION};

use crate::cli::args::{EvaluateArgs, IndexArgs, IndexMode, IndexTarget, ValidateConfigArgs};
use crate::cli::output::{display_config_summary, display_reports, display_verdict, NamedReport};

/// Load and validate the configuration, falling back to defaults.
pub fn load_configuration(path: Option<&Path>) -> anyhow::Result<QualgateConfig> {
    let config = match path {
        Some(path) => QualgateConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => QualgateConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Create the store schema and the index tables.
pub fn init_store(config: &QualgateConfig) -> anyhow::Result<()> {
    let store = SqliteStore::open(&config.store)?;
    SqliteSearchIndex::<ActiveRuleDoc>::open(&config.store, ACTIVE_RULES_INDEX)?;
    SqliteSearchIndex::<SourceLineDoc>::open(&config.store, SOURCE_LINES_INDEX)?;

    println!(
        "{} {}",
        "✅ Store ready:".bright_green().bold(),
        store.path().display().to_string().cyan()
    );
    println!("   Schema version {SCHEMA_VERSION}");
    Ok(())
}

/// Evaluate the effective gate of a project. Exits with code 1 when the gate fails.
pub fn evaluate_command(args: EvaluateArgs, config: &QualgateConfig) -> anyhow::Result<()> {
    let store = Arc::new(SqliteStore::open(&config.store)?);
    let metrics = Arc::new(MetricRegistry::new(store.load_metrics()?));
    let service = QualityGateServiceImpl::new(store.clone(), store.clone(), metrics);

    let gate = service
        .find_effective_quality_gate(&args.project)
        .with_context(|| format!("Failed to resolve the quality gate of project {}", args.project))?;
    let measures = store.project_measures(&args.project)?;
    let verdict = QualityGateEvaluator::new().evaluate(&gate, &measures)?;

    info!(
        project = %args.project,
        gate = %verdict.gate_name,
        level = %verdict.level,
        "Quality gate evaluated"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        display_verdict(&args.project, &verdict);
    }

    if verdict.level == Level::Error {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one indexing pass on the selected indexes.
pub fn index_command(args: IndexArgs, config: &QualgateConfig) -> anyhow::Result<()> {
    let store = Arc::new(SqliteStore::open(&config.store)?);
    let mut indexing = config.indexing.clone();
    indexing.force_startup_indexing |= args.force;

    let mut reports = Vec::new();

    if matches!(args.target, IndexTarget::ActiveRules | IndexTarget::All) {
        let index = Arc::new(SqliteSearchIndex::<ActiveRuleDoc>::open(&config.store, ACTIVE_RULES_INDEX)?);
        let indexer = ActiveRuleIndexer::new(ActiveRuleConverter, store.clone(), index, indexing.clone());
        reports.push(NamedReport {
            index: ACTIVE_RULES_INDEX,
            report: run_pass(&indexer, args.mode, &args.excluded_scopes)?,
        });
    }

    if matches!(args.target, IndexTarget::SourceLines | IndexTarget::All) {
        let index = Arc::new(SqliteSearchIndex::<SourceLineDoc>::open(&config.store, SOURCE_LINES_INDEX)?);
        let indexer = SourceLineIndexer::new(SourceLineConverter, store.clone(), index, indexing.clone());
        reports.push(NamedReport {
            index: SOURCE_LINES_INDEX,
            report: run_pass(&indexer, args.mode, &args.excluded_scopes)?,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        display_reports(&reports);
    }
    Ok(())
}

fn run_pass<C: DocumentConverter>(
    indexer: &Indexer<C>,
    mode: IndexMode,
    excluded_scopes: &[String],
) -> anyhow::Result<IndexingReport> {
    let name = indexer.converter().index_name().to_string();
    let report = match mode {
        IndexMode::Startup => indexer.index_on_startup(excluded_scopes),
        IndexMode::Incremental => indexer.index_incremental(),
    };
    report.with_context(|| format!("Indexing of {name} failed"))
}

/// Print the default configuration in YAML format.
pub fn print_default_config() -> anyhow::Result<()> {
    println!("{}", "# Default qualgate configuration".dimmed());
    println!("{}", "# Save this to a file and customize as needed".dimmed());
    println!("{}", "# Usage: qualgate --config your-config.yml evaluate --project <uuid>".dimmed());
    println!();

    let yaml_output = serde_yaml::to_string(&QualgateConfig::default())?;
    println!("{yaml_output}");
    Ok(())
}

/// Validate a configuration file. Exits with code 1 when it is invalid.
pub fn validate_config(args: &ValidateConfigArgs) -> anyhow::Result<()> {
    println!(
        "{} {}",
        "🔍 Validating configuration:".bright_blue().bold(),
        args.file.display().to_string().cyan()
    );
    println!();

    let config = match load_configuration(Some(&args.file)) {
        Ok(config) => {
            println!("{}", "✅ Configuration file is valid!".bright_green().bold());
            println!();
            config
        }
        Err(e) => {
            eprintln!("{} {:#}", "❌ Configuration validation failed:".red(), e);
            println!();
            println!("{}", "💡 Tip: Use 'qualgate print-default-config' to see valid format".dimmed());
            std::process::exit(1);
        }
    };

    display_config_summary(&config);
    Ok(())
}
