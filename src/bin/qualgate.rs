//! Qualgate CLI - quality gate evaluation and search indexing.

use clap::Parser;

use qualgate_rs::core::telemetry::init_tracing;

mod cli;

use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Configuration commands work without a loadable configuration
    match &cli.command {
        Commands::PrintDefaultConfig => return cli::print_default_config(),
        Commands::ValidateConfig(args) => return cli::validate_config(args),
        _ => {}
    }

    let config = cli::load_configuration(cli.config.as_deref())?;
    init_tracing(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::InitStore => cli::init_store(&config)?,
        Commands::Evaluate(args) => cli::evaluate_command(args, &config)?,
        Commands::Index(args) => cli::index_command(args, &config)?,
        Commands::PrintDefaultConfig | Commands::ValidateConfig(_) => {}
    }

    Ok(())
}
