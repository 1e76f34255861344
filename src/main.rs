//! Leakage audit - Main Entry Point

use clap::Parser;
use leakage_audit::cli::{cmd_evaluate, cmd_run, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leakage_audit=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { csv, kind, output_dir, config } => {
            cmd_train(&csv, kind, &output_dir, config.as_deref())?;
        }
        Commands::Evaluate { pred_path, ytrue_path, report_path, config } => {
            cmd_evaluate(&pred_path, &ytrue_path, &report_path, config.as_deref())?;
        }
        Commands::Run { csv, kind, output_dir, config } => {
            cmd_run(&csv, kind, &output_dir, config.as_deref())?;
        }
    }

    Ok(())
}
