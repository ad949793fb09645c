//! # flowgraph-cli
//!
//! Command-line runner for the bundled workflows.
//!
//! Logs go to stderr and are filtered through `RUST_LOG` (default `info`);
//! results go to stdout. `run` exits with status 1 when the run does not
//! complete.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use flowgraph_core::RunStatus;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Run {
            workflow,
            code,
            file,
            state,
            trace,
            review,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let graph = commands::build_workflow(
                workflow,
                &commands::review_config(&config, &review),
            )?;
            let initial = commands::initial_state(state.as_deref(), code, file.as_ref())?;

            let (run, rendered) = commands::run(config, graph, initial, trace).await?;
            println!("{}", rendered);
            if run.status() != RunStatus::Completed {
                tracing::warn!(
                    run_id = %run.run_id(),
                    status = %run.status(),
                    "Run did not complete"
                );
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Describe {
            workflow,
            format,
            review,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let graph = commands::build_workflow(
                workflow,
                &commands::review_config(&config, &review),
            )?;
            println!("{}", commands::describe(&graph, format)?);
        }
        Commands::Tools => {
            print!("{}", commands::list_tools());
        }
    }

    Ok(ExitCode::SUCCESS)
}
