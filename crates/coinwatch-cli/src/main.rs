mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use coinwatch_core::{Dashboard, FaultBarrier};

use crate::cli::Cli;
use crate::commands::StdinConfirm;
use crate::error::CliError;
use crate::output::Envelope;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_json);

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

/// A faulted command is not re-run: it may already have written local state
/// and queued a push. The error points the user at `coinwatch reset`.
fn command_barrier() -> FaultBarrier {
    FaultBarrier::new(1)
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let config = cli.app_config()?;
    let dashboard = Arc::new(Dashboard::builder(config).build()?);
    let confirm = StdinConfirm::new(cli.yes);

    let outcome = command_barrier()
        .run(|| {
            let dashboard = Arc::clone(&dashboard);
            let command = cli.command.clone();
            async move { commands::run(&dashboard, &command, &confirm).await }
        })
        .await;

    // Queued watchlist pushes must land before the process exits.
    dashboard.shutdown().await;

    let envelope = Envelope::from_output(outcome??)?;
    tracing::debug!(command = envelope.command, request_id = %envelope.request_id, "command completed");
    output::render(&envelope, cli.pretty)?;
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn faulted_commands_run_exactly_once() {
        let runs = Arc::new(AtomicU32::new(0));

        let outcome: Result<(), _> = command_barrier()
            .run(|| {
                let runs = Arc::clone(&runs);
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    panic!("watchlist add blew up after saving");
                }
            })
            .await;

        let error = CliError::from(outcome.unwrap_err());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(error.exit_code(), 5);
        assert!(error.to_string().contains("coinwatch reset"));
    }
}
