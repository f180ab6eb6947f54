use std::time::Duration;
use tokio::sync::oneshot;

use super::args::{Cli, Commands, ConfigSubcommands};
use super::orchestrator::create_orchestrator;
use crate::capability::types::{Capability, CheckReport, Outcome};
use crate::config::{AppConfig, ConfigWriter, PresenterConfig};
use crate::core::{Result, WardenError};
use crate::logging;

pub async fn run(cli: Cli) -> Result<()> {
    if let Commands::Config { command } = &cli.command {
        return run_config(command);
    }

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };
    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let _guard = logging::init(level, config.log_file.as_deref())?;

    match cli.command {
        Commands::Request {
            capabilities,
            answer,
            delay_ms,
            cancel_after_ms,
        } => {
            let presenter = PresenterConfig {
                answer: answer.unwrap_or(config.presenter.answer),
                delay_ms: delay_ms.unwrap_or(config.presenter.delay_ms),
            };
            let outcome = run_request(
                &config,
                &presenter,
                Capability::parse_all(capabilities)?,
                cancel_after_ms.map(Duration::from_millis),
            )
            .await?;
            print_outcome(&outcome, cli.json)
        }
        Commands::Check { capabilities } => {
            let orchestrator = create_orchestrator(&config, &config.presenter)?;
            let report = orchestrator.check(&Capability::parse_all(capabilities)?)?;
            print_report(&report, cli.json)
        }
        Commands::Config { .. } => Ok(()),
    }
}

async fn run_request(
    config: &AppConfig,
    presenter: &PresenterConfig,
    capabilities: Vec<Capability>,
    cancel_after: Option<Duration>,
) -> Result<Outcome> {
    let orchestrator = create_orchestrator(config, presenter)?;
    let (tx, mut rx) = oneshot::channel();
    let handle = orchestrator.request(capabilities, move |outcome| {
        let _ = tx.send(outcome);
    })?;

    if let Some(timeout) = cancel_after {
        tokio::select! {
            outcome = &mut rx => {
                return outcome.map_err(|_| WardenError::DeliveryContextClosed);
            }
            () = tokio::time::sleep(timeout) => {
                match orchestrator.cancel(&handle) {
                    Ok(()) => tracing::info!(session = %handle.id(), "Request cancelled after timeout"),
                    Err(e) => tracing::debug!("Cancel skipped: {e}"),
                }
            }
        }
    }

    rx.await.map_err(|_| WardenError::DeliveryContextClosed)
}

fn run_config(command: &ConfigSubcommands) -> Result<()> {
    match command {
        ConfigSubcommands::Init => {
            let writer = ConfigWriter::with_default_path().ok_or_else(|| {
                WardenError::Config("Could not determine config directory".to_string())
            })?;
            let path = writer.init_default()?;
            println!("✓ Created config file at {}", path.display());
        }
        ConfigSubcommands::Where => match AppConfig::get_config_path() {
            Some(path) => println!("{}", path.display()),
            None => eprintln!("✗ Could not determine config path"),
        },
    }
    Ok(())
}

fn print_outcome(outcome: &Outcome, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        println!("{outcome}");
    }
    Ok(())
}

fn print_report(report: &CheckReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("granted: {}", join(&report.granted));
    println!("pending: {}", join(&report.pending));
    println!("unknown: {}", join(&report.unknown));
    Ok(())
}

fn join(caps: &[Capability]) -> String {
    caps.iter()
        .map(Capability::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
