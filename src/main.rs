use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use healthwatch::config::{AppConfig, LogFormat, LoggingConfig};
use healthwatch::endpoints::load_endpoints;
use healthwatch::report::format_summary;
use healthwatch::schema::{DirSchemaStore, SchemaStore};
use healthwatch::{CheckRunner, RunOutcome};

#[derive(Parser)]
#[command(
    name = "healthwatch",
    about = "Periodic HTTP endpoint health checks with response schema validation",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML config file (defaults to $HEALTHWATCH_CONFIG, then ./healthwatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the endpoint list file
    #[arg(long, global = true)]
    endpoints: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every check once and write the daily report
    Run {
        /// Print the results as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Run checks repeatedly until interrupted
    Watch {
        /// Milliseconds between run starts (defaults to [schedule].interval_ms)
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Validate the endpoint list and schema references without probing
    CheckConfig,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = AppConfig::resolve(cli.config.as_deref())?;
    init_tracing(&resolved.config.logging);
    resolved.log();

    let mut config = resolved.config;
    if let Some(endpoints) = cli.endpoints {
        config.checks.endpoints_path = endpoints;
    }

    match cli.command {
        Commands::Run { json } => {
            let runner = CheckRunner::from_config(&config)?;
            let outcome = runner.run().await?;

            if json {
                let json_output = serde_json::to_string_pretty(&outcome.report.results)?;
                println!("{}", json_output);
            } else {
                print_outcome(&outcome);
            }

            if let Err(e) = outcome.persisted {
                return Err(e).context("health checks ran but the report was not saved");
            }
        }
        Commands::Watch { interval_ms } => {
            let interval_ms = interval_ms.unwrap_or(config.schedule.interval_ms).max(1);
            let runner = CheckRunner::from_config(&config)?;
            tracing::info!(%interval_ms, "Starting health check watch");

            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                // An interrupted run is dropped before its report is written.
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Interrupted, stopping watch");
                        break;
                    }
                    _ = async {
                        interval.tick().await;
                        if let Err(e) = runner.run().await {
                            tracing::error!(error = %e, "Health check run failed");
                        }
                    } => {}
                }
            }
        }
        Commands::CheckConfig => {
            let path = &config.checks.endpoints_path;
            let endpoints = load_endpoints(path)?;
            let store = DirSchemaStore::new(&config.checks.schema_dir);

            println!("{} endpoint(s) in {}", endpoints.len(), path.display());
            let mut problems = 0;
            for endpoint in &endpoints {
                let schema = match endpoint.schema_ref.as_deref() {
                    None => "-".to_string(),
                    Some(reference) => match store.load(reference) {
                        Ok(_) => reference.to_string(),
                        Err(e) => {
                            problems += 1;
                            format!("{} ({})", reference, e)
                        }
                    },
                };
                println!("{:<7} {:<50} schema: {}", endpoint.method, endpoint.url, schema);
            }

            if problems > 0 {
                anyhow::bail!("{} schema reference(s) could not be loaded", problems);
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    let report = &outcome.report;
    println!("\n=== Health Check Report ({}) ===", report.date());
    for result in &report.results {
        let mark = if result.is_healthy() { "PASS" } else { "FAIL" };
        println!("[{}] {}", mark, format_summary(result));
    }
    println!(
        "\n{} of {} endpoint(s) healthy",
        report.healthy_count(),
        report.len()
    );
    if let Ok(path) = &outcome.persisted {
        println!("Report written to {}", path.display());
    }
    println!();
}
