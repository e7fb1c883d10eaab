use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use capwatch::configuration::types::CaptureConfig;
use capwatch::CaptureService;

#[derive(Parser)]
#[command(name = "capwatch")]
#[command(version)]
#[command(about = "Capture session supervisor and traffic statistics engine")]
struct Args {
    /// Optional TOML configuration file; defaults apply without one.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run one capture session for a bounded wall-clock window.
    Capture {
        /// Interface to listen on; auto-detected when omitted.
        #[arg(long)]
        interface: Option<String>,

        /// Seconds to capture before stopping the session.
        #[arg(long, default_value_t = 10)]
        duration: u64,
    },
    /// Aggregate an existing capture artifact and print the statistics.
    Analyze {
        artifact: PathBuf,

        /// Use the export bounds (wider talker list) instead of the summary.
        #[arg(long, action = clap::ArgAction::SetTrue)]
        export: bool,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match CaptureConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Unable to import configuration from file: {}", e);
                std::process::exit(1);
            }
        },
        None => CaptureConfig::default(),
    };

    let service = CaptureService::new(config);

    match args.command {
        CliCommand::Capture {
            interface,
            duration,
        } => {
            let started = match service
                .start_capture(interface.as_deref(), Some(duration))
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("Capture could not be started: {}", e);
                    std::process::exit(1);
                }
            };
            info!(
                "session {} capturing to {}",
                started.session_id, started.file_name
            );

            // session lifetime is enforced here, not inside the worker
            tokio::time::sleep(std::time::Duration::from_secs(duration)).await;

            if let Ok(stats) = service.get_stats(started.session_id).await {
                info!(
                    "live snapshot: {} packets, {} bytes",
                    stats.packets, stats.total_size
                );
            }

            match service.stop_capture(started.session_id).await {
                Ok(outcome) => match serde_json::to_string_pretty(&outcome) {
                    Ok(rendered) => println!("{}", rendered),
                    Err(e) => error!("Failed to render stop outcome: {}", e),
                },
                Err(e) => {
                    error!("Capture could not be stopped cleanly: {}", e);
                    std::process::exit(1);
                }
            }
        }
        CliCommand::Analyze { artifact, export } => {
            let result = if export {
                service.request_conversion(&artifact)
            } else {
                service.request_analysis(&artifact)
            };
            match result {
                Ok(aggregate) => match serde_json::to_string_pretty(&aggregate) {
                    Ok(rendered) => println!("{}", rendered),
                    Err(e) => error!("Failed to render aggregate: {}", e),
                },
                Err(e) => {
                    error!("Analysis failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
