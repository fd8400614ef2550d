mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flexdiag", about = "Audio backend and ASIO driver diagnostics")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "flexdiag.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the ASIO driver test sequence
    Test {
        /// Driver to test, overriding the configured one
        #[arg(long)]
        driver: Option<String>,
    },
    /// List host APIs and devices
    List {
        #[arg(long, default_value = "cpal")]
        backend: String,
    },
    /// Open a stream and log its callbacks
    Stream {
        #[arg(long, default_value = "cpal")]
        backend: String,

        /// Run time, overriding the configured one
        #[arg(long)]
        seconds: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = flexdiag_core::AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let log_buffer = Arc::new(Mutex::new(VecDeque::<String>::new()));
    let transcript_layer = flexdiag_core::TranscriptLayer::new(
        Arc::clone(&log_buffer),
        config.general.transcript_capacity,
    );

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(transcript_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("flexdiag starting");

    let result = run(cli.command, &mut config).await;

    if let Some(path) = &config.general.transcript_path {
        flexdiag_core::log_layer::write_transcript(&log_buffer, path)
            .with_context(|| format!("failed to write transcript to {:?}", path))?;
        tracing::info!("transcript written to {:?}", path);
    }

    result
}

async fn run(command: Command, config: &mut flexdiag_core::AppConfig) -> Result<ExitCode> {
    match command {
        Command::Test { driver } => {
            if let Some(driver) = driver {
                config.harness.driver = driver;
            }
            let registry = flexdiag_driver::DriverRegistry::new();
            let mut stdout = std::io::stdout();
            let outcome = flexdiag_driver::init_and_run(&registry, config, &mut stdout)
                .await
                .context("driver test failed to run")?;
            match &outcome {
                flexdiag_driver::Outcome::Passed => tracing::info!("driver test passed"),
                flexdiag_driver::Outcome::Failed(step) => {
                    tracing::error!("driver test failed at {}", step)
                }
            }
            Ok(if outcome.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::List { backend } => {
            let backend = commands::create_backend(&backend)?;
            let _logger = commands::backend_logger(&backend, config.general.backend_debug);
            commands::list(&backend, &mut std::io::stdout())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Stream { backend, seconds } => {
            let backend = commands::create_backend(&backend)?;
            let _logger = commands::backend_logger(&backend, config.general.backend_debug);
            let duration = Duration::from_secs(seconds.unwrap_or(config.stream.seconds));
            commands::stream(&backend, &config.stream, duration).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
