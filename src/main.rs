//! emergence: run seeded simulations against the emergence network
//!
//! Usage:
//!   emergence simulate --apps 12 --steps 4 --seed 7   → JSON report on stdout
//!   emergence simulate --config network.toml            → custom kinds/scoring
//!   emergence dump-config                               → default config as TOML
//!   emergence version                                   → show version

use clap::{Parser, Subcommand};
use emergence::{SimulationOptions, SimulationReport};
use emergence_network::NetworkConfig;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Parser)]
#[command(
    name = "emergence",
    about = "Application emergence network simulator",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream, link, evolve and merge apps, then print the analysis as JSON
    Simulate {
        /// Number of stream pulls
        #[arg(long, default_value_t = 8)]
        apps: usize,
        /// Evolution steps per streamed app
        #[arg(long, default_value_t = 5)]
        steps: usize,
        /// Minimum level for streamed apps (0.0 - 1.0)
        #[arg(long)]
        threshold: Option<f64>,
        /// RNG seed for streamed attributes
        #[arg(long)]
        seed: Option<u64>,
        /// Path to network config file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write logs to a file (in addition to stderr)
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
    /// Dump default config as TOML
    DumpConfig,
    /// Show version
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate { apps, steps, threshold, seed, config, log_file } => {
            let _guard = init_tracing(log_file.as_deref())?;
            let config = match config {
                Some(path) => NetworkConfig::load(&path),
                None => NetworkConfig::default(),
            };
            let options = SimulationOptions { apps, steps, threshold, seed };
            let report = emergence::run(config, &options)?;
            print_report(&report)?;
        }

        Commands::DumpConfig => {
            println!("{}", NetworkConfig::default().to_toml()?);
        }

        Commands::Version => {
            println!("emergence v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean JSON. The returned guard flushes
/// the file sink on drop.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "emergence=info".into())
    };
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let (file, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("--log-file needs a file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(stderr).with(file).init();
    Ok(guard)
}

fn print_report(report: &SimulationReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
