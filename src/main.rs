//! `livespectrum` command line: run the viewer against the simulated instrument or
//! open a stored snapshot.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use livespectrum::demo::{spawn_demo, DemoOptions};
use livespectrum::persistence::load_snapshot_file;
use livespectrum::{run_live, run_snapshot, LiveSpectrumConfig};

#[derive(Parser)]
#[command(name = "livespectrum")]
#[command(about = "Realtime pulse-height spectrum viewer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live session against the built-in simulated spectrometer
    Demo {
        /// Number of instrument channels
        #[arg(long, default_value_t = 1024)]
        channels: usize,

        /// Time between simulated events in milliseconds
        #[arg(long, default_value_t = 10)]
        period_ms: u64,

        /// Initial bin size
        #[arg(long, default_value_t = 1)]
        bin_size: usize,

        /// Initial display threshold
        #[arg(long, default_value_t = 10)]
        threshold: i64,

        /// Export and clear every SECS seconds
        #[arg(long, value_name = "SECS")]
        autosave: Option<u64>,

        /// Directory autosave writes into
        #[arg(long, default_value = ".")]
        export_dir: PathBuf,
    },

    /// Open an HTML snapshot or a plain-text export read-only
    Open {
        /// Snapshot file
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            channels,
            period_ms,
            bin_size,
            threshold,
            autosave,
            export_dir,
        } => {
            let cfg = LiveSpectrumConfig {
                title: "Live Spectrum (demo)".to_string(),
                bin_size,
                threshold,
                autosave_secs: autosave,
                export_dir,
                ..Default::default()
            };
            // fail on a bad bin size before a thread is started
            cfg.binning()?;
            let (metadata, link, _instrument) = spawn_demo(DemoOptions {
                channels,
                period: Duration::from_millis(period_ms.max(1)),
                seed: None,
            });
            run_live(metadata, link, cfg)
        }
        Commands::Open { file } => {
            let snapshot = load_snapshot_file(&file)?;
            log::info!("opened {}", file.display());
            let cfg = LiveSpectrumConfig {
                title: format!("Live Spectrum: {}", file.display()),
                ..Default::default()
            };
            run_snapshot(snapshot, cfg)
        }
    }
}
