//! surged: the SurgeGrid daemon.
//!
//! Single binary that assembles the simulator per region:
//! - Capacity catalog with the region's pricing
//! - Regional controller (placement, scaling, accounting)
//! - Bus ingestion loop
//! - Synthetic traffic generator
//!
//! Regions are fully independent; each gets its own controller, channel,
//! and tasks.
//!
//! # Usage
//!
//! ```text
//! surged run --config surge.toml --report-dir ./reports
//! ```

mod traffic;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tracing::info;

use surge_core::SimConfig;
use surgegrid_controller::{ControllerSettings, RegionController};
use surgegrid_ingest::run_region;
use surgegrid_report::{ConsoleSink, FileSink, ReportSink};

#[derive(Parser)]
#[command(name = "surged", about = "SurgeGrid regional autoscaling simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the simulator with one controller per configured region.
    Run {
        /// Path to a surge.toml; the built-in defaults are used when absent.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Comma-separated region list overriding the configured one.
        #[arg(long, value_delimiter = ',')]
        regions: Vec<String>,

        /// Simulated seconds per real second, overriding the configured value.
        #[arg(long)]
        scale_factor: Option<f64>,

        /// Write per-region report files into this directory instead of stdout.
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Print the built-in default configuration as TOML.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,surged=debug,surgegrid=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            regions,
            scale_factor,
            report_dir,
        } => run(config, regions, scale_factor, report_dir).await,
        Command::DefaultConfig => {
            print!("{}", toml::to_string_pretty(&SimConfig::default())?);
            Ok(())
        }
    }
}

async fn run(
    config_path: Option<PathBuf>,
    regions: Vec<String>,
    scale_factor: Option<f64>,
    report_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => SimConfig::from_file(path)?,
        None => SimConfig::default(),
    };
    if !regions.is_empty() {
        config.simulation.regions = regions;
    }
    if let Some(scale) = scale_factor {
        config.simulation.time_scale = scale;
    }
    config.validate()?;

    info!(
        regions = config.simulation.regions.len(),
        time_scale = config.simulation.time_scale,
        "surged starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut region_handles = Vec::new();

    for region in &config.simulation.regions {
        let catalog = config.catalog_for_region(region)?;
        let sink: Arc<dyn ReportSink> = match &report_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Arc::new(FileSink::open(&dir.join(format!("{region}.log")))?)
            }
            None => Arc::new(ConsoleSink),
        };

        let controller = RegionController::new(
            region,
            catalog,
            ControllerSettings::from(&config.simulation),
            sink,
        );
        info!(%region, "regional controller initialized");

        let (bus_tx, bus_rx) = mpsc::channel(1024);

        let ingest = tokio::spawn(run_region(
            controller,
            bus_rx,
            shutdown_rx.clone(),
            config.simulation.default_execution_secs,
        ));
        let generator = tokio::spawn(traffic::run_generator(
            region.clone(),
            bus_tx,
            config.simulation.clone(),
            config.traffic.clone(),
            shutdown_rx.clone(),
        ));
        region_handles.push((ingest, generator));
    }

    info!("surged running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    for (ingest, generator) in region_handles {
        let _ = generator.await;
        let _ = ingest.await;
    }

    info!("surged stopped");
    Ok(())
}
