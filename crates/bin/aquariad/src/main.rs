//! # aquariad: aquarium controller daemon
//!
//! Composition root that wires all adapters together and runs the control
//! loop.
//!
//! ## Responsibilities
//! - Parse settings (CLI flags, env vars, `aquaria.toml`)
//! - Load the config and schedule files into a registry
//! - Construct the process, VCD and JSON-over-TCP adapters
//! - Bind the protocol port and serve until SIGINT/SIGTERM
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

use aquaria_adapter_config_file::LoadOptions;
use aquaria_adapter_json_tcp::Server;
use aquaria_adapter_process::{ProcessAcquirer, ProcessActuator};
use aquaria_adapter_vcd::VcdLog;
use aquaria_app::scheduler::Scheduler;

use crate::config::Settings;

const DEFAULT_DATA_DIR: &str = "/etc/aquaria";

#[derive(Debug, Parser)]
#[command(name = "aquariad", version, about = "Aquarium controller daemon")]
struct Cli {
    /// Directory holding aquaria.toml, the config file and the schedule file
    #[arg(short = 'd', long = "datadir", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// TCP port for protocol clients
    #[arg(short, long)]
    port: Option<u16>,

    /// Write a VCD waveform log to this file
    #[arg(short = 'v', long = "vcdlog")]
    vcd_log: Option<PathBuf>,

    /// Track device state without running device helpers
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn apply(self, settings: &mut Settings) -> PathBuf {
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(path) = self.vcd_log {
            settings.files.vcd_log = Some(path);
        }
        settings.actuation.dry_run |= self.dry_run;
        self.data_dir
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.data_dir)
        .with_context(|| format!("loading settings from {}", cli.data_dir.display()))?;
    let data_dir = cli.apply(&mut settings);
    settings.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&settings.logging.filter))
        .init();

    let options = LoadOptions {
        dry_run: settings.actuation.dry_run,
    };
    let registry = aquaria_adapter_config_file::load(
        &settings.config_path(&data_dir),
        &settings.schedule_path(&data_dir),
        options,
    )?;

    let log = open_vcd_log(&settings, &data_dir)?;
    let scheduler = Scheduler::new(ProcessAcquirer::new(), ProcessActuator::new(), log);

    let bind_addr = settings.bind_addr();
    let server = Server::bind(&bind_addr, registry, scheduler)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(
        addr = %bind_addr,
        dry_run = options.dry_run,
        "aquariad started"
    );

    let registry = server.serve(shutdown_signal()).await?;
    tracing::info!(devices = registry.devices().count(), "aquariad stopped");
    Ok(())
}

fn open_vcd_log(
    settings: &Settings,
    data_dir: &Path,
) -> anyhow::Result<Option<VcdLog<BufWriter<File>>>> {
    let Some(path) = settings.vcd_log_path(data_dir) else {
        return Ok(None);
    };
    let log = VcdLog::create(&path).with_context(|| format!("creating {}", path.display()))?;
    Ok(Some(log))
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "cannot listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
    tracing::info!("shutdown requested");
}
