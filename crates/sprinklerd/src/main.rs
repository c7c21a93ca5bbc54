//! sprinklerd - The irrigation controller service
//!
//! This is the main entry point for the sprinklerd service.
//! It wires together all the components:
//! - Configuration loading
//! - Zone and schedule stores
//! - Shift register (Raspberry Pi GPIO)
//! - Calendar event source
//! - Scheduler loop
//! - Request socket

mod commands;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use sprinkler_calendar::{EventSource, GoogleCalendar};
use sprinkler_config::load_config;
use sprinkler_core::{Controller, SchedulerLoop};
use sprinkler_gpio::ShiftRegister;
use sprinkler_gpio_pi::PiLines;
use sprinkler_store::{ScheduleStore, ZoneStore, DEFAULT_ZONE_COUNT};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::server::RequestServer;

/// sprinklerd - Irrigation zone control and schedule reconciliation
#[derive(Parser, Debug)]
#[command(name = "sprinklerd")]
#[command(about = "Irrigation zone control and schedule reconciliation", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/sprinklerd/config.toml)
    #[arg(short, long, default_value_os_t = sprinkler_util::default_config_path())]
    config: PathBuf,

    /// Request socket path override (or set SPRINKLER_SOCKET env var)
    #[arg(short, long, env = "SPRINKLER_SOCKET")]
    socket: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let settings = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    info!(
        config_path = %args.config.display(),
        zone_file = %settings.storage.zone_file.display(),
        "Configuration loaded"
    );

    let zones = ZoneStore::open(&settings.storage.zone_file, DEFAULT_ZONE_COUNT);
    let schedule = ScheduleStore::open(&settings.storage.schedule_file);

    // The register starts by writing the persisted status vector so the
    // valves match software state. Hardware failure is not fatal; the
    // daemon keeps serving state changes with writes latched off.
    let pins = settings.gpio;
    let register = match PiLines::open(pins.pin_clk, pins.pin_noe, pins.pin_dat, pins.pin_lat) {
        Ok(lines) => ShiftRegister::new(Box::new(lines), &zones.status_bits()),
        Err(e) => {
            error!(error = %e, "Failed to acquire GPIO lines, running disconnected");
            ShiftRegister::disconnected()
        }
    };

    let controller = Arc::new(Mutex::new(Controller::new(zones, schedule, register)));

    if settings.calendar.api_key.is_none() {
        warn!("No calendar API key configured, schedule polling will fetch unauthenticated");
    }
    let source: Arc<dyn EventSource> = Arc::new(GoogleCalendar::new(
        settings.calendar.base_url.clone(),
        settings.calendar.api_key.clone().unwrap_or_default(),
    ));

    let scheduler = SchedulerLoop::new(
        controller.clone(),
        source,
        settings.calendar.query_delay,
    );
    let loop_handle = scheduler.handle();
    let scheduler_task = tokio::spawn(scheduler.run());

    let socket_path = args
        .socket
        .unwrap_or_else(|| sprinkler_util::default_data_dir().join("sprinklerd.sock"));
    let request_server = RequestServer::bind(&socket_path)?;
    let server_task = tokio::spawn(request_server.run(controller.clone()));

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    info!("Service running");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully");
        }
    }

    // Graceful shutdown: stop taking requests, let the scheduler observe
    // the stop within a sleep slice, then turn everything off.
    server_task.abort();
    loop_handle.stop();
    if tokio::time::timeout(Duration::from_secs(5), scheduler_task)
        .await
        .is_err()
    {
        warn!("Scheduler loop did not stop in time");
    }

    controller.lock().await.shutdown();

    info!("Shutdown complete");
    Ok(())
}
