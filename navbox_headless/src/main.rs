use clap::Parser;
use dirs::data_local_dir;
use fusion::Fusion;
use fusion::source::SerialSource;
use module_core::{Event, EventBus, EventKind, Module};
use push::Push;
use recorder::Recorder;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uplink::Uplink;

mod check;
mod config;

use config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "/etc/navbox/config.json")]
    config: String,
    /// Check that both receivers respond with a recognized sentence and exit
    #[arg(long)]
    check: bool,
}

/// Reads the device identity from the `Serial` entry of `/proc/cpuinfo`.
fn get_device_id() -> String {
    if let Ok(cpuinfo) = std::fs::read_to_string("/proc/cpuinfo") {
        for line in cpuinfo.lines() {
            if let Some(serial) = line.strip_prefix("Serial")
                && let Some((_, value)) = serial.split_once(':')
            {
                return value.trim().to_string();
            }
        }
    }
    warn!("Failed to read device ID, using default");
    "UNKNOWN".to_string()
}

fn get_data_dir() -> Result<PathBuf, ()> {
    let mut data_dir = data_local_dir().ok_or_else(|| {
        error!("Could not determine local data directory");
    })?;
    data_dir.push("navbox");
    Ok(data_dir)
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load(&cli.config).map_err(|e| {
        error!("Failed to load config {}: {}", cli.config, e);
    })?;
    if cli.check {
        return check::run(&config);
    }

    let device_id = get_device_id();
    info!("Device ID: {}", device_id);
    let data_dir = get_data_dir()?;
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        error!(
            "Failed to create data directory {}: {}",
            data_dir.to_string_lossy(),
            e
        );
        return Err(());
    }

    let eb = EventBus::default();
    let quit_sender = eb.context().sender;
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = quit_sender.send(Event {
            kind: EventKind::QuitEvent,
        });
    }) {
        error!("Failed to register interrupt handler: {}", e);
        return Err(());
    }

    let source_a = SerialSource::open("A", &config.gps_port_a, config.baudrate);
    let source_b = SerialSource::open("B", &config.gps_port_b, config.baudrate);
    let mut fusion = Fusion::new(eb.context(), &device_id, source_a, source_b);
    let mut uplink = Uplink::new(
        eb.context(),
        &config.server_url,
        &data_dir.join("retry_queue.json"),
    )
    .map_err(|e| {
        error!("Failed to create uplink module: {}", e);
    })?;
    let mut push = Push::new(eb.context(), config.websocket_port);
    let mut recorder = Recorder::new(eb.context(), &data_dir.join("logs"));

    info!("Starting modules...");
    tokio::join!(fusion.run(), uplink.run(), push.run(), recorder.run()).0
}
