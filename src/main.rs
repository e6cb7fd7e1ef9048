//! # Prop Link
//!
//! Runs one end of the flight computer <-> propulsion board link.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with a non-blocking tracing subscriber
//!    - Load configuration (first argument, or `config/default.toml`)
//!    - Open the serial device (configured port, then defaults) and spawn
//!      the reader and writer tasks
//!
//! 2. **Main Loop** (every tick at `tick_rate_hz`)
//!    - Move received bytes into the RX FIFO
//!    - Receive: decode capsules, merge the latest packet
//!    - Transmit: queue one capsule if it fits
//!    - Hand the TX FIFO to the writer task without waiting on the port
//!    - Report link staleness transitions
//!
//! 3. **Graceful Shutdown** on Ctrl+C
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use prop_link::capsule::CapsuleCodec;
use prop_link::config::{Config, RoleKind};
use prop_link::dictionary::ObjectDictionary;
use prop_link::link::{AvionicsRole, DuplexPump, LinkRole, PropulsionRole, MAX_PACKET_SIZE};
use prop_link::serial::{self, BufferedChannel, LinkSerial};
use prop_link::telemetry::TelemetryLogger;

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Ticks between link status log messages
const STATUS_INTERVAL_TICKS: u64 = 1000;

/// Period of one loop tick
fn tick_period(tick_rate_hz: u32) -> Duration {
    Duration::from_micros(1_000_000 / u64::from(tick_rate_hz.max(1)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let (log_writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(log_writer)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Prop Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path).with_context(|| format!("loading {}", config_path))?
    } else {
        warn!("{} not found, using built-in defaults", config_path);
        Config::default()
    };

    let link_serial = LinkSerial::open(&config.serial.port, config.serial.baud_rate)?;
    info!("Link serial port opened at: {}", link_serial.device_path());

    match config.link.role {
        RoleKind::Avionics => run::<AvionicsRole>(&config, link_serial).await,
        RoleKind::Propulsion => run::<PropulsionRole>(&config, link_serial).await,
    }
}

async fn run<R: LinkRole>(config: &Config, link_serial: LinkSerial) -> Result<()> {
    let mut channel = BufferedChannel::new(config.link.tx_buffer_size, config.link.rx_buffer_size);
    let mut io = link_serial.spawn(channel.in_flight());

    let codec = CapsuleCodec::with_max_payload(MAX_PACKET_SIZE);
    let mut pump = DuplexPump::<R>::with_packet_id(codec, config.link.packet_id);
    let mut dict = ObjectDictionary::new();

    let mut telemetry = if config.telemetry.enabled {
        Some(TelemetryLogger::new(&config.telemetry)?)
    } else {
        None
    };

    let mut tick = interval(tick_period(config.link.tick_rate_hz));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut log_tick = interval(Duration::from_millis(config.telemetry.log_interval_ms));
    let stale_timeout = Duration::from_millis(config.link.stale_timeout_ms);

    info!(
        "Running {} link at {}Hz (packet id {})",
        R::NAME,
        config.link.tick_rate_hz,
        config.link.packet_id
    );
    info!("Press Ctrl+C to exit");

    let mut ticks: u64 = 0;
    let mut stale = true;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                serial::drain_into(&mut io.rx, &mut channel);
                pump.receive(&mut channel, &mut dict);
                pump.transmit(&mut channel, &dict);

                if let Err(e) = serial::flush_channel(&io.tx, &mut channel) {
                    warn!("{}", e);
                }

                let now_stale = pump.is_stale(Instant::now(), stale_timeout);
                if now_stale != stale {
                    if now_stale {
                        warn!("No packet from the remote end for {:?}", stale_timeout);
                    } else {
                        info!("Link up");
                    }
                    stale = now_stale;
                }

                ticks += 1;
                if ticks % STATUS_INTERVAL_TICKS == 0 {
                    let stats = pump.stats();
                    info!(
                        "sent={} deferred={} received={} discarded={} crc_errors={} length_errors={} rx_overflows={}",
                        stats.frames_sent,
                        stats.tx_deferred,
                        stats.frames_received,
                        stats.frames_discarded,
                        stats.crc_errors,
                        stats.length_errors,
                        channel.rx_overflows()
                    );
                }
            }

            _ = log_tick.tick(), if telemetry.is_some() => {
                if let Some(logger) = telemetry.as_mut() {
                    if let Err(e) = logger.log(R::NAME, &dict, &pump.stats()) {
                        warn!("Telemetry write failed: {}", e);
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total capsules sent: {}", pump.stats().frames_sent);
                break;
            }
        }
    }

    io.abort();
    if let Some(mut logger) = telemetry {
        logger.flush()?;
    }

    Ok(())
}
