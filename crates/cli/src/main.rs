//! pcsensor
//!
//! Reads PCsensor TEMPer2 USB thermometers and prints the inner and outer
//! probe temperatures at a fixed interval.

mod config;
mod output;
mod worker;

use anyhow::{Context, Result, bail};
use clap::Parser;
use common::{SensorBridge, SensorCommand, SensorEvent, create_sensor_bridge, setup_logging};
use config::{Config, OutputFormat};
use driver::{RusbTransport, Sensor, SensorModel};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use worker::spawn_sensor_worker;

#[derive(Parser, Debug)]
#[command(name = "pcsensor")]
#[command(author, version, about = "Read PCsensor TEMPer2 USB thermometers")]
#[command(long_about = "
Reads the inner and outer probes of PCsensor TEMPer2 USB thermometers.

EXAMPLES:
    # Print one reading per second from every attached sensor
    pcsensor

    # Print a single reading and exit
    pcsensor --once

    # Emit JSON lines every 5 seconds
    pcsensor --json --interval 5000

    # List USB devices and mark supported sensors
    pcsensor --list-devices

CONFIGURATION:
    The configuration file is looked up in the following order:
    1. Path specified with --config
    2. ~/.config/pcsensor/pcsensor.toml
    3. /etc/pcsensor/pcsensor.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List USB devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Print one reading per sensor and exit
    #[arg(long)]
    once: bool,

    /// Poll interval in milliseconds
    #[arg(short, long, value_name = "MS")]
    interval: Option<u64>,

    /// Print readings as JSON lines
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Args {
    /// Apply command line overrides on top of the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(interval) = self.interval {
            config.sensor.poll_interval_ms = interval;
        }
        if self.json {
            config.output.format = OutputFormat::Json;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = Config::default();
        let path = Config::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut config = if let Some(ref path) = args.config {
        config::load_config(path).context("Failed to load configuration")?
    } else {
        Config::load_or_default().context("Failed to load configuration")?
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    setup_logging(&config.general.log_level).context("Failed to setup logging")?;
    info!("pcsensor v{}", env!("CARGO_PKG_VERSION"));

    let transport = RusbTransport::with_timeout(config.sensor.timeout())
        .context("Failed to initialize libusb")?;

    if args.list_devices {
        return list_devices_mode(&transport);
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let opening = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || open_sensors(&transport, &config))
    };
    let Some(sensors) = open_until_shutdown(opening, shutdown.as_mut()).await? else {
        return Ok(());
    };
    if sensors.is_empty() {
        bail!("no sensor found");
    }
    let sensor_count = sensors.len();
    info!("Opened {} sensor(s)", sensor_count);

    let (bridge, worker) = create_sensor_bridge();
    let worker_handle =
        spawn_sensor_worker(worker, sensors).context("Failed to spawn sensor worker thread")?;

    let run = async {
        if args.once {
            sample_once(&bridge, sensor_count, config.output.format).await
        } else {
            info!("Press Ctrl+C to stop");
            run_polling(&bridge, sensor_count, &config).await
        }
    };
    let result = tokio::select! {
        result = run => result,
        _ = shutdown.as_mut() => {
            info!("Received shutdown signal, stopping...");
            Ok(())
        }
    };

    info!("Closing sensors...");
    if let Err(e) = shutdown_sensor_worker(&bridge).await {
        error!("Error shutting down sensor worker: {:#}", e);
    }
    drain_closed(&bridge).await;

    if let Err(e) = worker_handle.join() {
        error!("Sensor worker thread panicked: {:?}", e);
    }

    result
}

/// List USB devices and exit
fn list_devices_mode(transport: &RusbTransport) -> Result<()> {
    let devices = transport
        .list_devices()
        .context("Failed to enumerate USB devices")?;

    if devices.is_empty() {
        println!("No USB devices found.");
        return Ok(());
    }

    println!("Found {} USB device(s):\n", devices.len());
    for device in devices {
        let marker = match device.model {
            Some(model) => format!("  [supported: {}]", model.name()),
            None => String::new(),
        };
        println!(
            "  Bus {:03} Device {:03} {}{}",
            device.bus_number, device.address, device.identity, marker
        );
    }

    Ok(())
}

/// Open and initialize the sensors selected by the configuration
fn open_sensors(transport: &RusbTransport, config: &Config) -> Result<Vec<Box<dyn Sensor + Send>>> {
    let mut sensors = if config.sensor.all_devices {
        driver::discover_all(transport).context("Failed to open sensors")?
    } else {
        match driver::open(transport) {
            Ok(handle) => vec![Box::new(handle) as Box<dyn Sensor + Send>],
            Err(driver::SensorError::NotFound { identity }) => {
                warn!("No {} attached", identity);
                Vec::new()
            }
            Err(e) => return Err(e).context(format!("Failed to open {}", SensorModel::Temper2)),
        }
    };

    for sensor in &mut sensors {
        sensor.set_decode_scale(config.sensor.decode_scale);
    }
    Ok(sensors)
}

/// Wait for the sensors to open unless a shutdown signal arrives first
///
/// The handshake cannot be interrupted, so after a signal the open task is
/// still awaited and whatever it opened is closed before returning `None`.
async fn open_until_shutdown<F>(
    mut opening: JoinHandle<Result<Vec<Box<dyn Sensor + Send>>>>,
    shutdown: Pin<&mut F>,
) -> Result<Option<Vec<Box<dyn Sensor + Send>>>>
where
    F: Future<Output = ()>,
{
    tokio::select! {
        result = &mut opening => {
            let sensors = result.context("Sensor open task failed")??;
            Ok(Some(sensors))
        }
        _ = shutdown => {
            info!("Received shutdown signal while opening sensors");
            match opening.await {
                Ok(Ok(sensors)) => close_sensors(sensors),
                Ok(Err(e)) => warn!("Opening sensors failed during shutdown: {:#}", e),
                Err(e) => error!("Sensor open task failed: {}", e),
            }
            Ok(None)
        }
    }
}

fn close_sensors(sensors: Vec<Box<dyn Sensor + Send>>) {
    for mut sensor in sensors {
        if let Err(e) = sensor.close() {
            warn!("Failed to close {}: {}", sensor.model(), e);
        }
    }
}

/// Request one reading from every sensor and print the results
async fn sample_once(bridge: &SensorBridge, sensor_count: usize, format: OutputFormat) -> Result<()> {
    bridge
        .send_command(SensorCommand::Sample)
        .await
        .context("Failed to send Sample command")?;

    let mut reported = HashSet::new();
    let mut failed = false;
    while reported.len() < sensor_count {
        let event = bridge
            .recv_event()
            .await
            .context("Sensor worker stopped unexpectedly")?;
        failed |= matches!(event, SensorEvent::ReadFailed { .. });
        if let Some(sensor) = output::sampled_sensor(&event) {
            reported.insert(sensor);
        }
        print_event(format, &event)?;
    }

    if failed {
        bail!("failed to read every sensor");
    }
    Ok(())
}

/// Poll every sensor at the configured interval
///
/// A tick is skipped while the previous sample has not been answered by
/// every sensor, so slow reads never pile up requests in the worker queue.
async fn run_polling(bridge: &SensorBridge, sensor_count: usize, config: &Config) -> Result<()> {
    let mut ticker = tokio::time::interval(config.sensor.poll_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // Events still expected for the outstanding sample
    let mut outstanding = 0usize;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if outstanding > 0 {
                    debug!("Previous sample still in progress, skipping tick");
                    continue;
                }
                bridge
                    .send_command(SensorCommand::Sample)
                    .await
                    .context("Failed to send Sample command")?;
                outstanding = sensor_count;
            }
            event = bridge.recv_event() => {
                let event = event.context("Sensor worker stopped unexpectedly")?;
                if output::sampled_sensor(&event).is_some() {
                    outstanding = outstanding.saturating_sub(1);
                }
                print_event(config.output.format, &event)?;
            }
        }
    }
}

fn print_event(format: OutputFormat, event: &SensorEvent) -> Result<()> {
    if let Some(line) = output::render(format, event)? {
        println!("{}", line);
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Error waiting for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Error installing SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Ask the worker to close every sensor and stop
async fn shutdown_sensor_worker(bridge: &SensorBridge) -> Result<()> {
    bridge
        .send_command(SensorCommand::Shutdown)
        .await
        .context("Failed to send Shutdown command")?;
    Ok(())
}

/// Consume remaining events until the worker drops its side of the bridge
async fn drain_closed(bridge: &SensorBridge) {
    while let Ok(event) = bridge.recv_event().await {
        if let SensorEvent::Closed { sensor } = event {
            info!("Closed {}", sensor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::SensorId;
    use driver::discover_all;
    use driver::testing::RecordingTransport;
    use protocol::TemperatureReading;
    use std::time::Duration;

    fn spawn_open(
        transport: &RecordingTransport,
        delay: Duration,
    ) -> JoinHandle<Result<Vec<Box<dyn Sensor + Send>>>> {
        let transport = transport.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<Box<dyn Sensor + Send>>> {
            std::thread::sleep(delay);
            Ok(discover_all(&transport)?)
        })
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::parse_from(["pcsensor", "--json", "--interval", "250", "-l", "debug"]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.sensor.poll_interval_ms, 250);
        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn test_args_keep_config_values() {
        let args = Args::parse_from(["pcsensor", "--once"]);
        let mut config = Config::default();
        config.sensor.poll_interval_ms = 5000;
        args.apply(&mut config);

        assert!(args.once);
        assert_eq!(config.sensor.poll_interval_ms, 5000);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[tokio::test]
    async fn test_open_completes_without_signal() {
        let transport = RecordingTransport::with_devices(2);
        let shutdown = std::future::pending::<()>();
        tokio::pin!(shutdown);

        let sensors = open_until_shutdown(spawn_open(&transport, Duration::ZERO), shutdown.as_mut())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(transport.close_count(), 0);
        close_sensors(sensors);
    }

    #[tokio::test]
    async fn test_signal_during_open_closes_sensors() {
        let transport = RecordingTransport::with_devices(2);
        let shutdown = std::future::ready(());
        tokio::pin!(shutdown);

        let opened = open_until_shutdown(
            spawn_open(&transport, Duration::from_millis(100)),
            shutdown.as_mut(),
        )
        .await
        .unwrap();
        assert!(opened.is_none());
        assert_eq!(transport.close_count(), 2);
    }

    #[tokio::test]
    async fn test_polling_sends_one_sample_at_a_time() {
        let (bridge, worker) = create_sensor_bridge();
        let mut config = Config::default();
        config.sensor.poll_interval_ms = 10;

        let polled =
            tokio::time::timeout(Duration::from_millis(200), run_polling(&bridge, 1, &config)).await;
        assert!(polled.is_err());

        // Nothing answered, so only the first tick produced a request
        assert_eq!(worker.try_recv_command(), Some(SensorCommand::Sample));
        assert_eq!(worker.try_recv_command(), None);
    }

    #[tokio::test]
    async fn test_polling_waits_for_slow_answers() {
        let (bridge, worker) = create_sensor_bridge();
        let mut config = Config::default();
        config.sensor.poll_interval_ms = 10;

        let responder = std::thread::spawn(move || {
            let mut samples = 0;
            while let Ok(SensorCommand::Sample) = worker.recv_command() {
                samples += 1;
                std::thread::sleep(Duration::from_millis(50));
                let event = SensorEvent::Reading {
                    sensor: SensorId(0),
                    reading: TemperatureReading::new(20.0, 21.0),
                };
                if worker.send_event(event).is_err() {
                    break;
                }
            }
            samples
        });

        let _ =
            tokio::time::timeout(Duration::from_millis(300), run_polling(&bridge, 1, &config)).await;
        bridge.send_command(SensorCommand::Shutdown).await.unwrap();

        let samples = responder.join().unwrap();
        assert!((2..=8).contains(&samples), "{} samples requested", samples);
    }
}
