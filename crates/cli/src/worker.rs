//! Sensor worker thread
//!
//! Opened sensors do blocking USB transfers, so they are moved onto a
//! dedicated thread. The Tokio runtime drives it through the channel
//! bridge: every `Sample` command reads each sensor once, and `Shutdown`
//! closes every sensor before the thread exits.
//!
//! A `Shutdown` takes effect before any `Sample` still queued behind the
//! read in progress, so a stalled probe delays closing by at most one
//! transfer timeout.

use common::{SensorCommand, SensorEvent, SensorId, SensorWorker};
use driver::Sensor;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Sensor worker thread state
pub struct SensorWorkerThread {
    sensors: Vec<(SensorId, Box<dyn Sensor + Send>)>,
    worker: SensorWorker,
    /// Commands pulled off the channel while looking for `Shutdown`
    backlog: VecDeque<SensorCommand>,
}

impl SensorWorkerThread {
    pub fn new(worker: SensorWorker, sensors: Vec<Box<dyn Sensor + Send>>) -> Self {
        let sensors = sensors
            .into_iter()
            .enumerate()
            .map(|(i, s)| (SensorId(i as u32), s))
            .collect();
        Self {
            sensors,
            worker,
            backlog: VecDeque::new(),
        }
    }

    /// Process commands until `Shutdown` or the runtime side goes away
    pub fn run(mut self) {
        info!("Sensor worker started with {} sensor(s)", self.sensors.len());

        loop {
            let command = match self.backlog.pop_front() {
                Some(command) => Ok(command),
                None => self.worker.recv_command(),
            };
            match command {
                Ok(SensorCommand::Sample) => {
                    if !self.sample_all() {
                        info!("Sensor worker shutting down with samples pending");
                        break;
                    }
                }
                Ok(SensorCommand::Shutdown) => {
                    info!("Sensor worker shutting down");
                    break;
                }
                Err(e) => {
                    debug!("Command channel closed: {}", e);
                    break;
                }
            }
        }

        self.close_all();
        info!("Sensor worker stopped");
    }

    /// Move queued commands into the backlog and report whether one of
    /// them is `Shutdown`
    fn shutdown_requested(&mut self) -> bool {
        while let Some(command) = self.worker.try_recv_command() {
            self.backlog.push_back(command);
        }
        self.backlog.contains(&SensorCommand::Shutdown)
    }

    /// Read every sensor once; returns false when a shutdown cut it short
    fn sample_all(&mut self) -> bool {
        for i in 0..self.sensors.len() {
            if self.shutdown_requested() {
                return false;
            }
            let (id, sensor) = &mut self.sensors[i];
            let id = *id;
            let event = match sensor.read_temperatures() {
                Ok(reading) => SensorEvent::Reading { sensor: id, reading },
                Err(e) => {
                    warn!("{}: {}", id, e);
                    SensorEvent::ReadFailed {
                        sensor: id,
                        error: e.to_string(),
                    }
                }
            };

            if let Err(e) = self.worker.send_event(event) {
                debug!("Dropping event for {}: {}", id, e);
            }
        }
        !self.shutdown_requested()
    }

    fn close_all(&mut self) {
        for (id, sensor) in &mut self.sensors {
            if !sensor.is_open() {
                continue;
            }
            if let Err(e) = sensor.close() {
                warn!("Failed to close {}: {}", id, e);
                continue;
            }
            debug!("Closed {} ({})", id, sensor.model().name());
            // The runtime may already be gone during shutdown
            let _ = self.worker.send_event(SensorEvent::Closed { sensor: *id });
        }
    }
}

/// Spawn the sensor worker thread
pub fn spawn_sensor_worker(
    worker: SensorWorker,
    sensors: Vec<Box<dyn Sensor + Send>>,
) -> std::io::Result<std::thread::JoinHandle<()>> {
    std::thread::Builder::new()
        .name("sensor-worker".to_string())
        .spawn(move || SensorWorkerThread::new(worker, sensors).run())
}
