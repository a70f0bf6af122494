//! Rendering of sensor events for stdout

use crate::config::OutputFormat;
use anyhow::{Context, Result};
use common::{SensorEvent, SensorId};
use protocol::TemperatureReading;
use serde::Serialize;

#[derive(Serialize)]
struct ReadingRecord<'a> {
    sensor: String,
    #[serde(flatten)]
    reading: &'a TemperatureReading,
}

#[derive(Serialize)]
struct FailureRecord<'a> {
    sensor: String,
    error: &'a str,
}

/// Render one event as a single output line
///
/// Returns `None` for events that produce no output.
pub fn render(format: OutputFormat, event: &SensorEvent) -> Result<Option<String>> {
    let line = match (format, event) {
        (_, SensorEvent::Closed { .. }) => return Ok(None),
        (OutputFormat::Text, SensorEvent::Reading { sensor, reading }) => {
            format!("{}: {}", sensor, reading)
        }
        (OutputFormat::Text, SensorEvent::ReadFailed { sensor, error }) => {
            format!("{}: read failed: {}", sensor, error)
        }
        (OutputFormat::Json, SensorEvent::Reading { sensor, reading }) => {
            to_json(&ReadingRecord {
                sensor: sensor.to_string(),
                reading,
            })?
        }
        (OutputFormat::Json, SensorEvent::ReadFailed { sensor, error }) => {
            to_json(&FailureRecord {
                sensor: sensor.to_string(),
                error,
            })?
        }
    };
    Ok(Some(line))
}

fn to_json<T: Serialize>(record: &T) -> Result<String> {
    serde_json::to_string(record).context("Failed to serialize reading")
}

/// Sensor that answered a `Sample` command with this event
pub fn sampled_sensor(event: &SensorEvent) -> Option<SensorId> {
    match event {
        SensorEvent::Reading { sensor, .. } | SensorEvent::ReadFailed { sensor, .. } => {
            Some(*sensor)
        }
        SensorEvent::Closed { .. } => None,
    }
}
