//! Hardware seams. Real drivers (HC-SR04 sonar, MCP9808 reference sensor,
//! the door relay line) implement these traits on the device target; the
//! simulated implementations below keep hosted runs and tests honest.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor read timed out")]
    Timeout,
    #[error("transient sensor fault: {0}")]
    Transient(String),
    #[error("sensor not responding")]
    NotResponding,
}

#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("control line fault: {0}")]
    Line(String),
}

pub trait DistanceSensor: Send {
    /// Range to the nearest reflective surface, in centimeters.
    fn read_distance(&mut self) -> Result<f32, SensorError>;
}

pub trait DieTemperatureSensor: Send {
    /// On-die temperature in Celsius. The die runs hot; readings are only
    /// useful after bias correction.
    fn read_celsius(&mut self) -> f32;
}

pub trait ExternalTemperatureSensor: Send {
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

pub trait DoorActuator: Send {
    fn set_signal(&mut self, asserted: bool) -> Result<(), ActuatorError>;
}

// Hardware integration point: replace these simulated peripherals with the
// HC-SR04 / MCP9808 / GPIO drivers when building for the device target.

pub struct SimulatedSonar {
    distance_cm: f32,
}

impl SimulatedSonar {
    pub fn from_env() -> Self {
        let distance_cm = std::env::var("SIM_DISTANCE_CM")
            .ok()
            .and_then(|value| value.parse::<f32>().ok())
            .unwrap_or(35.0);
        Self { distance_cm }
    }
}

impl DistanceSensor for SimulatedSonar {
    fn read_distance(&mut self) -> Result<f32, SensorError> {
        Ok(self.distance_cm)
    }
}

pub struct SimulatedDieSensor {
    tick: u32,
}

impl SimulatedDieSensor {
    pub fn new() -> Self {
        Self { tick: 0 }
    }
}

impl DieTemperatureSensor for SimulatedDieSensor {
    fn read_celsius(&mut self) -> f32 {
        self.tick = self.tick.wrapping_add(1);
        27.0 + (self.tick % 8) as f32 * 0.2
    }
}

pub struct SimulatedReferenceSensor {
    tick: u32,
}

impl SimulatedReferenceSensor {
    pub fn from_env() -> Option<Self> {
        match std::env::var("SIM_EXTERNAL_SENSOR").as_deref() {
            Ok("0") | Ok("off") => None,
            _ => Some(Self { tick: 0 }),
        }
    }
}

impl ExternalTemperatureSensor for SimulatedReferenceSensor {
    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.tick = self.tick.wrapping_add(1);
        Ok(21.0 + (self.tick % 6) as f32 * 0.1)
    }
}

/// Logs transitions instead of driving a relay.
pub struct LoggingActuator;

impl DoorActuator for LoggingActuator {
    fn set_signal(&mut self, asserted: bool) -> Result<(), ActuatorError> {
        info!(
            "door control line {}",
            if asserted { "asserted" } else { "released" }
        );
        Ok(())
    }
}
