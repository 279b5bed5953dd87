use std::time::Duration;

use tracing::{debug, warn};

use garage_common::{
    CalibrationFilter, DeviceConfig, DoorClassifier, DoorState, TemperatureEstimate,
    TemperatureSource,
};

use crate::hal::{
    ActuatorError, DieTemperatureSensor, DistanceSensor, DoorActuator, ExternalTemperatureSensor,
};

const SONAR_ATTEMPTS: u32 = 3;

/// Owns every hardware handle and all calibration state. Callers serialize
/// behind one mutex, so sensor reads and the actuator pulse never overlap.
pub struct Device {
    sonar: Option<Box<dyn DistanceSensor>>,
    die_sensor: Box<dyn DieTemperatureSensor>,
    external_sensor: Option<Box<dyn ExternalTemperatureSensor>>,
    actuator: Box<dyn DoorActuator>,
    classifier: DoorClassifier,
    calibration: CalibrationFilter,
    retry_delay: Duration,
    pulse_hold: Duration,
    pulse_settle: Duration,
}

impl Device {
    pub fn new(
        config: &DeviceConfig,
        sonar: Option<Box<dyn DistanceSensor>>,
        mut die_sensor: Box<dyn DieTemperatureSensor>,
        mut external_sensor: Option<Box<dyn ExternalTemperatureSensor>>,
        actuator: Box<dyn DoorActuator>,
    ) -> Self {
        // Seed the bias with one direct delta so the adjusted fallback has
        // something to work with before the first fused read.
        let calibration = match external_sensor.as_mut() {
            Some(sensor) => match sensor.read_celsius() {
                Ok(reference) => {
                    CalibrationFilter::with_seed(die_sensor.read_celsius() - reference)
                }
                Err(err) => {
                    warn!("reference temperature sensor unavailable at startup: {err}");
                    CalibrationFilter::new()
                }
            },
            None => CalibrationFilter::new(),
        };

        Self {
            sonar,
            die_sensor,
            external_sensor,
            actuator,
            classifier: DoorClassifier::new(config.trigger_distance_cm),
            calibration,
            retry_delay: Duration::from_millis(config.sonar_retry_delay_ms),
            pulse_hold: Duration::from_millis(config.pulse_hold_ms),
            pulse_settle: Duration::from_millis(config.pulse_settle_ms),
        }
    }

    /// Classify the door from a fresh sonar sample. Transient faults are
    /// retried twice with a short pause; exhaustion degrades to `Unknown`.
    pub async fn door_state(&mut self) -> DoorState {
        let Some(sonar) = self.sonar.as_mut() else {
            warn!("sonar not initialized");
            return DoorState::Unknown;
        };

        for attempt in 1..=SONAR_ATTEMPTS {
            match sonar.read_distance() {
                Ok(distance) => {
                    debug!("distance: {distance:.1} cm");
                    return self.classifier.classify(distance);
                }
                Err(err) => {
                    warn!("sonar read failed on attempt {attempt}/{SONAR_ATTEMPTS}: {err}");
                    if attempt < SONAR_ATTEMPTS {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        warn!("sonar status not available");
        DoorState::Unknown
    }

    /// Best-effort ambient temperature. Prefers the external reference and
    /// feeds the calibration filter on every successful dual read; falls back
    /// to the bias-corrected die sensor when the reference fails.
    pub fn temperature(&mut self) -> TemperatureEstimate {
        let die = self.die_sensor.read_celsius();

        match self.external_sensor.as_mut() {
            Some(sensor) => match sensor.read_celsius() {
                Ok(reference) => {
                    self.calibration.record(die - reference);
                    debug!(
                        "die/reference delta averaged to {:.2} over {} samples",
                        self.calibration.offset(),
                        self.calibration.samples()
                    );
                    TemperatureEstimate {
                        celsius: reference,
                        source: TemperatureSource::ExternalSensor,
                    }
                }
                Err(err) => {
                    warn!("reference sensor read failed, using adjusted die reading: {err}");
                    TemperatureEstimate {
                        celsius: die - self.calibration.offset(),
                        source: TemperatureSource::CpuAdjusted,
                    }
                }
            },
            None => match self.calibration.adjusted(die) {
                Some(celsius) => TemperatureEstimate {
                    celsius,
                    source: TemperatureSource::CpuAdjusted,
                },
                None => TemperatureEstimate {
                    celsius: die,
                    source: TemperatureSource::CpuRaw,
                },
            },
        }
    }

    /// Pulse the opener control line: assert, hold, release, settle. Blocks
    /// the device for the full duration; a concurrent request waits its turn.
    pub async fn pulse_door(&mut self) -> Result<(), ActuatorError> {
        self.actuator.set_signal(true)?;
        tokio::time::sleep(self.pulse_hold).await;
        self.actuator.set_signal(false)?;
        tokio::time::sleep(self.pulse_settle).await;
        Ok(())
    }

    pub fn calibration_offset(&self) -> f32 {
        self.calibration.offset()
    }
}
