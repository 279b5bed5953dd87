use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureSource {
    ExternalSensor,
    CpuAdjusted,
    CpuRaw,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureEstimate {
    pub celsius: f32,
    pub source: TemperatureSource,
}

impl fmt::Display for TemperatureEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            TemperatureSource::ExternalSensor => write!(f, "{:.1} \u{b0}C", self.celsius),
            TemperatureSource::CpuAdjusted => {
                write!(f, "{:.1} \u{b0}C (CPU adj.)", self.celsius)
            }
            TemperatureSource::CpuRaw => write!(f, "{:.1} \u{b0}C (CPU raw)", self.celsius),
        }
    }
}

/// Running calibration of the internal die sensor against a precise external
/// reference.
///
/// The die sensor runs hot by a roughly constant bias. While the external
/// sensor responds, each successful dual read feeds `delta = internal - external`
/// into a bounded moving average; once the reference fails, `internal - offset`
/// keeps estimating ambient temperature with the learned bias.
///
/// The sample count `n` weights the average as `(offset*n + delta) / (n + 1)`
/// and is clamped from 20 back to 10 before an update, so a new sample never
/// carries less than 1/11 weight and the average never fully freezes.
#[derive(Debug, Clone, Copy)]
pub struct CalibrationFilter {
    offset: f32,
    samples: u32,
}

impl Default for CalibrationFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationFilter {
    pub fn new() -> Self {
        Self {
            offset: 0.0,
            samples: 1,
        }
    }

    /// Seed from a single direct delta taken at startup. The sample count is
    /// left at 1, so `adjusted` stays unavailable until a fused read lands.
    pub fn with_seed(offset: f32) -> Self {
        Self { offset, samples: 1 }
    }

    pub fn record(&mut self, delta: f32) {
        if self.samples >= 20 {
            self.samples = 10;
        }
        let n = self.samples as f32;
        self.offset = (self.offset * n + delta) / (n + 1.0);
        self.samples += 1;
    }

    /// Bias-corrected internal reading, available once at least one fused
    /// sample has been recorded and a non-zero offset exists.
    pub fn adjusted(&self, internal: f32) -> Option<f32> {
        if self.samples > 1 && self.offset != 0.0 {
            Some(internal - self.offset)
        } else {
            None
        }
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}
