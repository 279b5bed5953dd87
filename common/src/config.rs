use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub trigger_distance_cm: f32,
    pub station: String,
    pub serial_debug: bool,
    pub tz_offset_hours: i32,
    pub http_port: u16,
    pub pulse_hold_ms: u64,
    pub pulse_settle_ms: u64,
    pub sonar_retry_delay_ms: u64,
    pub weather_timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            trigger_distance_cm: 20.0,
            station: "kbos".to_string(),
            serial_debug: true,
            tz_offset_hours: -5,
            http_port: 80,
            pulse_hold_ms: 4_000,
            pulse_settle_ms: 1_000,
            sonar_retry_delay_ms: 500,
            weather_timeout_ms: 10_000,
        }
    }
}

impl DeviceConfig {
    pub fn sanitize(&mut self) {
        if !self.trigger_distance_cm.is_finite() || self.trigger_distance_cm <= 0.0 {
            self.trigger_distance_cm = 20.0;
        }
        if self.station.trim().is_empty() {
            self.station = "kbos".to_string();
        }
        self.tz_offset_hours = self.tz_offset_hours.clamp(-12, 14);
        // Door hardware revisions need 2-4s on the control line.
        self.pulse_hold_ms = self.pulse_hold_ms.clamp(2_000, 4_000);
        self.pulse_settle_ms = self.pulse_settle_ms.clamp(100, 5_000);
        self.sonar_retry_delay_ms = self.sonar_retry_delay_ms.clamp(100, 2_000);
        self.weather_timeout_ms = self.weather_timeout_ms.clamp(1_000, 30_000);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
}

impl NetworkConfig {
    pub fn has_credentials(&self) -> bool {
        !self.wifi_ssid.trim().is_empty()
    }
}
