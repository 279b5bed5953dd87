use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Failed => "FAILED",
        }
    }
}

/// Body of `GET /api/status`. Flat on purpose; every field is already
/// formatted for display so degraded values render as their sentinels.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: &'static str,
    pub button_color: &'static str,
    pub temperature: String,
    pub datetime: String,
    pub ip: String,
    pub station: String,
    pub ext_temperature: String,
    pub ext_heatindex: String,
    #[serde(rename = "ext_RH")]
    pub ext_rh: String,
    pub ext_pressure: String,
    pub ext_dewpoint: String,
    pub ext_visibility: String,
    pub ext_weather: String,
    pub version: &'static str,
}
