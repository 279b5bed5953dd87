use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Sentinel substituted for any field that is missing or not usable.
pub const MISSING: &str = "--";

#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("malformed observation document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// One fetch of a weather-station observation, every field pre-formatted for
/// display. Snapshots are never merged; a degraded fetch yields
/// [`WeatherSnapshot::missing`] rather than carrying forward stale values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherSnapshot {
    pub temperature: String,
    pub heat_index: String,
    pub relative_humidity: String,
    pub sea_level_pressure: String,
    pub dew_point: String,
    pub visibility: String,
    pub station_name: String,
    pub present_weather: String,
}

impl WeatherSnapshot {
    pub fn missing() -> Self {
        Self {
            temperature: MISSING.to_string(),
            heat_index: MISSING.to_string(),
            relative_humidity: MISSING.to_string(),
            sea_level_pressure: MISSING.to_string(),
            dew_point: MISSING.to_string(),
            visibility: MISSING.to_string(),
            station_name: MISSING.to_string(),
            present_weather: MISSING.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ObservationDocument {
    properties: ObservationProperties,
}

#[derive(Debug, Default, Deserialize)]
struct ObservationProperties {
    #[serde(default)]
    temperature: Measurement,
    #[serde(default, rename = "heatIndex")]
    heat_index: Measurement,
    #[serde(default, rename = "relativeHumidity")]
    relative_humidity: Measurement,
    #[serde(default, rename = "seaLevelPressure")]
    sea_level_pressure: Measurement,
    #[serde(default)]
    dewpoint: Measurement,
    #[serde(default)]
    visibility: Measurement,
    #[serde(default, rename = "stationName")]
    station_name: Option<String>,
    #[serde(default, rename = "presentWeather")]
    present_weather: Vec<PresentWeather>,
}

#[derive(Debug, Default, Deserialize)]
struct Measurement {
    #[serde(default)]
    value: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct PresentWeather {
    #[serde(default)]
    weather: Option<String>,
}

/// Parse a geo+json observation body.
///
/// Per-field leniency: a null, absent, or non-numeric value becomes the
/// sentinel. Structural breakage (no `properties` object, wrong top-level
/// shape) is an error; the caller degrades the whole snapshot.
pub fn parse_observation(body: &str) -> Result<WeatherSnapshot, ObservationError> {
    let document: ObservationDocument = serde_json::from_str(body)?;
    let properties = document.properties;

    let snapshot = WeatherSnapshot {
        temperature: format_measurement(&properties.temperature, 1),
        heat_index: format_measurement(&properties.heat_index, 1),
        relative_humidity: format_measurement(&properties.relative_humidity, 0),
        sea_level_pressure: format_measurement(&properties.sea_level_pressure, 0),
        dew_point: format_measurement(&properties.dewpoint, 1),
        visibility: format_measurement(&properties.visibility, 0),
        station_name: properties.station_name.unwrap_or_else(|| MISSING.to_string()),
        present_weather: properties
            .present_weather
            .into_iter()
            .next()
            .and_then(|entry| entry.weather)
            .unwrap_or_else(|| MISSING.to_string()),
    };

    Ok(snapshot)
}

fn format_measurement(measurement: &Measurement, decimals: usize) -> String {
    match measurement.value.as_ref().and_then(coerce_number) {
        Some(value) => format!("{value:.decimals$}"),
        None => MISSING.to_string(),
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}
