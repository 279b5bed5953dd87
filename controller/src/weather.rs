use std::time::Duration;

use anyhow::Context;
use tracing::{debug, warn};

use garage_common::weather::{parse_observation, WeatherSnapshot};

pub const DEFAULT_BASE_URL: &str = "https://api.weather.gov";
const ACCEPT_GEO_JSON: &str = "application/geo+json";
const USER_AGENT: &str = concat!(
    "garage-opener/",
    env!("CARGO_PKG_VERSION"),
    " (door controller)"
);

/// Fetches the latest observation for one weather station. Degradation is
/// all-or-nothing: any transport or structural failure yields the
/// all-sentinel snapshot, never a partial one.
pub struct WeatherService {
    client: reqwest::Client,
    base_url: String,
    station: String,
}

impl WeatherService {
    pub fn new(station: &str, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(station, timeout, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(station: &str, timeout: Duration, base_url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build weather HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            station: station.to_string(),
        })
    }

    pub async fn fetch_conditions(&self) -> WeatherSnapshot {
        match self.try_fetch().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("weather fetch degraded to defaults: {err:#}");
                WeatherSnapshot::missing()
            }
        }
    }

    async fn try_fetch(&self) -> anyhow::Result<WeatherSnapshot> {
        let url = format!(
            "{}/stations/{}/observations/latest",
            self.base_url, self.station
        );
        debug!("fetching observation from {url}");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, ACCEPT_GEO_JSON)
            .send()
            .await
            .context("observation request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("observation endpoint returned {status}");
        }

        let body = response
            .text()
            .await
            .context("failed to read observation body")?;

        Ok(parse_observation(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use axum::{routing::get, Router};
    use tokio::net::TcpListener;

    use garage_common::MISSING;

    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(2);

    async fn serve(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn round_trips_a_well_formed_observation() {
        let app = Router::new().route(
            "/stations/kbos/observations/latest",
            get(|| async {
                r#"{
                    "properties": {
                        "stationName": "KBOS",
                        "temperature": {"value": 12.34},
                        "heatIndex": {"value": null},
                        "relativeHumidity": {"value": 67.8},
                        "seaLevelPressure": {"value": 1013.6},
                        "dewpoint": {"value": 6.1},
                        "visibility": {"value": 16093.0},
                        "presentWeather": [{"weather": "haze"}]
                    }
                }"#
            }),
        );
        let base = serve(app).await;

        let service = WeatherService::with_base_url("kbos", TIMEOUT, &base).unwrap();
        let snapshot = service.fetch_conditions().await;

        assert_eq!(snapshot.station_name, "KBOS");
        assert_eq!(snapshot.temperature, "12.3");
        assert_eq!(snapshot.heat_index, MISSING);
        assert_eq!(snapshot.relative_humidity, "68");
        assert_eq!(snapshot.present_weather, "haze");
    }

    #[tokio::test]
    async fn server_error_degrades_entire_snapshot() {
        let app = Router::new().route(
            "/stations/kbos/observations/latest",
            get(|| async {
                (
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "upstream broke",
                )
            }),
        );
        let base = serve(app).await;

        let service = WeatherService::with_base_url("kbos", TIMEOUT, &base).unwrap();
        assert_eq!(service.fetch_conditions().await, WeatherSnapshot::missing());
    }

    #[tokio::test]
    async fn structural_breakage_degrades_entire_snapshot() {
        let app = Router::new().route(
            "/stations/kbos/observations/latest",
            get(|| async { r#"{"unexpected": "shape"}"# }),
        );
        let base = serve(app).await;

        let service = WeatherService::with_base_url("kbos", TIMEOUT, &base).unwrap();
        assert_eq!(service.fetch_conditions().await, WeatherSnapshot::missing());
    }

    #[tokio::test]
    async fn connection_refusal_degrades_entire_snapshot() {
        // Bind to learn a free port, then drop the listener before fetching.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let service = WeatherService::with_base_url("kbos", TIMEOUT, &base).unwrap();
        assert_eq!(service.fetch_conditions().await, WeatherSnapshot::missing());
    }
}
