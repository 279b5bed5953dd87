use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::State,
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tokio::{net::TcpListener, sync::Mutex};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use garage_common::{DoorState, StatusReport, TemperatureEstimate, WeatherSnapshot};

use crate::clock::WallClock;
use crate::device::Device;
use crate::weather::WeatherService;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
pub struct AppState {
    pub device: Arc<Mutex<Device>>,
    pub weather: Arc<WeatherService>,
    pub clock: Arc<WallClock>,
    pub ip: String,
}

/// The route table, built once at setup. Static assets (landing page, icons)
/// are delegated to the file-serving fallback.
pub fn build_router(state: AppState, web_root: &str) -> Router {
    let static_files = ServeDir::new(web_root).not_found_service(handle_static_miss.into_service());

    Router::new()
        .route("/run", get(handle_run).post(handle_run))
        .route("/status", get(handle_status))
        .route("/api/status", get(handle_api_status))
        .fallback_service(static_files)
        .with_state(state)
}

pub async fn serve(state: AppState, web_root: &str, port: u16) -> anyhow::Result<()> {
    let app = build_router(state, web_root);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind status server at {addr}"))?;

    info!("listening on http://{addr}");
    axum::serve(listener, app)
        .await
        .context("status server terminated")
}

async fn handle_run(State(state): State<AppState>) -> &'static str {
    info!("door pulse requested via HTTP");
    let result = {
        let mut device = state.device.lock().await;
        device.pulse_door().await
    };
    if let Err(err) = result {
        warn!("door pulse failed: {err}");
    }
    "OK"
}

async fn handle_status() -> &'static str {
    "OK"
}

async fn handle_api_status(State(state): State<AppState>) -> Json<StatusReport> {
    let (door, temperature) = {
        let mut device = state.device.lock().await;
        let door = device.door_state().await;
        let temperature = device.temperature();
        (door, temperature)
    };

    let snapshot = state.weather.fetch_conditions().await;
    let report = compose_status(
        door,
        temperature,
        snapshot,
        state.clock.timestamp(),
        state.ip.clone(),
    );

    Json(report)
}

async fn handle_static_miss() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "File Not Found")
}

fn compose_status(
    door: DoorState,
    temperature: TemperatureEstimate,
    conditions: WeatherSnapshot,
    datetime: String,
    ip: String,
) -> StatusReport {
    let (_, button_color) = door.action_label();

    StatusReport {
        state: door.as_str(),
        button_color,
        temperature: temperature.to_string(),
        datetime,
        ip,
        station: conditions.station_name,
        ext_temperature: format!("{} \u{b0}C", conditions.temperature),
        ext_heatindex: format!("{} \u{b0}C", conditions.heat_index),
        ext_rh: format!("{} %", conditions.relative_humidity),
        ext_pressure: format!("{} mbar", conditions.sea_level_pressure),
        ext_dewpoint: format!("{} \u{b0}C", conditions.dew_point),
        ext_visibility: format!("{} m", conditions.visibility),
        ext_weather: conditions.present_weather,
        version: VERSION,
    }
}
