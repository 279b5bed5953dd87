use std::time::Duration;

use anyhow::{anyhow, Context};
use tracing::{info, warn};

use garage_common::{DeviceConfig, NetworkConfig};

use crate::clock::{SystemClock, WallClock};
use crate::device::Device;
use crate::hal::{LoggingActuator, SimulatedDieSensor, SimulatedReferenceSensor, SimulatedSonar};
use crate::net::{ConnectionSupervisor, WlanInterface};
use crate::server::{self, AppState};
use crate::weather::WeatherService;

/// Bounded wait before the process restarts itself on a terminal error.
pub const RESTART_DELAY: Duration = Duration::from_secs(5);
/// Exit code the process supervisor treats as "relaunch me" (the hosted
/// equivalent of a hardware reset).
pub const RESTART_EXIT_CODE: i32 = 10;

const CONNECTIVITY_POLL: Duration = Duration::from_secs(1);

/// Boot → connect → serve forever → detect connectivity loss. Every terminal
/// condition surfaces as an `Err`; `main` owns the single restart boundary.
pub async fn run() -> anyhow::Result<()> {
    init_tracing(serial_debug_from_env());
    info!("garage controller v{} starting", server::VERSION);

    let mut config = device_config_from_env();
    config.sanitize();

    let network = network_config_from_env()?;

    let mut connection = ConnectionSupervisor::new(Box::new(WlanInterface::new(network)));
    let ip = connection
        .connect()
        .await
        .context("WiFi startup failed")?;

    let device = Device::new(
        &config,
        Some(Box::new(SimulatedSonar::from_env())),
        Box::new(SimulatedDieSensor::new()),
        SimulatedReferenceSensor::from_env()
            .map(|sensor| Box::new(sensor) as Box<dyn crate::hal::ExternalTemperatureSensor>),
        Box::new(LoggingActuator),
    );

    let weather = WeatherService::new(
        &config.station,
        Duration::from_millis(config.weather_timeout_ms),
    )?;

    let state = AppState {
        device: std::sync::Arc::new(tokio::sync::Mutex::new(device)),
        weather: std::sync::Arc::new(weather),
        clock: std::sync::Arc::new(WallClock::new(config.tz_offset_hours, Box::new(SystemClock))),
        ip: ip.to_string(),
    };

    let web_root = format!("{}/web", env!("CARGO_MANIFEST_DIR"));

    tokio::select! {
        result = server::serve(state, &web_root, config.http_port) => {
            result.and(Err(anyhow!("status server exited unexpectedly")))
        }
        err = watch_connectivity(connection) => Err(err),
    }
}

/// Liveness watchdog over the established link. Fires the restart path the
/// moment the network drops, even while a request is in flight.
async fn watch_connectivity(connection: ConnectionSupervisor) -> anyhow::Error {
    let mut interval = tokio::time::interval(CONNECTIVITY_POLL);
    loop {
        interval.tick().await;
        if !connection.is_connected() {
            return anyhow!("WiFi connection lost");
        }
    }
}

fn init_tracing(serial_debug: bool) {
    let default_level = if serial_debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn serial_debug_from_env() -> bool {
    match std::env::var("SERIAL_DEBUG") {
        Ok(raw) => !matches!(raw.as_str(), "0" | "false" | "off"),
        Err(_) => DeviceConfig::default().serial_debug,
    }
}

fn device_config_from_env() -> DeviceConfig {
    let mut config = DeviceConfig::default();

    match std::env::var("TRIGGER_DISTANCE") {
        Ok(raw) => match raw.parse::<f32>() {
            Ok(value) => config.trigger_distance_cm = value,
            Err(_) => warn!("invalid TRIGGER_DISTANCE `{raw}`, using default"),
        },
        Err(_) => warn!("TRIGGER_DISTANCE not set, using default"),
    }

    if let Ok(station) = std::env::var("STATION") {
        config.station = station;
    }

    config.serial_debug = serial_debug_from_env();

    if let Ok(raw) = std::env::var("TZ_OFFSET_HOURS") {
        match raw.parse::<i32>() {
            Ok(value) => config.tz_offset_hours = value,
            Err(_) => warn!("invalid TZ_OFFSET_HOURS `{raw}`, using default"),
        }
    }

    if let Ok(raw) = std::env::var("HTTP_PORT") {
        match raw.parse::<u16>() {
            Ok(value) => config.http_port = value,
            Err(_) => warn!("invalid HTTP_PORT `{raw}`, using default"),
        }
    }

    config
}

/// Missing credentials are a configuration fault: fatal at startup, no
/// degraded mode.
fn network_config_from_env() -> anyhow::Result<NetworkConfig> {
    let wifi_ssid = std::env::var("WIFI_SSID").unwrap_or_default();
    let wifi_pass = std::env::var("WIFI_PASSWORD").unwrap_or_default();

    let network = NetworkConfig {
        wifi_ssid,
        wifi_pass,
    };
    if !network.has_credentials() {
        return Err(anyhow!("WiFi credentials not found"));
    }
    Ok(network)
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::net::{LinkError, NetworkLink};

    struct DroppingLink {
        probes_until_down: Arc<AtomicU32>,
    }

    impl NetworkLink for DroppingLink {
        fn associate(&mut self) -> Result<(), LinkError> {
            Ok(())
        }

        fn is_up(&self) -> bool {
            self.probes_until_down.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or(0)
                > 0
        }

        fn ip_address(&self) -> Option<IpAddr> {
            None
        }
    }

    #[tokio::test(start_paused = true)]
    async fn watchdog_trips_when_the_link_drops() {
        let link = DroppingLink {
            probes_until_down: Arc::new(AtomicU32::new(3)),
        };
        let connection = ConnectionSupervisor::new(Box::new(link));

        let started = tokio::time::Instant::now();
        let err = watch_connectivity(connection).await;

        assert!(err.to_string().contains("connection lost"));
        // Three healthy probes at one-second cadence, then the trip.
        assert!(started.elapsed() <= Duration::from_secs(4));
    }
}
