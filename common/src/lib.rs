pub mod config;
pub mod door;
pub mod temperature;
pub mod types;
pub mod weather;

pub use config::{DeviceConfig, NetworkConfig};
pub use door::{DoorClassifier, DoorState};
pub use temperature::{CalibrationFilter, TemperatureEstimate, TemperatureSource};
pub use types::{ConnectionState, StatusReport};
pub use weather::{WeatherSnapshot, MISSING};
