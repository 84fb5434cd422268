//! Core module - Configuration, errors and common types

mod config;
mod error;
mod types;

pub use config::{AutostartConfig, Config, GeneralConfig, GpsConfig, PinctrlConfig, TelemetryConfig, TrayConfig};
pub use error::{Error, Result};
pub use types::{Level, PinState, PowerDelta, PowerSample, RailReading};
pub(crate) use types::round2;
