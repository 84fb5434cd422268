//! Telemetry sources
//!
//! - `power`: rail power from /sys/class/power_supply, plus delta tracking
//! - `gps`: gpsd fix summary and device users for the detailed status view

pub mod gps;
mod power;

pub use gps::{GpsProbe, GpsStatus};
pub use power::{PowerSupplyReader, PowerTracker};

use crate::core::{PowerSample, Result};

/// Trait for power telemetry sources
pub trait PowerSource: Send + Sync {
    /// Take one sample summed over all rails
    fn sample(&self) -> Result<PowerSample>;

    /// Name of this power source
    fn name(&self) -> &str;
}

impl<S: PowerSource + ?Sized> PowerSource for std::sync::Arc<S> {
    fn sample(&self) -> Result<PowerSample> {
        (**self).sample()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
