//! Common types used across the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logic level of a GPIO line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Low,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::High => f.write_str("hi"),
            Level::Low => f.write_str("lo"),
        }
    }
}

/// Level read back from a single line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinState {
    pub line: u8,
    pub level: Level,
}

/// One power-supply rail as exposed under /sys/class/power_supply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RailReading {
    /// Supply name (directory name, e.g. "rpi-pmic" or "BAT0")
    pub name: String,
    /// Voltage in volts, if the rail reports it
    pub voltage: Option<f64>,
    /// Current in amps, if the rail reports it
    pub current: Option<f64>,
    /// Power in watts (|V * I| or power_now)
    pub power: f64,
}

/// A single power telemetry sample summed over all rails
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerSample {
    pub timestamp: DateTime<Utc>,
    /// Total power over all readable rails, rounded to 0.01 W
    pub watts: f64,
    pub rails: Vec<RailReading>,
}

impl PowerSample {
    pub fn new(rails: Vec<RailReading>) -> Self {
        let watts = round2(rails.iter().map(|r| r.power).sum());
        Self {
            timestamp: Utc::now(),
            watts,
            rails,
        }
    }
}

/// Change between two consecutive power samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerDelta {
    /// True difference in watts
    pub watts: f64,
    /// Noise threshold the display value is compared against
    pub threshold: f64,
}

impl PowerDelta {
    /// Delta for display: zero while inside the noise band
    pub fn displayed(&self) -> f64 {
        if self.watts.abs() < self.threshold {
            0.0
        } else {
            self.watts
        }
    }
}

impl fmt::Display for PowerDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.displayed();
        if shown == 0.0 {
            f.write_str("±0.00")
        } else {
            write!(f, "{:+.2}", shown)
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
