//! Feature registry
//!
//! Static mapping from the board's logical features to the GPIO enable lines
//! that gate them. The set is fixed at compile time:
//!
//! | Feature | Line(s) | Bus    | Device        |
//! |---------|---------|--------|---------------|
//! | GPS     | 27      | serial | /dev/ttyAMA0  |
//! | LORA    | 16      | SPI    |               |
//! | SDR     | 7       | USB    |               |
//! | USB     | 23      | USB    |               |

mod controller;

pub use controller::FeatureController;

use crate::core::{Error, Level, Result};
use crate::gpio::GpioLine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a board feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureId {
    Gps,
    Lora,
    Sdr,
    Usb,
}

impl FeatureId {
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureId::Gps => "GPS",
            FeatureId::Lora => "LORA",
            FeatureId::Sdr => "SDR",
            FeatureId::Usb => "USB",
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which logic level means "on"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Level to drive for the requested state
    pub fn level_for(self, on: bool) -> Level {
        match (self, on) {
            (Polarity::ActiveHigh, true) | (Polarity::ActiveLow, false) => Level::High,
            (Polarity::ActiveHigh, false) | (Polarity::ActiveLow, true) => Level::Low,
        }
    }

    pub fn is_active(self, level: Level) -> bool {
        level == self.level_for(true)
    }
}

/// Bus the feature hangs off once powered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    Serial,
    Spi,
    Usb,
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bus::Serial => f.write_str("serial"),
            Bus::Spi => f.write_str("spi"),
            Bus::Usb => f.write_str("usb"),
        }
    }
}

/// A logical feature and the lines that enable it
#[derive(Debug, PartialEq, Eq)]
pub struct Feature {
    pub id: FeatureId,
    pub lines: &'static [GpioLine],
    pub polarity: Polarity,
    pub bus: Bus,
    /// Device node the feature exposes, if any
    pub device: Option<&'static str>,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        self.id.as_str()
    }

    /// "GPIO27", or "GPIO5,6" for multi-line features
    pub fn gpio_label(&self) -> String {
        let lines: Vec<String> = self.lines.iter().map(|l| l.to_string()).collect();
        format!("GPIO{}", lines.join(","))
    }
}

static FEATURES: [Feature; 4] = [
    Feature {
        id: FeatureId::Gps,
        lines: &[GpioLine::fixed(27)],
        polarity: Polarity::ActiveHigh,
        bus: Bus::Serial,
        device: Some("/dev/ttyAMA0"),
    },
    Feature {
        id: FeatureId::Lora,
        lines: &[GpioLine::fixed(16)],
        polarity: Polarity::ActiveHigh,
        bus: Bus::Spi,
        device: None,
    },
    Feature {
        id: FeatureId::Sdr,
        lines: &[GpioLine::fixed(7)],
        polarity: Polarity::ActiveHigh,
        bus: Bus::Usb,
        device: None,
    },
    Feature {
        id: FeatureId::Usb,
        lines: &[GpioLine::fixed(23)],
        polarity: Polarity::ActiveHigh,
        bus: Bus::Usb,
        device: None,
    },
];

/// All features in display order
pub fn all() -> &'static [Feature] {
    &FEATURES
}

/// Look up a feature by name, ignoring case
pub fn resolve(name: &str) -> Result<&'static Feature> {
    let wanted = name.trim();
    FEATURES
        .iter()
        .find(|f| f.name().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| Error::UnknownFeature(name.to_string()))
}

/// Registry entry for an id
pub fn get(id: FeatureId) -> &'static Feature {
    match id {
        FeatureId::Gps => &FEATURES[0],
        FeatureId::Lora => &FEATURES[1],
        FeatureId::Sdr => &FEATURES[2],
        FeatureId::Usb => &FEATURES[3],
    }
}
