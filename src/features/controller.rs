//! Reading and switching features through a pin accessor

use crate::core::Result;
use crate::features::{self, Feature};
use crate::gpio::PinAccessor;

/// Applies feature polarity over every line a feature owns
pub struct FeatureController<P> {
    pins: P,
}

impl<P: PinAccessor> FeatureController<P> {
    pub fn new(pins: P) -> Self {
        Self { pins }
    }

    pub fn pins(&self) -> &P {
        &self.pins
    }

    /// A feature is on only when every one of its lines is at the active level
    pub fn is_enabled(&self, feature: &Feature) -> Result<bool> {
        let mut enabled = true;
        for line in feature.lines {
            let state = self.pins.pin_state(*line)?;
            log::debug!("GPIO{} reads {}", state.line, state.level);
            enabled &= feature.polarity.is_active(state.level);
        }
        Ok(enabled)
    }

    /// Drive every line of the feature; stops at the first failing line
    pub fn set_enabled(&self, feature: &Feature, on: bool) -> Result<()> {
        let level = feature.polarity.level_for(on);
        for line in feature.lines {
            self.pins.write_pin(*line, level)?;
        }
        log::info!(
            "{} turned {} via {}",
            feature.name(),
            if on { "on" } else { "off" },
            self.pins.name()
        );
        Ok(())
    }

    /// State of every registered feature, each read independently
    pub fn statuses(&self) -> Vec<(&'static Feature, Result<bool>)> {
        features::all()
            .iter()
            .map(|f| (f, self.is_enabled(f)))
            .collect()
    }
}
