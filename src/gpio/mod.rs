//! GPIO pin access
//!
//! All hardware access goes through the [`PinAccessor`] trait:
//! - `pinctrl`: the real implementation, shelling out to the pin control utility
//! - `fake`: an in-memory accessor used by tests

mod pinctrl;
#[cfg(test)]
pub(crate) mod fake;

pub use pinctrl::PinctrlAccessor;

use crate::core::{Error, Level, PinState, Result};
use std::fmt;

/// Highest BCM line number on the 40-pin header SoCs
const MAX_LINE: u32 = 53;

/// A validated BCM GPIO line number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpioLine(u8);

impl GpioLine {
    pub fn new(line: u32) -> Result<Self> {
        if line > MAX_LINE {
            return Err(Error::InvalidLine(line));
        }
        Ok(Self(line as u8))
    }

    /// Compile-time line for static tables
    pub(crate) const fn fixed(line: u8) -> Self {
        assert!(line as u32 <= MAX_LINE);
        Self(line)
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl fmt::Display for GpioLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait for anything that can read and drive GPIO lines
pub trait PinAccessor: Send + Sync {
    /// Read the current level of a line
    fn read_pin(&self, line: GpioLine) -> Result<Level>;

    /// Drive a line as an output at the given level
    fn write_pin(&self, line: GpioLine, level: Level) -> Result<()>;

    /// Name of this accessor, for logs
    fn name(&self) -> &str;

    /// Read a line into a [`PinState`]
    fn pin_state(&self, line: GpioLine) -> Result<PinState> {
        Ok(PinState {
            line: line.number(),
            level: self.read_pin(line)?,
        })
    }
}

impl<P: PinAccessor + ?Sized> PinAccessor for std::sync::Arc<P> {
    fn read_pin(&self, line: GpioLine) -> Result<Level> {
        (**self).read_pin(line)
    }

    fn write_pin(&self, line: GpioLine, level: Level) -> Result<()> {
        (**self).write_pin(line, level)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
