//! In-memory pin accessor for tests

use crate::core::{Error, Level, Result};
use crate::gpio::{GpioLine, PinAccessor};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Lines start low; every write is recorded
#[derive(Default)]
pub struct FakePins {
    levels: Mutex<HashMap<u8, Level>>,
    writes: Mutex<Vec<(u8, Level)>>,
    denied: HashSet<u8>,
    delay: Option<Duration>,
}

impl FakePins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and writes on these lines fail with PinAccessDenied
    pub fn denying(lines: &[u8]) -> Self {
        Self {
            denied: lines.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Every read and write sleeps first, like a hung utility
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_level(&self, line: u8, level: Level) {
        self.levels.lock().unwrap().insert(line, level);
    }

    pub fn level(&self, line: u8) -> Level {
        self.levels.lock().unwrap().get(&line).copied().unwrap_or(Level::Low)
    }

    pub fn writes(&self) -> Vec<(u8, Level)> {
        self.writes.lock().unwrap().clone()
    }

    fn check(&self, line: GpioLine) -> Result<()> {
        if self.denied.contains(&line.number()) {
            return Err(Error::PinAccessDenied {
                line: line.number(),
                message: "denied by test".to_string(),
            });
        }
        Ok(())
    }
}

impl PinAccessor for FakePins {
    fn read_pin(&self, line: GpioLine) -> Result<Level> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.check(line)?;
        Ok(self.level(line.number()))
    }

    fn write_pin(&self, line: GpioLine, level: Level) -> Result<()> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.check(line)?;
        self.set_level(line.number(), level);
        self.writes.lock().unwrap().push((line.number(), level));
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}
