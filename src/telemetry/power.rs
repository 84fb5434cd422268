//! Power draw from the kernel power-supply class
//!
//! Each supply under `/sys/class/power_supply` may expose `voltage_now` (µV)
//! and `current_now` (µA); rail power is |V * I|. Supplies that only report
//! `power_now` (µW, common for laptop batteries) are read directly.

use crate::core::{round2, Error, PowerDelta, PowerSample, RailReading, Result};
use crate::telemetry::PowerSource;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads every rail under a power-supply class directory
pub struct PowerSupplyReader {
    base: PathBuf,
}

impl PowerSupplyReader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Per-rail readings, sorted by supply name. Unreadable supplies are skipped.
    pub fn rails(&self) -> Result<Vec<RailReading>> {
        if !self.base.is_dir() {
            return Err(Error::TelemetryUnavailable(format!(
                "{} not available",
                self.base.display()
            )));
        }

        let mut rails = Vec::new();
        for entry in fs::read_dir(&self.base)?.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            match read_rail(&entry.path(), &name) {
                Some(rail) => rails.push(rail),
                None => log::debug!("Skipping power supply {} (no readable power attributes)", name),
            }
        }
        rails.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rails)
    }
}

impl PowerSource for PowerSupplyReader {
    fn sample(&self) -> Result<PowerSample> {
        let rails = self.rails()?;
        if rails.is_empty() {
            return Err(Error::TelemetryUnavailable(format!(
                "no readable rails under {}",
                self.base.display()
            )));
        }
        Ok(PowerSample::new(rails))
    }

    fn name(&self) -> &str {
        "power_supply"
    }
}

fn read_micro(path: &Path) -> Option<f64> {
    fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(|v| v / 1_000_000.0)
}

fn read_rail(path: &Path, name: &str) -> Option<RailReading> {
    let voltage = read_micro(&path.join("voltage_now"));
    let current = read_micro(&path.join("current_now"));

    if let (Some(v), Some(i)) = (voltage, current) {
        return Some(RailReading {
            name: name.to_string(),
            voltage: Some(round2(v)),
            current: Some(round2(i)),
            power: round2((v * i).abs()),
        });
    }

    let power = read_micro(&path.join("power_now"))?;
    Some(RailReading {
        name: name.to_string(),
        voltage: voltage.map(round2),
        current: current.map(round2),
        power: round2(power.abs()),
    })
}

/// Keeps the latest and previous sample to report display deltas
pub struct PowerTracker {
    threshold: f64,
    previous: Option<PowerSample>,
    latest: Option<PowerSample>,
}

impl PowerTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            previous: None,
            latest: None,
        }
    }

    /// Record a sample; the delta is zero for the first one
    pub fn record(&mut self, sample: PowerSample) -> PowerDelta {
        // Samples carry two decimals; so does their difference
        let watts = self
            .latest
            .as_ref()
            .map(|last| round2(sample.watts - last.watts))
            .unwrap_or(0.0);
        self.previous = self.latest.replace(sample);
        PowerDelta {
            watts,
            threshold: self.threshold,
        }
    }

    pub fn latest(&self) -> Option<&PowerSample> {
        self.latest.as_ref()
    }

    pub fn previous(&self) -> Option<&PowerSample> {
        self.previous.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_supply(base: &Path, name: &str, attrs: &[(&str, &str)]) {
        let dir = base.join(name);
        fs::create_dir_all(&dir).unwrap();
        for (attr, value) in attrs {
            fs::write(dir.join(attr), format!("{}\n", value)).unwrap();
        }
    }

    fn sample_of(watts: f64) -> PowerSample {
        PowerSample::new(vec![RailReading {
            name: "rail".into(),
            voltage: None,
            current: None,
            power: watts,
        }])
    }

    #[test]
    fn test_reads_voltage_and_current() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "rpi-pmic", &[("voltage_now", "5100000"), ("current_now", "800000")]);
        write_supply(dir.path(), "BAT0", &[("power_now", "7250000")]);
        write_supply(dir.path(), "AC", &[("online", "1")]);

        let reader = PowerSupplyReader::new(dir.path());
        let rails = reader.rails().unwrap();
        assert_eq!(rails.len(), 2);
        assert_eq!(rails[0].name, "BAT0");
        assert_eq!(rails[0].power, 7.25);
        assert_eq!(rails[1].name, "rpi-pmic");
        assert_eq!(rails[1].voltage, Some(5.1));
        assert_eq!(rails[1].current, Some(0.8));
        assert_eq!(rails[1].power, 4.08);

        let sample = reader.sample().unwrap();
        assert_eq!(sample.watts, 11.33);
    }

    #[test]
    fn test_negative_current_counts_as_draw() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "battery", &[("voltage_now", "3700000"), ("current_now", "-500000")]);

        let rails = PowerSupplyReader::new(dir.path()).rails().unwrap();
        assert_eq!(rails[0].current, Some(-0.5));
        assert_eq!(rails[0].power, 1.85);
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let reader = PowerSupplyReader::new("/nonexistent/power_supply");
        assert!(matches!(reader.sample(), Err(Error::TelemetryUnavailable(_))));
    }

    #[test]
    fn test_no_rails_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write_supply(dir.path(), "AC", &[("online", "1")]);
        write_supply(dir.path(), "broken", &[("voltage_now", "garbage"), ("current_now", "1")]);

        let reader = PowerSupplyReader::new(dir.path());
        assert!(reader.rails().unwrap().is_empty());
        assert!(matches!(reader.sample(), Err(Error::TelemetryUnavailable(_))));
    }

    #[test]
    fn test_tracker_suppresses_small_deltas() {
        let mut tracker = PowerTracker::new(0.05);
        assert_eq!(tracker.record(sample_of(4.00)).displayed(), 0.0);

        let delta = tracker.record(sample_of(4.03));
        assert!((delta.watts - 0.03).abs() < 1e-9);
        assert_eq!(delta.displayed(), 0.0);

        let delta = tracker.record(sample_of(4.50));
        assert!((delta.displayed() - 0.47).abs() < 1e-9);

        let delta = tracker.record(sample_of(3.50));
        assert!((delta.displayed() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_tracker_reports_step_at_threshold() {
        let mut tracker = PowerTracker::new(0.05);
        tracker.record(sample_of(4.00));

        let delta = tracker.record(sample_of(4.05));
        assert_eq!(delta.watts, 0.05);
        assert_eq!(delta.displayed(), 0.05);
        assert_eq!(delta.to_string(), "+0.05");

        let delta = tracker.record(sample_of(4.00));
        assert_eq!(delta.displayed(), -0.05);

        let delta = tracker.record(sample_of(4.04));
        assert_eq!(delta.to_string(), "±0.00");
    }

    #[test]
    fn test_tracker_keeps_two_samples() {
        let mut tracker = PowerTracker::new(0.05);
        tracker.record(sample_of(1.0));
        tracker.record(sample_of(2.0));
        tracker.record(sample_of(3.0));

        assert_eq!(tracker.latest().unwrap().watts, 3.0);
        assert_eq!(tracker.previous().unwrap().watts, 2.0);
    }
}
