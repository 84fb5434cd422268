//! Text rendering for the command line views

use crate::core::{PowerDelta, PowerSample, Result};
use crate::features::Feature;
use crate::telemetry::GpsStatus;
use std::fmt::Write;

/// Clears the terminal and homes the cursor
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Erases whatever a longer previous line left behind
const CLEAR_LINE_END: &str = "\x1b[K";

/// Everything `--status` prints for one feature
pub struct FeatureDetail {
    pub feature: &'static Feature,
    pub enabled: Result<bool>,
    /// Only probed when GPS is on
    pub gps: Option<GpsStatus>,
    pub users: Vec<String>,
}

fn on_off(state: &Result<bool>) -> String {
    match state {
        Ok(true) => "ON".to_string(),
        Ok(false) => "OFF".to_string(),
        Err(e) => format!("ERROR ({})", e),
    }
}

/// Feature table printed when no arguments are given
pub fn render_basic(statuses: &[(&'static Feature, Result<bool>)]) -> String {
    let mut out = String::from("Feature Status\n====================\n");
    for (feature, state) in statuses {
        let _ = writeln!(out, "{:<5} {}: {}", feature.name(), feature.gpio_label(), on_off(state));
    }
    out
}

pub fn render_detailed(power: &Result<PowerSample>, details: &[FeatureDetail]) -> String {
    let mut out = String::from("Detailed Feature Status\n========================\n");

    match power {
        Ok(sample) => {
            let _ = writeln!(out, "Overall Power: {:.2} W", sample.watts);
        }
        Err(e) => {
            log::debug!("No power reading for status: {}", e);
            out.push_str("Overall Power: n/a W\n");
        }
    }
    out.push_str("------------------------\n");

    for detail in details {
        let feature = detail.feature;
        let _ = writeln!(out, "{} ({})", feature.name(), feature.gpio_label());
        match &detail.enabled {
            Ok(enabled) => {
                let _ = writeln!(out, "  enabled: {}", enabled);
            }
            Err(e) => {
                let _ = writeln!(out, "  error: {}", e);
            }
        }
        let _ = writeln!(out, "  bus: {}", feature.bus);

        if let Some(gps) = &detail.gps {
            let _ = writeln!(out, "  gps: {}", gps);
            if let Some(device) = feature.device {
                let _ = writeln!(out, "  device: {}", device);
            }
            let users = if detail.users.is_empty() {
                "none".to_string()
            } else {
                detail.users.join(", ")
            };
            let _ = writeln!(out, "  users: {}", users);
        }
        out.push('\n');
    }
    out
}

fn or_na(value: Option<f64>) -> String {
    value.map(|v| format!("{:>5.2}", v)).unwrap_or_else(|| "  n/a".to_string())
}

/// One screen of the per-rail power monitor
pub fn render_power_frame(sample: &Result<PowerSample>) -> String {
    let mut out = String::from(CLEAR_SCREEN);
    out.push_str("Power Monitor (Ctrl+C to quit)\n-----------------------------\n");

    match sample {
        Ok(sample) => {
            for rail in &sample.rails {
                let _ = writeln!(
                    out,
                    "{:<14} {} V  {} A  ({:>5.2} W)",
                    rail.name,
                    or_na(rail.voltage),
                    or_na(rail.current),
                    rail.power
                );
            }
            out.push_str("-----------------------------\n");
            let _ = writeln!(out, "Total: {:.2} W", sample.watts);
        }
        Err(e) => {
            let _ = writeln!(out, "{}", e);
        }
    }
    out
}

/// Compact watch line, redrawn in place
pub fn render_watch_line(
    statuses: &[(&'static Feature, Result<bool>)],
    power: Option<(f64, PowerDelta)>,
) -> String {
    let mut parts: Vec<String> = statuses
        .iter()
        .map(|(feature, state)| {
            let state = match state {
                Ok(true) => "ON",
                Ok(false) => "OFF",
                Err(_) => "ERR",
            };
            format!("{}:{}", feature.name(), state)
        })
        .collect();

    parts.push(match power {
        Some((watts, delta)) => format!("Power:{:.2}W ({})", watts, delta),
        None => "Power:n/aW".to_string(),
    });

    format!("\r{}{}", parts.join("  "), CLEAR_LINE_END)
}
