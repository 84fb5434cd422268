//! GPS detail for the status view
//!
//! Listens to gpsd's JSON watch stream through `gpspipe -w` for a bounded
//! number of seconds and summarises the DEVICES, TPV and SKY reports. The
//! processes holding the GPS serial device open are listed with `lsof`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::process::Command;

/// Summary of what gpsd reported
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum GpsStatus {
    /// gpspipe could not be run or gpsd is not reachable
    Unavailable { reason: String },
    /// gpsd is running but has no receiver attached
    NoDevice,
    Active {
        devices: Vec<String>,
        fix: Option<GpsFix>,
        satellites: Option<SatelliteCount>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsFix {
    /// NMEA mode: 0/1 no fix, 2 = 2D, 3 = 3D
    pub mode: u8,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SatelliteCount {
    pub used: usize,
    pub visible: usize,
}

impl fmt::Display for GpsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpsStatus::Unavailable { reason } => write!(f, "unavailable ({})", reason),
            GpsStatus::NoDevice => f.write_str("no-device"),
            GpsStatus::Active { fix, satellites, .. } => {
                f.write_str("active")?;
                match fix {
                    Some(fix) if fix.mode >= 2 => {
                        write!(f, ", {}D fix", fix.mode)?;
                        if let (Some(lat), Some(lon)) = (fix.lat, fix.lon) {
                            write!(f, " at {:.5},{:.5}", lat, lon)?;
                        }
                    }
                    _ => f.write_str(", no fix")?,
                }
                if let Some(sats) = satellites {
                    write!(f, ", {}/{} satellites", sats.used, sats.visible)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "class")]
enum Report {
    #[serde(rename = "DEVICES")]
    Devices {
        #[serde(default)]
        devices: Vec<DeviceReport>,
    },
    #[serde(rename = "DEVICE")]
    Device(DeviceReport),
    #[serde(rename = "TPV")]
    Tpv {
        #[serde(default)]
        mode: u8,
        lat: Option<f64>,
        lon: Option<f64>,
        time: Option<String>,
    },
    #[serde(rename = "SKY")]
    Sky {
        #[serde(default)]
        satellites: Vec<SatelliteReport>,
        #[serde(rename = "uSat")]
        used: Option<usize>,
        #[serde(rename = "nSat")]
        visible: Option<usize>,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct DeviceReport {
    path: Option<String>,
}

#[derive(Deserialize)]
struct SatelliteReport {
    #[serde(default)]
    used: bool,
}

/// Summarise a captured gpsd watch stream
pub fn parse_watch_stream(stream: &str) -> GpsStatus {
    let mut saw_devices = false;
    let mut devices = BTreeSet::new();
    let mut fix = None;
    let mut satellites = None;

    for line in stream.lines().map(str::trim).filter(|l| l.starts_with('{')) {
        let report = match serde_json::from_str::<Report>(line) {
            Ok(report) => report,
            Err(e) => {
                log::debug!("Ignoring gpsd line: {}", e);
                continue;
            }
        };
        match report {
            Report::Devices { devices: list } => {
                saw_devices = true;
                devices.extend(list.into_iter().filter_map(|d| d.path));
            }
            Report::Device(device) => {
                saw_devices = true;
                devices.extend(device.path);
            }
            Report::Tpv { mode, lat, lon, time } => {
                fix = Some(GpsFix { mode, lat, lon, time });
            }
            Report::Sky { satellites: sats, used, visible } => {
                let counted_used = sats.iter().filter(|s| s.used).count();
                satellites = Some(SatelliteCount {
                    used: used.unwrap_or(counted_used),
                    visible: visible.unwrap_or(sats.len()),
                });
            }
            Report::Other => {}
        }
    }

    if !saw_devices && fix.is_none() && satellites.is_none() {
        return GpsStatus::Unavailable {
            reason: "no reports from gpsd".to_string(),
        };
    }
    if devices.is_empty() && fix.is_none() {
        return GpsStatus::NoDevice;
    }
    GpsStatus::Active {
        devices: devices.into_iter().collect(),
        fix,
        satellites,
    }
}

/// Command names (first lsof column) of every process holding the file
pub fn parse_lsof(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter_map(|l| l.split_whitespace().next())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Runs gpspipe and lsof
pub struct GpsProbe {
    gpspipe: String,
    lsof: String,
    seconds: u64,
}

impl GpsProbe {
    pub fn new(gpspipe: impl Into<String>, lsof: impl Into<String>, seconds: u64) -> Self {
        Self {
            gpspipe: gpspipe.into(),
            lsof: lsof.into(),
            seconds: seconds.max(1),
        }
    }

    /// Listen to gpsd for the configured number of seconds
    pub fn status(&self) -> GpsStatus {
        let output = Command::new(&self.gpspipe)
            .args(["-w", "-x", &self.seconds.to_string()])
            .output();

        match output {
            Ok(out) => {
                let stdout = String::from_utf8_lossy(&out.stdout);
                if !out.status.success() && stdout.trim().is_empty() {
                    let stderr = String::from_utf8_lossy(&out.stderr);
                    return GpsStatus::Unavailable {
                        reason: stderr.trim().to_string(),
                    };
                }
                parse_watch_stream(&stdout)
            }
            Err(e) => GpsStatus::Unavailable {
                reason: format!("{}: {}", self.gpspipe, e),
            },
        }
    }

    /// Processes with the device open; empty when lsof is missing or finds none
    pub fn device_users(&self, device: &str) -> Vec<String> {
        match Command::new(&self.lsof).arg(device).output() {
            Ok(out) => parse_lsof(&String::from_utf8_lossy(&out.stdout)),
            Err(e) => {
                log::debug!("{} {} failed: {}", self.lsof, device, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = r#"{"class":"VERSION","release":"3.22","rev":"3.22","proto_major":3,"proto_minor":14}
{"class":"DEVICES","devices":[{"class":"DEVICE","path":"/dev/ttyAMA0","driver":"NMEA0183","activated":"2024-05-01T10:00:00.000Z","native":0,"bps":9600}]}
{"class":"WATCH","enable":true,"json":true}
{"class":"SKY","device":"/dev/ttyAMA0","nSat":9,"uSat":6,"satellites":[]}
{"class":"TPV","device":"/dev/ttyAMA0","mode":3,"time":"2024-05-01T10:00:01.000Z","lat":51.50735,"lon":-0.12776}
"#;

    #[test]
    fn test_active_with_fix() {
        let status = parse_watch_stream(STREAM);
        let GpsStatus::Active { devices, fix, satellites } = &status else {
            panic!("expected active, got {:?}", status);
        };
        assert_eq!(devices, &vec!["/dev/ttyAMA0".to_string()]);
        assert_eq!(fix.as_ref().unwrap().mode, 3);
        assert_eq!(*satellites, Some(SatelliteCount { used: 6, visible: 9 }));
        assert_eq!(status.to_string(), "active, 3D fix at 51.50735,-0.12776, 6/9 satellites");
    }

    #[test]
    fn test_counts_satellites_from_list() {
        let stream = r#"{"class":"DEVICES","devices":[{"path":"/dev/ttyAMA0"}]}
{"class":"SKY","satellites":[{"PRN":1,"used":true},{"PRN":2,"used":false},{"PRN":3,"used":true}]}"#;
        let GpsStatus::Active { fix, satellites, .. } = parse_watch_stream(stream) else {
            panic!("expected active");
        };
        assert!(fix.is_none());
        assert_eq!(satellites, Some(SatelliteCount { used: 2, visible: 3 }));
    }

    #[test]
    fn test_no_device() {
        let stream = r#"{"class":"VERSION","release":"3.22"}
{"class":"DEVICES","devices":[]}
{"class":"WATCH","enable":true}"#;
        assert_eq!(parse_watch_stream(stream), GpsStatus::NoDevice);
        assert_eq!(GpsStatus::NoDevice.to_string(), "no-device");
    }

    #[test]
    fn test_empty_stream_is_unavailable() {
        assert!(matches!(parse_watch_stream(""), GpsStatus::Unavailable { .. }));
        assert!(matches!(parse_watch_stream("not json\n{broken"), GpsStatus::Unavailable { .. }));
    }

    #[test]
    fn test_parse_lsof() {
        let out = "COMMAND  PID USER   FD   TYPE DEVICE SIZE/OFF NODE NAME\n\
                   gpsd     612 gpsd    3u   CHR 204,64      0t0  123 /dev/ttyAMA0\n\
                   gpsd     612 gpsd    4u   CHR 204,64      0t0  123 /dev/ttyAMA0\n\
                   minicom 1001 pi      3u   CHR 204,64      0t0  123 /dev/ttyAMA0\n";
        assert_eq!(parse_lsof(out), vec!["gpsd".to_string(), "minicom".to_string()]);
        assert!(parse_lsof("").is_empty());
    }

    #[test]
    fn test_missing_gpspipe() {
        let probe = GpsProbe::new("/nonexistent/gpspipe", "/nonexistent/lsof", 1);
        assert!(matches!(probe.status(), GpsStatus::Unavailable { .. }));
        assert!(probe.device_users("/dev/ttyAMA0").is_empty());
    }
}
