//! `pinctrl` backed pin accessor
//!
//! Reads use `pinctrl get <line>`, whose output looks like
//! `27: op dh pd | hi // GPIO27 = output`. Writes use
//! `pinctrl set <line> op dh|dl`, configuring the line as an output.

use crate::core::{Error, Level, Result};
use crate::gpio::{GpioLine, PinAccessor};
use std::io::ErrorKind;
use std::process::{Command, Output};

/// Pin accessor that shells out to the pin control utility
pub struct PinctrlAccessor {
    binary: String,
}

impl PinctrlAccessor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, line: GpioLine, args: &[&str]) -> Result<String> {
        log::debug!("{} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Error::PinUtilityMissing(self.binary.clone()),
                ErrorKind::PermissionDenied => Error::PinAccessDenied {
                    line: line.number(),
                    message: e.to_string(),
                },
                _ => Error::Io(e),
            })?;

        check_output(line, output)
    }
}

impl PinAccessor for PinctrlAccessor {
    fn read_pin(&self, line: GpioLine) -> Result<Level> {
        let stdout = self.run(line, &["get", &line.to_string()])?;
        parse_level(line, &stdout)
    }

    fn write_pin(&self, line: GpioLine, level: Level) -> Result<()> {
        let drive = match level {
            Level::High => "dh",
            Level::Low => "dl",
        };
        self.run(line, &["set", &line.to_string(), "op", drive])?;
        log::info!("GPIO{} driven {}", line, level);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.binary
    }
}

/// Turn a finished process into stdout or a typed failure
fn check_output(line: GpioLine, output: Output) -> Result<String> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = if stderr.trim().is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr.trim().to_string()
    };
    Err(classify_failure(line, message))
}

fn classify_failure(line: GpioLine, message: String) -> Error {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("gpiomem") || lower.contains("not permitted") {
        Error::PinAccessDenied {
            line: line.number(),
            message,
        }
    } else {
        Error::PinCommand {
            line: line.number(),
            message,
        }
    }
}

/// Check the reported line, then extract the level token after the `|` separator
fn parse_level(line: GpioLine, stdout: &str) -> Result<Level> {
    let unexpected = || Error::PinCommand {
        line: line.number(),
        message: format!("unexpected pinctrl output: {:?}", stdout.trim()),
    };

    let (head, rest) = stdout
        .lines()
        .find_map(|l| l.split_once('|'))
        .ok_or_else(unexpected)?;

    // "27: op dh pd " names the line the report is for
    if let Some(number) = head.split_once(':').and_then(|(n, _)| n.trim().parse::<u32>().ok()) {
        let reported = GpioLine::new(number)?;
        if reported != line {
            return Err(Error::PinCommand {
                line: line.number(),
                message: format!("pinctrl reported GPIO{} instead", reported),
            });
        }
    }

    match rest.split_whitespace().next() {
        Some("hi") => Ok(Level::High),
        Some("lo") => Ok(Level::Low),
        _ => Err(unexpected()),
    }
}
