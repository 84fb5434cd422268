//! Command line interface
//!
//! `aiov2_ctl` with no arguments prints the feature table. Exactly one mode
//! flag, or a `<FEATURE> <on|off>` pair, selects anything else.

mod dispatch;
mod render;

pub use dispatch::Dispatcher;
pub use render::{render_basic, render_detailed, render_power_frame, render_watch_line, FeatureDetail};

use crate::core::{Config, Error, Result};
use crate::features::{self, FeatureId};
use clap::{ArgGroup, Parser};
use std::ffi::OsString;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "aiov2_ctl", version, about = "Switch and monitor the AIO v2 board features")]
#[command(group(
    ArgGroup::new("mode")
        .args(["status", "power", "watch", "gui", "install", "update", "autostart", "no_autostart"])
        .conflicts_with("feature")
))]
pub struct Cli {
    /// Detailed status with power and GPS information
    #[arg(long)]
    status: bool,

    /// Live per-rail power monitor
    #[arg(long)]
    power: bool,

    /// Compact live status line
    #[arg(long)]
    watch: bool,

    /// Run the system tray
    #[arg(long)]
    gui: bool,

    /// Install aiov2_ctl system-wide (not supported)
    #[arg(long)]
    install: bool,

    /// Update an installed aiov2_ctl (not supported)
    #[arg(long)]
    update: bool,

    /// Start the tray when the desktop session starts
    #[arg(long)]
    autostart: bool,

    /// Remove the tray from session startup
    #[arg(long)]
    no_autostart: bool,

    /// Feature to switch: GPS, LORA, SDR or USB
    #[arg(requires = "state")]
    feature: Option<String>,

    /// on or off
    state: Option<String>,
}

/// One invocation's worth of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Basic,
    Status,
    Power,
    Watch,
    Gui,
    Install,
    Update,
    Autostart { enable: bool },
    Set { feature: FeatureId, on: bool },
}

impl Cli {
    /// Resolve names and toggle tokens; nothing touches hardware here
    pub fn command(&self) -> Result<Command> {
        let command = if self.status {
            Command::Status
        } else if self.power {
            Command::Power
        } else if self.watch {
            Command::Watch
        } else if self.gui {
            Command::Gui
        } else if self.install {
            Command::Install
        } else if self.update {
            Command::Update
        } else if self.autostart {
            Command::Autostart { enable: true }
        } else if self.no_autostart {
            Command::Autostart { enable: false }
        } else if let (Some(feature), Some(state)) = (&self.feature, &self.state) {
            let feature = features::resolve(feature)?;
            Command::Set {
                feature: feature.id,
                on: parse_toggle(state)?,
            }
        } else {
            Command::Basic
        };
        Ok(command)
    }
}

/// "on" or "off", any case
pub fn parse_toggle(token: &str) -> Result<bool> {
    let trimmed = token.trim();
    if trimmed.eq_ignore_ascii_case("on") {
        Ok(true)
    } else if trimmed.eq_ignore_ascii_case("off") {
        Ok(false)
    } else {
        Err(Error::InvalidToggleValue(token.to_string()))
    }
}

/// Process exit status for a failed command
pub fn exit_status(error: &Error) -> u8 {
    if error.is_usage() {
        2
    } else {
        1
    }
}

/// Parse `args`, run the command and map the outcome to an exit code
pub fn run<I, T>(args: I, config: Config) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too, with exit code 0
            let _ = e.print();
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    let result = cli.command().and_then(|command| {
        let dispatcher = Dispatcher::from_config(config)?;
        dispatcher.execute(command, &mut std::io::stdout().lock())
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("Command failed: {:?}", e);
            eprintln!("error: {}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> std::result::Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("aiov2_ctl").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_args_is_basic_table() {
        assert_eq!(parse(&[]).unwrap().command().unwrap(), Command::Basic);
    }

    #[test]
    fn test_mode_flags() {
        assert_eq!(parse(&["--status"]).unwrap().command().unwrap(), Command::Status);
        assert_eq!(parse(&["--power"]).unwrap().command().unwrap(), Command::Power);
        assert_eq!(parse(&["--watch"]).unwrap().command().unwrap(), Command::Watch);
        assert_eq!(parse(&["--gui"]).unwrap().command().unwrap(), Command::Gui);
        assert_eq!(
            parse(&["--no-autostart"]).unwrap().command().unwrap(),
            Command::Autostart { enable: false }
        );
        assert_eq!(parse(&["--install"]).unwrap().command().unwrap(), Command::Install);
    }

    #[test]
    fn test_feature_toggle() {
        let command = parse(&["gps", "ON"]).unwrap().command().unwrap();
        assert_eq!(command, Command::Set { feature: FeatureId::Gps, on: true });

        let command = parse(&["Usb", "off"]).unwrap().command().unwrap();
        assert_eq!(command, Command::Set { feature: FeatureId::Usb, on: false });
    }

    #[test]
    fn test_invalid_toggle_is_usage_error() {
        let err = parse(&["lora", "maybe"]).unwrap().command().unwrap_err();
        assert!(matches!(err, Error::InvalidToggleValue(ref t) if t == "maybe"));
        assert_eq!(exit_status(&err), 2);
    }

    #[test]
    fn test_unknown_feature_is_usage_error() {
        let err = parse(&["wifi", "on"]).unwrap().command().unwrap_err();
        assert!(matches!(err, Error::UnknownFeature(ref n) if n == "wifi"));
        assert_eq!(exit_status(&err), 2);
    }

    #[test]
    fn test_system_errors_exit_one() {
        assert_eq!(exit_status(&Error::PinUtilityMissing("pinctrl".into())), 1);
        assert_eq!(exit_status(&Error::Unsupported("--install".into())), 1);
        assert_eq!(exit_status(&Error::DisplayUnavailable), 1);
    }

    #[test]
    fn test_parse_toggle() {
        assert!(parse_toggle("on").unwrap());
        assert!(parse_toggle("On").unwrap());
        assert!(!parse_toggle("OFF").unwrap());
        assert!(parse_toggle("1").is_err());
        assert!(parse_toggle("true").is_err());
        assert!(parse_toggle("").is_err());
    }

    #[test]
    fn test_conflicting_arguments_rejected() {
        let err = parse(&["--status", "--power"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);

        let err = parse(&["--status", "gps", "on"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_feature_without_state_rejected() {
        let err = parse(&["gps"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }
}
