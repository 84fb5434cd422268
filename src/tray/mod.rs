//! System tray shell
//!
//! - `state`: click/menu state machine and the off-lock feature switch
//! - `poller`: 1 Hz refresh publishing [`TraySnapshot`]s over a watch channel
//! - `shell`: the Tauri tray icon, menu and status window (`gui` feature)

mod poller;
#[cfg(feature = "gui")]
mod shell;
mod state;

pub use poller::{FeatureReading, Poller, TickOutcome, TraySnapshot};
#[cfg(feature = "gui")]
pub use shell::run;
pub use state::{apply_feature, TrayAction, TrayEvent, TrayMachine, TrayState};

use crate::core::{Error, Result};
use crate::elevation;

/// Refuse to start the tray as root or without a display
pub fn preflight() -> Result<()> {
    if elevation::is_elevated() {
        return Err(Error::PermissionDenied("Do not run the GUI as root".to_string()));
    }
    if !elevation::has_display() {
        return Err(Error::DisplayUnavailable);
    }
    Ok(())
}
