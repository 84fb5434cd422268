//! aiov2_ctl library
//!
//! GPIO feature switching, power and GPS telemetry, the command line
//! dispatcher and the tray shell for the AIO v2 board.

pub mod autostart;
pub mod cli;
pub mod core;
pub mod elevation;
pub mod features;
pub mod gpio;
pub mod telemetry;
pub mod tray;
