//! Error types for the application

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown feature '{0}' (expected one of GPS, LORA, SDR, USB)")]
    UnknownFeature(String),

    #[error("Invalid toggle value '{0}' (expected 'on' or 'off')")]
    InvalidToggleValue(String),

    #[error("Invalid GPIO line {0}")]
    InvalidLine(u32),

    #[error("Permission denied accessing GPIO{line}: {message}")]
    PinAccessDenied { line: u8, message: String },

    #[error("Pin control utility '{0}' not found")]
    PinUtilityMissing(String),

    #[error("Pin command failed on GPIO{line}: {message}")]
    PinCommand { line: u8, message: String },

    #[error("Power telemetry unavailable: {0}")]
    TelemetryUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("No display available")]
    DisplayUnavailable,

    #[error("Tray shell failed: {0}")]
    Gui(String),

    #[error("Not supported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Whether the error comes from bad command line input rather than the system
    pub fn is_usage(&self) -> bool {
        matches!(self, Error::UnknownFeature(_) | Error::InvalidToggleValue(_))
    }
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;
