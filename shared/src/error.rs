// Error type shared by the core and the Windows layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlackoutError {
    /// Hardware descriptor enumeration failed. Absorbed by the identity
    /// resolver, never returned from the service.
    #[error("monitor enumeration failed: {0}")]
    Enumeration(String),

    #[error("{operation} failed (platform error {code:#010x})")]
    PlatformResource { operation: &'static str, code: i32 },

    #[error("settings i/o error: {0}")]
    SettingsIo(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    SettingsFormat(#[from] serde_json::Error),
}

impl BlackoutError {
    pub fn platform(operation: &'static str, code: i32) -> Self {
        Self::PlatformResource { operation, code }
    }
}

pub type Result<T> = std::result::Result<T, BlackoutError>;
