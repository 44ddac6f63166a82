//! Error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RawHidError {
    /// Index out of range, or the device at that index was closed
    #[error("No open device at index {index}")]
    NotFound { index: usize },

    /// A transfer failed for a reason other than a receive timeout
    #[error("Transfer failed: {0}")]
    Transport(#[source] rusb::Error),

    /// The host could not list devices
    #[error("Device enumeration failed: {0}")]
    Enumeration(#[source] rusb::Error),

    #[error("Failed to initialize USB context: {0}")]
    Init(#[source] rusb::Error),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

pub type Result<T> = std::result::Result<T, RawHidError>;
