//! # Error Module
//!
//! Typed errors raised by the signal pipeline and its capture adapter.
//! None of these ever escape a single quantum's processing: the pipeline
//! logs them and drops the quantum.

use thiserror::Error;

/// Errors produced by the spectrum core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpectrumError {
    /// The native capture buffer could not be locked or mapped for reading.
    #[error("Failed to access capture buffer: {0}")]
    BufferAccess(String),

    /// A transform was requested on a window whose length is not a power of two.
    #[error("Window length {0} is not a power of two")]
    InvalidWindowSize(usize),

    /// The capture device went away or could not be opened.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SpectrumError>;
