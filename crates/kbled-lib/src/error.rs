//! Unified error type for the kbled-lib crate.
//!
//! [`KbledError`] carries the two run-fatal conditions (manager unavailable,
//! matching filter not installable), wraps [`HostError`] for other host
//! failures, and covers user input (`Pattern`, `Config`). `From` impls allow
//! `?` to propagate across module boundaries.

use std::fmt;

use crate::hid::HostError;

#[derive(Debug)]
pub enum KbledError {
    /// The host HID manager could not be acquired; no device was touched.
    HostManagerUnavailable(String),
    /// The keyboard matching filter could not be built or installed.
    FilterConstructionFailed(String),
    /// Any other host HID failure (device set query).
    Host(HostError),
    /// Device-name glob that cannot be handed to the matcher.
    Pattern(String),
    /// Configuration validation error.
    Config(String),
    /// Standard I/O error (output stream, config persistence).
    Io(std::io::Error),
}

impl fmt::Display for KbledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KbledError::HostManagerUnavailable(e) => write!(f, "Failed to open HID manager: {e}"),
            KbledError::FilterConstructionFailed(e) => {
                write!(f, "Failed to build keyboard matching filter: {e}")
            }
            KbledError::Host(e) => write!(f, "{e}"),
            KbledError::Pattern(e) => write!(f, "Invalid name pattern: {e}"),
            KbledError::Config(e) => write!(f, "Config error: {e}"),
            KbledError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for KbledError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KbledError::Host(e) => Some(e),
            KbledError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HostError> for KbledError {
    fn from(e: HostError) -> Self {
        KbledError::Host(e)
    }
}

impl From<std::io::Error> for KbledError {
    fn from(e: std::io::Error) -> Self {
        KbledError::Io(e)
    }
}

/// Crate-level Result alias using [`KbledError`].
pub type Result<T> = std::result::Result<T, KbledError>;
