//! Error types for the Lumen render core
//!
//! This module defines the error types used throughout the crate: resource
//! builds, geometry validation, texture-unit allocation and hot reloading.

use std::fmt;

/// Result type for Lumen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lumen errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Graphics device failure (poisoned device lock, rejected call, ...)
    BackendError(String),

    /// Shader compile/link failure or texture decode failure
    BuildFailed(String),

    /// A source file could not be read
    IoError(String),

    /// No resource is loaded under the given key
    NotLoaded(String),

    /// Vertex/index data rejected by geometry validation
    InvalidGeometry(String),

    /// A vertex or index sub-range lies outside the uploaded data
    OutOfRange(String),

    /// Every texture unit is taken (carries the unit count)
    NoFreeTextureUnit(u32),

    /// Hot reloading is already running on this store
    AlreadyRunning(String),

    /// Filesystem watch registration or notification failure
    WatchFailed(String),

    /// Initialization failed (second active session, ...)
    InitializationFailed(String),

    /// Inconsistent internal bookkeeping
    InternalError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::BuildFailed(msg) => write!(f, "Build failed: {}", msg),
            Error::IoError(msg) => write!(f, "I/O error: {}", msg),
            Error::NotLoaded(key) => write!(f, "Resource not loaded: {}", key),
            Error::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
            Error::OutOfRange(msg) => write!(f, "Out of range: {}", msg),
            Error::NoFreeTextureUnit(units) => {
                write!(f, "No free texture unit (all {} units in use)", units)
            }
            Error::AlreadyRunning(msg) => write!(f, "Already running: {}", msg),
            Error::WatchFailed(msg) => write!(f, "Watch failed: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::WatchFailed(err.to_string())
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
