//! Crate-wide error type.
//!
//! Only construction paths are fallible (opening the store, reaching iwd).
//! Once running, the controller reports rejected requests as `false` and
//! logs persistence failures instead of propagating them.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("D-Bus: {0}")]
    Dbus(#[from] zbus::Error),

    #[error("D-Bus: {0}")]
    DbusFdo(#[from] zbus::fdo::Error),

    /// iwd is running but exposes no wireless device.
    #[error("no iwd wireless device found")]
    NoDevice,

    /// The device exists but is powered off, so it has no Station interface.
    #[error("iwd station interface unavailable on {0}")]
    StationUnavailable(String),
}

pub type Result<T> = std::result::Result<T, Error>;
