//! Wi-Fi connectivity controller with an iwd driver.

pub mod backend;
pub mod config;
pub mod error;

pub use config::{ControllerConfig, DaemonConfig};
pub use error::{Error, Result};
