//! Persisted user preferences: the enabled flag, the default network and
//! per-network passwords.

use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::credentials::password_key;
use crate::error::{Error, Result};

const KEY_ENABLED: &str = "enabled";
const KEY_SSID: &str = "ssid";

/// Durable key-value storage the controller reads and writes synchronously.
pub trait Store {
    fn is_interface_enabled(&self) -> bool;
    fn set_interface_enabled(&mut self, enabled: bool);

    fn default_ssid(&self) -> Option<String>;
    fn set_default_ssid(&mut self, ssid: &str);
    fn clear_default_ssid(&mut self);

    fn password(&self, ssid: &str) -> Option<String>;
    fn set_password(&mut self, ssid: &str, password: &str);
    fn clear_password(&mut self, ssid: &str);
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}

/// [`Store`] over a flat string map, optionally mirrored to a JSON file.
///
/// Passwords live under [`password_key`] so the SSID itself never becomes a
/// key. Every write is flushed to disk immediately; a failed flush is logged
/// and the in-memory value is kept.
#[derive(Debug, Default)]
pub struct PreferencesStore {
    values: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl PreferencesStore {
    /// Store that forgets everything on drop.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads `path` if it exists; a missing file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No preferences file yet");
            return Ok(Self {
                values: BTreeMap::new(),
                path: Some(path.to_path_buf()),
            });
        }

        let content = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: StoreFile = serde_json::from_str(&content).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(path = %path.display(), entries = file.values.len(), "Loaded preferences");

        Ok(Self {
            values: file.values,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn put(&mut self, key: &str, value: &str) {
        if self.get(key) == Some(value) {
            return;
        }
        self.values.insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.flush();
        }
    }

    fn flush(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = self.write_to(path) {
            tracing::error!("Failed to save preferences: {}", e);
        }
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let io_err = |source: std::io::Error| Error::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = StoreFile {
            version: default_version(),
            values: self.values.clone(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;

        // Temp file, 0600, then rename over the old one.
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content).map_err(io_err)?;
        let mut perms = fs::metadata(&temp_path).map_err(io_err)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(&temp_path, perms).map_err(io_err)?;
        fs::rename(&temp_path, path).map_err(io_err)?;

        tracing::debug!(path = %path.display(), entries = self.values.len(), "Saved preferences");
        Ok(())
    }
}

impl Store for PreferencesStore {
    fn is_interface_enabled(&self) -> bool {
        self.get(KEY_ENABLED) == Some("true")
    }

    fn set_interface_enabled(&mut self, enabled: bool) {
        self.put(KEY_ENABLED, if enabled { "true" } else { "false" });
    }

    fn default_ssid(&self) -> Option<String> {
        self.get(KEY_SSID).map(str::to_string)
    }

    fn set_default_ssid(&mut self, ssid: &str) {
        self.put(KEY_SSID, ssid);
    }

    fn clear_default_ssid(&mut self) {
        self.remove(KEY_SSID);
    }

    fn password(&self, ssid: &str) -> Option<String> {
        self.get(&password_key(ssid)).map(str::to_string)
    }

    fn set_password(&mut self, ssid: &str, password: &str) {
        self.put(&password_key(ssid), password);
    }

    fn clear_password(&mut self, ssid: &str) {
        self.remove(&password_key(ssid));
    }
}
