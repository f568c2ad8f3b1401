//! iwd Agent answering password prompts
//!
//! iwd calls `RequestPassphrase` while a `Network.Connect` is in progress.
//! The driver stores the password of the connect it started in a shared
//! slot; the agent hands it out, or refuses so iwd fails the attempt.

use std::sync::{Arc, Mutex};

use zbus::interface;
use zbus::zvariant::ObjectPath;

/// Password of the connect attempt in flight, if it has one.
pub type PendingPassphrase = Arc<Mutex<Option<String>>>;

pub struct IwdAgent {
    pending: PendingPassphrase,
}

impl IwdAgent {
    pub fn new(pending: PendingPassphrase) -> Self {
        Self { pending }
    }

    fn take_passphrase(&self) -> Option<String> {
        let guard = self.pending.lock().ok()?;
        guard.as_ref().filter(|p| !p.is_empty()).cloned()
    }
}

#[interface(name = "net.connman.iwd.Agent")]
impl IwdAgent {
    async fn request_passphrase(&self, network: ObjectPath<'_>) -> zbus::fdo::Result<String> {
        match self.take_passphrase() {
            Some(passphrase) => {
                tracing::debug!("Answering passphrase request for {}", network);
                Ok(passphrase)
            }
            None => {
                tracing::info!("No passphrase available for {}", network);
                // iwd treats any error from the agent as cancellation
                Err(zbus::fdo::Error::AuthFailed("No passphrase stored".into()))
            }
        }
    }

    async fn cancel(&self, reason: String) -> zbus::fdo::Result<()> {
        tracing::info!("iwd cancelled agent request: {}", reason);
        Ok(())
    }

    async fn release(&self) -> zbus::fdo::Result<()> {
        tracing::info!("iwd agent released");
        Ok(())
    }
}
