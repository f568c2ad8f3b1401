//! Radio driver seam.

use super::types::{AccessPoint, ConnectionStatus, EventType, NetworkDetails};

/// Channel end the driver pushes hardware events into.
pub type EventSender = async_channel::Sender<EventType>;

/// Non-blocking radio primitives the controller drives.
///
/// Reads are status queries and never wait on the hardware. Mutations are
/// fire-and-forget; their outcome arrives later as an [`EventType`] on every
/// registered [`EventSender`].
pub trait Interface {
    /// Live association info, `None` unless associated.
    fn ap_info(&self) -> Option<AccessPoint>;

    /// Request a scan. `false` if the driver refused, e.g. one is running.
    fn start_scan(&mut self) -> bool;

    /// Whether the most recent scan has finished and its results are readable.
    fn scan_completed(&self) -> bool;

    /// Up to `max` raw records of the latest scan.
    fn scan_results(&self, max: usize) -> Vec<NetworkDetails>;

    /// Request association with `ssid`. `false` if refused outright.
    fn connect(&mut self, ssid: &str, password: &str) -> bool;

    fn disconnect(&mut self);

    fn status(&self) -> ConnectionStatus;

    fn add_event_listener(&mut self, sender: EventSender);

    fn remove_event_listener(&mut self, sender: &EventSender);
}
