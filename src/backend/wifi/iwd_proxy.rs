//! zbus proxy traits for the iwd D-Bus interfaces the driver uses
//!
//! iwd uses the service name `net.connman.iwd`:
//! - Device: the adapter, present even when powered off
//! - Station: scanning and connection state, only while powered
//! - Network: one entry of the scan list
//! - AgentManager: registration of our password agent

use zbus::proxy;

/// net.connman.iwd.Station interface
/// Object path: /net/connman/iwd/{phy}/{dev}
#[proxy(
    interface = "net.connman.iwd.Station",
    default_service = "net.connman.iwd",
    gen_blocking = false
)]
pub trait Station {
    fn scan(&self) -> zbus::Result<()>;

    fn disconnect(&self) -> zbus::Result<()>;

    /// Networks ordered by signal strength, as (object_path, cBm)
    fn get_ordered_networks(&self) -> zbus::Result<Vec<(zbus::zvariant::OwnedObjectPath, i16)>>;

    /// "connected", "connecting", "disconnecting", "disconnected", "roaming"
    #[zbus(property)]
    fn state(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn scanning(&self) -> zbus::Result<bool>;

    #[zbus(property)]
    fn connected_network(&self) -> zbus::Result<zbus::zvariant::OwnedObjectPath>;
}

/// net.connman.iwd.Network interface
/// Object path: /net/connman/iwd/{phy}/{dev}/{network_id}
#[proxy(
    interface = "net.connman.iwd.Network",
    default_service = "net.connman.iwd",
    gen_blocking = false
)]
pub trait Network {
    fn connect(&self) -> zbus::Result<()>;

    /// SSID
    #[zbus(property)]
    fn name(&self) -> zbus::Result<String>;

    /// Security type: "open", "wep", "psk", "8021x"
    #[zbus(property, name = "Type")]
    fn network_type(&self) -> zbus::Result<String>;
}

/// net.connman.iwd.Device interface
/// Object path: /net/connman/iwd/{phy}/{dev}
#[proxy(
    interface = "net.connman.iwd.Device",
    default_service = "net.connman.iwd",
    gen_blocking = false
)]
pub trait Device {
    /// e.g. "wlan0"
    #[zbus(property)]
    fn name(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn powered(&self) -> zbus::Result<bool>;
}

/// net.connman.iwd.AgentManager interface
#[proxy(
    interface = "net.connman.iwd.AgentManager",
    default_service = "net.connman.iwd",
    default_path = "/net/connman/iwd",
    gen_blocking = false
)]
pub trait AgentManager {
    fn register_agent(&self, path: zbus::zvariant::ObjectPath<'_>) -> zbus::Result<()>;

    fn unregister_agent(&self, path: zbus::zvariant::ObjectPath<'_>) -> zbus::Result<()>;
}
