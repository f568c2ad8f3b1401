//! [`Interface`] implementation over iwd (Intel Wireless Daemon)
//!
//! A local watcher task follows `Station.Scanning` and `Station.State` and
//! keeps a cache the synchronous trait methods read from. Mutations are
//! spawned onto the current `LocalSet` and report back through events, so
//! the driver must be created and used inside one.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::task::{AbortHandle, JoinHandle};
use zbus::fdo::ObjectManagerProxy;
use zbus::zvariant::{ObjectPath, OwnedObjectPath};

use super::iwd_agent::{IwdAgent, PendingPassphrase};
use super::iwd_proxy::{AgentManagerProxy, DeviceProxy, NetworkProxy, StationProxy};
use crate::backend::interface::{EventSender, Interface};
use crate::backend::types::{
    AccessPoint, AuthMode, ConnectionStatus, EventType, NetworkDetails, SIGNAL_NONE,
};
use crate::config::CONNECT_TIMEOUT;
use crate::error::{Error, Result};

const AGENT_PATH: &str = "/org/wlconnect/Agent";

/// Map iwd D-Bus errors to short log-friendly reasons
pub fn describe_iwd_error(e: &zbus::Error) -> String {
    let s = e.to_string();
    if s.contains("Aborted") || s.contains("Canceled") {
        "cancelled".into()
    } else if s.contains("InvalidFormat") || s.contains("InvalidArguments") {
        "invalid password".into()
    } else if s.contains("AuthenticationFailed") {
        "wrong password".into()
    } else if s.contains("NotConnected") {
        "not connected".into()
    } else if s.contains("Busy") || s.contains("InProgress") {
        "device busy".into()
    } else if s.contains("NotFound") {
        "network not found".into()
    } else if s.contains("NoAgent") {
        "no agent registered".into()
    } else {
        s
    }
}

/// iwd reports signal strength in 100 * dBm.
pub fn cbm_to_dbm(cbm: i16) -> i8 {
    (cbm / 100).clamp(i16::from(i8::MIN), i16::from(i8::MAX)) as i8
}

/// Auth mode for iwd's `Network.Type`.
pub fn auth_mode_from_iwd(network_type: &str) -> AuthMode {
    match network_type {
        "open" => AuthMode::Open,
        "wep" => AuthMode::Wep,
        "psk" => AuthMode::Wpa2Psk,
        "8021x" => AuthMode::Wpa2Enterprise,
        _ => AuthMode::Unknown,
    }
}

/// Object path of the first iwd device, in path order, and whether it
/// currently exposes `Station` (only present while powered).
fn pick_device<I, N>(objects: I) -> Option<(OwnedObjectPath, bool)>
where
    I: IntoIterator<Item = (OwnedObjectPath, Vec<N>)>,
    N: AsRef<str>,
{
    objects
        .into_iter()
        .filter(|(_, ifaces)| ifaces.iter().any(|i| i.as_ref() == "net.connman.iwd.Device"))
        .min_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()))
        .map(|(path, ifaces)| {
            let station = ifaces.iter().any(|i| i.as_ref() == "net.connman.iwd.Station");
            (path, station)
        })
}

async fn locate_device(conn: &zbus::Connection) -> Result<(OwnedObjectPath, bool)> {
    let objects = ObjectManagerProxy::builder(conn)
        .destination("net.connman.iwd")?
        .path("/")?
        .build()
        .await?
        .get_managed_objects()
        .await?;

    let listing = objects.into_iter().map(|(path, ifaces)| {
        let names: Vec<String> = ifaces.keys().map(|name| name.to_string()).collect();
        (path, names)
    });
    let (path, has_station) = pick_device(listing).ok_or(Error::NoDevice)?;
    tracing::info!(station = has_station, "Found iwd device at {}", path);
    Ok((path, has_station))
}

/// Scan list as raw records, each with the object path to connect through.
async fn load_networks(
    conn: &zbus::Connection,
    station: &StationProxy<'_>,
) -> zbus::Result<Vec<(NetworkDetails, OwnedObjectPath)>> {
    let ordered = station.get_ordered_networks().await?;
    let mut networks = Vec::with_capacity(ordered.len());

    for (path, signal_strength) in ordered {
        let network = NetworkProxy::builder(conn).path(path.clone())?.build().await?;
        let name = network.name().await.unwrap_or_default();
        let network_type = network.network_type().await.unwrap_or_else(|_| "open".into());
        tracing::trace!(
            "  Network: {} ({} dBm, type={})",
            name,
            signal_strength / 100,
            network_type
        );
        let details = NetworkDetails::new(
            &name,
            cbm_to_dbm(signal_strength),
            auth_mode_from_iwd(&network_type),
        );
        networks.push((details, path));
    }

    tracing::debug!("Loaded {} networks from iwd", networks.len());
    Ok(networks)
}

struct Cache {
    state: String,
    scanning: bool,
    scan_completed: bool,
    results: Vec<NetworkDetails>,
    paths: HashMap<String, OwnedObjectPath>,
    connected: Option<NetworkDetails>,
    was_connected: bool,
    local_disconnect: bool,
    connect_in_flight: bool,
    pending_connect: Option<AbortHandle>,
    listeners: Vec<EventSender>,
}

impl Cache {
    fn new(state: String, scanning: bool) -> Self {
        Self {
            state,
            scanning,
            scan_completed: false,
            results: Vec::new(),
            paths: HashMap::new(),
            connected: None,
            was_connected: false,
            local_disconnect: false,
            connect_in_flight: false,
            pending_connect: None,
            listeners: Vec::new(),
        }
    }

    /// Replaces the scan list. The connected network picks up its fresh
    /// entry so its signal follows the latest scan.
    fn set_results(&mut self, networks: Vec<(NetworkDetails, OwnedObjectPath)>) {
        self.paths.clear();
        self.results.clear();
        for (details, path) in networks {
            self.paths.entry(details.ssid.clone()).or_insert(path);
            self.results.push(details);
        }

        if let Some(current) = self.connected.as_mut() {
            if let Some(fresh) = self.results.iter().find(|d| d.ssid == current.ssid) {
                *current = fresh.clone();
            }
        }
    }

    fn emit(&self, event: EventType) {
        tracing::debug!(?event, "iwd event");
        for tx in &self.listeners {
            let _ = tx.try_send(event);
        }
    }
}

type SharedCache = Rc<RefCell<Cache>>;

/// Details of the network iwd is connected to, preferring the cached scan
/// entry for its signal strength.
async fn connected_details(
    conn: &zbus::Connection,
    station: &StationProxy<'_>,
    cache: &SharedCache,
) -> Option<NetworkDetails> {
    let path = station.connected_network().await.ok()?;
    let cached = {
        let c = cache.borrow();
        c.paths
            .iter()
            .find(|(_, p)| p.as_str() == path.as_str())
            .and_then(|(ssid, _)| c.results.iter().find(|d| &d.ssid == ssid).cloned())
    };
    if cached.is_some() {
        return cached;
    }

    let network = NetworkProxy::builder(conn).path(path).ok()?.build().await.ok()?;
    let name = network.name().await.ok()?;
    let network_type = network.network_type().await.unwrap_or_else(|_| "open".into());
    Some(NetworkDetails::new(
        &name,
        SIGNAL_NONE,
        auth_mode_from_iwd(&network_type),
    ))
}

async fn finish_scan(conn: &zbus::Connection, station: &StationProxy<'_>, cache: &SharedCache) {
    let loaded = load_networks(conn, station).await;
    let mut c = cache.borrow_mut();
    c.scanning = false;
    match loaded {
        Ok(networks) => c.set_results(networks),
        Err(e) => tracing::warn!("Failed to read scan results, keeping previous: {}", e),
    }
    c.scan_completed = true;
    c.emit(EventType::ScanCompleted);
}

async fn apply_state(
    conn: &zbus::Connection,
    station: &StationProxy<'_>,
    cache: &SharedCache,
    state: String,
) {
    let previous = std::mem::replace(&mut cache.borrow_mut().state, state.clone());
    if previous == state {
        return;
    }
    tracing::info!("Station state changed: {} -> {}", previous, state);

    match state.as_str() {
        "connected" => {
            let details = connected_details(conn, station, cache).await;
            let mut c = cache.borrow_mut();
            c.connected = details;
            c.was_connected = true;
            c.local_disconnect = false;
            c.emit(EventType::GotIp);
        }
        "disconnected" => {
            let mut c = cache.borrow_mut();
            let event = if c.was_connected && !c.local_disconnect {
                EventType::ConnectionLost
            } else {
                EventType::Disconnected
            };
            c.connected = None;
            c.was_connected = false;
            c.local_disconnect = false;
            // A failing connect call reports the outcome itself.
            if !c.connect_in_flight {
                c.emit(event);
            }
        }
        _ => {}
    }
}

async fn watch_station(conn: zbus::Connection, station: StationProxy<'static>, cache: SharedCache) {
    let mut scanning_changes = station.receive_scanning_changed().await;
    let mut state_changes = station.receive_state_changed().await;

    loop {
        tokio::select! {
            Some(change) = scanning_changes.next() => {
                match change.get().await {
                    Ok(true) => {
                        let mut c = cache.borrow_mut();
                        c.scanning = true;
                        c.scan_completed = false;
                    }
                    Ok(false) => finish_scan(&conn, &station, &cache).await,
                    Err(e) => tracing::warn!("Failed to get Station.Scanning: {}", e),
                }
            }

            Some(change) = state_changes.next() => {
                match change.get().await {
                    Ok(state) => apply_state(&conn, &station, &cache, state).await,
                    Err(e) => tracing::warn!("Failed to get Station.State: {}", e),
                }
            }

            else => break,
        }
    }

    tracing::warn!("iwd station streams ended");
}

async fn run_connect(
    conn: zbus::Connection,
    path: OwnedObjectPath,
    ssid: String,
    cache: SharedCache,
    passphrase: PendingPassphrase,
) {
    let attempt = async {
        let network = NetworkProxy::builder(&conn).path(path)?.build().await?;
        network.connect().await?;
        Ok::<(), zbus::Error>(())
    };

    let failed = match tokio::time::timeout(CONNECT_TIMEOUT, attempt).await {
        Ok(Ok(())) => {
            tracing::info!(ssid = %ssid, "Connect call succeeded");
            false
        }
        Ok(Err(e)) => {
            tracing::warn!(ssid = %ssid, "Connect failed: {}", describe_iwd_error(&e));
            true
        }
        Err(_) => {
            tracing::warn!(ssid = %ssid, "Connect timed out");
            true
        }
    };

    if let Ok(mut slot) = passphrase.lock() {
        *slot = None;
    }
    let mut c = cache.borrow_mut();
    c.connect_in_flight = false;
    c.pending_connect = None;
    if failed {
        c.emit(EventType::ConnectionFailed);
    }
}

/// Registers the password agent. Failing to register with iwd only
/// affects secured networks, so it is logged rather than returned.
async fn register_agent(conn: &zbus::Connection, passphrase: PendingPassphrase) -> Result<()> {
    conn.object_server()
        .at(AGENT_PATH, IwdAgent::new(passphrase))
        .await?;
    tracing::info!("Registered iwd agent at {}", AGENT_PATH);

    match AgentManagerProxy::new(conn).await {
        Ok(agent_manager) => {
            match agent_manager
                .register_agent(ObjectPath::from_static_str_unchecked(AGENT_PATH))
                .await
            {
                Ok(()) => tracing::info!("Registered agent with iwd"),
                Err(e) => tracing::warn!(
                    "Failed to register agent with iwd: {}. Secured networks will fail.",
                    e
                ),
            }
        }
        Err(e) => tracing::warn!("Failed to connect to iwd AgentManager: {}", e),
    }
    Ok(())
}

pub struct IwdInterface {
    conn: zbus::Connection,
    station: StationProxy<'static>,
    cache: SharedCache,
    passphrase: PendingPassphrase,
    watcher: JoinHandle<()>,
}

impl IwdInterface {
    /// Attaches to the first iwd wireless device. Must run inside a
    /// `tokio::task::LocalSet`.
    pub async fn new(conn: zbus::Connection) -> Result<Self> {
        let (device_path, has_station) = locate_device(&conn).await?;
        let device = DeviceProxy::builder(&conn)
            .path(device_path.clone())?
            .build()
            .await?;
        let device_name = device
            .name()
            .await
            .unwrap_or_else(|_| device_path.to_string());

        let powered = device.powered().await.unwrap_or(false);
        if !powered || !has_station {
            return Err(Error::StationUnavailable(device_name));
        }
        let station = StationProxy::builder(&conn)
            .path(device_path.clone())?
            .build()
            .await?;

        let passphrase: PendingPassphrase = Arc::new(Mutex::new(None));
        register_agent(&conn, passphrase.clone()).await?;

        let scanning = station.scanning().await.unwrap_or(false);
        let state = station
            .state()
            .await
            .unwrap_or_else(|_| "disconnected".into());
        let cache = Rc::new(RefCell::new(Cache::new(state.clone(), scanning)));

        if !scanning {
            match load_networks(&conn, &station).await {
                Ok(networks) => {
                    let mut c = cache.borrow_mut();
                    c.set_results(networks);
                    c.scan_completed = true;
                }
                Err(e) => tracing::warn!("Failed to read initial networks: {}", e),
            }
        }
        if state == "connected" {
            let details = connected_details(&conn, &station, &cache).await;
            let mut c = cache.borrow_mut();
            c.connected = details;
            c.was_connected = true;
        }

        let watcher = tokio::task::spawn_local(watch_station(
            conn.clone(),
            station.clone(),
            cache.clone(),
        ));

        tracing::info!(device = %device_name, state = %state, "iwd driver ready");
        Ok(Self {
            conn,
            station,
            cache,
            passphrase,
            watcher,
        })
    }
}

impl IwdInterface {
    /// Unregisters the password agent from iwd and the local object server.
    /// Call before dropping the driver; iwd otherwise only notices when the
    /// bus connection closes.
    pub async fn close(&self) {
        let path = ObjectPath::from_static_str_unchecked(AGENT_PATH);
        match AgentManagerProxy::new(&self.conn).await {
            Ok(agent_manager) => match agent_manager.unregister_agent(path).await {
                Ok(()) => tracing::info!("Unregistered agent from iwd"),
                Err(e) => tracing::warn!("Failed to unregister agent: {}", e),
            },
            Err(e) => tracing::warn!("Failed to connect to iwd AgentManager: {}", e),
        }
        if let Err(e) = self.conn.object_server().remove::<IwdAgent, _>(AGENT_PATH).await {
            tracing::debug!("Agent object already gone: {}", e);
        }
    }
}

impl Interface for IwdInterface {
    fn ap_info(&self) -> Option<AccessPoint> {
        let c = self.cache.borrow();
        c.connected.clone().map(|details| AccessPoint {
            details,
            status: ConnectionStatus::Connected,
        })
    }

    fn start_scan(&mut self) -> bool {
        {
            let mut c = self.cache.borrow_mut();
            if c.scanning {
                return false;
            }
            c.scanning = true;
            c.scan_completed = false;
        }

        let station = self.station.clone();
        let cache = self.cache.clone();
        tokio::task::spawn_local(async move {
            if let Err(e) = station.scan().await {
                tracing::warn!("Scan failed: {}", describe_iwd_error(&e));
                // Old results stay valid; report completion so the
                // periodic scan is re-armed.
                let mut c = cache.borrow_mut();
                c.scanning = false;
                c.scan_completed = true;
                c.emit(EventType::ScanCompleted);
            }
        });
        true
    }

    fn scan_completed(&self) -> bool {
        self.cache.borrow().scan_completed
    }

    fn scan_results(&self, max: usize) -> Vec<NetworkDetails> {
        self.cache.borrow().results.iter().take(max).cloned().collect()
    }

    fn connect(&mut self, ssid: &str, password: &str) -> bool {
        let Some(path) = self.cache.borrow().paths.get(ssid).cloned() else {
            tracing::warn!(ssid = %ssid, "Network not in the latest scan results");
            return false;
        };

        if let Ok(mut slot) = self.passphrase.lock() {
            *slot = Some(password.to_string());
        }

        {
            let mut c = self.cache.borrow_mut();
            if let Some(previous) = c.pending_connect.take() {
                tracing::debug!("Aborting previous connection attempt");
                previous.abort();
            }
            c.connect_in_flight = true;
            c.local_disconnect = false;
        }

        let handle = tokio::task::spawn_local(run_connect(
            self.conn.clone(),
            path,
            ssid.to_string(),
            self.cache.clone(),
            self.passphrase.clone(),
        ));
        self.cache.borrow_mut().pending_connect = Some(handle.abort_handle());
        true
    }

    fn disconnect(&mut self) {
        {
            let mut c = self.cache.borrow_mut();
            c.local_disconnect = true;
            if let Some(pending) = c.pending_connect.take() {
                pending.abort();
                c.connect_in_flight = false;
            }
        }

        let station = self.station.clone();
        tokio::task::spawn_local(async move {
            if let Err(e) = station.disconnect().await {
                let reason = describe_iwd_error(&e);
                if reason == "not connected" {
                    tracing::debug!("Disconnect: {}", reason);
                } else {
                    tracing::warn!("Disconnect failed: {}", reason);
                }
            }
        });
    }

    fn status(&self) -> ConnectionStatus {
        match self.cache.borrow().state.as_str() {
            "connected" => ConnectionStatus::Connected,
            _ => ConnectionStatus::Disconnected,
        }
    }

    fn add_event_listener(&mut self, sender: EventSender) {
        let mut c = self.cache.borrow_mut();
        if !c.listeners.iter().any(|tx| tx.same_channel(&sender)) {
            c.listeners.push(sender);
        }
    }

    fn remove_event_listener(&mut self, sender: &EventSender) {
        self.cache
            .borrow_mut()
            .listeners
            .retain(|tx| !tx.same_channel(sender));
    }
}

impl Drop for IwdInterface {
    fn drop(&mut self) {
        self.watcher.abort();
        if let Some(pending) = self.cache.borrow_mut().pending_connect.take() {
            pending.abort();
        }
    }
}
