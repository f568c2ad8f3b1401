//! The connectivity state machine.
//!
//! Reconciles three independently updating sources into one view of "the
//! current network and its status": the driver's live association, the
//! latest scan snapshot and the stored default network. Every method runs to
//! completion; hardware outcomes come back later as [`EventType`]s.

use std::rc::Rc;

use async_channel::{Receiver, TryRecvError};

use super::interface::{EventSender, Interface};
use super::listeners::{Listener, ListenerRegistry};
use super::scan::deduplicate;
use super::scheduler::{Scheduler, Task};
use super::store::Store;
use super::types::{ConnectionStatus, EventType, NetworkRecord, SIGNAL_NONE};
use crate::config::ControllerConfig;

pub struct Controller<I: Interface, S: Store, T: Scheduler> {
    interface: I,
    store: S,
    scheduler: T,
    config: ControllerConfig,

    enabled: bool,
    connecting: bool,
    current_network: NetworkRecord,
    current_network_index: Option<usize>,
    current_network_status: ConnectionStatus,
    scanned_networks: Vec<NetworkRecord>,

    listeners: ListenerRegistry<dyn Listener>,
    events_tx: EventSender,
    events_rx: Receiver<EventType>,
}

impl<I: Interface, S: Store, T: Scheduler> Controller<I, S, T> {
    pub fn new(interface: I, store: S, scheduler: T, config: ControllerConfig) -> Self {
        let (events_tx, events_rx) = async_channel::unbounded();
        Self {
            interface,
            store,
            scheduler,
            config,
            enabled: false,
            connecting: false,
            current_network: NetworkRecord::default(),
            current_network_index: None,
            current_network_status: ConnectionStatus::OutOfRange,
            scanned_networks: Vec::new(),
            listeners: ListenerRegistry::new(),
            events_tx,
            events_rx,
        }
    }

    /// Subscribes to the driver, loads the enabled flag and, when enabled,
    /// reconnects to the stored default network.
    pub fn begin(&mut self) {
        self.interface.add_event_listener(self.events_tx.clone());
        self.enabled = self.store.is_interface_enabled();
        tracing::info!(enabled = self.enabled, "Controller started");
        if self.enabled {
            self.notify_enable_changed();
            self.connect_default();
        }
    }

    // ---- observers ----

    pub fn add_listener(&mut self, listener: &Rc<dyn Listener>) {
        self.listeners.attach(listener);
    }

    pub fn remove_listener(&mut self, listener: &Rc<dyn Listener>) {
        self.listeners.detach(listener);
    }

    // ---- queries ----

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True between an accepted connect request and a terminal event.
    pub fn is_connecting(&self) -> bool {
        self.connecting
    }

    pub fn is_scan_completed(&self) -> bool {
        self.interface.scan_completed()
    }

    pub fn current_network(&self) -> &NetworkRecord {
        &self.current_network
    }

    pub fn current_network_status(&self) -> ConnectionStatus {
        self.current_network_status
    }

    /// Position of the current network in [`Self::scanned_networks`].
    pub fn current_network_index(&self) -> Option<usize> {
        self.current_network_index
    }

    /// Latest scan snapshot, one entry per SSID, strongest first.
    pub fn scanned_networks(&self) -> &[NetworkRecord] {
        &self.scanned_networks
    }

    pub fn lookup_network(&self, ssid: &str) -> Option<&NetworkRecord> {
        self.scanned_networks.iter().find(|n| n.ssid == ssid)
    }

    /// Size of the scan list without the current network.
    pub fn other_scanned_networks_count(&self) -> usize {
        self.scanned_networks.len() - usize::from(self.current_network_index.is_some())
    }

    /// `idx`-th entry of the scan list with the current network skipped.
    pub fn other_network(&self, idx: usize) -> Option<&NetworkRecord> {
        let idx = match self.current_network_index {
            Some(current) if idx >= current => idx + 1,
            _ => idx,
        };
        self.scanned_networks.get(idx)
    }

    /// User-facing wording of the current status.
    pub fn status_text(&self) -> &'static str {
        self.current_network_status.describe(self.connecting)
    }

    pub fn stored_password(&self, ssid: &str) -> Option<String> {
        self.store.password(ssid)
    }

    pub fn set_password(&mut self, ssid: &str, password: &str) {
        self.store.set_password(ssid, password);
    }

    pub fn interface(&self) -> &I {
        &self.interface
    }

    pub fn interface_mut(&mut self) -> &mut I {
        &mut self.interface
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    /// Receiving end of the driver's event channel, for async hosts.
    pub fn interface_events(&self) -> Receiver<EventType> {
        self.events_rx.clone()
    }

    // ---- commands ----

    pub fn toggle_enabled(&mut self) {
        self.enabled = !self.enabled;
        self.store.set_interface_enabled(self.enabled);
        tracing::info!(enabled = self.enabled, "Wi-Fi toggled");

        if !self.enabled {
            self.scheduler.cancel(Task::Scan);
            self.scheduler.cancel(Task::RefreshCurrentNetwork);
            self.interface.disconnect();
        }
        self.connecting = false;
        self.notify_enable_changed();

        if self.enabled {
            self.connect_default();
            self.resume();
        }
    }

    /// Starts periodic work. No-op while disabled.
    pub fn resume(&mut self) {
        if !self.enabled {
            return;
        }
        self.refresh_current_network();
        self.scheduler
            .schedule_after(Task::RefreshCurrentNetwork, self.config.refresh_interval);

        if self.interface.scan_completed() {
            self.listeners.notify_all(|l| l.on_scan_completed());
            self.scheduler
                .schedule_after(Task::Scan, self.config.scan_interval);
        } else {
            self.start_periodic_scan();
        }
    }

    /// Stops periodic scanning only.
    pub fn pause(&mut self) {
        self.scheduler.cancel(Task::Scan);
    }

    /// Returns whether the driver accepted the scan request.
    pub fn start_scan(&mut self) -> bool {
        let started = self.interface.start_scan();
        if started {
            tracing::debug!("Scan started");
            self.listeners.notify_all(|l| l.on_scan_started());
        } else {
            tracing::debug!("Scan request rejected");
        }
        started
    }

    /// Connects to the stored default network with its stored password.
    /// `false` when no default is set or the driver refused.
    pub fn connect_default(&mut self) -> bool {
        let Some(ssid) = self.store.default_ssid().filter(|s| !s.is_empty()) else {
            tracing::debug!("No default network to connect to");
            return false;
        };
        let password = self.store.password(&ssid).unwrap_or_default();
        self.connect(&ssid, &password)
    }

    /// Makes `ssid` the default network and asks the driver to join it.
    ///
    /// An empty `password` means "use the stored one, if any"; a non-empty
    /// one replaces the stored password. Returns `false` when disabled or
    /// when the driver refused, leaving the view untouched.
    pub fn connect(&mut self, ssid: &str, password: &str) -> bool {
        if !self.enabled {
            tracing::warn!(ssid = %ssid, "Ignoring connect while Wi-Fi is disabled");
            return false;
        }

        if self.store.default_ssid().as_deref() != Some(ssid) {
            self.store.set_default_ssid(ssid);
        }
        let stored = self.store.password(ssid);
        if !password.is_empty() && stored.as_deref() != Some(password) {
            self.store.set_password(ssid, password);
        }

        let effective = if password.is_empty() {
            stored.as_deref().unwrap_or("")
        } else {
            password
        };
        if !self.interface.connect(ssid, effective) {
            tracing::warn!(ssid = %ssid, "Connect request rejected");
            return false;
        }
        tracing::info!(ssid = %ssid, "Connecting");
        self.connecting = true;

        let target = match self.lookup_network(ssid) {
            Some(seen) => seen.clone(),
            None => NetworkRecord {
                ssid: ssid.to_string(),
                open: effective.is_empty(),
                signal: SIGNAL_NONE,
            },
        };
        self.replace_current_network(target, ConnectionStatus::Disconnected);
        true
    }

    /// The driver's own disconnection event drives the view update.
    pub fn disconnect(&mut self) {
        tracing::info!("Disconnecting");
        self.connecting = false;
        self.interface.disconnect();
    }

    /// Drops the stored password of `ssid`, and the default if it was `ssid`.
    pub fn forget(&mut self, ssid: &str) {
        tracing::info!(ssid = %ssid, "Forgetting network");
        self.store.clear_password(ssid);
        if self.store.default_ssid().as_deref() == Some(ssid) {
            self.store.clear_default_ssid();
        }
    }

    // ---- timers and driver events ----

    /// Runs a fired timer.
    pub fn on_timer(&mut self, task: Task) {
        match task {
            Task::Scan => {
                if self.enabled {
                    self.start_periodic_scan();
                }
            }
            Task::RefreshCurrentNetwork => {
                self.refresh_current_network();
                if self.enabled {
                    self.scheduler
                        .schedule_after(Task::RefreshCurrentNetwork, self.config.refresh_interval);
                }
            }
        }
    }

    /// Applies one driver event.
    pub fn handle_event(&mut self, event: EventType) {
        tracing::debug!(?event, "Interface event");
        match event {
            EventType::Unknown => {}
            EventType::ScanCompleted => self.on_scan_completed(),
            other => self.on_connection_state_changed(other),
        }
    }

    /// Applies every queued driver event. Returns how many were handled.
    pub fn poll_interface_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event);
                    handled += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return handled,
            }
        }
    }

    fn start_periodic_scan(&mut self) {
        if !self.start_scan() {
            self.scheduler
                .schedule_after(Task::Scan, self.config.scan_interval);
        }
    }

    fn on_scan_completed(&mut self) {
        self.current_network_index = None;
        let raw = self.interface.scan_results(self.config.max_scan_results);
        self.scanned_networks = deduplicate(&raw);
        tracing::info!(
            raw = raw.len(),
            networks = self.scanned_networks.len(),
            "Scan completed"
        );

        if !self.scanned_networks.is_empty() {
            self.current_network_index = self.index_of(&self.current_network.ssid);
            match (self.current_network_index, self.current_network_status) {
                (Some(_), ConnectionStatus::OutOfRange) => {
                    self.current_network_status = ConnectionStatus::Disconnected;
                }
                (None, ConnectionStatus::Disconnected) => {
                    self.current_network_status = ConnectionStatus::OutOfRange;
                }
                _ => {}
            }
        }

        self.listeners.notify_all(|l| l.on_scan_completed());
        if self.enabled {
            self.scheduler
                .schedule_after(Task::Scan, self.config.scan_interval);
        }
    }

    fn on_connection_state_changed(&mut self, event: EventType) {
        if event.ends_connect_attempt() {
            self.connecting = false;
        }
        let current = self.current_network.clone();
        self.replace_current_network(current, event.connection_status());
        self.listeners
            .notify_all(|l| l.on_connection_state_changed(event));
    }

    /// Re-derives the current network: live association first, then the
    /// stored default checked against the scan snapshot. Error statuses stay
    /// put while the target network is unchanged.
    fn refresh_current_network(&mut self) {
        if let Some(ap) = self.interface.ap_info() {
            let live = NetworkRecord::from(&ap.details);
            self.update_current_network_if_changed(live, ap.status);
            return;
        }

        let default_ssid = self.store.default_ssid().unwrap_or_default();
        let same_target = default_ssid == self.current_network.ssid;
        let seen = if default_ssid.is_empty() {
            None
        } else {
            self.lookup_network(&default_ssid).cloned()
        };

        let (record, fallback_status) = match seen {
            Some(record) => (record, ConnectionStatus::Disconnected),
            None => {
                let open = if same_target {
                    self.current_network.open
                } else {
                    self.store.password(&default_ssid).is_none()
                };
                let record = NetworkRecord {
                    ssid: default_ssid,
                    open,
                    signal: SIGNAL_NONE,
                };
                (record, ConnectionStatus::OutOfRange)
            }
        };
        let status = if same_target {
            self.current_network_status
        } else {
            fallback_status
        };
        self.update_current_network_if_changed(record, status);
    }

    /// Passive update: observers hear about it only if something changed.
    fn update_current_network_if_changed(&mut self, network: NetworkRecord, status: ConnectionStatus) {
        if network == self.current_network && status == self.current_network_status {
            return;
        }
        self.commit_current_network(network, status);
    }

    /// Explicit update after a user action or a driver event; always notifies.
    fn replace_current_network(&mut self, network: NetworkRecord, status: ConnectionStatus) {
        self.commit_current_network(network, status);
    }

    fn commit_current_network(&mut self, network: NetworkRecord, status: ConnectionStatus) {
        if network.ssid != self.current_network.ssid || status != self.current_network_status {
            tracing::info!(ssid = %network.ssid, ?status, "Current network changed");
        }
        self.current_network_index = self.index_of(&network.ssid);
        self.current_network = network;
        self.current_network_status = status;
        self.listeners.notify_all(|l| l.on_current_network_changed());
    }

    fn index_of(&self, ssid: &str) -> Option<usize> {
        self.scanned_networks.iter().position(|n| n.ssid == ssid)
    }

    fn notify_enable_changed(&self) {
        let enabled = self.enabled;
        self.listeners.notify_all(|l| l.on_enable_changed(enabled));
    }
}

impl<I: Interface, S: Store, T: Scheduler> Drop for Controller<I, S, T> {
    fn drop(&mut self) {
        self.interface.remove_event_listener(&self.events_tx);
        if !self.listeners.is_empty() {
            tracing::warn!(
                count = self.listeners.len(),
                "Controller dropped with observers still attached"
            );
        }
    }
}
