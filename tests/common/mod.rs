//! In-memory collaborators for driving the controller in tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use wlconnect::backend::{
    AccessPoint, AuthMode, ConnectionStatus, Controller, EventSender, EventType, Interface,
    Listener, NetworkDetails, PreferencesStore, Scheduler, Store, Task,
};
use wlconnect::ControllerConfig;

#[derive(Default)]
pub struct MockInterface {
    pub ap: Option<AccessPoint>,
    pub reject_scan: bool,
    pub reject_connect: bool,
    pub scan_done: bool,
    pub results: Vec<NetworkDetails>,
    pub scans_started: u32,
    pub connects: Vec<(String, String)>,
    pub disconnects: u32,
    /// Shared so a test can still inspect it once the controller is gone.
    pub listeners: Rc<RefCell<Vec<EventSender>>>,
}

impl MockInterface {
    /// Delivers `event` to every registered listener.
    pub fn emit(&self, event: EventType) {
        for tx in self.listeners.borrow().iter() {
            tx.try_send(event).unwrap();
        }
    }

    /// Finishes a scan with `results` and announces it.
    pub fn complete_scan(&mut self, results: Vec<NetworkDetails>) {
        self.results = results;
        self.scan_done = true;
        self.emit(EventType::ScanCompleted);
    }
}

impl Interface for MockInterface {
    fn ap_info(&self) -> Option<AccessPoint> {
        self.ap.clone()
    }

    fn start_scan(&mut self) -> bool {
        if self.reject_scan {
            return false;
        }
        self.scans_started += 1;
        self.scan_done = false;
        true
    }

    fn scan_completed(&self) -> bool {
        self.scan_done
    }

    fn scan_results(&self, max: usize) -> Vec<NetworkDetails> {
        self.results.iter().take(max).cloned().collect()
    }

    fn connect(&mut self, ssid: &str, password: &str) -> bool {
        if self.reject_connect {
            return false;
        }
        self.connects.push((ssid.to_string(), password.to_string()));
        true
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
    }

    fn status(&self) -> ConnectionStatus {
        self.ap
            .as_ref()
            .map_or(ConnectionStatus::Disconnected, |ap| ap.status)
    }

    fn add_event_listener(&mut self, sender: EventSender) {
        self.listeners.borrow_mut().push(sender);
    }

    fn remove_event_listener(&mut self, sender: &EventSender) {
        self.listeners
            .borrow_mut()
            .retain(|tx| !tx.same_channel(sender));
    }
}

/// Scheduler whose timers only fire when a test says so.
#[derive(Default)]
pub struct ManualScheduler {
    pub armed: Vec<(Task, Duration)>,
}

impl ManualScheduler {
    pub fn delay(&self, task: Task) -> Option<Duration> {
        self.armed.iter().find(|(t, _)| *t == task).map(|(_, d)| *d)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&mut self, task: Task, delay: Duration) {
        if !self.is_scheduled(task) {
            self.armed.push((task, delay));
        }
    }

    fn cancel(&mut self, task: Task) {
        self.armed.retain(|(t, _)| *t != task);
    }

    fn is_scheduled(&self, task: Task) -> bool {
        self.armed.iter().any(|(t, _)| *t == task)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Note {
    EnableChanged(bool),
    ScanStarted,
    ScanCompleted,
    CurrentNetworkChanged,
    ConnectionStateChanged(EventType),
}

#[derive(Default)]
pub struct RecordingListener {
    notes: RefCell<Vec<Note>>,
}

impl RecordingListener {
    pub fn take(&self) -> Vec<Note> {
        std::mem::take(&mut *self.notes.borrow_mut())
    }

    pub fn count(&self, note: &Note) -> usize {
        self.notes.borrow().iter().filter(|n| *n == note).count()
    }

    fn push(&self, note: Note) {
        self.notes.borrow_mut().push(note);
    }
}

impl Listener for RecordingListener {
    fn on_enable_changed(&self, enabled: bool) {
        self.push(Note::EnableChanged(enabled));
    }

    fn on_scan_started(&self) {
        self.push(Note::ScanStarted);
    }

    fn on_scan_completed(&self) {
        self.push(Note::ScanCompleted);
    }

    fn on_current_network_changed(&self) {
        self.push(Note::CurrentNetworkChanged);
    }

    fn on_connection_state_changed(&self, event: EventType) {
        self.push(Note::ConnectionStateChanged(event));
    }
}

pub type TestController = Controller<MockInterface, PreferencesStore, ManualScheduler>;

pub fn ap(ssid: &str, signal: i8) -> NetworkDetails {
    NetworkDetails::new(ssid, signal, AuthMode::Wpa2Psk)
}

pub fn open_ap(ssid: &str, signal: i8) -> NetworkDetails {
    NetworkDetails::new(ssid, signal, AuthMode::Open)
}

/// Controller over fresh fakes with `store` as its preferences and a
/// recording observer attached. `begin` has not run yet.
pub fn controller_with(store: PreferencesStore) -> (TestController, Rc<RecordingListener>) {
    let mut controller = Controller::new(
        MockInterface::default(),
        store,
        ManualScheduler::default(),
        ControllerConfig::default(),
    );
    let recorder = Rc::new(RecordingListener::default());
    let as_listener: Rc<dyn Listener> = recorder.clone();
    controller.add_listener(&as_listener);
    (controller, recorder)
}

pub fn store(enabled: bool, default_ssid: Option<&str>, passwords: &[(&str, &str)]) -> PreferencesStore {
    let mut store = PreferencesStore::in_memory();
    store.set_interface_enabled(enabled);
    if let Some(ssid) = default_ssid {
        store.set_default_ssid(ssid);
    }
    for (ssid, password) in passwords {
        store.set_password(ssid, password);
    }
    store
}
