//! Connectivity logic: the controller, its collaborators and the iwd driver.

pub mod controller;
pub mod credentials;
pub mod event_loop;
pub mod interface;
pub mod listeners;
pub mod scan;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod wifi;

pub use controller::Controller;
pub use event_loop::Command;
pub use interface::{EventSender, Interface};
pub use listeners::{Listener, ListenerRegistry};
pub use scheduler::{DeadlineScheduler, Scheduler, Task};
pub use store::{PreferencesStore, Store};
pub use types::{
    AccessPoint, AuthMode, ConnectionStatus, EventType, NetworkDetails, NetworkRecord,
};
