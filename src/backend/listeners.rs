//! Observer registration for controller notifications.

use std::rc::{Rc, Weak};

use super::types::EventType;

/// Receives controller notifications. Every method defaults to a no-op so an
/// observer only implements what it shows.
///
/// Callbacks run synchronously inside the controller call that caused them
/// and must not attach or detach observers.
pub trait Listener {
    fn on_enable_changed(&self, _enabled: bool) {}
    fn on_scan_started(&self) {}
    fn on_scan_completed(&self) {}
    fn on_current_network_changed(&self) {}
    fn on_connection_state_changed(&self, _event: EventType) {}
}

/// Unordered multicast group of weakly held observers.
///
/// Observers own their lifetime; a dropped observer silently stops receiving
/// notifications and its slot is reclaimed on the next attach.
///
/// Backed by a plain `Vec`: attach and detach scan the entries, which is
/// linear in the number of observers. A controller has a handful at most.
pub struct ListenerRegistry<L: ?Sized> {
    entries: Vec<Weak<L>>,
}

impl<L: ?Sized> Default for ListenerRegistry<L> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<L: ?Sized> ListenerRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener`. Attaching an already attached observer is a no-op.
    pub fn attach(&mut self, listener: &Rc<L>) {
        self.entries.retain(|w| w.strong_count() > 0);
        let weak = Rc::downgrade(listener);
        if !self.entries.iter().any(|w| Weak::ptr_eq(w, &weak)) {
            self.entries.push(weak);
        }
    }

    /// Removes `listener` if attached.
    pub fn detach(&mut self, listener: &Rc<L>) {
        let weak = Rc::downgrade(listener);
        if let Some(pos) = self.entries.iter().position(|w| Weak::ptr_eq(w, &weak)) {
            self.entries.swap_remove(pos);
        }
    }

    /// Calls `f` once for every live observer.
    pub fn notify_all(&self, mut f: impl FnMut(&L)) {
        for weak in &self.entries {
            if let Some(listener) = weak.upgrade() {
                f(&*listener);
            }
        }
    }

    /// Number of observers still alive.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|w| w.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
