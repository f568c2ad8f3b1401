mod common;

use std::time::Duration;

use common::{ap, controller_with, open_ap, store, Note, TestController};
use wlconnect::backend::types::SIGNAL_NONE;
use wlconnect::backend::{AccessPoint, ConnectionStatus, EventType, NetworkRecord, Scheduler, Store, Task};

/// Enabled controller that has just asked the driver to join "Home".
fn connecting_to_home() -> (TestController, std::rc::Rc<common::RecordingListener>) {
    let (mut ctrl, recorder) =
        controller_with(store(false, Some("Home"), &[("Home", "secret")]));
    ctrl.begin();
    ctrl.toggle_enabled();
    recorder.take();
    (ctrl, recorder)
}

#[test]
fn enabling_reconnects_to_default_network() {
    let (mut ctrl, recorder) =
        controller_with(store(false, Some("Home"), &[("Home", "secret")]));
    ctrl.begin();
    assert!(recorder.take().is_empty());
    assert!(ctrl.interface().connects.is_empty());

    ctrl.toggle_enabled();

    assert!(ctrl.is_enabled());
    assert!(ctrl.is_connecting());
    assert!(ctrl.store().is_interface_enabled());
    assert_eq!(
        ctrl.interface().connects,
        vec![("Home".to_string(), "secret".to_string())]
    );
    assert_eq!(ctrl.current_network().ssid, "Home");
    assert_eq!(ctrl.current_network_status(), ConnectionStatus::Disconnected);
    assert_eq!(ctrl.status_text(), "Connecting");

    // The follow-up refresh finds nothing new, so one network notification.
    assert_eq!(
        recorder.take(),
        vec![
            Note::EnableChanged(true),
            Note::CurrentNetworkChanged,
            Note::ScanStarted
        ]
    );
    assert!(ctrl.scheduler().is_scheduled(Task::RefreshCurrentNetwork));
    assert_eq!(
        ctrl.scheduler().delay(Task::RefreshCurrentNetwork),
        Some(Duration::from_secs(2))
    );
}

#[test]
fn begin_connects_when_enabled() {
    let (mut ctrl, recorder) = controller_with(store(true, Some("Home"), &[("Home", "secret")]));
    ctrl.begin();

    assert!(ctrl.is_connecting());
    assert_eq!(ctrl.interface().connects.len(), 1);
    assert_eq!(
        recorder.take(),
        vec![Note::EnableChanged(true), Note::CurrentNetworkChanged]
    );
}

#[test]
fn begin_without_default_network_does_nothing_loud() {
    let (mut ctrl, recorder) = controller_with(store(true, None, &[]));
    ctrl.begin();

    assert!(ctrl.is_enabled());
    assert!(!ctrl.is_connecting());
    assert!(ctrl.interface().connects.is_empty());
    assert_eq!(recorder.take(), vec![Note::EnableChanged(true)]);
}

#[test]
fn got_ip_marks_connected() {
    let (mut ctrl, recorder) = connecting_to_home();

    ctrl.interface().emit(EventType::GotIp);
    assert_eq!(ctrl.poll_interface_events(), 1);

    assert_eq!(ctrl.current_network().ssid, "Home");
    assert_eq!(ctrl.current_network_status(), ConnectionStatus::Connected);
    assert!(!ctrl.is_connecting());
    assert_eq!(
        recorder.take(),
        vec![
            Note::CurrentNetworkChanged,
            Note::ConnectionStateChanged(EventType::GotIp)
        ]
    );
}

#[test]
fn associated_without_address_keeps_connecting() {
    let (mut ctrl, _recorder) = connecting_to_home();

    ctrl.interface().emit(EventType::Connected);
    ctrl.poll_interface_events();

    assert_eq!(ctrl.current_network_status(), ConnectionStatus::Idle);
    assert!(ctrl.is_connecting());
    assert_eq!(ctrl.status_text(), "Connected, no Internet");
}

#[test]
fn failed_connect_is_reported() {
    let (mut ctrl, recorder) = connecting_to_home();

    ctrl.interface().emit(EventType::ConnectionFailed);
    ctrl.poll_interface_events();

    assert!(!ctrl.is_connecting());
    assert_eq!(ctrl.current_network_status(), ConnectionStatus::ConnectFailed);
    assert_eq!(ctrl.status_text(), "Check password and try again");
    assert_eq!(
        recorder.count(&Note::ConnectionStateChanged(EventType::ConnectionFailed)),
        1
    );
}

#[test]
fn unknown_events_are_dropped() {
    let (mut ctrl, recorder) = connecting_to_home();

    ctrl.interface().emit(EventType::Unknown);
    assert_eq!(ctrl.poll_interface_events(), 1);

    assert!(recorder.take().is_empty());
    assert!(ctrl.is_connecting());
    assert_eq!(ctrl.current_network_status(), ConnectionStatus::Disconnected);
}

#[test]
fn connect_to_unseen_open_network() {
    let (mut ctrl, recorder) = controller_with(store(true, Some("Home"), &[("Home", "secret")]));
    ctrl.begin();
    recorder.take();

    assert!(ctrl.connect("Guest", ""));

    assert_eq!(ctrl.store().default_ssid().as_deref(), Some("Guest"));
    assert_eq!(ctrl.store().password("Guest"), None);
    assert_eq!(ctrl.store().password("Home").as_deref(), Some("secret"));
    assert_eq!(
        ctrl.current_network(),
        &NetworkRecord {
            ssid: "Guest".into(),
            open: true,
            signal: SIGNAL_NONE,
        }
    );
    assert_eq!(recorder.take(), vec![Note::CurrentNetworkChanged]);
}

#[test]
fn connect_uses_scan_data_and_persists_new_password() {
    let (mut ctrl, _recorder) = controller_with(store(true, None, &[("Office", "old")]));
    ctrl.begin();
    ctrl.interface_mut()
        .complete_scan(vec![ap("Office", -48), open_ap("Cafe", -70)]);
    ctrl.poll_interface_events();

    assert!(ctrl.connect("Office", "new"));

    assert_eq!(ctrl.store().password("Office").as_deref(), Some("new"));
    assert_eq!(
        ctrl.interface().connects.last(),
        Some(&("Office".to_string(), "new".to_string()))
    );
    assert_eq!(ctrl.current_network().signal, -48);
    assert!(!ctrl.current_network().open);
    assert_eq!(ctrl.current_network_index(), Some(0));
}

#[test]
fn empty_password_falls_back_to_stored_one() {
    let (mut ctrl, _recorder) = controller_with(store(true, None, &[("Office", "stored")]));
    ctrl.begin();

    assert!(ctrl.connect("Office", ""));

    assert_eq!(
        ctrl.interface().connects,
        vec![("Office".to_string(), "stored".to_string())]
    );
    assert_eq!(ctrl.store().password("Office").as_deref(), Some("stored"));
    assert!(!ctrl.current_network().open);
}

#[test]
fn rejected_connect_leaves_view_untouched() {
    let (mut ctrl, recorder) = controller_with(store(true, None, &[]));
    ctrl.begin();
    recorder.take();
    ctrl.interface_mut().reject_connect = true;

    assert!(!ctrl.connect("Guest", "pw"));

    assert!(!ctrl.is_connecting());
    assert_eq!(ctrl.current_network(), &NetworkRecord::default());
    assert!(recorder.take().is_empty());
}

#[test]
fn connect_while_disabled_is_refused() {
    let (mut ctrl, _recorder) = controller_with(store(false, None, &[]));
    ctrl.begin();

    assert!(!ctrl.connect("Guest", ""));
    assert!(!ctrl.is_connecting());
    assert!(ctrl.interface().connects.is_empty());
    assert_eq!(ctrl.store().default_ssid(), None);
}

#[test]
fn disabling_stops_everything() {
    let (mut ctrl, recorder) = connecting_to_home();
    assert!(ctrl.scheduler().is_scheduled(Task::RefreshCurrentNetwork));

    ctrl.toggle_enabled();

    assert!(!ctrl.is_enabled());
    assert!(!ctrl.is_connecting());
    assert!(!ctrl.store().is_interface_enabled());
    assert_eq!(ctrl.interface().disconnects, 1);
    assert!(!ctrl.scheduler().is_scheduled(Task::Scan));
    assert!(!ctrl.scheduler().is_scheduled(Task::RefreshCurrentNetwork));
    assert_eq!(recorder.take(), vec![Note::EnableChanged(false)]);

    // Stray timers after disabling do not re-arm themselves.
    ctrl.on_timer(Task::RefreshCurrentNetwork);
    ctrl.on_timer(Task::Scan);
    assert!(ctrl.scheduler().armed.is_empty());
    assert_eq!(ctrl.interface().scans_started, 1);
}

#[test]
fn disconnect_waits_for_driver_event() {
    let (mut ctrl, recorder) = connecting_to_home();

    ctrl.disconnect();

    assert!(!ctrl.is_connecting());
    assert_eq!(ctrl.interface().disconnects, 1);
    assert!(recorder.take().is_empty());

    ctrl.interface().emit(EventType::Disconnected);
    ctrl.poll_interface_events();
    assert_eq!(ctrl.status_text(), "Disconnected");
    assert_eq!(recorder.count(&Note::CurrentNetworkChanged), 1);
}

#[test]
fn forget_clears_credentials_and_matching_default() {
    let (mut ctrl, _recorder) = controller_with(store(
        true,
        Some("Home"),
        &[("Home", "secret"), ("Office", "pw")],
    ));

    ctrl.forget("Office");
    assert_eq!(ctrl.store().password("Office"), None);
    assert_eq!(ctrl.store().default_ssid().as_deref(), Some("Home"));

    ctrl.forget("Home");
    assert_eq!(ctrl.stored_password("Home"), None);
    assert_eq!(ctrl.store().default_ssid(), None);
}

#[test]
fn passive_refresh_notifies_only_on_change() {
    let (mut ctrl, recorder) = controller_with(store(true, Some("Home"), &[]));
    ctrl.interface_mut().reject_connect = true;
    ctrl.begin();
    ctrl.interface_mut()
        .complete_scan(vec![ap("Home", -55), ap("Other", -60)]);
    ctrl.poll_interface_events();
    recorder.take();

    ctrl.on_timer(Task::RefreshCurrentNetwork);
    ctrl.on_timer(Task::RefreshCurrentNetwork);

    assert_eq!(recorder.count(&Note::CurrentNetworkChanged), 1);
    assert_eq!(ctrl.current_network().signal, -55);
    assert_eq!(ctrl.current_network_status(), ConnectionStatus::Disconnected);
    assert_eq!(ctrl.current_network_index(), Some(0));
}

#[test]
fn out_of_range_is_sticky() {
    let (mut ctrl, recorder) = controller_with(store(true, Some("X"), &[]));
    ctrl.interface_mut().reject_connect = true;
    ctrl.begin();
    ctrl.resume();

    assert_eq!(ctrl.current_network().ssid, "X");
    assert_eq!(ctrl.current_network_status(), ConnectionStatus::OutOfRange);
    assert_eq!(ctrl.current_network().signal, SIGNAL_NONE);
    recorder.take();

    ctrl.on_timer(Task::RefreshCurrentNetwork);

    assert_eq!(ctrl.current_network_status(), ConnectionStatus::OutOfRange);
    assert_eq!(recorder.count(&Note::CurrentNetworkChanged), 0);
}

#[test]
fn connect_failure_survives_periodic_refresh() {
    let (mut ctrl, recorder) = connecting_to_home();
    ctrl.interface().emit(EventType::ConnectionFailed);
    ctrl.poll_interface_events();
    recorder.take();

    ctrl.on_timer(Task::RefreshCurrentNetwork);

    assert_eq!(ctrl.current_network_status(), ConnectionStatus::ConnectFailed);
    assert!(recorder.take().is_empty());
}

#[test]
fn live_association_takes_precedence() {
    let (mut ctrl, _recorder) = connecting_to_home();
    ctrl.interface_mut().ap = Some(AccessPoint {
        details: open_ap("Cafe", -61),
        status: ConnectionStatus::Connected,
    });

    ctrl.on_timer(Task::RefreshCurrentNetwork);

    assert_eq!(
        ctrl.current_network(),
        &NetworkRecord {
            ssid: "Cafe".into(),
            open: true,
            signal: -61,
        }
    );
    assert_eq!(ctrl.current_network_status(), ConnectionStatus::Connected);
}

#[test]
fn scan_promotes_and_demotes_current_network() {
    let (mut ctrl, recorder) = controller_with(store(true, Some("X"), &[]));
    ctrl.interface_mut().reject_connect = true;
    ctrl.begin();
    ctrl.resume();
    recorder.take();
    assert_eq!(ctrl.current_network_status(), ConnectionStatus::OutOfRange);

    ctrl.interface_mut()
        .complete_scan(vec![ap("A", -70), ap("X", -50), ap("X", -65)]);
    ctrl.poll_interface_events();

    assert_eq!(ctrl.current_network_status(), ConnectionStatus::Disconnected);
    assert_eq!(ctrl.current_network_index(), Some(0));
    assert_eq!(ctrl.scanned_networks().len(), 2);
    assert_eq!(recorder.take(), vec![Note::ScanCompleted]);
    assert_eq!(
        ctrl.scheduler().delay(Task::Scan),
        Some(Duration::from_secs(15))
    );

    ctrl.interface_mut().complete_scan(vec![ap("A", -70)]);
    ctrl.poll_interface_events();

    assert_eq!(ctrl.current_network_status(), ConnectionStatus::OutOfRange);
    assert_eq!(ctrl.current_network_index(), None);
}

#[test]
fn empty_scan_clears_list_only() {
    let (mut ctrl, recorder) = controller_with(store(true, Some("X"), &[]));
    ctrl.interface_mut().reject_connect = true;
    ctrl.begin();
    ctrl.interface_mut().complete_scan(vec![ap("X", -50)]);
    ctrl.poll_interface_events();
    ctrl.on_timer(Task::RefreshCurrentNetwork);
    assert_eq!(ctrl.current_network_index(), Some(0));
    recorder.take();
    ctrl.scheduler_mut().cancel(Task::Scan);

    ctrl.interface_mut().complete_scan(Vec::new());
    ctrl.poll_interface_events();

    assert!(ctrl.scanned_networks().is_empty());
    assert_eq!(ctrl.current_network_index(), None);
    assert_eq!(recorder.take(), vec![Note::ScanCompleted]);
    assert!(ctrl.scheduler().is_scheduled(Task::Scan));
}

#[test]
fn other_networks_skip_the_current_one() {
    let (mut ctrl, _recorder) = controller_with(store(true, Some("Home"), &[]));
    ctrl.interface_mut().reject_connect = true;
    ctrl.begin();
    ctrl.interface_mut()
        .complete_scan(vec![ap("B", -60), ap("Home", -50), ap("A", -40)]);
    ctrl.poll_interface_events();
    ctrl.resume();

    assert_eq!(ctrl.current_network_index(), Some(1));
    assert_eq!(ctrl.other_scanned_networks_count(), 2);
    assert_eq!(ctrl.other_network(0).map(|n| n.ssid.as_str()), Some("A"));
    assert_eq!(ctrl.other_network(1).map(|n| n.ssid.as_str()), Some("B"));
    assert_eq!(ctrl.other_network(2), None);
    assert_eq!(ctrl.lookup_network("Home").map(|n| n.signal), Some(-50));
    assert_eq!(ctrl.lookup_network("Nope"), None);
}

#[test]
fn resume_with_finished_scan_arms_next_one() {
    let (mut ctrl, recorder) = controller_with(store(true, None, &[]));
    ctrl.begin();
    ctrl.interface_mut().scan_done = true;
    recorder.take();

    ctrl.resume();

    assert_eq!(ctrl.interface().scans_started, 0);
    assert!(recorder.take().contains(&Note::ScanCompleted));
    assert!(ctrl.scheduler().is_scheduled(Task::Scan));

    ctrl.pause();
    assert!(!ctrl.scheduler().is_scheduled(Task::Scan));
    assert!(ctrl.scheduler().is_scheduled(Task::RefreshCurrentNetwork));
}

#[test]
fn resume_while_disabled_is_a_no_op() {
    let (mut ctrl, recorder) = controller_with(store(false, None, &[]));
    ctrl.begin();
    ctrl.resume();

    assert!(ctrl.scheduler().armed.is_empty());
    assert_eq!(ctrl.interface().scans_started, 0);
    assert!(recorder.take().is_empty());
}

#[test]
fn rejected_periodic_scan_is_retried_later() {
    let (mut ctrl, recorder) = controller_with(store(true, None, &[]));
    ctrl.begin();
    ctrl.interface_mut().reject_scan = true;

    ctrl.on_timer(Task::Scan);

    assert!(ctrl.scheduler().is_scheduled(Task::Scan));
    assert!(!recorder.take().contains(&Note::ScanStarted));
    assert!(!ctrl.start_scan());
}

#[test]
fn removed_listener_hears_nothing() {
    let (mut ctrl, recorder) = controller_with(store(false, None, &[]));
    let as_listener: std::rc::Rc<dyn wlconnect::backend::Listener> = recorder.clone();
    ctrl.remove_listener(&as_listener);

    ctrl.toggle_enabled();

    assert!(recorder.take().is_empty());
}

#[test]
fn dropping_controller_unregisters_from_interface() {
    let (ctrl, _recorder) = controller_with(store(true, None, &[]));
    let registered = ctrl.interface().listeners.clone();
    assert_eq!(registered.borrow().len(), 1);

    drop(ctrl);

    assert!(registered.borrow().is_empty());
}
