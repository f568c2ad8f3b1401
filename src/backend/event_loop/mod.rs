//! Async driver for a [`Controller`] on a single-threaded runtime.
//!
//! Interface events, fired timers and caller commands are turned into
//! [`LoopEvent`]s and handled one at a time, each to completion.

mod state;
mod streams;

use std::str::FromStr;

use async_channel::Receiver;

use super::controller::Controller;
use super::interface::Interface;
use super::scheduler::DeadlineScheduler;
use super::store::Store;
use super::types::EventType;

pub use state::LoopAction;
pub use streams::EventStreams;

/// Requests from the host (a UI, a CLI) to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleEnabled,
    StartScan,
    Connect { ssid: String, password: String },
    Disconnect,
    Forget { ssid: String },
    Pause,
    Resume,
    /// Log a one-line snapshot of the controller.
    Status,
    Shutdown,
}

impl FromStr for Command {
    type Err = String;

    /// Parses one line of the daemon's text protocol, e.g.
    /// `connect Home secret`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or_else(|| "empty command".to_string())?;
        let cmd = match verb {
            "toggle" => Command::ToggleEnabled,
            "scan" => Command::StartScan,
            "connect" => {
                let ssid = words.next().ok_or("usage: connect <ssid> [password]")?;
                Command::Connect {
                    ssid: ssid.to_string(),
                    password: words.next().unwrap_or_default().to_string(),
                }
            }
            "disconnect" => Command::Disconnect,
            "forget" => {
                let ssid = words.next().ok_or("usage: forget <ssid>")?;
                Command::Forget {
                    ssid: ssid.to_string(),
                }
            }
            "pause" => Command::Pause,
            "resume" => Command::Resume,
            "status" => Command::Status,
            "quit" | "exit" => Command::Shutdown,
            other => return Err(format!("unknown command {other:?}")),
        };
        if words.next().is_some() {
            return Err(format!("too many arguments for {verb:?}"));
        }
        Ok(cmd)
    }
}

#[derive(Debug)]
pub enum LoopEvent {
    Interface(EventType),
    TimerFired,
    Command(Command),
    CommandChannelClosed,
}

/// Runs `controller` until [`Command::Shutdown`] or until every command
/// sender is dropped.
pub async fn run<I: Interface, S: Store>(
    controller: &mut Controller<I, S, DeadlineScheduler>,
    cmd_rx: Receiver<Command>,
) {
    let mut streams = EventStreams {
        cmd_rx,
        interface_rx: controller.interface_events(),
        deadline: None,
    };
    tracing::info!("Event loop started");

    loop {
        streams.deadline = controller.scheduler().next_deadline();
        let event = streams.next_event().await;
        if let LoopAction::Break = state::handle_event(controller, event) {
            break;
        }
    }

    tracing::info!("Event loop stopped");
}
