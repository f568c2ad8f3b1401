use async_channel::Receiver;

use super::super::types::EventType;
use super::{Command, LoopEvent};

pub struct EventStreams {
    pub cmd_rx: Receiver<Command>,
    pub interface_rx: Receiver<EventType>,
    /// Earliest armed controller timer.
    pub deadline: Option<tokio::time::Instant>,
}

impl EventStreams {
    pub async fn next_event(&mut self) -> LoopEvent {
        let deadline = self.deadline;
        tokio::select! {
            // Hardware events take priority over timers.
            biased;

            Ok(event) = self.interface_rx.recv() => {
                LoopEvent::Interface(event)
            }

            _ = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            } => {
                LoopEvent::TimerFired
            }

            result = self.cmd_rx.recv() => {
                match result {
                    Ok(cmd) => LoopEvent::Command(cmd),
                    Err(_) => LoopEvent::CommandChannelClosed,
                }
            }
        }
    }
}
