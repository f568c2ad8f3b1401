use tokio::time::Instant;

use super::super::controller::Controller;
use super::super::interface::Interface;
use super::super::scheduler::DeadlineScheduler;
use super::super::store::Store;
use super::{Command, LoopEvent};

pub enum LoopAction {
    Continue,
    Break,
}

pub fn handle_event<I: Interface, S: Store>(
    controller: &mut Controller<I, S, DeadlineScheduler>,
    event: LoopEvent,
) -> LoopAction {
    match event {
        LoopEvent::Interface(event) => controller.handle_event(event),

        LoopEvent::TimerFired => {
            let now = Instant::now();
            while let Some(task) = controller.scheduler_mut().pop_due(now) {
                tracing::trace!(?task, "Timer fired");
                controller.on_timer(task);
            }
        }

        LoopEvent::Command(cmd) => return handle_command(controller, cmd),

        LoopEvent::CommandChannelClosed => {
            tracing::debug!("Command channel closed");
            return LoopAction::Break;
        }
    }

    LoopAction::Continue
}

fn handle_command<I: Interface, S: Store>(
    controller: &mut Controller<I, S, DeadlineScheduler>,
    cmd: Command,
) -> LoopAction {
    match &cmd {
        // Keep passwords out of the log.
        Command::Connect { ssid, .. } => tracing::debug!(ssid = %ssid, "Received connect command"),
        other => tracing::debug!("Received command: {:?}", other),
    }

    match cmd {
        Command::Shutdown => {
            tracing::info!("Shutdown requested");
            return LoopAction::Break;
        }
        Command::ToggleEnabled => controller.toggle_enabled(),
        Command::StartScan => {
            if !controller.start_scan() {
                tracing::warn!("Scan not started, one may already be running");
            }
        }
        Command::Connect { ssid, password } => {
            controller.connect(&ssid, &password);
        }
        Command::Disconnect => controller.disconnect(),
        Command::Forget { ssid } => controller.forget(&ssid),
        Command::Pause => controller.pause(),
        Command::Resume => controller.resume(),
        Command::Status => {
            let current = controller.current_network();
            tracing::info!(
                enabled = controller.is_enabled(),
                ssid = %current.ssid,
                signal = current.signal,
                status = controller.status_text(),
                networks = controller.scanned_networks().len(),
                "Status"
            );
        }
    }

    LoopAction::Continue
}
