use std::process::ExitCode;
use std::rc::Rc;

use async_channel::Sender;
use tokio::io::{AsyncBufReadExt, BufReader};

use wlconnect::backend::event_loop;
use wlconnect::backend::wifi::IwdInterface;
use wlconnect::backend::{
    Command, Controller, DeadlineScheduler, EventType, Listener, PreferencesStore,
};
use wlconnect::DaemonConfig;

/// Observer that reports every notification in the log.
struct LogObserver;

impl Listener for LogObserver {
    fn on_enable_changed(&self, enabled: bool) {
        tracing::info!(enabled, "Wi-Fi enabled changed");
    }

    fn on_scan_started(&self) {
        tracing::debug!("Scan started");
    }

    fn on_scan_completed(&self) {
        tracing::debug!("Scan list updated");
    }

    fn on_current_network_changed(&self) {
        tracing::debug!("Current network updated");
    }

    fn on_connection_state_changed(&self, event: EventType) {
        tracing::info!(?event, "Connection state changed");
    }
}

async fn read_commands(cmd_tx: Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match line.parse::<Command>() {
                Ok(cmd) => {
                    let quit = cmd == Command::Shutdown;
                    if cmd_tx.send(cmd).await.is_err() || quit {
                        break;
                    }
                }
                Err(e) => tracing::warn!("{}", e),
            },
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read stdin: {}", e);
                break;
            }
        }
    }
    tracing::debug!("Command input closed");
}

async fn run(config: DaemonConfig) -> wlconnect::Result<()> {
    let store = PreferencesStore::open(&config.store_path)?;

    let conn = zbus::Connection::system().await?;
    tracing::info!("Connected to system D-Bus");
    let interface = IwdInterface::new(conn).await?;

    let mut controller = Controller::new(
        interface,
        store,
        DeadlineScheduler::new(),
        config.controller,
    );
    let observer: Rc<dyn Listener> = Rc::new(LogObserver);
    controller.add_listener(&observer);
    controller.begin();
    controller.resume();

    let (cmd_tx, cmd_rx) = async_channel::unbounded();
    tokio::task::spawn_local(read_commands(cmd_tx));
    event_loop::run(&mut controller, cmd_rx).await;

    controller.remove_listener(&observer);
    controller.interface().close().await;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = DaemonConfig::from_env();
    tracing::info!(store = %config.store_path.display(), "Starting wlconnect");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let local = tokio::task::LocalSet::new();
    match local.block_on(&runtime, run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
