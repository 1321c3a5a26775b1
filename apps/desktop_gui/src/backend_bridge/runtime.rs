//! Runtime bridge between UI command queue and the user controller.

use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use client_core::{
    build_controller, ClientSettings, ControllerSnapshot, TeardownHandle, UserController,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use tokio::sync::{mpsc, watch};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

const FULL_QUEUE_RETRY: Duration = Duration::from_millis(16);

pub fn launch(
    settings: ClientSettings,
    teardown: TeardownHandle,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::new(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(run_worker(settings, teardown, cmd_rx, ui_tx));
    })
}

async fn run_worker(
    settings: ClientSettings,
    teardown: TeardownHandle,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    let mut controller = build_controller(&settings, teardown);
    let forwarder = tokio::spawn(forward_snapshots(controller.subscribe(), ui_tx.clone()));
    let mut commands = bridge_commands(cmd_rx);

    let _ = ui_tx.try_send(UiEvent::Info("Ready".to_string()));
    if let Err(err) = controller.load().await {
        tracing::debug!(error = %err, "backend: initial load failed");
    }

    while let Some(cmd) = commands.recv().await {
        apply_command(&mut controller, cmd).await;
    }

    controller.tear_down();
    forwarder.abort();
    tracing::info!("backend: worker stopped");
}

/// Moves blocking crossbeam receives off the async workers. The returned
/// receiver closes once every UI sender is dropped.
fn bridge_commands(cmd_rx: Receiver<BackendCommand>) -> mpsc::UnboundedReceiver<BackendCommand> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            if tx.send(cmd).is_err() {
                break;
            }
        }
    });
    rx
}

/// Forwards controller snapshots to the UI queue. A full queue is retried
/// with the newest snapshot, so the settled state always reaches the UI.
async fn forward_snapshots(mut rx: watch::Receiver<ControllerSnapshot>, ui_tx: Sender<UiEvent>) {
    while rx.changed().await.is_ok() {
        let mut event = UiEvent::Snapshot(rx.borrow_and_update().clone());
        loop {
            match ui_tx.try_send(event) {
                Ok(()) => break,
                Err(TrySendError::Full(pending)) => {
                    tracing::debug!("backend: ui event queue full, retrying snapshot");
                    tokio::time::sleep(FULL_QUEUE_RETRY).await;
                    event = match rx.has_changed() {
                        Ok(true) => UiEvent::Snapshot(rx.borrow_and_update().clone()),
                        _ => pending,
                    };
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

async fn apply_command(controller: &mut UserController, cmd: BackendCommand) {
    let name = cmd.name();
    let result = match cmd {
        BackendCommand::Refresh => controller.load().await,
        BackendCommand::SetField { field, value } => {
            controller.set_field(field, value);
            Ok(())
        }
        BackendCommand::BeginEdit { id } => {
            controller.begin_edit(id);
            Ok(())
        }
        BackendCommand::CancelEdit => {
            controller.cancel_edit();
            Ok(())
        }
        BackendCommand::Submit => controller.submit().await.map(|_| ()),
        // The dialog already asked.
        BackendCommand::DeleteConfirmed { id } => {
            controller.delete(id, &|_: &str| true).await.map(|_| ())
        }
    };

    if let Err(err) = result {
        tracing::debug!(command = name, error = %err, "backend: command failed");
    }
}
