mod backend_bridge;
mod controller;
mod ui;

use std::path::PathBuf;

use clap::Parser;
use client_core::{
    config::{self, ClientSettings},
    BackendMode, TeardownHandle,
};
use crossbeam_channel::bounded;
use eframe::egui;
use tracing_subscriber::EnvFilter;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::UiEvent;
use crate::ui::UserAdminApp;

#[derive(Parser, Debug)]
struct Args {
    /// Settings file; defaults to APP__CONFIG_PATH or ./user_admin.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    latency_ms: Option<u64>,
    /// 0 disables the request timeout.
    #[arg(long)]
    request_timeout_ms: Option<u64>,
    #[arg(long)]
    backend_mode: Option<BackendMode>,
    /// Only remove deleted users from the local list.
    #[arg(long)]
    local_deletes: bool,
}

impl Args {
    fn resolve_settings(&self) -> ClientSettings {
        let path = self.config.clone().unwrap_or_else(config::config_path);
        let mut settings = config::load_settings_from(&path);
        if let Some(v) = self.latency_ms {
            settings.latency_ms = v;
        }
        if let Some(v) = self.request_timeout_ms {
            settings.request_timeout_ms = v;
        }
        if let Some(v) = self.backend_mode {
            settings.backend_mode = v;
        }
        if self.local_deletes {
            settings.propagate_deletes = false;
        }
        settings
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let settings = Args::parse().resolve_settings();

    let teardown = TeardownHandle::new();
    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    backend_bridge::runtime::launch(settings, teardown.clone(), cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("User Admin")
            .with_inner_size([720.0, 640.0])
            .with_min_inner_size([480.0, 420.0]),
        ..Default::default()
    };
    let result = eframe::run_native(
        "User Admin",
        options,
        Box::new(move |_cc| Ok(Box::new(UserAdminApp::new(cmd_tx, ui_rx)))),
    );

    teardown.tear_down();
    result
}
