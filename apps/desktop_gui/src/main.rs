mod backend;
mod config;
mod ui;

use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;
use tracing::info;

use crate::backend::{BackendCommand, UiEvent};
use crate::ui::app::{PersistedLoginSettings, WiregramApp, SETTINGS_STORAGE_KEY};

#[derive(Debug, Parser)]
#[command(name = "wiregram", about = "Desktop client for the Wiregram message service")]
struct Cli {
    /// Base URL of the message service, e.g. http://127.0.0.1:8000.
    #[arg(long)]
    server_url: Option<String>,

    /// Tracing filter directive, e.g. `info` or `client_core=debug`.
    #[arg(long)]
    log_filter: Option<String>,
}

fn main() -> eframe::Result<()> {
    let cli = Cli::parse();
    let mut settings = config::load_settings();
    if let Some(server_url) = cli.server_url {
        settings.server_url = server_url;
    }
    if let Some(log_filter) = cli.log_filter {
        settings.log_filter = log_filter;
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();
    info!(server_url = %settings.server_url, "starting wiregram desktop client");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(1024);
    backend::spawn_backend_thread(cmd_rx, ui_tx);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Wiregram")
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([860.0, 560.0]),
        ..Default::default()
    };
    let default_server_url = settings.server_url;
    eframe::run_native(
        "Wiregram",
        options,
        Box::new(move |cc| {
            let persisted = cc.storage.and_then(|storage| {
                storage
                    .get_string(SETTINGS_STORAGE_KEY)
                    .and_then(|text| serde_json::from_str::<PersistedLoginSettings>(&text).ok())
            });
            Ok(Box::new(WiregramApp::new(
                cmd_tx,
                ui_rx,
                default_server_url,
                persisted,
            )))
        }),
    )
}
