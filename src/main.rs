mod app;
mod color;
mod configuration;
mod data;
mod layers;
mod query;
mod state;
mod ui;

use app::OzoneApp;
use configuration::{get_configuration, Settings};
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let mut settings = get_configuration().unwrap_or_else(|e| {
        log::error!("Failed to read configuration, using defaults: {e}");
        Settings::default()
    });
    // `ozone-atlas '?hour=2'` opens with that selection.
    if let Some(query) = std::env::args().nth(1) {
        settings.view.initial_query = Some(query);
    }

    let mut state = AppState::new(settings);
    let path = state.settings.data.path.clone();
    if path.exists() {
        ui::panels::load_into(&mut state, path);
    } else {
        log::warn!("Data file {} not found", path.display());
        state.status_message = Some(format!("{} not found; use File → Open…", path.display()));
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("European Air Pollution")
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        "European Air Pollution",
        options,
        Box::new(|_cc| Ok(Box::new(OzoneApp::new(state)))),
    )
}
