use std::path::PathBuf;
use std::sync::Arc;

use eframe::egui::{self, Color32, RichText, Slider, Ui};
use egui_extras::DatePickerButton;

use crate::configuration::{LayerKind, TimeMode};
use crate::data::export::write_records;
use crate::data::loader::load_file;
use crate::state::AppState;

const DESCRIPTION: &str = "Illustrating how ozone air pollution measured at stations across \
Europe can vary with time. Focus in on three cities: London, Paris, and Rome. By sliding the \
slider on the left you can view different slices of time and explore ozone.";

// ---------------------------------------------------------------------------
// Left side panel – time selection
// ---------------------------------------------------------------------------

/// Render the left panel: title, description, time slider and summary.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("European Ozone Air Pollution");
    ui.add_space(4.0);
    ui.label(DESCRIPTION);
    ui.separator();

    let Some(dataset) = state.dataset.clone() else {
        ui.label("No dataset loaded.");
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        let mut mode = state.selection.mode;
        ui.selectable_value(&mut mode, TimeMode::Datetime, "Date & time");
        ui.selectable_value(&mut mode, TimeMode::Hour, "Hour of day");
        state.set_mode(mode);
    });
    ui.add_space(4.0);

    let mut changed = false;
    match state.selection.mode {
        TimeMode::Datetime => {
            let stops = dataset.timestamps();
            if stops.is_empty() {
                ui.label("The dataset has no timestamps.");
            } else {
                ui.strong("Select date");
                let last = stops.len() - 1;
                changed |= ui
                    .add(
                        Slider::new(&mut state.selection.timestamp_index, 0..=last)
                            .show_value(false),
                    )
                    .changed();

                let current = stops[state.selection.timestamp_index.min(last)];
                ui.label(current.format("%d/%m/%Y %H:%M").to_string());

                let mut day = current.date();
                if ui
                    .add(DatePickerButton::new(&mut day).id_salt("jump_to_date"))
                    .changed()
                {
                    state.jump_to_date(day);
                }
            }
        }
        TimeMode::Hour => {
            ui.strong("Select hour");
            changed |= ui
                .add(Slider::new(&mut state.selection.hour, 0..=23).suffix(":00"))
                .changed();
        }
    }
    if changed {
        state.on_selection_changed();
    }

    ui.separator();
    ui.label(format!("{} measurements shown", state.visible_indices.len()));
    if let Some(mp) = state.midpoint {
        ui.label(format!("Midpoint: {mp}"));
    }
    if let Some((lo, hi)) = dataset.o3_range() {
        ui.label(format!("Ozone range: {lo:.1} – {hi:.1}"));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.dataset.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export view…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            if ds.is_empty() {
                ui.label("The loaded file has no measurements");
            } else {
                ui.label(format!(
                    "{} measurements loaded, {} visible",
                    ds.len(),
                    state.visible_indices.len()
                ));
            }
        }

        ui.separator();

        let mut layer = state.layer;
        ui.selectable_value(&mut layer, LayerKind::Column, "Columns");
        ui.selectable_value(&mut layer, LayerKind::Hexagon, "Hexagons");
        state.set_layer(layer);

        ui.separator();

        ui.toggle_value(&mut state.show_histogram, "Histogram");
        if ui.button("Reset view").clicked() {
            state.reset_cameras = true;
        }
        if let Some(query) = state.current_query() {
            if ui
                .button("Copy link")
                .on_hover_text(format!("?{query}"))
                .clicked()
            {
                ui.ctx().copy_text(format!("?{query}"));
            }
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

/// Load `path` and hand the dataset to the state, or surface the error.
pub fn load_into(state: &mut AppState, path: PathBuf) {
    match load_file(&path, state.settings.data.columns, state.settings.data.max_rows) {
        Ok(dataset) => state.set_dataset(Arc::new(dataset)),
        Err(e) => {
            let e = anyhow::Error::new(e);
            log::error!("Failed to load {}: {e:#}", path.display());
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open ozone measurements")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        load_into(state, path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered view")
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .set_file_name("ozone_view.csv")
        .save_file();

    if let Some(path) = file {
        if let Err(e) = write_records(&path, state.visible()) {
            log::error!("Failed to export {}: {e:#}", path.display());
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
