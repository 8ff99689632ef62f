use eframe::egui::{self, Ui};
use egui_extras::{Size, StripBuilder};

use crate::configuration::City;
use crate::data::filter::TimeFilter;
use crate::layers::Camera;
use crate::state::AppState;
use crate::ui::{histogram, map, panels};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct OzoneApp {
    pub state: AppState,
}

impl OzoneApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn overview_title(filter: Option<TimeFilter>) -> String {
    match filter {
        Some(TimeFilter::At(instant)) => format!("All Europe on {}", instant.format("%Y-%m-%d %H:%M")),
        Some(TimeFilter::Hour(h)) => format!("All Europe from {h}:00 and {}:00", (h + 1) % 24),
        None => "All Europe".to_string(),
    }
}

fn titled_map(ui: &mut Ui, title: &str, id: &str, camera: Camera, state: &AppState) {
    ui.vertical(|ui: &mut Ui| {
        ui.strong(title);
        map::map_plot(ui, id, camera, &state.layers, state.reset_cameras);
    });
}

/// Overview map on the midpoint, then one map per configured city.
fn map_grid(ui: &mut Ui, state: &AppState) {
    let Some(midpoint) = state.midpoint else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a measurement file to start  (File → Open…)");
        });
        return;
    };

    let (overview_zoom, city_zoom) = state.settings.view.zooms(state.layer);
    let overview = Camera::new(midpoint.lat, midpoint.lon, overview_zoom);
    let cities: &[City] = &state.settings.cities.0;

    StripBuilder::new(ui)
        .size(Size::relative(0.4))
        .sizes(Size::remainder(), cities.len())
        .horizontal(|mut strip| {
            strip.cell(|ui: &mut Ui| {
                titled_map(ui, &overview_title(state.current_filter()), "map_overview", overview, state);
            });
            for city in cities {
                strip.cell(|ui: &mut Ui| {
                    let camera = Camera::new(city.lat, city.lon, city_zoom);
                    titled_map(ui, &city.name, &format!("map_{}", city.name), camera, state);
                });
            }
        });
}

impl eframe::App for OzoneApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: time selection ----
        egui::SidePanel::left("time_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Bottom panel: minute histogram ----
        if self.state.show_histogram {
            egui::TopBottomPanel::bottom("histogram_panel")
                .resizable(true)
                .default_height(180.0)
                .show(ctx, |ui| {
                    histogram::minute_histogram(ui, &self.state);
                });
        }

        // ---- Central panel: maps ----
        egui::CentralPanel::default().show(ctx, |ui| {
            map_grid(ui, &self.state);
        });
        self.state.reset_cameras = false;
    }
}
