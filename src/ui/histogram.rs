use eframe::egui::{Color32, Ui};
use egui_plot::{Line, Plot, PlotPoints};

use crate::data::filter::TimeFilter;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Minute histogram (bottom panel)
// ---------------------------------------------------------------------------

fn title(filter: TimeFilter) -> String {
    match filter {
        TimeFilter::At(instant) => format!(
            "Breakdown of measurements per minute on {}",
            instant.format("%d/%m/%Y")
        ),
        TimeFilter::Hour(h) => format!(
            "Breakdown of measurements per minute between {h}:00 and {}:00",
            (h + 1) % 24
        ),
    }
}

/// Step-after area chart of the 60 per-minute counts.
pub fn minute_histogram(ui: &mut Ui, state: &AppState) {
    let (Some(hist), Some(filter)) = (&state.histogram, state.current_filter()) else {
        ui.label("No measurements selected.");
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        ui.strong(title(filter));
        ui.label(format!("({} measurements)", hist.total()));
    });

    // Each count holds from its minute until the next one.
    let points: PlotPoints = hist
        .counts()
        .iter()
        .enumerate()
        .flat_map(|(minute, &count)| {
            let (x, y) = (minute as f64, count as f64);
            [[x, y], [x + 1.0, y]]
        })
        .collect();

    Plot::new("minute_histogram")
        .height(ui.available_height().max(80.0))
        .x_axis_label("minute")
        .y_axis_label("measurements")
        .include_x(0.0)
        .include_x(60.0)
        .include_y(0.0)
        .include_y(hist.max() as f64 + 1.0)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(points)
                    .color(Color32::RED)
                    .fill(0.0_f32)
                    .name("measurements"),
            );
        });
}
