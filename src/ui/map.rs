use eframe::egui::{Stroke, Ui};
use egui_plot::{Plot, PlotBounds, PlotPoints, Points, Polygon};

use crate::layers::{Camera, MapLayers};

// ---------------------------------------------------------------------------
// Map plot: x = longitude, y = latitude
// ---------------------------------------------------------------------------

/// Render one map. When `reset_camera` is set the plot bounds jump back to
/// `camera`; otherwise the user's pan/zoom is kept.
pub fn map_plot(ui: &mut Ui, id: &str, camera: Camera, layers: &MapLayers, reset_camera: bool) {
    let size = ui.available_size();

    Plot::new(id)
        .width(size.x)
        .height(size.y)
        .x_axis_label("lon")
        .y_axis_label("lat")
        .label_formatter(|name, value| {
            let position = format!("{:.4}°N  {:.4}°E", value.y, value.x);
            if name.is_empty() {
                position
            } else {
                format!("{name}\n{position}")
            }
        })
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if reset_camera {
                let (min, max) = camera.bounds(size.x as f64, size.y as f64);
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(min, max));
            }

            match layers {
                MapLayers::Columns(buckets) => {
                    for bucket in buckets {
                        let points = Points::new(PlotPoints::from(bucket.points.clone()))
                            .radius(bucket.radius)
                            .color(bucket.color)
                            .filled(true)
                            .name(format!("O₃ ≥ {:.0}", bucket.o3));
                        plot_ui.points(points);
                    }
                }
                MapLayers::Hexagons(bins) => {
                    for bin in bins {
                        let outline = Polygon::new(PlotPoints::from(bin.vertices.to_vec()))
                            .fill_color(bin.color.gamma_multiply(0.8))
                            .stroke(Stroke::new(0.5, bin.color))
                            .name(format!("{} measurements", bin.count));
                        plot_ui.polygon(outline);
                    }
                }
            }
        });
}
