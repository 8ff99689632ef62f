//! Map layer geometry: camera bounds, ozone-keyed markers and hexagon bins.
//!
//! Everything here is plain data in longitude/latitude space; the UI turns
//! it into plot items.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use eframe::egui::Color32;

use crate::color::{density_color, ozone_color};
use crate::configuration::{ColumnLayerSettings, HexagonLayerSettings, LayerKind, Settings};
use crate::data::model::Measurement;

/// Web-map tile size in pixels at zoom 0.
const TILE_SIZE: f64 = 512.0;

const METERS_PER_DEGREE_LAT: f64 = 110_574.0;
const METERS_PER_DEGREE_LON: f64 = 111_320.0;

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
}

impl Camera {
    pub fn new(lat: f64, lon: f64, zoom: f64) -> Self {
        Camera { lat, lon, zoom }
    }

    /// Visible `[min_lon, min_lat]`, `[max_lon, max_lat]` for a widget of
    /// `width × height` pixels.
    pub fn bounds(&self, width: f64, height: f64) -> ([f64; 2], [f64; 2]) {
        let width = width.max(1.0);
        let lon_span = 360.0 * width / (TILE_SIZE * 2f64.powf(self.zoom));
        let lat_span = lon_span * (height / width) * self.lat.to_radians().cos();
        (
            [self.lon - lon_span / 2.0, self.lat - lat_span / 2.0],
            [self.lon + lon_span / 2.0, self.lat + lat_span / 2.0],
        )
    }
}

// ---------------------------------------------------------------------------
// Column layer
// ---------------------------------------------------------------------------

/// Measurements sharing one ozone bucket, drawn with one colour and size.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBucket {
    /// Lower edge of the bucket.
    pub o3: f64,
    pub color: Color32,
    pub radius: f32,
    /// `[lon, lat]` per measurement.
    pub points: Vec<[f64; 2]>,
}

/// Group measurements into ozone buckets. Records without a finite ozone
/// value are left out.
pub fn column_buckets<'a>(
    records: impl IntoIterator<Item = &'a Measurement>,
    settings: &ColumnLayerSettings,
) -> Vec<ColumnBucket> {
    let width = if settings.bucket_width > 0.0 {
        settings.bucket_width
    } else {
        1.0
    };

    let mut buckets: BTreeMap<i64, Vec<[f64; 2]>> = BTreeMap::new();
    for m in records {
        if !m.o3.is_finite() {
            continue;
        }
        let key = (m.o3 / width).floor() as i64;
        buckets.entry(key).or_default().push([m.lon, m.lat]);
    }

    let [min_r, max_r] = settings.radius_px;
    buckets
        .into_iter()
        .map(|(key, points)| {
            let o3 = key as f64 * width;
            let mid = o3 + width / 2.0;
            let t = if settings.max_o3 > 0.0 {
                (mid / settings.max_o3).clamp(0.0, 1.0) as f32
            } else {
                1.0
            };
            ColumnBucket {
                o3,
                color: ozone_color(mid),
                radius: min_r + (max_r - min_r) * t,
                points,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Hexagon layer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct HexBin {
    /// `[lon, lat]` of the hexagon center.
    pub center: [f64; 2],
    /// Corner points, `[lon, lat]`, counter-clockwise.
    pub vertices: [[f64; 2]; 6],
    pub count: usize,
    pub color: Color32,
}

/// Equirectangular projection around a reference latitude, in metres.
#[derive(Debug, Clone, Copy)]
struct LocalProjection {
    lon_scale: f64,
}

impl LocalProjection {
    fn new(ref_lat: f64) -> Self {
        let cos = if ref_lat.is_finite() {
            ref_lat.to_radians().cos().max(1e-6)
        } else {
            1.0
        };
        LocalProjection {
            lon_scale: METERS_PER_DEGREE_LON * cos,
        }
    }

    fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        (lon * self.lon_scale, lat * METERS_PER_DEGREE_LAT)
    }

    fn inverse(&self, x: f64, y: f64) -> [f64; 2] {
        [x / self.lon_scale, y / METERS_PER_DEGREE_LAT]
    }
}

/// Axial coordinates of the pointy-top hexagon containing `(x, y)`.
fn hex_cell(x: f64, y: f64, radius: f64) -> (i64, i64) {
    let q = (3f64.sqrt() / 3.0 * x - y / 3.0) / radius;
    let r = (2.0 / 3.0 * y) / radius;

    // Cube rounding: fix the coordinate with the largest rounding error.
    let s = -q - r;
    let (mut rq, mut rr, rs) = (q.round(), r.round(), s.round());
    let (dq, dr, ds) = ((rq - q).abs(), (rr - r).abs(), (rs - s).abs());
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    (rq as i64, rr as i64)
}

fn hex_center(q: i64, r: i64, radius: f64) -> (f64, f64) {
    let (q, r) = (q as f64, r as f64);
    (
        radius * (3f64.sqrt() * q + 3f64.sqrt() / 2.0 * r),
        radius * 1.5 * r,
    )
}

/// Bin measurements into hexagons of `radius_m` metres, projected around
/// `ref_lat`. Bins come back in a stable order.
pub fn hexagon_bins<'a>(
    records: impl IntoIterator<Item = &'a Measurement>,
    settings: &HexagonLayerSettings,
    ref_lat: f64,
) -> Vec<HexBin> {
    let radius = settings.radius_m.max(1.0);
    let projection = LocalProjection::new(ref_lat);

    let mut counts: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    for m in records {
        if !m.lat.is_finite() || !m.lon.is_finite() {
            continue;
        }
        let (x, y) = projection.forward(m.lon, m.lat);
        *counts.entry(hex_cell(x, y, radius)).or_default() += 1;
    }

    let max = counts.values().copied().max().unwrap_or(0);
    counts
        .into_iter()
        .map(|((q, r), count)| {
            let (cx, cy) = hex_center(q, r, radius);
            let vertices = std::array::from_fn(|i| {
                let angle = PI / 180.0 * (60.0 * i as f64 - 30.0);
                projection.inverse(cx + radius * angle.cos(), cy + radius * angle.sin())
            });
            HexBin {
                center: projection.inverse(cx, cy),
                vertices,
                count,
                color: density_color(count, max),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Layer selection
// ---------------------------------------------------------------------------

/// Drawable primitives for the current filtered view, shared by every map.
#[derive(Debug, Clone, PartialEq)]
pub enum MapLayers {
    Columns(Vec<ColumnBucket>),
    Hexagons(Vec<HexBin>),
}

impl Default for MapLayers {
    fn default() -> Self {
        MapLayers::Columns(Vec::new())
    }
}

impl MapLayers {
    pub fn build<'a>(
        kind: LayerKind,
        records: impl IntoIterator<Item = &'a Measurement>,
        settings: &Settings,
        ref_lat: f64,
    ) -> Self {
        match kind {
            LayerKind::Column => MapLayers::Columns(column_buckets(records, &settings.column)),
            LayerKind::Hexagon => {
                MapLayers::Hexagons(hexagon_bins(records, &settings.hexagon, ref_lat))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{at, measurement};

    #[test]
    fn build_follows_layer_kind() {
        let settings = Settings::default();
        let records = [measurement(at(9, 0, 0), 51.5, -0.1, 31.0)];
        assert!(matches!(
            MapLayers::build(LayerKind::Column, &records, &settings, 51.5),
            MapLayers::Columns(b) if b.len() == 1
        ));
        assert!(matches!(
            MapLayers::build(LayerKind::Hexagon, &records, &settings, 51.5),
            MapLayers::Hexagons(b) if b[0].count == 1
        ));
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn zoom_zero_tile_spans_the_globe() {
        let (min, max) = Camera::new(0.0, 0.0, 0.0).bounds(512.0, 512.0);
        assert!(close(max[0] - min[0], 360.0));
        assert!(close(max[1] - min[1], 360.0));
    }

    #[test]
    fn each_zoom_level_halves_the_span() {
        let camera = Camera::new(48.0, 2.0, 6.0);
        let (min, max) = camera.bounds(400.0, 300.0);
        let (min2, max2) = Camera { zoom: 7.0, ..camera }.bounds(400.0, 300.0);
        assert!(close((max[0] - min[0]) / 2.0, max2[0] - min2[0]));
        assert!(close((min[0] + max[0]) / 2.0, 2.0));
        assert!(close((min[1] + max[1]) / 2.0, 48.0));
        assert!(max[1] - min[1] < (max[0] - min[0]) * 0.75);
    }

    #[test]
    fn columns_bucket_by_ozone_and_skip_nan() {
        let settings = ColumnLayerSettings::default();
        let records = [
            measurement(at(9, 0, 0), 51.5, -0.1, 31.0),
            measurement(at(9, 0, 0), 48.8, 2.3, 34.9),
            measurement(at(9, 0, 0), 41.9, 12.5, 120.0),
            measurement(at(9, 0, 0), 41.9, 12.5, f64::NAN),
        ];
        let buckets = column_buckets(&records, &settings);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].o3, 30.0);
        assert_eq!(buckets[0].points, vec![[-0.1, 51.5], [2.3, 48.8]]);
        assert_eq!(buckets[0].color, ozone_color(32.5));
        assert!(buckets[1].radius > buckets[0].radius);
        assert!(buckets[1].radius <= settings.radius_px[1]);
    }

    #[test]
    fn nearby_points_share_a_hexagon() {
        let settings = HexagonLayerSettings { radius_m: 1_000.0 };
        let records = [
            measurement(at(9, 0, 0), 51.5000, -0.1200, 1.0),
            measurement(at(9, 0, 0), 51.5001, -0.1201, 1.0),
            measurement(at(9, 0, 0), 48.8566, 2.3522, 1.0),
        ];
        let bins = hexagon_bins(&records, &settings, 50.0);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 3);

        let london = bins.iter().find(|b| b.count == 2).unwrap();
        assert!((london.center[1] - 51.5).abs() < 0.02);
        assert!((london.center[0] + 0.12).abs() < 0.03);
        assert_eq!(london.color, density_color(2, 2));
    }

    #[test]
    fn hexagon_cells_round_to_nearest_center() {
        let radius = 10.0;
        assert_eq!(hex_cell(0.0, 0.0, radius), (0, 0));
        let (x, y) = hex_center(2, -1, radius);
        assert_eq!(hex_cell(x + 1.0, y - 1.0, radius), (2, -1));
    }

    /// On-screen width in pixels of `bin` in a `size × size` map.
    fn width_px(bin: &HexBin, camera: Camera, size: f64) -> f64 {
        let (min, max) = camera.bounds(size, size);
        let lons = bin.vertices.map(|v| v[0]);
        let span = lons.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            - lons.iter().copied().fold(f64::INFINITY, f64::min);
        span / (max[0] - min[0]) * size
    }

    #[test]
    fn default_hexagons_are_visible_at_hexagon_zooms() {
        let settings = Settings::default();
        let (lat, lon) = (51.504831314, -0.123499506);
        let records = [measurement(at(9, 0, 0), lat, lon, 1.0)];
        let bins = hexagon_bins(&records, &settings.hexagon, lat);

        let (overview, city) = settings.view.zooms(LayerKind::Hexagon);
        assert!(width_px(&bins[0], Camera::new(lat, lon, city), 300.0) >= 10.0);
        assert!(width_px(&bins[0], Camera::new(lat, lon, overview), 300.0) >= 5.0);

        // The column zooms are far too wide for metre-sized bins.
        let (_, column_city) = settings.view.zooms(LayerKind::Column);
        assert!(width_px(&bins[0], Camera::new(lat, lon, column_city), 300.0) < 1.0);
    }

    #[test]
    fn hexagon_vertices_sit_on_the_radius() {
        let settings = HexagonLayerSettings { radius_m: 500.0 };
        let records = [measurement(at(9, 0, 0), 0.0, 0.0, 1.0)];
        let bins = hexagon_bins(&records, &settings, 0.0);
        let bin = &bins[0];
        for v in bin.vertices {
            let dx = (v[0] - bin.center[0]) * METERS_PER_DEGREE_LON;
            let dy = (v[1] - bin.center[1]) * METERS_PER_DEGREE_LAT;
            assert!(((dx * dx + dy * dy).sqrt() - 500.0).abs() < 1e-6);
        }
    }
}
