use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use crate::data::loader::ColumnLayout;

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub view: ViewSettings,
    pub column: ColumnLayerSettings,
    pub hexagon: HexagonLayerSettings,
    pub cities: CityList,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DataSettings {
    pub path: PathBuf,
    pub columns: ColumnLayout,
    /// Read at most this many rows; `None` loads the whole file.
    pub max_rows: Option<usize>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("uk_france_italy_o3_nans_no2_no_non_strict_drop_dups.csv"),
            columns: ColumnLayout::SOURCE,
            max_rows: None,
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeMode {
    /// Slider over the distinct timestamps of the dataset.
    #[default]
    Datetime,
    /// Slider over the hour of day, 0..=23.
    Hour,
}

#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// One marker per measurement, sized and coloured by ozone.
    #[default]
    Column,
    /// Measurement density over a hexagonal grid.
    Hexagon,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ViewSettings {
    pub time_mode: TimeMode,
    pub layer: LayerKind,
    /// Camera zooms while the column layer is shown.
    pub overview_zoom: f64,
    pub city_zoom: f64,
    /// Camera zooms while the hexagon layer is shown.
    pub hexagon_overview_zoom: f64,
    pub hexagon_city_zoom: f64,
    /// Starting slider position when no query is given.
    pub initial_datetime: Option<String>,
    /// Selection query applied at startup, e.g. `hour=2`.
    pub initial_query: Option<String>,
    pub show_histogram: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            time_mode: TimeMode::Datetime,
            layer: LayerKind::Column,
            overview_zoom: 3.7,
            city_zoom: 6.0,
            hexagon_overview_zoom: 11.0,
            hexagon_city_zoom: 12.0,
            initial_datetime: Some("2011-09-09T00:00:00".to_string()),
            initial_query: None,
            show_histogram: false,
        }
    }
}

impl ViewSettings {
    /// `(overview, city)` zoom for the given layer.
    pub fn zooms(&self, layer: LayerKind) -> (f64, f64) {
        match layer {
            LayerKind::Column => (self.overview_zoom, self.city_zoom),
            LayerKind::Hexagon => (self.hexagon_overview_zoom, self.hexagon_city_zoom),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ColumnLayerSettings {
    /// Marker radius in pixels for the lowest and highest ozone values.
    pub radius_px: [f32; 2],
    /// Width of an ozone bucket sharing one colour and size.
    pub bucket_width: f64,
    /// Ozone value drawn with the largest marker.
    pub max_o3: f64,
}

impl Default for ColumnLayerSettings {
    fn default() -> Self {
        Self {
            radius_px: [2.0, 10.0],
            bucket_width: 5.0,
            max_o3: 200.0,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct HexagonLayerSettings {
    pub radius_m: f64,
}

impl Default for HexagonLayerSettings {
    fn default() -> Self {
        Self { radius_m: 100.0 }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct CityList(pub Vec<City>);

impl Default for CityList {
    fn default() -> Self {
        let city = |name: &str, lat, lon| City {
            name: name.to_string(),
            lat,
            lon,
        };
        CityList(vec![
            city("London", 51.504831314, -0.123499506),
            city("Paris", 48.858370, 2.294481),
            city("Rome", 41.8874314503, 12.4886930452),
        ])
    }
}

/// Layered settings: `configuration/base.toml`, then `configuration/local.toml`,
/// then `OZONE__SECTION__KEY` environment variables. Every layer is optional.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    load_from(&base_path.join("configuration"))
}

pub fn load_from(configuration_directory: &Path) -> Result<Settings, config::ConfigError> {
    let config = Config::builder()
        .add_source(File::from(configuration_directory.join("base")).required(false))
        .add_source(File::from(configuration_directory.join("local")).required(false))
        .add_source(
            config::Environment::with_prefix("OZONE")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    config.try_deserialize()
}
