use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::configuration::{LayerKind, Settings, TimeMode};
use crate::data::aggregate::{histogram_by_minute, midpoint, MinuteHistogram};
use crate::data::filter::{filter_by_timestamp, TimeFilter};
use crate::data::loader::parse_timestamp;
use crate::data::model::{Dataset, Measurement, Midpoint};
use crate::layers::MapLayers;
use crate::query::{parse_query, to_query};

// ---------------------------------------------------------------------------
// Slider selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub mode: TimeMode,
    /// Index into `Dataset::timestamps()` (datetime mode).
    pub timestamp_index: usize,
    /// Hour of day (hour mode).
    pub hour: u32,
}

impl Selection {
    fn new(mode: TimeMode) -> Self {
        Selection {
            mode,
            timestamp_index: 0,
            hour: 0,
        }
    }

    /// The time predicate this selection stands for. `None` in datetime mode
    /// while the dataset has no timestamps.
    pub fn filter(&self, dataset: &Dataset) -> Option<TimeFilter> {
        match self.mode {
            TimeMode::Datetime => dataset
                .timestamps()
                .get(self.timestamp_index)
                .copied()
                .map(TimeFilter::At),
            TimeMode::Hour => Some(TimeFilter::Hour(self.hour)),
        }
    }
}

/// Index of the first timestamp at or after `instant`, or the last one.
fn snap_index(timestamps: &[NaiveDateTime], instant: NaiveDateTime) -> usize {
    timestamps
        .partition_point(|t| *t < instant)
        .min(timestamps.len().saturating_sub(1))
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    /// Loaded dataset (None until a file loads).
    pub dataset: Option<Arc<Dataset>>,

    /// Mean position of the whole dataset; computed once per load.
    pub midpoint: Option<Midpoint>,

    pub selection: Selection,

    /// Rows of the current filtered view (cached).
    pub visible_indices: Vec<usize>,

    /// Per-minute counts behind the histogram panel (cached).
    pub histogram: Option<MinuteHistogram>,

    pub layer: LayerKind,

    /// Map primitives for the current view (cached).
    pub layers: MapLayers,

    pub show_histogram: bool,

    /// Map cameras are re-applied on the next frame when set.
    pub reset_cameras: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            selection: Selection::new(settings.view.time_mode),
            layer: settings.view.layer,
            layers: MapLayers::default(),
            show_histogram: settings.view.show_histogram,
            settings,
            dataset: None,
            midpoint: None,
            visible_indices: Vec::new(),
            histogram: None,
            reset_cameras: true,
            status_message: None,
        }
    }

    /// Ingest a newly loaded dataset: midpoint, initial selection, filter.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.midpoint = Some(midpoint(&dataset));

        self.selection.timestamp_index = self
            .settings
            .view
            .initial_datetime
            .as_deref()
            .and_then(parse_timestamp)
            .map(|t| snap_index(dataset.timestamps(), t))
            .unwrap_or(0);

        self.dataset = Some(dataset);
        self.status_message = None;
        self.reset_cameras = true;

        // The startup query only applies to the first dataset.
        if let Some(query) = self.settings.view.initial_query.take() {
            self.apply_query(&query);
        }
        self.on_selection_changed();
    }

    /// Recompute the filtered view and histogram after the selection moved.
    /// Never reloads or touches the dataset.
    pub fn on_selection_changed(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let Some(filter) = self.selection.filter(ds) else {
            self.visible_indices.clear();
            self.histogram = None;
            self.layers = MapLayers::default();
            return;
        };

        let view = filter_by_timestamp(ds, filter);
        self.histogram = Some(match filter {
            TimeFilter::At(instant) => histogram_by_minute(ds, instant.date()),
            TimeFilter::Hour(_) => MinuteHistogram::from_records(view.iter()),
        });
        if view.is_empty() {
            log::debug!("Selection {filter:?} matches no measurements");
        } else {
            log::debug!("Selection {filter:?} matches {} measurements", view.len());
        }
        self.visible_indices = view.into_indices();
        self.rebuild_layers();
    }

    /// Recompute map primitives from the cached view.
    fn rebuild_layers(&mut self) {
        let ref_lat = self.midpoint.map_or(0.0, |m| m.lat);
        self.layers = MapLayers::build(self.layer, self.visible(), &self.settings, ref_lat);
    }

    /// Switch the map layer. Each layer has its own zooms, so the cameras
    /// are re-applied.
    pub fn set_layer(&mut self, kind: LayerKind) {
        if self.layer != kind {
            self.layer = kind;
            self.reset_cameras = true;
            self.rebuild_layers();
        }
    }

    /// Switch between the datetime and hour sliders, keeping the closest
    /// equivalent position.
    pub fn set_mode(&mut self, mode: TimeMode) {
        if self.selection.mode == mode {
            return;
        }
        if let (Some(ds), TimeMode::Hour) = (&self.dataset, mode) {
            if let Some(t) = ds.timestamps().get(self.selection.timestamp_index) {
                self.selection.hour = t.hour();
            }
        }
        self.selection.mode = mode;
        self.on_selection_changed();
    }

    /// Jump the datetime slider to the first timestamp on or after `day`.
    pub fn jump_to_date(&mut self, day: NaiveDate) {
        if let Some(ds) = &self.dataset {
            self.selection.timestamp_index =
                snap_index(ds.timestamps(), day.and_time(chrono::NaiveTime::MIN));
            self.on_selection_changed();
        }
    }

    /// Apply a `date=...` / `hour=...` query. Invalid queries are logged and
    /// leave the selection alone.
    pub fn apply_query(&mut self, query: &str) {
        match parse_query(query) {
            Ok(TimeFilter::At(instant)) => {
                self.selection.mode = TimeMode::Datetime;
                if let Some(ds) = &self.dataset {
                    if ds.timestamps().binary_search(&instant).is_err() {
                        log::warn!("No measurements at {instant}; using the next timestamp");
                    }
                    self.selection.timestamp_index = snap_index(ds.timestamps(), instant);
                }
            }
            Ok(TimeFilter::Hour(hour)) => {
                self.selection.mode = TimeMode::Hour;
                self.selection.hour = hour;
            }
            Err(e) => {
                log::warn!("Ignoring selection query '{query}': {e}");
                self.status_message = Some(format!("Ignored query: {e}"));
                return;
            }
        }
        self.on_selection_changed();
    }

    /// The current selection as a shareable query string.
    pub fn current_query(&self) -> Option<String> {
        let ds = self.dataset.as_ref()?;
        self.selection.filter(ds).map(|f| to_query(&f))
    }

    pub fn current_filter(&self) -> Option<TimeFilter> {
        self.dataset.as_ref().and_then(|ds| self.selection.filter(ds))
    }

    /// Records of the current filtered view.
    pub fn visible(&self) -> impl Iterator<Item = &Measurement> + '_ {
        self.dataset
            .iter()
            .flat_map(move |ds| ds.select(&self.visible_indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::{at, measurement};

    fn dataset() -> Arc<Dataset> {
        Arc::new(Dataset::from_records(vec![
            measurement(at(8, 23, 0), 10.0, 20.0, 30.0),
            measurement(at(9, 2, 0), 20.0, 40.0, 40.0),
            measurement(at(9, 2, 0), 30.0, 60.0, 50.0),
            measurement(at(9, 5, 10), 40.0, 80.0, 60.0),
        ]))
    }

    fn state_with(settings: Settings) -> AppState {
        let mut state = AppState::new(settings);
        state.set_dataset(dataset());
        state
    }

    #[test]
    fn load_computes_midpoint_and_snaps_initial_datetime() {
        let state = state_with(Settings::default());
        assert_eq!(state.midpoint, Some(Midpoint { lat: 25.0, lon: 50.0 }));
        // 2011-09-09T00:00 is not in the data; the next stop is 02:00.
        assert_eq!(state.current_filter(), Some(TimeFilter::At(at(9, 2, 0))));
        assert_eq!(state.visible_indices, vec![1, 2]);
        assert_eq!(state.histogram.as_ref().map(|h| h.total()), Some(3));
    }

    #[test]
    fn moving_the_slider_refilters_without_reloading() {
        let mut state = state_with(Settings::default());
        let before = Arc::clone(state.dataset.as_ref().unwrap());

        state.selection.timestamp_index = 2;
        state.on_selection_changed();

        assert_eq!(state.visible_indices, vec![3]);
        assert!(Arc::ptr_eq(&before, state.dataset.as_ref().unwrap()));
        assert_eq!(state.midpoint, Some(Midpoint { lat: 25.0, lon: 50.0 }));
    }

    #[test]
    fn hour_mode_histogram_covers_the_hour_view() {
        let mut state = state_with(Settings::default());
        state.set_mode(TimeMode::Hour);
        assert_eq!(state.selection.hour, 2);
        assert_eq!(state.visible_indices, vec![1, 2]);

        state.selection.hour = 5;
        state.on_selection_changed();
        let hist = state.histogram.clone().unwrap();
        assert_eq!(hist.total(), 1);
        assert_eq!(hist.counts()[10], 1);
    }

    #[test]
    fn initial_query_overrides_initial_datetime() {
        let mut settings = Settings::default();
        settings.view.initial_query = Some("?hour=23".to_string());
        let state = state_with(settings);
        assert_eq!(state.selection.mode, TimeMode::Hour);
        assert_eq!(state.visible_indices, vec![0]);
        assert_eq!(state.current_query().as_deref(), Some("hour=23"));
    }

    #[test]
    fn initial_query_is_not_reapplied_on_reopen() {
        let mut settings = Settings::default();
        settings.view.initial_query = Some("hour=2".to_string());
        let mut state = state_with(settings);
        assert_eq!(state.selection.mode, TimeMode::Hour);
        assert!(state.settings.view.initial_query.is_none());

        state.set_mode(TimeMode::Datetime);
        state.set_dataset(dataset());
        assert_eq!(state.selection.mode, TimeMode::Datetime);
        assert_eq!(state.current_filter(), Some(TimeFilter::At(at(9, 2, 0))));
    }

    #[test]
    fn date_query_snaps_and_bad_query_is_ignored() {
        let mut state = state_with(Settings::default());
        state.apply_query("date=2011-09-09T03:00:00");
        assert_eq!(state.current_filter(), Some(TimeFilter::At(at(9, 5, 10))));

        state.apply_query("hour=99");
        assert_eq!(state.current_filter(), Some(TimeFilter::At(at(9, 5, 10))));
        assert!(state.status_message.is_some());
    }

    #[test]
    fn date_picker_jumps_to_first_stop_of_the_day() {
        let mut state = state_with(Settings::default());
        state.jump_to_date(NaiveDate::from_ymd_opt(2011, 9, 8).unwrap());
        assert_eq!(state.current_filter(), Some(TimeFilter::At(at(8, 23, 0))));
        assert_eq!(state.visible().count(), 1);
    }

    #[test]
    fn switching_layer_rebuilds_primitives() {
        let mut state = state_with(Settings::default());
        assert!(matches!(&state.layers, MapLayers::Columns(b) if b.len() == 2));
        state.reset_cameras = false;
        state.set_layer(LayerKind::Hexagon);
        assert!(state.reset_cameras);
        assert!(
            matches!(&state.layers, MapLayers::Hexagons(b) if b.iter().map(|h| h.count).sum::<usize>() == 2)
        );
    }

    #[test]
    fn empty_dataset_has_no_filter() {
        let mut state = AppState::new(Settings::default());
        state.set_dataset(Arc::new(Dataset::from_records(Vec::new())));
        assert!(state.visible_indices.is_empty());
        assert!(state.histogram.is_none());
        assert!(state.midpoint.unwrap().lat.is_nan());
    }
}
