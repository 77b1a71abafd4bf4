//! Detector setup files.
//!
//! A setup file is a JSON document with three sections:
//!
//! ```json
//! {
//!   "tracking": { "minimum_hits_on_track": 3, "chi2_cut": 10.0,
//!                 "abort_quantity": 10000, "max_track_save_quantity": 20,
//!                 "slope_xz": [-0.5, 0.5], "slope_yz": [-0.5, 0.5],
//!                 "resolution": [0.1, 0.1], "strategy": "grid" },
//!   "grid": { "width": [17.2, 17.2], "shift": 0.4, "margin": [5.7, 5.7] },
//!   "layers": [
//!     { "id": 0, "position": [0, 0, 0], "dimension": [409.6, 409.6],
//!       "offset": [0, 0, 0], "tilt_angle": [0, 0, 0], "tracking": true }
//!   ]
//! }
//! ```
//!
//! Every field except `layers[].id` and `layers[].dimension` is optional.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use gemtrack_algorithms::{Detector, Layer, TrackingSystem};
use gemtrack_core::config::{GridConfig, SearchStrategy, SlopeWindow, TrackingCuts};
use gemtrack_core::error::ConfigError;
use gemtrack_core::geometry::LayerPlacement;
use log::debug;
use serde::Deserialize;

use crate::{Error, Result};

/// One layer entry of a setup file.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSetup {
    /// Layer id; hits name their layer by this id.
    pub id: i32,
    /// Position, extent and alignment.
    pub placement: LayerPlacement,
    /// Whether the layer takes part in tracking.
    pub tracking: bool,
}

/// Parsed and validated detector setup.
#[derive(Clone, Debug, PartialEq)]
pub struct SetupConfig {
    /// Track acceptance cuts.
    pub cuts: TrackingCuts,
    /// Grid layout shared by every layer.
    pub grid: GridConfig,
    /// Layers in file order.
    pub layers: Vec<LayerSetup>,
}

// Intermediate structs for the JSON schema
#[derive(Deserialize)]
struct JsonSetup {
    #[serde(default)]
    tracking: JsonTracking,
    #[serde(default)]
    grid: JsonGrid,
    layers: Vec<JsonLayer>,
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonTracking {
    minimum_hits_on_track: usize,
    chi2_cut: f64,
    abort_quantity: u64,
    max_track_save_quantity: usize,
    slope_xz: Option<[f64; 2]>,
    slope_yz: Option<[f64; 2]>,
    resolution: [f64; 2],
    strategy: String,
}

impl Default for JsonTracking {
    fn default() -> Self {
        let cuts = TrackingCuts::default();
        Self {
            minimum_hits_on_track: cuts.minimum_hits_on_track,
            chi2_cut: cuts.chi2_cut,
            abort_quantity: cuts.abort_quantity,
            max_track_save_quantity: cuts.max_track_save_quantity,
            slope_xz: None,
            slope_yz: None,
            resolution: [cuts.resolution_x, cuts.resolution_y],
            strategy: cuts.strategy.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonGrid {
    width: [f64; 2],
    shift: f64,
    margin: Option<[f64; 2]>,
}

impl Default for JsonGrid {
    fn default() -> Self {
        let grid = GridConfig::default();
        Self {
            width: [grid.width_x, grid.width_y],
            shift: grid.shift,
            margin: None,
        }
    }
}

#[derive(Deserialize)]
struct JsonLayer {
    id: i32,
    #[serde(default)]
    position: [f64; 3],
    dimension: [f64; 2],
    #[serde(default)]
    offset: [f64; 3],
    #[serde(default)]
    tilt_angle: [f64; 3],
    #[serde(default = "default_tracking")]
    tracking: bool,
}

fn default_tracking() -> bool {
    true
}

fn slope_window(bounds: Option<[f64; 2]>) -> SlopeWindow {
    bounds.map_or_else(SlopeWindow::unbounded, |[min, max]| SlopeWindow::new(min, max))
}

impl SetupConfig {
    /// Loads a setup from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// describes an invalid setup.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let json_config: JsonSetup = serde_json::from_reader(reader)?;
        debug!("Loaded setup file {}", path.as_ref().display());
        Self::from_json_config(json_config)
    }

    /// Loads a setup from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or the setup is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let json_config: JsonSetup = serde_json::from_str(json)?;
        Self::from_json_config(json_config)
    }

    fn from_json_config(config: JsonSetup) -> Result<Self> {
        let tracking = config.tracking;
        let strategy: SearchStrategy = tracking.strategy.parse()?;

        let cuts = TrackingCuts::new()
            .with_minimum_hits(tracking.minimum_hits_on_track)
            .with_chi2_cut(tracking.chi2_cut)
            .with_abort_quantity(tracking.abort_quantity)
            .with_max_track_save_quantity(tracking.max_track_save_quantity)
            .with_slope_windows(slope_window(tracking.slope_xz), slope_window(tracking.slope_yz))
            .with_resolution(tracking.resolution[0], tracking.resolution[1])
            .with_strategy(strategy);

        let mut grid = GridConfig::new()
            .with_width(config.grid.width[0], config.grid.width[1])
            .with_shift(config.grid.shift);
        if let Some([mx, my]) = config.grid.margin {
            grid = grid.with_margins(mx, my);
        }

        let layers = config
            .layers
            .into_iter()
            .map(|layer| {
                let mut placement = LayerPlacement::default()
                    .with_offset(layer.offset)
                    .with_tilt(layer.tilt_angle);
                placement.position = layer.position;
                placement.dimension = [layer.dimension[0], layer.dimension[1], 1.0];
                LayerSetup {
                    id: layer.id,
                    placement,
                    tracking: layer.tracking,
                }
            })
            .collect();

        let setup = Self { cuts, grid, layers };

        // Validate once at load time
        setup.validate()?;
        Ok(setup)
    }

    /// Checks cuts, grid, layer ids and extents, and the tracking layer
    /// count.
    ///
    /// # Errors
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.cuts.validate()?;
        self.grid.validate()?;

        let mut seen = HashSet::with_capacity(self.layers.len());
        for layer in &self.layers {
            if !seen.insert(layer.id) {
                return Err(ConfigError::DuplicateLayer(layer.id).into());
            }
            let [x, y, _] = layer.placement.dimension;
            if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
                return Err(ConfigError::InvalidDimension {
                    layer: layer.id,
                    x,
                    y,
                }
                .into());
            }
        }

        let tracking = self.tracking_layer_count();
        if tracking < self.cuts.minimum_hits_on_track {
            return Err(ConfigError::TooFewLayers {
                layers: tracking,
                required: self.cuts.minimum_hits_on_track,
            }
            .into());
        }
        Ok(())
    }

    /// Number of layers taking part in tracking.
    #[must_use]
    pub fn tracking_layer_count(&self) -> usize {
        self.layers.iter().filter(|l| l.tracking).count()
    }

    /// Builds the detector described by the setup.
    ///
    /// # Errors
    /// Returns an error if a layer cannot be built.
    pub fn build_detector(&self) -> Result<Detector> {
        let mut detector = Detector::new();
        for layer in &self.layers {
            let built = Layer::new(layer.id, layer.placement, self.grid)?.with_tracking(layer.tracking);
            detector.add_layer(built)?;
        }
        Ok(detector)
    }

    /// Builds the detector and a track finder ready for events.
    ///
    /// # Errors
    /// Returns an error if the detector cannot be built or set up.
    pub fn build_system(&self) -> Result<TrackingSystem> {
        let detector = self.build_detector()?;
        TrackingSystem::new(detector, self.cuts).map_err(Error::from)
    }
}
