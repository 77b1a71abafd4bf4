//! Tracking and grid configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Grid cell configuration for one layer's spatial index.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridConfig {
    /// Cell width along x (mm).
    pub width_x: f64,
    /// Cell width along y (mm).
    pub width_y: f64,
    /// Origin shift, so cell 0 need not start at the layer edge (mm).
    pub shift: f64,
    /// Distance to a cell edge below which the x neighbor is included.
    /// `None` means one third of `width_x`.
    pub margin_x: Option<f64>,
    /// Distance to a cell edge below which the y neighbor is included.
    /// `None` means one third of `width_y`.
    pub margin_y: Option<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width_x: 17.2, // mm
            width_y: 17.2,
            shift: 0.4,
            margin_x: None,
            margin_y: None,
        }
    }
}

impl GridConfig {
    /// Creates a grid configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cell widths.
    #[must_use]
    pub fn with_width(mut self, width_x: f64, width_y: f64) -> Self {
        self.width_x = width_x;
        self.width_y = width_y;
        self
    }

    /// Sets the origin shift.
    #[must_use]
    pub fn with_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    /// Sets explicit neighbor margins.
    #[must_use]
    pub fn with_margins(mut self, margin_x: f64, margin_y: f64) -> Self {
        self.margin_x = Some(margin_x);
        self.margin_y = Some(margin_y);
        self
    }

    /// Effective x neighbor margin.
    #[must_use]
    pub fn margin_x(&self) -> f64 {
        self.margin_x.unwrap_or(self.width_x / 3.0)
    }

    /// Effective y neighbor margin.
    #[must_use]
    pub fn margin_y(&self) -> f64 {
        self.margin_y.unwrap_or(self.width_y / 3.0)
    }

    /// Checks widths, shift and margins.
    ///
    /// # Errors
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (axis, width) in [('x', self.width_x), ('y', self.width_y)] {
            if !width.is_finite() || width <= 0.0 {
                return Err(ConfigError::InvalidGridWidth { axis, width });
            }
        }
        if !self.shift.is_finite() || self.shift < 0.0 {
            return Err(ConfigError::InvalidGridShift(self.shift));
        }
        for (axis, margin) in [('x', self.margin_x()), ('y', self.margin_y())] {
            if !margin.is_finite() || margin < 0.0 {
                return Err(ConfigError::InvalidNeighborMargin { axis, margin });
            }
        }
        Ok(())
    }
}

/// Closed acceptance interval for a track slope.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SlopeWindow {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound (inclusive).
    pub max: f64,
}

impl Default for SlopeWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl SlopeWindow {
    /// Creates a window `[min, max]`.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Window accepting every finite slope.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// Symmetric window `[-half_width, half_width]`.
    #[must_use]
    pub fn symmetric(half_width: f64) -> Self {
        Self::new(-half_width, half_width)
    }

    /// Returns true if `slope` is inside the window.
    #[inline]
    #[must_use]
    pub fn contains(&self, slope: f64) -> bool {
        slope >= self.min && slope <= self.max
    }

    fn validate(&self, plane: &'static str) -> Result<(), ConfigError> {
        if self.min.is_nan() || self.max.is_nan() || self.min > self.max {
            return Err(ConfigError::InvalidSlopeWindow {
                plane,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// How hit combinations are enumerated for a layer subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SearchStrategy {
    /// Boundary-layer pairs plus grid-pruned middle layers.
    #[default]
    Grid,
    /// Full Cartesian product of every layer's hits, no pruning.
    Exhaustive,
}

impl FromStr for SearchStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "exhaustive" => Ok(Self::Exhaustive),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid => write!(f, "grid"),
            Self::Exhaustive => write!(f, "exhaustive"),
        }
    }
}

/// Track acceptance cuts and search limits.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackingCuts {
    /// Fewest layers a track may use.
    pub minimum_hits_on_track: usize,
    /// Largest accepted chi2 per degree of freedom.
    pub chi2_cut: f64,
    /// Largest combinatorial product searched before a branch is skipped.
    pub abort_quantity: u64,
    /// Number of lowest-chi2 candidates retained per event.
    pub max_track_save_quantity: usize,
    /// Accepted x-z slope range.
    pub slope_xz: SlopeWindow,
    /// Accepted y-z slope range.
    pub slope_yz: SlopeWindow,
    /// Hit resolution along x used in the chi2 (mm).
    pub resolution_x: f64,
    /// Hit resolution along y used in the chi2 (mm).
    pub resolution_y: f64,
    /// Combination enumeration strategy.
    pub strategy: SearchStrategy,
}

impl Default for TrackingCuts {
    fn default() -> Self {
        Self {
            minimum_hits_on_track: 3,
            chi2_cut: 10.0,
            abort_quantity: 10_000,
            max_track_save_quantity: 20,
            slope_xz: SlopeWindow::unbounded(),
            slope_yz: SlopeWindow::unbounded(),
            resolution_x: 1.0,
            resolution_y: 1.0,
            strategy: SearchStrategy::Grid,
        }
    }
}

impl TrackingCuts {
    /// Creates cuts with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum number of hits on a track.
    #[must_use]
    pub fn with_minimum_hits(mut self, hits: usize) -> Self {
        self.minimum_hits_on_track = hits;
        self
    }

    /// Sets the chi2/ndf cut.
    #[must_use]
    pub fn with_chi2_cut(mut self, cut: f64) -> Self {
        self.chi2_cut = cut;
        self
    }

    /// Sets the abort quantity.
    #[must_use]
    pub fn with_abort_quantity(mut self, quantity: u64) -> Self {
        self.abort_quantity = quantity;
        self
    }

    /// Sets the top-K capacity.
    #[must_use]
    pub fn with_max_track_save_quantity(mut self, quantity: usize) -> Self {
        self.max_track_save_quantity = quantity;
        self
    }

    /// Sets both slope windows.
    #[must_use]
    pub fn with_slope_windows(mut self, slope_xz: SlopeWindow, slope_yz: SlopeWindow) -> Self {
        self.slope_xz = slope_xz;
        self.slope_yz = slope_yz;
        self
    }

    /// Sets the fit resolutions.
    #[must_use]
    pub fn with_resolution(mut self, resolution_x: f64, resolution_y: f64) -> Self {
        self.resolution_x = resolution_x;
        self.resolution_y = resolution_y;
        self
    }

    /// Sets the search strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Returns true if both slopes fall inside their windows.
    #[inline]
    #[must_use]
    pub fn accepts_slopes(&self, xp: f64, yp: f64) -> bool {
        self.slope_xz.contains(xp) && self.slope_yz.contains(yp)
    }

    /// Checks every cut for consistency.
    ///
    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.minimum_hits_on_track < 2 {
            return Err(ConfigError::MinimumHitsTooSmall(self.minimum_hits_on_track));
        }
        if self.chi2_cut.is_nan() || self.chi2_cut < 0.0 {
            return Err(ConfigError::InvalidChi2Cut(self.chi2_cut));
        }
        if self.max_track_save_quantity == 0 {
            return Err(ConfigError::ZeroTrackSaveQuantity);
        }
        self.slope_xz.validate("x-z")?;
        self.slope_yz.validate("y-z")?;
        for (axis, value) in [('x', self.resolution_x), ('y', self.resolution_y)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidResolution { axis, value });
            }
        }
        Ok(())
    }
}
