//! Error types for gemtrack-core.

use thiserror::Error;

/// Result type alias for gemtrack operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Setup-time configuration errors.
///
/// These make the track search ill-defined and are reported before the
/// first event is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Grid cell width is zero, negative or not finite.
    #[error("invalid grid cell width along {axis}: {width}")]
    InvalidGridWidth { axis: char, width: f64 },

    /// Grid origin shift is negative or not finite.
    #[error("invalid grid shift: {0}")]
    InvalidGridShift(f64),

    /// Neighbor margin is negative or not finite.
    #[error("invalid neighbor margin along {axis}: {margin}")]
    InvalidNeighborMargin { axis: char, margin: f64 },

    /// Layer extent is zero, negative or not finite.
    #[error("invalid dimension for layer {layer}: ({x}, {y})")]
    InvalidDimension { layer: i32, x: f64, y: f64 },

    /// Fewer than two hits cannot define a line.
    #[error("minimum hits on track must be at least 2, got {0}")]
    MinimumHitsTooSmall(usize),

    /// Not enough tracking layers for the requested minimum.
    #[error("{layers} tracking layer(s) registered, but {required} hits per track required")]
    TooFewLayers { layers: usize, required: usize },

    /// A layer id was registered twice.
    #[error("duplicated layer id: {0}")]
    DuplicateLayer(i32),

    /// A layer id is referenced but was never registered.
    #[error("unknown layer id: {0}")]
    UnknownLayer(i32),

    /// Slope acceptance window with `min > max` or NaN bounds.
    #[error("invalid {plane} slope window: [{min}, {max}]")]
    InvalidSlopeWindow {
        plane: &'static str,
        min: f64,
        max: f64,
    },

    /// Fit resolution is zero, negative or not finite.
    #[error("invalid fit resolution along {axis}: {value}")]
    InvalidResolution { axis: char, value: f64 },

    /// Chi-square cut is negative or NaN.
    #[error("invalid chi2 cut: {0}")]
    InvalidChi2Cut(f64),

    /// Top-K capacity of zero.
    #[error("max track save quantity must be at least 1")]
    ZeroTrackSaveQuantity,

    /// The engine was used before `complete_setup`.
    #[error("tracking setup has not been completed")]
    SetupIncomplete,

    /// Search strategy name not recognized.
    #[error("unknown search strategy: {0:?} (expected \"grid\" or \"exhaustive\")")]
    UnknownStrategy(String),
}

/// Errors from the closed-form line fit and its geometric helpers.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FitError {
    /// Fewer than two points.
    #[error("line fit needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    /// All points share the same z, so the slope is undefined.
    #[error("degenerate fit: points do not span z (determinant {0})")]
    Degenerate(f64),

    /// Direction has no z component, the line never crosses a z plane.
    #[error("direction is parallel to the z plane")]
    ParallelToPlane,
}

/// Core error types for gemtrack operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fit error.
    #[error("fit error: {0}")]
    Fit(#[from] FitError),

    /// Hit index out of range for a layer.
    #[error("hit index {index} out of range for layer {layer} ({count} hits)")]
    InvalidHitIndex { layer: i32, index: usize, count: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = Error::from(ConfigError::TooFewLayers {
            layers: 2,
            required: 3,
        });
        assert_eq!(
            err.to_string(),
            "configuration error: 2 tracking layer(s) registered, but 3 hits per track required"
        );

        let err = Error::from(FitError::TooFewPoints(1));
        assert!(err.to_string().contains("at least 2 points"));
    }
}
