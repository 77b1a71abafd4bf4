//! Track candidates and fitted line parameters.

use crate::point::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies one hit: its layer and its index in that layer's hit list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitRef {
    /// Tracking layer id.
    pub layer_id: i32,
    /// Index into the layer's hit list for the current event.
    pub hit_index: usize,
}

impl HitRef {
    /// Creates a hit reference.
    #[inline]
    #[must_use]
    pub const fn new(layer_id: i32, hit_index: usize) -> Self {
        Self {
            layer_id,
            hit_index,
        }
    }
}

/// Straight-line parameters: `x = x0 + xp * z`, `y = y0 + yp * z`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackParameters {
    /// X at z = 0.
    pub x0: f64,
    /// Y at z = 0.
    pub y0: f64,
    /// Slope in the x-z plane.
    pub xp: f64,
    /// Slope in the y-z plane.
    pub yp: f64,
    /// Reduced chi-square of the fit.
    pub chi2ndf: f64,
}

impl TrackParameters {
    /// Position of the line at `z`.
    #[inline]
    #[must_use]
    pub fn position_at(&self, z: f64) -> (f64, f64) {
        (self.x0 + self.xp * z, self.y0 + self.yp * z)
    }
}

/// Per-hit diagnostics for a fitted track.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitDiagnostic {
    /// Layer the hit came from.
    pub layer_id: i32,
    /// Module that produced the hit.
    pub module_id: i32,
    /// Measured x (mm).
    pub x: f64,
    /// Measured y (mm).
    pub y: f64,
    /// Layer z of the hit (mm).
    pub z: f64,
    /// Track x at the hit's z (mm).
    pub projected_x: f64,
    /// Track y at the hit's z (mm).
    pub projected_y: f64,
}

impl HitDiagnostic {
    /// `projected - measured` along x.
    #[inline]
    #[must_use]
    pub fn residual_x(&self) -> f64 {
        self.projected_x - self.x
    }

    /// `projected - measured` along y.
    #[inline]
    #[must_use]
    pub fn residual_y(&self) -> f64 {
        self.projected_y - self.y
    }
}

/// An accepted track candidate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// Fitted line.
    pub params: TrackParameters,
    /// Hits used, one per layer, in layer-subset order.
    pub hits: Vec<HitRef>,
    /// Copies of the hit points, parallel to `hits`.
    pub points: Vec<Point>,
    /// Fit residuals along x, parallel to `hits`.
    pub residuals_x: Vec<f64>,
    /// Fit residuals along y, parallel to `hits`.
    pub residuals_y: Vec<f64>,
}

impl Track {
    /// Number of hits on the track.
    #[inline]
    #[must_use]
    pub fn nhits(&self) -> usize {
        self.hits.len()
    }

    /// Reduced chi-square.
    #[inline]
    #[must_use]
    pub fn chi2ndf(&self) -> f64 {
        self.params.chi2ndf
    }

    /// Layer ids in hit order.
    pub fn layer_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.hits.iter().map(|h| h.layer_id)
    }

    /// Hit indices in hit order.
    pub fn hit_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.hits.iter().map(|h| h.hit_index)
    }

    /// Measured vs projected positions for every hit.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<HitDiagnostic> {
        self.hits
            .iter()
            .zip(&self.points)
            .map(|(hit, p)| {
                let (projected_x, projected_y) = self.params.position_at(p.z);
                HitDiagnostic {
                    layer_id: hit.layer_id,
                    module_id: p.module_id,
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    projected_x,
                    projected_y,
                }
            })
            .collect()
    }
}
