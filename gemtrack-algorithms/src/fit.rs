//! Closed-form straight-line fits and line geometry.
//!
//! The fit treats z as the independent variable and solves the two
//! decoupled linear least-squares problems `x = x0 + xp * z` and
//! `y = y0 + yp * z`.

use gemtrack_core::error::FitError;
use gemtrack_core::point::Point;
use gemtrack_core::track::TrackParameters;

/// Relative size below which the fit determinant counts as zero.
const DEGENERATE_TOLERANCE: f64 = 1e-12;

/// Result of a line fit.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFit {
    /// Fitted line and reduced chi-square.
    pub params: TrackParameters,
    /// `fitted - measured` along x, one per input point.
    pub residuals_x: Vec<f64>,
    /// `fitted - measured` along y, one per input point.
    pub residuals_y: Vec<f64>,
}

/// Least-squares line fitter with per-axis hit resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFitter {
    resolution_x: f64,
    resolution_y: f64,
}

impl Default for LineFitter {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl LineFitter {
    /// Creates a fitter; resolutions are the per-axis sigmas of the chi2.
    #[must_use]
    pub const fn new(resolution_x: f64, resolution_y: f64) -> Self {
        Self {
            resolution_x,
            resolution_y,
        }
    }

    /// Fits a line through `points`.
    ///
    /// The reduced chi-square divides by `2n - 4` degrees of freedom, or by
    /// one when that is not positive.
    ///
    /// # Errors
    /// [`FitError::TooFewPoints`] for fewer than two points and
    /// [`FitError::Degenerate`] when the points do not span z.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(&self, points: &[Point]) -> Result<LineFit, FitError> {
        let n = points.len();
        if n < 2 {
            return Err(FitError::TooFewPoints(n));
        }

        let (x0, y0, xp, yp) = line_of_best_fit(points)?;

        let mut residuals_x = Vec::with_capacity(n);
        let mut residuals_y = Vec::with_capacity(n);
        let mut chi2 = 0.0;
        let inv_var_x = 1.0 / (self.resolution_x * self.resolution_x);
        let inv_var_y = 1.0 / (self.resolution_y * self.resolution_y);

        for p in points {
            let dx = x0 + xp * p.z - p.x;
            let dy = y0 + yp * p.z - p.y;
            residuals_x.push(dx);
            residuals_y.push(dy);
            chi2 += dx * dx * inv_var_x + dy * dy * inv_var_y;
        }

        let ndf = (2.0 * n as f64 - 4.0).max(1.0);

        Ok(LineFit {
            params: TrackParameters {
                x0,
                y0,
                xp,
                yp,
                chi2ndf: chi2 / ndf,
            },
            residuals_x,
            residuals_y,
        })
    }
}

/// Fits a line with unit resolutions.
///
/// # Errors
/// See [`LineFitter::fit`].
pub fn fit_line(points: &[Point]) -> Result<LineFit, FitError> {
    LineFitter::default().fit(points)
}

/// Returns `(x0, y0, xp, yp)`.
#[allow(clippy::cast_precision_loss, clippy::similar_names)]
fn line_of_best_fit(points: &[Point]) -> Result<(f64, f64, f64, f64), FitError> {
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_z = 0.0;
    let mut sum_xz = 0.0;
    let mut sum_yz = 0.0;
    let mut sum_z2 = 0.0;

    for p in points {
        sum_x += p.x;
        sum_y += p.y;
        sum_z += p.z;
        sum_xz += p.x * p.z;
        sum_yz += p.y * p.z;
        sum_z2 += p.z * p.z;
    }

    let n = points.len() as f64;
    let det = n * sum_z2 - sum_z * sum_z;

    // `n * sum_z2` bounds the cancellation error of `det`.
    if !det.is_finite() || det.abs() <= DEGENERATE_TOLERANCE * n * sum_z2 {
        return Err(FitError::Degenerate(det));
    }

    let xp = (n * sum_xz - sum_x * sum_z) / det;
    let yp = (n * sum_yz - sum_y * sum_z) / det;
    let x0 = (sum_x * sum_z2 - sum_xz * sum_z) / det;
    let y0 = (sum_y * sum_z2 - sum_yz * sum_z) / det;

    Ok((x0, y0, xp, yp))
}

/// Point where the line `origin + t * direction` crosses the plane at `z`.
///
/// # Errors
/// [`FitError::ParallelToPlane`] if `direction.z` is zero.
pub fn projected_point(origin: &Point, direction: &Point, z: f64) -> Result<Point, FitError> {
    if direction.z == 0.0 || !direction.z.is_finite() {
        return Err(FitError::ParallelToPlane);
    }
    let t = (z - origin.z) / direction.z;
    Ok(*origin + *direction * t)
}

/// Point where the line through `p1` and `p2` crosses the plane at `z`.
///
/// # Errors
/// [`FitError::ParallelToPlane`] if `p1` and `p2` share the same z.
pub fn intersection_point(p1: &Point, p2: &Point, z: f64) -> Result<Point, FitError> {
    let direction = (*p2 - *p1).unit();
    projected_point(p1, &direction, z)
}
