//! Hit points in the common tracking coordinate system.

use std::ops::{Add, Mul, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sentinel for an undefined peak time bin.
pub const UNDEFINED_TIMEBIN: i32 = -1;

/// A 2-D detector hit placed in 3-D space.
///
/// `z` is fixed per layer. The charge, peak, time-bin and size fields are
/// cluster metadata carried through from the clustering stage; the tracking
/// engine never reads them, but keeps them with the hit for diagnostics.
///
/// `Point` doubles as a plain 3-vector for the geometric helpers (lines,
/// projections, rotations); arithmetic only touches `x`, `y`, `z` and yields
/// a point with default metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    /// X position (mm).
    pub x: f64,
    /// Y position (mm).
    pub y: f64,
    /// Z position (mm), along the beam axis.
    pub z: f64,
    /// Total charge of the x-strip cluster.
    pub x_charge: f64,
    /// Total charge of the y-strip cluster.
    pub y_charge: f64,
    /// Peak amplitude of the x-strip cluster.
    pub x_peak: f64,
    /// Peak amplitude of the y-strip cluster.
    pub y_peak: f64,
    /// Time bin of the x-strip maximum ([`UNDEFINED_TIMEBIN`] if unknown).
    pub x_max_timebin: i32,
    /// Time bin of the y-strip maximum ([`UNDEFINED_TIMEBIN`] if unknown).
    pub y_max_timebin: i32,
    /// Number of strips in the x cluster.
    pub x_size: i32,
    /// Number of strips in the y cluster.
    pub y_size: i32,
    /// Physical module that produced the hit.
    pub module_id: i32,
    /// Logical tracking layer the hit belongs to.
    pub layer_id: i32,
}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl Point {
    /// Creates a point with default metadata.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            x_charge: 0.0,
            y_charge: 0.0,
            x_peak: 0.0,
            y_peak: 0.0,
            x_max_timebin: UNDEFINED_TIMEBIN,
            y_max_timebin: UNDEFINED_TIMEBIN,
            x_size: 0,
            y_size: 0,
            module_id: 0,
            layer_id: 0,
        }
    }

    /// Sets the cluster charges.
    #[must_use]
    pub fn with_charge(mut self, x_charge: f64, y_charge: f64) -> Self {
        self.x_charge = x_charge;
        self.y_charge = y_charge;
        self
    }

    /// Sets the cluster peak amplitudes.
    #[must_use]
    pub fn with_peak(mut self, x_peak: f64, y_peak: f64) -> Self {
        self.x_peak = x_peak;
        self.y_peak = y_peak;
        self
    }

    /// Sets the time bins of the cluster maxima.
    #[must_use]
    pub fn with_max_timebin(mut self, x_max_timebin: i32, y_max_timebin: i32) -> Self {
        self.x_max_timebin = x_max_timebin;
        self.y_max_timebin = y_max_timebin;
        self
    }

    /// Sets the cluster sizes.
    #[must_use]
    pub fn with_size(mut self, x_size: i32, y_size: i32) -> Self {
        self.x_size = x_size;
        self.y_size = y_size;
        self
    }

    /// Sets the module id.
    #[must_use]
    pub fn with_module(mut self, module_id: i32) -> Self {
        self.module_id = module_id;
        self
    }

    /// Sets the layer id.
    #[must_use]
    pub fn with_layer(mut self, layer_id: i32) -> Self {
        self.layer_id = layer_id;
        self
    }

    /// Returns a copy with the position replaced and metadata kept.
    #[must_use]
    pub fn moved_to(mut self, x: f64, y: f64, z: f64) -> Self {
        self.x = x;
        self.y = y;
        self.z = z;
        self
    }

    /// Dot product of the position vectors.
    #[inline]
    #[must_use]
    pub fn dot(&self, other: &Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Euclidean length of the position vector.
    #[inline]
    #[must_use]
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector along the position; the zero vector stays zero.
    #[must_use]
    pub fn unit(&self) -> Self {
        let r = self.norm();
        if r == 0.0 {
            return Self::new(0.0, 0.0, 0.0);
        }
        Self::new(self.x / r, self.y / r, self.z / r)
    }

    /// Returns true if the peak time bins are both defined.
    #[inline]
    #[must_use]
    pub fn has_timing(&self) -> bool {
        self.x_max_timebin != UNDEFINED_TIMEBIN && self.y_max_timebin != UNDEFINED_TIMEBIN
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, scale: f64) -> Point {
        Point::new(self.x * scale, self.y * scale, self.z * scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_defaults() {
        let p = Point::new(1.0, 2.0, 3.0);
        assert_eq!(p.x_max_timebin, UNDEFINED_TIMEBIN);
        assert_eq!(p.y_max_timebin, UNDEFINED_TIMEBIN);
        assert_eq!(p.module_id, 0);
        assert!(!p.has_timing());
    }

    #[test]
    fn test_point_builders() {
        let p = Point::new(1.0, 2.0, 3.0)
            .with_charge(100.0, 120.0)
            .with_peak(30.0, 35.0)
            .with_max_timebin(2, 3)
            .with_size(4, 5)
            .with_module(7)
            .with_layer(1);

        assert!(p.has_timing());
        assert_eq!(p.x_size, 4);
        assert_eq!(p.module_id, 7);
        assert_eq!(p.layer_id, 1);

        let moved = p.moved_to(0.0, 0.0, 10.0);
        assert_eq!(moved.layer_id, 1);
        assert_relative_eq!(moved.z, 10.0);
    }

    #[test]
    fn test_vector_arithmetic() {
        let a = Point::new(1.0, 2.0, 3.0);
        let b = Point::new(4.0, 6.0, 3.0);

        let d = b - a;
        assert_relative_eq!(d.norm(), 5.0);
        assert_relative_eq!(a.dot(&b), 25.0);

        let u = d.unit();
        assert_relative_eq!(u.norm(), 1.0);
        assert_relative_eq!(u.x, 0.6);

        let s = a + d * 2.0;
        assert_relative_eq!(s.x, 7.0);
        assert_relative_eq!(s.y, 10.0);
    }

    #[test]
    fn test_unit_of_zero_vector() {
        let u = Point::default().unit();
        assert_eq!(u, Point::default());
    }
}
