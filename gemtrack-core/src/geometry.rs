//! Layer placement and local-to-common coordinate transforms.

use crate::point::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Placement of one tracking layer in the common coordinate system.
///
/// Local hits `(x, y)` are lifted to `(x, y, z)` at the layer's z position,
/// rotated by `tilt_angle` (radians, applied as `Rx * Ry * Rz`), then
/// shifted by `offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LayerPlacement {
    /// Layer origin; its z is the layer's z position (mm).
    pub position: [f64; 3],
    /// Full (not half) layer extent (mm).
    pub dimension: [f64; 3],
    /// Alignment offset applied after rotation (mm).
    pub offset: [f64; 3],
    /// Tilt angles around x, y, z (radians).
    pub tilt_angle: [f64; 3],
}

impl Default for LayerPlacement {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            dimension: [1.0, 1.0, 1.0],
            offset: [0.0; 3],
            tilt_angle: [0.0; 3],
        }
    }
}

impl LayerPlacement {
    /// Placement at `z` with the given in-plane extent and no misalignment.
    #[must_use]
    pub fn at_z(z: f64, extent_x: f64, extent_y: f64) -> Self {
        Self {
            position: [0.0, 0.0, z],
            dimension: [extent_x, extent_y, 1.0],
            ..Self::default()
        }
    }

    /// Sets the alignment offset.
    #[must_use]
    pub fn with_offset(mut self, offset: [f64; 3]) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the tilt angles.
    #[must_use]
    pub fn with_tilt(mut self, tilt_angle: [f64; 3]) -> Self {
        self.tilt_angle = tilt_angle;
        self
    }

    /// Layer z position.
    #[inline]
    #[must_use]
    pub fn z(&self) -> f64 {
        self.position[2]
    }

    /// Returns true when the transform is the identity.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.offset == [0.0; 3] && self.tilt_angle == [0.0; 3]
    }

    /// Maps a local hit into the common system.
    ///
    /// The input's `x`/`y` are local strip coordinates; its `z` is ignored
    /// and replaced by the layer z before the rotation. Metadata is kept.
    #[must_use]
    pub fn to_global(&self, local: Point) -> Point {
        let lifted = local.moved_to(local.x, local.y, self.z());
        let rotated = rotate(lifted, self.tilt_angle);
        rotated.moved_to(
            rotated.x + self.offset[0],
            rotated.y + self.offset[1],
            rotated.z + self.offset[2],
        )
    }
}

/// Rotates `p` by `Rx(a) * Ry(b) * Rz(c)` with `angles = [a, b, c]`.
#[must_use]
pub fn rotate(p: Point, angles: [f64; 3]) -> Point {
    let (sx, cx) = angles[0].sin_cos();
    let (sy, cy) = angles[1].sin_cos();
    let (sz, cz) = angles[2].sin_cos();

    let x = cy * cz * p.x - cy * sz * p.y + sy * p.z;
    let y = (cx * sz + sx * sy * cz) * p.x + (cx * cz - sx * sy * sz) * p.y - sx * cy * p.z;
    let z = (sx * sz - cx * sy * cz) * p.x + (sx * cz + cx * sy * sz) * p.y + cx * cy * p.z;

    p.moved_to(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_placement() {
        let placement = LayerPlacement::at_z(1020.0, 100.0, 400.0);
        assert!(placement.is_aligned());

        let p = placement.to_global(Point::new(3.0, -4.0, 0.0).with_module(2));
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, -4.0);
        assert_relative_eq!(p.z, 1020.0);
        assert_eq!(p.module_id, 2);
    }

    #[test]
    fn test_offset_only() {
        let placement = LayerPlacement::at_z(100.0, 100.0, 100.0).with_offset([0.5, -0.25, 1.0]);
        let p = placement.to_global(Point::new(1.0, 1.0, 0.0));
        assert_relative_eq!(p.x, 1.5);
        assert_relative_eq!(p.y, 0.75);
        assert_relative_eq!(p.z, 101.0);
    }

    #[test]
    fn test_rotation_about_z() {
        let p = rotate(Point::new(1.0, 0.0, 5.0), [0.0, 0.0, FRAC_PI_2]);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_preserves_length() {
        let p = Point::new(3.0, -2.0, 7.0);
        let r = rotate(p, [0.01, -0.02, 0.3]);
        assert_relative_eq!(r.norm(), p.norm(), epsilon = 1e-12);
    }
}
