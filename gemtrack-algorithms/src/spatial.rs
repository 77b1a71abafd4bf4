//! Spatial indexing of a layer's hits.
//!
//! The layer plane is divided into fixed-size rectangular cells. Each hit is
//! recorded in exactly one home cell; a query point returns its home cell
//! plus the neighbors it sits close to, so the track search only has to look
//! at hits near the predicted crossing point.

use std::collections::HashMap;

use gemtrack_core::config::GridConfig;
use gemtrack_core::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Integer address of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridAddress {
    /// Column (x) index.
    pub i: i32,
    /// Row (y) index.
    pub j: i32,
}

impl GridAddress {
    /// Creates an address.
    #[inline]
    #[must_use]
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Address shifted by `(di, dj)`.
    #[inline]
    #[must_use]
    pub const fn offset(self, di: i32, dj: i32) -> Self {
        Self::new(self.i + di, self.j + dj)
    }
}

/// Bounds of a grid cell, `[x1, x2) x [y1, y2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridCell {
    /// Lower x edge.
    pub x1: f64,
    /// Lower y edge.
    pub y1: f64,
    /// Upper x edge.
    pub x2: f64,
    /// Upper y edge.
    pub y2: f64,
}

impl GridCell {
    /// Returns true if `(x, y)` lies inside the cell.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }
}

/// Where a point sits inside its home cell.
///
/// ```text
/// TopLeft ----- Top ----- TopRight
///    |                       |
///  Left       Center       Right
///    |                       |
/// BottomLeft - Bottom - BottomRight
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum NeighborZone {
    Center,
    Left,
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
}

impl NeighborZone {
    /// Offsets of the neighbor cells worth searching from this zone.
    ///
    /// Edges add the adjacent cell; corners add both edge cells and the
    /// diagonal.
    #[must_use]
    pub const fn neighbor_offsets(self) -> &'static [(i32, i32)] {
        match self {
            Self::Center => &[],
            Self::Left => &[(-1, 0)],
            Self::TopLeft => &[(-1, 0), (0, 1), (-1, 1)],
            Self::Top => &[(0, 1)],
            Self::TopRight => &[(1, 0), (1, 1), (0, 1)],
            Self::Right => &[(1, 0)],
            Self::BottomRight => &[(1, 0), (1, -1), (0, -1)],
            Self::Bottom => &[(0, -1)],
            Self::BottomLeft => &[(-1, 0), (-1, -1), (0, -1)],
        }
    }
}

/// Grid index over one layer's hits.
///
/// Cell geometry is fixed once [`SpatialGrid::build`] has run; the reverse
/// index from cell to hit indices is refilled every event and cleared with
/// [`SpatialGrid::reset`].
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    config: GridConfig,
    extent_x: f64,
    extent_y: f64,
    nbins_x: i32,
    nbins_y: i32,
    cells: HashMap<GridAddress, GridCell>,
    chosen: HashMap<GridAddress, bool>,
    buckets: HashMap<GridAddress, Vec<usize>>,
}

impl SpatialGrid {
    /// Creates an empty grid. Call [`SpatialGrid::build`] to lay out cells.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: GridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            extent_x: 0.0,
            extent_y: 0.0,
            nbins_x: 0,
            nbins_y: 0,
            cells: HashMap::new(),
            chosen: HashMap::new(),
            buckets: HashMap::new(),
        })
    }

    /// Lays out cells covering a layer of the given full extent.
    ///
    /// Replaces any previous geometry and clears the hit index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(&mut self, extent_x: f64, extent_y: f64) {
        let GridConfig {
            width_x,
            width_y,
            shift,
            ..
        } = self.config;

        self.extent_x = extent_x;
        self.extent_y = extent_y;
        self.nbins_x = ((extent_x + shift) / width_x).ceil().max(0.0) as i32;
        self.nbins_y = ((extent_y + shift) / width_y).ceil().max(0.0) as i32;

        self.cells.clear();
        self.chosen.clear();
        self.buckets.clear();

        for i in 0..self.nbins_x {
            let x1 = f64::from(i) * width_x - shift - extent_x / 2.0;
            let x2 = f64::from(i + 1) * width_x - shift - extent_x / 2.0;
            for j in 0..self.nbins_y {
                let y1 = f64::from(j) * width_y - shift - extent_y / 2.0;
                let y2 = f64::from(j + 1) * width_y - shift - extent_y / 2.0;

                let addr = GridAddress::new(i, j);
                self.cells.insert(addr, GridCell { x1, y1, x2, y2 });
                self.chosen.insert(addr, false);
            }
        }
    }

    /// Grid configuration.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Number of cells along x and y.
    #[must_use]
    pub fn shape(&self) -> (i32, i32) {
        (self.nbins_x, self.nbins_y)
    }

    /// Total number of cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Bounds of the cell at `addr`.
    #[must_use]
    pub fn cell(&self, addr: GridAddress) -> Option<&GridCell> {
        self.cells.get(&addr)
    }

    /// Raw address for `(x, y)`, whether or not such a cell exists.
    ///
    /// Returns `None` for non-finite coordinates.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn locate(&self, x: f64, y: f64) -> Option<GridAddress> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let x_low = -self.extent_x / 2.0 - self.config.shift;
        let y_low = -self.extent_y / 2.0 - self.config.shift;
        let i = ((x - x_low) / self.config.width_x).floor();
        let j = ((y - y_low) / self.config.width_y).floor();
        Some(GridAddress::new(i as i32, j as i32))
    }

    /// Address of the existing cell containing `(x, y)`.
    #[must_use]
    pub fn home_address(&self, x: f64, y: f64) -> Option<GridAddress> {
        self.locate(x, y)
            .filter(|addr| self.cells.contains_key(addr))
    }

    /// Records hit `index` at `(x, y)`.
    ///
    /// Returns the home address, or `None` when the hit lies outside the
    /// grid; such hits are simply not indexed.
    pub fn insert(&mut self, index: usize, x: f64, y: f64) -> Option<GridAddress> {
        let addr = self.home_address(x, y)?;
        self.buckets.entry(addr).or_default().push(index);
        Some(addr)
    }

    /// Zone of `(x, y)` within the cell at `addr`.
    ///
    /// Left/right take precedence over top/bottom, and top over bottom when
    /// a cell is narrower than two margins.
    #[must_use]
    pub fn neighbor_zone(&self, x: f64, y: f64, addr: GridAddress) -> NeighborZone {
        let Some(cell) = self.cells.get(&addr) else {
            return NeighborZone::Center;
        };
        let margin_x = self.config.margin_x();
        let margin_y = self.config.margin_y();

        let near_left = x - cell.x1 < margin_x;
        let near_right = cell.x2 - x < margin_x;
        let near_top = cell.y2 - y < margin_y;
        let near_bottom = y - cell.y1 < margin_y;

        if near_left {
            if near_top {
                NeighborZone::TopLeft
            } else if near_bottom {
                NeighborZone::BottomLeft
            } else {
                NeighborZone::Left
            }
        } else if near_right {
            if near_top {
                NeighborZone::TopRight
            } else if near_bottom {
                NeighborZone::BottomRight
            } else {
                NeighborZone::Right
            }
        } else if near_top {
            NeighborZone::Top
        } else if near_bottom {
            NeighborZone::Bottom
        } else {
            NeighborZone::Center
        }
    }

    /// Home cell of `(x, y)` followed by the neighbors close enough to
    /// matter. Empty when the point is outside the grid.
    #[must_use]
    pub fn home_grids(&self, x: f64, y: f64) -> Vec<GridAddress> {
        let Some(home) = self.home_address(x, y) else {
            return Vec::new();
        };

        let offsets = self.neighbor_zone(x, y, home).neighbor_offsets();
        let mut res = Vec::with_capacity(1 + offsets.len());
        res.push(home);
        res.extend(
            offsets
                .iter()
                .map(|&(di, dj)| home.offset(di, dj))
                .filter(|addr| self.cells.contains_key(addr)),
        );
        res
    }

    /// Hit indices recorded in the cell at `addr`.
    #[must_use]
    pub fn hits_in(&self, addr: GridAddress) -> &[usize] {
        self.buckets.get(&addr).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends the hit indices of every cell in `home_grids(x, y)` to `out`.
    pub fn collect_hits(&self, x: f64, y: f64, out: &mut Vec<usize>) {
        for addr in self.home_grids(x, y) {
            out.extend_from_slice(self.hits_in(addr));
        }
    }

    /// Flags the cell at `addr` as chosen. Returns false for unknown cells.
    pub fn mark_chosen(&mut self, addr: GridAddress) -> bool {
        match self.chosen.get_mut(&addr) {
            Some(flag) => {
                *flag = true;
                true
            }
            None => false,
        }
    }

    /// Returns true if the cell at `addr` has been flagged this event.
    #[must_use]
    pub fn is_chosen(&self, addr: GridAddress) -> bool {
        self.chosen.get(&addr).copied().unwrap_or(false)
    }

    /// Number of cells flagged this event.
    #[must_use]
    pub fn chosen_count(&self) -> usize {
        self.chosen.values().filter(|&&c| c).count()
    }

    /// Cells holding at least one hit, with their hit counts, sorted by
    /// address.
    #[must_use]
    pub fn occupied_cells(&self) -> Vec<(GridAddress, usize)> {
        let mut occupied: Vec<(GridAddress, usize)> = self
            .buckets
            .iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(addr, hits)| (*addr, hits.len()))
            .collect();
        occupied.sort_unstable_by_key(|(addr, _)| *addr);
        occupied
    }

    /// Clears the per-event hit index and chosen flags; geometry is kept.
    pub fn reset(&mut self) {
        for hits in self.buckets.values_mut() {
            hits.clear();
        }
        for flag in self.chosen.values_mut() {
            *flag = false;
        }
    }
}
