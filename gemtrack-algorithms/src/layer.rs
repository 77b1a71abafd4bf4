//! A single tracking layer: placement, hits and spatial index.

use gemtrack_core::config::GridConfig;
use gemtrack_core::error::ConfigError;
use gemtrack_core::geometry::LayerPlacement;
use gemtrack_core::point::Point;

use crate::spatial::SpatialGrid;

/// One detector plane taking part in tracking.
///
/// Hits are stored in arrival order; a hit's index in that list is what the
/// spatial grid and [`gemtrack_core::HitRef`] refer to.
#[derive(Debug, Clone)]
pub struct Layer {
    id: i32,
    placement: LayerPlacement,
    tracking: bool,
    hits: Vec<Point>,
    grid: SpatialGrid,
}

impl Layer {
    /// Creates a layer and lays out its grid over the placement's extent.
    ///
    /// # Errors
    /// Returns an error if the extent is not positive or the grid
    /// configuration is invalid.
    pub fn new(id: i32, placement: LayerPlacement, grid: GridConfig) -> Result<Self, ConfigError> {
        validate_dimension(id, &placement)?;
        let mut grid = SpatialGrid::new(grid)?;
        grid.build(placement.dimension[0], placement.dimension[1]);
        Ok(Self {
            id,
            placement,
            tracking: true,
            hits: Vec::new(),
            grid,
        })
    }

    /// Enables or disables tracking on this layer.
    #[must_use]
    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }

    /// Layer id.
    #[must_use]
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Layer placement.
    #[must_use]
    pub fn placement(&self) -> &LayerPlacement {
        &self.placement
    }

    /// Layer z position.
    #[must_use]
    pub fn z(&self) -> f64 {
        self.placement.z()
    }

    /// Returns true if the layer takes part in tracking.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Changes the layer extent and rebuilds the grid. Current hits are
    /// dropped.
    ///
    /// # Errors
    /// Returns an error if the new extent is not positive.
    pub fn set_dimension(&mut self, extent_x: f64, extent_y: f64) -> Result<(), ConfigError> {
        let mut placement = self.placement;
        placement.dimension[0] = extent_x;
        placement.dimension[1] = extent_y;
        validate_dimension(self.id, &placement)?;

        self.placement = placement;
        self.hits.clear();
        self.grid.build(extent_x, extent_y);
        Ok(())
    }

    /// Adds a hit already in the common coordinate system and returns its
    /// index. Hits outside the grid are kept but never found by a search.
    pub fn add_hit(&mut self, hit: Point) -> usize {
        let index = self.hits.len();
        self.grid.insert(index, hit.x, hit.y);
        self.hits.push(hit.with_layer(self.id));
        index
    }

    /// Adds a hit given in local strip coordinates.
    pub fn add_local_hit(&mut self, local: Point) -> usize {
        let global = self.placement.to_global(local);
        self.add_hit(global)
    }

    /// Hits of the current event.
    #[must_use]
    pub fn hits(&self) -> &[Point] {
        &self.hits
    }

    /// Hit at `index`.
    #[must_use]
    pub fn hit(&self, index: usize) -> Option<&Point> {
        self.hits.get(index)
    }

    /// Number of hits in the current event.
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    /// Spatial index.
    #[must_use]
    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut SpatialGrid {
        &mut self.grid
    }

    /// Appends the indices of hits near `(x, y)` to `out`.
    pub fn candidate_hits(&self, x: f64, y: f64, out: &mut Vec<usize>) {
        self.grid.collect_hits(x, y, out);
    }

    /// Drops the current event's hits.
    pub fn reset(&mut self) {
        self.hits.clear();
        self.grid.reset();
    }
}

fn validate_dimension(id: i32, placement: &LayerPlacement) -> Result<(), ConfigError> {
    let [x, y, _] = placement.dimension;
    if !(x.is_finite() && y.is_finite() && x > 0.0 && y > 0.0) {
        return Err(ConfigError::InvalidDimension { layer: id, x, y });
    }
    Ok(())
}
