//! Registry of tracking layers and per-event hit routing.

use std::collections::HashMap;

use gemtrack_core::error::ConfigError;
use gemtrack_core::event::{CoordinateFrame, Event};
use gemtrack_core::point::Point;
use gemtrack_core::track::Track;
use log::warn;

use crate::layer::Layer;

/// Outcome of routing an event's hits to layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoutingSummary {
    /// Hits stored on a registered layer.
    pub routed: usize,
    /// Hits whose layer id is not registered.
    pub unrouted: usize,
    /// Hits on layers excluded from tracking; not stored.
    pub skipped: usize,
}

/// The set of layers making up one detector setup.
#[derive(Debug, Clone, Default)]
pub struct Detector {
    layers: Vec<Layer>,
    index: HashMap<i32, usize>,
}

impl Detector {
    /// Creates an empty detector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a layer.
    ///
    /// # Errors
    /// [`ConfigError::DuplicateLayer`] if a layer with the same id exists.
    pub fn add_layer(&mut self, layer: Layer) -> Result<(), ConfigError> {
        let id = layer.id();
        if self.index.contains_key(&id) {
            return Err(ConfigError::DuplicateLayer(id));
        }
        self.index.insert(id, self.layers.len());
        self.layers.push(layer);
        Ok(())
    }

    /// Layer with the given id.
    #[must_use]
    pub fn layer(&self, id: i32) -> Option<&Layer> {
        self.index.get(&id).map(|&i| &self.layers[i])
    }

    /// Mutable layer with the given id.
    pub fn layer_mut(&mut self, id: i32) -> Option<&mut Layer> {
        self.index.get(&id).map(|&i| &mut self.layers[i])
    }

    /// All layers in registration order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Ids of the layers taking part in tracking, in registration order.
    #[must_use]
    pub fn tracking_layer_ids(&self) -> Vec<i32> {
        self.layers
            .iter()
            .filter(|l| l.is_tracking())
            .map(Layer::id)
            .collect()
    }

    /// Total hits across layers.
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.layers.iter().map(Layer::hit_count).sum()
    }

    /// Drops every layer's hits.
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.reset();
        }
    }

    /// Stores `hit` on the layer named by its `layer_id`.
    ///
    /// Returns the hit index, or `None` for an unknown layer.
    pub fn add_hit(&mut self, hit: Point) -> Option<usize> {
        self.layer_mut(hit.layer_id).map(|layer| layer.add_hit(hit))
    }

    /// Replaces the current hits with those of `event`.
    ///
    /// Local events are mapped through each layer's placement. Hits on
    /// non-tracking layers are counted but not stored.
    pub fn load_event(&mut self, event: &Event) -> RoutingSummary {
        self.reset();

        let local = event.is_local();
        let mut summary = RoutingSummary::default();
        for hit in &event.hits {
            match self.layer_mut(hit.layer_id) {
                Some(layer) if layer.is_tracking() => {
                    if local {
                        layer.add_local_hit(*hit);
                    } else {
                        layer.add_hit(*hit);
                    }
                    summary.routed += 1;
                }
                Some(_) => summary.skipped += 1,
                None => summary.unrouted += 1,
            }
        }

        if summary.unrouted > 0 {
            warn!(
                "Event {}: {} hit(s) on unregistered layers were ignored",
                event.number, summary.unrouted
            );
        }
        summary
    }

    /// Maps a local event into the common system through each hit's layer
    /// placement. Events already in the common frame are left alone, as
    /// are hits on unknown layers.
    pub fn place_event(&self, event: &mut Event) {
        if !event.is_local() {
            return;
        }
        for hit in &mut event.hits {
            if let Some(layer) = self.layer(hit.layer_id) {
                *hit = layer.placement().to_global(*hit);
            }
        }
        event.frame = CoordinateFrame::Common;
    }

    /// Flags the home cell of every hit on `track` as chosen.
    ///
    /// Returns the number of cells flagged.
    pub fn mark_track_cells(&mut self, track: &Track) -> usize {
        let mut marked = 0;
        for (hit, point) in track.hits.iter().zip(&track.points) {
            let Some(layer) = self.layer_mut(hit.layer_id) else {
                continue;
            };
            let grid = layer.grid_mut();
            if let Some(addr) = grid.home_address(point.x, point.y) {
                if grid.mark_chosen(addr) {
                    marked += 1;
                }
            }
        }
        marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemtrack_core::config::GridConfig;
    use gemtrack_core::geometry::LayerPlacement;
    use gemtrack_core::track::{HitRef, TrackParameters};

    fn layer(id: i32, z: f64) -> Layer {
        Layer::new(id, LayerPlacement::at_z(z, 100.0, 100.0), GridConfig::default()).unwrap()
    }

    #[test]
    fn test_duplicate_layer_rejected() {
        let mut detector = Detector::new();
        detector.add_layer(layer(0, 0.0)).unwrap();
        assert_eq!(
            detector.add_layer(layer(0, 10.0)),
            Err(ConfigError::DuplicateLayer(0))
        );
        assert_eq!(detector.layers().len(), 1);
    }

    #[test]
    fn test_tracking_layers_keep_registration_order() {
        let mut detector = Detector::new();
        detector.add_layer(layer(3, 300.0)).unwrap();
        detector
            .add_layer(layer(1, 100.0).with_tracking(false))
            .unwrap();
        detector.add_layer(layer(2, 200.0)).unwrap();
        assert_eq!(detector.tracking_layer_ids(), vec![3, 2]);
    }

    #[test]
    fn test_load_event_routes_hits() {
        let mut detector = Detector::new();
        detector.add_layer(layer(0, 0.0)).unwrap();
        detector.add_layer(layer(1, 100.0)).unwrap();
        detector
            .add_layer(layer(2, 150.0).with_tracking(false))
            .unwrap();

        let mut event = Event::new(1);
        event.push(Point::new(0.0, 0.0, 0.0).with_layer(0));
        event.push(Point::new(1.0, 0.0, 100.0).with_layer(1));
        event.push(Point::new(1.5, 0.0, 150.0).with_layer(2));
        event.push(Point::new(2.0, 0.0, 200.0).with_layer(9));

        let summary = detector.load_event(&event);
        assert_eq!(
            summary,
            RoutingSummary {
                routed: 2,
                unrouted: 1,
                skipped: 1
            }
        );
        assert_eq!(detector.hit_count(), 2);

        // Loading again replaces rather than accumulates.
        detector.load_event(&event);
        assert_eq!(detector.layer(1).unwrap().hit_count(), 1);
    }

    #[test]
    fn test_place_event() {
        let mut detector = Detector::new();
        let placement = LayerPlacement::at_z(250.0, 100.0, 100.0).with_offset([1.0, 2.0, 0.0]);
        detector
            .add_layer(Layer::new(4, placement, GridConfig::default()).unwrap())
            .unwrap();

        let mut event = Event::new(3).with_frame(CoordinateFrame::Local);
        event.push(Point::new(10.0, -5.0, 0.0).with_layer(4).with_module(40));
        event.push(Point::new(10.0, -5.0, 0.0).with_layer(8));
        detector.place_event(&mut event);
        assert!(!event.is_local());

        let placed = event.hits[0];
        assert!((placed.x - 11.0).abs() < 1e-12);
        assert!((placed.y + 3.0).abs() < 1e-12);
        assert!((placed.z - 250.0).abs() < 1e-12);
        assert_eq!(placed.module_id, 40);
        assert!(event.hits[1].z.abs() < f64::EPSILON);

        // A second pass does not apply the offset again.
        detector.place_event(&mut event);
        assert!((event.hits[0].x - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_load_local_event_applies_placement() {
        let mut detector = Detector::new();
        let placement = LayerPlacement::at_z(400.0, 100.0, 100.0).with_offset([0.5, 0.0, 0.0]);
        detector
            .add_layer(Layer::new(2, placement, GridConfig::default()).unwrap())
            .unwrap();

        let mut event = Event::new(5).with_frame(CoordinateFrame::Local);
        event.push(Point::new(3.0, 4.0, 0.0).with_layer(2));
        detector.load_event(&event);

        let hit = detector.layer(2).unwrap().hit(0).unwrap();
        assert!((hit.x - 3.5).abs() < 1e-12);
        assert!((hit.z - 400.0).abs() < 1e-12);

        // The same hits in the common frame are stored as given.
        let mut common = event.clone();
        detector.place_event(&mut common);
        detector.load_event(&common);
        let hit = detector.layer(2).unwrap().hit(0).unwrap();
        assert!((hit.x - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_mark_track_cells() {
        let mut detector = Detector::new();
        detector.add_layer(layer(0, 0.0)).unwrap();
        detector.add_layer(layer(1, 100.0)).unwrap();

        let p0 = Point::new(1.0, 1.0, 0.0).with_layer(0);
        let p1 = Point::new(2.0, 1.0, 100.0).with_layer(1);
        detector.add_hit(p0);
        detector.add_hit(p1);

        let track = Track {
            params: TrackParameters {
                x0: 1.0,
                y0: 1.0,
                xp: 0.01,
                yp: 0.0,
                chi2ndf: 0.0,
            },
            hits: vec![HitRef::new(0, 0), HitRef::new(1, 0)],
            points: vec![p0, p1],
            residuals_x: vec![0.0; 2],
            residuals_y: vec![0.0; 2],
        };

        assert_eq!(detector.mark_track_cells(&track), 2);
        assert_eq!(detector.layer(0).unwrap().grid().chosen_count(), 1);

        detector.reset();
        assert_eq!(detector.layer(0).unwrap().grid().chosen_count(), 0);
    }
}
