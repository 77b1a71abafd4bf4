//! Per-event hit containers.

use crate::point::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coordinate system the hits of an event are expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CoordinateFrame {
    /// Detector-wide coordinates; `z` is meaningful.
    #[default]
    Common,
    /// Strip coordinates local to each hit's layer; `z` is ignored until
    /// the layer placement is applied.
    Local,
}

/// All hits of one event across every layer.
///
/// Each hit's `layer_id` decides which tracking layer receives it.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Event number from the data stream.
    pub number: u64,
    /// Frame of `hits`.
    pub frame: CoordinateFrame,
    /// Hits of every layer.
    pub hits: Vec<Point>,
}

impl Event {
    /// Creates an empty event.
    #[must_use]
    pub fn new(number: u64) -> Self {
        Self {
            number,
            frame: CoordinateFrame::Common,
            hits: Vec::new(),
        }
    }

    /// Sets the frame the hits are expressed in.
    #[must_use]
    pub fn with_frame(mut self, frame: CoordinateFrame) -> Self {
        self.frame = frame;
        self
    }

    /// Returns true if the hits still need their layer placement applied.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.frame == CoordinateFrame::Local
    }

    /// Adds a hit.
    pub fn push(&mut self, hit: Point) {
        self.hits.push(hit);
    }

    /// Number of hits across all layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if the event has no hits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Hits routed to `layer_id`.
    pub fn hits_on_layer(&self, layer_id: i32) -> impl Iterator<Item = &Point> {
        self.hits.iter().filter(move |p| p.layer_id == layer_id)
    }
}
