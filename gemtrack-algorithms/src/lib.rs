//! gemtrack-algorithms: Straight-line track finding for layered strip detectors.
//!
//! This crate provides the tracking pipeline:
//! - **Spatial grid** - per-layer cell index for fast neighborhood lookups
//! - **Line fit** - closed-form least squares in x-z and y-z
//! - **Combination search** - boundary-pair seeding with grid-pruned middles
//! - **Top-K retention** - bounded list of the lowest chi2/ndf candidates
//!
#![warn(missing_docs)]

pub mod combination;
mod detector;
mod engine;
pub mod fit;
mod layer;
mod processing;
pub mod spatial;
mod topk;

pub use combination::LayerGroups;
pub use detector::{Detector, RoutingSummary};
pub use engine::{SearchStatistics, TrackFinder};
pub use fit::{fit_line, intersection_point, projected_point, LineFit, LineFitter};
pub use layer::Layer;
pub use processing::{
    track_event_stream, track_events, EventResult, TrackEventStream, TrackingSystem,
};
pub use spatial::{GridAddress, GridCell, NeighborZone, SpatialGrid};
pub use topk::TopKTracks;

// Re-export core configuration types
pub use gemtrack_core::config::{GridConfig, SearchStrategy, SlopeWindow, TrackingCuts};
