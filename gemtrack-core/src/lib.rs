//! gemtrack-core: Core types for straight-line track finding.
//!
//! This crate provides the foundational data model shared by the tracking
//! algorithms and the I/O layer: hit points, layer placement, tracking cuts,
//! track results and their column-wise output form.
//!

pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod point;
pub mod soa;
pub mod track;

pub use config::{GridConfig, SearchStrategy, SlopeWindow, TrackingCuts};
pub use error::{ConfigError, Error, FitError, Result};
pub use event::{CoordinateFrame, Event};
pub use geometry::LayerPlacement;
pub use point::Point;
pub use soa::TrackBatch;
pub use track::{HitDiagnostic, HitRef, Track, TrackParameters};
