//! Ashur surface crate.
//!
//! This crate owns the GPU surface lifecycle used by higher layers: context
//! acquisition and teardown, resource preloading before first paint,
//! frame-driven redraw scheduling, and structured recovery from context loss.
//! The host framework, the platform view, and the scene-graph root are
//! collaborators specified as traits; this crate holds the state machine
//! that keeps them consistent.

pub mod capture;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gpu;
pub mod preload;
pub mod registry;
pub mod root;
pub mod surface;
pub mod time;
pub mod view;
pub mod visitor;

pub mod logging;

pub use surface::{Surface, SurfaceId, SurfaceOptions, SurfacePhase};
