//! Frame timing and scheduling.
//!
//! The frame clock itself is external: the embedder calls
//! `Surface::on_frame` once per frame. This module provides the pieces the
//! surface uses to react to those calls — a clamped delta-time clock for
//! diagnostics and the [`FrameScheduler`] that gates draw dispatch.

mod frame_clock;
mod scheduler;

pub use frame_clock::{FrameClock, FrameTime};
pub use scheduler::FrameScheduler;
