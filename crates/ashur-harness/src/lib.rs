//! Test doubles for the Ashur surface lifecycle.
//!
//! Everything here stands in for an external collaborator: a GPU context
//! that only records what was asked of it, loaders whose outcomes the test
//! flips by hand, a platform view with fixed dimensions, a root drawable
//! with scripted behavior, and a visitor that logs every notification.
//!
//! These doubles are deterministic and single-threaded, like the surface
//! itself; tests drive the frame clock by calling `Surface::on_frame`.

mod gpu;
mod loader;
mod root;
mod shaders;
mod view;
mod visitor;

pub use gpu::{FakeGpu, GpuProbe};
pub use loader::{LoadControl, ScriptedLoader};
pub use root::TestRoot;
pub use shaders::MapShaderRegistry;
pub use view::StubView;
pub use visitor::{RecordingVisitor, VisitorEvent};
