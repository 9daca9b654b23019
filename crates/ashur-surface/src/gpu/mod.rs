//! GPU context abstraction.
//!
//! The surface core never talks to a graphics API directly. It drives a
//! [`GpuContext`]: an owned, epoch-scoped handle that can compile shader
//! programs, allocate the small set of context-scoped resources the core
//! manages, and reset the output target before a draw is delegated.
//!
//! [`backend::WgpuBackend`] is the production implementation; tests supply
//! their own.

pub mod backend;

use std::fmt;

/// Opaque handle to a compiled shader program.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramId(pub u64);

/// Opaque handle to a GPU vertex buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BufferId(pub u64);

/// Opaque handle to a GPU texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureId(pub u64);

/// WGSL source pair for one named program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
}

/// Resolves program names to shader source.
///
/// The registry is external to this crate; the shader cache consults it on
/// the first lookup of each name per context epoch.
pub trait ShaderRegistry {
    fn resolve(&self, name: &str) -> Option<ShaderSource>;
}

/// Failure raised by [`GpuContext`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The operation requires a live context and none is held.
    Unavailable,
    /// Shader compilation was rejected by the device.
    Compile { name: String, message: String },
    /// A buffer or texture allocation failed.
    Allocation(String),
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "no GPU context is available"),
            Self::Compile { name, message } => {
                write!(f, "shader '{name}' failed to compile: {message}")
            }
            Self::Allocation(message) => write!(f, "GPU allocation failed: {message}"),
        }
    }
}

impl std::error::Error for ContextError {}

/// One epoch's GPU context.
///
/// A `GpuContext` is moved into the surface's context manager on acquisition
/// and dropped at teardown; it is never shared across epochs. All resource
/// handles it returns die with it.
pub trait GpuContext {
    /// Compiles `source` into a program wired to the static full-surface
    /// vertex layout, under a diagnostic `name`.
    fn compile_program(
        &mut self,
        name: &str,
        source: &ShaderSource,
    ) -> Result<ProgramId, ContextError>;

    /// Releases a compiled program. Unknown ids are ignored.
    fn release_program(&mut self, program: ProgramId);

    /// Allocates the static full-surface triangle vertex buffer.
    fn create_surface_triangle(&mut self) -> Result<BufferId, ContextError>;

    /// Releases a vertex buffer. Unknown ids are ignored.
    fn release_buffer(&mut self, buffer: BufferId);

    /// Allocates the 1x1 blank placeholder texture.
    fn create_blank_texture(&mut self) -> Result<TextureId, ContextError>;

    /// Releases a texture. Unknown ids are ignored.
    fn release_texture(&mut self, texture: TextureId);

    /// Resets the default output target and viewport to `width` x `height`
    /// physical pixels. Called once before each delegated draw.
    fn bind_output(&mut self, width: u32, height: u32);
}
