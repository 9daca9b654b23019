//! Context epoch management.
//!
//! A context epoch starts when the platform view hands over a GPU context
//! and ends on loss, destroy, or reboot. Everything context-scoped — the
//! shader cache, the pending-load set, the static full-surface buffer, the
//! placeholder texture — is created inside the epoch and torn down with it,
//! so no resource can leak across epochs.

mod shaders;

pub use shaders::{ShaderCache, ShaderError};

use crate::gpu::{BufferId, ContextError, GpuContext, ProgramId, ShaderRegistry, TextureId};
use crate::preload::ResourcePreloader;
use crate::surface::SurfaceId;
use crate::visitor::VisitorBus;

/// Borrowed pieces of the live epoch needed to run one draw pass.
pub(crate) struct PassParts<'a> {
    pub gpu: &'a mut dyn GpuContext,
    pub shaders: &'a mut ShaderCache,
    pub placeholder: &'a mut Option<TextureId>,
    pub surface_triangle: BufferId,
}

/// Owns the GPU context handle and all context-scoped resources.
pub struct ContextManager {
    gpu: Option<Box<dyn GpuContext>>,
    shaders: ShaderCache,
    preloader: ResourcePreloader,
    surface_triangle: Option<BufferId>,
    placeholder: Option<TextureId>,
    epoch: u64,
}

impl ContextManager {
    pub fn new() -> Self {
        Self {
            gpu: None,
            shaders: ShaderCache::new(),
            preloader: ResourcePreloader::new(),
            surface_triangle: None,
            placeholder: None,
            epoch: 0,
        }
    }

    /// Begins a new epoch with `gpu`.
    ///
    /// Any previous epoch is fully torn down first. On success the handle is
    /// stored, observers see `context_changed(available)`, the static
    /// full-surface buffer and a fresh loader set exist, and the shader
    /// cache is empty. Failure to allocate the static buffer tears the epoch
    /// back down.
    pub fn acquire(
        &mut self,
        gpu: Box<dyn GpuContext>,
        bus: &VisitorBus,
        surface: SurfaceId,
    ) -> Result<(), ContextError> {
        self.destroy(bus, surface);

        self.epoch += 1;
        self.gpu = Some(gpu);
        bus.context_changed(surface, true);

        let triangle = self
            .gpu
            .as_mut()
            .map(|g| g.create_surface_triangle())
            .unwrap_or(Err(ContextError::Unavailable));
        match triangle {
            Ok(buffer) => self.surface_triangle = Some(buffer),
            Err(err) => {
                log::warn!("static buffer allocation failed: {err}");
                self.destroy(bus, surface);
                return Err(err);
            }
        }

        self.preloader = ResourcePreloader::new();
        log::debug!("context epoch {} began for surface {surface}", self.epoch);
        Ok(())
    }

    /// Ends the current epoch. No-op when no context is held.
    ///
    /// Teardown order: placeholder texture, pending loads, cached shader
    /// programs, static buffer, observer notification, then the handle
    /// itself.
    pub fn destroy(&mut self, bus: &VisitorBus, surface: SurfaceId) {
        let Some(mut gpu) = self.gpu.take() else {
            return;
        };

        if let Some(texture) = self.placeholder.take() {
            gpu.release_texture(texture);
        }
        self.preloader.dispose_all();
        self.shaders.release_all(gpu.as_mut());
        if let Some(buffer) = self.surface_triangle.take() {
            gpu.release_buffer(buffer);
        }
        bus.context_changed(surface, false);
        drop(gpu);

        log::debug!("context epoch {} ended for surface {surface}", self.epoch);
    }

    /// True iff a context handle is currently held.
    pub fn is_available(&self) -> bool {
        self.gpu.is_some()
    }

    /// Epochs begun so far; the live epoch's number when one is active.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn gpu_mut(&mut self) -> Option<&mut (dyn GpuContext + 'static)> {
        self.gpu.as_deref_mut()
    }

    pub fn preloader_mut(&mut self) -> &mut ResourcePreloader {
        &mut self.preloader
    }

    /// Number of programs currently cached.
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    /// Looks up (compiling if needed) the program for `name`.
    ///
    /// Fails with a context-unavailable error when no handle is held.
    pub fn shader_program(
        &mut self,
        registry: &dyn ShaderRegistry,
        name: &str,
    ) -> Result<ProgramId, ShaderError> {
        let gpu = self
            .gpu
            .as_deref_mut()
            .ok_or(ShaderError::Context(ContextError::Unavailable))?;
        self.shaders.get_or_create(gpu, registry, name)
    }

    /// The epoch's placeholder texture, created on first use.
    pub fn placeholder(&mut self) -> Result<TextureId, ContextError> {
        let gpu = self.gpu.as_deref_mut().ok_or(ContextError::Unavailable)?;
        if let Some(texture) = self.placeholder {
            return Ok(texture);
        }
        let texture = gpu.create_blank_texture()?;
        self.placeholder = Some(texture);
        Ok(texture)
    }

    pub(crate) fn pass_parts(&mut self) -> Option<PassParts<'_>> {
        let gpu = self.gpu.as_deref_mut()?;
        let surface_triangle = self.surface_triangle?;
        Some(PassParts {
            gpu,
            shaders: &mut self.shaders,
            placeholder: &mut self.placeholder,
            surface_triangle,
        })
    }
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::new()
    }
}
