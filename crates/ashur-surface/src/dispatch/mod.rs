//! Guarded draw dispatch.
//!
//! One dispatch is one attempt at a draw pass: precondition guards, the
//! redraw-flag handshake, before/after hooks, delegation to the root
//! drawable, and observer notification. The dispatcher never owns state
//! beyond the pass itself — the surface lends it what it needs.

use std::cell::RefCell;
use std::rc::Rc;

use crate::context::{ContextManager, ShaderCache, ShaderError};
use crate::gpu::{BufferId, ContextError, GpuContext, ProgramId, ShaderRegistry, TextureId};
use crate::root::{DrawError, RootDrawable};
use crate::surface::SurfaceId;
use crate::view::PlatformView;
use crate::visitor::VisitorBus;

/// Why a dispatch performed no draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoContext,
    NoRoot,
    NotRequested,
}

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn,
    Skipped(SkipReason),
    Failed(DrawError),
}

/// What the root drawable sees while it draws.
///
/// The output target and viewport are bound before the pass is handed over.
/// A redraw requested here is honored on a subsequent tick — the pending
/// flag was already cleared for this pass, so the request is never lost and
/// never causes a double draw.
pub struct DrawPass<'a> {
    gpu: &'a mut dyn GpuContext,
    shaders: &'a mut ShaderCache,
    registry: &'a dyn ShaderRegistry,
    placeholder: &'a mut Option<TextureId>,
    surface_triangle: BufferId,
    width: u32,
    height: u32,
    redraw_requested: bool,
}

impl<'a> DrawPass<'a> {
    pub fn gpu(&mut self) -> &mut (dyn GpuContext + 'a) {
        &mut *self.gpu
    }

    /// Cached program lookup for this epoch.
    pub fn shader(&mut self, name: &str) -> Result<ProgramId, ShaderError> {
        self.shaders.get_or_create(&mut *self.gpu, self.registry, name)
    }

    /// The epoch's placeholder texture, created on first use.
    pub fn placeholder_texture(&mut self) -> Result<TextureId, ContextError> {
        if let Some(texture) = *self.placeholder {
            return Ok(texture);
        }
        let texture = self.gpu.create_blank_texture()?;
        *self.placeholder = Some(texture);
        Ok(texture)
    }

    /// The static full-surface triangle buffer.
    pub fn surface_triangle(&self) -> BufferId {
        self.surface_triangle
    }

    /// Output size in physical pixels.
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Asks for another draw pass after this one completes.
    pub fn request_redraw(&mut self) {
        self.redraw_requested = true;
    }
}

/// Everything one dispatch borrows from the surface.
pub(crate) struct DispatchEnv<'a> {
    pub surface: SurfaceId,
    pub width: u32,
    pub height: u32,
    pub context: &'a mut ContextManager,
    pub root: Option<Rc<RefCell<dyn RootDrawable>>>,
    pub redraw_pending: &'a mut bool,
    pub bus: &'a VisitorBus,
    pub view: &'a Rc<RefCell<dyn PlatformView>>,
    pub registry: &'a dyn ShaderRegistry,
}

pub(crate) struct DrawDispatcher;

impl DrawDispatcher {
    /// Runs one guarded draw pass. `force` bypasses the pending-flag guard
    /// (used by `flush_now`), never the context/root guards.
    pub fn run(env: DispatchEnv<'_>, force: bool) -> DrawOutcome {
        if !env.context.is_available() {
            env.bus.draw_skipped(env.surface, SkipReason::NoContext);
            return DrawOutcome::Skipped(SkipReason::NoContext);
        }
        let Some(root) = env.root else {
            env.bus.draw_skipped(env.surface, SkipReason::NoRoot);
            return DrawOutcome::Skipped(SkipReason::NoRoot);
        };
        if !*env.redraw_pending && !force {
            env.bus.draw_skipped(env.surface, SkipReason::NotRequested);
            return DrawOutcome::Skipped(SkipReason::NotRequested);
        }

        // Cleared before the draw so a request made during the draw marks a
        // future pass instead of vanishing.
        *env.redraw_pending = false;

        env.bus.draw_start(env.surface);
        env.view.borrow_mut().before_draw();

        let Some(parts) = env.context.pass_parts() else {
            env.bus.draw_skipped(env.surface, SkipReason::NoContext);
            return DrawOutcome::Skipped(SkipReason::NoContext);
        };
        parts.gpu.bind_output(env.width, env.height);

        let mut pass = DrawPass {
            gpu: parts.gpu,
            shaders: parts.shaders,
            registry: env.registry,
            placeholder: parts.placeholder,
            surface_triangle: parts.surface_triangle,
            width: env.width,
            height: env.height,
            redraw_requested: false,
        };

        let result = root.borrow_mut().draw(&mut pass);
        let requested_during_draw = pass.redraw_requested;
        if requested_during_draw {
            *env.redraw_pending = true;
        }

        match result {
            Ok(()) => {
                env.view.borrow_mut().after_draw();
                env.bus.draw_end(env.surface);
                DrawOutcome::Drawn
            }
            Err(err) => {
                log::warn!("surface {} draw pass failed: {err}", env.surface);
                env.bus.draw_error(env.surface, &err);
                DrawOutcome::Failed(err)
            }
        }
    }
}
