//! Surface orchestration.
//!
//! [`Surface`] composes the context manager, preloader, scheduler,
//! dispatcher, root binding, and visitor bus into the full lifecycle:
//!
//! ```text
//! mount → context created → preload → ready → draw loop ⇄ (lost → restored)
//! ```
//!
//! The platform view drives the context callbacks, the embedder's frame
//! clock drives [`Surface::on_frame`], and the host framework attaches the
//! root drawable. Everything runs on one logical thread.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::capture::{self, CaptureError, CaptureRect, EncodedImageFormat, PixelBuffer};
use crate::context::ContextManager;
use crate::dispatch::{DispatchEnv, DrawDispatcher, DrawOutcome};
use crate::error::PreconditionError;
use crate::gpu::{GpuContext, ShaderRegistry};
use crate::preload::{
    BatchId, LoadError, LoaderStrategy, PreloadProgress, PreloadRequest, PreloadStart,
};
use crate::registry::{self, SurfaceRegistry};
use crate::root::{RootBinding, RootDrawable};
use crate::time::FrameScheduler;
use crate::view::PlatformView;
use crate::visitor::{SurfaceVisitor, VisitorBus};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable, process-unique surface identity.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle phase of a surface.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfacePhase {
    /// Mounted, waiting for the platform view to produce a context.
    Detached,
    /// Context live, preload batch in flight.
    Preloading,
    /// Context live, frame loop armed.
    Ready,
    /// Context lost; waiting for restoration.
    Lost,
    /// Context creation or preload failed for this epoch. No automatic
    /// retry; `force_reboot` can begin a fresh epoch.
    Failed,
    /// Terminal.
    Unmounted,
}

/// Mount-time configuration.
pub struct SurfaceOptions {
    /// Enables per-tick trace logging.
    pub debug: bool,
    /// Resources to load before the surface reports ready.
    pub preloads: Vec<PreloadRequest>,
    /// Loader strategies consulted in order for each preload request.
    pub loaders: Vec<Rc<dyn LoaderStrategy>>,
    /// Per-surface observer, notified after thread-wide defaults.
    pub visitor: Option<Rc<dyn SurfaceVisitor>>,
    /// Invoked once per epoch when the surface reaches ready.
    pub on_ready: Option<Box<dyn FnMut()>>,
    /// Invoked once per epoch with the first preload failure.
    pub on_load_error: Option<Box<dyn FnMut(&LoadError)>>,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            debug: false,
            preloads: Vec::new(),
            loaders: Vec::new(),
            visitor: None,
            on_ready: None,
            on_load_error: None,
        }
    }
}

/// A mounted rendering surface.
pub struct Surface {
    id: SurfaceId,
    phase: SurfacePhase,
    redraw_pending: bool,
    reboot_count: u64,
    debug: bool,

    context: ContextManager,
    binding: RootBinding,
    scheduler: FrameScheduler,
    bus: VisitorBus,

    view: Rc<RefCell<dyn PlatformView>>,
    shader_registry: Rc<dyn ShaderRegistry>,
    loaders: Vec<Rc<dyn LoaderStrategy>>,
    preloads: Vec<PreloadRequest>,
    active_batch: Option<BatchId>,

    on_ready: Option<Box<dyn FnMut()>>,
    on_load_error: Option<Box<dyn FnMut(&LoadError)>>,

    registry: &'static SurfaceRegistry,
}

impl Surface {
    /// Mounts a surface into the process-wide registry.
    pub fn mount(
        view: Rc<RefCell<dyn PlatformView>>,
        shader_registry: Rc<dyn ShaderRegistry>,
        options: SurfaceOptions,
    ) -> Self {
        Self::mount_with_registry(view, shader_registry, options, registry::global())
    }

    /// Mounts a surface into an explicit registry (tests inject their own).
    pub fn mount_with_registry(
        view: Rc<RefCell<dyn PlatformView>>,
        shader_registry: Rc<dyn ShaderRegistry>,
        options: SurfaceOptions,
        registry: &'static SurfaceRegistry,
    ) -> Self {
        let id = SurfaceId::next();
        let surface = Self {
            id,
            phase: SurfacePhase::Detached,
            redraw_pending: false,
            reboot_count: 0,
            debug: options.debug,
            context: ContextManager::new(),
            binding: RootBinding::new(),
            scheduler: FrameScheduler::new(),
            bus: VisitorBus::new(options.visitor),
            view,
            shader_registry,
            loaders: options.loaders,
            preloads: options.preloads,
            active_batch: None,
            on_ready: options.on_ready,
            on_load_error: options.on_load_error,
            registry,
        };

        registry.register(id);
        surface.bus.surface_mounted(id);
        log::debug!("surface {id} mounted");
        surface
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn phase(&self) -> SurfacePhase {
        self.phase
    }

    pub fn reboot_count(&self) -> u64 {
        self.reboot_count
    }

    /// True iff the frame loop is currently armed.
    pub fn is_loop_running(&self) -> bool {
        self.scheduler.is_armed()
    }

    // ── context callbacks (driven by the platform view) ───────────────────

    /// A context is live; begins a fresh epoch.
    pub fn context_created(&mut self, gpu: Box<dyn GpuContext>) {
        if self.phase == SurfacePhase::Unmounted {
            log::warn!("surface {}: context delivered after unmount", self.id);
            return;
        }
        self.begin_epoch(gpu, false);
    }

    /// The platform view failed to produce a context.
    pub fn context_creation_failed(&mut self, message: &str) {
        if self.phase == SurfacePhase::Unmounted {
            return;
        }
        log::warn!("surface {}: context creation failed: {message}", self.id);
        self.phase = SurfacePhase::Failed;
    }

    /// The context went away. All context-scoped resources are torn down
    /// immediately; no draws are attempted until restoration.
    ///
    /// Safe no-op when no context is held.
    pub fn context_lost(&mut self) {
        if self.phase == SurfacePhase::Unmounted || !self.context.is_available() {
            return;
        }
        self.scheduler.stop();
        self.active_batch = None;
        self.context.destroy(&self.bus, self.id);
        if let Some(root) = self.binding.get() {
            root.borrow_mut().context_lost();
        }
        self.phase = SurfacePhase::Lost;
        log::debug!("surface {}: context lost", self.id);
    }

    /// A replacement context is live after a loss.
    pub fn context_restored(&mut self, gpu: Box<dyn GpuContext>) {
        if self.phase == SurfacePhase::Unmounted {
            return;
        }
        self.begin_epoch(gpu, true);
    }

    // ── frame loop ────────────────────────────────────────────────────────

    /// One tick of the external frame clock.
    ///
    /// Pumps the preload batch while one is in flight; once ready, performs
    /// at most one draw pass per tick, and only when a redraw is pending.
    pub fn on_frame(&mut self) {
        if self.phase == SurfacePhase::Preloading {
            self.pump_preload();
        }

        let Some(frame) = self.scheduler.begin_tick() else {
            return;
        };
        if self.debug {
            log::trace!(
                "surface {} tick {} dt={:.4}s",
                self.id,
                frame.frame_index,
                frame.dt
            );
        }

        if self.phase == SurfacePhase::Ready {
            self.dispatch(false);
        }

        self.scheduler.end_tick();
    }

    /// Marks a redraw as wanted and returns immediately; the draw happens on
    /// a later tick (or via [`flush_now`](Self::flush_now)).
    pub fn request_redraw(&mut self) {
        self.redraw_pending = true;
    }

    /// Performs one draw pass right now, bypassing the frame clock and the
    /// pending flag. Context and root guards still apply.
    pub fn flush_now(&mut self) -> DrawOutcome {
        self.dispatch(true)
    }

    // ── root binding ──────────────────────────────────────────────────────

    /// Attaches the root drawable. At most one may be attached.
    pub fn attach_root(
        &mut self,
        drawable: Rc<RefCell<dyn RootDrawable>>,
    ) -> Result<(), PreconditionError> {
        self.binding.attach(self.id, drawable)?;
        self.request_redraw();
        Ok(())
    }

    /// Detaches the root, if any. The next pass reports "skipped, no root"
    /// instead of drawing stale content.
    pub fn detach_root(&mut self) {
        if self.binding.detach() {
            self.request_redraw();
        }
    }

    pub fn has_root(&self) -> bool {
        self.binding.is_attached()
    }

    // ── host queries and tooling ──────────────────────────────────────────

    pub fn is_context_available(&self) -> bool {
        self.context.is_available()
    }

    /// Drawable size in physical pixels, as reported by the platform view.
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        self.view.borrow().pixel_dimensions()
    }

    /// Reads back pixels from the root drawable.
    pub fn capture_pixels(
        &mut self,
        rect: Option<CaptureRect>,
    ) -> Result<PixelBuffer, CaptureError> {
        if !self.context.is_available() {
            return Err(CaptureError::NoContext);
        }
        let Some(root) = self.binding.get() else {
            return Err(CaptureError::NoRoot);
        };
        root.borrow_mut().capture(rect).map_err(CaptureError::Root)
    }

    /// Full-surface capture, encoded. `quality` affects JPEG only.
    pub fn capture_encoded(
        &mut self,
        format: EncodedImageFormat,
        quality: u8,
    ) -> Result<Vec<u8>, CaptureError> {
        let pixels = self.capture_pixels(None)?;
        capture::encode(&pixels, format, quality)
    }

    /// Tears down the current epoch and asks the platform view for a fresh
    /// context. Diagnostic tooling; also the only way out of
    /// [`SurfacePhase::Failed`].
    pub fn force_reboot(&mut self) {
        self.reboot_count += 1;
        log::debug!("surface {} rebooting (generation {})", self.id, self.reboot_count);

        self.scheduler.stop();
        self.active_batch = None;
        let had_context = self.context.is_available();
        self.context.destroy(&self.bus, self.id);
        if had_context {
            if let Some(root) = self.binding.get() {
                root.borrow_mut().context_lost();
            }
        }
        self.phase = SurfacePhase::Detached;

        let generation = self.reboot_count;
        self.view.borrow_mut().reboot_requested(generation);
    }

    /// Unregisters and tears everything down. Idempotent; also run on drop.
    pub fn unmount(&mut self) {
        if self.phase == SurfacePhase::Unmounted {
            return;
        }
        self.scheduler.stop();
        self.active_batch = None;
        self.context.destroy(&self.bus, self.id);
        self.binding.detach();
        self.registry.deregister(self.id);
        self.bus.surface_unmounted(self.id);
        self.phase = SurfacePhase::Unmounted;
        log::debug!("surface {} unmounted", self.id);
    }

    // ── internals ─────────────────────────────────────────────────────────

    fn begin_epoch(&mut self, gpu: Box<dyn GpuContext>, restored: bool) {
        self.scheduler.stop();
        self.active_batch = None;

        if let Err(err) = self.context.acquire(gpu, &self.bus, self.id) {
            log::warn!("surface {}: context acquisition failed: {err}", self.id);
            self.phase = SurfacePhase::Failed;
            return;
        }

        if restored {
            if let Some(root) = self.binding.get() {
                root.borrow_mut().context_restored();
            }
        }

        self.start_preload();
    }

    fn start_preload(&mut self) {
        let start = self
            .context
            .preloader_mut()
            .begin(&self.preloads, &self.loaders);

        match start {
            PreloadStart::ReadyNow => self.finish_ready(),
            PreloadStart::Pending { batch, started } => {
                log::debug!(
                    "surface {}: preloading {started} resources (batch {batch:?})",
                    self.id
                );
                self.active_batch = Some(batch);
                self.phase = SurfacePhase::Preloading;
            }
        }
    }

    fn pump_preload(&mut self) {
        match self.context.preloader_mut().poll() {
            PreloadProgress::Idle | PreloadProgress::Pending => {}
            PreloadProgress::Ready(batch) => {
                if self.active_batch == Some(batch) {
                    self.active_batch = None;
                    self.finish_ready();
                }
            }
            PreloadProgress::Failed { batch, error } => {
                if self.active_batch == Some(batch) {
                    self.active_batch = None;
                    self.phase = SurfacePhase::Failed;
                    log::warn!("surface {}: preload failed: {error}", self.id);
                    if let Some(cb) = self.on_load_error.as_mut() {
                        cb(&error);
                    }
                }
            }
        }
    }

    fn finish_ready(&mut self) {
        self.phase = SurfacePhase::Ready;
        self.redraw_pending = true;
        self.scheduler.start();
        log::debug!("surface {} ready", self.id);
        if let Some(cb) = self.on_ready.as_mut() {
            cb();
        }
    }

    fn dispatch(&mut self, force: bool) -> DrawOutcome {
        let (width, height) = self.view.borrow().pixel_dimensions();
        DrawDispatcher::run(
            DispatchEnv {
                surface: self.id,
                width,
                height,
                context: &mut self.context,
                root: self.binding.get(),
                redraw_pending: &mut self.redraw_pending,
                bus: &self.bus,
                view: &self.view,
                registry: self.shader_registry.as_ref(),
            },
            force,
        )
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        self.unmount();
    }
}
