//! Lifecycle and draw observers.
//!
//! Observers receive fire-and-forget notifications about surface lifecycle
//! and draw passes, for instrumentation and tests. The hook set is fixed and
//! enumerated; every hook has a no-op default so observers implement only
//! what they care about.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dispatch::SkipReason;
use crate::root::DrawError;
use crate::surface::SurfaceId;

/// Observer of one or more surfaces.
///
/// All hooks run synchronously on the surface's logical thread. Failures
/// inside an observer are the observer's responsibility; hooks must not
/// panic.
pub trait SurfaceVisitor {
    fn surface_mounted(&self, surface: SurfaceId) {
        let _ = surface;
    }

    fn surface_unmounted(&self, surface: SurfaceId) {
        let _ = surface;
    }

    /// The surface's GPU context appeared (`available = true`) or went away.
    fn context_changed(&self, surface: SurfaceId, available: bool) {
        let _ = (surface, available);
    }

    fn draw_skipped(&self, surface: SurfaceId, reason: SkipReason) {
        let _ = (surface, reason);
    }

    fn draw_start(&self, surface: SurfaceId) {
        let _ = surface;
    }

    fn draw_end(&self, surface: SurfaceId) {
        let _ = surface;
    }

    fn draw_error(&self, surface: SurfaceId, error: &DrawError) {
        let _ = (surface, error);
    }
}

thread_local! {
    static DEFAULT_VISITORS: RefCell<Vec<Rc<dyn SurfaceVisitor>>> = RefCell::new(Vec::new());
}

/// Registers a visitor that observes every surface on this thread.
pub fn register_default_visitor(visitor: Rc<dyn SurfaceVisitor>) {
    DEFAULT_VISITORS.with(|v| v.borrow_mut().push(visitor));
}

/// Removes all thread-wide default visitors.
pub fn clear_default_visitors() {
    DEFAULT_VISITORS.with(|v| v.borrow_mut().clear());
}

/// Fan-out point for one surface's notifications.
///
/// Delivery order is: thread-wide default visitors in registration order,
/// then the per-surface visitor.
pub struct VisitorBus {
    instance: Option<Rc<dyn SurfaceVisitor>>,
}

impl VisitorBus {
    pub fn new(instance: Option<Rc<dyn SurfaceVisitor>>) -> Self {
        Self { instance }
    }

    fn for_each(&self, f: impl Fn(&dyn SurfaceVisitor)) {
        // Snapshot so a hook that registers a visitor does not invalidate
        // the iteration.
        let defaults: Vec<Rc<dyn SurfaceVisitor>> =
            DEFAULT_VISITORS.with(|v| v.borrow().clone());
        for visitor in &defaults {
            f(visitor.as_ref());
        }
        if let Some(visitor) = &self.instance {
            f(visitor.as_ref());
        }
    }

    pub fn surface_mounted(&self, surface: SurfaceId) {
        self.for_each(|v| v.surface_mounted(surface));
    }

    pub fn surface_unmounted(&self, surface: SurfaceId) {
        self.for_each(|v| v.surface_unmounted(surface));
    }

    pub fn context_changed(&self, surface: SurfaceId, available: bool) {
        self.for_each(|v| v.context_changed(surface, available));
    }

    pub fn draw_skipped(&self, surface: SurfaceId, reason: SkipReason) {
        self.for_each(|v| v.draw_skipped(surface, reason));
    }

    pub fn draw_start(&self, surface: SurfaceId) {
        self.for_each(|v| v.draw_start(surface));
    }

    pub fn draw_end(&self, surface: SurfaceId) {
        self.for_each(|v| v.draw_end(surface));
    }

    pub fn draw_error(&self, surface: SurfaceId, error: &DrawError) {
        self.for_each(|v| v.draw_error(surface, error));
    }
}
