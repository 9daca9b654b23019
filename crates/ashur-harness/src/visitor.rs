use std::cell::RefCell;
use std::rc::Rc;

use ashur_surface::dispatch::SkipReason;
use ashur_surface::root::DrawError;
use ashur_surface::surface::SurfaceId;
use ashur_surface::visitor::SurfaceVisitor;

/// One recorded visitor notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisitorEvent {
    Mounted(SurfaceId),
    Unmounted(SurfaceId),
    ContextChanged(SurfaceId, bool),
    DrawSkipped(SurfaceId, SkipReason),
    DrawStart(SurfaceId),
    DrawEnd(SurfaceId),
    DrawError(SurfaceId, String),
}

/// Visitor that records every notification it receives, in order.
pub struct RecordingVisitor {
    events: RefCell<Vec<VisitorEvent>>,
}

impl RecordingVisitor {
    pub fn new() -> Rc<Self> {
        Rc::new(Self { events: RefCell::new(Vec::new()) })
    }

    /// Copy of the recorded events.
    pub fn events(&self) -> Vec<VisitorEvent> {
        self.events.borrow().clone()
    }

    /// Drains and returns the recorded events.
    pub fn take(&self) -> Vec<VisitorEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl SurfaceVisitor for RecordingVisitor {
    fn surface_mounted(&self, surface: SurfaceId) {
        self.events.borrow_mut().push(VisitorEvent::Mounted(surface));
    }

    fn surface_unmounted(&self, surface: SurfaceId) {
        self.events.borrow_mut().push(VisitorEvent::Unmounted(surface));
    }

    fn context_changed(&self, surface: SurfaceId, available: bool) {
        self.events
            .borrow_mut()
            .push(VisitorEvent::ContextChanged(surface, available));
    }

    fn draw_skipped(&self, surface: SurfaceId, reason: SkipReason) {
        self.events
            .borrow_mut()
            .push(VisitorEvent::DrawSkipped(surface, reason));
    }

    fn draw_start(&self, surface: SurfaceId) {
        self.events.borrow_mut().push(VisitorEvent::DrawStart(surface));
    }

    fn draw_end(&self, surface: SurfaceId) {
        self.events.borrow_mut().push(VisitorEvent::DrawEnd(surface));
    }

    fn draw_error(&self, surface: SurfaceId, error: &DrawError) {
        self.events
            .borrow_mut()
            .push(VisitorEvent::DrawError(surface, error.message.clone()));
    }
}
