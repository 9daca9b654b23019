//! Root drawable boundary and binding.
//!
//! The scene-graph node that performs the actual draw calls lives outside
//! this crate. The surface holds at most one of them in its attachment slot
//! and delegates draw and capture operations to it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::capture::{CaptureRect, PixelBuffer};
use crate::dispatch::DrawPass;
use crate::error::PreconditionError;
use crate::surface::SurfaceId;

/// Failure raised by a root drawable during a draw or capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawError {
    pub message: String,
}

impl DrawError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draw failed: {}", self.message)
    }
}

impl std::error::Error for DrawError {}

/// The single externally-owned node a surface delegates to.
///
/// The surface owns only the attachment slot; the drawable's lifetime
/// belongs to the host. `bound`/`unbound` replace the back-pointer a
/// drawable would otherwise hold to its surface.
pub trait RootDrawable {
    /// Performs one draw pass. The output target and viewport are already
    /// bound when this runs.
    fn draw(&mut self, pass: &mut DrawPass<'_>) -> Result<(), DrawError>;

    /// The owning surface's context went away; GPU resources held by the
    /// drawable are already invalid.
    fn context_lost(&mut self) {}

    /// A fresh context epoch is live; resources must be re-created lazily.
    fn context_restored(&mut self) {}

    /// Reads back pixels, optionally restricted to `rect`.
    fn capture(&mut self, rect: Option<CaptureRect>) -> Result<PixelBuffer, DrawError>;

    fn bound(&mut self, surface: SurfaceId) {
        let _ = surface;
    }

    fn unbound(&mut self) {}
}

/// The surface's single root attachment slot.
pub struct RootBinding {
    slot: Option<Rc<RefCell<dyn RootDrawable>>>,
}

impl RootBinding {
    pub fn new() -> Self {
        Self { slot: None }
    }

    /// Attaches `drawable` and delivers its `bound` notification.
    ///
    /// Attaching while a root is already attached is a caller bug.
    pub fn attach(
        &mut self,
        surface: SurfaceId,
        drawable: Rc<RefCell<dyn RootDrawable>>,
    ) -> Result<(), PreconditionError> {
        if self.slot.is_some() {
            return Err(PreconditionError::new(
                "a root drawable is already attached to this surface",
            ));
        }
        drawable.borrow_mut().bound(surface);
        self.slot = Some(drawable);
        Ok(())
    }

    /// Clears the slot; returns whether anything was attached.
    pub fn detach(&mut self) -> bool {
        match self.slot.take() {
            Some(drawable) => {
                drawable.borrow_mut().unbound();
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.slot.is_some()
    }

    /// Shared handle to the attached root, if any.
    pub fn get(&self) -> Option<Rc<RefCell<dyn RootDrawable>>> {
        self.slot.clone()
    }
}

impl Default for RootBinding {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        bound_to: Option<SurfaceId>,
        unbound: bool,
    }

    impl RootDrawable for Probe {
        fn draw(&mut self, _pass: &mut DrawPass<'_>) -> Result<(), DrawError> {
            Ok(())
        }

        fn capture(&mut self, _rect: Option<CaptureRect>) -> Result<PixelBuffer, DrawError> {
            Ok(PixelBuffer::blank(1, 1))
        }

        fn bound(&mut self, surface: SurfaceId) {
            self.bound_to = Some(surface);
        }

        fn unbound(&mut self) {
            self.unbound = true;
        }
    }

    #[test]
    fn attach_records_drawable_and_notifies_it() {
        let mut binding = RootBinding::new();
        let root = Rc::new(RefCell::new(Probe::default()));
        let id = SurfaceId::next();

        binding.attach(id, root.clone()).unwrap();
        assert!(binding.is_attached());
        assert_eq!(root.borrow().bound_to, Some(id));
    }

    #[test]
    fn second_attach_is_a_precondition_violation() {
        let mut binding = RootBinding::new();
        let id = SurfaceId::next();
        binding
            .attach(id, Rc::new(RefCell::new(Probe::default())))
            .unwrap();

        let err = binding
            .attach(id, Rc::new(RefCell::new(Probe::default())))
            .unwrap_err();
        assert!(err.message.contains("already attached"));
    }

    #[test]
    fn detach_then_attach_succeeds() {
        let mut binding = RootBinding::new();
        let id = SurfaceId::next();
        let first = Rc::new(RefCell::new(Probe::default()));

        binding.attach(id, first.clone()).unwrap();
        assert!(binding.detach());
        assert!(first.borrow().unbound);
        assert!(!binding.detach());

        binding
            .attach(id, Rc::new(RefCell::new(Probe::default())))
            .unwrap();
        assert!(binding.is_attached());
    }
}
