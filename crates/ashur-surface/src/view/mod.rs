//! Platform view boundary.
//!
//! The platform view is the object that actually owns a canvas/native view
//! and produces GPU contexts for it. It lives outside this crate; the
//! surface talks to it through [`PlatformView`] and receives context events
//! through the `Surface::context_*` callbacks.

/// Host-side view that backs a [`Surface`](crate::Surface).
///
/// The view is required to report its drawable size and is expected to call
/// `Surface::context_created` / `context_creation_failed` / `context_lost` /
/// `context_restored` as its underlying context comes and goes. The draw
/// hooks are optional instrumentation points around each frame.
pub trait PlatformView {
    /// Current drawable size in physical pixels.
    fn pixel_dimensions(&self) -> (u32, u32);

    /// Invoked immediately before the root drawable is delegated to.
    fn before_draw(&mut self) {}

    /// Invoked after a successful draw pass. Skipped when the pass fails.
    fn after_draw(&mut self) {}

    /// Invoked by `Surface::force_reboot` after the old epoch is torn down.
    ///
    /// A real view should rebuild its context and answer with
    /// `Surface::context_created` once the new one is live. `generation` is
    /// the surface's reboot counter, monotonically increasing.
    fn reboot_requested(&mut self, generation: u64) {
        let _ = generation;
    }
}
