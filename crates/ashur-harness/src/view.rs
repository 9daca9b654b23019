use std::cell::RefCell;
use std::rc::Rc;

use ashur_surface::view::PlatformView;

/// Platform view double with fixed dimensions and hook counters.
pub struct StubView {
    pub width: u32,
    pub height: u32,
    pub before_draws: u32,
    pub after_draws: u32,
    /// Generations passed to `reboot_requested`, in order.
    pub reboots: Vec<u64>,
}

impl StubView {
    pub fn new(width: u32, height: u32) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            width,
            height,
            before_draws: 0,
            after_draws: 0,
            reboots: Vec::new(),
        }))
    }
}

impl PlatformView for StubView {
    fn pixel_dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn before_draw(&mut self) {
        self.before_draws += 1;
    }

    fn after_draw(&mut self) {
        self.after_draws += 1;
    }

    fn reboot_requested(&mut self, generation: u64) {
        self.reboots.push(generation);
    }
}
