use std::cell::RefCell;
use std::rc::Rc;

use ashur_surface::capture::{CaptureRect, PixelBuffer};
use ashur_surface::dispatch::DrawPass;
use ashur_surface::root::{DrawError, RootDrawable};
use ashur_surface::surface::SurfaceId;

/// Root drawable double with scripted behavior.
///
/// Tests mutate the public fields between ticks and read them back after.
pub struct TestRoot {
    /// Surface size used for full captures.
    pub size: (u32, u32),
    /// RGBA color captures are filled with.
    pub fill: [u8; 4],

    /// Shader name requested through the pass on every draw, when set.
    pub shader_to_request: Option<String>,
    /// Fails the next draw with this message, then clears.
    pub fail_next_draw: Option<String>,
    /// Requests a redraw from inside the next draw, then clears.
    pub redraw_once_during_draw: bool,

    pub draws: u32,
    pub lost_events: u32,
    pub restored_events: u32,
    pub bound_to: Option<SurfaceId>,
    pub unbound_events: u32,
}

impl TestRoot {
    pub fn new(width: u32, height: u32) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            size: (width, height),
            fill: [255, 0, 255, 255],
            shader_to_request: None,
            fail_next_draw: None,
            redraw_once_during_draw: false,
            draws: 0,
            lost_events: 0,
            restored_events: 0,
            bound_to: None,
            unbound_events: 0,
        }))
    }
}

impl RootDrawable for TestRoot {
    fn draw(&mut self, pass: &mut DrawPass<'_>) -> Result<(), DrawError> {
        self.draws += 1;

        if let Some(name) = self.shader_to_request.clone() {
            pass.shader(&name)
                .map_err(|err| DrawError::new(err.to_string()))?;
        }

        if std::mem::take(&mut self.redraw_once_during_draw) {
            pass.request_redraw();
        }

        if let Some(message) = self.fail_next_draw.take() {
            return Err(DrawError::new(message));
        }

        Ok(())
    }

    fn context_lost(&mut self) {
        self.lost_events += 1;
    }

    fn context_restored(&mut self) {
        self.restored_events += 1;
    }

    fn capture(&mut self, rect: Option<CaptureRect>) -> Result<PixelBuffer, DrawError> {
        let (width, height) = match rect {
            Some(r) => (r.width, r.height),
            None => self.size,
        };
        let rgba: Vec<u8> = self
            .fill
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        PixelBuffer::from_rgba(width, height, rgba)
            .ok_or_else(|| DrawError::new("capture buffer size mismatch"))
    }

    fn bound(&mut self, surface: SurfaceId) {
        self.bound_to = Some(surface);
    }

    fn unbound(&mut self) {
        self.unbound_events += 1;
    }
}
