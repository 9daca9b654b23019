use std::cell::RefCell;
use std::rc::Rc;

use ashur_surface::gpu::{
    BufferId, ContextError, GpuContext, ProgramId, ShaderSource, TextureId,
};

#[derive(Default)]
struct State {
    next_id: u64,
    live_programs: Vec<u64>,
    live_buffers: Vec<u64>,
    live_textures: Vec<u64>,
    compiled: Vec<String>,
    outputs: Vec<(u32, u32)>,
    fail_compile: Option<String>,
}

/// Shared window into a [`FakeGpu`]'s recorded activity.
///
/// The probe stays valid after the fake is boxed and moved into a surface,
/// including after the epoch that owned it is torn down.
#[derive(Clone)]
pub struct GpuProbe(Rc<RefCell<State>>);

impl GpuProbe {
    pub fn live_programs(&self) -> usize {
        self.0.borrow().live_programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.0.borrow().live_buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.0.borrow().live_textures.len()
    }

    /// Names passed to `compile_program`, in order.
    pub fn compiled(&self) -> Vec<String> {
        self.0.borrow().compiled.clone()
    }

    /// Dimensions passed to `bind_output`, in order.
    pub fn outputs(&self) -> Vec<(u32, u32)> {
        self.0.borrow().outputs.clone()
    }

    /// Makes the next `compile_program` call fail with `message`.
    pub fn fail_next_compile(&self, message: impl Into<String>) {
        self.0.borrow_mut().fail_compile = Some(message.into());
    }
}

/// [`GpuContext`] double that records operations instead of touching a GPU.
pub struct FakeGpu(Rc<RefCell<State>>);

impl FakeGpu {
    pub fn new() -> (Self, GpuProbe) {
        let state = Rc::new(RefCell::new(State { next_id: 1, ..State::default() }));
        (Self(state.clone()), GpuProbe(state))
    }

    fn alloc(&self) -> u64 {
        let mut state = self.0.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        id
    }
}

impl GpuContext for FakeGpu {
    fn compile_program(
        &mut self,
        name: &str,
        _source: &ShaderSource,
    ) -> Result<ProgramId, ContextError> {
        if let Some(message) = self.0.borrow_mut().fail_compile.take() {
            return Err(ContextError::Compile { name: name.to_string(), message });
        }
        let id = self.alloc();
        let mut state = self.0.borrow_mut();
        state.live_programs.push(id);
        state.compiled.push(name.to_string());
        Ok(ProgramId(id))
    }

    fn release_program(&mut self, program: ProgramId) {
        self.0.borrow_mut().live_programs.retain(|id| *id != program.0);
    }

    fn create_surface_triangle(&mut self) -> Result<BufferId, ContextError> {
        let id = self.alloc();
        self.0.borrow_mut().live_buffers.push(id);
        Ok(BufferId(id))
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        self.0.borrow_mut().live_buffers.retain(|id| *id != buffer.0);
    }

    fn create_blank_texture(&mut self) -> Result<TextureId, ContextError> {
        let id = self.alloc();
        self.0.borrow_mut().live_textures.push(id);
        Ok(TextureId(id))
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.0.borrow_mut().live_textures.retain(|id| *id != texture.0);
    }

    fn bind_output(&mut self, width: u32, height: u32) {
        self.0.borrow_mut().outputs.push((width, height));
    }
}
