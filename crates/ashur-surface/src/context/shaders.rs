use std::collections::HashMap;
use std::fmt;

use crate::gpu::{ContextError, GpuContext, ProgramId, ShaderRegistry};

/// Failure of a shader cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// The registry has no source for this name.
    Unknown(String),
    Context(ContextError),
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(name) => write!(f, "shader '{name}' is not in the registry"),
            Self::Context(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ShaderError {}

impl From<ContextError> for ShaderError {
    fn from(err: ContextError) -> Self {
        Self::Context(err)
    }
}

/// Lazily compiled, memoized shader programs.
///
/// Entries are created on first lookup and never evicted individually; the
/// whole cache is released when the owning context epoch is torn down.
pub struct ShaderCache {
    programs: HashMap<String, ProgramId>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self { programs: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Returns the cached program for `name`, compiling it on first use.
    pub fn get_or_create(
        &mut self,
        gpu: &mut dyn GpuContext,
        registry: &dyn ShaderRegistry,
        name: &str,
    ) -> Result<ProgramId, ShaderError> {
        if let Some(program) = self.programs.get(name) {
            return Ok(*program);
        }

        let source = registry
            .resolve(name)
            .ok_or_else(|| ShaderError::Unknown(name.to_string()))?;
        let program = gpu.compile_program(name, &source)?;

        self.programs.insert(name.to_string(), program);
        log::debug!("compiled shader program '{name}'");
        Ok(program)
    }

    /// Releases every cached program on `gpu` and empties the cache.
    pub fn release_all(&mut self, gpu: &mut dyn GpuContext) {
        for (_, program) in self.programs.drain() {
            gpu.release_program(program);
        }
    }
}

impl Default for ShaderCache {
    fn default() -> Self {
        Self::new()
    }
}
