use std::collections::HashMap;

use ashur_surface::gpu::{ShaderRegistry, ShaderSource};

/// In-memory shader registry.
pub struct MapShaderRegistry {
    sources: HashMap<String, ShaderSource>,
}

impl MapShaderRegistry {
    pub fn new() -> Self {
        Self { sources: HashMap::new() }
    }

    /// Registry pre-populated with trivial sources under `names`.
    pub fn with_names(names: &[&str]) -> Self {
        let mut registry = Self::new();
        for name in names {
            registry.insert(
                *name,
                ShaderSource {
                    vertex: format!("// {name} vs"),
                    fragment: format!("// {name} fs"),
                },
            );
        }
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, source: ShaderSource) {
        self.sources.insert(name.into(), source);
    }
}

impl Default for MapShaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderRegistry for MapShaderRegistry {
    fn resolve(&self, name: &str) -> Option<ShaderSource> {
        self.sources.get(name).cloned()
    }
}
