//! Process-wide surface registry.
//!
//! Every live surface registers itself on mount and deregisters on unmount,
//! so cross-surface tooling can enumerate what exists. The registry is an
//! explicit service handed to the surface at mount time — tests inject their
//! own — and [`global`] provides the shared process-wide instance.

use std::sync::{Mutex, PoisonError};

use crate::surface::SurfaceId;

/// Registry of live surface ids.
///
/// Queries return snapshots, never live views.
pub struct SurfaceRegistry {
    entries: Mutex<Vec<SurfaceId>>,
}

impl SurfaceRegistry {
    pub const fn new() -> Self {
        Self { entries: Mutex::new(Vec::new()) }
    }

    pub fn register(&self, surface: SurfaceId) {
        let mut entries = self.lock();
        if !entries.contains(&surface) {
            entries.push(surface);
        }
    }

    pub fn deregister(&self, surface: SurfaceId) {
        self.lock().retain(|s| *s != surface);
    }

    /// Copy of the current entry list, in registration order.
    pub fn snapshot(&self) -> Vec<SurfaceId> {
        self.lock().clone()
    }

    pub fn contains(&self, surface: SurfaceId) -> bool {
        self.lock().contains(&surface)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SurfaceId>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SurfaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: state::InitCell<SurfaceRegistry> = state::InitCell::new();

/// The process-wide registry used by `Surface::mount`.
pub fn global() -> &'static SurfaceRegistry {
    GLOBAL.get_or_init(SurfaceRegistry::new)
}
