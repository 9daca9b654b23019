use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use ashur_surface::preload::{
    InFlightLoad, LoadError, LoadPoll, LoaderStrategy, PreloadRequest,
};

#[derive(Default)]
struct ControlState {
    locator: String,
    outcome: Option<LoadPoll>,
    polls: u32,
    started: bool,
    disposed: bool,
}

/// Remote control for one scripted load.
///
/// Loads start pending; the test resolves or fails them, then ticks the
/// surface so the preloader observes the change.
#[derive(Clone)]
pub struct LoadControl(Rc<RefCell<ControlState>>);

impl LoadControl {
    /// Marks the load as successfully completed.
    pub fn resolve(&self) {
        self.0.borrow_mut().outcome = Some(LoadPoll::Done);
    }

    /// Marks the load as failed with `message`.
    pub fn fail(&self, message: impl Into<String>) {
        let mut state = self.0.borrow_mut();
        let locator = state.locator.clone();
        state.outcome = Some(LoadPoll::Failed(LoadError::new(locator, message)));
    }

    pub fn polls(&self) -> u32 {
        self.0.borrow().polls
    }

    pub fn was_started(&self) -> bool {
        self.0.borrow().started
    }

    pub fn is_disposed(&self) -> bool {
        self.0.borrow().disposed
    }
}

struct ScriptedLoad(Rc<RefCell<ControlState>>);

impl InFlightLoad for ScriptedLoad {
    fn poll(&mut self) -> LoadPoll {
        let mut state = self.0.borrow_mut();
        state.polls += 1;
        state.outcome.clone().unwrap_or(LoadPoll::Pending)
    }

    fn dispose(&mut self) {
        self.0.borrow_mut().disposed = true;
    }
}

/// Loader strategy whose loads are driven by [`LoadControl`]s.
///
/// Accepts requests whose locator starts with the configured prefix.
pub struct ScriptedLoader {
    prefix: String,
    already: RefCell<HashSet<String>>,
    controls: RefCell<HashMap<String, LoadControl>>,
}

impl ScriptedLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            already: RefCell::new(HashSet::new()),
            controls: RefCell::new(HashMap::new()),
        }
    }

    /// Makes `locator` report as already loaded (its load is skipped).
    pub fn mark_loaded(&self, locator: impl Into<String>) {
        self.already.borrow_mut().insert(locator.into());
    }

    /// Control handle for `locator`, created on first use.
    pub fn control(&self, locator: &str) -> LoadControl {
        self.controls
            .borrow_mut()
            .entry(locator.to_string())
            .or_insert_with(|| {
                LoadControl(Rc::new(RefCell::new(ControlState {
                    locator: locator.to_string(),
                    ..ControlState::default()
                })))
            })
            .clone()
    }
}

impl LoaderStrategy for ScriptedLoader {
    fn can_load(&self, request: &PreloadRequest) -> bool {
        request.as_str().starts_with(&self.prefix)
    }

    fn already_loaded(&self, request: &PreloadRequest) -> bool {
        self.already.borrow().contains(request.as_str())
    }

    fn begin_load(&self, request: &PreloadRequest) -> Box<dyn InFlightLoad> {
        let control = self.control(request.as_str());
        control.0.borrow_mut().started = true;
        Box::new(ScriptedLoad(control.0.clone()))
    }
}
