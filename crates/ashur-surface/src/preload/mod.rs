//! Resource preloading.
//!
//! Before a surface reaches its ready state, the host may ask for a list of
//! resources to be loaded. Loader strategies are external; this module only
//! aggregates: it resolves each request to a strategy, starts the loads that
//! are actually needed, and reports one combined outcome per batch.
//!
//! Batches are identified by a monotonically increasing [`BatchId`]. A batch
//! that is replaced or torn down is retired: its in-flight handles remain
//! disposable but are never polled again, so a late completion from a
//! superseded epoch cannot mutate current state.

use std::fmt;
use std::rc::Rc;

/// One raw preload request, as handed over by the host.
///
/// The payload is an opaque locator; only loader strategies assign meaning
/// to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadRequest(String);

impl PreloadRequest {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Failure of a single resource load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    /// Locator of the request that failed.
    pub request: String,
    pub message: String,
}

impl LoadError {
    pub fn new(request: impl Into<String>, message: impl Into<String>) -> Self {
        Self { request: request.into(), message: message.into() }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "load of '{}' failed: {}", self.request, self.message)
    }
}

impl std::error::Error for LoadError {}

/// Poll result of one in-flight load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPoll {
    Pending,
    Done,
    Failed(LoadError),
}

/// A started, cancelable load operation.
pub trait InFlightLoad {
    /// Non-blocking progress check.
    fn poll(&mut self) -> LoadPoll;

    /// Cancels the load and releases whatever backs it. Idempotent; called
    /// at context teardown for every handle ever started in the epoch.
    fn dispose(&mut self);
}

/// External loading strategy.
///
/// Strategies are consulted in registration order; the first one whose
/// `can_load` accepts a request owns it.
pub trait LoaderStrategy {
    fn can_load(&self, request: &PreloadRequest) -> bool;

    /// True when the resource is already resident and needs no load.
    fn already_loaded(&self, request: &PreloadRequest) -> bool;

    fn begin_load(&self, request: &PreloadRequest) -> Box<dyn InFlightLoad>;
}

/// Identity of one preload batch.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BatchId(u64);

/// Synchronous outcome of [`ResourcePreloader::begin`].
#[derive(Debug)]
pub enum PreloadStart {
    /// Nothing had to be started; the caller may proceed on this call stack.
    ReadyNow,
    /// `started` loads are in flight under `batch`.
    Pending { batch: BatchId, started: usize },
}

/// Progress reported by [`ResourcePreloader::poll`].
///
/// `Ready` and `Failed` are each reported at most once per batch; subsequent
/// polls return `Idle`.
#[derive(Debug)]
pub enum PreloadProgress {
    Idle,
    Pending,
    Ready(BatchId),
    Failed { batch: BatchId, error: LoadError },
}

struct Batch {
    id: BatchId,
    loads: Vec<Box<dyn InFlightLoad>>,
    done: Vec<bool>,
}

/// Aggregates one batch of in-flight loads into a single outcome.
///
/// One preloader exists per context epoch; the context manager disposes it
/// wholesale at teardown.
pub struct ResourcePreloader {
    next_batch: u64,
    batch: Option<Batch>,
    retired: Vec<Box<dyn InFlightLoad>>,
}

impl ResourcePreloader {
    pub fn new() -> Self {
        Self { next_batch: 0, batch: None, retired: Vec::new() }
    }

    /// Resolves `requests` against `strategies` and starts the loads that
    /// are needed.
    ///
    /// Requests no strategy accepts are skipped with a diagnostic; requests
    /// whose strategy reports them already loaded are skipped silently. When
    /// nothing has to be started this returns [`PreloadStart::ReadyNow`]
    /// without any asynchronous hop — callers rely on reaching their ready
    /// state on this call stack.
    ///
    /// Calling `begin` while a batch is unsettled retires that batch: its
    /// handles stay around for disposal but its completion is ignored.
    pub fn begin(
        &mut self,
        requests: &[PreloadRequest],
        strategies: &[Rc<dyn LoaderStrategy>],
    ) -> PreloadStart {
        if let Some(old) = self.batch.take() {
            log::debug!("preload batch {:?} superseded before settling", old.id);
            self.retired.extend(old.loads);
        }

        let mut loads: Vec<Box<dyn InFlightLoad>> = Vec::new();

        for request in requests {
            let Some(strategy) = strategies.iter().find(|s| s.can_load(request)) else {
                log::warn!("no loader accepts preload request '{}'", request.as_str());
                continue;
            };
            if strategy.already_loaded(request) {
                continue;
            }
            loads.push(strategy.begin_load(request));
        }

        if loads.is_empty() {
            return PreloadStart::ReadyNow;
        }

        self.next_batch += 1;
        let id = BatchId(self.next_batch);
        let started = loads.len();
        let done = vec![false; started];
        self.batch = Some(Batch { id, loads, done });

        PreloadStart::Pending { batch: id, started }
    }

    /// Polls the current batch.
    ///
    /// The first failing load settles the batch: its error is reported once
    /// and the remaining loads are abandoned (retired, still disposable).
    pub fn poll(&mut self) -> PreloadProgress {
        let settled = {
            let Some(batch) = self.batch.as_mut() else {
                return PreloadProgress::Idle;
            };

            let mut failure = None;
            for (i, load) in batch.loads.iter_mut().enumerate() {
                if batch.done[i] {
                    continue;
                }
                match load.poll() {
                    LoadPoll::Pending => {}
                    LoadPoll::Done => batch.done[i] = true,
                    LoadPoll::Failed(error) => {
                        failure = Some(error);
                        break;
                    }
                }
            }

            match failure {
                Some(error) => Some(Err(error)),
                None if batch.done.iter().all(|d| *d) => Some(Ok(())),
                None => None,
            }
        };

        let Some(outcome) = settled else {
            return PreloadProgress::Pending;
        };

        let Some(batch) = self.batch.take() else {
            return PreloadProgress::Idle;
        };
        let id = batch.id;
        self.retired.extend(batch.loads);

        match outcome {
            Ok(()) => PreloadProgress::Ready(id),
            Err(error) => PreloadProgress::Failed { batch: id, error },
        }
    }

    /// Number of loads still tracked by the current batch.
    pub fn pending_count(&self) -> usize {
        self.batch
            .as_ref()
            .map(|b| b.done.iter().filter(|d| !**d).count())
            .unwrap_or(0)
    }

    /// Disposes every handle ever started in this epoch, current and retired.
    pub fn dispose_all(&mut self) {
        if let Some(batch) = self.batch.take() {
            self.retired.extend(batch.loads);
        }
        for load in &mut self.retired {
            load.dispose();
        }
        self.retired.clear();
    }
}

impl Default for ResourcePreloader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Default)]
    struct LoadState {
        poll: Option<LoadPoll>, // None = pending
        polls: u32,
        disposed: bool,
    }

    struct TestLoad(Rc<RefCell<LoadState>>);

    impl InFlightLoad for TestLoad {
        fn poll(&mut self) -> LoadPoll {
            let mut s = self.0.borrow_mut();
            s.polls += 1;
            s.poll.clone().unwrap_or(LoadPoll::Pending)
        }

        fn dispose(&mut self) {
            self.0.borrow_mut().disposed = true;
        }
    }

    struct TestLoader {
        prefix: &'static str,
        loaded: Vec<&'static str>,
        states: RefCell<Vec<(String, Rc<RefCell<LoadState>>)>>,
    }

    impl TestLoader {
        fn new(prefix: &'static str) -> Self {
            Self { prefix, loaded: Vec::new(), states: RefCell::new(Vec::new()) }
        }

        fn state(&self, locator: &str) -> Rc<RefCell<LoadState>> {
            self.states
                .borrow()
                .iter()
                .find(|(l, _)| l == locator)
                .map(|(_, s)| s.clone())
                .expect("load was never started")
        }
    }

    impl LoaderStrategy for TestLoader {
        fn can_load(&self, request: &PreloadRequest) -> bool {
            request.as_str().starts_with(self.prefix)
        }

        fn already_loaded(&self, request: &PreloadRequest) -> bool {
            self.loaded.contains(&request.as_str())
        }

        fn begin_load(&self, request: &PreloadRequest) -> Box<dyn InFlightLoad> {
            let state = Rc::new(RefCell::new(LoadState::default()));
            self.states
                .borrow_mut()
                .push((request.as_str().to_string(), state.clone()));
            Box::new(TestLoad(state))
        }
    }

    fn req(s: &str) -> PreloadRequest {
        PreloadRequest::new(s)
    }

    // ── begin ─────────────────────────────────────────────────────────────

    #[test]
    fn empty_request_list_is_ready_now() {
        let mut pre = ResourcePreloader::new();
        assert!(matches!(pre.begin(&[], &[]), PreloadStart::ReadyNow));
    }

    #[test]
    fn all_already_loaded_is_ready_now() {
        let mut loader = TestLoader::new("tex:");
        loader.loaded = vec!["tex:a", "tex:b"];
        let strategies: Vec<Rc<dyn LoaderStrategy>> = vec![Rc::new(loader)];

        let mut pre = ResourcePreloader::new();
        let start = pre.begin(&[req("tex:a"), req("tex:b")], &strategies);
        assert!(matches!(start, PreloadStart::ReadyNow));
        assert_eq!(pre.pending_count(), 0);
    }

    #[test]
    fn unresolved_requests_are_skipped_not_fatal() {
        let strategies: Vec<Rc<dyn LoaderStrategy>> = vec![Rc::new(TestLoader::new("tex:"))];

        let mut pre = ResourcePreloader::new();
        let start = pre.begin(&[req("audio:boom"), req("tex:a")], &strategies);
        match start {
            PreloadStart::Pending { started, .. } => assert_eq!(started, 1),
            other => panic!("expected pending batch, got {other:?}"),
        }
    }

    #[test]
    fn first_matching_strategy_wins() {
        let a = Rc::new(TestLoader::new("tex:"));
        let b = Rc::new(TestLoader::new("tex:"));
        let strategies: Vec<Rc<dyn LoaderStrategy>> = vec![a.clone(), b.clone()];

        let mut pre = ResourcePreloader::new();
        pre.begin(&[req("tex:a")], &strategies);
        assert_eq!(a.states.borrow().len(), 1);
        assert_eq!(b.states.borrow().len(), 0);
    }

    // ── poll ──────────────────────────────────────────────────────────────

    #[test]
    fn ready_when_all_loads_resolve() {
        let loader = Rc::new(TestLoader::new(""));
        let strategies: Vec<Rc<dyn LoaderStrategy>> = vec![loader.clone()];

        let mut pre = ResourcePreloader::new();
        let start = pre.begin(&[req("a"), req("b")], &strategies);
        let batch = match start {
            PreloadStart::Pending { batch, .. } => batch,
            other => panic!("expected pending, got {other:?}"),
        };

        assert!(matches!(pre.poll(), PreloadProgress::Pending));

        loader.state("a").borrow_mut().poll = Some(LoadPoll::Done);
        assert!(matches!(pre.poll(), PreloadProgress::Pending));

        loader.state("b").borrow_mut().poll = Some(LoadPoll::Done);
        match pre.poll() {
            PreloadProgress::Ready(id) => assert_eq!(id, batch),
            other => panic!("expected ready, got {other:?}"),
        }

        // Settled batches report nothing further.
        assert!(matches!(pre.poll(), PreloadProgress::Idle));
    }

    #[test]
    fn first_failure_settles_the_batch_once() {
        let loader = Rc::new(TestLoader::new(""));
        let strategies: Vec<Rc<dyn LoaderStrategy>> = vec![loader.clone()];

        let mut pre = ResourcePreloader::new();
        pre.begin(&[req("a"), req("b")], &strategies);

        loader.state("a").borrow_mut().poll =
            Some(LoadPoll::Failed(LoadError::new("a", "404")));

        match pre.poll() {
            PreloadProgress::Failed { error, .. } => assert_eq!(error.request, "a"),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(matches!(pre.poll(), PreloadProgress::Idle));

        // The abandoned load never resolves; it must still be disposable.
        loader.state("b").borrow_mut().poll = Some(LoadPoll::Done);
        pre.dispose_all();
        assert!(loader.state("b").borrow().disposed);
    }

    // ── replacement / disposal ────────────────────────────────────────────

    #[test]
    fn replaced_batch_is_never_polled_again() {
        let loader = Rc::new(TestLoader::new(""));
        let strategies: Vec<Rc<dyn LoaderStrategy>> = vec![loader.clone()];

        let mut pre = ResourcePreloader::new();
        pre.begin(&[req("a")], &strategies);
        let polls_before = loader.state("a").borrow().polls;

        pre.begin(&[req("b")], &strategies);
        loader.state("a").borrow_mut().poll = Some(LoadPoll::Done);

        assert!(matches!(pre.poll(), PreloadProgress::Pending));
        assert_eq!(loader.state("a").borrow().polls, polls_before);
    }

    #[test]
    fn dispose_all_reaches_current_and_retired_loads() {
        let loader = Rc::new(TestLoader::new(""));
        let strategies: Vec<Rc<dyn LoaderStrategy>> = vec![loader.clone()];

        let mut pre = ResourcePreloader::new();
        pre.begin(&[req("a")], &strategies);
        pre.begin(&[req("b")], &strategies);
        pre.dispose_all();

        assert!(loader.state("a").borrow().disposed);
        assert!(loader.state("b").borrow().disposed);
        assert_eq!(pre.pending_count(), 0);
    }
}
