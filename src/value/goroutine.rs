use super::Value;
use std::cell::RefCell;

/// Terminal state of a spawned goroutine, observable by the host once the
/// scheduler has run it to completion.
#[derive(Debug, Clone)]
pub enum GoroutineOutcome {
    Returned(Value),
    /// An uncaught exception unwound out of the goroutine body. `go()` does
    /// not propagate this to the spawning frame; it is recorded for
    /// diagnostics only, matching the spec's "goroutines do not return
    /// values or propagate exceptions to the spawner" rule.
    Threw(Value),
}

#[derive(Debug)]
pub struct GoroutineHandle {
    pub id: u64,
    pub outcome: RefCell<Option<GoroutineOutcome>>,
}

impl GoroutineHandle {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            outcome: RefCell::new(None),
        }
    }

    pub fn is_done(&self) -> bool {
        self.outcome.borrow().is_some()
    }
}

/// `sync.WaitGroup`-style counter. The scheduler is run-to-completion
/// (see `crate::concurrency`), so `Wait` only ever blocks until the
/// counter is drained back to zero by already-queued goroutines' `Done`
/// calls; it never needs real suspension.
#[derive(Debug, Default)]
pub struct WaitGroupState {
    pub counter: i64,
}
