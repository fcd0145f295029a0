//! Goroutines and wait groups.
//!
//! There is no OS thread or real interleaving underneath `go()`: the
//! scheduler is run-to-completion. `go($closure, ...$args)` queues a task
//! and returns immediately; the task body only actually runs the next time
//! the program hits a cooperative drain point — `WaitGroup::Wait()` or
//! normal program exit. Running every queued goroutine to completion in
//! spawn order before `Wait` can return is one legal interleaving under the
//! spec's "no ordering guaranteed between goroutines" rule, and it trivially
//! satisfies "`Wait` returning implies every pending `Done` already ran".
//! True preemptive interleaving would need the same suspend/resume
//! machinery as generators, applied at arbitrary statement boundaries
//! rather than just at `yield`; that is out of scope here.

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{GoroutineHandle, GoroutineOutcome, Value, WaitGroupState};
use crate::vm::context::GoroutineTask;
use crate::vm::VM;
use std::cell::RefCell;
use std::rc::Rc;

pub fn spawn(vm: &mut VM, closure: Rc<crate::value::ClosureValue>, args: Vec<Value>) -> Rc<GoroutineHandle> {
    let id = vm.ctx.alloc_goroutine_id();
    let handle = Rc::new(GoroutineHandle::new(id));
    vm.ctx.pending_goroutines.push(GoroutineTask {
        closure,
        args,
        handle: Rc::clone(&handle),
    });
    handle
}

/// Run every currently-queued goroutine to completion, in FIFO spawn order.
/// Goroutines that spawn further goroutines while running have those new
/// tasks drained too, before this call returns.
pub fn drain_all(vm: &mut VM) -> RuntimeResult<()> {
    while !vm.ctx.pending_goroutines.is_empty() {
        let task = vm.ctx.pending_goroutines.remove(0);
        let outcome = match vm.call_closure(&task.closure, task.args) {
            Ok(value) => GoroutineOutcome::Returned(value),
            Err(RuntimeError::Uncaught { class, message }) => {
                GoroutineOutcome::Threw(Value::Str(format!("{class}: {message}")))
            }
            Err(other) => return Err(other),
        };
        *task.handle.outcome.borrow_mut() = Some(outcome);
    }
    Ok(())
}

/// `WaitGroup::Add($n)`. Negative deltas are rejected outright, matching
/// the spec's stricter-than-Go rule (Go permits negative `Add` as the
/// mechanism `Done` is built on; here only `Done` decrements).
pub fn wait_group_add(state: &RefCell<WaitGroupState>, delta: i64) -> RuntimeResult<()> {
    if delta < 0 {
        return Err(RuntimeError::InvalidArgument("WaitGroup::Add argument must not be negative".into()));
    }
    state.borrow_mut().counter += delta;
    Ok(())
}

/// `WaitGroup::Done()`.
pub fn wait_group_done(state: &RefCell<WaitGroupState>) -> RuntimeResult<()> {
    let mut s = state.borrow_mut();
    s.counter -= 1;
    if s.counter < 0 {
        return Err(RuntimeError::InvalidArgument("WaitGroup::Done called more times than Add".into()));
    }
    Ok(())
}

/// `WaitGroup::Wait()`. Drains all pending goroutines (possibly more than
/// once, since a drained goroutine may spawn and `Done` more work) until
/// the counter reaches zero or there is nothing left to run.
pub fn wait_group_wait(vm: &mut VM, state: &RefCell<WaitGroupState>) -> RuntimeResult<()> {
    loop {
        if state.borrow().counter <= 0 {
            return Ok(());
        }
        if vm.ctx.pending_goroutines.is_empty() {
            return Err(RuntimeError::Deadlock);
        }
        drain_all(vm)?;
    }
}
