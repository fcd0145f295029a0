//! Non-local control flow: `return`, `break N`/`continue N`, `goto`, and
//! `throw`, all routed through any enclosing `finally` blocks before they
//! take effect. This replaces a string-sentinel threaded through call
//! results with a typed [`PendingAction`]/[`UnwindOutcome`] pair: `throw`,
//! `return`, `break`, and `continue` are first-class values the dispatch
//! loop switches on, not magic strings smuggled through a `Result`.

use super::objects::instance_of;
use crate::error::RuntimeError;
use crate::value::Value;
use crate::vm::frame::PendingAction;
use crate::vm::{Frame, VM};

pub enum UnwindOutcome {
    /// Still executing this frame: jump the instruction pointer here and
    /// keep going. Used for entering a `finally`/`catch` block and for a
    /// resolved `break`/`continue`/`goto` target.
    JumpTo(u32),
    Return(Value),
    /// Exhausted every handler without a match; propagate to the caller.
    Uncaught(Value),
}

/// Resolve a `return`/`break N`/`continue N`/`goto` against the handler and
/// loop-context stacks of a single frame (these never cross a function
/// boundary, so no VM access is needed).
pub fn unwind_local(frame: &mut Frame, action: PendingAction) -> Result<UnwindOutcome, RuntimeError> {
    // `break`/`continue` need their resolved target up front too, not just
    // `goto`: a `break` that only leaves an inner loop nested *inside* the
    // current try body must not pop/run that try's handler at all.
    let target_ip = match &action {
        PendingAction::Goto(addr) => Some(*addr),
        PendingAction::Break(n) => Some(peek_loop_target(frame, *n, true)?),
        PendingAction::Continue(n) => Some(peek_loop_target(frame, *n, false)?),
        _ => None,
    };

    while let Some(handler) = frame.handlers.last().cloned() {
        if let Some(ip) = target_ip {
            if ip >= handler.try_start && ip < handler.try_end {
                break;
            }
        }
        frame.handlers.pop();
        if let Some(finally_entry) = handler.finally_entry {
            frame.stack.truncate(handler.stack_depth);
            frame.pending = Some(action);
            return Ok(UnwindOutcome::JumpTo(finally_entry));
        }
    }

    match action {
        PendingAction::Return(value) => Ok(UnwindOutcome::Return(value)),
        PendingAction::Goto(addr) => Ok(UnwindOutcome::JumpTo(addr)),
        PendingAction::Break(n) => resolve_loop_jump(frame, n, true),
        PendingAction::Continue(n) => resolve_loop_jump(frame, n, false),
        PendingAction::Throw(value) => Ok(UnwindOutcome::Uncaught(value)),
    }
}

fn loop_jump_index(frame: &Frame, levels: u32) -> Result<usize, RuntimeError> {
    let len = frame.loops.len();
    if levels == 0 || levels as usize > len {
        return Err(RuntimeError::Internal(format!("invalid jump depth {levels} (nesting depth {len})")));
    }
    Ok(len - levels as usize)
}

/// Resolve a `break N`/`continue N` target without mutating `frame.loops`,
/// so `unwind_local` can containment-check it against each enclosing
/// handler's try range before committing to actually leaving the loop.
fn peek_loop_target(frame: &Frame, levels: u32, is_break: bool) -> Result<u32, RuntimeError> {
    let idx = loop_jump_index(frame, levels)?;
    Ok(if is_break { frame.loops[idx].break_target } else { frame.loops[idx].continue_target })
}

fn resolve_loop_jump(frame: &mut Frame, levels: u32, is_break: bool) -> Result<UnwindOutcome, RuntimeError> {
    let idx = loop_jump_index(frame, levels)?;
    let target = if is_break {
        frame.loops[idx].break_target
    } else {
        frame.loops[idx].continue_target
    };
    if is_break {
        frame.loops.truncate(idx);
    }
    Ok(UnwindOutcome::JumpTo(target))
}

/// Route a thrown value through the handler stack: the first handler whose
/// catch list matches the value's class wins; otherwise a `finally` (if
/// any) runs before the exception keeps propagating; exhausting every
/// handler makes it escape to the caller.
pub fn unwind_throw(vm: &VM, frame: &mut Frame, value: Value) -> UnwindOutcome {
    while let Some(handler) = frame.handlers.pop() {
        for (types, catch_ip) in &handler.catches {
            if types.iter().any(|t| instance_of(&value, t, vm)) {
                frame.stack.truncate(handler.stack_depth);
                frame.push(value);
                return UnwindOutcome::JumpTo(*catch_ip);
            }
        }
        if let Some(finally_entry) = handler.finally_entry {
            frame.stack.truncate(handler.stack_depth);
            frame.pending = Some(PendingAction::Throw(value));
            return UnwindOutcome::JumpTo(finally_entry);
        }
    }
    UnwindOutcome::Uncaught(value)
}

/// Once a `finally` body finishes (its `EndFinally` opcode runs) without
/// itself returning/throwing/jumping, resume whatever it had suspended.
pub fn resume_pending(frame: &mut Frame) -> Option<PendingAction> {
    frame.pending.take()
}
