//! Generator bodies keep their own suspended `Frame` instead of returning
//! it to the VM's call stack; `advance` resumes that frame's dispatch loop
//! until the next `yield`, a `return`, or an uncaught exception.
//!
//! `yield from` delegates to an array or another generator: while a
//! delegate is active, `advance` pulls items straight from it without
//! touching this generator's own frame at all, matching PHP's "the outer
//! generator doesn't regain control until the inner one is exhausted"
//! behavior. Delegating to an arbitrary `Iterator`/`Traversable` object is
//! not supported; only arrays and other generators can sit on the right
//! of `yield from` here.

use super::dispatch::{self, RunOutcome};
use super::frame::Frame;
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{ArrayKey, PhpArray, Value};
use crate::vm::VM;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, PartialEq, Eq)]
pub enum GeneratorStatus {
    Suspended,
    Running,
    Finished,
}

#[derive(Debug)]
pub struct GeneratorState {
    pub frame: Frame,
    pub status: GeneratorStatus,
    pub current_key: Value,
    pub current_value: Value,
    pub return_value: Value,
    pub auto_key: i64,
    pub started: bool,
    delegate: Option<DelegateState>,
}

impl GeneratorState {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            status: GeneratorStatus::Suspended,
            current_key: Value::Null,
            current_value: Value::Null,
            return_value: Value::Null,
            auto_key: 0,
            started: false,
            delegate: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == GeneratorStatus::Finished
    }
}

#[derive(Debug)]
enum DelegateState {
    Array { array: PhpArray, index: usize },
    Generator(Rc<RefCell<GeneratorState>>),
}

enum DelegateStep {
    Item { key: Value, value: Value, remaining: DelegateState },
    Done(Value),
}

fn key_to_value(key: &ArrayKey) -> Value {
    match key {
        ArrayKey::Integer(n) => Value::Int(*n),
        ArrayKey::String(s) => Value::Str(s.clone()),
    }
}

fn build_delegate(source: Value) -> RuntimeResult<DelegateState> {
    match source.deref_clone() {
        Value::Array(array) => Ok(DelegateState::Array { array, index: 0 }),
        Value::Generator(inner) => Ok(DelegateState::Generator(inner)),
        other => Err(RuntimeError::TypeError(format!("cannot `yield from` a value of type {}", other.type_name()))),
    }
}

fn advance_delegate(vm: &mut VM, delegate: DelegateState, sent: Value) -> RuntimeResult<DelegateStep> {
    match delegate {
        DelegateState::Array { array, index } => match array.nth(index) {
            Some((k, v)) => {
                let key = key_to_value(k);
                let value = v.clone();
                Ok(DelegateStep::Item { key, value, remaining: DelegateState::Array { array, index: index + 1 } })
            }
            None => Ok(DelegateStep::Done(Value::Null)),
        },
        DelegateState::Generator(inner) => {
            advance(&inner, vm, sent)?;
            let (finished, key, value, return_value) = {
                let state = inner.borrow();
                (state.is_finished(), state.current_key.clone(), state.current_value.clone(), state.return_value.clone())
            };
            if finished {
                Ok(DelegateStep::Done(return_value))
            } else {
                Ok(DelegateStep::Item { key, value, remaining: DelegateState::Generator(inner) })
            }
        }
    }
}

/// Run the generator's body until its next suspension point (`yield`,
/// `return`, or an uncaught exception), feeding `sent` in as the value a
/// `yield` expression resolves to on resume (ignored on the very first
/// resume, same as PHP's implicit rewind).
pub fn advance(state: &Rc<RefCell<GeneratorState>>, vm: &mut VM, mut sent: Value) -> RuntimeResult<()> {
    loop {
        if state.borrow().is_finished() {
            return Ok(());
        }

        let pending_delegate = state.borrow_mut().delegate.take();
        if let Some(delegate) = pending_delegate {
            match advance_delegate(vm, delegate, sent.clone())? {
                DelegateStep::Item { key, value, remaining } => {
                    let mut s = state.borrow_mut();
                    s.delegate = Some(remaining);
                    s.current_key = key;
                    s.current_value = value;
                    s.status = GeneratorStatus::Suspended;
                    return Ok(());
                }
                DelegateStep::Done(return_value) => {
                    // `yield from` itself evaluates to the delegate's
                    // return value once resumed past it.
                    sent = return_value;
                }
            }
        }

        let started = state.borrow().started;
        state.borrow_mut().status = GeneratorStatus::Running;
        let frame = {
            let mut s = state.borrow_mut();
            let placeholder = Frame::new(Rc::clone(&s.frame.function));
            std::mem::replace(&mut s.frame, placeholder)
        };
        vm.frames.push(frame);
        if started {
            let idx = vm.frames.len() - 1;
            vm.frames[idx].push(sent.clone());
        }
        state.borrow_mut().started = true;

        let outcome = dispatch::run(vm);
        let frame = vm.frames.pop().expect("generator frame vanished mid-run");
        state.borrow_mut().frame = frame;
        let outcome = outcome?;

        match outcome {
            RunOutcome::Returned(v) => {
                let mut s = state.borrow_mut();
                s.return_value = v;
                s.status = GeneratorStatus::Finished;
                s.current_key = Value::Null;
                s.current_value = Value::Null;
                return Ok(());
            }
            RunOutcome::Yielded { key, value } => {
                let mut s = state.borrow_mut();
                let key = key.unwrap_or_else(|| {
                    let k = Value::Int(s.auto_key);
                    s.auto_key += 1;
                    k
                });
                s.current_key = key;
                s.current_value = value;
                s.status = GeneratorStatus::Suspended;
                return Ok(());
            }
            RunOutcome::Delegate(source) => {
                let delegate = build_delegate(source)?;
                state.borrow_mut().delegate = Some(delegate);
                sent = Value::Null;
            }
        }
    }
}

/// PHP generators don't run any body code until the first call to
/// `current()`/`key()`/`valid()`/`next()`/`rewind()`/`send()` — drive the
/// body to its first `yield` (or completion) exactly once.
pub fn ensure_started(state: &Rc<RefCell<GeneratorState>>, vm: &mut VM) -> RuntimeResult<()> {
    if state.borrow().started {
        return Ok(());
    }
    advance(state, vm, Value::Null)
}
