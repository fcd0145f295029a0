//! Stack-based bytecode virtual machine.
//!
//! The VM executes a [`crate::opcode::CompiledFunction`] against an
//! [`ExecutionContext`] holding every declared function/class/interface/
//! trait/enum plus the process-wide global variable table. Running to
//! completion (`VM::execute`) drives the dispatch loop over a call-frame
//! stack; a suspended generator keeps exactly one `Frame` alive between
//! `Advance` calls instead (see [`generator`]).

pub mod context;
pub mod dispatch;
pub mod frame;
pub mod generator;
pub mod ops;

pub use context::ExecutionContext;
pub use frame::Frame;

use crate::error::{RuntimeError, RuntimeResult};
use crate::opcode::FunctionRef;
use crate::value::{ClosureValue, ObjectRef, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// Drives one top-level call (a program's `{main}` function, or a
/// re-entrant `include`) against a shared [`ExecutionContext`].
pub struct VM<'a> {
    pub ctx: &'a mut ExecutionContext,
    pub frames: Vec<Frame>,
}

impl<'a> VM<'a> {
    pub fn new(ctx: &'a mut ExecutionContext) -> Self {
        Self { ctx, frames: Vec::new() }
    }

    /// Run `function` with `args` already bound to its parameter slots by
    /// the caller, returning its resolved return value.
    pub fn call(&mut self, function: FunctionRef, args: Vec<Value>) -> RuntimeResult<Value> {
        self.call_bound(function, None, None, None, args)
    }

    /// Run a closure's body: bind `$this`/class scope, write each capture
    /// into the local slot its name resolves to, then bind `args`
    /// positionally into the parameter slots, and run to completion.
    pub fn call_closure(&mut self, closure: &ClosureValue, args: Vec<Value>) -> RuntimeResult<Value> {
        let mut frame = Frame::new(closure.function.clone());
        for capture in &closure.captures {
            if let Some(slot) = frame.function.local_names.iter().position(|n| n == &capture.name) {
                frame.locals[slot] = capture.value.clone();
            }
        }
        bind_positional_args(&mut frame, args);
        frame.this = closure.bound_this.clone();
        frame.class_context = closure.scope_class.clone();
        frame.static_context = closure.scope_class.clone();
        self.run_frame(frame)
    }

    /// Run a method or plain function with an explicit `$this`/class scope,
    /// as used for constructors, ordinary method dispatch, and static calls
    /// with late static binding (`static_context` may differ from
    /// `class_context` when called through a child class).
    pub fn call_bound(
        &mut self,
        function: FunctionRef,
        this: Option<ObjectRef>,
        class_context: Option<String>,
        static_context: Option<String>,
        args: Vec<Value>,
    ) -> RuntimeResult<Value> {
        let mut frame = Frame::new(function);
        bind_positional_args(&mut frame, args);
        frame.this = this;
        frame.static_context = static_context.or_else(|| class_context.clone());
        frame.class_context = class_context;
        self.run_frame(frame)
    }

    fn run_frame(&mut self, frame: Frame) -> RuntimeResult<Value> {
        if frame.function.is_generator {
            return Ok(Value::Generator(Rc::new(RefCell::new(generator::GeneratorState::new(frame)))));
        }
        self.frames.push(frame);
        let result = dispatch::run(self);
        self.frames.pop();
        match result? {
            dispatch::RunOutcome::Returned(v) => Ok(v),
            dispatch::RunOutcome::Yielded { .. } | dispatch::RunOutcome::Delegate(_) => {
                Err(RuntimeError::Internal("yield outside a generator body".to_string()))
            }
        }
    }
}

fn bind_positional_args(frame: &mut Frame, args: Vec<Value>) {
    for (i, arg) in args.into_iter().enumerate() {
        if i < frame.locals.len() {
            frame.locals[i] = arg;
        }
    }
}
