//! Call frame management for the bytecode VM.

use crate::opcode::{Addr, FunctionRef};
use crate::value::{ArrayKey, ObjectRef, Value};

/// One `try`/`catch`/`finally` protection currently active in a frame,
/// pushed by `PushHandler` and consulted on `Throw` or on any non-local
/// exit (`return`/`break N`/`continue N`/`goto`) that would leave the
/// protected range.
#[derive(Debug, Clone)]
pub struct HandlerEntry {
    pub try_start: Addr,
    pub try_end: Addr,
    pub catches: Vec<(Vec<String>, Addr)>,
    pub finally_entry: Option<Addr>,
    /// Operand-stack depth to restore before resuming at a catch/finally
    /// entry, so leftover partial-expression values don't leak across it.
    pub stack_depth: usize,
}

/// What a cascading `finally` needs to resume once it finishes running,
/// unless the `finally` body itself returns/throws/jumps first and
/// overrides it.
#[derive(Debug, Clone)]
pub enum PendingAction {
    Return(Value),
    Break(u32),
    Continue(u32),
    Goto(Addr),
    Throw(Value),
}

#[derive(Debug, Clone)]
pub struct LoopContext {
    pub continue_target: Addr,
    pub break_target: Addr,
    pub stack_depth: usize,
}

#[derive(Debug)]
pub struct IterState {
    pub entries: Vec<(ArrayKey, Value)>,
    pub position: usize,
}

/// A single call's activation record. The VM's call stack is a `Vec<Frame>`;
/// a generator instead keeps one `Frame` alive across `Advance` calls
/// rather than popping it when the body yields.
#[derive(Debug)]
pub struct Frame {
    pub function: FunctionRef,
    pub locals: Vec<Value>,
    pub stack: Vec<Value>,
    pub ip: usize,
    pub handlers: Vec<HandlerEntry>,
    pub loops: Vec<LoopContext>,
    pub iterators: Vec<IterState>,
    pub this: Option<ObjectRef>,
    /// The class `self::` resolves against.
    pub class_context: Option<String>,
    /// The class `static::` resolves against (late static binding).
    pub static_context: Option<String>,
    /// Set while a cascading `finally` runs so `EndFinally` knows what to
    /// resume once the protected block finishes.
    pub pending: Option<PendingAction>,
    /// Accumulates `CaptureByValue`/`CaptureByRef` entries between a
    /// closure literal's capture opcodes and its `MakeClosure`.
    pub capture_buffer: Vec<crate::value::CapturedVar>,
}

impl Frame {
    pub fn new(function: FunctionRef) -> Self {
        let local_count = function.local_count as usize;
        Self {
            function,
            locals: vec![Value::Null; local_count],
            stack: Vec::new(),
            ip: 0,
            handlers: Vec::new(),
            loops: Vec::new(),
            iterators: Vec::new(),
            this: None,
            class_context: None,
            static_context: None,
            pending: None,
            capture_buffer: Vec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or(Value::Null)
    }

    #[inline]
    pub fn peek(&self) -> &Value {
        self.stack.last().unwrap_or(&Value::Null)
    }

    #[inline]
    pub fn get_local(&self, slot: u32) -> Value {
        self.locals[slot as usize].clone()
    }

    #[inline]
    pub fn local_mut(&mut self, slot: u32) -> &mut Value {
        &mut self.locals[slot as usize]
    }
}
