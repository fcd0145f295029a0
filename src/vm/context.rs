use crate::decl::{CompiledClass, CompiledEnum, CompiledInterface, CompiledTrait};
use crate::error::RuntimeResult;
use crate::opcode::FunctionRef;
use crate::value::{ClosureValue, GoroutineHandle, Value};
use crate::vm::VM;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::rc::Rc;

/// A host-provided builtin. Gets a live `VM` handle (not just the context)
/// so builtins like `array_map` can call back into PHP closures.
pub type NativeFn = Rc<dyn Fn(&mut VM<'_>, Vec<Value>) -> RuntimeResult<Value>>;

/// A goroutine queued by `go()`, waiting for the cooperative scheduler to
/// run it to completion. See `crate::concurrency`.
pub struct GoroutineTask {
    pub closure: Rc<ClosureValue>,
    pub args: Vec<Value>,
    pub handle: Rc<GoroutineHandle>,
}

/// Everything shared across a program's call frames: declared functions
/// and classes, the global variable table, static-local storage, the
/// include machinery, and the goroutine run queue.
pub struct ExecutionContext {
    pub functions: HashMap<String, FunctionRef>,
    pub natives: HashMap<String, NativeFn>,
    pub classes: HashMap<String, Rc<CompiledClass>>,
    pub interfaces: HashMap<String, Rc<CompiledInterface>>,
    pub traits: HashMap<String, Rc<CompiledTrait>>,
    pub enums: HashMap<String, Rc<CompiledEnum>>,

    pub globals: HashMap<String, Value>,

    /// `static $x = ...;` storage, keyed by `(function name, variable name)`
    /// so every call to the same function shares one slot.
    pub static_vars: HashMap<(String, String), Value>,

    pub output: Box<dyn Write>,
    /// Host callback for `include`/`require`: given a resolved path, parses
    /// and compiles the target file into callable declarations and returns
    /// its top-level function, or `None` if the host could not resolve it.
    /// The VM never touches the filesystem itself.
    pub include_callback: Option<Box<dyn FnMut(&str) -> Option<FunctionRef>>>,
    pub included_once: HashSet<String>,

    pub next_object_id: u64,
    pub next_goroutine_id: u64,
    pub pending_goroutines: Vec<GoroutineTask>,
}

impl ExecutionContext {
    pub fn new(output: Box<dyn Write>) -> Self {
        Self {
            functions: HashMap::new(),
            natives: HashMap::new(),
            classes: HashMap::new(),
            interfaces: HashMap::new(),
            traits: HashMap::new(),
            enums: HashMap::new(),
            globals: HashMap::new(),
            static_vars: HashMap::new(),
            output,
            include_callback: None,
            included_once: HashSet::new(),
            next_object_id: 1,
            next_goroutine_id: 1,
            pending_goroutines: Vec::new(),
        }
    }

    pub fn alloc_object_id(&mut self) -> u64 {
        let id = self.next_object_id;
        self.next_object_id += 1;
        id
    }

    pub fn alloc_goroutine_id(&mut self) -> u64 {
        let id = self.next_goroutine_id;
        self.next_goroutine_id += 1;
        id
    }

    /// Case-insensitive function lookup, matching PHP's function naming.
    pub fn find_function(&self, name: &str) -> Option<&FunctionRef> {
        if let Some(f) = self.functions.get(name) {
            return Some(f);
        }
        let lower = name.to_ascii_lowercase();
        self.functions.iter().find(|(n, _)| n.to_ascii_lowercase() == lower).map(|(_, f)| f)
    }

    /// Case-insensitive native builtin lookup. A user function of the same
    /// name never shadows a native: the registry's stdlib always wins,
    /// matching real PHP's treatment of internal functions.
    pub fn find_native(&self, name: &str) -> Option<NativeFn> {
        if let Some(f) = self.natives.get(name) {
            return Some(Rc::clone(f));
        }
        let lower = name.to_ascii_lowercase();
        self.natives.iter().find(|(n, _)| n.to_ascii_lowercase() == lower).map(|(_, f)| Rc::clone(f))
    }

    pub fn find_class(&self, name: &str) -> Option<&Rc<CompiledClass>> {
        if let Some(c) = self.classes.get(name) {
            return Some(c);
        }
        let lower = name.to_ascii_lowercase();
        self.classes.iter().find(|(n, _)| n.to_ascii_lowercase() == lower).map(|(_, c)| c)
    }
}
