use super::object_instance::ObjectData;
use super::Value;
use crate::opcode::CompiledFunction;
use std::cell::RefCell;
use std::rc::Rc;

/// A captured variable: by-value closures store a snapshot, by-reference
/// closures store the same cell as the enclosing scope's variable so later
/// writes on either side are visible on both.
#[derive(Debug, Clone)]
pub struct CapturedVar {
    pub name: String,
    pub value: Value,
}

/// A bound function value: a plain closure, an arrow function, or a
/// first-class callable reference (`strlen(...)`, `$obj->method(...)`).
#[derive(Debug)]
pub struct ClosureValue {
    pub function: Rc<CompiledFunction>,
    pub captures: Vec<CapturedVar>,
    pub bound_this: Option<Rc<RefCell<ObjectData>>>,
    /// The class `self`/`parent`/`static::` resolve against inside the body.
    pub scope_class: Option<String>,
    pub is_static: bool,
}

impl ClosureValue {
    pub fn new(function: Rc<CompiledFunction>, scope_class: Option<String>, is_static: bool) -> Self {
        Self {
            function,
            captures: Vec::new(),
            bound_this: None,
            scope_class,
            is_static,
        }
    }
}
