//! The runtime value representation shared by the compiler's constant pool
//! and the VM's operand stack, locals, and heap.

mod array_key;
mod closure;
mod conversions;
mod goroutine;
mod object_instance;
mod php_array;

pub use array_key::ArrayKey;
pub use conversions::is_numeric_string;
pub use closure::{CapturedVar, ClosureValue};
pub use goroutine::{GoroutineHandle, GoroutineOutcome, WaitGroupState};
pub use object_instance::ObjectData;
pub use php_array::PhpArray;

use std::cell::RefCell;
use std::rc::Rc;

pub type Ref = Rc<RefCell<Value>>;
pub type ObjectRef = Rc<RefCell<ObjectData>>;

/// An opaque host-provided handle (file descriptor, stream, socket) the VM
/// never interprets, only carries and hands back to the host.
#[derive(Clone)]
pub struct Resource {
    pub id: u64,
    pub type_name: &'static str,
    pub data: Rc<dyn std::any::Any>,
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// An enum case value, e.g. `Suit::Hearts`; `backing_value` is set only for
/// backed enums.
#[derive(Debug, Clone)]
pub struct EnumCaseValue {
    pub enum_name: String,
    pub case_name: String,
    pub backing_value: Option<Box<Value>>,
}

/// A PHP value.
///
/// `Reference` is the one variant with no PHP-level type of its own: it
/// marks a slot (local variable, array element, object property) as
/// currently aliased through a shared cell. Every read path transparently
/// dereferences it; only in-place writers (compound assignment, `++`/`--`,
/// `=&`) need to know it is there. See `deref`/`deref_clone` below.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(PhpArray),
    Object(ObjectRef),
    Closure(Rc<ClosureValue>),
    EnumCase(Rc<EnumCaseValue>),
    Goroutine(Rc<GoroutineHandle>),
    WaitGroup(Rc<RefCell<WaitGroupState>>),
    Resource(Resource),
    Reference(Ref),
    /// A suspended generator body; its execution state lives in the VM's
    /// frame representation (`crate::vm::generator::GeneratorState`).
    Generator(Rc<RefCell<crate::vm::generator::GeneratorState>>),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    pub fn new_ref(value: Value) -> Ref {
        Rc::new(RefCell::new(value))
    }

    /// Follow a `Reference` cell (if any) and clone out the underlying value.
    /// Non-reference values clone themselves; `Object`/`Closure`/etc. clones
    /// are handle clones (cheap `Rc` bumps), matching PHP's reference-type
    /// semantics for those kinds.
    pub fn deref_clone(&self) -> Value {
        match self {
            Value::Reference(cell) => cell.borrow().deref_clone(),
            other => other.clone(),
        }
    }

    /// Write through an existing `Reference` cell in place, or overwrite a
    /// plain slot directly. Use for compound assignment and `++`/`--` so
    /// aliases stay visible; plain `=` should overwrite the slot outright
    /// instead (severing any alias it held), not call this.
    pub fn write_in_place(slot: &mut Value, new_value: Value) {
        if let Value::Reference(cell) = slot {
            *cell.borrow_mut() = new_value;
        } else {
            *slot = new_value;
        }
    }

    /// Bind `target` and `source` to the same cell, as `$target =& $source`.
    /// Promotes `source` to a reference cell first if it is not one already,
    /// so the source variable itself becomes aliased too.
    pub fn bind_reference(source: &mut Value) -> Value {
        if let Value::Reference(cell) = source {
            Value::Reference(Rc::clone(cell))
        } else {
            let taken = std::mem::replace(source, Value::Null);
            let cell = Value::new_ref(taken);
            *source = Value::Reference(Rc::clone(&cell));
            Value::Reference(cell)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.deref_clone(), Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "double",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) | Value::EnumCase(_) => "object",
            Value::Closure(_) => "object",
            Value::Goroutine(_) => "object",
            Value::WaitGroup(_) => "object",
            Value::Generator(_) => "object",
            Value::Resource(_) => "resource",
            Value::Reference(cell) => return cell.borrow().type_name(),
        }
    }
}
