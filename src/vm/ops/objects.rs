use crate::decl::CompiledClass;
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{ObjectData, ObjectRef, Value};
use crate::vm::VM;
use std::cell::RefCell;
use std::rc::Rc;

/// Walk the parent chain collecting every non-static property default,
/// most-derived first, skipping names already seen in a subclass.
fn collect_property_defaults(vm: &VM, class: &CompiledClass) -> Vec<(String, Value)> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    let mut current = Some(class.clone());
    while let Some(c) = current {
        for prop in &c.properties {
            if prop.is_static || !seen.insert(prop.name.clone()) {
                continue;
            }
            let value = prop
                .default
                .as_ref()
                .map(constant_to_value)
                .unwrap_or(Value::Null);
            out.push((prop.name.clone(), value));
        }
        current = c.parent.as_ref().and_then(|p| vm.ctx.find_class(p)).map(|rc| (**rc).clone());
    }
    out
}

pub fn constant_to_value(c: &crate::opcode::Constant) -> Value {
    match c {
        crate::opcode::Constant::Null => Value::Null,
        crate::opcode::Constant::Bool(b) => Value::Bool(*b),
        crate::opcode::Constant::Int(n) => Value::Int(*n),
        crate::opcode::Constant::Float(f) => Value::Float(*f),
        crate::opcode::Constant::Str(s) => Value::Str(s.clone()),
        crate::opcode::Constant::Array(elements) => {
            let mut array = crate::value::PhpArray::new();
            for (key, value) in elements {
                let value = constant_to_value(value);
                match key {
                    Some(k) => {
                        array.insert(super::arrays::key_from_value(&constant_to_value(k)), value);
                    }
                    None => {
                        array.append(value);
                    }
                }
            }
            Value::Array(array)
        }
    }
}

/// Instantiate `class_name`, running `__construct` (if any) with `args`,
/// and return the new object handle.
pub fn instantiate(vm: &mut VM, class_name: &str, args: Vec<Value>) -> RuntimeResult<ObjectRef> {
    let class = vm
        .ctx
        .find_class(class_name)
        .cloned()
        .ok_or_else(|| RuntimeError::ClassNotFound(class_name.to_string()))?;

    let id = vm.ctx.alloc_object_id();
    let mut data = ObjectData::new(class.name.clone(), id);
    for (name, value) in collect_property_defaults(vm, &class) {
        data.properties.insert(name, value);
    }
    for prop in &class.properties {
        if prop.readonly {
            data.readonly_properties.push(prop.name.clone());
        }
    }
    let handle: ObjectRef = Rc::new(RefCell::new(data));

    if let Some(ctor) = class.find_method("__construct") {
        if let Some(function) = ctor.function.clone() {
            vm.call_bound(function, Some(Rc::clone(&handle)), Some(class.name.clone()), Some(class.name.clone()), args)?;
        }
    }
    Ok(handle)
}

pub fn get_property(object: &Value, name: &str) -> RuntimeResult<Value> {
    match object.deref_clone() {
        Value::Object(obj) => Ok(obj.borrow().get(name).cloned().unwrap_or(Value::Null)),
        Value::Null => Err(RuntimeError::PropertyAccessOnNull(name.to_string())),
        other => Err(RuntimeError::PropertyAssignOnNonObject(name.to_string(), other.type_name())),
    }
}

pub fn set_property(object: &Value, name: &str, value: Value) -> RuntimeResult<()> {
    match object.deref_clone() {
        Value::Object(obj) => {
            let mut data = obj.borrow_mut();
            if data.is_readonly(name) && data.is_readonly_initialized(name) {
                return Err(RuntimeError::ReadonlyPropertyModification(data.class_name.clone(), name.to_string()));
            }
            if data.is_readonly(name) {
                data.mark_readonly_initialized(name);
            }
            data.properties.insert(name.to_string(), value);
            Ok(())
        }
        other => Err(RuntimeError::PropertyAssignOnNonObject(name.to_string(), other.type_name())),
    }
}

pub fn instance_of(value: &Value, class_name: &str, vm: &VM) -> bool {
    let Value::Object(obj) = value.deref_clone() else {
        return false;
    };
    let mut current = Some(obj.borrow().class_name.clone());
    while let Some(name) = current {
        if name.eq_ignore_ascii_case(class_name) {
            return true;
        }
        let Some(class) = vm.ctx.find_class(&name) else { break };
        if class.interfaces.iter().any(|i| interface_extends(vm, i, class_name)) {
            return true;
        }
        current = class.parent.clone();
    }
    false
}

fn interface_extends(vm: &VM, iface_name: &str, target: &str) -> bool {
    if iface_name.eq_ignore_ascii_case(target) {
        return true;
    }
    vm.ctx
        .interfaces
        .get(iface_name)
        .map(|iface| iface.parents.iter().any(|p| interface_extends(vm, p, target)))
        .unwrap_or(false)
}

pub fn clone_object(vm: &mut VM, value: &Value) -> RuntimeResult<Value> {
    let Value::Object(obj) = value.deref_clone() else {
        return Err(RuntimeError::TypeError("__clone called on non-object".to_string()));
    };
    let id = vm.ctx.alloc_object_id();
    let cloned = obj.borrow().shallow_clone(id);
    let class_name = cloned.class_name.clone();
    let handle: ObjectRef = Rc::new(RefCell::new(cloned));

    if let Some(class) = vm.ctx.find_class(&class_name).cloned() {
        if let Some(method) = class.find_method("__clone") {
            if let Some(function) = method.function.clone() {
                vm.call_bound(function, Some(Rc::clone(&handle)), Some(class_name.clone()), Some(class_name), vec![])?;
            }
        }
    }
    Ok(Value::Object(handle))
}
