use crate::error::{RuntimeError, RuntimeResult};
use crate::opcode::ClassRefOp;
use crate::value::{ClosureValue, Value};
use crate::vm::{Frame, VM};
use std::cell::RefCell;
use std::rc::Rc;

/// Resolve a `self`/`parent`/`static`/dynamic/named class reference against
/// the currently executing frame.
pub fn resolve_class_ref(vm: &VM, frame: &mut Frame, op: &ClassRefOp) -> RuntimeResult<String> {
    Ok(match op {
        ClassRefOp::Name(idx) => constant_string(frame, *idx)?,
        ClassRefOp::SelfType => frame
            .class_context
            .clone()
            .ok_or_else(|| RuntimeError::Internal("'self' used outside a class context".into()))?,
        ClassRefOp::ParentType => {
            let current = frame
                .class_context
                .clone()
                .ok_or_else(|| RuntimeError::Internal("'parent' used outside a class context".into()))?;
            vm.ctx
                .find_class(&current)
                .and_then(|c| c.parent.clone())
                .ok_or_else(|| RuntimeError::Internal(format!("{current} has no parent class")))?
        }
        ClassRefOp::StaticType => frame
            .static_context
            .clone()
            .ok_or_else(|| RuntimeError::Internal("'static' used outside a class context".into()))?,
        ClassRefOp::Dynamic => {
            let v = frame.pop();
            match v.deref_clone() {
                Value::Str(s) => s,
                Value::Object(obj) => obj.borrow().class_name.clone(),
                other => return Err(RuntimeError::TypeError(format!("cannot resolve class from {}", other.type_name()))),
            }
        }
    })
}

fn constant_string(frame: &Frame, idx: u32) -> RuntimeResult<String> {
    match &frame.function.constants[idx as usize] {
        crate::opcode::Constant::Str(s) => Ok(s.clone()),
        _ => Err(RuntimeError::Internal("expected string constant".into())),
    }
}

/// Build a `Value::Closure` from the function template and whatever
/// captures have accumulated in `frame.capture_buffer` since the last
/// `MakeClosure`.
pub fn make_closure(frame: &mut Frame, function_idx: u32, is_static: bool) -> RuntimeResult<Value> {
    let function = frame
        .function
        .nested_functions
        .get(function_idx as usize)
        .cloned()
        .ok_or_else(|| RuntimeError::Internal("missing closure template".into()))?;
    let mut closure = ClosureValue::new(function, frame.class_context.clone(), is_static);
    closure.captures = std::mem::take(&mut frame.capture_buffer);
    if !is_static {
        closure.bound_this = frame.this.clone();
    }
    Ok(Value::Closure(Rc::new(closure)))
}

pub fn call_function(vm: &mut VM, name: &str, args: Vec<Value>) -> RuntimeResult<Value> {
    if let Some(native) = vm.ctx.find_native(name) {
        return native(vm, args);
    }
    let function = vm
        .ctx
        .find_function(name)
        .cloned()
        .ok_or_else(|| RuntimeError::UndefinedFunction(name.to_string()))?;
    check_arity(&function, args.len())?;
    vm.call(function, args)
}

pub fn call_closure_value(vm: &mut VM, value: &Value, args: Vec<Value>) -> RuntimeResult<Value> {
    match value.deref_clone() {
        Value::Closure(closure) => {
            check_arity(&closure.function, args.len())?;
            vm.call_closure(&closure, args)
        }
        Value::Str(name) => call_function(vm, &name, args),
        other => Err(RuntimeError::TypeError(format!("value of type {} is not callable", other.type_name()))),
    }
}

pub fn call_method(vm: &mut VM, object: &Value, method_name: &str, args: Vec<Value>) -> RuntimeResult<Value> {
    if let Value::WaitGroup(state) = object.deref_clone() {
        return call_wait_group_method(vm, &state, method_name, args);
    }
    if let Value::Generator(state) = object.deref_clone() {
        return call_generator_method(vm, &state, method_name, args);
    }
    let Value::Object(obj) = object.deref_clone() else {
        return Err(RuntimeError::TypeError(format!("call to method {method_name} on non-object")));
    };
    let class_name = obj.borrow().class_name.clone();
    let class = vm
        .ctx
        .find_class(&class_name)
        .cloned()
        .ok_or_else(|| RuntimeError::ClassNotFound(class_name.clone()))?;
    let method = class
        .find_method(method_name)
        .cloned()
        .ok_or_else(|| RuntimeError::UndefinedMethod(method_name.to_string(), class_name.clone()))?;
    let function = method.function.ok_or_else(|| RuntimeError::UndefinedMethod(method_name.to_string(), class_name.clone()))?;
    check_arity(&function, args.len())?;
    vm.call_bound(function, Some(obj), Some(class_name.clone()), Some(class_name), args)
}

/// `WaitGroup` is a host value, not a declared class, so its three methods
/// are dispatched here rather than through `ExecutionContext::classes`.
fn call_wait_group_method(
    vm: &mut VM,
    state: &Rc<RefCell<crate::value::WaitGroupState>>,
    method_name: &str,
    args: Vec<Value>,
) -> RuntimeResult<Value> {
    match method_name {
        "Add" => {
            let delta = args.first().map(|v| v.to_int()).unwrap_or(0);
            crate::concurrency::wait_group_add(&*state, delta)?;
            Ok(Value::Null)
        }
        "Done" => {
            crate::concurrency::wait_group_done(&*state)?;
            Ok(Value::Null)
        }
        "Wait" => {
            crate::concurrency::wait_group_wait(vm, &*state)?;
            Ok(Value::Null)
        }
        other => Err(RuntimeError::UndefinedMethod(other.to_string(), "WaitGroup".to_string())),
    }
}

/// `Generator` is a host value, not a declared class, so its methods are
/// dispatched here rather than through `ExecutionContext::classes`. Every
/// accessor except `getReturn` implicitly rewinds the generator to its
/// first `yield` on first use, matching PHP's lazy-start semantics.
fn call_generator_method(
    vm: &mut VM,
    state: &Rc<RefCell<crate::vm::generator::GeneratorState>>,
    method_name: &str,
    args: Vec<Value>,
) -> RuntimeResult<Value> {
    use crate::vm::generator;
    match method_name {
        "current" => {
            generator::ensure_started(state, vm)?;
            Ok(state.borrow().current_value.clone())
        }
        "key" => {
            generator::ensure_started(state, vm)?;
            Ok(state.borrow().current_key.clone())
        }
        "valid" => {
            generator::ensure_started(state, vm)?;
            Ok(Value::Bool(!state.borrow().is_finished()))
        }
        "next" => {
            generator::ensure_started(state, vm)?;
            generator::advance(state, vm, Value::Null)?;
            Ok(Value::Null)
        }
        "rewind" => {
            generator::ensure_started(state, vm)?;
            Ok(Value::Null)
        }
        "send" => {
            let value = args.into_iter().next().unwrap_or(Value::Null);
            if state.borrow().started {
                generator::advance(state, vm, value)?;
            } else {
                generator::ensure_started(state, vm)?;
            }
            Ok(state.borrow().current_value.clone())
        }
        "getReturn" => Ok(state.borrow().return_value.clone()),
        other => Err(RuntimeError::UndefinedMethod(other.to_string(), "Generator".to_string())),
    }
}

pub fn call_static_method(vm: &mut VM, class_name: &str, method_name: &str, static_context: String, args: Vec<Value>) -> RuntimeResult<Value> {
    let class = vm
        .ctx
        .find_class(class_name)
        .cloned()
        .ok_or_else(|| RuntimeError::ClassNotFound(class_name.to_string()))?;
    let method = class
        .find_method(method_name)
        .cloned()
        .ok_or_else(|| RuntimeError::UndefinedMethod(method_name.to_string(), class_name.to_string()))?;
    let function = method
        .function
        .ok_or_else(|| RuntimeError::UndefinedMethod(method_name.to_string(), class_name.to_string()))?;
    check_arity(&function, args.len())?;
    let this = vm.frames.last().and_then(|f| f.this.clone());
    vm.call_bound(function, this, Some(class_name.to_string()), Some(static_context), args)
}

fn check_arity(function: &crate::opcode::CompiledFunction, given: usize) -> RuntimeResult<()> {
    if (given as u32) < function.required_param_count && !function.is_variadic {
        return Err(RuntimeError::TooFewArguments(
            function.name.clone(),
            given,
            function.required_param_count as usize,
        ));
    }
    Ok(())
}
