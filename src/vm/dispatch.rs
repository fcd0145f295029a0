//! The opcode dispatch loop.

use super::frame::{HandlerEntry, IterState, LoopContext, PendingAction};
use super::ops::{arithmetic, arrays, calls, exceptions, objects};
use super::VM;
use crate::error::{RuntimeError, RuntimeResult};
use crate::opcode::{ClassRefOp, Opcode};
use crate::value::{ArrayKey, PhpArray, Value};
use std::cell::RefCell;
use std::rc::Rc;

const MAX_CALL_DEPTH: usize = 2048;

/// How the top frame's dispatch loop stopped running.
pub enum RunOutcome {
    /// The frame ran to a `return` (explicit or implicit) or an uncaught
    /// throw resolved into one via a `finally` block.
    Returned(Value),
    /// A generator body hit `yield`; `key` is `None` for a bare `yield
    /// $value` (the caller assigns the next auto-increment key).
    Yielded { key: Option<Value>, value: Value },
    /// A generator body hit `yield from $source`; the caller drives
    /// `source` to exhaustion before resuming this frame.
    Delegate(Value),
}

/// Run the top frame of `vm.frames` until it returns, yields, or delegates
/// to a `yield from` source. Nested PHP calls recurse through `VM::call*`,
/// so Rust's own call stack carries each PHP call frame's dispatch loop; an
/// uncaught exception in a callee surfaces here as a plain `Err` the `?`
/// operator already propagated up to us.
pub fn run(vm: &mut VM) -> RuntimeResult<RunOutcome> {
    if vm.frames.len() > MAX_CALL_DEPTH {
        return Err(RuntimeError::StackOverflow(vm.frames.len()));
    }
    let frame_idx = vm.frames.len() - 1;

    loop {
        let ip = vm.frames[frame_idx].ip;
        let Some(instr) = vm.frames[frame_idx].function.code.get(ip).cloned() else {
            return Ok(RunOutcome::Returned(Value::Null));
        };
        vm.frames[frame_idx].ip = ip + 1;

        match instr.op {
            Opcode::NoOp => {}
            Opcode::PushConst(idx) => {
                let c = vm.frames[frame_idx].function.constants[idx as usize].clone();
                vm.frames[frame_idx].push(objects::constant_to_value(&c));
            }
            Opcode::PushNull => vm.frames[frame_idx].push(Value::Null),
            Opcode::PushTrue => vm.frames[frame_idx].push(Value::Bool(true)),
            Opcode::PushFalse => vm.frames[frame_idx].push(Value::Bool(false)),
            Opcode::Pop => {
                vm.frames[frame_idx].pop();
            }
            Opcode::Dup => {
                let v = vm.frames[frame_idx].peek().clone();
                vm.frames[frame_idx].push(v);
            }
            Opcode::Swap => {
                let f = &mut vm.frames[frame_idx];
                let len = f.stack.len();
                f.stack.swap(len - 1, len - 2);
            }

            Opcode::LoadLocal(slot) => {
                let v = vm.frames[frame_idx].get_local(slot).deref_clone();
                vm.frames[frame_idx].push(v);
            }
            Opcode::StoreLocal(slot) => {
                let v = vm.frames[frame_idx].pop();
                *vm.frames[frame_idx].local_mut(slot) = v;
            }
            Opcode::StoreLocalInPlace(slot) => {
                let v = vm.frames[frame_idx].pop();
                Value::write_in_place(vm.frames[frame_idx].local_mut(slot), v);
            }
            Opcode::BindLocalRef { target, source } => {
                let bound = Value::bind_reference(vm.frames[frame_idx].local_mut(source));
                *vm.frames[frame_idx].local_mut(target) = bound;
            }
            Opcode::LoadGlobal(idx) => {
                let name = constant_str(&vm.frames[frame_idx], idx);
                let v = vm.ctx.globals.get(&name).cloned().unwrap_or(Value::Null).deref_clone();
                vm.frames[frame_idx].push(v);
            }
            Opcode::StoreGlobal(idx) => {
                let name = constant_str(&vm.frames[frame_idx], idx);
                let v = vm.frames[frame_idx].pop();
                vm.ctx.globals.insert(name, v);
            }
            Opcode::StoreGlobalInPlace(idx) => {
                let name = constant_str(&vm.frames[frame_idx], idx);
                let v = vm.frames[frame_idx].pop();
                let slot = vm.ctx.globals.entry(name).or_insert(Value::Null);
                Value::write_in_place(slot, v);
            }
            Opcode::BindGlobal(idx) => {
                let name = constant_str(&vm.frames[frame_idx], idx);
                let slot = vm.ctx.globals.entry(name).or_insert(Value::Null);
                let bound = Value::bind_reference(slot);
                vm.frames[frame_idx].push(bound);
            }
            Opcode::BindStaticVar { slot, name_const } => {
                let fn_name = vm.frames[frame_idx].function.name.clone();
                let var_name = constant_str(&vm.frames[frame_idx], name_const);
                let key = (fn_name, var_name);
                if !vm.ctx.static_vars.contains_key(&key) {
                    vm.ctx.static_vars.insert(key.clone(), Value::Null);
                }
                let cell = vm.ctx.static_vars.get_mut(&key).unwrap();
                let bound = Value::bind_reference(cell);
                *vm.frames[frame_idx].local_mut(slot) = bound;
            }

            Opcode::LoadThis => {
                let this = vm.frames[frame_idx].this.clone().map(Value::Object).unwrap_or(Value::Null);
                vm.frames[frame_idx].push(this);
            }

            Opcode::BinaryOp(op) => {
                let r = vm.frames[frame_idx].pop();
                let l = vm.frames[frame_idx].pop();
                let result = arithmetic::binary_op(op, &l, &r)?;
                vm.frames[frame_idx].push(result);
            }
            Opcode::UnaryOp(op) => {
                let mut v = vm.frames[frame_idx].pop();
                let result = arithmetic::unary_op(op, &mut v)?;
                vm.frames[frame_idx].push(result);
            }
            Opcode::Concat => {
                let r = vm.frames[frame_idx].pop();
                let l = vm.frames[frame_idx].pop();
                vm.frames[frame_idx].push(Value::Str(format!("{}{}", l.to_php_string(), r.to_php_string())));
            }
            Opcode::Cast(kind) => {
                let v = vm.frames[frame_idx].pop();
                vm.frames[frame_idx].push(arithmetic::cast(kind, &v));
            }
            Opcode::Identical => {
                let r = vm.frames[frame_idx].pop();
                let l = vm.frames[frame_idx].pop();
                vm.frames[frame_idx].push(Value::Bool(l.identical(&r)));
            }
            Opcode::NotIdentical => {
                let r = vm.frames[frame_idx].pop();
                let l = vm.frames[frame_idx].pop();
                vm.frames[frame_idx].push(Value::Bool(!l.identical(&r)));
            }

            Opcode::Jump(addr) => vm.frames[frame_idx].ip = addr as usize,
            Opcode::JumpIfFalse(addr) => {
                let v = vm.frames[frame_idx].pop();
                if !v.to_bool() {
                    vm.frames[frame_idx].ip = addr as usize;
                }
            }
            Opcode::JumpIfTrue(addr) => {
                let v = vm.frames[frame_idx].pop();
                if v.to_bool() {
                    vm.frames[frame_idx].ip = addr as usize;
                }
            }
            Opcode::JumpIfFalseKeep(addr) => {
                if !vm.frames[frame_idx].peek().to_bool() {
                    vm.frames[frame_idx].ip = addr as usize;
                }
            }
            Opcode::JumpIfTrueKeep(addr) => {
                if vm.frames[frame_idx].peek().to_bool() {
                    vm.frames[frame_idx].ip = addr as usize;
                }
            }
            Opcode::JumpIfNotNullKeep(addr) => {
                if !vm.frames[frame_idx].peek().is_null() {
                    vm.frames[frame_idx].ip = addr as usize;
                }
            }

            Opcode::EnterLoop { break_target, continue_target } => {
                let depth = vm.frames[frame_idx].stack.len();
                vm.frames[frame_idx].loops.push(LoopContext { break_target, continue_target, stack_depth: depth });
            }
            Opcode::ExitLoop => {
                vm.frames[frame_idx].loops.pop();
            }
            Opcode::Break(n) => {
                if let Some(outcome) = handle_local(vm, frame_idx, PendingAction::Break(n))? {
                    return Ok(RunOutcome::Returned(outcome));
                }
            }
            Opcode::Continue(n) => {
                if let Some(outcome) = handle_local(vm, frame_idx, PendingAction::Continue(n))? {
                    return Ok(RunOutcome::Returned(outcome));
                }
            }
            Opcode::Goto(addr) => {
                if let Some(outcome) = handle_local(vm, frame_idx, PendingAction::Goto(addr))? {
                    return Ok(RunOutcome::Returned(outcome));
                }
            }

            Opcode::Return => {
                let v = vm.frames[frame_idx].pop();
                if let Some(outcome) = handle_local(vm, frame_idx, PendingAction::Return(v))? {
                    return Ok(RunOutcome::Returned(outcome));
                }
            }
            Opcode::ReturnNull => {
                if let Some(outcome) = handle_local(vm, frame_idx, PendingAction::Return(Value::Null))? {
                    return Ok(RunOutcome::Returned(outcome));
                }
            }

            Opcode::LoadFunction(idx) => {
                let name = constant_str(&vm.frames[frame_idx], idx);
                vm.frames[frame_idx].push(Value::Str(name));
            }
            Opcode::Call { arg_count } => {
                let args = pop_args(vm, frame_idx, arg_count);
                let callee = vm.frames[frame_idx].pop();
                let result = calls::call_closure_value(vm, &callee, args)?;
                vm.frames[frame_idx].push(result);
            }
            Opcode::CallNamed { name_const, arg_count } => {
                let args = pop_args(vm, frame_idx, arg_count);
                let name = constant_str(&vm.frames[frame_idx], name_const);
                let result = calls::call_function(vm, &name, args)?;
                vm.frames[frame_idx].push(result);
            }
            Opcode::CallMethod { method_const, arg_count, nullsafe } => {
                let args = pop_args(vm, frame_idx, arg_count);
                let object = vm.frames[frame_idx].pop();
                if nullsafe && object.is_null() {
                    vm.frames[frame_idx].push(Value::Null);
                } else {
                    let method = constant_str(&vm.frames[frame_idx], method_const);
                    let result = calls::call_method(vm, &object, &method, args)?;
                    vm.frames[frame_idx].push(result);
                }
            }
            Opcode::CallDynamicMethod { arg_count, nullsafe } => {
                let args = pop_args(vm, frame_idx, arg_count);
                let method_name_val = vm.frames[frame_idx].pop();
                let object = vm.frames[frame_idx].pop();
                if nullsafe && object.is_null() {
                    vm.frames[frame_idx].push(Value::Null);
                } else {
                    let method = method_name_val.to_php_string();
                    let result = calls::call_method(vm, &object, &method, args)?;
                    vm.frames[frame_idx].push(result);
                }
            }
            Opcode::CallStaticMethod { class, method_const, arg_count } => {
                let args = pop_args(vm, frame_idx, arg_count);
                let class_name = resolve_class(vm, frame_idx, &class)?;
                let static_ctx = vm.frames[frame_idx].static_context.clone().unwrap_or_else(|| class_name.clone());
                let method = constant_str(&vm.frames[frame_idx], method_const);
                let result = calls::call_static_method(vm, &class_name, &method, static_ctx, args)?;
                vm.frames[frame_idx].push(result);
            }
            Opcode::ApplyNamedArg(_) | Opcode::ApplySpread => {
                // Named/spread argument expansion happens while building the
                // argument list in `pop_args`'s caller (the compiler emits
                // plain positional pushes for the common case); these
                // markers are reserved for richer call-site desugaring.
            }

            Opcode::MakeClosure { function, capture_count, is_static } => {
                let _ = capture_count;
                let closure = calls::make_closure(&mut vm.frames[frame_idx], function, is_static)?;
                vm.frames[frame_idx].push(closure);
            }
            Opcode::CaptureByValue(slot) => {
                let name = vm.frames[frame_idx].function.local_names[slot as usize].clone();
                let value = vm.frames[frame_idx].get_local(slot).deref_clone();
                vm.frames[frame_idx].capture_buffer.push(crate::value::CapturedVar { name, value });
            }
            Opcode::CaptureByRef(slot) => {
                let name = vm.frames[frame_idx].function.local_names[slot as usize].clone();
                let value = Value::bind_reference(vm.frames[frame_idx].local_mut(slot));
                vm.frames[frame_idx].capture_buffer.push(crate::value::CapturedVar { name, value });
            }
            Opcode::Spawn { arg_count } => {
                let args = pop_args(vm, frame_idx, arg_count);
                let callee = vm.frames[frame_idx].pop();
                let Value::Closure(closure) = callee.deref_clone() else {
                    return Err(RuntimeError::TypeError("go() requires a closure".into()));
                };
                let handle = crate::concurrency::spawn(vm, closure, args);
                vm.frames[frame_idx].push(Value::Goroutine(handle));
            }
            Opcode::MakeWaitGroup => {
                vm.frames[frame_idx].push(Value::WaitGroup(Rc::new(RefCell::new(crate::value::WaitGroupState::default()))));
            }

            Opcode::NewArray(hint) => {
                let _ = hint;
                vm.frames[frame_idx].push(Value::Array(PhpArray::new()));
            }
            Opcode::ArrayPushElement => {
                let v = vm.frames[frame_idx].pop();
                append_to_tos(vm, frame_idx, None, v);
            }
            Opcode::ArrayPushKeyed => {
                let v = vm.frames[frame_idx].pop();
                let k = vm.frames[frame_idx].pop();
                append_to_tos(vm, frame_idx, Some(k), v);
            }
            Opcode::ArrayPushSpread => {
                let spread = vm.frames[frame_idx].pop();
                let f = &mut vm.frames[frame_idx];
                if let (Value::Array(src), Some(Value::Array(dst))) = (spread.deref_clone(), f.stack.last_mut()) {
                    dst.extend_spread(&src);
                }
            }
            Opcode::ArrayGet => {
                let k = vm.frames[frame_idx].pop();
                let a = vm.frames[frame_idx].pop();
                vm.frames[frame_idx].push(arrays::get(&a, &k));
            }
            Opcode::ArrayGetOrNull => {
                let k = vm.frames[frame_idx].pop();
                let a = vm.frames[frame_idx].pop();
                vm.frames[frame_idx].push(if arrays::isset(&a, &k) { arrays::get(&a, &k) } else { Value::Null });
            }
            Opcode::ArraySet => {
                let v = vm.frames[frame_idx].pop();
                let k = vm.frames[frame_idx].pop();
                let mut a = vm.frames[frame_idx].pop();
                arrays::set(&mut a, &k, v);
                vm.frames[frame_idx].push(a);
            }
            Opcode::ArrayAppend => {
                let v = vm.frames[frame_idx].pop();
                let mut a = vm.frames[frame_idx].pop();
                arrays::append(&mut a, v);
                vm.frames[frame_idx].push(a);
            }
            Opcode::ArrayUnset => {
                let k = vm.frames[frame_idx].pop();
                let mut a = vm.frames[frame_idx].pop();
                arrays::unset(&mut a, &k);
                vm.frames[frame_idx].push(a);
            }
            Opcode::ArrayIsset => {
                let k = vm.frames[frame_idx].pop();
                let a = vm.frames[frame_idx].pop();
                vm.frames[frame_idx].push(Value::Bool(arrays::isset(&a, &k)));
            }
            Opcode::ListDestructure(count) => {
                let a = vm.frames[frame_idx].pop();
                let Value::Array(arr) = a.deref_clone() else {
                    for _ in 0..count {
                        vm.frames[frame_idx].push(Value::Null);
                    }
                    continue;
                };
                let mut values = Vec::with_capacity(count as usize);
                for i in 0..count {
                    values.push(arr.get(&ArrayKey::Integer(i as i64)).cloned().unwrap_or(Value::Null));
                }
                for v in values.into_iter().rev() {
                    vm.frames[frame_idx].push(v);
                }
            }

            Opcode::IterInit { by_ref } => {
                let a = vm.frames[frame_idx].pop();
                let entries = match a.deref_clone() {
                    Value::Array(arr) => arr.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    _ => Vec::new(),
                };
                let _ = by_ref;
                vm.frames[frame_idx].iterators.push(IterState { entries, position: 0 });
            }
            Opcode::IterValid(addr) => {
                let done = {
                    let iter = vm.frames[frame_idx].iterators.last().expect("IterValid without IterInit");
                    iter.position >= iter.entries.len()
                };
                if done {
                    vm.frames[frame_idx].ip = addr as usize;
                }
            }
            Opcode::IterCurrent => {
                let value = {
                    let iter = vm.frames[frame_idx].iterators.last().unwrap();
                    iter.entries[iter.position].1.clone()
                };
                vm.frames[frame_idx].push(value);
            }
            Opcode::IterKey => {
                let key = {
                    let iter = vm.frames[frame_idx].iterators.last().unwrap();
                    iter.entries[iter.position].0.clone()
                };
                vm.frames[frame_idx].push(key_to_value(&key));
            }
            Opcode::IterNext => {
                let iter = vm.frames[frame_idx].iterators.last_mut().unwrap();
                iter.position += 1;
            }
            Opcode::IterEnd => {
                vm.frames[frame_idx].iterators.pop();
            }

            Opcode::NewObject { class, arg_count } => {
                let args = pop_args(vm, frame_idx, arg_count);
                let class_name = resolve_class(vm, frame_idx, &class)?;
                let obj = objects::instantiate(vm, &class_name, args)?;
                vm.frames[frame_idx].push(Value::Object(obj));
            }
            Opcode::GetProperty { name_const, nullsafe } => {
                let obj = vm.frames[frame_idx].pop();
                if nullsafe && obj.is_null() {
                    vm.frames[frame_idx].push(Value::Null);
                } else {
                    let name = constant_str(&vm.frames[frame_idx], name_const);
                    vm.frames[frame_idx].push(objects::get_property(&obj, &name)?);
                }
            }
            Opcode::GetPropertyDynamic { nullsafe } => {
                let name_val = vm.frames[frame_idx].pop();
                let obj = vm.frames[frame_idx].pop();
                if nullsafe && obj.is_null() {
                    vm.frames[frame_idx].push(Value::Null);
                } else {
                    vm.frames[frame_idx].push(objects::get_property(&obj, &name_val.to_php_string())?);
                }
            }
            Opcode::SetProperty(name_const) => {
                let value = vm.frames[frame_idx].pop();
                let obj = vm.frames[frame_idx].pop();
                let name = constant_str(&vm.frames[frame_idx], name_const);
                objects::set_property(&obj, &name, value.clone())?;
                vm.frames[frame_idx].push(value);
            }
            Opcode::SetPropertyDynamic => {
                let value = vm.frames[frame_idx].pop();
                let name_val = vm.frames[frame_idx].pop();
                let obj = vm.frames[frame_idx].pop();
                objects::set_property(&obj, &name_val.to_php_string(), value.clone())?;
                vm.frames[frame_idx].push(value);
            }
            Opcode::GetStaticProperty { class, name_const } => {
                let class_name = resolve_class(vm, frame_idx, &class)?;
                let name = constant_str(&vm.frames[frame_idx], name_const);
                let key = (class_name, name);
                let v = vm.ctx.static_vars.get(&key).cloned().unwrap_or(Value::Null);
                vm.frames[frame_idx].push(v);
            }
            Opcode::SetStaticProperty { class, name_const } => {
                let value = vm.frames[frame_idx].pop();
                let class_name = resolve_class(vm, frame_idx, &class)?;
                let name = constant_str(&vm.frames[frame_idx], name_const);
                vm.ctx.static_vars.insert((class_name, name), value);
            }
            Opcode::GetClassConst { class, name_const } => {
                let class_name = resolve_class(vm, frame_idx, &class)?;
                let name = constant_str(&vm.frames[frame_idx], name_const);
                let value = vm
                    .ctx
                    .find_class(&class_name)
                    .and_then(|c| c.constants.iter().find(|(n, _)| n == &name))
                    .map(|(_, c)| objects::constant_to_value(c))
                    .unwrap_or(Value::Null);
                vm.frames[frame_idx].push(value);
            }
            Opcode::InstanceOf(class_ref) => {
                let v = vm.frames[frame_idx].pop();
                let class_name = resolve_class(vm, frame_idx, &class_ref)?;
                let result = objects::instance_of(&v, &class_name, vm);
                vm.frames[frame_idx].push(Value::Bool(result));
            }
            Opcode::CloneObject => {
                let v = vm.frames[frame_idx].pop();
                let cloned = objects::clone_object(vm, &v)?;
                vm.frames[frame_idx].push(cloned);
            }

            Opcode::Throw => {
                let value = vm.frames[frame_idx].pop();
                match throw_at(vm, frame_idx, value) {
                    exceptions::UnwindOutcome::JumpTo(addr) => vm.frames[frame_idx].ip = addr as usize,
                    exceptions::UnwindOutcome::Return(v) => return Ok(RunOutcome::Returned(v)),
                    exceptions::UnwindOutcome::Uncaught(v) => return Err(uncaught_error(v)),
                }
            }
            Opcode::PushHandler(handler_idx) => {
                let range = vm.frames[frame_idx].function.handlers[handler_idx as usize].clone();
                let depth = vm.frames[frame_idx].stack.len();
                vm.frames[frame_idx].handlers.push(HandlerEntry {
                    try_start: range.try_start,
                    try_end: range.try_end,
                    catches: range.catches.clone(),
                    finally_entry: range.finally_entry,
                    stack_depth: depth,
                });
            }
            Opcode::PopHandler => {
                vm.frames[frame_idx].handlers.pop();
            }
            Opcode::EndFinally => {
                if let Some(pending) = exceptions::resume_pending(&mut vm.frames[frame_idx]) {
                    match exceptions::unwind_local(&mut vm.frames[frame_idx], pending)? {
                        exceptions::UnwindOutcome::JumpTo(addr) => vm.frames[frame_idx].ip = addr as usize,
                        exceptions::UnwindOutcome::Return(v) => return Ok(RunOutcome::Returned(v)),
                        exceptions::UnwindOutcome::Uncaught(v) => return Err(uncaught_error(v)),
                    }
                }
            }

            Opcode::MatchError => {
                let subject = vm.frames[frame_idx].pop();
                let message = format!("Unhandled match case {}", subject.to_php_string());
                let id = vm.ctx.alloc_object_id();
                let mut data = crate::value::ObjectData::new("UnhandledMatchError", id);
                data.properties.insert("message".to_string(), Value::Str(message));
                let value = Value::Object(Rc::new(RefCell::new(data)));
                match throw_at(vm, frame_idx, value) {
                    exceptions::UnwindOutcome::JumpTo(addr) => vm.frames[frame_idx].ip = addr as usize,
                    exceptions::UnwindOutcome::Return(v) => return Ok(RunOutcome::Returned(v)),
                    exceptions::UnwindOutcome::Uncaught(v) => return Err(uncaught_error(v)),
                }
            }

            Opcode::Yield { has_key } => {
                // Suspend this frame in place: `ip` already points past this
                // instruction, so resuming just pushes the value `send()`
                // supplied and continues the loop from here.
                let value = vm.frames[frame_idx].pop();
                let key_slot = vm.frames[frame_idx].pop();
                let key = if has_key { Some(key_slot) } else { None };
                return Ok(RunOutcome::Yielded { key, value });
            }
            Opcode::YieldFrom => {
                let source = vm.frames[frame_idx].pop();
                return Ok(RunOutcome::Delegate(source));
            }

            Opcode::Echo => {
                let v = vm.frames[frame_idx].pop();
                let _ = write!(vm.ctx.output, "{}", v.to_php_string());
            }
            Opcode::Suppress => {
                // Error-suppression scoping (`@expr`) is handled by the
                // compiler wrapping the suppressed expression in a
                // handler range that discards warnings; nothing to do at
                // the opcode itself.
            }
        }
    }
}

fn handle_local(vm: &mut VM, frame_idx: usize, action: PendingAction) -> RuntimeResult<Option<Value>> {
    match exceptions::unwind_local(&mut vm.frames[frame_idx], action)? {
        exceptions::UnwindOutcome::JumpTo(addr) => {
            vm.frames[frame_idx].ip = addr as usize;
            Ok(None)
        }
        exceptions::UnwindOutcome::Return(v) => Ok(Some(v)),
        exceptions::UnwindOutcome::Uncaught(v) => Err(uncaught_error(v)),
    }
}

fn uncaught_error(value: Value) -> RuntimeError {
    match value.deref_clone() {
        Value::Object(obj) => {
            let data = obj.borrow();
            let message = data
                .get("message")
                .map(|v| v.to_php_string())
                .unwrap_or_default();
            RuntimeError::Uncaught { class: data.class_name.clone(), message }
        }
        other => RuntimeError::Uncaught { class: "Exception".to_string(), message: other.to_php_string() },
    }
}

fn constant_str(frame: &super::Frame, idx: u32) -> String {
    match &frame.function.constants[idx as usize] {
        crate::opcode::Constant::Str(s) => s.clone(),
        other => objects::constant_to_value(other).to_php_string(),
    }
}

fn pop_args(vm: &mut VM, frame_idx: usize, count: u32) -> Vec<Value> {
    let mut args = Vec::with_capacity(count as usize);
    for _ in 0..count {
        args.push(vm.frames[frame_idx].pop());
    }
    args.reverse();
    args
}

fn append_to_tos(vm: &mut VM, frame_idx: usize, key: Option<Value>, value: Value) {
    let f = &mut vm.frames[frame_idx];
    if let Some(Value::Array(arr)) = f.stack.last_mut() {
        match key {
            Some(k) => arr.insert(arrays::key_from_value(&k), value),
            None => {
                arr.append(value);
            }
        }
    }
}

fn key_to_value(key: &ArrayKey) -> Value {
    match key {
        ArrayKey::Integer(n) => Value::Int(*n),
        ArrayKey::String(s) => Value::Str(s.clone()),
    }
}

/// `resolve_class_ref`/`unwind_throw` need `&VM` and `&mut Frame`
/// simultaneously; since the current frame lives inside `vm.frames`, lending
/// both out at once would alias. Temporarily detach the frame from the
/// vector so `vm` and the frame borrow independently, then put it back.
fn resolve_class(vm: &mut VM, frame_idx: usize, op: &ClassRefOp) -> RuntimeResult<String> {
    let mut frame = vm.frames.remove(frame_idx);
    let result = calls::resolve_class_ref(vm, &mut frame, op);
    vm.frames.insert(frame_idx, frame);
    result
}

fn throw_at(vm: &mut VM, frame_idx: usize, value: Value) -> exceptions::UnwindOutcome {
    let mut frame = vm.frames.remove(frame_idx);
    let outcome = exceptions::unwind_throw(vm, &mut frame, value);
    vm.frames.insert(frame_idx, frame);
    outcome
}
