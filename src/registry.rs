//! Host builtin registry.
//!
//! The VM itself only knows opcodes; every named function a compiled
//! program can call (`strlen`, `array_map`, `count`, ...) is a value the
//! host installs into an [`crate::vm::ExecutionContext`] before running it.
//! [`Registry::with_defaults`] gives a small illustrative standard library;
//! a host embedding this crate is free to build its own `Registry` from
//! scratch and layer its own functions on top with [`Registry::function`].
//!
//! `__include` is the one entry every registry carries regardless of
//! `with_defaults`, since `include`/`require` are compiled down to a call
//! to it (see `compiler::builder::compile_include`) rather than a VM
//! opcode — re-entering the compiler on a host-resolved path is core
//! language machinery, not stdlib.

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{ArrayKey, PhpArray, Value};
use crate::vm::context::NativeFn;
use crate::vm::ops::calls::call_closure_value;
use crate::vm::{ExecutionContext, VM};
use std::collections::HashMap;
use std::rc::Rc;

pub struct Registry {
    functions: HashMap<String, NativeFn>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let mut functions: HashMap<String, NativeFn> = HashMap::new();
        functions.insert("__include".to_string(), Rc::new(native_include));
        Self { functions }
    }

    /// A fresh registry plus a modest set of the PHP functions programs
    /// reach for constantly. Not a complete standard library — a host that
    /// needs more calls `function` to add its own on top.
    pub fn with_defaults() -> Self {
        let mut r = Self::new();
        r.function("strlen", |_vm, args| {
            let s = arg(&args, 0)?.to_php_string();
            Ok(Value::Int(s.len() as i64))
        });
        r.function("count", |_vm, args| match arg(&args, 0)?.deref_clone() {
            Value::Array(a) => Ok(Value::Int(a.len() as i64)),
            other => Err(RuntimeError::TypeError(format!("count(): argument must be of type array, {} given", other.type_name()))),
        });
        r.function("gettype", |_vm, args| Ok(Value::Str(arg(&args, 0)?.deref_clone().type_name().to_string())));
        r.function("intval", |_vm, args| Ok(Value::Int(arg(&args, 0)?.to_int())));
        r.function("floatval", |_vm, args| Ok(Value::Float(arg(&args, 0)?.to_float())));
        r.function("strval", |_vm, args| Ok(Value::Str(arg(&args, 0)?.to_php_string())));
        r.function("boolval", |_vm, args| Ok(Value::Bool(arg(&args, 0)?.to_bool())));
        r.function("is_array", |_vm, args| Ok(Value::Bool(matches!(arg(&args, 0)?.deref_clone(), Value::Array(_)))));
        r.function("is_string", |_vm, args| Ok(Value::Bool(matches!(arg(&args, 0)?.deref_clone(), Value::Str(_)))));
        r.function("is_int", |_vm, args| Ok(Value::Bool(matches!(arg(&args, 0)?.deref_clone(), Value::Int(_)))));
        r.function("is_float", |_vm, args| Ok(Value::Bool(matches!(arg(&args, 0)?.deref_clone(), Value::Float(_)))));
        r.function("is_bool", |_vm, args| Ok(Value::Bool(matches!(arg(&args, 0)?.deref_clone(), Value::Bool(_)))));
        r.function("is_null", |_vm, args| Ok(Value::Bool(arg(&args, 0)?.deref_clone().is_null())));
        r.function("is_callable", |_vm, args| {
            Ok(Value::Bool(matches!(arg(&args, 0)?.deref_clone(), Value::Closure(_) | Value::Str(_))))
        });
        r.function("array_keys", |_vm, args| {
            let arr = expect_array(&args, 0)?;
            Ok(Value::Array(PhpArray::from_pairs(arr.keys().into_iter().map(|k| (None, key_to_value(&k))).collect())))
        });
        r.function("array_values", |_vm, args| {
            let arr = expect_array(&args, 0)?;
            Ok(Value::Array(PhpArray::from_pairs(arr.iter().map(|(_, v)| (None, v.clone())).collect())))
        });
        r.function("in_array", |_vm, args| {
            let needle = arg(&args, 0)?.deref_clone();
            let arr = expect_array(&args, 1)?;
            let found = arr.iter().any(|(_, v)| v.loose_eq(&needle));
            Ok(Value::Bool(found))
        });
        r.function("array_key_exists", |_vm, args| {
            let key = key_from_value(&arg(&args, 0)?.deref_clone());
            let arr = expect_array(&args, 1)?;
            Ok(Value::Bool(arr.contains_key(&key)))
        });
        r.function("implode", |_vm, args| {
            let (sep, arr) = if args.len() == 1 {
                (String::new(), expect_array(&args, 0)?)
            } else {
                (arg(&args, 0)?.to_php_string(), expect_array(&args, 1)?)
            };
            let parts: Vec<String> = arr.iter().map(|(_, v)| v.to_php_string()).collect();
            Ok(Value::Str(parts.join(&sep)))
        });
        r.function("explode", |_vm, args| {
            let sep = arg(&args, 0)?.to_php_string();
            let subject = arg(&args, 1)?.to_php_string();
            if sep.is_empty() {
                return Err(RuntimeError::InvalidArgument("explode(): separator must not be empty".into()));
            }
            let pairs = subject.split(sep.as_str()).map(|p| (None, Value::Str(p.to_string()))).collect();
            Ok(Value::Array(PhpArray::from_pairs(pairs)))
        });
        r.function("str_repeat", |_vm, args| {
            let s = arg(&args, 0)?.to_php_string();
            let times = arg(&args, 1)?.to_int().max(0) as usize;
            Ok(Value::Str(s.repeat(times)))
        });
        r.function("strtoupper", |_vm, args| Ok(Value::Str(arg(&args, 0)?.to_php_string().to_uppercase())));
        r.function("strtolower", |_vm, args| Ok(Value::Str(arg(&args, 0)?.to_php_string().to_lowercase())));
        r.function("trim", |_vm, args| Ok(Value::Str(arg(&args, 0)?.to_php_string().trim().to_string())));
        r.function("array_map", |vm, mut args| {
            if args.len() != 2 {
                return Err(RuntimeError::InvalidArgument("array_map(): expected 2 arguments".into()));
            }
            let arr = args.pop().unwrap().deref_clone();
            let callback = args.pop().unwrap();
            let Value::Array(arr) = arr else {
                return Err(RuntimeError::TypeError("array_map(): second argument must be an array".into()));
            };
            let mut mapped = PhpArray::new();
            for (key, value) in arr.iter() {
                let result = call_closure_value(vm, &callback, vec![value.clone()])?;
                mapped.insert(key.clone(), result);
            }
            Ok(Value::Array(mapped))
        });
        r.function("array_filter", |vm, mut args| {
            if args.is_empty() || args.len() > 2 {
                return Err(RuntimeError::InvalidArgument("array_filter(): expected 1 or 2 arguments".into()));
            }
            let callback = if args.len() == 2 { Some(args.pop().unwrap()) } else { None };
            let Value::Array(arr) = args.pop().unwrap().deref_clone() else {
                return Err(RuntimeError::TypeError("array_filter(): first argument must be an array".into()));
            };
            let mut kept = PhpArray::new();
            for (key, value) in arr.iter() {
                let keep = match &callback {
                    Some(cb) => call_closure_value(vm, cb, vec![value.clone()])?.to_bool(),
                    None => value.to_bool(),
                };
                if keep {
                    kept.insert(key.clone(), value.clone());
                }
            }
            Ok(Value::Array(kept))
        });
        r.function("array_reduce", |vm, mut args| {
            if args.len() < 2 || args.len() > 3 {
                return Err(RuntimeError::InvalidArgument("array_reduce(): expected 2 or 3 arguments".into()));
            }
            let initial = if args.len() == 3 { args.pop().unwrap() } else { Value::Null };
            let callback = args.pop().unwrap();
            let Value::Array(arr) = args.pop().unwrap().deref_clone() else {
                return Err(RuntimeError::TypeError("array_reduce(): first argument must be an array".into()));
            };
            let mut carry = initial;
            for (_, value) in arr.iter() {
                carry = call_closure_value(vm, &callback, vec![carry, value.clone()])?;
            }
            Ok(carry)
        });
        r
    }

    /// Register a single builtin. Overwrites any existing entry of the
    /// same name, so a host can shadow a default with its own behavior.
    pub fn function<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&mut VM<'_>, Vec<Value>) -> RuntimeResult<Value> + 'static,
    {
        self.functions.insert(name.to_string(), Rc::new(f));
        self
    }

    /// Move every registered function into `ctx`, overwriting whatever the
    /// context already had by that name.
    pub fn install(self, ctx: &mut ExecutionContext) {
        ctx.natives.extend(self.functions);
    }
}

fn arg(args: &[Value], idx: usize) -> RuntimeResult<Value> {
    args.get(idx)
        .cloned()
        .ok_or_else(|| RuntimeError::InvalidArgument(format!("missing argument {idx}")))
}

fn expect_array(args: &[Value], idx: usize) -> RuntimeResult<PhpArray> {
    match arg(args, idx)?.deref_clone() {
        Value::Array(a) => Ok(a),
        other => Err(RuntimeError::TypeError(format!("expected array, got {}", other.type_name()))),
    }
}

fn key_to_value(key: &ArrayKey) -> Value {
    match key {
        ArrayKey::Integer(n) => Value::Int(*n),
        ArrayKey::String(s) => Value::Str(s.clone()),
    }
}

fn key_from_value(value: &Value) -> ArrayKey {
    match value {
        Value::Int(n) => ArrayKey::Integer(*n),
        other => ArrayKey::normalize_str(&other.to_php_string()),
    }
}

/// `include`/`include_once`/`require`/`require_once`, desugared by the
/// compiler into `__include($path, $isRequire, $once)`. Resolving `$path`
/// to compiled bytecode is the host's job via
/// [`crate::vm::ExecutionContext::include_callback`]; this just applies
/// `include_once` bookkeeping and the require-vs-include failure severity,
/// then re-enters the VM on the resolved function against the same
/// context so top-level declarations and globals in the included file
/// land in the caller's world.
fn native_include(vm: &mut VM<'_>, args: Vec<Value>) -> RuntimeResult<Value> {
    if args.len() != 3 {
        return Err(RuntimeError::Internal("__include called with wrong argument count".into()));
    }
    let path = args[0].to_php_string();
    let is_require = args[1].to_bool();
    let once = args[2].to_bool();

    if once && vm.ctx.included_once.contains(&path) {
        return Ok(Value::Bool(true));
    }

    let resolved = match vm.ctx.include_callback.as_mut() {
        Some(callback) => callback(&path),
        None => return Err(RuntimeError::NoIncludeCallback),
    };
    let function = match resolved {
        Some(f) => f,
        None if is_require => return Err(RuntimeError::IncludeFailed(path)),
        None => {
            log::warn!("include({path}): failed to resolve, continuing");
            return Ok(Value::Bool(false));
        }
    };

    vm.ctx.included_once.insert(path);
    vm.call(function, Vec::new())
}
