//! Compile-and-execute core for a standalone PHP implementation.
//!
//! This crate takes an already-parsed [`ast::Program`] — lexing and
//! parsing PHP source text is the host's job — and provides:
//!
//! - [`compiler`]: lowers the AST into the bytecode IR in [`opcode`],
//!   resolving trait composition, constant folding, and closure capture
//!   along the way.
//! - [`vm`]: a stack-based virtual machine that executes that IR against
//!   an [`vm::ExecutionContext`], with full PHP value semantics — aliasing,
//!   exceptions with `finally`, classes, generators, and the cooperative
//!   concurrency layer in [`concurrency`].
//! - [`registry`]: the host's hook for installing built-in functions and
//!   classes the compiled program can call into.

pub mod ast;
pub mod compiler;
pub mod concurrency;
pub mod decl;
pub mod error;
pub mod opcode;
pub mod registry;
pub mod value;
pub mod vm;

use ast::Program;
use error::{CompileError, CompileResult, RuntimeError, RuntimeResult};
use std::io::Write;
use vm::{ExecutionContext, VM};

/// Compile `program`, returning the populated compilation unit (entry
/// point bytecode plus every declaration table) or the first compile
/// error encountered.
pub fn new_compiler() -> compiler::Compiler {
    compiler::new_compiler()
}

pub fn compile(program: &Program) -> CompileResult<compiler::CompilationUnit> {
    let mut c = new_compiler();
    c.compile(program).map_err(|e| {
        log::debug!("compile failed: {e}");
        e
    })?;
    Ok(c.into_unit())
}

/// Build a fresh execution context writing program output to `output`,
/// with the registry's default built-ins already installed.
pub fn new_execution_context(output: Box<dyn Write>) -> ExecutionContext {
    let mut ctx = ExecutionContext::new(output);
    registry::Registry::with_defaults().install(&mut ctx);
    ctx
}

pub fn set_output_writer(ctx: &mut ExecutionContext, output: Box<dyn Write>) {
    ctx.output = output;
}

pub fn set_include_callback(ctx: &mut ExecutionContext, callback: Box<dyn FnMut(&str) -> Option<opcode::FunctionRef>>) {
    ctx.include_callback = Some(callback);
}

/// Install a compiled unit's declarations into a context and run its
/// `{main}` body to completion, draining any goroutines spawned along the
/// way before returning.
pub fn execute(unit: &compiler::CompilationUnit, ctx: &mut ExecutionContext) -> RuntimeResult<value::Value> {
    for (name, f) in &unit.functions {
        ctx.functions.insert(name.clone(), f.clone());
    }
    for (name, c) in &unit.classes {
        ctx.classes.insert(name.clone(), c.clone());
    }
    for (name, i) in &unit.interfaces {
        ctx.interfaces.insert(name.clone(), i.clone());
    }
    for (name, t) in &unit.traits {
        ctx.traits.insert(name.clone(), t.clone());
    }
    for (name, e) in &unit.enums {
        ctx.enums.insert(name.clone(), e.clone());
    }

    let main = unit.main.clone().ok_or_else(|| RuntimeError::Internal("program has no compiled entry point".into()))?;
    let mut machine = VM::new(ctx);
    let result = machine.call(main, Vec::new());
    if let Err(ref e) = result {
        log::warn!("program execution failed: {e}");
    }
    let result = result?;
    concurrency::drain_all(&mut machine)?;
    Ok(result)
}

/// Compile and run `program` in one step; the common case for a host that
/// doesn't need to cache compiled bytecode across runs.
pub fn run(program: &Program, output: Box<dyn Write>) -> Result<value::Value, RunError> {
    let unit = compile(program)?;
    let mut ctx = new_execution_context(output);
    Ok(execute(&unit, &mut ctx)?)
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
