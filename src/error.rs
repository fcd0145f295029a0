//! Error types surfaced across compilation and execution.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("undefined variable: ${0}")]
    UndefinedVariable(String),
    #[error("cannot redeclare function {0}")]
    DuplicateFunction(String),
    #[error("cannot redeclare class {0}")]
    DuplicateClass(String),
    #[error("'break' or 'continue' {0} levels exceeds nesting depth of {1}")]
    InvalidJumpDepth(u32, u32),
    #[error("'goto' to undefined label {0}")]
    UndefinedLabel(String),
    #[error("goto into a loop or try block is not allowed (label {0})")]
    IllegalGotoTarget(String),
    #[error("class {0} not found")]
    UnknownClass(String),
    #[error("trait resolution error: {0}")]
    TraitConflict(String),
    #[error("'{0}' can only be used inside a class")]
    OutsideClassContext(&'static str),
    #[error("cannot use 'parent' in class without a parent")]
    NoParentClass,
    #[error("'yield' outside a function body")]
    YieldOutsideFunction,
    #[error("malformed match: {0}")]
    MalformedMatch(String),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("call to undefined function {0}()")]
    UndefinedFunction(String),
    #[error("call to undefined method {1}::{0}()")]
    UndefinedMethod(String, String),
    #[error("class \"{0}\" not found")]
    ClassNotFound(String),
    #[error("uncaught {class}: {message}")]
    Uncaught { class: String, message: String },
    #[error("{0}")]
    TypeError(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("attempt to read property \"{0}\" on null")]
    PropertyAccessOnNull(String),
    #[error("attempt to assign property \"{0}\" on {1}")]
    PropertyAssignOnNonObject(String, &'static str),
    #[error("cannot modify readonly property {0}::${1}")]
    ReadonlyPropertyModification(String, String),
    #[error("too few arguments to function {0}(), {1} passed, at least {2} expected")]
    TooFewArguments(String, usize, usize),
    #[error("include callback is not configured")]
    NoIncludeCallback,
    #[error("failed to open stream for include: {0}")]
    IncludeFailed(String),
    #[error("{0}")]
    CompileTimeInclude(#[from] Box<CompileError>),
    #[error("stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),
    #[error("deadlock: WaitGroup never reached zero")]
    Deadlock,
    #[error("{0}")]
    InvalidArgument(String),
    #[error("internal VM inconsistency: {0}")]
    Internal(String),
}

pub type CompileResult<T> = Result<T, CompileError>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
