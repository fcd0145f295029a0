//! AST node definitions consumed by the compiler.
//!
//! Lexing and parsing a PHP source file into this tree is the host's
//! responsibility; the core only ever walks an already-built [`Program`].

mod expr;
mod ops;
mod stmt;

pub use expr::{
    Argument, ArrayElement, ClassRef, ClosureUse, Expr, InterpSegment, ListElement, MagicConstant,
    MatchArm, MemberName,
};
pub use ops::{AssignOp, BinaryOp, CastKind, UnaryOp};
pub use stmt::{
    CatchClause, DeclareDirective, EnumBackingType, EnumCase, FunctionParam, InterfaceConstant,
    InterfaceMethodSignature, Method, Program, Property, QualifiedName, Stmt, SwitchCase,
    TraitResolution, TraitUse, TypeHint, Visibility,
};
