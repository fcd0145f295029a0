//! Program-level compilation: hoists every top-level function, class,
//! interface, trait, and enum declaration into its own compiled table and
//! lowers what remains into the program's `{main}` entry point.
//!
//! [`builder::FunctionBuilder`] only ever lowers one body at a time; this
//! module walks the declaration tree, resolves trait composition, folds
//! class/interface constant expressions, and threads a [`ClassScope`] into
//! each method builder so `self`/`parent`/`static` resolve correctly.

mod builder;

use crate::ast::*;
use crate::decl::{
    self, CompiledClass, CompiledEnum, CompiledEnumCase, CompiledInterface, CompiledMethod, CompiledProperty, CompiledTrait, EnumBacking,
};
use crate::error::{CompileError, CompileResult};
use crate::opcode::{Constant, FunctionRef, Instruction};
use builder::{ClassScope, FunctionBuilder};
use std::collections::HashMap;
use std::rc::Rc;

/// Everything a compiled program needs at runtime: the entry-point body
/// plus every declaration table the execution context installs.
#[derive(Default)]
pub struct CompilationUnit {
    pub main: Option<FunctionRef>,
    pub functions: HashMap<String, FunctionRef>,
    pub classes: HashMap<String, Rc<CompiledClass>>,
    pub interfaces: HashMap<String, Rc<CompiledInterface>>,
    pub traits: HashMap<String, Rc<CompiledTrait>>,
    pub enums: HashMap<String, Rc<CompiledEnum>>,
}

#[derive(Default)]
pub struct Compiler {
    unit: CompilationUnit,
}

pub fn new_compiler() -> Compiler {
    Compiler::default()
}

impl Compiler {
    /// Compile `program`, populating every declaration table and the
    /// `{main}` entry point. Declarations may appear in any order relative
    /// to the statements that use them (PHP itself hoists top-level
    /// functions and classes); only traits must precede the classes that
    /// `use` them, which this method's compile order guarantees.
    pub fn compile(&mut self, program: &Program) -> CompileResult<()> {
        let mut traits = Vec::new();
        let mut interfaces = Vec::new();
        let mut classes = Vec::new();
        let mut enums = Vec::new();
        let mut functions = Vec::new();
        let mut main_body = Vec::new();
        bucket_statements(&program.statements, &mut traits, &mut interfaces, &mut classes, &mut enums, &mut functions, &mut main_body);

        for t in &traits {
            self.compile_trait(t)?;
        }
        for i in &interfaces {
            self.compile_interface(i)?;
        }
        for c in &classes {
            self.compile_class(c)?;
        }
        for e in &enums {
            self.compile_enum(e)?;
        }
        for f in &functions {
            self.compile_function(f)?;
        }

        let no_class_scope = ClassScope { class_name: None, has_parent: false };
        let mut main = FunctionBuilder::new("{main}", &no_class_scope);
        main.compile_body(&main_body)?;
        self.unit.main = Some(main.finish(false));
        Ok(())
    }

    pub fn bytecode(&self) -> &[Instruction] {
        self.unit.main.as_ref().map(|f| f.code.as_slice()).unwrap_or(&[])
    }

    pub fn constants(&self) -> &[Constant] {
        self.unit.main.as_ref().map(|f| f.constants.as_slice()).unwrap_or(&[])
    }

    pub fn functions(&self) -> &HashMap<String, FunctionRef> {
        &self.unit.functions
    }

    pub fn classes(&self) -> &HashMap<String, Rc<CompiledClass>> {
        &self.unit.classes
    }

    pub fn interfaces(&self) -> &HashMap<String, Rc<CompiledInterface>> {
        &self.unit.interfaces
    }

    pub fn traits(&self) -> &HashMap<String, Rc<CompiledTrait>> {
        &self.unit.traits
    }

    pub fn enums(&self) -> &HashMap<String, Rc<CompiledEnum>> {
        &self.unit.enums
    }

    pub fn main_function(&self) -> Option<&FunctionRef> {
        self.unit.main.as_ref()
    }

    /// Hand the whole unit to the caller (the `lib.rs` entry point wires
    /// these tables into a fresh `ExecutionContext`).
    pub fn into_unit(self) -> CompilationUnit {
        self.unit
    }

    fn compile_function(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let Stmt::Function { name, params, body, by_ref_return, .. } = stmt else {
            unreachable!("bucket_statements only places Stmt::Function here")
        };
        if self.unit.functions.contains_key(name) {
            return Err(CompileError::DuplicateFunction(name.clone()));
        }
        let scope = ClassScope { class_name: None, has_parent: false };
        let mut b = FunctionBuilder::new(name.clone(), &scope);
        b.compile_params(params)?;
        b.compile_body(body)?;
        self.unit.functions.insert(name.clone(), b.finish(*by_ref_return));
        Ok(())
    }

    fn compile_trait(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let Stmt::Trait { name, uses: _, properties, methods } = stmt else {
            unreachable!("bucket_statements only places Stmt::Trait here")
        };
        let mut compiled = CompiledTrait { name: name.clone(), ..Default::default() };
        let mut resolved_consts = Vec::new();
        for prop in properties {
            compiled.properties.push(self.compile_property(prop, name, &mut resolved_consts)?);
        }
        for m in methods {
            let mut method = self.compile_method(name, false, m)?;
            method.declared_in = Some(name.clone());
            compiled.methods.insert(m.name.to_ascii_lowercase(), method);
        }
        self.unit.traits.insert(name.clone(), Rc::new(compiled));
        Ok(())
    }

    fn compile_interface(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let Stmt::Interface { name, parents, methods, constants } = stmt else {
            unreachable!("bucket_statements only places Stmt::Interface here")
        };
        let mut resolved_consts = Vec::new();
        for c in constants {
            let value = fold_const_expr(&c.value, &resolved_consts)
                .ok_or_else(|| CompileError::MalformedMatch(format!("{name}::{}: not a constant expression", c.name)))?;
            resolved_consts.push((c.name.clone(), value));
        }
        let compiled = CompiledInterface {
            name: name.clone(),
            parents: parents.iter().map(qualified_simple_name).collect(),
            constants: resolved_consts,
            method_names: methods.iter().map(|m| m.name.clone()).collect(),
        };
        self.unit.interfaces.insert(name.clone(), Rc::new(compiled));
        Ok(())
    }

    fn compile_class(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let Stmt::Class {
            name,
            is_abstract,
            is_final,
            readonly: class_readonly,
            parent,
            interfaces,
            trait_uses,
            constants,
            properties,
            methods,
        } = stmt
        else {
            unreachable!("bucket_statements only places Stmt::Class here")
        };

        let parent_name = parent.as_ref().map(qualified_simple_name);
        let has_parent = parent_name.is_some();

        let (mut flat_methods, mut flat_properties) = self.flatten_traits(name, trait_uses)?;

        let mut resolved_consts = Vec::new();
        for c in constants {
            let value = fold_const_expr(&c.value, &resolved_consts)
                .ok_or_else(|| CompileError::MalformedMatch(format!("{name}::{}: not a constant expression", c.name)))?;
            resolved_consts.push((c.name.clone(), value));
        }

        for prop in properties {
            let compiled = self.compile_property(prop, name, &mut resolved_consts)?;
            flat_properties.retain(|p| p.name != compiled.name);
            flat_properties.push(compiled);
            if *class_readonly {
                if let Some(p) = flat_properties.last_mut() {
                    p.readonly = true;
                }
            }
        }

        for m in methods {
            let is_ctor = m.name.eq_ignore_ascii_case("__construct");
            let method = self.compile_method_in_class(name, has_parent, is_ctor, m)?;
            if is_ctor {
                for p in &m.params {
                    if let Some(vis) = p.promote_visibility {
                        flat_properties.retain(|existing| existing.name != p.name);
                        flat_properties.push(CompiledProperty {
                            name: p.name.clone(),
                            visibility: vis,
                            readonly: p.promote_readonly || *class_readonly,
                            is_static: false,
                            default: None,
                            has_runtime_default: false,
                        });
                    }
                }
            }
            flat_methods.insert(m.name.to_ascii_lowercase(), method);
        }

        let compiled = CompiledClass {
            name: name.clone(),
            parent: parent_name,
            interfaces: interfaces.iter().map(qualified_simple_name).collect(),
            is_abstract: *is_abstract,
            is_final: *is_final,
            constants: resolved_consts,
            properties: flat_properties,
            methods: flat_methods,
        };
        self.unit.classes.insert(name.clone(), Rc::new(compiled));
        Ok(())
    }

    fn compile_enum(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let Stmt::Enum { name, backing_type, implements, cases, constants, methods } = stmt else {
            unreachable!("bucket_statements only places Stmt::Enum here")
        };

        let backing = match backing_type {
            EnumBackingType::None => None,
            EnumBackingType::Int => Some(EnumBacking::Int),
            EnumBackingType::String => Some(EnumBacking::String),
        };

        let mut resolved_consts = Vec::new();
        for c in constants {
            let value = fold_const_expr(&c.value, &resolved_consts)
                .ok_or_else(|| CompileError::MalformedMatch(format!("{name}::{}: not a constant expression", c.name)))?;
            resolved_consts.push((c.name.clone(), value));
        }

        let mut compiled_cases = Vec::new();
        for case in cases {
            let backing_value = match &case.value {
                Some(e) => Some(
                    fold_const_expr(e, &resolved_consts)
                        .ok_or_else(|| CompileError::MalformedMatch(format!("{name}::{}: case value must be constant", case.name)))?,
                ),
                None => None,
            };
            compiled_cases.push(CompiledEnumCase { name: case.name.clone(), backing_value });
        }

        let mut compiled_methods = HashMap::new();
        for m in methods {
            let method = self.compile_method_in_class(name, false, false, m)?;
            compiled_methods.insert(m.name.to_ascii_lowercase(), method);
        }

        let compiled = CompiledEnum {
            name: name.clone(),
            backing,
            implements: implements.iter().map(qualified_simple_name).collect(),
            cases: compiled_cases,
            constants: resolved_consts,
            methods: compiled_methods,
        };
        self.unit.enums.insert(name.clone(), Rc::new(compiled));
        Ok(())
    }

    fn flatten_traits(
        &self,
        class_name: &str,
        trait_uses: &[TraitUse],
    ) -> CompileResult<(HashMap<String, CompiledMethod>, Vec<CompiledProperty>)> {
        if trait_uses.is_empty() {
            return Ok((HashMap::new(), Vec::new()));
        }

        let mut trait_names = Vec::new();
        let mut insteadof = Vec::new();
        let mut aliases = Vec::new();
        for tu in trait_uses {
            for t in &tu.traits {
                if !trait_names.contains(t) {
                    trait_names.push(t.clone());
                }
            }
            for r in &tu.resolutions {
                match r {
                    TraitResolution::InsteadOf { trait_name, method, excluded_traits } => {
                        insteadof.push((method.clone(), trait_name.clone(), excluded_traits.clone()));
                    }
                    TraitResolution::Alias { trait_name, method, alias, visibility } => {
                        aliases.push((trait_name.clone(), method.clone(), alias.clone(), *visibility));
                    }
                }
            }
        }

        let mut traits = Vec::new();
        for t in &trait_names {
            let found = self
                .unit
                .traits
                .get(t)
                .ok_or_else(|| CompileError::TraitConflict(format!("{class_name}: unknown trait {t}")))?;
            traits.push((**found).clone());
        }

        decl::resolve_trait_uses(class_name, &traits, &insteadof, &aliases).map_err(CompileError::TraitConflict)
    }

    fn compile_property(&self, prop: &Property, class_name: &str, resolved_consts: &mut Vec<(String, Constant)>) -> CompileResult<CompiledProperty> {
        let _ = class_name;
        let default = match &prop.default {
            Some(e) => fold_const_expr(e, resolved_consts),
            None => None,
        };
        Ok(CompiledProperty {
            name: prop.name.clone(),
            visibility: prop.visibility,
            readonly: prop.readonly,
            is_static: prop.is_static,
            has_runtime_default: prop.default.is_some() && default.is_none(),
            default,
        })
    }

    fn compile_method(&self, class_name: &str, has_parent: bool, m: &Method) -> CompileResult<CompiledMethod> {
        self.compile_method_in_class(class_name, has_parent, m.name.eq_ignore_ascii_case("__construct"), m)
    }

    fn compile_method_in_class(&self, class_name: &str, has_parent: bool, is_ctor: bool, m: &Method) -> CompileResult<CompiledMethod> {
        let function = if m.is_abstract {
            None
        } else {
            let scope = ClassScope { class_name: Some(class_name), has_parent };
            let mut b = FunctionBuilder::new(format!("{class_name}::{}", m.name), &scope);
            b.compile_params(&m.params)?;
            if is_ctor {
                b.compile_promoted_params(&m.params);
            }
            b.compile_body(&m.body)?;
            Some(b.finish(false))
        };
        Ok(CompiledMethod {
            name: m.name.clone(),
            visibility: m.visibility,
            is_static: m.is_static,
            is_abstract: m.is_abstract,
            function,
            declared_in: None,
        })
    }
}

fn qualified_simple_name(qn: &QualifiedName) -> String {
    qn.last().cloned().unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn bucket_statements<'a>(
    statements: &'a [Stmt],
    traits: &mut Vec<&'a Stmt>,
    interfaces: &mut Vec<&'a Stmt>,
    classes: &mut Vec<&'a Stmt>,
    enums: &mut Vec<&'a Stmt>,
    functions: &mut Vec<&'a Stmt>,
    main_body: &mut Vec<Stmt>,
) {
    for stmt in statements {
        match stmt {
            Stmt::Function { .. } => functions.push(stmt),
            Stmt::Class { .. } => classes.push(stmt),
            Stmt::Interface { .. } => interfaces.push(stmt),
            Stmt::Trait { .. } => traits.push(stmt),
            Stmt::Enum { .. } => enums.push(stmt),
            Stmt::Namespace { body: Some(body), .. } => {
                bucket_statements(body, traits, interfaces, classes, enums, functions, main_body)
            }
            Stmt::Declare { body: Some(body), .. } => {
                bucket_statements(body, traits, interfaces, classes, enums, functions, main_body)
            }
            other => main_body.push(other.clone()),
        }
    }
}

/// Fold a class/interface constant or property-default expression to a
/// scalar `Constant`, following `self::OTHER` references against constants
/// already resolved earlier in the same declaration. Anything not a pure
/// scalar expression (a function call, a `new`, an array literal — the
/// constant pool has no array representation) returns `None`, which the
/// caller treats as either a compile error (class/interface constants must
/// fold) or a runtime-computed default (property defaults).
fn fold_const_expr(expr: &Expr, resolved: &[(String, Constant)]) -> Option<Constant> {
    match expr {
        Expr::Integer(n) => Some(Constant::Int(*n)),
        Expr::Float(f) => Some(Constant::Float(*f)),
        Expr::String(s) => Some(Constant::Str(s.clone())),
        Expr::Bool(b) => Some(Constant::Bool(*b)),
        Expr::Null => Some(Constant::Null),
        Expr::Grouped(inner) => fold_const_expr(inner, resolved),
        Expr::Unary { op, expr } => fold_unary(*op, fold_const_expr(expr, resolved)?),
        Expr::Binary { left, op, right } => fold_binary(*op, fold_const_expr(left, resolved)?, fold_const_expr(right, resolved)?),
        Expr::Ternary { condition, then_expr, else_expr } => {
            let cond = fold_const_expr(condition, resolved)?;
            if const_truthy(&cond) {
                match then_expr {
                    Some(e) => fold_const_expr(e, resolved),
                    None => Some(cond),
                }
            } else {
                fold_const_expr(else_expr, resolved)
            }
        }
        Expr::ClassConstAccess { class: ClassRef::SelfType, constant } => {
            resolved.iter().find(|(n, _)| n == constant).map(|(_, v)| v.clone())
        }
        Expr::Array(elements) => {
            let mut folded = Vec::with_capacity(elements.len());
            for el in elements {
                let key = match &el.key {
                    Some(k) => Some(fold_const_expr(k, resolved)?),
                    None => None,
                };
                let value = fold_const_expr(&el.value, resolved)?;
                folded.push((key, value));
            }
            Some(Constant::Array(folded))
        }
        _ => None,
    }
}

fn const_truthy(c: &Constant) -> bool {
    match c {
        Constant::Null => false,
        Constant::Bool(b) => *b,
        Constant::Int(n) => *n != 0,
        Constant::Float(f) => *f != 0.0,
        Constant::Str(s) => !s.is_empty() && s != "0",
        Constant::Array(elements) => !elements.is_empty(),
    }
}

fn const_to_f64(c: &Constant) -> Option<f64> {
    match c {
        Constant::Int(n) => Some(*n as f64),
        Constant::Float(f) => Some(*f),
        Constant::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn const_to_i64(c: &Constant) -> Option<i64> {
    match c {
        Constant::Int(n) => Some(*n),
        Constant::Bool(b) => Some(if *b { 1 } else { 0 }),
        _ => None,
    }
}

fn fold_unary(op: UnaryOp, v: Constant) -> Option<Constant> {
    match op {
        UnaryOp::Neg => match v {
            Constant::Int(n) => Some(Constant::Int(-n)),
            Constant::Float(f) => Some(Constant::Float(-f)),
            other => const_to_f64(&other).map(Constant::Float),
        },
        UnaryOp::Plus => match v {
            Constant::Int(_) | Constant::Float(_) => Some(v),
            other => const_to_f64(&other).map(Constant::Float),
        },
        UnaryOp::Not => Some(Constant::Bool(!const_truthy(&v))),
        UnaryOp::BitNot => const_to_i64(&v).map(|n| Constant::Int(!n)),
        UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => None,
    }
}

fn fold_binary(op: BinaryOp, l: Constant, r: Constant) -> Option<Constant> {
    use BinaryOp::*;
    if let Concat = op {
        return Some(Constant::Str(format!("{}{}", const_to_display(&l), const_to_display(&r))));
    }
    if let NullCoalesce = op {
        return Some(if matches!(l, Constant::Null) { r } else { l });
    }
    match op {
        And => return Some(Constant::Bool(const_truthy(&l) && const_truthy(&r))),
        Or => return Some(Constant::Bool(const_truthy(&l) || const_truthy(&r))),
        Xor => return Some(Constant::Bool(const_truthy(&l) != const_truthy(&r))),
        _ => {}
    }
    if matches!(op, Equal | NotEqual | LessThan | GreaterThan | LessEqual | GreaterEqual | Spaceship | Identical | NotIdentical) {
        let lf = const_to_f64(&l);
        let rf = const_to_f64(&r);
        return match (op, lf, rf) {
            (Equal, Some(a), Some(b)) => Some(Constant::Bool(a == b)),
            (NotEqual, Some(a), Some(b)) => Some(Constant::Bool(a != b)),
            (LessThan, Some(a), Some(b)) => Some(Constant::Bool(a < b)),
            (GreaterThan, Some(a), Some(b)) => Some(Constant::Bool(a > b)),
            (LessEqual, Some(a), Some(b)) => Some(Constant::Bool(a <= b)),
            (GreaterEqual, Some(a), Some(b)) => Some(Constant::Bool(a >= b)),
            (Spaceship, Some(a), Some(b)) => Some(Constant::Int(if a < b { -1 } else if a > b { 1 } else { 0 })),
            (Identical, _, _) => Some(Constant::Bool(constants_identical(&l, &r))),
            (NotIdentical, _, _) => Some(Constant::Bool(!constants_identical(&l, &r))),
            _ => None,
        };
    }
    // Arithmetic / bitwise: Int + Int stays Int, anything else promotes to Float.
    match op {
        Add | Sub | Mul | Div | Mod | Pow => {
            if let (Some(a), Some(b)) = (const_to_i64(&l), const_to_i64(&r)) {
                if matches!(l, Constant::Int(_)) && matches!(r, Constant::Int(_)) {
                    return match op {
                        Add => Some(Constant::Int(a.wrapping_add(b))),
                        Sub => Some(Constant::Int(a.wrapping_sub(b))),
                        Mul => Some(Constant::Int(a.wrapping_mul(b))),
                        Div if b != 0 && a % b == 0 => Some(Constant::Int(a / b)),
                        Div if b != 0 => Some(Constant::Float(a as f64 / b as f64)),
                        Mod if b != 0 => Some(Constant::Int(a % b)),
                        Pow => Some(Constant::Int(a.pow(b.max(0) as u32))),
                        _ => None,
                    };
                }
            }
            let a = const_to_f64(&l)?;
            let b = const_to_f64(&r)?;
            match op {
                Add => Some(Constant::Float(a + b)),
                Sub => Some(Constant::Float(a - b)),
                Mul => Some(Constant::Float(a * b)),
                Div if b != 0.0 => Some(Constant::Float(a / b)),
                Mod if b != 0.0 => Some(Constant::Float(a % b)),
                Pow => Some(Constant::Float(a.powf(b))),
                _ => None,
            }
        }
        BitAnd | BitOr | BitXor | ShiftLeft | ShiftRight => {
            let a = const_to_i64(&l)?;
            let b = const_to_i64(&r)?;
            match op {
                BitAnd => Some(Constant::Int(a & b)),
                BitOr => Some(Constant::Int(a | b)),
                BitXor => Some(Constant::Int(a ^ b)),
                ShiftLeft => Some(Constant::Int(a << b)),
                ShiftRight => Some(Constant::Int(a >> b)),
                _ => None,
            }
        }
        _ => None,
    }
}

fn constants_identical(l: &Constant, r: &Constant) -> bool {
    match (l, r) {
        (Constant::Null, Constant::Null) => true,
        (Constant::Bool(a), Constant::Bool(b)) => a == b,
        (Constant::Int(a), Constant::Int(b)) => a == b,
        (Constant::Float(a), Constant::Float(b)) => a == b,
        (Constant::Str(a), Constant::Str(b)) => a == b,
        _ => false,
    }
}

fn const_to_display(c: &Constant) -> String {
    match c {
        Constant::Null => String::new(),
        Constant::Bool(b) => if *b { "1" } else { "" }.to_string(),
        Constant::Int(n) => n.to_string(),
        Constant::Float(f) => f.to_string(),
        Constant::Str(s) => s.clone(),
        Constant::Array(_) => "Array".to_string(),
    }
}
