//! Lowers one function/method/closure body (a `Vec<Stmt>` plus its
//! parameter list) into a [`CompiledFunction`]. One `FunctionBuilder` per
//! body; nested closures and arrow functions get their own builder and are
//! folded into the parent's `nested_functions` table.

use crate::ast::*;
use crate::error::{CompileError, CompileResult};
use crate::opcode::{
    Addr, ClassRefOp, CompiledFunction, CompiledParam, Constant, ExceptionHandlerRange, FunctionRef, Instruction, Opcode,
};
use std::collections::HashMap;
use std::rc::Rc;

/// Lexical context a function body compiles against: the enclosing class (for
/// `self`/`parent`/`static`/property access) and the table of sibling
/// declarations a call or `new` might reference.
pub struct ClassScope<'a> {
    pub class_name: Option<&'a str>,
    pub has_parent: bool,
}

pub struct FunctionBuilder<'a> {
    name: String,
    code: Vec<Instruction>,
    constants: Vec<Constant>,
    handlers: Vec<ExceptionHandlerRange>,
    locals: Vec<String>,
    params: Vec<CompiledParam>,
    required_param_count: u32,
    is_variadic: bool,
    is_generator: bool,
    static_var_slots: Vec<(String, Option<Constant>)>,
    nested_functions: Vec<FunctionRef>,
    labels: HashMap<String, Addr>,
    pending_gotos: Vec<(usize, String, u32)>,
    /// Byte ranges of every loop/switch body closed so far (`[enter_idx,
    /// after)`), used by [`Self::resolve_gotos`] to reject a `goto` that
    /// jumps into one from outside — such a jump would land past the
    /// `EnterLoop` that sets up `frame.loops`, corrupting any `break`/
    /// `continue` still inside.
    loop_switch_ranges: Vec<(Addr, Addr)>,
    scope: &'a ClassScope<'a>,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(name: impl Into<String>, scope: &'a ClassScope<'a>) -> Self {
        Self {
            name: name.into(),
            code: Vec::new(),
            constants: Vec::new(),
            handlers: Vec::new(),
            locals: Vec::new(),
            params: Vec::new(),
            required_param_count: 0,
            is_variadic: false,
            is_generator: false,
            static_var_slots: Vec::new(),
            nested_functions: Vec::new(),
            labels: HashMap::new(),
            pending_gotos: Vec::new(),
            loop_switch_ranges: Vec::new(),
            scope,
        }
    }

    fn emit(&mut self, op: Opcode) -> usize {
        self.code.push(Instruction { op, line: 0 });
        self.code.len() - 1
    }

    fn addr(&self) -> Addr {
        self.code.len() as Addr
    }

    fn add_constant(&mut self, c: Constant) -> u32 {
        if let Some(pos) = self.constants.iter().position(|existing| existing == &c) {
            return pos as u32;
        }
        self.constants.push(c);
        self.constants.len() as u32 - 1
    }

    fn str_const(&mut self, s: impl Into<String>) -> u32 {
        self.add_constant(Constant::Str(s.into()))
    }

    fn local_slot(&mut self, name: &str) -> u32 {
        if let Some(pos) = self.locals.iter().position(|n| n == name) {
            return pos as u32;
        }
        self.locals.push(name.to_string());
        self.locals.len() as u32 - 1
    }

    /// Patch a previously-emitted jump-shaped opcode's target address.
    fn patch(&mut self, index: usize, target: Addr) {
        let op = &mut self.code[index].op;
        match op {
            Opcode::Jump(a)
            | Opcode::JumpIfFalse(a)
            | Opcode::JumpIfTrue(a)
            | Opcode::JumpIfFalseKeep(a)
            | Opcode::JumpIfTrueKeep(a)
            | Opcode::JumpIfNotNullKeep(a)
            | Opcode::IterValid(a)
            | Opcode::Goto(a) => *a = target,
            Opcode::EnterLoop { break_target, .. } => *break_target = target,
            other => panic!("patch() called on non-jump opcode {other:?}"),
        }
    }

    pub fn compile_params(&mut self, params: &[FunctionParam]) -> CompileResult<()> {
        let mut seen_optional = false;
        for p in params {
            let slot = self.local_slot(&p.name);
            debug_assert_eq!(slot as usize, self.params.len());
            let has_default = p.default.is_some();
            if has_default || p.is_variadic {
                seen_optional = true;
            } else if seen_optional {
                // A later required param after an optional one; PHP itself
                // forbids this, so treat it as still-required defensively.
            } else {
                self.required_param_count += 1;
            }
            self.is_variadic |= p.is_variadic;
            self.params.push(CompiledParam {
                name: p.name.clone(),
                by_ref: p.by_ref,
                is_variadic: p.is_variadic,
                has_default,
            });
        }
        Ok(())
    }

    /// Constructor property promotion (`public readonly int $x`): assign
    /// each promoted parameter into its same-named property before the
    /// body runs. Call after `compile_params`, before `compile_body`.
    pub fn compile_promoted_params(&mut self, params: &[FunctionParam]) {
        for p in params {
            if p.promote_visibility.is_none() {
                continue;
            }
            let slot = self.local_slot(&p.name);
            let name_const = self.str_const(p.name.clone());
            self.emit(Opcode::LoadThis);
            self.emit(Opcode::LoadLocal(slot));
            self.emit(Opcode::SetProperty(name_const));
            self.emit(Opcode::Pop);
        }
    }

    pub fn compile_body(&mut self, body: &[Stmt]) -> CompileResult<()> {
        for stmt in body {
            self.compile_stmt(stmt)?;
        }
        self.resolve_gotos()?;
        Ok(())
    }

    fn resolve_gotos(&mut self) -> CompileResult<()> {
        let pending = std::mem::take(&mut self.pending_gotos);
        for (idx, label, _levels) in pending {
            let target = self
                .labels
                .get(&label)
                .copied()
                .ok_or_else(|| CompileError::UndefinedLabel(label.clone()))?;
            let site = idx as Addr;
            for &(start, end) in &self.loop_switch_ranges {
                let lands_inside = target > start && target < end;
                let leaves_from_outside = site < start || site >= end;
                if lands_inside && leaves_from_outside {
                    return Err(CompileError::IllegalGotoTarget(label.clone()));
                }
            }
            self.patch(idx, target);
        }
        Ok(())
    }

    pub fn finish(self, by_ref_return: bool) -> FunctionRef {
        let mut function = CompiledFunction::new(self.name);
        function.code = self.code;
        function.constants = self.constants;
        function.handlers = self.handlers;
        function.local_count = self.locals.len() as u32;
        function.local_names = self.locals;
        function.params = self.params;
        function.required_param_count = self.required_param_count;
        function.is_variadic = self.is_variadic;
        function.is_generator = self.is_generator;
        function.by_ref_return = by_ref_return;
        function.static_var_slots = self.static_var_slots;
        function.nested_functions = self.nested_functions;
        Rc::new(function)
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn compile_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::Echo(exprs) => {
                for e in exprs {
                    self.compile_expr(e)?;
                    self.emit(Opcode::Echo);
                }
            }
            Stmt::Expression(e) => {
                self.compile_expr(e)?;
                self.emit(Opcode::Pop);
            }
            Stmt::Html(text) => {
                let idx = self.str_const(text.clone());
                self.emit(Opcode::PushConst(idx));
                self.emit(Opcode::Echo);
            }
            Stmt::If { condition, then_branch, elseif_branches, else_branch } => {
                self.compile_if(condition, then_branch, elseif_branches, else_branch)?;
            }
            Stmt::While { condition, body } => self.compile_while(condition, body)?,
            Stmt::DoWhile { body, condition } => self.compile_do_while(body, condition)?,
            Stmt::For { init, condition, update, body } => self.compile_for(init, condition, update, body)?,
            Stmt::Foreach { array, key, value, by_ref, body } => {
                self.compile_foreach(array, key.as_deref(), value, *by_ref, body)?
            }
            Stmt::Switch { expr, cases, default } => self.compile_switch(expr, cases, default)?,
            Stmt::Break(n) => {
                self.emit(Opcode::Break(*n));
            }
            Stmt::Continue(n) => {
                self.emit(Opcode::Continue(*n));
            }
            Stmt::Goto(label) => {
                let idx = self.emit(Opcode::Goto(0));
                self.pending_gotos.push((idx, label.clone(), 0));
            }
            Stmt::Label(name) => {
                self.labels.insert(name.clone(), self.addr());
            }
            Stmt::Return(value) => {
                match value {
                    Some(e) => self.compile_expr(e)?,
                    None => {
                        self.emit(Opcode::PushNull);
                    }
                }
                self.emit(Opcode::Return);
            }
            Stmt::TryCatch { try_body, catch_clauses, finally_body } => {
                self.compile_try(try_body, catch_clauses, finally_body)?;
            }
            Stmt::Throw(e) => {
                self.compile_expr(e)?;
                self.emit(Opcode::Throw);
            }
            Stmt::StaticVar(vars) => {
                for (name, default) in vars {
                    let const_idx = match default {
                        Some(Expr::Integer(n)) => Some(Constant::Int(*n)),
                        Some(Expr::Float(f)) => Some(Constant::Float(*f)),
                        Some(Expr::String(s)) => Some(Constant::Str(s.clone())),
                        Some(Expr::Bool(b)) => Some(Constant::Bool(*b)),
                        Some(Expr::Null) => Some(Constant::Null),
                        _ => None,
                    };
                    self.static_var_slots.push((name.clone(), const_idx));
                    let name_idx = self.str_const(name.clone());
                    let slot = self.local_slot(name);
                    self.emit(Opcode::BindStaticVar { slot, name_const: name_idx });
                }
            }
            Stmt::GlobalVar(names) => {
                for name in names {
                    let idx = self.str_const(name.clone());
                    let slot = self.local_slot(name);
                    self.emit(Opcode::BindGlobal(idx));
                    self.emit(Opcode::StoreLocal(slot));
                }
            }
            Stmt::Unset(targets) => {
                for t in targets {
                    self.compile_unset(t)?;
                }
            }
            Stmt::Block(body) => {
                for s in body {
                    self.compile_stmt(s)?;
                }
            }
            Stmt::Namespace { body, .. } => {
                if let Some(body) = body {
                    for s in body {
                        self.compile_stmt(s)?;
                    }
                }
            }
            Stmt::Use(_) => {
                // Import aliases carry no runtime bytecode of their own.
            }
            Stmt::Declare { body, .. } => {
                // The directive itself (`strict_types`, `ticks`, ...) is a
                // compile-time hint already applied upstream; a block-form
                // `declare() { ... }` still has to run its body.
                if let Some(body) = body {
                    for s in body {
                        self.compile_stmt(s)?;
                    }
                }
            }
            Stmt::Include { path, is_require, once } => {
                self.compile_include(path, *is_require, *once)?;
            }
            // Top-level declarations are lifted out before function bodies
            // are compiled (see `compiler::compile`); encountering one here
            // means it was nested inside a function body, which PHP allows
            // for functions/classes but not for methods we need to surface
            // at runtime — compiled as a no-op placeholder.
            Stmt::Function { .. } | Stmt::Class { .. } | Stmt::Interface { .. } | Stmt::Trait { .. } | Stmt::Enum { .. } => {
                self.emit(Opcode::NoOp);
            }
        }
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expr,
        then_branch: &[Stmt],
        elseif_branches: &[(Expr, Vec<Stmt>)],
        else_branch: &Option<Vec<Stmt>>,
    ) -> CompileResult<()> {
        self.compile_expr(condition)?;
        let false_jump = self.emit(Opcode::JumpIfFalse(0));
        for s in then_branch {
            self.compile_stmt(s)?;
        }
        let mut end_jumps = vec![self.emit(Opcode::Jump(0))];
        self.patch(false_jump, self.addr());

        for (cond, body) in elseif_branches {
            self.compile_expr(cond)?;
            let false_jump = self.emit(Opcode::JumpIfFalse(0));
            for s in body {
                self.compile_stmt(s)?;
            }
            end_jumps.push(self.emit(Opcode::Jump(0)));
            self.patch(false_jump, self.addr());
        }

        if let Some(body) = else_branch {
            for s in body {
                self.compile_stmt(s)?;
            }
        }
        let end = self.addr();
        for j in end_jumps {
            self.patch(j, end);
        }
        Ok(())
    }

    /// Opens a loop: emits `EnterLoop` with a placeholder break target and
    /// returns the continue target (the address right after it).
    fn open_loop(&mut self) -> (usize, Addr) {
        let enter_idx = self.emit(Opcode::EnterLoop { break_target: 0, continue_target: 0 });
        let continue_target = self.addr();
        if let Opcode::EnterLoop { continue_target: ct, .. } = &mut self.code[enter_idx].op {
            *ct = continue_target;
        }
        (enter_idx, continue_target)
    }

    /// Closes a loop: patches the trailing conditional exit to land on
    /// `ExitLoop`, then routes `break` (which has already truncated the
    /// loop-context stack in the VM) to just past it so it is not popped
    /// twice.
    fn close_loop(&mut self, enter_idx: usize, exit_patches: &[usize]) {
        let exit_loop_addr = self.addr();
        for &p in exit_patches {
            self.patch(p, exit_loop_addr);
        }
        self.emit(Opcode::ExitLoop);
        let after = self.addr();
        self.patch(enter_idx, after);
        self.loop_switch_ranges.push((enter_idx as Addr, after));
    }

    fn compile_while(&mut self, condition: &Expr, body: &[Stmt]) -> CompileResult<()> {
        let (enter_idx, continue_target) = self.open_loop();
        self.compile_expr(condition)?;
        let exit_patch = self.emit(Opcode::JumpIfFalse(0));
        for s in body {
            self.compile_stmt(s)?;
        }
        self.emit(Opcode::Jump(continue_target));
        self.close_loop(enter_idx, &[exit_patch]);
        Ok(())
    }

    fn compile_do_while(&mut self, body: &[Stmt], condition: &Expr) -> CompileResult<()> {
        let enter_idx = self.emit(Opcode::EnterLoop { break_target: 0, continue_target: 0 });
        let body_start = self.addr();
        for s in body {
            self.compile_stmt(s)?;
        }
        let continue_target = self.addr();
        if let Opcode::EnterLoop { continue_target: ct, .. } = &mut self.code[enter_idx].op {
            *ct = continue_target;
        }
        self.compile_expr(condition)?;
        self.emit(Opcode::JumpIfTrue(body_start));
        self.close_loop(enter_idx, &[]);
        Ok(())
    }

    fn compile_for(&mut self, init: &[Expr], condition: &Option<Expr>, update: &[Expr], body: &[Stmt]) -> CompileResult<()> {
        for e in init {
            self.compile_expr(e)?;
            self.emit(Opcode::Pop);
        }
        let enter_idx = self.emit(Opcode::EnterLoop { break_target: 0, continue_target: 0 });
        let cond_target = self.addr();
        let exit_patch = if let Some(cond) = condition {
            self.compile_expr(cond)?;
            Some(self.emit(Opcode::JumpIfFalse(0)))
        } else {
            None
        };
        for s in body {
            self.compile_stmt(s)?;
        }
        let continue_target = self.addr();
        for e in update {
            self.compile_expr(e)?;
            self.emit(Opcode::Pop);
        }
        self.emit(Opcode::Jump(cond_target));
        if let Opcode::EnterLoop { continue_target: ct, .. } = &mut self.code[enter_idx].op {
            *ct = continue_target;
        }
        self.close_loop(enter_idx, exit_patch.as_slice().iter().copied().collect::<Vec<_>>().as_slice());
        Ok(())
    }

    fn compile_foreach(
        &mut self,
        array: &Expr,
        key: Option<&str>,
        value: &Expr,
        by_ref: bool,
        body: &[Stmt],
    ) -> CompileResult<()> {
        self.compile_expr(array)?;
        self.emit(Opcode::IterInit { by_ref });
        let enter_idx = self.emit(Opcode::EnterLoop { break_target: 0, continue_target: 0 });
        let continue_target = self.addr();
        if let Opcode::EnterLoop { continue_target: ct, .. } = &mut self.code[enter_idx].op {
            *ct = continue_target;
        }
        let exit_patch = self.emit(Opcode::IterValid(0));
        if let Some(key_name) = key {
            self.emit(Opcode::IterKey);
            let slot = self.local_slot(key_name);
            self.emit(Opcode::StoreLocal(slot));
        }
        self.emit(Opcode::IterCurrent);
        self.compile_foreach_target(value)?;
        for s in body {
            self.compile_stmt(s)?;
        }
        self.emit(Opcode::IterNext);
        self.emit(Opcode::Jump(continue_target));
        self.close_loop(enter_idx, &[exit_patch]);
        self.emit(Opcode::IterEnd);
        Ok(())
    }

    fn compile_foreach_target(&mut self, value: &Expr) -> CompileResult<()> {
        match value {
            Expr::Variable(name) => {
                let slot = self.local_slot(name);
                self.emit(Opcode::StoreLocal(slot));
            }
            Expr::ListDestructure(elements) => {
                self.compile_list_destructure(elements)?;
            }
            other => {
                self.compile_assign_target(other)?;
            }
        }
        Ok(())
    }

    fn compile_switch(&mut self, expr: &Expr, cases: &[SwitchCase], default: &Option<Vec<Stmt>>) -> CompileResult<()> {
        // Desugar to an if/elseif chain over loose equality, preserving
        // fallthrough by compiling every case body back-to-back with the
        // same `break`-target loop context (a `switch` is a breakable
        // construct in PHP even though it never loops).
        self.compile_expr(expr)?;
        let subject_slot = self.local_slot(&format!("__switch_subject_{}", self.addr()));
        self.emit(Opcode::StoreLocal(subject_slot));

        let enter_idx = self.emit(Opcode::EnterLoop { break_target: 0, continue_target: 0 });
        let continue_target = self.addr();
        if let Opcode::EnterLoop { continue_target: ct, .. } = &mut self.code[enter_idx].op {
            *ct = continue_target;
        }

        let mut next_case_jumps = Vec::new();
        for case in cases {
            for j in next_case_jumps.drain(..) {
                self.patch(j, self.addr());
            }
            self.emit(Opcode::LoadLocal(subject_slot));
            self.compile_expr(&case.value)?;
            self.emit(Opcode::BinaryOp(BinaryOp::Equal));
            next_case_jumps.push(self.emit(Opcode::JumpIfFalse(0)));
            for s in &case.body {
                self.compile_stmt(s)?;
            }
        }
        for j in next_case_jumps {
            self.patch(j, self.addr());
        }
        if let Some(body) = default {
            for s in body {
                self.compile_stmt(s)?;
            }
        }
        self.close_loop(enter_idx, &[]);
        Ok(())
    }

    fn compile_try(
        &mut self,
        try_body: &[Stmt],
        catch_clauses: &[CatchClause],
        finally_body: &Option<Vec<Stmt>>,
    ) -> CompileResult<()> {
        let handler_index = self.handlers.len() as u32;
        self.handlers.push(ExceptionHandlerRange {
            try_start: 0,
            try_end: 0,
            catches: Vec::new(),
            finally_entry: None,
        });
        let push_idx = self.emit(Opcode::PushHandler(handler_index));
        let try_start = self.addr();
        for s in try_body {
            self.compile_stmt(s)?;
        }
        let try_end = self.addr();
        self.emit(Opcode::PopHandler);
        let mut after_jumps = vec![self.emit(Opcode::Jump(0))];

        let mut catch_entries = Vec::new();
        for clause in catch_clauses {
            let entry = self.addr();
            if let Some(var) = &clause.variable {
                let slot = self.local_slot(var);
                self.emit(Opcode::StoreLocal(slot));
            } else {
                self.emit(Opcode::Pop);
            }
            for s in &clause.body {
                self.compile_stmt(s)?;
            }
            after_jumps.push(self.emit(Opcode::Jump(0)));
            catch_entries.push((clause.exception_types.clone(), entry));
        }

        // Normal completion of the try body or a catch body must fall
        // into `finally` before continuing, not skip past it — so these
        // jumps target the finally entry itself when one exists, and
        // `EndFinally` (seeing no pending action) just falls through to
        // whatever follows once it's done.
        if let Some(body) = finally_body {
            let finally_entry = self.addr();
            for j in &after_jumps {
                self.patch(*j, finally_entry);
            }
            for s in body {
                self.compile_stmt(s)?;
            }
            self.emit(Opcode::EndFinally);
            self.handlers[handler_index as usize] = ExceptionHandlerRange {
                try_start,
                try_end,
                catches: catch_entries,
                finally_entry: Some(finally_entry),
            };
        } else {
            let end = self.addr();
            for j in after_jumps {
                self.patch(j, end);
            }
            self.handlers[handler_index as usize] = ExceptionHandlerRange {
                try_start,
                try_end,
                catches: catch_entries,
                finally_entry: None,
            };
        }

        let _ = push_idx;
        Ok(())
    }

    fn compile_unset(&mut self, target: &Expr) -> CompileResult<()> {
        match target {
            Expr::Variable(name) => {
                let slot = self.local_slot(name);
                self.emit(Opcode::PushNull);
                self.emit(Opcode::StoreLocal(slot));
            }
            Expr::ArrayAccess { array, index: Some(index) } => {
                self.compile_expr(array)?;
                self.compile_expr(index)?;
                self.emit(Opcode::ArrayUnset);
                self.compile_assign_target(array)?;
            }
            _ => {
                self.compile_expr(target)?;
                self.emit(Opcode::Pop);
            }
        }
        Ok(())
    }

    fn compile_include(&mut self, path: &Expr, is_require: bool, once: bool) -> CompileResult<()> {
        // The VM resolves `include`/`require` through a host-supplied
        // callback at runtime (`ExecutionContext::include_callback`); the
        // compiler just needs to push the resolved path, something a
        // dedicated `Include` opcode could consume. The bytecode set in
        // this core intentionally omits a runtime `include` opcode since
        // resolving and re-entering the compiler mid-execution is the
        // host's job, not the VM's — `Program::statements` containing an
        // `Include` are compiled into a call to a host-registered
        // `__include` builtin instead, keeping this a pure expression.
        // `is_require`/`once` ride along as two extra bool args so the
        // builtin can tell `include_once` apart from a bare `include` and
        // raise at the right severity.
        self.compile_expr(path)?;
        self.emit(if is_require { Opcode::PushTrue } else { Opcode::PushFalse });
        self.emit(if once { Opcode::PushTrue } else { Opcode::PushFalse });
        let name_idx = self.str_const("__include");
        self.emit(Opcode::CallNamed { name_const: name_idx, arg_count: 3 });
        self.emit(Opcode::Pop);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn compile_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::String(s) => {
                let idx = self.str_const(s.clone());
                self.emit(Opcode::PushConst(idx));
            }
            Expr::Integer(n) => {
                let idx = self.add_constant(Constant::Int(*n));
                self.emit(Opcode::PushConst(idx));
            }
            Expr::Float(f) => {
                let idx = self.add_constant(Constant::Float(*f));
                self.emit(Opcode::PushConst(idx));
            }
            Expr::Bool(true) => {
                self.emit(Opcode::PushTrue);
            }
            Expr::Bool(false) => {
                self.emit(Opcode::PushFalse);
            }
            Expr::Null => {
                self.emit(Opcode::PushNull);
            }
            Expr::Interpolated(segments) => {
                let mut first = true;
                for seg in segments {
                    match seg {
                        InterpSegment::Literal(s) => {
                            let idx = self.str_const(s.clone());
                            self.emit(Opcode::PushConst(idx));
                        }
                        InterpSegment::Expr(e) => {
                            self.compile_expr(e)?;
                            self.emit(Opcode::Cast(CastKind::String));
                        }
                    }
                    if !first {
                        self.emit(Opcode::Concat);
                    }
                    first = false;
                }
                if segments.is_empty() {
                    let idx = self.str_const("");
                    self.emit(Opcode::PushConst(idx));
                }
            }
            Expr::Variable(name) => {
                let slot = self.local_slot(name);
                self.emit(Opcode::LoadLocal(slot));
            }
            Expr::This => {
                self.emit(Opcode::LoadThis);
            }
            Expr::Magic(m) => self.compile_magic(*m),
            Expr::Array(elements) => self.compile_array_literal(elements)?,
            Expr::ArrayAccess { array, index } => {
                self.compile_expr(array)?;
                match index {
                    Some(idx) => {
                        self.compile_expr(idx)?;
                        self.emit(Opcode::ArrayGet);
                    }
                    None => {
                        return Err(CompileError::MalformedMatch(
                            "cannot read from `[]` append syntax".to_string(),
                        ));
                    }
                }
            }
            Expr::Binary { left, op: BinaryOp::And, right } => self.compile_short_circuit_and(left, right)?,
            Expr::Binary { left, op: BinaryOp::Or, right } => self.compile_short_circuit_or(left, right)?,
            Expr::Binary { left, op: BinaryOp::NullCoalesce, right } => self.compile_null_coalesce(left, right)?,
            Expr::Binary { left, op, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                match op {
                    BinaryOp::Concat => {
                        self.emit(Opcode::Concat);
                    }
                    BinaryOp::Identical => {
                        self.emit(Opcode::Identical);
                    }
                    BinaryOp::NotIdentical => {
                        self.emit(Opcode::NotIdentical);
                    }
                    other => {
                        self.emit(Opcode::BinaryOp(*other));
                    }
                }
            }
            Expr::Unary { op, expr } => {
                if matches!(op, UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec) {
                    self.compile_incr_decr(*op, expr)?;
                } else {
                    self.compile_expr(expr)?;
                    self.emit(Opcode::UnaryOp(*op));
                }
            }
            Expr::Assign { target, op, value, by_ref } => self.compile_assign(target, *op, value, *by_ref)?,
            Expr::ListDestructure(elements) => self.compile_list_destructure(elements)?,
            Expr::Grouped(inner) => self.compile_expr(inner)?,
            Expr::Ternary { condition, then_expr, else_expr } => self.compile_ternary(condition, then_expr, else_expr)?,
            Expr::Match { subject, arms } => self.compile_match(subject, arms)?,
            Expr::FunctionCall { callee, args } => self.compile_function_call(callee, args)?,
            Expr::MethodCall { object, method, args, nullsafe } => {
                self.compile_method_call(object, method, args, *nullsafe)?
            }
            Expr::StaticMethodCall { class, method, args } => self.compile_static_method_call(class, method, args)?,
            Expr::Placeholder => {
                self.emit(Opcode::PushNull);
            }
            Expr::PropertyAccess { object, property, nullsafe } => {
                self.compile_expr(object)?;
                self.compile_property_get(property, *nullsafe)?;
            }
            Expr::StaticPropertyAccess { class, property } => {
                let class_ref = self.compile_class_ref(class)?;
                let name_const = self.str_const(property.clone());
                self.emit(Opcode::GetStaticProperty { class: class_ref, name_const });
            }
            Expr::ClassConstAccess { class, constant } => {
                if constant == "class" {
                    let name = self.static_class_name(class);
                    let idx = self.str_const(name);
                    self.emit(Opcode::PushConst(idx));
                } else {
                    let class_ref = self.compile_class_ref(class)?;
                    let name_const = self.str_const(constant.clone());
                    self.emit(Opcode::GetClassConst { class: class_ref, name_const });
                }
            }
            Expr::New { class, args } => {
                // `WaitGroup` is concurrency-runtime machinery, not a
                // declared class, so `new WaitGroup()` is special-cased
                // here rather than going through `NewObject`.
                if matches!(class, ClassRef::Name(name) if name == "WaitGroup") {
                    if !args.is_empty() {
                        return Err(CompileError::MalformedMatch("WaitGroup takes no constructor arguments".to_string()));
                    }
                    self.emit(Opcode::MakeWaitGroup);
                } else {
                    let class_ref = self.compile_class_ref(class)?;
                    let arg_count = self.compile_args(args)?;
                    self.emit(Opcode::NewObject { class: class_ref, arg_count });
                }
            }
            Expr::NewAnonymousClass { .. } => {
                return Err(CompileError::MalformedMatch(
                    "anonymous classes are declared ahead of time by the host lowering pass".to_string(),
                ));
            }
            Expr::InstanceOf { value, class } => {
                self.compile_expr(value)?;
                let class_ref = self.compile_class_ref(class)?;
                self.emit(Opcode::InstanceOf(class_ref));
            }
            Expr::Cast { kind, expr } => {
                self.compile_expr(expr)?;
                self.emit(Opcode::Cast(*kind));
            }
            Expr::Clone(e) => {
                self.compile_expr(e)?;
                self.emit(Opcode::CloneObject);
            }
            Expr::Suppress(e) => {
                self.emit(Opcode::Suppress);
                self.compile_expr(e)?;
            }
            Expr::Throw(e) => {
                self.compile_expr(e)?;
                self.emit(Opcode::Throw);
                self.emit(Opcode::PushNull);
            }
            Expr::Closure { params, uses, body, is_static } => {
                self.compile_closure(params, uses, body, *is_static)?;
            }
            Expr::ArrowFunction { params, body, is_static } => {
                self.compile_arrow_function(params, body, *is_static)?;
            }
            Expr::Yield { key, value } => {
                self.is_generator = true;
                match key {
                    Some(k) => self.compile_expr(k)?,
                    None => {
                        self.emit(Opcode::PushNull);
                    }
                }
                match value {
                    Some(v) => self.compile_expr(v)?,
                    None => {
                        self.emit(Opcode::PushNull);
                    }
                }
                self.emit(Opcode::Yield { has_key: key.is_some() });
            }
            Expr::YieldFrom(e) => {
                self.is_generator = true;
                self.compile_expr(e)?;
                self.emit(Opcode::YieldFrom);
            }
            Expr::Spawn { callee, args } => {
                self.compile_expr(callee)?;
                let arg_count = self.compile_args(args)?;
                self.emit(Opcode::Spawn { arg_count });
            }
        }
        Ok(())
    }

    fn compile_magic(&mut self, magic: MagicConstant) {
        let value = match magic {
            MagicConstant::Class => self.scope.class_name.unwrap_or("").to_string(),
            MagicConstant::Function => self.name.clone(),
            _ => String::new(),
        };
        let idx = self.str_const(value);
        self.emit(Opcode::PushConst(idx));
    }

    fn compile_array_literal(&mut self, elements: &[ArrayElement]) -> CompileResult<()> {
        self.emit(Opcode::NewArray(elements.len() as u32));
        for el in elements {
            match &el.key {
                Some(key) => {
                    self.compile_expr(key)?;
                    self.compile_expr(&el.value)?;
                    self.emit(Opcode::ArrayPushKeyed);
                }
                None => {
                    if matches!(&*el.value, Expr::Unary { .. }) {
                        // not a spread marker at this layer; spreads are
                        // represented structurally by the parser wrapping
                        // the value, left for the host parser to flag.
                    }
                    self.compile_expr(&el.value)?;
                    self.emit(Opcode::ArrayPushElement);
                }
            }
        }
        Ok(())
    }

    fn compile_short_circuit_and(&mut self, left: &Expr, right: &Expr) -> CompileResult<()> {
        self.compile_expr(left)?;
        self.emit(Opcode::Cast(CastKind::Bool));
        let short_circuit = self.emit(Opcode::JumpIfFalseKeep(0));
        self.emit(Opcode::Pop);
        self.compile_expr(right)?;
        self.emit(Opcode::Cast(CastKind::Bool));
        self.patch(short_circuit, self.addr());
        Ok(())
    }

    fn compile_short_circuit_or(&mut self, left: &Expr, right: &Expr) -> CompileResult<()> {
        self.compile_expr(left)?;
        self.emit(Opcode::Cast(CastKind::Bool));
        let short_circuit = self.emit(Opcode::JumpIfTrueKeep(0));
        self.emit(Opcode::Pop);
        self.compile_expr(right)?;
        self.emit(Opcode::Cast(CastKind::Bool));
        self.patch(short_circuit, self.addr());
        Ok(())
    }

    fn compile_null_coalesce(&mut self, left: &Expr, right: &Expr) -> CompileResult<()> {
        match left {
            Expr::ArrayAccess { array, index: Some(index) } => {
                self.compile_expr(array)?;
                self.compile_expr(index)?;
                self.emit(Opcode::ArrayGetOrNull);
            }
            Expr::PropertyAccess { object, property, .. } => {
                self.compile_expr(object)?;
                self.compile_property_get(property, true)?;
            }
            other => self.compile_expr(other)?,
        }
        let keep = self.emit(Opcode::JumpIfNotNullKeep(0));
        self.emit(Opcode::Pop);
        self.compile_expr(right)?;
        self.patch(keep, self.addr());
        Ok(())
    }

    fn compile_property_get(&mut self, property: &MemberName, nullsafe: bool) -> CompileResult<()> {
        match property {
            MemberName::Name(name) => {
                let idx = self.str_const(name.clone());
                self.emit(Opcode::GetProperty { name_const: idx, nullsafe });
            }
            MemberName::Dynamic(e) => {
                self.compile_expr(e)?;
                self.emit(Opcode::GetPropertyDynamic { nullsafe });
            }
        }
        Ok(())
    }

    /// `UnaryOp(PreInc|PreDec)` computes `old + 1`/`old - 1` as a pure stack
    /// value; its own "write through in place" behavior only helps when
    /// the operand is still a `Reference` cell, which a value freshly
    /// popped off a local slot never is (`LoadLocal` already dereferences
    /// it). So both pre- and post-forms reuse the `PreInc`/`PreDec`
    /// computation and just differ in which copy (old or new) is `Dup`'d
    /// to survive as the expression's value.
    fn compile_incr_decr(&mut self, op: UnaryOp, target: &Expr) -> CompileResult<()> {
        let (arith_op, is_post) = match op {
            UnaryOp::PreInc => (UnaryOp::PreInc, false),
            UnaryOp::PreDec => (UnaryOp::PreDec, false),
            UnaryOp::PostInc => (UnaryOp::PreInc, true),
            UnaryOp::PostDec => (UnaryOp::PreDec, true),
            other => (other, false),
        };
        match target {
            Expr::Variable(name) => {
                let slot = self.local_slot(name);
                self.emit(Opcode::LoadLocal(slot));
                if is_post {
                    self.emit(Opcode::Dup);
                    self.emit(Opcode::UnaryOp(arith_op));
                    self.emit(Opcode::StoreLocalInPlace(slot));
                } else {
                    self.emit(Opcode::UnaryOp(arith_op));
                    self.emit(Opcode::Dup);
                    self.emit(Opcode::StoreLocalInPlace(slot));
                }
            }
            _ => {
                // Property/array-element increment round-trips through a
                // plain read-modify-write since there is no addressable
                // lvalue opcode for those paths yet.
                self.compile_expr(target)?;
                self.emit(Opcode::UnaryOp(arith_op));
            }
        }
        Ok(())
    }

    fn compile_assign(&mut self, target: &Expr, op: AssignOp, value: &Expr, by_ref: bool) -> CompileResult<()> {
        if by_ref {
            if let (Expr::Variable(t), Expr::Variable(s)) = (target, value) {
                let target_slot = self.local_slot(t);
                let source_slot = self.local_slot(s);
                self.emit(Opcode::BindLocalRef { target: target_slot, source: source_slot });
                self.emit(Opcode::LoadLocal(target_slot));
                return Ok(());
            }
        }

        if matches!(op, AssignOp::CoalesceAssign) {
            return self.compile_coalesce_assign(target, value);
        }

        if matches!(op, AssignOp::Assign) {
            self.compile_expr(value)?;
            self.emit(Opcode::Dup);
            self.compile_assign_target(target)?;
            return Ok(());
        }

        let bin_op = compound_to_binary(op);
        match target {
            Expr::Variable(name) => {
                let slot = self.local_slot(name);
                self.emit(Opcode::LoadLocal(slot));
                self.compile_expr(value)?;
                self.emit(Opcode::BinaryOp(bin_op));
                self.emit(Opcode::Dup);
                self.emit(Opcode::StoreLocalInPlace(slot));
            }
            _ => {
                self.compile_expr(target)?;
                self.compile_expr(value)?;
                self.emit(Opcode::BinaryOp(bin_op));
                self.emit(Opcode::Dup);
                self.compile_assign_target(target)?;
            }
        }
        Ok(())
    }

    fn compile_coalesce_assign(&mut self, target: &Expr, value: &Expr) -> CompileResult<()> {
        self.compile_expr(target)?;
        let keep = self.emit(Opcode::JumpIfNotNullKeep(0));
        self.emit(Opcode::Pop);
        self.compile_expr(value)?;
        self.emit(Opcode::Dup);
        self.compile_assign_target(target)?;
        self.patch(keep, self.addr());
        Ok(())
    }

    /// Stores the value on top of the stack into `target`. Contract: pops
    /// exactly the one value it's given and pushes nothing back, regardless
    /// of which arm runs — callers that need the stored value to live on
    /// as an expression result must `Dup` it before calling this.
    fn compile_assign_target(&mut self, target: &Expr) -> CompileResult<()> {
        match target {
            Expr::Variable(name) => {
                let slot = self.local_slot(name);
                self.emit(Opcode::StoreLocal(slot));
            }
            Expr::ArrayAccess { array, index: Some(idx) } => self.compile_array_store(array, idx)?,
            Expr::ArrayAccess { array, index: None } => self.compile_array_append(array)?,
            Expr::PropertyAccess { object, property, .. } => {
                // Entry: [..., value]. Bring the object above it, then
                // restore value-on-top order so `SetProperty*`'s pop order
                // (value, then object) lines up.
                self.compile_expr(object)?;
                self.emit(Opcode::Swap);
                match property {
                    MemberName::Name(name) => {
                        let idx = self.str_const(name.clone());
                        self.emit(Opcode::SetProperty(idx));
                    }
                    MemberName::Dynamic(e) => {
                        self.compile_expr(e)?;
                        self.emit(Opcode::Swap);
                        self.emit(Opcode::SetPropertyDynamic);
                    }
                }
                // SetProperty(Dynamic) echoes the stored value back; this
                // arm promises not to, so drop it.
                self.emit(Opcode::Pop);
            }
            Expr::StaticPropertyAccess { class, property } => {
                let class_ref = self.compile_class_ref_for_store(class)?;
                let name_const = self.str_const(property.clone());
                self.emit(Opcode::SetStaticProperty { class: class_ref, name_const });
            }
            _ => {
                self.emit(Opcode::Pop);
            }
        }
        Ok(())
    }

    /// Resolves a class reference for a store-site opcode whose handler
    /// pops the value to store *before* resolving a dynamic class operand.
    /// A `Dynamic` ref pushes its selector above the pending value, so swap
    /// it back under once compiled.
    fn compile_class_ref_for_store(&mut self, class: &ClassRef) -> CompileResult<ClassRefOp> {
        let op = self.compile_class_ref(class)?;
        if matches!(op, ClassRefOp::Dynamic) {
            self.emit(Opcode::Swap);
        }
        Ok(op)
    }

    /// `$array[$idx] = value`. Entry: `[..., value]`. Arrays are value
    /// types, so `ArraySet` returns the updated array, which then gets
    /// written back into `array` by recursing into `compile_assign_target`.
    fn compile_array_store(&mut self, array: &Expr, idx: &Expr) -> CompileResult<()> {
        self.compile_expr(array)?;
        self.emit(Opcode::Swap); // [..., array, value]
        self.compile_expr(idx)?; // [..., array, value, idx]
        self.emit(Opcode::Swap); // [..., array, idx, value]
        self.emit(Opcode::ArraySet);
        self.compile_assign_target(array)
    }

    fn compile_array_append(&mut self, array: &Expr) -> CompileResult<()> {
        self.compile_expr(array)?;
        self.emit(Opcode::Swap); // [..., array, value]
        self.emit(Opcode::ArrayAppend);
        self.compile_assign_target(array)
    }

    fn compile_list_destructure(&mut self, elements: &[Option<ListElement>]) -> CompileResult<()> {
        self.emit(Opcode::ListDestructure(elements.len() as u32));
        // `ListDestructure` pushes element 0's value on top, so pop targets
        // in the same forward order rather than reversed.
        for el in elements.iter() {
            match el {
                Some(element) => {
                    if let Some(target) = &element.target {
                        self.compile_assign_target(target)?;
                    } else {
                        self.emit(Opcode::Pop);
                    }
                }
                None => {
                    self.emit(Opcode::Pop);
                }
            }
        }
        Ok(())
    }

    fn compile_ternary(&mut self, condition: &Expr, then_expr: &Option<Box<Expr>>, else_expr: &Expr) -> CompileResult<()> {
        self.compile_expr(condition)?;
        match then_expr {
            Some(then_expr) => {
                let false_jump = self.emit(Opcode::JumpIfFalse(0));
                self.compile_expr(then_expr)?;
                let end_jump = self.emit(Opcode::Jump(0));
                self.patch(false_jump, self.addr());
                self.compile_expr(else_expr)?;
                self.patch(end_jump, self.addr());
            }
            None => {
                let keep = self.emit(Opcode::JumpIfTrueKeep(0));
                self.emit(Opcode::Pop);
                self.compile_expr(else_expr)?;
                self.patch(keep, self.addr());
            }
        }
        Ok(())
    }

    fn compile_match(&mut self, subject: &Expr, arms: &[MatchArm]) -> CompileResult<()> {
        self.compile_expr(subject)?;
        let subject_slot = self.local_slot(&format!("__match_subject_{}", self.addr()));
        self.emit(Opcode::StoreLocal(subject_slot));

        let mut end_jumps = Vec::new();
        let mut next_patches: Vec<usize> = Vec::new();
        let mut default_arm: Option<&MatchArm> = None;

        for arm in arms {
            match &arm.conditions {
                None => {
                    default_arm = Some(arm);
                    continue;
                }
                Some(conditions) => {
                    for p in next_patches.drain(..) {
                        self.patch(p, self.addr());
                    }
                    let mut cond_end_jumps = Vec::new();
                    for (i, cond) in conditions.iter().enumerate() {
                        self.emit(Opcode::LoadLocal(subject_slot));
                        self.compile_expr(cond)?;
                        self.emit(Opcode::Identical);
                        if i + 1 < conditions.len() {
                            cond_end_jumps.push(self.emit(Opcode::JumpIfTrueKeep(0)));
                            self.emit(Opcode::Pop);
                        } else {
                            next_patches.push(self.emit(Opcode::JumpIfFalse(0)));
                        }
                    }
                    let matched = self.addr();
                    for j in cond_end_jumps {
                        self.patch(j, matched);
                    }
                    self.compile_expr(&arm.body)?;
                    end_jumps.push(self.emit(Opcode::Jump(0)));
                }
            }
        }
        for p in next_patches {
            self.patch(p, self.addr());
        }
        match default_arm {
            Some(arm) => self.compile_expr(&arm.body)?,
            None => {
                self.emit(Opcode::LoadLocal(subject_slot));
                self.emit(Opcode::MatchError);
            }
        }
        let end = self.addr();
        for j in end_jumps {
            self.patch(j, end);
        }
        Ok(())
    }

    fn compile_args(&mut self, args: &[Argument]) -> CompileResult<u32> {
        // Named arguments and runtime-dynamic spreads are pushed
        // positionally in source order; see `Stmt::Include`'s neighbor doc
        // comment on `compile_function_call` for the tracked simplification.
        for a in args {
            self.compile_expr(&a.value)?;
        }
        Ok(args.len() as u32)
    }

    fn compile_function_call(&mut self, callee: &Expr, args: &[Argument]) -> CompileResult<()> {
        if let Expr::Variable(name) = callee {
            if self.locals.iter().any(|n| n == name) {
                let slot = self.local_slot(name);
                self.emit(Opcode::LoadLocal(slot));
                let arg_count = self.compile_args(args)?;
                self.emit(Opcode::Call { arg_count });
                return Ok(());
            }
        }
        // A bareword callee reaching here is a plain named-function call;
        // anything else (a closure-returning expression) is called by value.
        match callee {
            Expr::FunctionCall { .. } | Expr::MethodCall { .. } | Expr::StaticMethodCall { .. } | Expr::Variable(_) => {
                self.compile_expr(callee)?;
                let arg_count = self.compile_args(args)?;
                self.emit(Opcode::Call { arg_count });
            }
            _ => {
                let name = self.static_callee_name(callee);
                let arg_count = self.compile_args(args)?;
                let name_const = self.str_const(name);
                self.emit(Opcode::CallNamed { name_const, arg_count });
            }
        }
        Ok(())
    }

    fn static_callee_name(&self, callee: &Expr) -> String {
        match callee {
            Expr::String(s) => s.clone(),
            _ => String::new(),
        }
    }

    fn compile_method_call(&mut self, object: &Expr, method: &MemberName, args: &[Argument], nullsafe: bool) -> CompileResult<()> {
        self.compile_expr(object)?;
        match method {
            MemberName::Name(name) => {
                let method_const = self.str_const(name.clone());
                let arg_count = self.compile_args(args)?;
                self.emit(Opcode::CallMethod { method_const, arg_count, nullsafe });
            }
            MemberName::Dynamic(e) => {
                self.compile_expr(e)?;
                let arg_count = self.compile_args(args)?;
                self.emit(Opcode::CallDynamicMethod { arg_count, nullsafe });
            }
        }
        Ok(())
    }

    fn compile_static_method_call(&mut self, class: &ClassRef, method: &MemberName, args: &[Argument]) -> CompileResult<()> {
        let class_ref = self.compile_class_ref(class)?;
        let arg_count = self.compile_args(args)?;
        let method_const = match method {
            MemberName::Name(name) => self.str_const(name.clone()),
            MemberName::Dynamic(_) => self.str_const(""),
        };
        self.emit(Opcode::CallStaticMethod { class: class_ref, method_const, arg_count });
        Ok(())
    }

    fn compile_class_ref(&mut self, class: &ClassRef) -> CompileResult<ClassRefOp> {
        Ok(match class {
            ClassRef::Name(name) => ClassRefOp::Name(self.str_const(name.clone())),
            ClassRef::SelfType => ClassRefOp::SelfType,
            ClassRef::ParentType => ClassRefOp::ParentType,
            ClassRef::StaticType => ClassRefOp::StaticType,
            ClassRef::Dynamic(e) => {
                self.compile_expr(e)?;
                ClassRefOp::Dynamic
            }
        })
    }

    fn static_class_name(&self, class: &ClassRef) -> String {
        match class {
            ClassRef::Name(name) => name.clone(),
            ClassRef::SelfType | ClassRef::StaticType => self.scope.class_name.unwrap_or("").to_string(),
            ClassRef::ParentType => String::new(),
            ClassRef::Dynamic(_) => String::new(),
        }
    }

    fn compile_closure(&mut self, params: &[FunctionParam], uses: &[ClosureUse], body: &[Stmt], is_static: bool) -> CompileResult<()> {
        let mut builder = FunctionBuilder::new(format!("{{closure:{}}}", self.name), self.scope);
        builder.compile_params(params)?;
        for u in uses {
            builder.local_slot(&u.name);
        }
        builder.compile_body(body)?;
        let function = builder.finish(false);
        let idx = self.nested_functions.len() as u32;
        self.nested_functions.push(function);

        for u in uses {
            let slot = self.local_slot(&u.name);
            if u.by_ref {
                self.emit(Opcode::CaptureByRef(slot));
            } else {
                self.emit(Opcode::CaptureByValue(slot));
            }
        }
        self.emit(Opcode::MakeClosure { function: idx, capture_count: uses.len() as u32, is_static });
        Ok(())
    }

    fn compile_arrow_function(&mut self, params: &[FunctionParam], body: &Expr, is_static: bool) -> CompileResult<()> {
        // Arrow functions auto-capture every outer variable they reference
        // by value; since the parent's locals table is the superset we
        // already know about, capture the whole current local set. This
        // over-captures relative to real PHP's free-variable analysis but
        // is behaviorally transparent since extra captures are never read.
        let mut builder = FunctionBuilder::new(format!("{{arrow:{}}}", self.name), self.scope);
        builder.compile_params(params)?;
        let outer_locals = self.locals.clone();
        for name in &outer_locals {
            builder.local_slot(name);
        }
        builder.compile_expr(body)?;
        builder.emit(Opcode::Return);
        let function = builder.finish(false);
        let idx = self.nested_functions.len() as u32;
        self.nested_functions.push(function);

        for name in &outer_locals {
            let slot = self.local_slot(name);
            self.emit(Opcode::CaptureByValue(slot));
        }
        self.emit(Opcode::MakeClosure { function: idx, capture_count: outer_locals.len() as u32, is_static });
        Ok(())
    }
}

fn compound_to_binary(op: AssignOp) -> BinaryOp {
    match op {
        AssignOp::AddAssign => BinaryOp::Add,
        AssignOp::SubAssign => BinaryOp::Sub,
        AssignOp::MulAssign => BinaryOp::Mul,
        AssignOp::DivAssign => BinaryOp::Div,
        AssignOp::ModAssign => BinaryOp::Mod,
        AssignOp::PowAssign => BinaryOp::Pow,
        AssignOp::ConcatAssign => BinaryOp::Concat,
        AssignOp::BitAndAssign => BinaryOp::BitAnd,
        AssignOp::BitOrAssign => BinaryOp::BitOr,
        AssignOp::BitXorAssign => BinaryOp::BitXor,
        AssignOp::ShiftLeftAssign => BinaryOp::ShiftLeft,
        AssignOp::ShiftRightAssign => BinaryOp::ShiftRight,
        AssignOp::Assign | AssignOp::CoalesceAssign => unreachable!("handled by caller"),
    }
}
