use super::expr::Expr;

/// `declare(...)` directive.
#[derive(Debug, Clone)]
pub enum DeclareDirective {
    StrictTypes(bool),
    Encoding(String),
    Ticks(i64),
}

/// A dotted class/function/constant reference (`Foo\Bar\Baz`).
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedName {
    pub parts: Vec<String>,
    pub is_fully_qualified: bool,
}

impl QualifiedName {
    pub fn new(parts: Vec<String>, is_fully_qualified: bool) -> Self {
        Self {
            parts,
            is_fully_qualified,
        }
    }

    pub fn last(&self) -> Option<&String> {
        self.parts.last()
    }
}

/// Parameter/return/property type hint.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
pub enum TypeHint {
    Simple(String),
    Nullable(Box<TypeHint>),
    Union(Vec<TypeHint>),
    Intersection(Vec<TypeHint>),
    DNF(Vec<Vec<TypeHint>>),
    Class(String),
    Void,
    Never,
    Static,
    SelfType,
    ParentType,
}

impl TypeHint {
    pub fn is_nullable(&self) -> bool {
        match self {
            TypeHint::Nullable(_) => true,
            TypeHint::Union(types) => types
                .iter()
                .any(|t| matches!(t, TypeHint::Simple(s) if s == "null")),
            TypeHint::Simple(s) => s == "mixed" || s == "null",
            TypeHint::DNF(intersections) => intersections.iter().any(|group| {
                group.len() == 1 && matches!(&group[0], TypeHint::Simple(s) if s == "null")
            }),
            _ => false,
        }
    }
}

/// Visibility modifier for class members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Class property declaration.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub visibility: Visibility,
    pub write_visibility: Option<Visibility>,
    pub default: Option<Expr>,
    pub readonly: bool,
    pub is_static: bool,
    pub type_hint: Option<TypeHint>,
}

/// Class/trait method declaration.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub params: Vec<FunctionParam>,
    pub return_type: Option<TypeHint>,
    pub body: Vec<Stmt>,
}

/// Interface method signature (no body; may carry a default-value expression
/// per parameter even though implementers need not restate it).
#[derive(Debug, Clone)]
pub struct InterfaceMethodSignature {
    pub name: String,
    pub params: Vec<FunctionParam>,
    pub return_type: Option<TypeHint>,
}

/// `const NAME = expr;` inside an interface or class.
#[derive(Debug, Clone)]
pub struct InterfaceConstant {
    pub name: String,
    pub value: Expr,
}

/// One `case Name = value;` of an enum.
#[derive(Debug, Clone)]
pub struct EnumCase {
    pub name: String,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBackingType {
    None,
    Int,
    String,
}

/// `use TraitA, TraitB { ... }` inside a class, with its adaptation rules.
#[derive(Debug, Clone)]
pub struct TraitUse {
    pub traits: Vec<String>,
    pub resolutions: Vec<TraitResolution>,
}

#[derive(Debug, Clone)]
pub enum TraitResolution {
    /// `A::m insteadof B, C;`
    InsteadOf {
        trait_name: String,
        method: String,
        excluded_traits: Vec<String>,
    },
    /// `A::m as newName;` / `m as protected;` (trait_name is None for an
    /// unqualified alias that must be unambiguous among the used traits).
    Alias {
        trait_name: Option<String>,
        method: String,
        alias: Option<String>,
        visibility: Option<Visibility>,
    },
}

/// One `catch (A|B $e) { ... }` arm.
#[derive(Debug, Clone)]
pub struct CatchClause {
    pub exception_types: Vec<String>,
    pub variable: Option<String>,
    pub body: Vec<Stmt>,
}

/// Statements.
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Stmt {
    Echo(Vec<Expr>),
    Expression(Expr),
    Html(String),

    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        elseif_branches: Vec<(Expr, Vec<Stmt>)>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        condition: Expr,
    },
    For {
        init: Vec<Expr>,
        condition: Option<Expr>,
        update: Vec<Expr>,
        body: Vec<Stmt>,
    },
    /// `foreach ($array as [$k =>] $value) { ... }`. `value` may itself be a
    /// `Expr::ListDestructure` pattern.
    Foreach {
        array: Expr,
        key: Option<String>,
        value: Box<Expr>,
        by_ref: bool,
        body: Vec<Stmt>,
    },
    Switch {
        expr: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
    },

    Break(u32),
    Continue(u32),
    Goto(String),
    Label(String),

    Function {
        name: String,
        params: Vec<FunctionParam>,
        return_type: Option<TypeHint>,
        body: Vec<Stmt>,
        by_ref_return: bool,
    },
    Return(Option<Expr>),

    Interface {
        name: String,
        parents: Vec<QualifiedName>,
        methods: Vec<InterfaceMethodSignature>,
        constants: Vec<InterfaceConstant>,
    },
    Trait {
        name: String,
        uses: Vec<TraitUse>,
        properties: Vec<Property>,
        methods: Vec<Method>,
    },
    Class {
        name: String,
        is_abstract: bool,
        is_final: bool,
        readonly: bool,
        parent: Option<QualifiedName>,
        interfaces: Vec<QualifiedName>,
        trait_uses: Vec<TraitUse>,
        constants: Vec<InterfaceConstant>,
        properties: Vec<Property>,
        methods: Vec<Method>,
    },
    Enum {
        name: String,
        backing_type: EnumBackingType,
        implements: Vec<QualifiedName>,
        cases: Vec<EnumCase>,
        constants: Vec<InterfaceConstant>,
        methods: Vec<Method>,
    },

    TryCatch {
        try_body: Vec<Stmt>,
        catch_clauses: Vec<CatchClause>,
        finally_body: Option<Vec<Stmt>>,
    },
    Throw(Expr),

    /// `static $x = expr;` — allocates a per-function persistent slot.
    StaticVar(Vec<(String, Option<Expr>)>),
    /// `global $x, $y;`
    GlobalVar(Vec<String>),
    /// `unset($a, $b->p, $c[0]);`
    Unset(Vec<Expr>),

    Namespace {
        name: Option<QualifiedName>,
        body: Option<Vec<Stmt>>,
    },
    Use(Vec<(QualifiedName, Option<String>)>),
    Declare {
        directives: Vec<DeclareDirective>,
        body: Option<Vec<Stmt>>,
    },

    /// `require`/`include`, with the `_once` and `require` vs `include` flags.
    Include {
        path: Expr,
        is_require: bool,
        once: bool,
    },

    Block(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Vec<Stmt>,
}

/// Function/method/closure parameter.
#[derive(Debug, Clone)]
pub struct FunctionParam {
    pub name: String,
    pub type_hint: Option<TypeHint>,
    pub default: Option<Expr>,
    pub by_ref: bool,
    pub is_variadic: bool,
    /// Constructor property promotion (`public readonly int $x`).
    pub promote_visibility: Option<Visibility>,
    pub promote_readonly: bool,
}

/// The root of a compilation unit.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
