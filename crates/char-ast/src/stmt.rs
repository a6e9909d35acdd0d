//! Statement AST nodes.

use crate::expr::Expr;
use crate::token::TokenKind;
use crate::types::{FuncSig, Type};
use crate::Span;

/// The root of a parsed source file.
#[derive(Debug, Clone)]
pub struct File {
    pub name: String,
    pub stmts: Vec<Stmt>,
}

/// A statement in the AST.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether this statement is a recovery point.
    pub fn is_error(&self) -> bool {
        matches!(self.kind, StmtKind::Error(_))
    }
}

/// The kind of statement.
#[derive(Debug, Clone)]
pub enum StmtKind {
    /// A slot where parsing failed; the message describes the token
    /// that broke the production.
    Error(String),
    /// Expression statement
    Expr(Expr),
    /// Package imports, one or more entries
    Use(Vec<UsePackage>),
    /// `TYPE as Name` alias
    TypeRedirect { ty: Type, name: String },
    /// Class declaration (`mixin` distinguishes `mix` classes)
    Class(Class),
    /// Interface declaration
    Interface(Interface),
    /// One class property line, possibly several comma-joined names
    PropertySet(PropertySet),
    /// Function definition; also an expression when anonymous
    FuncDef(FuncDef),
    /// `iota` on its own line resets the implicit counter
    IotaReset,
    /// `var` line or indented block of lines
    VarSet(Vec<VarSetLine>),
    /// `ret` with optional values
    Return { vals: Option<Expr> },
    /// `defer` expression
    Defer { expr: Expr },
    /// `if` with optional condition and `with` clause
    If(If),
    /// `is` guarded block; only valid directly inside an `if` body
    Is(Is),
    /// `for ... in` loop
    For(For),
    /// Unconditional `loop`
    Loop(Loop),
    /// `break` with optional label
    Break { label: Option<String> },
    /// Assignment; `op` is one of the assign token kinds
    Assign { op: TokenKind, left: Expr, right: Expr },
}

/// One imported package: a quoted path and an optional alias.
#[derive(Debug, Clone)]
pub struct UsePackage {
    pub path: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    pub mixin: bool,
    pub type_params: Vec<String>,
    pub withs: Vec<Type>,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub withs: Vec<Type>,
    pub func_sigs: Vec<IntfFuncSig>,
}

/// A named function signature inside an interface body.
#[derive(Debug, Clone)]
pub struct IntfFuncSig {
    pub name: String,
    pub sig: FuncSig,
}

#[derive(Debug, Clone)]
pub struct PropertySet {
    pub props: Vec<Property>,
    pub vals: Option<Expr>,
}

/// A single property. Static properties are written without a leading
/// dot; instance properties with one.
#[derive(Debug, Clone)]
pub struct Property {
    pub is_static: bool,
    pub name: String,
    pub ty: Option<Type>,
}

/// A function definition. `name` is `None` for anonymous `fn`
/// expressions; `is_static` is true when the name was reached without
/// a leading dot.
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub is_static: bool,
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub returns: Vec<Type>,
    pub body: Vec<Stmt>,
}

/// A parameter: a name (or `_`) with an optional type.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Option<Type>,
}

/// One line of a `var` statement: names with optional types, and an
/// optional initializer list.
#[derive(Debug, Clone)]
pub struct VarSetLine {
    pub vars: Vec<VarDecl>,
    pub vals: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone)]
pub struct If {
    pub cond: Option<Expr>,
    pub with: Option<Box<Stmt>>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Is {
    pub cond: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct For {
    pub label: Option<String>,
    pub vars: Vec<String>,
    pub iter: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Loop {
    pub label: Option<String>,
    pub body: Vec<Stmt>,
}
