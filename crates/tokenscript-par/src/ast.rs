//! tokenscript-par - AST node definitions.
//!
//! Every node keeps the span of the token it originated from, so runtime
//! errors can always point back into the source.

use tokenscript_util::Span;

/// AST root - a script is a list of statements.
pub type Program = Vec<Stmt>;

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Variable declaration: `variable name: Type.SubType = expr;`
    VarDecl(VarDecl),

    /// Reassignment of a variable or one of its attributes.
    Reassign(Reassign),

    /// If / elif / else chain.
    If(IfStmt),

    /// While loop.
    While(WhileStmt),

    /// For-in loop.
    For(ForStmt),

    /// Return, with or without a value.
    Return(ReturnStmt),

    /// Bare expression statement.
    Expr(ExprStmt),
}

impl Stmt {
    /// The span of the statement's leading token.
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl(s) => s.span,
            Stmt::Reassign(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Expr(s) => s.span,
        }
    }
}

/// An identifier occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// Base types a variable can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Number,
    NumberWithUnit,
    String,
    Boolean,
    Color,
    List,
    Dictionary,
}

impl BaseType {
    /// The surface name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            BaseType::Number => "Number",
            BaseType::NumberWithUnit => "NumberWithUnit",
            BaseType::String => "String",
            BaseType::Boolean => "Boolean",
            BaseType::Color => "Color",
            BaseType::List => "List",
            BaseType::Dictionary => "Dictionary",
        }
    }
}

impl std::fmt::Display for BaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared type: base plus optional sub-type (`Color.Rgb`, `Number.Px`).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub base: BaseType,
    pub sub: Option<Ident>,
    pub span: Span,
}

/// Variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: Ident,
    pub ty: TypeSpec,
    pub init: Option<Expr>,
    pub span: Span,
}

/// Reassignment. `attrs` is empty for plain `name = expr;`, and holds the
/// attribute chain for `name.attr = expr;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reassign {
    pub target: Ident,
    pub attrs: Vec<Ident>,
    pub value: Expr,
    pub span: Span,
}

/// Bracketed statement block `[ ... ]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// If / elif / else chain.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub elif_branches: Vec<(Expr, Block)>,
    pub else_block: Option<Block>,
    pub span: Span,
}

/// While loop.
#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

/// For-in loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub binding: Ident,
    pub iterable: Expr,
    pub body: Block,
    pub span: Span,
}

/// Return statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

/// Expression statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal.
    Int(IntLit),

    /// Float literal.
    Float(FloatLit),

    /// Numeric literal with attached unit keyword.
    UnitNumber(UnitNumberLit),

    /// String literal.
    Str(StrLit),

    /// Boolean literal.
    Bool(BoolLit),

    /// Hex color literal.
    HexColor(HexColorLit),

    /// `null`.
    Null(Span),

    /// Identifier use.
    Ident(Ident),

    /// External reference `{dotted.path}`.
    Reference(ReferenceExpr),

    /// Attribute access chain `expr.a.b`.
    Attr(AttrExpr),

    /// Call `callee(args)`.
    Call(CallExpr),

    /// Index `expr[index]`.
    Index(IndexExpr),

    /// Unary operator application.
    Unary(UnaryExpr),

    /// Binary operator application.
    Binary(BinaryExpr),

    /// Whitespace-juxtaposed values, e.g. `1px solid black`.
    ImplicitList(ListExpr),

    /// Comma-separated values, producing a List.
    CommaList(ListExpr),
}

impl Expr {
    /// The span of the expression's originating token(s).
    pub fn span(&self) -> Span {
        match self {
            Expr::Int(e) => e.span,
            Expr::Float(e) => e.span,
            Expr::UnitNumber(e) => e.span,
            Expr::Str(e) => e.span,
            Expr::Bool(e) => e.span,
            Expr::HexColor(e) => e.span,
            Expr::Null(span) => *span,
            Expr::Ident(e) => e.span,
            Expr::Reference(e) => e.span,
            Expr::Attr(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::ImplicitList(e) => e.span,
            Expr::CommaList(e) => e.span,
        }
    }
}

/// Integer literal.
#[derive(Debug, Clone, PartialEq)]
pub struct IntLit {
    pub value: i64,
    pub span: Span,
}

/// Float literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatLit {
    pub value: f64,
    pub span: Span,
}

/// Numeric literal with unit keyword, e.g. `16px`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitNumberLit {
    pub value: f64,
    pub integral: bool,
    pub unit: String,
    pub span: Span,
}

/// String literal.
#[derive(Debug, Clone, PartialEq)]
pub struct StrLit {
    pub value: String,
    pub span: Span,
}

/// Boolean literal.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolLit {
    pub value: bool,
    pub span: Span,
}

/// Hex color literal, including the leading `#`.
#[derive(Debug, Clone, PartialEq)]
pub struct HexColorLit {
    pub value: String,
    pub span: Span,
}

/// Reference expression `{dotted.path}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceExpr {
    pub path: String,
    pub span: Span,
}

/// Attribute access: an object and an ordered chain of attribute names.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrExpr {
    pub object: Box<Expr>,
    pub attrs: Vec<Ident>,
    pub span: Span,
}

/// Call expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Index expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpr {
    pub object: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    /// Arithmetic negation `-`.
    Neg,
    /// Logical not `!`.
    Not,
}

/// Unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub op: UnOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// The surface spelling of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub span: Span,
}

/// Implicit or comma list payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ListExpr {
    pub items: Vec<Expr>,
    pub span: Span,
}
