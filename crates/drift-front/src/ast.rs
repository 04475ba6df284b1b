//! The syntax tree contract with the parser.
//!
//! The parser consumes source text and emits this tree plus a populated
//! [`NamespaceContext`](crate::namespace::NamespaceContext); the lowering
//! stage only reads it. Node kinds correspond one-to-one with lowering
//! cases. Every node carries a [`SourceSpan`] usable verbatim in
//! diagnostics, and identifier terminals are annotated by the parser with
//! their resolution category and, where applicable, a fully-qualified name
//! (the grammar is context-sensitive, so the parser has to distinguish
//! type names from namespace names from plain identifiers anyway).

use serde::{Deserialize, Serialize};

use drift_context::SourceSpan;

// -- identifiers -----------------------------------------------------------

/// The parser's classification of an identifier terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// Resolves through locals, members, then the symbol table.
    GlobalScope,
    /// Known by the parser to be purely local. Kept for completeness; the
    /// parser no longer emits it for resolvable names.
    LocalScope,
    Uncategorized,
}

/// An identifier terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    /// Canonical `::`-joined name, when the parser resolved one.
    pub fully_qualified: Option<String>,
    pub kind: IdentifierKind,
    pub span: SourceSpan,
}

impl Identifier {
    /// The name to resolve against the symbol table: the parser's
    /// fully-qualified spelling when present, the bare name otherwise.
    pub fn symbol_name(&self) -> &str {
        self.fully_qualified.as_deref().unwrap_or(&self.name)
    }
}

/// A function's name as written at its definition site, already
/// canonicalized by the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Full canonical path, e.g. `geom::Point::scale`.
    pub fully_qualified: String,
    pub span: SourceSpan,
}

impl QualifiedName {
    pub fn new(fully_qualified: impl Into<String>, span: SourceSpan) -> Self {
        QualifiedName {
            fully_qualified: fully_qualified.into(),
            span,
        }
    }

    /// The last path segment.
    pub fn leaf(&self) -> &str {
        self.fully_qualified
            .rsplit("::")
            .next()
            .unwrap_or(&self.fully_qualified)
    }

    /// Everything before the last path segment; empty for unqualified
    /// names.
    pub fn parent(&self) -> &str {
        match self.fully_qualified.rfind("::") {
            Some(index) => &self.fully_qualified[..index],
            None => "",
        }
    }
}

// -- type specifiers -------------------------------------------------------

/// A type as written in source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSpecifier {
    pub kind: TypeSpecifierKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeSpecifierKind {
    /// A (possibly qualified) type name: `u32`, `geom::Point`.
    Named(String),
    Pointer(Box<TypeSpecifier>),
    Reference(Box<TypeSpecifier>),
    Array { element: Box<TypeSpecifier>, length: u64 },
}

impl TypeSpecifier {
    pub fn named(name: impl Into<String>, span: SourceSpan) -> Self {
        TypeSpecifier {
            kind: TypeSpecifierKind::Named(name.into()),
            span,
        }
    }

    pub fn pointer(inner: TypeSpecifier, span: SourceSpan) -> Self {
        TypeSpecifier {
            kind: TypeSpecifierKind::Pointer(Box::new(inner)),
            span,
        }
    }

    pub fn reference(inner: TypeSpecifier, span: SourceSpan) -> Self {
        TypeSpecifier {
            kind: TypeSpecifierKind::Reference(Box::new(inner)),
            span,
        }
    }
}

// -- expressions -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    PreIncrement,
    PreDecrement,
    AddressOf,
    Dereference,
    Plus,
    Minus,
    BitwiseNot,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    LogicalAnd,
    LogicalOr,
    BitwiseAnd,
    BitwiseOr,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Equal,
    NotEqual,
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    AndAssign,
    OrAssign,
    XorAssign,
}

/// The float suffix as written; absence means f64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatSuffix {
    F32,
    F64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Identifier(Identifier),
    /// A parenthesized expression. Lowers to whatever is inside.
    Nested(Box<Expr>),

    /// Raw token text between the quotes, escapes unprocessed.
    LiteralChar(String),
    /// Adjacent string literal tokens, each with escapes unprocessed; they
    /// concatenate after unescaping.
    LiteralString(Vec<String>),
    /// Raw token text, e.g. `0xfeed_u64`.
    LiteralInt(String),
    /// Digits without the suffix, plus the suffix if one was written.
    LiteralFloat { text: String, suffix: Option<FloatSuffix> },
    LiteralBool(bool),
    LiteralNull,

    ArrayIndex { array: Box<Expr>, index: Box<Expr> },
    FunctionCall { callee: Box<Expr>, arguments: Vec<Expr> },
    Dot { object: Box<Expr>, member: Identifier },
    Arrow { object: Box<Expr>, member: Identifier },
    PostIncrement(Box<Expr>),
    PostDecrement(Box<Expr>),

    Unary { op: UnaryOp, operand: Box<Expr> },
    SizeofType(TypeSpecifier),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },

    /// `cond ? a : b`. Parsed, not lowered in this version.
    Ternary {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
    /// `cast(T, e)`. Parsed, not lowered in this version.
    Cast { ty: TypeSpecifier, value: Box<Expr> },
}

impl Expr {
    pub fn new(kind: ExprKind, span: SourceSpan) -> Self {
        Expr { kind, span }
    }
}

// -- statements ------------------------------------------------------------

/// A `{ ... }` body with the span of the whole braced region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementList {
    pub statements: Vec<Stmt>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    VariableDeclaration(VariableDeclaration),
    Block { is_unsafe: bool, body: StatementList },
    Expression(Expr),
    IfElse(IfElse),
    While { condition: Expr, body: StatementList },
    For(Box<For>),
    Switch(Switch),
    Label { name: String, name_span: SourceSpan },
    Goto { label: String, label_span: SourceSpan },
    Break,
    Continue,
    Return(Option<Expr>),
}

impl Stmt {
    pub fn new(kind: StmtKind, span: SourceSpan) -> Self {
        Stmt { kind, span }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub ty: TypeSpecifier,
    pub name: Identifier,
    pub init: VariableInit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VariableInit {
    None,
    /// `T x = expr;`
    Expression(Expr),
    /// `C x(args);` -- constructor form, classes only.
    Constructor { arguments: Vec<Expr>, span: SourceSpan },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfElse {
    pub condition: Expr,
    pub then_body: StatementList,
    pub else_arm: ElseArm,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElseArm {
    None,
    Else(StatementList),
    ElseIf(Box<IfElse>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct For {
    /// `for (u32 i = ...; ...)` declares the loop variable in a scope
    /// covering the entire loop.
    pub declaration: Option<(TypeSpecifier, Identifier)>,
    pub init: Expr,
    pub condition: Expr,
    pub increment: Expr,
    pub body: StatementList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Switch {
    pub value: Expr,
    pub cases: Vec<SwitchCase>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    /// `None` is the `default` case, which must come last.
    pub value: Option<Expr>,
    pub body: StatementList,
    pub span: SourceSpan,
}

// -- file statements -------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub ty: TypeSpecifier,
    pub name: Identifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: QualifiedName,
    pub is_unsafe: bool,
    pub return_type: TypeSpecifier,
    pub parameters: Vec<Parameter>,
    pub body: StatementList,
    pub span: SourceSpan,
}

/// Top-level statements of a translation unit. Declarations, class bodies,
/// enums, typedefs, globals, and `using` directives are handled by the
/// declaration/type collaborator before function lowering runs; they appear
/// here so file iteration is total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileStatement {
    FunctionDeclaration { span: SourceSpan },
    FunctionDefinition(FunctionDefinition),
    GlobalDefinition { span: SourceSpan },
    ClassDeclaration { span: SourceSpan },
    ClassDefinition { span: SourceSpan },
    EnumDefinition { span: SourceSpan },
    TypeDefinition { span: SourceSpan },
    Namespace { name: String, statements: Vec<FileStatement>, span: SourceSpan },
    Using { span: SourceSpan },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub statements: Vec<FileStatement>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_context::{FileId, SourceSpan};

    fn span() -> SourceSpan {
        SourceSpan::point(FileId(0), 1, 1)
    }

    #[test]
    fn qualified_name_splits() {
        let name = QualifiedName::new("geom::Point::scale", span());
        assert_eq!(name.leaf(), "scale");
        assert_eq!(name.parent(), "geom::Point");

        let free = QualifiedName::new("main", span());
        assert_eq!(free.leaf(), "main");
        assert_eq!(free.parent(), "");
    }

    #[test]
    fn identifier_symbol_name_prefers_fully_qualified() {
        let plain = Identifier {
            name: "x".into(),
            fully_qualified: None,
            kind: IdentifierKind::GlobalScope,
            span: span(),
        };
        assert_eq!(plain.symbol_name(), "x");

        let qualified = Identifier {
            name: "max".into(),
            fully_qualified: Some("math::max".into()),
            kind: IdentifierKind::GlobalScope,
            span: span(),
        };
        assert_eq!(qualified.symbol_name(), "math::max");
    }

    #[test]
    fn serde_roundtrip_expression_tree() {
        // The tree is the wire format between the parser and this crate;
        // it has to survive serialization intact.
        let expr = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::new(
                    ExprKind::LiteralInt("3u32".into()),
                    span(),
                )),
                rhs: Box::new(Expr::new(
                    ExprKind::Identifier(Identifier {
                        name: "a".into(),
                        fully_qualified: None,
                        kind: IdentifierKind::GlobalScope,
                        span: span(),
                    }),
                    span(),
                )),
            },
            span(),
        );
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        let json2 = serde_json::to_string(&back).unwrap();
        assert_eq!(json, json2);
    }
}
