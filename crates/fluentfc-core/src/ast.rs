//! The AST shape handed to the analyzer by the external lexer/parser.
//!
//! Lexing and parsing are out of scope for this crate (§1 of the
//! specification): a front-end driver lexes and parses source text and
//! constructs `Ast` nodes directly. This module defines the boundary, not an
//! implementation of it.

use std::cell::RefCell;

use crate::types::Type;

/// The syntactic kind of an AST node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    StringLiteral,
    NumberLiteral,
    DecimalLiteral,
    BooleanLiteral,
    Identifier,
    Array,
    FunctionCall,
    ObjectCreation,
    /// A parenthesized sub-expression: `(expr)`.
    Expression,
    PropertyAccess,
    ArithmeticExpression,
    BooleanExpression,
    Pointer,
    Dereference,

    /// A leading modifier on a `Declaration` statement marking it `const`
    /// rather than `let`; absent means mutable.
    Const,
    /// An explicit `: T` type annotation on a `Declaration`; its `value` is
    /// the marshalled type text (see `Type::marshal`/`Type::parse`).
    TypeAnnotation,

    // Arithmetic/boolean operator leaves, appearing as children of
    // `ArithmeticExpression`/`BooleanExpression` nodes between operands.
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,

    // Statements.
    Declaration,
    Reassignment,
    Return,
    If,
    ElseIf,
    Else,
    While,
    Block,
    ExpressionStatement,

    // Top-level declarations, produced by the parser and walked by the
    // file-code graph (component C).
    FunctionDecl,
    ModuleDecl,
    Import,
    Param,
    PropertyDecl,
}

impl Rule {
    /// Whether this rule can never be the target of `&` (address-of):
    /// literals and literal-shaped aggregates can't have their address taken.
    #[must_use]
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Rule::StringLiteral
                | Rule::NumberLiteral
                | Rule::BooleanLiteral
                | Rule::DecimalLiteral
                | Rule::Array
                | Rule::ArithmeticExpression
                | Rule::BooleanExpression
        )
    }

    /// Whether this rule is an arithmetic/boolean binary operator leaf.
    #[must_use]
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            Rule::Plus
                | Rule::Minus
                | Rule::Star
                | Rule::Slash
                | Rule::Eq
                | Rule::Ne
                | Rule::Lt
                | Rule::Gt
                | Rule::Le
                | Rule::Ge
                | Rule::And
                | Rule::Or
        )
    }

    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(self, Rule::Eq | Rule::Ne | Rule::Lt | Rule::Gt | Rule::Le | Rule::Ge)
    }

    #[must_use]
    pub fn is_logical(self) -> bool {
        matches!(self, Rule::And | Rule::Or)
    }
}

/// One node of the AST.
///
/// `inferred_type` is written once by the expression analyzer and read back
/// by IR lowering (§4.G: "lowering re-reads `inferredType` attached to each
/// expression node"); it is interior-mutable because lowering runs over a
/// shared, already-analyzed tree.
#[derive(Debug)]
pub struct Ast {
    pub rule: Rule,
    pub line: u32,
    pub column: u32,
    /// Literal text / identifier name / operator spelling, when applicable.
    pub value: Option<String>,
    pub children: Vec<Ast>,
    pub inferred_type: RefCell<Option<Type>>,
}

impl Ast {
    #[must_use]
    pub fn new(rule: Rule, line: u32, column: u32) -> Self {
        Self { rule, line, column, value: None, children: Vec::new(), inferred_type: RefCell::new(None) }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Ast>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }

    pub fn set_inferred_type(&self, ty: Type) {
        *self.inferred_type.borrow_mut() = Some(ty);
    }

    #[must_use]
    pub fn inferred_type(&self) -> Option<Type> {
        self.inferred_type.borrow().clone()
    }
}
