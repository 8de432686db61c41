use std::{fmt::Display, ops::Deref};

use itertools::Itertools;

use crate::source::SourceSpan;

#[derive(Debug, Clone)]
pub struct WithSpan<T> {
    inner: T,
    source_span: SourceSpan,
}

impl<T> WithSpan<T> {
    pub fn new(inner: T, source_span: SourceSpan) -> Self {
        Self { inner, source_span }
    }
    pub fn source_span(&self) -> SourceSpan {
        self.source_span
    }
    pub fn inner(&self) -> &T {
        &self.inner
    }
}
impl<T> Deref for WithSpan<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub trait AstNode {
    fn source_span(&self) -> SourceSpan;
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub source_span: SourceSpan,
    pub name: String,
}

impl AstNode for Identifier {
    fn source_span(&self) -> SourceSpan {
        self.source_span
    }
}
impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct HexLiteralExpr {
    pub text: String,
    pub source_span: SourceSpan,
}
impl HexLiteralExpr {
    /// The literal's digits, without any `0x` prefix.
    pub fn digits(&self) -> &str {
        self.text.strip_prefix("0x").unwrap_or(&self.text)
    }
}
impl Display for HexLiteralExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
impl AstNode for HexLiteralExpr {
    fn source_span(&self) -> SourceSpan {
        self.source_span
    }
}

/// A dotted run of identifiers such as `user32.MessageBoxA`. Always has at
/// least one segment.
#[derive(Debug, Clone)]
pub struct IdentPathExpr {
    first: Identifier,
    rest: Vec<Identifier>,
}
impl IdentPathExpr {
    pub fn new(first: Identifier) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }
    pub fn push(&mut self, segment: Identifier) {
        self.rest.push(segment);
    }
    pub fn segments(&self) -> impl Iterator<Item = &Identifier> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }
    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }
    pub fn is_empty(&self) -> bool {
        false
    }
    pub fn last_segment(&self) -> &Identifier {
        self.rest.last().unwrap_or(&self.first)
    }
    /// Every segment but the last, joined with `.`; `None` for a bare name.
    pub fn qualifier(&self) -> Option<String> {
        if self.rest.is_empty() {
            return None;
        }
        Some(
            self.segments()
                .take(self.len() - 1)
                .map(|segment| segment.name.as_str())
                .join("."),
        )
    }
    pub fn path(&self) -> String {
        self.segments().map(|segment| segment.name.as_str()).join(".")
    }
}
impl Display for IdentPathExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}
impl AstNode for IdentPathExpr {
    fn source_span(&self) -> SourceSpan {
        self.first
            .source_span()
            .cover(self.last_segment().source_span())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}
impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub operator: WithSpan<UnaryOperator>,
    pub right: Box<Expr>,
}
impl Display for UnaryExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {})", self.operator.inner, self.right)
    }
}
impl AstNode for UnaryExpr {
    fn source_span(&self) -> SourceSpan {
        self.operator.source_span.cover(self.right.source_span())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
}
impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Power => "**",
        })
    }
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub operator: WithSpan<BinaryOperator>,
}
impl Display for BinaryExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} {} {})", self.operator.inner, self.left, self.right)
    }
}
impl AstNode for BinaryExpr {
    fn source_span(&self) -> SourceSpan {
        self.left.source_span().cover(self.right.source_span())
    }
}

/// `[address]`: the value stored at `address`.
#[derive(Debug, Clone)]
pub struct DereferenceExpr {
    pub address: Box<Expr>,
    pub open_span: SourceSpan,
    pub close_span: SourceSpan,
}
impl Display for DereferenceExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(deref {})", self.address)
    }
}
impl AstNode for DereferenceExpr {
    fn source_span(&self) -> SourceSpan {
        self.open_span.cover(self.close_span)
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    HexLiteral(HexLiteralExpr),
    IdentPath(IdentPathExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Dereference(DereferenceExpr),
}
impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HexLiteral(expr) => Display::fmt(expr, f),
            Self::IdentPath(expr) => Display::fmt(expr, f),
            Self::Unary(expr) => Display::fmt(expr, f),
            Self::Binary(expr) => Display::fmt(expr, f),
            Self::Dereference(expr) => Display::fmt(expr, f),
        }
    }
}
impl AstNode for Expr {
    fn source_span(&self) -> SourceSpan {
        match self {
            Self::HexLiteral(expr) => expr.source_span(),
            Self::IdentPath(expr) => expr.source_span(),
            Self::Unary(expr) => expr.source_span(),
            Self::Binary(expr) => expr.source_span(),
            Self::Dereference(expr) => expr.source_span(),
        }
    }
}
