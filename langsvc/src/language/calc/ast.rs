//! Located expression tree for the calc dialects.

use std::ops::Range;

/// Binary operators, with both dialects' spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    pub fn word(self) -> &'static str {
        match self {
            BinaryOp::Add => "plus",
            BinaryOp::Sub => "minus",
            BinaryOp::Mul => "times",
            BinaryOp::Div => "over",
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            BinaryOp::Add => "addition",
            BinaryOp::Sub => "subtraction",
            BinaryOp::Mul => "multiplication",
            BinaryOp::Div => "division",
        }
    }
}

/// A located expression node. Ranges are character offsets into the
/// original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    Number(i64),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Group(Box<Expr>),
}

impl Expr {
    pub fn new(kind: ExprKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }

    /// The deepest node whose range contains `offset`.
    ///
    /// A node "contains" an offset when `range.start <= offset < range.end`.
    pub fn innermost_at(&self, offset: usize) -> Option<&Expr> {
        if offset < self.range.start || offset >= self.range.end {
            return None;
        }
        let child = match &self.kind {
            ExprKind::Number(_) => None,
            ExprKind::Negate(operand) => operand.innermost_at(offset),
            ExprKind::Binary { lhs, rhs, .. } => lhs
                .innermost_at(offset)
                .or_else(|| rhs.innermost_at(offset)),
            ExprKind::Group(inner) => inner.innermost_at(offset),
        };
        Some(child.unwrap_or(self))
    }

    /// Short name of this node's kind, e.g. `binary operator`.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Number(_) => "number literal",
            ExprKind::Negate(_) => "negation",
            ExprKind::Binary { .. } => "binary operator",
            ExprKind::Group(_) => "grouped expression",
        }
    }

    /// Sentence-length description of this node's kind.
    pub fn kind_description(&self) -> String {
        match &self.kind {
            ExprKind::Number(value) => format!("the integer literal {}", value),
            ExprKind::Negate(_) => "arithmetic negation of its operand".to_string(),
            ExprKind::Binary { op, .. } => {
                format!("{} of its two operands", op.verb())
            }
            ExprKind::Group(_) => "a parenthesized sub-expression".to_string(),
        }
    }
}
