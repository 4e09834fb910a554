//! Evaluation of calc expressions.
//!
//! All arithmetic is checked 64-bit integer arithmetic. Overflow and
//! division by zero produce runtime errors located at the offending node.

use super::ast::{BinaryOp, Expr, ExprKind};
use crate::diagnostics::RuntimeError;
use crate::source::SourceLocation;

/// Evaluates an expression to an integer.
pub fn evaluate(expr: &Expr) -> Result<i64, RuntimeError> {
    match &expr.kind {
        ExprKind::Number(value) => Ok(*value),
        ExprKind::Negate(operand) => {
            let value = evaluate(operand)?;
            value.checked_neg().ok_or_else(|| overflow(expr))
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let left = evaluate(lhs)?;
            let right = evaluate(rhs)?;
            match op {
                BinaryOp::Add => left.checked_add(right).ok_or_else(|| overflow(expr)),
                BinaryOp::Sub => left.checked_sub(right).ok_or_else(|| overflow(expr)),
                BinaryOp::Mul => left.checked_mul(right).ok_or_else(|| overflow(expr)),
                BinaryOp::Div => {
                    if right == 0 {
                        return Err(RuntimeError::new("division by zero")
                            .at(SourceLocation::new(rhs.range.clone())));
                    }
                    left.checked_div(right).ok_or_else(|| overflow(expr))
                }
            }
        }
        ExprKind::Group(inner) => evaluate(inner),
    }
}

fn overflow(expr: &Expr) -> RuntimeError {
    RuntimeError::new("arithmetic overflow").at(SourceLocation::new(expr.range.clone()))
}
