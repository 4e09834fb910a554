//! The built-in calc language, in two dialects.
//!
//! Calc is integer arithmetic with `+ - * /`, unary minus, and parentheses.
//! The two dialects share a grammar and differ only in how operators are
//! spelled when formatting: `lang.calc` renders symbols, `lang.calc.words`
//! renders `plus`, `minus`, `times`, and `over`. Either spelling is accepted
//! on input by both.

mod ast;
mod eval;
mod parser;

use crate::diagnostics::{ParseError, RuntimeError};
use crate::language::{LanguageModule, ParsedUnit, RunContext};
use crate::program::{Expression, RuntimeObject};
use crate::source::{SourceLocation, SourceOrigin};
use crate::styled::HighlightSpan;
use ast::{Expr, ExprKind};
use semver::Version;
use std::any::Any;
use tracing::debug;

/// Identifier of the symbolic-operator dialect.
pub const CALC_IDENTIFIER: &str = "lang.calc";
/// Identifier of the worded-operator dialect.
pub const CALC_WORDS_IDENTIFIER: &str = "lang.calc.words";

// =============================================================================
// Parsed form
// =============================================================================

/// A parsed calc program: the expression tree plus the highlight spans
/// recorded while lexing.
pub struct CalcUnit {
    root: Expr,
    spans: Vec<HighlightSpan>,
}

impl ParsedUnit for CalcUnit {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn expression_at(&self, offset: usize) -> Option<Expression> {
        let node = self.root.innermost_at(offset)?;
        Some(Expression::new(
            node.kind_name(),
            node.kind_description(),
            SourceLocation::new(node.range.clone()),
        ))
    }
}

// =============================================================================
// Module
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Symbols,
    Words,
}

/// A calc dialect as a loadable language module.
pub struct CalcModule {
    dialect: Dialect,
}

impl CalcModule {
    /// The `lang.calc` dialect with symbolic operators.
    pub fn symbols() -> Self {
        Self {
            dialect: Dialect::Symbols,
        }
    }

    /// The `lang.calc.words` dialect with worded operators.
    pub fn words() -> Self {
        Self {
            dialect: Dialect::Words,
        }
    }

    fn render(&self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Number(value) => value.to_string(),
            ExprKind::Negate(operand) => format!("-{}", self.render(operand)),
            ExprKind::Binary { op, lhs, rhs } => {
                let spelling = match self.dialect {
                    Dialect::Symbols => op.symbol(),
                    Dialect::Words => op.word(),
                };
                format!("{} {} {}", self.render(lhs), spelling, self.render(rhs))
            }
            ExprKind::Group(inner) => format!("({})", self.render(inner)),
        }
    }
}

impl LanguageModule for CalcModule {
    fn identifier(&self) -> &str {
        match self.dialect {
            Dialect::Symbols => CALC_IDENTIFIER,
            Dialect::Words => CALC_WORDS_IDENTIFIER,
        }
    }

    fn name(&self) -> &str {
        match self.dialect {
            Dialect::Symbols => "Calc",
            Dialect::Words => "Calc (worded operators)",
        }
    }

    fn declared_protocol_version(&self) -> Version {
        crate::language::protocol_version()
    }

    fn parse(
        &self,
        source: &str,
        origin: Option<&SourceOrigin>,
    ) -> Result<Box<dyn ParsedUnit>, ParseError> {
        debug!(
            identifier = self.identifier(),
            origin = origin.map(SourceOrigin::as_str),
            "Parsing source"
        );
        let (root, spans) = parser::parse(source)?;
        Ok(Box::new(CalcUnit { root, spans }))
    }

    fn format(&self, unit: &dyn ParsedUnit) -> Option<String> {
        let unit = unit.as_any().downcast_ref::<CalcUnit>()?;
        Some(self.render(&unit.root))
    }

    fn highlight(&self, unit: &dyn ParsedUnit) -> Option<Vec<HighlightSpan>> {
        let unit = unit.as_any().downcast_ref::<CalcUnit>()?;
        Some(unit.spans.clone())
    }

    fn run(
        &self,
        unit: &dyn ParsedUnit,
        _context: &RunContext,
    ) -> Result<RuntimeObject, RuntimeError> {
        let Some(unit) = unit.as_any().downcast_ref::<CalcUnit>() else {
            return Err(RuntimeError::new(
                "program was not produced by this language module",
            ));
        };
        let value = eval::evaluate(&unit.root)?;
        Ok(RuntimeObject::integer(value))
    }
}
