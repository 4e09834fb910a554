//! Lexer and parser for the calc dialects.
//!
//! Both dialects share one grammar: integer literals, unary minus, the four
//! binary operators, and parenthesized groups. The symbolic spellings
//! (`+ - * /`) and the worded spellings (`plus minus times over`) are both
//! accepted on input regardless of dialect; the dialect only matters when
//! formatting. All offsets are character offsets.

use super::ast::{BinaryOp, Expr, ExprKind};
use crate::diagnostics::{ParseError, SourceFix};
use crate::source::SourceLocation;
use crate::styled::{HighlightSpan, SpanKind};
use std::ops::Range;

// =============================================================================
// Tokens
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Number(i64),
    Op(BinaryOp),
    LParen,
    RParen,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    range: Range<usize>,
    /// How the token was spelled, for error messages.
    text: String,
}

fn word_operator(word: &str) -> Option<BinaryOp> {
    match word {
        "plus" => Some(BinaryOp::Add),
        "minus" => Some(BinaryOp::Sub),
        "times" => Some(BinaryOp::Mul),
        "over" => Some(BinaryOp::Div),
        _ => None,
    }
}

// =============================================================================
// Lexer
// =============================================================================

struct Lexed {
    tokens: Vec<Token>,
    spans: Vec<HighlightSpan>,
    /// Character length of the source.
    end: usize,
}

fn lex(source: &str) -> Result<Lexed, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c.is_ascii_digit() {
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value: i64 = text.parse().map_err(|_| {
                ParseError::new(
                    format!("integer literal '{}' is too large", text),
                    SourceLocation::new(start..i),
                )
            })?;
            spans.push(HighlightSpan::new(start..i, SpanKind::Number));
            tokens.push(Token {
                kind: TokenKind::Number(value),
                range: start..i,
                text,
            });
        } else if c.is_alphabetic() {
            while i < chars.len() && chars[i].is_alphanumeric() {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let Some(op) = word_operator(&text) else {
                let location = SourceLocation::new(start..i);
                return Err(ParseError::new(
                    format!("unrecognized word '{}'", text),
                    location.clone(),
                )
                .with_fixes(vec![SourceFix::deleting(location, source)]));
            };
            spans.push(HighlightSpan::new(start..i, SpanKind::Keyword));
            tokens.push(Token {
                kind: TokenKind::Op(op),
                range: start..i,
                text,
            });
        } else {
            i += 1;
            let text = c.to_string();
            let kind = match c {
                '+' => TokenKind::Op(BinaryOp::Add),
                '-' => TokenKind::Op(BinaryOp::Sub),
                '*' => TokenKind::Op(BinaryOp::Mul),
                '/' => TokenKind::Op(BinaryOp::Div),
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                _ => {
                    let location = SourceLocation::new(start..i);
                    return Err(ParseError::new(
                        format!("unexpected character '{}'", c),
                        location.clone(),
                    )
                    .with_fixes(vec![SourceFix::deleting(location, source)]));
                }
            };
            let span_kind = match kind {
                TokenKind::Op(_) => SpanKind::Operator,
                _ => SpanKind::Punctuation,
            };
            spans.push(HighlightSpan::new(start..i, span_kind));
            tokens.push(Token {
                kind,
                range: start..i,
                text,
            });
        }
    }

    Ok(Lexed {
        tokens,
        spans,
        end: chars.len(),
    })
}

// =============================================================================
// Parser
// =============================================================================

fn precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Add | BinaryOp::Sub => 1,
        BinaryOp::Mul | BinaryOp::Div => 2,
    }
}

/// Maximum nesting depth of groups and negations. Caps both parser recursion
/// and the depth of the resulting tree, so arbitrarily long input cannot
/// exhaust the stack during parsing, evaluation, or drop.
const MAX_NESTING_DEPTH: usize = 128;

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    depth: usize,
}

/// Parses source text into an expression plus highlight spans.
pub fn parse(source: &str) -> Result<(Expr, Vec<HighlightSpan>), ParseError> {
    let lexed = lex(source)?;
    let mut parser = Parser {
        source,
        tokens: lexed.tokens,
        pos: 0,
        end: lexed.end,
        depth: 0,
    };
    let root = parser.expression(0)?;
    if let Some(extra) = parser.peek().cloned() {
        let location = SourceLocation::new(extra.range.clone());
        return Err(ParseError::new(
            format!("did not expect '{}' here", extra.text),
            location.clone(),
        )
        .with_fixes(vec![SourceFix::deleting(location, source)]));
    }
    Ok((root, lexed.spans))
}

impl<'s> Parser<'s> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expression(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.primary(None)?;
        while let Some(token) = self.peek() {
            let TokenKind::Op(op) = token.kind else {
                break;
            };
            let prec = precedence(op);
            if prec < min_precedence {
                break;
            }
            let op_token = token.clone();
            self.pos += 1;
            let rhs = match self.peek().is_some() {
                true => self.expression(prec + 1)?,
                false => return Err(self.missing_operand(&op_token)),
            };
            let range = lhs.range.start..rhs.range.end;
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                range,
            );
        }
        Ok(lhs)
    }

    fn primary(&mut self, after_operator: Option<&Token>) -> Result<Expr, ParseError> {
        let Some(token) = self.advance() else {
            return Err(match after_operator {
                Some(op) => self.missing_operand(op),
                None => ParseError::new(
                    "expected an expression",
                    SourceLocation::at(self.end),
                ),
            });
        };
        match token.kind {
            TokenKind::Number(value) => {
                Ok(Expr::new(ExprKind::Number(value), token.range))
            }
            TokenKind::Op(BinaryOp::Sub) => {
                self.descend(&token)?;
                let operand = self.primary(Some(&token))?;
                self.depth -= 1;
                let range = token.range.start..operand.range.end;
                Ok(Expr::new(ExprKind::Negate(Box::new(operand)), range))
            }
            TokenKind::LParen => {
                self.descend(&token)?;
                let inner = self.expression(0)?;
                self.depth -= 1;
                match self.advance() {
                    Some(rparen) if rparen.kind == TokenKind::RParen => {
                        let range = token.range.start..rparen.range.end;
                        Ok(Expr::new(ExprKind::Group(Box::new(inner)), range))
                    }
                    Some(other) => {
                        let location = SourceLocation::new(other.range.clone());
                        Err(ParseError::new(
                            format!("did not expect '{}' here", other.text),
                            location.clone(),
                        )
                        .with_fixes(vec![SourceFix::deleting(location, self.source)]))
                    }
                    None => {
                        let caret = SourceLocation::at(self.end);
                        Err(ParseError::new(
                            "expected ')' to close the group",
                            caret.clone(),
                        )
                        .with_fixes(vec![SourceFix::appending(")", caret, self.source)]))
                    }
                }
            }
            _ => {
                let location = SourceLocation::new(token.range.clone());
                Err(ParseError::new(
                    format!("did not expect '{}' here", token.text),
                    location.clone(),
                )
                .with_fixes(vec![SourceFix::deleting(location, self.source)]))
            }
        }
    }

    /// Enters one nesting level, failing once the limit is reached.
    fn descend(&mut self, token: &Token) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                "expression is nested too deeply",
                SourceLocation::new(token.range.clone()),
            ));
        }
        Ok(())
    }

    /// Error for an operator with no right-hand operand. Ranked fixes:
    /// complete the expression (best), or drop the dangling operator.
    fn missing_operand(&self, op_token: &Token) -> ParseError {
        let caret = SourceLocation::at(self.end);
        let operand = if self
            .source
            .chars()
            .last()
            .is_some_and(|c| c.is_whitespace())
        {
            "1"
        } else {
            " 1"
        };
        ParseError::new(
            format!("expected an operand after '{}'", op_token.text),
            caret.clone(),
        )
        .with_fixes(vec![
            SourceFix::appending(operand, caret, self.source),
            SourceFix::deleting(SourceLocation::new(op_token.range.clone()), self.source),
        ])
    }
}
