//! Boolean conditions gating questions and file mappings.
//!
//! Two shapes are supported: structured trees (`field`/`equals` leaves combined with
//! `and`/`or`/`not`) and a deliberately small expression grammar:
//!
//! ```text
//! expr := term (JOIN term)*        all JOINs in one expression must be the same
//! term := FIELD | FIELD ('==' | '!=') LITERAL
//! JOIN := '&&' | 'AND' | '||' | 'OR'
//! ```
//!
//! There is no precedence, no grouping, no negation and no ordering comparison. Anything
//! outside the grammar is rejected with [`Error::ConditionError`].

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;
use crate::variables::Answers;

/// A predicate over the current answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Expression(String),
    Leaf { field: String, equals: Value },
    And { and: Vec<Condition> },
    Or { or: Vec<Condition> },
    Not { not: Box<Condition> },
}

impl Condition {
    /// Evaluates the condition. Composites short-circuit left to right.
    pub fn evaluate(&self, answers: &Answers) -> Result<bool> {
        match self {
            Condition::Expression(expr) => evaluate_expression(expr, answers),
            Condition::Leaf { field, equals } => Ok(answers
                .get(field)
                .is_some_and(|actual| actual.to_string() == equals.to_string())),
            Condition::And { and } => {
                for condition in and {
                    if !condition.evaluate(answers)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or { or } => {
                for condition in or {
                    if condition.evaluate(answers)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not { not } => Ok(!not.evaluate(answers)?),
        }
    }

    /// Checks every expression in the tree against the grammar without evaluating it.
    pub fn validate(&self) -> Result<()> {
        match self {
            Condition::Expression(expr) => validate_expression(expr),
            Condition::Leaf { .. } => Ok(()),
            Condition::And { and: items } | Condition::Or { or: items } => {
                items.iter().try_for_each(Condition::validate)
            }
            Condition::Not { not } => not.validate(),
        }
    }
}

/// Evaluates an optional condition; an absent condition always holds.
pub fn evaluate(condition: Option<&Condition>, answers: &Answers) -> Result<bool> {
    match condition {
        Some(condition) => condition.evaluate(answers),
        None => Ok(true),
    }
}

/// Evaluates an expression string. Blank expressions hold.
pub fn evaluate_expression(expr: &str, answers: &Answers) -> Result<bool> {
    if expr.trim().is_empty() {
        return Ok(true);
    }
    let parsed = parse(expr)?;
    let result = match parsed.join {
        Some(Join::Or) => parsed.terms.iter().any(|term| term.holds(answers)),
        Some(Join::And) | None => parsed.terms.iter().all(|term| term.holds(answers)),
    };
    debug!("Condition '{expr}' evaluated to {result}");
    Ok(result)
}

/// Rejects expressions outside the grammar.
pub fn validate_expression(expr: &str) -> Result<()> {
    if expr.trim().is_empty() {
        return Ok(());
    }
    parse(expr).map(|_| ())
}

/// Resolves default-value sugar against the current answers.
///
/// * `$field` yields the answer stored under `field` verbatim (the literal is kept when absent).
/// * `{{field}}` substrings are replaced by the stringified answer; unknown references stay intact.
///
/// Non-string defaults are returned unchanged.
pub fn evaluate_default(default: &Value, answers: &Answers) -> Value {
    let Value::String(text) = default else {
        return default.clone();
    };

    if let Some(name) = text.strip_prefix('$') {
        if is_field_name(name) {
            return answers.get(name).cloned().unwrap_or_else(|| default.clone());
        }
    }

    Value::String(substitute_references(text, answers))
}

/// Returns the truthiness of a single answer value.
pub fn is_truthy(value: &Value) -> bool {
    value.is_truthy()
}

fn substitute_references(text: &str, answers: &Answers) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = after_open[..end].trim();
        match answers.get(name) {
            Some(value) if is_field_name(name) => out.push_str(&value.to_string()),
            _ => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after_open[end + 2..];
    }
    out.push_str(rest);
    out
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_ident_char)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(String),
    Eq,
    NotEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Join {
    And,
    Or,
}

#[derive(Debug)]
enum Term {
    Truthy(String),
    Equals { field: String, literal: String },
    NotEquals { field: String, literal: String },
}

impl Term {
    fn holds(&self, answers: &Answers) -> bool {
        match self {
            Term::Truthy(field) => answers.get(field).is_some_and(Value::is_truthy),
            Term::Equals { field, literal } => {
                answers.get(field).is_some_and(|v| v.to_string() == *literal)
            }
            Term::NotEquals { field, literal } => {
                answers.get(field).map_or(true, |v| v.to_string() != *literal)
            }
        }
    }
}

#[derive(Debug)]
struct Parsed {
    terms: Vec<Term>,
    join: Option<Join>,
}

fn condition_error(expr: &str, reason: impl Into<String>) -> Error {
    Error::ConditionError { expression: expr.to_string(), reason: reason.into() }
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '\'' | '"' => {
                let mut literal = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == c {
                        closed = true;
                        break;
                    }
                    literal.push(next);
                }
                if !closed {
                    return Err(condition_error(expr, "unterminated quoted value"));
                }
                tokens.push(Token::Literal(literal));
            }
            '=' => match chars.next() {
                Some('=') => tokens.push(Token::Eq),
                _ => return Err(condition_error(expr, "unsupported operator '=', use '=='")),
            },
            '!' => match chars.next() {
                Some('=') => tokens.push(Token::NotEq),
                _ => return Err(condition_error(expr, "negation with '!' is not supported")),
            },
            '&' => match chars.next() {
                Some('&') => tokens.push(Token::And),
                _ => return Err(condition_error(expr, "unsupported operator '&', use '&&'")),
            },
            '|' => match chars.next() {
                Some('|') => tokens.push(Token::Or),
                _ => return Err(condition_error(expr, "unsupported operator '|', use '||'")),
            },
            '(' | ')' => return Err(condition_error(expr, "parentheses are not supported")),
            '<' | '>' => {
                return Err(condition_error(
                    expr,
                    format!("comparison operator '{c}' is not supported"),
                ))
            }
            c if is_ident_char(c) => {
                let mut ident = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !is_ident_char(next) {
                        break;
                    }
                    ident.push(next);
                    chars.next();
                }
                tokens.push(match ident.as_str() {
                    "AND" | "and" => Token::And,
                    "OR" | "or" => Token::Or,
                    _ => Token::Ident(ident),
                });
            }
            other => {
                return Err(condition_error(expr, format!("unexpected character '{other}'")))
            }
        }
    }

    Ok(tokens)
}

fn parse(expr: &str) -> Result<Parsed> {
    let mut tokens = tokenize(expr)?.into_iter().peekable();
    let mut terms = Vec::new();
    let mut join: Option<Join> = None;

    loop {
        let field = match tokens.next() {
            Some(Token::Ident(field)) => field,
            Some(Token::Literal(lit)) => {
                return Err(condition_error(expr, format!("expected a field name, found '{lit}'")))
            }
            Some(_) => return Err(condition_error(expr, "expected a field name before operator")),
            None if terms.is_empty() => return Err(condition_error(expr, "empty expression")),
            None => return Err(condition_error(expr, "dangling logical operator")),
        };

        let term = match tokens.peek() {
            Some(Token::Eq) | Some(Token::NotEq) => {
                let negated = tokens.next() == Some(Token::NotEq);
                let literal = match tokens.next() {
                    Some(Token::Literal(lit)) | Some(Token::Ident(lit)) => lit,
                    _ => return Err(condition_error(expr, "expected a value after comparison")),
                };
                if negated {
                    Term::NotEquals { field, literal }
                } else {
                    Term::Equals { field, literal }
                }
            }
            _ => Term::Truthy(field),
        };
        terms.push(term);

        let next_join = match tokens.next() {
            None => break,
            Some(Token::And) => Join::And,
            Some(Token::Or) => Join::Or,
            Some(_) => return Err(condition_error(expr, "expected '&&' or '||' between terms")),
        };
        match join {
            Some(existing) if existing != next_join => {
                return Err(condition_error(expr, "mixing '&&' and '||' is not supported"))
            }
            _ => join = Some(next_join),
        }
    }

    Ok(Parsed { terms, join })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keywords_and_literals() {
        let tokens = tokenize("a == 'x y' AND b").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a".into()),
                Token::Eq,
                Token::Literal("x y".into()),
                Token::And,
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_dangling_operator() {
        assert!(parse("a &&").is_err());
        assert!(parse("&& a").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("a ==").is_err());
    }
}
