//! Rule Condition Evaluator
//!
//! Restricted boolean expressions over a document's field map, e.g.
//! `customer == "_Test Customer" and doc.total_qty >= 10`.
//!
//! Grammar (no arithmetic, no calls):
//! - connectives `and` / `or` / `not` (also `&&` / `||` / `!`)
//! - comparisons `==` `!=` `<` `<=` `>` `>=`, `in` / `not in`
//! - string / number literals, `True` / `False` / `None`, `[a, b]` lists
//! - field references, optionally prefixed with `doc.`

use super::matcher::RuleCandidate;
use serde_json::{Map, Value};
use shared::models::TransactionDocument;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("Invalid condition at {pos}: {message}")]
    Parse { pos: usize, message: String },

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Cannot compare {left} with {right}")]
    TypeMismatch { left: String, right: String },
}

pub type ConditionResult<T> = Result<T, ConditionError>;

// ==================== Tokens ====================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Op(CmpOp),
    And,
    Or,
    Not,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

fn parse_err<T>(pos: usize, message: impl Into<String>) -> ConditionResult<T> {
    Err(ConditionError::Parse {
        pos,
        message: message.into(),
    })
}

fn tokenize(src: &str) -> ConditionResult<Vec<(usize, Token)>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '(' => tokens.push((start, Token::LParen)),
            ')' => tokens.push((start, Token::RParen)),
            '[' => tokens.push((start, Token::LBracket)),
            ']' => tokens.push((start, Token::RBracket)),
            ',' => tokens.push((start, Token::Comma)),
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return parse_err(start, "unterminated string"),
                        Some('\\') => {
                            if let Some(next) = chars.get(i + 1) {
                                s.push(*next);
                            }
                            i += 2;
                        }
                        Some(ch) if *ch == quote => break,
                        Some(ch) => {
                            s.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push((start, Token::Str(s)));
            }
            '=' | '!' | '<' | '>' => {
                let next_eq = chars.get(i + 1) == Some(&'=');
                let token = match (c, next_eq) {
                    ('=', true) => Token::Op(CmpOp::Eq),
                    ('!', true) => Token::Op(CmpOp::Ne),
                    ('<', true) => Token::Op(CmpOp::Le),
                    ('>', true) => Token::Op(CmpOp::Ge),
                    ('<', false) => Token::Op(CmpOp::Lt),
                    ('>', false) => Token::Op(CmpOp::Gt),
                    ('!', false) => Token::Not,
                    _ => return parse_err(start, "expected '=='"),
                };
                if next_eq {
                    i += 1;
                }
                tokens.push((start, token));
            }
            '&' | '|' => {
                if chars.get(i + 1) != Some(&c) {
                    return parse_err(start, format!("expected '{c}{c}'"));
                }
                i += 1;
                tokens.push((start, if c == '&' { Token::And } else { Token::Or }));
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                i += 1;
                while chars.get(i).is_some_and(|n| n.is_ascii_digit() || *n == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let num = text
                    .parse::<f64>()
                    .or_else(|_| parse_err(start, format!("invalid number '{text}'")))?;
                tokens.push((start, Token::Num(num)));
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                while chars
                    .get(i)
                    .is_some_and(|n| n.is_alphanumeric() || *n == '_' || *n == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    _ => Token::Ident(word),
                };
                tokens.push((start, token));
                continue;
            }
            other => return parse_err(start, format!("unexpected character '{other}'")),
        }
        i += 1;
    }
    Ok(tokens)
}

// ==================== AST ====================

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Field(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    In { needle: Box<Expr>, haystack: Box<Expr>, negated: bool },
}

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(_, t)| t)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(self.end)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token) -> ConditionResult<()> {
        let at = self.offset();
        match self.next() {
            Some(t) if t == expected => Ok(()),
            _ => parse_err(at, format!("expected {expected:?}")),
        }
    }

    fn or(&mut self) -> ConditionResult<Expr> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }
        Ok(left)
    }

    fn and(&mut self) -> ConditionResult<Expr> {
        let mut left = self.not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            left = Expr::And(Box::new(left), Box::new(self.not()?));
        }
        Ok(left)
    }

    fn not(&mut self) -> ConditionResult<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ConditionResult<Expr> {
        let left = self.primary()?;
        match self.peek() {
            Some(Token::Op(op)) => {
                let op = *op;
                self.pos += 1;
                Ok(Expr::Cmp(op, Box::new(left), Box::new(self.primary()?)))
            }
            Some(Token::In) => {
                self.pos += 1;
                Ok(Expr::In {
                    needle: Box::new(left),
                    haystack: Box::new(self.primary()?),
                    negated: false,
                })
            }
            Some(Token::Not) if self.peek_at(1) == Some(&Token::In) => {
                self.pos += 2;
                Ok(Expr::In {
                    needle: Box::new(left),
                    haystack: Box::new(self.primary()?),
                    negated: true,
                })
            }
            _ => Ok(left),
        }
    }

    fn primary(&mut self) -> ConditionResult<Expr> {
        let at = self.offset();
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Num(n)) => Ok(Expr::Literal(number(n))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "True" | "true" => Expr::Literal(Value::Bool(true)),
                "False" | "false" => Expr::Literal(Value::Bool(false)),
                "None" | "null" => Expr::Literal(Value::Null),
                _ => Expr::Field(name.strip_prefix("doc.").unwrap_or(&name).to_string()),
            }),
            Some(Token::LParen) => {
                let inner = self.or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() != Some(&Token::RBracket) {
                    loop {
                        items.push(self.or()?);
                        if self.peek() == Some(&Token::Comma) {
                            self.pos += 1;
                        } else {
                            break;
                        }
                    }
                }
                self.expect(Token::RBracket)?;
                Ok(Expr::List(items))
            }
            _ => parse_err(at, "expected a value"),
        }
    }
}

fn number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

// ==================== Evaluation ====================

/// Parsed condition, reusable across documents
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    expr: Expr,
}

impl Condition {
    pub fn parse(src: &str) -> ConditionResult<Self> {
        let tokens = tokenize(src)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: src.len(),
        };
        let expr = parser.or()?;
        if parser.pos < parser.tokens.len() {
            return parse_err(parser.offset(), "unexpected trailing input");
        }
        Ok(Self { expr })
    }

    /// Evaluate against a field map; the result is the value's truthiness
    pub fn evaluate(&self, fields: &Map<String, Value>) -> ConditionResult<bool> {
        Ok(truthy(&eval(&self.expr, fields)?))
    }
}

/// Parse and evaluate in one step
pub fn evaluate_condition(src: &str, fields: &Map<String, Value>) -> ConditionResult<bool> {
    Condition::parse(src)?.evaluate(fields)
}

fn eval(expr: &Expr, fields: &Map<String, Value>) -> ConditionResult<Value> {
    Ok(match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Field(name) => fields
            .get(name)
            .cloned()
            .ok_or_else(|| ConditionError::UnknownField(name.clone()))?,
        Expr::List(items) => Value::Array(
            items
                .iter()
                .map(|e| eval(e, fields))
                .collect::<ConditionResult<_>>()?,
        ),
        Expr::Not(inner) => Value::Bool(!truthy(&eval(inner, fields)?)),
        Expr::And(l, r) => Value::Bool(truthy(&eval(l, fields)?) && truthy(&eval(r, fields)?)),
        Expr::Or(l, r) => Value::Bool(truthy(&eval(l, fields)?) || truthy(&eval(r, fields)?)),
        Expr::Cmp(op, l, r) => {
            let (l, r) = (eval(l, fields)?, eval(r, fields)?);
            Value::Bool(compare(*op, &l, &r)?)
        }
        Expr::In {
            needle,
            haystack,
            negated,
        } => {
            let needle = eval(needle, fields)?;
            let found = match eval(haystack, fields)? {
                Value::Array(items) => items.iter().any(|i| loose_eq(&needle, i)),
                Value::String(s) => match &needle {
                    Value::String(n) => s.contains(n.as_str()),
                    other => return Err(mismatch(other, &Value::String(s))),
                },
                other => return Err(mismatch(&needle, &other)),
            };
            Value::Bool(found != *negated)
        }
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn type_name(value: &Value) -> String {
    match value {
        Value::Null => "None",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
    .to_string()
}

fn mismatch(left: &Value, right: &Value) -> ConditionError {
    ConditionError::TypeMismatch {
        left: type_name(left),
        right: type_name(right),
    }
}

/// Equality with numbers compared by value (1 == 1.0)
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> ConditionResult<bool> {
    match op {
        CmpOp::Eq => return Ok(loose_eq(left, right)),
        CmpOp::Ne => return Ok(!loose_eq(left, right)),
        _ => {}
    }

    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
    .ok_or_else(|| mismatch(left, right))?;

    Ok(match op {
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
    })
}

// ==================== Rule Filtering ====================

/// Drop candidates whose condition does not hold for `doc`
///
/// Without a document every candidate passes. A condition that fails to
/// parse or evaluate excludes its rule.
pub fn filter_by_condition(
    candidates: Vec<RuleCandidate>,
    doc: Option<&TransactionDocument>,
) -> Vec<RuleCandidate> {
    let Some(doc) = doc else {
        return candidates;
    };
    if candidates
        .iter()
        .all(|c| c.rule.condition.as_deref().is_none_or(|s| s.trim().is_empty()))
    {
        return candidates;
    }

    let fields = doc.as_field_map();
    candidates
        .into_iter()
        .filter(|c| {
            let Some(src) = c.rule.condition.as_deref().filter(|s| !s.trim().is_empty()) else {
                return true;
            };
            match evaluate_condition(src, &fields) {
                Ok(passed) => passed,
                Err(e) => {
                    tracing::warn!(rule = %c.rule.name, error = %e, "Rule condition rejected");
                    false
                }
            }
        })
        .collect()
}
