//! Dependency predicate evaluation
//!
//! Dependencies are small JavaScript boolean expressions over parameter
//! names (`"L > 10 && bracing"`). They are kept as source text in the
//! schema and compiled here, on demand, into an expression tree.

use crate::value::ParamValue;
use macrogen_template::{scan, ScanError};
use std::fmt::{self, Display, Formatter};
use tree_sitter::Node;

/// Compiled dependency predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    source: String,
    expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Ident(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
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
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "%" => Self::Rem,
            "==" | "===" => Self::Eq,
            "!=" | "!==" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "&&" => Self::And,
            "||" => Self::Or,
            _ => return None,
        })
    }
}

/// Runtime value inside a predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
            Self::Bool(b) => *b,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Bool(_) => "boolean",
        }
    }

    /// Numeric view with booleans as 0/1
    fn numeric(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(_) => None,
        }
    }
}

impl From<&ParamValue> for Value {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Boolean(b) => Self::Bool(*b),
            #[allow(clippy::cast_precision_loss)]
            ParamValue::Integer(i) => Self::Number(*i as f64),
            ParamValue::Float(f) => Self::Number(*f),
            ParamValue::Choice(s) => Self::Text(s.clone()),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Predicate compile and evaluation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum PredicateError {
    #[error("empty predicate")]
    Empty,

    #[error("predicate does not parse: {0}")]
    Syntax(#[from] ScanError),

    #[error("unsupported construct in predicate: {0}")]
    Unsupported(String),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },
}

impl Predicate {
    /// Compile predicate source text
    ///
    /// # Errors
    /// `PredicateError` if the text is empty, unparseable or uses anything
    /// besides literals, identifiers, arithmetic, comparisons and `!`/`&&`/`||`
    pub fn parse(text: &str) -> Result<Self, PredicateError> {
        let tree = scan(text)?;
        let root = tree.root();

        let mut cursor = root.walk();
        let mut statements = root
            .named_children(&mut cursor)
            .filter(|n| n.kind() != "comment");
        let statement = statements.next().ok_or(PredicateError::Empty)?;
        if statements.next().is_some() {
            return Err(PredicateError::Unsupported("multiple statements".to_string()));
        }
        if statement.kind() != "expression_statement" {
            return Err(PredicateError::Unsupported(statement.kind().to_string()));
        }
        let expression = statement
            .named_child(0)
            .ok_or(PredicateError::Empty)?;

        Ok(Self {
            source: text.trim().to_string(),
            expr: compile(expression, text)?,
        })
    }

    /// Source text
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names referenced by the predicate, in order of first use
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_idents(&self.expr, &mut names);
        names
    }

    /// Evaluate with parameter values supplied by `lookup`
    ///
    /// # Errors
    /// - `PredicateError::UnknownIdentifier` if `lookup` has no value for a name
    /// - `PredicateError::TypeMismatch` for operations on incompatible values
    pub fn evaluate<F>(&self, lookup: F) -> Result<bool, PredicateError>
    where
        F: Fn(&str) -> Option<ParamValue>,
    {
        eval(&self.expr, &lookup).map(|v| v.truthy())
    }
}

fn collect_idents<'e>(expr: &'e Expr, out: &mut Vec<&'e str>) {
    match expr {
        Expr::Literal(_) => {}
        Expr::Ident(name) => {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        Expr::Not(inner) | Expr::Neg(inner) => collect_idents(inner, out),
        Expr::Binary(_, left, right) => {
            collect_idents(left, out);
            collect_idents(right, out);
        }
    }
}

fn compile(node: Node<'_>, source: &str) -> Result<Expr, PredicateError> {
    let text = source.get(node.byte_range()).unwrap_or("");
    match node.kind() {
        "number" => text
            .parse()
            .map(|n| Expr::Literal(Value::Number(n)))
            .map_err(|_| PredicateError::Unsupported(text.to_string())),
        "string" => {
            let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
            Ok(Expr::Literal(Value::Text(inner.to_string())))
        }
        "true" => Ok(Expr::Literal(Value::Bool(true))),
        "false" => Ok(Expr::Literal(Value::Bool(false))),
        "identifier" => Ok(Expr::Ident(text.to_string())),
        "parenthesized_expression" => {
            let inner = node
                .named_child(0)
                .ok_or_else(|| PredicateError::Unsupported(text.to_string()))?;
            compile(inner, source)
        }
        "unary_expression" => {
            let operator = node
                .child_by_field_name("operator")
                .and_then(|op| source.get(op.byte_range()))
                .unwrap_or("");
            let argument = node
                .child_by_field_name("argument")
                .ok_or_else(|| PredicateError::Unsupported(text.to_string()))?;
            let inner = Box::new(compile(argument, source)?);
            match operator {
                "!" => Ok(Expr::Not(inner)),
                "-" => Ok(Expr::Neg(inner)),
                "+" => Ok(*inner),
                other => Err(PredicateError::Unsupported(format!("operator {other}"))),
            }
        }
        "binary_expression" => {
            let operator = node
                .child_by_field_name("operator")
                .and_then(|op| source.get(op.byte_range()))
                .unwrap_or("");
            let op = BinOp::from_token(operator)
                .ok_or_else(|| PredicateError::Unsupported(format!("operator {operator}")))?;
            let left = node
                .child_by_field_name("left")
                .ok_or_else(|| PredicateError::Unsupported(text.to_string()))?;
            let right = node
                .child_by_field_name("right")
                .ok_or_else(|| PredicateError::Unsupported(text.to_string()))?;
            Ok(Expr::Binary(
                op,
                Box::new(compile(left, source)?),
                Box::new(compile(right, source)?),
            ))
        }
        other => Err(PredicateError::Unsupported(other.to_string())),
    }
}

fn eval<F>(expr: &Expr, lookup: &F) -> Result<Value, PredicateError>
where
    F: Fn(&str) -> Option<ParamValue>,
{
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => lookup(name)
            .map(|v| Value::from(&v))
            .ok_or_else(|| PredicateError::UnknownIdentifier(name.clone())),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, lookup)?.truthy())),
        Expr::Neg(inner) => {
            let v = eval(inner, lookup)?;
            v.numeric()
                .map(|n| Value::Number(-n))
                .ok_or_else(|| mismatch("-", &v, &v))
        }
        Expr::Binary(BinOp::And, left, right) => {
            if !eval(left, lookup)?.truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(right, lookup)?.truthy()))
        }
        Expr::Binary(BinOp::Or, left, right) => {
            if eval(left, lookup)?.truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(right, lookup)?.truthy()))
        }
        Expr::Binary(op, left, right) => {
            let l = eval(left, lookup)?;
            let r = eval(right, lookup)?;
            binary(*op, &l, &r)
        }
    }
}

fn binary(op: BinOp, l: &Value, r: &Value) -> Result<Value, PredicateError> {
    let symbol = match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Rem => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
    };

    match op {
        BinOp::Eq | BinOp::Ne => {
            let equal = match (l, r) {
                (Value::Text(a), Value::Text(b)) => a == b,
                (Value::Text(_), _) | (_, Value::Text(_)) => {
                    return Err(mismatch(symbol, l, r));
                }
                _ => l.numeric() == r.numeric(),
            };
            Ok(Value::Bool(if op == BinOp::Eq { equal } else { !equal }))
        }
        BinOp::Add => match (l, r) {
            (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{a}{b}"))),
            _ => arithmetic(symbol, l, r, |a, b| a + b),
        },
        BinOp::Sub => arithmetic(symbol, l, r, |a, b| a - b),
        BinOp::Mul => arithmetic(symbol, l, r, |a, b| a * b),
        BinOp::Div => arithmetic(symbol, l, r, |a, b| a / b),
        BinOp::Rem => arithmetic(symbol, l, r, |a, b| a % b),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (l, r) {
                (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
                (Value::Text(_), _) | (_, Value::Text(_)) => None,
                _ => l
                    .numeric()
                    .zip(r.numeric())
                    .and_then(|(a, b)| a.partial_cmp(&b)),
            };
            let ordering = ordering.ok_or_else(|| mismatch(symbol, l, r))?;
            Ok(Value::Bool(match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinOp::And | BinOp::Or => Ok(Value::Bool(if op == BinOp::And {
            l.truthy() && r.truthy()
        } else {
            l.truthy() || r.truthy()
        })),
    }
}

fn arithmetic(
    symbol: &str,
    l: &Value,
    r: &Value,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, PredicateError> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(mismatch(symbol, l, r)),
    }
}

fn mismatch(op: &str, l: &Value, r: &Value) -> PredicateError {
    PredicateError::TypeMismatch {
        op: op.to_string(),
        left: l.type_name(),
        right: r.type_name(),
    }
}
