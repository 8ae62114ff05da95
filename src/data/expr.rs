//! User expression language for derived fields and row filters.
//!
//! Pipeline:
//! ```text
//!  "revenue - cost > 10"
//!        │ tokenize
//!        ▼
//!   [Ident, Minus, Ident, Gt, Int]
//!        │ parse (recursive descent)
//!        ▼
//!   Binary(Gt, Binary(Sub, revenue, cost), 10)
//!        │ evaluate (one pass per node over whole columns)
//!        ▼
//!   Series::Bool([..])
//! ```
//!
//! Only arithmetic, comparison and boolean operators over column names and
//! literals are accepted; there are no function calls or attribute access.

use std::collections::BTreeSet;
use std::fmt;

use super::model::{Column, DType, Table, Value, format_date};
use crate::error::{Result, WrangleError};

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Bool(bool),
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Int(i) => return write!(f, "{i}"),
            Token::Float(v) => return write!(f, "{v}"),
            Token::Str(s) => return write!(f, "'{s}'"),
            Token::Ident(s) => return write!(f, "{s}"),
            Token::Bool(b) => return write!(f, "{b}"),
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::StarStar => "**",
            Token::Slash => "/",
            Token::SlashSlash => "//",
            Token::Percent => "%",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
        };
        f.write_str(s)
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '%' => tokens.push(Token::Percent),
            '&' => tokens.push(Token::And),
            '|' => tokens.push(Token::Or),
            '~' => tokens.push(Token::Not),
            '*' if next == Some('*') => {
                tokens.push(Token::StarStar);
                i += 1;
            }
            '*' => tokens.push(Token::Star),
            '/' if next == Some('/') => {
                tokens.push(Token::SlashSlash);
                i += 1;
            }
            '/' => tokens.push(Token::Slash),
            '=' if next == Some('=') => {
                tokens.push(Token::EqEq);
                i += 1;
            }
            '=' => {
                return Err(WrangleError::formula(format!(
                    "unexpected '=' at position {i}; use '==' to compare"
                )));
            }
            '!' if next == Some('=') => {
                tokens.push(Token::NotEq);
                i += 1;
            }
            '!' => tokens.push(Token::Not),
            '<' if next == Some('=') => {
                tokens.push(Token::Le);
                i += 1;
            }
            '<' => tokens.push(Token::Lt),
            '>' if next == Some('=') => {
                tokens.push(Token::Ge);
                i += 1;
            }
            '>' => tokens.push(Token::Gt),
            '\'' | '"' => {
                let (text, end) = read_quoted(&chars, i, c)?;
                tokens.push(Token::Str(text));
                i = end;
            }
            '`' => {
                let (name, end) = read_quoted(&chars, i, '`')?;
                if name.is_empty() {
                    return Err(WrangleError::formula(format!(
                        "empty column name at position {i}"
                    )));
                }
                tokens.push(Token::Ident(name));
                i = end;
            }
            c if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let (token, end) = read_number(&chars, i)?;
                tokens.push(token);
                i = end;
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" | "True" => Token::Bool(true),
                    "false" | "False" => Token::Bool(false),
                    _ => Token::Ident(word),
                });
                continue;
            }
            other => {
                return Err(WrangleError::formula(format!(
                    "unexpected character '{other}' at position {i}"
                )));
            }
        }
        i += 1;
    }
    Ok(tokens)
}

/// Read a `quote`-delimited run starting at `start`; a backslash escapes the
/// next character. Returns the text and the index just past the closing quote.
fn read_quoted(chars: &[char], start: usize, quote: char) -> Result<(String, usize)> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                text.push(chars[i + 1]);
                i += 2;
            }
            c if c == quote => return Ok((text, i)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    Err(WrangleError::formula(format!(
        "unterminated {quote} starting at position {start}"
    )))
}

fn read_number(chars: &[char], start: usize) -> Result<(Token, usize)> {
    let mut i = start;
    let mut is_float = false;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        is_float |= chars[i] == '.';
        i += 1;
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            is_float = true;
            i = j;
        }
    }
    let text: String = chars[start..i].iter().collect();
    let bad = || WrangleError::formula(format!("invalid number '{text}' at position {start}"));
    let token = if is_float {
        Token::Float(text.parse().map_err(|_| bad())?)
    } else {
        match text.parse() {
            Ok(n) => Token::Int(n),
            Err(_) => Token::Float(text.parse().map_err(|_| bad())?),
        }
    };
    Ok((token, i))
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Column(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Column(name) => {
                out.insert(name.clone());
            }
            Expr::Unary(_, e) => e.collect_columns(out),
            Expr::Binary(_, l, r) => {
                l.collect_columns(out);
                r.collect_columns(out);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Precedence, loosest first:
/// `or` < `and` < `not` < comparison < `+ -` < `* / // %` < unary `-` < `**`
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?;
        while self.eat(&Token::Or) {
            let rhs = self.and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.not()?;
        while self.eat(&Token::And) {
            let rhs = self.not()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not(&mut self) -> Result<Expr> {
        if self.eat(&Token::Not) {
            let inner = self.not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::EqEq) => BinaryOp::Eq,
            Some(Token::NotEq) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.pos += 1;
        let rhs = self.additive()?;
        if matches!(
            self.peek(),
            Some(Token::EqEq | Token::NotEq | Token::Lt | Token::Le | Token::Gt | Token::Ge)
        ) {
            return Err(WrangleError::formula(
                "chained comparisons are not supported; combine them with 'and'",
            ));
        }
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::SlashSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            let inner = self.unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        if self.eat(&Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.primary()?;
        if self.eat(&Token::StarStar) {
            // Right-associative; the exponent may carry its own sign.
            let exp = self.unary()?;
            return Ok(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Int(i)) => Ok(Expr::Literal(Literal::Int(i))),
            Some(Token::Float(v)) => Ok(Expr::Literal(Literal::Float(v))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Token::Bool(b)) => Ok(Expr::Literal(Literal::Bool(b))),
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    return Err(WrangleError::formula(format!(
                        "function calls are not allowed ('{name}(...)')"
                    )));
                }
                Ok(Expr::Column(name))
            }
            Some(Token::LParen) => {
                let inner = self.or()?;
                if !self.eat(&Token::RParen) {
                    return Err(WrangleError::formula("missing closing ')'"));
                }
                Ok(inner)
            }
            Some(other) => Err(WrangleError::formula(format!("unexpected '{other}'"))),
            None => Err(WrangleError::formula("unexpected end of expression")),
        }
    }
}

// ---------------------------------------------------------------------------
// Vectorized values
// ---------------------------------------------------------------------------

/// Result of evaluating an expression over every row.
///
/// Integers keep their own lane so arithmetic on them stays exact; an
/// operation that overflows `i64` yields a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

impl Series {
    fn kind(&self) -> &'static str {
        match self {
            Series::Int(_) | Series::Float(_) => "number",
            Series::Bool(_) => "boolean",
            Series::Text(_) => "text",
        }
    }

    /// Float view of a numeric series.
    fn floats(&self) -> Option<Vec<Option<f64>>> {
        match self {
            Series::Int(values) => Some(values.iter().map(|v| v.map(|i| i as f64)).collect()),
            Series::Float(values) => Some(values.clone()),
            _ => None,
        }
    }

    fn from_column(col: &Column) -> Series {
        match col.dtype {
            DType::Integer => Series::Int(
                col.values
                    .iter()
                    .map(|v| match v {
                        Value::Integer(i) => Some(*i),
                        _ => None,
                    })
                    .collect(),
            ),
            DType::Float => Series::Float(col.as_f64()),
            DType::Bool => Series::Bool(
                col.values
                    .iter()
                    .map(|v| match v {
                        Value::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect(),
            ),
            DType::Text | DType::Date => Series::Text(
                col.values
                    .iter()
                    .map(|v| match v {
                        Value::Text(s) => Some(s.clone()),
                        Value::Date(d) => Some(format_date(d)),
                        _ => None,
                    })
                    .collect(),
            ),
        }
    }

    fn broadcast(lit: &Literal, n: usize) -> Series {
        match lit {
            Literal::Int(i) => Series::Int(vec![Some(*i); n]),
            Literal::Float(v) => Series::Float(vec![Some(*v); n]),
            Literal::Str(s) => Series::Text(vec![Some(s.clone()); n]),
            Literal::Bool(b) => Series::Bool(vec![Some(*b); n]),
        }
    }

    /// Materialise as a table column; non-finite numbers become `Null`.
    pub fn into_column(self, name: &str) -> Column {
        match self {
            Series::Int(values) => Column::new(
                name,
                DType::Integer,
                values
                    .into_iter()
                    .map(|v| v.map(Value::Integer).unwrap_or(Value::Null))
                    .collect(),
            ),
            Series::Float(values) => Column::new(
                name,
                DType::Float,
                values
                    .into_iter()
                    .map(|v| v.map(Value::finite).unwrap_or(Value::Null))
                    .collect(),
            ),
            Series::Bool(values) => Column::new(
                name,
                DType::Bool,
                values
                    .into_iter()
                    .map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
                    .collect(),
            ),
            Series::Text(values) => Column::new(
                name,
                DType::Text,
                values
                    .into_iter()
                    .map(|v| v.map(Value::Text).unwrap_or(Value::Null))
                    .collect(),
            ),
        }
    }
}

/// Exact integer arithmetic; `None` on overflow or a zero divisor.
fn int_arith(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        // Floor towards negative infinity.
        BinaryOp::FloorDiv => {
            let q = a.checked_div(b)?;
            let r = a.checked_rem(b)?;
            if r != 0 && (r < 0) != (b < 0) {
                q.checked_sub(1)
            } else {
                Some(q)
            }
        }
        // Result takes the divisor's sign.
        BinaryOp::Mod => {
            let r = a.checked_rem(b)?;
            if r != 0 && (r < 0) != (b < 0) {
                r.checked_add(b)
            } else {
                Some(r)
            }
        }
        _ => None,
    }
}

fn arith(op: BinaryOp, a: f64, b: f64) -> Option<f64> {
    let v = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        // Result takes the divisor's sign.
        BinaryOp::Mod => {
            if b == 0.0 {
                return None;
            }
            a - b * (a / b).floor()
        }
        BinaryOp::Pow => a.powf(b),
        _ => return None,
    };
    v.is_finite().then_some(v)
}

fn compare<T: PartialOrd>(op: BinaryOp, a: &T, b: &T) -> bool {
    match op {
        BinaryOp::Eq => a == b,
        BinaryOp::Ne => a != b,
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => false,
    }
}

fn zip_map<A, B, R>(
    a: &[Option<A>],
    b: &[Option<B>],
    f: impl Fn(&A, &B) -> Option<R>,
) -> Vec<Option<R>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => f(x, y),
            _ => None,
        })
        .collect()
}

fn apply_binary(op: BinaryOp, lhs: Series, rhs: Series) -> Result<Series> {
    use BinaryOp::*;
    let mismatch = |l: &Series, r: &Series| {
        WrangleError::formula(format!(
            "operator {op:?} cannot combine {} and {}",
            l.kind(),
            r.kind()
        ))
    };

    match (op, &lhs, &rhs) {
        (Add | Sub | Mul | FloorDiv | Mod, Series::Int(a), Series::Int(b)) => {
            Ok(Series::Int(zip_map(a, b, |x, y| int_arith(op, *x, *y))))
        }
        (Eq | Ne | Lt | Le | Gt | Ge, Series::Int(a), Series::Int(b)) => {
            Ok(Series::Bool(zip_map(a, b, |x, y| Some(compare(op, x, y)))))
        }
        (Add | Sub | Mul | Div | FloorDiv | Mod | Pow, _, _) => {
            match (lhs.floats(), rhs.floats()) {
                (Some(a), Some(b)) => Ok(Series::Float(zip_map(&a, &b, |x, y| arith(op, *x, *y)))),
                _ => match (op, &lhs, &rhs) {
                    (Add, Series::Text(a), Series::Text(b)) => {
                        Ok(Series::Text(zip_map(a, b, |x, y| Some(format!("{x}{y}")))))
                    }
                    _ => Err(mismatch(&lhs, &rhs)),
                },
            }
        }
        (Eq | Ne | Lt | Le | Gt | Ge, Series::Text(a), Series::Text(b)) => {
            Ok(Series::Bool(zip_map(a, b, |x, y| Some(compare(op, x, y)))))
        }
        (Eq | Ne | Lt | Le | Gt | Ge, _, _) => match (lhs.floats(), rhs.floats()) {
            (Some(a), Some(b)) => Ok(Series::Bool(zip_map(&a, &b, |x, y| Some(compare(op, x, y))))),
            _ => match (op, &lhs, &rhs) {
                (Eq | Ne, Series::Bool(a), Series::Bool(b)) => {
                    Ok(Series::Bool(zip_map(a, b, |x, y| Some(compare(op, x, y)))))
                }
                _ => Err(mismatch(&lhs, &rhs)),
            },
        },
        // Kleene logic: a known `false` decides `and`, a known `true` decides `or`.
        (And, Series::Bool(a), Series::Bool(b)) => Ok(Series::Bool(
            a.iter()
                .zip(b)
                .map(|(x, y)| match (x, y) {
                    (Some(false), _) | (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                })
                .collect(),
        )),
        (Or, Series::Bool(a), Series::Bool(b)) => Ok(Series::Bool(
            a.iter()
                .zip(b)
                .map(|(x, y)| match (x, y) {
                    (Some(true), _) | (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                })
                .collect(),
        )),
        _ => Err(mismatch(&lhs, &rhs)),
    }
}

fn apply_unary(op: UnaryOp, inner: Series) -> Result<Series> {
    match (op, inner) {
        (UnaryOp::Neg, Series::Int(values)) => Ok(Series::Int(
            values.into_iter().map(|v| v.and_then(i64::checked_neg)).collect(),
        )),
        (UnaryOp::Neg, Series::Float(values)) => Ok(Series::Float(
            values.into_iter().map(|v| v.map(|x| -x)).collect(),
        )),
        (UnaryOp::Not, Series::Bool(values)) => Ok(Series::Bool(
            values.into_iter().map(|v| v.map(|b| !b)).collect(),
        )),
        (UnaryOp::Neg, other) => Err(WrangleError::formula(format!(
            "cannot negate {}",
            other.kind()
        ))),
        (UnaryOp::Not, other) => Err(WrangleError::formula(format!(
            "'not' needs a boolean, got {}",
            other.kind()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Expression – parsed, reusable
// ---------------------------------------------------------------------------

/// A parsed user expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Expr,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Expression> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(WrangleError::formula("expression is empty"));
        }
        let mut parser = Parser { tokens, pos: 0 };
        let ast = parser.or()?;
        if let Some(extra) = parser.peek() {
            return Err(WrangleError::formula(format!(
                "unexpected '{extra}' after end of expression"
            )));
        }
        Ok(Expression {
            source: source.to_string(),
            ast,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Column names referenced by the expression.
    pub fn columns(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.ast.collect_columns(&mut out);
        out
    }

    /// Fail on the first referenced column the table lacks.
    pub fn check_columns(&self, table: &Table) -> Result<()> {
        match self.columns().into_iter().find(|c| table.column(c).is_none()) {
            Some(missing) => Err(WrangleError::formula(format!(
                "unknown column '{missing}' (available: {})",
                table.column_names().join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// Evaluate over every row of `table`.
    pub fn evaluate(&self, table: &Table) -> Result<Series> {
        self.check_columns(table)?;
        eval_node(&self.ast, table)
    }
}

fn eval_node(expr: &Expr, table: &Table) -> Result<Series> {
    match expr {
        Expr::Literal(lit) => Ok(Series::broadcast(lit, table.n_rows())),
        Expr::Column(name) => table
            .column(name)
            .map(Series::from_column)
            .ok_or_else(|| WrangleError::formula(format!("unknown column '{name}'"))),
        Expr::Unary(op, inner) => apply_unary(*op, eval_node(inner, table)?),
        Expr::Binary(op, l, r) => apply_binary(*op, eval_node(l, table)?, eval_node(r, table)?),
    }
}
