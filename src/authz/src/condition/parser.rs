//! Tokenizer and recursive-descent parser for condition expressions

use super::error::{ConditionError, Result};
use super::value::Value;

/// Maximum nesting depth accepted by the parser
const MAX_DEPTH: usize = 64;

// ─── AST ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `{name}` placeholder, resolved against the user's attributes
    Attr(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    /// `a && b && ...`, kept flat so long chains do not deepen the tree
    And(Vec<Expr>),
    /// `a || b || ...`
    Or(Vec<Expr>),
    BinOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    In {
        element: Box<Expr>,
        collection: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Expr {
    /// Attribute names referenced by this expression
    pub fn attributes(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Attr(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expr::List(items) | Expr::And(items) | Expr::Or(items) => {
                items.iter().for_each(|e| e.collect_attributes(names))
            }
            Expr::Not(inner) | Expr::Neg(inner) => inner.collect_attributes(names),
            Expr::BinOp { left, right, .. } => {
                left.collect_attributes(names);
                right.collect_attributes(names);
            }
            Expr::In { element, collection } => {
                element.collect_attributes(names);
                collection.collect_attributes(names);
            }
            Expr::Literal(_) => {}
        }
    }
}

// ─── Tokenizer ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Attr(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Null,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Minus,
    Eq,       // ==
    Ne,       // != or <>
    StrictEq, // ===
    StrictNe, // !==
    Gt,
    Lt,
    Ge,
    Le,
    And, // && or `and`
    Or,  // || or `or`
    Not, // ! or `not`
    In,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    let at = |i: usize, c: char| chars.get(i) == Some(&c);

    while i < chars.len() {
        match chars[i] {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '{' => {
                i += 1;
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if !at(i, '}') {
                    return Err(ConditionError::CompilationError(
                        "placeholder must be `{name}` with word characters only".into(),
                    ));
                }
                tokens.push(Token::Attr(chars[start..i].iter().collect()));
                i += 1;
            }
            '=' if at(i + 1, '=') && at(i + 2, '=') => {
                tokens.push(Token::StrictEq);
                i += 3;
            }
            '=' if at(i + 1, '=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if at(i + 1, '=') && at(i + 2, '=') => {
                tokens.push(Token::StrictNe);
                i += 3;
            }
            '!' if at(i + 1, '=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '<' if at(i + 1, '>') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '<' if at(i + 1, '=') => {
                tokens.push(Token::Le);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Lt);
                i += 1;
            }
            '>' if at(i + 1, '=') => {
                tokens.push(Token::Ge);
                i += 2;
            }
            '>' => {
                tokens.push(Token::Gt);
                i += 1;
            }
            '&' if at(i + 1, '&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if at(i + 1, '|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            quote @ ('"' | '\'') => {
                i += 1;
                let mut s = String::new();
                while i < chars.len() && chars[i] != quote {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        i += 1;
                    }
                    s.push(chars[i]);
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(ConditionError::CompilationError(
                        "unterminated string literal".into(),
                    ));
                }
                tokens.push(Token::Str(s));
                i += 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                if num_str.contains('.') {
                    let f: f64 = num_str.parse().map_err(|_| {
                        ConditionError::CompilationError(format!("invalid float `{num_str}`"))
                    })?;
                    tokens.push(Token::Float(f));
                } else {
                    let n: i64 = num_str.parse().map_err(|_| {
                        ConditionError::CompilationError(format!("invalid integer `{num_str}`"))
                    })?;
                    tokens.push(Token::Int(n));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = match word.to_ascii_lowercase().as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "in" => Token::In,
                    _ => {
                        return Err(ConditionError::CompilationError(format!(
                            "unknown identifier `{word}`; attributes are written as `{{{word}}}`"
                        )))
                    }
                };
                tokens.push(token);
            }
            c => {
                return Err(ConditionError::CompilationError(format!(
                    "unexpected character `{c}`"
                )));
            }
        }
    }
    Ok(tokens)
}

// ─── Parser ─────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<()> {
        if self.advance() != Some(expected) {
            return Err(ConditionError::CompilationError(format!("expected {what}")));
        }
        Ok(())
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ConditionError::CompilationError(
                "expression nested too deeply".into(),
            ));
        }
        Ok(())
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = self.parse_or();
        self.depth -= 1;
        expr
    }

    /// or_expr = and_expr (("||" | "or") and_expr)*
    fn parse_or(&mut self) -> Result<Expr> {
        let mut operands = vec![self.parse_and()?];
        while self.peek() == Some(&Token::Or) {
            self.advance();
            operands.push(self.parse_and()?);
        }
        Ok(flatten(operands, Expr::Or))
    }

    /// and_expr = comparison (("&&" | "and") comparison)*
    fn parse_and(&mut self) -> Result<Expr> {
        let mut operands = vec![self.parse_comparison()?];
        while self.peek() == Some(&Token::And) {
            self.advance();
            operands.push(self.parse_comparison()?);
        }
        Ok(flatten(operands, Expr::And))
    }

    /// comparison = unary ((cmp_op | "in") unary)?
    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_unary()?;
        let op = match self.peek() {
            Some(Token::Eq) => BinOp::Eq,
            Some(Token::Ne) => BinOp::Ne,
            Some(Token::StrictEq) => BinOp::StrictEq,
            Some(Token::StrictNe) => BinOp::StrictNe,
            Some(Token::Gt) => BinOp::Gt,
            Some(Token::Lt) => BinOp::Lt,
            Some(Token::Ge) => BinOp::Ge,
            Some(Token::Le) => BinOp::Le,
            Some(Token::In) => {
                self.advance();
                let collection = self.parse_unary()?;
                return Ok(Expr::In {
                    element: Box::new(left),
                    collection: Box::new(collection),
                });
            }
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_unary()?;
        Ok(Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    /// unary = ("!" | "not" | "-") unary | primary
    fn parse_unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Not) => {
                self.advance();
                self.enter()?;
                let inner = self.parse_unary();
                self.depth -= 1;
                Ok(Expr::Not(Box::new(inner?)))
            }
            Some(Token::Minus) => {
                self.advance();
                self.enter()?;
                let inner = self.parse_unary();
                self.depth -= 1;
                Ok(match inner? {
                    Expr::Literal(Value::Int(n)) => Expr::Literal(Value::Int(-n)),
                    Expr::Literal(Value::Float(f)) => Expr::Literal(Value::Float(-f)),
                    other => Expr::Neg(Box::new(other)),
                })
            }
            _ => self.parse_primary(),
        }
    }

    /// primary = literal | "{" name "}" | "(" expr ")" | "[" (expr ("," expr)*)? "]"
    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::Int(n))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(f))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Attr(name)) => Ok(Expr::Attr(name)),
            Some(Token::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(Token::RParen, "closing parenthesis `)`")?;
                Ok(expr)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.advance();
                    return Ok(Expr::List(items));
                }
                loop {
                    items.push(self.parse_expr()?);
                    match self.advance() {
                        Some(Token::Comma) => continue,
                        Some(Token::RBracket) => break,
                        _ => {
                            return Err(ConditionError::CompilationError(
                                "expected `,` or `]` in list".into(),
                            ))
                        }
                    }
                }
                Ok(Expr::List(items))
            }
            other => Err(ConditionError::CompilationError(format!(
                "unexpected token: {other:?}"
            ))),
        }
    }
}

/// A single operand stands for itself; several form one flat node
fn flatten(mut operands: Vec<Expr>, node: fn(Vec<Expr>) -> Expr) -> Expr {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        node(operands)
    }
}

/// Parse a condition expression string into an AST.
pub fn parse_condition(input: &str) -> Result<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ConditionError::Empty);
    }
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(ConditionError::CompilationError(format!(
            "unexpected trailing token: {:?}",
            parser.tokens[parser.pos]
        )));
    }
    Ok(expr)
}
