//! The `INLINE` standard sharding algorithm.
//!
//! Routes with an arithmetic template such as `t_order_${order_id % 2}`. The
//! placeholder body may use integer literals, the sharding column,
//! parentheses and `+ - * / %`.

use anyhow::{bail, Context, Result};
use regex::RegexBuilder;
use shardline_core::{inline, Properties};
use shardline_rule::{PreciseShardingValue, ShardingAlgorithm, ShardingValue};

use crate::props;

pub const TYPE: &str = "INLINE";
const EXPRESSION_KEY: &str = "algorithm-expression";

#[derive(Debug)]
pub struct InlineShardingAlgorithm {
    expression: String,
    template: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Expr(Node),
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(i64),
    Column(String),
    Negate(Box<Node>),
    Binary(Op, Box<Node>, Box<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl InlineShardingAlgorithm {
    pub fn new(expression: &str) -> Result<Self> {
        let expression = inline::normalize_placeholders(expression.trim());
        let template = parse_template(&expression)
            .with_context(|| format!("invalid algorithm expression `{expression}`"))?;
        Ok(Self {
            expression,
            template,
        })
    }

    pub fn from_props(props: &Properties) -> Result<Self> {
        Self::new(props::required_string(props, EXPRESSION_KEY)?)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Renders the target name for one value, or `None` when the template
    /// cannot be evaluated for it.
    pub fn render(&self, column: &str, value: &ShardingValue) -> Option<String> {
        let mut rendered = String::new();
        for segment in &self.template {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Expr(node) => rendered.push_str(&evaluate(node, column, value)?.to_string()),
            }
        }
        Some(rendered)
    }
}

impl ShardingAlgorithm for InlineShardingAlgorithm {
    fn algorithm_type(&self) -> &str {
        TYPE
    }

    fn do_sharding(&self, available_targets: &[String], value: &PreciseShardingValue<'_>) -> Option<String> {
        let target = self.render(value.column_name, value.value)?;
        available_targets
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(&target))
            .cloned()
    }

    /// `t_order_${order_id % 2}` under prefix `t_order_` becomes `${?%2}`.
    fn algorithm_structure(&self, data_node_prefix: &str, sharding_column: &str) -> Option<String> {
        let prefix_len = data_node_prefix.len();
        let body = match self.expression.get(..prefix_len) {
            Some(head) if !data_node_prefix.is_empty() && head.eq_ignore_ascii_case(data_node_prefix) => {
                &self.expression[prefix_len..]
            }
            _ => self.expression.as_str(),
        };
        let column = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(sharding_column)))
            .case_insensitive(true)
            .build()
            .ok()?;
        let replaced = column.replace_all(body, "?");
        Some(replaced.chars().filter(|ch| !ch.is_whitespace()).collect())
    }
}

fn evaluate(node: &Node, column: &str, value: &ShardingValue) -> Option<ShardingValue> {
    match node {
        Node::Number(number) => Some(ShardingValue::Number(*number)),
        Node::Column(name) if name.eq_ignore_ascii_case(column) => Some(value.clone()),
        Node::Column(_) => None,
        Node::Negate(inner) => {
            let inner = evaluate(inner, column, value)?.as_i64()?;
            inner.checked_neg().map(ShardingValue::Number)
        }
        Node::Binary(op, left, right) => {
            let left = evaluate(left, column, value)?.as_i64()?;
            let right = evaluate(right, column, value)?.as_i64()?;
            let result = match op {
                Op::Add => left.checked_add(right),
                Op::Sub => left.checked_sub(right),
                Op::Mul => left.checked_mul(right),
                Op::Div => left.checked_div(right),
                Op::Rem => left.checked_rem(right),
            };
            result.map(ShardingValue::Number)
        }
    }
}

fn parse_template(expression: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = expression;
    while let Some(start) = rest.find("${") {
        if start > 0 {
            segments.push(Segment::Literal(rest[..start].to_string()));
        }
        let body_start = start + 2;
        let end = rest[body_start..]
            .find('}')
            .map(|offset| body_start + offset)
            .context("unterminated placeholder")?;
        segments.push(Segment::Expr(parse_expression(&rest[body_start..end])?));
        rest = &rest[end + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    if !segments.iter().any(|segment| matches!(segment, Segment::Expr(_))) {
        bail!("expression has no placeholder");
    }
    Ok(segments)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(i64),
    Ident(String),
    Op(char),
    Open,
    Close,
}

fn tokenize(body: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            ch if ch.is_whitespace() => {
                chars.next();
            }
            '0'..='9' => {
                let mut digits = String::new();
                while let Some(&digit) = chars.peek().filter(|ch| ch.is_ascii_digit()) {
                    digits.push(digit);
                    chars.next();
                }
                tokens.push(Token::Number(
                    digits.parse().with_context(|| format!("number `{digits}` is out of range"))?,
                ));
            }
            ch if ch.is_alphabetic() || ch == '_' => {
                let mut ident = String::new();
                while let Some(&part) = chars.peek().filter(|ch| ch.is_alphanumeric() || **ch == '_') {
                    ident.push(part);
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            '+' | '-' | '*' | '/' | '%' => {
                tokens.push(Token::Op(ch));
                chars.next();
            }
            '(' => {
                tokens.push(Token::Open);
                chars.next();
            }
            ')' => {
                tokens.push(Token::Close);
                chars.next();
            }
            other => bail!("unexpected character `{other}`"),
        }
    }
    Ok(tokens)
}

fn parse_expression(body: &str) -> Result<Node> {
    let tokens = tokenize(body)?;
    let mut parser = ExprParser { tokens, position: 0 };
    let node = parser.sum()?;
    if let Some(token) = parser.peek() {
        bail!("unexpected token {token:?} in `{body}`");
    }
    Ok(node)
}

struct ExprParser {
    tokens: Vec<Token>,
    position: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn sum(&mut self) -> Result<Node> {
        let mut node = self.product()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.position += 1;
            let op = if op == '+' { Op::Add } else { Op::Sub };
            node = Node::Binary(op, Box::new(node), Box::new(self.product()?));
        }
        Ok(node)
    }

    fn product(&mut self) -> Result<Node> {
        let mut node = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.position += 1;
            let op = match op {
                '*' => Op::Mul,
                '/' => Op::Div,
                _ => Op::Rem,
            };
            node = Node::Binary(op, Box::new(node), Box::new(self.factor()?));
        }
        Ok(node)
    }

    fn factor(&mut self) -> Result<Node> {
        match self.next() {
            Some(Token::Number(number)) => Ok(Node::Number(number)),
            Some(Token::Ident(name)) => Ok(Node::Column(name)),
            Some(Token::Op('-')) => Ok(Node::Negate(Box::new(self.factor()?))),
            Some(Token::Open) => {
                let node = self.sum()?;
                match self.next() {
                    Some(Token::Close) => Ok(node),
                    _ => bail!("missing `)`"),
                }
            }
            Some(token) => bail!("unexpected token {token:?}"),
            None => bail!("unexpected end of expression"),
        }
    }
}
