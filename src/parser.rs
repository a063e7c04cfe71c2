use std::{borrow::Cow, iter::Peekable};

use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{BinOp, Expression, Token, TokenKind},
    coerce,
    lexer::{LexError, Tokenizer},
};

/// Errors that can occur while compiling an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    /// A token appeared where it cannot be used
    #[error("unexpected `{text}` at position {position}, expected {expected}")]
    UnexpectedToken {
        text: String,
        position: usize,
        expected: &'static str,
    },

    /// Input ended in the middle of a construct
    #[error("unexpected end of expression, expected {expected}")]
    UnexpectedEof { expected: &'static str },

    /// An operator with nothing on its right-hand side
    #[error("missing operand after `{operator}`")]
    MissingOperand { operator: String },

    /// Unbalanced `(`, `)` or `[`
    #[error("unmatched `{delimiter}` at position {position}")]
    UnmatchedDelimiter { delimiter: char, position: usize },

    /// No coercion registered under this name
    #[error("invalid coercion `{name}` at position {position}")]
    InvalidCoerce { name: String, position: usize },

    /// A coercion installer rejected its arguments
    #[error("coercion `{name}`: {reason}")]
    Coercion { name: String, reason: String },

    #[error("empty expression")]
    EmptyExpression,

    /// Nesting deeper than [`MAX_DEPTH`]
    #[error("expression nested too deeply at position {position}")]
    TooDeep { position: usize },
}

/// Deepest expression tree the parser will build.
///
/// Every group, array, `NOT`, `COERCE`, applied coercion and operator
/// counts one level. Depth is charged along the whole path from the root,
/// so operands that follow a deep left-hand side start from its depth.
/// Evaluation never recurses deeper than this.
pub const MAX_DEPTH: usize = 256;

/// Compiles expression text into an [`Expression`].
///
/// The parser keeps no precedence table. It accumulates a current
/// expression left to right: a value starts it, and each following
/// operator combines it with the next value. `&&` and `||` instead take
/// the rest of the enclosing group as their right operand.
///
/// Coercion installers receive the parser so they can consume their own
/// argument tokens through [`Parser::peek_kind`], [`Parser::next_token`],
/// [`Parser::expect`] and [`Parser::parse_value`].
pub struct Parser<'a> {
    src: &'a [u8],
    tokens: Peekable<Tokenizer<'a>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Parser {
            src,
            tokens: Tokenizer::new(src).peekable(),
            depth: 0,
        }
    }

    /// The expression text being parsed.
    pub fn source(&self) -> &'a [u8] {
        self.src
    }

    /// The text a token covers.
    pub fn token_text(&self, token: &Token) -> Cow<'a, str> {
        String::from_utf8_lossy(token.bytes(self.src))
    }

    /// Kind of the next token without consuming it.
    ///
    /// A lexical error is surfaced here rather than on the following
    /// [`Parser::next_token`].
    pub fn peek_kind(&mut self) -> Result<Option<TokenKind>, ParseError> {
        match self.tokens.peek() {
            None => Ok(None),
            Some(Ok(token)) => Ok(Some(token.kind)),
            Some(Err(_)) => match self.tokens.next() {
                Some(Err(e)) => Err(e.into()),
                _ => Ok(None),
            },
        }
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        self.tokens.next().transpose().map_err(ParseError::from)
    }

    /// Consumes the next token, which must be of `kind`.
    ///
    /// `expected` describes the token in the error message.
    pub fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        match self.next_token()? {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(self.unexpected(&token, expected)),
            None => Err(ParseError::UnexpectedEof { expected }),
        }
    }

    fn unexpected(&self, token: &Token, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            text: self.token_text(token).into_owned(),
            position: token.start,
            expected,
        }
    }

    /// Parses the whole input.
    pub fn parse(&mut self) -> Result<Expression, ParseError> {
        let expression = self.parse_expression()?;

        // The accumulation loop only stops early on `)`.
        if let Some(token) = self.next_token()? {
            return Err(ParseError::UnmatchedDelimiter {
                delimiter: ')',
                position: token.start,
            });
        }

        let expression = expression.ok_or(ParseError::EmptyExpression)?;
        debug!(
            expression = %String::from_utf8_lossy(self.src),
            const_eligible = expression.is_const_eligible(),
            "compiled expression"
        );
        Ok(expression)
    }

    /// Claims one more level of nesting for the construct at `position`.
    ///
    /// Levels are only given back between array elements, which keeps
    /// `depth` at or above the height of the tree built so far.
    fn descend(&mut self, position: usize) -> Result<(), ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(ParseError::TooDeep { position });
        }
        self.depth += 1;
        Ok(())
    }

    /// Accumulates an expression until `)` or end of input, consuming neither.
    fn parse_expression(&mut self) -> Result<Option<Expression>, ParseError> {
        let mut current = None;

        loop {
            match self.peek_kind()? {
                None | Some(TokenKind::CloseParen) => return Ok(current),
                Some(_) => {}
            }

            current = Some(match current {
                None => self.parse_value()?,
                Some(left) => self.parse_operation(left)?,
            });
        }
    }

    /// Parses one value: a literal, selector, `NOT` value, parenthesised
    /// group, array literal or `COERCE` construct.
    pub fn parse_value(&mut self) -> Result<Expression, ParseError> {
        let token = self
            .next_token()?
            .ok_or(ParseError::UnexpectedEof { expected: "value" })?;

        match token.kind {
            TokenKind::Number => self.parse_number(&token, false),
            TokenKind::QuotedString => {
                let raw = token.bytes(self.src);
                Ok(Expression::String(unescape(&raw[1..raw.len() - 1])))
            }
            TokenKind::BooleanTrue => Ok(Expression::Boolean(true)),
            TokenKind::BooleanFalse => Ok(Expression::Boolean(false)),
            TokenKind::Null => Ok(Expression::Null),
            TokenKind::SelectorPath => {
                let path = &token.bytes(self.src)[1..];
                let segments = path
                    .split(|&b| b == b'.')
                    .map(|segment| String::from_utf8_lossy(segment).into_owned())
                    .collect();
                Ok(Expression::Selector(segments))
            }

            // Negative numeric literal
            TokenKind::Subtract => match self.next_token()? {
                Some(number) if number.kind == TokenKind::Number => self.parse_number(&number, true),
                Some(other) => Err(self.unexpected(&other, "number after `-`")),
                None => Err(ParseError::MissingOperand {
                    operator: "-".to_string(),
                }),
            },

            TokenKind::Not => {
                self.descend(token.start)?;
                let operand = self.parse_operand("NOT")?;
                Ok(Expression::Not(Box::new(operand)))
            }

            TokenKind::OpenParen => {
                self.descend(token.start)?;
                let inner = self.parse_expression()?;
                match self.next_token()? {
                    Some(close) if close.kind == TokenKind::CloseParen => {}
                    _ => {
                        return Err(ParseError::UnmatchedDelimiter {
                            delimiter: '(',
                            position: token.start,
                        });
                    }
                }
                inner.ok_or(ParseError::EmptyExpression)
            }

            TokenKind::OpenBracket => {
                self.descend(token.start)?;
                self.parse_array(&token)
            }
            TokenKind::Coerce => {
                self.descend(token.start)?;
                self.parse_coerce()
            }

            _ => Err(self.unexpected(&token, "value")),
        }
    }

    /// Parses the right-hand operand of `operator`.
    fn parse_operand(&mut self, operator: &str) -> Result<Expression, ParseError> {
        match self.peek_kind()? {
            None | Some(TokenKind::CloseParen) => Err(ParseError::MissingOperand {
                operator: operator.to_string(),
            }),
            Some(_) => self.parse_value(),
        }
    }

    fn parse_number(&self, token: &Token, negate: bool) -> Result<Expression, ParseError> {
        let text = self.token_text(token);
        let n = text.parse::<f64>().map_err(|_| LexError::InvalidNumber {
            text: text.to_string(),
            position: token.start,
        })?;
        Ok(Expression::Float(if negate { -n } else { n }))
    }

    fn parse_array(&mut self, open: &Token) -> Result<Expression, ParseError> {
        let unmatched = ParseError::UnmatchedDelimiter {
            delimiter: '[',
            position: open.start,
        };

        let mut elements = vec![];
        if self.peek_kind()? == Some(TokenKind::CloseBracket) {
            self.next_token()?;
            return Ok(Expression::Array(elements));
        }

        // Elements are siblings: each starts at the array's depth.
        let base = self.depth;
        let mut deepest = base;
        loop {
            if self.peek_kind()?.is_none() {
                return Err(unmatched);
            }
            self.depth = base;
            elements.push(self.parse_value()?);
            deepest = deepest.max(self.depth);

            match self.next_token()? {
                Some(t) if t.kind == TokenKind::Comma => {}
                Some(t) if t.kind == TokenKind::CloseBracket => break,
                Some(t) => return Err(self.unexpected(&t, "`,` or `]`")),
                None => return Err(unmatched),
            }
        }
        self.depth = deepest;
        Ok(Expression::Array(elements))
    }

    /// `COERCE value _name_ [_name_ ...]`, applying coercions left to right.
    fn parse_coerce(&mut self) -> Result<Expression, ParseError> {
        let mut expression = self.parse_operand("COERCE")?;
        let mut const_eligible = expression.is_const_eligible();
        let mut first = true;

        loop {
            match self.peek_kind()? {
                Some(TokenKind::Identifier) => {}
                _ if !first => return Ok(expression),
                Some(_) => {
                    let token = self.next_token()?.ok_or(ParseError::EmptyExpression)?;
                    return Err(self.unexpected(&token, "coercion name"));
                }
                None => {
                    return Err(ParseError::UnexpectedEof {
                        expected: "coercion name",
                    });
                }
            }
            first = false;

            let token = self.expect(TokenKind::Identifier, "coercion name")?;
            self.descend(token.start)?;
            let name = self.token_text(&token);
            let install = coerce::lookup_coercion(&name).ok_or_else(|| ParseError::InvalidCoerce {
                name: name.to_string(),
                position: token.start,
            })?;

            (const_eligible, expression) = install(&mut *self, const_eligible, expression)?;
        }
    }

    /// Combines `left` with the operator that follows it.
    fn parse_operation(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let token = self
            .next_token()?
            .ok_or(ParseError::UnexpectedEof { expected: "operator" })?;
        // The operator sits above its left operand.
        self.descend(token.start)?;

        let op = match token.kind {
            TokenKind::Add => BinOp::Add,
            TokenKind::Subtract => BinOp::Subtract,
            TokenKind::Multiply => BinOp::Multiply,
            TokenKind::Divide => BinOp::Divide,
            TokenKind::Equals => BinOp::Equal,
            TokenKind::NotEquals => BinOp::NotEqual,
            TokenKind::Gt => BinOp::GreaterThan,
            TokenKind::Gte => BinOp::GreaterEqual,
            TokenKind::Lt => BinOp::LessThan,
            TokenKind::Lte => BinOp::LessEqual,
            TokenKind::Contains => BinOp::Contains,
            TokenKind::ContainsAny => BinOp::ContainsAny,
            TokenKind::ContainsAll => BinOp::ContainsAll,
            TokenKind::StartsWith => BinOp::StartsWith,
            TokenKind::EndsWith => BinOp::EndsWith,
            TokenKind::In => BinOp::In,

            TokenKind::And | TokenKind::Or => {
                let op = if token.kind == TokenKind::And {
                    BinOp::And
                } else {
                    BinOp::Or
                };
                let right = self.parse_expression()?.ok_or_else(|| ParseError::MissingOperand {
                    operator: self.token_text(&token).into_owned(),
                })?;
                return Ok(Expression::binary(op, left, right));
            }

            TokenKind::Between => {
                let lower = self.parse_operand("BETWEEN")?;
                self.expect(TokenKind::And, "`AND` in BETWEEN")?;
                let upper = self.parse_operand("AND")?;
                return Ok(Expression::Between {
                    value: Box::new(left),
                    lower: Box::new(lower),
                    upper: Box::new(upper),
                });
            }

            _ => return Err(self.unexpected(&token, "operator")),
        };

        let right = self.parse_operand(&self.token_text(&token))?;
        Ok(Expression::binary(op, left, right))
    }
}

/// Compiles `src` into an [`Expression`].
///
/// # Examples
///
/// ```
/// use express_lang::{parse, Value};
///
/// let expression = parse(b".properties.employees > 20").unwrap();
/// let document = br#"{"name":"MyCompany","properties":{"employees":50}}"#;
/// assert_eq!(expression.calculate(document).unwrap(), Value::Boolean(true));
/// ```
pub fn parse(src: &[u8]) -> Result<Expression, ParseError> {
    Parser::new(src).parse()
}

/// Resolves backslash escapes in the body of a quoted string.
fn unescape(raw: &[u8]) -> String {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter();

    while let Some(&b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'r') => out.push(b'\r'),
            Some(&other) => out.push(other),
            None => {}
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
