/// The closed set of token kinds produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// Dotted field path
    ///
    /// # Examples
    /// ```text
    /// .name
    /// .properties.employees
    /// ```
    SelectorPath,

    /// String literal enclosed in double or single quotes
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// 'it\'s'
    /// ```
    QuotedString,

    /// Numeric literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 3.14
    /// 1e6
    /// ```
    Number,

    /// `true`
    BooleanTrue,

    /// `false`
    BooleanFalse,

    /// `NULL` or `null`
    Null,

    // Operators
    /// `==` or `=`
    Equals,
    /// `!=`
    NotEquals,
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `&&`, `&` or `AND`
    And,
    /// `||`, `|` or `OR`
    Or,
    /// `!` or `NOT`
    Not,
    /// `CONTAINS`
    Contains,
    /// `CONTAINS_ANY`
    ContainsAny,
    /// `CONTAINS_ALL`
    ContainsAll,
    /// `IN`
    In,
    /// `BETWEEN`
    Between,
    /// `STARTSWITH`
    StartsWith,
    /// `ENDSWITH`
    EndsWith,

    // Delimiters
    /// `[`
    OpenBracket,
    /// `]`
    CloseBracket,
    /// `,`
    Comma,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `:`
    Colon,

    /// `COERCE` marker
    ///
    /// # Examples
    /// ```text
    /// COERCE .created_at _datetime_
    /// ```
    Coerce,

    /// Underscore-bracketed name, only meaningful after a coerced value
    ///
    /// # Examples
    /// ```text
    /// _datetime_
    /// _lowercase_
    /// ```
    Identifier,
}

impl TokenKind {
    /// Whether this kind can only appear after an accumulated expression.
    pub fn is_operator(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Equals
                | NotEquals
                | Add
                | Subtract
                | Multiply
                | Divide
                | Gt
                | Gte
                | Lt
                | Lte
                | And
                | Or
                | Contains
                | ContainsAny
                | ContainsAll
                | In
                | Between
                | StartsWith
                | EndsWith
        )
    }
}

/// A lexed token.
///
/// Tokens do not own text; they point back into the expression buffer
/// they were scanned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// Byte offset of the first byte of the token.
    pub start: usize,
    /// Length of the token in bytes.
    pub len: u16,
    pub kind: TokenKind,
}

impl Token {
    /// Byte offset one past the last byte of the token.
    pub fn end(&self) -> usize {
        self.start + usize::from(self.len)
    }

    /// The bytes of `src` covered by this token.
    ///
    /// `src` must be the buffer the token was lexed from.
    pub fn bytes<'a>(&self, src: &'a [u8]) -> &'a [u8] {
        &src[self.start..self.end()]
    }
}
