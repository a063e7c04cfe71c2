use thiserror::Error;

use crate::ast::{Token, TokenKind};

/// Errors raised while scanning an expression.
///
/// Every variant carries the offending text (lossily decoded) and the byte
/// offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated string `{text}` at position {position}")]
    UnterminatedString { text: String, position: usize },

    #[error("invalid selector path `{text}` at position {position}")]
    InvalidSelectorPath { text: String, position: usize },

    #[error("invalid keyword `{text}` at position {position}")]
    InvalidKeyword { text: String, position: usize },

    #[error("invalid boolean `{text}` at position {position}")]
    InvalidBool { text: String, position: usize },

    #[error("invalid number `{text}` at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("unsupported character {character:?} at position {position}")]
    UnsupportedCharacter { character: char, position: usize },

    #[error("invalid identifier `{text}` at position {position}")]
    InvalidIdentifier { text: String, position: usize },

    #[error("token at position {position} is longer than 65535 bytes")]
    TokenTooLong { position: usize },
}

/// Scans an expression buffer into [`Token`]s.
///
/// The tokenizer is a lazy, fused iterator: it stops for good after the
/// first error or at the end of input. Create a new one to scan again.
pub struct Tokenizer<'a> {
    src: &'a [u8],
    position: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Tokenizer { src, position: 0 }
    }

    /// The buffer being scanned.
    pub fn source(&self) -> &'a [u8] {
        self.src
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.src[start..end.min(self.src.len())]).into_owned()
    }

    fn skip_whitespace(&mut self) {
        while let Some(&b) = self.src.get(self.position) {
            match whitespace_len(self.src, self.position) {
                // A bare Latin-1 NEL / NBSP can only appear between tokens
                0 if matches!(b, 0x85 | 0xa0) => self.position += 1,
                0 => break,
                n => self.position += n,
            }
        }
    }

    /// First offset at or after `from` holding whitespace or one of `stops`.
    fn scan_until(&self, from: usize, stops: &[u8]) -> usize {
        (from..self.src.len())
            .find(|&i| stops.contains(&self.src[i]) || whitespace_len(self.src, i) > 0)
            .unwrap_or(self.src.len())
    }

    fn token(&mut self, start: usize, len: usize, kind: TokenKind) -> Result<Token, LexError> {
        let len = u16::try_from(len).map_err(|_| LexError::TokenTooLong { position: start })?;
        self.position = start + usize::from(len);
        Ok(Token { start, len, kind })
    }

    /// Emits `double` when the byte after `start` is `second`, else `single`.
    fn one_or_two(
        &mut self,
        start: usize,
        second: u8,
        single: TokenKind,
        double: TokenKind,
    ) -> Result<Token, LexError> {
        if self.src.get(start + 1) == Some(&second) {
            self.token(start, 2, double)
        } else {
            self.token(start, 1, single)
        }
    }

    fn read_selector(&mut self, start: usize) -> Result<Token, LexError> {
        let end = self.scan_until(start + 1, b")],");

        if end == start + 1 {
            return Err(LexError::InvalidSelectorPath {
                text: self.text(start, end),
                position: start,
            });
        }
        self.token(start, end - start, TokenKind::SelectorPath)
    }

    fn read_string(&mut self, start: usize, quote: u8) -> Result<Token, LexError> {
        let mut i = start + 1;
        while let Some(&b) = self.src.get(i) {
            match b {
                b'\\' => i += 2,
                b if b == quote => return self.token(start, i + 1 - start, TokenKind::QuotedString),
                _ => i += 1,
            }
        }

        Err(LexError::UnterminatedString {
            text: self.text(start, self.src.len()),
            position: start,
        })
    }

    fn read_number(&mut self, start: usize) -> Result<Token, LexError> {
        let mut end = start;
        while let Some(&b) = self.src.get(end) {
            let exponent_sign =
                matches!(b, b'+' | b'-') && matches!(self.src[end - 1], b'e' | b'E');
            if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || exponent_sign {
                end += 1;
            } else {
                break;
            }
        }

        let valid = std::str::from_utf8(&self.src[start..end])
            .ok()
            .is_some_and(|s| s.parse::<f64>().is_ok());
        if !valid {
            return Err(LexError::InvalidNumber {
                text: self.text(start, end),
                position: start,
            });
        }
        self.token(start, end - start, TokenKind::Number)
    }

    fn read_identifier(&mut self, start: usize) -> Result<Token, LexError> {
        let invalid = |tokenizer: &Self, end: usize| LexError::InvalidIdentifier {
            text: tokenizer.text(start, end),
            position: start,
        };

        let Some(close) = self.src[start + 1..].iter().position(|&b| b == b'_') else {
            let end = self.scan_until(start, &[]);
            return Err(invalid(self, end));
        };

        let name = &self.src[start + 1..start + 1 + close];
        let end = start + close + 2;
        if name.is_empty() || !name.iter().all(u8::is_ascii_alphanumeric) {
            return Err(invalid(self, end));
        }
        self.token(start, end - start, TokenKind::Identifier)
    }

    fn read_keyword(&mut self, start: usize) -> Result<Token, LexError> {
        let end = self.src[start..]
            .iter()
            .position(|&b| !(b.is_ascii_alphabetic() || b == b'_'))
            .map_or(self.src.len(), |i| start + i);

        let kind = match &self.src[start..end] {
            b"true" => TokenKind::BooleanTrue,
            b"false" => TokenKind::BooleanFalse,
            b"NULL" | b"null" => TokenKind::Null,
            b"COERCE" => TokenKind::Coerce,
            b"AND" => TokenKind::And,
            b"OR" => TokenKind::Or,
            b"NOT" => TokenKind::Not,
            b"IN" => TokenKind::In,
            b"BETWEEN" => TokenKind::Between,
            b"CONTAINS" => TokenKind::Contains,
            b"CONTAINS_ANY" => TokenKind::ContainsAny,
            b"CONTAINS_ALL" => TokenKind::ContainsAll,
            b"STARTSWITH" => TokenKind::StartsWith,
            b"ENDSWITH" => TokenKind::EndsWith,
            [b't' | b'f', ..] => {
                return Err(LexError::InvalidBool {
                    text: self.text(start, end),
                    position: start,
                });
            }
            _ => {
                return Err(LexError::InvalidKeyword {
                    text: self.text(start, end),
                    position: start,
                });
            }
        };
        self.token(start, end - start, kind)
    }

    fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        self.skip_whitespace();

        let start = self.position;
        let first = *self.src.get(start)?;

        let result = match first {
            b'.' => self.read_selector(start),
            b'"' | b'\'' => self.read_string(start, first),
            b'0'..=b'9' => self.read_number(start),
            b'_' => self.read_identifier(start),
            b if b.is_ascii_alphabetic() => self.read_keyword(start),
            b'(' => self.token(start, 1, TokenKind::OpenParen),
            b')' => self.token(start, 1, TokenKind::CloseParen),
            b'[' => self.token(start, 1, TokenKind::OpenBracket),
            b']' => self.token(start, 1, TokenKind::CloseBracket),
            b',' => self.token(start, 1, TokenKind::Comma),
            b':' => self.token(start, 1, TokenKind::Colon),
            b'+' => self.token(start, 1, TokenKind::Add),
            b'-' => self.token(start, 1, TokenKind::Subtract),
            b'*' => self.token(start, 1, TokenKind::Multiply),
            b'/' => self.token(start, 1, TokenKind::Divide),
            b'=' => self.one_or_two(start, b'=', TokenKind::Equals, TokenKind::Equals),
            b'!' => self.one_or_two(start, b'=', TokenKind::Not, TokenKind::NotEquals),
            b'>' => self.one_or_two(start, b'=', TokenKind::Gt, TokenKind::Gte),
            b'<' => self.one_or_two(start, b'=', TokenKind::Lt, TokenKind::Lte),
            b'&' => self.one_or_two(start, b'&', TokenKind::And, TokenKind::And),
            b'|' => self.one_or_two(start, b'|', TokenKind::Or, TokenKind::Or),
            other => Err(LexError::UnsupportedCharacter {
                character: char::from(other),
                position: start,
            }),
        };

        if result.is_err() {
            self.position = self.src.len();
        }
        Some(result)
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

impl std::iter::FusedIterator for Tokenizer<'_> {}

/// Length of the whitespace sequence at `i`, or 0.
///
/// NEL and NBSP only count as their complete UTF-8 encodings (`C2 85`,
/// `C2 A0`). A lone `0x85` or `0xA0` is a continuation byte of some other
/// character, as in `à` (`C3 A0`).
fn whitespace_len(src: &[u8], i: usize) -> usize {
    match src.get(i) {
        Some(b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r') => 1,
        Some(0xc2) if matches!(src.get(i + 1), Some(0x85 | 0xa0)) => 2,
        _ => 0,
    }
}
