use crate::position::SourcePos;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(u64),
    Float(f64),
    Str(String),
    Symbol(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(ident) => write!(f, "`{ident}`"),
            TokenKind::Int(value) => write!(f, "`{value}`"),
            TokenKind::Float(value) => write!(f, "`{value}`"),
            TokenKind::Str(value) => write!(f, "{value:?}"),
            TokenKind::Symbol(symbol) => write!(f, "`{symbol}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: SourcePos,
    /// One column past the token's last byte.
    pub end: SourcePos,
    /// Byte range in the source, for copying option values verbatim.
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub pos: SourcePos,
    pub message: String,
}

/// Splits protobuf source into tokens, skipping whitespace and comments.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    index: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            index: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn pos(&self) -> SourcePos {
        SourcePos::new(self.line, self.col)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.index + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.index += 1;
        if byte == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(byte)
    }

    fn error(&self, pos: SourcePos, message: impl Into<String>) -> LexError {
        LexError {
            pos,
            message: message.into(),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b' ' | b'\t' | b'\r' | b'\n' | b'\x0c' | b'\x0b'), _) => {
                    self.bump();
                }
                (Some(b'/'), Some(b'/')) => {
                    while let Some(byte) = self.peek() {
                        if byte == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let start = self.pos();
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(self.error(start, "unterminated block comment"))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_trivia()?;

        let start = self.pos();
        let byte_start = self.index;
        let Some(byte) = self.peek() else {
            return Ok(None);
        };

        let kind = match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
                    self.bump();
                }
                TokenKind::Ident(self.source[byte_start..self.index].to_string())
            }
            b'0'..=b'9' => self.number(start, byte_start)?,
            b'.' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => self.number(start, byte_start)?,
            b'"' | b'\'' => TokenKind::Str(self.string(start)?),
            _ if byte.is_ascii_punctuation() => {
                self.bump();
                TokenKind::Symbol(byte as char)
            }
            _ => {
                let ch = self.source[byte_start..].chars().next().unwrap_or('?');
                return Err(self.error(start, format!("unexpected character {ch:?}")));
            }
        };

        Ok(Some(Token {
            kind,
            start,
            end: self.pos(),
            byte_start,
            byte_end: self.index,
        }))
    }

    fn number(&mut self, start: SourcePos, byte_start: usize) -> Result<TokenKind, LexError> {
        while let Some(byte) = self.peek() {
            let exponent_sign = matches!(byte, b'+' | b'-')
                && matches!(self.bytes.get(self.index.wrapping_sub(1)), Some(b'e' | b'E'))
                && !self.source[byte_start..self.index].starts_with("0x");
            if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'_' || exponent_sign {
                self.bump();
            } else {
                break;
            }
        }

        let text = &self.source[byte_start..self.index];
        let int = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16).ok()
        } else if text.len() > 1
            && text.starts_with('0')
            && text.bytes().all(|b| b.is_ascii_digit())
        {
            u64::from_str_radix(&text[1..], 8).ok()
        } else if text.bytes().all(|b| b.is_ascii_digit()) {
            text.parse().ok()
        } else {
            None
        };

        if let Some(value) = int {
            return Ok(TokenKind::Int(value));
        }
        text.parse::<f64>()
            .map(TokenKind::Float)
            .map_err(|_| self.error(start, format!("invalid number `{text}`")))
    }

    fn string(&mut self, start: SourcePos) -> Result<String, LexError> {
        let quote = self.bump().unwrap_or(b'"');
        let content_start = self.index;
        loop {
            match self.peek() {
                None | Some(b'\n') => return Err(self.error(start, "unterminated string literal")),
                Some(b'\\') => {
                    self.bump();
                    self.bump();
                }
                Some(byte) if byte == quote => break,
                Some(_) => {
                    self.bump();
                }
            }
        }
        let value = self.source[content_start..self.index].to_string();
        self.bump();
        Ok(value)
    }
}
