//! One-character-lookahead scanner turning source text into tokens.
//!
//! Whitespace (spaces, tabs, carriage returns) and `#` comments are skipped;
//! newlines are real tokens because the parser uses them as statement
//! separators. String literals use double quotes with the escape set
//! `\\ \" \n \t`. A numeric literal is an Int unless it contains a decimal
//! point.

use crate::errors::LexError;
use crate::token::{keyword, Token, TokenKind, TypeMarker};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    /// Lexes the whole input, ending with an Eof token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        if self.current() == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn token(&self, kind: TokenKind) -> Token {
        Token { kind, line: self.line }
    }

    fn error(&self, msg: impl Into<String>) -> LexError {
        LexError {
            line: self.line,
            msg: msg.into(),
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        while let Some(c) = self.current() {
            match c {
                '\n' => {
                    let token = self.token(TokenKind::Newline);
                    self.advance();
                    return Ok(token);
                }
                ' ' | '\t' | '\r' => self.advance(),
                '#' => {
                    while self.current().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                c if c.is_ascii_alphabetic() || c == '_' => return Ok(self.read_word()),
                c if c.is_ascii_digit() => return self.read_number(),
                '"' => return self.read_string(),
                '=' => return self.read_marker_or_eq(),
                '!' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        self.advance();
                        return Ok(self.token(TokenKind::NotEq));
                    }
                    return Err(self.error("Unknown character: '!'"));
                }
                '<' => {
                    let kind = if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::Le
                    } else {
                        TokenKind::Lt
                    };
                    self.advance();
                    return Ok(self.token(kind));
                }
                '>' => {
                    let kind = if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::Ge
                    } else {
                        TokenKind::Gt
                    };
                    self.advance();
                    return Ok(self.token(kind));
                }
                _ => {
                    let kind = match c {
                        '+' => TokenKind::Plus,
                        '-' => TokenKind::Minus,
                        '*' => TokenKind::Star,
                        '/' => TokenKind::Slash,
                        ',' => TokenKind::Comma,
                        ':' => TokenKind::Colon,
                        '(' => TokenKind::LParen,
                        ')' => TokenKind::RParen,
                        '{' => TokenKind::LBrace,
                        '}' => TokenKind::RBrace,
                        '[' => TokenKind::LBracket,
                        ']' => TokenKind::RBracket,
                        other => return Err(self.error(format!("Unknown character: '{other}'"))),
                    };
                    self.advance();
                    return Ok(self.token(kind));
                }
            }
        }
        Ok(self.token(TokenKind::Eof))
    }

    fn read_word(&mut self) -> Token {
        let start = self.pos;
        while self.current().is_some_and(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match keyword(&word) {
            Some(kind) => self.token(kind),
            None => self.token(TokenKind::Ident(word)),
        }
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let mut has_dot = false;
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !has_dot && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if has_dot {
            let value: f64 = text
                .parse()
                .map_err(|_| self.error(format!("Invalid float literal: {text}")))?;
            Ok(self.token(TokenKind::Float(value)))
        } else {
            let value: i64 = text
                .parse()
                .map_err(|_| self.error(format!("Integer literal out of range: {text}")))?;
            Ok(self.token(TokenKind::Int(value)))
        }
    }

    fn read_string(&mut self) -> Result<Token, LexError> {
        let open_line = self.line;
        self.advance(); // opening quote
        let mut result = String::new();
        loop {
            match self.current() {
                None => {
                    return Err(LexError {
                        line: open_line,
                        msg: "Unterminated string".to_owned(),
                    })
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token {
                        kind: TokenKind::Str(result),
                        line: open_line,
                    });
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.current() {
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some(other) => return Err(self.error(format!("Unknown escape: \\{other}"))),
                        None => {
                            return Err(LexError {
                                line: open_line,
                                msg: "Unterminated string".to_owned(),
                            })
                        }
                    };
                    result.push(escaped);
                    self.advance();
                }
                Some(c) => {
                    result.push(c);
                    self.advance();
                }
            }
        }
    }

    /// `==` or a type marker `=s`/`=i`/`=f`/`=b`/`=l`/`=d`.
    fn read_marker_or_eq(&mut self) -> Result<Token, LexError> {
        if self.peek() == Some('=') {
            self.advance();
            self.advance();
            return Ok(self.token(TokenKind::EqEq));
        }
        self.advance(); // consume '='
        let start = self.pos;
        while self.current().is_some_and(|c| c.is_ascii_lowercase()) {
            self.advance();
        }
        let letters: String = self.chars[start..self.pos].iter().collect();
        let mut chars = letters.chars();
        match (chars.next().and_then(TypeMarker::from_letter), chars.next()) {
            (Some(marker), None) => Ok(self.token(TokenKind::Marker(marker))),
            _ => Err(self.error(format!(
                "Expected type marker after '=' (use =s, =i, =f, =b, =l, =d), got '={letters}'"
            ))),
        }
    }
}
