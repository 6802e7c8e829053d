//! Token types produced by the lexer.

use std::fmt;

use strum::{Display, IntoStaticStr};

/// A typed-assignment marker: the `=s`/`=i`/`=f`/`=b`/`=l`/`=d` suffix written
/// next to a variable name or function parameter.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum TypeMarker {
    Str = 1,
    Int = 2,
    Float = 3,
    Bool = 4,
    List = 5,
    Dict = 6,
}

impl TypeMarker {
    /// The single letter written after `=` in source.
    pub fn letter(self) -> char {
        match self {
            Self::Str => 's',
            Self::Int => 'i',
            Self::Float => 'f',
            Self::Bool => 'b',
            Self::List => 'l',
            Self::Dict => 'd',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            's' => Some(Self::Str),
            'i' => Some(Self::Int),
            'f' => Some(Self::Float),
            'b' => Some(Self::Bool),
            'l' => Some(Self::List),
            'd' => Some(Self::Dict),
            _ => None,
        }
    }

    /// Nonzero operand encoding for `STORE_NAME`; 0 means "no check".
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Str),
            2 => Some(Self::Int),
            3 => Some(Self::Float),
            4 => Some(Self::Bool),
            5 => Some(Self::List),
            6 => Some(Self::Dict),
            _ => None,
        }
    }
}

/// One lexical token. Literal payloads are carried inline; `line` is 1-based.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // literals
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),

    Ident(String),

    // keywords
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Stop,
    Continue,
    Func,
    Return,
    Match,
    Import,
    Export,
    And,
    Or,
    Not,
    Set,
    To,
    Add,
    Insert,
    Remove,
    Call,
    Trace,
    On,
    Off,

    Marker(TypeMarker),

    // operators
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,

    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "integer {v}"),
            Self::Float(v) => write!(f, "float {v}"),
            Self::Str(_) => f.write_str("string literal"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Ident(name) => write!(f, "'{name}'"),
            Self::If => f.write_str("'if'"),
            Self::Elif => f.write_str("'elif'"),
            Self::Else => f.write_str("'else'"),
            Self::While => f.write_str("'while'"),
            Self::For => f.write_str("'for'"),
            Self::In => f.write_str("'in'"),
            Self::Stop => f.write_str("'stop'"),
            Self::Continue => f.write_str("'continue'"),
            Self::Func => f.write_str("'func'"),
            Self::Return => f.write_str("'return'"),
            Self::Match => f.write_str("'match'"),
            Self::Import => f.write_str("'import'"),
            Self::Export => f.write_str("'export'"),
            Self::And => f.write_str("'and'"),
            Self::Or => f.write_str("'or'"),
            Self::Not => f.write_str("'not'"),
            Self::Set => f.write_str("'set'"),
            Self::To => f.write_str("'to'"),
            Self::Add => f.write_str("'add'"),
            Self::Insert => f.write_str("'insert'"),
            Self::Remove => f.write_str("'remove'"),
            Self::Call => f.write_str("'call'"),
            Self::Trace => f.write_str("'trace'"),
            Self::On => f.write_str("'on'"),
            Self::Off => f.write_str("'off'"),
            Self::Marker(m) => write!(f, "'={}'", m.letter()),
            Self::Plus => f.write_str("'+'"),
            Self::Minus => f.write_str("'-'"),
            Self::Star => f.write_str("'*'"),
            Self::Slash => f.write_str("'/'"),
            Self::EqEq => f.write_str("'=='"),
            Self::NotEq => f.write_str("'!='"),
            Self::Lt => f.write_str("'<'"),
            Self::Le => f.write_str("'<='"),
            Self::Gt => f.write_str("'>'"),
            Self::Ge => f.write_str("'>='"),
            Self::LBrace => f.write_str("'{'"),
            Self::RBrace => f.write_str("'}'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::Comma => f.write_str("','"),
            Self::Colon => f.write_str("':'"),
            Self::Newline => f.write_str("newline"),
            Self::Eof => f.write_str("end of input"),
        }
    }
}

/// Keyword lookup for identifier-shaped lexemes.
pub(crate) fn keyword(word: &str) -> Option<TokenKind> {
    let kind = match word {
        "if" => TokenKind::If,
        "elif" => TokenKind::Elif,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "stop" => TokenKind::Stop,
        "continue" => TokenKind::Continue,
        "func" => TokenKind::Func,
        "return" => TokenKind::Return,
        "match" => TokenKind::Match,
        "import" => TokenKind::Import,
        "export" => TokenKind::Export,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "set" => TokenKind::Set,
        "to" => TokenKind::To,
        "add" => TokenKind::Add,
        "insert" => TokenKind::Insert,
        "remove" => TokenKind::Remove,
        "call" => TokenKind::Call,
        "trace" => TokenKind::Trace,
        "on" => TokenKind::On,
        "off" => TokenKind::Off,
        "true" => TokenKind::Bool(true),
        "false" => TokenKind::Bool(false),
        _ => return None,
    };
    Some(kind)
}
