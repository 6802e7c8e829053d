//! Error types for the whole pipeline.
//!
//! Three kinds reach users: lex/parse errors (before execution), compile
//! errors, and runtime errors carrying a stack trace. An error crossing an
//! import boundary is wrapped with the importing path but keeps the inner
//! lines intact.

use std::fmt;
use std::rc::Rc;

/// Scanner failure: unknown character, unterminated string, bad type marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub line: u32,
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: u32,
    pub msg: String,
}

/// Structural error found while lowering the AST, e.g. `stop` outside a loop
/// or a redefined function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub line: u32,
    pub msg: String,
}

/// One entry of a runtime stack trace, innermost first. The outermost
/// frame's name is `<main>`.
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub func: Rc<str>,
    pub file: Rc<str>,
    pub line: u32,
}

/// A failed instruction. `ip` and `trace` are filled in by the VM while
/// unwinding; constructors only supply the message.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub msg: String,
    pub ip: usize,
    pub trace: Vec<TraceFrame>,
}

impl RuntimeError {
    pub fn msg(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ip: 0,
            trace: Vec::new(),
        }
    }
}

macro_rules! rt_fmt {
    ($($args:tt)*) => {
        $crate::errors::RuntimeError::msg(format!($($args)*))
    };
}
pub(crate) use rt_fmt;

macro_rules! rt_err {
    ($($args:tt)*) => {
        Err($crate::errors::rt_fmt!($($args)*))
    };
}
pub(crate) use rt_err;

/// Any failure surfaced to the host. Lex/parse/compile errors carry the file
/// they occurred in; import failures wrap the inner error.
#[derive(Debug)]
pub enum Error {
    Lex { file: String, inner: LexError },
    Parse { file: String, inner: ParseError },
    Compile { file: String, inner: CompileError },
    Runtime(RuntimeError),
    Import { path: String, inner: Box<Error> },
}

impl Error {
    pub fn wrap_import(path: impl Into<String>, inner: Error) -> Self {
        Self::Import {
            path: path.into(),
            inner: Box::new(inner),
        }
    }
}

impl From<RuntimeError> for Error {
    fn from(err: RuntimeError) -> Self {
        Self::Runtime(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex { file, inner } => {
                write!(f, "Lex error ({file}:{}): {}", inner.line, inner.msg)
            }
            Self::Parse { file, inner } => {
                write!(f, "Parse error ({file}:{}): {}", inner.line, inner.msg)
            }
            Self::Compile { file, inner } => {
                write!(f, "Compile error ({file}:{}): {}", inner.line, inner.msg)
            }
            Self::Runtime(err) => {
                writeln!(f, "Runtime error: {}", err.msg)?;
                write!(f, "  ip={:04x}", err.ip)?;
                for frame in &err.trace {
                    write!(f, "\n  at func {} ({}:{})", frame.func, frame.file, frame.line)?;
                }
                Ok(())
            }
            Self::Import { path, inner } => {
                writeln!(f, "Import error in \"{path}\":")?;
                write!(f, "{inner}")
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_format() {
        let mut err = RuntimeError::msg("Division by zero");
        err.ip = 0x14;
        err.trace.push(TraceFrame {
            func: "f".into(),
            file: "prog.fallen".into(),
            line: 3,
        });
        err.trace.push(TraceFrame {
            func: "<main>".into(),
            file: "prog.fallen".into(),
            line: 9,
        });
        let rendered = Error::from(err).to_string();
        assert_eq!(
            rendered,
            "Runtime error: Division by zero\n  ip=0014\n  at func f (prog.fallen:3)\n  at func <main> (prog.fallen:9)"
        );
    }

    #[test]
    fn import_error_prefixes_inner_lines() {
        let inner = Error::from(RuntimeError::msg("boom"));
        let rendered = Error::wrap_import("lib.fallen", inner).to_string();
        assert!(rendered.starts_with("Import error in \"lib.fallen\":\n"));
        assert!(rendered.contains("Runtime error: boom"));
    }
}
