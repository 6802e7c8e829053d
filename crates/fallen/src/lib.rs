//! Fallen is a small imperative scripting language with typed-marker
//! assignment (`x =i 42`), first-class functions, lists and dictionaries,
//! pattern matching, and a module system with privacy and exports.
//!
//! The pipeline is lexer → parser → bytecode compiler → stack-based VM:
//!
//! ```
//! use std::rc::Rc;
//! use fallen::{compile_source, CollectSink, Vm};
//!
//! let unit = Rc::new(compile_source("write(2 + 3 * 4)", "demo.fallen").unwrap());
//! let mut vm = Vm::new(std::env::temp_dir(), CollectSink::new());
//! vm.run_unit(&unit).unwrap();
//! assert_eq!(vm.sink().output(), "14\n");
//! ```

pub mod ast;
mod builtins;
mod bytecode;
mod errors;
mod for_iterator;
mod io;
mod lexer;
mod modules;
mod parser;
mod token;
mod value;

use std::rc::Rc;

pub use crate::ast::{pretty, Program};
pub use crate::builtins::Builtin;
pub use crate::bytecode::vm::{Env, Vm, MAX_CALL_DEPTH};
pub use crate::bytecode::{Const, FuncInfo, Instr, Opcode, Unit};
pub use crate::errors::{CompileError, Error, LexError, ParseError, RuntimeError, TraceFrame};
pub use crate::for_iterator::ForCursor;
pub use crate::io::{CollectSink, NullSink, OutputSink, StdSink};
pub use crate::modules::{Module, ModuleRegistry, ModuleState};
pub use crate::token::{Token, TokenKind, TypeMarker};
pub use crate::value::{FuncValue, Kind, Value};

/// Lexes and parses one source file.
pub fn parse_source(source: &str, file: &str) -> Result<Program, Error> {
    let tokens = lexer::Lexer::new(source).tokenize().map_err(|inner| Error::Lex {
        file: file.to_owned(),
        inner,
    })?;
    parser::Parser::new(tokens).parse_program().map_err(|inner| Error::Parse {
        file: file.to_owned(),
        inner,
    })
}

/// Lexes, parses and compiles one source file into a bytecode unit.
pub fn compile_source(source: &str, file: &str) -> Result<Unit, Error> {
    let program = parse_source(source, file)?;
    bytecode::compiler::compile(&program, file).map_err(|inner| Error::Compile {
        file: file.to_owned(),
        inner,
    })
}

/// Parses the input as a single expression; the REPL uses this to echo
/// expression values by wrapping them in `write(...)`.
pub fn parse_repl_expression(source: &str, file: &str) -> Result<ast::Expr, Error> {
    let tokens = lexer::Lexer::new(source).tokenize().map_err(|inner| Error::Lex {
        file: file.to_owned(),
        inner,
    })?;
    parser::Parser::new(tokens)
        .parse_expression()
        .map_err(|inner| Error::Parse {
            file: file.to_owned(),
            inner,
        })
}

/// Compiles a REPL expression into a unit that writes its value.
pub fn compile_repl_expression(source: &str, file: &str) -> Result<Unit, Error> {
    let expr = parse_repl_expression(source, file)?;
    let line = expr.line;
    let program = Program {
        stmts: vec![ast::Stmt {
            kind: ast::StmtKind::Expr(ast::Expr {
                kind: ast::ExprKind::Call {
                    name: "write".to_owned(),
                    args: vec![expr],
                },
                line,
            }),
            line,
        }],
    };
    bytecode::compiler::compile(&program, file).map_err(|inner| Error::Compile {
        file: file.to_owned(),
        inner,
    })
}

/// Convenience for embedders and tests: compile and run a program, returning
/// the collected output.
pub fn run_source_collect(source: &str, file: &str) -> Result<String, Error> {
    let unit = Rc::new(compile_source(source, file)?);
    let base_dir = std::env::temp_dir();
    let mut vm = Vm::new(base_dir, CollectSink::new());
    vm.run_unit(&unit)?;
    Ok(vm.into_sink().output().to_owned())
}
