//! Compiled code: the instruction stream, constant pool and tables that make
//! up one translation unit, plus the compiler and the VM that executes it.

pub mod compiler;
pub mod op;
pub mod vm;

use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;

pub use op::{Instr, Opcode};

use crate::token::TypeMarker;
use crate::value::Value;

/// A literal in the constant pool. Structural equality deduplicates the
/// pool; floats compare by bit pattern so that e.g. -0.0 and 0.0 stay
/// distinct entries.
#[derive(Debug, Clone)]
pub enum Const {
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Bool(bool),
}

impl PartialEq for Const {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Const {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(v) => Value::Int(*v),
            Self::Float(v) => Value::Float(*v),
            Self::Str(s) => Value::Str(s.clone()),
            Self::Bool(b) => Value::Bool(*b),
        }
    }

    fn listing(&self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => Value::Float(*v).repr(),
            Self::Str(s) => format!("{s:?}"),
            Self::Bool(b) => b.to_string(),
        }
    }
}

/// A user function's compiled signature: parameter descriptors and the
/// instruction index its body starts at.
#[derive(Debug, Clone)]
pub struct FuncInfo {
    pub params: Vec<(Rc<str>, TypeMarker)>,
    pub entry: usize,
}

/// The compiled form of one source file.
///
/// Layout: the main body runs from instruction 0 to a `HALT`; function
/// bodies follow, each entered through the function table.
#[derive(Debug)]
pub struct Unit {
    pub consts: Vec<Const>,
    pub code: Vec<Instr>,
    /// Source line of each instruction, parallel to `code`.
    pub lines: Vec<u32>,
    /// Interned names referenced by LOAD_NAME/STORE_NAME/CALL/FOR_NEXT/EXPORT.
    pub names: Vec<Rc<str>>,
    pub functions: IndexMap<Rc<str>, FuncInfo>,
    /// Names declared by `export` statements, in order of appearance.
    pub exports: Vec<Rc<str>>,
    /// Source path, shown in stack traces.
    pub file: Rc<str>,
}

impl Unit {
    pub fn new(file: impl Into<Rc<str>>) -> Self {
        Self {
            consts: Vec::new(),
            code: Vec::new(),
            lines: Vec::new(),
            names: Vec::new(),
            functions: IndexMap::new(),
            exports: Vec::new(),
            file: file.into(),
        }
    }

    /// Appends an instruction, returning its index for later patching.
    pub(crate) fn emit(&mut self, instr: Instr, line: u32) -> usize {
        self.code.push(instr);
        self.lines.push(line);
        self.code.len() - 1
    }

    /// Backfills the first operand of a forward jump.
    pub(crate) fn patch_a(&mut self, index: usize, target: usize) {
        self.code[index].a = target as u32;
    }

    pub(crate) fn add_const(&mut self, constant: Const) -> u32 {
        if let Some(index) = self.consts.iter().position(|c| *c == constant) {
            return index as u32;
        }
        self.consts.push(constant);
        (self.consts.len() - 1) as u32
    }

    pub(crate) fn add_name(&mut self, name: &str) -> u32 {
        if let Some(index) = self.names.iter().position(|n| n.as_ref() == name) {
            return index as u32;
        }
        self.names.push(Rc::from(name));
        (self.names.len() - 1) as u32
    }

    pub fn name(&self, index: u32) -> &Rc<str> {
        &self.names[index as usize]
    }

    /// The human-readable dump printed by `fallen build`.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        out.push_str("CONSTS:\n");
        for (i, constant) in self.consts.iter().enumerate() {
            let _ = writeln!(out, "  [{i}] {}", constant.listing());
        }
        if !self.functions.is_empty() {
            out.push_str("\nFUNCTIONS:\n");
            for (name, info) in &self.functions {
                let params: Vec<String> = info
                    .params
                    .iter()
                    .map(|(p, marker)| format!("{p} ={}", marker.letter()))
                    .collect();
                let _ = writeln!(out, "  {name}  entry={}  params=[{}]", info.entry, params.join(", "));
            }
        }
        out.push_str("\nINSTRUCTIONS:\n");
        for (i, instr) in self.code.iter().enumerate() {
            let _ = writeln!(out, "  {i:04}  ({}, {})", instr.op, instr.operand_str());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_dedup_is_structural() {
        let mut unit = Unit::new("test.fallen");
        let a = unit.add_const(Const::Int(5));
        let b = unit.add_const(Const::Int(5));
        let c = unit.add_const(Const::Float(5.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(unit.consts.len(), 2);
    }

    #[test]
    fn name_interning() {
        let mut unit = Unit::new("test.fallen");
        let a = unit.add_name("x");
        let b = unit.add_name("y");
        let c = unit.add_name("x");
        assert_eq!(a, c);
        assert_ne!(a, b);
    }
}
