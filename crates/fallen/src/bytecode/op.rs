//! Opcode definitions.
//!
//! An instruction is an opcode plus up to two integer operands stored
//! inline. Jump operands are instruction indices, so every jump target is an
//! instruction boundary by construction. The `Display` names (screaming
//! snake case) are what trace mode and `fallen build` print.

use strum::{Display, FromRepr, IntoStaticStr};

/// Opcode discriminant. Operand meanings are listed per variant; `a` and `b`
/// refer to the two operand slots of [`Instr`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    // stack / constants
    /// Push constant `a` from the pool.
    LoadConst,
    /// Push Null.
    LoadNull,
    /// Push the value bound to name `a`; local env first, then globals.
    LoadName,
    /// Pop into name `a`. `b` is 0 for an unchecked store or a type-marker
    /// code that the value's kind must match.
    StoreName,
    /// Discard top of stack.
    Pop,

    // arithmetic / comparison
    Add,
    Sub,
    Mul,
    Div,
    /// Negate a number.
    Neg,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Boolean not; the operand must be a bool.
    Not,

    // control
    /// Unconditional jump to instruction `a`.
    Jump,
    /// If top of stack is false, jump to `a` keeping the value; otherwise
    /// pop it and fall through. Targets reached with a dead value start
    /// with POP.
    JumpIfFalse,
    /// Mirror image of JUMP_IF_FALSE.
    JumpIfTrue,
    /// End of a unit's main body.
    Halt,

    // aggregates
    /// Pop `a` elements, push a list.
    BuildList,
    /// Pop `a` key/value pairs (keys must be strings), push a dict.
    BuildDict,
    /// Pop index, pop container, push element.
    IndexGet,
    /// Pop value, pop index, pop container; write through.
    IndexSet,
    /// Pop value, pop list, append.
    ListAppend,
    /// Pop value, pop index, pop list, insert at index.
    ListInsert,
    /// Pop index (int for lists, string key for dicts), pop container,
    /// remove.
    RemoveAt,
    /// Pop a string/list/dict, push its length as an int.
    Len,

    // calls
    /// Call name `a` with `b` arguments. Resolution order: builtins, the
    /// current unit's function table, then a function value in scope.
    Call,
    /// Pop the return value, pop the frame, push the value for the caller.
    Return,

    // loops
    /// Push a loop-exit record: break target `a`, continue target `b`.
    LoopPush,
    /// Pop the innermost loop-exit record.
    LoopPop,
    /// Jump to the innermost record's break target.
    Break,
    /// Jump to the innermost record's continue target.
    Continue,
    /// Pop an iterable, push an iteration cursor.
    ForStart,
    /// Advance the cursor at top of stack; store the element into name `b`,
    /// or jump to `a` when exhausted (cursor stays for the epilogue POP).
    ForNext,

    // modules
    /// Import the file named by string constant `a`.
    Import,
    /// Add name `a` to the running module's public set.
    Export,

    // trace
    TraceOn,
    TraceOff,
}

impl Opcode {
    /// How many of the two operand slots are meaningful.
    pub fn operand_count(self) -> u8 {
        match self {
            Self::LoadConst
            | Self::LoadName
            | Self::Jump
            | Self::JumpIfFalse
            | Self::JumpIfTrue
            | Self::BuildList
            | Self::BuildDict
            | Self::Import
            | Self::Export => 1,
            Self::StoreName | Self::Call | Self::LoopPush | Self::ForNext => 2,
            _ => 0,
        }
    }
}

/// One instruction. Unused operand slots are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    pub op: Opcode,
    pub a: u32,
    pub b: u32,
}

impl Instr {
    pub fn new(op: Opcode) -> Self {
        Self { op, a: 0, b: 0 }
    }

    pub fn with_a(op: Opcode, a: u32) -> Self {
        Self { op, a, b: 0 }
    }

    pub fn with_ab(op: Opcode, a: u32, b: u32) -> Self {
        Self { op, a, b }
    }

    /// The operand field of a trace line: `None`, `a`, or `a b`.
    pub fn operand_str(&self) -> String {
        match self.op.operand_count() {
            0 => "None".to_owned(),
            1 => self.a.to_string(),
            _ => format!("{} {}", self.a, self.b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_names_are_screaming_snake() {
        assert_eq!(Opcode::LoadConst.to_string(), "LOAD_CONST");
        assert_eq!(Opcode::JumpIfFalse.to_string(), "JUMP_IF_FALSE");
        assert_eq!(Opcode::ForNext.to_string(), "FOR_NEXT");
        assert_eq!(Opcode::TraceOn.to_string(), "TRACE_ON");
    }

    #[test]
    fn operand_str_shapes() {
        assert_eq!(Instr::new(Opcode::Add).operand_str(), "None");
        assert_eq!(Instr::with_a(Opcode::Jump, 7).operand_str(), "7");
        assert_eq!(Instr::with_ab(Opcode::Call, 2, 1).operand_str(), "2 1");
    }

    #[test]
    fn opcode_discriminants_round_trip() {
        for byte in 0..=Opcode::TraceOff as u8 {
            let opcode = Opcode::from_repr(byte).unwrap();
            assert_eq!(opcode as u8, byte, "opcode {opcode:?} has wrong discriminant");
        }
        assert!(Opcode::from_repr(Opcode::TraceOff as u8 + 1).is_none());
    }
}
