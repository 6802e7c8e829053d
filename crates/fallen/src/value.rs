//! Runtime values.
//!
//! Scalars are stored inline; strings are shared immutable `Rc<str>`;
//! lists and dicts are shared mutable containers, so mutation through one
//! binding is visible through every alias. No value variant can contain a
//! back-reference to itself through construction alone, so plain reference
//! counting reclaims everything.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt::Write;
use std::rc::Rc;

use indexmap::IndexMap;
use strum::Display;

use crate::bytecode::Unit;
use crate::for_iterator::ForCursor;
use crate::token::TypeMarker;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type DictRef = Rc<RefCell<IndexMap<Rc<str>, Value>>>;

/// A user-defined function: an entry point into a unit's instruction stream,
/// plus the environment of the module that defined it (so the body can read
/// its module's top-level names).
#[derive(Debug)]
pub struct FuncValue {
    pub name: Rc<str>,
    pub unit: Rc<Unit>,
    pub entry: usize,
    pub params: Vec<(Rc<str>, TypeMarker)>,
    pub globals: crate::bytecode::vm::Env,
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(ListRef),
    Dict(DictRef),
    Func(Rc<FuncValue>),
    /// Internal iteration cursor; lives only on the operand stack between
    /// `FOR_START` and the loop epilogue, never in a variable.
    Iter(Box<ForCursor>),
}

/// The runtime kind of a value, used in error messages and type-marker checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Kind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Dict,
    Func,
    Iter,
}

impl TypeMarker {
    pub fn matches(self, kind: Kind) -> bool {
        matches!(
            (self, kind),
            (Self::Str, Kind::Str)
                | (Self::Int, Kind::Int)
                | (Self::Float, Kind::Float)
                | (Self::Bool, Kind::Bool)
                | (Self::List, Kind::List)
                | (Self::Dict, Kind::Dict)
        )
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Self::Null => Kind::Null,
            Self::Bool(_) => Kind::Bool,
            Self::Int(_) => Kind::Int,
            Self::Float(_) => Kind::Float,
            Self::Str(_) => Kind::Str,
            Self::List(_) => Kind::List,
            Self::Dict(_) => Kind::Dict,
            Self::Func(_) => Kind::Func,
            Self::Iter(_) => Kind::Iter,
        }
    }

    pub fn list(values: Vec<Value>) -> Self {
        Self::List(Rc::new(RefCell::new(values)))
    }

    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Self::Str(s.into())
    }

    /// Structural equality. Int and Float compare numerically with each
    /// other; containers compare deep; every other cross-kind pair is unequal.
    pub fn eq_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) => (*a as f64) == *b,
            (Self::Float(a), Self::Int(b)) => *a == (*b as f64),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_value(y))
            }
            (Self::Dict(a), Self::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.get(key).is_some_and(|other| value.eq_value(other)))
            }
            (Self::Func(a), Self::Func(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Ordering is defined only between numbers; Int widens to Float when
    /// the kinds are mixed.
    pub fn cmp_value(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            _ => None,
        }
    }

    /// How `write` prints the value: strings bare, everything else as repr.
    pub fn display(&self) -> String {
        match self {
            Self::Str(s) => s.to_string(),
            _ => self.repr(),
        }
    }

    /// The quoted form: strings with quotes and escapes, containers
    /// element-by-element.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.repr_fmt(&mut out);
        out
    }

    fn repr_fmt(&self, out: &mut String) {
        match self {
            Self::Null => out.push_str("null"),
            Self::Bool(true) => out.push_str("true"),
            Self::Bool(false) => out.push_str("false"),
            Self::Int(v) => {
                let _ = write!(out, "{v}");
            }
            Self::Float(v) => {
                let s = v.to_string();
                out.push_str(&s);
                if !s.contains('.') && !s.contains('e') && !s.contains("inf") && !s.contains("NaN") {
                    out.push_str(".0");
                }
            }
            Self::Str(s) => str_repr_fmt(s, out),
            Self::List(list) => {
                out.push('[');
                for (i, elem) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    elem.repr_fmt(out);
                }
                out.push(']');
            }
            Self::Dict(dict) => {
                out.push('{');
                for (i, (key, value)) in dict.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    str_repr_fmt(key, out);
                    out.push_str(": ");
                    value.repr_fmt(out);
                }
                out.push('}');
            }
            Self::Func(f) => {
                let _ = write!(out, "<func {}>", f.name);
            }
            Self::Iter(_) => out.push_str("<iter>"),
        }
    }
}

fn str_repr_fmt(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}
