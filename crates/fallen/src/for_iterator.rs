//! Iteration cursors for `for` loops.
//!
//! `FOR_START` pops the iterable and pushes a cursor onto the operand stack;
//! `FOR_NEXT` advances it in place. The cursor indexes into the shared
//! container rather than snapshotting it, so the container's length is
//! re-checked on every step and mutation during iteration is observed.

use std::rc::Rc;

use crate::value::{DictRef, ListRef, Value};

#[derive(Debug, Clone)]
pub enum ForCursor {
    List { list: ListRef, index: usize },
    Str { s: Rc<str>, byte_pos: usize },
    Dict { dict: DictRef, index: usize },
}

impl ForCursor {
    /// Builds a cursor, or returns the value back if it is not iterable.
    pub fn new(value: Value) -> Result<Self, Value> {
        match value {
            Value::List(list) => Ok(Self::List { list, index: 0 }),
            Value::Str(s) => Ok(Self::Str { s, byte_pos: 0 }),
            Value::Dict(dict) => Ok(Self::Dict { dict, index: 0 }),
            other => Err(other),
        }
    }

    /// The next element, or None when exhausted. Lists yield elements,
    /// strings yield 1-character strings, dicts yield keys in insertion
    /// order.
    pub fn next(&mut self) -> Option<Value> {
        match self {
            Self::List { list, index } => {
                let value = list.borrow().get(*index).cloned()?;
                *index += 1;
                Some(value)
            }
            Self::Str { s, byte_pos } => {
                let c = s[*byte_pos..].chars().next()?;
                *byte_pos += c.len_utf8();
                Some(Value::str(c.to_string()))
            }
            Self::Dict { dict, index } => {
                let key = dict.borrow().get_index(*index).map(|(key, _)| key.clone())?;
                *index += 1;
                Some(Value::Str(key))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_cursor_observes_growth() {
        let list = match Value::list(vec![Value::Int(1)]) {
            Value::List(list) => list,
            _ => unreachable!(),
        };
        let mut cursor = ForCursor::new(Value::List(list.clone())).unwrap();
        assert!(matches!(cursor.next(), Some(Value::Int(1))));
        list.borrow_mut().push(Value::Int(2));
        assert!(matches!(cursor.next(), Some(Value::Int(2))));
        assert!(cursor.next().is_none());
    }

    #[test]
    fn str_cursor_yields_chars() {
        let mut cursor = ForCursor::new(Value::str("héy")).unwrap();
        assert_eq!(cursor.next().unwrap().display(), "h");
        assert_eq!(cursor.next().unwrap().display(), "é");
        assert_eq!(cursor.next().unwrap().display(), "y");
        assert!(cursor.next().is_none());
    }

    #[test]
    fn non_iterable_rejected() {
        assert!(ForCursor::new(Value::Int(3)).is_err());
    }
}
