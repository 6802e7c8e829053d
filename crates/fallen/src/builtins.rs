//! Host-provided builtin functions.
//!
//! `CALL` resolves names against this table before anything else, so a user
//! function cannot shadow a builtin. Arity is checked before dispatch; every
//! builtin pushes a result (Null for `write`), which keeps statement-level
//! call compilation uniform.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;
use std::rc::Rc;
use std::str::FromStr;

use strum::{Display, EnumString, IntoStaticStr};

use crate::errors::{rt_err, rt_fmt, RuntimeError};
use crate::io::OutputSink;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Builtin {
    Write,
    Enter,
    ConvInt,
    ConvFloat,
    ConvBool,
    TryConvInt,
    TryConvFloat,
    TryConvBool,
    Del,
    Save,
    Change,
    Read,
    Upper,
    Lower,
    Split,
    Join,
    Replace,
    Args,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        Self::from_str(name).ok()
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Args => 0,
            Self::Write
            | Self::Enter
            | Self::ConvInt
            | Self::ConvFloat
            | Self::ConvBool
            | Self::TryConvInt
            | Self::TryConvFloat
            | Self::TryConvBool
            | Self::Del
            | Self::Read
            | Self::Upper
            | Self::Lower => 1,
            Self::Save | Self::Change | Self::Split | Self::Join => 2,
            Self::Replace => 3,
        }
    }
}

/// Runs one builtin. `args` are in call order; the caller has already
/// reversed the popped values.
pub fn invoke(
    builtin: Builtin,
    args: Vec<Value>,
    sink: &mut impl OutputSink,
    base_dir: &Path,
    argv: &[String],
) -> Result<Value, RuntimeError> {
    let expected = builtin.arity();
    if args.len() != expected {
        let name: &'static str = builtin.into();
        let noun = if expected == 1 { "argument" } else { "arguments" };
        return rt_err!("{name}() expects {expected} {noun}, got {}", args.len());
    }
    match builtin {
        Builtin::Write => {
            sink.stdout_write(&args[0].display());
            sink.stdout_push('\n');
            Ok(Value::Null)
        }
        Builtin::Enter => {
            sink.stdout_write(&args[0].display());
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .map_err(|e| rt_fmt!("Cannot read input: {e}"))?;
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Ok(Value::str(line))
        }
        Builtin::ConvInt => conv_int(&args[0]).map(Value::Int),
        Builtin::ConvFloat => conv_float(&args[0]).map(Value::Float),
        Builtin::ConvBool => conv_bool(&args[0]).map(Value::Bool),
        Builtin::TryConvInt => Ok(conv_int(&args[0]).map_or(Value::Null, Value::Int)),
        Builtin::TryConvFloat => Ok(conv_float(&args[0]).map_or(Value::Null, Value::Float)),
        Builtin::TryConvBool => Ok(conv_bool(&args[0]).map_or(Value::Null, Value::Bool)),
        Builtin::Del => match &args[0] {
            Value::List(list) => match list.borrow_mut().pop() {
                Some(value) => Ok(value),
                None => rt_err!("Cannot del from an empty list"),
            },
            other => rt_err!("del() expects a list, got {}", other.kind()),
        },
        Builtin::Save => {
            let path = str_arg(&args[0], "save", "path")?;
            let text = args[1].display();
            let full = base_dir.join(path.as_ref());
            std::fs::write(&full, text).map_err(|e| rt_fmt!("Cannot write file \"{path}\": {e}"))?;
            Ok(Value::Null)
        }
        Builtin::Change => {
            let path = str_arg(&args[0], "change", "path")?;
            let text = args[1].display();
            let full = base_dir.join(path.as_ref());
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&full)
                .map_err(|e| rt_fmt!("Cannot write file \"{path}\": {e}"))?;
            file.write_all(text.as_bytes())
                .map_err(|e| rt_fmt!("Cannot write file \"{path}\": {e}"))?;
            Ok(Value::Null)
        }
        Builtin::Read => {
            let path = str_arg(&args[0], "read", "path")?;
            let full = base_dir.join(path.as_ref());
            let text =
                std::fs::read_to_string(&full).map_err(|e| rt_fmt!("Cannot read file \"{path}\": {e}"))?;
            Ok(Value::str(text))
        }
        Builtin::Upper => {
            let s = str_arg(&args[0], "upper", "value")?;
            Ok(Value::str(s.to_uppercase()))
        }
        Builtin::Lower => {
            let s = str_arg(&args[0], "lower", "value")?;
            Ok(Value::str(s.to_lowercase()))
        }
        Builtin::Split => {
            let s = str_arg(&args[0], "split", "value")?;
            let sep = str_arg(&args[1], "split", "separator")?;
            if sep.is_empty() {
                return rt_err!("split() separator must not be empty");
            }
            let parts = s.split(sep.as_ref()).map(Value::str).collect();
            Ok(Value::list(parts))
        }
        Builtin::Join => {
            let Value::List(list) = &args[0] else {
                return rt_err!("join() expects a list, got {}", args[0].kind());
            };
            let sep = str_arg(&args[1], "join", "separator")?;
            let mut parts = Vec::with_capacity(list.borrow().len());
            for elem in list.borrow().iter() {
                match elem {
                    Value::Str(s) => parts.push(s.to_string()),
                    other => return rt_err!("join() expects a list of str, found {}", other.kind()),
                }
            }
            Ok(Value::str(parts.join(sep.as_ref())))
        }
        Builtin::Replace => {
            let s = str_arg(&args[0], "replace", "value")?;
            let from = str_arg(&args[1], "replace", "pattern")?;
            let to = str_arg(&args[2], "replace", "replacement")?;
            if from.is_empty() {
                return rt_err!("replace() pattern must not be empty");
            }
            Ok(Value::str(s.replace(from.as_ref(), to.as_ref())))
        }
        Builtin::Args => Ok(Value::list(argv.iter().map(|a| Value::str(a.as_str())).collect())),
    }
}

fn str_arg(value: &Value, func: &str, what: &str) -> Result<Rc<str>, RuntimeError> {
    match value {
        Value::Str(s) => Ok(s.clone()),
        other => rt_err!("{func}() expects a str {what}, got {}", other.kind()),
    }
}

fn conv_int(value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Float(v) => {
            if v.is_finite() && (i64::MIN as f64..=i64::MAX as f64).contains(v) {
                Ok(*v as i64)
            } else {
                rt_err!("Cannot convert to int: {}", value.repr())
            }
        }
        Value::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| rt_fmt!("Cannot convert to int: {}", value.repr())),
        _ => rt_err!("Cannot convert to int: {}", value.repr()),
    }
}

fn conv_float(value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Int(v) => Ok(*v as f64),
        Value::Float(v) => Ok(*v),
        Value::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| rt_fmt!("Cannot convert to float: {}", value.repr())),
        _ => rt_err!("Cannot convert to float: {}", value.repr()),
    }
}

fn conv_bool(value: &Value) -> Result<bool, RuntimeError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Int(v) => Ok(*v != 0),
        Value::Float(v) => Ok(*v != 0.0),
        Value::Str(s) => match s.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => rt_err!("Cannot convert to bool: {}", value.repr()),
        },
        _ => rt_err!("Cannot convert to bool: {}", value.repr()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_uses_snake_case_names() {
        assert_eq!(Builtin::lookup("write"), Some(Builtin::Write));
        assert_eq!(Builtin::lookup("conv_int"), Some(Builtin::ConvInt));
        assert_eq!(Builtin::lookup("try_conv_bool"), Some(Builtin::TryConvBool));
        assert_eq!(Builtin::lookup("del"), Some(Builtin::Del));
        assert_eq!(Builtin::lookup("amount"), None);
        assert_eq!(Builtin::lookup("nope"), None);
    }

    #[test]
    fn conv_int_rules() {
        assert_eq!(conv_int(&Value::Int(3)).unwrap(), 3);
        assert_eq!(conv_int(&Value::Float(2.9)).unwrap(), 2);
        assert_eq!(conv_int(&Value::str(" 42 ")).unwrap(), 42);
        let err = conv_int(&Value::str("abc")).unwrap_err();
        assert_eq!(err.msg, "Cannot convert to int: \"abc\"");
        assert!(conv_int(&Value::Bool(true)).is_err());
    }

    #[test]
    fn conv_bool_is_case_sensitive() {
        assert!(conv_bool(&Value::str("true")).unwrap());
        assert!(!conv_bool(&Value::str("false")).unwrap());
        assert!(conv_bool(&Value::str("True")).is_err());
        assert!(conv_bool(&Value::Int(2)).unwrap());
        assert!(!conv_bool(&Value::Float(0.0)).unwrap());
    }
}
