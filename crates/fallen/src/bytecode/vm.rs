//! The stack-based virtual machine.
//!
//! The VM holds a stack of frames; the top frame runs until it returns or
//! its unit halts. Each frame owns its instruction pointer, operand stack,
//! local environment and loop-exit stack, and records the source line of the
//! instruction being executed so unwinding can produce a stack trace.
//!
//! Imports execute recursively: the importing instruction compiles and runs
//! the target unit to completion (through the process-wide module registry,
//! which makes cycles terminate), then copies its exports into the importing
//! frame's environment.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ahash::AHashMap;

use super::{Const, Instr, Opcode, Unit};
use crate::builtins::{self, Builtin};
use crate::errors::{rt_err, rt_fmt, Error, RuntimeError, TraceFrame};
use crate::for_iterator::ForCursor;
use crate::io::OutputSink;
use crate::modules::{ModuleRegistry, PublicSet};
use crate::token::TypeMarker;
use crate::value::{FuncValue, Value};

pub type Scope = AHashMap<Rc<str>, Value>;
pub type Env = Rc<RefCell<Scope>>;

/// User-function call depth limit; exceeding it is a runtime error rather
/// than a host stack overflow.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Where `stop` and `continue` jump for the innermost active loop.
#[derive(Debug, Clone, Copy)]
struct LoopExit {
    break_target: usize,
    continue_target: usize,
}

/// One in-progress call.
#[derive(Debug)]
struct Frame {
    unit: Rc<Unit>,
    ip: usize,
    stack: Vec<Value>,
    env: Env,
    /// The environment of the module this frame's unit belongs to; name
    /// lookups fall back to it.
    globals: Env,
    loops: Vec<LoopExit>,
    /// `<main>` for module-level frames, the function name otherwise.
    func_name: Rc<str>,
    /// Source line of the last dispatched instruction.
    line: u32,
    /// The running module's public-name set; None in function frames.
    exports: Option<PublicSet>,
}

enum Exec {
    Next,
    /// A frame was popped (RETURN or HALT).
    Popped,
}

pub struct Vm<S: OutputSink> {
    frames: Vec<Frame>,
    registry: ModuleRegistry,
    globals: Env,
    /// Directory the running program lives in; import paths and file
    /// builtins resolve against it.
    base_dir: PathBuf,
    trace: bool,
    sink: S,
    argv: Vec<String>,
}

impl<S: OutputSink> Vm<S> {
    pub fn new(base_dir: PathBuf, sink: S) -> Self {
        Self {
            frames: Vec::with_capacity(16),
            registry: ModuleRegistry::new(),
            globals: Rc::new(RefCell::new(Scope::new())),
            base_dir,
            trace: false,
            sink,
            argv: Vec::new(),
        }
    }

    /// Script arguments surfaced by the `args()` builtin.
    pub fn set_argv(&mut self, argv: Vec<String>) {
        self.argv = argv;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs a unit's main body in the VM's global environment. The REPL
    /// calls this once per input; the environment, module registry and
    /// trace flag survive across calls.
    ///
    /// If the unit's file exists on disk it is registered in the module
    /// registry before execution, so a cyclic import chain that reaches back
    /// to the entry program does not re-execute it.
    pub fn run_unit(&mut self, unit: &Rc<Unit>) -> Result<(), Error> {
        bind_functions(unit, &self.globals);
        let registered = match Path::new(unit.file.as_ref()).canonicalize() {
            Ok(canonical) => {
                let public: PublicSet = Rc::default();
                self.registry
                    .insert_loading(canonical.clone(), self.globals.clone(), public.clone());
                Some((canonical, public))
            }
            Err(_) => None,
        };
        let public = registered.as_ref().map(|(_, public)| public.clone());
        let result = self.exec(
            unit.clone(),
            self.globals.clone(),
            self.globals.clone(),
            Rc::from("<main>"),
            public,
        );
        if let Some((canonical, _)) = registered {
            match &result {
                Ok(()) => self.registry.mark_loaded(&canonical),
                Err(_) => self.registry.remove(&canonical),
            }
        }
        result
    }

    /// Pushes a frame for `unit` and runs until it pops.
    fn exec(
        &mut self,
        unit: Rc<Unit>,
        env: Env,
        globals: Env,
        func_name: Rc<str>,
        exports: Option<PublicSet>,
    ) -> Result<(), Error> {
        let base = self.frames.len();
        self.frames.push(Frame {
            unit,
            ip: 0,
            stack: Vec::new(),
            env,
            globals,
            loops: Vec::new(),
            func_name,
            line: 1,
            exports,
        });
        self.run_to(base)
    }

    /// The dispatch loop: runs until the frame stack shrinks back to `base`.
    fn run_to(&mut self, base: usize) -> Result<(), Error> {
        loop {
            let frame = self.frames.last_mut().expect("dispatch with empty frame stack");
            let ip = frame.ip;
            let instr = frame.unit.code[ip];
            frame.line = frame.unit.lines[ip];
            frame.ip += 1;
            if self.trace {
                let depth = self.frames.last().expect("frame").stack.len();
                let line = format!("TRACE ip={ip:04x} ({}, {}) stack={depth}", instr.op, instr.operand_str());
                self.sink.diag_line(&line);
            }
            match self.execute(instr) {
                Ok(Exec::Next) => {}
                Ok(Exec::Popped) => {
                    if self.frames.len() == base {
                        return Ok(());
                    }
                }
                Err(mut err) => {
                    if let Error::Runtime(rt) = &mut err {
                        rt.ip = ip;
                        for frame in self.frames[base..].iter().rev() {
                            rt.trace.push(TraceFrame {
                                func: frame.func_name.clone(),
                                file: frame.unit.file.clone(),
                                line: frame.line,
                            });
                        }
                    }
                    self.frames.truncate(base);
                    return Err(err);
                }
            }
        }
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    fn push(&mut self, value: Value) {
        self.frame_mut().stack.push(value);
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.frame_mut().stack.pop().ok_or_else(|| rt_fmt!("Stack underflow"))
    }

    fn execute(&mut self, instr: Instr) -> Result<Exec, Error> {
        let Instr { op, a, b } = instr;
        match op {
            Opcode::LoadConst => {
                let value = self.frame_mut().unit.consts[a as usize].to_value();
                self.push(value);
            }
            Opcode::LoadNull => self.push(Value::Null),
            Opcode::LoadName => {
                let frame = self.frame_mut();
                let name = frame.unit.name(a).clone();
                let value = frame
                    .env
                    .borrow()
                    .get(&name)
                    .cloned()
                    .or_else(|| frame.globals.borrow().get(&name).cloned());
                match value {
                    Some(value) => self.push(value),
                    None => return Err(rt_fmt!("Undefined variable: {name}").into()),
                }
            }
            Opcode::StoreName => {
                let value = self.pop()?;
                let frame = self.frame_mut();
                let name = frame.unit.name(a).clone();
                if let Some(marker) = TypeMarker::from_code(b) {
                    if !marker.matches(value.kind()) {
                        return Err(rt_fmt!(
                            "Type error: cannot assign {} to '{name}' declared ={}",
                            value.kind(),
                            marker.letter()
                        )
                        .into());
                    }
                }
                frame.env.borrow_mut().insert(name, value);
            }
            Opcode::Pop => {
                self.pop()?;
            }

            Opcode::Add => self.binary_add()?,
            Opcode::Sub => self.binary_numeric("-", |x, y| x.checked_sub(y), |x, y| x - y)?,
            Opcode::Mul => self.binary_numeric("*", |x, y| x.checked_mul(y), |x, y| x * y)?,
            Opcode::Div => self.binary_div()?,
            Opcode::Neg => {
                let value = self.pop()?;
                match value {
                    Value::Int(v) => {
                        let negated = v.checked_neg().ok_or_else(|| rt_fmt!("Integer overflow in -"))?;
                        self.push(Value::Int(negated));
                    }
                    Value::Float(v) => self.push(Value::Float(-v)),
                    other => return Err(rt_fmt!("Cannot negate {}", other.kind()).into()),
                }
            }
            Opcode::Eq => {
                let (lhs, rhs) = self.pop_two()?;
                self.push(Value::Bool(lhs.eq_value(&rhs)));
            }
            Opcode::Ne => {
                let (lhs, rhs) = self.pop_two()?;
                self.push(Value::Bool(!lhs.eq_value(&rhs)));
            }
            Opcode::Lt => self.compare(|ord| ord.is_lt())?,
            Opcode::Le => self.compare(|ord| ord.is_le())?,
            Opcode::Gt => self.compare(|ord| ord.is_gt())?,
            Opcode::Ge => self.compare(|ord| ord.is_ge())?,
            Opcode::Not => {
                let value = self.pop()?;
                match value {
                    Value::Bool(b) => self.push(Value::Bool(!b)),
                    other => return Err(rt_fmt!("Expected bool for not, got {}", other.kind()).into()),
                }
            }

            Opcode::Jump => self.frame_mut().ip = a as usize,
            Opcode::JumpIfFalse => self.conditional_jump(a as usize, false)?,
            Opcode::JumpIfTrue => self.conditional_jump(a as usize, true)?,
            Opcode::Halt => {
                self.frames.pop();
                return Ok(Exec::Popped);
            }

            Opcode::BuildList => {
                let n = a as usize;
                let frame = self.frame_mut();
                if frame.stack.len() < n {
                    return Err(rt_fmt!("Stack underflow").into());
                }
                let elems = frame.stack.split_off(frame.stack.len() - n);
                self.push(Value::list(elems));
            }
            Opcode::BuildDict => {
                let n = a as usize;
                let frame = self.frame_mut();
                if frame.stack.len() < 2 * n {
                    return Err(rt_fmt!("Stack underflow").into());
                }
                let flat = frame.stack.split_off(frame.stack.len() - 2 * n);
                let mut dict = indexmap::IndexMap::with_capacity(n);
                let mut flat = flat.into_iter();
                while let (Some(key), Some(value)) = (flat.next(), flat.next()) {
                    match key {
                        Value::Str(key) => {
                            dict.insert(key, value);
                        }
                        other => return Err(rt_fmt!("Dict keys must be str, got {}", other.kind()).into()),
                    }
                }
                self.push(Value::Dict(Rc::new(RefCell::new(dict))));
            }
            Opcode::IndexGet => {
                let index = self.pop()?;
                let container = self.pop()?;
                let value = index_get(&container, &index)?;
                self.push(value);
            }
            Opcode::IndexSet => {
                let value = self.pop()?;
                let index = self.pop()?;
                let container = self.pop()?;
                index_set(&container, index, value)?;
            }
            Opcode::ListAppend => {
                let value = self.pop()?;
                let target = self.pop()?;
                match target {
                    Value::List(list) => list.borrow_mut().push(value),
                    other => return Err(rt_fmt!("Cannot add to {}", other.kind()).into()),
                }
            }
            Opcode::ListInsert => {
                let value = self.pop()?;
                let index = self.pop()?;
                let target = self.pop()?;
                let Value::List(list) = target else {
                    return Err(rt_fmt!("Cannot insert into {}", target.kind()).into());
                };
                let i = int_index(&index, "List")?;
                let mut list = list.borrow_mut();
                if i > list.len() {
                    return Err(rt_fmt!("Index out of range: {i}").into());
                }
                list.insert(i, value);
            }
            Opcode::RemoveAt => {
                let index = self.pop()?;
                let target = self.pop()?;
                remove_at(&target, &index)?;
            }
            Opcode::Len => {
                let value = self.pop()?;
                let len = match &value {
                    Value::Str(s) => s.chars().count(),
                    Value::List(list) => list.borrow().len(),
                    Value::Dict(dict) => dict.borrow().len(),
                    other => return Err(rt_fmt!("Cannot take amount of {}", other.kind()).into()),
                };
                self.push(Value::Int(len as i64));
            }

            Opcode::Call => self.call(a, b as usize)?,
            Opcode::Return => {
                let value = self.pop()?;
                self.frames.pop();
                match self.frames.last_mut() {
                    Some(caller) => caller.stack.push(value),
                    None => return Err(rt_fmt!("return used outside of a function").into()),
                }
                return Ok(Exec::Popped);
            }

            Opcode::LoopPush => self.frame_mut().loops.push(LoopExit {
                break_target: a as usize,
                continue_target: b as usize,
            }),
            Opcode::LoopPop => {
                if self.frame_mut().loops.pop().is_none() {
                    return Err(rt_fmt!("Loop stack underflow").into());
                }
            }
            Opcode::Break => {
                let frame = self.frame_mut();
                let exit = frame.loops.last().ok_or_else(|| rt_fmt!("stop outside of a loop"))?;
                frame.ip = exit.break_target;
            }
            Opcode::Continue => {
                let frame = self.frame_mut();
                let exit = frame
                    .loops
                    .last()
                    .ok_or_else(|| rt_fmt!("continue outside of a loop"))?;
                frame.ip = exit.continue_target;
            }
            Opcode::ForStart => {
                let iterable = self.pop()?;
                match ForCursor::new(iterable) {
                    Ok(cursor) => self.push(Value::Iter(Box::new(cursor))),
                    Err(other) => return Err(rt_fmt!("Cannot iterate {}", other.kind()).into()),
                }
            }
            Opcode::ForNext => {
                let frame = self.frame_mut();
                let name = frame.unit.name(b).clone();
                let Some(Value::Iter(cursor)) = frame.stack.last_mut() else {
                    return Err(rt_fmt!("FOR_NEXT without an active cursor").into());
                };
                match cursor.next() {
                    Some(value) => {
                        frame.env.borrow_mut().insert(name, value);
                    }
                    None => frame.ip = a as usize,
                }
            }

            Opcode::Import => {
                let frame = self.frame_mut();
                let Const::Str(path) = frame.unit.consts[a as usize].clone() else {
                    return Err(rt_fmt!("IMPORT with a non-string path constant").into());
                };
                self.import_module(&path)?;
            }
            Opcode::Export => {
                let frame = self.frame_mut();
                let name = frame.unit.name(a).clone();
                if let Some(exports) = &frame.exports {
                    exports.borrow_mut().insert(name);
                }
            }

            Opcode::TraceOn => self.trace = true,
            Opcode::TraceOff => self.trace = false,
        }
        Ok(Exec::Next)
    }

    fn pop_two(&mut self) -> Result<(Value, Value), RuntimeError> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        Ok((lhs, rhs))
    }

    fn binary_add(&mut self) -> Result<(), RuntimeError> {
        let (lhs, rhs) = self.pop_two()?;
        let result = match (&lhs, &rhs) {
            (Value::Int(x), Value::Int(y)) => {
                Value::Int(x.checked_add(*y).ok_or_else(|| rt_fmt!("Integer overflow in +"))?)
            }
            (Value::Float(x), Value::Float(y)) => Value::Float(x + y),
            (Value::Int(x), Value::Float(y)) => Value::Float(*x as f64 + y),
            (Value::Float(x), Value::Int(y)) => Value::Float(x + *y as f64),
            (Value::Str(x), Value::Str(y)) => Value::str(format!("{x}{y}")),
            (Value::List(x), Value::List(y)) => {
                let mut joined = x.borrow().clone();
                joined.extend(y.borrow().iter().cloned());
                Value::list(joined)
            }
            _ => return rt_err!("Cannot apply '+' to {} and {}", lhs.kind(), rhs.kind()),
        };
        self.push(result);
        Ok(())
    }

    fn binary_numeric(
        &mut self,
        symbol: &str,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let (lhs, rhs) = self.pop_two()?;
        let result = match (&lhs, &rhs) {
            (Value::Int(x), Value::Int(y)) => {
                Value::Int(int_op(*x, *y).ok_or_else(|| rt_fmt!("Integer overflow in {symbol}"))?)
            }
            (Value::Float(x), Value::Float(y)) => Value::Float(float_op(*x, *y)),
            (Value::Int(x), Value::Float(y)) => Value::Float(float_op(*x as f64, *y)),
            (Value::Float(x), Value::Int(y)) => Value::Float(float_op(*x, *y as f64)),
            _ => return rt_err!("Cannot apply '{symbol}' to {} and {}", lhs.kind(), rhs.kind()),
        };
        self.push(result);
        Ok(())
    }

    /// Division always produces a float; a zero divisor of either kind is an
    /// error.
    fn binary_div(&mut self) -> Result<(), RuntimeError> {
        let (lhs, rhs) = self.pop_two()?;
        let x = match &lhs {
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
            _ => return rt_err!("Cannot apply '/' to {} and {}", lhs.kind(), rhs.kind()),
        };
        let y = match &rhs {
            Value::Int(v) => *v as f64,
            Value::Float(v) => *v,
            _ => return rt_err!("Cannot apply '/' to {} and {}", lhs.kind(), rhs.kind()),
        };
        if y == 0.0 {
            return rt_err!("Division by zero");
        }
        self.push(Value::Float(x / y));
        Ok(())
    }

    fn compare(&mut self, test: impl Fn(std::cmp::Ordering) -> bool) -> Result<(), RuntimeError> {
        let (lhs, rhs) = self.pop_two()?;
        match lhs.cmp_value(&rhs) {
            Some(ordering) => {
                self.push(Value::Bool(test(ordering)));
                Ok(())
            }
            None => rt_err!("Cannot order {} and {}", lhs.kind(), rhs.kind()),
        }
    }

    /// Conditional jumps consume the tested value only when falling through;
    /// on the taken branch it stays as the expression result (short-circuit
    /// `and`/`or`) or is discarded by a POP at the target.
    fn conditional_jump(&mut self, target: usize, jump_when: bool) -> Result<(), RuntimeError> {
        let frame = self.frame_mut();
        let condition = match frame.stack.last() {
            Some(Value::Bool(b)) => *b,
            Some(other) => return rt_err!("Expected bool for condition, got {}", other.kind()),
            None => return rt_err!("Stack underflow"),
        };
        if condition == jump_when {
            frame.ip = target;
        } else {
            frame.stack.pop();
        }
        Ok(())
    }

    /// `CALL name argc`: builtins first, then the current unit's function
    /// table, then a function value in scope (imported or REPL-defined).
    fn call(&mut self, name_idx: u32, argc: usize) -> Result<(), Error> {
        let name = self.frame_mut().unit.name(name_idx).clone();

        if let Some(builtin) = Builtin::lookup(&name) {
            let args = self.pop_args(argc)?;
            let value = builtins::invoke(builtin, args, &mut self.sink, &self.base_dir, &self.argv)?;
            self.push(value);
            return Ok(());
        }

        let frame = self.frame_mut();
        if let Some(info) = frame.unit.functions.get(&name) {
            let unit = frame.unit.clone();
            let globals = frame.globals.clone();
            let params = info.params.clone();
            let entry = info.entry;
            return self.push_call_frame(unit, globals, name, params, entry, argc);
        }

        let callee = frame
            .env
            .borrow()
            .get(&name)
            .cloned()
            .or_else(|| frame.globals.borrow().get(&name).cloned());
        if let Some(Value::Func(func)) = callee {
            return self.push_call_frame(
                func.unit.clone(),
                func.globals.clone(),
                name,
                func.params.clone(),
                func.entry,
                argc,
            );
        }

        Err(rt_fmt!("Unknown function: {name}").into())
    }

    fn pop_args(&mut self, argc: usize) -> Result<Vec<Value>, RuntimeError> {
        let mut args = Vec::with_capacity(argc);
        for _ in 0..argc {
            args.push(self.pop()?);
        }
        args.reverse();
        Ok(args)
    }

    /// Binds arguments to parameters (checking type markers) and pushes the
    /// callee frame.
    fn push_call_frame(
        &mut self,
        unit: Rc<Unit>,
        globals: Env,
        name: Rc<str>,
        params: Vec<(Rc<str>, TypeMarker)>,
        entry: usize,
        argc: usize,
    ) -> Result<(), Error> {
        if argc != params.len() {
            return Err(rt_fmt!("{name}() expects {} arguments, got {argc}", params.len()).into());
        }
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(rt_fmt!("Max call depth exceeded ({MAX_CALL_DEPTH})").into());
        }
        let args = self.pop_args(argc)?;
        let mut scope = Scope::with_capacity(params.len());
        for ((param, marker), arg) in params.into_iter().zip(args) {
            if !marker.matches(arg.kind()) {
                return Err(rt_fmt!(
                    "Type error: {name}() parameter '{param}' expects {marker}, got {}",
                    arg.kind()
                )
                .into());
            }
            scope.insert(param, arg);
        }
        self.frames.push(Frame {
            unit,
            ip: entry,
            stack: Vec::new(),
            env: Rc::new(RefCell::new(scope)),
            globals,
            loops: Vec::new(),
            func_name: name,
            line: 1,
            exports: None,
        });
        Ok(())
    }

    /// Resolves, compiles and runs an imported module, then copies its
    /// exports into the importing frame. Modules already loaded (or still
    /// loading, for cycles) only contribute their exports.
    fn import_module(&mut self, path: &str) -> Result<(), Error> {
        let importer_dir = {
            let file = self.frame_mut().unit.file.clone();
            Path::new(file.as_ref())
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.base_dir.clone())
        };
        let resolved = importer_dir.join(path);
        let canonical = resolved.canonicalize().map_err(|e| {
            Error::wrap_import(
                path,
                rt_fmt!("Cannot read file \"{}\": {e}", resolved.display()).into(),
            )
        })?;

        if self.registry.get(&canonical).is_none() {
            let env: Env = Rc::default();
            let public: PublicSet = Rc::default();
            self.registry.insert_loading(canonical.clone(), env.clone(), public.clone());
            let result = self.load_module(&canonical, env, public);
            if let Err(err) = result {
                self.registry.remove(&canonical);
                return Err(Error::wrap_import(path, err));
            }
            self.registry.mark_loaded(&canonical);
        }

        let exports = self.registry.exports_of(&canonical);
        let frame = self.frame_mut();
        let mut scope = frame.env.borrow_mut();
        for (name, value) in exports {
            scope.insert(name, value);
        }
        Ok(())
    }

    fn load_module(&mut self, canonical: &Path, env: Env, public: PublicSet) -> Result<(), Error> {
        let source = std::fs::read_to_string(canonical)
            .map_err(|e| Error::from(rt_fmt!("Cannot read file \"{}\": {e}", canonical.display())))?;
        let unit = Rc::new(crate::compile_source(&source, &canonical.to_string_lossy())?);
        bind_functions(&unit, &env);
        self.exec(unit, env.clone(), env, Rc::from("<main>"), Some(public))
    }
}

/// Binds every hoisted function of the unit into `env`, making it callable
/// (and exportable) before the main body runs.
fn bind_functions(unit: &Rc<Unit>, env: &Env) {
    let mut scope = env.borrow_mut();
    for (name, info) in &unit.functions {
        let func = FuncValue {
            name: name.clone(),
            unit: unit.clone(),
            entry: info.entry,
            params: info.params.clone(),
            globals: env.clone(),
        };
        scope.insert(name.clone(), Value::Func(Rc::new(func)));
    }
}

fn int_index(index: &Value, what: &str) -> Result<usize, RuntimeError> {
    match index {
        Value::Int(i) if *i >= 0 => Ok(*i as usize),
        Value::Int(i) => rt_err!("Index out of range: {i}"),
        other => rt_err!("{what} index must be int, got {}", other.kind()),
    }
}

fn index_get(container: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match container {
        Value::List(list) => {
            let i = int_index(index, "List")?;
            list.borrow()
                .get(i)
                .cloned()
                .ok_or_else(|| rt_fmt!("Index out of range: {i}"))
        }
        Value::Str(s) => {
            let i = int_index(index, "String")?;
            match s.chars().nth(i) {
                Some(c) => Ok(Value::str(c.to_string())),
                None => rt_err!("Index out of range: {i}"),
            }
        }
        Value::Dict(dict) => match index {
            Value::Str(key) => dict
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| rt_fmt!("Key not found: \"{key}\"")),
            other => rt_err!("Dict key must be str, got {}", other.kind()),
        },
        other => rt_err!("Cannot index {}", other.kind()),
    }
}

fn index_set(container: &Value, index: Value, value: Value) -> Result<(), RuntimeError> {
    match container {
        Value::List(list) => {
            let i = int_index(&index, "List")?;
            let mut list = list.borrow_mut();
            match list.get_mut(i) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => rt_err!("Index out of range: {i}"),
            }
        }
        Value::Dict(dict) => match index {
            Value::Str(key) => {
                dict.borrow_mut().insert(key, value);
                Ok(())
            }
            other => rt_err!("Dict key must be str, got {}", other.kind()),
        },
        other => rt_err!("Cannot index-assign {}", other.kind()),
    }
}

fn remove_at(container: &Value, index: &Value) -> Result<(), RuntimeError> {
    match container {
        Value::List(list) => {
            let i = int_index(index, "List")?;
            let mut list = list.borrow_mut();
            if i >= list.len() {
                return rt_err!("Index out of range: {i}");
            }
            list.remove(i);
            Ok(())
        }
        Value::Dict(dict) => match index {
            Value::Str(key) => {
                if dict.borrow_mut().shift_remove(key).is_none() {
                    return rt_err!("Key not found: \"{key}\"");
                }
                Ok(())
            }
            other => rt_err!("Dict key must be str, got {}", other.kind()),
        },
        other => rt_err!("Cannot remove from {}", other.kind()),
    }
}
