//! Abstract syntax tree produced by the parser.
//!
//! Every statement and expression carries the 1-based source line it started
//! on; the compiler copies it into the per-instruction line table, which is
//! what runtime stack traces are built from.

use std::fmt;

use crate::token::TypeMarker;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub marker: TypeMarker,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    VarAssign {
        name: String,
        marker: TypeMarker,
        value: Expr,
    },
    /// `if`/`elif` branches in order, plus the optional trailing `else`.
    If {
        branches: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    For {
        var: String,
        iterable: Expr,
        body: Block,
    },
    Stop,
    Continue,
    FuncDef {
        name: String,
        params: Vec<Param>,
        body: Block,
    },
    Return {
        value: Option<Expr>,
    },
    /// Case heads are restricted to literals; `else` is the fallthrough.
    Match {
        scrutinee: Expr,
        cases: Vec<(Lit, Block)>,
        else_block: Option<Block>,
    },
    Import {
        path: String,
    },
    Export {
        name: String,
    },
    /// `set name(index) to value` — lists and dicts.
    SetIndex {
        name: String,
        index: Expr,
        value: Expr,
    },
    /// `add name(value)`
    ListAdd {
        name: String,
        value: Expr,
    },
    /// `insert name(index, value)`
    ListInsert {
        name: String,
        index: Expr,
        value: Expr,
    },
    /// `remove name(index)` — int index for lists, string key for dicts.
    Remove {
        name: String,
        index: Expr,
    },
    Trace {
        enabled: bool,
    },
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Lit),
    Var(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// The `call name(index)` indexing form.
    Index {
        name: String,
        index: Box<Expr>,
    },
    ListLit(Vec<Expr>),
    /// Keys are expressions that must evaluate to strings at runtime.
    DictLit(Vec<(Expr, Expr)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => {
                let s = v.to_string();
                if s.contains('.') {
                    f.write_str(&s)
                } else {
                    write!(f, "{s}.0")
                }
            }
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Renders the tree in the indented form printed by `fallen parse`.
pub fn pretty(program: &Program) -> String {
    let mut out = String::new();
    out.push_str("Program\n");
    for stmt in &program.stmts {
        pretty_stmt(stmt, 1, &mut out);
    }
    out
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn pretty_block(block: &Block, depth: usize, out: &mut String) {
    for stmt in &block.stmts {
        pretty_stmt(stmt, depth, out);
    }
}

fn pretty_stmt(stmt: &Stmt, depth: usize, out: &mut String) {
    indent(depth, out);
    match &stmt.kind {
        StmtKind::VarAssign { name, marker, value } => {
            out.push_str(&format!("VarAssign {name} ={}\n", marker.letter()));
            pretty_expr(value, depth + 1, out);
        }
        StmtKind::If { branches, else_block } => {
            out.push_str("If\n");
            for (cond, block) in branches {
                indent(depth + 1, out);
                out.push_str("branch\n");
                pretty_expr(cond, depth + 2, out);
                pretty_block(block, depth + 2, out);
            }
            if let Some(block) = else_block {
                indent(depth + 1, out);
                out.push_str("else\n");
                pretty_block(block, depth + 2, out);
            }
        }
        StmtKind::While { cond, body } => {
            out.push_str("While\n");
            pretty_expr(cond, depth + 1, out);
            pretty_block(body, depth + 1, out);
        }
        StmtKind::For { var, iterable, body } => {
            out.push_str(&format!("For {var}\n"));
            pretty_expr(iterable, depth + 1, out);
            pretty_block(body, depth + 1, out);
        }
        StmtKind::Stop => out.push_str("Stop\n"),
        StmtKind::Continue => out.push_str("Continue\n"),
        StmtKind::FuncDef { name, params, body } => {
            let params: Vec<String> = params
                .iter()
                .map(|p| format!("{} ={}", p.name, p.marker.letter()))
                .collect();
            out.push_str(&format!("FuncDef {name}({})\n", params.join(", ")));
            pretty_block(body, depth + 1, out);
        }
        StmtKind::Return { value } => {
            out.push_str("Return\n");
            if let Some(value) = value {
                pretty_expr(value, depth + 1, out);
            }
        }
        StmtKind::Match {
            scrutinee,
            cases,
            else_block,
        } => {
            out.push_str("Match\n");
            pretty_expr(scrutinee, depth + 1, out);
            for (lit, block) in cases {
                indent(depth + 1, out);
                out.push_str(&format!("case {lit}\n"));
                pretty_block(block, depth + 2, out);
            }
            if let Some(block) = else_block {
                indent(depth + 1, out);
                out.push_str("else\n");
                pretty_block(block, depth + 2, out);
            }
        }
        StmtKind::Import { path } => out.push_str(&format!("Import {path:?}\n")),
        StmtKind::Export { name } => out.push_str(&format!("Export {name}\n")),
        StmtKind::SetIndex { name, index, value } => {
            out.push_str(&format!("SetIndex {name}\n"));
            pretty_expr(index, depth + 1, out);
            pretty_expr(value, depth + 1, out);
        }
        StmtKind::ListAdd { name, value } => {
            out.push_str(&format!("ListAdd {name}\n"));
            pretty_expr(value, depth + 1, out);
        }
        StmtKind::ListInsert { name, index, value } => {
            out.push_str(&format!("ListInsert {name}\n"));
            pretty_expr(index, depth + 1, out);
            pretty_expr(value, depth + 1, out);
        }
        StmtKind::Remove { name, index } => {
            out.push_str(&format!("Remove {name}\n"));
            pretty_expr(index, depth + 1, out);
        }
        StmtKind::Trace { enabled } => {
            out.push_str(&format!("Trace {}\n", if *enabled { "on" } else { "off" }));
        }
        StmtKind::Expr(expr) => {
            out.push_str("ExprStmt\n");
            pretty_expr(expr, depth + 1, out);
        }
    }
}

fn pretty_expr(expr: &Expr, depth: usize, out: &mut String) {
    indent(depth, out);
    match &expr.kind {
        ExprKind::Literal(lit) => out.push_str(&format!("Literal {lit}\n")),
        ExprKind::Var(name) => out.push_str(&format!("Var {name}\n")),
        ExprKind::Binary { op, lhs, rhs } => {
            out.push_str(&format!("Binary {}\n", op.symbol()));
            pretty_expr(lhs, depth + 1, out);
            pretty_expr(rhs, depth + 1, out);
        }
        ExprKind::Unary { op, operand } => {
            let op = match op {
                UnOp::Neg => "-",
                UnOp::Not => "not",
            };
            out.push_str(&format!("Unary {op}\n"));
            pretty_expr(operand, depth + 1, out);
        }
        ExprKind::Call { name, args } => {
            out.push_str(&format!("Call {name}\n"));
            for arg in args {
                pretty_expr(arg, depth + 1, out);
            }
        }
        ExprKind::Index { name, index } => {
            out.push_str(&format!("Index {name}\n"));
            pretty_expr(index, depth + 1, out);
        }
        ExprKind::ListLit(elems) => {
            out.push_str("ListLit\n");
            for elem in elems {
                pretty_expr(elem, depth + 1, out);
            }
        }
        ExprKind::DictLit(pairs) => {
            out.push_str("DictLit\n");
            for (key, value) in pairs {
                pretty_expr(key, depth + 1, out);
                pretty_expr(value, depth + 1, out);
            }
        }
    }
}
