//! Lowers the AST into a [`Unit`].
//!
//! Two passes: the first collects every top-level function signature so
//! calls may precede definitions textually; the second emits the main body
//! (from instruction 0 to `HALT`) and then each function body, recording its
//! entry offset in the function table.
//!
//! Forward jumps are emitted with a placeholder operand and backfilled once
//! the target is known. Conditional jumps consume the tested value only when
//! falling through, so every target that is reached with a dead condition
//! value starts with an explicit `POP`.

use ahash::AHashSet;

use super::{Const, FuncInfo, Instr, Opcode, Unit};
use crate::ast::{BinOp, Block, Expr, ExprKind, Lit, Program, Stmt, StmtKind, UnOp};
use crate::errors::CompileError;

pub struct Compiler {
    unit: Unit,
    /// One entry per syntactically enclosing loop: the LOOP_PUSH index whose
    /// break target still needs patching.
    loop_stack: Vec<usize>,
    in_function: u32,
    defined_globals: AHashSet<String>,
    declared_exports: Vec<(String, u32)>,
    tmp_id: u32,
}

pub fn compile(program: &Program, file: &str) -> Result<Unit, CompileError> {
    Compiler::new(file).compile(program)
}

impl Compiler {
    fn new(file: &str) -> Self {
        Self {
            unit: Unit::new(file),
            loop_stack: Vec::new(),
            in_function: 0,
            defined_globals: AHashSet::new(),
            declared_exports: Vec::new(),
            tmp_id: 0,
        }
    }

    fn compile(mut self, program: &Program) -> Result<Unit, CompileError> {
        // Pass 1: hoist function signatures.
        for stmt in &program.stmts {
            if let StmtKind::FuncDef { name, params, .. } = &stmt.kind {
                if self.unit.functions.contains_key(name.as_str()) {
                    return Err(CompileError {
                        line: stmt.line,
                        msg: format!("Function already defined: {name}"),
                    });
                }
                let params = params
                    .iter()
                    .map(|p| (std::rc::Rc::from(p.name.as_str()), p.marker))
                    .collect();
                self.unit.functions.insert(
                    std::rc::Rc::from(name.as_str()),
                    FuncInfo { params, entry: 0 },
                );
                self.defined_globals.insert(name.clone());
            }
        }

        // Pass 2: main body first, then function bodies behind its HALT.
        for stmt in &program.stmts {
            if matches!(stmt.kind, StmtKind::FuncDef { .. }) {
                continue;
            }
            self.compile_stmt(stmt)?;
        }
        let halt_line = program.stmts.last().map_or(1, |s| s.line);
        self.emit(Instr::new(Opcode::Halt), halt_line);

        for stmt in &program.stmts {
            if let StmtKind::FuncDef { name, body, .. } = &stmt.kind {
                let entry = self.unit.code.len();
                self.unit
                    .functions
                    .get_mut(name.as_str())
                    .expect("hoisted in pass 1")
                    .entry = entry;
                self.in_function += 1;
                self.compile_block(body)?;
                self.in_function -= 1;
                // implicit `return null` when control falls off the end
                let end_line = body.stmts.last().map_or(stmt.line, |s| s.line);
                self.emit(Instr::new(Opcode::LoadNull), end_line);
                self.emit(Instr::new(Opcode::Return), end_line);
            }
        }

        for (name, line) in std::mem::take(&mut self.declared_exports) {
            if !self.defined_globals.contains(&name) {
                return Err(CompileError {
                    line,
                    msg: format!("exported name not defined in module: {name}"),
                });
            }
        }

        Ok(self.unit)
    }

    fn emit(&mut self, instr: Instr, line: u32) -> usize {
        self.unit.emit(instr, line)
    }

    fn here(&self) -> usize {
        self.unit.code.len()
    }

    fn new_tmp(&mut self, prefix: &str) -> String {
        let name = format!("__{prefix}_{}", self.tmp_id);
        self.tmp_id += 1;
        name
    }

    fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        for stmt in &block.stmts {
            self.compile_stmt(stmt)?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        let line = stmt.line;
        match &stmt.kind {
            StmtKind::VarAssign { name, marker, value } => {
                self.compile_expr(value)?;
                let name_idx = self.unit.add_name(name);
                self.emit(Instr::with_ab(Opcode::StoreName, name_idx, marker.code()), line);
                if self.in_function == 0 {
                    self.defined_globals.insert(name.clone());
                }
            }
            StmtKind::If { branches, else_block } => {
                let mut end_jumps = Vec::new();
                for (cond, block) in branches {
                    self.compile_expr(cond)?;
                    let jump_false = self.emit(Instr::new(Opcode::JumpIfFalse), cond.line);
                    self.compile_block(block)?;
                    end_jumps.push(self.emit(Instr::new(Opcode::Jump), line));
                    let miss = self.here();
                    self.unit.patch_a(jump_false, miss);
                    // the kept false condition value dies here
                    self.emit(Instr::new(Opcode::Pop), cond.line);
                }
                if let Some(block) = else_block {
                    self.compile_block(block)?;
                }
                let end = self.here();
                for jump in end_jumps {
                    self.unit.patch_a(jump, end);
                }
            }
            StmtKind::While { cond, body } => {
                let loop_push = self.emit(Instr::new(Opcode::LoopPush), line);
                let cond_pos = self.here();
                self.unit.code[loop_push].b = cond_pos as u32;
                self.compile_expr(cond)?;
                let jump_exit = self.emit(Instr::new(Opcode::JumpIfFalse), cond.line);
                self.loop_stack.push(loop_push);
                let body_result = self.compile_block(body);
                self.loop_stack.pop();
                body_result?;
                self.emit(Instr::with_a(Opcode::Jump, cond_pos as u32), line);
                let exit = self.here();
                self.unit.patch_a(jump_exit, exit);
                self.emit(Instr::new(Opcode::Pop), cond.line);
                let done = self.here();
                self.unit.patch_a(loop_push, done);
                self.emit(Instr::new(Opcode::LoopPop), line);
            }
            StmtKind::For { var, iterable, body } => {
                self.compile_expr(iterable)?;
                self.emit(Instr::new(Opcode::ForStart), line);
                let loop_push = self.emit(Instr::new(Opcode::LoopPush), line);
                let next_pos = self.here();
                self.unit.code[loop_push].b = next_pos as u32;
                let var_idx = self.unit.add_name(var);
                let for_next = self.emit(Instr::with_ab(Opcode::ForNext, 0, var_idx), line);
                self.loop_stack.push(loop_push);
                let body_result = self.compile_block(body);
                self.loop_stack.pop();
                body_result?;
                self.emit(Instr::with_a(Opcode::Jump, next_pos as u32), line);
                let done = self.here();
                self.unit.patch_a(for_next, done);
                self.unit.patch_a(loop_push, done);
                self.emit(Instr::new(Opcode::LoopPop), line);
                // the cursor pushed by FOR_START
                self.emit(Instr::new(Opcode::Pop), line);
            }
            StmtKind::Stop => {
                if self.loop_stack.is_empty() {
                    return Err(CompileError {
                        line,
                        msg: "stop used outside of a loop".to_owned(),
                    });
                }
                self.emit(Instr::new(Opcode::Break), line);
            }
            StmtKind::Continue => {
                if self.loop_stack.is_empty() {
                    return Err(CompileError {
                        line,
                        msg: "continue used outside of a loop".to_owned(),
                    });
                }
                self.emit(Instr::new(Opcode::Continue), line);
            }
            StmtKind::FuncDef { .. } => {
                // hoisted in pass 1 and emitted after HALT; reaching this
                // arm from inside a block means the parser check was
                // bypassed
                return Err(CompileError {
                    line,
                    msg: "func definitions are only allowed at top level".to_owned(),
                });
            }
            StmtKind::Return { value } => {
                if self.in_function == 0 {
                    return Err(CompileError {
                        line,
                        msg: "return used outside of a function".to_owned(),
                    });
                }
                match value {
                    Some(expr) => self.compile_expr(expr)?,
                    None => {
                        self.emit(Instr::new(Opcode::LoadNull), line);
                    }
                }
                self.emit(Instr::new(Opcode::Return), line);
            }
            StmtKind::Match {
                scrutinee,
                cases,
                else_block,
            } => self.compile_match(scrutinee, cases, else_block.as_ref(), line)?,
            StmtKind::Import { path } => {
                let path_idx = self.unit.add_const(Const::Str(path.as_str().into()));
                self.emit(Instr::with_a(Opcode::Import, path_idx), line);
            }
            StmtKind::Export { name } => {
                if self.in_function != 0 {
                    return Err(CompileError {
                        line,
                        msg: "export is only allowed at top level".to_owned(),
                    });
                }
                let name_idx = self.unit.add_name(name);
                let export_name = self.unit.name(name_idx).clone();
                self.unit.exports.push(export_name);
                self.declared_exports.push((name.clone(), line));
                self.emit(Instr::with_a(Opcode::Export, name_idx), line);
            }
            StmtKind::SetIndex { name, index, value } => {
                let name_idx = self.unit.add_name(name);
                self.emit(Instr::with_a(Opcode::LoadName, name_idx), line);
                self.compile_expr(index)?;
                self.compile_expr(value)?;
                self.emit(Instr::new(Opcode::IndexSet), line);
            }
            StmtKind::ListAdd { name, value } => {
                let name_idx = self.unit.add_name(name);
                self.emit(Instr::with_a(Opcode::LoadName, name_idx), line);
                self.compile_expr(value)?;
                self.emit(Instr::new(Opcode::ListAppend), line);
            }
            StmtKind::ListInsert { name, index, value } => {
                let name_idx = self.unit.add_name(name);
                self.emit(Instr::with_a(Opcode::LoadName, name_idx), line);
                self.compile_expr(index)?;
                self.compile_expr(value)?;
                self.emit(Instr::new(Opcode::ListInsert), line);
            }
            StmtKind::Remove { name, index } => {
                let name_idx = self.unit.add_name(name);
                self.emit(Instr::with_a(Opcode::LoadName, name_idx), line);
                self.compile_expr(index)?;
                self.emit(Instr::new(Opcode::RemoveAt), line);
            }
            StmtKind::Trace { enabled } => {
                let op = if *enabled { Opcode::TraceOn } else { Opcode::TraceOff };
                self.emit(Instr::new(op), line);
            }
            StmtKind::Expr(expr) => {
                self.compile_expr(expr)?;
                self.emit(Instr::new(Opcode::Pop), line);
            }
        }
        Ok(())
    }

    /// The scrutinee is evaluated once into a hidden temporary, then each
    /// case compares it against its literal; `else` is the fallthrough.
    fn compile_match(
        &mut self,
        scrutinee: &Expr,
        cases: &[(Lit, Block)],
        else_block: Option<&Block>,
        line: u32,
    ) -> Result<(), CompileError> {
        let tmp = self.new_tmp("match");
        let tmp_idx = self.unit.add_name(&tmp);
        self.compile_expr(scrutinee)?;
        self.emit(Instr::with_ab(Opcode::StoreName, tmp_idx, 0), line);

        let mut end_jumps = Vec::new();
        for (lit, block) in cases {
            self.emit(Instr::with_a(Opcode::LoadName, tmp_idx), line);
            let lit_idx = self.unit.add_const(lit_const(lit));
            self.emit(Instr::with_a(Opcode::LoadConst, lit_idx), line);
            self.emit(Instr::new(Opcode::Eq), line);
            let jump_miss = self.emit(Instr::new(Opcode::JumpIfFalse), line);
            self.compile_block(block)?;
            end_jumps.push(self.emit(Instr::new(Opcode::Jump), line));
            let miss = self.here();
            self.unit.patch_a(jump_miss, miss);
            self.emit(Instr::new(Opcode::Pop), line);
        }
        if let Some(block) = else_block {
            self.compile_block(block)?;
        }
        let end = self.here();
        for jump in end_jumps {
            self.unit.patch_a(jump, end);
        }
        Ok(())
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        let line = expr.line;
        match &expr.kind {
            ExprKind::Literal(lit) => {
                let idx = self.unit.add_const(lit_const(lit));
                self.emit(Instr::with_a(Opcode::LoadConst, idx), line);
            }
            ExprKind::Var(name) => {
                let idx = self.unit.add_name(name);
                self.emit(Instr::with_a(Opcode::LoadName, idx), line);
            }
            ExprKind::Binary { op: BinOp::And, lhs, rhs } => {
                // left stays as the result when the jump is taken
                self.compile_expr(lhs)?;
                let jump_end = self.emit(Instr::new(Opcode::JumpIfFalse), line);
                self.compile_expr(rhs)?;
                let end = self.here();
                self.unit.patch_a(jump_end, end);
            }
            ExprKind::Binary { op: BinOp::Or, lhs, rhs } => {
                self.compile_expr(lhs)?;
                let jump_end = self.emit(Instr::new(Opcode::JumpIfTrue), line);
                self.compile_expr(rhs)?;
                let end = self.here();
                self.unit.patch_a(jump_end, end);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.compile_expr(lhs)?;
                self.compile_expr(rhs)?;
                let opcode = match op {
                    BinOp::Add => Opcode::Add,
                    BinOp::Sub => Opcode::Sub,
                    BinOp::Mul => Opcode::Mul,
                    BinOp::Div => Opcode::Div,
                    BinOp::Eq => Opcode::Eq,
                    BinOp::Ne => Opcode::Ne,
                    BinOp::Lt => Opcode::Lt,
                    BinOp::Le => Opcode::Le,
                    BinOp::Gt => Opcode::Gt,
                    BinOp::Ge => Opcode::Ge,
                    BinOp::And | BinOp::Or => unreachable!("handled above"),
                };
                self.emit(Instr::new(opcode), line);
            }
            ExprKind::Unary { op, operand } => {
                self.compile_expr(operand)?;
                let opcode = match op {
                    UnOp::Neg => Opcode::Neg,
                    UnOp::Not => Opcode::Not,
                };
                self.emit(Instr::new(opcode), line);
            }
            ExprKind::Call { name, args } => self.compile_call(name, args, line)?,
            ExprKind::Index { name, index } => {
                let name_idx = self.unit.add_name(name);
                self.emit(Instr::with_a(Opcode::LoadName, name_idx), line);
                self.compile_expr(index)?;
                self.emit(Instr::new(Opcode::IndexGet), line);
            }
            ExprKind::ListLit(elems) => {
                for elem in elems {
                    self.compile_expr(elem)?;
                }
                self.emit(Instr::with_a(Opcode::BuildList, elems.len() as u32), line);
            }
            ExprKind::DictLit(pairs) => {
                for (key, value) in pairs {
                    self.compile_expr(key)?;
                    self.compile_expr(value)?;
                }
                self.emit(Instr::with_a(Opcode::BuildDict, pairs.len() as u32), line);
            }
        }
        Ok(())
    }

    fn compile_call(&mut self, name: &str, args: &[Expr], line: u32) -> Result<(), CompileError> {
        // amount() lowers to a dedicated opcode
        if name == "amount" {
            if args.len() != 1 {
                return Err(CompileError {
                    line,
                    msg: "amount() must have exactly 1 argument".to_owned(),
                });
            }
            self.compile_expr(&args[0])?;
            self.emit(Instr::new(Opcode::Len), line);
            return Ok(());
        }
        for arg in args {
            self.compile_expr(arg)?;
        }
        let name_idx = self.unit.add_name(name);
        self.emit(Instr::with_ab(Opcode::Call, name_idx, args.len() as u32), line);
        Ok(())
    }
}

fn lit_const(lit: &Lit) -> Const {
    match lit {
        Lit::Int(v) => Const::Int(*v),
        Lit::Float(v) => Const::Float(*v),
        Lit::Str(s) => Const::Str(s.as_str().into()),
        Lit::Bool(b) => Const::Bool(*b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn compile_src(source: &str) -> Unit {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        compile(&program, "test.fallen").unwrap()
    }

    fn compile_err(source: &str) -> CompileError {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let program = Parser::new(tokens).parse_program().unwrap();
        compile(&program, "test.fallen").unwrap_err()
    }

    fn ops(unit: &Unit) -> Vec<Opcode> {
        unit.code.iter().map(|i| i.op).collect()
    }

    #[test]
    fn main_body_precedes_functions() {
        let unit = compile_src("func f() { return 1 }\nwrite(2)");
        // main: LOAD_CONST 2, CALL write, POP, HALT; then f's body
        let halt_pos = ops(&unit).iter().position(|op| *op == Opcode::Halt).unwrap();
        let entry = unit.functions.get("f").unwrap().entry;
        assert!(entry > halt_pos);
        assert_eq!(unit.code[0].op, Opcode::LoadConst);
    }

    #[test]
    fn function_bodies_end_with_implicit_return() {
        let unit = compile_src("func f() { write(1) }");
        let tail: Vec<Opcode> = ops(&unit)[unit.code.len() - 2..].to_vec();
        assert_eq!(tail, vec![Opcode::LoadNull, Opcode::Return]);
    }

    #[test]
    fn calls_before_definition_resolve() {
        let unit = compile_src("write(f(1))\nfunc f(n =i) { return n }");
        assert!(unit.functions.contains_key("f"));
    }

    #[test]
    fn duplicate_function_rejected() {
        let err = compile_err("func f() { return 1 }\nfunc f() { return 2 }");
        assert!(err.msg.contains("already defined"));
    }

    #[test]
    fn constant_pool_deduplicates() {
        let unit = compile_src("x =i 5\ny =i 5\nz =i 6");
        let ints = unit
            .consts
            .iter()
            .filter(|c| matches!(c, Const::Int(_)))
            .count();
        assert_eq!(ints, 2);
    }

    #[test]
    fn while_jumps_land_on_instruction_boundaries() {
        let unit = compile_src("i =i 0\nwhile i < 3 { i =i i + 1 }");
        for instr in &unit.code {
            if matches!(instr.op, Opcode::Jump | Opcode::JumpIfFalse | Opcode::JumpIfTrue) {
                assert!((instr.a as usize) < unit.code.len(), "jump target out of range");
            }
        }
    }

    #[test]
    fn while_shape() {
        let unit = compile_src("while true { write(1) }");
        let code = ops(&unit);
        assert_eq!(code[0], Opcode::LoopPush);
        // exit path: POP the false condition, then LOOP_POP
        let loop_pop = code.iter().position(|op| *op == Opcode::LoopPop).unwrap();
        assert_eq!(code[loop_pop - 1], Opcode::Pop);
        // break target is the LOOP_POP itself
        assert_eq!(unit.code[0].a as usize, loop_pop);
        // continue target is the condition
        assert_eq!(unit.code[0].b, 1);
    }

    #[test]
    fn for_shape() {
        let unit = compile_src("for x in [1, 2] { write(x) }");
        let code = ops(&unit);
        let for_start = code.iter().position(|op| *op == Opcode::ForStart).unwrap();
        assert_eq!(code[for_start + 1], Opcode::LoopPush);
        assert_eq!(code[for_start + 2], Opcode::ForNext);
        // epilogue: LOOP_POP then POP of the cursor
        let loop_pop = code.iter().position(|op| *op == Opcode::LoopPop).unwrap();
        assert_eq!(code[loop_pop + 1], Opcode::Pop);
        // exhaustion and break both target LOOP_POP
        assert_eq!(unit.code[for_start + 2].a as usize, loop_pop);
        assert_eq!(unit.code[for_start + 1].a as usize, loop_pop);
    }

    #[test]
    fn short_circuit_emits_no_dup() {
        let unit = compile_src("x =b true or false");
        let code = ops(&unit);
        assert_eq!(
            code,
            vec![
                Opcode::LoadConst,
                Opcode::JumpIfTrue,
                Opcode::LoadConst,
                Opcode::StoreName,
                Opcode::Halt,
            ]
        );
        assert_eq!(unit.code[1].a, 3);
    }

    #[test]
    fn match_uses_hidden_temp() {
        let unit = compile_src("match 2 { 1 { write(1) } else { write(0) } }");
        assert!(unit.names.iter().any(|n| n.starts_with("__match_")));
        let code = ops(&unit);
        assert!(code.contains(&Opcode::Eq));
    }

    #[test]
    fn stop_outside_loop_rejected() {
        let err = compile_err("stop");
        assert_eq!(err.msg, "stop used outside of a loop");
    }

    #[test]
    fn continue_outside_loop_rejected() {
        let err = compile_err("continue");
        assert_eq!(err.msg, "continue used outside of a loop");
    }

    #[test]
    fn return_outside_function_rejected() {
        let err = compile_err("return 1");
        assert_eq!(err.msg, "return used outside of a function");
    }

    #[test]
    fn export_of_undefined_name_rejected() {
        let err = compile_err("export ghost");
        assert!(err.msg.contains("exported name not defined"));
    }

    #[test]
    fn export_of_function_accepted() {
        let unit = compile_src("func f() { return 1 }\nexport f");
        assert_eq!(unit.exports.len(), 1);
    }

    #[test]
    fn amount_lowers_to_len() {
        let unit = compile_src("x =i amount([1, 2])");
        assert!(ops(&unit).contains(&Opcode::Len));
    }

    #[test]
    fn amount_arity_checked_at_compile_time() {
        let err = compile_err("x =i amount()");
        assert!(err.msg.contains("exactly 1 argument"));
    }

    #[test]
    fn stop_inside_match_inside_loop_allowed() {
        let unit = compile_src("while true { match 1 { 1 { stop } } }");
        assert!(ops(&unit).contains(&Opcode::Break));
    }
}
