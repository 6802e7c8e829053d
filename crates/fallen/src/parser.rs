//! Recursive-descent parser.
//!
//! The statement dispatcher looks at the first one or two tokens; expressions
//! use one method per precedence level, lowest first: `or`, `and`, `not`,
//! comparisons (non-associative), `+ -`, `* /`, unary `-`, primary.
//!
//! The first error aborts the parse; there is no recovery.

use crate::ast::{BinOp, Block, Expr, ExprKind, Lit, Param, Program, Stmt, StmtKind, UnOp};
use crate::errors::ParseError;
use crate::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    block_depth: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            block_depth: 0,
        }
    }

    pub fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        self.skip_newlines();
        while !self.at(&TokenKind::Eof) {
            stmts.push(self.statement()?);
            self.skip_newlines();
        }
        Ok(Program { stmts })
    }

    /// Parses the input as a single expression; used by the REPL to echo
    /// expression results. Fails if tokens remain after the expression.
    pub fn parse_expression(mut self) -> Result<Expr, ParseError> {
        self.skip_newlines();
        let expr = self.expr()?;
        self.skip_newlines();
        if !self.at(&TokenKind::Eof) {
            return Err(self.error(format!("Unexpected {} after expression", self.current().kind)));
        }
        Ok(expr)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn line(&self) -> u32 {
        self.current().line
    }

    fn at(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(&kind) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("Expected {kind}, got {}", self.current().kind)))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Ident(_) => {
                let TokenKind::Ident(name) = self.bump().kind else {
                    unreachable!()
                };
                Ok(name)
            }
            other => Err(self.error(format!("Expected {what}, got {other}"))),
        }
    }

    fn skip_newlines(&mut self) {
        while self.at(&TokenKind::Newline) {
            self.bump();
        }
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line(),
            msg: msg.into(),
        }
    }

    fn stmt(&self, line: u32, kind: StmtKind) -> Stmt {
        Stmt { kind, line }
    }

    // ---------- statements ----------

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        match &self.current().kind {
            TokenKind::Func => self.func_def(),
            TokenKind::Return => self.return_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::For => self.for_statement(),
            TokenKind::Match => self.match_statement(),
            TokenKind::Import => {
                self.bump();
                match self.bump().kind {
                    TokenKind::Str(path) => Ok(self.stmt(line, StmtKind::Import { path })),
                    other => Err(ParseError {
                        line,
                        msg: format!("Expected string path after 'import', got {other}"),
                    }),
                }
            }
            TokenKind::Export => {
                self.bump();
                let name = self.expect_ident("name after 'export'")?;
                Ok(self.stmt(line, StmtKind::Export { name }))
            }
            TokenKind::Set => self.set_statement(),
            TokenKind::Add => self.add_statement(),
            TokenKind::Insert => self.insert_statement(),
            TokenKind::Remove => self.remove_statement(),
            TokenKind::Call => {
                let expr = self.index_expr()?;
                Ok(self.stmt(line, StmtKind::Expr(expr)))
            }
            TokenKind::Trace => self.trace_statement(),
            TokenKind::Stop => {
                self.bump();
                Ok(self.stmt(line, StmtKind::Stop))
            }
            TokenKind::Continue => {
                self.bump();
                Ok(self.stmt(line, StmtKind::Continue))
            }
            TokenKind::Ident(_) => self.ident_statement(),
            other => Err(self.error(format!("Unexpected {other} at start of statement"))),
        }
    }

    /// `name =T value` or `name(args...)`.
    fn ident_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        let name = self.expect_ident("name")?;
        match self.current().kind {
            TokenKind::Marker(marker) => {
                self.bump();
                let value = self.expr()?;
                Ok(self.stmt(line, StmtKind::VarAssign { name, marker, value }))
            }
            TokenKind::LParen => {
                let args = self.call_args()?;
                let expr = Expr {
                    kind: ExprKind::Call { name, args },
                    line,
                };
                Ok(self.stmt(line, StmtKind::Expr(expr)))
            }
            _ => Err(self.error("After a name, expected a type marker (=s/=i/=f/=b/=l/=d) or '('")),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.at(&TokenKind::RParen) {
            args.push(self.expr()?);
            while self.at(&TokenKind::Comma) {
                self.bump();
                args.push(self.expr()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokenKind::LBrace)?;
        self.block_depth += 1;
        self.skip_newlines();
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Eof) {
                self.block_depth -= 1;
                return Err(self.error("Unexpected end of input inside block (missing '}')"));
            }
            stmts.push(self.statement()?);
            self.skip_newlines();
        }
        self.expect(TokenKind::RBrace)?;
        self.block_depth -= 1;
        Ok(Block { stmts })
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::If)?;
        let mut branches = vec![(self.expr()?, self.block()?)];
        // elif/else may sit on the next line
        self.skip_newlines();
        while self.at(&TokenKind::Elif) {
            self.bump();
            branches.push((self.expr()?, self.block()?));
            self.skip_newlines();
        }
        let else_block = if self.at(&TokenKind::Else) {
            self.bump();
            Some(self.block()?)
        } else {
            None
        };
        Ok(self.stmt(line, StmtKind::If { branches, else_block }))
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::While)?;
        let cond = self.expr()?;
        let body = self.block()?;
        Ok(self.stmt(line, StmtKind::While { cond, body }))
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::For)?;
        let var = self.expect_ident("loop variable after 'for'")?;
        self.expect(TokenKind::In)?;
        let iterable = self.expr()?;
        let body = self.block()?;
        Ok(self.stmt(line, StmtKind::For { var, iterable, body }))
    }

    fn match_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Match)?;
        let scrutinee = self.expr()?;
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();
        let mut cases = Vec::new();
        let mut else_block = None;
        while !self.at(&TokenKind::RBrace) {
            if self.at(&TokenKind::Else) {
                self.bump();
                else_block = Some(self.block()?);
                self.skip_newlines();
                break;
            }
            let lit = self.case_literal()?;
            let block = self.block()?;
            cases.push((lit, block));
            self.skip_newlines();
        }
        self.expect(TokenKind::RBrace)?;
        Ok(self.stmt(
            line,
            StmtKind::Match {
                scrutinee,
                cases,
                else_block,
            },
        ))
    }

    /// A match case head: an int, float, string or bool literal, with an
    /// optional leading minus for numbers.
    fn case_literal(&mut self) -> Result<Lit, ParseError> {
        let negative = if self.at(&TokenKind::Minus) {
            self.bump();
            true
        } else {
            false
        };
        let token = self.bump();
        let lit = match token.kind {
            TokenKind::Int(v) => Lit::Int(if negative { -v } else { v }),
            TokenKind::Float(v) => Lit::Float(if negative { -v } else { v }),
            TokenKind::Str(s) if !negative => Lit::Str(s),
            TokenKind::Bool(b) if !negative => Lit::Bool(b),
            other => {
                return Err(ParseError {
                    line: token.line,
                    msg: format!("Match case must be a literal, got {other}"),
                })
            }
        };
        Ok(lit)
    }

    fn func_def(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        if self.block_depth != 0 {
            return Err(self.error("func definitions are only allowed at top level"));
        }
        self.expect(TokenKind::Func)?;
        let name = self.expect_ident("function name after 'func'")?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            params.push(self.param()?);
            while self.at(&TokenKind::Comma) {
                self.bump();
                params.push(self.param()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        let body = self.block()?;
        Ok(self.stmt(line, StmtKind::FuncDef { name, params, body }))
    }

    fn param(&mut self) -> Result<Param, ParseError> {
        let name = self.expect_ident("parameter name")?;
        match self.current().kind {
            TokenKind::Marker(marker) => {
                self.bump();
                Ok(Param { name, marker })
            }
            _ => Err(self.error("Expected parameter type marker (=s/=i/=f/=b/=l/=d)")),
        }
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Return)?;
        let value = match self.current().kind {
            TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof => None,
            _ => Some(self.expr()?),
        };
        Ok(self.stmt(line, StmtKind::Return { value }))
    }

    fn set_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Set)?;
        let name = self.expect_ident("name after 'set'")?;
        self.expect(TokenKind::LParen)?;
        let index = self.expr()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::To)?;
        let value = self.expr()?;
        Ok(self.stmt(line, StmtKind::SetIndex { name, index, value }))
    }

    fn add_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Add)?;
        let name = self.expect_ident("name after 'add'")?;
        self.expect(TokenKind::LParen)?;
        let value = self.expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(self.stmt(line, StmtKind::ListAdd { name, value }))
    }

    fn insert_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Insert)?;
        let name = self.expect_ident("name after 'insert'")?;
        self.expect(TokenKind::LParen)?;
        let index = self.expr()?;
        self.expect(TokenKind::Comma)?;
        let value = self.expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(self.stmt(line, StmtKind::ListInsert { name, index, value }))
    }

    fn remove_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Remove)?;
        let name = self.expect_ident("name after 'remove'")?;
        self.expect(TokenKind::LParen)?;
        let index = self.expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(self.stmt(line, StmtKind::Remove { name, index }))
    }

    fn trace_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Trace)?;
        let enabled = match self.bump().kind {
            TokenKind::On => true,
            TokenKind::Off => false,
            other => {
                return Err(ParseError {
                    line,
                    msg: format!("Expected 'on' or 'off' after 'trace', got {other}"),
                })
            }
        };
        Ok(self.stmt(line, StmtKind::Trace { enabled }))
    }

    /// `call name(expr)` — indexing into a list, dict or string.
    fn index_expr(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        self.expect(TokenKind::Call)?;
        let name = self.expect_ident("name after 'call'")?;
        self.expect(TokenKind::LParen)?;
        let index = self.expr()?;
        self.expect(TokenKind::RParen)?;
        Ok(Expr {
            kind: ExprKind::Index {
                name,
                index: Box::new(index),
            },
            line,
        })
    }

    // ---------- expressions ----------

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.and_expr()?;
        while self.at(&TokenKind::Or) {
            let line = self.line();
            self.bump();
            let rhs = self.and_expr()?;
            node = Expr {
                kind: ExprKind::Binary {
                    op: BinOp::Or,
                    lhs: Box::new(node),
                    rhs: Box::new(rhs),
                },
                line,
            };
        }
        Ok(node)
    }

    fn and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.not_expr()?;
        while self.at(&TokenKind::And) {
            let line = self.line();
            self.bump();
            let rhs = self.not_expr()?;
            node = Expr {
                kind: ExprKind::Binary {
                    op: BinOp::And,
                    lhs: Box::new(node),
                    rhs: Box::new(rhs),
                },
                line,
            };
        }
        Ok(node)
    }

    fn not_expr(&mut self) -> Result<Expr, ParseError> {
        if self.at(&TokenKind::Not) {
            let line = self.line();
            self.bump();
            let operand = self.not_expr()?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op: UnOp::Not,
                    operand: Box::new(operand),
                },
                line,
            });
        }
        self.comparison()
    }

    /// Comparisons are non-associative: `a < b < c` is a parse error.
    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.additive()?;
        let op = match self.current().kind {
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::NotEq => BinOp::Ne,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Le => BinOp::Le,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::Ge => BinOp::Ge,
            _ => return Ok(lhs),
        };
        let line = self.line();
        self.bump();
        let rhs = self.additive()?;
        if matches!(
            self.current().kind,
            TokenKind::EqEq | TokenKind::NotEq | TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge
        ) {
            return Err(self.error("Comparisons cannot be chained"));
        }
        Ok(Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            line,
        })
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(node),
            };
            let line = self.line();
            self.bump();
            let rhs = self.multiplicative()?;
            node = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(node),
                    rhs: Box::new(rhs),
                },
                line,
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.unary()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => return Ok(node),
            };
            let line = self.line();
            self.bump();
            let rhs = self.unary()?;
            node = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(node),
                    rhs: Box::new(rhs),
                },
                line,
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.at(&TokenKind::Minus) {
            let line = self.line();
            self.bump();
            let operand = self.unary()?;
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op: UnOp::Neg,
                    operand: Box::new(operand),
                },
                line,
            });
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        match self.current().kind.clone() {
            TokenKind::Int(v) => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Literal(Lit::Int(v)),
                    line,
                })
            }
            TokenKind::Float(v) => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Literal(Lit::Float(v)),
                    line,
                })
            }
            TokenKind::Str(s) => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Literal(Lit::Str(s)),
                    line,
                })
            }
            TokenKind::Bool(b) => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Literal(Lit::Bool(b)),
                    line,
                })
            }
            TokenKind::Ident(name) => {
                self.bump();
                if self.at(&TokenKind::LParen) {
                    let args = self.call_args()?;
                    Ok(Expr {
                        kind: ExprKind::Call { name, args },
                        line,
                    })
                } else {
                    Ok(Expr {
                        kind: ExprKind::Var(name),
                        line,
                    })
                }
            }
            TokenKind::Call => self.index_expr(),
            TokenKind::LParen => {
                self.bump();
                let node = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(node)
            }
            TokenKind::LBracket => self.list_literal(),
            TokenKind::LBrace => self.dict_literal(),
            other => Err(self.error(format!("Unexpected {other} in expression"))),
        }
    }

    fn list_literal(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        self.expect(TokenKind::LBracket)?;
        self.skip_newlines();
        let mut elems = Vec::new();
        if !self.at(&TokenKind::RBracket) {
            elems.push(self.expr()?);
            self.skip_newlines();
            while self.at(&TokenKind::Comma) {
                self.bump();
                self.skip_newlines();
                if self.at(&TokenKind::RBracket) {
                    break;
                }
                elems.push(self.expr()?);
                self.skip_newlines();
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expr {
            kind: ExprKind::ListLit(elems),
            line,
        })
    }

    fn dict_literal(&mut self) -> Result<Expr, ParseError> {
        let line = self.line();
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();
        let mut pairs = Vec::new();
        if !self.at(&TokenKind::RBrace) {
            pairs.push(self.dict_pair()?);
            self.skip_newlines();
            while self.at(&TokenKind::Comma) {
                self.bump();
                self.skip_newlines();
                if self.at(&TokenKind::RBrace) {
                    break;
                }
                pairs.push(self.dict_pair()?);
                self.skip_newlines();
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expr {
            kind: ExprKind::DictLit(pairs),
            line,
        })
    }

    fn dict_pair(&mut self) -> Result<(Expr, Expr), ParseError> {
        let key = self.expr()?;
        self.expect(TokenKind::Colon)?;
        self.skip_newlines();
        let value = self.expr()?;
        Ok((key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::token::TypeMarker;

    fn parse(source: &str) -> Program {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_program().unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse_program().unwrap_err()
    }

    #[test]
    fn precedence_mul_over_add() {
        let program = parse("x =i 2 + 3 * 4");
        let StmtKind::VarAssign { value, .. } = &program.stmts[0].kind else {
            panic!("expected assignment");
        };
        let ExprKind::Binary { op: BinOp::Add, rhs, .. } = &value.kind else {
            panic!("expected + at the top, got {value:?}");
        };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let program = parse("x =b a or b and c");
        let StmtKind::VarAssign { value, .. } = &program.stmts[0].kind else {
            panic!();
        };
        let ExprKind::Binary { op: BinOp::Or, rhs, .. } = &value.kind else {
            panic!("expected 'or' at the top");
        };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::And, .. }));
    }

    #[test]
    fn not_applies_to_comparison() {
        let program = parse("x =b not a < b");
        let StmtKind::VarAssign { value, .. } = &program.stmts[0].kind else {
            panic!();
        };
        let ExprKind::Unary { op: UnOp::Not, operand } = &value.kind else {
            panic!("expected unary not at the top");
        };
        assert!(matches!(operand.kind, ExprKind::Binary { op: BinOp::Lt, .. }));
    }

    #[test]
    fn chained_comparison_rejected() {
        let err = parse_err("x =b 1 < 2 < 3");
        assert!(err.msg.contains("chained"));
    }

    #[test]
    fn if_elif_else_chain() {
        let program = parse("if a { write(1) } elif b { write(2) } elif c { write(3) } else { write(4) }");
        let StmtKind::If { branches, else_block } = &program.stmts[0].kind else {
            panic!();
        };
        assert_eq!(branches.len(), 3);
        assert!(else_block.is_some());
    }

    #[test]
    fn else_on_next_line() {
        let program = parse("if a { write(1) }\nelse { write(2) }");
        assert_eq!(program.stmts.len(), 1);
    }

    #[test]
    fn func_def_params() {
        let program = parse("func f(a =i, b =s) { return a }");
        let StmtKind::FuncDef { name, params, .. } = &program.stmts[0].kind else {
            panic!();
        };
        assert_eq!(name, "f");
        assert_eq!(params[0].marker, TypeMarker::Int);
        assert_eq!(params[1].marker, TypeMarker::Str);
    }

    #[test]
    fn func_only_top_level() {
        let err = parse_err("if a { func f() { return 1 } }");
        assert!(err.msg.contains("top level"));
    }

    #[test]
    fn param_requires_marker() {
        let err = parse_err("func f(a) { return a }");
        assert!(err.msg.contains("parameter type marker"));
    }

    #[test]
    fn container_statements() {
        let program = parse("set nums(1) to (99)\nadd nums(3)\ninsert nums(0, 5)\nremove nums(2)\ncall nums(0)");
        assert!(matches!(program.stmts[0].kind, StmtKind::SetIndex { .. }));
        assert!(matches!(program.stmts[1].kind, StmtKind::ListAdd { .. }));
        assert!(matches!(program.stmts[2].kind, StmtKind::ListInsert { .. }));
        assert!(matches!(program.stmts[3].kind, StmtKind::Remove { .. }));
        assert!(matches!(program.stmts[4].kind, StmtKind::Expr(_)));
    }

    #[test]
    fn match_cases_are_literals() {
        let program = parse("match x { 1 { write(1) } \"two\" { write(2) } -3 { write(3) } else { write(0) } }");
        let StmtKind::Match { cases, else_block, .. } = &program.stmts[0].kind else {
            panic!();
        };
        assert_eq!(cases.len(), 3);
        assert_eq!(cases[2].0, Lit::Int(-3));
        assert!(else_block.is_some());
    }

    #[test]
    fn match_rejects_variable_case() {
        let err = parse_err("match x { y { write(1) } }");
        assert!(err.msg.contains("literal"));
    }

    #[test]
    fn list_and_dict_literals() {
        let program = parse("x =l [1, 2, 3]\ny =d {\"a\": 1, \"b\": 2}");
        let StmtKind::VarAssign { value, .. } = &program.stmts[0].kind else {
            panic!();
        };
        assert!(matches!(&value.kind, ExprKind::ListLit(elems) if elems.len() == 3));
        let StmtKind::VarAssign { value, .. } = &program.stmts[1].kind else {
            panic!();
        };
        assert!(matches!(&value.kind, ExprKind::DictLit(pairs) if pairs.len() == 2));
    }

    #[test]
    fn index_call_expression() {
        let program = parse("x =i call nums(2)");
        let StmtKind::VarAssign { value, .. } = &program.stmts[0].kind else {
            panic!();
        };
        assert!(matches!(&value.kind, ExprKind::Index { name, .. } if name == "nums"));
    }

    #[test]
    fn trace_statements() {
        let program = parse("trace on\ntrace off");
        assert_eq!(program.stmts[0].kind, StmtKind::Trace { enabled: true });
        assert_eq!(program.stmts[1].kind, StmtKind::Trace { enabled: false });
    }

    #[test]
    fn import_export() {
        let program = parse("import \"lib.fallen\"\nexport helper");
        assert!(matches!(&program.stmts[0].kind, StmtKind::Import { path } if path == "lib.fallen"));
        assert!(matches!(&program.stmts[1].kind, StmtKind::Export { name } if name == "helper"));
    }

    #[test]
    fn bare_return() {
        let program = parse("func f() { return }");
        let StmtKind::FuncDef { body, .. } = &program.stmts[0].kind else {
            panic!();
        };
        assert_eq!(body.stmts[0].kind, StmtKind::Return { value: None });
    }

    #[test]
    fn statement_lines() {
        let program = parse("x =i 1\n\ny =i 2");
        assert_eq!(program.stmts[0].line, 1);
        assert_eq!(program.stmts[1].line, 3);
    }

    #[test]
    fn missing_close_brace() {
        let err = parse_err("while true { write(1)");
        assert!(err.msg.contains("missing '}'"));
    }
}
