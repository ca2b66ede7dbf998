//! Statement parsing.
//!
//! ```text
//! statement  := varDecl | reassign | ifStmt | whileStmt | forStmt | return | exprStmt
//! varDecl    := "variable" ident ":" typeSpec ( "=" expr )? ";"
//! typeSpec   := baseType ( "." ident )?
//! reassign   := ident ( "." ident )* "=" expr ";"
//! block      := "[" statement* "]"
//! ifStmt     := "if" "(" expr ")" block ( "elif" "(" expr ")" block )* ( "else" block )?
//! whileStmt  := "while" "(" expr ")" block
//! forStmt    := "for" "(" ident "in" expr ")" block
//! return     := "return" expr? ";"
//! ```
//!
//! Statements terminated by a block need no semicolon; everything else
//! does. Implicit lists (whitespace juxtaposition) are only recognized at
//! statement top level and in return position.

use tokenscript_lex::TokenKind;

use crate::ast::{
    BaseType, Block, ExprStmt, ForStmt, IfStmt, Reassign, ReturnStmt, Stmt, TypeSpec, VarDecl,
    WhileStmt,
};
use crate::{ParseResult, Parser};

impl Parser {
    /// Parses a single statement.
    pub(crate) fn parse_stmt(&mut self) -> ParseResult<Stmt> {
        if matches!(self.kind(), TokenKind::Variable) {
            return self.parse_var_decl();
        }
        if matches!(self.kind(), TokenKind::If) {
            return self.parse_if_stmt();
        }
        if matches!(self.kind(), TokenKind::While) {
            return self.parse_while_stmt();
        }
        if matches!(self.kind(), TokenKind::For) {
            return self.parse_for_stmt();
        }
        if matches!(self.kind(), TokenKind::Return) {
            return self.parse_return_stmt();
        }
        if matches!(self.kind(), TokenKind::Ident(_)) && self.looks_like_reassign() {
            return self.parse_reassign();
        }
        self.parse_expr_stmt()
    }

    /// Lookahead: `ident ("." ident)* "="` marks a reassignment.
    fn looks_like_reassign(&self) -> bool {
        let mut offset = 1;
        loop {
            match &self.peek(offset).kind {
                TokenKind::Dot => match &self.peek(offset + 1).kind {
                    TokenKind::Ident(_) => offset += 2,
                    _ => return false,
                },
                TokenKind::Eq => return true,
                _ => return false,
            }
        }
    }

    /// `variable name: Type.SubType = expr;`
    fn parse_var_decl(&mut self) -> ParseResult<Stmt> {
        let keyword = self.expect(&TokenKind::Variable, "to start declaration")?;
        let name = self.expect_ident("after 'variable'")?;
        self.expect(&TokenKind::Colon, "after variable name")?;
        let ty = self.parse_type_spec()?;

        let init = if self.eat(&TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect(&TokenKind::Semicolon, "after declaration")?;
        Ok(Stmt::VarDecl(VarDecl {
            name,
            ty,
            init,
            span: keyword.span,
        }))
    }

    /// `baseType ("." ident)?`
    fn parse_type_spec(&mut self) -> ParseResult<TypeSpec> {
        let base = match self.kind() {
            TokenKind::NumberType => BaseType::Number,
            TokenKind::NumberWithUnitType => BaseType::NumberWithUnit,
            TokenKind::StringType => BaseType::String,
            TokenKind::BooleanType => BaseType::Boolean,
            TokenKind::ColorType => BaseType::Color,
            TokenKind::ListType => BaseType::List,
            TokenKind::DictionaryType => BaseType::Dictionary,
            _ => return Err(self.error("expected type name")),
        };
        let token = self.advance();

        let sub = if self.eat(&TokenKind::Dot) {
            Some(self.expect_ident("as sub-type")?)
        } else {
            None
        };

        Ok(TypeSpec {
            base,
            sub,
            span: token.span,
        })
    }

    /// `ident ("." ident)* = expr;`
    fn parse_reassign(&mut self) -> ParseResult<Stmt> {
        let target = self.expect_ident("as assignment target")?;
        let span = target.span;

        let mut attrs = Vec::new();
        while self.eat(&TokenKind::Dot) {
            attrs.push(self.expect_ident("as attribute name")?);
        }

        self.expect(&TokenKind::Eq, "in assignment")?;
        let value = self.parse_expr()?;
        self.expect(&TokenKind::Semicolon, "after assignment")?;

        Ok(Stmt::Reassign(Reassign {
            target,
            attrs,
            value,
            span,
        }))
    }

    /// `[ statement* ]`
    pub(crate) fn parse_block(&mut self) -> ParseResult<Block> {
        let open = self.expect(&TokenKind::LBracket, "to open block")?;

        let mut stmts = Vec::new();
        while !matches!(self.kind(), TokenKind::RBracket) {
            if self.at_eof() {
                return Err(self.error("expected ']' to close block"));
            }
            stmts.push(self.parse_stmt()?);
        }
        let close = self.advance();

        Ok(Block {
            stmts,
            span: open.span.merge(close.span),
        })
    }

    /// `if (expr) block (elif (expr) block)* (else block)?`
    fn parse_if_stmt(&mut self) -> ParseResult<Stmt> {
        let keyword = self.expect(&TokenKind::If, "to start if")?;
        self.expect(&TokenKind::LParen, "after 'if'")?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "after condition")?;
        let then_block = self.parse_block()?;

        let mut elif_branches = Vec::new();
        while self.eat(&TokenKind::Elif) {
            self.expect(&TokenKind::LParen, "after 'elif'")?;
            let cond = self.parse_expr()?;
            self.expect(&TokenKind::RParen, "after condition")?;
            elif_branches.push((cond, self.parse_block()?));
        }

        let else_block = if self.eat(&TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Stmt::If(IfStmt {
            condition,
            then_block,
            elif_branches,
            else_block,
            span: keyword.span,
        }))
    }

    /// `while (expr) block`
    fn parse_while_stmt(&mut self) -> ParseResult<Stmt> {
        let keyword = self.expect(&TokenKind::While, "to start while")?;
        self.expect(&TokenKind::LParen, "after 'while'")?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "after condition")?;
        let body = self.parse_block()?;

        Ok(Stmt::While(WhileStmt {
            condition,
            body,
            span: keyword.span,
        }))
    }

    /// `for (ident in expr) block`
    fn parse_for_stmt(&mut self) -> ParseResult<Stmt> {
        let keyword = self.expect(&TokenKind::For, "to start for")?;
        self.expect(&TokenKind::LParen, "after 'for'")?;
        let binding = self.expect_ident("as loop binding")?;
        self.expect(&TokenKind::In, "after loop binding")?;
        let iterable = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "after iterable")?;
        let body = self.parse_block()?;

        Ok(Stmt::For(ForStmt {
            binding,
            iterable,
            body,
            span: keyword.span,
        }))
    }

    /// `return expr?;` - the value position admits implicit lists.
    fn parse_return_stmt(&mut self) -> ParseResult<Stmt> {
        let keyword = self.expect(&TokenKind::Return, "to start return")?;

        let value = if matches!(self.kind(), TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr_juxtaposed()?)
        };

        self.expect(&TokenKind::Semicolon, "after return")?;
        Ok(Stmt::Return(ReturnStmt {
            value,
            span: keyword.span,
        }))
    }

    /// Bare expression statement; top level admits implicit lists.
    fn parse_expr_stmt(&mut self) -> ParseResult<Stmt> {
        let expr = self.parse_expr_juxtaposed()?;
        let span = expr.span();
        self.expect(&TokenKind::Semicolon, "after expression")?;
        Ok(Stmt::Expr(ExprStmt { expr, span }))
    }
}
