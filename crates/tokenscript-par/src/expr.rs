//! Expression parsing via Pratt (top-down operator precedence) parsing.
//!
//! # Operator precedence (lowest to highest)
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | 1 | `\|\|` | Left |
//! | 2 | `&&` | Left |
//! | 3 | `==`, `!=` | Left |
//! | 4 | `<`, `<=`, `>`, `>=` | Left |
//! | 5 | `+`, `-` | Left |
//! | 6 | `*`, `/`, `%` | Left |
//! | 7 | `^` | Right |
//! | 8 | unary `-`, `!` | Prefix |
//! | 9 | `.attr`, `(args)`, `[index]` | Postfix |
//!
//! Whitespace juxtaposition (implicit lists) binds looser than every
//! operator and is only recognized at statement top level and in return
//! position; inside parentheses stray adjacency is a parse error.

use tokenscript_lex::TokenKind;

use crate::ast::{
    AttrExpr, BinOp, BinaryExpr, BoolLit, CallExpr, Expr, FloatLit, HexColorLit, Ident,
    IndexExpr, IntLit, ListExpr, ReferenceExpr, StrLit, UnOp, UnaryExpr, UnitNumberLit,
};
use crate::{ParseResult, Parser};

/// Binding power levels for Pratt parsing.
/// Higher numbers bind tighter.
pub(crate) mod bp {
    /// Minimum binding power (start of expression).
    pub const MIN: u8 = 0;

    /// Logical OR: `||`
    pub const OR: u8 = 2;

    /// Logical AND: `&&`
    pub const AND: u8 = 4;

    /// Equality: `==`, `!=`
    pub const EQUALITY: u8 = 6;

    /// Relational: `<`, `<=`, `>`, `>=`
    pub const RELATIONAL: u8 = 8;

    /// Additive: `+`, `-`
    pub const ADDITIVE: u8 = 10;

    /// Multiplicative: `*`, `/`, `%`
    pub const MULTIPLICATIVE: u8 = 12;

    /// Power: `^` (right-associative)
    pub const POWER: u8 = 14;

    /// Prefix operators: `-`, `!`
    pub const UNARY: u8 = 16;
}

impl Parser {
    /// Parses an expression (no juxtaposition, no top-level commas).
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_expr_bp(bp::MIN)
    }

    /// Parses an expression at statement-top or return position, where
    /// comma lists and implicit lists are admitted.
    pub(crate) fn parse_expr_juxtaposed(&mut self) -> ParseResult<Expr> {
        let first = self.parse_expr()?;

        if matches!(self.kind(), TokenKind::Comma) {
            let mut items = vec![first];
            while self.eat(&TokenKind::Comma) {
                items.push(self.parse_expr()?);
            }
            let span = items[0].span().merge(items[items.len() - 1].span());
            return Ok(Expr::CommaList(ListExpr { items, span }));
        }

        if self.kind().starts_expression() {
            let mut items = vec![first];
            while self.kind().starts_expression() {
                items.push(self.parse_expr()?);
            }
            let span = items[0].span().merge(items[items.len() - 1].span());
            return Ok(Expr::ImplicitList(ListExpr { items, span }));
        }

        Ok(first)
    }

    /// Pratt core: parses an expression whose operators all have left
    /// binding power >= `min_bp`.
    fn parse_expr_bp(&mut self, min_bp: u8) -> ParseResult<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let Some((lbp, rbp, op)) = self.infix_binding_power() else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.advance();

            let rhs = self.parse_expr_bp(rbp)?;
            let span = lhs.span().merge(rhs.span());
            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            });
        }

        Ok(lhs)
    }

    /// Binding powers for the current token, if it is an infix operator.
    ///
    /// Left-associative operators use `(l, l + 1)`; the right-associative
    /// power operator uses `(l, l)`.
    fn infix_binding_power(&self) -> Option<(u8, u8, BinOp)> {
        let bp = match self.kind() {
            TokenKind::OrOr => (bp::OR, bp::OR + 1, BinOp::Or),
            TokenKind::AndAnd => (bp::AND, bp::AND + 1, BinOp::And),
            TokenKind::EqEq => (bp::EQUALITY, bp::EQUALITY + 1, BinOp::Eq),
            TokenKind::NotEq => (bp::EQUALITY, bp::EQUALITY + 1, BinOp::Ne),
            TokenKind::Lt => (bp::RELATIONAL, bp::RELATIONAL + 1, BinOp::Lt),
            TokenKind::LtEq => (bp::RELATIONAL, bp::RELATIONAL + 1, BinOp::Le),
            TokenKind::Gt => (bp::RELATIONAL, bp::RELATIONAL + 1, BinOp::Gt),
            TokenKind::GtEq => (bp::RELATIONAL, bp::RELATIONAL + 1, BinOp::Ge),
            TokenKind::Plus => (bp::ADDITIVE, bp::ADDITIVE + 1, BinOp::Add),
            TokenKind::Minus => (bp::ADDITIVE, bp::ADDITIVE + 1, BinOp::Sub),
            TokenKind::Star => (bp::MULTIPLICATIVE, bp::MULTIPLICATIVE + 1, BinOp::Mul),
            TokenKind::Slash => (bp::MULTIPLICATIVE, bp::MULTIPLICATIVE + 1, BinOp::Div),
            TokenKind::Percent => (bp::MULTIPLICATIVE, bp::MULTIPLICATIVE + 1, BinOp::Rem),
            TokenKind::Caret => (bp::POWER, bp::POWER, BinOp::Pow),
            _ => return None,
        };
        Some(bp)
    }

    /// Parses a prefix expression: an atom or a unary operator, plus any
    /// postfix operators.
    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let kind = self.kind().clone();
        let expr = match kind {
            TokenKind::Int(value) => {
                let token = self.advance();
                Expr::Int(IntLit {
                    value,
                    span: token.span,
                })
            }
            TokenKind::Float(value) => {
                let token = self.advance();
                Expr::Float(FloatLit {
                    value,
                    span: token.span,
                })
            }
            TokenKind::UnitNumber {
                value,
                integral,
                unit,
            } => {
                let token = self.advance();
                Expr::UnitNumber(UnitNumberLit {
                    value,
                    integral,
                    unit,
                    span: token.span,
                })
            }
            TokenKind::Str(value) => {
                let token = self.advance();
                Expr::Str(StrLit {
                    value,
                    span: token.span,
                })
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance();
                Expr::Bool(BoolLit {
                    value: kind == TokenKind::True,
                    span: token.span,
                })
            }
            TokenKind::Null => {
                let token = self.advance();
                Expr::Null(token.span)
            }
            // A hex literal is a color, never an identifier.
            TokenKind::HexColor(value) => {
                let token = self.advance();
                Expr::HexColor(HexColorLit {
                    value,
                    span: token.span,
                })
            }
            TokenKind::Reference(path) => {
                let token = self.advance();
                Expr::Reference(ReferenceExpr {
                    path,
                    span: token.span,
                })
            }
            TokenKind::Ident(name) => {
                let token = self.advance();
                Expr::Ident(Ident {
                    name,
                    span: token.span,
                })
            }
            TokenKind::LParen => self.parse_paren()?,
            TokenKind::Minus => return self.parse_unary(UnOp::Neg),
            TokenKind::Not => return self.parse_unary(UnOp::Not),
            _ => return Err(self.error("expected expression")),
        };

        self.parse_postfix(expr)
    }

    /// Parses a unary expression; the operand binds at unary power.
    fn parse_unary(&mut self, op: UnOp) -> ParseResult<Expr> {
        let token = self.advance();
        let operand = self.parse_expr_bp(bp::UNARY)?;
        let span = token.span.merge(operand.span());
        Ok(Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
            span,
        }))
    }

    /// Parses a parenthesized expression or comma list.
    fn parse_paren(&mut self) -> ParseResult<Expr> {
        let open = self.expect(&TokenKind::LParen, "to open group")?;
        let first = self.parse_expr()?;

        if matches!(self.kind(), TokenKind::Comma) {
            let mut items = vec![first];
            while self.eat(&TokenKind::Comma) {
                items.push(self.parse_expr()?);
            }
            let close = self.expect(&TokenKind::RParen, "after list")?;
            return Ok(Expr::CommaList(ListExpr {
                items,
                span: open.span.merge(close.span),
            }));
        }

        self.expect(&TokenKind::RParen, "to close group")?;
        Ok(first)
    }

    /// Applies postfix operators: attribute access, call, index.
    fn parse_postfix(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        loop {
            if self.eat(&TokenKind::Dot) {
                let attr = self.expect_ident("after '.'")?;
                expr = match expr {
                    // Consecutive attributes extend the same chain node.
                    Expr::Attr(mut chain) => {
                        chain.span = chain.span.merge(attr.span);
                        chain.attrs.push(attr);
                        Expr::Attr(chain)
                    }
                    object => {
                        let span = object.span().merge(attr.span);
                        Expr::Attr(AttrExpr {
                            object: Box::new(object),
                            attrs: vec![attr],
                            span,
                        })
                    }
                };
                continue;
            }

            if matches!(self.kind(), TokenKind::LParen) {
                self.advance();
                let mut args = Vec::new();
                if !matches!(self.kind(), TokenKind::RParen) {
                    args.push(self.parse_expr()?);
                    while self.eat(&TokenKind::Comma) {
                        args.push(self.parse_expr()?);
                    }
                }
                let close = self.expect(&TokenKind::RParen, "after arguments")?;
                let span = expr.span().merge(close.span);
                expr = Expr::Call(CallExpr {
                    callee: Box::new(expr),
                    args,
                    span,
                });
                continue;
            }

            if matches!(self.kind(), TokenKind::LBracket) {
                self.advance();
                let index = self.parse_expr()?;
                let close = self.expect(&TokenKind::RBracket, "after index")?;
                let span = expr.span().merge(close.span);
                expr = Expr::Index(IndexExpr {
                    object: Box::new(expr),
                    index: Box::new(index),
                    span,
                });
                continue;
            }

            return Ok(expr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_source;
    use crate::ast::Stmt;

    /// Parses `return <source>;` and yields the returned expression.
    fn expr(source: &str) -> Expr {
        let program = parse_source(&format!("return {source};")).unwrap();
        let Stmt::Return(ret) = &program[0] else {
            panic!("expected return");
        };
        ret.value.clone().unwrap()
    }

    fn binary(expr: &Expr) -> &BinaryExpr {
        match expr {
            Expr::Binary(b) => b,
            other => panic!("expected binary expression, got {other:?}"),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let e = expr("a + b * c");
        let outer = binary(&e);
        assert_eq!(outer.op, BinOp::Add);
        assert_eq!(binary(&outer.rhs).op, BinOp::Mul);
    }

    #[test]
    fn test_subtraction_is_left_associative() {
        let e = expr("a - b - c");
        let outer = binary(&e);
        assert_eq!(outer.op, BinOp::Sub);
        // (a - b) - c
        assert_eq!(binary(&outer.lhs).op, BinOp::Sub);
    }

    #[test]
    fn test_power_is_right_associative() {
        let e = expr("2 ^ 3 ^ 2");
        let outer = binary(&e);
        assert_eq!(outer.op, BinOp::Pow);
        // 2 ^ (3 ^ 2)
        assert!(matches!(*outer.lhs, Expr::Int(_)));
        assert_eq!(binary(&outer.rhs).op, BinOp::Pow);
    }

    #[test]
    fn test_unary_binds_tighter_than_power() {
        let e = expr("-2 ^ 2");
        // (-2) ^ 2
        let outer = binary(&e);
        assert_eq!(outer.op, BinOp::Pow);
        assert!(matches!(*outer.lhs, Expr::Unary(_)));
    }

    #[test]
    fn test_logical_precedence() {
        let e = expr("a || b && c == d");
        let outer = binary(&e);
        assert_eq!(outer.op, BinOp::Or);
        let and = binary(&outer.rhs);
        assert_eq!(and.op, BinOp::And);
        assert_eq!(binary(&and.rhs).op, BinOp::Eq);
    }

    #[test]
    fn test_parens_override_precedence() {
        let e = expr("(a + b) * c");
        let outer = binary(&e);
        assert_eq!(outer.op, BinOp::Mul);
        assert_eq!(binary(&outer.lhs).op, BinOp::Add);
    }

    #[test]
    fn test_attribute_chain_is_one_node() {
        let e = expr("c.to.hex");
        let Expr::Attr(chain) = e else {
            panic!("expected attribute chain");
        };
        let names: Vec<_> = chain.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["to", "hex"]);
        assert!(matches!(*chain.object, Expr::Ident(_)));
    }

    #[test]
    fn test_conversion_call_shape() {
        // c.to.hex() is a call whose callee is the chain c.to.hex
        let e = expr("c.to.hex()");
        let Expr::Call(call) = e else {
            panic!("expected call");
        };
        assert!(call.args.is_empty());
        let Expr::Attr(chain) = &*call.callee else {
            panic!("expected attribute callee");
        };
        assert_eq!(chain.attrs.len(), 2);
    }

    #[test]
    fn test_call_then_attribute() {
        let e = expr("rgb(255, 0, 0).r");
        let Expr::Attr(chain) = e else {
            panic!("expected attribute access");
        };
        assert!(matches!(*chain.object, Expr::Call(_)));
        assert_eq!(chain.attrs[0].name, "r");
    }

    #[test]
    fn test_call_arguments() {
        let e = expr("rgb(255, 128 + 1, 0)");
        let Expr::Call(call) = e else {
            panic!("expected call");
        };
        assert_eq!(call.args.len(), 3);
        assert!(matches!(call.args[1], Expr::Binary(_)));
    }

    #[test]
    fn test_index_postfix() {
        let e = expr("items[i + 1]");
        let Expr::Index(index) = e else {
            panic!("expected index");
        };
        assert!(matches!(*index.index, Expr::Binary(_)));
    }

    #[test]
    fn test_method_call_on_int_literal() {
        let e = expr("3.toString()");
        let Expr::Call(call) = e else {
            panic!("expected call");
        };
        let Expr::Attr(chain) = &*call.callee else {
            panic!("expected attribute callee");
        };
        assert!(matches!(*chain.object, Expr::Int(_)));
        assert_eq!(chain.attrs[0].name, "toString");
    }

    #[test]
    fn test_hex_literal_is_a_color_atom() {
        let e = expr("#ff0000");
        assert!(matches!(e, Expr::HexColor(_)));
    }

    #[test]
    fn test_reference_atom() {
        let e = expr("{spacing.base} * 2");
        let outer = binary(&e);
        assert!(matches!(*outer.lhs, Expr::Reference(_)));
    }

    #[test]
    fn test_implicit_list_in_return() {
        let e = expr("1px solid black");
        let Expr::ImplicitList(list) = e else {
            panic!("expected implicit list");
        };
        assert_eq!(list.items.len(), 3);
    }

    #[test]
    fn test_implicit_list_elements_keep_operator_grouping() {
        // "1px + 1px solid" juxtaposes the sum with the ident.
        let e = expr("1px + 1px solid");
        let Expr::ImplicitList(list) = e else {
            panic!("expected implicit list");
        };
        assert_eq!(list.items.len(), 2);
        assert!(matches!(list.items[0], Expr::Binary(_)));
    }

    #[test]
    fn test_comma_list_in_return() {
        let e = expr("1, 2, 3");
        let Expr::CommaList(list) = e else {
            panic!("expected comma list");
        };
        assert_eq!(list.items.len(), 3);
    }

    #[test]
    fn test_adjacency_inside_parens_is_an_error() {
        assert!(parse_source("return (1 2);").is_err());
    }

    #[test]
    fn test_unit_number_atom() {
        let e = expr("16px");
        let Expr::UnitNumber(lit) = e else {
            panic!("expected unit number");
        };
        assert_eq!(lit.unit, "px");
        assert!(lit.integral);
    }
}
