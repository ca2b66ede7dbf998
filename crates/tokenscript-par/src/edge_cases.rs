//! Edge-case tests for the parser: grammar corners and tie-breaks that
//! the per-module tests do not cover.

use crate::ast::{Expr, Stmt};
use crate::parse_source;

#[test]
fn nested_blocks_scope_statements() {
    let program = parse_source(
        "if (a) [ if (b) [ x = 1; ] else [ x = 2; ] ]",
    )
    .unwrap();
    let Stmt::If(outer) = &program[0] else {
        panic!("expected if");
    };
    assert!(matches!(outer.then_block.stmts[0], Stmt::If(_)));
}

#[test]
fn statement_after_block_needs_no_semicolon_between() {
    let program = parse_source("while (a) [ x = 1; ] return x;").unwrap();
    assert_eq!(program.len(), 2);
}

#[test]
fn semicolon_required_after_expression_statement() {
    assert!(parse_source("x + 1").is_err());
    assert!(parse_source("x + 1;").is_ok());
}

#[test]
fn empty_block_is_valid() {
    let program = parse_source("while (false) [ ]").unwrap();
    let Stmt::While(w) = &program[0] else {
        panic!("expected while");
    };
    assert!(w.body.stmts.is_empty());
}

#[test]
fn elif_without_if_is_an_error() {
    assert!(parse_source("elif (a) [ ]").is_err());
}

#[test]
fn else_block_must_be_bracketed() {
    assert!(parse_source("if (a) [ ] else x = 1;").is_err());
}

#[test]
fn reassign_chain_with_call_is_expression_not_assignment() {
    // "c.set(1) = 2" never matches the reassign lookahead because of the
    // parenthesis; it fails later, at '='.
    assert!(parse_source("c.set(1) = 2;").is_err());
}

#[test]
fn implicit_list_not_admitted_in_declarations() {
    assert!(parse_source("variable x: String = a b;").is_err());
}

#[test]
fn implicit_list_admitted_at_statement_top() {
    let program = parse_source("1px solid black;").unwrap();
    let Stmt::Expr(e) = &program[0] else {
        panic!("expected expression statement");
    };
    assert!(matches!(e.expr, Expr::ImplicitList(_)));
}

#[test]
fn comma_list_in_parens_is_a_list_literal() {
    let program = parse_source("return (1, 2, 3);").unwrap();
    let Stmt::Return(r) = &program[0] else {
        panic!("expected return");
    };
    assert!(matches!(r.value, Some(Expr::CommaList(_))));
}

#[test]
fn type_name_at_expression_position_is_an_error() {
    assert!(parse_source("return Number;").is_err());
}

#[test]
fn deeply_nested_parens_parse() {
    assert!(parse_source("return ((((1))));").is_ok());
}

#[test]
fn keywords_cannot_be_assignment_targets() {
    assert!(parse_source("return = 1;").is_err());
}

#[test]
fn index_of_index_chains() {
    let program = parse_source("return grid[0][1];").unwrap();
    let Stmt::Return(r) = &program[0] else {
        panic!("expected return");
    };
    let Some(Expr::Index(outer)) = &r.value else {
        panic!("expected index");
    };
    assert!(matches!(*outer.object, Expr::Index(_)));
}

#[test]
fn spans_point_at_source_lines() {
    let program = parse_source("x = 1;\ny = 2;").unwrap();
    assert_eq!(program[0].span().line, 1);
    assert_eq!(program[1].span().line, 2);
}

#[test]
fn null_literal_parses() {
    let program = parse_source("return null;").unwrap();
    let Stmt::Return(r) = &program[0] else {
        panic!("expected return");
    };
    assert!(matches!(r.value, Some(Expr::Null(_))));
}
