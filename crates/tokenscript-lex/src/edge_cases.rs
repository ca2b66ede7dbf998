//! Edge-case tests for the lexer: adjacency, boundary, and pathological
//! inputs that the main unit tests do not cover.

use crate::{Lexer, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::new(source)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn empty_source_yields_eof_only() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
    assert_eq!(kinds("   \t\n  "), vec![TokenKind::Eof]);
}

#[test]
fn comment_only_source_yields_eof_only() {
    assert_eq!(kinds("// nothing\n/* still nothing */"), vec![TokenKind::Eof]);
}

#[test]
fn adjacent_literals_do_not_merge() {
    // "1px solid" is three tokens; juxtaposition grouping is the parser's
    // business.
    assert_eq!(
        kinds("1px solid"),
        vec![
            TokenKind::UnitNumber {
                value: 1.0,
                integral: true,
                unit: "px".into()
            },
            TokenKind::Ident("solid".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn unit_suffix_stops_at_non_letter() {
    assert_eq!(
        kinds("10px+2"),
        vec![
            TokenKind::UnitNumber {
                value: 10.0,
                integral: true,
                unit: "px".into()
            },
            TokenKind::Plus,
            TokenKind::Int(2),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn percent_binds_tighter_than_modulus_when_adjacent() {
    assert_eq!(
        kinds("10% 3"),
        vec![
            TokenKind::UnitNumber {
                value: 10.0,
                integral: true,
                unit: "%".into()
            },
            TokenKind::Int(3),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn float_without_fraction_digits_is_attribute_access() {
    // "2." is Int(2) then Dot; only "2.5" is a float.
    assert_eq!(
        kinds("2."),
        vec![TokenKind::Int(2), TokenKind::Dot, TokenKind::Eof]
    );
}

#[test]
fn keywords_inside_identifiers_do_not_split() {
    assert_eq!(
        kinds("iffy variables return_value"),
        vec![
            TokenKind::Ident("iffy".into()),
            TokenKind::Ident("variables".into()),
            TokenKind::Ident("return_value".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn crlf_counts_a_single_line() {
    let tokens = Lexer::new("a\r\nb").tokenize().unwrap();
    assert_eq!(tokens[1].span.line, 2);
    assert_eq!(tokens[1].span.column, 1);
}

#[test]
fn reference_path_allows_dashes_and_digits() {
    assert_eq!(
        kinds("{color-primary.50}"),
        vec![
            TokenKind::Reference("color-primary.50".into()),
            TokenKind::Eof
        ]
    );
}

#[test]
fn hex_digits_beyond_eight_are_rejected() {
    assert!(Lexer::new("#aabbccddee").tokenize().is_err());
}

#[test]
fn block_comment_between_number_and_unit_separates_them() {
    assert_eq!(
        kinds("1/**/px"),
        vec![
            TokenKind::Int(1),
            TokenKind::Ident("px".into()),
            TokenKind::Eof
        ]
    );
}

mod property {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The lexer never panics: every input either tokenizes or
        /// reports a structured error.
        #[test]
        fn lexing_never_panics(source in ".{0,256}") {
            let _ = Lexer::new(&source).tokenize();
        }

        /// Integer literals round-trip through the token payload.
        #[test]
        fn integers_round_trip(value in 0i64..=i64::MAX) {
            let source = value.to_string();
            let tokens = Lexer::new(&source).tokenize().unwrap();
            prop_assert_eq!(&tokens[0].kind, &TokenKind::Int(value));
        }

        /// A digits+letters literal always lexes as a single unit token.
        #[test]
        fn unit_suffix_glues(value in 0u32..10_000u32, unit in "[a-z]{1,8}") {
            let source = format!("{value}{unit}");
            let tokens = Lexer::new(&source).tokenize().unwrap();
            prop_assert_eq!(
                &tokens[0].kind,
                &TokenKind::UnitNumber {
                    value: value as f64,
                    integral: true,
                    unit: unit.clone(),
                }
            );
        }
    }
}
