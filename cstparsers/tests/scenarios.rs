//! End-to-end parses of a small grammar: built from rules, lexed with the DFA lexer and parsed
//! with the default recovery.

use cstgrammar::{GrammarBuilder, Span, rule::*};
use cstlex::DfaLexer;
use cstpar::{ParseRepair, ParserBuilder, Tree};
use csttable::{Language, LanguageBuilder};

fn sums() -> Language {
    let grm = GrammarBuilder::new("sums")
        .rule(
            "source_file",
            sep_by(";", field("item", sym("_expression"))),
        )
        .rule(
            "_expression",
            choice(vec![sym("identifier"), sym("binary")]),
        )
        .rule(
            "binary",
            prec_left(
                1,
                seq(vec![
                    field("left", sym("_expression")),
                    field("operator", lit("+")),
                    field("right", sym("_expression")),
                ]),
            ),
        )
        .rule("line_comment", token(seq(vec![lit("%"), pat(".*")])))
        .rule("identifier", pat("[a-z]+"))
        .extra(pat(r"\s"))
        .extra(sym("line_comment"))
        .build()
        .unwrap();
    LanguageBuilder::new(grm).build().unwrap()
}

fn parse(lang: &Language, input: &str) -> Tree {
    ParserBuilder::new(lang)
        .parse(&DfaLexer::new(lang, input), None)
        .unwrap()
}

fn text(input: &str, sp: Span) -> &str {
    &input[sp.start()..sp.end()]
}

#[test]
fn binary_fields() {
    let lang = sums();
    let input = "a + b";
    let tree = parse(&lang, input);
    assert!(!tree.has_error());
    assert_eq!(
        tree.to_sexp(&lang),
        "(source_file item: (binary left: (identifier) right: (identifier)))"
    );
    let bin = tree.root().child_by_field_name(&lang, "item").unwrap();
    assert_eq!(bin.kind(&lang), "binary");
    let left = bin.child_by_field_name(&lang, "left").unwrap();
    assert_eq!(text(input, left.span()), "a");
    let op = bin.child_by_field_name(&lang, "operator").unwrap();
    assert_eq!(op.kind(&lang), "+");
    assert!(!op.is_named(&lang));
    let right = bin.child_by_field_name(&lang, "right").unwrap();
    assert_eq!(text(input, right.span()), "b");
    assert_eq!(right.full_span(), Span::new(3, 5));
}

#[test]
fn left_associative() {
    let lang = sums();
    let tree = parse(&lang, "a + b + c");
    assert_eq!(
        tree.to_sexp(&lang),
        "(source_file item: (binary left: (binary left: (identifier) right: (identifier)) \
         right: (identifier)))"
    );
}

#[test]
fn missing_operand() {
    let lang = sums();
    let input = "a + ";
    let tree = parse(&lang, input);
    assert!(tree.has_error());
    assert_eq!(
        tree.to_sexp(&lang),
        "(source_file item: (binary left: (identifier) right: (MISSING identifier)))"
    );
    let bin = tree.root().child_by_field_name(&lang, "item").unwrap();
    assert!(bin.child_by_field_name(&lang, "operator").is_some());
    let right = bin.child_by_field_name(&lang, "right").unwrap();
    assert!(right.is_missing());
    assert!(right.span().is_empty());

    assert_eq!(tree.errors().len(), 1);
    let ident = lang.symbol_for_name("identifier", true).unwrap();
    assert_eq!(tree.errors()[0].repair(), Some(ParseRepair::Insert(ident)));
    assert_eq!(tree.text(input), input);
}

#[test]
fn comments_between_items() {
    let lang = sums();
    let input = "a; % comment\nb;";
    let tree = parse(&lang, input);
    assert!(!tree.has_error());
    assert_eq!(
        tree.to_sexp(&lang),
        "(source_file item: (identifier) (line_comment) item: (identifier))"
    );
    let root = tree.root();
    assert_eq!(root.children_by_field_name(&lang, "item").count(), 2);
    let comments = root
        .children()
        .iter()
        .filter(|n| n.is_extra())
        .collect::<Vec<_>>();
    assert_eq!(comments.len(), 1);
    assert_eq!(text(input, comments[0].span()), "% comment");
    assert_eq!(tree.text(input), input);
}

#[test]
fn unrecognised_character() {
    let lang = sums();
    let input = "a + @b";
    let tree = parse(&lang, input);
    assert!(tree.has_error());
    assert_eq!(tree.errors().len(), 1);
    assert_eq!(tree.errors()[0].span(), Span::new(4, 5));
    assert_eq!(tree.text(input), input);
}

#[test]
fn empty_input() {
    let lang = sums();
    let tree = parse(&lang, "  ");
    assert!(!tree.has_error());
    assert_eq!(tree.to_sexp(&lang), "(source_file)");
    assert_eq!(tree.trailing_padding(), Span::new(0, 2));
    assert_eq!(tree.text("  "), "  ");
}
