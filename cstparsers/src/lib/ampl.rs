//! AMPL: indexing expressions and `let` statements over AMPL's expression language.

use cstgrammar::{GrammarBuilder, rule::*};

use crate::common::{self, IDENTIFIER};

const IF_THEN_ELSE: i32 = 1;
const NEGATION: i32 = 7;
const ADDITIVE: i32 = 12;
const MULTIPLICATIVE: i32 = 14;
const UNARY: i32 = 15;

fn ops(ops: &[&str]) -> Rule {
    choice(ops.iter().map(|o| lit(o)).collect())
}

fn infix(level: i32, op: Rule) -> Rule {
    prec_left(
        level,
        seq(vec![
            field("left", sym("_expr")),
            field("operator", op),
            field("right", sym("_expr")),
        ]),
    )
}

fn unary(level: i32, op: Rule) -> Rule {
    prec(
        level,
        seq(vec![field("operator", op), field("operand", sym("_expr"))]),
    )
}

pub fn grammar() -> GrammarBuilder {
    let bld = GrammarBuilder::new("ampl")
        .rule("source_file", sep_by(";", field("item", sym("_item"))))
        .rule("_item", choice(vec![sym("indexing"), sym("let_decl")]))
        .rule(
            "indexing",
            seq(vec![
                lit("{"),
                sym("_sexpr_list"),
                optional(seq(vec![lit(":"), sym("_expr")])),
                lit("}"),
            ]),
        )
        .rule("_sexpr_list", sep_by1(",", sym("_expr")))
        .rule(
            "_expr",
            choice(vec![
                sym("boolean_literal"),
                sym("string_literal"),
                sym("number_literal"),
                sym("identifier"),
                sym("infix_operator"),
                sym("unary_operator"),
                sym("if_then_else"),
                sym("indexing"),
                seq(vec![lit("("), sym("_expr"), lit(")")]),
            ]),
        )
        .rule(
            "unary_operator",
            choice(vec![
                unary(UNARY, ops(&["+", "-"])),
                unary(NEGATION, ops(&["not", "!"])),
            ]),
        )
        .rule(
            "infix_operator",
            choice(vec![
                infix(ADDITIVE, ops(&["+", "-", "less"])),
                infix(MULTIPLICATIVE, ops(&["*", "/", "mod", "div"])),
            ]),
        )
        .rule(
            "let_decl",
            seq(vec![
                lit("let"),
                optional(field("indexing", sym("indexing"))),
                field("name", sym("identifier")),
                lit(":="),
                sym("_expr"),
            ]),
        )
        .rule(
            "if_then_else",
            prec_right(
                IF_THEN_ELSE,
                seq(vec![
                    lit("if"),
                    field("condition", sym("_expr")),
                    lit("then"),
                    field("result", sym("_expr")),
                    optional(seq(vec![lit("else"), field("else", sym("_expr"))])),
                ]),
            ),
        )
        .rule(
            "number_literal",
            pat(r"[0-9]+(\.[0-9]+)?([dDeE]-?[0-9]+)?"),
        )
        .rule("boolean_literal", choice(vec![lit("true"), lit("false")]))
        .rule(
            "string_literal",
            choice(vec![
                seq(vec![lit("'"), optional(sym("_single_quoted_content")), lit("'")]),
                seq(vec![lit("\""), optional(sym("_string_content")), lit("\"")]),
            ]),
        )
        .rule(
            "_single_quoted_content",
            repeat1(field(
                "content",
                choice(vec![
                    alias_named(sym("_single_quoted_characters"), "string_characters"),
                    alias_named(sym("_single_quoted_escape"), "escape_sequence"),
                ]),
            )),
        )
        .rule(
            "_single_quoted_characters",
            common::string_characters('\''),
        )
        // A copy of `escape_sequence`, so that the states after an escape only expect the
        // characters of the string being lexed.
        .rule("_single_quoted_escape", common::escape_sequence(true))
        .rule("line_comment", common::line_comment("#"))
        .rule("block_comment", common::block_comment())
        .rule("identifier", pat(IDENTIFIER));
    common::string_content(bld, true)
        .extra(pat(r"\s"))
        .extra(sym("line_comment"))
        .extra(sym("block_comment"))
        .word("identifier")
}

#[cfg(test)]
mod test {
    use crate::{ampl, parse};

    fn sexp(input: &str) -> String {
        let tree = parse(ampl(), input).unwrap();
        assert!(!tree.has_error(), "{}", tree.to_sexp(ampl()));
        tree.to_sexp(ampl())
    }

    #[test]
    fn builds_without_conflicts() {
        assert!(ampl().conflicts().is_empty());
    }

    #[test]
    fn precedence() {
        assert_eq!(
            sexp("{a + b * c - d}"),
            "(source_file item: (indexing (infix_operator left: (infix_operator left: \
             (identifier) right: (infix_operator left: (identifier) right: (identifier))) \
             right: (identifier))))"
        );
    }

    #[test]
    fn unary_and_if() {
        assert_eq!(
            sexp("let x := if not a then -b else c"),
            "(source_file item: (let_decl name: (identifier) (if_then_else condition: \
             (unary_operator operand: (identifier)) result: (unary_operator operand: \
             (identifier)) else: (identifier))))"
        );
    }

    #[test]
    fn dangling_else() {
        assert_eq!(
            sexp("let x := if a then if b then c else d"),
            "(source_file item: (let_decl name: (identifier) (if_then_else condition: \
             (identifier) result: (if_then_else condition: (identifier) result: (identifier) \
             else: (identifier)))))"
        );
    }

    #[test]
    fn strings() {
        let chars = "content: (string_characters)";
        let escape = "content: (escape_sequence)";
        assert_eq!(
            sexp(r#"{'it\'s', "a\tb\x41 # not a comment"}"#),
            format!(
                "(source_file item: (indexing (string_literal {chars} {escape} {chars}) \
                 (string_literal {chars} {escape} {chars} {escape} {chars})))"
            )
        );
        assert_eq!(
            sexp(r#"{"", ''}"#),
            "(source_file item: (indexing (string_literal) (string_literal)))"
        );
    }

    #[test]
    fn text_after_escapes() {
        let string = |content: &str| {
            format!("(source_file item: (indexing (string_literal {})))", content)
        };
        let chars = "content: (string_characters)";
        let escape = "content: (escape_sequence)";
        assert_eq!(
            sexp(r#"{"a\tb"}"#),
            string(&format!("{chars} {escape} {chars}"))
        );
        assert_eq!(
            sexp(r#"{"a\x41 b"}"#),
            string(&format!("{chars} {escape} {chars}"))
        );
        assert_eq!(
            sexp(r#"{'a\'b'}"#),
            string(&format!("{chars} {escape} {chars}"))
        );
        assert_eq!(
            sexp(r#"{'a\nb'}"#),
            string(&format!("{chars} {escape} {chars}"))
        );
        // Each quote is an ordinary character inside the other kind of string.
        assert_eq!(
            sexp(r#"{'\t"', "\t'"}"#),
            format!(
                "(source_file item: (indexing (string_literal {escape} {chars}) \
                 (string_literal {escape} {chars})))"
            )
        );
    }

    #[test]
    fn items_and_comments() {
        let input = "let {i} n := 1.5e3; # first\n{a, b,: c} /* two\nlines */;";
        let tree = parse(ampl(), input).unwrap();
        assert!(!tree.has_error());
        assert_eq!(tree.text(input), input);
        assert_eq!(
            tree.root().children_by_field_name(ampl(), "item").count(),
            2
        );
        assert_eq!(
            tree.root()
                .children()
                .iter()
                .filter(|n| n.is_extra())
                .count(),
            2
        );
    }
}
