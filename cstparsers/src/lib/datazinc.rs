//! DataZinc: the assignments of MiniZinc data files, whose right hand sides are literals, calls
//! and a few set and array operators.

use cstgrammar::{GrammarBuilder, rule::*};

use crate::common::{self, IDENTIFIER};

const UNION: i32 = 7;
const RANGE: i32 = 10;
const CONCATENATION: i32 = 12;

fn infix(level: i32, op: Rule) -> Rule {
    prec_left(
        level,
        seq(vec![
            field("left", sym("_expression")),
            field("operator", op),
            field("right", sym("_expression")),
        ]),
    )
}

/// A numeric token, which may be negative.
fn signed(r: Rule) -> Rule {
    token(seq(vec![optional(lit("-")), r]))
}

pub fn grammar() -> GrammarBuilder {
    let bld = GrammarBuilder::new("datazinc")
        .rule("source_file", sep_by(";", field("item", sym("assignment"))))
        .rule(
            "assignment",
            seq(vec![
                field("name", sym("_identifier")),
                lit("="),
                field("definition", sym("_expression")),
            ]),
        )
        .rule(
            "_expression",
            choice(vec![
                sym("_identifier"),
                sym("absent"),
                sym("array_literal_2d"),
                sym("array_literal"),
                sym("boolean_literal"),
                sym("call"),
                sym("float_literal"),
                sym("infinity"),
                sym("infix_operator"),
                sym("integer_literal"),
                sym("record_literal"),
                sym("set_literal"),
                sym("string_literal"),
                sym("tuple_literal"),
            ]),
        )
        .rule(
            "call",
            seq(vec![
                field("function", sym("_identifier")),
                lit("("),
                sep_by(",", field("argument", sym("_call_arg"))),
                lit(")"),
            ]),
        )
        .rule(
            "_call_arg",
            choice(vec![
                sym("_identifier"),
                sym("call"),
                sym("infix_operator"),
                sym("integer_literal"),
                sym("set_literal"),
            ]),
        )
        .rule(
            "infix_operator",
            choice(vec![
                infix(RANGE, lit("..")),
                infix(CONCATENATION, lit("++")),
                infix(UNION, choice(vec![lit("union"), lit("∪")])),
            ]),
        )
        .rule(
            "array_literal",
            seq(vec![
                lit("["),
                sep_by(",", field("member", sym("array_literal_member"))),
                lit("]"),
            ]),
        )
        .rule(
            "array_literal_member",
            seq(vec![
                optional(seq(vec![field("index", sym("_expression")), lit(":")])),
                field("value", sym("_expression")),
            ]),
        )
        .rule(
            "array_literal_2d",
            seq(vec![
                lit("[|"),
                sep_by("|", field("row", sym("array_literal_2d_row"))),
                lit("|]"),
            ]),
        )
        .rule(
            "array_literal_2d_row",
            seq(vec![
                optional(seq(vec![field("index", sym("_expression")), lit(":")])),
                sep_by1(",", field("member", sym("_expression"))),
            ]),
        )
        .rule(
            "set_literal",
            seq(vec![
                lit("{"),
                sep_by(",", field("member", sym("_expression"))),
                lit("}"),
            ]),
        )
        .rule(
            "tuple_literal",
            seq(vec![
                lit("("),
                field("member", sym("_expression")),
                lit(","),
                sep_by(",", field("member", sym("_expression"))),
                lit(")"),
            ]),
        )
        .rule(
            "record_literal",
            seq(vec![
                lit("("),
                sep_by1(",", field("member", sym("record_member"))),
                lit(")"),
            ]),
        )
        .rule(
            "record_member",
            seq(vec![
                field("name", sym("_identifier")),
                lit(":"),
                field("value", sym("_expression")),
            ]),
        )
        .rule(
            "_identifier",
            choice(vec![sym("identifier"), sym("quoted_identifier")]),
        )
        .rule("absent", lit("<>"))
        .rule("boolean_literal", choice(vec![lit("true"), lit("false")]))
        .rule(
            "float_literal",
            signed(choice(vec![
                pat(r"[0-9]+\.[0-9]+"),
                pat(r"[0-9]+(\.[0-9]+)?[Ee][-+]?[0-9]+"),
            ])),
        )
        .rule(
            "integer_literal",
            signed(choice(vec![
                pat("[0-9]+"),
                pat("0x[0-9A-Fa-f]+"),
                pat("0b[01]+"),
                pat("0o[0-7]+"),
            ])),
        )
        // Outranks the identifier, which also matches `infinity`.
        .rule(
            "infinity",
            token(prec(
                1,
                seq(vec![
                    optional(lit("-")),
                    choice(vec![lit("infinity"), lit("∞")]),
                ]),
            )),
        )
        .rule(
            "string_literal",
            seq(vec![lit("\""), optional(sym("_string_content")), lit("\"")]),
        )
        .rule("quoted_identifier", pat("'[^'\n]*'"))
        .rule("line_comment", common::line_comment("%"))
        .rule("block_comment", common::block_comment())
        .rule("identifier", pat(IDENTIFIER));
    common::string_content(bld, true)
        .extra(pat(r"\s"))
        .extra(sym("line_comment"))
        .extra(sym("block_comment"))
        .word("identifier")
}
