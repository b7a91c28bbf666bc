//! MiniZinc: assignment items whose right hand sides are expressions over MiniZinc's operators
//! and literals.

use cstgrammar::{GrammarBuilder, rule::*};

use crate::common::{self, IDENTIFIER};

// Binary operators, loosest first. Equivalence shares a level with disjunction, and implication
// with exclusive or.
const EQUIVALENCE: i32 = 1;
const OR: i32 = 1;
const IMPLICATION: i32 = 2;
const XOR: i32 = 2;
const AND: i32 = 3;
const COMPARATIVE: i32 = 4;
const UNION: i32 = 5;
const DIFF: i32 = 6;
const SYMDIFF: i32 = 7;
const RANGE: i32 = 8;
const INTERSECT: i32 = 9;
const ADDITIVE: i32 = 10;
const MULTIPLICATIVE: i32 = 11;
const EXPONENT: i32 = 12;
const ANNOTATION: i32 = 13;
const UNARY: i32 = 14;

fn ops(ops: &[&str]) -> Rule {
    choice(ops.iter().map(|o| lit(o)).collect())
}

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

pub fn grammar() -> GrammarBuilder {
    let bld = GrammarBuilder::new("minizinc")
        .rule("source_file", sep_by(";", field("item", sym("assignment"))))
        .rule(
            "assignment",
            seq(vec![
                field("name", sym("identifier")),
                lit("="),
                field("definition", sym("_expression")),
            ]),
        )
        .rule(
            "_expression",
            choice(vec![
                sym("identifier"),
                sym("_literal"),
                sym("unary_operator"),
                sym("infix_operator"),
                seq(vec![lit("("), sym("_expression"), lit(")")]),
            ]),
        )
        .rule(
            "infix_operator",
            choice(vec![
                infix(EQUIVALENCE, lit("<->")),
                infix(IMPLICATION, ops(&["->", "<-"])),
                infix(OR, lit("\\/")),
                infix(XOR, lit("xor")),
                infix(AND, lit("/\\")),
                infix(
                    COMPARATIVE,
                    ops(&[
                        "=", "==", "!=", "<", "<=", ">", ">=", "in", "subset", "superset",
                    ]),
                ),
                infix(UNION, lit("union")),
                infix(DIFF, lit("diff")),
                infix(SYMDIFF, lit("symdiff")),
                infix(INTERSECT, lit("intersect")),
                infix(RANGE, lit("..")),
                infix(ADDITIVE, ops(&["+", "-", "++"])),
                infix(MULTIPLICATIVE, ops(&["*", "/", "div", "mod"])),
                infix(EXPONENT, lit("^")),
                infix(ANNOTATION, lit("::")),
            ]),
        )
        .rule(
            "unary_operator",
            prec(
                UNARY,
                seq(vec![
                    field("operator", ops(&["-", "not", "¬"])),
                    field("operand", sym("_expression")),
                ]),
            ),
        )
        .rule(
            "_literal",
            choice(vec![
                sym("absent"),
                sym("array_literal"),
                sym("boolean_literal"),
                sym("float_literal"),
                sym("integer_literal"),
                sym("set_literal"),
                sym("string_literal"),
            ]),
        )
        .rule("absent", lit("<>"))
        .rule(
            "array_literal",
            seq(vec![
                lit("["),
                sep_by(",", field("member", sym("_expression"))),
                lit("]"),
            ]),
        )
        .rule("boolean_literal", choice(vec![lit("true"), lit("false")]))
        .rule(
            "float_literal",
            token(choice(vec![
                pat(r"[0-9]+\.[0-9]+"),
                pat(r"[0-9]+(\.[0-9]+)?[Ee][-+]?[0-9]+"),
            ])),
        )
        .rule(
            "integer_literal",
            token(choice(vec![
                pat("[0-9]+"),
                pat("0x[0-9A-Fa-f]+"),
                pat("0b[01]+"),
                pat("0o[0-7]+"),
            ])),
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
            "string_literal",
            seq(vec![lit("\""), optional(sym("_string_content")), lit("\"")]),
        )
        .rule("line_comment", common::line_comment("%"))
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
    use crate::{minizinc, parse};

    fn definition(input: &str) -> String {
        let tree = parse(minizinc(), &format!("x = {};", input)).unwrap();
        let s = tree.to_sexp(minizinc());
        assert!(!tree.has_error(), "{}", s);
        let prefix = "(source_file item: (assignment name: (identifier) definition: ";
        assert!(s.starts_with(prefix), "{}", s);
        s[prefix.len()..s.len() - 2].to_owned()
    }

    /// `a op b` nested to the left, as `(a op b) op c`.
    const LEFT: &str = "(infix_operator left: (infix_operator left: (identifier) right: \
                        (identifier)) right: (identifier))";
    /// `a op b` nested to the right, as `a op (b op c)`.
    const RIGHT: &str = "(infix_operator left: (identifier) right: (infix_operator left: \
                         (identifier) right: (identifier)))";

    #[test]
    fn builds_without_conflicts() {
        assert!(minizinc().conflicts().is_empty());
    }

    #[test]
    fn precedence() {
        assert_eq!(definition("a + b * c"), RIGHT);
        assert_eq!(definition("a * b + c"), LEFT);
        assert_eq!(definition("a \\/ b /\\ c"), RIGHT);
        assert_eq!(definition("a <-> b -> c"), RIGHT);
        assert_eq!(definition("a = b union c"), RIGHT);
        assert_eq!(definition("a union b .. c"), RIGHT);
        assert_eq!(definition("a .. b intersect c"), RIGHT);
        assert_eq!(definition("a ^ b :: c"), RIGHT);
        assert_eq!(definition("(a + b) * c"), LEFT);
    }

    #[test]
    fn associativity() {
        assert_eq!(definition("a - b - c"), LEFT);
        assert_eq!(definition("a ++ b + c"), LEFT);
        assert_eq!(definition("a <-> b \\/ c"), LEFT);
        assert_eq!(definition("a -> b xor c"), LEFT);
        assert_eq!(definition("a diff b diff c"), LEFT);
    }

    #[test]
    fn unary() {
        assert_eq!(
            definition("-a ^ b"),
            "(infix_operator left: (unary_operator operand: (identifier)) right: (identifier))"
        );
        assert_eq!(
            definition("not a /\\ ¬b"),
            "(infix_operator left: (unary_operator operand: (identifier)) right: \
             (unary_operator operand: (identifier)))"
        );
        assert_eq!(
            definition("a - -b"),
            "(infix_operator left: (identifier) right: (unary_operator operand: (identifier)))"
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            definition("[1, 0x1F, 2.5, 1.5e-3, <>, true, \"s\\n\"]"),
            "(array_literal member: (integer_literal) member: (integer_literal) member: \
             (float_literal) member: (float_literal) member: (absent) member: \
             (boolean_literal) member: (string_literal content: (string_characters) \
             content: (escape_sequence)))"
        );
        assert_eq!(definition("{}"), "(set_literal)");
        assert_eq!(
            definition("1..3"),
            "(infix_operator left: (integer_literal) right: (integer_literal))"
        );
        assert_eq!(
            definition("{a, b,}"),
            "(set_literal member: (identifier) member: (identifier))"
        );
    }

    #[test]
    fn items() {
        let input = "a = 1; % one\nb = a in {1} /* two */;\nc = a != b";
        let tree = parse(minizinc(), input).unwrap();
        assert!(!tree.has_error());
        assert_eq!(tree.text(input), input);
        assert_eq!(
            tree.root()
                .children_by_field_name(minizinc(), "item")
                .count(),
            3
        );
    }
}
