//! Essence Prime: declarations, constraints and objectives of constraint models.

use cstgrammar::{GrammarBuilder, rule::*};

use crate::common::{self, IDENTIFIER};

// Operator precedences, from tightest to loosest.
const ACCESS: i32 = 21;
const NOT: i32 = 20;
const ABSOLUTE: i32 = 20;
const POWER: i32 = 18;
const NEGATION: i32 = 15;
const MULTIPLICATIVE: i32 = 10;
const INTERSECT: i32 = 2;
const ADDITIVE: i32 = 1;
const UNION: i32 = 1;
const RANGE: i32 = 0;
const SET_IN: i32 = 0;
const COMPARATIVE: i32 = -1;
const CONJUNCTION: i32 = -2;
const DISJUNCTION: i32 = -3;
const IMPLICATION: i32 = -4;
const EQUIVALENCE: i32 = -5;
const QUANTIFIER: i32 = -10;

/// The most conflicts the tables may resolve by default. A comprehension's generators and
/// conditions are both comma separated, so after `[e | i : D, j` a `,` is ambiguous: it is taken
/// to continue a list of generator names.
const EXPECTED_CONFLICTS: usize = 2;

fn ops(ops: &[&str]) -> Rule {
    choice(ops.iter().map(|o| lit(o)).collect())
}

fn binary(left: &str, level: i32, right_assoc: bool, op: Rule, right: &str) -> Rule {
    let body = seq(vec![
        field("left", sym(left)),
        field("operator", op),
        field("right", sym(right)),
    ]);
    if right_assoc {
        prec_right(level, body)
    } else {
        prec_left(level, body)
    }
}

fn infix(level: i32, op: Rule) -> Rule {
    binary("_expression", level, false, op, "_expression")
}

pub fn grammar() -> GrammarBuilder {
    let bld = GrammarBuilder::new("eprime")
        .rule(
            "source_file",
            seq(vec![
                optional(field("lang_version", sym("lang_version"))),
                repeat(field(
                    "item",
                    choice(vec![
                        sym("param_decl"),
                        sym("const_def"),
                        sym("domain_alias"),
                        sym("decision_decl"),
                        sym("objective"),
                        sym("branching"),
                        sym("heuristic"),
                        sym("constraint"),
                        sym("output"),
                    ]),
                )),
            ]),
        )
        .rule(
            "lang_version",
            seq(vec![
                lit("language"),
                lit("ESSENCE"),
                token_immediate(choice(vec![lit("’"), lit("'")])),
                field("version", pat(r"[0-9]+\.[0-9]+")),
            ]),
        )
        .rule(
            "param_decl",
            seq(vec![
                lit("given"),
                sep_by(",", field("name", sym("identifier"))),
                lit(":"),
                field("domain", sym("_domain")),
                repeat(seq(vec![lit("where"), field("where", sym("_expression"))])),
            ]),
        )
        .rule(
            "const_def",
            seq(vec![
                lit("letting"),
                field("name", sym("identifier")),
                optional(seq(vec![lit(":"), field("domain", sym("_domain"))])),
                choice(vec![lit("="), lit("be")]),
                field("definition", sym("_expression")),
            ]),
        )
        .rule(
            "domain_alias",
            seq(vec![
                lit("letting"),
                field("name", sym("identifier")),
                lit("be"),
                lit("domain"),
                field("definition", sym("_domain")),
            ]),
        )
        .rule(
            "decision_decl",
            seq(vec![
                lit("find"),
                sep_by(",", field("name", sym("identifier"))),
                lit(":"),
                field("domain", sym("_domain")),
            ]),
        )
        .rule(
            "objective",
            seq(vec![
                field("strategy", ops(&["maximising", "minimising"])),
                field("objective_expr", sym("_expression")),
            ]),
        )
        .rule(
            "branching",
            seq(vec![
                lit("branching"),
                lit("on"),
                field("branching_array", sym("matrix_literal")),
            ]),
        )
        .rule(
            "constraint",
            seq(vec![
                lit("such"),
                lit("that"),
                sep_by1(",", field("expression", sym("_expression"))),
            ]),
        )
        .rule(
            "heuristic",
            seq(vec![
                lit("heuristic"),
                optional(field(
                    "heuristic",
                    ops(&["static", "sdf", "srf", "conflict"]),
                )),
            ]),
        )
        .rule(
            "output",
            seq(vec![lit("showing"), field("expression", sym("_expression"))]),
        )
        .rule(
            "_expression",
            choice(vec![
                sym("boolean_literal"),
                sym("integer_literal"),
                sym("string_literal"),
                sym("infinity"),
                sym("matrix_literal"),
                sym("call"),
                sym("identifier"),
                sym("indexed_access"),
                sym("infix_operator"),
                sym("prefix_operator"),
                sym("unary_set_constructor"),
                sym("quantification"),
                sym("matrix_comprehension"),
                sym("absolute_operator"),
                sym("parenthesised_expression"),
                sym("set_constructor"),
            ]),
        )
        .rule(
            "parenthesised_expression",
            seq(vec![
                lit("("),
                field("expression", sym("_expression")),
                lit(")"),
            ]),
        )
        .rule(
            "call",
            prec(
                ACCESS,
                seq(vec![
                    field("function", sym("identifier")),
                    lit("("),
                    sep_by(",", field("argument", sym("_expression"))),
                    lit(")"),
                ]),
            ),
        )
        .rule(
            "quantification",
            prec(
                QUANTIFIER,
                seq(vec![
                    field("function", sym("identifier")),
                    field("generator", sym("generator")),
                    lit("."),
                    field("template", sym("_expression")),
                ]),
            ),
        )
        .rule(
            "matrix_comprehension",
            seq(vec![
                lit("["),
                field("template", sym("_expression")),
                lit("|"),
                field("generator", sym("generator")),
                repeat(seq(vec![lit(","), field("generator", sym("generator"))])),
                repeat(seq(vec![lit(","), field("condition", sym("_expression"))])),
                optional(seq(vec![lit(";"), field("index", sym("_base_domain"))])),
                lit("]"),
            ]),
        )
        .rule(
            "generator",
            seq(vec![
                sep_by1(",", field("name", sym("identifier"))),
                lit(":"),
                field("collection", sym("_domain")),
            ]),
        )
        .rule(
            "indexed_access",
            prec(
                ACCESS,
                seq(vec![
                    field("collection", sym("_expression")),
                    lit("["),
                    sep_by1(
                        ",",
                        field("index", choice(vec![lit(".."), sym("_expression")])),
                    ),
                    lit("]"),
                ]),
            ),
        )
        .rule(
            "set_constructor",
            binary("_expression", RANGE, false, lit(".."), "_expression"),
        )
        .rule(
            "infix_operator",
            choice(vec![
                binary("_expression", POWER, true, lit("**"), "_expression"),
                infix(MULTIPLICATIVE, ops(&["*", "/", "%"])),
                infix(ADDITIVE, ops(&["+", "-"])),
                infix(
                    COMPARATIVE,
                    ops(&["=", "!=", "<", "<=", ">", ">=", "<lex", "<=lex", ">=lex", ">lex"]),
                ),
                infix(CONJUNCTION, lit("/\\")),
                infix(DISJUNCTION, lit("\\/")),
                infix(IMPLICATION, ops(&["->", "=>"])),
                infix(EQUIVALENCE, ops(&["<->", "<=>"])),
                infix(SET_IN, lit("in")),
            ]),
        )
        .rule(
            "absolute_operator",
            prec(
                ABSOLUTE,
                seq(vec![
                    lit("|"),
                    field("operand", sym("_expression")),
                    lit("|"),
                ]),
            ),
        )
        .rule(
            "prefix_operator",
            choice(vec![
                prec_left(
                    NOT,
                    seq(vec![
                        field("operator", lit("!")),
                        field("operand", sym("_expression")),
                    ]),
                ),
                prec_left(
                    NEGATION,
                    seq(vec![
                        field("operator", lit("-")),
                        field("operand", sym("_expression")),
                    ]),
                ),
            ]),
        )
        .rule(
            "unary_set_constructor",
            choice(vec![
                prec_left(
                    RANGE,
                    seq(vec![
                        field("operator", lit("..")),
                        field("operand", sym("_expression")),
                    ]),
                ),
                prec_right(
                    RANGE,
                    seq(vec![
                        field("operand", sym("_expression")),
                        field("operator", lit("..")),
                    ]),
                ),
            ]),
        )
        .rule(
            "_domain",
            choice(vec![sym("_base_domain"), sym("matrix_domain")]),
        )
        .rule(
            "matrix_domain",
            seq(vec![
                lit("matrix"),
                lit("indexed"),
                lit("by"),
                lit("["),
                sep_by1(",", field("index", sym("_base_domain"))),
                lit("]"),
                lit("of"),
                field("base", sym("_base_domain")),
            ]),
        )
        .rule(
            "_base_domain",
            choice(vec![
                sym("boolean_domain"),
                sym("integer_domain"),
                sym("any_domain"),
                sym("domain_operation"),
                sym("identifier"),
            ]),
        )
        .rule(
            "domain_operation",
            choice(vec![
                binary("_base_domain", INTERSECT, false, lit("intersect"), "_base_domain"),
                binary("_base_domain", UNION, false, lit("union"), "_base_domain"),
                binary("_base_domain", ADDITIVE, false, lit("-"), "_base_domain"),
            ]),
        )
        .rule("boolean_domain", lit("bool"))
        .rule(
            "integer_domain",
            seq(vec![
                lit("int"),
                optional(seq(vec![
                    lit("("),
                    sep_by(",", field("member", sym("_expression"))),
                    lit(")"),
                ])),
            ]),
        )
        .rule("any_domain", lit("any"))
        .rule(
            "matrix_literal",
            seq(vec![
                lit("["),
                sep_by(",", field("member", sym("_expression"))),
                optional(seq(vec![lit(";"), field("index", sym("_base_domain"))])),
                lit("]"),
            ]),
        )
        .rule("boolean_literal", choice(vec![lit("true"), lit("false")]))
        .rule("integer_literal", pat("[0-9]+"))
        .rule("infinity", choice(vec![lit("infinity"), lit("∞")]))
        .rule(
            "string_literal",
            seq(vec![lit("\""), optional(sym("_string_content")), lit("\"")]),
        )
        .rule("line_comment", common::line_comment("$"))
        .rule("identifier", pat(IDENTIFIER));
    common::string_content(bld, false)
        .extra(pat(r"\s"))
        .extra(sym("line_comment"))
        .word("identifier")
        .expected_conflicts(EXPECTED_CONFLICTS)
}

#[cfg(test)]
mod test {
    use crate::{eprime, parse};

    fn sexp(input: &str) -> String {
        let tree = parse(eprime(), input).unwrap();
        assert!(!tree.has_error(), "{}", tree.to_sexp(eprime()));
        tree.to_sexp(eprime())
    }

    /// The S-expression of the expression in `such that <input>`.
    fn expr(input: &str) -> String {
        let s = sexp(&format!("such that {}", input));
        let prefix = "(source_file item: (constraint expression: ";
        assert!(s.starts_with(prefix), "{}", s);
        s[prefix.len()..s.len() - 2].to_owned()
    }

    fn items(input: &str) -> Vec<String> {
        let tree = parse(eprime(), input).unwrap();
        assert!(!tree.has_error(), "{}", tree.to_sexp(eprime()));
        tree.root()
            .children_by_field_name(eprime(), "item")
            .map(|n| n.kind(eprime()).to_owned())
            .collect()
    }

    #[test]
    fn generator_names_win() {
        assert!(eprime().conflicts().len() <= super::EXPECTED_CONFLICTS);
        // `j` is read as a second generator name, so `, k` must be one too.
        let tree = parse(eprime(), "such that [i | i : D, j, k : D]").unwrap();
        assert!(!tree.has_error());
        let tree = parse(eprime(), "such that [i | i : D, j, k]").unwrap();
        assert!(tree.has_error());
    }

    #[test]
    fn model() {
        let input = "language ESSENCE' 1.3
$ a comment
given n : int(1..10)
letting S be domain int(1..n)
letting k : int = 2
find x, y : matrix indexed by [S] of bool
such that
    forAll i : S . x[i] -> y[i],
    sum([toInt(x[i]) | i : S]) >= k
minimising sum(y)
branching on [x]
heuristic sdf
showing x
";
        assert_eq!(
            items(input),
            vec![
                "param_decl",
                "domain_alias",
                "const_def",
                "decision_decl",
                "constraint",
                "objective",
                "branching",
                "heuristic",
                "output",
            ]
        );
        let tree = parse(eprime(), input).unwrap();
        assert_eq!(tree.text(input), input);
        let version = tree
            .root()
            .child_by_field_name(eprime(), "lang_version")
            .unwrap();
        assert_eq!(version.kind(eprime()), "lang_version");
    }

    #[test]
    fn precedence() {
        assert_eq!(
            expr("a + b * c ** d ** e"),
            "(infix_operator left: (identifier) right: (infix_operator left: (identifier) \
             right: (infix_operator left: (identifier) right: (infix_operator left: \
             (identifier) right: (identifier)))))"
        );
        assert_eq!(
            expr("!a /\\ -b < 3"),
            "(infix_operator left: (prefix_operator operand: (identifier)) right: \
             (infix_operator left: (prefix_operator operand: (identifier)) right: \
             (integer_literal)))"
        );
        assert_eq!(
            expr("|x[1, ..]| <=lex 2"),
            "(infix_operator left: (absolute_operator operand: (indexed_access collection: \
             (identifier) index: (integer_literal))) right: (integer_literal))"
        );
    }

    #[test]
    fn quantification_extends_right() {
        assert_eq!(
            expr("exists i, j : int(1..) . i = j /\\ true"),
            "(quantification function: (identifier) generator: (generator name: (identifier) \
             name: (identifier) collection: (integer_domain member: (unary_set_constructor \
             operand: (integer_literal)))) template: (infix_operator left: (infix_operator \
             left: (identifier) right: (identifier)) right: (boolean_literal)))"
        );
    }

    #[test]
    fn comprehension() {
        assert_eq!(
            expr("[i | i : int(1..3), i > 1; int(0..1)]"),
            "(matrix_comprehension template: (identifier) generator: (generator name: \
             (identifier) collection: (integer_domain member: (set_constructor left: \
             (integer_literal) right: (integer_literal)))) condition: (infix_operator left: \
             (identifier) right: (integer_literal)) index: (integer_domain member: \
             (set_constructor left: (integer_literal) right: (integer_literal))))"
        );
    }

    #[test]
    fn domains() {
        assert_eq!(
            sexp("given s : int(1, 3..5) union bool intersect any"),
            "(source_file item: (param_decl name: (identifier) domain: (domain_operation \
             left: (integer_domain member: (integer_literal) member: (set_constructor left: \
             (integer_literal) right: (integer_literal))) right: (domain_operation left: \
             (boolean_domain) right: (any_domain)))))"
        );
    }
}
