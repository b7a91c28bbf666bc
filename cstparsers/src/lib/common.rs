//! Rules shared by several of the bundled grammars.

use cstgrammar::{GrammarBuilder, rule::*};

/// The identifier pattern, which is also the word token of every bundled grammar.
pub(crate) const IDENTIFIER: &str = "[A-Za-z][A-Za-z0-9_]*";

/// A C-style `/* ... */` comment. Comments do not nest.
pub(crate) fn block_comment() -> Rule {
    token(pat(r"/\*[^*]*\*+([^/*][^*]*\*+)*/"))
}

/// A comment running from `start` to the end of the line.
pub(crate) fn line_comment(start: &str) -> Rule {
    token(seq(vec![lit(start), pat(".*")]))
}

/// The characters of a string up to the next `quote`, backslash or newline. Only valid directly
/// after the opening quote or a previous piece of the string; the precedence makes them win over
/// comments starting at the same place.
pub(crate) fn string_characters(quote: char) -> Rule {
    token_immediate(prec(1, pat(&format!("[^{}\\n\\\\]+", quote))))
}

/// Add the rules for the contents of double quoted strings with escape sequences:
/// `_string_content`, `string_characters` and `escape_sequence`. With `numeric`, octal and
/// hexadecimal escapes (`\101`, `\x41`, `\u0041` and `\U00000041`) are also recognised.
pub(crate) fn string_content(bld: GrammarBuilder, numeric: bool) -> GrammarBuilder {
    bld.rule(
        "_string_content",
        repeat1(field(
            "content",
            choice(vec![sym("string_characters"), sym("escape_sequence")]),
        )),
    )
    .rule("string_characters", string_characters('"'))
    .rule("escape_sequence", escape_sequence(numeric))
}

/// A backslash escape. With `numeric`, octal and hexadecimal escapes are included.
pub(crate) fn escape_sequence(numeric: bool) -> Rule {
    let simple = [
        ("\\'", "'"),
        ("\\\"", "\""),
        ("\\\\", "\\"),
        ("\\r", "\r"),
        ("\\n", "\n"),
        ("\\t", "\t"),
    ];
    let simple = field(
        "escape",
        choice(simple.iter().map(|(e, v)| alias(lit(e), v)).collect()),
    );
    if !numeric {
        return simple;
    }
    let escape = |prefix: &str, digits: &str, name: &str| {
        seq(vec![
            lit(prefix),
            field("escape", alias(token_immediate(pat(digits)), name)),
        ])
    };
    choice(vec![
        simple,
        escape("\\", "[0-7]{1,3}", "octal"),
        escape("\\x", "[0-9a-fA-F]{2}", "hexadecimal"),
        escape("\\u", "[0-9a-fA-F]{4}", "hexadecimal"),
        escape("\\U", "[0-9a-fA-F]{8}", "hexadecimal"),
    ])
}
