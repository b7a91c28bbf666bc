use cstgrammar::{GrammarBuilder, Span, rule::*};
use csttable::{Language, LanguageBuilder, LexMode, SymbolId};

use crate::{LexError, Lexeme, Lexer, ParserBuilder, RecoveryKind, Tree};

/// SmallLexer is our highly simplified lexer (allowing us to avoid having to have cstlex as a
/// dependency of cstpar). It ignores lexer modes and recognises:
///   * words of ASCII letters and digits, as the anonymous token of that name if there is one
///     and `identifier` otherwise;
///   * `#` line comments, as `comment`;
///   * single characters, as the anonymous token of that name.
pub(crate) struct SmallLexer<'a> {
    lang: &'a Language,
    input: &'a str,
}

impl<'a> SmallLexer<'a> {
    pub(crate) fn new(lang: &'a Language, input: &'a str) -> Self {
        SmallLexer { lang, input }
    }
}

impl Lexer for SmallLexer<'_> {
    fn lex(&self, pos: usize, _: LexMode) -> Result<Lexeme, LexError> {
        let rest = &self.input[pos..];
        let start = pos + rest.len() - rest.trim_start().len();
        let r = &self.input[start..];
        let tok = |name: &str, named: bool| self.lang.symbol_for_name(name, named);
        let Some(c) = r.chars().next() else {
            return Ok(Lexeme::new(SymbolId::END, pos, Span::empty_at(start)));
        };
        let (sym, len) = if c.is_ascii_alphabetic() {
            let len = r
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(r.len());
            (
                tok(&r[..len], false).or_else(|| tok("identifier", true)),
                len,
            )
        } else if c == '#' {
            (tok("comment", true), r.find('\n').unwrap_or(r.len()))
        } else {
            (tok(&r[..c.len_utf8()], false), c.len_utf8())
        };
        match sym {
            Some(s) => Ok(Lexeme::new(s, pos, Span::new(start, start + len))),
            None => Err(LexError::UnrecognizedCharacter {
                offset: start,
                ch: c,
            }),
        }
    }
}

/// A small expression language with calls, comments and a left-associative `+`.
pub(crate) fn calls() -> GrammarBuilder {
    GrammarBuilder::new("calls")
        .rule(
            "source_file",
            repeat(seq(vec![sym("_expression"), lit(";")])),
        )
        .rule(
            "_expression",
            choice(vec![sym("identifier"), sym("binary"), sym("call")]),
        )
        .rule(
            "binary",
            prec_left(
                1,
                seq(vec![
                    field("left", sym("_expression")),
                    lit("+"),
                    field("right", sym("_expression")),
                ]),
            ),
        )
        .rule(
            "call",
            seq(vec![field("function", sym("identifier")), lit("("), lit(")")]),
        )
        .rule("identifier", pat("[a-z]+"))
        .rule("comment", token(seq(vec![lit("#"), pat(".*")])))
        .extra(pat(r"\s"))
        .extra(sym("comment"))
}

pub(crate) fn do_parse(grm: GrammarBuilder, rk: RecoveryKind, input: &str) -> (Language, Tree) {
    let lang = LanguageBuilder::new(grm.build().unwrap()).build().unwrap();
    let tree = ParserBuilder::new(&lang)
        .recovery(rk)
        .parse(&SmallLexer::new(&lang, input), None)
        .unwrap();
    (lang, tree)
}
