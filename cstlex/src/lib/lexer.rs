use cstgrammar::Span;
use cstpar::{LexError, Lexeme, Lexer, NonStreamingLexer};
use csttable::{Language, LexAccept, LexMode, SymbolId};

/// A lexer which runs a [Language]'s DFA over an input string. Lexing is on demand: each call to
/// [Lexer::lex] produces one token, so the parser can choose the lexer mode per token.
pub struct DfaLexer<'lang, 'input> {
    lang: &'lang Language,
    s: &'input str,
    /// The byte offset of the start of each line after the first.
    newlines: Vec<usize>,
}

impl<'lang, 'input> DfaLexer<'lang, 'input> {
    pub fn new(lang: &'lang Language, s: &'input str) -> Self {
        let newlines = s
            .char_indices()
            .filter(|&(_, c)| c == '\n')
            .map(|(i, _)| i + 1)
            .collect();
        DfaLexer { lang, s, newlines }
    }

    pub fn language(&self) -> &'lang Language {
        self.lang
    }

    pub fn input(&self) -> &'input str {
        self.s
    }

    /// Lex the whole input in the error state's mode (i.e. allowing every token), up to but
    /// excluding the end of input. Unrecognised characters are reported and skipped.
    pub fn tokens(&self) -> Vec<Result<Lexeme, LexError>> {
        let mode = self.lang.lex_mode(csttable::StateId::ERROR);
        let mut toks = Vec::new();
        let mut pos = 0;
        loop {
            match self.lex(pos, mode) {
                Ok(l) if l.symbol() == SymbolId::END => break,
                Ok(l) => {
                    pos = l.span().end();
                    toks.push(Ok(l));
                }
                Err(e) => {
                    pos = e.span().end();
                    toks.push(Err(e));
                }
            }
        }
        toks
    }

    /// If `sym` is the keyword capture token and the keyword DFA matches all of `span`, return
    /// the keyword instead.
    fn keyword(&self, sym: SymbolId, span: Span) -> SymbolId {
        if self.lang.keyword_capture_token() != Some(sym) {
            return sym;
        }
        match self
            .lang
            .keyword_lex_table()
            .and_then(|kt| kt.full_match(0, &self.s[span.start()..span.end()]))
        {
            Some(LexAccept::Token(k)) => k,
            _ => sym,
        }
    }

    fn line_start(&self, i: usize) -> usize {
        match self.newlines.partition_point(|&n| n <= i) {
            0 => 0,
            k => self.newlines[k - 1],
        }
    }

    /// The offset of the end of the line containing `i`, excluding its newline.
    fn line_end(&self, i: usize) -> usize {
        match self.newlines.get(self.newlines.partition_point(|&n| n <= i)) {
            Some(&n) => n - 1,
            None => self.s.len(),
        }
    }

    fn check_span(&self, span: Span) {
        if span.end() > self.s.len() {
            panic!(
                "Span {:?} exceeds known input length {}",
                span,
                self.s.len()
            );
        }
    }
}

impl Lexer for DfaLexer<'_, '_> {
    fn lex(&self, pos: usize, mode: LexMode) -> Result<Lexeme, LexError> {
        let table = self.lang.lex_table();
        let mut start = pos;
        let mut entry = mode.lex_state;
        loop {
            let rest = &self.s[start..];
            let Some(ch) = rest.chars().next() else {
                return Ok(Lexeme::new(SymbolId::END, pos, Span::empty_at(start)));
            };
            match table.longest_match(entry, rest) {
                Some((LexAccept::Separator, n)) if n > 0 => {
                    start += n;
                    entry = mode.lex_state_after_padding;
                }
                Some((LexAccept::Token(sym), n)) if n > 0 => {
                    let span = Span::new(start, start + n);
                    return Ok(Lexeme::new(self.keyword(sym, span), pos, span));
                }
                _ => return Err(LexError::UnrecognizedCharacter { offset: start, ch }),
            }
        }
    }
}

impl<'input> NonStreamingLexer<'input> for DfaLexer<'_, 'input> {
    fn span_str(&self, span: Span) -> &'input str {
        self.check_span(span);
        &self.s[span.start()..span.end()]
    }

    fn span_lines_str(&self, span: Span) -> &'input str {
        self.check_span(span);
        &self.s[self.line_start(span.start())..self.line_end(span.end())]
    }

    fn line_col(&self, span: Span) -> ((usize, usize), (usize, usize)) {
        self.check_span(span);
        let lc = |i: usize| {
            let line = self.newlines.partition_point(|&n| n <= i) + 1;
            (line, self.s[self.line_start(i)..i].chars().count() + 1)
        };
        (lc(span.start()), lc(span.end()))
    }
}

#[cfg(test)]
mod test {
    use cstgrammar::{GrammarBuilder, Span, rule::*};
    use cstpar::{LexError, Lexer, NonStreamingLexer};
    use csttable::{Language, LanguageBuilder, ParseAction, StateId, SymbolId};

    use super::DfaLexer;

    fn lang() -> Language {
        let grm = GrammarBuilder::new("lets")
            .rule(
                "source_file",
                repeat(choice(vec![sym("let_statement"), sym("bang")])),
            )
            .rule(
                "let_statement",
                seq(vec![
                    lit("let"),
                    sym("identifier"),
                    choice(vec![lit("="), lit("==")]),
                    sym("identifier"),
                ]),
            )
            .rule(
                "bang",
                seq(vec![sym("identifier"), token_immediate(lit("!"))]),
            )
            .rule("identifier", pat("[a-z❤]+"))
            .rule("comment", token(seq(vec![lit("%"), pat(".*")])))
            .extra(pat(r"\s"))
            .extra(sym("comment"))
            .word("identifier")
            .build()
            .unwrap();
        LanguageBuilder::new(grm).build().unwrap()
    }

    fn names(lang: &Language, input: &str) -> Vec<(String, String)> {
        DfaLexer::new(lang, input)
            .tokens()
            .into_iter()
            .map(|t| {
                let t = t.unwrap();
                let sp = t.span();
                (
                    lang.symbol_name(t.symbol()).to_owned(),
                    input[sp.start()..sp.end()].to_owned(),
                )
            })
            .collect()
    }

    fn pairs(v: &[(&str, &str)]) -> Vec<(String, String)> {
        v.iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_basic() {
        let lang = lang();
        assert_eq!(
            names(&lang, "let x = y % done\n"),
            pairs(&[
                ("let", "let"),
                ("identifier", "x"),
                ("=", "="),
                ("identifier", "y"),
                ("comment", "% done"),
            ])
        );
    }

    #[test]
    fn test_longest_match() {
        let lang = lang();
        assert_eq!(
            names(&lang, "letx == lett"),
            pairs(&[("identifier", "letx"), ("==", "=="), ("identifier", "lett")])
        );
    }

    #[test]
    fn test_padding_and_end() {
        let lang = lang();
        let input = "  x  ";
        let lexer = DfaLexer::new(&lang, input);
        let mode = lang.lex_mode(StateId::ERROR);
        let x = lexer.lex(0, mode).unwrap();
        assert_eq!(x.padding(), Span::new(0, 2));
        assert_eq!(x.span(), Span::new(2, 3));
        let end = lexer.lex(3, mode).unwrap();
        assert_eq!(end.symbol(), SymbolId::END);
        assert_eq!(end.padding(), Span::new(3, 5));
        assert!(end.span().is_empty());
        // Lexing is a pure function of the position and mode.
        assert_eq!(lexer.lex(0, mode), Ok(x));
    }

    #[test]
    fn test_basic_error() {
        let lang = lang();
        let lexer = DfaLexer::new(&lang, "let $x");
        let mode = lang.lex_mode(StateId::ERROR);
        let e = lexer.lex(3, mode).unwrap_err();
        assert_eq!(e, LexError::UnrecognizedCharacter { offset: 4, ch: '$' });
        assert_eq!(e.span(), Span::new(4, 5));
        let toks = lexer.tokens();
        assert_eq!(toks.len(), 3);
        assert!(toks[1].is_err());
        assert_eq!(toks[2].unwrap().span(), Span::new(5, 6));
    }

    #[test]
    fn test_immediate() {
        let lang = lang();
        let ident = lang.symbol_for_name("identifier", true).unwrap();
        // The state after the first identifier of a `bang`.
        let st = match lang.actions(StateId::START, ident) {
            [ParseAction::Shift { state, .. }] => *state,
            x => panic!("{:?}", x),
        };
        let mode = lang.lex_mode(st);
        let lexer = DfaLexer::new(&lang, "x!");
        let bang = lexer.lex(1, mode).unwrap();
        assert_eq!(bang.span(), Span::new(1, 2));
        assert!(lang.is_token(bang.symbol()));
        let lexer = DfaLexer::new(&lang, "x !");
        assert_eq!(
            lexer.lex(1, mode),
            Err(LexError::UnrecognizedCharacter { offset: 2, ch: '!' })
        );
    }

    #[test]
    fn test_line_col() {
        let lang = lang();
        let input = "let a\n= b\n\nlet ❤ == c";
        let lexer = DfaLexer::new(&lang, input);
        assert_eq!(lexer.line_col(Span::new(0, 3)), ((1, 1), (1, 4)));
        assert_eq!(lexer.line_col(Span::new(6, 7)), ((2, 1), (2, 2)));
        assert_eq!(lexer.span_lines_str(Span::new(6, 7)), "= b");
        assert_eq!(lexer.span_lines_str(Span::new(4, 8)), "let a\n= b");
        assert_eq!(lexer.span_lines_str(Span::new(10, 10)), "");
        let heart = input.find('❤').unwrap();
        let sp = Span::new(heart, heart + '❤'.len_utf8());
        assert_eq!(lexer.span_str(sp), "❤");
        assert_eq!(lexer.line_col(sp), ((4, 5), (4, 6)));
        assert_eq!(lexer.span_lines_str(sp), "let ❤ == c");
    }

    #[test]
    #[should_panic]
    fn test_span_out_of_bounds() {
        let lang = lang();
        DfaLexer::new(&lang, "let").span_str(Span::new(0, 4));
    }
}
