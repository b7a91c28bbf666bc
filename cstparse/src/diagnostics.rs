use std::path::Path;

use cstgrammar::Span;
use cstpar::{NonStreamingLexer, ParseError, ParseErrorKind, ParseRepair};
use csttable::{Language, SymbolId};
use unicode_width::UnicodeWidthStr;

/// Formats parse errors as `path:line:col` messages followed by the source lines they cover,
/// underlined.
pub struct DiagnosticFormatter<'a, 'input> {
    lexer: &'a dyn NonStreamingLexer<'input>,
    path: &'a Path,
}

impl<'a, 'input> DiagnosticFormatter<'a, 'input> {
    pub fn new(lexer: &'a dyn NonStreamingLexer<'input>, path: &'a Path) -> Self {
        Self { lexer, path }
    }

    // If a span is given returns "msg at path/file.foo:5:6" otherwise returns "msg in path/file.foo"
    pub fn file_location_msg(&self, msg: &str, span: Option<Span>) -> String {
        if let Some(span) = span {
            let ((line, col), _) = self.lexer.line_col(span);
            format!("{} at {}:{line}:{col}", msg, self.path.display())
        } else {
            format!("{} in {}", msg, self.path.display())
        }
    }

    /// Print the line number and source text for all lines intersecting the span, underlining
    /// the portion covered by the span with the `underline_c` character. An empty span is
    /// marked with a single `underline_c`.
    pub fn underline_span_with_text(&self, span: Span, msg: &str, underline_c: char) -> String {
        let ((first_line, first_col), (last_line, _)) = self.lexer.line_col(span);
        let lines = self.lexer.span_lines_str(span);
        // The byte offset of the start of `lines` in the input.
        let mut line_start = span.start()
            - lines
                .char_indices()
                .nth(first_col - 1)
                .map_or(lines.len(), |(i, _)| i);
        let digits = last_line.to_string().len();
        let mut out = String::new();
        let mut source_lines = lines.split('\n').enumerate().peekable();
        while let Some((i, source_line)) = source_lines.next() {
            let line_end = line_start + source_line.len();
            let ul_start = span.start().clamp(line_start, line_end);
            let ul_end = span.end().clamp(ul_start, line_end);
            out.push_str(&format!(
                "{:>digits$}| {}\n",
                first_line + i,
                source_line
            ));
            out.push_str(&" ".repeat(
                digits
                    + "| ".len()
                    + UnicodeWidthStr::width(&source_line[..ul_start - line_start]),
            ));
            let width = UnicodeWidthStr::width(&source_line[ul_start - line_start..ul_end - line_start]);
            out.push_str(&underline_c.to_string().repeat(if span.is_empty() { 1 } else { width }));
            if source_lines.peek().is_none() {
                out.push(' ');
                out.push_str(msg);
            } else {
                out.push('\n');
                line_start = line_end + 1;
            }
        }
        out
    }

    /// Describe `e` and show where in the input it happened.
    pub fn format_error(&self, lang: &Language, e: &ParseError) -> String {
        let what = match e.kind() {
            ParseErrorKind::Lexical(le) => format!("Lexing error: {}", le),
            ParseErrorKind::Syntax { found } => {
                format!("Parsing error: unexpected {}", symbol_epp(lang, found))
            }
        };
        let mut out = self.file_location_msg(&what, Some(e.span()));
        out.push('\n');
        let repair = match e.repair() {
            Some(ParseRepair::Insert(sym)) => format!("inserted {}", symbol_epp(lang, sym)),
            Some(ParseRepair::Skip(_)) => "skipped".to_owned(),
            Some(ParseRepair::Pop(n)) => format!("discarded {} preceding node(s)", n),
            None => "unable to recover".to_owned(),
        };
        out.push_str(&self.underline_span_with_text(e.span(), &repair, '^'));
        if matches!(e.kind(), ParseErrorKind::Syntax { .. }) && !e.expected().is_empty() {
            let expected = e
                .expected()
                .iter()
                .map(|s| symbol_epp(lang, *s))
                .collect::<Vec<_>>();
            out.push_str(&format!("\n  expected one of: {}", expected.join(", ")));
        }
        out
    }
}

/// How to show symbol `sym` to a user: named symbols by name, anonymous ones quoted.
pub fn symbol_epp(lang: &Language, sym: SymbolId) -> String {
    if sym == SymbolId::END {
        return "end of input".to_owned();
    }
    let name = lang.symbol_name(sym);
    if lang.symbol_metadata(sym).named {
        name.to_owned()
    } else {
        format!("\"{}\"", name.escape_default())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use cstlex::DfaLexer;
    use std::path::PathBuf;

    fn formatter_test(s: &str, f: impl FnOnce(DiagnosticFormatter) -> String) -> String {
        let lexer = DfaLexer::new(cstparsers::ampl(), s);
        let test_path = PathBuf::from("test");
        format!("\n{}", f(DiagnosticFormatter::new(&lexer, &test_path)))
    }

    #[test]
    fn underline_multiline_span_test() {
        let s = "\naaaaaabbb\nbbb\nbbbb\n";
        let span = Span::new(7, 7 + 12);
        assert_eq!(
            formatter_test(s, |fmt| fmt.underline_span_with_text(span, "Test message", '-')),
            r"
2| aaaaaabbb
         ---
3| bbb
   ---
4| bbbb
   ---- Test message"
        );
    }

    #[test]
    fn underline_single_line_span_test() {
        let s = "\naaaaaabbb bbb bbbb\n";
        let span = Span::new(7, 7 + 12);
        assert_eq!(
            formatter_test(s, |fmt| fmt.underline_span_with_text(span, "Test message", '^')),
            r"
2| aaaaaabbb bbb bbbb
         ^^^^^^^^^^^^ Test message"
        );
    }

    #[test]
    fn line_numbers_align() {
        let s = "\n\n\n\n\n\n\n\naaa\nbbb\nccc";
        assert_eq!(
            formatter_test(s, |fmt| fmt.underline_span_with_text(
                Span::new(8, 19),
                "Test message",
                '^'
            )),
            r"
 9| aaa
    ^^^
10| bbb
    ^^^
11| ccc
    ^^^ Test message"
        );
    }

    #[test]
    fn empty_span() {
        let s = "let x :=";
        assert_eq!(
            formatter_test(s, |fmt| fmt.underline_span_with_text(
                Span::empty_at(s.len()),
                "Here",
                '^'
            )),
            r"
1| let x :=
           ^ Here"
        );
    }

    #[test]
    fn span_unicode() {
        let crab = "\n🦀";
        let lobster = "🦞";
        let crustaceans = format!("{crab}{lobster}{crab}{crab}{lobster}");
        assert_eq!(
            formatter_test(&crustaceans, |fmt| fmt.underline_span_with_text(
                Span::new(crab.len(), crab.len() + lobster.len()),
                "Not a crab",
                '^'
            )),
            r"
2| 🦀🦞
     ^^ Not a crab"
        );
    }

    #[test]
    fn location() {
        let s = "ab\ncd";
        assert_eq!(
            formatter_test(s, |fmt| fmt.file_location_msg("Oops", Some(Span::new(4, 5)))),
            "\nOops at test:2:2"
        );
        assert_eq!(
            formatter_test(s, |fmt| fmt.file_location_msg("Oops", None)),
            "\nOops in test"
        );
    }

    #[test]
    fn parse_errors() {
        let lang = cstparsers::ampl();
        let input = "let x := 1 +;\nlet y := @;";
        let tree = cstparsers::parse(lang, input).unwrap();
        let lexer = DfaLexer::new(lang, input);
        let test_path = PathBuf::from("test");
        let fmt = DiagnosticFormatter::new(&lexer, &test_path);
        let msgs = tree
            .errors()
            .iter()
            .map(|e| fmt.format_error(lang, e))
            .collect::<Vec<_>>();
        assert!(msgs[0].starts_with("Parsing error: unexpected \";\" at test:1:13\n"));
        assert!(msgs[0].contains("expected one of: "));
        let lexing = msgs.iter().find(|m| m.starts_with("Lexing error")).unwrap();
        assert!(lexing.starts_with("Lexing error: unrecognized character '@' at test:2:10\n"));
        assert!(lexing.ends_with("2| let y := @;\n            ^ skipped"));
    }
}
