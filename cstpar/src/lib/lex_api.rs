#![allow(clippy::len_without_is_empty)]

use std::fmt;

use cstgrammar::Span;
use csttable::{LexMode, SymbolId};
use thiserror::Error;

/// The trait which all lexers which want to interact with `cstpar` must implement. Lexing is
/// driven by the parser: each call asks for the single token starting at (or, after padding,
/// following) a byte offset, restricted to what the lexer states of `mode` recognise.
pub trait Lexer {
    /// Lex one token at byte offset `pos` in `mode`. Separators before the token are consumed as
    /// padding and are recorded in [`Lexeme::padding_start`]. At the end of the input the end
    /// token ([`SymbolId::END`]) is returned with an empty span.
    ///
    /// This must be a pure function of the input, `pos`, and `mode`.
    fn lex(&self, pos: usize, mode: LexMode) -> Result<Lexeme, LexError>;
}

/// A `NonStreamingLexer` is one that takes input in one go, and is then able to hand out
/// substrings to that input and calculate line and column numbers from a [Span].
pub trait NonStreamingLexer<'input>: Lexer {
    /// Return the user input associated with a [Span].
    ///
    /// The [Span] must be well formed:
    ///   * The start/end byte indexes must be valid UTF-8 character indexes.
    ///   * The end byte index must not exceed the input's length.
    ///
    /// If these requirements are not respected this function may panic or return unexpected
    /// portions of the input.
    fn span_str(&self, span: Span) -> &'input str;

    /// Return the lines containing the input at `span` (including *all* the text on the lines
    /// that `span` starts and ends on).
    fn span_lines_str(&self, span: Span) -> &'input str;

    /// Return `((start line, start column), (end line, end column))` for `span`. Note that column
    /// *characters* (not bytes) are returned.
    fn line_col(&self, span: Span) -> ((usize, usize), (usize, usize));
}

/// A lexeme represents a segment of the user's input that conforms to a known token type, plus
/// the padding (e.g. whitespace) that preceded it.
///
/// Lexemes can also be "faulty": those created by error recovery (e.g. a missing token which was
/// inserted) need not match their token's definition at all.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Lexeme {
    symbol: SymbolId,
    padding_start: usize,
    span: Span,
    faulty: bool,
}

impl Lexeme {
    /// Create a new lexeme of token `symbol` at `span`, whose padding starts at `padding_start`.
    pub fn new(symbol: SymbolId, padding_start: usize, span: Span) -> Self {
        debug_assert!(padding_start <= span.start());
        Lexeme {
            symbol,
            padding_start,
            span,
            faulty: false,
        }
    }

    /// Create a new zero-width faulty lexeme of token `symbol` at `at`.
    pub fn new_faulty(symbol: SymbolId, at: usize) -> Self {
        Lexeme {
            symbol,
            padding_start: at,
            span: Span::empty_at(at),
            faulty: true,
        }
    }

    pub fn symbol(&self) -> SymbolId {
        self.symbol
    }

    /// Obtain this lexeme's [Span] (excluding padding).
    pub fn span(&self) -> Span {
        self.span
    }

    pub fn padding_start(&self) -> usize {
        self.padding_start
    }

    /// The span of the padding before this lexeme.
    pub fn padding(&self) -> Span {
        Span::new(self.padding_start, self.span.start())
    }

    /// Returns `true` if this lexeme is "faulty" i.e. is the result of error recovery in some way.
    pub fn faulty(&self) -> bool {
        self.faulty
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Lexeme[{}..{}]",
            self.span.start(),
            self.span.end()
        )
    }
}

/// A lexing error.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum LexError {
    #[error("unrecognized character '{ch}'")]
    UnrecognizedCharacter { offset: usize, ch: char },
}

impl LexError {
    /// Return the span associated with this error.
    pub fn span(&self) -> Span {
        match *self {
            LexError::UnrecognizedCharacter { offset, ch } => {
                Span::new(offset, offset + ch.len_utf8())
            }
        }
    }
}
