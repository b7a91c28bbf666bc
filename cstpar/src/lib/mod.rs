#![allow(clippy::new_without_default)]
#![allow(clippy::type_complexity)]
#![forbid(unsafe_code)]

//! `cstpar` interprets the tables in a [`csttable::Language`] to turn input into a concrete syntax
//! tree: a [`Tree`] whose leaves, together with the padding before each of them, cover every byte
//! of the input. Parsing is driven by the parser: it asks a [`Lexer`] for one token at a time in
//! the lexer mode of its current state.
//!
//! Parsing never fails because of the user's input. Syntax and lexing errors are recovered from
//! (see [`RecoveryKind`]), recorded in [`Tree::errors`], and show up in the tree as `ERROR` and
//! missing nodes. Only inconsistent tables lead to an [`InternalError`].
//!
//! ```rust,ignore
//! let tree = ParserBuilder::new(&lang)
//!     .recovery(RecoveryKind::InsertPanic)
//!     .parse(&lexer, None)?;
//! println!("{}", tree.to_sexp(&lang));
//! ```

mod lex_api;
mod parser;
mod recovery;
#[cfg(test)]
mod test_utils;
mod tree;

pub use crate::{
    lex_api::{LexError, Lexeme, Lexer, NonStreamingLexer},
    parser::{
        DEFAULT_MAX_SKIP, InternalError, ParseError, ParseErrorKind, ParseRepair, ParserBuilder,
        RecoveryKind,
    },
    tree::{Leaves, Node, Tree},
};
