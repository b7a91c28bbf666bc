#![allow(clippy::new_without_default)]
#![forbid(unsafe_code)]

//! A lexer for `cstpar` which runs the DFA compiled into a [`csttable::Language`]. Tokens are
//! produced one at a time, in the lexer mode the parser asks for, with maximal munch and the
//! keyword table applied to matches of the word token.

mod lexer;

pub use crate::lexer::DfaLexer;
