#![allow(clippy::new_without_default)]
#![allow(clippy::upper_case_acronyms)]

//! A library for describing the grammars of concrete syntax tree parsers. Grammars are written as
//! named [`Rule`](rule::Rule)s, built up with the combinators in [`rule`], and collected by a
//! [`GrammarBuilder`]. Building normalises the rules into a [`Grammar`]: a flat list of
//! productions whose symbols carry the field, alias, and precedence annotations that were in force
//! where they were written.
//!
//! We use some basic terminology for major concepts:
//!
//!   * A *grammar* is an ordered sequence of *productions*.
//!   * A *production* is an ordered sequence of *steps*, each referencing a *symbol*.
//!   * A *rule* maps a name to one or more productions.
//!   * A *token* is the name of a lexical element.
//!
//! For example, given:
//!
//! ```text
//!   R1: choice(seq("a", "b"), R2)
//!   R2: "c"
//! ```
//!
//! there are two productions (`R1: "a" "b"` and `R1: R2`), one rule (`R1`), and four tokens (the
//! end token, `R2`, `a`, and `b`): a rule whose body is a single string, pattern, or `token(...)`
//! is itself a token.
//!
//! cstgrammar makes the following guarantees about grammars:
//!
//!   * Productions are numbered from `0` to `prods_len() - 1` (inclusive).
//!   * Rules are numbered from `0` to `rules_len() - 1` (inclusive). The last rule is always the
//!     added start rule `^`.
//!   * Tokens are numbered from `0` to `tokens_len() - 1` (inclusive). Token `0` is always the end
//!     token; named token rules follow in declaration order, then anonymous tokens in order of
//!     appearance.
//!   * Field names are numbered in alphabetical order.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod builder;
mod firsts;
mod grammar;
mod idxnewtype;
pub mod rule;
pub mod span;

pub use builder::GrammarBuilder;
pub use firsts::Firsts;
pub use grammar::{Alias, Grammar, GrammarError, GrammarErrorKind, RuleInfo, Step, TokenInfo};
pub use idxnewtype::{FIdx, IdxStorageT, PIdx, RIdx, SIdx, TIdx};
pub use span::{Span, Spanned};

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Symbol {
    Rule(RIdx),
    Token(TIdx),
}
