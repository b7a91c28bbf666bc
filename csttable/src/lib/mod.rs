#![allow(clippy::new_without_default)]

//! Build the tables of a table-driven concrete syntax tree parser from a
//! [`Grammar`](cstgrammar::Grammar). An LR(1) state graph is built with Pager's algorithm,
//! conflicts are resolved with precedence and associativity, and the result is packed, together
//! with a lexer DFA, into a [`Language`]: a self-contained description of the grammar which the
//! `cstpar` driver interprets.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod builder;
mod itemset;
mod language;
mod lexgen;
mod pager;
mod parsetable;
mod stategraph;
pub mod statetable;
#[cfg(test)]
mod test_utils;

pub use crate::{
    builder::{LanguageBuilder, TableError},
    language::{
        Conflict, FieldId, FieldMapEntry, FieldMapSlice, LANGUAGE_VERSION, Language, LexAccept,
        LexMode, LexState, LexTable, StateId, SymbolId, SymbolMetadata,
    },
    parsetable::{ActionList, LARGE_STATE_THRESHOLD, ParseAction},
    stategraph::StateGraph,
    statetable::{Action, StateTable},
};

/// The type of the inner value of an [`StIdx`].
pub type StIdxStorageT = u16;

/// StIdx is a wrapper for a state index in a [`StateGraph`]. Its internal type is
/// [`StIdxStorageT`]; the biggest grammars we know of have a few thousand states, so a `u16` is
/// ample.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StIdx(pub StIdxStorageT);

impl From<StIdxStorageT> for StIdx {
    fn from(v: StIdxStorageT) -> Self {
        StIdx(v)
    }
}

impl From<usize> for StIdx {
    fn from(v: usize) -> Self {
        match num_traits::cast::<usize, StIdxStorageT>(v) {
            Some(x) => StIdx(x),
            None => panic!("{} does not fit into StIdx", v),
        }
    }
}

impl From<StIdx> for usize {
    fn from(st: StIdx) -> Self {
        usize::from(st.0)
    }
}

impl fmt::Display for StIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
