// This macro generates a struct which exposes a usize API while storing indices as `u16`. Symbol
// numbers in a compiled language are 16 bit, so every index that can end up in a table is too.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The storage type of every index newtype.
pub type IdxStorageT = u16;

macro_rules! IdxNewtype {
    ($(#[$attr:meta])* $n: ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        #[cfg_attr(feature="serde", derive(Serialize, Deserialize))]
        pub struct $n(pub IdxStorageT);

        impl From<$n> for usize {
            fn from(st: $n) -> Self {
                usize::from(st.0)
            }
        }

        impl From<$n> for u32 {
            fn from(st: $n) -> Self {
                u32::from(st.0)
            }
        }

        impl From<usize> for $n {
            fn from(v: usize) -> Self {
                match num_traits::cast::<usize, IdxStorageT>(v) {
                    Some(x) => $n(x),
                    None => panic!("{} does not fit into {}", v, stringify!($n)),
                }
            }
        }

        impl $n {
            pub fn as_storaget(&self) -> IdxStorageT {
                self.0
            }
        }
    }
}

IdxNewtype!(
    /// A type specifically for rule indices.
    ///
    /// `usize` values can be converted to `RIdx`, causing a panic if this would lead to a loss of
    /// precision. [`Grammar::new`](crate::Grammar::new) refuses grammars with more symbols than
    /// fit, so conversions of indices obtained from a grammar never panic.
    RIdx);
IdxNewtype!(
    /// A type specifically for production indices (e.g. a rule `E: choice(A, B)` has two
    /// productions for the single rule `E`).
    PIdx);
IdxNewtype!(
    /// A type specifically for symbol indices (within a production).
    SIdx);
IdxNewtype!(
    /// A type specifically for token indices. `TIdx(0)` is always the end-of-input token.
    TIdx);
IdxNewtype!(
    /// A type specifically for field name indices. Field names are sorted alphabetically.
    FIdx);
