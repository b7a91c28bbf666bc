use std::collections::BTreeMap;

use fnv::FnvHashMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::language::{StateId, SymbolId};

/// States with more entries than this are stored in the dense part of the parse table.
pub const LARGE_STATE_THRESHOLD: usize = 64;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParseAction {
    /// Push the lookahead and move to `state`. `repetition` is set when the shift only continues
    /// a repetition.
    Shift { state: StateId, repetition: bool },
    /// Push the lookahead as an extra without changing state.
    ShiftExtra,
    /// Pop `child_count` nodes and build a `symbol` node from them.
    Reduce {
        symbol: SymbolId,
        child_count: u16,
        production_id: u16,
    },
    Accept,
    /// Start error recovery.
    Recover,
}

/// The actions for one `(state, terminal)` pair. Lists are shared between all the pairs with the
/// same actions.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActionList {
    /// Can a subtree ending with this lookahead be reused? False only for the error state.
    pub reusable: bool,
    pub actions: Vec<ParseAction>,
}

/// Deduplicates [`ActionList`]s. Index 0 is always the empty list.
pub(crate) struct ActionArena {
    lists: Vec<ActionList>,
    index: FnvHashMap<ActionList, u16>,
}

impl ActionArena {
    pub(crate) fn new() -> Self {
        let mut index = FnvHashMap::default();
        index.insert(ActionList::default(), 0);
        ActionArena {
            lists: vec![ActionList::default()],
            index,
        }
    }

    /// Return the index of `list`, adding it if it hasn't been seen before.
    pub(crate) fn intern(&mut self, list: ActionList) -> u16 {
        if list.actions.is_empty() {
            return 0;
        }
        if let Some(&i) = self.index.get(&list) {
            return i;
        }
        let i = self.lists.len() as u16;
        self.lists.push(list.clone());
        self.index.insert(list, i);
        i
    }

    pub(crate) fn len(&self) -> usize {
        self.lists.len()
    }

    pub(crate) fn into_lists(self) -> Vec<ActionList> {
        self.lists
    }
}

/// Decide which states are large and renumber them to the front. `entry_counts[i]` is the number
/// of non-empty entries of state `i`. Returns a map from old to new state numbers and the number
/// of large states. States 0 and 1 are always large and keep their numbers.
pub(crate) fn state_order(entry_counts: &[usize]) -> (Vec<u16>, usize) {
    let is_large = |i: usize| i < 2 || entry_counts[i] > LARGE_STATE_THRESHOLD;
    let mut remap = vec![0; entry_counts.len()];
    let mut next = 0;
    for i in (0..entry_counts.len()).filter(|i| is_large(*i)) {
        remap[i] = next;
        next += 1;
    }
    let large_state_count = usize::from(next);
    for i in (0..entry_counts.len()).filter(|i| !is_large(*i)) {
        remap[i] = next;
        next += 1;
    }
    (remap, large_state_count)
}

/// The parse table. For terminals a cell holds an index into `actions`; for nonterminals it holds
/// the goto state. `0` means there is no entry in both cases.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParseTable {
    pub(crate) large_state_count: usize,
    pub(crate) symbol_count: usize,
    /// `large_state_count * symbol_count` cells.
    pub(crate) parse_table: Vec<u16>,
    /// Runs of `[group_count, (value, symbol_count, symbols...)...]`, one per small state.
    pub(crate) small_parse_table: Vec<u16>,
    /// For each small state, the offset of its run in `small_parse_table`.
    pub(crate) small_parse_table_map: Vec<u32>,
    pub(crate) actions: Vec<ActionList>,
}

impl ParseTable {
    /// Encode `rows`, which must already be in final state order. Each row is a list of
    /// `(symbol, value)` pairs with non-zero values.
    pub(crate) fn encode(
        rows: &[Vec<(SymbolId, u16)>],
        large_state_count: usize,
        symbol_count: usize,
        actions: Vec<ActionList>,
    ) -> Self {
        let mut parse_table = vec![0; large_state_count * symbol_count];
        for (i, row) in rows.iter().take(large_state_count).enumerate() {
            for &(sym, v) in row {
                parse_table[i * symbol_count + usize::from(sym)] = v;
            }
        }

        let mut small_parse_table = Vec::new();
        let mut small_parse_table_map = Vec::with_capacity(rows.len() - large_state_count);
        for row in rows.iter().skip(large_state_count) {
            let mut groups: BTreeMap<u16, Vec<u16>> = BTreeMap::new();
            for &(sym, v) in row {
                groups.entry(v).or_default().push(sym.0);
            }
            small_parse_table_map.push(small_parse_table.len() as u32);
            small_parse_table.push(groups.len() as u16);
            for (v, mut syms) in groups {
                syms.sort_unstable();
                small_parse_table.push(v);
                small_parse_table.push(syms.len() as u16);
                small_parse_table.extend(syms);
            }
        }

        ParseTable {
            large_state_count,
            symbol_count,
            parse_table,
            small_parse_table,
            small_parse_table_map,
            actions,
        }
    }

    /// Return the cell for `(state, sym)`.
    pub(crate) fn lookup(&self, state: StateId, sym: SymbolId) -> u16 {
        let st = usize::from(state);
        if st < self.large_state_count {
            return self.parse_table[st * self.symbol_count + usize::from(sym)];
        }
        let mut i = match self.small_parse_table_map.get(st - self.large_state_count) {
            Some(&off) => off as usize,
            None => return 0,
        };
        let group_count = self.small_parse_table[i];
        i += 1;
        for _ in 0..group_count {
            let v = self.small_parse_table[i];
            let n = usize::from(self.small_parse_table[i + 1]);
            let syms = &self.small_parse_table[i + 2..i + 2 + n];
            if syms.binary_search(&sym.0).is_ok() {
                return v;
            }
            i += 2 + n;
        }
        0
    }
}
