#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::parsetable::{ActionList, ParseAction, ParseTable};

/// The version of the table layout produced by this crate. Parsers refuse languages built with a
/// different version.
pub const LANGUAGE_VERSION: u32 = 1;

/// A grammar symbol as seen by the lexer, parser and tree: `0` is the end of input, followed by
/// terminals, then nonterminals, then symbols which only exist as aliases.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymbolId(pub u16);

impl SymbolId {
    pub const END: SymbolId = SymbolId(0);
    /// The kind of `ERROR` nodes built by error recovery.
    pub const ERROR: SymbolId = SymbolId(u16::MAX);
}

impl From<SymbolId> for usize {
    fn from(s: SymbolId) -> Self {
        usize::from(s.0)
    }
}

/// A field name. `FieldId(0)` means "no field".
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldId(pub u16);

impl From<FieldId> for usize {
    fn from(f: FieldId) -> Self {
        usize::from(f.0)
    }
}

/// A parser state. State 0 is the error recovery state; state 1 is the start state.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StateId(pub u16);

impl StateId {
    pub const ERROR: StateId = StateId(0);
    pub const START: StateId = StateId(1);
}

impl From<StateId> for usize {
    fn from(s: StateId) -> Self {
        usize::from(s.0)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SymbolMetadata {
    /// Does this symbol appear as a node in the tree?
    pub visible: bool,
    /// Is this a named node (as opposed to anonymous punctuation and keywords)?
    pub named: bool,
    pub supertype: bool,
    /// Can this symbol appear anywhere (e.g. comments)?
    pub extra: bool,
}

/// Where a production's field entries live in [`Language::field_map_entries`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldMapSlice {
    pub index: u16,
    pub length: u16,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldMapEntry {
    pub field: FieldId,
    /// The index of the child within the production's (unspliced) children.
    pub child_index: u16,
    /// Set if the field is attached to nodes inside a hidden child rather than to the child
    /// itself.
    pub inherited: bool,
}

/// The lexer entry points to use in a parser state.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LexMode {
    pub lex_state: u16,
    /// The entry to continue from once padding has been consumed. It never accepts immediate
    /// tokens.
    pub lex_state_after_padding: u16,
}

/// What an accepting lexer state recognises.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LexAccept {
    Token(SymbolId),
    /// Padding between tokens (e.g. whitespace).
    Separator,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LexState {
    pub accept: Option<LexAccept>,
    /// Sorted, disjoint, inclusive codepoint ranges and their target states.
    pub transitions: Vec<(char, char, u16)>,
}

/// A DFA over codepoints.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LexTable {
    pub states: Vec<LexState>,
}

impl LexTable {
    /// The state reached from `state` on `ch`, if any.
    pub fn step(&self, state: u16, ch: char) -> Option<u16> {
        let ts = &self.states[usize::from(state)].transitions;
        match ts.binary_search_by(|&(lo, hi, _)| {
            if hi < ch {
                std::cmp::Ordering::Less
            } else if lo > ch {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        }) {
            Ok(i) => Some(ts[i].2),
            Err(_) => None,
        }
    }

    pub fn accept(&self, state: u16) -> Option<LexAccept> {
        self.states[usize::from(state)].accept
    }

    /// Run the DFA from `entry` over all of `s`, returning what the final state accepts. Returns
    /// `None` if the DFA gets stuck or ends in a non-accepting state.
    pub fn full_match(&self, entry: u16, s: &str) -> Option<LexAccept> {
        let mut st = entry;
        for ch in s.chars() {
            st = self.step(st, ch)?;
        }
        self.accept(st)
    }

    /// Run the DFA from `entry` over a prefix of `s` using maximal munch, returning the last
    /// accept seen and the number of bytes it covers.
    pub fn longest_match(&self, entry: u16, s: &str) -> Option<(LexAccept, usize)> {
        let mut st = entry;
        let mut last = self.accept(st).map(|a| (a, 0));
        for (i, ch) in s.char_indices() {
            match self.step(st, ch) {
                Some(n) => st = n,
                None => break,
            }
            if let Some(a) = self.accept(st) {
                last = Some((a, i + ch.len_utf8()));
            }
        }
        last
    }
}

/// A conflict resolved by default while building the tables, kept for diagnostics.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Conflict {
    ShiftReduce { token: String, production: String },
    ReduceReduce { first: String, second: String },
}

/// Everything a parser needs to know about one grammar. `Language`s are immutable once built.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Language {
    pub(crate) version: u32,
    pub(crate) name: String,
    pub(crate) symbol_count: usize,
    pub(crate) alias_count: usize,
    pub(crate) token_count: usize,
    pub(crate) state_count: usize,
    pub(crate) production_id_count: usize,
    pub(crate) max_alias_sequence_length: usize,
    pub(crate) symbol_names: Vec<String>,
    pub(crate) symbol_metadata: Vec<SymbolMetadata>,
    pub(crate) public_symbol_map: Vec<SymbolId>,
    /// Indexed by `FieldId`; entry 0 is empty.
    pub(crate) field_names: Vec<String>,
    pub(crate) field_map_slices: Vec<FieldMapSlice>,
    pub(crate) field_map_entries: Vec<FieldMapEntry>,
    pub(crate) alias_sequences: Vec<SymbolId>,
    pub(crate) parse_table: ParseTable,
    pub(crate) lex_modes: Vec<LexMode>,
    pub(crate) lex_table: LexTable,
    pub(crate) keyword_lex_table: Option<LexTable>,
    pub(crate) keyword_capture_token: Option<SymbolId>,
    pub(crate) conflicts: Vec<Conflict>,
}

impl Language {
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many terminals and nonterminals are there? Alias-only symbols are not included.
    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    pub fn alias_count(&self) -> usize {
        self.alias_count
    }

    /// How many terminals (including the end of input) are there?
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// How many field names are there (not counting the "no field" entry)?
    pub fn field_count(&self) -> usize {
        self.field_names.len() - 1
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    /// How many states are stored in the dense part of the parse table?
    pub fn large_state_count(&self) -> usize {
        self.parse_table.large_state_count
    }

    pub fn production_id_count(&self) -> usize {
        self.production_id_count
    }

    pub fn max_alias_sequence_length(&self) -> usize {
        self.max_alias_sequence_length
    }

    /// Is `sym` a terminal?
    pub fn is_token(&self, sym: SymbolId) -> bool {
        usize::from(sym) < self.token_count
    }

    /// Return the actions for terminal `sym` in `state`: an empty slice if there are none.
    pub fn actions(&self, state: StateId, sym: SymbolId) -> &[ParseAction] {
        self.action_list(state, sym).actions.as_slice()
    }

    pub fn action_list(&self, state: StateId, sym: SymbolId) -> &ActionList {
        let i = if usize::from(state) < self.state_count && self.is_token(sym) {
            self.parse_table.lookup(state, sym)
        } else {
            0
        };
        &self.parse_table.actions[usize::from(i)]
    }

    /// Does `state` have any action for terminal `sym`?
    pub fn has_actions(&self, state: StateId, sym: SymbolId) -> bool {
        !self.actions(state, sym).is_empty()
    }

    /// Return the state to move to after reducing to nonterminal `sym` in `state`, or `None` if
    /// there is no such goto.
    pub fn next_state(&self, state: StateId, sym: SymbolId) -> Option<StateId> {
        if usize::from(state) >= self.state_count
            || self.is_token(sym)
            || usize::from(sym) >= self.symbol_count
        {
            return None;
        }
        match self.parse_table.lookup(state, sym) {
            0 => None,
            s => Some(StateId(s)),
        }
    }

    /// Return the terminals which have actions in `state`, in symbol order.
    pub fn valid_symbols(&self, state: StateId) -> impl Iterator<Item = SymbolId> + '_ {
        (0..self.token_count)
            .map(|i| SymbolId(i as u16))
            .filter(move |s| self.has_actions(state, *s))
    }

    pub fn lex_mode(&self, state: StateId) -> LexMode {
        self.lex_modes
            .get(usize::from(state))
            .copied()
            .unwrap_or_default()
    }

    pub fn lex_table(&self) -> &LexTable {
        &self.lex_table
    }

    pub fn keyword_lex_table(&self) -> Option<&LexTable> {
        self.keyword_lex_table.as_ref()
    }

    /// The terminal (typically an identifier) whose matches may be reclassified as keywords.
    pub fn keyword_capture_token(&self) -> Option<SymbolId> {
        self.keyword_capture_token
    }

    pub fn symbol_name(&self, sym: SymbolId) -> &str {
        if sym == SymbolId::ERROR {
            return "ERROR";
        }
        self.symbol_names
            .get(usize::from(sym))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn symbol_metadata(&self, sym: SymbolId) -> SymbolMetadata {
        if sym == SymbolId::ERROR {
            return SymbolMetadata {
                visible: true,
                named: true,
                supertype: false,
                extra: false,
            };
        }
        self.symbol_metadata
            .get(usize::from(sym))
            .copied()
            .unwrap_or_default()
    }

    /// Map `sym` to the symbol used for it in the public tree: symbols with the same name and
    /// namedness are reported as one.
    pub fn public_symbol(&self, sym: SymbolId) -> SymbolId {
        self.public_symbol_map
            .get(usize::from(sym))
            .copied()
            .unwrap_or(sym)
    }

    /// Return the public symbol called `name` with namedness `named`, if there is one.
    pub fn symbol_for_name(&self, name: &str, named: bool) -> Option<SymbolId> {
        if name == "ERROR" {
            return Some(SymbolId::ERROR);
        }
        (0..self.symbol_names.len())
            .map(|i| SymbolId(i as u16))
            .find(|s| {
                self.symbol_names[usize::from(*s)] == name
                    && self.symbol_metadata[usize::from(*s)].named == named
                    && self.symbol_metadata[usize::from(*s)].visible
            })
            .map(|s| self.public_symbol(s))
    }

    pub fn field_name(&self, field: FieldId) -> Option<&str> {
        match usize::from(field) {
            0 => None,
            i => self.field_names.get(i).map(String::as_str),
        }
    }

    pub fn field_id_for_name(&self, name: &str) -> Option<FieldId> {
        self.field_names
            .iter()
            .skip(1)
            .position(|n| n == name)
            .map(|i| FieldId(i as u16 + 1))
    }

    /// Return the field map entries of `production_id`.
    pub fn field_map(&self, production_id: u16) -> &[FieldMapEntry] {
        match self.field_map_slices.get(usize::from(production_id)) {
            Some(sl) => {
                let start = usize::from(sl.index);
                &self.field_map_entries[start..start + usize::from(sl.length)]
            }
            None => &[],
        }
    }

    /// Return the alias of child `child_index` of `production_id`, if it has one.
    pub fn alias_at(&self, production_id: u16, child_index: usize) -> Option<SymbolId> {
        if production_id == 0 || child_index >= self.max_alias_sequence_length {
            return None;
        }
        match self
            .alias_sequences
            .get(usize::from(production_id) * self.max_alias_sequence_length + child_index)
        {
            Some(&SymbolId(0)) | None => None,
            Some(&s) => Some(s),
        }
    }

    /// The conflicts resolved by default while building this language.
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }
}

#[cfg(test)]
mod test {
    use super::{LexAccept, LexState, LexTable, SymbolId};

    fn ab_table() -> LexTable {
        // 0 -a-> 1 (accepts 1) -b-> 2 (accepts 2)
        LexTable {
            states: vec![
                LexState {
                    accept: None,
                    transitions: vec![('a', 'a', 1)],
                },
                LexState {
                    accept: Some(LexAccept::Token(SymbolId(1))),
                    transitions: vec![('0', '9', 1), ('b', 'b', 2)],
                },
                LexState {
                    accept: Some(LexAccept::Token(SymbolId(2))),
                    transitions: vec![],
                },
            ],
        }
    }

    #[test]
    fn step_and_match() {
        let t = ab_table();
        assert_eq!(t.step(0, 'a'), Some(1));
        assert_eq!(t.step(1, '5'), Some(1));
        assert_eq!(t.step(1, 'c'), None);
        assert_eq!(t.full_match(0, "ab"), Some(LexAccept::Token(SymbolId(2))));
        assert_eq!(t.full_match(0, "a1"), Some(LexAccept::Token(SymbolId(1))));
        assert_eq!(t.full_match(0, "abb"), None);
        assert_eq!(
            t.longest_match(0, "a12bx"),
            Some((LexAccept::Token(SymbolId(2)), 4))
        );
        assert_eq!(t.longest_match(0, "x"), None);
    }
}
