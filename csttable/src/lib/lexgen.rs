//! Compile lexical rules into a DFA over codepoints. Rules are first turned into a Thompson NFA;
//! DFA states are then built lazily, one per distinct set of NFA states, so that the entry states
//! of different valid-token sets share whatever they have in common.

use cstgrammar::rule::Rule;
use fnv::FnvHashMap;
use regex_syntax::hir::{Class, Hir, HirKind};
use vob::Vob;

use crate::{
    TableError,
    language::{LexAccept, LexState, LexTable},
};

/// Something the lexer can recognise.
#[derive(Clone, Debug)]
pub(crate) struct LexItem {
    pub(crate) accept: LexAccept,
    pub(crate) name: String,
    pub(crate) rule: Rule,
    pub(crate) precedence: i32,
    pub(crate) literal: bool,
}

impl LexItem {
    /// The key that decides between items accepting the same input: the greater key wins.
    fn rank(&self, idx: usize) -> (bool, i32, bool, std::cmp::Reverse<usize>) {
        (
            matches!(self.accept, LexAccept::Token(_)),
            self.precedence,
            self.literal,
            std::cmp::Reverse(idx),
        )
    }
}

#[derive(Debug)]
enum NfaState {
    /// Consume a codepoint in one of `ranges` and move to `next`.
    Range {
        ranges: Vec<(char, char)>,
        next: usize,
    },
    /// Move to all of these states without consuming anything.
    Split(Vec<usize>),
    /// Accept lexical item `n`.
    Accept(usize),
}

struct NfaCompiler<'a> {
    states: Vec<NfaState>,
    token: &'a str,
}

impl NfaCompiler<'_> {
    fn push(&mut self, st: NfaState) -> usize {
        self.states.push(st);
        self.states.len() - 1
    }

    /// Compile `body` zero-or-more times, continuing with `next`.
    fn star(
        &mut self,
        next: usize,
        body: impl FnOnce(&mut Self, usize) -> Result<usize, TableError>,
    ) -> Result<usize, TableError> {
        let l = self.push(NfaState::Split(vec![next]));
        let start = body(self, l)?;
        self.states[l] = NfaState::Split(vec![start, next]);
        Ok(l)
    }

    /// Compile `rule` so that a match of it continues with `next`; return the entry state.
    fn rule(&mut self, rule: &Rule, next: usize) -> Result<usize, TableError> {
        match rule {
            Rule::Blank => Ok(next),
            Rule::String(s) => Ok(self.literal(s, next)),
            Rule::Pattern(p) => {
                let hir = regex_syntax::Parser::new()
                    .parse(p)
                    .map_err(|e| TableError::Regex {
                        token: self.token.to_owned(),
                        msg: e.to_string(),
                    })?;
                self.hir(&hir, next)
            }
            Rule::Seq(rs) => {
                let mut cur = next;
                for r in rs.iter().rev() {
                    cur = self.rule(r, cur)?;
                }
                Ok(cur)
            }
            Rule::Choice(rs) => {
                let mut starts = Vec::with_capacity(rs.len());
                for r in rs {
                    starts.push(self.rule(r, next)?);
                }
                Ok(self.push(NfaState::Split(starts)))
            }
            Rule::Repeat(r) => self.star(next, |c, l| c.rule(r, l)),
            Rule::Repeat1(r) => {
                let l = self.push(NfaState::Split(vec![next]));
                let start = self.rule(r, l)?;
                self.states[l] = NfaState::Split(vec![start, next]);
                Ok(start)
            }
            Rule::Field { rule, .. }
            | Rule::Alias { rule, .. }
            | Rule::Prec { rule, .. }
            | Rule::Token { rule, .. } => self.rule(rule, next),
            Rule::Symbol(_) => Err(TableError::UnsupportedPattern {
                token: self.token.to_owned(),
                what: "rule reference",
            }),
        }
    }

    fn literal(&mut self, s: &str, next: usize) -> usize {
        let mut cur = next;
        for c in s.chars().rev() {
            cur = self.push(NfaState::Range {
                ranges: vec![(c, c)],
                next: cur,
            });
        }
        cur
    }

    fn hir(&mut self, hir: &Hir, next: usize) -> Result<usize, TableError> {
        match hir.kind() {
            HirKind::Empty => Ok(next),
            HirKind::Literal(lit) => match std::str::from_utf8(&lit.0) {
                Ok(s) => Ok(self.literal(s, next)),
                Err(_) => Err(TableError::UnsupportedPattern {
                    token: self.token.to_owned(),
                    what: "non-UTF-8 literal",
                }),
            },
            HirKind::Class(Class::Unicode(cls)) => {
                let ranges = cls.ranges().iter().map(|r| (r.start(), r.end())).collect();
                Ok(self.push(NfaState::Range { ranges, next }))
            }
            HirKind::Class(Class::Bytes(cls)) => {
                let mut ranges = Vec::with_capacity(cls.ranges().len());
                for r in cls.ranges() {
                    if !r.end().is_ascii() {
                        return Err(TableError::UnsupportedPattern {
                            token: self.token.to_owned(),
                            what: "non-ASCII byte class",
                        });
                    }
                    ranges.push((char::from(r.start()), char::from(r.end())));
                }
                Ok(self.push(NfaState::Range { ranges, next }))
            }
            HirKind::Look(_) => Err(TableError::UnsupportedPattern {
                token: self.token.to_owned(),
                what: "anchor or look-around",
            }),
            HirKind::Repetition(rep) => {
                let mut cur = match rep.max {
                    None => self.star(next, |c, l| c.hir(&rep.sub, l))?,
                    Some(max) => {
                        // Optional copies nest: (x(x(x)?)?)?
                        let mut cur = next;
                        for _ in rep.min..max {
                            let s = self.hir(&rep.sub, cur)?;
                            cur = self.push(NfaState::Split(vec![s, next]));
                        }
                        cur
                    }
                };
                for _ in 0..rep.min {
                    cur = self.hir(&rep.sub, cur)?;
                }
                Ok(cur)
            }
            HirKind::Capture(cap) => self.hir(&cap.sub, next),
            HirKind::Concat(hs) => {
                let mut cur = next;
                for h in hs.iter().rev() {
                    cur = self.hir(h, cur)?;
                }
                Ok(cur)
            }
            HirKind::Alternation(hs) => {
                let mut starts = Vec::with_capacity(hs.len());
                for h in hs {
                    starts.push(self.hir(h, next)?);
                }
                Ok(self.push(NfaState::Split(starts)))
            }
        }
    }
}

/// Incrementally builds one [`LexTable`] from a fixed list of items. Each call to
/// [`add_entry`](Self::add_entry) returns an entry state recognising a subset of the items.
pub(crate) struct LexTableBuilder<'a> {
    items: &'a [LexItem],
    nfa: Vec<NfaState>,
    starts: Vec<usize>,
    table: LexTable,
    memo: FnvHashMap<Vec<usize>, u16>,
    todo: Vec<(u16, Vec<usize>)>,
}

impl<'a> LexTableBuilder<'a> {
    pub(crate) fn new(items: &'a [LexItem]) -> Result<Self, TableError> {
        let mut states = Vec::new();
        let mut starts = Vec::with_capacity(items.len());
        let mut accepts = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let mut c = NfaCompiler {
                states,
                token: &item.name,
            };
            let acc = c.push(NfaState::Accept(i));
            let start = c.rule(&item.rule, acc)?;
            states = c.states;
            starts.push(start);
            accepts.push(acc);
        }
        let bld = LexTableBuilder {
            items,
            nfa: states,
            starts,
            table: LexTable::default(),
            memo: FnvHashMap::default(),
            todo: Vec::new(),
        };
        for (i, item) in items.iter().enumerate() {
            if bld.closure([bld.starts[i]]).binary_search(&accepts[i]).is_ok() {
                return Err(TableError::EmptyToken {
                    token: item.name.clone(),
                });
            }
        }
        Ok(bld)
    }

    /// Return an entry state which recognises exactly the items `item_idxs`.
    pub(crate) fn add_entry(&mut self, item_idxs: &[usize]) -> Result<u16, TableError> {
        let set = self.closure(item_idxs.iter().map(|i| self.starts[*i]));
        let entry = self.state(set)?;
        while let Some((id, set)) = self.todo.pop() {
            let mut transitions = Vec::new();
            for (lo, hi, target) in self.transitions(&set) {
                transitions.push((lo, hi, self.state(target)?));
            }
            let accept = self.accept(&set);
            let st = &mut self.table.states[usize::from(id)];
            st.accept = accept;
            st.transitions = transitions;
        }
        Ok(entry)
    }

    pub(crate) fn finish(self) -> LexTable {
        self.table
    }

    /// Return the DFA state for the NFA state set `set`, creating it if necessary.
    fn state(&mut self, set: Vec<usize>) -> Result<u16, TableError> {
        if let Some(&id) = self.memo.get(&set) {
            return Ok(id);
        }
        let id = u16::try_from(self.table.states.len()).map_err(|_| TableError::TooManyStates)?;
        self.table.states.push(LexState::default());
        self.memo.insert(set.clone(), id);
        self.todo.push((id, set));
        Ok(id)
    }

    /// The epsilon closure of `seeds`, containing only consuming and accepting states, sorted.
    fn closure(&self, seeds: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut seen = Vob::from_elem(false, self.nfa.len());
        let mut stack = seeds.into_iter().collect::<Vec<_>>();
        let mut out = Vec::new();
        while let Some(s) = stack.pop() {
            if seen[s] {
                continue;
            }
            seen.set(s, true);
            match &self.nfa[s] {
                NfaState::Split(v) => stack.extend(v.iter().copied()),
                _ => out.push(s),
            }
        }
        out.sort_unstable();
        out
    }

    fn accept(&self, set: &[usize]) -> Option<LexAccept> {
        set.iter()
            .filter_map(|s| match self.nfa[*s] {
                NfaState::Accept(i) => Some(i),
                _ => None,
            })
            .max_by_key(|i| self.items[*i].rank(*i))
            .map(|i| self.items[i].accept)
    }

    /// Split the codepoints consumed by `set` into disjoint ranges, each with the set of states
    /// it leads to. Adjacent ranges with the same target are merged.
    fn transitions(&self, set: &[usize]) -> Vec<(char, char, Vec<usize>)> {
        let mut bounds = Vec::new();
        for &s in set {
            if let NfaState::Range { ranges, .. } = &self.nfa[s] {
                for &(lo, hi) in ranges {
                    bounds.push(u32::from(lo));
                    bounds.push(u32::from(hi) + 1);
                }
            }
        }
        bounds.sort_unstable();
        bounds.dedup();

        let mut out: Vec<(char, char, Vec<usize>)> = Vec::new();
        for w in bounds.windows(2) {
            let (lo, hi) = (w[0], w[1] - 1);
            let mut next = Vec::new();
            for &s in set {
                if let NfaState::Range { ranges, next: n } = &self.nfa[s] {
                    if ranges
                        .iter()
                        .any(|&(a, b)| u32::from(a) <= lo && lo <= u32::from(b))
                    {
                        next.push(*n);
                    }
                }
            }
            if next.is_empty() {
                continue;
            }
            let Some((lo, hi)) = char_range(lo, hi) else {
                continue;
            };
            let target = self.closure(next);
            if let Some(last) = out.last_mut() {
                if last.2 == target && adjacent(last.1, lo) {
                    last.1 = hi;
                    continue;
                }
            }
            out.push((lo, hi, target));
        }
        out
    }
}

/// Convert an inclusive codepoint interval to chars, trimming any surrogates off either end.
fn char_range(lo: u32, hi: u32) -> Option<(char, char)> {
    let lo = if (0xD800..0xE000).contains(&lo) { 0xE000 } else { lo };
    let hi = if (0xD800..0xE000).contains(&hi) { 0xD7FF } else { hi };
    if lo > hi {
        return None;
    }
    Some((char::from_u32(lo)?, char::from_u32(hi)?))
}

fn adjacent(a: char, b: char) -> bool {
    u32::from(b) == u32::from(a) + 1 || (a == '\u{D7FF}' && b == '\u{E000}')
}
