use cstgrammar::{Grammar, Symbol, TIdx};
use fnv::FnvHashMap;

use crate::{StIdx, itemset::Itemset};

#[derive(Debug)]
pub struct StateGraph {
    /// A vector of `(core_states, closed_states)` tuples.
    states: Vec<(Itemset, Itemset)>,
    start_state: StIdx,
    /// For each state in `states`, edges is a hashmap from symbols to state offsets.
    edges: Vec<FnvHashMap<Symbol, StIdx>>,
}

impl StateGraph {
    pub(crate) fn new(
        states: Vec<(Itemset, Itemset)>,
        start_state: StIdx,
        edges: Vec<FnvHashMap<Symbol, StIdx>>,
    ) -> Self {
        StateGraph {
            states,
            start_state,
            edges,
        }
    }

    /// Return this state graph's start state.
    pub fn start_state(&self) -> StIdx {
        self.start_state
    }

    /// Return an iterator which produces (in order from `0..self.all_states_len()`) all this
    /// graph's valid `StIdx`s.
    pub fn iter_stidxs(&self) -> impl Iterator<Item = StIdx> + use<> {
        (0..self.states.len()).map(StIdx::from)
    }

    /// Return the itemset for closed state `stidx`. Panics if `stidx` doesn't exist.
    pub fn closed_state(&self, stidx: StIdx) -> &Itemset {
        &self.states[usize::from(stidx)].1
    }

    /// Return the itemset for core state `stidx`. Panics if `stidx` doesn't exist.
    pub fn core_state(&self, stidx: StIdx) -> &Itemset {
        &self.states[usize::from(stidx)].0
    }

    /// How many states does this `StateGraph` contain? NB: By definition the `StateGraph` contains
    /// the same number of core and closed states.
    pub fn all_states_len(&self) -> StIdx {
        StIdx::from(self.states.len())
    }

    /// Return the state pointed to by `sym` from `stidx` or `None` otherwise.
    pub fn edge(&self, stidx: StIdx, sym: Symbol) -> Option<StIdx> {
        self.edges
            .get(usize::from(stidx))
            .and_then(|x| x.get(&sym))
            .cloned()
    }

    /// Return the edges for state `stidx`. Panics if `stidx` doesn't exist.
    pub fn edges(&self, stidx: StIdx) -> &FnvHashMap<Symbol, StIdx> {
        &self.edges[usize::from(stidx)]
    }

    /// How many edges does this `StateGraph` contain?
    pub fn all_edges_len(&self) -> usize {
        self.edges.iter().map(|x| x.len()).sum()
    }

    /// Pretty print this stategraph as a `String`. If `core_states` is set to true, only the core
    /// states are pretty printed; if set to false, all states (including non-core states) are
    /// pretty printed. Items and edges are sorted so that the output is stable.
    pub fn pp(&self, grm: &Grammar, core_states: bool) -> String {
        fn num_digits(i: StIdx) -> usize {
            usize::from(i).to_string().len()
        }

        fn fmt_sym(grm: &Grammar, sym: Symbol) -> String {
            match sym {
                Symbol::Rule(ridx) => grm.rule_name(ridx).to_string(),
                Symbol::Token(tidx) => format!("'{}'", grm.token_name(tidx)),
            }
        }

        let mut o = String::new();
        for (stidx, (core_st, closed_st)) in self.iter_stidxs().zip(self.states.iter()) {
            if stidx != self.start_state {
                o.push('\n');
            }
            let padding = num_digits(self.all_states_len()) - num_digits(stidx);
            o.push_str(&format!("{}:{}", usize::from(stidx), " ".repeat(padding)));

            let st = if core_states { core_st } else { closed_st };
            let mut items = st.items.iter().collect::<Vec<_>>();
            items.sort_by_key(|(k, _)| **k);
            for (i, (&(pidx, sidx), ctx)) in items.into_iter().enumerate() {
                let padding = if i == 0 {
                    0
                } else {
                    o.push_str("\n "); // Extra space to compensate for ":" printed above
                    num_digits(self.all_states_len())
                };
                o.push_str(&format!(
                    "{} [{} ->",
                    " ".repeat(padding),
                    grm.rule_name(grm.prod_to_rule(pidx))
                ));
                for (i_sidx, i_ssym) in grm.prod(pidx).iter().enumerate() {
                    if i_sidx == usize::from(sidx) {
                        o.push_str(" .");
                    }
                    o.push_str(&format!(" {}", fmt_sym(grm, *i_ssym)));
                }
                if usize::from(sidx) == grm.prod(pidx).len() {
                    o.push_str(" .");
                }
                let la = ctx
                    .iter_set_bits(..)
                    .map(|bidx| format!("'{}'", grm.token_name(TIdx::from(bidx))))
                    .collect::<Vec<_>>();
                o.push_str(&format!(", {{{}}}]", la.join(", ")));
            }
            let mut edges = self.edges(stidx).iter().collect::<Vec<_>>();
            edges.sort_by_key(|(_, st)| **st);
            for (esym, e_stidx) in edges {
                o.push_str(&format!(
                    "\n{}{} -> {}",
                    " ".repeat(num_digits(self.all_states_len()) + 2),
                    fmt_sym(grm, *esym),
                    usize::from(*e_stidx)
                ));
            }
        }
        o
    }

    /// Return a pretty printed version of the core states, and all edges.
    pub fn pp_core_states(&self, grm: &Grammar) -> String {
        self.pp(grm, true)
    }

    /// Return a pretty printed version of the closed states, and all edges.
    pub fn pp_closed_states(&self, grm: &Grammar) -> String {
        self.pp(grm, false)
    }
}
