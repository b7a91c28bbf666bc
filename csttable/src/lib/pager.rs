use cstgrammar::{Grammar, SIdx, Symbol};
use fnv::{FnvHashMap, FnvHashSet};
use vob::Vob;

use crate::{StIdx, itemset::Itemset, stategraph::StateGraph};

impl Itemset {
    /// Return true if `other` is weakly compatible with `self`.
    fn weakly_compatible(&self, other: &Self) -> bool {
        // The weakly compatible check is one of the three core parts of Pager's algorithm
        // (along with merging and change propagation). There are three conditions which, if
        // satisfied, guarantee that `other` is weakly compatible with `self` (p255 of Pager's
        // paper, and p50 of Chen's dissertation). We check all three in one go, failing as early
        // as possible.

        // Our itemsets only store core configurations, so two itemsets with different numbers of
        // items can't be weakly compatible.
        let len = self.items.len();
        if len != other.items.len() {
            return false;
        }
        for &(pidx, dot) in self.items.keys() {
            if !other.items.contains_key(&(pidx, dot)) {
                return false;
            }
        }
        // With a single core configuration the loop below always succeeds.
        if len == 1 {
            return true;
        }

        // Pager's conditions rely on itemsets being ordered, so use one itemset's keys as a stable
        // ordering.
        let keys: Vec<_> = self.items.keys().collect();
        for (i, i_key) in keys.iter().enumerate().take(len - 1) {
            for j_key in keys.iter().take(len).skip(i + 1) {
                // Condition 1 in the Pager paper
                if !(vob_intersect(&self.items[*i_key], &other.items[*j_key])
                    || vob_intersect(&self.items[*j_key], &other.items[*i_key]))
                {
                    continue;
                }
                // Conditions 2 and 3 in the Pager paper
                if vob_intersect(&self.items[*i_key], &self.items[*j_key])
                    || vob_intersect(&other.items[*i_key], &other.items[*j_key])
                {
                    continue;
                }
                return false;
            }
        }

        true
    }

    /// Merge `other` into `self`, returning `true` if this led to any changes. If `other` is not
    /// weakly compatible with `self`, this function's effects and return value are undefined.
    fn weakly_merge(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (&(pidx, dot), ctx) in &mut self.items {
            if ctx.or(&other.items[&(pidx, dot)]) {
                changed = true;
            }
        }
        changed
    }
}

fn vob_intersect(v1: &Vob, v2: &Vob) -> bool {
    // The Vob implementation guarantees that the last block's unused bits are zeroed out, so we
    // can compare whole blocks.
    v1.iter_storage()
        .zip(v2.iter_storage())
        .any(|(b1, b2)| b1 & b2 != 0)
}

/// Build the LR(1) state graph of `grm` using Pager's weakly compatible merging.
pub(crate) fn pager_stategraph(grm: &Grammar) -> StateGraph {
    // This function can be seen as a modified version of items() from Chen's dissertation.

    let firsts = grm.firsts();
    // closed_states and core_states are both equally sized vectors of states. Core states are
    // smaller, and used for the weakly compatible checks, but we ultimately need to return
    // closed states. Closed states which are None are those which require processing; thus
    // closed_states also implicitly serves as a todo list.
    let mut closed_states: Vec<Option<Itemset>> = Vec::new();
    let mut core_states = Vec::new();
    let mut edges: Vec<FnvHashMap<Symbol, StIdx>> = Vec::new();

    let start_state = StIdx(0);
    let mut state0 = Itemset::new();
    let mut ctx = Vob::from_elem(false, usize::from(grm.tokens_len()));
    ctx.set(usize::from(grm.eof_token_idx()), true);
    state0.add(grm.start_prod(), SIdx(0), &ctx);
    closed_states.push(None);
    core_states.push(state0);
    edges.push(FnvHashMap::default());

    // There's no point processing a rule or token more than once per state.
    let mut seen_rules = Vob::from_elem(false, usize::from(grm.rules_len()));
    let mut seen_tokens = Vob::from_elem(false, usize::from(grm.tokens_len()));
    let mut new_states = Vec::new();
    // cnd_[rule|token]_weaklies represent which states are possible weakly compatible
    // matches for a given symbol.
    let mut cnd_rule_weaklies: Vec<Vec<StIdx>> = vec![Vec::new(); usize::from(grm.rules_len())];
    let mut cnd_token_weaklies: Vec<Vec<StIdx>> = vec![Vec::new(); usize::from(grm.tokens_len())];

    let mut todo = 1; // How many None values are there in closed_states?
    let mut todo_off = 0; // Offset in closed states to start searching for the next todo.
    while todo > 0 {
        debug_assert_eq!(core_states.len(), closed_states.len());
        // Processing state x disproportionately causes state x + 1 to require processing, so
        // search onwards from where we last found a todo, wrapping as necessary.
        let state_i = match closed_states
            .iter()
            .skip(todo_off)
            .position(Option::is_none)
        {
            Some(i) => todo_off + i,
            None => match closed_states.iter().position(Option::is_none) {
                Some(i) => i,
                None => break,
            },
        };
        todo_off = state_i + 1;
        todo -= 1;

        let cl_state = core_states[state_i].close(grm, &firsts);
        seen_rules.set_all(false);
        seen_tokens.set_all(false);
        for &(pidx, dot) in cl_state.items.keys() {
            if dot == grm.prod_len(pidx) {
                continue;
            }
            let sym = grm.prod(pidx)[usize::from(dot)];
            let (seen, i) = match sym {
                Symbol::Rule(s_ridx) => (&mut seen_rules, usize::from(s_ridx)),
                Symbol::Token(s_tidx) => (&mut seen_tokens, usize::from(s_tidx)),
            };
            if seen[i] {
                continue;
            }
            seen.set(i, true);
            new_states.push((sym, cl_state.goto(grm, &sym)));
        }
        closed_states[state_i] = Some(cl_state);

        'a: for (sym, nstate) in new_states.drain(..) {
            let cnd_states = match sym {
                Symbol::Rule(s_ridx) => &cnd_rule_weaklies[usize::from(s_ridx)],
                Symbol::Token(s_tidx) => &cnd_token_weaklies[usize::from(s_tidx)],
            };
            // A candidate state exactly the same as the new state only needs an edge. This is
            // needed for correctness: the weakly compatible check is not guaranteed to be
            // reflexive.
            for &cnd in cnd_states {
                if core_states[usize::from(cnd)] == nstate {
                    edges[state_i].insert(sym, cnd);
                    continue 'a;
                }
            }
            let m = cnd_states
                .iter()
                .copied()
                .find(|cnd| core_states[usize::from(*cnd)].weakly_compatible(&nstate));
            match m {
                Some(k) => {
                    edges[state_i].insert(sym, k);
                    if core_states[usize::from(k)].weakly_merge(&nstate) {
                        // We only do the simplest change propagation, forcing possibly affected
                        // sets to be entirely reprocessed. edges[k] will be regenerated in full.
                        if closed_states[usize::from(k)].is_some() {
                            closed_states[usize::from(k)] = None;
                            todo += 1;
                        }
                    }
                }
                None => {
                    let stidx = StIdx::from(core_states.len());
                    match sym {
                        Symbol::Rule(s_ridx) => {
                            cnd_rule_weaklies[usize::from(s_ridx)].push(stidx);
                        }
                        Symbol::Token(s_tidx) => {
                            cnd_token_weaklies[usize::from(s_tidx)].push(stidx);
                        }
                    }
                    edges[state_i].insert(sym, stidx);
                    edges.push(FnvHashMap::default());
                    closed_states.push(None);
                    core_states.push(nstate);
                    todo += 1;
                }
            }
        }
    }

    // The algorithm above can create unreachable states when a state is merged into another
    // after its successors were created. Weed them out.
    let states = core_states
        .into_iter()
        .zip(closed_states.into_iter().map(Option::unwrap_or_default))
        .collect();
    let (gc_states, gc_edges) = gc(states, start_state, edges);
    StateGraph::new(gc_states, start_state, gc_edges)
}

fn gc(
    states: Vec<(Itemset, Itemset)>,
    start_state: StIdx,
    edges: Vec<FnvHashMap<Symbol, StIdx>>,
) -> (Vec<(Itemset, Itemset)>, Vec<FnvHashMap<Symbol, StIdx>>) {
    let mut todo = vec![start_state];
    let mut seen = FnvHashSet::default();
    seen.insert(start_state);
    while let Some(state_i) = todo.pop() {
        for &s in edges[usize::from(state_i)].values() {
            if seen.insert(s) {
                todo.push(s);
            }
        }
    }

    if states.len() == seen.len() {
        return (states, edges);
    }

    // If we started with states [0, 1, 2] and only {0, 2} are reachable, state 2 becomes state
    // 1: work out each surviving state's new offset, then rewrite the edges.
    let mut gc_states = Vec::with_capacity(seen.len());
    let mut offsets = Vec::with_capacity(states.len());
    let mut offset = 0;
    for (state_i, zstate) in states.into_iter().enumerate() {
        offsets.push(StIdx::from(state_i - offset));
        if !seen.contains(&StIdx::from(state_i)) {
            offset += 1;
            continue;
        }
        gc_states.push(zstate);
    }

    let gc_edges = edges
        .into_iter()
        .enumerate()
        .filter(|(st_edge_i, _)| seen.contains(&StIdx::from(*st_edge_i)))
        .map(|(_, st_edges)| {
            st_edges
                .iter()
                .map(|(&k, &v)| (k, offsets[usize::from(v)]))
                .collect()
        })
        .collect();

    (gc_states, gc_edges)
}

#[cfg(test)]
mod test {
    use cstgrammar::{Grammar, GrammarBuilder, SIdx, Symbol, rule::*};
    use vob::Vob;

    use super::{pager_stategraph, vob_intersect};
    use crate::{StIdx, test_utils::state_exists};

    #[test]
    fn test_vob_intersect() {
        let mut b1 = Vob::from_elem(false, 8);
        let mut b2 = Vob::from_elem(false, 8);
        assert!(!vob_intersect(&b1, &b2));
        // Partial blocks must maintain the expected guarantees.
        b1.push(false);
        b2.push(false);
        assert!(!vob_intersect(&b1, &b2));
        b1.push(true);
        b2.push(true);
        assert!(vob_intersect(&b1, &b2));

        b1 = Vob::from_elem(false, 64);
        b2 = Vob::from_elem(false, 64);
        b1.push(true);
        b2.push(true);
        for _ in 0..63 {
            b1.push(false);
            b2.push(false);
        }
        assert!(vob_intersect(&b1, &b2));
    }

    // From 'LR(k) Analyse fuer Pragmatiker'
    fn grammar3() -> Grammar {
        GrammarBuilder::new("grammar3")
            .rule(
                "S",
                choice(vec![
                    seq(vec![sym("S"), lit("b")]),
                    seq(vec![lit("b"), sym("A"), lit("a")]),
                ]),
            )
            .rule(
                "A",
                choice(vec![
                    seq(vec![lit("a"), sym("S"), lit("c")]),
                    lit("a"),
                    seq(vec![lit("a"), sym("S"), lit("b")]),
                ]),
            )
            .build()
            .unwrap()
    }

    #[test]
    #[rustfmt::skip]
    fn test_stategraph() {
        let grm = grammar3();
        let sg = pager_stategraph(&grm);

        assert_eq!(sg.all_states_len(), StIdx(10));
        assert_eq!(sg.all_edges_len(), 10);

        assert_eq!(sg.closed_state(sg.start_state()).items.len(), 3);
        state_exists(&grm, sg.closed_state(sg.start_state()), "^", 0, SIdx(0), vec!["end"]);
        state_exists(&grm, sg.closed_state(sg.start_state()), "S", 0, SIdx(0), vec!["end", "b"]);
        state_exists(&grm, sg.closed_state(sg.start_state()), "S", 1, SIdx(0), vec!["end", "b"]);

        let s1 = sg.edge(sg.start_state(), Symbol::Rule(grm.rule_idx("S").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s1).items.len(), 2);
        state_exists(&grm, sg.closed_state(s1), "^", 0, SIdx(1), vec!["end"]);
        state_exists(&grm, sg.closed_state(s1), "S", 0, SIdx(1), vec!["end", "b"]);

        let s2 = sg.edge(s1, Symbol::Token(grm.token_idx("b").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s2).items.len(), 1);
        state_exists(&grm, sg.closed_state(s2), "S", 0, SIdx(2), vec!["end", "b"]);

        let s3 = sg.edge(sg.start_state(), Symbol::Token(grm.token_idx("b").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s3).items.len(), 4);
        state_exists(&grm, sg.closed_state(s3), "S", 1, SIdx(1), vec!["end", "b", "c"]);
        state_exists(&grm, sg.closed_state(s3), "A", 0, SIdx(0), vec!["a"]);
        state_exists(&grm, sg.closed_state(s3), "A", 1, SIdx(0), vec!["a"]);
        state_exists(&grm, sg.closed_state(s3), "A", 2, SIdx(0), vec!["a"]);

        let s4 = sg.edge(s3, Symbol::Rule(grm.rule_idx("A").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s4).items.len(), 1);
        state_exists(&grm, sg.closed_state(s4), "S", 1, SIdx(2), vec!["end", "b", "c"]);

        let s5 = sg.edge(s4, Symbol::Token(grm.token_idx("a").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s5).items.len(), 1);
        state_exists(&grm, sg.closed_state(s5), "S", 1, SIdx(3), vec!["end", "b", "c"]);

        let s6 = sg.edge(s3, Symbol::Token(grm.token_idx("a").unwrap())).unwrap();
        // result from merging 10 into 3
        assert_eq!(s3, sg.edge(s6, Symbol::Token(grm.token_idx("b").unwrap())).unwrap());
        assert_eq!(sg.closed_state(s6).items.len(), 5);
        state_exists(&grm, sg.closed_state(s6), "A", 0, SIdx(1), vec!["a"]);
        state_exists(&grm, sg.closed_state(s6), "A", 1, SIdx(1), vec!["a"]);
        state_exists(&grm, sg.closed_state(s6), "A", 2, SIdx(1), vec!["a"]);
        state_exists(&grm, sg.closed_state(s6), "S", 0, SIdx(0), vec!["b", "c"]);
        state_exists(&grm, sg.closed_state(s6), "S", 1, SIdx(0), vec!["b", "c"]);

        let s7 = sg.edge(s6, Symbol::Rule(grm.rule_idx("S").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s7).items.len(), 3);
        state_exists(&grm, sg.closed_state(s7), "A", 0, SIdx(2), vec!["a"]);
        state_exists(&grm, sg.closed_state(s7), "A", 2, SIdx(2), vec!["a"]);
        state_exists(&grm, sg.closed_state(s7), "S", 0, SIdx(1), vec!["b", "c"]);

        let s8 = sg.edge(s7, Symbol::Token(grm.token_idx("c").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s8).items.len(), 1);
        state_exists(&grm, sg.closed_state(s8), "A", 0, SIdx(3), vec!["a"]);

        let s9 = sg.edge(s7, Symbol::Token(grm.token_idx("b").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s9).items.len(), 2);
        state_exists(&grm, sg.closed_state(s9), "A", 2, SIdx(3), vec!["a"]);
        state_exists(&grm, sg.closed_state(s9), "S", 0, SIdx(2), vec!["b", "c"]);
    }

    // The example grammar from Pager's paper.
    fn grammar_pager() -> Grammar {
        GrammarBuilder::new("pager")
            .rule(
                "X",
                choice(vec![
                    seq(vec![lit("a"), sym("Y"), lit("d")]),
                    seq(vec![lit("a"), sym("Z"), lit("c")]),
                    seq(vec![lit("a"), sym("T")]),
                    seq(vec![lit("b"), sym("Y"), lit("e")]),
                    seq(vec![lit("b"), sym("Z"), lit("d")]),
                    seq(vec![lit("b"), sym("T")]),
                ]),
            )
            .rule(
                "Y",
                choice(vec![
                    seq(vec![lit("t"), sym("W")]),
                    seq(vec![lit("u"), sym("X")]),
                ]),
            )
            .rule("Z", seq(vec![lit("t"), lit("u")]))
            .rule("T", seq(vec![lit("u"), sym("X"), lit("a")]))
            .rule("W", seq(vec![lit("u"), sym("V")]))
            .rule("V", blank())
            .build()
            .unwrap()
    }

    #[test]
    #[rustfmt::skip]
    fn test_pager_graph() {
        let grm = grammar_pager();
        let sg = pager_stategraph(&grm);

        assert_eq!(sg.all_states_len(), StIdx(23));
        assert_eq!(sg.all_edges_len(), 27);

        assert_eq!(sg.core_state(sg.start_state()).items.len(), 1);
        assert_eq!(sg.closed_state(sg.start_state()).items.len(), 7);
        state_exists(&grm, sg.closed_state(sg.start_state()), "^", 0, SIdx(0), vec!["end"]);
        for i in 0..6 {
            state_exists(&grm, sg.closed_state(sg.start_state()), "X", i, SIdx(0), vec!["end"]);
        }

        let s1 = sg.edge(sg.start_state(), Symbol::Token(grm.token_idx("a").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s1).items.len(), 7);
        state_exists(&grm, sg.closed_state(s1), "X", 0, SIdx(1), vec!["a", "d", "e", "end"]);
        state_exists(&grm, sg.closed_state(s1), "Y", 0, SIdx(0), vec!["d"]);
        state_exists(&grm, sg.closed_state(s1), "Z", 0, SIdx(0), vec!["c"]);
        state_exists(&grm, sg.closed_state(s1), "T", 0, SIdx(0), vec!["a", "d", "e", "end"]);

        let s7 = sg.edge(sg.start_state(), Symbol::Token(grm.token_idx("b").unwrap())).unwrap();
        let s4 = sg.edge(s1, Symbol::Token(grm.token_idx("u").unwrap())).unwrap();
        assert_eq!(sg.closed_state(s4).items.len(), 8);
        assert_eq!(s4, sg.edge(s7, Symbol::Token(grm.token_idx("u").unwrap())).unwrap());
        state_exists(&grm, sg.closed_state(s4), "Y", 1, SIdx(1), vec!["d", "e"]);
        state_exists(&grm, sg.closed_state(s4), "T", 0, SIdx(1), vec!["a", "d", "e", "end"]);
        assert_eq!(s1, sg.edge(s4, Symbol::Token(grm.token_idx("a").unwrap())).unwrap());
        assert_eq!(s7, sg.edge(s4, Symbol::Token(grm.token_idx("b").unwrap())).unwrap());

        let s2 = sg.edge(s1, Symbol::Token(grm.token_idx("t").unwrap())).unwrap();
        let s3 = sg.edge(s2, Symbol::Token(grm.token_idx("u").unwrap())).unwrap();
        state_exists(&grm, sg.closed_state(s3), "V", 0, SIdx(0), vec!["d"]);
        let s8 = sg.edge(s7, Symbol::Token(grm.token_idx("t").unwrap())).unwrap();
        let s9 = sg.edge(s8, Symbol::Token(grm.token_idx("u").unwrap())).unwrap();

        // W-successor of S2 and S8 (merged)
        let s8w = sg.edge(s8, Symbol::Rule(grm.rule_idx("W").unwrap())).unwrap();
        assert_eq!(s8w, sg.edge(s2, Symbol::Rule(grm.rule_idx("W").unwrap())).unwrap());
        state_exists(&grm, sg.closed_state(s8w), "Y", 0, SIdx(2), vec!["d", "e"]);

        // V-successor of S3 and S9 (merged)
        let s9v = sg.edge(s9, Symbol::Rule(grm.rule_idx("V").unwrap())).unwrap();
        assert_eq!(s9v, sg.edge(s3, Symbol::Rule(grm.rule_idx("V").unwrap())).unwrap());
        state_exists(&grm, sg.closed_state(s9v), "W", 0, SIdx(2), vec!["d", "e"]);
    }

    #[test]
    fn deterministic() {
        let grm = grammar_pager();
        let a = pager_stategraph(&grm);
        let b = pager_stategraph(&grm);
        assert_eq!(a.pp_core_states(&grm), b.pp_core_states(&grm));
    }
}
