use std::cmp::Ordering;

use cstgrammar::{Grammar, PIdx, RIdx, Symbol, TIdx, rule::AssocKind};
use tracing::warn;

use crate::{StIdx, stategraph::StateGraph};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// Shift to state X in the statetable.
    Shift(StIdx),
    /// Reduce production X in the grammar.
    Reduce(PIdx),
    /// Accept this input.
    Accept,
    /// No valid action.
    Error,
}

/// The conflicts which could not be resolved by precedence and associativity and which were
/// therefore resolved by default (shift over reduce; earlier production over later production).
#[derive(Debug, Default)]
pub struct Conflicts {
    reduce_reduce: Vec<(PIdx, PIdx, StIdx)>,
    shift_reduce: Vec<(TIdx, PIdx, StIdx)>,
}

impl Conflicts {
    /// Return an iterator over all reduce/reduce conflicts.
    pub fn rr_conflicts(&self) -> impl Iterator<Item = &(PIdx, PIdx, StIdx)> {
        self.reduce_reduce.iter()
    }

    /// Return an iterator over all shift/reduce conflicts.
    pub fn sr_conflicts(&self) -> impl Iterator<Item = &(TIdx, PIdx, StIdx)> {
        self.shift_reduce.iter()
    }

    /// How many reduce/reduce conflicts are there?
    pub fn rr_len(&self) -> usize {
        self.reduce_reduce.len()
    }

    /// How many shift/reduce conflicts are there?
    pub fn sr_len(&self) -> usize {
        self.shift_reduce.len()
    }

    pub fn len(&self) -> usize {
        self.rr_len() + self.sr_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a pretty-printed version of the conflicts.
    pub fn pp(&self, grm: &Grammar) -> String {
        let mut s = String::new();
        if self.sr_len() > 0 {
            s.push_str("Shift/Reduce conflicts:\n");
            for (tidx, pidx, stidx) in self.sr_conflicts() {
                s.push_str(&format!(
                    "   State {:?}: Shift(\"{}\") / Reduce({})\n",
                    usize::from(*stidx),
                    grm.token_name(*tidx),
                    grm.pp_prod(*pidx)
                ));
            }
        }
        if self.rr_len() > 0 {
            s.push_str("Reduce/Reduce conflicts:\n");
            for (pidx, r_pidx, stidx) in self.rr_conflicts() {
                s.push_str(&format!(
                    "   State {:?}: Reduce({}) / Reduce({})\n",
                    usize::from(*stidx),
                    grm.pp_prod(*pidx),
                    grm.pp_prod(*r_pidx)
                ));
            }
        }
        s
    }
}

/// A resolved LR(1) action/goto table over grammar indices.
#[derive(Debug)]
pub struct StateTable {
    // Rows represent states and columns represent tokens.
    actions: Vec<Action>,
    gotos: Vec<Option<StIdx>>,
    tokens_len: usize,
    rules_len: usize,
    conflicts: Conflicts,
    pub final_state: StIdx,
}

impl StateTable {
    pub fn new(grm: &Grammar, sg: &StateGraph) -> Self {
        let tokens_len = usize::from(grm.tokens_len());
        let rules_len = usize::from(grm.rules_len());
        let states_len = usize::from(sg.all_states_len());
        let mut actions = vec![Action::Error; states_len * tokens_len];
        let mut gotos = vec![None; states_len * rules_len];
        let mut conflicts = Conflicts::default();
        let mut final_state = sg.start_state();

        for stidx in sg.iter_stidxs() {
            let state = sg.closed_state(stidx);
            // Populate reduces and accepts. Items are visited in a fixed order so that conflict
            // reports are stable.
            let mut items = state.items.iter().collect::<Vec<_>>();
            items.sort_by_key(|(k, _)| **k);
            for (&(pidx, dot), ctx) in items {
                if dot < grm.prod_len(pidx) {
                    continue;
                }
                for tidx in ctx.iter_set_bits(..) {
                    let off = usize::from(stidx) * tokens_len + tidx;
                    if pidx == grm.start_prod() {
                        final_state = stidx;
                        if let Action::Reduce(r_pidx) = actions[off] {
                            conflicts.reduce_reduce.push((pidx, r_pidx, stidx));
                        }
                        actions[off] = Action::Accept;
                        continue;
                    }
                    match actions[off] {
                        Action::Reduce(r_pidx) => {
                            let (prec, _) = grm.prod_precedence(pidx);
                            let (r_prec, _) = grm.prod_precedence(r_pidx);
                            match prec.cmp(&r_prec) {
                                Ordering::Greater => actions[off] = Action::Reduce(pidx),
                                Ordering::Less => (),
                                Ordering::Equal => {
                                    // Resolve in favour of the earlier production in the grammar.
                                    let (first, second) = (pidx.min(r_pidx), pidx.max(r_pidx));
                                    warn!(
                                        "Reduce/reduce conflict on '{}' between '{}' and '{}'",
                                        grm.token_name(TIdx::from(tidx)),
                                        grm.pp_prod(first),
                                        grm.pp_prod(second)
                                    );
                                    conflicts.reduce_reduce.push((first, second, stidx));
                                    actions[off] = Action::Reduce(first);
                                }
                            }
                        }
                        Action::Accept => conflicts.reduce_reduce.push((grm.start_prod(), pidx, stidx)),
                        Action::Error => actions[off] = Action::Reduce(pidx),
                        Action::Shift(_) => unreachable!(),
                    }
                }
            }

            let mut edges = sg.edges(stidx).iter().collect::<Vec<_>>();
            edges.sort_by_key(|(_, st)| **st);
            for (&sym, &ref_stidx) in edges {
                match sym {
                    Symbol::Rule(s_ridx) => {
                        gotos[usize::from(stidx) * rules_len + usize::from(s_ridx)] =
                            Some(ref_stidx);
                    }
                    Symbol::Token(s_tidx) => {
                        let off = usize::from(stidx) * tokens_len + usize::from(s_tidx);
                        actions[off] = match actions[off] {
                            Action::Reduce(r_pidx) => {
                                match resolve_shift_reduce(grm, sg, stidx, s_tidx, r_pidx) {
                                    Some(true) => Action::Shift(ref_stidx),
                                    Some(false) => Action::Reduce(r_pidx),
                                    None => {
                                        warn!(
                                            "Shift/reduce conflict on '{}' with '{}'",
                                            grm.token_name(s_tidx),
                                            grm.pp_prod(r_pidx)
                                        );
                                        conflicts.shift_reduce.push((s_tidx, r_pidx, stidx));
                                        Action::Shift(ref_stidx)
                                    }
                                }
                            }
                            Action::Error | Action::Shift(_) => Action::Shift(ref_stidx),
                            Action::Accept => unreachable!(),
                        };
                    }
                }
            }
        }

        StateTable {
            actions,
            gotos,
            tokens_len,
            rules_len,
            conflicts,
            final_state,
        }
    }

    /// Return the action for `stidx` and `tidx`.
    pub fn action(&self, stidx: StIdx, tidx: TIdx) -> Action {
        self.actions[usize::from(stidx) * self.tokens_len + usize::from(tidx)]
    }

    /// Return the goto state for `stidx` and `ridx`, or `None` if there isn't any.
    pub fn goto(&self, stidx: StIdx, ridx: RIdx) -> Option<StIdx> {
        self.gotos[usize::from(stidx) * self.rules_len + usize::from(ridx)]
    }

    /// Return an iterator over the tokens which have a non-error action in `stidx`.
    pub fn state_actions(&self, stidx: StIdx) -> impl Iterator<Item = TIdx> + '_ {
        let start = usize::from(stidx) * self.tokens_len;
        self.actions[start..start + self.tokens_len]
            .iter()
            .enumerate()
            .filter(|(_, a)| **a != Action::Error)
            .map(|(i, _)| TIdx::from(i))
    }

    pub fn conflicts(&self) -> &Conflicts {
        &self.conflicts
    }
}

/// Decide a shift/reduce conflict on `tidx` in `stidx` against a reduction of `r_pidx`. Returns
/// `Some(true)` to shift, `Some(false)` to reduce, and `None` if precedence and associativity
/// can't decide.
fn resolve_shift_reduce(
    grm: &Grammar,
    sg: &StateGraph,
    stidx: StIdx,
    tidx: TIdx,
    r_pidx: PIdx,
) -> Option<bool> {
    // The shift side's precedence is that of the step before the dot, over all items which could
    // shift `tidx` and are partway through their production.
    let shift_prec = sg
        .closed_state(stidx)
        .items
        .keys()
        .filter(|(pidx, dot)| {
            usize::from(*dot) > 0
                && dot < &grm.prod_len(*pidx)
                && grm.prod(*pidx)[usize::from(*dot)] == Symbol::Token(tidx)
        })
        .map(|(pidx, dot)| grm.prod_steps(*pidx)[usize::from(*dot) - 1].precedence)
        .max()
        .unwrap_or(0);
    let (r_prec, r_assoc) = grm.prod_precedence(r_pidx);
    match shift_prec.cmp(&r_prec) {
        Ordering::Greater => Some(true),
        Ordering::Less => Some(false),
        Ordering::Equal => match r_assoc {
            Some(AssocKind::Left) => Some(false),
            Some(AssocKind::Right) => Some(true),
            None => None,
        },
    }
}
