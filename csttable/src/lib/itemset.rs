use std::{
    collections::hash_map::{Entry, HashMap},
    hash::BuildHasherDefault,
};

use cstgrammar::{Firsts, Grammar, PIdx, SIdx, Symbol};
use fnv::FnvHasher;
use vob::Vob;

/// The type of "context" (also known as "lookaheads").
pub type Ctx = Vob;

/// An `Itemset` is a set of LR(1) items: `(production, dot)` pairs each with a lookahead set.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Itemset {
    pub items: HashMap<(PIdx, SIdx), Ctx, BuildHasherDefault<FnvHasher>>,
}

impl Itemset {
    /// Create a blank Itemset.
    pub fn new() -> Self {
        Itemset {
            items: HashMap::with_hasher(BuildHasherDefault::<FnvHasher>::default()),
        }
    }

    /// Add an item `(prod, dot)` with context `ctx` to this itemset. Returns true if this led to
    /// any changes in the itemset.
    pub fn add(&mut self, prod: PIdx, dot: SIdx, ctx: &Ctx) -> bool {
        match self.items.entry((prod, dot)) {
            Entry::Occupied(mut e) => e.get_mut().or(ctx),
            Entry::Vacant(e) => {
                e.insert(ctx.clone());
                true
            }
        }
    }

    /// Create a new itemset which is a closed version of `self`.
    pub fn close(&self, grm: &Grammar, firsts: &Firsts) -> Self {
        // This function can be seen as a merger of getClosure and getContext from Chen's
        // dissertation.
        //
        // Rather than keeping a todo set of (prod, dot) pairs, we first walk the items already in
        // `self` and then a bitfield of productions which need to be visited with the dot at 0:
        // every item added by closure has its dot at the start.
        let mut new_is = self.clone();
        let mut keys_iter = self.items.keys();
        let mut zero_todos = Vob::from_elem(false, usize::from(grm.prods_len()));
        let mut new_ctx = Vob::from_elem(false, usize::from(grm.tokens_len()));
        loop {
            let (pidx, dot) = match keys_iter.next() {
                Some(&(x, y)) => (x, y),
                None => match zero_todos.iter_set_bits(..).next() {
                    Some(i) => {
                        zero_todos.set(i, false);
                        (PIdx::from(i), SIdx(0))
                    }
                    None => break,
                },
            };
            let prod = grm.prod(pidx);
            if usize::from(dot) == prod.len() {
                continue;
            }
            if let Symbol::Rule(s_ridx) = prod[usize::from(dot)] {
                // A fast version of what Chen calls getContext, with getTHeads folded in. See also
                // http://binarysculpting.com/2012/02/04/computing-lr1-closure/
                new_ctx.set_all(false);
                let mut nullable = true;
                for sym in prod.iter().skip(usize::from(dot) + 1) {
                    match *sym {
                        Symbol::Token(s_tidx) => {
                            new_ctx.set(usize::from(s_tidx), true);
                            nullable = false;
                            break;
                        }
                        Symbol::Rule(s_ridx) => {
                            new_ctx.or(firsts.firsts(s_ridx));
                            if !firsts.is_epsilon_set(s_ridx) {
                                nullable = false;
                                break;
                            }
                        }
                    }
                }
                if nullable {
                    new_ctx.or(&new_is.items[&(pidx, dot)]);
                }

                for ref_pidx in grm.rule_to_prods(s_ridx) {
                    if new_is.add(*ref_pidx, SIdx(0), &new_ctx) {
                        zero_todos.set(usize::from(*ref_pidx), true);
                    }
                }
            }
        }
        new_is
    }

    /// Create a new Itemset based on calculating the goto of 'sym' on the current Itemset.
    pub fn goto(&self, grm: &Grammar, sym: &Symbol) -> Self {
        // This is called 'transition' in Chen's dissertation, though note that the definition
        // therein appears to get the dot in the input/output the wrong way around.
        let mut newis = Itemset::new();
        for (&(pidx, dot), ctx) in &self.items {
            let prod = grm.prod(pidx);
            if usize::from(dot) == prod.len() {
                continue;
            }
            if sym == &prod[usize::from(dot)] {
                newis.add(pidx, SIdx::from(usize::from(dot) + 1), ctx);
            }
        }
        newis
    }
}
