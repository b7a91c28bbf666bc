use cstgrammar::{Grammar, SIdx};

use crate::itemset::Itemset;

/// Check that production `prod_off` of rule `nt` is in `is` with the dot at `dot` and exactly the
/// lookaheads `la`.
pub(crate) fn state_exists(
    grm: &Grammar,
    is: &Itemset,
    nt: &str,
    prod_off: usize,
    dot: SIdx,
    la: Vec<&str>,
) {
    let ab_prod_off = grm.rule_to_prods(grm.rule_idx(nt).unwrap())[prod_off];
    let ctx = &is.items[&(ab_prod_off, dot)];
    for tidx in grm.iter_tidxs() {
        let bit = ctx[usize::from(tidx)];
        let name = grm.token_name(tidx);
        match (la.contains(&name), bit) {
            (true, false) => panic!(
                "bit for token {}, dot {} is not set in production {} of {} when it should be",
                name,
                usize::from(dot),
                prod_off,
                nt
            ),
            (false, true) => panic!(
                "bit for token {}, dot {} is set in production {} of {} when it shouldn't be",
                name,
                usize::from(dot),
                prod_off,
                nt
            ),
            _ => (),
        }
    }
}
