use vob::Vob;

use crate::{Grammar, RIdx, Symbol, TIdx};

/// `Firsts` stores all the first sets for a given grammar. For example, given this grammar:
/// ```text
///   S: seq(A, "b")
///   A: optional("a")
/// ```
/// then the following assertions (and only the following assertions) about the firsts set are
/// correct:
/// ```text
///   assert!(firsts.is_set(grm.rule_idx("S").unwrap(), grm.token_idx("a").unwrap()));
///   assert!(firsts.is_set(grm.rule_idx("S").unwrap(), grm.token_idx("b").unwrap()));
///   assert!(firsts.is_set(grm.rule_idx("A").unwrap(), grm.token_idx("a").unwrap()));
///   assert!(firsts.is_epsilon_set(grm.rule_idx("A").unwrap()));
/// ```
#[derive(Debug)]
pub struct Firsts {
    firsts: Vec<Vob>,
    epsilons: Vob,
}

impl Firsts {
    /// Generates and returns the firsts set for the given grammar.
    pub fn new(grm: &Grammar) -> Self {
        let mut firsts = Firsts {
            firsts: vec![
                Vob::from_elem(false, usize::from(grm.tokens_len()));
                usize::from(grm.rules_len())
            ],
            epsilons: Vob::from_elem(false, usize::from(grm.rules_len())),
        };

        // Loop looking for changes to the firsts set, until we reach a fixed point. For each
        // production of a rule we walk its symbols left to right, unioning in their firsts, until
        // we hit one which can't derive the empty string.
        loop {
            let mut changed = false;
            for ridx in grm.iter_rules() {
                for &pidx in grm.rule_to_prods(ridx) {
                    let mut nullable = true;
                    for sym in grm.prod(pidx) {
                        match *sym {
                            Symbol::Token(s_tidx) => {
                                if !firsts.set(ridx, s_tidx) {
                                    changed = true;
                                }
                                nullable = false;
                            }
                            Symbol::Rule(s_ridx) => {
                                if s_ridx != ridx {
                                    let (r, s) = firsts.two_mut(ridx, s_ridx);
                                    changed |= r.or(s);
                                }
                                nullable = firsts.is_epsilon_set(s_ridx);
                            }
                        }
                        if !nullable {
                            break;
                        }
                    }
                    if nullable && !firsts.is_epsilon_set(ridx) {
                        firsts.epsilons.set(usize::from(ridx), true);
                        changed = true;
                    }
                }
            }
            if !changed {
                return firsts;
            }
        }
    }

    fn two_mut(&mut self, a: RIdx, b: RIdx) -> (&mut Vob, &Vob) {
        let (a, b) = (usize::from(a), usize::from(b));
        if a < b {
            let (lo, hi) = self.firsts.split_at_mut(b);
            (&mut lo[a], &hi[0])
        } else {
            let (lo, hi) = self.firsts.split_at_mut(a);
            (&mut hi[0], &lo[b])
        }
    }

    /// Return all the firsts for rule `ridx`.
    pub fn firsts(&self, ridx: RIdx) -> &Vob {
        &self.firsts[usize::from(ridx)]
    }

    /// Returns true if the token `tidx` is in the first set for rule `ridx`.
    pub fn is_set(&self, ridx: RIdx, tidx: TIdx) -> bool {
        self.firsts[usize::from(ridx)][usize::from(tidx)]
    }

    /// Returns true if the rule `ridx` has epsilon in its first set.
    pub fn is_epsilon_set(&self, ridx: RIdx) -> bool {
        self.epsilons[usize::from(ridx)]
    }

    /// Ensures that the firsts bit for token `tidx` rule `ridx` is set. Returns true if
    /// it was already set, or false otherwise.
    pub fn set(&mut self, ridx: RIdx, tidx: TIdx) -> bool {
        let r = &mut self.firsts[usize::from(ridx)];
        if r[usize::from(tidx)] {
            true
        } else {
            r.set(usize::from(tidx), true);
            false
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{Grammar, GrammarBuilder, rule::*};

    fn has(grm: &Grammar, rn: &str, should_be: &[&str], epsilon: bool) {
        let firsts = grm.firsts();
        let ridx = grm.rule_idx(rn).unwrap();
        for tidx in grm.iter_tidxs() {
            let n = grm.token_name(tidx);
            match should_be.iter().position(|x| *x == n) {
                Some(_) => assert!(firsts.is_set(ridx, tidx), "{} missing from {}", n, rn),
                None => assert!(!firsts.is_set(ridx, tidx), "{} wrongly in {}", n, rn),
            }
        }
        assert_eq!(firsts.is_epsilon_set(ridx), epsilon);
    }

    #[test]
    fn simple() {
        let grm = GrammarBuilder::new("g")
            .rule("s", seq(vec![sym("a"), lit("b")]))
            .rule("a", optional(lit("a")))
            .build()
            .unwrap();
        has(&grm, "s", &["a", "b"], false);
        has(&grm, "a", &["a"], true);
    }

    #[test]
    fn nullable_prefix() {
        // `c` is only nullable because both `a` and `b` are: having an empty rule last is not
        // enough.
        let grm = GrammarBuilder::new("g")
            .rule("s", seq(vec![sym("c"), lit("z")]))
            .rule("c", seq(vec![sym("a"), sym("b")]))
            .rule("a", optional(lit("x")))
            .rule("b", optional(lit("y")))
            .rule("d", seq(vec![lit("w"), sym("a")]))
            .build()
            .unwrap();
        has(&grm, "c", &["x", "y"], true);
        has(&grm, "s", &["x", "y", "z"], false);
        has(&grm, "d", &["w"], false);
    }

    #[test]
    fn left_recursion() {
        let grm = GrammarBuilder::new("g")
            .rule("s", repeat1(choice(vec![lit("a"), lit("b")])))
            .build()
            .unwrap();
        has(&grm, "s_repeat1", &["a", "b"], false);
        has(&grm, "s", &["a", "b"], false);
    }
}
