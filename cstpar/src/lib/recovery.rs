use cactus::Cactus;
use cstgrammar::Span;
use csttable::{ParseAction, StateId, SymbolId};
use tracing::debug;

use crate::{
    lex_api::Lexeme,
    parser::{
        InternalError, MAX_RECOVERIES_AT_POSITION, ParseRepair, Parser, RecoveryKind, StackEntry,
        select,
    },
    tree::{Node, Tree},
};

impl Parser<'_> {
    /// Recover from a syntax error on `la` in `state`. Returns `Some(tree)` if parsing has
    /// finished, or `None` if it should continue.
    pub(crate) fn recover(
        &mut self,
        state: StateId,
        la: Lexeme,
    ) -> Result<Option<Tree>, InternalError> {
        let at = la.span().start();
        if self.recoveries_at.0 == at {
            self.recoveries_at.1 += 1;
        } else {
            self.recoveries_at = (at, 1);
        }

        match self.recovery {
            RecoveryKind::None => return self.abandon(state, la).map(Some),
            RecoveryKind::InsertPanic => {
                if la.symbol() != SymbolId::END && self.skip_one(state, la)? {
                    return Ok(None);
                }
                if self.insert_one(state, la) {
                    return Ok(None);
                }
            }
            RecoveryKind::Panic => (),
        }

        if self.recoveries_at.1 > MAX_RECOVERIES_AT_POSITION {
            debug!("Too many recoveries at {}", at);
            if la.symbol() == SymbolId::END {
                let n = self.stack.iter().filter(|e| e.node.is_some()).count();
                self.syntax_error(state, la, la.span(), Some(ParseRepair::Pop(n)));
                return Ok(Some(self.error_tree(Vec::new(), la)));
            }
            self.push_extra(Node::error(vec![Node::leaf(la, false)]));
            self.syntax_error(state, la, la.span(), Some(ParseRepair::Skip(la.span())));
            return Ok(None);
        }
        self.panic(state, la)
    }

    /// If the token after `la` is acceptable in `state`, wrap `la` in an `ERROR` node.
    fn skip_one(&mut self, state: StateId, la: Lexeme) -> Result<bool, InternalError> {
        let next = self.next_lexeme(state)?;
        self.pending.push(next);
        if next.symbol() == SymbolId::ERROR
            || self.lang.symbol_metadata(next.symbol()).extra
            || !self.acceptable(state, next.symbol())
        {
            return Ok(false);
        }
        self.push_extra(Node::error(vec![Node::leaf(la, false)]));
        self.syntax_error(state, la, la.span(), Some(ParseRepair::Skip(la.span())));
        Ok(true)
    }

    /// Look for a terminal which, if inserted before `la`, would let `la` be shifted. Named
    /// terminals are tried before anonymous ones.
    fn insert_one(&mut self, state: StateId, la: Lexeme) -> bool {
        let at = la.span().start();
        if self.last_insert == Some(at) {
            return false;
        }
        let mut candidates = self
            .lang
            .valid_symbols(state)
            .filter(|s| *s != SymbolId::END && !self.lang.symbol_metadata(*s).extra)
            .collect::<Vec<_>>();
        candidates.sort_by_key(|s| !self.lang.symbol_metadata(*s).named);

        let pstack = self.cactus();
        for m in candidates {
            if self.simulate(pstack.clone(), &[m, la.symbol()]) {
                self.last_insert = Some(at);
                self.pending.push(la);
                self.pending
                    .push(Lexeme::new_faulty(m, la.padding_start()));
                self.syntax_error(state, la, Span::empty_at(at), Some(ParseRepair::Insert(m)));
                return true;
            }
        }
        false
    }

    /// Panic mode, based on that in Compiler Design in C by Allen I. Holub p.348: skip up to
    /// `max_skip` tokens, looking for the highest state on the stack with an action on the
    /// current token. Everything popped and skipped is wrapped in an `ERROR` node.
    fn panic(&mut self, state: StateId, la: Lexeme) -> Result<Option<Tree>, InternalError> {
        let mut skipped: Vec<Lexeme> = Vec::new();
        let mut tok = la;
        loop {
            if tok.symbol() != SymbolId::ERROR {
                for d in (0..self.stack.len()).rev() {
                    if self.stack[d].is_extra() {
                        continue;
                    }
                    let st = self.stack[d].state;
                    if !self.acceptable(st, tok.symbol())
                        || (d + 1 == self.stack.len() && skipped.is_empty())
                    {
                        continue;
                    }
                    let popped = self
                        .stack
                        .drain(d + 1..)
                        .filter_map(|e| e.node)
                        .collect::<Vec<_>>();
                    let pops = popped.iter().filter(|n| !n.is_extra()).count();
                    let mut wrapped = popped;
                    wrapped.extend(skipped.iter().map(|l| leaf(*l)));
                    let repair = if pops > 0 {
                        ParseRepair::Pop(pops)
                    } else {
                        ParseRepair::Skip(cover(&skipped))
                    };
                    if !wrapped.is_empty() {
                        self.stack.push(StackEntry {
                            state: st,
                            node: Some(Node::error(wrapped)),
                        });
                    }
                    self.syntax_error(state, la, la.span(), Some(repair));
                    self.pending.push(tok);
                    return Ok(None);
                }
            }
            if tok.symbol() == SymbolId::END {
                let n = self.stack.iter().filter(|e| e.node.is_some()).count();
                self.syntax_error(state, la, la.span(), Some(ParseRepair::Pop(n)));
                let rest = skipped.iter().map(|l| leaf(*l)).collect();
                return Ok(Some(self.error_tree(rest, tok)));
            }
            if skipped.len() == self.max_skip {
                break;
            }
            skipped.push(tok);
            tok = self.next_lexeme(StateId::ERROR)?;
        }

        // Out of budget: give up on `la` alone and put the other tokens back.
        debug!("Panic mode gave up after skipping {} tokens", skipped.len());
        self.pending.push(tok);
        for l in skipped.iter().skip(1).rev() {
            self.pending.push(*l);
        }
        self.push_extra(Node::error(vec![Node::leaf(la, false)]));
        self.syntax_error(state, la, la.span(), Some(ParseRepair::Skip(la.span())));
        Ok(None)
    }

    /// Stop parsing: wrap the stack and the rest of the input in an `ERROR` root.
    fn abandon(&mut self, state: StateId, la: Lexeme) -> Result<Tree, InternalError> {
        self.syntax_error(state, la, la.span(), None);
        let mut rest = Vec::new();
        let mut tok = la;
        while tok.symbol() != SymbolId::END {
            rest.push(leaf(tok));
            tok = self.next_lexeme(StateId::ERROR)?;
        }
        Ok(self.error_tree(rest, tok))
    }

    /// Does `state` have an action on `sym` other than starting recovery?
    fn acceptable(&self, state: StateId, sym: SymbolId) -> bool {
        !matches!(
            select(self.lang.actions(state, sym)),
            None | Some(ParseAction::Recover)
        )
    }

    /// The states of the non-extra stack entries as a cactus stack, so that simulations can
    /// branch from it cheaply.
    fn cactus(&self) -> Cactus<StateId> {
        self.stack
            .iter()
            .filter(|e| !e.is_extra())
            .fold(Cactus::new(), |c, e| c.child(e.state))
    }

    /// Can `syms` be shifted one after the other starting from `pstack`? No nodes are built.
    pub(crate) fn simulate(&self, mut pstack: Cactus<StateId>, syms: &[SymbolId]) -> bool {
        for &sym in syms {
            loop {
                let Some(&st) = pstack.val() else {
                    return false;
                };
                match select(self.lang.actions(st, sym)) {
                    Some(ParseAction::Shift { state, .. }) => {
                        pstack = pstack.child(state);
                        break;
                    }
                    Some(ParseAction::ShiftExtra) => break,
                    Some(ParseAction::Reduce {
                        symbol,
                        child_count,
                        ..
                    }) => {
                        for _ in 0..child_count {
                            match pstack.parent() {
                                Some(p) => pstack = p,
                                None => return false,
                            }
                        }
                        let Some(&prior) = pstack.val() else {
                            return false;
                        };
                        match self.lang.next_state(prior, symbol) {
                            Some(n) => pstack = pstack.child(n),
                            None => return false,
                        }
                    }
                    Some(ParseAction::Accept) => return true,
                    Some(ParseAction::Recover) | None => return false,
                }
            }
        }
        true
    }
}

/// A leaf for a skipped lexeme. Unlexable characters stay extras.
fn leaf(l: Lexeme) -> Node {
    Node::leaf(l, l.symbol() == SymbolId::ERROR)
}

fn cover(lexemes: &[Lexeme]) -> Span {
    match (lexemes.first(), lexemes.last()) {
        (Some(f), Some(l)) => f.span().cover(l.span()),
        _ => Span::empty_at(0),
    }
}
