use std::{error::Error, fmt};

use cstgrammar::Span;
use csttable::{LANGUAGE_VERSION, Language, ParseAction, StateId, SymbolId};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    lex_api::{LexError, Lexeme, Lexer},
    tree::{Node, Tree},
};

/// By default, how many tokens may panic mode recovery skip before giving up on a lookahead?
pub const DEFAULT_MAX_SKIP: usize = 10;

/// How many recoveries may happen at one input position before the lookahead is skipped
/// unconditionally.
pub(crate) const MAX_RECOVERIES_AT_POSITION: usize = 3;

/// What recovery algorithm should be used when a syntax error is encountered?
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum RecoveryKind {
    /// Try skipping one token, then inserting one missing token, then panic mode.
    #[default]
    InsertPanic,
    /// Only use panic mode (Holub, Compiler Design in C, p.348).
    Panic,
    /// Don't recover: wrap the rest of the input in an `ERROR` node and stop.
    None,
}

/// Errors which mean that the language's tables are inconsistent. These are bugs in table
/// construction (or a `Language` from somewhere else), never a consequence of the user's input.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum InternalError {
    #[error("stack underflow reducing with production {production_id} in state {}", state.0)]
    StackUnderflow { state: StateId, production_id: u16 },
    #[error("no goto from state {} on symbol {}", state.0, symbol.0)]
    MissingGoto { state: StateId, symbol: SymbolId },
    #[error("state {} does not exist", .0.0)]
    BadState(StateId),
    #[error("bad action in state {} on symbol {}", state.0, symbol.0)]
    BadAction { state: StateId, symbol: SymbolId },
    #[error("lexer returned unknown symbol {}", .0.0)]
    BadSymbol(SymbolId),
    #[error("language version {found} is not supported (expected {expected})")]
    IncompatibleVersion { found: u32, expected: u32 },
}

/// After a parse error is encountered, the parser recovers by making one repair.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParseRepair {
    /// Insert a zero-width missing token.
    Insert(SymbolId),
    /// Wrap the input at a span in an `ERROR` node.
    Skip(Span),
    /// Pop this many nodes from the stack into an `ERROR` node.
    Pop(usize),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    Lexical(LexError),
    /// `found` was not valid at this point.
    Syntax { found: SymbolId },
}

/// Records a single parse error and the repair used to recover from it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    kind: ParseErrorKind,
    span: Span,
    state: StateId,
    expected: Vec<SymbolId>,
    repair: Option<ParseRepair>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ParseErrorKind::Lexical(e) => write!(f, "{} at {}", e, self.span.start()),
            ParseErrorKind::Syntax { .. } => write!(
                f,
                "Parse error at {}..{}",
                self.span.start(),
                self.span.end()
            ),
        }
    }
}

impl Error for ParseError {}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Return the state where this error was detected.
    pub fn state(&self) -> StateId {
        self.state
    }

    /// The terminals which would have been valid where this error was detected.
    pub fn expected(&self) -> &[SymbolId] {
        &self.expected
    }

    /// The repair used to recover, or `None` if parsing stopped here.
    pub fn repair(&self) -> Option<ParseRepair> {
        self.repair
    }
}

pub struct ParserBuilder<'a> {
    lang: &'a Language,
    recovery: RecoveryKind,
    max_skip: usize,
}

impl<'a> ParserBuilder<'a> {
    pub fn new(lang: &'a Language) -> Self {
        ParserBuilder {
            lang,
            recovery: RecoveryKind::default(),
            max_skip: DEFAULT_MAX_SKIP,
        }
    }

    /// Set the recoverer for this parser to `rk`.
    pub fn recovery(mut self, rk: RecoveryKind) -> Self {
        self.recovery = rk;
        self
    }

    /// Set how many tokens panic mode may skip while looking for a place to resume.
    pub fn max_skip(mut self, n: usize) -> Self {
        self.max_skip = n;
        self
    }

    /// Parse the input `lexer` reads from. Syntax and lexing errors never cause failure: they are
    /// recovered from, recorded in [Tree::errors], and marked in the tree with `ERROR` and missing
    /// nodes. `old_tree` is accepted for compatibility with incremental parsers and is ignored.
    pub fn parse(&self, lexer: &dyn Lexer, old_tree: Option<&Tree>) -> Result<Tree, InternalError> {
        if self.lang.version() != LANGUAGE_VERSION {
            return Err(InternalError::IncompatibleVersion {
                found: self.lang.version(),
                expected: LANGUAGE_VERSION,
            });
        }
        if old_tree.is_some() {
            trace!("Ignoring old tree");
        }
        Parser::new(self.lang, lexer, self.recovery, self.max_skip).lr()
    }
}

pub(crate) struct StackEntry {
    pub(crate) state: StateId,
    /// `None` only for the bottom sentinel.
    pub(crate) node: Option<Node>,
}

impl StackEntry {
    pub(crate) fn is_extra(&self) -> bool {
        self.node.as_ref().is_some_and(Node::is_extra)
    }
}

pub(crate) struct Parser<'a> {
    pub(crate) lang: &'a Language,
    lexer: &'a dyn Lexer,
    pub(crate) recovery: RecoveryKind,
    pub(crate) max_skip: usize,
    pub(crate) stack: Vec<StackEntry>,
    /// Lexemes which have been lexed but not yet consumed; the last is the next lookahead.
    pub(crate) pending: Vec<Lexeme>,
    /// Where the next lexeme will be lexed from.
    pos: usize,
    pub(crate) errors: Vec<ParseError>,
    /// The input position of the last missing token insertion.
    pub(crate) last_insert: Option<usize>,
    /// `(position, count)` of recoveries at the same input position.
    pub(crate) recoveries_at: (usize, usize),
}

impl<'a> Parser<'a> {
    fn new(
        lang: &'a Language,
        lexer: &'a dyn Lexer,
        recovery: RecoveryKind,
        max_skip: usize,
    ) -> Self {
        Parser {
            lang,
            lexer,
            recovery,
            max_skip,
            stack: vec![StackEntry {
                state: StateId::START,
                node: None,
            }],
            pending: Vec::new(),
            pos: 0,
            errors: Vec::new(),
            last_insert: None,
            recoveries_at: (0, 0),
        }
    }

    fn lr(mut self) -> Result<Tree, InternalError> {
        loop {
            let state = self.top_state();
            if usize::from(state) >= self.lang.state_count() || state == StateId::ERROR {
                return Err(InternalError::BadState(state));
            }
            let la = self.next_lexeme(state)?;
            if la.symbol() == SymbolId::ERROR {
                self.push_extra(Node::leaf(la, true));
                continue;
            }

            match select(self.lang.actions(state, la.symbol())) {
                Some(ParseAction::Shift { state: next, .. }) => {
                    if usize::from(next) >= self.lang.state_count() || next == StateId::ERROR {
                        return Err(InternalError::BadAction {
                            state,
                            symbol: la.symbol(),
                        });
                    }
                    self.stack.push(StackEntry {
                        state: next,
                        node: Some(Node::leaf(la, false)),
                    });
                }
                Some(ParseAction::ShiftExtra) => self.push_extra(Node::leaf(la, true)),
                Some(ParseAction::Reduce {
                    symbol,
                    child_count,
                    production_id,
                }) => {
                    if self.lang.is_token(symbol) {
                        return Err(InternalError::BadAction {
                            state,
                            symbol: la.symbol(),
                        });
                    }
                    self.reduce(symbol, child_count, production_id)?;
                    self.pending.push(la);
                }
                Some(ParseAction::Accept) => {
                    debug_assert_eq!(la.symbol(), SymbolId::END);
                    return Ok(self.accept(la));
                }
                Some(ParseAction::Recover) | None => {
                    if self.lang.symbol_metadata(la.symbol()).extra {
                        self.push_extra(Node::leaf(la, true));
                    } else if let Some(t) = self.recover(state, la)? {
                        return Ok(t);
                    }
                }
            }
        }
    }

    pub(crate) fn top_state(&self) -> StateId {
        self.stack.last().map_or(StateId::START, |e| e.state)
    }

    /// Push `node` as an extra without changing state.
    pub(crate) fn push_extra(&mut self, mut node: Node) {
        node.set_extra(true);
        let state = self.top_state();
        self.stack.push(StackEntry {
            state,
            node: Some(node),
        });
    }

    /// Return the next lookahead: a pending lexeme if there is one, otherwise a new lexeme lexed
    /// in `state`'s mode. Characters which can't be lexed at all become `ERROR` lexemes, with the
    /// error recorded.
    pub(crate) fn next_lexeme(&mut self, state: StateId) -> Result<Lexeme, InternalError> {
        if let Some(la) = self.pending.pop() {
            return Ok(la);
        }
        let la = match self.lexer.lex(self.pos, self.lang.lex_mode(state)) {
            Ok(la) => la,
            Err(_) => match self.lexer.lex(self.pos, self.lang.lex_mode(StateId::ERROR)) {
                Ok(la) => la,
                Err(e) => {
                    let span = e.span();
                    debug!("Unrecognized character at {}", span.start());
                    self.errors.push(ParseError {
                        kind: ParseErrorKind::Lexical(e),
                        span,
                        state,
                        expected: self.lang.valid_symbols(state).collect(),
                        repair: Some(ParseRepair::Skip(span)),
                    });
                    Lexeme::new(SymbolId::ERROR, self.pos, span)
                }
            },
        };
        if la.symbol() != SymbolId::ERROR && !self.lang.is_token(la.symbol()) {
            return Err(InternalError::BadSymbol(la.symbol()));
        }
        self.pos = la.span().end();
        Ok(la)
    }

    /// Pop `child_count` non-extra entries (and the extras between them) and push a `symbol`
    /// node built from them. Extras above the last child stay above the new node.
    fn reduce(
        &mut self,
        symbol: SymbolId,
        child_count: u16,
        production_id: u16,
    ) -> Result<(), InternalError> {
        let state = self.top_state();
        let mut top = self.stack.len();
        while top > 1 && self.stack[top - 1].is_extra() {
            top -= 1;
        }
        let mut start = top;
        let mut remaining = child_count;
        while remaining > 0 {
            if start <= 1 {
                return Err(InternalError::StackUnderflow {
                    state,
                    production_id,
                });
            }
            start -= 1;
            if !self.stack[start].is_extra() {
                remaining -= 1;
            }
        }

        let trailing = self.stack.drain(top..).collect::<Vec<_>>();
        let popped = self
            .stack
            .drain(start..)
            .filter_map(|e| e.node)
            .collect::<Vec<_>>();
        let prior = self.top_state();
        let next = self
            .lang
            .next_state(prior, symbol)
            .ok_or(InternalError::MissingGoto {
                state: prior,
                symbol,
            })?;
        let empty_at = self
            .stack
            .last()
            .and_then(|e| e.node.as_ref())
            .map_or(0, |n| n.span().end());
        let node = self.build_node(symbol, production_id, popped, empty_at);
        self.stack.push(StackEntry {
            state: next,
            node: Some(node),
        });
        self.stack.extend(trailing.into_iter().map(|e| StackEntry {
            state: next,
            node: e.node,
        }));
        Ok(())
    }

    /// Build a `symbol` node from `popped`, applying the production's fields and aliases and
    /// splicing in the children of invisible nonterminals.
    fn build_node(
        &self,
        symbol: SymbolId,
        production_id: u16,
        popped: Vec<Node>,
        empty_at: usize,
    ) -> Node {
        let fields = self.lang.field_map(production_id);
        let mut children = Vec::with_capacity(popped.len());
        let mut i = 0;
        for mut c in popped {
            if c.is_extra() {
                children.push(c);
                continue;
            }
            if let Some(a) = self.lang.alias_at(production_id, i) {
                c.set_alias(a);
            }
            if let Some(e) = fields
                .iter()
                .find(|e| !e.inherited && usize::from(e.child_index) == i)
            {
                c.set_field(e.field);
            }
            i += 1;
            if c.is_error() || self.lang.is_token(c.grammar_symbol()) || c.is_visible(self.lang)
            {
                children.push(c);
                continue;
            }
            let field = c.field();
            for mut gc in c.take_children() {
                if let Some(f) = field {
                    if gc.field().is_none() && !gc.is_extra() {
                        gc.set_field(f);
                    }
                }
                children.push(gc);
            }
        }
        Node::interior(symbol, production_id, children, empty_at)
    }

    /// The stack holds the root plus any extras either side of it: merge them into the root.
    fn accept(mut self, la: Lexeme) -> Tree {
        let mut nodes = self
            .stack
            .drain(1..)
            .filter_map(|e| e.node)
            .collect::<Vec<_>>();
        let mut roots = nodes.iter().enumerate().filter(|(_, n)| !n.is_extra());
        let root = match (roots.next(), roots.next()) {
            (Some((i, _)), None) => {
                let mut root = nodes.remove(i);
                if !nodes.is_empty() {
                    let trailing = nodes.split_off(i);
                    nodes.extend(root.take_children());
                    nodes.extend(trailing);
                    root.set_children(nodes);
                }
                root
            }
            _ => {
                let mut root = Node::error(nodes);
                root.set_extra(false);
                root
            }
        };
        self.finish(root, la)
    }

    /// Wrap everything on the stack, followed by `rest`, in an `ERROR` root.
    pub(crate) fn error_tree(&mut self, rest: Vec<Node>, end: Lexeme) -> Tree {
        let mut nodes = self
            .stack
            .drain(1..)
            .filter_map(|e| e.node)
            .collect::<Vec<_>>();
        nodes.extend(rest);
        let mut root = if nodes.is_empty() {
            Node::interior(SymbolId::ERROR, 0, nodes, end.padding_start())
        } else {
            Node::error(nodes)
        };
        root.set_extra(false);
        self.finish(root, end)
    }

    fn finish(&mut self, root: Node, end: Lexeme) -> Tree {
        let mut errors = std::mem::take(&mut self.errors);
        errors.sort_by_key(|e| e.span.start());
        Tree::new(root, errors, end.padding())
    }

    pub(crate) fn syntax_error(
        &mut self,
        state: StateId,
        la: Lexeme,
        span: Span,
        repair: Option<ParseRepair>,
    ) {
        debug!(
            "Syntax error in state {} at {}..{}: {:?}",
            state.0,
            span.start(),
            span.end(),
            repair
        );
        self.errors.push(ParseError {
            kind: ParseErrorKind::Syntax { found: la.symbol() },
            span,
            state,
            expected: self.lang.valid_symbols(state).collect(),
            repair,
        });
    }
}

/// Pick the action to perform from a (possibly multi-entry) action list: the first action which
/// doesn't only continue a repetition, or failing that the first action.
pub(crate) fn select(actions: &[ParseAction]) -> Option<ParseAction> {
    actions
        .iter()
        .find(|a| {
            !matches!(
                a,
                ParseAction::Shift {
                    repetition: true,
                    ..
                }
            )
        })
        .or_else(|| actions.first())
        .copied()
}
