use std::{collections::HashMap, error::Error, fmt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    FIdx, GrammarBuilder, PIdx, RIdx, SIdx, Symbol, TIdx,
    firsts::Firsts,
    rule::{AssocKind, Rule},
};

const START_RULE: &str = "^";
const END_TOKEN: &str = "end";

/// The ways in which a grammar can be malformed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum GrammarErrorKind {
    #[error("grammar has no rules")]
    NoRules,
    #[error("rule defined more than once")]
    DuplicateRule,
    #[error("the start rule must not be a token")]
    LexicalStartRule,
    #[error("reference to an undefined rule")]
    UnknownSymbol,
    #[error("token rules cannot reference other rules")]
    SymbolInToken,
    #[error("the word token must be a token rule")]
    InvalidWordToken,
    #[error("supertypes must be hidden, non-token rules")]
    InvalidSupertype,
    #[error("extras must be patterns, strings, or references to token rules")]
    InvalidExtra,
    #[error("too many symbols")]
    TooManySymbols,
}

/// Any error from building a [`Grammar`]. `rule` names the rule the error was found in (or
/// refers to), if there is one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GrammarError {
    pub kind: GrammarErrorKind,
    pub rule: Option<String>,
}

impl Error for GrammarError {}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.rule {
            Some(ref r) => write!(f, "{} ('{}')", self.kind, r),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl GrammarError {
    fn new(kind: GrammarErrorKind, rule: &str) -> Self {
        GrammarError {
            kind,
            rule: Some(rule.to_owned()),
        }
    }
}

/// The alias a production step is reported as.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alias {
    pub value: String,
    pub named: bool,
}

/// One symbol in a production, together with the metadata that was in force where it was
/// written.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Step {
    pub symbol: Symbol,
    pub field: Option<FIdx>,
    pub alias: Option<Alias>,
    pub precedence: i32,
    pub assoc: Option<AssocKind>,
}

/// A terminal of the grammar.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TokenInfo {
    pub name: String,
    /// The lexical rule, stripped of its `Token` and `Prec` wrappers. `None` only for the end
    /// token.
    pub rule: Option<Rule>,
    pub visible: bool,
    pub named: bool,
    /// Set for tokens that may appear anywhere (e.g. comments).
    pub extra: bool,
    pub immediate: bool,
    /// Lexical precedence, used to choose between tokens matching the same input.
    pub precedence: i32,
    /// Set if the token is a plain string literal.
    pub literal: bool,
}

/// A nonterminal of the grammar.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleInfo {
    pub name: String,
    pub visible: bool,
    pub supertype: bool,
    /// Set for rules introduced by normalisation (repetitions and aliased sequences).
    pub auxiliary: bool,
    /// Set for the auxiliary rules which implement `repeat` and `repeat1`.
    pub repetition: bool,
}

/// A normalised grammar: rules are flattened into productions of [`Step`]s over tokens and rules.
/// See the [top-level documentation](crate) for the guarantees this struct makes.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Grammar {
    name: String,
    tokens: Vec<TokenInfo>,
    rules: Vec<RuleInfo>,
    /// A list of all productions.
    prods: Vec<Vec<Symbol>>,
    /// The metadata of each production's symbols; `prod_steps[p].len() == prods[p].len()`.
    prod_steps: Vec<Vec<Step>>,
    /// A mapping from rules to their productions.
    rules_prods: Vec<Vec<PIdx>>,
    /// A mapping from productions to their corresponding rule indexes.
    prods_rules: Vec<RIdx>,
    start_prod: PIdx,
    field_names: Vec<String>,
    separators: Vec<Rule>,
    word_token: Option<TIdx>,
    expected_conflicts: usize,
}

#[derive(Clone, Default)]
struct Ctx {
    field: Option<FIdx>,
    alias: Option<Alias>,
    precedence: i32,
    assoc: Option<AssocKind>,
}

impl Ctx {
    /// The context of a freshly introduced auxiliary rule: precedence carries over, labels do
    /// not.
    fn inner(&self) -> Ctx {
        Ctx {
            field: None,
            alias: None,
            precedence: self.precedence,
            assoc: self.assoc,
        }
    }
}

type Alternatives = Vec<Vec<Step>>;

struct Normaliser<'a> {
    bld: &'a GrammarBuilder,
    tokens: Vec<TokenInfo>,
    rules: Vec<RuleInfo>,
    bodies: Vec<Alternatives>,
    /// Named token rules.
    lexical: HashMap<&'a str, TIdx>,
    /// Named non-token rules.
    syntactic: HashMap<&'a str, RIdx>,
    /// Anonymous tokens, keyed by their lexical content.
    anon: HashMap<(Rule, bool, i32), TIdx>,
    field_names: Vec<String>,
    aux_counts: HashMap<String, usize>,
}

/// Split a token rule into its content, whether it is immediate, and its lexical precedence.
fn lexical_parts(rule: &Rule) -> (&Rule, bool, i32) {
    let mut r = rule;
    let mut immediate = false;
    let mut precedence = 0;
    loop {
        match r {
            Rule::Prec { level, rule, .. } => {
                precedence = *level;
                r = &**rule;
            }
            Rule::Token {
                immediate: imm,
                rule,
            } => {
                immediate |= *imm;
                r = &**rule;
            }
            _ => return (r, immediate, precedence),
        }
    }
}

fn contains_symbol(rule: &Rule) -> bool {
    match rule {
        Rule::Symbol(_) => true,
        Rule::Blank | Rule::String(_) | Rule::Pattern(_) => false,
        Rule::Seq(rs) | Rule::Choice(rs) => rs.iter().any(contains_symbol),
        Rule::Repeat(r)
        | Rule::Repeat1(r)
        | Rule::Field { rule: r, .. }
        | Rule::Alias { rule: r, .. }
        | Rule::Prec { rule: r, .. }
        | Rule::Token { rule: r, .. } => contains_symbol(r),
    }
}

impl<'a> Normaliser<'a> {
    fn new(bld: &'a GrammarBuilder) -> Self {
        let mut field_names = Vec::new();
        for r in bld.rules.values() {
            r.collect_fields(&mut field_names);
        }
        field_names.sort_unstable();
        field_names.dedup();
        Normaliser {
            bld,
            tokens: vec![TokenInfo {
                name: END_TOKEN.to_owned(),
                rule: None,
                visible: false,
                named: true,
                extra: false,
                immediate: false,
                precedence: 0,
                literal: false,
            }],
            rules: Vec::new(),
            bodies: Vec::new(),
            lexical: HashMap::new(),
            syntactic: HashMap::new(),
            anon: HashMap::new(),
            field_names: field_names.into_iter().map(str::to_owned).collect(),
            aux_counts: HashMap::new(),
        }
    }

    fn push_token(&mut self, tok: TokenInfo) -> TIdx {
        let tidx = TIdx::from(self.tokens.len());
        self.tokens.push(tok);
        tidx
    }

    fn push_rule(&mut self, info: RuleInfo) -> RIdx {
        let ridx = RIdx::from(self.rules.len());
        self.rules.push(info);
        self.bodies.push(Vec::new());
        ridx
    }

    fn aux_name(&mut self, owner: &str, kind: &str) -> String {
        let n = self.aux_counts.entry(format!("{}_{}", owner, kind)).or_insert(0);
        *n += 1;
        format!("{}_{}{}", owner, kind, n)
    }

    fn field_idx(&self, name: &str) -> FIdx {
        // Every field name was collected up front, so the search cannot fail.
        match self.field_names.binary_search_by(|x| x.as_str().cmp(name)) {
            Ok(i) | Err(i) => FIdx::from(i),
        }
    }

    /// Assign indices to every named rule. Token rules become named tokens; everything else
    /// becomes a rule whose body is expanded later.
    fn classify(&mut self) -> Result<(), GrammarError> {
        let bld = self.bld;
        for (name, rule) in &bld.rules {
            if rule.is_lexical() {
                let (content, immediate, precedence) = lexical_parts(rule);
                if contains_symbol(content) {
                    return Err(GrammarError::new(GrammarErrorKind::SymbolInToken, name));
                }
                let literal = matches!(content, Rule::String(_));
                let tidx = self.push_token(TokenInfo {
                    name: name.clone(),
                    rule: Some(content.clone()),
                    visible: !name.starts_with('_'),
                    named: true,
                    extra: false,
                    immediate,
                    precedence,
                    literal,
                });
                self.lexical.insert(name.as_str(), tidx);
                if literal && !immediate {
                    // A string elsewhere in the grammar identical to this rule is this token.
                    self.anon.insert((content.clone(), false, precedence), tidx);
                }
            } else {
                let ridx = self.push_rule(RuleInfo {
                    name: name.clone(),
                    visible: !name.starts_with('_'),
                    supertype: false,
                    auxiliary: false,
                    repetition: false,
                });
                self.syntactic.insert(name.as_str(), ridx);
            }
        }
        Ok(())
    }

    fn anon_token(&mut self, content: &Rule, immediate: bool, precedence: i32, owner: &str) -> TIdx {
        let key = (content.clone(), immediate, precedence);
        if let Some(&tidx) = self.anon.get(&key) {
            return tidx;
        }
        let (name, visible, literal) = match content {
            Rule::String(s) if !immediate && precedence == 0 => (s.clone(), true, true),
            Rule::String(_) => (self.aux_name(owner, "token"), false, true),
            _ => (self.aux_name(owner, "token"), false, false),
        };
        let tidx = self.push_token(TokenInfo {
            name,
            rule: Some(content.clone()),
            visible,
            named: false,
            extra: false,
            immediate,
            precedence,
            literal,
        });
        self.anon.insert(key, tidx);
        tidx
    }

    fn step(&self, symbol: Symbol, ctx: &Ctx) -> Alternatives {
        vec![vec![Step {
            symbol,
            field: ctx.field,
            alias: ctx.alias.clone(),
            precedence: ctx.precedence,
            assoc: ctx.assoc,
        }]]
    }

    /// Expand `rule` into its alternatives, each a flat sequence of steps.
    fn expand(&mut self, rule: &Rule, ctx: &Ctx, owner: &str) -> Result<Alternatives, GrammarError> {
        match rule {
            Rule::Blank => Ok(vec![Vec::new()]),
            Rule::String(_) | Rule::Pattern(_) | Rule::Token { .. } => {
                let (content, immediate, precedence) = lexical_parts(rule);
                if contains_symbol(content) {
                    return Err(GrammarError::new(GrammarErrorKind::SymbolInToken, owner));
                }
                let tidx = self.anon_token(content, immediate, precedence, owner);
                Ok(self.step(Symbol::Token(tidx), ctx))
            }
            Rule::Symbol(name) => {
                if let Some(&tidx) = self.lexical.get(name.as_str()) {
                    Ok(self.step(Symbol::Token(tidx), ctx))
                } else if let Some(&ridx) = self.syntactic.get(name.as_str()) {
                    Ok(self.step(Symbol::Rule(ridx), ctx))
                } else {
                    Err(GrammarError::new(GrammarErrorKind::UnknownSymbol, name))
                }
            }
            Rule::Seq(rs) => {
                let mut acc: Alternatives = vec![Vec::new()];
                for r in rs {
                    let alts = self.expand(r, ctx, owner)?;
                    let mut next = Vec::with_capacity(acc.len() * alts.len());
                    for prefix in &acc {
                        for alt in &alts {
                            let mut v = prefix.clone();
                            v.extend(alt.iter().cloned());
                            next.push(v);
                        }
                    }
                    acc = next;
                }
                Ok(acc)
            }
            Rule::Choice(rs) => {
                let mut acc = Vec::new();
                for r in rs {
                    acc.extend(self.expand(r, ctx, owner)?);
                }
                Ok(acc)
            }
            Rule::Repeat(r) => {
                let mut alts = self.expand(&Rule::Repeat1(r.clone()), ctx, owner)?;
                alts.push(Vec::new());
                Ok(alts)
            }
            Rule::Repeat1(r) => {
                let name = self.aux_name(owner, "repeat");
                let aux = self.push_rule(RuleInfo {
                    name,
                    visible: false,
                    supertype: false,
                    auxiliary: true,
                    repetition: true,
                });
                let inner = ctx.inner();
                let alts = self.expand(r, &inner, owner)?;
                let rec = self.step(Symbol::Rule(aux), &inner).remove(0);
                let mut body = Vec::with_capacity(alts.len() * 2);
                for alt in &alts {
                    let mut v = rec.clone();
                    v.extend(alt.iter().cloned());
                    body.push(v);
                }
                body.extend(alts);
                self.bodies[usize::from(aux)] = body;
                Ok(self.step(Symbol::Rule(aux), ctx))
            }
            Rule::Field { name, rule } => {
                let mut c = ctx.clone();
                c.field = Some(self.field_idx(name));
                self.expand(rule, &c, owner)
            }
            Rule::Alias { value, named, rule } => {
                let mut c = ctx.clone();
                c.alias = Some(Alias {
                    value: value.clone(),
                    named: *named,
                });
                if rule.is_lexical() || matches!(**rule, Rule::Symbol(_)) {
                    return self.expand(rule, &c, owner);
                }
                // Anything bigger than a single symbol is moved into a hidden rule which is then
                // aliased as a whole.
                let name = self.aux_name(owner, "alias");
                let aux = self.push_rule(RuleInfo {
                    name,
                    visible: false,
                    supertype: false,
                    auxiliary: true,
                    repetition: false,
                });
                let body = self.expand(rule, &ctx.inner(), owner)?;
                self.bodies[usize::from(aux)] = body;
                Ok(self.step(Symbol::Rule(aux), &c))
            }
            Rule::Prec { level, assoc, rule } => {
                let mut c = ctx.clone();
                c.precedence = *level;
                c.assoc = *assoc;
                self.expand(rule, &c, owner)
            }
        }
    }

    fn extras(&mut self) -> Result<Vec<Rule>, GrammarError> {
        let bld = self.bld;
        let mut separators = Vec::new();
        for e in &bld.extras {
            match e {
                Rule::Symbol(name) => match self.lexical.get(name.as_str()) {
                    Some(&tidx) => self.tokens[usize::from(tidx)].extra = true,
                    None => return Err(GrammarError::new(GrammarErrorKind::InvalidExtra, name)),
                },
                r if r.is_lexical() => {
                    let (content, _, _) = lexical_parts(r);
                    if contains_symbol(content) {
                        return Err(GrammarError {
                            kind: GrammarErrorKind::InvalidExtra,
                            rule: None,
                        });
                    }
                    separators.push(content.clone());
                }
                _ => {
                    return Err(GrammarError {
                        kind: GrammarErrorKind::InvalidExtra,
                        rule: None,
                    });
                }
            }
        }
        Ok(separators)
    }
}

impl Grammar {
    /// Normalise the rules collected by `bld`. As the grammar is compiled, a new start rule `^`
    /// (with a single production referencing the user's start rule) is added as the last rule.
    pub fn new(bld: &GrammarBuilder) -> Result<Self, GrammarError> {
        let (start_name, _) = bld.rules.first().ok_or(GrammarError {
            kind: GrammarErrorKind::NoRules,
            rule: None,
        })?;

        let mut n = Normaliser::new(bld);
        n.classify()?;
        let user_start = *n
            .syntactic
            .get(start_name.as_str())
            .ok_or_else(|| GrammarError::new(GrammarErrorKind::LexicalStartRule, start_name))?;

        for (name, rule) in &bld.rules {
            if let Some(&ridx) = n.syntactic.get(name.as_str()) {
                let body = n.expand(rule, &Ctx::default(), name)?;
                n.bodies[usize::from(ridx)] = body;
            }
        }
        let separators = n.extras()?;

        let word_token = match bld.word {
            Some(ref w) => match n.lexical.get(w.as_str()) {
                Some(&tidx) => Some(tidx),
                None => return Err(GrammarError::new(GrammarErrorKind::InvalidWordToken, w)),
            },
            None => None,
        };
        for st in &bld.supertypes {
            match n.syntactic.get(st.as_str()) {
                Some(&ridx) if !n.rules[usize::from(ridx)].visible => {
                    n.rules[usize::from(ridx)].supertype = true;
                }
                _ => return Err(GrammarError::new(GrammarErrorKind::InvalidSupertype, st)),
            }
        }

        let start_rule = n.push_rule(RuleInfo {
            name: START_RULE.to_owned(),
            visible: false,
            supertype: false,
            auxiliary: true,
            repetition: false,
        });
        n.bodies[usize::from(start_rule)] = vec![vec![Step {
            symbol: Symbol::Rule(user_start),
            field: None,
            alias: None,
            precedence: 0,
            assoc: None,
        }]];

        if n.tokens.len() + n.rules.len() >= usize::from(u16::MAX) {
            return Err(GrammarError {
                kind: GrammarErrorKind::TooManySymbols,
                rule: None,
            });
        }

        let mut prods = Vec::new();
        let mut prod_steps = Vec::new();
        let mut rules_prods = vec![Vec::new(); n.rules.len()];
        let mut prods_rules = Vec::new();
        let mut start_prod = PIdx(0);
        for (ridx, body) in n.bodies.drain(..).enumerate() {
            let mut seen: Vec<Vec<Step>> = Vec::with_capacity(body.len());
            for alt in body {
                if seen.contains(&alt) {
                    continue;
                }
                let pidx = PIdx::from(prods.len());
                if ridx == usize::from(start_rule) {
                    start_prod = pidx;
                }
                prods.push(alt.iter().map(|s| s.symbol).collect());
                prod_steps.push(alt.clone());
                rules_prods[ridx].push(pidx);
                prods_rules.push(RIdx::from(ridx));
                seen.push(alt);
            }
        }

        Ok(Grammar {
            name: bld.name.clone(),
            tokens: n.tokens,
            rules: n.rules,
            prods,
            prod_steps,
            rules_prods,
            prods_rules,
            start_prod,
            field_names: n.field_names,
            separators,
            word_token,
            expected_conflicts: bld.expected_conflicts,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many productions does this grammar have?
    pub fn prods_len(&self) -> PIdx {
        PIdx::from(self.prods.len())
    }

    /// Return an iterator which produces (in order from `0..self.prods_len()`) all this
    /// grammar's valid `PIdx`s.
    pub fn iter_pidxs(&self) -> impl Iterator<Item = PIdx> + use<> {
        (0..self.prods.len()).map(PIdx::from)
    }

    /// Get the sequence of symbols for production `pidx`. Panics if `pidx` doesn't exist.
    pub fn prod(&self, pidx: PIdx) -> &[Symbol] {
        &self.prods[usize::from(pidx)]
    }

    /// Get the steps (symbols plus metadata) of production `pidx`.
    pub fn prod_steps(&self, pidx: PIdx) -> &[Step] {
        &self.prod_steps[usize::from(pidx)]
    }

    /// How many symbols does production `pidx` have? Panics if `pidx` doesn't exist.
    pub fn prod_len(&self, pidx: PIdx) -> SIdx {
        SIdx::from(self.prods[usize::from(pidx)].len())
    }

    /// Return the rule index of the production `pidx`. Panics if `pidx` doesn't exist.
    pub fn prod_to_rule(&self, pidx: PIdx) -> RIdx {
        self.prods_rules[usize::from(pidx)]
    }

    /// The precedence and associativity a reduction of `pidx` competes with: those of its last
    /// step. Empty productions have precedence 0 and no associativity.
    pub fn prod_precedence(&self, pidx: PIdx) -> (i32, Option<AssocKind>) {
        match self.prod_steps[usize::from(pidx)].last() {
            Some(s) => (s.precedence, s.assoc),
            None => (0, None),
        }
    }

    /// Return the production index of the start rule's sole production.
    pub fn start_prod(&self) -> PIdx {
        self.start_prod
    }

    /// How many rules does this grammar have?
    pub fn rules_len(&self) -> RIdx {
        RIdx::from(self.rules.len())
    }

    /// Return an iterator which produces (in order from `0..self.rules_len()`) all this
    /// grammar's valid `RIdx`s.
    pub fn iter_rules(&self) -> impl Iterator<Item = RIdx> + use<> {
        (0..self.rules.len()).map(RIdx::from)
    }

    /// Return the productions for rule `ridx`. Panics if `ridx` doesn't exist.
    pub fn rule_to_prods(&self, ridx: RIdx) -> &[PIdx] {
        &self.rules_prods[usize::from(ridx)]
    }

    pub fn rule(&self, ridx: RIdx) -> &RuleInfo {
        &self.rules[usize::from(ridx)]
    }

    /// Return the name of rule `ridx`. Panics if `ridx` doesn't exist.
    pub fn rule_name(&self, ridx: RIdx) -> &str {
        &self.rules[usize::from(ridx)].name
    }

    /// Return the index of the rule named `n` or `None` if it doesn't exist.
    pub fn rule_idx(&self, n: &str) -> Option<RIdx> {
        self.rules.iter().position(|r| r.name == n).map(RIdx::from)
    }

    /// What is the index of the (internally added) start rule?
    pub fn start_rule_idx(&self) -> RIdx {
        self.prod_to_rule(self.start_prod)
    }

    /// How many tokens does this grammar have?
    pub fn tokens_len(&self) -> TIdx {
        TIdx::from(self.tokens.len())
    }

    /// Return an iterator which produces (in order from `0..self.tokens_len()`) all this
    /// grammar's valid `TIdx`s.
    pub fn iter_tidxs(&self) -> impl Iterator<Item = TIdx> + use<> {
        (0..self.tokens.len()).map(TIdx::from)
    }

    /// Return the index of the end token.
    pub fn eof_token_idx(&self) -> TIdx {
        TIdx(0)
    }

    pub fn token(&self, tidx: TIdx) -> &TokenInfo {
        &self.tokens[usize::from(tidx)]
    }

    /// Return the name of token `tidx`. Panics if `tidx` doesn't exist.
    pub fn token_name(&self, tidx: TIdx) -> &str {
        &self.tokens[usize::from(tidx)].name
    }

    /// Return the index of the first token named `n` or `None` if it doesn't exist.
    pub fn token_idx(&self, n: &str) -> Option<TIdx> {
        self.tokens.iter().position(|t| t.name == n).map(TIdx::from)
    }

    /// The tokens that may appear anywhere in the input.
    pub fn iter_extras(&self) -> impl Iterator<Item = TIdx> + '_ {
        self.iter_tidxs().filter(|t| self.tokens[usize::from(*t)].extra)
    }

    /// The lexical rules of the anonymous extras, which are skipped rather than tokenised.
    pub fn separators(&self) -> &[Rule] {
        &self.separators
    }

    pub fn word_token(&self) -> Option<TIdx> {
        self.word_token
    }

    /// Field names, sorted.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn field_name(&self, fidx: FIdx) -> &str {
        &self.field_names[usize::from(fidx)]
    }

    pub fn expected_conflicts(&self) -> usize {
        self.expected_conflicts
    }

    /// Return the name of `sym`.
    pub fn symbol_name(&self, sym: Symbol) -> &str {
        match sym {
            Symbol::Rule(ridx) => self.rule_name(ridx),
            Symbol::Token(tidx) => self.token_name(tidx),
        }
    }

    /// Returns a string representation of `pidx` e.g. `expr: expr "+" term`.
    pub fn pp_prod(&self, pidx: PIdx) -> String {
        let mut sprod = String::new();
        let ridx = self.prod_to_rule(pidx);
        sprod.push_str(self.rule_name(ridx));
        sprod.push(':');
        for sym in self.prod(pidx) {
            let s = match sym {
                Symbol::Token(tidx) => format!("\"{}\"", self.token_name(*tidx)),
                Symbol::Rule(ridx) => self.rule_name(*ridx).to_string(),
            };
            sprod.push_str(&format!(" {}", s));
        }
        sprod
    }

    /// Return a `Firsts` struct for this grammar.
    pub fn firsts(&self) -> Firsts {
        Firsts::new(self)
    }
}
