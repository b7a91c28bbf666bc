use std::collections::HashMap;

use cstgrammar::{Alias, FIdx, Grammar, GrammarError, PIdx, RIdx, Symbol, TIdx, rule::Rule};
use fnv::FnvHashMap;
use thiserror::Error;
use tracing::debug;

use crate::{
    StIdx,
    language::{
        Conflict, FieldId, FieldMapEntry, FieldMapSlice, LANGUAGE_VERSION, Language, LexAccept,
        LexMode, LexTable, StateId, SymbolId, SymbolMetadata,
    },
    lexgen::{LexItem, LexTableBuilder},
    pager::pager_stategraph,
    parsetable::{ActionArena, ActionList, ParseAction, ParseTable, state_order},
    stategraph::StateGraph,
    statetable::{Action, StateTable},
};

/// Any error from turning a grammar into a [`Language`].
#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error("{found} conflicts were resolved by default but at most {expected} were expected")]
    UnexpectedConflicts { found: usize, expected: usize },
    #[error("invalid pattern in token '{token}': {msg}")]
    Regex { token: String, msg: String },
    #[error("token '{token}' uses an unsupported {what}")]
    UnsupportedPattern { token: String, what: &'static str },
    #[error("token '{token}' matches the empty string")]
    EmptyToken { token: String },
    #[error("too many states")]
    TooManyStates,
    #[error("too many symbols")]
    TooManySymbols,
}

/// Builds a [`Language`] from a [`Grammar`].
///
/// ```
/// use cstgrammar::{GrammarBuilder, rule::*};
/// use csttable::{LanguageBuilder, StateId};
///
/// let grm = GrammarBuilder::new("list")
///     .rule("source_file", repeat(sym("identifier")))
///     .rule("identifier", pat("[a-z]+"))
///     .extra(pat(r"\s"))
///     .build()
///     .unwrap();
/// let lang = LanguageBuilder::new(grm).build().unwrap();
/// let ident = lang.symbol_for_name("identifier", true).unwrap();
/// assert!(lang.has_actions(StateId::START, ident));
/// ```
pub struct LanguageBuilder {
    grm: Grammar,
}

impl LanguageBuilder {
    pub fn new(grm: Grammar) -> Self {
        LanguageBuilder { grm }
    }

    pub fn build(self) -> Result<Language, TableError> {
        let grm = &self.grm;
        let sg = pager_stategraph(grm);
        let st = StateTable::new(grm, &sg);
        let conflicts = st.conflicts();
        if conflicts.len() > grm.expected_conflicts() {
            return Err(TableError::UnexpectedConflicts {
                found: conflicts.len(),
                expected: grm.expected_conflicts(),
            });
        }
        let state_count = usize::from(sg.all_states_len()) + 1;
        if state_count >= usize::from(u16::MAX) {
            return Err(TableError::TooManyStates);
        }

        let syms = SymbolTables::new(grm)?;
        let prods = ProductionTables::new(grm, &syms);
        let lex = LexTables::new(grm, &sg, &st)?;

        // Language state 0 is the error state and 1 is the start state; the rest follow in graph
        // order. `pre[stidx]` is a graph state's number before large states are moved forward.
        let mut pre = vec![0; usize::from(sg.all_states_len())];
        let mut next = 2;
        for stidx in sg.iter_stidxs() {
            if stidx == sg.start_state() {
                pre[usize::from(stidx)] = 1;
            } else {
                pre[usize::from(stidx)] = next;
                next += 1;
            }
        }
        let tokens_len = usize::from(grm.tokens_len());
        let mut entry_counts = vec![0; state_count];
        entry_counts[0] = tokens_len;
        for stidx in sg.iter_stidxs() {
            let actions = grm
                .iter_tidxs()
                .filter(|t| st.action(stidx, *t) != Action::Error || grm.token(*t).extra)
                .count();
            let gotos = grm
                .iter_rules()
                .filter(|r| st.goto(stidx, *r).is_some())
                .count();
            entry_counts[pre[usize::from(stidx)]] = actions + gotos;
        }
        let (remap, large_state_count) = state_order(&entry_counts);
        let lang_state = |stidx: StIdx| StateId(remap[pre[usize::from(stidx)]]);

        let mut arena = ActionArena::new();
        let mut rows = vec![Vec::new(); state_count];
        let mut lex_modes = vec![LexMode::default(); state_count];
        let mut error_row = Vec::with_capacity(tokens_len);
        for tidx in grm.iter_tidxs() {
            let action = if grm.token(tidx).extra {
                ParseAction::ShiftExtra
            } else {
                ParseAction::Recover
            };
            let i = arena.intern(ActionList {
                reusable: false,
                actions: vec![action],
            });
            error_row.push((syms.token(tidx), i));
        }
        rows[usize::from(remap[0])] = error_row;
        lex_modes[usize::from(remap[0])] = lex.error_mode;

        for stidx in sg.iter_stidxs() {
            let mut row = Vec::new();
            for tidx in grm.iter_tidxs() {
                let actions = match st.action(stidx, tidx) {
                    Action::Shift(to) => vec![ParseAction::Shift {
                        state: lang_state(to),
                        repetition: is_repetition(grm, &sg, stidx, tidx),
                    }],
                    Action::Reduce(pidx) => vec![ParseAction::Reduce {
                        symbol: syms.rule(grm.prod_to_rule(pidx)),
                        child_count: grm.prod(pidx).len() as u16,
                        production_id: prods.pids[usize::from(pidx)],
                    }],
                    Action::Accept => vec![ParseAction::Accept],
                    Action::Error if grm.token(tidx).extra => vec![ParseAction::ShiftExtra],
                    Action::Error => continue,
                };
                let i = arena.intern(ActionList {
                    reusable: true,
                    actions,
                });
                row.push((syms.token(tidx), i));
            }
            for ridx in grm.iter_rules() {
                if let Some(to) = st.goto(stidx, ridx) {
                    row.push((syms.rule(ridx), lang_state(to).0));
                }
            }
            let id = usize::from(lang_state(stidx));
            rows[id] = row;
            lex_modes[id] = lex.modes[usize::from(stidx)];
        }

        debug!(
            "{}: {} states ({} large), {} action lists, {} lexer states",
            grm.name(),
            state_count,
            large_state_count,
            arena.len(),
            lex.table.states.len()
        );

        let mut lang_conflicts = Vec::with_capacity(conflicts.len());
        for (tidx, pidx, _) in conflicts.sr_conflicts() {
            lang_conflicts.push(Conflict::ShiftReduce {
                token: grm.token_name(*tidx).to_owned(),
                production: grm.pp_prod(*pidx),
            });
        }
        for (pidx, r_pidx, _) in conflicts.rr_conflicts() {
            lang_conflicts.push(Conflict::ReduceReduce {
                first: grm.pp_prod(*pidx),
                second: grm.pp_prod(*r_pidx),
            });
        }

        let symbol_count = syms.symbol_count;
        let mut field_names = vec![String::new()];
        field_names.extend(grm.field_names().iter().cloned());
        Ok(Language {
            version: LANGUAGE_VERSION,
            name: grm.name().to_owned(),
            symbol_count,
            alias_count: syms.alias_count,
            token_count: tokens_len,
            state_count,
            production_id_count: prods.slices.len(),
            max_alias_sequence_length: prods.max_len,
            symbol_names: syms.names,
            symbol_metadata: syms.metadata,
            public_symbol_map: syms.public,
            field_names,
            field_map_slices: prods.slices,
            field_map_entries: prods.entries,
            alias_sequences: prods.alias_sequences,
            parse_table: ParseTable::encode(
                &rows,
                large_state_count,
                symbol_count,
                arena.into_lists(),
            ),
            lex_modes,
            lex_table: lex.table,
            keyword_lex_table: lex.keyword_table,
            keyword_capture_token: lex.keyword_capture_token,
            conflicts: lang_conflicts,
        })
    }
}

/// Does every item which can shift `tidx` in `stidx` belong to a repetition rule?
fn is_repetition(grm: &Grammar, sg: &StateGraph, stidx: StIdx, tidx: TIdx) -> bool {
    let mut any = false;
    for &(pidx, dot) in sg.closed_state(stidx).items.keys() {
        let prod = grm.prod(pidx);
        if usize::from(dot) < prod.len() && prod[usize::from(dot)] == Symbol::Token(tidx) {
            if !grm.rule(grm.prod_to_rule(pidx)).repetition {
                return false;
            }
            any = true;
        }
    }
    any
}

/// The symbol with index `i`. `u16::MAX` is never a valid id.
fn symbol_id(i: usize) -> Result<SymbolId, TableError> {
    u16::try_from(i)
        .ok()
        .filter(|id| *id < u16::MAX)
        .map(SymbolId)
        .ok_or(TableError::TooManySymbols)
}

/// Symbol names and metadata, in `SymbolId` order: tokens, then rules, then aliases.
struct SymbolTables<'a> {
    tokens_len: usize,
    symbol_count: usize,
    alias_count: usize,
    names: Vec<String>,
    metadata: Vec<SymbolMetadata>,
    public: Vec<SymbolId>,
    aliases: HashMap<&'a Alias, SymbolId>,
}

impl<'a> SymbolTables<'a> {
    fn new(grm: &'a Grammar) -> Result<Self, TableError> {
        let tokens_len = usize::from(grm.tokens_len());
        let symbol_count = tokens_len + usize::from(grm.rules_len());
        // Every token and rule id, and so the `as u16` casts below, must fit.
        symbol_id(symbol_count.saturating_sub(1))?;
        let mut names = Vec::with_capacity(symbol_count);
        let mut metadata = Vec::with_capacity(symbol_count);
        for tidx in grm.iter_tidxs() {
            let tok = grm.token(tidx);
            names.push(tok.name.clone());
            metadata.push(SymbolMetadata {
                visible: tok.visible,
                named: tok.named,
                supertype: false,
                extra: tok.extra,
            });
        }
        for ridx in grm.iter_rules() {
            let r = grm.rule(ridx);
            names.push(r.name.clone());
            metadata.push(SymbolMetadata {
                visible: r.visible,
                named: true,
                supertype: r.supertype,
                extra: false,
            });
        }

        let mut aliases = HashMap::new();
        for pidx in grm.iter_pidxs() {
            for a in grm.prod_steps(pidx).iter().filter_map(|s| s.alias.as_ref()) {
                if aliases.contains_key(a) {
                    continue;
                }
                aliases.insert(a, symbol_id(names.len())?);
                names.push(a.value.clone());
                metadata.push(SymbolMetadata {
                    visible: true,
                    named: a.named,
                    supertype: false,
                    extra: false,
                });
            }
        }

        // Symbols which look the same from the outside are reported as the first of them.
        let public = {
            let mut first = HashMap::new();
            let mut public = Vec::with_capacity(names.len());
            for (i, (n, md)) in names.iter().zip(metadata.iter()).enumerate() {
                let id = *first
                    .entry((n.as_str(), md.named, md.visible))
                    .or_insert(SymbolId(i as u16));
                public.push(id);
            }
            public
        };

        Ok(SymbolTables {
            tokens_len,
            symbol_count,
            alias_count: names.len() - symbol_count,
            names,
            metadata,
            public,
            aliases,
        })
    }

    fn token(&self, tidx: TIdx) -> SymbolId {
        SymbolId(usize::from(tidx) as u16)
    }

    fn rule(&self, ridx: RIdx) -> SymbolId {
        SymbolId((self.tokens_len + usize::from(ridx)) as u16)
    }
}

/// Field maps and alias sequences, deduplicated into production ids.
struct ProductionTables {
    /// The production id of each `PIdx`.
    pids: Vec<u16>,
    slices: Vec<FieldMapSlice>,
    entries: Vec<FieldMapEntry>,
    alias_sequences: Vec<SymbolId>,
    max_len: usize,
}

impl ProductionTables {
    fn new(grm: &Grammar, syms: &SymbolTables) -> Self {
        let field_id = |f: FIdx| FieldId(usize::from(f) as u16 + 1);
        // The fields directly inside each rule: inherited by anyone using the rule as a hidden
        // child.
        let mut rule_fields = vec![Vec::new(); usize::from(grm.rules_len())];
        for pidx in grm.iter_pidxs() {
            let fields = &mut rule_fields[usize::from(grm.prod_to_rule(pidx))];
            fields.extend(grm.prod_steps(pidx).iter().filter_map(|s| s.field.map(field_id)));
        }
        for fields in &mut rule_fields {
            fields.sort_unstable();
            fields.dedup();
        }

        let max_len = grm
            .iter_pidxs()
            .map(|p| grm.prod(p).len())
            .max()
            .unwrap_or(0);
        let mut pids = Vec::with_capacity(usize::from(grm.prods_len()));
        let mut seen: FnvHashMap<(Vec<FieldMapEntry>, Vec<SymbolId>), u16> = FnvHashMap::default();
        let mut slices = vec![FieldMapSlice::default()];
        let mut entries = Vec::new();
        let mut alias_sequences = vec![SymbolId(0); max_len];
        for pidx in grm.iter_pidxs() {
            let (fm, aseq) = Self::production(grm, syms, &rule_fields, pidx, field_id);
            if fm.is_empty() && aseq.is_empty() {
                pids.push(0);
                continue;
            }
            let next = slices.len() as u16;
            let pid = *seen.entry((fm.clone(), aseq.clone())).or_insert_with(|| {
                slices.push(FieldMapSlice {
                    index: entries.len() as u16,
                    length: fm.len() as u16,
                });
                entries.extend(fm);
                let start = alias_sequences.len();
                alias_sequences.resize(start + max_len, SymbolId(0));
                alias_sequences[start..start + aseq.len()].copy_from_slice(&aseq);
                next
            });
            pids.push(pid);
        }
        ProductionTables {
            pids,
            slices,
            entries,
            alias_sequences,
            max_len,
        }
    }

    /// Return the field map entries and the alias sequence (without trailing blanks) of `pidx`.
    fn production(
        grm: &Grammar,
        syms: &SymbolTables,
        rule_fields: &[Vec<FieldId>],
        pidx: PIdx,
        field_id: impl Fn(FIdx) -> FieldId,
    ) -> (Vec<FieldMapEntry>, Vec<SymbolId>) {
        let steps = grm.prod_steps(pidx);
        let mut fm = Vec::new();
        for (i, s) in steps.iter().enumerate() {
            let child_index = i as u16;
            if let Some(f) = s.field {
                fm.push(FieldMapEntry {
                    field: field_id(f),
                    child_index,
                    inherited: false,
                });
            }
            if let Symbol::Rule(ridx) = s.symbol {
                if !grm.rule(ridx).visible && s.alias.is_none() {
                    fm.extend(rule_fields[usize::from(ridx)].iter().map(|f| FieldMapEntry {
                        field: *f,
                        child_index,
                        inherited: true,
                    }));
                }
            }
        }
        fm.sort_by_key(|e| (e.field, e.child_index, e.inherited));
        fm.dedup();
        let mut aseq = steps
            .iter()
            .map(|s| match s.alias {
                Some(ref a) => syms.aliases[a],
                None => SymbolId(0),
            })
            .collect::<Vec<_>>();
        while aseq.last() == Some(&SymbolId(0)) {
            aseq.pop();
        }
        (fm, aseq)
    }
}

/// The lexer DFAs and the lex mode of each graph state.
struct LexTables {
    table: LexTable,
    modes: Vec<LexMode>,
    error_mode: LexMode,
    keyword_table: Option<LexTable>,
    keyword_capture_token: Option<SymbolId>,
}

impl LexTables {
    fn new(grm: &Grammar, sg: &StateGraph, st: &StateTable) -> Result<Self, TableError> {
        let sym = |tidx: TIdx| SymbolId(usize::from(tidx) as u16);
        let item = |tidx: TIdx, rule: &Rule| {
            let tok = grm.token(tidx);
            LexItem {
                accept: LexAccept::Token(sym(tidx)),
                name: tok.name.clone(),
                rule: rule.clone(),
                precedence: tok.precedence,
                literal: tok.literal,
            }
        };

        let keywords = match grm.word_token() {
            Some(word) => {
                let word_rule = grm.token(word).rule.clone().unwrap_or(Rule::Blank);
                let items = [item(word, &word_rule)];
                let mut bld = LexTableBuilder::new(&items)?;
                let e = bld.add_entry(&[0])?;
                let word_table = bld.finish();
                grm.iter_tidxs()
                    .filter(|t| {
                        let tok = grm.token(*t);
                        *t != word
                            && !tok.immediate
                            && !tok.extra
                            && match tok.rule {
                                Some(Rule::String(ref s)) => word_table.full_match(e, s).is_some(),
                                _ => false,
                            }
                    })
                    .collect::<Vec<_>>()
            }
            None => Vec::new(),
        };

        let mut items = Vec::new();
        let mut item_of = vec![None; usize::from(grm.tokens_len())];
        for tidx in grm.iter_tidxs() {
            if keywords.contains(&tidx) {
                continue;
            }
            if let Some(ref r) = grm.token(tidx).rule {
                item_of[usize::from(tidx)] = Some(items.len());
                items.push(item(tidx, r));
            }
        }
        let first_sep = items.len();
        for (i, r) in grm.separators().iter().enumerate() {
            items.push(LexItem {
                accept: LexAccept::Separator,
                name: format!("separator{}", i + 1),
                rule: r.clone(),
                precedence: 0,
                literal: false,
            });
        }

        let mut bld = LexTableBuilder::new(&items)?;
        // Return the lex mode recognising `valid`, plus separators.
        let mut mode = |valid: &[TIdx]| -> Result<LexMode, TableError> {
            let mut idxs = Vec::new();
            let mut after = Vec::new();
            for t in valid {
                if let Some(i) = item_of[usize::from(*t)] {
                    idxs.push(i);
                    if !grm.token(*t).immediate {
                        after.push(i);
                    }
                }
            }
            idxs.extend(first_sep..items.len());
            after.extend(first_sep..items.len());
            Ok(LexMode {
                lex_state: bld.add_entry(&idxs)?,
                lex_state_after_padding: bld.add_entry(&after)?,
            })
        };

        let word = grm.word_token();
        let to_lexed = |t: TIdx| match word {
            Some(w) if keywords.contains(&t) => w,
            _ => t,
        };
        // Immediate tokens only make sense in the context which expects them (e.g. string
        // contents), so the error state never tries them.
        let all = grm
            .iter_tidxs()
            .skip(1)
            .filter(|t| !grm.token(*t).immediate)
            .map(to_lexed)
            .collect::<Vec<_>>();
        let error_mode = mode(&all)?;
        let mut modes = Vec::with_capacity(usize::from(sg.all_states_len()));
        for stidx in sg.iter_stidxs() {
            let mut valid = st
                .state_actions(stidx)
                .filter(|t| *t != grm.eof_token_idx())
                .map(to_lexed)
                .chain(grm.iter_extras())
                .collect::<Vec<_>>();
            valid.sort_unstable();
            valid.dedup();
            modes.push(mode(&valid)?);
        }
        let table = bld.finish();

        let (keyword_table, keyword_capture_token) = match word {
            Some(w) if !keywords.is_empty() => {
                let kw_items = keywords
                    .iter()
                    .filter_map(|t| grm.token(*t).rule.as_ref().map(|r| item(*t, r)))
                    .collect::<Vec<_>>();
                let mut kbld = LexTableBuilder::new(&kw_items)?;
                kbld.add_entry(&(0..kw_items.len()).collect::<Vec<_>>())?;
                (Some(kbld.finish()), Some(sym(w)))
            }
            _ => (None, None),
        };

        Ok(LexTables {
            table,
            modes,
            error_mode,
            keyword_table,
            keyword_capture_token,
        })
    }
}

#[cfg(test)]
mod test {
    use cstgrammar::{GrammarBuilder, rule::*};

    use super::{LanguageBuilder, TableError, symbol_id};
    use crate::{
        Language, LexAccept, ParseAction, StateId, SymbolId,
        language::FieldMapEntry,
    };

    fn expr() -> GrammarBuilder {
        GrammarBuilder::new("expr")
            .rule(
                "source_file",
                repeat(seq(vec![sym("_expression"), lit(";")])),
            )
            .rule(
                "_expression",
                choice(vec![
                    sym("identifier"),
                    sym("binary"),
                    sym("let_expression"),
                ]),
            )
            .rule(
                "binary",
                prec_left(
                    1,
                    seq(vec![
                        field("left", sym("_expression")),
                        field("operator", lit("+")),
                        field("right", sym("_expression")),
                    ]),
                ),
            )
            .rule(
                "let_expression",
                seq(vec![
                    lit("let"),
                    alias_named(sym("identifier"), "name"),
                    lit("="),
                    field("value", sym("_expression")),
                ]),
            )
            .rule("identifier", pat("[a-z_]+"))
            .rule("comment", token(seq(vec![lit("%"), pat(".*")])))
            .extra(pat(r"\s"))
            .extra(sym("comment"))
            .word("identifier")
    }

    fn sym_named(lang: &Language, name: &str) -> SymbolId {
        (0..lang.symbol_count() + lang.alias_count())
            .map(|i| SymbolId(i as u16))
            .find(|s| lang.symbol_name(*s) == name)
            .unwrap()
    }

    /// Find a production id reducing to `name`.
    fn reduce_pid(lang: &Language, name: &str) -> u16 {
        let target = sym_named(lang, name);
        for st in 0..lang.state_count() {
            for t in 0..lang.token_count() {
                for a in lang.actions(StateId(st as u16), SymbolId(t as u16)) {
                    if let ParseAction::Reduce {
                        symbol,
                        production_id,
                        ..
                    } = a
                    {
                        if *symbol == target {
                            return *production_id;
                        }
                    }
                }
            }
        }
        panic!("no reduction to {}", name);
    }

    #[test]
    fn symbols_and_tables() {
        let lang = LanguageBuilder::new(expr().build().unwrap()).build().unwrap();
        assert!(lang.conflicts().is_empty());
        assert_eq!(lang.symbol_name(SymbolId::END), "end");
        assert_eq!(lang.symbol_name(SymbolId::ERROR), "ERROR");
        let ident = sym_named(&lang, "identifier");
        let comment = sym_named(&lang, "comment");
        assert!(lang.is_token(ident));
        assert!(lang.symbol_metadata(comment).extra);
        assert!(!lang.symbol_metadata(sym_named(&lang, "_expression")).visible);
        assert_eq!(lang.symbol_for_name("binary", true), Some(sym_named(&lang, "binary")));
        assert_eq!(lang.symbol_for_name("+", false), Some(sym_named(&lang, "+")));
        assert_eq!(lang.symbol_for_name("+", true), None);

        assert_eq!(lang.actions(StateId::ERROR, ident), &[ParseAction::Recover]);
        assert_eq!(lang.actions(StateId::ERROR, comment), &[ParseAction::ShiftExtra]);
        assert_eq!(lang.actions(StateId::START, comment), &[ParseAction::ShiftExtra]);
        assert!(lang.has_actions(StateId::START, ident));
        assert!(lang.has_actions(StateId::START, SymbolId::END));
        assert!(!lang.has_actions(StateId::START, sym_named(&lang, "+")));
        assert!(lang.valid_symbols(StateId::START).any(|s| s == ident));
        let binary = sym_named(&lang, "binary");
        assert!(lang.next_state(StateId::START, binary).is_some());
        assert_eq!(lang.next_state(StateId::START, ident), None);
    }

    #[test]
    fn fields_and_aliases() {
        let lang = LanguageBuilder::new(expr().build().unwrap()).build().unwrap();
        assert_eq!(lang.field_count(), 4);
        assert_eq!(lang.field_id_for_name("left").map(|f| f.0), Some(1));
        assert_eq!(lang.field_name(crate::FieldId(4)), Some("value"));
        assert_eq!(lang.field_name(crate::FieldId(0)), None);

        let pid = reduce_pid(&lang, "binary");
        let fm = lang.field_map(pid);
        let names = fm
            .iter()
            .map(|e| (lang.field_name(e.field).unwrap(), e.child_index, e.inherited))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![("left", 0, false), ("operator", 1, false), ("right", 2, false)]
        );
        assert_eq!(lang.alias_at(pid, 0), None);

        let pid = reduce_pid(&lang, "let_expression");
        let alias = lang.alias_at(pid, 1).unwrap();
        assert_eq!(lang.symbol_name(alias), "name");
        assert!(lang.symbol_metadata(alias).named && lang.symbol_metadata(alias).visible);
        assert_eq!(lang.alias_at(pid, 0), None);
        assert_eq!(
            lang.field_map(pid),
            &[FieldMapEntry {
                field: lang.field_id_for_name("value").unwrap(),
                child_index: 3,
                inherited: false
            }]
        );
    }

    #[test]
    fn keywords() {
        let lang = LanguageBuilder::new(expr().build().unwrap()).build().unwrap();
        let ident = sym_named(&lang, "identifier");
        let let_ = sym_named(&lang, "let");
        assert_eq!(lang.keyword_capture_token(), Some(ident));
        let kw = lang.keyword_lex_table().unwrap();
        assert_eq!(kw.full_match(0, "let"), Some(LexAccept::Token(let_)));
        assert_eq!(kw.full_match(0, "lets"), None);
        let mode = lang.lex_mode(StateId::START);
        assert_eq!(
            lang.lex_table().full_match(mode.lex_state, "let"),
            Some(LexAccept::Token(ident))
        );
        assert_eq!(
            lang.lex_table().longest_match(mode.lex_state, " % x\n"),
            Some((LexAccept::Separator, 1))
        );
    }

    #[test]
    fn immediate_tokens() {
        let grm = GrammarBuilder::new("imm")
            .rule(
                "source_file",
                seq(vec![sym("identifier"), optional(token_immediate(lit("!")))]),
            )
            .rule("identifier", pat("[a-z]+"))
            .extra(pat(r"\s"))
            .build()
            .unwrap();
        let lang = LanguageBuilder::new(grm).build().unwrap();
        let ident = sym_named(&lang, "identifier");
        let bang = sym_named(&lang, "source_file_token1");
        let st = match lang.actions(StateId::START, ident) {
            [ParseAction::Shift { state, .. }] => *state,
            x => panic!("{:?}", x),
        };
        let mode = lang.lex_mode(st);
        let tbl = lang.lex_table();
        assert_eq!(tbl.full_match(mode.lex_state, "!"), Some(LexAccept::Token(bang)));
        assert_eq!(tbl.full_match(mode.lex_state_after_padding, "!"), None);
        let err = lang.lex_mode(StateId::ERROR);
        assert_eq!(tbl.full_match(err.lex_state, "!"), None);
    }

    #[test]
    fn conflicts() {
        let ambiguous = || {
            GrammarBuilder::new("amb").rule(
                "e",
                choice(vec![seq(vec![sym("e"), lit("+"), sym("e")]), lit("id")]),
            )
        };
        match LanguageBuilder::new(ambiguous().build().unwrap()).build() {
            Err(TableError::UnexpectedConflicts { found, expected }) => {
                assert_eq!((found, expected), (1, 0));
            }
            x => panic!("{:?}", x.map(|_| ())),
        }
        let lang = LanguageBuilder::new(ambiguous().expected_conflicts(1).build().unwrap())
            .build()
            .unwrap();
        assert_eq!(lang.conflicts().len(), 1);
    }

    #[test]
    fn symbol_ids_fit() {
        assert_eq!(symbol_id(0).unwrap(), SymbolId(0));
        assert_eq!(symbol_id(65534).unwrap(), SymbolId(65534));
        assert!(matches!(symbol_id(65535), Err(TableError::TooManySymbols)));
        assert!(matches!(symbol_id(70000), Err(TableError::TooManySymbols)));
    }

    #[test]
    fn bad_tokens() {
        let grm = GrammarBuilder::new("bad")
            .rule("s", sym("t"))
            .rule("t", pat("x?"))
            .build()
            .unwrap();
        assert!(matches!(
            LanguageBuilder::new(grm).build(),
            Err(TableError::EmptyToken { .. })
        ));
    }
}
