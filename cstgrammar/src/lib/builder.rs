use indexmap::IndexMap;

use crate::{
    Grammar, GrammarError, GrammarErrorKind,
    rule::Rule,
};

/// A `GrammarBuilder` collects the named rules and grammar-wide declarations of a grammar. The
/// first rule added is the start rule.
///
/// ```
/// use cstgrammar::{GrammarBuilder, rule::*};
///
/// let grm = GrammarBuilder::new("list")
///     .rule("source_file", repeat(sym("identifier")))
///     .rule("identifier", pat("[a-z]+"))
///     .extra(pat(r"\s"))
///     .word("identifier")
///     .build()
///     .unwrap();
/// assert_eq!(grm.name(), "list");
/// ```
#[derive(Clone, Debug)]
pub struct GrammarBuilder {
    pub(crate) name: String,
    pub(crate) rules: IndexMap<String, Rule>,
    pub(crate) extras: Vec<Rule>,
    pub(crate) word: Option<String>,
    pub(crate) supertypes: Vec<String>,
    pub(crate) expected_conflicts: usize,
    duplicate: Option<String>,
}

impl GrammarBuilder {
    pub fn new(name: &str) -> Self {
        GrammarBuilder {
            name: name.to_owned(),
            rules: IndexMap::new(),
            extras: Vec::new(),
            word: None,
            supertypes: Vec::new(),
            expected_conflicts: 0,
            duplicate: None,
        }
    }

    /// Add the rule `name`. Defining the same rule twice makes [`build`](Self::build) fail.
    pub fn rule(mut self, name: &str, rule: Rule) -> Self {
        if self.rules.insert(name.to_owned(), rule).is_some() && self.duplicate.is_none() {
            self.duplicate = Some(name.to_owned());
        }
        self
    }

    /// Add an extra: something which may appear anywhere between tokens. Anonymous patterns (e.g.
    /// whitespace) become separators which are never seen by the parser; references to token rules
    /// (e.g. comments) become tokens that are kept in the tree.
    pub fn extra(mut self, rule: Rule) -> Self {
        self.extras.push(rule);
        self
    }

    /// Declare the token rule `name` as the word token: string tokens which match it in full are
    /// treated as keywords.
    pub fn word(mut self, name: &str) -> Self {
        self.word = Some(name.to_owned());
        self
    }

    /// Declare the hidden rule `name` as a supertype.
    pub fn supertype(mut self, name: &str) -> Self {
        self.supertypes.push(name.to_owned());
        self
    }

    /// How many parse table conflicts the grammar author expects to be resolved by default.
    pub fn expected_conflicts(mut self, n: usize) -> Self {
        self.expected_conflicts = n;
        self
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        if let Some(name) = self.duplicate {
            return Err(GrammarError {
                kind: GrammarErrorKind::DuplicateRule,
                rule: Some(name),
            });
        }
        Grammar::new(&self)
    }
}
