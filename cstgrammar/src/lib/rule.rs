//! Grammar rules are written as values of [`Rule`], normally through the constructor functions in
//! this module. For example, a left associative addition can be written as:
//!
//! ```
//! use cstgrammar::rule::*;
//!
//! let add = prec_left(
//!     1,
//!     seq(vec![
//!         field("left", sym("_expr")),
//!         field("operator", lit("+")),
//!         field("right", sym("_expr")),
//!     ]),
//! );
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The associativity of a precedence annotation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AssocKind {
    Left,
    Right,
}

/// A (possibly nested) grammar rule.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Rule {
    /// Matches the empty string.
    Blank,
    /// A literal string token.
    String(String),
    /// A regular expression token, in `regex-syntax` syntax.
    Pattern(String),
    /// A reference to another named rule.
    Symbol(String),
    Seq(Vec<Rule>),
    Choice(Vec<Rule>),
    /// Zero or more repetitions.
    Repeat(Box<Rule>),
    /// One or more repetitions.
    Repeat1(Box<Rule>),
    /// Label the nodes produced by the inner rule.
    Field { name: String, rule: Box<Rule> },
    /// Report the nodes produced by the inner rule under a different name.
    Alias {
        value: String,
        named: bool,
        rule: Box<Rule>,
    },
    /// Precedence is used for parse conflicts when the inner rule is syntactic, and for lexical
    /// conflicts when it is lexical.
    Prec {
        level: i32,
        assoc: Option<AssocKind>,
        rule: Box<Rule>,
    },
    /// Turn a (possibly compound) lexical rule into a single token. An `immediate` token cannot be
    /// preceded by separators.
    Token { immediate: bool, rule: Box<Rule> },
}

impl Rule {
    /// Is this rule, as a whole, a single token?
    pub fn is_lexical(&self) -> bool {
        match self {
            Rule::String(_) | Rule::Pattern(_) | Rule::Token { .. } => true,
            Rule::Prec { rule, .. } => rule.is_lexical(),
            _ => false,
        }
    }

    pub(crate) fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a str>) {
        match self {
            Rule::Blank | Rule::String(_) | Rule::Pattern(_) | Rule::Symbol(_) => (),
            Rule::Seq(rs) | Rule::Choice(rs) => {
                for r in rs {
                    r.collect_fields(fields);
                }
            }
            Rule::Field { name, rule } => {
                fields.push(name);
                rule.collect_fields(fields);
            }
            Rule::Repeat(rule)
            | Rule::Repeat1(rule)
            | Rule::Alias { rule, .. }
            | Rule::Prec { rule, .. }
            | Rule::Token { rule, .. } => rule.collect_fields(fields),
        }
    }
}

pub fn blank() -> Rule {
    Rule::Blank
}

/// A literal string token.
pub fn lit(s: &str) -> Rule {
    Rule::String(s.to_owned())
}

/// A regular expression token.
pub fn pat(re: &str) -> Rule {
    Rule::Pattern(re.to_owned())
}

/// A reference to the rule `name`.
pub fn sym(name: &str) -> Rule {
    Rule::Symbol(name.to_owned())
}

pub fn seq(rules: Vec<Rule>) -> Rule {
    Rule::Seq(rules)
}

pub fn choice(rules: Vec<Rule>) -> Rule {
    Rule::Choice(rules)
}

pub fn repeat(rule: Rule) -> Rule {
    Rule::Repeat(Box::new(rule))
}

pub fn repeat1(rule: Rule) -> Rule {
    Rule::Repeat1(Box::new(rule))
}

pub fn optional(rule: Rule) -> Rule {
    Rule::Choice(vec![rule, Rule::Blank])
}

pub fn field(name: &str, rule: Rule) -> Rule {
    Rule::Field {
        name: name.to_owned(),
        rule: Box::new(rule),
    }
}

/// Report `rule` as an anonymous node called `value`.
pub fn alias(rule: Rule, value: &str) -> Rule {
    Rule::Alias {
        value: value.to_owned(),
        named: false,
        rule: Box::new(rule),
    }
}

/// Report `rule` as a named node called `value`.
pub fn alias_named(rule: Rule, value: &str) -> Rule {
    Rule::Alias {
        value: value.to_owned(),
        named: true,
        rule: Box::new(rule),
    }
}

pub fn prec(level: i32, rule: Rule) -> Rule {
    Rule::Prec {
        level,
        assoc: None,
        rule: Box::new(rule),
    }
}

pub fn prec_left(level: i32, rule: Rule) -> Rule {
    Rule::Prec {
        level,
        assoc: Some(AssocKind::Left),
        rule: Box::new(rule),
    }
}

pub fn prec_right(level: i32, rule: Rule) -> Rule {
    Rule::Prec {
        level,
        assoc: Some(AssocKind::Right),
        rule: Box::new(rule),
    }
}

pub fn token(rule: Rule) -> Rule {
    Rule::Token {
        immediate: false,
        rule: Box::new(rule),
    }
}

pub fn token_immediate(rule: Rule) -> Rule {
    Rule::Token {
        immediate: true,
        rule: Box::new(rule),
    }
}

/// Zero or more `rule`s separated by `sep`, with an optional trailing `sep`.
pub fn sep_by(sep: &str, rule: Rule) -> Rule {
    seq(vec![repeat(seq(vec![rule.clone(), lit(sep)])), optional(rule)])
}

/// One or more `rule`s separated by `sep`, with an optional trailing `sep`.
pub fn sep_by1(sep: &str, rule: Rule) -> Rule {
    seq(vec![
        rule.clone(),
        repeat(seq(vec![lit(sep), rule])),
        optional(lit(sep)),
    ])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lexical_rules() {
        assert!(lit("a").is_lexical());
        assert!(prec(2, pat("[a-z]+")).is_lexical());
        assert!(token(seq(vec![lit("#"), pat(".*")])).is_lexical());
        assert!(!sym("a").is_lexical());
        assert!(!choice(vec![lit("true"), lit("false")]).is_lexical());
    }

    #[test]
    fn fields() {
        let r = seq(vec![
            field("left", sym("e")),
            repeat(field("item", alias(sym("x"), "y"))),
        ]);
        let mut fs = Vec::new();
        r.collect_fields(&mut fs);
        assert_eq!(fs, vec!["left", "item"]);
    }
}
