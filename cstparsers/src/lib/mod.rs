//! Ready-built parsers for constraint modelling languages. Each language's tables are built the
//! first time they are asked for and then shared for the rest of the process:
//!
//! ```
//! let tree = cstparsers::parse(cstparsers::ampl(), "let x := 1 + 2;").unwrap();
//! assert!(!tree.has_error());
//! assert_eq!(
//!     tree.to_sexp(cstparsers::ampl()),
//!     "(source_file item: (let_decl name: (identifier) (infix_operator left: (number_literal) \
//!      right: (number_literal))))"
//! );
//! ```

use std::time::Instant;

use cstgrammar::GrammarBuilder;
use cstlex::DfaLexer;
use cstpar::{InternalError, ParserBuilder, Tree};
use csttable::{Language, LanguageBuilder, TableError};
use once_cell::sync::Lazy;
use tracing::debug;

pub mod ampl;
mod common;
pub mod datazinc;
pub mod eprime;
pub mod minizinc;

static AMPL: Lazy<Result<Language, TableError>> = Lazy::new(|| build(ampl::grammar()));
static DATAZINC: Lazy<Result<Language, TableError>> = Lazy::new(|| build(datazinc::grammar()));
static EPRIME: Lazy<Result<Language, TableError>> = Lazy::new(|| build(eprime::grammar()));
static MINIZINC: Lazy<Result<Language, TableError>> = Lazy::new(|| build(minizinc::grammar()));

fn build(bld: GrammarBuilder) -> Result<Language, TableError> {
    let start = Instant::now();
    let lang = LanguageBuilder::new(bld.build()?).build()?;
    debug!(
        "Built {} with {} states in {:?}",
        lang.name(),
        lang.state_count(),
        start.elapsed()
    );
    Ok(lang)
}

fn get(lang: &'static Lazy<Result<Language, TableError>>) -> &'static Language {
    match Lazy::force(lang) {
        Ok(l) => l,
        Err(e) => panic!("Bundled grammar failed to build: {}", e),
    }
}

/// The AMPL language.
///
/// # Panics
///
/// If the bundled grammar fails to build, which is a bug. [try_ampl] returns the error instead.
pub fn ampl() -> &'static Language {
    get(&AMPL)
}

pub fn try_ampl() -> Result<&'static Language, &'static TableError> {
    AMPL.as_ref()
}

/// The DataZinc language.
///
/// # Panics
///
/// If the bundled grammar fails to build, which is a bug. [try_datazinc] returns the error
/// instead.
pub fn datazinc() -> &'static Language {
    get(&DATAZINC)
}

pub fn try_datazinc() -> Result<&'static Language, &'static TableError> {
    DATAZINC.as_ref()
}

/// The Essence Prime language.
///
/// # Panics
///
/// If the bundled grammar fails to build, which is a bug. [try_eprime] returns the error instead.
pub fn eprime() -> &'static Language {
    get(&EPRIME)
}

pub fn try_eprime() -> Result<&'static Language, &'static TableError> {
    EPRIME.as_ref()
}

/// The MiniZinc language.
///
/// # Panics
///
/// If the bundled grammar fails to build, which is a bug. [try_minizinc] returns the error
/// instead.
pub fn minizinc() -> &'static Language {
    get(&MINIZINC)
}

pub fn try_minizinc() -> Result<&'static Language, &'static TableError> {
    MINIZINC.as_ref()
}

/// Look up a bundled language by name: `ampl`, `datazinc`, `eprime` or `minizinc`.
pub fn by_name(name: &str) -> Option<Result<&'static Language, &'static TableError>> {
    match name {
        "ampl" => Some(try_ampl()),
        "datazinc" => Some(try_datazinc()),
        "eprime" => Some(try_eprime()),
        "minizinc" => Some(try_minizinc()),
        _ => None,
    }
}

/// Parse `input` with `lang`'s lexer and the default error recovery.
pub fn parse(lang: &Language, input: &str) -> Result<Tree, InternalError> {
    ParserBuilder::new(lang).parse(&DfaLexer::new(lang, input), None)
}
