use std::{
    env,
    fs::File,
    io::{stderr, Read, Write},
    path::Path,
    process,
};

use cstlex::DfaLexer;
use cstpar::{NonStreamingLexer, ParserBuilder, RecoveryKind};
use csttable::{Conflict, Language};
use getopts::Options;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod diagnostics;

use crate::diagnostics::{symbol_epp, DiagnosticFormatter};

fn usage(prog: &str, msg: &str) -> ! {
    let path = Path::new(prog);
    let leaf = path
        .file_name()
        .and_then(|m| m.to_str())
        .unwrap_or("cstparse");
    if !msg.is_empty() {
        writeln!(&mut stderr(), "{}", msg).ok();
    }
    writeln!(
        &mut stderr(),
        "Usage: {} [-q] [-r <insert|panic|none>] [-s] [-t] [-c] -l <ampl|datazinc|eprime|minizinc> <input file>",
        leaf
    )
    .ok();
    process::exit(1);
}

fn read_file(path: &str) -> String {
    let mut s = String::new();
    let r = File::open(path).and_then(|mut f| f.read_to_string(&mut s));
    if let Err(e) = r {
        writeln!(&mut stderr(), "Can't read file {}: {}", path, e).ok();
        process::exit(1);
    }
    s
}

fn print_conflicts(lang: &Language) {
    println!("{} conflict(s) resolved by default:", lang.conflicts().len());
    for c in lang.conflicts() {
        match c {
            Conflict::ShiftReduce { token, production } => {
                println!("  Shift/Reduce on {:?}: shift, or reduce {}", token, production)
            }
            Conflict::ReduceReduce { first, second } => {
                println!("  Reduce/Reduce: {} (chosen) and {}", first, second)
            }
        }
    }
}

fn print_tokens(lang: &Language, lexer: &DfaLexer) {
    for t in lexer.tokens() {
        match t {
            Ok(l) => {
                let ((line, col), _) = lexer.line_col(l.span());
                println!(
                    "{}:{} {} {:?}",
                    line,
                    col,
                    symbol_epp(lang, l.symbol()),
                    lexer.span_str(l.span())
                );
            }
            Err(e) => {
                let ((line, col), _) = lexer.line_col(e.span());
                println!("{}:{} error: {}", line, col, e);
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let prog = &args[0];
    let matches = match Options::new()
        .optflag("h", "help", "")
        .optflag("q", "quiet", "Don't print warnings such as conflicts")
        .optopt(
            "r",
            "recoverer",
            "Recoverer to be used (default: insert)",
            "insert|panic|none",
        )
        .optflag("s", "sexp", "Print the tree as an S-expression")
        .optflag("t", "tokens", "Print the tokens before parsing")
        .optflag("c", "conflicts", "Print the conflicts resolved while building the tables")
        .optopt("l", "language", "Language to parse", "ampl|datazinc|eprime|minizinc")
        .parse(&args[1..])
    {
        Ok(m) => m,
        Err(f) => usage(prog, f.to_string().as_str()),
    };

    if matches.opt_present("h") {
        usage(prog, "");
    }

    let quiet = matches.opt_present("q");

    let recoverykind = match matches.opt_str("r") {
        None => RecoveryKind::InsertPanic,
        Some(s) => match &*s.to_lowercase() {
            "insert" => RecoveryKind::InsertPanic,
            "panic" => RecoveryKind::Panic,
            "none" => RecoveryKind::None,
            _ => usage(prog, &format!("Unknown recoverer '{}'.", s)),
        },
    };

    let lang = match matches.opt_str("l") {
        None => usage(prog, "No language given."),
        Some(s) => match cstparsers::by_name(&s.to_lowercase()) {
            Some(Ok(lang)) => lang,
            Some(Err(e)) => {
                writeln!(&mut stderr(), "{}: {}", s, e).ok();
                process::exit(1);
            }
            None => usage(prog, &format!("Unknown language '{}'.", s)),
        },
    };

    if matches.free.len() != 1 {
        usage(prog, "Expected exactly one input file.");
    }

    if matches.opt_present("c") {
        print_conflicts(lang);
    } else if !quiet && !lang.conflicts().is_empty() {
        writeln!(
            &mut stderr(),
            "Warning: {} conflict(s) were resolved by default (use -c to list them)",
            lang.conflicts().len()
        )
        .ok();
    }

    let input_path = &matches.free[0];
    let input = read_file(input_path);
    let lexer = DfaLexer::new(lang, &input);
    if matches.opt_present("t") {
        print_tokens(lang, &lexer);
    }

    debug!("Parsing {} as {}", input_path, lang.name());
    let tree = match ParserBuilder::new(lang)
        .recovery(recoverykind)
        .parse(&lexer, None)
    {
        Ok(t) => t,
        Err(e) => {
            writeln!(&mut stderr(), "Internal error: {}", e).ok();
            process::exit(1);
        }
    };
    if matches.opt_present("s") {
        println!("{}", tree.to_sexp(lang));
    } else {
        print!("{}", tree.pp(lang, &input));
    }

    let path = Path::new(input_path);
    let formatter = DiagnosticFormatter::new(&lexer, path);
    for e in tree.errors() {
        writeln!(&mut stderr(), "{}", formatter.format_error(lang, e)).ok();
    }
    if !tree.errors().is_empty() {
        process::exit(1);
    }
}
