//! Command-line options of the `recordcheck` binary.
//!
//! Options come first. The first argument that is not an option starts the record tokens, and
//! everything from there on is handed to [`collect`](crate::collect) untouched.

use std::ffi::OsString;
use std::str::FromStr;

use clap::{crate_version, value_t, App, AppSettings, Arg, ArgMatches};

use crate::check::{CheckError, Strategy};

const STRATEGY_ARG: &str = "strategy";
const BACKEND_ARG: &str = "backend";
const DUMP_ARG: &str = "dump-smt";
const TOKENS_ARG: &str = "TOKENS";

/// Which [`Backend`](crate::smt::Backend) checks the symbolic query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Builtin,
    #[cfg(feature = "solver-z3")]
    Z3,
}

impl BackendKind {
    #[cfg(not(feature = "solver-z3"))]
    pub const NAMES: &'static [&'static str] = &["builtin"];
    #[cfg(feature = "solver-z3")]
    pub const NAMES: &'static [&'static str] = &["builtin", "z3"];
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Builtin
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "builtin" => Ok(BackendKind::Builtin),
            #[cfg(feature = "solver-z3")]
            "z3" => Ok(BackendKind::Z3),
            _ => Err(format!("unknown backend '{}'", s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    pub strategy: Strategy,
    pub backend: BackendKind,
    /// Print the solver query before the result.
    pub dump_smt: bool,
    pub tokens: Vec<String>,
}

pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("recordcheck")
        .version(crate_version!())
        .about("Collects a record from subcommand tokens and checks it against its constraints")
        .setting(AppSettings::TrailingVarArg)
        .arg(
            Arg::with_name(STRATEGY_ARG)
                .long(STRATEGY_ARG)
                .takes_value(true)
                .possible_values(Strategy::NAMES)
                .default_value("symbolic")
                .help("How the record is checked"),
        )
        .arg(
            Arg::with_name(BACKEND_ARG)
                .long(BACKEND_ARG)
                .takes_value(true)
                .possible_values(BackendKind::NAMES)
                .default_value("builtin")
                .help("Solver used for the symbolic check"),
        )
        .arg(
            Arg::with_name(DUMP_ARG)
                .long(DUMP_ARG)
                .help("Print the solver query"),
        )
        .arg(
            Arg::with_name(TOKENS_ARG)
                .multiple(true)
                .allow_hyphen_values(true)
                .help("Record subcommands, e.g. integer 12 float 2.3 bool1"),
        )
}

impl Options {
    /// Parses the process arguments, exiting with a usage message if they are invalid.
    pub fn from_args() -> Self {
        Self::from_matches(&app().get_matches()).unwrap_or_else(|e| e.exit())
    }

    pub fn from_iter_safe<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::from_matches(&app().get_matches_from_safe(args)?)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, clap::Error> {
        Ok(Self {
            strategy: value_t!(matches, STRATEGY_ARG, Strategy)?,
            backend: value_t!(matches, BACKEND_ARG, BackendKind)?,
            dump_smt: matches.is_present(DUMP_ARG),
            tokens: matches
                .values_of(TOKENS_ARG)
                .map(|values| values.map(String::from).collect())
                .unwrap_or_default(),
        })
    }
}

/// The process exit code after a check.
///
/// A completed check exits 0 whichever way it went, since the answer is printed. A failed check
/// exits -1, which clap never uses for argument errors.
pub fn exit_code(result: &Result<bool, CheckError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => -1,
    }
}
