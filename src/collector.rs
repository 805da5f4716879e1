//! Turns command-line tokens into record [`Update`]s.
//!
//! Subcommands can be repeated and mixed freely, so the tokens are walked with a cursor: the
//! dispatch table decides how many tokens after a subcommand name belong to it, and that slice is
//! handed to the matching clap subcommand for validation. Tokens that are not subcommand names
//! are skipped.

use clap::{value_t, App, AppSettings, Arg, ErrorKind, SubCommand};
use log::debug;
use num_bigint::BigInt;

use crate::record::Update;

const VALUE_ARG: &str = "value";
const VALUES_ARG: &str = "values";
const NO_BOOL1_ARG: &str = "no-bool1";
const NO_BOOL2_ARG: &str = "no-bool2";

#[derive(Clone, Copy, Debug)]
enum Arity {
    /// exactly one value
    Value,
    /// an optional flag
    Flag(&'static str),
    /// everything up to the next subcommand name
    Values,
}

const SUBCOMMANDS: &[(&str, Arity)] = &[
    ("integer", Arity::Value),
    ("float", Arity::Value),
    ("bool1", Arity::Flag("--no-bool1")),
    ("bool2", Arity::Flag("--no-bool2")),
    ("list", Arity::Values),
];

fn arity(token: &str) -> Option<Arity> {
    SUBCOMMANDS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, arity)| *arity)
}

fn validate_integer(value: String) -> Result<(), String> {
    value
        .parse::<BigInt>()
        .map(|_| ())
        .map_err(|e| format!("'{}' is not an integer: {}", value, e))
}

fn validate_float(value: String) -> Result<(), String> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(()),
        Ok(_) => Err(format!("'{}' is not a finite number", value)),
        Err(e) => Err(format!("'{}' is not a number: {}", value, e)),
    }
}

/// The clap definition of the record subcommands.
pub fn app<'a, 'b>() -> App<'a, 'b> {
    App::new("record")
        .setting(AppSettings::SubcommandRequired)
        .setting(AppSettings::DisableVersion)
        .subcommand(
            SubCommand::with_name("integer")
                .about("Set an integer value")
                .setting(AppSettings::AllowNegativeNumbers)
                .arg(
                    Arg::with_name(VALUE_ARG)
                        .required(true)
                        .validator(validate_integer)
                        .help("The integer value"),
                ),
        )
        .subcommand(
            SubCommand::with_name("float")
                .about("Set a float value")
                .setting(AppSettings::AllowNegativeNumbers)
                .arg(
                    Arg::with_name(VALUE_ARG)
                        .required(true)
                        .validator(validate_float)
                        .help("The float value"),
                ),
        )
        .subcommand(
            SubCommand::with_name("bool1")
                .about("Set boolean 1 to true")
                .arg(Arg::with_name(NO_BOOL1_ARG).long(NO_BOOL1_ARG).help("Set boolean 1 to false")),
        )
        .subcommand(
            SubCommand::with_name("bool2")
                .about("Set boolean 2 to true")
                .arg(Arg::with_name(NO_BOOL2_ARG).long(NO_BOOL2_ARG).help("Set boolean 2 to false")),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("Set a list of values")
                .setting(AppSettings::AllowLeadingHyphen)
                .arg(
                    Arg::with_name(VALUES_ARG)
                        .required(true)
                        .multiple(true)
                        .help("The list of values"),
                ),
        )
}

fn parse(app: &App, slice: &[&str]) -> Result<Update, clap::Error> {
    let matches = app
        .clone()
        .get_matches_from_safe(std::iter::once("record").chain(slice.iter().cloned()))?;
    match matches.subcommand() {
        ("integer", Some(m)) => Ok(Update::Integer(value_t!(m, VALUE_ARG, BigInt)?)),
        ("float", Some(m)) => Ok(Update::Float(value_t!(m, VALUE_ARG, f64)?)),
        ("bool1", Some(m)) => Ok(Update::Bool1(!m.is_present(NO_BOOL1_ARG))),
        ("bool2", Some(m)) => Ok(Update::Bool2(!m.is_present(NO_BOOL2_ARG))),
        ("list", Some(m)) => Ok(Update::List(
            m.values_of(VALUES_ARG)
                .map(|values| values.map(String::from).collect())
                .unwrap_or_default(),
        )),
        (name, _) => Err(clap::Error::with_description(
            &format!("unknown subcommand '{}'", name),
            ErrorKind::UnrecognizedSubcommand,
        )),
    }
}

/// Parses every recognized subcommand in `tokens`, in order.
pub fn collect<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<Update>, clap::Error> {
    collect_with(tokens, |_| {})
}

/// Like [`collect`], but hands each update to `on_update` as soon as it is parsed, so the updates
/// before a malformed subcommand are still seen.
pub fn collect_with<S, F>(tokens: &[S], mut on_update: F) -> Result<Vec<Update>, clap::Error>
where
    S: AsRef<str>,
    F: FnMut(&Update),
{
    let app = app();
    let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();

    let mut updates = vec![];
    let mut cursor = 0;
    while cursor < tokens.len() {
        let head = tokens[cursor];
        let shape = match arity(head) {
            Some(shape) => shape,
            None => {
                debug!("ignoring unrecognized token '{}'", head);
                cursor += 1;
                continue;
            }
        };

        let rest = &tokens[cursor + 1..];
        let taken = match shape {
            Arity::Value => rest.iter().take(1).take_while(|t| arity(t).is_none()).count(),
            Arity::Flag(flag) => rest.iter().take(1).take_while(|t| **t == flag).count(),
            Arity::Values => rest.iter().take_while(|t| arity(t).is_none()).count(),
        };
        let slice = &tokens[cursor..=cursor + taken];
        let update = parse(&app, slice)?;
        debug!("{:?} => {:?}", slice, update);
        on_update(&update);
        updates.push(update);
        cursor += 1 + taken;
    }
    Ok(updates)
}
