//! Collects a record from command-line subcommands and checks it against a fixed set of
//! constraints, either by evaluating them directly or by asking an SMT solver.
//!
//! The built-in solver is a CDCL SAT solver ([`solver`]) extended to difference logic over
//! integers and reals ([`smt`]). With the `solver-z3` feature, Z3 can be used instead.

pub mod cli;
pub mod formula;
pub mod smt;
pub mod term;

mod check;
mod collector;
mod record;
mod solver;

#[cfg(test)]
mod brute_force;

use std::fmt::{self, Display, Formatter};

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum SatResult {
    Satisfiable,
    Unsatisfiable,
    Unknown,
}

pub use check::{check, check_direct, check_symbolic, CheckError, Strategy};
pub use collector::{collect, collect_with};
pub use record::{Record, Update};
pub use solver::Solver;

#[derive(Debug)]
pub enum Error {
    Args(clap::Error),
    Check(CheckError),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Error::Args(e) => Display::fmt(e, f),
            Error::Check(e) => write!(f, "check failed: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<clap::Error> for Error {
    fn from(e: clap::Error) -> Self {
        Error::Args(e)
    }
}

impl From<CheckError> for Error {
    fn from(e: CheckError) -> Self {
        Error::Check(e)
    }
}

/// Collects a record from `tokens` and checks it symbolically with the built-in solver.
pub fn verify<S: AsRef<str>>(tokens: &[S]) -> Result<bool, Error> {
    let updates = collect(tokens)?;
    let record = Record::from_updates(&updates);
    Ok(check(&record, Strategy::Symbolic, &mut smt::SmtSolver::new())?)
}
