//! Checks a [`Record`] against its constraints:
//!
//! * `integer > 10`
//! * `float < integer`
//! * `bool1 xor bool2`
//!
//! The record is either evaluated directly, or turned into a query for a solver [`Backend`].

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use log::{info, warn};
use num_bigint::BigInt;
use num_rational::BigRational;

use crate::record::Record;
use crate::smt::Backend;
use crate::term::{decimal_rational, Bool, Int, NonFiniteError, Real};
use crate::SatResult;

const LOWER_BOUND: i64 = 10;

/// How [`check`] decides a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Symbolic,
    Direct,
    /// Runs both and fails if they disagree.
    Both,
}

impl Strategy {
    pub const NAMES: &'static [&'static str] = &["symbolic", "direct", "both"];
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Symbolic
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "symbolic" => Ok(Strategy::Symbolic),
            "direct" => Ok(Strategy::Direct),
            "both" => Ok(Strategy::Both),
            _ => Err(format!("unknown strategy '{}'", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckError {
    MissingField(&'static str),
    NonFinite(f64),
    Disagreement { direct: bool, symbolic: bool },
}

impl Display for CheckError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            CheckError::MissingField(field) => write!(f, "no value given for {}", field),
            CheckError::NonFinite(value) => write!(f, "{} is not a finite number", value),
            CheckError::Disagreement { direct, symbolic } => write!(
                f,
                "direct evaluation says {} but the solver says {}",
                direct, symbolic
            ),
        }
    }
}

impl std::error::Error for CheckError {}

impl From<NonFiniteError> for CheckError {
    fn from(e: NonFiniteError) -> Self {
        CheckError::NonFinite(e.0)
    }
}

fn required<'a, T>(value: &'a Option<T>, field: &'static str) -> Result<&'a T, CheckError> {
    value.as_ref().ok_or(CheckError::MissingField(field))
}

/// Evaluates the constraints natively.
///
/// The float is compared by its decimal value, the same value [`check_symbolic`] asserts, so
/// `2.3` is exactly `23/10` and large floats keep the digits they print with.
pub fn check_direct(record: &Record) -> Result<bool, CheckError> {
    let integer = required(&record.integer, "integer")?;
    let float = decimal_rational(*required(&record.float, "float")?)?;
    Ok(*integer > BigInt::from(LOWER_BOUND)
        && float < BigRational::from_integer(integer.clone())
        && (record.bool1 ^ record.bool2))
}

/// Asserts the constraints on symbolic constants, pins each constant to the record's value, and
/// asks `backend` whether the result is satisfiable.
///
/// `backend` should have no assertions of its own.
pub fn check_symbolic(record: &Record, backend: &mut dyn Backend) -> Result<bool, CheckError> {
    let integer = required(&record.integer, "integer")?;
    let float = Real::from_f64(*required(&record.float, "float")?)?;

    let i = Int::new_const("i");
    let fp = Real::new_const("fp");
    let bool1 = Bool::new_const("bool1");
    let bool2 = Bool::new_const("bool2");

    backend.assert(&i.gt(&Int::from_i64(LOWER_BOUND)));
    backend.assert(&fp.lt(&i.to_real()));
    backend.assert(&bool1.xor(&bool2));

    backend.assert(&i._eq(&Int::from_bigint(integer.clone())));
    backend.assert(&fp._eq(&float));
    backend.assert(&bool1._eq(&Bool::from_bool(record.bool1)));
    backend.assert(&bool2._eq(&Bool::from_bool(record.bool2)));

    match backend.check() {
        SatResult::Satisfiable => Ok(true),
        SatResult::Unsatisfiable => Ok(false),
        SatResult::Unknown => {
            warn!("solver could not decide the record, treating it as not satisfied");
            Ok(false)
        }
    }
}

pub fn check(record: &Record, strategy: Strategy, backend: &mut dyn Backend) -> Result<bool, CheckError> {
    let result = match strategy {
        Strategy::Direct => check_direct(record)?,
        Strategy::Symbolic => check_symbolic(record, backend)?,
        Strategy::Both => {
            let direct = check_direct(record)?;
            let symbolic = check_symbolic(record, backend)?;
            if direct != symbolic {
                return Err(CheckError::Disagreement { direct, symbolic });
            }
            direct
        }
    };
    info!("{:?} check: {}", strategy, result);
    Ok(result)
}
