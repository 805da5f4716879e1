//! Typed symbolic terms over integers, reals and booleans.
//!
//! The wrappers [`Int`], [`Real`] and [`Bool`] only allow well-sorted terms to be built, so the
//! backends can translate a [`Bool`] without re-checking sorts. Every term prints as SMT-LIB 2.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Sort {
    Int,
    Real,
    Bool,
}

impl Display for Sort {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Sort::Int => "Int",
            Sort::Real => "Real",
            Sort::Bool => "Bool",
        })
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "=",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub(crate) enum Term {
    Constant { name: String, sort: Sort },
    Int(BigInt),
    Real(BigRational),
    Bool(bool),
    ToReal(Box<Term>),
    /// `sort` is the sort both operands share.
    Compare {
        op: Comparison,
        sort: Sort,
        lhs: Box<Term>,
        rhs: Box<Term>,
    },
    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Xor(Box<Term>, Box<Term>),
    Iff(Box<Term>, Box<Term>),
}

impl Term {
    fn compare(op: Comparison, sort: Sort, lhs: &Term, rhs: &Term) -> Term {
        Term::Compare {
            op,
            sort,
            lhs: Box::new(lhs.clone()),
            rhs: Box::new(rhs.clone()),
        }
    }

    /// Collects the declared constants in order of first appearance.
    pub(crate) fn declarations<'a>(&'a self, seen: &mut HashSet<(&'a str, Sort)>, out: &mut Vec<(&'a str, Sort)>) {
        match self {
            Term::Constant { name, sort } => {
                if seen.insert((name.as_str(), *sort)) {
                    out.push((name.as_str(), *sort));
                }
            }
            Term::Int(_) | Term::Real(_) | Term::Bool(_) => {}
            Term::ToReal(t) | Term::Not(t) => t.declarations(seen, out),
            Term::Compare { lhs, rhs, .. } | Term::Xor(lhs, rhs) | Term::Iff(lhs, rhs) => {
                lhs.declarations(seen, out);
                rhs.declarations(seen, out);
            }
            Term::And(ts) | Term::Or(ts) => {
                for t in ts {
                    t.declarations(seen, out);
                }
            }
        }
    }
}

fn write_nary(f: &mut Formatter, op: &str, terms: &[Term]) -> fmt::Result {
    write!(f, "({}", op)?;
    for t in terms {
        write!(f, " {}", t)?;
    }
    f.write_str(")")
}

fn write_rational(f: &mut Formatter, value: &BigRational) -> fmt::Result {
    let magnitude = value.abs();
    if value.is_negative() {
        f.write_str("(- ")?;
    }
    if magnitude.is_integer() {
        write!(f, "{}.0", magnitude.numer())?;
    } else {
        write!(f, "(/ {}.0 {}.0)", magnitude.numer(), magnitude.denom())?;
    }
    if value.is_negative() {
        f.write_str(")")?;
    }
    Ok(())
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Term::Constant { name, .. } => f.write_str(name),
            Term::Int(v) if v.is_negative() => write!(f, "(- {})", v.abs()),
            Term::Int(v) => write!(f, "{}", v),
            Term::Real(v) => write_rational(f, v),
            Term::Bool(b) => write!(f, "{}", b),
            Term::ToReal(t) => write!(f, "(to_real {})", t),
            Term::Compare { op, lhs, rhs, .. } => write!(f, "({} {} {})", op.symbol(), lhs, rhs),
            Term::Not(t) => write!(f, "(not {})", t),
            Term::And(ts) if ts.is_empty() => f.write_str("true"),
            Term::And(ts) => write_nary(f, "and", ts),
            Term::Or(ts) if ts.is_empty() => f.write_str("false"),
            Term::Or(ts) => write_nary(f, "or", ts),
            Term::Xor(a, b) => write!(f, "(xor {} {})", a, b),
            Term::Iff(a, b) => write!(f, "(= {} {})", a, b),
        }
    }
}

/// Returned when a float has no exact rational value (NaN or an infinity).
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct NonFiniteError(pub f64);

impl Display for NonFiniteError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} is not a finite number", self.0)
    }
}

impl std::error::Error for NonFiniteError {}

/// The exact value of the shortest decimal representation of `value`, so `2.3` is `23/10` rather
/// than the nearest binary fraction.
pub fn decimal_rational(value: f64) -> Result<BigRational, NonFiniteError> {
    if !value.is_finite() {
        return Err(NonFiniteError(value));
    }
    // f64's Display never uses exponent notation
    let text = value.abs().to_string();
    let (whole, fraction) = match text.find('.') {
        Some(dot) => (&text[..dot], &text[dot + 1..]),
        None => (&text[..], ""),
    };
    let digits = format!("{}{}", whole, fraction);
    let numer: BigInt = digits.parse().map_err(|_| NonFiniteError(value))?;
    let denom = num_traits::pow(BigInt::from(10u32), fraction.len());
    let magnitude = BigRational::new(numer, denom);
    Ok(if value.is_sign_negative() && !magnitude.is_zero() {
        -magnitude
    } else {
        magnitude
    })
}

macro_rules! comparisons {
    ($ty:ident, $sort:expr) => {
        impl $ty {
            pub fn lt(&self, other: &$ty) -> Bool {
                Bool(Term::compare(Comparison::Lt, $sort, &self.0, &other.0))
            }

            pub fn le(&self, other: &$ty) -> Bool {
                Bool(Term::compare(Comparison::Le, $sort, &self.0, &other.0))
            }

            pub fn gt(&self, other: &$ty) -> Bool {
                Bool(Term::compare(Comparison::Gt, $sort, &self.0, &other.0))
            }

            pub fn ge(&self, other: &$ty) -> Bool {
                Bool(Term::compare(Comparison::Ge, $sort, &self.0, &other.0))
            }

            pub fn _eq(&self, other: &$ty) -> Bool {
                Bool(Term::compare(Comparison::Eq, $sort, &self.0, &other.0))
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter) -> fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}

#[derive(Clone, PartialEq, Debug)]
pub struct Int(pub(crate) Term);

impl Int {
    pub fn new_const(name: impl Into<String>) -> Self {
        Int(Term::Constant {
            name: name.into(),
            sort: Sort::Int,
        })
    }

    pub fn from_i64(value: i64) -> Self {
        Int(Term::Int(BigInt::from(value)))
    }

    pub fn from_bigint(value: BigInt) -> Self {
        Int(Term::Int(value))
    }

    pub fn to_real(&self) -> Real {
        Real(Term::ToReal(Box::new(self.0.clone())))
    }
}

comparisons!(Int, Sort::Int);

#[derive(Clone, PartialEq, Debug)]
pub struct Real(pub(crate) Term);

impl Real {
    pub fn new_const(name: impl Into<String>) -> Self {
        Real(Term::Constant {
            name: name.into(),
            sort: Sort::Real,
        })
    }

    pub fn from_rational(value: BigRational) -> Self {
        Real(Term::Real(value))
    }

    /// See [`decimal_rational`].
    pub fn from_f64(value: f64) -> Result<Self, NonFiniteError> {
        decimal_rational(value).map(Real::from_rational)
    }
}

comparisons!(Real, Sort::Real);

#[derive(Clone, PartialEq, Debug)]
pub struct Bool(pub(crate) Term);

impl Bool {
    pub fn new_const(name: impl Into<String>) -> Self {
        Bool(Term::Constant {
            name: name.into(),
            sort: Sort::Bool,
        })
    }

    pub fn from_bool(value: bool) -> Self {
        Bool(Term::Bool(value))
    }

    pub fn not(&self) -> Bool {
        Bool(Term::Not(Box::new(self.0.clone())))
    }

    pub fn and(values: &[&Bool]) -> Bool {
        Bool(Term::And(values.iter().map(|b| b.0.clone()).collect()))
    }

    pub fn or(values: &[&Bool]) -> Bool {
        Bool(Term::Or(values.iter().map(|b| b.0.clone()).collect()))
    }

    pub fn xor(&self, other: &Bool) -> Bool {
        Bool(Term::Xor(Box::new(self.0.clone()), Box::new(other.0.clone())))
    }

    pub fn _eq(&self, other: &Bool) -> Bool {
        Bool(Term::Iff(Box::new(self.0.clone()), Box::new(other.0.clone())))
    }

    pub(crate) fn term(&self) -> &Term {
        &self.0
    }
}

impl Display for Bool {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Writes `assertions` as an SMT-LIB 2 script: declarations, assertions, then `(check-sat)`.
pub(crate) fn write_smtlib(f: &mut Formatter, assertions: &[Bool]) -> fmt::Result {
    let mut seen = HashSet::new();
    let mut declarations = vec![];
    for assertion in assertions {
        assertion.term().declarations(&mut seen, &mut declarations);
    }
    for (name, sort) in declarations {
        writeln!(f, "(declare-const {} {})", name, sort)?;
    }
    for assertion in assertions {
        writeln!(f, "(assert {})", assertion)?;
    }
    writeln!(f, "(check-sat)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_env_log::test;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn decimal_values() {
        assert_eq!(decimal_rational(2.3).unwrap(), ratio(23, 10));
        assert_eq!(decimal_rational(-0.125).unwrap(), ratio(-1, 8));
        assert_eq!(decimal_rational(12.0).unwrap(), ratio(12, 1));
        assert_eq!(decimal_rational(-0.0).unwrap(), ratio(0, 1));
        assert_eq!(decimal_rational(1e-7).unwrap(), ratio(1, 10_000_000));
    }

    #[test]
    fn non_finite_rejected() {
        assert!(decimal_rational(f64::NAN).is_err());
        assert_eq!(decimal_rational(f64::INFINITY), Err(NonFiniteError(f64::INFINITY)));
        assert!(Real::from_f64(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn display_smtlib() {
        let i = Int::new_const("i");
        let fp = Real::new_const("fp");
        assert_eq!(i.gt(&Int::from_i64(10)).to_string(), "(> i 10)");
        assert_eq!(i._eq(&Int::from_i64(-5)).to_string(), "(= i (- 5))");
        let huge: BigInt = "-100000000000000000000".parse().unwrap();
        assert_eq!(
            i._eq(&Int::from_bigint(huge)).to_string(),
            "(= i (- 100000000000000000000))"
        );
        assert_eq!(fp.lt(&i.to_real()).to_string(), "(< fp (to_real i))");
        assert_eq!(
            fp._eq(&Real::from_f64(-2.3).unwrap()).to_string(),
            "(= fp (- (/ 23.0 10.0)))"
        );
        let b1 = Bool::new_const("bool1");
        let b2 = Bool::new_const("bool2");
        assert_eq!(b1.xor(&b2).to_string(), "(xor bool1 bool2)");
        assert_eq!(b1._eq(&Bool::from_bool(true)).to_string(), "(= bool1 true)");
        assert_eq!(Bool::and(&[&b1, &b2.not()]).to_string(), "(and bool1 (not bool2))");
        assert_eq!(Bool::or(&[]).to_string(), "false");
    }

    #[test]
    fn declarations_in_order() {
        let i = Int::new_const("i");
        let fp = Real::new_const("fp");
        let t = Bool::and(&[&fp.lt(&i.to_real()), &i.gt(&Int::from_i64(0))]);
        let mut seen = HashSet::new();
        let mut out = vec![];
        t.term().declarations(&mut seen, &mut out);
        assert_eq!(out, vec![("fp", Sort::Real), ("i", Sort::Int)]);
    }
}
