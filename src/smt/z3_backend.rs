use std::fmt::{self, Display, Formatter};

use num_bigint::{BigInt, Sign};
use num_traits::{One, ToPrimitive};
use z3::ast::{self, Ast};

use super::Backend;
use crate::term::{Bool, Comparison, Sort, Term};
use crate::SatResult;

/// Checks assertions with Z3.
///
/// The context has to outlive the solver, so it is created by the caller (see [`Z3Backend::context`]).
pub struct Z3Backend<'ctx> {
    context: &'ctx z3::Context,
    solver: z3::Solver<'ctx>,
}

impl<'ctx> Z3Backend<'ctx> {
    pub fn context() -> z3::Context {
        let mut config = z3::Config::new();
        config.set_model_generation(false);
        config.set_proof_generation(false);
        z3::Context::new(&config)
    }

    pub fn new(context: &'ctx z3::Context) -> Self {
        Self {
            context,
            solver: z3::Solver::new(context),
        }
    }

    fn boolean(&self, term: &Term) -> ast::Bool<'ctx> {
        match term {
            Term::Constant { name, sort: Sort::Bool } => ast::Bool::new_const(self.context, name.as_str()),
            Term::Bool(value) => ast::Bool::from_bool(self.context, *value),
            Term::Compare {
                op,
                sort: Sort::Int,
                lhs,
                rhs,
            } => {
                let (lhs, rhs) = (self.int(lhs), self.int(rhs));
                match op {
                    Comparison::Lt => lhs.lt(&rhs),
                    Comparison::Le => lhs.le(&rhs),
                    Comparison::Gt => lhs.gt(&rhs),
                    Comparison::Ge => lhs.ge(&rhs),
                    Comparison::Eq => lhs._eq(&rhs),
                }
            }
            Term::Compare { op, lhs, rhs, .. } => {
                let (lhs, rhs) = (self.real(lhs), self.real(rhs));
                match op {
                    Comparison::Lt => lhs.lt(&rhs),
                    Comparison::Le => lhs.le(&rhs),
                    Comparison::Gt => lhs.gt(&rhs),
                    Comparison::Ge => lhs.ge(&rhs),
                    Comparison::Eq => lhs._eq(&rhs),
                }
            }
            Term::Not(t) => self.boolean(t).not(),
            Term::And(ts) => {
                let values: Vec<ast::Bool<'ctx>> = ts.iter().map(|t| self.boolean(t)).collect();
                let refs: Vec<&ast::Bool<'ctx>> = values.iter().collect();
                ast::Bool::and(self.context, &refs)
            }
            Term::Or(ts) => {
                let values: Vec<ast::Bool<'ctx>> = ts.iter().map(|t| self.boolean(t)).collect();
                let refs: Vec<&ast::Bool<'ctx>> = values.iter().collect();
                ast::Bool::or(self.context, &refs)
            }
            Term::Xor(a, b) => self.boolean(a).xor(&self.boolean(b)),
            Term::Iff(a, b) => self.boolean(a)._eq(&self.boolean(b)),
            _ => unreachable!("{} is not a boolean term", term),
        }
    }

    fn int(&self, term: &Term) -> ast::Int<'ctx> {
        match term {
            Term::Constant { name, .. } => ast::Int::new_const(self.context, name.as_str()),
            Term::Int(value) => self.numeral(value),
            _ => unreachable!("{} is not an integer term", term),
        }
    }

    /// Builds `value` from 32-bit digits when it does not fit an `i64`.
    fn numeral(&self, value: &BigInt) -> ast::Int<'ctx> {
        if let Some(small) = value.to_i64() {
            return ast::Int::from_i64(self.context, small);
        }
        let (sign, digits) = value.to_u32_digits();
        let base = ast::Int::from_u64(self.context, 1 << 32);
        let magnitude = digits.iter().rev().fold(ast::Int::from_u64(self.context, 0), |acc, digit| {
            let shifted = ast::Int::mul(self.context, &[&acc, &base]);
            ast::Int::add(self.context, &[&shifted, &ast::Int::from_u64(self.context, u64::from(*digit))])
        });
        if sign == Sign::Minus {
            magnitude.unary_minus()
        } else {
            magnitude
        }
    }

    fn real(&self, term: &Term) -> ast::Real<'ctx> {
        match term {
            Term::Constant { name, .. } => ast::Real::new_const(self.context, name.as_str()),
            Term::Real(value) if value.denom().is_one() => self.numeral(value.numer()).to_real(),
            Term::Real(value) => ast::Real::div(
                &self.numeral(value.numer()).to_real(),
                &self.numeral(value.denom()).to_real(),
            ),
            Term::ToReal(t) => self.int(t).to_real(),
            _ => unreachable!("{} is not a real term", term),
        }
    }
}

impl Backend for Z3Backend<'_> {
    fn assert(&mut self, constraint: &Bool) {
        let constraint = self.boolean(constraint.term());
        self.solver.assert(&constraint);
    }

    fn check(&mut self) -> SatResult {
        match self.solver.check() {
            z3::SatResult::Sat => SatResult::Satisfiable,
            z3::SatResult::Unsat => SatResult::Unsatisfiable,
            z3::SatResult::Unknown => SatResult::Unknown,
        }
    }
}

impl Display for Z3Backend<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&self.solver, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::{Int, Real};
    use test_env_log::test;

    #[test]
    fn z3_agrees_on_fractions() {
        let context = Z3Backend::context();
        let mut backend = Z3Backend::new(&context);
        let i = Int::new_const("i");
        backend.assert(&i.to_real()._eq(&Real::from_f64(-2.5).unwrap()));
        assert_eq!(backend.check(), SatResult::Unsatisfiable);
    }

    #[test]
    fn z3_numerals_beyond_i64() {
        let context = Z3Backend::context();
        let mut backend = Z3Backend::new(&context);
        let i = Int::new_const("i");
        let huge: BigInt = "-100000000000000000000".parse().unwrap();
        backend.assert(&i._eq(&Int::from_bigint(huge.clone())));
        backend.assert(&i.lt(&Int::from_bigint(huge + 1)));
        assert_eq!(backend.check(), SatResult::Satisfiable);

        let mut backend = Z3Backend::new(&context);
        let fp = Real::new_const("fp");
        backend.assert(&fp._eq(&Real::from_f64(1e30).unwrap()));
        backend.assert(&fp.gt(&Int::from_bigint("999999999999999999999999999999".parse().unwrap()).to_real()));
        assert_eq!(backend.check(), SatResult::Satisfiable);
    }

    #[test]
    fn z3_record_constraints() {
        let context = Z3Backend::context();
        let mut backend = Z3Backend::new(&context);
        let i = Int::new_const("i");
        let fp = Real::new_const("fp");
        let b1 = Bool::new_const("bool1");
        let b2 = Bool::new_const("bool2");
        backend.assert(&i.gt(&Int::from_i64(10)));
        backend.assert(&fp.lt(&i.to_real()));
        backend.assert(&b1.xor(&b2));
        backend.assert(&i._eq(&Int::from_i64(12)));
        backend.assert(&fp._eq(&Real::from_f64(2.3).unwrap()));
        backend.assert(&b1._eq(&Bool::from_bool(true)));
        backend.assert(&b2._eq(&Bool::from_bool(false)));
        assert_eq!(backend.check(), SatResult::Satisfiable);
    }
}
