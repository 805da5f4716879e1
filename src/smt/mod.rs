//! Satisfiability backends for [`Bool`] assertions.
//!
//! [`SmtSolver`] is the built-in backend. It runs lazy DPLL(T): the boolean skeleton of the
//! assertions goes to the CDCL [`Solver`], and every model it finds is checked against the
//! arithmetic atoms by the difference-logic theory. A model the theory rejects is blocked with a
//! clause built from the conflicting atoms, and the SAT solver runs again.

mod encode;
mod theory;

#[cfg(feature = "solver-z3")]
mod z3_backend;

use std::fmt::{self, Display, Formatter};

use log::{debug, trace};

use crate::formula::{Clause, Literal};
use crate::solver::Solver;
use crate::term::{write_smtlib, Bool};
use crate::SatResult;
use encode::{Encoder, Problem};
use theory::{Constraint, Origin, Verdict};

#[cfg(feature = "solver-z3")]
pub use z3_backend::Z3Backend;

/// A solver that accepts assertions and answers whether they can all hold at once.
///
/// `Display` prints the current query.
pub trait Backend: Display {
    fn assert(&mut self, constraint: &Bool);

    fn check(&mut self) -> SatResult;
}

#[derive(Default, Clone, Debug)]
pub struct SmtSolver {
    assertions: Vec<Bool>,
}

impl SmtSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for SmtSolver {
    fn assert(&mut self, constraint: &Bool) {
        self.assertions.push(constraint.clone());
    }

    fn check(&mut self) -> SatResult {
        let mut encoder = Encoder::new();
        for assertion in &self.assertions {
            encoder.assert(assertion.term());
        }
        let Problem {
            mut formula,
            atoms,
            sorts,
        } = encoder.finish();
        debug!(
            "{} assertions: {} clauses over {} variables, {} atoms",
            self.assertions.len(),
            formula.clauses().count(),
            formula.num_variables(),
            atoms.len()
        );

        // set once some boolean model could not be decided by the theory
        let mut incomplete = false;
        let mut round = 0;
        loop {
            round += 1;
            let mut solver = Solver::new(formula.clone());
            if solver.solve() == SatResult::Unsatisfiable {
                debug!(
                    "round {}: boolean skeleton unsatisfiable ({} clauses with learned ones)",
                    round,
                    solver.num_clauses()
                );
                return if incomplete {
                    SatResult::Unknown
                } else {
                    SatResult::Unsatisfiable
                };
            }

            let literals: Vec<Literal> = atoms
                .iter()
                .map(|atom| Literal::new(atom.variable, solver.value(atom.variable).unwrap_or(true)))
                .collect();
            let constraints = atoms
                .iter()
                .zip(&literals)
                .enumerate()
                .map(|(idx, (atom, literal))| Constraint {
                    bound: if literal.is_positive() {
                        atom.bound.clone()
                    } else {
                        atom.bound.negated()
                    },
                    origin: Origin::Atom(idx),
                })
                .collect();

            let blocking = match theory::check(&sorts, constraints) {
                Verdict::Feasible(values) => {
                    debug!("round {}: model is consistent", round);
                    trace!("node values relative to zero: {:?}", values);
                    return SatResult::Satisfiable;
                }
                Verdict::Conflict(conflict) => {
                    if conflict.is_empty() {
                        return SatResult::Unsatisfiable;
                    }
                    Clause::new(conflict.iter().map(|&idx| literals[idx].negated()))
                }
                Verdict::Unknown => {
                    incomplete = true;
                    Clause::new(literals.iter().map(Literal::negated))
                }
            };
            debug!("round {}: theory conflict, blocking {}", round, blocking);
            if blocking.is_empty() {
                return SatResult::Unknown;
            }
            formula.push(blocking);
        }
    }
}

impl Display for SmtSolver {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write_smtlib(f, &self.assertions)
    }
}
