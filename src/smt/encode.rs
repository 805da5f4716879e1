//! Tseitin encoding of boolean terms into CNF.
//!
//! Arithmetic comparisons become atoms: boolean variables standing for a difference bound
//! `x - y < c` or `x - y <= c` between two arithmetic constants (or one constant and zero).

use std::collections::HashMap;

use num_bigint::BigInt;
use num_rational::BigRational;

use crate::formula::{Clause, Formula, Literal, Variable};
use crate::term::{Comparison, Sort, Term};

/// An arithmetic constant in the difference graph.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(crate) struct Node(pub(crate) usize);

/// The node standing for the number zero. Its value is fixed, all other values are relative to it.
pub(crate) const ZERO: Node = Node(0);

/// `x - y < c` when `strict`, otherwise `x - y <= c`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub(crate) struct Bound {
    pub(crate) x: Node,
    pub(crate) y: Node,
    pub(crate) c: BigRational,
    pub(crate) strict: bool,
}

impl Bound {
    /// The bound that holds exactly when this one does not.
    pub(crate) fn negated(&self) -> Bound {
        Bound {
            x: self.y,
            y: self.x,
            c: -self.c.clone(),
            strict: !self.strict,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Atom {
    pub(crate) variable: Variable,
    pub(crate) bound: Bound,
}

#[derive(Clone)]
enum Operand {
    Node(Node),
    Constant(BigRational),
}

/// The output of an [`Encoder`]: clauses, the atoms they mention, and the sort of every node.
pub(crate) struct Problem {
    pub(crate) formula: Formula,
    pub(crate) atoms: Vec<Atom>,
    pub(crate) sorts: Vec<Sort>,
}

pub(crate) struct Encoder {
    clauses: Vec<Clause>,
    num_variables: usize,
    // always true, pinned by a unit clause
    truth: Variable,
    booleans: HashMap<String, Variable>,
    nodes: HashMap<(String, Sort), Node>,
    sorts: Vec<Sort>,
    atoms: Vec<Atom>,
    atom_index: HashMap<Bound, usize>,
}

impl Encoder {
    pub(crate) fn new() -> Self {
        let truth = Variable(0);
        Self {
            clauses: vec![Clause::new(vec![Literal::Positive(truth)])],
            num_variables: 1,
            truth,
            booleans: HashMap::new(),
            nodes: HashMap::new(),
            sorts: vec![Sort::Int],
            atoms: vec![],
            atom_index: HashMap::new(),
        }
    }

    pub(crate) fn assert(&mut self, term: &Term) {
        let literal = self.encode(term);
        self.clauses.push(Clause::new(vec![literal]));
    }

    pub(crate) fn finish(self) -> Problem {
        Problem {
            formula: Formula::with_variables(self.num_variables, self.clauses),
            atoms: self.atoms,
            sorts: self.sorts,
        }
    }

    fn fresh(&mut self) -> Variable {
        let variable = Variable(self.num_variables);
        self.num_variables += 1;
        variable
    }

    fn constant(&self, value: bool) -> Literal {
        Literal::new(self.truth, value)
    }

    fn encode(&mut self, term: &Term) -> Literal {
        match term {
            Term::Constant { name, sort: Sort::Bool } => {
                if let Some(variable) = self.booleans.get(name) {
                    return Literal::Positive(*variable);
                }
                let variable = self.fresh();
                self.booleans.insert(name.clone(), variable);
                Literal::Positive(variable)
            }
            Term::Bool(value) => self.constant(*value),
            Term::Compare { op, lhs, rhs, .. } => self.comparison(*op, lhs, rhs),
            Term::Not(t) => self.encode(t).negated(),
            Term::And(ts) => {
                let literals: Vec<Literal> = ts.iter().map(|t| self.encode(t)).collect();
                self.and(literals)
            }
            Term::Or(ts) => {
                // a | b == !(!a & !b)
                let literals: Vec<Literal> = ts.iter().map(|t| self.encode(t).negated()).collect();
                self.and(literals).negated()
            }
            Term::Xor(a, b) => {
                let (a, b) = (self.encode(a), self.encode(b));
                self.xor(a, b)
            }
            Term::Iff(a, b) => {
                let (a, b) = (self.encode(a), self.encode(b));
                self.xor(a, b).negated()
            }
            Term::Constant { .. } | Term::Int(_) | Term::Real(_) | Term::ToReal(_) => {
                unreachable!("{} is not a boolean term", term)
            }
        }
    }

    fn and(&mut self, literals: Vec<Literal>) -> Literal {
        match literals.len() {
            0 => return self.constant(true),
            1 => return literals[0],
            _ => {}
        }
        let gate = self.fresh();
        for literal in &literals {
            self.clauses.push(Clause::new(vec![Literal::Negative(gate), *literal]));
        }
        self.clauses.push(Clause::new(
            std::iter::once(Literal::Positive(gate)).chain(literals.iter().map(Literal::negated)),
        ));
        Literal::Positive(gate)
    }

    fn xor(&mut self, a: Literal, b: Literal) -> Literal {
        let gate = self.fresh();
        let (g, not_g) = (Literal::Positive(gate), Literal::Negative(gate));
        self.clauses.push(Clause::new(vec![not_g, a, b]));
        self.clauses.push(Clause::new(vec![not_g, a.negated(), b.negated()]));
        self.clauses.push(Clause::new(vec![g, a.negated(), b]));
        self.clauses.push(Clause::new(vec![g, a, b.negated()]));
        g
    }

    fn operand(&mut self, term: &Term) -> Operand {
        match term {
            Term::Constant { name, sort } => {
                let key = (name.clone(), *sort);
                if let Some(node) = self.nodes.get(&key) {
                    return Operand::Node(*node);
                }
                let node = Node(self.sorts.len());
                self.sorts.push(*sort);
                self.nodes.insert(key, node);
                Operand::Node(node)
            }
            Term::Int(value) => Operand::Constant(BigRational::from_integer(value.clone())),
            Term::Real(value) => Operand::Constant(value.clone()),
            Term::ToReal(t) => self.operand(t),
            _ => unreachable!("{} is not an arithmetic term", term),
        }
    }

    fn comparison(&mut self, op: Comparison, lhs: &Term, rhs: &Term) -> Literal {
        let (lhs, rhs) = (self.operand(lhs), self.operand(rhs));
        match op {
            Comparison::Lt => self.difference(lhs, rhs, true),
            Comparison::Le => self.difference(lhs, rhs, false),
            Comparison::Gt => self.difference(rhs, lhs, true),
            Comparison::Ge => self.difference(rhs, lhs, false),
            Comparison::Eq => {
                let (lhs2, rhs2) = (lhs.clone(), rhs.clone());
                let le = self.difference(lhs, rhs, false);
                let ge = self.difference(rhs2, lhs2, false);
                self.and(vec![le, ge])
            }
        }
    }

    /// The literal for `lhs - rhs < 0` (or `<= 0`).
    fn difference(&mut self, lhs: Operand, rhs: Operand, strict: bool) -> Literal {
        let (x, y, c) = match (lhs, rhs) {
            (Operand::Node(x), Operand::Node(y)) => (x, y, BigRational::from_integer(BigInt::from(0))),
            (Operand::Node(x), Operand::Constant(k)) => (x, ZERO, k),
            (Operand::Constant(k), Operand::Node(y)) => (ZERO, y, -k),
            (Operand::Constant(a), Operand::Constant(b)) => {
                return self.constant(if strict { a < b } else { a <= b });
            }
        };
        if x == y {
            let zero = BigRational::from_integer(BigInt::from(0));
            return self.constant(if strict { zero < c } else { zero <= c });
        }
        self.atom(Bound { x, y, c, strict })
    }

    fn atom(&mut self, bound: Bound) -> Literal {
        if let Some(&idx) = self.atom_index.get(&bound) {
            return Literal::Positive(self.atoms[idx].variable);
        }
        if let Some(&idx) = self.atom_index.get(&bound.negated()) {
            return Literal::Negative(self.atoms[idx].variable);
        }
        let variable = self.fresh();
        self.atom_index.insert(bound.clone(), self.atoms.len());
        self.atoms.push(Atom { variable, bound });
        Literal::Positive(variable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brute_force::solve_brute_force;
    use crate::term::{Bool, Int, Real};
    use crate::SatResult;
    use test_env_log::test;

    fn encode(assertions: &[Bool]) -> Problem {
        let mut encoder = Encoder::new();
        for a in assertions {
            encoder.assert(a.term());
        }
        encoder.finish()
    }

    #[test]
    fn xor_truth_table() {
        let a = Bool::new_const("a");
        let b = Bool::new_const("b");
        for &(va, vb) in &[(false, false), (false, true), (true, false), (true, true)] {
            let problem = encode(&[
                a.xor(&b),
                a._eq(&Bool::from_bool(va)),
                b._eq(&Bool::from_bool(vb)),
            ]);
            let expected = if va != vb {
                SatResult::Satisfiable
            } else {
                SatResult::Unsatisfiable
            };
            assert_eq!(solve_brute_force(&problem.formula), expected, "{} xor {}", va, vb);
        }
    }

    #[test]
    fn and_or_gates() {
        let a = Bool::new_const("a");
        let b = Bool::new_const("b");
        let problem = encode(&[Bool::and(&[&a, &b]), Bool::or(&[&a.not(), &b.not()])]);
        assert_eq!(solve_brute_force(&problem.formula), SatResult::Unsatisfiable);

        let problem = encode(&[Bool::or(&[&a, &b]), a.not()]);
        assert_eq!(solve_brute_force(&problem.formula), SatResult::Satisfiable);
    }

    #[test]
    fn constant_comparisons_fold() {
        let problem = encode(&[Int::from_i64(3).lt(&Int::from_i64(2))]);
        assert!(problem.atoms.is_empty());
        assert_eq!(solve_brute_force(&problem.formula), SatResult::Unsatisfiable);

        let i = Int::new_const("i");
        let problem = encode(&[i.le(&i)]);
        assert!(problem.atoms.is_empty());
        assert_eq!(solve_brute_force(&problem.formula), SatResult::Satisfiable);
    }

    #[test]
    fn atoms_are_shared() {
        let i = Int::new_const("i");
        let ten = Int::from_i64(10);
        // i > 10 and !(i <= 10) are the same atom
        let problem = encode(&[i.gt(&ten), i.le(&ten).not()]);
        assert_eq!(problem.atoms.len(), 1);
        let bound = &problem.atoms[0].bound;
        assert_eq!((bound.x, bound.y), (ZERO, Node(1)));
        assert_eq!(bound.c, BigRational::from_integer(BigInt::from(-10)));
        assert!(bound.strict);
    }

    #[test]
    fn equality_splits_into_two_bounds() {
        let fp = Real::new_const("fp");
        let problem = encode(&[fp._eq(&Real::from_f64(2.3).unwrap())]);
        assert_eq!(problem.atoms.len(), 2);
        assert!(problem.atoms.iter().all(|atom| !atom.bound.strict));
        assert_eq!(problem.sorts, vec![Sort::Int, Sort::Real]);
    }
}
