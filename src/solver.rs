use crate::formula::{Clause, Formula, Literal, Variable};
use crate::SatResult;
use log::trace;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Assignment {
    True,
    False,
    Undecided,
}

/// A CDCL solver over a CNF [`Formula`].
///
/// After [`Solver::solve`] returns [`SatResult::Satisfiable`], [`Solver::value`] reads the model.
pub struct Solver {
    clauses: Vec<Clause>,
    state: SolverState,
}

#[derive(Debug)]
struct SolverState {
    variables: Vec<VariableState>,
    trail: Vec<Variable>,
    decision_level: DecisionLevel,
}

#[derive(Debug, Clone)]
struct VariableState {
    assignment: Assignment,
    reason: Option<ClauseIdx>,
    decision_level: DecisionLevel,
}

impl VariableState {
    fn literal(&self, v: Variable) -> Literal {
        match self.assignment {
            Assignment::Undecided => panic!("cannot get literal for unassigned variable"),
            Assignment::True => Literal::Positive(v),
            Assignment::False => Literal::Negative(v),
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

impl Default for VariableState {
    fn default() -> Self {
        VariableState {
            assignment: Assignment::Undecided,
            reason: None,
            decision_level: DecisionLevel(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClauseIdx(usize);

impl SolverState {
    fn new(num_variables: usize) -> Self {
        Self {
            variables: vec![Default::default(); num_variables],
            trail: vec![],
            decision_level: DecisionLevel(0),
        }
    }

    fn assignment_for(&self, literal: &Literal) -> Assignment {
        match (self.variables[literal.idx()].assignment, literal.is_positive()) {
            (Assignment::Undecided, _) => Assignment::Undecided,
            (Assignment::True, true) | (Assignment::False, false) => Assignment::True,
            (Assignment::True, false) | (Assignment::False, true) => Assignment::False,
        }
    }

    fn assign(&mut self, literal: &Literal, reason: Option<ClauseIdx>) {
        assert_eq!(self.assignment_for(literal), Assignment::Undecided);
        assert!(reason.is_some() || self.decision_level > DecisionLevel(0));

        trace!(
            "{} {} at level {}",
            match reason {
                Some(c) => format!("implied({})", c.0),
                None => "decision".to_string(),
            },
            literal,
            self.decision_level.0
        );

        self.trail.push(*literal.variable());
        let var = &mut self.variables[literal.idx()];
        var.assignment = if literal.is_positive() {
            Assignment::True
        } else {
            Assignment::False
        };
        var.reason = reason;
        var.decision_level = self.decision_level;
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
enum BcpResult {
    Conflict(ClauseIdx),
    NoConflict,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
struct DecisionLevel(usize);

impl DecisionLevel {
    fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug)]
struct Backtrack {
    level: DecisionLevel,
    // The index of the first trail entry to drop during the backtrack
    decision_index: usize,
}

impl Solver {
    pub fn new(formula: Formula) -> Self {
        let state = SolverState::new(formula.num_variables());
        Self {
            clauses: formula.into_clauses(),
            state,
        }
    }

    pub fn solve(&mut self) -> SatResult {
        if let BcpResult::Conflict(_) = self.bcp() {
            return SatResult::Unsatisfiable;
        }
        loop {
            self.state.decision_level = self.state.decision_level.next();
            match self.decide() {
                None => break SatResult::Satisfiable,
                Some(literal) => {
                    self.state.assign(&literal, None);
                    while let BcpResult::Conflict(reason) = self.bcp() {
                        match self.analyze_conflict(reason) {
                            None => return SatResult::Unsatisfiable,
                            Some(backtrack) => self.backtrack(backtrack),
                        }
                    }
                }
            }
        }
    }

    /// The value of `variable` in the current assignment, if it has one.
    pub fn value(&self, variable: Variable) -> Option<bool> {
        match self.state.variables.get(variable.0)?.assignment {
            Assignment::True => Some(true),
            Assignment::False => Some(false),
            Assignment::Undecided => None,
        }
    }

    /// Number of clauses, learned ones included.
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    fn bcp(&mut self) -> BcpResult {
        let mut did_work = true;
        while did_work {
            did_work = false;
            'clauses: for (idx, clause) in self.clauses.iter().enumerate() {
                let mut last_literal = None;
                'literals: for literal in clause.literals() {
                    match self.state.assignment_for(literal) {
                        // true => this clause is satisfied
                        Assignment::True => continue 'clauses,
                        // false => need to look at more literals, but we can't change the assignment
                        Assignment::False => continue 'literals,
                        // undecided => we'll be assigning this literal if it's the only undecided one
                        Assignment::Undecided => {
                            if last_literal.is_none() {
                                last_literal = Some(literal);
                            } else {
                                continue 'clauses;
                            }
                        }
                    }
                }
                // if last_literal is none, every literal was false => we have a conflict
                // otherwise we can apply unit resolution and continue
                match last_literal {
                    Some(literal) => self.state.assign(literal, Some(ClauseIdx(idx))),
                    None => return BcpResult::Conflict(ClauseIdx(idx)),
                }
                did_work = true;
            }
        }
        BcpResult::NoConflict
    }

    fn decide(&self) -> Option<Literal> {
        // Positive-first is complete: a conflict involving this decision learns a clause that flips it.
        self.state
            .variables
            .iter()
            .position(|state| state.assignment == Assignment::Undecided)
            .map(|i| Literal::Positive(Variable(i)))
    }

    /// First-UIP conflict analysis. Learns a clause and returns where to backjump, or `None` if the
    /// conflict is at level 0.
    fn analyze_conflict(&mut self, reason: ClauseIdx) -> Option<Backtrack> {
        if self.state.decision_level == DecisionLevel(0) {
            return None;
        }

        let mut reason = &self.clauses[reason.0];
        let mut conflict_clause = vec![];
        let mut seen = vec![false; self.state.variables.len()];
        let mut frontier = 0;
        let mut trail_end = self.state.trail.len() - 1;
        let first_uip = loop {
            for l in reason.literals() {
                if seen[l.idx()] {
                    continue;
                }
                seen[l.idx()] = true;

                let var = &self.state.variables[l.idx()];
                if var.decision_level < self.state.decision_level {
                    conflict_clause.push(*l);
                } else {
                    debug_assert_eq!(var.decision_level, self.state.decision_level);
                    frontier += 1;
                }
            }

            let uip = loop {
                let v = self.state.trail[trail_end];
                let old_end = trail_end;
                trail_end = trail_end.saturating_sub(1);
                if seen[v.0] {
                    break v;
                }
                debug_assert_ne!(old_end, 0);
            };

            debug_assert_eq!(self.state.variables[uip.0].decision_level, self.state.decision_level);

            frontier -= 1;
            if frontier == 0 {
                break self.state.variables[uip.0].literal(uip);
            } else {
                let clause_idx = self.state.variables[uip.0]
                    .reason
                    .expect("uip should be an implied variable");
                reason = &self.clauses[clause_idx.0];
            }
        };
        conflict_clause.push(first_uip.negated());
        let max_decision_level = self.state.variables[first_uip.idx()].decision_level;

        let decision_level = conflict_clause
            .iter()
            .map(|l| self.state.variables[l.idx()].decision_level)
            .filter(|l| *l < max_decision_level)
            .max()
            .unwrap_or(DecisionLevel(0));
        let decision_index = self
            .state
            .trail
            .iter()
            .position(|v| self.state.variables[v.0].decision_level > decision_level)
            .unwrap_or_else(|| self.state.trail.len());

        let conflict_clause = Clause::new(conflict_clause);
        trace!(
            "conflict clause {}, backtrack to level {}",
            conflict_clause,
            decision_level.0
        );
        self.clauses.push(conflict_clause);

        Some(Backtrack {
            level: decision_level,
            decision_index,
        })
    }

    fn backtrack(&mut self, backtrack: Backtrack) {
        trace!(
            "backtrack: dropping to {} from {}",
            backtrack.decision_index,
            self.state.trail.len()
        );
        assert!(backtrack.decision_index < self.state.trail.len());
        let dropped = self.state.trail.split_off(backtrack.decision_index);
        for variable in &dropped {
            self.state.variables[variable.0].clear();
        }
        self.state.decision_level = backtrack.level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brute_force::solve_brute_force;
    use crate::formula::{formula_3sat_strategy, n, p};
    use proptest::prelude::*;
    use test_env_log::test;

    fn model_satisfies(solver: &Solver, f: &Formula) -> bool {
        f.clauses().all(|clause| {
            clause
                .literals()
                .any(|l| solver.value(*l.variable()) == Some(l.is_positive()))
        })
    }

    #[test]
    fn solve_bcp_sat() {
        let c1 = Clause::new(vec![p(0), p(1)]);
        let c2 = Clause::new(vec![n(0)]);
        let f = Formula::new(vec![c1, c2]);

        let mut solver = Solver::new(f);
        assert_eq!(solver.solve(), SatResult::Satisfiable);
        assert_eq!(solver.value(Variable(0)), Some(false));
        assert_eq!(solver.value(Variable(1)), Some(true));
    }

    #[test]
    fn solve_bcp_unsat() {
        let c1 = Clause::new(vec![p(0), p(1)]);
        let c2 = Clause::new(vec![n(0)]);
        let c3 = Clause::new(vec![n(1)]);
        let f = Formula::new(vec![c1, c2, c3]);

        let mut solver = Solver::new(f);
        assert_eq!(solver.solve(), SatResult::Unsatisfiable);
    }

    #[test]
    fn solve_conflict_sat() {
        let c1 = Clause::new(vec![p(0), p(1), p(2)]);
        let c2 = Clause::new(vec![n(0), n(1), p(2)]);
        let c3 = Clause::new(vec![n(1), n(2)]);
        let f = Formula::new(vec![c1, c2, c3]);

        let mut solver = Solver::new(f.clone());
        assert_eq!(solver.solve(), SatResult::Satisfiable);
        assert!(model_satisfies(&solver, &f));
    }

    #[test]
    fn solve_learns_clauses() {
        // every assignment of 0 and 1 is ruled out, but only after deciding 0
        let f = Formula::new(vec![
            Clause::new(vec![n(0), p(1)]),
            Clause::new(vec![n(0), n(1)]),
            Clause::new(vec![p(0), p(1)]),
            Clause::new(vec![p(0), n(1)]),
        ]);
        let mut solver = Solver::new(f);
        assert_eq!(solver.solve(), SatResult::Unsatisfiable);
        assert!(solver.num_clauses() > 4);
    }

    #[test]
    fn solve_empty_clause() {
        let f = Formula::new(vec![Clause::new(vec![p(0)]), Clause::new(Vec::<Literal>::new())]);
        assert_eq!(Solver::new(f).solve(), SatResult::Unsatisfiable);
    }

    #[test]
    fn solve_no_clauses() {
        let f = Formula::with_variables(3, Vec::<Clause>::new());
        let mut solver = Solver::new(f);
        assert_eq!(solver.solve(), SatResult::Satisfiable);
        assert!(solver.value(Variable(2)).is_some());
        assert_eq!(solver.value(Variable(3)), None);
    }

    #[test]
    fn solve_simple() {
        // (!0 | !0 | !0) & (!0 | !1 | !1) & (!1 | 2 | 3) & (!1 | 3 | !3)
        let c1 = Clause::new(vec![n(0), n(0), n(0)]);
        let c2 = Clause::new(vec![n(0), n(1), n(1)]);
        let c3 = Clause::new(vec![n(1), p(2), p(3)]);
        let c4 = Clause::new(vec![n(1), p(3), n(3)]);
        let f = Formula::new(vec![c1, c2, c3, c4]);

        let mut solver = Solver::new(f.clone());
        assert_eq!(solver.solve(), SatResult::Satisfiable);
        assert!(model_satisfies(&solver, &f));
    }

    proptest! {
        #[test]
        fn proptest_solve(f in formula_3sat_strategy()) {
            let brute_force = solve_brute_force(&f);
            let mut solver = Solver::new(f.clone());
            let result = solver.solve();
            log::trace!("result = {:?}", result);
            prop_assert_eq!(&result, &brute_force);
            if result == SatResult::Satisfiable {
                prop_assert!(model_satisfies(&solver, &f));
            }
        }
    }
}
