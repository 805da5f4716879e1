use crate::formula::Formula;
use crate::SatResult;

// Exhaustive search, used as a test oracle for the CDCL solver
pub(crate) fn solve_brute_force(f: &Formula) -> SatResult {
    let num_variables = f.num_variables();
    assert!(num_variables <= 16); // just for safety

    let holds = |assignment: u32, x: usize| assignment & (1 << x) != 0;

    let found = (0..1u32 << num_variables).any(|assignment| {
        f.clauses()
            .all(|clause| clause.literals().any(|l| holds(assignment, l.idx()) == l.is_positive()))
    });
    if found {
        SatResult::Satisfiable
    } else {
        SatResult::Unsatisfiable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::{n, p, Clause};

    #[test]
    fn brute_force_sat() {
        let c1 = Clause::new(vec![p(0), p(1)]);
        let c2 = Clause::new(vec![n(0)]);
        let f = Formula::new(vec![c1, c2]);

        assert_eq!(solve_brute_force(&f), SatResult::Satisfiable);
    }

    #[test]
    fn brute_force_unsat() {
        let c1 = Clause::new(vec![p(0), p(1)]);
        let c2 = Clause::new(vec![n(0)]);
        let c3 = Clause::new(vec![n(1)]);
        let f = Formula::new(vec![c1, c2, c3]);

        assert_eq!(solve_brute_force(&f), SatResult::Unsatisfiable);
    }
}
