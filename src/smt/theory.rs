//! Feasibility of a conjunction of difference bounds over integer and real constants.
//!
//! Each bound `x - y <= c` is an edge `y -> x` of weight `c`; the bounds are feasible iff the
//! graph has no negative cycle, and then shortest distances are a model. Strict bounds get an
//! infinitesimal `-δ` on their weight. Integer nodes that end up with a fractional value are
//! handled by branch-and-bound.

use std::collections::BTreeSet;
use std::ops::{Add, Sub};

use log::trace;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

use super::encode::{Bound, Node, ZERO};
use crate::term::Sort;

/// How deep branch-and-bound may go before giving up.
const MAX_BRANCH_DEPTH: usize = 32;

/// The number `real + eps * δ` for an infinitesimal `δ > 0`. Ordered lexicographically.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub(crate) struct Delta {
    pub(crate) real: BigRational,
    pub(crate) eps: i64,
}

impl Delta {
    fn zero() -> Self {
        Delta {
            real: BigRational::zero(),
            eps: 0,
        }
    }

    pub(crate) fn is_integral(&self) -> bool {
        self.eps == 0 && self.real.is_integer()
    }

    fn floor(&self) -> BigInt {
        let floor = self.real.floor().to_integer();
        if self.real.is_integer() && self.eps < 0 {
            floor - 1
        } else {
            floor
        }
    }
}

impl<'a> Add for &'a Delta {
    type Output = Delta;

    fn add(self, other: &'a Delta) -> Delta {
        Delta {
            real: &self.real + &other.real,
            eps: self.eps + other.eps,
        }
    }
}

impl<'a> Sub for &'a Delta {
    type Output = Delta;

    fn sub(self, other: &'a Delta) -> Delta {
        Delta {
            real: &self.real - &other.real,
            eps: self.eps - other.eps,
        }
    }
}

/// Why a bound is part of the problem: an atom of the boolean model, or a branch taken at some depth.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub(crate) enum Origin {
    Atom(usize),
    Branch(usize),
}

#[derive(Clone, Debug)]
pub(crate) struct Constraint {
    pub(crate) bound: Bound,
    pub(crate) origin: Origin,
}

pub(crate) enum Verdict {
    /// The value of every node, relative to [`ZERO`].
    Feasible(Vec<Delta>),
    /// A set of atoms that cannot hold together.
    Conflict(Vec<usize>),
    Unknown,
}

struct Edge {
    from: Node,
    to: Node,
    weight: Delta,
    origin: Origin,
}

impl Edge {
    fn new(sorts: &[Sort], constraint: &Constraint) -> Self {
        let Bound { x, y, c, strict } = &constraint.bound;
        let weight = if sorts[x.0] == Sort::Int && sorts[y.0] == Sort::Int {
            // the difference of two integers is an integer
            let c = if *strict { c.ceil() - BigRational::one() } else { c.floor() };
            Delta { real: c, eps: 0 }
        } else {
            Delta {
                real: c.clone(),
                eps: if *strict { -1 } else { 0 },
            }
        };
        Edge {
            from: *y,
            to: *x,
            weight,
            origin: constraint.origin,
        }
    }
}

enum Relaxation {
    Feasible(Vec<Delta>),
    NegativeCycle(Vec<Origin>),
}

fn bellman_ford(num_nodes: usize, edges: &[Edge]) -> Relaxation {
    // starting every distance at 0 stands in for a virtual source with 0-edges to every node
    let mut dist = vec![Delta::zero(); num_nodes];
    let mut pred: Vec<Option<usize>> = vec![None; num_nodes];
    let mut last_relaxed = None;
    for _ in 0..=num_nodes {
        last_relaxed = None;
        for (idx, edge) in edges.iter().enumerate() {
            let candidate = &dist[edge.from.0] + &edge.weight;
            if candidate < dist[edge.to.0] {
                dist[edge.to.0] = candidate;
                pred[edge.to.0] = Some(idx);
                last_relaxed = Some(edge.to);
            }
        }
        if last_relaxed.is_none() {
            let zero = dist[ZERO.0].clone();
            return Relaxation::Feasible(dist.iter().map(|d| d - &zero).collect());
        }
    }

    let everything = || Relaxation::NegativeCycle(edges.iter().map(|e| e.origin).collect());
    let mut node = match last_relaxed {
        Some(node) => node,
        None => return everything(),
    };
    // walking back far enough is guaranteed to land on the cycle
    for _ in 0..num_nodes {
        match pred[node.0] {
            Some(idx) => node = edges[idx].from,
            None => return everything(),
        }
    }
    let start = node;
    let mut cycle = vec![];
    for _ in 0..=num_nodes {
        let idx = match pred[node.0] {
            Some(idx) => idx,
            None => return everything(),
        };
        cycle.push(edges[idx].origin);
        node = edges[idx].from;
        if node == start {
            return Relaxation::NegativeCycle(cycle);
        }
    }
    everything()
}

enum Search {
    Feasible(Vec<Delta>),
    Infeasible(BTreeSet<Origin>),
    Unknown,
}

fn search(sorts: &[Sort], constraints: &mut Vec<Constraint>, depth: usize) -> Search {
    let edges: Vec<Edge> = constraints.iter().map(|c| Edge::new(sorts, c)).collect();
    let model = match bellman_ford(sorts.len(), &edges) {
        Relaxation::NegativeCycle(origins) => return Search::Infeasible(origins.into_iter().collect()),
        Relaxation::Feasible(model) => model,
    };

    let fractional = (0..sorts.len()).find(|&n| sorts[n] == Sort::Int && !model[n].is_integral());
    let node = match fractional {
        None => return Search::Feasible(model),
        Some(n) => Node(n),
    };
    if depth == MAX_BRANCH_DEPTH {
        return Search::Unknown;
    }

    let floor = model[node.0].floor();
    trace!("branching on node {} around {} at depth {}", node.0, floor, depth);
    let below = Bound {
        x: node,
        y: ZERO,
        c: BigRational::from_integer(floor.clone()),
        strict: false,
    };
    let above = Bound {
        x: ZERO,
        y: node,
        c: -BigRational::from_integer(floor + 1),
        strict: false,
    };

    let mut explanation = BTreeSet::new();
    let mut unknown = false;
    for bound in vec![below, above] {
        constraints.push(Constraint {
            bound,
            origin: Origin::Branch(depth),
        });
        let result = search(sorts, constraints, depth + 1);
        constraints.pop();
        match result {
            Search::Feasible(model) => return Search::Feasible(model),
            Search::Unknown => unknown = true,
            Search::Infeasible(origins) => explanation.extend(origins),
        }
    }
    if unknown {
        return Search::Unknown;
    }
    // one of the two branches always holds for an integer, so the branch itself is no part of the reason
    explanation.remove(&Origin::Branch(depth));
    Search::Infeasible(explanation)
}

/// Decides whether `constraints` hold together. `sorts` gives the sort of every node, with
/// [`ZERO`] first.
pub(crate) fn check(sorts: &[Sort], mut constraints: Vec<Constraint>) -> Verdict {
    match search(sorts, &mut constraints, 0) {
        Search::Feasible(model) => Verdict::Feasible(model),
        Search::Unknown => Verdict::Unknown,
        Search::Infeasible(origins) => Verdict::Conflict(
            origins
                .into_iter()
                .filter_map(|origin| match origin {
                    Origin::Atom(idx) => Some(idx),
                    Origin::Branch(_) => None,
                })
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_env_log::test;

    fn q(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    // x - y (<|<=) c as the constraint for atom `idx`
    fn bound(idx: usize, x: usize, y: usize, c: BigRational, strict: bool) -> Constraint {
        Constraint {
            bound: Bound {
                x: Node(x),
                y: Node(y),
                c,
                strict,
            },
            origin: Origin::Atom(idx),
        }
    }

    fn value(n: i64) -> Delta {
        Delta {
            real: q(n, 1),
            eps: 0,
        }
    }

    #[test]
    fn equalities_are_exact() {
        // node 1: Int i == 12, node 2: Real fp == 2.3, fp < i
        let sorts = [Sort::Int, Sort::Int, Sort::Real];
        let constraints = vec![
            bound(0, 1, 0, q(12, 1), false),
            bound(1, 0, 1, q(-12, 1), false),
            bound(2, 2, 0, q(23, 10), false),
            bound(3, 0, 2, q(-23, 10), false),
            bound(4, 2, 1, q(0, 1), true),
        ];
        match check(&sorts, constraints) {
            Verdict::Feasible(model) => {
                assert_eq!(model[0], Delta::zero());
                assert_eq!(model[1], value(12));
                assert_eq!(model[2].real, q(23, 10));
            }
            _ => panic!("expected a model"),
        }
    }

    #[test]
    fn negative_cycle_explains_conflict() {
        // i <= 10, i > 10, and an unrelated j <= 3
        let sorts = [Sort::Int, Sort::Int, Sort::Int];
        let constraints = vec![
            bound(0, 1, 0, q(10, 1), false),
            bound(1, 2, 0, q(3, 1), false),
            bound(2, 0, 1, q(-10, 1), true),
        ];
        match check(&sorts, constraints) {
            Verdict::Conflict(mut atoms) => {
                atoms.sort_unstable();
                assert_eq!(atoms, vec![0, 2]);
            }
            _ => panic!("expected a conflict"),
        }
    }

    #[test]
    fn strict_real_bounds_need_the_infinitesimal() {
        // x < y and y < x + 0 is infeasible only because of strictness
        let sorts = [Sort::Int, Sort::Real, Sort::Real];
        let constraints = vec![bound(0, 1, 2, q(0, 1), true), bound(1, 2, 1, q(0, 1), false)];
        assert!(matches!(check(&sorts, constraints), Verdict::Conflict(_)));

        let constraints = vec![bound(0, 1, 2, q(0, 1), true), bound(1, 2, 1, q(1, 2), false)];
        assert!(matches!(check(&sorts, constraints), Verdict::Feasible(_)));
    }

    #[test]
    fn integers_are_tightened() {
        // 2 < i < 3 has real solutions but no integer one
        let constraints = vec![bound(0, 0, 1, q(-2, 1), true), bound(1, 1, 0, q(3, 1), true)];
        assert!(matches!(
            check(&[Sort::Int, Sort::Int], constraints.clone()),
            Verdict::Conflict(_)
        ));
        assert!(matches!(
            check(&[Sort::Int, Sort::Real], constraints),
            Verdict::Feasible(_)
        ));
    }

    #[test]
    fn branch_and_bound_finds_integer_value() {
        // node 1: Real f == 2.3, node 2: Int i > f
        let sorts = [Sort::Int, Sort::Real, Sort::Int];
        let constraints = vec![
            bound(0, 1, 0, q(23, 10), false),
            bound(1, 0, 1, q(-23, 10), false),
            bound(2, 1, 2, q(0, 1), true),
        ];
        match check(&sorts, constraints) {
            Verdict::Feasible(model) => {
                assert!(model[2].is_integral());
                assert!(model[2] > model[1]);
            }
            _ => panic!("expected a model"),
        }
    }

    #[test]
    fn branch_and_bound_proves_infeasible() {
        // node 1: Real f, node 2: Int i, 2.2 <= f <= 2.8 and f <= i <= f
        let sorts = [Sort::Int, Sort::Real, Sort::Int];
        let constraints = vec![
            bound(0, 1, 0, q(28, 10), false),
            bound(1, 0, 1, q(-22, 10), false),
            bound(2, 2, 1, q(0, 1), false),
            bound(3, 1, 2, q(0, 1), false),
        ];
        match check(&sorts, constraints) {
            Verdict::Conflict(mut atoms) => {
                atoms.sort_unstable();
                assert_eq!(atoms, vec![0, 1, 2, 3]);
            }
            _ => panic!("expected a conflict"),
        }
    }

    #[test]
    fn delta_floor() {
        let d = Delta { real: q(3, 1), eps: -1 };
        assert_eq!(d.floor(), BigInt::from(2));
        let d = Delta { real: q(3, 1), eps: 1 };
        assert_eq!(d.floor(), BigInt::from(3));
        assert!(!d.is_integral());
        let d = Delta { real: q(-7, 2), eps: 0 };
        assert_eq!(d.floor(), BigInt::from(-4));
    }
}
