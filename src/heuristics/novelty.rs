//! Novelty: the smallest tuple width a state contributes for the first time.

use crate::config;
use crate::heuristics::Heuristic;
use crate::problem::{FluentId, StripsProblem};
use crate::state::State;
use crate::Cost;
use fixedbitset::FixedBitSet;

/// For a width parameter `k`, the novelty of a state is the smallest
/// `w <= k` such that the state covers at least one w-tuple of fluents no
/// earlier state covered, and `k + 1` otherwise.
///
/// Tuples are flattened into a single table of `F^k` slots (base-F digits).
/// If the table would exceed the memory cap, the arity is silently
/// downgraded to 1; [`Novelty::downgraded`] reports it.
// TODO: give each width its own table so short tuples do not alias slots of
// longer ones.
pub struct Novelty<'p> {
    problem: &'p StripsProblem,
    arity: usize,
    num_fluents: usize,
    covered: FixedBitSet,
    downgraded: bool,
}

impl<'p> Novelty<'p> {
    pub fn new(problem: &'p StripsProblem, max_arity: usize) -> Novelty<'p> {
        Self::with_memory_cap(problem, max_arity, config::NOVELTY_MAX_MB.get())
    }

    pub fn with_memory_cap(problem: &'p StripsProblem, max_arity: usize, max_mb: usize) -> Novelty<'p> {
        assert!(max_arity >= 1, "novelty arity must be at least 1");
        let num_fluents = problem.num_fluents();
        let mut arity = max_arity;
        let mut downgraded = false;
        if table_mb(num_fluents, arity) > max_mb as f64 {
            arity = 1;
            downgraded = true;
            if config::TRACE_SEARCH.get() {
                eprintln!(
                    "[novelty] table for arity {max_arity} exceeds {max_mb} MB, downgrading to 1"
                );
            }
        }
        let num_tuples = num_fluents.max(1).pow(arity as u32);
        Novelty {
            problem,
            arity,
            num_fluents,
            covered: FixedBitSet::with_capacity(num_tuples),
            downgraded,
        }
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// True iff the requested arity was reduced to fit the memory cap.
    pub fn downgraded(&self) -> bool {
        self.downgraded
    }

    /// Novelty of a state reached by `action_adds`: only tuples containing
    /// at least one added fluent can be newly covered, so the check is
    /// restricted to those.
    pub fn eval_node(&mut self, s: &State, action_adds: &[FluentId]) -> Cost {
        let mut novelty = (self.arity + 1) as Cost;
        for w in 1..=self.arity {
            if self.cover_node_tuples(s, action_adds, w) && (w as Cost) < novelty {
                novelty = w as Cost;
            }
        }
        novelty
    }

    fn eval_state(&mut self, s: &State) -> Cost {
        let mut novelty = (self.arity + 1) as Cost;
        for w in 1..=self.arity {
            if self.cover_state_tuples(s, w) && (w as Cost) < novelty {
                novelty = w as Cost;
            }
        }
        novelty
    }

    /// Marks every w-tuple of state fluents; true iff one was new.
    fn cover_state_tuples(&mut self, s: &State, w: usize) -> bool {
        let atoms = s.fluents();
        if atoms.is_empty() {
            return false;
        }
        let mut new_covers = false;
        let mut positions = vec![0usize; w];
        loop {
            let idx = self.tuple_index(positions.iter().map(|&i| atoms[i]));
            if !self.covered.contains(idx) {
                self.covered.insert(idx);
                new_covers = true;
            }
            if !advance(&mut positions, atoms.len()) {
                break;
            }
        }
        new_covers
    }

    /// Marks every w-tuple whose last component is one of `adds` and whose
    /// other components come from the state.
    fn cover_node_tuples(&mut self, s: &State, adds: &[FluentId], w: usize) -> bool {
        let atoms = s.fluents();
        if adds.is_empty() || (w > 1 && atoms.is_empty()) {
            return false;
        }
        let mut new_covers = false;
        let mut positions = vec![0usize; w - 1];
        for &added in adds {
            loop {
                let tuple = positions.iter().map(|&i| atoms[i]).chain(std::iter::once(added));
                let idx = self.tuple_index(tuple);
                if !self.covered.contains(idx) {
                    self.covered.insert(idx);
                    new_covers = true;
                }
                if !advance(&mut positions, atoms.len()) {
                    break;
                }
            }
        }
        new_covers
    }

    fn tuple_index(&self, tuple: impl Iterator<Item = FluentId>) -> usize {
        let mut idx = 0;
        for f in tuple {
            idx = idx * self.num_fluents + usize::from(f);
        }
        idx
    }
}

/// Estimated table footprint, counting one reference-sized slot per tuple.
fn table_mb(num_fluents: usize, arity: usize) -> f64 {
    (num_fluents as f64).powi(arity as i32) * std::mem::size_of::<usize>() as f64
        / (1024.0 * 1024.0)
}

/// Base-`len` odometer; false once all combinations are exhausted.
fn advance(positions: &mut [usize], len: usize) -> bool {
    for p in positions.iter_mut() {
        *p += 1;
        if *p < len {
            return true;
        }
        *p = 0;
    }
    false
}

impl Heuristic for Novelty<'_> {
    fn eval(&mut self, s: &State) -> Cost {
        self.eval_state(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(i: usize) -> FluentId {
        FluentId::from(i)
    }

    fn problem_with_fluents(n: usize) -> StripsProblem {
        let mut p = StripsProblem::new("d", "p");
        for i in 0..n {
            p.add_fluent(format!("f{i}")).unwrap();
        }
        p
    }

    #[test]
    fn first_state_is_novel_repeat_is_not() {
        let p = problem_with_fluents(4);
        let mut nov = Novelty::with_memory_cap(&p, 2, 600);
        let s = State::with_fluents(4, [f(0), f(1)]);
        assert_eq!(nov.eval(&s), 1.0);
        // the very same fluents cover nothing new: novelty is k + 1
        assert_eq!(nov.eval(&s), 3.0);
    }

    #[test]
    fn node_evaluation_sees_new_pairs() {
        let p = problem_with_fluents(4);
        let mut nov = Novelty::with_memory_cap(&p, 2, 600);
        let s0 = State::with_fluents(4, [f(0)]);
        assert_eq!(nov.eval(&s0), 1.0);
        let s1 = State::with_fluents(4, [f(0), f(1)]);
        // fluent 1 is new: width 1
        assert_eq!(nov.eval_node(&s1, &[f(1)]), 1.0);
        let s2 = State::with_fluents(4, [f(0), f(1)]);
        // nothing new at any width
        assert_eq!(nov.eval_node(&s2, &[f(1)]), 3.0);
        let s3 = State::with_fluents(4, [f(2), f(1)]);
        // fluent 2 itself is new
        assert_eq!(nov.eval_node(&s3, &[f(2)]), 1.0);
    }

    #[test]
    fn arity_downgrades_under_memory_cap() {
        let p = problem_with_fluents(2048);
        // 2048^3 reference-sized slots is far beyond 1 MB
        let nov = Novelty::with_memory_cap(&p, 3, 1);
        assert_eq!(nov.arity(), 1);
        assert!(nov.downgraded());
        let roomy = Novelty::with_memory_cap(&p, 2, 600);
        assert_eq!(roomy.arity(), 2);
        assert!(!roomy.downgraded());
    }
}
