//! The pairwise heuristic h²: cost bounds for achieving fluent pairs
//! jointly, mutex detection, and e-delete extraction.

use crate::collections::IndexSet;
use crate::heuristics::Heuristic;
use crate::problem::{ActionId, FluentId, StripsProblem};
use crate::state::State;
use crate::{Cost, INFTY};

/// Index of the unordered pair `{p, q}` in a triangular table.
pub fn pair_index(p: FluentId, q: FluentId) -> usize {
    let (p, q) = (usize::from(p), usize::from(q));
    if p >= q {
        p * (p + 1) / 2 + q
    } else {
        q * (q + 1) / 2 + p
    }
}

/// How an action's cost enters the pair updates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum H2CostModel {
    ZeroCosts,
    UnitCosts,
    UseCosts,
}

pub struct H2<'p> {
    problem: &'p StripsProblem,
    cost_model: H2CostModel,
    /// triangular table over fluent pairs
    values: Vec<Cost>,
    op_values: Vec<Cost>,
    /// per fluent: the actions that add or delete it
    interfering: Vec<IndexSet<ActionId>>,
}

impl<'p> H2<'p> {
    pub fn new(problem: &'p StripsProblem, cost_model: H2CostModel) -> H2<'p> {
        let nf = problem.num_fluents();
        let mut interfering: Vec<IndexSet<ActionId>> = (0..nf).map(|_| IndexSet::new()).collect();
        for a in problem.action_ids() {
            let action = &problem.actions()[a];
            for &f in action.add() {
                interfering[f].insert(a);
            }
            for &f in action.del() {
                interfering[f].insert(a);
            }
        }
        H2 {
            problem,
            cost_model,
            values: vec![INFTY; (nf * nf + nf) / 2],
            op_values: vec![INFTY; problem.num_actions()],
            interfering,
        }
    }

    pub fn value(&self, p: FluentId, q: FluentId) -> Cost {
        self.values[pair_index(p, q)]
    }

    fn set_value(&mut self, p: FluentId, q: FluentId, v: Cost) {
        self.values[pair_index(p, q)] = v;
    }

    /// The value of an action's precondition under the last evaluation.
    pub fn op_value(&self, a: ActionId) -> Cost {
        self.op_values[a]
    }

    pub fn is_mutex(&self, p: FluentId, q: FluentId) -> bool {
        self.value(p, q) == INFTY
    }

    pub fn is_mutex_set(&self, fs: &[FluentId]) -> bool {
        self.eval_fluents(fs) == INFTY
    }

    /// Max over all pairs drawn from `fs`, short-circuiting on infinity.
    pub fn eval_fluents(&self, fs: &[FluentId]) -> Cost {
        let mut v = 0.0;
        for i in 0..fs.len() {
            for j in i..fs.len() {
                v = Cost::max(v, self.value(fs[i], fs[j]));
                if v == INFTY {
                    return INFTY;
                }
            }
        }
        v
    }

    fn interferes(&self, a: ActionId, p: FluentId) -> bool {
        self.interfering[usize::from(p)].contains(a)
    }

    fn extra(&self, a: ActionId) -> Cost {
        match self.cost_model {
            H2CostModel::ZeroCosts => 0.0,
            H2CostModel::UnitCosts => 1.0,
            H2CostModel::UseCosts => self.problem.actions()[a].cost(),
        }
    }

    fn initialize(&mut self, fs: &[FluentId]) {
        self.values.fill(INFTY);
        self.op_values.fill(INFTY);
        for i in 0..fs.len() {
            let p = fs[i];
            self.set_value(p, p, 0.0);
            for j in i + 1..fs.len() {
                self.set_value(p, fs[j], 0.0);
            }
        }
    }

    fn compute(&mut self) {
        let problem = self.problem;
        loop {
            let mut fixed_point = true;
            for a in problem.action_ids() {
                let action = &problem.actions()[a];
                self.op_values[a] = self.eval_fluents(action.prec());
                if self.op_values[a] == INFTY {
                    continue;
                }
                let extra = self.extra(a);
                for i in 0..action.add().len() {
                    let p = action.add()[i];
                    for j in i..action.add().len() {
                        let q = action.add()[j];
                        if self.value(p, q) == 0.0 {
                            continue;
                        }
                        let v = self.op_values[a] + extra;
                        if v < self.value(p, q) {
                            self.set_value(p, q, v);
                            fixed_point = false;
                        }
                    }

                    for r in problem.fluent_ids() {
                        if self.interferes(a, r) || self.value(p, r) == 0.0 {
                            continue;
                        }
                        // cost of "precondition holds and r persists": the
                        // fluent r itself enters through value(r, r), the
                        // precondition through the cross terms value(r, s)
                        let mut h2_pre_noop = Cost::max(self.op_values[a], self.value(r, r));
                        if h2_pre_noop == INFTY {
                            continue;
                        }
                        for &s in action.prec() {
                            h2_pre_noop = Cost::max(h2_pre_noop, self.value(r, s));
                        }
                        let v = h2_pre_noop + extra;
                        if v < self.value(p, r) {
                            self.set_value(p, r, v);
                            fixed_point = false;
                        }
                    }
                }
            }
            if fixed_point {
                break;
            }
        }
    }

    /// Like `compute`, but updated pairs are set to 0 instead of a numeric
    /// bound: only the reachable / mutex distinction is tracked.
    fn compute_mutexes_only(&mut self) {
        let problem = self.problem;
        loop {
            let mut fixed_point = true;
            for a in problem.action_ids() {
                let action = &problem.actions()[a];
                self.op_values[a] = self.eval_fluents(action.prec());
                if self.op_values[a] == INFTY {
                    continue;
                }
                for i in 0..action.add().len() {
                    let p = action.add()[i];
                    for j in i..action.add().len() {
                        let q = action.add()[j];
                        if self.value(p, q) == 0.0 {
                            continue;
                        }
                        self.set_value(p, q, 0.0);
                        fixed_point = false;
                    }

                    for r in problem.fluent_ids() {
                        if self.interferes(a, r) || self.value(p, r) == 0.0 {
                            continue;
                        }
                        let mut h2_pre_noop = Cost::max(self.op_values[a], self.value(r, r));
                        if h2_pre_noop == INFTY {
                            continue;
                        }
                        for &s in action.prec() {
                            h2_pre_noop = Cost::max(h2_pre_noop, self.value(r, s));
                            if h2_pre_noop == INFTY {
                                break;
                            }
                        }
                        if h2_pre_noop == INFTY {
                            continue;
                        }
                        self.set_value(p, r, 0.0);
                        fixed_point = false;
                    }
                }
            }
            if fixed_point {
                break;
            }
        }
    }

    /// Computes, for every action, the fluents it effectively removes, and
    /// records them on the actions and in the problem's `edeleting` table.
    ///
    /// An action e-deletes `p` iff `p` is mutex (from the initial state)
    /// with one of its adds, or `p` is mutex with one of its preconditions
    /// and not re-added, or `p` is plainly deleted. The problem must be
    /// frozen: the e-deletes land in the `edeleting` table.
    pub fn compute_edeletes(problem: &mut StripsProblem) {
        let values = {
            let mut h2 = H2::new(problem, H2CostModel::ZeroCosts);
            h2.initialize(problem.init());
            h2.compute_mutexes_only();
            h2.values
        };

        for p in problem.fluent_ids() {
            for a in problem.action_ids() {
                let action = &problem.actions()[a];
                let mut is_edelete = action
                    .add()
                    .iter()
                    .any(|&q| values[pair_index(p, q)] == INFTY);
                if !is_edelete {
                    is_edelete = !action.asserts(p)
                        && action.prec().iter().any(|&r| values[pair_index(p, r)] == INFTY);
                }
                if !is_edelete {
                    is_edelete = action.consumes(p);
                }
                if is_edelete {
                    problem.record_edelete(a, p);
                }
            }
        }
    }
}

impl Heuristic for H2<'_> {
    fn eval(&mut self, s: &State) -> Cost {
        self.initialize(s.fluents());
        self.compute();
        self.eval_fluents(self.problem.goal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::{CostModel, HMax, H1};

    fn f(i: usize) -> FluentId {
        FluentId::from(i)
    }

    #[test]
    fn pair_index_is_symmetric_and_dense() {
        assert_eq!(pair_index(f(3), f(1)), pair_index(f(1), f(3)));
        assert_eq!(pair_index(f(0), f(0)), 0);
        // the triangular indices of 3 fluents cover 0..6 exactly once
        let mut seen: Vec<usize> = (0..3)
            .flat_map(|p| (p..3).map(move |q| pair_index(f(p), f(q))))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    fn five_rooms() -> StripsProblem {
        let mut p = StripsProblem::new("nav", "five-rooms");
        let rooms = ["Kitchen", "Sitting", "Balcony", "Bath", "Bed"];
        let fl: Vec<FluentId> = rooms
            .iter()
            .map(|r| p.add_fluent(format!("(at {r})")).unwrap())
            .collect();
        for &(u, v) in &[(0, 1), (1, 2), (1, 3), (1, 4)] {
            for (from, to) in [(u, v), (v, u)] {
                p.add_action(
                    format!("(move {} {})", rooms[from], rooms[to]),
                    vec![fl[from]],
                    vec![fl[to]],
                    vec![fl[from]],
                    vec![],
                    1.0,
                )
                .unwrap();
            }
        }
        p.set_init(&[fl[0]]).unwrap();
        p.set_goal(&[fl[2]]).unwrap();
        p.make_action_tables();
        p
    }

    #[test]
    fn locations_are_pairwise_mutex() {
        let p = five_rooms();
        let mut h2 = H2::new(&p, H2CostModel::UseCosts);
        h2.eval(&p.initial_state());
        for i in 0..5 {
            assert_eq!(h2.value(f(i), f(i)).is_finite(), true);
            for j in 0..5 {
                assert_eq!(h2.value(f(i), f(j)), h2.value(f(j), f(i)));
                if i != j {
                    assert!(h2.is_mutex(f(i), f(j)), "(at {i}) and (at {j}) should be mutex");
                }
            }
        }
    }

    #[test]
    fn op_values_and_mutex_sets_after_eval() {
        let p = five_rooms();
        let mut h2 = H2::new(&p, H2CostModel::UseCosts);
        h2.eval(&p.initial_state());

        let op = |sig: &str| {
            p.action_ids()
                .find(|&a| p.actions()[a].signature() == sig)
                .unwrap()
        };
        // precondition values read off the pair table: the kitchen is free,
        // the sitting room one step away, the balcony two
        assert_eq!(h2.op_value(op("(move Kitchen Sitting)")), 0.0);
        assert_eq!(h2.op_value(op("(move Sitting Balcony)")), 1.0);
        assert_eq!(h2.op_value(op("(move Balcony Sitting)")), 2.0);

        let at_k = p.fluent_id("(at Kitchen)").unwrap();
        let at_s = p.fluent_id("(at Sitting)").unwrap();
        assert!(h2.is_mutex_set(&[at_k, at_s]));
        assert!(!h2.is_mutex_set(&[at_k]));
        assert!(!h2.is_mutex_set(&[]));
    }

    #[test]
    fn h2_dominates_hmax() {
        let p = five_rooms();
        let init = p.initial_state();
        let mut hmax: HMax = H1::new(&p, CostModel::UseCosts);
        let mut h2 = H2::new(&p, H2CostModel::UseCosts);
        let m = hmax.eval(&init);
        let t = crate::heuristics::Heuristic::eval(&mut h2, &init);
        assert!(t >= m, "h2 = {t} must dominate hmax = {m}");
    }

    #[test]
    fn edelete_extraction_on_two_movers() {
        let mut p = StripsProblem::new("nav", "two-movers");
        let at_a = p.add_fluent("(at A)").unwrap();
        let at_b = p.add_fluent("(at B)").unwrap();
        let at_c = p.add_fluent("(at C)").unwrap();
        let ab = p
            .add_action("(move A B)", vec![at_a], vec![at_b], vec![at_a], vec![], 1.0)
            .unwrap();
        let ac = p
            .add_action("(move A C)", vec![at_a], vec![at_c], vec![at_a], vec![], 1.0)
            .unwrap();
        p.set_init(&[at_a]).unwrap();
        p.set_goal(&[at_b]).unwrap();
        p.make_action_tables();
        H2::compute_edeletes(&mut p);

        // (move A B) reaches a state mutex with (at C) and (at A)
        assert!(p.actions()[ab].edeletes(at_c));
        assert!(p.actions()[ab].edeletes(at_a));
        // (move A C) reaches a state mutex with (at B) and (at A)
        assert!(p.actions()[ac].edeletes(at_b));
        assert!(p.actions()[ac].edeletes(at_a));
        // the table mirrors the action attribute
        assert!(p.edeleting(at_c).contains(&ab));
        assert!(p.edeleting(at_b).contains(&ac));
        for a in p.action_ids() {
            let action = &p.actions()[a];
            for &e in action.edel() {
                assert!(p.edeleting(e).contains(&a));
            }
        }
    }
}
