//! The delete-relaxation heuristic family h¹: h_max and h_add.
//!
//! A per-fluent cost table is computed by chaotic relaxation: fluents of the
//! evaluated state cost 0, every other fluent starts unreachable, and
//! actions repeatedly lower the cost of the fluents they add until a fixed
//! point. Aggregating supporter costs by max yields the admissible h_max;
//! by sum, the more informative (inadmissible) h_add.

use crate::fluent_set::FluentSet;
use crate::heuristics::Heuristic;
use crate::problem::{Action, ActionId, FluentId, StripsProblem};
use crate::state::State;
use crate::{Cost, INFTY};
use std::collections::VecDeque;

/// How an action's cost enters the relaxation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CostModel {
    /// Every action counts 1.
    IgnoreCosts,
    /// Every action counts its own cost.
    UseCosts,
    /// Every action counts 1 + its cost.
    Lama,
}

impl CostModel {
    fn cost(self, a: &Action) -> Cost {
        match self {
            CostModel::IgnoreCosts => 1.0,
            CostModel::UseCosts => a.cost(),
            CostModel::Lama => 1.0 + a.cost(),
        }
    }
}

/// Folds the value-table entries of a fluent conjunction into a single cost.
pub trait Aggregation {
    fn fold(values: &[Cost], fs: &[FluentId], seed: Cost) -> Cost;
}

/// Max aggregation: h_max. Admissible.
pub struct MaxAggregation;

impl Aggregation for MaxAggregation {
    fn fold(values: &[Cost], fs: &[FluentId], seed: Cost) -> Cost {
        let mut v = seed;
        for &f in fs {
            if values[f] > v {
                v = values[f];
            }
            if v == INFTY {
                return v;
            }
        }
        v
    }
}

/// Sum aggregation: h_add. Inadmissible but informative.
pub struct AddAggregation;

impl Aggregation for AddAggregation {
    fn fold(values: &[Cost], fs: &[FluentId], seed: Cost) -> Cost {
        let mut v = seed;
        for &f in fs {
            if values[f] == INFTY {
                return INFTY;
            }
            v += values[f];
        }
        v
    }
}

pub struct H1<'p, A> {
    problem: &'p StripsProblem,
    cost_model: CostModel,
    values: Vec<Cost>,
    best_supporters: Vec<Option<ActionId>>,
    /// fluent -> actions whose precondition, or one of whose conditional
    /// effect preconditions, contains it
    relevant: Vec<Vec<ActionId>>,
    queue: VecDeque<FluentId>,
    queued: FluentSet,
    allowed: Vec<bool>,
    _agg: std::marker::PhantomData<A>,
}

pub type HMax<'p> = H1<'p, MaxAggregation>;
pub type HAdd<'p> = H1<'p, AddAggregation>;

impl<'p, A: Aggregation> H1<'p, A> {
    pub fn new(problem: &'p StripsProblem, cost_model: CostModel) -> H1<'p, A> {
        let nf = problem.num_fluents();
        let mut relevant = vec![Vec::new(); nf];
        for a in problem.action_ids() {
            let action = &problem.actions()[a];
            for &f in action.prec() {
                relevant[f].push(a);
            }
            for ceff in action.ceffs() {
                for &f in ceff.prec() {
                    relevant[f].push(a);
                }
            }
        }
        for list in &mut relevant {
            list.sort_unstable();
            list.dedup();
        }
        H1 {
            problem,
            cost_model,
            values: vec![INFTY; nf],
            best_supporters: vec![None; nf],
            relevant,
            queue: VecDeque::new(),
            queued: FluentSet::with_capacity(nf),
            allowed: vec![true; problem.num_actions()],
            _agg: std::marker::PhantomData,
        }
    }

    /// The value of a single fluent under the last evaluation.
    pub fn value(&self, f: FluentId) -> Cost {
        self.values[f]
    }

    /// The action that last lowered the value of `f`, if any.
    pub fn best_supporter(&self, f: FluentId) -> Option<ActionId> {
        self.best_supporters[f]
    }

    fn update(&mut self, p: FluentId, v: Cost, supporter: Option<ActionId>) {
        if v >= self.values[p] {
            return;
        }
        self.values[p] = v;
        if !self.queued.contains(p) {
            self.queue.push_back(p);
            self.queued.insert(p);
        }
        if supporter.is_some() {
            self.best_supporters[p] = supporter;
        }
    }

    fn initialize(&mut self, s: &State) {
        self.values.fill(INFTY);
        self.best_supporters.fill(None);
        self.queue.clear();
        self.queued.clear();

        let problem = self.problem;
        for &a in problem.empty_prec_actions() {
            let action = &problem.actions()[a];
            let v = self.cost_model.cost(action);
            for i in 0..action.add().len() {
                self.update(action.add()[i], v, None);
            }
            for k in 0..action.ceffs().len() {
                let ceff = &action.ceffs()[k];
                if !ceff.prec().is_empty() {
                    continue;
                }
                for i in 0..ceff.add().len() {
                    self.update(ceff.add()[i], v, None);
                }
            }
        }

        for &f in s.fluents() {
            self.values[f] = 0.0;
            if !self.queued.contains(f) {
                self.queue.push_back(f);
                self.queued.insert(f);
            }
        }
    }

    fn compute(&mut self) {
        let problem = self.problem;
        while let Some(p) = self.queue.pop_front() {
            self.queued.remove(p);
            for k in 0..self.relevant[p].len() {
                let a = self.relevant[p][k];
                self.relax(problem, a);
            }
        }
    }

    fn relax(&mut self, problem: &'p StripsProblem, a: ActionId) {
        let action = &problem.actions()[a];
        let h_pre = A::fold(&self.values, action.prec(), 0.0);
        if h_pre == INFTY {
            return;
        }
        let v = self.cost_model.cost(action) + h_pre;
        for i in 0..action.add().len() {
            self.update(action.add()[i], v, Some(a));
        }
        for k in 0..action.ceffs().len() {
            let ceff = &action.ceffs()[k];
            let h_cond = A::fold(&self.values, ceff.prec(), h_pre);
            if h_cond == INFTY {
                continue;
            }
            let v_eff = self.cost_model.cost(action) + h_cond;
            for i in 0..ceff.add().len() {
                self.update(ceff.add()[i], v_eff, Some(a));
            }
        }
    }

    /// Plain reachability: like [`Heuristic::eval`] but all actions count
    /// zero, and every action that adds or e-deletes a fluent of `persist`
    /// is disabled. Returns the aggregated value of the goal; per-fluent
    /// values are available through [`H1::value`].
    pub fn eval_reachability(&mut self, s: &State, persist: &[FluentId]) -> Cost {
        let problem = self.problem;
        for a in problem.action_ids() {
            let action = &problem.actions()[a];
            self.allowed[a] =
                !persist.iter().any(|&f| action.asserts(f) || action.edeletes(f));
        }
        self.initialize(s);
        while let Some(p) = self.queue.pop_front() {
            self.queued.remove(p);
            for k in 0..self.relevant[p].len() {
                let a = self.relevant[p][k];
                if !self.allowed[a] {
                    continue;
                }
                self.relax_reachability(problem, a);
            }
        }
        A::fold(&self.values, problem.goal(), 0.0)
    }

    fn relax_reachability(&mut self, problem: &'p StripsProblem, a: ActionId) {
        let action = &problem.actions()[a];
        let h_pre = A::fold(&self.values, action.prec(), 0.0);
        if h_pre == INFTY {
            return;
        }
        for i in 0..action.add().len() {
            self.update(action.add()[i], 0.0, Some(a));
        }
        for k in 0..action.ceffs().len() {
            let ceff = &action.ceffs()[k];
            let h_cond = Cost::max(A::fold(&self.values, ceff.prec(), 0.0), h_pre);
            if h_cond == INFTY {
                continue;
            }
            for i in 0..ceff.add().len() {
                self.update(ceff.add()[i], 0.0, Some(a));
            }
        }
    }

    /// Best supporters of the goal, and of their preconditions, recursively.
    fn extract_preferred(&self, preferred: &mut Vec<ActionId>) {
        preferred.clear();
        let mut marked = vec![false; self.problem.num_actions()];
        let mut visited = FluentSet::with_capacity(self.problem.num_fluents());
        let mut stack: Vec<FluentId> = self.problem.goal().to_vec();
        while let Some(g) = stack.pop() {
            if visited.contains(g) {
                continue;
            }
            visited.insert(g);
            if self.values[g] == 0.0 || self.values[g] == INFTY {
                continue;
            }
            if let Some(a) = self.best_supporters[g] {
                if !marked[usize::from(a)] {
                    marked[usize::from(a)] = true;
                    preferred.push(a);
                }
                stack.extend_from_slice(self.problem.actions()[a].prec());
            }
        }
    }
}

impl<A: Aggregation> Heuristic for H1<'_, A> {
    fn eval(&mut self, s: &State) -> Cost {
        self.initialize(s);
        self.compute();
        A::fold(&self.values, self.problem.goal(), 0.0)
    }

    fn eval_with_preferred(&mut self, s: &State, preferred: &mut Vec<ActionId>) -> Cost {
        let h = self.eval(s);
        self.extract_preferred(preferred);
        h
    }
}
