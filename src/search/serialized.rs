//! Goal-serialized search: achieve the goal one atom at a time.

use crate::config;
use crate::heuristics::{CostModel, HMax, H1};
use crate::problem::{FluentId, StripsProblem};
use crate::search::{IteratedWidthSearch, SearchStats, Solution};
use crate::state::State;
use crate::INFTY;
use std::time::{Duration, Instant};

/// Serializes the goal: repeatedly commits to one more goal atom and runs
/// an inner iterated-width search for the conjunction achieved so far, each
/// partial plan starting from the end state of the previous one.
///
/// An atom is only committed when the reachability relaxation of h¹ deems
/// it achievable without touching the atoms already achieved (actions that
/// add or e-delete a persisted atom are disabled, so a candidate whose
/// every path breaks prior goals is rejected). Run
/// [`crate::heuristics::H2::compute_edeletes`] on the problem first for the
/// stronger e-delete-based persistence check.
pub struct SerializedSearch<'p> {
    problem: &'p StripsProblem,
    max_width: usize,
    reachability: HMax<'p>,
    goals_achieved: Vec<FluentId>,
    goal_candidates: Vec<FluentId>,
    initial: Option<State>,
    time_budget: Duration,
    stats: SearchStats,
}

impl<'p> SerializedSearch<'p> {
    pub fn new(problem: &'p StripsProblem, max_width: usize) -> SerializedSearch<'p> {
        SerializedSearch {
            problem,
            max_width,
            reachability: H1::new(problem, CostModel::UseCosts),
            goals_achieved: Vec::new(),
            goal_candidates: Vec::new(),
            initial: None,
            time_budget: crate::search::DEFAULT_TIME_BUDGET,
            stats: SearchStats::default(),
        }
    }

    pub fn start(&mut self, initial: State) {
        self.initial = Some(initial);
        self.stats = SearchStats::default();
    }

    pub fn set_time_budget(&mut self, budget: Duration) {
        self.time_budget = budget;
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// The goal atoms in the order they were achieved, for inspection after
    /// a solve.
    pub fn goals_achieved(&self) -> &[FluentId] {
        &self.goals_achieved
    }

    pub fn find_solution(&mut self) -> Option<Solution> {
        let mut current = self.initial.clone()?;
        let deadline = Instant::now() + self.time_budget;
        self.goals_achieved.clear();
        self.goal_candidates = self.problem.goal().to_vec();

        let mut plan = Vec::new();
        let mut cost = 0.0;
        while !current.entails_all(self.problem.goal()) {
            if Instant::now() > deadline {
                return None;
            }
            let next = self.pick_candidate(&current)?;
            self.goals_achieved.push(next);
            if config::TRACE_SEARCH.get() {
                eprintln!(
                    "[serialized] committing to {}",
                    self.problem.fluents()[next].signature()
                );
            }

            let mut inner = IteratedWidthSearch::new(self.problem, self.max_width);
            inner.set_goal(self.goals_achieved.clone());
            inner.set_time_budget(deadline.saturating_duration_since(Instant::now()));
            inner.start(current.clone());
            let partial = inner.find_solution();
            self.stats.absorb(inner.stats());
            let partial = partial?;

            for &a in &partial.plan {
                current = current.apply(&self.problem.actions()[a]);
            }
            plan.extend_from_slice(&partial.plan);
            cost += partial.cost;
        }
        Some(Solution { cost, plan })
    }

    /// The first candidate whose reachability value is finite when every
    /// already achieved goal has to persist; removed from the candidate
    /// list on success.
    fn pick_candidate(&mut self, current: &State) -> Option<FluentId> {
        self.reachability.eval_reachability(current, &self.goals_achieved);
        let pos = self
            .goal_candidates
            .iter()
            .position(|&g| self.reachability.value(g) != INFTY)?;
        Some(self.goal_candidates.remove(pos))
    }
}
