//! Iterated-width search: breadth-first with novelty-based admission.

use crate::config;
use crate::heuristics::{Heuristic, Novelty};
use crate::problem::{FluentId, StripsProblem};
use crate::search::node::{NodeArena, SearchNode, StateIndex};
use crate::search::{SearchStats, Solution};
use crate::state::State;
use crate::Cost;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Runs breadth-first searches that discard every generated state whose
/// novelty exceeds the current width, starting at width 1 and widening
/// until `max_width`.
pub struct IteratedWidthSearch<'p> {
    problem: &'p StripsProblem,
    goal: Vec<FluentId>,
    max_width: usize,
    initial: Option<State>,
    time_budget: Duration,
    deadline: Option<Instant>,
    stats: SearchStats,
}

impl<'p> IteratedWidthSearch<'p> {
    pub fn new(problem: &'p StripsProblem, max_width: usize) -> IteratedWidthSearch<'p> {
        IteratedWidthSearch {
            problem,
            goal: problem.goal().to_vec(),
            max_width,
            initial: None,
            time_budget: crate::search::DEFAULT_TIME_BUDGET,
            deadline: None,
            stats: SearchStats::default(),
        }
    }

    /// Overrides the goal conjunction (the problem's goal by default).
    pub fn set_goal(&mut self, goal: Vec<FluentId>) {
        self.goal = goal;
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

    pub fn find_solution(&mut self) -> Option<Solution> {
        let initial = self.initial.clone()?;
        self.deadline = Some(Instant::now() + self.time_budget);
        for width in 1..=self.max_width {
            let mut novelty = Novelty::new(self.problem, width);
            if width > 1 && novelty.downgraded() {
                // wider tables do not fit in memory; nothing new to try
                break;
            }
            if config::TRACE_SEARCH.get() {
                eprintln!("[iw] trying width {width}");
            }
            if let Some(solution) = self.bounded_search(&initial, width, &mut novelty) {
                return Some(solution);
            }
            if self.out_of_time() {
                return None;
            }
        }
        None
    }

    fn out_of_time(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() > deadline,
            None => false,
        }
    }

    fn bounded_search(
        &mut self,
        initial: &State,
        width: usize,
        novelty: &mut Novelty,
    ) -> Option<Solution> {
        let problem = self.problem;
        let mut arena = NodeArena::new();
        let mut registered = StateIndex::new();
        let mut queue = VecDeque::new();

        let root = arena.push(SearchNode::root(initial.clone()));
        registered.insert(&arena, root);
        // the root is admitted unconditionally but still marks its tuples
        novelty.eval(&arena[root].state);
        self.stats.evaluated += 1;
        queue.push_back(root);

        while let Some(head) = queue.pop_front() {
            if self.out_of_time() {
                return None;
            }
            if arena[head].state.entails_all(&self.goal) {
                let (cost, plan) = arena.plan_to(head);
                return Some(Solution { cost, plan });
            }
            let head_state = arena[head].state.clone();
            let head_g = arena[head].g;
            for a in problem.applicable_actions(&head_state) {
                let action = &problem.actions()[a];
                let succ = head_state.apply(action);
                if registered.contains(&arena, &succ) {
                    continue;
                }
                self.stats.generated += 1;
                let w = novelty.eval_node(&succ, action.add());
                self.stats.evaluated += 1;
                if w > width as Cost {
                    continue;
                }
                let id = arena.push(SearchNode::child(succ, head, a, head_g + action.cost()));
                registered.insert(&arena, id);
                queue.push_back(id);
            }
            self.stats.expanded += 1;
        }
        None
    }
}
