//! Anytime dual-queue best-first search with two heuristics.

use crate::config;
use crate::heuristics::Heuristic;
use crate::problem::{ActionId, StripsProblem};
use crate::search::node::{NodeId, SearchNode};
use crate::search::{EngineCore, SearchStats, Solution};
use crate::state::State;
use crate::Cost;
use std::time::Duration;

/// Weighted best-first search with deferred evaluation: `f = g + W·h₁`,
/// four open queues keyed (preferred?, heuristic), and bound pruning.
///
/// The engine is anytime: every call to
/// [`BestFirstSearch::find_solution`] resumes from the current frontier and
/// returns the next solution strictly below the bound set by the previous
/// one, until the open list or the time budget is exhausted.
pub struct BestFirstSearch<'p, P, S> {
    pub(crate) core: EngineCore<'p>,
    primary: P,
    secondary: S,
    weight: Cost,
    pref_buf: Vec<ActionId>,
}

impl<'p, P: Heuristic, S: Heuristic> BestFirstSearch<'p, P, S> {
    pub fn new(problem: &'p StripsProblem, primary: P, secondary: S) -> Self {
        Self::with_weight(problem, primary, secondary, 1.0)
    }

    pub fn with_weight(problem: &'p StripsProblem, primary: P, secondary: S, weight: Cost) -> Self {
        BestFirstSearch {
            core: EngineCore::new(problem),
            primary,
            secondary,
            weight,
            pref_buf: Vec::new(),
        }
    }

    /// Begins a search from `initial`, dropping any previous frontier.
    pub fn start(&mut self, initial: State) {
        self.core.start(initial);
    }

    pub fn set_bound(&mut self, bound: Cost) {
        self.core.bound = bound;
    }

    pub fn bound(&self) -> Cost {
        self.core.bound
    }

    pub fn set_time_budget(&mut self, budget: Duration) {
        self.core.time_budget = budget;
    }

    pub fn stats(&self) -> &SearchStats {
        &self.core.stats
    }

    pub fn find_solution(&mut self) -> Option<Solution> {
        self.core.start_clock();
        let goal = self.do_search()?;
        Some(self.core.solution(goal))
    }

    fn do_search(&mut self) -> Option<NodeId> {
        while let Some(head) = self.core.next_node() {
            if self.core.arena[head].g >= self.core.bound {
                self.core.stats.pruned_by_bound += 1;
                self.core.close(head);
                continue;
            }
            if self.core.goal_reached(head) {
                self.core.close(head);
                self.core.bound = self.core.arena[head].g;
                if config::TRACE_SEARCH.get() {
                    eprintln!("[bfs] solution with cost {}", self.core.bound);
                }
                return Some(head);
            }
            if self.core.out_of_time() {
                // hand the head back so a later call can resume
                self.core.open_node(head, false, false);
                return None;
            }
            self.evaluate(head);
            self.process(head);
            self.core.close(head);
        }
        None
    }

    /// Deferred evaluation: runs both heuristics on a dequeued node and
    /// records their preferred operators. Seen nodes keep cached values.
    fn evaluate(&mut self, id: NodeId) {
        if self.core.arena[id].seen {
            return;
        }
        self.core.stats.evaluated += 1;

        self.pref_buf.clear();
        let h1 = self
            .primary
            .eval_with_preferred(&self.core.arena[id].state, &mut self.pref_buf);
        self.core.arena[id].h1 = h1;
        self.core.arena[id].po1.clear();
        for &a in &self.pref_buf {
            self.core.arena[id].po1.insert(a);
        }

        self.pref_buf.clear();
        let h2 = self
            .secondary
            .eval_with_preferred(&self.core.arena[id].state, &mut self.pref_buf);
        self.core.arena[id].h2 = h2;
        self.core.arena[id].po2.clear();
        for &a in &self.pref_buf {
            self.core.arena[id].po2.insert(a);
        }
    }

    fn process(&mut self, head: NodeId) {
        let problem = self.core.problem;
        let head_state = self.core.arena[head].state.clone();
        let head_g = self.core.arena[head].g;
        let head_h1 = self.core.arena[head].h1;
        let head_h2 = self.core.arena[head].h2;

        for a in problem.applicable_actions(&head_state) {
            let action = &problem.actions()[a];
            let succ = head_state.apply(action);
            let g = head_g + action.cost();
            let pref1 = self.core.arena[head].po1.contains(a);
            let pref2 = self.core.arena[head].po2.contains(a);

            if let Some(prev) = self.core.closed.get(&self.core.arena, &succ) {
                if g < self.core.arena[prev].g {
                    // a cheaper path to a closed state: rewrite it and reopen
                    let w = self.weight;
                    let node = &mut self.core.arena[prev];
                    node.parent = Some(head);
                    node.action = Some(a);
                    node.g = g;
                    node.f = g + w * node.h1;
                    self.core.closed.remove(&self.core.arena, prev);
                    self.core.open_node(prev, pref1, pref2);
                }
                continue;
            }

            if let Some(prev) = self.core.open_hash.get(&self.core.arena, &succ) {
                if g < self.core.arena[prev].g {
                    let w = self.weight;
                    let node = &mut self.core.arena[prev];
                    node.parent = Some(head);
                    node.action = Some(a);
                    node.g = g;
                    node.f = g + w * node.h1;
                    let (f, h2) = (node.f, node.h2);
                    // the superseded queue entries turn stale and are skipped
                    self.core.open.push(prev, f, h2, pref1, pref2);
                    self.core.stats.replaced_in_open += 1;
                }
                continue;
            }

            let mut node = SearchNode::child(succ, head, a, g);
            node.h1 = head_h1;
            node.h2 = head_h2;
            node.f = g + self.weight * head_h1;
            let id = self.core.arena.push(node);
            self.core.open_node(id, pref1, pref2);
            self.core.stats.generated += 1;
        }
        self.core.stats.expanded += 1;
    }
}
