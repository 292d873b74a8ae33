//! Anytime restarting weighted best-first search.
//!
//! Weighted A* over the dual-queue open list, restarted from the root each
//! time a solution is found. The weight decays across solutions, and the
//! nodes explored before a restart are remembered in a "seen" list so that
//! re-encountering them skips heuristic evaluation. The rationale for
//! restarting is laid out in "The Joy of Forgetting: Faster Anytime Search
//! via Restarting" (Richter, Thayer and Ruml, ICAPS 2010).

use crate::config;
use crate::heuristics::Heuristic;
use crate::problem::{ActionId, StripsProblem};
use crate::search::node::{NodeId, SearchNode, StateIndex};
use crate::search::{EngineCore, SearchStats, Solution};
use crate::state::State;
use crate::Cost;
use std::time::Duration;

pub struct RestartingWeightedSearch<'p, P, S> {
    core: EngineCore<'p>,
    primary: P,
    secondary: S,
    weight: Cost,
    decay: Cost,
    seen: StateIndex,
    pref_buf: Vec<ActionId>,
}

impl<'p, P: Heuristic, S: Heuristic> RestartingWeightedSearch<'p, P, S> {
    /// Engine with the customary W = 5, decay = 0.75.
    pub fn new(problem: &'p StripsProblem, primary: P, secondary: S) -> Self {
        Self::with_parameters(problem, primary, secondary, 5.0, 0.75)
    }

    pub fn with_parameters(
        problem: &'p StripsProblem,
        primary: P,
        secondary: S,
        weight: Cost,
        decay: Cost,
    ) -> Self {
        RestartingWeightedSearch {
            core: EngineCore::new(problem),
            primary,
            secondary,
            weight,
            decay,
            seen: StateIndex::new(),
            pref_buf: Vec::new(),
        }
    }

    pub fn start(&mut self, initial: State) {
        self.core.start(initial);
        self.seen.clear();
    }

    pub fn set_bound(&mut self, bound: Cost) {
        self.core.bound = bound;
    }

    pub fn bound(&self) -> Cost {
        self.core.bound
    }

    /// The current weight; decays by the decay factor (never below 1) each
    /// time a solution is found.
    pub fn weight(&self) -> Cost {
        self.weight
    }

    pub fn set_time_budget(&mut self, budget: Duration) {
        self.core.time_budget = budget;
    }

    pub fn stats(&self) -> &SearchStats {
        &self.core.stats
    }

    /// The next solution, strictly cheaper than any found before. Returns
    /// `None` when the frontier is exhausted under the current bound or the
    /// time budget runs out; in the latter case a later call resumes.
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
                self.weight = (self.weight * self.decay).max(1.0);
                if config::TRACE_SEARCH.get() {
                    eprintln!(
                        "[rwbfs] solution with cost {}, restarting with W = {}",
                        self.core.bound, self.weight
                    );
                }
                self.restart();
                return Some(head);
            }
            if self.core.out_of_time() {
                self.core.open_node(head, false, false);
                return None;
            }
            self.evaluate(head);
            self.process(head);
            self.core.close(head);
        }
        None
    }

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
                    self.core.open.push(prev, f, h2, pref1, pref2);
                    self.core.stats.replaced_in_open += 1;
                }
                continue;
            }

            if self.reopen_seen(head, a, &succ, g) {
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

    /// If `succ` was seen before the last restart, re-opens the remembered
    /// node with its cached heuristic values instead of allocating and
    /// evaluating a fresh one.
    fn reopen_seen(&mut self, head: NodeId, a: ActionId, succ: &State, g: Cost) -> bool {
        let Some(prev) = self.seen.get(&self.core.arena, succ) else {
            return false;
        };
        if g < self.core.arena[prev].g {
            let node = &mut self.core.arena[prev];
            node.g = g;
            node.parent = Some(head);
            node.action = Some(a);
        }
        let w = self.weight;
        let node = &mut self.core.arena[prev];
        node.f = node.g + w * node.h1;
        // preferredness is judged from the recorded parent, which the
        // g-update above may just have rewritten
        let parent = node.parent.expect("seen node with no parent");
        let action = node.action.expect("seen node with no action");
        let pref1 = self.core.arena[parent].po1.contains(action);
        let pref2 = self.core.arena[parent].po2.contains(action);
        self.seen.remove(&self.core.arena, prev);
        self.core.open_node(prev, pref1, pref2);
        true
    }

    /// Moves the closed list into the seen list (keeping the cheaper node
    /// when a state occurs in both), clears the frontier and re-opens the
    /// root as the only open node. The root keeps its cached heuristic
    /// values and is never re-evaluated.
    fn restart(&mut self) {
        let root = self.core.root.expect("start() must be called before searching");
        let closed_ids: Vec<NodeId> = self.core.closed.ids().collect();
        for id in closed_ids {
            self.core.arena[id].seen = true;
            if id == root {
                continue;
            }
            match self.seen.get(&self.core.arena, &self.core.arena[id].state) {
                None => self.seen.insert(&self.core.arena, id),
                Some(prev) => {
                    if self.core.arena[id].g < self.core.arena[prev].g {
                        self.seen.remove(&self.core.arena, prev);
                        self.seen.insert(&self.core.arena, id);
                    }
                }
            }
        }
        self.core.closed.clear();
        self.core.open.clear();
        self.core.open_hash.clear();

        let w = self.weight;
        let node = &mut self.core.arena[root];
        node.f = node.g + w * node.h1;
        self.core.open_node(root, false, false);
    }
}
