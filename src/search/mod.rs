//! Search engines over grounded STRIPS problems.

pub mod bfs;
pub mod iw;
pub mod node;
pub mod open;
pub mod rwbfs;
pub mod serialized;

pub use bfs::BestFirstSearch;
pub use iw::IteratedWidthSearch;
pub use rwbfs::RestartingWeightedSearch;
pub use serialized::SerializedSearch;

use crate::problem::{ActionId, FluentId, StripsProblem};
use crate::search::node::{NodeArena, NodeId, SearchNode, StateIndex};
use crate::search::open::DualQueue;
use crate::state::State;
use crate::{Cost, INFTY};
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

/// Default wall-clock budget: effectively unbounded, but small enough that
/// adding it to an [`Instant`] cannot overflow.
pub(crate) const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// A plan and its cost, as returned by the engines' `find_solution`.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub cost: Cost,
    pub plan: Vec<ActionId>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStats {
    pub expanded: u64,
    pub generated: u64,
    pub evaluated: u64,
    pub replaced_in_open: u64,
    pub pruned_by_bound: u64,
}

impl SearchStats {
    pub fn absorb(&mut self, other: &SearchStats) {
        self.expanded += other.expanded;
        self.generated += other.generated;
        self.evaluated += other.evaluated;
        self.replaced_in_open += other.replaced_in_open;
        self.pruned_by_bound += other.pruned_by_bound;
    }
}

impl Display for SearchStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "expanded: {}, generated: {}, evaluated: {}, replaced in open: {}, pruned by bound: {}",
            self.expanded, self.generated, self.evaluated, self.replaced_in_open, self.pruned_by_bound
        )
    }
}

/// State shared by the best-first engines: the node arena, the open list
/// with its hash, the closed hash, bound and wall-clock budget.
pub(crate) struct EngineCore<'p> {
    pub problem: &'p StripsProblem,
    pub goal: Vec<FluentId>,
    pub arena: NodeArena,
    pub open: DualQueue,
    pub open_hash: StateIndex,
    pub closed: StateIndex,
    pub root: Option<NodeId>,
    pub bound: Cost,
    pub time_budget: Duration,
    pub deadline: Option<Instant>,
    pub stats: SearchStats,
}

impl<'p> EngineCore<'p> {
    pub fn new(problem: &'p StripsProblem) -> EngineCore<'p> {
        EngineCore {
            problem,
            goal: problem.goal().to_vec(),
            arena: NodeArena::new(),
            open: DualQueue::new(),
            open_hash: StateIndex::new(),
            closed: StateIndex::new(),
            root: None,
            bound: INFTY,
            time_budget: DEFAULT_TIME_BUDGET,
            deadline: None,
            stats: SearchStats::default(),
        }
    }

    /// Resets the engine on a fresh initial state. The bound and the time
    /// budget survive; nodes of a previous search do not.
    pub fn start(&mut self, initial: State) {
        self.arena.clear();
        self.open.clear();
        self.open_hash.clear();
        self.closed.clear();
        self.stats = SearchStats::default();
        let root = self.arena.push(SearchNode::root(initial));
        self.root = Some(root);
        self.open.push(root, 0.0, 0.0, false, false);
        self.open_hash.insert(&self.arena, root);
    }

    pub fn start_clock(&mut self) {
        self.deadline = Some(Instant::now() + self.time_budget);
    }

    pub fn out_of_time(&self) -> bool {
        match self.deadline {
            Some(deadline) => Instant::now() > deadline,
            None => false,
        }
    }

    /// Next open node, skipping queue entries whose node has already been
    /// dequeued through its other entry or superseded by a g-improvement.
    pub fn next_node(&mut self) -> Option<NodeId> {
        while let Some(id) = self.open.pop() {
            if self.open_hash.remove(&self.arena, id) {
                return Some(id);
            }
        }
        None
    }

    /// Inserts a node into the open list under both heuristic families.
    pub fn open_node(&mut self, id: NodeId, pref1: bool, pref2: bool) {
        let node = &self.arena[id];
        self.open.push(id, node.f, node.h2, pref1, pref2);
        self.open_hash.insert(&self.arena, id);
    }

    pub fn close(&mut self, id: NodeId) {
        self.closed.insert(&self.arena, id);
    }

    pub fn goal_reached(&self, id: NodeId) -> bool {
        self.arena[id].state.entails_all(&self.goal)
    }

    pub fn solution(&self, goal: NodeId) -> Solution {
        let (cost, plan) = self.arena.plan_to(goal);
        Solution { cost, plan }
    }
}
