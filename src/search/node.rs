//! Search nodes, the arena that owns them, and state-keyed indexes.
//!
//! Nodes are owned by a [`NodeArena`] and addressed by [`NodeId`]; parent
//! links are ids, never references, so plan extraction is a simple id walk.
//! The open, closed and seen collections are [`StateIndex`]es over the same
//! arena: membership transitions move ids between indexes, nodes are never
//! copied.

use crate::collections::IndexSet;
use crate::create_index_type;
use crate::problem::ActionId;
use crate::state::State;
use crate::Cost;
use hashbrown::HashMap;

create_index_type!(NodeId);

pub struct SearchNode {
    pub state: State,
    pub parent: Option<NodeId>,
    /// The action that produced this node from its parent.
    pub action: Option<ActionId>,
    pub g: Cost,
    pub h1: Cost,
    pub h2: Cost,
    pub f: Cost,
    /// Preferred operators per heuristic, set when the node is evaluated.
    pub po1: IndexSet<ActionId>,
    pub po2: IndexSet<ActionId>,
    /// Set on restart; seen nodes keep their cached heuristic values.
    pub seen: bool,
}

impl SearchNode {
    pub fn root(state: State) -> SearchNode {
        SearchNode {
            state,
            parent: None,
            action: None,
            g: 0.0,
            h1: 0.0,
            h2: 0.0,
            f: 0.0,
            po1: IndexSet::new(),
            po2: IndexSet::new(),
            seen: false,
        }
    }

    pub fn child(state: State, parent: NodeId, action: ActionId, g: Cost) -> SearchNode {
        SearchNode {
            state,
            parent: Some(parent),
            action: Some(action),
            g,
            h1: 0.0,
            h2: 0.0,
            f: 0.0,
            po1: IndexSet::new(),
            po2: IndexSet::new(),
            seen: false,
        }
    }
}

#[derive(Default)]
pub struct NodeArena {
    nodes: Vec<SearchNode>,
}

impl NodeArena {
    pub fn new() -> NodeArena {
        Default::default()
    }

    pub fn push(&mut self, node: SearchNode) -> NodeId {
        let id = NodeId::from(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear()
    }

    /// The action indices leading from the root to `id`, in order, and the
    /// accumulated cost.
    pub fn plan_to(&self, id: NodeId) -> (Cost, Vec<ActionId>) {
        let mut plan = Vec::new();
        let mut cursor = id;
        while let Some(action) = self.nodes[cursor].action {
            plan.push(action);
            cursor = self.nodes[cursor].parent.expect("non-root node without parent");
        }
        plan.reverse();
        (self.nodes[id].g, plan)
    }
}

impl std::ops::Index<NodeId> for NodeArena {
    type Output = SearchNode;
    fn index(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id]
    }
}

impl std::ops::IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id]
    }
}

/// A hash index from states to node ids, bucketed by the states' cached
/// hashes. Full state equality resolves collisions.
#[derive(Default)]
pub struct StateIndex {
    buckets: HashMap<u64, Vec<NodeId>>,
}

impl StateIndex {
    pub fn new() -> StateIndex {
        Default::default()
    }

    /// The id registered for a state equal to `state`, if any.
    pub fn get(&self, arena: &NodeArena, state: &State) -> Option<NodeId> {
        let bucket = self.buckets.get(&state.hash_value())?;
        bucket.iter().copied().find(|&id| arena[id].state == *state)
    }

    pub fn contains(&self, arena: &NodeArena, state: &State) -> bool {
        self.get(arena, state).is_some()
    }

    pub fn insert(&mut self, arena: &NodeArena, id: NodeId) {
        let hash = arena[id].state.hash_value();
        self.buckets.entry(hash).or_default().push(id);
    }

    /// Unregisters `id`; true iff it was present.
    pub fn remove(&mut self, arena: &NodeArena, id: NodeId) -> bool {
        let hash = arena[id].state.hash_value();
        if let Some(bucket) = self.buckets.get_mut(&hash) {
            if let Some(pos) = bucket.iter().position(|&x| x == id) {
                bucket.swap_remove(pos);
                return true;
            }
        }
        false
    }

    pub fn clear(&mut self) {
        self.buckets.clear()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.buckets.values().flatten().copied()
    }
}
