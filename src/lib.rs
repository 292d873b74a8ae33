//! Grounded STRIPS planning problems and heuristic forward state-space search.
//!
//! The crate is organized in three layers:
//!  - [`problem`] holds the static description of a planning task: fluents,
//!    actions with optional conditional effects, the initial and goal fluent
//!    sets, and the relational tables binding them together. A problem is
//!    built incrementally and frozen by
//!    [`StripsProblem::make_action_tables`].
//!  - [`heuristics`] provides numeric evaluation functions over states:
//!    the delete-relaxation family (`h_max` / `h_add`), the pairwise `h²`
//!    (which also extracts e-deletes and mutexes), and novelty.
//!  - [`search`] drives the planning itself: anytime (restarting, weighted)
//!    best-first search with dual open queues and preferred operators,
//!    iterated-width search, and goal-serialized search.
//!
//! Problems come from an external grounder; the crate neither parses nor
//! grounds PDDL.

pub mod collections;
pub mod config;
pub mod fluent_set;
pub mod heuristics;
pub mod problem;
pub mod search;
pub mod state;
pub mod succ_gen;

/// Numeric type shared by action costs and heuristic values.
pub type Cost = f32;

/// The one sentinel for "unreachable". Action costs are always finite;
/// only heuristic values may take this value.
pub const INFTY: Cost = f32::INFINITY;

pub use problem::{Action, ActionId, ConditionalEffect, Fluent, FluentId, ModelError, StripsProblem};
pub use state::State;
