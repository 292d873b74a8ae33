//! Numeric evaluation functions over states.

pub mod h1;
pub mod h2;
pub mod novelty;

pub use h1::{AddAggregation, Aggregation, CostModel, HAdd, HMax, MaxAggregation, H1};
pub use h2::{pair_index, H2CostModel, H2};
pub use novelty::Novelty;

use crate::problem::ActionId;
use crate::state::State;
use crate::Cost;

/// The capability a search engine needs from a heuristic.
///
/// Evaluation takes `&mut self`: heuristics reuse internal tables across
/// calls. A heuristic that can mark preferred operators overrides
/// [`Heuristic::eval_with_preferred`]; the default ignores the request.
pub trait Heuristic {
    fn eval(&mut self, s: &State) -> Cost;

    fn eval_with_preferred(&mut self, s: &State, _preferred: &mut Vec<ActionId>) -> Cost {
        self.eval(s)
    }
}
