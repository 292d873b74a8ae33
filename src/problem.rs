//! Static description of a grounded STRIPS planning task.
//!
//! A [`StripsProblem`] owns its fluents, actions and conditional effects;
//! all of them are created through the problem's `add_*` operations. Once
//! every action has been registered, [`StripsProblem::make_action_tables`]
//! populates the relational tables (who requires / adds / deletes a fluent)
//! and builds the successor generator; the problem is then frozen and can be
//! shared read-only with heuristics and search engines.

use crate::create_index_type;
use crate::fluent_set::FluentSet;
use crate::state::State;
use crate::succ_gen::SuccessorGenerator;
use crate::Cost;
use hashbrown::HashMap;
use itertools::Itertools;
use std::fmt::{Display, Formatter};
use thiserror::Error;

create_index_type!(FluentId);
create_index_type!(ActionId);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("fluent index {0} is out of range")]
    BadFluentIndex(usize),
    #[error("action index {0} is out of range")]
    BadActionIndex(usize),
    #[error("signature {0:?} is already registered")]
    DuplicateSignature(String),
    #[error("the problem is frozen; actions cannot be added after make_action_tables")]
    ProblemFrozen,
}

/// A ground atomic proposition, immutable after registration.
pub struct Fluent {
    index: FluentId,
    signature: String,
}

impl Fluent {
    pub fn index(&self) -> FluentId {
        self.index
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }
}

/// An effect nested inside an action, applied only when its own precondition
/// is entailed by the state the action is applied in.
pub struct ConditionalEffect {
    prec: Vec<FluentId>,
    add: Vec<FluentId>,
    del: Vec<FluentId>,
    prec_set: FluentSet,
    add_set: FluentSet,
    del_set: FluentSet,
}

impl ConditionalEffect {
    pub fn new(prec: Vec<FluentId>, add: Vec<FluentId>, del: Vec<FluentId>) -> ConditionalEffect {
        let prec_set = prec.iter().copied().collect();
        let add_set = add.iter().copied().collect();
        let del_set = del.iter().copied().collect();
        ConditionalEffect {
            prec,
            add,
            del,
            prec_set,
            add_set,
            del_set,
        }
    }

    pub fn prec(&self) -> &[FluentId] {
        &self.prec
    }
    pub fn add(&self) -> &[FluentId] {
        &self.add
    }
    pub fn del(&self) -> &[FluentId] {
        &self.del
    }
    pub fn prec_set(&self) -> &FluentSet {
        &self.prec_set
    }
    pub fn add_set(&self) -> &FluentSet {
        &self.add_set
    }
    pub fn del_set(&self) -> &FluentSet {
        &self.del_set
    }
}

/// A ground action: precondition, adds, deletes, optional conditional
/// effects, and a nonnegative cost.
///
/// Every fluent vector carries a bitset twin so that iteration and O(1)
/// membership are both cheap. The `edel` set (fluents the action effectively
/// removes, directly or by reaching a mutex state) is empty until
/// [`crate::heuristics::H2::compute_edeletes`] is run.
pub struct Action {
    index: ActionId,
    signature: String,
    cost: Cost,
    prec: Vec<FluentId>,
    add: Vec<FluentId>,
    del: Vec<FluentId>,
    prec_set: FluentSet,
    add_set: FluentSet,
    del_set: FluentSet,
    ceffs: Vec<ConditionalEffect>,
    edel: Vec<FluentId>,
    edel_set: FluentSet,
}

impl Action {
    pub fn index(&self) -> ActionId {
        self.index
    }
    pub fn signature(&self) -> &str {
        &self.signature
    }
    pub fn cost(&self) -> Cost {
        self.cost
    }
    pub fn prec(&self) -> &[FluentId] {
        &self.prec
    }
    pub fn add(&self) -> &[FluentId] {
        &self.add
    }
    pub fn del(&self) -> &[FluentId] {
        &self.del
    }
    pub fn prec_set(&self) -> &FluentSet {
        &self.prec_set
    }
    pub fn add_set(&self) -> &FluentSet {
        &self.add_set
    }
    pub fn del_set(&self) -> &FluentSet {
        &self.del_set
    }
    pub fn ceffs(&self) -> &[ConditionalEffect] {
        &self.ceffs
    }
    pub fn edel(&self) -> &[FluentId] {
        &self.edel
    }

    /// True iff `f` is a precondition of the action.
    pub fn requires(&self, f: FluentId) -> bool {
        self.prec_set.contains(f)
    }

    /// True iff the action adds `f`.
    pub fn asserts(&self, f: FluentId) -> bool {
        self.add_set.contains(f)
    }

    /// True iff the action deletes `f`.
    pub fn consumes(&self, f: FluentId) -> bool {
        self.del_set.contains(f)
    }

    /// True iff the action effectively removes `f` (see
    /// [`crate::heuristics::H2::compute_edeletes`]).
    pub fn edeletes(&self, f: FluentId) -> bool {
        self.edel_set.contains(f)
    }
}

/// A grounded STRIPS planning task.
pub struct StripsProblem {
    domain_name: String,
    problem_name: String,
    fluents: Vec<Fluent>,
    actions: Vec<Action>,
    fluent_ids: HashMap<String, FluentId>,
    init: Vec<FluentId>,
    init_set: FluentSet,
    goal: Vec<FluentId>,
    goal_set: FluentSet,
    // relational tables, indexed by fluent; empty until make_action_tables
    requiring: Vec<Vec<ActionId>>,
    adding: Vec<Vec<ActionId>>,
    deleting: Vec<Vec<ActionId>>,
    edeleting: Vec<Vec<ActionId>>,
    ceffs_adding: Vec<Vec<(ActionId, usize)>>,
    empty_precs: Vec<ActionId>,
    end_operator: Option<ActionId>,
    succ_gen: Option<SuccessorGenerator>,
}

impl StripsProblem {
    pub fn new(domain_name: impl Into<String>, problem_name: impl Into<String>) -> StripsProblem {
        StripsProblem {
            domain_name: domain_name.into(),
            problem_name: problem_name.into(),
            fluents: Vec::new(),
            actions: Vec::new(),
            fluent_ids: HashMap::new(),
            init: Vec::new(),
            init_set: FluentSet::new(),
            goal: Vec::new(),
            goal_set: FluentSet::new(),
            requiring: Vec::new(),
            adding: Vec::new(),
            deleting: Vec::new(),
            edeleting: Vec::new(),
            ceffs_adding: Vec::new(),
            empty_precs: Vec::new(),
            end_operator: None,
            succ_gen: None,
        }
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }
    pub fn problem_name(&self) -> &str {
        &self.problem_name
    }
    pub fn num_fluents(&self) -> usize {
        self.fluents.len()
    }
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }
    pub fn fluents(&self) -> &[Fluent] {
        &self.fluents
    }
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
    pub fn init(&self) -> &[FluentId] {
        &self.init
    }
    pub fn init_set(&self) -> &FluentSet {
        &self.init_set
    }
    pub fn goal(&self) -> &[FluentId] {
        &self.goal
    }
    pub fn goal_set(&self) -> &FluentSet {
        &self.goal_set
    }
    pub fn end_operator(&self) -> Option<ActionId> {
        self.end_operator
    }

    /// True once `make_action_tables` has run.
    pub fn is_frozen(&self) -> bool {
        self.succ_gen.is_some()
    }

    pub fn fluent_ids(&self) -> impl Iterator<Item = FluentId> {
        (0..self.num_fluents()).map(FluentId::from)
    }

    pub fn action_ids(&self) -> impl Iterator<Item = ActionId> {
        (0..self.num_actions()).map(ActionId::from)
    }

    /// Looks up a fluent by its signature.
    pub fn fluent_id(&self, signature: &str) -> Option<FluentId> {
        self.fluent_ids.get(signature).copied()
    }

    /// Checked conversion of a raw fluent index, for callers holding plain
    /// integers from an external grounder.
    pub fn fluent(&self, index: usize) -> Result<FluentId, ModelError> {
        if index < self.num_fluents() {
            Ok(FluentId::from(index))
        } else {
            Err(ModelError::BadFluentIndex(index))
        }
    }

    /// Checked conversion of a raw action index.
    pub fn action(&self, index: usize) -> Result<ActionId, ModelError> {
        if index < self.num_actions() {
            Ok(ActionId::from(index))
        } else {
            Err(ModelError::BadActionIndex(index))
        }
    }

    /// Registers a new fluent and returns its index.
    pub fn add_fluent(&mut self, signature: impl Into<String>) -> Result<FluentId, ModelError> {
        if self.is_frozen() {
            return Err(ModelError::ProblemFrozen);
        }
        let signature = signature.into();
        if self.fluent_ids.contains_key(&signature) {
            return Err(ModelError::DuplicateSignature(signature));
        }
        let index = FluentId::from(self.fluents.len());
        self.fluent_ids.insert(signature.clone(), index);
        self.fluents.push(Fluent { index, signature });
        Ok(index)
    }

    /// Registers a new action and returns its index.
    ///
    /// Every fluent mentioned by the precondition, the effects or any
    /// conditional effect must already be registered. The call is
    /// transactional: on error the problem is unchanged.
    pub fn add_action(
        &mut self,
        signature: impl Into<String>,
        prec: Vec<FluentId>,
        add: Vec<FluentId>,
        del: Vec<FluentId>,
        ceffs: Vec<ConditionalEffect>,
        cost: Cost,
    ) -> Result<ActionId, ModelError> {
        if self.is_frozen() {
            return Err(ModelError::ProblemFrozen);
        }
        assert!(cost.is_finite() && cost >= 0.0, "action cost must be finite and nonnegative");
        self.check_fluents(&prec)?;
        self.check_fluents(&add)?;
        self.check_fluents(&del)?;
        for ceff in &ceffs {
            self.check_fluents(ceff.prec())?;
            self.check_fluents(ceff.add())?;
            self.check_fluents(ceff.del())?;
        }

        let index = ActionId::from(self.actions.len());
        let prec_set = prec.iter().copied().collect();
        let add_set = add.iter().copied().collect();
        let del_set = del.iter().copied().collect();
        self.actions.push(Action {
            index,
            signature: signature.into(),
            cost,
            prec,
            add,
            del,
            prec_set,
            add_set,
            del_set,
            ceffs,
            edel: Vec::new(),
            edel_set: FluentSet::with_capacity(self.num_fluents()),
        });
        Ok(index)
    }

    fn check_fluents(&self, fs: &[FluentId]) -> Result<(), ModelError> {
        for &f in fs {
            if usize::from(f) >= self.num_fluents() {
                return Err(ModelError::BadFluentIndex(usize::from(f)));
            }
        }
        Ok(())
    }

    /// Overwrites the initial state.
    pub fn set_init(&mut self, fluents: &[FluentId]) -> Result<(), ModelError> {
        self.check_fluents(fluents)?;
        self.init = fluents.to_vec();
        self.init_set = fluents.iter().copied().collect();
        Ok(())
    }

    /// Overwrites the goal.
    pub fn set_goal(&mut self, fluents: &[FluentId]) -> Result<(), ModelError> {
        self.check_fluents(fluents)?;
        self.goal = fluents.to_vec();
        self.goal_set = fluents.iter().copied().collect();
        Ok(())
    }

    /// Overwrites the goal and synthesizes a zero-cost end operator whose
    /// sole precondition is the goal. The operator's index is recorded and
    /// returned.
    pub fn set_goal_with_end_op(&mut self, fluents: &[FluentId]) -> Result<ActionId, ModelError> {
        self.set_goal(fluents)?;
        let end = self.add_action("(END)", fluents.to_vec(), Vec::new(), Vec::new(), Vec::new(), 0.0)?;
        self.end_operator = Some(end);
        Ok(end)
    }

    /// Populates the relational tables and builds the successor generator.
    ///
    /// Must be called after the last `add_action`; the problem is frozen
    /// afterwards. Calling it again (with no intervening mutation, which is
    /// the only possibility once frozen) rebuilds identical tables.
    pub fn make_action_tables(&mut self) {
        let nf = self.num_fluents();
        self.requiring = vec![Vec::new(); nf];
        self.adding = vec![Vec::new(); nf];
        self.deleting = vec![Vec::new(); nf];
        self.edeleting = vec![Vec::new(); nf];
        self.ceffs_adding = vec![Vec::new(); nf];
        self.empty_precs.clear();

        for i in 0..self.actions.len() {
            self.register_action_in_tables(ActionId::from(i));
        }
        self.succ_gen = Some(SuccessorGenerator::build(&self.actions));
    }

    fn register_action_in_tables(&mut self, a: ActionId) {
        let action = &self.actions[a];
        if action.prec.is_empty() {
            self.empty_precs.push(a);
        } else {
            for &f in &action.prec {
                self.requiring[f].push(a);
            }
        }
        for &f in &action.add {
            self.adding[f].push(a);
        }
        for &f in &action.del {
            self.deleting[f].push(a);
        }
        for &f in &action.edel {
            self.edeleting[f].push(a);
        }
        for (k, ceff) in action.ceffs.iter().enumerate() {
            for &f in ceff.add() {
                self.ceffs_adding[f].push((a, k));
            }
        }
    }

    /// Actions whose precondition contains `f`. Actions with an empty
    /// precondition are filed in [`StripsProblem::empty_prec_actions`].
    pub fn requiring(&self, f: FluentId) -> &[ActionId] {
        &self.requiring[f]
    }

    pub fn adding(&self, f: FluentId) -> &[ActionId] {
        &self.adding[f]
    }

    pub fn deleting(&self, f: FluentId) -> &[ActionId] {
        &self.deleting[f]
    }

    pub fn edeleting(&self, f: FluentId) -> &[ActionId] {
        &self.edeleting[f]
    }

    /// (action, conditional-effect index) pairs whose effect adds `f`.
    pub fn ceffs_adding(&self, f: FluentId) -> &[(ActionId, usize)] {
        &self.ceffs_adding[f]
    }

    pub fn empty_prec_actions(&self) -> &[ActionId] {
        &self.empty_precs
    }

    /// Records that `a` e-deletes `p`. Used by the h² e-delete extraction.
    pub(crate) fn record_edelete(&mut self, a: ActionId, p: FluentId) {
        let action = &mut self.actions[a];
        if !action.edel_set.contains(p) {
            action.edel.push(p);
            action.edel_set.insert(p);
            self.edeleting[p].push(a);
        }
    }

    /// A fresh state holding exactly the initial fluents.
    pub fn initial_state(&self) -> State {
        State::with_fluents(self.num_fluents(), self.init.iter().copied())
    }

    pub fn goal_entailed(&self, s: &State) -> bool {
        s.entails_all(&self.goal)
    }

    /// Actions applicable in `s`, each yielded exactly once, in an order
    /// that is stable for a given problem.
    pub fn applicable_actions(&self, s: &State) -> Vec<ActionId> {
        self.successor_generator().applicable(s)
    }

    pub fn successor_generator(&self) -> &SuccessorGenerator {
        self.succ_gen
            .as_ref()
            .expect("make_action_tables must be called before searching")
    }

    /// Renders a fluent vector as a comma-separated list of signatures.
    pub fn display_fluents<'a>(&'a self, fs: &'a [FluentId]) -> impl Display + 'a {
        DispFluents { prob: self, fs }
    }

    /// Renders the fluents of a state, in insertion order.
    pub fn display_state<'a>(&'a self, s: &'a State) -> impl Display + 'a {
        DispFluents { prob: self, fs: s.fluents() }
    }

    /// Renders a plan, one action signature per line.
    pub fn display_plan<'a>(&'a self, plan: &'a [ActionId]) -> impl Display + 'a {
        DispPlan { prob: self, plan }
    }
}

impl Display for StripsProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} / {}", self.domain_name, self.problem_name)?;
        writeln!(f, "# Fluents: {}", self.num_fluents())?;
        for fl in &self.fluents {
            writeln!(f, "  {}. {}", fl.index, fl.signature)?;
        }
        writeln!(f, "# Actions: {}", self.num_actions())?;
        for a in &self.actions {
            writeln!(
                f,
                "  {}. {} (cost {}) pre: {{{}}} add: {{{}}} del: {{{}}}",
                a.index,
                a.signature,
                a.cost,
                self.display_fluents(&a.prec),
                self.display_fluents(&a.add),
                self.display_fluents(&a.del),
            )?;
        }
        Ok(())
    }
}

struct DispFluents<'a> {
    prob: &'a StripsProblem,
    fs: &'a [FluentId],
}

impl Display for DispFluents<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.fs.iter().map(|&p| self.prob.fluents[p].signature()).format(", ")
        )
    }
}

struct DispPlan<'a> {
    prob: &'a StripsProblem,
    plan: &'a [ActionId],
}

impl Display for DispPlan<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for &a in self.plan {
            writeln!(f, "{}", self.prob.actions[a].signature())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_movers() -> StripsProblem {
        let mut p = StripsProblem::new("nav", "two-movers");
        let at_a = p.add_fluent("(at A)").unwrap();
        let at_b = p.add_fluent("(at B)").unwrap();
        let at_c = p.add_fluent("(at C)").unwrap();
        p.add_action("(move A B)", vec![at_a], vec![at_b], vec![at_a], vec![], 1.0)
            .unwrap();
        p.add_action("(move A C)", vec![at_a], vec![at_c], vec![at_a], vec![], 1.0)
            .unwrap();
        p.set_init(&[at_a]).unwrap();
        p.set_goal(&[at_b]).unwrap();
        p
    }

    #[test]
    fn duplicate_signature_rejected() {
        let mut p = StripsProblem::new("d", "p");
        p.add_fluent("(at A)").unwrap();
        assert_eq!(
            p.add_fluent("(at A)"),
            Err(ModelError::DuplicateSignature("(at A)".to_string()))
        );
        // the failed call left the problem unchanged
        assert_eq!(p.num_fluents(), 1);
    }

    #[test]
    fn out_of_range_fluent_rejected() {
        let mut p = StripsProblem::new("d", "p");
        let a = p.add_fluent("(at A)").unwrap();
        let bogus = FluentId::from(7usize);
        assert_eq!(
            p.add_action("(noop)", vec![a], vec![bogus], vec![], vec![], 1.0),
            Err(ModelError::BadFluentIndex(7))
        );
        assert_eq!(p.num_actions(), 0);
        assert_eq!(p.set_init(&[bogus]), Err(ModelError::BadFluentIndex(7)));
    }

    #[test]
    fn frozen_problem_rejects_new_actions() {
        let mut p = two_movers();
        p.make_action_tables();
        let at_a = p.fluent_id("(at A)").unwrap();
        assert_eq!(
            p.add_action("(late)", vec![at_a], vec![], vec![], vec![], 1.0),
            Err(ModelError::ProblemFrozen)
        );
        assert_eq!(p.add_fluent("(late)"), Err(ModelError::ProblemFrozen));
    }

    #[test]
    fn tables_are_consistent() {
        let mut p = two_movers();
        p.make_action_tables();
        for f in p.fluent_ids() {
            for &a in p.requiring(f) {
                assert!(p.actions()[a].requires(f));
            }
            for &a in p.adding(f) {
                assert!(p.actions()[a].asserts(f));
            }
            for &a in p.deleting(f) {
                assert!(p.actions()[a].consumes(f));
            }
        }
        for a in p.action_ids() {
            let action = &p.actions()[a];
            for &f in action.prec() {
                assert!(p.requiring(f).contains(&a));
            }
            for &f in action.add() {
                assert!(p.adding(f).contains(&a));
            }
            for &f in action.del() {
                assert!(p.deleting(f).contains(&a));
            }
        }
    }

    #[test]
    fn tables_cover_conditional_effects() {
        let mut p = StripsProblem::new("d", "p");
        let x = p.add_fluent("x").unwrap();
        let y = p.add_fluent("y").unwrap();
        let z = p.add_fluent("z").unwrap();
        let ceff = ConditionalEffect::new(vec![y], vec![z], vec![]);
        let a = p
            .add_action("(act)", vec![x], vec![y], vec![], vec![ceff], 1.0)
            .unwrap();
        p.make_action_tables();
        assert_eq!(p.ceffs_adding(z), &[(a, 0)]);
        assert!(p.ceffs_adding(y).is_empty());
    }

    #[test]
    fn make_action_tables_is_idempotent() {
        let mut p = two_movers();
        p.make_action_tables();
        let req: Vec<Vec<ActionId>> = p.fluent_ids().map(|f| p.requiring(f).to_vec()).collect();
        let add: Vec<Vec<ActionId>> = p.fluent_ids().map(|f| p.adding(f).to_vec()).collect();
        p.make_action_tables();
        let req2: Vec<Vec<ActionId>> = p.fluent_ids().map(|f| p.requiring(f).to_vec()).collect();
        let add2: Vec<Vec<ActionId>> = p.fluent_ids().map(|f| p.adding(f).to_vec()).collect();
        assert_eq!(req, req2);
        assert_eq!(add, add2);
    }

    #[test]
    fn empty_precondition_actions_filed_separately() {
        let mut p = StripsProblem::new("d", "p");
        let x = p.add_fluent("x").unwrap();
        let a = p.add_action("(spawn)", vec![], vec![x], vec![], vec![], 1.0).unwrap();
        p.make_action_tables();
        assert_eq!(p.empty_prec_actions(), &[a]);
        assert!(p.requiring(x).is_empty());
    }

    #[test]
    fn end_operator_synthesis() {
        let mut p = two_movers();
        let at_b = p.fluent_id("(at B)").unwrap();
        let end = p.set_goal_with_end_op(&[at_b]).unwrap();
        assert_eq!(p.end_operator(), Some(end));
        let a = &p.actions()[end];
        assert_eq!(a.cost(), 0.0);
        assert_eq!(a.prec(), &[at_b]);
        assert!(a.add().is_empty());
        assert!(a.del().is_empty());
    }

    #[test]
    fn display_resolves_ids_to_signatures() {
        let mut p = StripsProblem::new("nav", "two-movers");
        let at_a = p.add_fluent("(at A)").unwrap();
        let at_b = p.add_fluent("(at B)").unwrap();
        let mv = p
            .add_action("(move A B)", vec![at_a], vec![at_b], vec![at_a], vec![], 1.0)
            .unwrap();
        assert_eq!(p.domain_name(), "nav");
        assert_eq!(p.problem_name(), "two-movers");

        assert_eq!(p.display_fluents(&[at_a, at_b]).to_string(), "(at A), (at B)");
        assert_eq!(p.display_fluents(&[]).to_string(), "");

        // states render in insertion order
        let s = State::with_fluents(p.num_fluents(), [at_b, at_a]);
        assert_eq!(p.display_state(&s).to_string(), "(at B), (at A)");

        assert_eq!(p.display_plan(&[mv, mv]).to_string(), "(move A B)\n(move A B)\n");

        let expected = [
            "nav / two-movers",
            "# Fluents: 2",
            "  0. (at A)",
            "  1. (at B)",
            "# Actions: 1",
            "  0. (move A B) (cost 1) pre: {(at A)} add: {(at B)} del: {(at A)}",
        ]
        .join("\n")
            + "\n";
        assert_eq!(p.to_string(), expected);
    }

    #[test]
    fn checked_index_conversion() {
        let p = two_movers();
        assert_eq!(p.fluent(1), Ok(FluentId::from(1usize)));
        assert_eq!(p.fluent(3), Err(ModelError::BadFluentIndex(3)));
        assert_eq!(p.action(0), Ok(ActionId::from(0usize)));
        assert_eq!(p.action(9), Err(ModelError::BadActionIndex(9)));
    }

    #[test]
    fn signature_lookup() {
        let p = two_movers();
        let at_c = p.fluent_id("(at C)").unwrap();
        assert_eq!(p.fluents()[at_c].signature(), "(at C)");
        assert_eq!(p.fluent_id("(at D)"), None);
    }
}
