//! Successor generation: which actions are applicable in a state.
//!
//! The generator is a decision tree over fluent presence. Each internal
//! node tests one fluent: actions requiring it descend the `present`
//! branch (with that requirement consumed), the others descend `rest`.
//! Actions whose whole precondition has been tested along the path sit at
//! the node itself. Enumerating a state walks the tree, following
//! `present` branches only when the state entails the tested fluent, so
//! every applicable action is reached exactly once without scanning the
//! full action table.

use crate::problem::{Action, ActionId, FluentId};
use crate::state::State;

pub struct SuccessorGenerator {
    root: Node,
}

struct Node {
    /// Actions whose precondition is fully tested along the path here.
    accept: Vec<ActionId>,
    test: Option<Test>,
}

struct Test {
    fluent: FluentId,
    present: Box<Node>,
    rest: Box<Node>,
}

impl SuccessorGenerator {
    pub fn build(actions: &[Action]) -> SuccessorGenerator {
        // each item carries the still-untested suffix of its (sorted)
        // precondition
        let items: Vec<(ActionId, Vec<FluentId>)> = actions
            .iter()
            .map(|a| {
                let mut prec = a.prec().to_vec();
                prec.sort_unstable();
                prec.dedup();
                (a.index(), prec)
            })
            .collect();
        SuccessorGenerator {
            root: Self::build_node(items),
        }
    }

    fn build_node(items: Vec<(ActionId, Vec<FluentId>)>) -> Node {
        let mut accept = Vec::new();
        let mut pending: Vec<(ActionId, Vec<FluentId>)> = Vec::new();
        for (a, prec) in items {
            if prec.is_empty() {
                accept.push(a);
            } else {
                pending.push((a, prec));
            }
        }
        if pending.is_empty() {
            return Node { accept, test: None };
        }
        // split on the smallest untested fluent; every pending item's head
        // is >= it, so both branches strictly shrink
        let fluent = pending.iter().map(|(_, prec)| prec[0]).min().unwrap();
        let mut on_present = Vec::new();
        let mut on_rest = Vec::new();
        for (a, mut prec) in pending {
            if prec[0] == fluent {
                prec.remove(0);
                on_present.push((a, prec));
            } else {
                on_rest.push((a, prec));
            }
        }
        Node {
            accept,
            test: Some(Test {
                fluent,
                present: Box::new(Self::build_node(on_present)),
                rest: Box::new(Self::build_node(on_rest)),
            }),
        }
    }

    /// All actions applicable in `s`, each exactly once. The order is fixed
    /// by the tree and therefore stable for a given problem.
    pub fn applicable(&self, s: &State) -> Vec<ActionId> {
        let mut out = Vec::new();
        self.collect(&self.root, s, &mut out);
        out
    }

    fn collect(&self, node: &Node, s: &State, out: &mut Vec<ActionId>) {
        out.extend_from_slice(&node.accept);
        if let Some(test) = &node.test {
            if s.entails(test.fluent) {
                self.collect(&test.present, s, out);
            }
            self.collect(&test.rest, s, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::StripsProblem;
    use crate::state::State;

    fn sample() -> StripsProblem {
        let mut p = StripsProblem::new("d", "p");
        let x = p.add_fluent("x").unwrap();
        let y = p.add_fluent("y").unwrap();
        let z = p.add_fluent("z").unwrap();
        p.add_action("(a0)", vec![x], vec![y], vec![], vec![], 1.0).unwrap();
        p.add_action("(a1)", vec![x, y], vec![z], vec![], vec![], 1.0).unwrap();
        p.add_action("(a2)", vec![z], vec![x], vec![], vec![], 1.0).unwrap();
        p.add_action("(a3)", vec![], vec![x], vec![], vec![], 1.0).unwrap();
        p.make_action_tables();
        p
    }

    fn brute_force(p: &StripsProblem, s: &State) -> Vec<ActionId> {
        p.action_ids()
            .filter(|&a| s.entails_all(p.actions()[a].prec()))
            .collect()
    }

    #[test]
    fn matches_brute_force_enumeration() {
        let p = sample();
        let states = [
            State::with_fluents(3, []),
            State::with_fluents(3, [FluentId::from(0usize)]),
            State::with_fluents(3, [FluentId::from(0usize), FluentId::from(1usize)]),
            State::with_fluents(3, [FluentId::from(2usize)]),
            State::with_fluents(3, (0..3).map(FluentId::from)),
        ];
        for s in &states {
            let mut got = p.applicable_actions(s);
            let mut want = brute_force(&p, s);
            got.sort();
            want.sort();
            assert_eq!(got, want);
        }
    }

    #[test]
    fn each_action_yielded_once() {
        let p = sample();
        let s = State::with_fluents(3, (0..3).map(FluentId::from));
        let got = p.applicable_actions(&s);
        let mut dedup = got.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(got.len(), dedup.len());
    }

    #[test]
    fn enumeration_order_is_stable() {
        let p = sample();
        let s = State::with_fluents(3, (0..3).map(FluentId::from));
        assert_eq!(p.applicable_actions(&s), p.applicable_actions(&s));
    }
}
