//! World states as fluent sets.

use crate::fluent_set::FluentSet;
use crate::problem::{Action, ConditionalEffect, FluentId};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// An insertion-ordered set of fluent indices, interpreted as a closed
/// world: every fluent not present is false.
///
/// The ordered sequence serves iteration; the bitset twin serves O(1)
/// entailment. A hash of the fluent set is cached so that duplicate
/// detection in search does not rehash states; [`State::update_hash`] must
/// be called after any mutation before the state is compared or hashed.
/// Two states are equal iff they hold the same fluents, regardless of
/// insertion order.
#[derive(Clone, Debug)]
pub struct State {
    fluents: Vec<FluentId>,
    set: FluentSet,
    hash: u64,
}

impl State {
    pub fn new(num_fluents: usize) -> State {
        let mut s = State {
            fluents: Vec::new(),
            set: FluentSet::with_capacity(num_fluents),
            hash: 0,
        };
        s.update_hash();
        s
    }

    pub fn with_fluents(num_fluents: usize, fs: impl IntoIterator<Item = FluentId>) -> State {
        let mut s = State::new(num_fluents);
        for f in fs {
            s.insert(f);
        }
        s.update_hash();
        s
    }

    /// The fluents of the state, in insertion order.
    pub fn fluents(&self) -> &[FluentId] {
        &self.fluents
    }

    pub fn len(&self) -> usize {
        self.fluents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fluents.is_empty()
    }

    pub fn entails(&self, f: FluentId) -> bool {
        self.set.contains(f)
    }

    pub fn entails_all(&self, fs: &[FluentId]) -> bool {
        self.set.contains_all(fs)
    }

    pub fn insert(&mut self, f: FluentId) {
        if !self.set.contains(f) {
            self.set.insert(f);
            self.fluents.push(f);
        }
    }

    pub fn remove(&mut self, f: FluentId) {
        if self.set.remove(f) {
            let pos = self.fluents.iter().position(|&x| x == f).unwrap();
            self.fluents.remove(pos);
        }
    }

    /// Recomputes the cached hash from the fluent set. Insertion order does
    /// not influence the hash.
    pub fn update_hash(&mut self) {
        let mut hasher = DefaultHasher::new();
        for f in self.set.iter() {
            hasher.write_u32(f.to_u32());
        }
        self.hash = hasher.finish();
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    /// The state reached by applying `a`: deletes are removed, adds are
    /// inserted, then every conditional effect whose precondition is
    /// entailed by `self` (the state the action is applied in, not the
    /// partial result) fires. Conditional-effect adds win over deletes on
    /// the same atom.
    pub fn apply(&self, a: &Action) -> State {
        let mut next = self.clone();
        for &f in a.del() {
            next.remove(f);
        }
        for &f in a.add() {
            next.insert(f);
        }
        let triggered: Vec<&ConditionalEffect> =
            a.ceffs().iter().filter(|ce| self.entails_all(ce.prec())).collect();
        for ce in &triggered {
            for &f in ce.del() {
                next.remove(f);
            }
        }
        for ce in &triggered {
            for &f in ce.add() {
                next.insert(f);
            }
        }
        next.update_hash();
        next
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.set == other.set
    }
}
impl Eq for State {}

impl Hash for State {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}
