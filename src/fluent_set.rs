//! Dense boolean vector over fluent indices.

use crate::problem::FluentId;
use fixedbitset::FixedBitSet;

/// A set of fluents backed by a dense bitset.
///
/// Membership queries are O(1); iteration visits fluents in index order.
/// The set grows on insertion, so a capacity is only a hint.
#[derive(Clone, Debug)]
pub struct FluentSet {
    bits: FixedBitSet,
}

impl FluentSet {
    pub fn new() -> FluentSet {
        FluentSet {
            bits: FixedBitSet::new(),
        }
    }

    pub fn with_capacity(num_fluents: usize) -> FluentSet {
        FluentSet {
            bits: FixedBitSet::with_capacity(num_fluents),
        }
    }

    pub fn insert(&mut self, f: FluentId) {
        let i = usize::from(f);
        if i >= self.bits.len() {
            self.bits.grow(i + 1);
        }
        self.bits.insert(i);
    }

    /// Removes `f`, returning whether it was present.
    pub fn remove(&mut self, f: FluentId) -> bool {
        let i = usize::from(f);
        let present = self.bits.contains(i);
        if present {
            self.bits.set(i, false);
        }
        present
    }

    pub fn contains(&self, f: FluentId) -> bool {
        self.bits.contains(usize::from(f))
    }

    pub fn contains_all(&self, fs: &[FluentId]) -> bool {
        fs.iter().all(|&f| self.contains(f))
    }

    pub fn clear(&mut self) {
        self.bits.clear()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.count_ones(..) == 0
    }

    /// Fluents present in the set, in index order.
    pub fn iter(&self) -> impl Iterator<Item = FluentId> + '_ {
        self.bits.ones().map(FluentId::from)
    }
}

impl Default for FluentSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for FluentSet {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}
impl Eq for FluentSet {}

impl FromIterator<FluentId> for FluentSet {
    fn from_iter<T: IntoIterator<Item = FluentId>>(iter: T) -> Self {
        let mut s = FluentSet::new();
        for f in iter {
            s.insert(f);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(i: usize) -> FluentId {
        FluentId::from(i)
    }

    #[test]
    fn insert_remove_contains() {
        let mut s = FluentSet::with_capacity(4);
        assert!(s.is_empty());
        s.insert(f(2));
        s.insert(f(9)); // beyond initial capacity
        assert!(s.contains(f(2)));
        assert!(s.contains(f(9)));
        assert!(!s.contains(f(3)));
        assert!(!s.contains(f(100)));
        assert!(s.remove(f(2)));
        assert!(!s.remove(f(2)));
        assert!(!s.contains(f(2)));
    }

    #[test]
    fn iteration_in_index_order() {
        let s: FluentSet = [f(5), f(1), f(3)].into_iter().collect();
        let got: Vec<usize> = s.iter().map(usize::from).collect();
        assert_eq!(got, vec![1, 3, 5]);
        assert!(s.contains_all(&[f(1), f(3)]));
        assert!(!s.contains_all(&[f(1), f(2)]));
    }
}
