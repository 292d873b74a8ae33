//! Typed index machinery shared across the crate.
//!
//! Fluents, actions and search nodes are all addressed by dense indices.
//! `create_index_type!` mints a distinct `NonZeroU32`-backed id type for each
//! of them so that a fluent index can never be used to subscript an action
//! table by accident.

use std::marker::PhantomData;

/// Creates a typed index backed by a `NonZeroU32`.
///
/// The generated type converts to and from `usize` and can directly subscript
/// `Vec`s and slices.
#[macro_export]
macro_rules! create_index_type {
    ($type_name:ident) => {
        #[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
        pub struct $type_name(std::num::NonZeroU32);

        impl $type_name {
            pub const fn to_u32(self) -> u32 {
                self.0.get() - 1
            }
            pub const fn from_u32(u: u32) -> Self {
                // SAFETY: u + 1 is never zero for u < u32::MAX
                unsafe { $type_name(std::num::NonZeroU32::new_unchecked(u + 1)) }
            }
        }

        impl From<usize> for $type_name {
            fn from(u: usize) -> Self {
                Self::from_u32(u as u32)
            }
        }
        impl From<$type_name> for usize {
            fn from(v: $type_name) -> Self {
                (v.0.get() - 1) as usize
            }
        }

        impl<V> std::ops::Index<$type_name> for Vec<V> {
            type Output = V;
            fn index(&self, index: $type_name) -> &Self::Output {
                &self[usize::from(index)]
            }
        }
        impl<V> std::ops::IndexMut<$type_name> for Vec<V> {
            fn index_mut(&mut self, index: $type_name) -> &mut Self::Output {
                &mut self[usize::from(index)]
            }
        }
        impl<V> std::ops::Index<$type_name> for [V] {
            type Output = V;
            fn index(&self, index: $type_name) -> &Self::Output {
                &self[usize::from(index)]
            }
        }

        impl std::fmt::Display for $type_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_u32())
            }
        }
    };
}

/// A set of typed indices backed by a growable bitset.
pub struct IndexSet<K> {
    set: bit_set::BitSet,
    _phantom: PhantomData<K>,
}

impl<K: Into<usize> + From<usize>> IndexSet<K> {
    pub fn new() -> IndexSet<K> {
        IndexSet {
            set: Default::default(),
            _phantom: Default::default(),
        }
    }

    pub fn insert(&mut self, k: K) {
        self.set.insert(k.into());
    }

    pub fn remove(&mut self, k: K) {
        self.set.remove(k.into());
    }

    pub fn contains(&self, k: K) -> bool {
        self.set.contains(k.into())
    }

    pub fn clear(&mut self) {
        self.set.clear()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.set.iter().map(K::from)
    }
}

impl<K: Into<usize> + From<usize>> Default for IndexSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<usize> + From<usize>> FromIterator<K> for IndexSet<K> {
    fn from_iter<T: IntoIterator<Item = K>>(iter: T) -> Self {
        let mut s = IndexSet::new();
        for k in iter {
            s.insert(k);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    create_index_type!(TestId);

    #[test]
    fn index_type_roundtrip() {
        for i in [0usize, 1, 17, 4095] {
            let id = TestId::from(i);
            assert_eq!(usize::from(id), i);
            assert_eq!(id.to_u32(), i as u32);
        }
        let v = vec![10, 20, 30];
        assert_eq!(v[TestId::from(1usize)], 20);
    }

    #[test]
    fn index_set_basics() {
        let mut s: IndexSet<TestId> = IndexSet::new();
        assert!(s.is_empty());
        s.insert(TestId::from(3usize));
        s.insert(TestId::from(100usize));
        assert!(s.contains(TestId::from(3usize)));
        assert!(!s.contains(TestId::from(4usize)));
        assert_eq!(s.iter().map(usize::from).collect::<Vec<_>>(), vec![3, 100]);
        s.remove(TestId::from(3usize));
        assert!(!s.contains(TestId::from(3usize)));
        s.clear();
        assert!(s.is_empty());
    }
}
