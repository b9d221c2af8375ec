//! Store unique instances of a rust type, partitioned by kind.
//! Only a single unique copy (in a context) will exist
//! for every (kind, value) pair handed to a [UniqueStore].
//! Records are never evicted.

use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use std::hash::{Hash, Hasher};

use crate::context::{Arena, ArenaIndex, KindId};

/// Computes the hash of a rust value and its rust type.
/// ```rust
///     use dynir::storage_uniquer::TypeValueHash;
///     #[derive(Hash)]
///     struct A { i: u64 }
///     #[derive(Hash)]
///     struct B { i: u64 }
///     let x = A { i: 10 };
///     let y = B { i: 10 };
///     assert!(TypeValueHash::new(&x) != TypeValueHash::new(&y));
/// ```
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub struct TypeValueHash {
    hash: u64,
}

impl TypeValueHash {
    /// Hash a value and its type together.
    pub fn new<T: Hash + 'static>(t: &T) -> TypeValueHash {
        let mut hasher = FxHasher::default();
        t.hash(&mut hasher);
        std::any::TypeId::of::<T>().hash(&mut hasher);
        TypeValueHash {
            hash: hasher.finish(),
        }
    }
}

/// Are the two objects equal.
pub type UniqueStoreEq<'a, T> = &'a dyn Fn(&T, &T) -> bool;

/// Is the provided argument equal to the unique object under interest.
pub type UniqueStoreIs<'a, T> = &'a dyn Fn(&T) -> bool;

/// Store unique copy of objects.
pub struct UniqueStore<T: 'static> {
    pub(crate) unique_store: Arena<T>,
    unique_stores_map: FxHashMap<(KindId, TypeValueHash), Vec<ArenaIndex>>,
    kinds: FxHashSet<KindId>,
}

impl<T: 'static> Default for UniqueStore<T> {
    fn default() -> Self {
        Self {
            unique_store: Default::default(),
            unique_stores_map: Default::default(),
            kinds: Default::default(),
        }
    }
}

impl<T: 'static> UniqueStore<T> {
    /// Allow values of `kind` to be stored. Returns false if already registered.
    pub fn register_kind(&mut self, kind: KindId) -> bool {
        self.kinds.insert(kind)
    }

    /// Has `kind` been registered?
    pub fn is_kind_registered(&self, kind: KindId) -> bool {
        self.kinds.contains(&kind)
    }

    /// Get or create a unique copy of `t: T` of kind `kind`.
    /// Consumes the provided argument either way.
    /// Returns [ArenaIndex] of the unique copy.
    ///
    /// Panics if `kind` is not registered.
    pub fn get_or_create_unique(
        &mut self,
        kind: KindId,
        t: T,
        hash: TypeValueHash,
        eq: UniqueStoreEq<T>,
    ) -> ArenaIndex {
        assert!(
            self.kinds.contains(&kind),
            "{kind} has not been registered with the uniquer"
        );
        let possible_matches = self.unique_stores_map.entry((kind, hash)).or_default();
        if let Some(index) = possible_matches
            .iter()
            .find(|index| eq(&t, &self.unique_store[**index]))
        {
            return *index;
        }
        let new_index = self.unique_store.insert(t);
        possible_matches.push(new_index);
        log::trace!("Uniquer created a new {kind} record");
        new_index
    }

    /// Get index to the stored object of `kind` that satisfies `hash` and `is`.
    pub fn get(
        &self,
        kind: KindId,
        hash: TypeValueHash,
        is: UniqueStoreIs<T>,
    ) -> Option<ArenaIndex> {
        self.unique_stores_map
            .get(&(kind, hash))
            .and_then(|mv| mv.iter().find(|other| is(&self.unique_store[**other])))
            .copied()
    }

    /// Number of unique objects in the store.
    pub fn len(&self) -> usize {
        self.unique_store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_store.is_empty()
    }
}
