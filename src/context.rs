//! [Context] and [Ptr] together provide memory management for the IR.
//!
//! A [Context] owns every registered dialect, every abstract type and
//! operation description, and the uniqued type instances of a session.
//! It is single threaded: concurrent readers must wrap it themselves
//! (for example in a `Mutex`).

use crate::{
    capability::Capability,
    dialect::{Dialect, DialectName},
    op::AbstractOperation,
    r#type::{AbstractType, TypeObj},
    storage_uniquer::UniqueStore,
};
use rustc_hash::FxHashMap;
use std::{
    any::TypeId,
    collections::hash_map::Entry,
    fmt::{self, Debug, Display},
    hash::Hash,
    marker::PhantomData,
};

slotmap::new_key_type! {
    /// Index into an [Arena].
    pub struct ArenaIndex;
}

/// Allocation pool for objects owned by a [Context].
pub type Arena<T> = slotmap::SlotMap<ArenaIndex, T>;

/// Identifies a type or operation kind within a [Context].
/// Allocated by [Context::allocate_kind_id] and never reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct KindId(u64);

impl Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind#{}", self.0)
    }
}

/// A context stores all IR data of this compilation session.
#[derive(Default)]
pub struct Context {
    /// Registered [Dialect]s.
    pub(crate) dialects: FxHashMap<DialectName, Dialect>,
    /// Description of every registered type kind, static or dynamic.
    pub(crate) abstract_types: FxHashMap<KindId, AbstractType>,
    /// Description of every registered operation kind.
    pub(crate) abstract_ops: FxHashMap<KindId, AbstractOperation>,
    /// Qualified operation name to its kind.
    pub(crate) op_names: FxHashMap<String, KindId>,
    /// Kinds of types defined by a Rust type.
    pub(crate) static_type_kinds: FxHashMap<TypeId, KindId>,
    /// Storage for uniqued [TypeObj]s.
    pub(crate) type_store: UniqueStore<TypeObj>,
    next_kind_id: u64,
}

impl Context {
    pub fn new() -> Context {
        Self::default()
    }

    /// Get a fresh [KindId], distinct from every other one in this context.
    pub fn allocate_kind_id(&mut self) -> KindId {
        let id = KindId(self.next_kind_id);
        self.next_kind_id += 1;
        id
    }

    /// The kind assigned to the Rust type `T` when it was registered as a type.
    pub fn static_type_kind<T: 'static>(&self) -> Option<KindId> {
        self.static_type_kinds.get(&TypeId::of::<T>()).copied()
    }

    /// Get the [AbstractType] registered for `kind`.
    pub fn abstract_type(&self, kind: KindId) -> Option<&AbstractType> {
        self.abstract_types.get(&kind)
    }

    /// Get the [AbstractOperation] registered for `kind`.
    pub fn abstract_op(&self, kind: KindId) -> Option<&AbstractOperation> {
        self.abstract_ops.get(&kind)
    }

    /// Get the [AbstractOperation] registered with the qualified name `name`.
    pub fn lookup_op(&self, name: &str) -> Option<&AbstractOperation> {
        self.op_names
            .get(name)
            .and_then(|kind| self.abstract_ops.get(kind))
    }

    /// Does the type or operation kind `kind` carry `capability`?
    pub fn has_capability(&self, kind: KindId, capability: Capability) -> bool {
        self.abstract_types
            .get(&kind)
            .map(|abs| abs.capabilities.contains(&capability))
            .or_else(|| {
                self.abstract_ops
                    .get(&kind)
                    .map(|abs| abs.capabilities.contains(&capability))
            })
            .unwrap_or(false)
    }

    /// Is `kind` already used by a registered type or operation?
    pub fn is_kind_registered(&self, kind: KindId) -> bool {
        self.abstract_types.contains_key(&kind) || self.abstract_ops.contains_key(&kind)
    }

    /// Register an [AbstractType]. Panics if its kind is already registered.
    pub(crate) fn insert_abstract_type(&mut self, abs: AbstractType) {
        assert!(
            !self.abstract_ops.contains_key(&abs.kind),
            "{} is already registered as an operation",
            abs.kind
        );
        match self.abstract_types.entry(abs.kind) {
            Entry::Occupied(_) => panic!("{} is already registered as a type", abs.kind),
            Entry::Vacant(slot) => {
                slot.insert(abs);
            }
        }
    }

    /// Number of distinct uniqued types.
    pub fn num_uniqued_types(&self) -> usize {
        self.type_store.len()
    }
}

pub(crate) mod private {
    use super::{Arena, Context};

    /// An IR object owned by Context
    pub trait ArenaObj
    where
        Self: Sized,
    {
        /// Get the arena that has allocated this object.
        fn get_arena(ctx: &Context) -> &Arena<Self>;
    }
}

use private::ArenaObj;

/// Pointer to an IR Object owned by Context.
/// The pointee is immutable once allocated.
pub struct Ptr<T: ArenaObj> {
    pub(crate) idx: ArenaIndex,
    pub(crate) _dummy: PhantomData<T>,
}

impl<T: ArenaObj> Ptr<T> {
    pub(crate) fn new(idx: ArenaIndex) -> Self {
        Ptr {
            idx,
            _dummy: PhantomData,
        }
    }

    /// Get a reference to the pointee.
    /// Panics if `ctx` is not the context this pointer came from.
    pub fn deref<'a>(&self, ctx: &'a Context) -> &'a T {
        T::get_arena(ctx)
            .get(self.idx)
            .expect("Ptr does not belong to this Context")
    }
}

impl<T: ArenaObj> Clone for Ptr<T> {
    fn clone(&self) -> Ptr<T> {
        *self
    }
}

impl<T: ArenaObj> Copy for Ptr<T> {}

impl<T: ArenaObj> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T: ArenaObj> Eq for Ptr<T> {}

impl<T: ArenaObj + 'static> Hash for Ptr<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        TypeId::of::<T>().hash(state);
        self.idx.hash(state);
    }
}

impl<T: ArenaObj> Debug for Ptr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ptr({:?})", self.idx)
    }
}
