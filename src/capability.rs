//! [Capability] tokens tag type kinds, operation kinds and dialects
//! with queryable properties, so that clients can ask
//! "is this a dynamic type?" without knowing any concrete Rust type.

use std::fmt::Display;

use rustc_hash::FxHashSet;

/// A named, statically known property. Two capabilities are the
/// same capability if their names are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Capability(&'static str);

impl Capability {
    pub const fn new(name: &'static str) -> Self {
        Capability(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Set of capabilities attached to a kind or a dialect.
pub type CapabilitySet = FxHashSet<Capability>;

/// Carried by every type kind registered at runtime.
pub const IS_DYNAMIC_TYPE: Capability = Capability::new("is_dynamic_type");
/// Carried by every operation kind registered at runtime.
pub const IS_DYNAMIC_OP: Capability = Capability::new("is_dynamic_op");
/// Carried by dialects that accept runtime type and operation definitions.
pub const IS_EXTENSIBLE_DIALECT: Capability = Capability::new("is_extensible_dialect");
