//! Dialects whose types and operations are defined at runtime.
//!
//! An [ExtensibleDialect] accepts [DynamicTypeDefinition]s and
//! [DynamicOpDefinition]s: a name, a verifier, and optionally a custom
//! syntax. No Rust type backs such a kind. The framework's type printer and
//! parser consult the dialect ([print_if_dynamic_type](ExtensibleDialect::print_if_dynamic_type),
//! [parse_optional_dynamic_type](ExtensibleDialect::parse_optional_dynamic_type))
//! whenever a name has no static type behind it.
//!
//! ```
//! use dynir::{
//!     builtin::{self, attributes::IntegerAttr},
//!     context::Context,
//!     extensible::{dyn_type::{DynamicType, DynamicTypeDefinition}, ExtensibleDialect},
//!     printable::Printable,
//! };
//!
//! let mut ctx = Context::new();
//! builtin::register(&mut ctx);
//! let dialect = ExtensibleDialect::new(&mut ctx, "test");
//! let def = DynamicTypeDefinition::new(&mut ctx, &dialect, "box", |_, _, _| Ok(()));
//! let kind = dialect.add_dynamic_type(&mut ctx, def).unwrap();
//!
//! let ty = DynamicType::get(&mut ctx, kind, vec![IntegerAttr::new(4).into()]);
//! assert_eq!(ty.as_type().disp(&ctx).to_string(), "test.box<builtin.int<4>>");
//! ```

pub mod dyn_op;
pub mod dyn_type;

use std::fmt;

use combine::error::Commit;
use thiserror::Error;

use crate::{
    arg_err_noloc,
    capability::{CapabilitySet, IS_DYNAMIC_OP, IS_DYNAMIC_TYPE, IS_EXTENSIBLE_DIALECT},
    common_traits::Verify,
    context::{Context, KindId, Ptr},
    dialect::{Dialect, DialectName, QualifiedName},
    op::AbstractOperation,
    parsable::{OptionalParseResult, Parsable, StateStream},
    printable::{self, Printable},
    r#type::{AbstractType, TypeObj},
    result::Result,
};

use self::{
    dyn_op::DynamicOpDefinition,
    dyn_type::{DynamicType, DynamicTypeDefinition},
};

#[derive(Debug, Error)]
#[error("type {0} is already registered")]
pub struct DuplicateDynamicTypeNameErr(pub QualifiedName);

/// Handle to a registered dialect that carries [IS_EXTENSIBLE_DIALECT].
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ExtensibleDialect(DialectName);

impl ExtensibleDialect {
    /// Register the dialect `name`, if it isn't already, and mark it extensible.
    pub fn new(ctx: &mut Context, name: &str) -> ExtensibleDialect {
        let name = DialectName::new(name);
        ctx.dialects
            .entry(name.clone())
            .or_insert_with(|| Dialect::new(name.clone()))
            .add_capability(IS_EXTENSIBLE_DIALECT);
        log::debug!("Created extensible dialect {name}");
        ExtensibleDialect(name)
    }

    /// Is `dialect` extensible?
    pub fn classof(dialect: &Dialect) -> bool {
        dialect.has_capability(IS_EXTENSIBLE_DIALECT)
    }

    /// The dialect `name`, if it is registered and extensible.
    pub fn cast(ctx: &Context, name: &DialectName) -> Option<ExtensibleDialect> {
        ctx.dialects
            .get(name)
            .filter(|dialect| Self::classof(dialect))
            .map(|_| ExtensibleDialect(name.clone()))
    }

    pub fn name(&self) -> &DialectName {
        &self.0
    }

    fn dialect<'a>(&self, ctx: &'a Context) -> &'a Dialect {
        ctx.dialects
            .get(&self.0)
            .unwrap_or_else(|| panic!("Unregistered dialect {}", self.0))
    }

    fn dialect_mut<'a>(&self, ctx: &'a mut Context) -> &'a mut Dialect {
        ctx.dialects
            .get_mut(&self.0)
            .unwrap_or_else(|| panic!("Unregistered dialect {}", self.0))
    }

    /// Register a type kind. A malformed name, or one already taken by a
    /// type of this dialect, is rejected and nothing is registered.
    /// Panics if `def` was created for another dialect or is already registered.
    pub fn add_dynamic_type(
        &self,
        ctx: &mut Context,
        def: DynamicTypeDefinition,
    ) -> Result<KindId> {
        assert!(
            def.dialect() == &self.0,
            "dynamic type {} belongs to dialect {}, not {}",
            def.name(),
            def.dialect(),
            self.0
        );
        def.name().verify(ctx)?;
        let name = QualifiedName {
            dialect: self.0.clone(),
            name: def.name().clone(),
        };
        if self.dialect(ctx).has_type(def.name()) {
            return arg_err_noloc!(DuplicateDynamicTypeNameErr(name));
        }
        let kind = def.kind_id();
        assert!(
            !ctx.is_kind_registered(kind),
            "dynamic type {name} ({kind}) is already registered"
        );

        let registry = &mut self.dialect_mut(ctx).dynamic_types;
        registry.names.insert(def.name().clone(), kind);
        registry.types.insert(kind, def);

        log::debug!("Registered dynamic type {name} as {kind}");
        ctx.insert_abstract_type(AbstractType {
            kind,
            name,
            capabilities: CapabilitySet::from_iter([IS_DYNAMIC_TYPE]),
        });
        ctx.type_store.register_kind(kind);
        Ok(kind)
    }

    /// Register an operation kind. A malformed name, or one already taken,
    /// is rejected and nothing is registered.
    /// Panics if `def` was created for another dialect or is already registered.
    pub fn add_dynamic_op(&self, ctx: &mut Context, def: DynamicOpDefinition) -> Result<KindId> {
        assert!(
            def.dialect() == &self.0,
            "dynamic operation {} does not belong to dialect {}",
            def.name(),
            self.0
        );
        def.name().name.verify(ctx)?;
        def.into_abstract_operation().insert(ctx)
    }

    /// The dynamic type kind called `name` in this dialect.
    pub fn lookup_type_definition<'a>(
        &self,
        ctx: &'a Context,
        name: &str,
    ) -> Option<&'a DynamicTypeDefinition> {
        let registry = &self.dialect(ctx).dynamic_types;
        registry
            .names
            .get(name)
            .and_then(|kind| registry.types.get(kind))
    }

    /// The dynamic type kind `kind`, if this dialect has it.
    pub fn lookup_type_definition_by_id<'a>(
        &self,
        ctx: &'a Context,
        kind: KindId,
    ) -> Option<&'a DynamicTypeDefinition> {
        self.dialect(ctx).dynamic_types.types.get(&kind)
    }

    /// The dynamic operation kind called `name` (without the dialect prefix) in this dialect.
    pub fn lookup_op_definition<'a>(
        &self,
        ctx: &'a Context,
        name: &str,
    ) -> Option<&'a AbstractOperation> {
        ctx.lookup_op(&format!("{}.{}", self.0, name))
            .filter(|abs| abs.capabilities.contains(&IS_DYNAMIC_OP))
    }

    /// All dynamic type kinds of this dialect, in no particular order.
    pub fn dynamic_types<'a>(
        &self,
        ctx: &'a Context,
    ) -> impl Iterator<Item = &'a DynamicTypeDefinition> + 'a {
        self.dialect(ctx).dynamic_types.types.values()
    }

    /// Having read `dialect.name`, parse the rest as an instance of the
    /// dynamic type kind `name`. `Ok((None, _))` when this dialect has no
    /// such kind and nothing was consumed.
    pub fn parse_optional_dynamic_type<'a>(
        &self,
        state_stream: &mut StateStream<'a>,
        name: &str,
    ) -> OptionalParseResult<'a, Ptr<TypeObj>> {
        let Some(kind) = self
            .lookup_type_definition(state_stream.state.ctx, name)
            .map(|def| def.kind_id())
        else {
            return Ok((None, Commit::Peek(())));
        };
        DynamicType::parse(state_stream, kind).map(|(ty, commit)| (Some(ty.as_type()), commit))
    }

    /// If `ty` is a dynamic type, print it (less the `dialect.` prefix) and return true.
    pub fn print_if_dynamic_type(
        ctx: &Context,
        ty: Ptr<TypeObj>,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> std::result::Result<bool, fmt::Error> {
        match DynamicType::from_type(ctx, ty) {
            Some(dyn_ty) => {
                Printable::fmt(&dyn_ty, ctx, state, f)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
