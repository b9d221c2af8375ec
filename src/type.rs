//! Every SSA value, such as operation results or block arguments,
//! has a type defined by the type system.
//!
//! The type system is open, with no fixed list of types,
//! and there are no restrictions on the abstractions they represent.
//!
//! See [MLIR Types](https://mlir.llvm.org/docs/DefiningDialects/AttributesAndTypes/#types)
//!
//! Types are uniqued: a [Context] holds exactly one [TypeObj] for every
//! (kind, value) pair, and hands out [Ptr]s to it. Type equality is
//! therefore [Ptr] equality. A kind is either backed by a Rust type
//! ([StaticType], use the [impl_type](crate::impl_type) macro) or defined
//! at runtime through an [ExtensibleDialect](crate::extensible::ExtensibleDialect).

use std::{any::TypeId, fmt};

use combine::{token, Parser};
use downcast_rs::{impl_downcast, Downcast};
use thiserror::Error;

use crate::{
    capability::CapabilitySet,
    common_traits::Verify,
    context::{private::ArenaObj, Arena, Context, KindId, Ptr},
    dialect::{DialectName, QualifiedName},
    extensible::ExtensibleDialect,
    identifier::Identifier,
    input_err,
    location::{Located, Location},
    parsable::{IntoParseResult, Parsable, ParseResult, StateStream},
    printable::{self, Printable},
    result::Result,
    storage_uniquer::TypeValueHash,
};

/// Basic functionality that every type in the IR must implement.
/// Type objects (instances of a Type) are (mostly) immutable once created,
/// and are uniqued globally. Uniquing is based on the kind
/// and the contents (hash and equality) of the type object.
pub trait Type: Printable + Verify + Downcast {
    /// Compute and get the hash for this instance of Self.
    /// Hash collisions can be a possibility.
    fn hash_type(&self) -> TypeValueHash;
    /// Is self equal to an other Type?
    fn eq_type(&self, other: &dyn Type) -> bool;
    /// The kind of this type object.
    fn kind_id(&self, ctx: &Context) -> KindId;
}
impl_downcast!(Type);

/// Type objects are boxed and stored in the IR.
pub type TypeObj = Box<dyn Type>;

/// Parser of a type's contents (what follows `dialect.name`), stored in its
/// [Dialect](crate::dialect::Dialect).
pub type TypeParserFn = for<'a> fn(&mut StateStream<'a>) -> ParseResult<'a, Ptr<TypeObj>>;

impl ArenaObj for TypeObj {
    fn get_arena(ctx: &Context) -> &Arena<Self> {
        &ctx.type_store.unique_store
    }
}

/// Get the canonical instance of `t`, creating it if this is the first request.
/// Panics if the kind of `t` isn't registered.
pub fn register_instance<T: Type>(t: T, ctx: &mut Context) -> Ptr<TypeObj> {
    let kind = t.kind_id(ctx);
    let hash = t.hash_type();
    let idx = ctx.type_store.get_or_create_unique(
        kind,
        Box::new(t),
        hash,
        &|t1: &TypeObj, t2: &TypeObj| t1.eq_type(&**t2),
    );
    Ptr::new(idx)
}

/// Get the canonical instance of `t`, if it was ever created.
pub fn get_instance<T: Type>(t: &T, ctx: &Context) -> Option<Ptr<TypeObj>> {
    let kind = t.kind_id(ctx);
    ctx.type_store
        .get(kind, t.hash_type(), &|other: &TypeObj| t.eq_type(&**other))
        .map(Ptr::new)
}

/// A [Type] whose kind is backed by the Rust type `Self`.
/// Implemented by the [impl_type](crate::impl_type) macro.
pub trait StaticType: Type + Sized {
    /// The qualified name of this type.
    fn get_type_name_static() -> QualifiedName;

    /// Allocate a kind for `Self` and register it, along with its parser,
    /// in its dialect. Registering twice has no effect.
    /// Panics if the dialect isn't registered.
    fn register_type_in_dialect(ctx: &mut Context, type_parser: TypeParserFn) {
        let rust_type = TypeId::of::<Self>();
        if ctx.static_type_kinds.contains_key(&rust_type) {
            return;
        }
        let name = Self::get_type_name_static();
        let kind = ctx.allocate_kind_id();
        ctx.dialects
            .get_mut(&name.dialect)
            .unwrap_or_else(|| panic!("Unregistered dialect {}", name.dialect))
            .add_type(name.name.clone(), type_parser);
        ctx.static_type_kinds.insert(rust_type, kind);
        log::debug!("Registered type {name} as {kind}");
        ctx.insert_abstract_type(AbstractType {
            kind,
            name,
            capabilities: CapabilitySet::default(),
        });
        ctx.type_store.register_kind(kind);
    }
}

/// Description of a type kind: what it is called and what it can do.
pub struct AbstractType {
    pub kind: KindId,
    pub name: QualifiedName,
    pub capabilities: CapabilitySet,
}

/// Qualified name of the kind of a uniqued type.
pub fn type_name(ctx: &Context, ty: Ptr<TypeObj>) -> &QualifiedName {
    let kind = ty.deref(ctx).kind_id(ctx);
    &ctx
        .abstract_type(kind)
        .unwrap_or_else(|| panic!("{kind} is not a registered type"))
        .name
}

impl Printable for Ptr<TypeObj> {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = type_name(ctx, *self);
        write!(f, "{}.", name.dialect)?;
        if ExtensibleDialect::print_if_dynamic_type(ctx, *self, state, f)? {
            return Ok(());
        }
        write!(f, "{}", name.name)?;
        Printable::fmt(&**self.deref(ctx), ctx, state, f)
    }
}

impl Verify for Ptr<TypeObj> {
    fn verify(&self, ctx: &Context) -> Result<()> {
        Verify::verify(&**self.deref(ctx), ctx)
    }
}

impl Parsable for Ptr<TypeObj> {
    type Arg = ();
    type Parsed = Ptr<TypeObj>;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        let loc = state_stream.loc();
        let mut type_parser = DialectName::parser(())
            .skip(token('.'))
            .and(Identifier::parser(()))
            .then(move |(dialect, name): (DialectName, Identifier)| {
                let loc = loc.clone();
                combine::parser(move |state_stream: &mut StateStream<'a>| {
                    parse_type_contents(state_stream, &dialect, &name, loc.clone())
                })
            });

        type_parser.parse_stream(state_stream).into()
    }
}

#[derive(Debug, Error)]
#[error("Unregistered type {0}")]
pub struct UnregisteredTypeErr(pub QualifiedName);

/// Having read `dialect.name`, find who can parse the rest:
/// a static type parser, or else the dialect's dynamic type definitions.
fn parse_type_contents<'a>(
    state_stream: &mut StateStream<'a>,
    dialect: &DialectName,
    name: &Identifier,
    loc: Location,
) -> ParseResult<'a, Ptr<TypeObj>> {
    let static_parser = state_stream
        .state
        .ctx
        .dialects
        .get(dialect)
        .and_then(|d| d.types.get(name).copied());
    if let Some(static_parser) = static_parser {
        return static_parser(state_stream);
    }

    if let Some(extensible) = ExtensibleDialect::cast(state_stream.state.ctx, dialect) {
        let (parsed, commit) = extensible.parse_optional_dynamic_type(state_stream, name)?;
        if let Some(ty) = parsed {
            return Ok((ty, commit));
        }
    }

    let res: Result<Ptr<TypeObj>> = input_err!(
        loc,
        UnregisteredTypeErr(QualifiedName {
            dialect: dialect.clone(),
            name: name.clone(),
        })
    );
    res.into_parse_result()
}

/// impl [Type] and [StaticType] for a rust type.
///
/// Usage:
/// ```
/// #[derive(Hash, PartialEq, Eq, Debug)]
/// struct MyType { }
/// dynir::impl_type!(
///     /// MyType is mine
///     MyType,
///     "my_type",
///     "my_dialect"
/// );
/// # use dynir::{
/// #     printable::{self, Printable}, context::Context,
/// #     result::Result, common_traits::Verify,
/// # };
/// # impl Printable for MyType {
/// #    fn fmt(&self, _ctx: &Context, _state: &printable::State, _f: &mut core::fmt::Formatter<'_>)
/// #    -> core::fmt::Result {
/// #        todo!()
/// #    }
/// # }
/// # impl Verify for MyType {
/// #   fn verify(&self, _ctx: &Context) -> Result<()> {
/// #        todo!()
/// #    }
/// # }
/// ```
/// **Note**: The type must implement [Hash] and [PartialEq].
#[macro_export]
macro_rules! impl_type {
    (   $(#[$outer:meta])*
        $structname: ident, $type_name: literal, $dialect_name: literal) => {
        $(#[$outer])*
        impl $crate::r#type::Type for $structname {
            fn hash_type(&self) -> $crate::storage_uniquer::TypeValueHash {
                $crate::storage_uniquer::TypeValueHash::new(self)
            }

            fn eq_type(&self, other: &dyn $crate::r#type::Type) -> bool {
                other
                    .downcast_ref::<Self>()
                    .map_or(false, |other| other == self)
            }

            fn kind_id(&self, ctx: &$crate::context::Context) -> $crate::context::KindId {
                ctx.static_type_kind::<Self>().unwrap_or_else(|| {
                    panic!(
                        "Type {} is not registered",
                        <Self as $crate::r#type::StaticType>::get_type_name_static()
                    )
                })
            }
        }

        impl $crate::r#type::StaticType for $structname {
            fn get_type_name_static() -> $crate::dialect::QualifiedName {
                $crate::dialect::QualifiedName::new($dialect_name, $type_name)
            }
        }
    }
}
