//! Attributes are constant data: parameters of dynamic types and
//! named entries in an [Operation](crate::operation::Operation)'s dictionary.
//!
//! See [MLIR Attributes](https://mlir.llvm.org/docs/LangRef/#attributes).
//! Unlike in MLIR, attributes are not uniqued. They are boxed, clonable,
//! and compared / hashed by value through [Attribute::eq_attr] and
//! [Attribute::hash_attr], which is what lets a list of them serve as
//! the identity of a uniqued type.
//!
//! The [impl_attr](crate::impl_attr) macro can be used to implement [Attribute] for a rust type.
//!
//! [AttrObj]s can be downcasted to their concrete types using
//! [downcast_rs](https://docs.rs/downcast-rs/1.2.0/downcast_rs/index.html#example-without-generics).
use std::{
    collections::BTreeMap,
    hash::{Hash, Hasher},
};

use combine::{token, Parser};
use downcast_rs::{impl_downcast, Downcast};
use dyn_clone::DynClone;
use thiserror::Error;

use crate::{
    common_traits::Verify,
    context::Context,
    dialect::{DialectName, QualifiedName},
    identifier::Identifier,
    input_err,
    location::Located,
    parsable::{IntoParseResult, Parsable, ParseResult, StateStream},
    printable::{self, Printable},
    result::Result,
    storage_uniquer::TypeValueHash,
};

/// Basic functionality that every attribute in the IR must implement.
///
/// See [module](crate::attribute) documentation for more information.
pub trait Attribute: Printable + Verify + Downcast + DynClone {
    /// Is self equal to an other Attribute?
    fn eq_attr(&self, other: &dyn Attribute) -> bool;

    /// Hash of this attribute's value and Rust type.
    fn hash_attr(&self) -> TypeValueHash;

    /// Get an [Attribute]'s static name. This is *not* per instantnce.
    /// It is mostly useful for printing and parsing the attribute.
    fn get_attr_id(&self) -> QualifiedName;

    /// Same as [get_attr_id](Self::get_attr_id), but without the self reference.
    fn get_attr_id_static() -> QualifiedName
    where
        Self: Sized;

    /// Register this attribute's parser in the dialect it belongs to.
    /// Panics if the dialect isn't registered.
    fn register_attr_in_dialect(ctx: &mut Context, attr_parser: AttrParserFn)
    where
        Self: Sized,
    {
        let id = Self::get_attr_id_static();
        let dialect = ctx
            .dialects
            .get_mut(&id.dialect)
            .unwrap_or_else(|| panic!("Unregistered dialect {}", id.dialect));
        dialect.add_attr(id.name, attr_parser);
    }
}
impl_downcast!(Attribute);
dyn_clone::clone_trait_object!(Attribute);

/// [Attribute] objects are boxed and stored in the IR.
pub type AttrObj = Box<dyn Attribute>;

/// Parser of an attribute's contents, stored in its [Dialect](crate::dialect::Dialect).
pub type AttrParserFn = for<'a> fn(&mut StateStream<'a>) -> ParseResult<'a, AttrObj>;

impl PartialEq for AttrObj {
    fn eq(&self, other: &Self) -> bool {
        (**self).eq_attr(&**other)
    }
}

impl Eq for AttrObj {}

impl Hash for AttrObj {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash_attr().hash(state)
    }
}

/// Prints the attribute's qualified name followed by its contents.
impl Printable for AttrObj {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}", self.get_attr_id())?;
        Printable::fmt(&**self, ctx, state, f)
    }
}

impl Verify for AttrObj {
    fn verify(&self, ctx: &Context) -> Result<()> {
        Verify::verify(&**self, ctx)
    }
}

impl Parsable for AttrObj {
    type Arg = ();
    type Parsed = AttrObj;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        let loc = state_stream.loc();
        let mut attr_parser = DialectName::parser(())
            .skip(token('.'))
            .and(Identifier::parser(()))
            .then(move |(dialect, name): (DialectName, Identifier)| {
                let loc = loc.clone();
                combine::parser(move |state_stream: &mut StateStream<'a>| {
                    let attr_parser = state_stream
                        .state
                        .ctx
                        .dialects
                        .get(&dialect)
                        .and_then(|dialect| dialect.attributes.get(&name).copied());
                    match attr_parser {
                        Some(attr_parser) => attr_parser(state_stream),
                        None => {
                            let res: Result<AttrObj> = input_err!(
                                loc.clone(),
                                UnregisteredAttrErr(QualifiedName {
                                    dialect: dialect.clone(),
                                    name: name.clone(),
                                })
                            );
                            res.into_parse_result()
                        }
                    }
                })
            });

        attr_parser.parse_stream(state_stream).into()
    }
}

#[derive(Debug, Error)]
#[error("Unregistered attribute {0}")]
pub struct UnregisteredAttrErr(pub QualifiedName);

/// Parse a concrete [Attribute] and box it. Instantiations of this are
/// what typically gets registered as an [AttrParserFn].
pub fn parse_boxed_attr<'a, T>(state_stream: &mut StateStream<'a>) -> ParseResult<'a, AttrObj>
where
    T: Attribute + Parsable<Arg = (), Parsed = T>,
{
    T::parser(())
        .map(|attr| -> AttrObj { Box::new(attr) })
        .parse_stream(state_stream)
        .into()
}

/// Named attributes of an [Operation](crate::operation::Operation), printed in key order.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AttributeDict(pub BTreeMap<Identifier, AttrObj>);

impl AttributeDict {
    pub fn get(&self, key: &str) -> Option<&AttrObj> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: Identifier, attr: AttrObj) -> Option<AttrObj> {
        self.0.insert(key, attr)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrObj> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Identifier, AttrObj)> for AttributeDict {
    fn from_iter<I: IntoIterator<Item = (Identifier, AttrObj)>>(iter: I) -> Self {
        AttributeDict(iter.into_iter().collect())
    }
}

/// impl [Attribute] for a rust type.
///
/// Usage:
/// ```
/// #[derive(PartialEq, Eq, Hash, Clone, Debug)]
/// struct MyAttr { }
/// dynir::impl_attr!(
///     /// MyAttr is mine
///     MyAttr,
///     "my_attr",
///     "my_dialect"
/// );
/// # use dynir::{
/// #     printable::{self, Printable}, context::Context,
/// #     result::Result, common_traits::Verify,
/// # };
/// # impl Printable for MyAttr {
/// #    fn fmt(&self, _ctx: &Context, _state: &printable::State, _f: &mut core::fmt::Formatter<'_>)
/// #    -> core::fmt::Result {
/// #        todo!()
/// #    }
/// # }
/// # impl Verify for MyAttr {
/// #   fn verify(&self, _ctx: &Context) -> Result<()> {
/// #        todo!()
/// #    }
/// # }
/// ```
/// **Note**: The type must implement [Hash], [PartialEq] and [Clone].
#[macro_export]
macro_rules! impl_attr {
    (   $(#[$outer:meta])*
        $structname: ident, $attr_name: literal, $dialect_name: literal) => {
        $(#[$outer])*
        impl $crate::attribute::Attribute for $structname {
            fn eq_attr(&self, other: &dyn $crate::attribute::Attribute) -> bool {
                other
                    .downcast_ref::<Self>()
                    .map_or(false, |other| other == self)
            }

            fn hash_attr(&self) -> $crate::storage_uniquer::TypeValueHash {
                $crate::storage_uniquer::TypeValueHash::new(self)
            }

            fn get_attr_id(&self) -> $crate::dialect::QualifiedName {
                Self::get_attr_id_static()
            }

            fn get_attr_id_static() -> $crate::dialect::QualifiedName {
                $crate::dialect::QualifiedName::new($dialect_name, $attr_name)
            }
        }
    }
}
