//! [Dialect]s are a mechanism to group related operations, [Type](crate::type::Type)s
//! and [Attribute](crate::attribute::Attribute)s.
use std::{fmt::Display, ops::Deref};

use combine::{token, Parser};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    attribute::AttrParserFn,
    capability::{Capability, CapabilitySet},
    context::Context,
    extensible::dyn_type::DynamicTypeRegistry,
    identifier::Identifier,
    impl_printable_for_display, input_err,
    location::Located,
    parsable::{IntoParseResult, Parsable, ParseResult, StateStream},
    printable::{self, Printable},
    r#type::TypeParserFn,
    result::Result,
};

/// Dialect name: Safe wrapper around a String.
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct DialectName(Identifier);

impl DialectName {
    /// Create a new DialectName
    pub fn new(name: &str) -> DialectName {
        DialectName(name.into())
    }
}

impl_printable_for_display!(DialectName);

impl Display for DialectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Parsable for DialectName {
    type Arg = ();
    type Parsed = DialectName;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        let loc = state_stream.loc();
        let id = Identifier::parser(());
        let mut parser = id.then(move |dialect_name| {
            let loc = loc.clone();
            combine::parser(move |state_stream: &mut StateStream<'a>| {
                let dialect_name = DialectName::new(&dialect_name);
                let res: Result<DialectName> =
                    if state_stream.state.ctx.dialects.contains_key(&dialect_name) {
                        Ok(dialect_name)
                    } else {
                        input_err!(
                            loc.clone(),
                            UnregisteredDialectErr(dialect_name.to_string())
                        )
                    };
                res.into_parse_result()
            })
        });
        parser.parse_stream(state_stream).into()
    }
}

impl Deref for DialectName {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Error)]
#[error("Unregistered dialect {0}")]
pub struct UnregisteredDialectErr(pub String);

/// A name qualified by the dialect it belongs to, printed `dialect.name`.
/// Names of types, attributes and operations are all [QualifiedName]s.
#[derive(Clone, Hash, PartialEq, Eq, Debug)]
pub struct QualifiedName {
    pub dialect: DialectName,
    pub name: Identifier,
}

impl QualifiedName {
    pub fn new(dialect: &str, name: &str) -> Self {
        QualifiedName {
            dialect: DialectName::new(dialect),
            name: name.into(),
        }
    }
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.dialect, self.name)
    }
}

impl_printable_for_display!(QualifiedName);

/// Parses `dialect.name` without checking that anything by that name exists.
impl Parsable for QualifiedName {
    type Arg = ();
    type Parsed = QualifiedName;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        Identifier::parser(())
            .skip(token('.'))
            .and(Identifier::parser(()))
            .map(|(dialect, name)| QualifiedName {
                dialect: DialectName(dialect),
                name,
            })
            .parse_stream(state_stream)
            .into()
    }
}

/// A collection of Types, Attributes and Ops.
/// Dialects are identified by their names.
pub struct Dialect {
    /// Name of this dialect.
    pub name: DialectName,
    /// Types defined by a Rust type, with their parsers.
    pub(crate) types: FxHashMap<Identifier, TypeParserFn>,
    /// Attributes that are part of this dialect.
    pub(crate) attributes: FxHashMap<Identifier, AttrParserFn>,
    /// Types defined at runtime. Only populated for extensible dialects.
    pub(crate) dynamic_types: DynamicTypeRegistry,
    capabilities: CapabilitySet,
}

impl Printable for Dialect {
    fn fmt(
        &self,
        ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "{}", self.name.disp(ctx))
    }
}

impl Dialect {
    /// Create a new unregistered dialect.
    pub fn new(name: DialectName) -> Dialect {
        Dialect {
            name,
            types: FxHashMap::default(),
            attributes: FxHashMap::default(),
            dynamic_types: DynamicTypeRegistry::default(),
            capabilities: CapabilitySet::default(),
        }
    }

    /// Register this dialect if not already registered.
    pub fn register(self, ctx: &mut Context) {
        ctx.dialects.entry(self.name.clone()).or_insert(self);
    }

    /// Add a statically defined [Type](crate::type::Type) to this dialect.
    pub fn add_type(&mut self, name: Identifier, ty_parser: TypeParserFn) {
        assert!(
            !self.types.contains_key(&name) && !self.dynamic_types.names.contains_key(&name),
            "type {}.{} is already registered",
            self.name,
            name
        );
        self.types.insert(name, ty_parser);
    }

    /// Add an [Attribute](crate::attribute::Attribute) to this dialect.
    pub fn add_attr(&mut self, name: Identifier, attr_parser: AttrParserFn) {
        self.attributes.insert(name, attr_parser);
    }

    /// Does this dialect define a type (static or dynamic) named `name`?
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name) || self.dynamic_types.names.contains_key(name)
    }

    /// Tag this dialect with `capability`.
    pub fn add_capability(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
    }

    /// Is this dialect tagged with `capability`?
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// This Dialect's name.
    pub fn get_name(&self) -> &DialectName {
        &self.name
    }

    /// Get reference to a registered Dialect by name.
    pub fn get_ref<'a>(ctx: &'a Context, name: &DialectName) -> Option<&'a Dialect> {
        ctx.dialects.get(name)
    }

    /// Get mutable reference to a registered Dialect by name.
    pub fn get_mut<'a>(ctx: &'a mut Context, name: &DialectName) -> Option<&'a mut Dialect> {
        ctx.dialects.get_mut(name)
    }
}
