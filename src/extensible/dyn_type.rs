//! Type kinds defined at runtime.
//!
//! A [DynamicTypeDefinition] is pure data: a name, a verifier over the
//! parameter list, and optionally a custom syntax for that list. Once added to
//! an [ExtensibleDialect], instances of the kind are [DynamicType]s,
//! uniqued on (kind, parameters) like every other type.

use std::{fmt, rc::Rc};

use combine::{optional, Parser};
use rustc_hash::FxHashMap;

use crate::{
    attribute::AttrObj,
    capability::IS_DYNAMIC_TYPE,
    common_traits::Verify,
    context::{Context, KindId, Ptr},
    dialect::DialectName,
    identifier::Identifier,
    irfmt::{
        parsers::{attr_parser, delimited_list_parser},
        printers::list_with_sep,
    },
    location::{Located, Location},
    parsable::{IntoParseResult, Parsable, ParseResult, StateStream},
    printable::{self, ListSeparator, Printable},
    r#type::{get_instance, register_instance, Type, TypeObj},
    result::Result,
    storage_uniquer::TypeValueHash,
};

use super::ExtensibleDialect;

/// Checks a parameter list. The [Location] is where the type was
/// written, or [Location::Unknown] for types built programmatically.
pub type DynTypeVerifierFn = Box<dyn Fn(&Context, &Location, &[AttrObj]) -> Result<()>>;

/// Parses the parameter list that follows the type's name.
pub type DynTypeParserFn =
    Rc<dyn for<'a> Fn(&mut StateStream<'a>) -> ParseResult<'a, Vec<AttrObj>>>;

/// Prints the parameter list that follows the type's name.
pub type DynTypePrinterFn =
    Box<dyn Fn(&Context, &printable::State, &[AttrObj], &mut fmt::Formatter<'_>) -> fmt::Result>;

/// Runtime description of a type kind.
pub struct DynamicTypeDefinition {
    kind: KindId,
    name: Identifier,
    dialect: DialectName,
    verifier: DynTypeVerifierFn,
    parser: DynTypeParserFn,
    printer: DynTypePrinterFn,
}

impl DynamicTypeDefinition {
    /// A type kind using the default syntax: nothing when there are no
    /// parameters, `<p1, p2>` otherwise.
    /// Panics if `name` contains a `.`.
    pub fn new<V>(ctx: &mut Context, dialect: &ExtensibleDialect, name: &str, verifier: V) -> Self
    where
        V: Fn(&Context, &Location, &[AttrObj]) -> Result<()> + 'static,
    {
        Self::with_syntax(
            ctx,
            dialect,
            name,
            verifier,
            Rc::new(parse_default_params),
            print_default_params,
        )
    }

    /// A type kind whose parameter list is parsed by `parser` and printed by `printer`.
    /// Panics if `name` contains a `.`.
    pub fn with_syntax<V, P>(
        ctx: &mut Context,
        dialect: &ExtensibleDialect,
        name: &str,
        verifier: V,
        parser: DynTypeParserFn,
        printer: P,
    ) -> Self
    where
        V: Fn(&Context, &Location, &[AttrObj]) -> Result<()> + 'static,
        P: Fn(&Context, &printable::State, &[AttrObj], &mut fmt::Formatter<'_>) -> fmt::Result
            + 'static,
    {
        assert!(
            !name.contains('.'),
            "dynamic type name {name} must not contain a '.'"
        );
        DynamicTypeDefinition {
            kind: ctx.allocate_kind_id(),
            name: name.into(),
            dialect: dialect.name().clone(),
            verifier: Box::new(verifier),
            parser,
            printer: Box::new(printer),
        }
    }

    /// Name of the kind, without the dialect prefix.
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    pub fn dialect(&self) -> &DialectName {
        &self.dialect
    }

    pub fn kind_id(&self) -> KindId {
        self.kind
    }

    /// Run the verifier on `params`.
    pub fn verify(&self, ctx: &Context, loc: &Location, params: &[AttrObj]) -> Result<()> {
        (self.verifier)(ctx, loc, params)
    }

    pub(crate) fn params_parser(&self) -> DynTypeParserFn {
        self.parser.clone()
    }

    pub fn print_params(
        &self,
        ctx: &Context,
        state: &printable::State,
        params: &[AttrObj],
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        (self.printer)(ctx, state, params, f)
    }
}

/// Dynamic type kinds of one dialect, by kind and by name.
#[derive(Default)]
pub(crate) struct DynamicTypeRegistry {
    pub(crate) types: FxHashMap<KindId, DynamicTypeDefinition>,
    pub(crate) names: FxHashMap<Identifier, KindId>,
}

fn parse_default_params<'a>(state_stream: &mut StateStream<'a>) -> ParseResult<'a, Vec<AttrObj>> {
    optional(delimited_list_parser('<', '>', ',', attr_parser()))
        .map(Option::unwrap_or_default)
        .parse_stream(state_stream)
        .into()
}

fn print_default_params(
    ctx: &Context,
    state: &printable::State,
    params: &[AttrObj],
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    if params.is_empty() {
        return Ok(());
    }
    write!(
        f,
        "<{}>",
        list_with_sep(params, ListSeparator::CharSpace(',')).print(ctx, state)
    )
}

/// The definition of the dynamic type kind `kind`, in whichever dialect has it.
pub(crate) fn type_definition(ctx: &Context, kind: KindId) -> Option<&DynamicTypeDefinition> {
    let abs = ctx.abstract_type(kind)?;
    ctx.dialects
        .get(&abs.name.dialect)
        .and_then(|dialect| dialect.dynamic_types.types.get(&kind))
}

fn expect_definition(ctx: &Context, kind: KindId) -> &DynamicTypeDefinition {
    type_definition(ctx, kind).unwrap_or_else(|| panic!("{kind} is not a dynamic type kind"))
}

/// What the uniquer stores for a [DynamicType].
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct DynamicTypeStorage {
    def: KindId,
    params: Vec<AttrObj>,
}

impl Type for DynamicTypeStorage {
    fn hash_type(&self) -> TypeValueHash {
        TypeValueHash::new(self)
    }

    fn eq_type(&self, other: &dyn Type) -> bool {
        other
            .downcast_ref::<Self>()
            .map_or(false, |other| other == self)
    }

    fn kind_id(&self, _ctx: &Context) -> KindId {
        self.def
    }
}

/// Prints only the parameter list. The name is printed by [DynamicType].
impl Printable for DynamicTypeStorage {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        expect_definition(ctx, self.def).print_params(ctx, state, &self.params, f)
    }
}

impl Verify for DynamicTypeStorage {
    fn verify(&self, ctx: &Context) -> Result<()> {
        expect_definition(ctx, self.def).verify(ctx, &Location::Unknown, &self.params)
    }
}

/// An instance of a dynamic type kind: a handle to the canonical
/// [TypeObj] for some (kind, parameters) pair.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DynamicType(Ptr<TypeObj>);

impl DynamicType {
    /// Get or create the instance of `def` with `params`, without verifying.
    /// Panics if `def` isn't a registered dynamic type kind.
    pub fn get(ctx: &mut Context, def: KindId, params: Vec<AttrObj>) -> DynamicType {
        assert!(
            ctx.has_capability(def, IS_DYNAMIC_TYPE),
            "{def} is not a dynamic type kind"
        );
        DynamicType(register_instance(DynamicTypeStorage { def, params }, ctx))
    }

    /// Like [get](Self::get), but only after `params` pass the kind's verifier.
    /// Nothing is created when verification fails.
    pub fn get_checked(
        ctx: &mut Context,
        loc: Location,
        def: KindId,
        params: Vec<AttrObj>,
    ) -> Result<DynamicType> {
        expect_definition(ctx, def).verify(ctx, &loc, &params)?;
        Ok(Self::get(ctx, def, params))
    }

    /// The instance of `def` with `params`, if it was ever created.
    pub fn get_existing(ctx: &Context, def: KindId, params: Vec<AttrObj>) -> Option<DynamicType> {
        get_instance(&DynamicTypeStorage { def, params }, ctx).map(DynamicType)
    }

    /// Is `ty` an instance of some dynamic type kind?
    pub fn classof(ctx: &Context, ty: Ptr<TypeObj>) -> bool {
        ctx.has_capability(ty.deref(ctx).kind_id(ctx), IS_DYNAMIC_TYPE)
    }

    /// Is `ty` an instance of exactly the kind `def`?
    pub fn isa(ctx: &Context, ty: Ptr<TypeObj>, def: KindId) -> bool {
        Self::classof(ctx, ty) && ty.deref(ctx).kind_id(ctx) == def
    }

    /// View `ty` as a [DynamicType], if it is one.
    pub fn from_type(ctx: &Context, ty: Ptr<TypeObj>) -> Option<DynamicType> {
        Self::classof(ctx, ty).then_some(DynamicType(ty))
    }

    fn storage<'a>(&self, ctx: &'a Context) -> &'a DynamicTypeStorage {
        self.0
            .deref(ctx)
            .downcast_ref::<DynamicTypeStorage>()
            .expect("a DynamicType always points to a DynamicTypeStorage")
    }

    /// The definition of this type's kind.
    pub fn type_def<'a>(&self, ctx: &'a Context) -> &'a DynamicTypeDefinition {
        expect_definition(ctx, self.storage(ctx).def)
    }

    pub fn params<'a>(&self, ctx: &'a Context) -> &'a [AttrObj] {
        &self.storage(ctx).params
    }

    pub fn as_type(&self) -> Ptr<TypeObj> {
        self.0
    }
}

impl From<DynamicType> for Ptr<TypeObj> {
    fn from(value: DynamicType) -> Self {
        value.0
    }
}

/// Parses the parameter list of the kind passed as argument and gets the
/// checked instance. The name must already have been consumed.
impl Parsable for DynamicType {
    type Arg = KindId;
    type Parsed = DynamicType;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        def: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        let loc = state_stream.loc();
        let params_parser = expect_definition(state_stream.state.ctx, def).params_parser();
        let (params, commit) = params_parser(state_stream)?;
        match DynamicType::get_checked(state_stream.state.ctx, loc, def, params) {
            Ok(ty) => Ok((ty, commit)),
            Err(err) => Err::<DynamicType, _>(err).into_parse_result(),
        }
    }
}

/// Prints the name and the parameter list, without the dialect.
impl Printable for DynamicType {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let storage = self.storage(ctx);
        let def = expect_definition(ctx, storage.def);
        write!(f, "{}", def.name())?;
        def.print_params(ctx, state, &storage.params, f)
    }
}

impl Verify for DynamicType {
    fn verify(&self, ctx: &Context) -> Result<()> {
        self.0.verify(ctx)
    }
}
