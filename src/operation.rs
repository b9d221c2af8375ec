//! A detached [Operation]: a kind, named operands and results, and an
//! attribute dictionary.
//!
//! Operations are plain values here. They are not linked into blocks and
//! their operands are referred to by name, each carrying its type.
//! Every operation has the generic textual form
//! ```text
//! %r0, %r1 = "dialect.op"(%a, %b) {key = ATTR} : (T, T) -> (T, T)
//! ```
//! and may have a custom form `%r = dialect.op ...` handled by its kind.

use combine::{
    error::Commit,
    optional,
    parser::char::{spaces, string},
    sep_by1, token, Parser,
};
use thiserror::Error;

use crate::{
    attribute::{AttrObj, AttributeDict},
    common_traits::Verify,
    context::{Context, KindId, Ptr},
    dialect::QualifiedName,
    identifier::Identifier,
    input_err,
    irfmt::{
        parsers::{
            attr_parser, delimited_list_parser, location, quoted_string_parser, spaced,
            ssa_name_parser, type_parser,
        },
        printers::{functional_type, iter_with_sep, list_with_sep, quoted},
    },
    location::{Located, Location},
    op::{AbstractOperation, FoldResult},
    parsable::{IntoParseResult, Parsable, ParseResult, StateStream},
    printable::{self, ListSeparator, Printable},
    r#type::TypeObj,
    result::Result,
};

/// A named SSA value and its type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Value {
    pub name: Identifier,
    pub ty: Ptr<TypeObj>,
}

impl Value {
    pub fn new(name: &str, ty: Ptr<TypeObj>) -> Self {
        Value {
            name: name.into(),
            ty,
        }
    }
}

impl Printable for Value {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "%{}", self.name)
    }
}

#[derive(Debug, Error)]
#[error("Unregistered operation {0}")]
pub struct UnregisteredOpErr(pub String);

#[derive(Debug, Error)]
#[error("operation {op} has {names} {what} names but {types} {what} types")]
pub struct ArityMismatchErr {
    pub op: String,
    pub what: &'static str,
    pub names: usize,
    pub types: usize,
}

/// An instance of an operation kind.
#[derive(Clone)]
pub struct Operation {
    kind: KindId,
    pub operands: Vec<Value>,
    pub results: Vec<Value>,
    pub attributes: AttributeDict,
    loc: Location,
}

impl Operation {
    /// Create an operation of kind `kind`, which must be registered
    /// by the time the operation is used.
    pub fn new(
        kind: KindId,
        operands: Vec<Value>,
        results: Vec<Value>,
        attributes: AttributeDict,
    ) -> Self {
        Operation {
            kind,
            operands,
            results,
            attributes,
            loc: Location::Unknown,
        }
    }

    pub fn kind_id(&self) -> KindId {
        self.kind
    }

    /// The [AbstractOperation] of this operation's kind.
    /// Panics if the kind isn't registered.
    pub fn abstract_op<'a>(&self, ctx: &'a Context) -> &'a AbstractOperation {
        ctx.abstract_op(self.kind)
            .unwrap_or_else(|| panic!("{} is not a registered operation", self.kind))
    }

    /// Qualified name of this operation's kind.
    pub fn name<'a>(&self, ctx: &'a Context) -> &'a QualifiedName {
        &self.abstract_op(ctx).name
    }

    /// Ask the operation's kind to fold it, given the constant value
    /// (if any) of each operand.
    pub fn fold(&self, ctx: &Context, operands: &[Option<AttrObj>]) -> Option<Vec<FoldResult>> {
        self.abstract_op(ctx).fold(ctx, self, operands)
    }
}

impl Located for Operation {
    fn loc(&self) -> Location {
        self.loc.clone()
    }

    fn set_loc(&mut self, loc: Location) {
        self.loc = loc;
    }
}

impl Verify for Operation {
    fn verify(&self, ctx: &Context) -> Result<()> {
        for value in self.operands.iter().chain(self.results.iter()) {
            value.ty.verify(ctx)?;
        }
        for attr in self.attributes.0.values() {
            attr.verify(ctx)?;
        }
        self.abstract_op(ctx).verify(ctx, self)
    }
}

impl Printable for Operation {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        if !self.results.is_empty() {
            write!(
                f,
                "{} = ",
                list_with_sep(&self.results, ListSeparator::CharSpace(',')).print(ctx, state)
            )?;
        }
        self.abstract_op(ctx).print(ctx, state, self, f)
    }
}

/// Print `op`, less its results, in the generic form:
/// `"dialect.op"(%a, %b) {key = ATTR} : (T, T) -> (T)`.
pub fn print_generic(
    ctx: &Context,
    state: &printable::State,
    op: &Operation,
    f: &mut core::fmt::Formatter<'_>,
) -> core::fmt::Result {
    write!(
        f,
        "{}({})",
        quoted(&op.name(ctx).to_string()).print(ctx, state),
        list_with_sep(&op.operands, ListSeparator::CharSpace(',')).print(ctx, state)
    )?;

    if !op.attributes.is_empty() {
        write!(f, " {{")?;
        for (i, (key, attr)) in op.attributes.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", key, attr.print(ctx, state))?;
        }
        write!(f, "}}")?;
    }

    let operand_tys = op.operands.iter().map(|v| v.ty);
    let result_tys = op.results.iter().map(|v| v.ty);
    write!(
        f,
        " : {}",
        functional_type(
            iter_with_sep(operand_tys, ListSeparator::CharSpace(',')),
            iter_with_sep(result_tys, ListSeparator::CharSpace(',')),
        )
        .print(ctx, state)
    )
}

/// What is known about an operation when its kind's custom parser takes over:
/// everything up to and including the operation name.
#[derive(Clone, Debug)]
pub struct OperationState {
    pub kind: KindId,
    pub name: QualifiedName,
    pub result_names: Vec<Identifier>,
    pub loc: Location,
}

impl OperationState {
    /// Finish the operation. There must be exactly one result type
    /// for every result name.
    pub fn build(
        self,
        operands: Vec<Value>,
        result_types: Vec<Ptr<TypeObj>>,
        attributes: AttributeDict,
    ) -> Result<Operation> {
        let results = zip_values(
            &self.name.to_string(),
            "result",
            &self.loc,
            self.result_names,
            result_types,
        )?;
        Ok(Operation {
            kind: self.kind,
            operands,
            results,
            attributes,
            loc: self.loc,
        })
    }
}

fn zip_values(
    op: &str,
    what: &'static str,
    loc: &Location,
    names: Vec<Identifier>,
    types: Vec<Ptr<TypeObj>>,
) -> Result<Vec<Value>> {
    if names.len() != types.len() {
        return input_err!(
            loc.clone(),
            ArityMismatchErr {
                op: op.to_string(),
                what,
                names: names.len(),
                types: types.len(),
            }
        );
    }
    Ok(names
        .into_iter()
        .zip(types)
        .map(|(name, ty)| Value { name, ty })
        .collect())
}

/// Parses `%r0, %r1 =`.
fn result_names_parser<'a>() -> impl Parser<StateStream<'a>, Output = Vec<Identifier>> + 'a {
    sep_by1::<Vec<_>, _, _, _>(
        ssa_name_parser().skip(spaces()),
        token(',').skip(spaces()),
    )
    .skip(token('='))
    .skip(spaces())
}

/// Parses `{key = ATTR, ...}`.
fn attr_dict_parser<'a>() -> impl Parser<StateStream<'a>, Output = AttributeDict> + 'a {
    delimited_list_parser(
        '{',
        '}',
        ',',
        Identifier::parser(())
            .skip(spaced(token('=')))
            .and(attr_parser()),
    )
    .map(|entries: Vec<(Identifier, AttrObj)>| entries.into_iter().collect())
}

fn parse_generic_op<'a>(
    state_stream: &mut StateStream<'a>,
    loc: Location,
    result_names: Vec<Identifier>,
) -> ParseResult<'a, Operation> {
    let mut parser = quoted_string_parser()
        .skip(spaces())
        .and(delimited_list_parser('(', ')', ',', ssa_name_parser()))
        .skip(spaces())
        .and(optional(attr_dict_parser()))
        .skip(spaces())
        .skip(token(':'))
        .skip(spaces())
        .and(delimited_list_parser('(', ')', ',', type_parser()))
        .skip(spaced(string("->")))
        .and(delimited_list_parser('(', ')', ',', type_parser()));

    let (((((name, operand_names), attributes), operand_tys), result_tys), commit) =
        parser.parse_stream(state_stream).into_result()?;

    let kind = state_stream.state.ctx.op_names.get(&name).copied();
    let op: Result<Operation> = match kind {
        None => input_err!(loc, UnregisteredOpErr(name)),
        Some(kind) => zip_values(&name, "operand", &loc, operand_names, operand_tys).and_then(
            |operands| {
                let results = zip_values(&name, "result", &loc, result_names, result_tys)?;
                Ok(Operation {
                    kind,
                    operands,
                    results,
                    attributes: attributes.unwrap_or_default(),
                    loc,
                })
            },
        ),
    };
    match op {
        Ok(op) => Ok((op, commit)),
        Err(err) => Err::<Operation, _>(err).into_parse_result(),
    }
}

fn parse_custom_op<'a>(
    state_stream: &mut StateStream<'a>,
    loc: Location,
    result_names: Vec<Identifier>,
) -> ParseResult<'a, Operation> {
    let (name, _) = QualifiedName::parser(())
        .parse_stream(state_stream)
        .into_result()?;

    let ctx = &state_stream.state.ctx;
    let kind_parser = ctx
        .op_names
        .get(&name.to_string())
        .and_then(|kind| ctx.abstract_op(*kind))
        .map(|abs| (abs.kind, abs.parser.clone()));

    let Some((kind, op_parser)) = kind_parser else {
        let res: Result<Operation> = input_err!(loc, UnregisteredOpErr(name.to_string()));
        return res.into_parse_result();
    };

    let op_state = OperationState {
        kind,
        name,
        result_names,
        loc,
    };
    // The name has been consumed, so whatever the kind's parser does is committed.
    match op_parser(state_stream, op_state) {
        Ok((op, _)) => Ok((op, Commit::Commit(()))),
        Err(err) => Err(Commit::Commit(err.into_inner())),
    }
}

impl Parsable for Operation {
    type Arg = ();
    type Parsed = Operation;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        let mut op_parser = location()
            .and(optional(result_names_parser()))
            .then(|(loc, result_names): (Location, Option<Vec<Identifier>>)| {
                let result_names = result_names.unwrap_or_default();
                let generic = {
                    let loc = loc.clone();
                    let result_names = result_names.clone();
                    combine::parser(move |state_stream: &mut StateStream<'a>| {
                        parse_generic_op(state_stream, loc.clone(), result_names.clone())
                    })
                };
                let custom = combine::parser(move |state_stream: &mut StateStream<'a>| {
                    parse_custom_op(state_stream, loc.clone(), result_names.clone())
                });
                generic.or(custom)
            });

        op_parser.parse_stream(state_stream).into()
    }
}
