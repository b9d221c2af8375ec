#![allow(dead_code)]

use std::{fmt, rc::Rc};

use combine::{between, parser::char::spaces, token, Parser};
use dynir::{
    attribute::{AttrObj, AttributeDict},
    builtin::{
        self,
        attributes::{IntegerAttr, TypeAttr},
    },
    capability::Capability,
    context::{Context, KindId, Ptr},
    extensible::{
        dyn_op::DynamicOpDefinition, dyn_type::DynamicTypeDefinition, ExtensibleDialect,
    },
    identifier::Identifier,
    irfmt::parsers::{attr_parser, int_parser, spaced, type_parser},
    location::{Located, Location},
    op::FoldResult,
    operation::{Operation, OperationState},
    parsable::{
        self, state_stream_from_iterator, IntoParseResult, Parsable, ParseResult, StateStream,
    },
    printable::{self, Printable},
    r#type::TypeObj,
    result::Result,
    rewrite::{RewritePattern, RewritePatternSet},
    verify_err,
};

pub fn init_env_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Trait of `test.add`.
pub const COMMUTATIVE: Capability = Capability::new("commutative");

/// Kinds of the `test` dialect set up by [setup_test_dialect].
pub struct TestDialect {
    pub dialect: ExtensibleDialect,
    /// `test.pair<A, B>`: exactly two parameters, default syntax.
    pub pair: KindId,
    /// `test.singleton`: no parameters.
    pub singleton: KindId,
    /// `test.vec[N x T]`: a positive length and a type, custom syntax.
    pub vec: KindId,
    /// `test.add`: two operands, one result, generic syntax only.
    pub add: KindId,
    /// `%r = test.const 42 : T`.
    pub constant: KindId,
}

fn verify_pair(_ctx: &Context, loc: &Location, params: &[AttrObj]) -> Result<()> {
    if params.len() != 2 {
        return verify_err!(
            loc.clone(),
            "expected exactly two parameters, got {}",
            params.len()
        );
    }
    Ok(())
}

fn verify_singleton(_ctx: &Context, loc: &Location, params: &[AttrObj]) -> Result<()> {
    if !params.is_empty() {
        return verify_err!(loc.clone(), "expected no parameters");
    }
    Ok(())
}

fn verify_vec(_ctx: &Context, loc: &Location, params: &[AttrObj]) -> Result<()> {
    match params {
        [len, elem] if elem.downcast_ref::<TypeAttr>().is_some() => {
            match len.downcast_ref::<IntegerAttr>() {
                Some(len) if len.value() > 0 => Ok(()),
                _ => verify_err!(loc.clone(), "vector length must be a positive integer"),
            }
        }
        _ => verify_err!(loc.clone(), "expected a length and an element type"),
    }
}

fn parse_vec_params<'a>(state_stream: &mut StateStream<'a>) -> ParseResult<'a, Vec<AttrObj>> {
    between(
        token('['),
        token(']'),
        spaced(int_parser::<i64>())
            .skip(token('x'))
            .and(spaced(type_parser())),
    )
    .map(|(len, elem)| -> Vec<AttrObj> {
        vec![IntegerAttr::new(len).into(), TypeAttr::new(elem).into()]
    })
    .parse_stream(state_stream)
    .into()
}

fn print_vec_params(
    ctx: &Context,
    state: &printable::State,
    params: &[AttrObj],
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let (Some(len), Some(elem)) = (
        params.first().and_then(|p| p.downcast_ref::<IntegerAttr>()),
        params.get(1).and_then(|p| p.downcast_ref::<TypeAttr>()),
    ) else {
        return Err(fmt::Error);
    };
    write!(
        f,
        "[{} x {}]",
        len.value(),
        elem.get_type().print(ctx, state)
    )?;
    Ok(())
}

fn verify_add(_ctx: &Context, op: &Operation) -> Result<()> {
    if op.operands.len() != 2 || op.results.len() != 1 {
        return verify_err!(op.loc(), "test.add expects two operands and one result");
    }
    Ok(())
}

fn fold_add(
    _ctx: &Context,
    _op: &Operation,
    operands: &[Option<AttrObj>],
) -> Option<Vec<FoldResult>> {
    let [Some(lhs), Some(rhs)] = operands else {
        return None;
    };
    let lhs = lhs.downcast_ref::<IntegerAttr>()?.value();
    let rhs = rhs.downcast_ref::<IntegerAttr>()?.value();
    Some(vec![FoldResult::Attr(IntegerAttr::new(lhs + rhs).into())])
}

/// Orders the operands of a commutative operation by name.
pub struct SortOperands;

impl RewritePattern for SortOperands {
    fn name(&self) -> &str {
        "sort_operands"
    }

    fn match_and_rewrite(&self, _ctx: &Context, op: &mut Operation) -> Result<bool> {
        if op.operands.len() == 2 && op.operands[0].name > op.operands[1].name {
            op.operands.swap(0, 1);
            return Ok(true);
        }
        Ok(false)
    }
}

fn verify_const(_ctx: &Context, op: &Operation) -> Result<()> {
    let has_value = op
        .attributes
        .get("value")
        .is_some_and(|value| value.downcast_ref::<IntegerAttr>().is_some());
    if !op.operands.is_empty() || op.results.len() != 1 || !has_value {
        return verify_err!(
            op.loc(),
            "test.const expects an integer value and exactly one result"
        );
    }
    Ok(())
}

fn parse_const<'a>(
    state_stream: &mut StateStream<'a>,
    op_state: OperationState,
) -> ParseResult<'a, Operation> {
    let ((value, ty), _) = spaced(int_parser::<i64>())
        .skip(token(':'))
        .skip(spaces())
        .and(type_parser())
        .parse_stream(state_stream)
        .into_result()?;
    let attributes: AttributeDict = [(
        Identifier::from("value"),
        AttrObj::from(IntegerAttr::new(value)),
    )]
    .into_iter()
    .collect();
    op_state.build(vec![], vec![ty], attributes).into_parse_result()
}

fn print_const(
    ctx: &Context,
    state: &printable::State,
    op: &Operation,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let value = op
        .attributes
        .get("value")
        .and_then(|value| value.downcast_ref::<IntegerAttr>())
        .ok_or(fmt::Error)?;
    let ty = op.results.first().ok_or(fmt::Error)?.ty;
    write!(
        f,
        "{} {} : {}",
        op.name(ctx),
        value.value(),
        ty.print(ctx, state)
    )?;
    Ok(())
}

/// Register the builtin dialect and an extensible `test` dialect with a few kinds.
pub fn setup_test_dialect(ctx: &mut Context) -> TestDialect {
    builtin::register(ctx);
    let dialect = ExtensibleDialect::new(ctx, "test");

    let pair = DynamicTypeDefinition::new(ctx, &dialect, "pair", verify_pair);
    let pair = dialect.add_dynamic_type(ctx, pair).expect("test.pair");

    let singleton = DynamicTypeDefinition::new(ctx, &dialect, "singleton", verify_singleton);
    let singleton = dialect
        .add_dynamic_type(ctx, singleton)
        .expect("test.singleton");

    let vec = DynamicTypeDefinition::with_syntax(
        ctx,
        &dialect,
        "vec",
        verify_vec,
        Rc::new(parse_vec_params),
        print_vec_params,
    );
    let vec = dialect.add_dynamic_type(ctx, vec).expect("test.vec");

    let mut add = DynamicOpDefinition::new(ctx, &dialect, "add", verify_add);
    add.set_fold_hook(fold_add);
    add.set_has_trait(|capability| capability == COMMUTATIVE);
    add.set_canonicalization_patterns(|patterns: &mut RewritePatternSet, _: &Context| {
        patterns.add(Box::new(SortOperands))
    });
    let add = dialect.add_dynamic_op(ctx, add).expect("test.add");

    let constant = DynamicOpDefinition::with_syntax(
        ctx,
        &dialect,
        "const",
        verify_const,
        Rc::new(parse_const),
        print_const,
    );
    let constant = dialect.add_dynamic_op(ctx, constant).expect("test.const");

    TestDialect {
        dialect,
        pair,
        singleton,
        vec,
        add,
        constant,
    }
}

/// Parse a whole type, or get the parse error as text.
pub fn parse_type(ctx: &mut Context, text: &str) -> std::result::Result<Ptr<TypeObj>, String> {
    let state_stream = state_stream_from_iterator(text.chars(), parsable::State::new(ctx));
    type_parser()
        .skip(combine::eof())
        .parse(state_stream)
        .map(|(ty, _)| ty)
        .map_err(|err| err.to_string())
}

/// Parse a whole attribute, or get the parse error as text.
pub fn parse_attr(ctx: &mut Context, text: &str) -> std::result::Result<AttrObj, String> {
    let state_stream = state_stream_from_iterator(text.chars(), parsable::State::new(ctx));
    attr_parser()
        .skip(combine::eof())
        .parse(state_stream)
        .map(|(attr, _)| attr)
        .map_err(|err| err.to_string())
}

/// Parse a whole operation, or get the parse error as text.
pub fn parse_op(ctx: &mut Context, text: &str) -> std::result::Result<Operation, String> {
    let state_stream = state_stream_from_iterator(text.chars(), parsable::State::new(ctx));
    Operation::parser(())
        .skip(combine::eof())
        .parse(state_stream)
        .map(|(op, _)| op)
        .map_err(|err| err.to_string())
}

/// The error text of a parse that must fail.
pub fn parse_err<T>(res: std::result::Result<T, String>) -> String {
    match res {
        Ok(_) => panic!("expected a parse error"),
        Err(err) => err,
    }
}
