mod common;

use std::{cell::Cell, rc::Rc};

use common::{
    init_env_logger, parse_attr, parse_err, parse_op, parse_type, setup_test_dialect,
    TestDialect, COMMUTATIVE,
};
use dynir::{
    attribute::{AttrObj, AttributeDict},
    builtin::{
        attributes::{IntegerAttr, StringAttr, TypeAttr, UnitAttr},
        types::{IntegerType, Signedness, UnitType},
    },
    capability::{IS_DYNAMIC_OP, IS_DYNAMIC_TYPE, IS_EXTENSIBLE_DIALECT},
    common_traits::Verify,
    context::Context,
    dialect::{Dialect, DialectName},
    extensible::{
        dyn_op::DynamicOpDefinition,
        dyn_type::{DynamicType, DynamicTypeDefinition},
        DuplicateDynamicTypeNameErr, ExtensibleDialect,
    },
    identifier::MalformedIdentifierErr,
    location::Location,
    op::{DuplicateOpNameErr, FoldResult},
    operation::{Operation, Value},
    parsable::{self, state_stream_from_iterator},
    printable::Printable,
    r#type::type_name,
    result::{ErrorKind, Result},
    rewrite::RewritePatternSet,
    verify_err,
};
use expect_test::expect;

fn setup() -> (Context, TestDialect) {
    init_env_logger();
    let mut ctx = Context::new();
    let test = setup_test_dialect(&mut ctx);
    (ctx, test)
}

fn accept_any(_ctx: &Context, _loc: &Location, _params: &[AttrObj]) -> Result<()> {
    Ok(())
}

fn accept_any_op(_ctx: &Context, _op: &Operation) -> Result<()> {
    Ok(())
}

#[test]
fn equal_parameters_give_identical_types() {
    let (mut ctx, test) = setup();
    let one: AttrObj = IntegerAttr::new(1).into();
    let two: AttrObj = IntegerAttr::new(2).into();

    let a = DynamicType::get(&mut ctx, test.pair, vec![one.clone(), two.clone()]);
    let b = DynamicType::get(&mut ctx, test.pair, vec![one.clone(), two.clone()]);
    let swapped = DynamicType::get(&mut ctx, test.pair, vec![two.clone(), one.clone()]);
    assert_eq!(a, b);
    assert_eq!(a.as_type(), b.as_type());
    assert_ne!(a, swapped);

    // Same parameters, different kind.
    let other = DynamicType::get(&mut ctx, test.vec, vec![one.clone(), two.clone()]);
    assert_ne!(a.as_type(), other.as_type());
    assert!(DynamicType::isa(&ctx, a.as_type(), test.pair));
    assert!(!DynamicType::isa(&ctx, other.as_type(), test.pair));
}

#[test]
fn failed_verification_creates_nothing() {
    let (mut ctx, test) = setup();
    let open = Rc::new(Cell::new(false));
    let gate = open.clone();
    let def = DynamicTypeDefinition::new(
        &mut ctx,
        &test.dialect,
        "gated",
        move |_: &Context, loc: &Location, _: &[AttrObj]| {
            if gate.get() {
                Ok(())
            } else {
                verify_err!(loc.clone(), "the gate is closed")
            }
        },
    );
    let gated = test.dialect.add_dynamic_type(&mut ctx, def).unwrap();
    let params = || -> Vec<AttrObj> { vec![UnitAttr.into()] };

    let num_types = ctx.num_uniqued_types();
    let err =
        DynamicType::get_checked(&mut ctx, Location::Unknown, gated, params()).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::VerificationFailed));
    expect![[r#"
        [<unknown>] Compilation error: verification failed.
        the gate is closed"#]]
    .assert_eq(&err.disp(&ctx).to_string());
    assert_eq!(ctx.num_uniqued_types(), num_types);
    assert!(DynamicType::get_existing(&ctx, gated, params()).is_none());

    open.set(true);
    let first = DynamicType::get_checked(&mut ctx, Location::Unknown, gated, params()).unwrap();
    let second = DynamicType::get_checked(&mut ctx, Location::Unknown, gated, params()).unwrap();
    assert_eq!(first, second);
    assert_eq!(ctx.num_uniqued_types(), num_types + 1);
    assert_eq!(DynamicType::get_existing(&ctx, gated, params()), Some(first));
}

#[test]
fn pair_round_trips() {
    let (mut ctx, test) = setup();
    let text = "test.pair<builtin.int<1>, builtin.type<builtin.integer<si32>>>";
    let ty = parse_type(&mut ctx, text).unwrap();
    assert_eq!(ty.disp(&ctx).to_string(), text);

    let si32 = IntegerType::get(&mut ctx, 32, Signedness::Signed);
    let built = DynamicType::get(
        &mut ctx,
        test.pair,
        vec![IntegerAttr::new(1).into(), TypeAttr::new(si32).into()],
    );
    assert_eq!(built.as_type(), ty);

    let printed = ty.disp(&ctx).to_string();
    let reparsed = parse_type(&mut ctx, &printed).unwrap();
    assert_eq!(reparsed, ty);
    assert_eq!(type_name(&ctx, ty).to_string(), "test.pair");
}

#[test]
fn string_parameters_round_trip() {
    let (mut ctx, test) = setup();
    let ty = DynamicType::get(
        &mut ctx,
        test.pair,
        vec![StringAttr::new("a\nb").into(), StringAttr::new("tab\there").into()],
    );
    let printed = ty.as_type().disp(&ctx).to_string();
    expect![[r#"test.pair<builtin.string<"a\nb">, builtin.string<"tab\there">>"#]]
        .assert_eq(&printed);
    assert_eq!(parse_type(&mut ctx, &printed).unwrap(), ty.as_type());
}

#[test]
fn nested_dynamic_types_round_trip() {
    let (mut ctx, _test) = setup();
    let text = "test.pair<builtin.type<test.singleton>, \
        builtin.type<test.pair<builtin.unit, builtin.bool<true>>>>";
    let ty = parse_type(&mut ctx, text).unwrap();
    assert_eq!(ty.disp(&ctx).to_string(), text);
    assert_eq!(parse_type(&mut ctx, text).unwrap(), ty);
}

#[test]
fn no_parameters_print_the_bare_name() {
    let (mut ctx, test) = setup();
    let singleton = DynamicType::get(&mut ctx, test.singleton, vec![]);
    expect!["test.singleton"].assert_eq(&singleton.as_type().disp(&ctx).to_string());

    assert_eq!(
        parse_type(&mut ctx, "test.singleton").unwrap(),
        singleton.as_type()
    );
    assert_eq!(
        parse_type(&mut ctx, "test.singleton<>").unwrap(),
        singleton.as_type()
    );
}

#[test]
fn verifier_runs_when_parsing() {
    let (mut ctx, _test) = setup();
    let num_types = ctx.num_uniqued_types();

    let err = parse_type(&mut ctx, "test.pair<builtin.unit>").unwrap_err();
    assert!(err.contains("expected exactly two parameters, got 1"));
    assert!(err.contains("verification failed"));

    let err = parse_type(&mut ctx, "test.singleton<builtin.unit>").unwrap_err();
    assert!(err.contains("expected no parameters"));

    let err = parse_type(&mut ctx, "test.pair<builtin.unit, builtin.unit").unwrap_err();
    assert!(err.starts_with("Parse error at line: 1"));

    let err = parse_type(&mut ctx, "test.pair<builtin.unit, nonsense>").unwrap_err();
    assert!(err.starts_with("Parse error at line: 1"));

    assert_eq!(ctx.num_uniqued_types(), num_types);
}

#[test]
fn unknown_names_are_reported() {
    let (mut ctx, _test) = setup();
    let err = parse_type(&mut ctx, "test.triple<builtin.unit>").unwrap_err();
    assert!(err.contains("Unregistered type test.triple"));

    let err = parse_type(&mut ctx, "nodialect.pair").unwrap_err();
    assert!(err.contains("Unregistered dialect nodialect"));

    let err = parse_err(parse_attr(&mut ctx, "test.pair"));
    assert!(err.contains("Unregistered attribute test.pair"));
}

#[test]
fn custom_type_syntax() {
    let (mut ctx, test) = setup();
    let text = "test.vec[4 x builtin.integer<si32>]";
    let ty = parse_type(&mut ctx, text).unwrap();
    assert_eq!(ty.disp(&ctx).to_string(), text);
    assert_eq!(
        parse_type(&mut ctx, "test.vec[ 4 x builtin.integer<si32> ]").unwrap(),
        ty
    );

    let dyn_ty = DynamicType::from_type(&ctx, ty).unwrap();
    assert!(DynamicType::isa(&ctx, ty, test.vec));
    assert_eq!(dyn_ty.type_def(&ctx).name().as_str(), "vec");
    let len = dyn_ty.params(&ctx)[0]
        .downcast_ref::<IntegerAttr>()
        .unwrap()
        .value();
    assert_eq!(len, 4);

    let err = parse_type(&mut ctx, "test.vec[0 x builtin.unit]").unwrap_err();
    assert!(err.contains("vector length must be a positive integer"));

    // The default syntax is not understood by this kind.
    let default_syntax = "test.vec<builtin.int<4>, builtin.type<builtin.unit>>";
    assert!(parse_type(&mut ctx, default_syntax).is_err());
}

#[test]
fn duplicate_type_names_are_rejected() {
    let (mut ctx, test) = setup();
    let num_types = test.dialect.dynamic_types(&ctx).count();

    let dup = DynamicTypeDefinition::new(&mut ctx, &test.dialect, "pair", accept_any);
    let dup_kind = dup.kind_id();
    let err = test.dialect.add_dynamic_type(&mut ctx, dup).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument));
    assert!(err.err.downcast_ref::<DuplicateDynamicTypeNameErr>().is_some());
    expect![[r#"
        [<unknown>] Compilation error: invalid argument.
        type test.pair is already registered"#]]
    .assert_eq(&err.disp(&ctx).to_string());

    // Nothing changed.
    assert_eq!(test.dialect.dynamic_types(&ctx).count(), num_types);
    assert!(!ctx.is_kind_registered(dup_kind));
    assert_eq!(
        test.dialect
            .lookup_type_definition(&ctx, "pair")
            .map(|def| def.kind_id()),
        Some(test.pair)
    );

    let malformed = DynamicTypeDefinition::new(&mut ctx, &test.dialect, "9lives", accept_any);
    let err = test.dialect.add_dynamic_type(&mut ctx, malformed).unwrap_err();
    assert!(err.err.downcast_ref::<MalformedIdentifierErr>().is_some());
    assert!(test.dialect.lookup_type_definition(&ctx, "9lives").is_none());
}

#[test]
fn dynamic_type_names_clash_with_static_ones() {
    init_env_logger();
    let mut ctx = Context::new();
    dynir::builtin::register(&mut ctx);
    // Make the builtin dialect extensible after the fact.
    let builtin = ExtensibleDialect::new(&mut ctx, "builtin");
    assert_eq!(
        ExtensibleDialect::cast(&ctx, &DialectName::new("builtin")),
        Some(builtin.clone())
    );

    let def = DynamicTypeDefinition::new(&mut ctx, &builtin, "integer", accept_any);
    let err = builtin.add_dynamic_type(&mut ctx, def).unwrap_err();
    assert!(err.err.downcast_ref::<DuplicateDynamicTypeNameErr>().is_some());

    // Static types keep parsing as before.
    let si8 = parse_type(&mut ctx, "builtin.integer<si8>").unwrap();
    assert_eq!(si8, IntegerType::get(&mut ctx, 8, Signedness::Signed));
}

#[test]
fn duplicate_op_names_are_rejected() {
    let (mut ctx, test) = setup();
    let dup = DynamicOpDefinition::new(&mut ctx, &test.dialect, "add", accept_any_op);
    let dup_kind = dup.kind_id();
    let err = test.dialect.add_dynamic_op(&mut ctx, dup).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidArgument));
    assert!(err.err.downcast_ref::<DuplicateOpNameErr>().is_some());
    assert!(!ctx.is_kind_registered(dup_kind));
    assert_eq!(
        test.dialect
            .lookup_op_definition(&ctx, "add")
            .map(|abs| abs.kind),
        Some(test.add)
    );
}

fn add_op(ctx: &mut Context, test: &TestDialect, lhs: &str, rhs: &str) -> Operation {
    let si32 = IntegerType::get(ctx, 32, Signedness::Signed);
    Operation::new(
        test.add,
        vec![Value::new(lhs, si32), Value::new(rhs, si32)],
        vec![Value::new("c", si32)],
        AttributeDict::default(),
    )
}

#[test]
fn ops_without_custom_parser_use_the_generic_form() {
    let (mut ctx, test) = setup();
    let op = add_op(&mut ctx, &test, "a", "b");
    op.verify(&ctx).unwrap();

    let printed = op.disp(&ctx).to_string();
    expect![[r#"%c = "test.add"(%a, %b) : (builtin.integer<si32>, builtin.integer<si32>) -> (builtin.integer<si32>)"#]]
        .assert_eq(&printed);

    let reparsed = parse_op(&mut ctx, &printed).unwrap();
    assert_eq!(reparsed.kind_id(), test.add);
    assert_eq!(reparsed.disp(&ctx).to_string(), printed);
    assert!(reparsed.operands == op.operands && reparsed.results == op.results);

    let err = parse_err(parse_op(&mut ctx, "%c = test.add %a, %b"));
    assert!(err.contains(
        "dynamic operation test.add has no custom parser: \
        dynamic operations without a custom parser cannot be parsed"
    ));
}

#[test]
fn generic_form_with_attributes() {
    let (mut ctx, test) = setup();
    let mut op = add_op(&mut ctx, &test, "x", "y");
    op.attributes.set("tag".into(), StringAttr::new("sum").into());
    op.attributes.set("weight".into(), IntegerAttr::new(-2).into());

    let printed = op.disp(&ctx).to_string();
    expect![[r#"%c = "test.add"(%x, %y) {tag = builtin.string<"sum">, weight = builtin.int<-2>} : (builtin.integer<si32>, builtin.integer<si32>) -> (builtin.integer<si32>)"#]]
        .assert_eq(&printed);

    let reparsed = parse_op(&mut ctx, &printed).unwrap();
    assert!(reparsed.attributes == op.attributes);
    assert_eq!(reparsed.disp(&ctx).to_string(), printed);
}

#[test]
fn generic_form_errors() {
    let (mut ctx, _test) = setup();
    let err = parse_err(parse_op(
        &mut ctx,
        r#"%c = "test.add"(%a) : (builtin.integer<si32>, builtin.integer<si32>) -> (builtin.integer<si32>)"#,
    ));
    assert!(err.contains("operation test.add has 1 operand names but 2 operand types"));

    let err = parse_err(parse_op(&mut ctx, r#""test.nope"() : () -> ()"#));
    assert!(err.contains("Unregistered operation test.nope"));

    let err = parse_err(parse_op(&mut ctx, "%r = test.nope 1"));
    assert!(err.contains("Unregistered operation test.nope"));

    // Parses, but does not verify.
    let op = parse_op(&mut ctx, r#""test.add"() : () -> ()"#).unwrap();
    let err = op.verify(&ctx).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::VerificationFailed));
}

#[test]
fn custom_op_syntax() {
    let (mut ctx, test) = setup();
    let text = "%x = test.const 42 : builtin.integer<si32>";
    let op = parse_op(&mut ctx, text).unwrap();
    assert_eq!(op.kind_id(), test.constant);
    op.verify(&ctx).unwrap();
    assert_eq!(op.disp(&ctx).to_string(), text);

    let value = op
        .attributes
        .get("value")
        .and_then(|value| value.downcast_ref::<IntegerAttr>())
        .map(|value| value.value());
    assert_eq!(value, Some(42));

    // Custom form with a dynamic result type.
    let text = "%p = test.const -1 : test.pair<builtin.unit, builtin.unit>";
    let op = parse_op(&mut ctx, text).unwrap();
    assert_eq!(op.disp(&ctx).to_string(), text);

    let err = parse_err(parse_op(&mut ctx, "%x, %y = test.const 1 : builtin.unit"));
    assert!(err.contains("operation test.const has 2 result names but 1 result types"));
}

#[test]
fn op_hooks() {
    let (mut ctx, test) = setup();
    let op = add_op(&mut ctx, &test, "b", "a");

    let folded = op
        .fold(
            &ctx,
            &[Some(IntegerAttr::new(2).into()), Some(IntegerAttr::new(3).into())],
        )
        .unwrap();
    let [FoldResult::Attr(sum)] = &folded[..] else {
        panic!("expected a single constant");
    };
    assert_eq!(sum.downcast_ref::<IntegerAttr>().unwrap().value(), 5);
    assert!(op.fold(&ctx, &[Some(IntegerAttr::new(2).into()), None]).is_none());

    let add = op.abstract_op(&ctx);
    assert!(add.has_trait(COMMUTATIVE));
    assert!(!add.has_trait(IS_DYNAMIC_TYPE));
    assert!(add.capabilities.contains(&IS_DYNAMIC_OP));
    assert!(ctx.has_capability(test.add, IS_DYNAMIC_OP));

    let mut patterns = RewritePatternSet::new();
    add.populate_canonicalization_patterns(&mut patterns, &ctx);
    assert_eq!(patterns.len(), 1);

    let mut canonical = op.clone();
    assert_eq!(
        patterns.apply_once(&ctx, &mut canonical).unwrap(),
        Some("sort_operands")
    );
    assert_eq!(canonical.operands[0].name.as_str(), "a");
    assert_eq!(patterns.apply_once(&ctx, &mut canonical).unwrap(), None);

    // Hooks that were never set have their defaults.
    let constant = ctx.abstract_op(test.constant).unwrap();
    let mut patterns = RewritePatternSet::new();
    constant.populate_canonicalization_patterns(&mut patterns, &ctx);
    assert!(patterns.is_empty());
    assert!(!constant.has_trait(COMMUTATIVE));
    let text_op = parse_op(&mut ctx, "%x = test.const 1 : builtin.unit").unwrap();
    assert!(text_op.fold(&ctx, &[]).is_none());
}

#[test]
fn fresh_dialect_is_extensible() {
    init_env_logger();
    let mut ctx = Context::new();
    let dialect = ExtensibleDialect::new(&mut ctx, "fresh");
    let name = DialectName::new("fresh");
    let registered = Dialect::get_ref(&ctx, &name).unwrap();
    assert!(ExtensibleDialect::classof(registered));
    assert!(registered.has_capability(IS_EXTENSIBLE_DIALECT));
    assert_eq!(ExtensibleDialect::cast(&ctx, &name), Some(dialect.clone()));
    assert_eq!(dialect.dynamic_types(&ctx).count(), 0);

    // Asking again keeps the same dialect.
    let again = ExtensibleDialect::new(&mut ctx, "fresh");
    assert_eq!(again, dialect);
}

#[test]
fn builtin_types_are_not_dynamic() {
    let (mut ctx, test) = setup();
    let unit = UnitType::get(&mut ctx);
    assert!(!DynamicType::classof(&ctx, unit));
    assert!(DynamicType::from_type(&ctx, unit).is_none());
    assert!(!ctx.has_capability(unit.deref(&ctx).kind_id(&ctx), IS_DYNAMIC_TYPE));
    assert!(ctx.has_capability(test.pair, IS_DYNAMIC_TYPE));
    assert_eq!(unit.disp(&ctx).to_string(), "builtin.unit");
}

#[test]
fn parse_optional_dynamic_type_states() {
    let (mut ctx, test) = setup();
    {
        let mut state_stream =
            state_stream_from_iterator("<builtin.unit>".chars(), parsable::State::new(&mut ctx));
        let res = test
            .dialect
            .parse_optional_dynamic_type(&mut state_stream, "absent");
        assert!(matches!(res, Ok((None, _))));
    }

    let pair = {
        let mut state_stream = state_stream_from_iterator(
            "<builtin.unit, builtin.unit>".chars(),
            parsable::State::new(&mut ctx),
        );
        let res = test
            .dialect
            .parse_optional_dynamic_type(&mut state_stream, "pair");
        match res {
            Ok((Some(ty), _)) => ty,
            _ => panic!("expected test.pair to parse"),
        }
    };
    assert!(DynamicType::isa(&ctx, pair, test.pair));

    {
        let mut state_stream = state_stream_from_iterator(
            "<builtin.unit>".chars(),
            parsable::State::new(&mut ctx),
        );
        let res = test
            .dialect
            .parse_optional_dynamic_type(&mut state_stream, "pair");
        assert!(res.is_err());
    }
}

#[test]
fn lookups() {
    let (ctx, test) = setup();
    let pair = test.dialect.lookup_type_definition(&ctx, "pair").unwrap();
    assert_eq!(pair.kind_id(), test.pair);
    assert_eq!(pair.dialect(), test.dialect.name());
    assert!(test
        .dialect
        .lookup_type_definition_by_id(&ctx, test.vec)
        .is_some());
    assert!(test
        .dialect
        .lookup_type_definition_by_id(&ctx, test.add)
        .is_none());

    let mut names: Vec<_> = test
        .dialect
        .dynamic_types(&ctx)
        .map(|def| def.name().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["pair", "singleton", "vec"]);

    assert!(test.dialect.lookup_op_definition(&ctx, "const").is_some());
    assert!(test.dialect.lookup_op_definition(&ctx, "pair").is_none());
    assert_eq!(
        ctx.lookup_op("test.const").map(|abs| abs.name.to_string()),
        Some("test.const".to_string())
    );
}

#[test]
#[should_panic(expected = "belongs to dialect a, not b")]
fn type_registered_in_the_wrong_dialect() {
    let mut ctx = Context::new();
    let a = ExtensibleDialect::new(&mut ctx, "a");
    let b = ExtensibleDialect::new(&mut ctx, "b");
    let def = DynamicTypeDefinition::new(&mut ctx, &a, "t", accept_any);
    let _ = b.add_dynamic_type(&mut ctx, def);
}

#[test]
#[should_panic(expected = "does not belong to dialect b")]
fn op_registered_in_the_wrong_dialect() {
    let mut ctx = Context::new();
    let a = ExtensibleDialect::new(&mut ctx, "a");
    let b = ExtensibleDialect::new(&mut ctx, "b");
    let def = DynamicOpDefinition::new(&mut ctx, &a, "o", accept_any_op);
    let _ = b.add_dynamic_op(&mut ctx, def);
}

#[test]
#[should_panic(expected = "must not contain a '.'")]
fn dotted_op_name() {
    let mut ctx = Context::new();
    let a = ExtensibleDialect::new(&mut ctx, "a");
    DynamicOpDefinition::new(&mut ctx, &a, "x.y", accept_any_op);
}

#[test]
#[should_panic(expected = "is not a dynamic type kind")]
fn unchecked_get_of_an_op_kind() {
    let (mut ctx, test) = setup();
    DynamicType::get(&mut ctx, test.add, vec![]);
}
