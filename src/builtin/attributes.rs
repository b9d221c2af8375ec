use combine::{
    between, choice,
    parser::char::{spaces, string},
    token, Parser,
};

use crate::{
    attribute::{parse_boxed_attr, AttrObj, Attribute},
    common_traits::Verify,
    context::{Context, Ptr},
    impl_attr,
    irfmt::{
        parsers::{int_parser, quoted_string_parser, type_parser},
        printers::quoted,
    },
    parsable::{Parsable, ParseResult, StateStream},
    printable::{self, Printable},
    r#type::TypeObj,
    result::Result,
};

/// An attribute containing a string, printed `builtin.string<"text">`.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct StringAttr(String);
impl_attr!(StringAttr, "string", "builtin");

impl StringAttr {
    /// Create a new [StringAttr].
    pub fn new(value: &str) -> Self {
        StringAttr(value.to_string())
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<StringAttr> for String {
    fn from(value: StringAttr) -> Self {
        value.0
    }
}

impl Printable for StringAttr {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "<{}>", quoted(&self.0).print(ctx, state))
    }
}

impl Parsable for StringAttr {
    type Arg = ();
    type Parsed = Self;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        between(token('<'), token('>'), spaced_contents(quoted_string_parser()))
            .map(StringAttr)
            .parse_stream(state_stream)
            .into()
    }
}

/// An attribute containing a signed 64 bit integer, printed `builtin.int<-3>`.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct IntegerAttr(i64);
impl_attr!(IntegerAttr, "int", "builtin");

impl IntegerAttr {
    pub fn new(value: i64) -> Self {
        IntegerAttr(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl Printable for IntegerAttr {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl Parsable for IntegerAttr {
    type Arg = ();
    type Parsed = Self;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        between(token('<'), token('>'), spaced_contents(int_parser::<i64>()))
            .map(IntegerAttr)
            .parse_stream(state_stream)
            .into()
    }
}

/// A boolean attribute, printed `builtin.bool<true>`.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct BoolAttr(bool);
impl_attr!(BoolAttr, "bool", "builtin");

impl BoolAttr {
    pub fn new(value: bool) -> Self {
        BoolAttr(value)
    }

    pub fn value(&self) -> bool {
        self.0
    }
}

impl Printable for BoolAttr {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "<{}>", self.0)
    }
}

impl Parsable for BoolAttr {
    type Arg = ();
    type Parsed = Self;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        let value = choice((
            string("true").map(|_| true),
            string("false").map(|_| false),
        ));
        between(token('<'), token('>'), spaced_contents(value))
            .map(BoolAttr)
            .parse_stream(state_stream)
            .into()
    }
}

/// An attribute holding a type, printed `builtin.type<TYPE>`.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct TypeAttr(Ptr<TypeObj>);
impl_attr!(TypeAttr, "type", "builtin");

impl TypeAttr {
    pub fn new(ty: Ptr<TypeObj>) -> Self {
        TypeAttr(ty)
    }

    pub fn get_type(&self) -> Ptr<TypeObj> {
        self.0
    }
}

impl Printable for TypeAttr {
    fn fmt(
        &self,
        ctx: &Context,
        state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(f, "<{}>", self.0.print(ctx, state))
    }
}

impl Parsable for TypeAttr {
    type Arg = ();
    type Parsed = Self;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        between(token('<'), token('>'), spaced_contents(type_parser()))
            .map(TypeAttr)
            .parse_stream(state_stream)
            .into()
    }
}

/// An attribute with no contents, printed `builtin.unit`.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct UnitAttr;
impl_attr!(UnitAttr, "unit", "builtin");

impl Printable for UnitAttr {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        _f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        Ok(())
    }
}

impl Parsable for UnitAttr {
    type Arg = ();
    type Parsed = Self;

    fn parse<'a>(
        _state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        Ok((UnitAttr, combine::error::Commit::Peek(())))
    }
}

macro_rules! verify_succ {
    ($($attr: ident),*) => {
        $(
            impl Verify for $attr {
                fn verify(&self, _ctx: &Context) -> Result<()> {
                    Ok(())
                }
            }
        )*
    };
}
verify_succ!(StringAttr, IntegerAttr, BoolAttr, TypeAttr, UnitAttr);

fn spaced_contents<'a, O>(
    parser: impl Parser<StateStream<'a>, Output = O>,
) -> impl Parser<StateStream<'a>, Output = O> {
    spaces().with(parser).skip(spaces())
}

macro_rules! into_attr_obj {
    ($($attr: ident),*) => {
        $(
            impl From<$attr> for AttrObj {
                fn from(value: $attr) -> Self {
                    Box::new(value)
                }
            }
        )*
    };
}
into_attr_obj!(StringAttr, IntegerAttr, BoolAttr, TypeAttr, UnitAttr);

pub fn register(ctx: &mut Context) {
    StringAttr::register_attr_in_dialect(ctx, parse_boxed_attr::<StringAttr>);
    IntegerAttr::register_attr_in_dialect(ctx, parse_boxed_attr::<IntegerAttr>);
    BoolAttr::register_attr_in_dialect(ctx, parse_boxed_attr::<BoolAttr>);
    TypeAttr::register_attr_in_dialect(ctx, parse_boxed_attr::<TypeAttr>);
    UnitAttr::register_attr_in_dialect(ctx, parse_boxed_attr::<UnitAttr>);
}
