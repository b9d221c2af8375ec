use combine::{
    between, choice,
    parser::char::{spaces, string},
    token, Parser,
};

use crate::{
    common_traits::Verify,
    context::{Context, Ptr},
    impl_type,
    irfmt::parsers::int_parser,
    parsable::{Parsable, ParseResult, StateStream},
    printable::{self, Printable},
    r#type::{get_instance, register_instance, StaticType, TypeObj},
    result::Result,
};

#[derive(Hash, PartialEq, Eq, Clone, Copy, Debug)]
pub enum Signedness {
    Signed,
    Unsigned,
    Signless,
}

/// Fixed width integers, printed `builtin.integer<si32>`.
#[derive(Hash, PartialEq, Eq, Debug)]
pub struct IntegerType {
    width: u32,
    signedness: Signedness,
}
impl_type!(IntegerType, "integer", "builtin");

impl IntegerType {
    /// Get or create a new integer type.
    pub fn get(ctx: &mut Context, width: u32, signedness: Signedness) -> Ptr<TypeObj> {
        register_instance(IntegerType { width, signedness }, ctx)
    }

    /// Get, if it already exists, an integer type.
    pub fn get_existing(ctx: &Context, width: u32, signedness: Signedness) -> Option<Ptr<TypeObj>> {
        get_instance(&IntegerType { width, signedness }, ctx)
    }

    /// Get width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get signedness.
    pub fn signedness(&self) -> Signedness {
        self.signedness
    }
}

impl Parsable for IntegerType {
    type Arg = ();
    type Parsed = Ptr<TypeObj>;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        // Choose b/w si/ui/i ...
        let choicer = choice((
            string("si").map(|_| Signedness::Signed),
            string("ui").map(|_| Signedness::Unsigned),
            string("i").map(|_| Signedness::Signless),
        ));

        // followed by an integer.
        let mut parser = between(
            token('<'),
            token('>'),
            spaces().with(choicer.and(int_parser())).skip(spaces()),
        );
        parser
            .parse_stream(state_stream)
            .map(|(signedness, width)| IntegerType::get(state_stream.state.ctx, width, signedness))
            .into()
    }
}

impl Printable for IntegerType {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match &self.signedness {
            Signedness::Signed => write!(f, "<si{}>", self.width)?,
            Signedness::Unsigned => write!(f, "<ui{}>", self.width)?,
            Signedness::Signless => write!(f, "<i{}>", self.width)?,
        };
        Ok(())
    }
}

impl Verify for IntegerType {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

/// A type with no contents, printed `builtin.unit`.
#[derive(Hash, PartialEq, Eq, Debug)]
pub struct UnitType;
impl_type!(UnitType, "unit", "builtin");

impl UnitType {
    pub fn get(ctx: &mut Context) -> Ptr<TypeObj> {
        register_instance(UnitType, ctx)
    }
}

impl Parsable for UnitType {
    type Arg = ();
    type Parsed = Ptr<TypeObj>;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        Ok((UnitType::get(state_stream.state.ctx), combine::error::Commit::Peek(())))
    }
}

impl Printable for UnitType {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        _f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        Ok(())
    }
}

impl Verify for UnitType {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        Ok(())
    }
}

fn parse_integer_type<'a>(state_stream: &mut StateStream<'a>) -> ParseResult<'a, Ptr<TypeObj>> {
    IntegerType::parse(state_stream, ())
}

fn parse_unit_type<'a>(state_stream: &mut StateStream<'a>) -> ParseResult<'a, Ptr<TypeObj>> {
    UnitType::parse(state_stream, ())
}

pub fn register(ctx: &mut Context) {
    IntegerType::register_type_in_dialect(ctx, parse_integer_type);
    UnitType::register_type_in_dialect(ctx, parse_unit_type);
}

#[cfg(test)]
mod tests {
    use combine::{eof, Parser};
    use expect_test::expect;

    use super::{IntegerType, Signedness, UnitType};
    use crate::{
        builtin,
        context::Context,
        irfmt::parsers::type_parser,
        parsable::{self, state_stream_from_iterator},
        printable::Printable,
    };

    #[test]
    fn test_integer_types() {
        let mut ctx = Context::new();
        builtin::register(&mut ctx);

        let int32_1_ptr = IntegerType::get(&mut ctx, 32, Signedness::Signed);
        let int32_2_ptr = IntegerType::get(&mut ctx, 32, Signedness::Signed);
        let int64_ptr = IntegerType::get(&mut ctx, 64, Signedness::Signed);
        let uint32_ptr = IntegerType::get(&mut ctx, 32, Signedness::Unsigned);

        assert!(int32_1_ptr == int32_2_ptr);
        assert!(int32_1_ptr != int64_ptr);
        assert!(int32_1_ptr != uint32_ptr);
        assert!(IntegerType::get_existing(&ctx, 64, Signedness::Signed) == Some(int64_ptr));
        assert!(IntegerType::get_existing(&ctx, 8, Signedness::Signless).is_none());

        let int64 = int64_ptr.deref(&ctx).downcast_ref::<IntegerType>().unwrap();
        assert!(int64.width() == 64 && int64.signedness() == Signedness::Signed);
    }

    #[test]
    fn test_integer_parsing() {
        let mut ctx = Context::new();
        builtin::register(&mut ctx);

        let state_stream = state_stream_from_iterator(
            "builtin.integer< ui8 >".chars(),
            parsable::State::new(&mut ctx),
        );
        let (ty, _) = type_parser().skip(eof()).parse(state_stream).unwrap();
        assert!(ty == IntegerType::get(&mut ctx, 8, Signedness::Unsigned));
        expect!["builtin.integer<ui8>"].assert_eq(&ty.disp(&ctx).to_string());

        let unit = UnitType::get(&mut ctx);
        expect!["builtin.unit"].assert_eq(&unit.disp(&ctx).to_string());
    }
}
