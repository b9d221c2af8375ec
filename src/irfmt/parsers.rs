//! Utilities for parsing.

use std::str::FromStr;

use crate::{
    arg_err,
    attribute::AttrObj,
    context::Ptr,
    identifier::Identifier,
    location::{Located, Location},
    parsable::{IntoParseResult, Parsable, ParseResult, StateStream},
    r#type::TypeObj,
    result::Result,
};
use combine::{
    any, between, many, many1, none_of, optional,
    parser::char::{digit, hex_digit, spaces},
    sep_by, token, Parser, Stream,
};

/// Parse from `parser`, ignoring whitespace(s) before and after.
/// > **Warning**: Do not use this inside inside repeating combiners, such as [combine::many].
/// >   After successfully parsing one instance, if spaces are consumed to parse
/// >   the next one, but the next one doesn't exist, it is treated as a failure
/// >   that consumed some input. Use [list_parser] for lists instead.
pub fn spaced<Input: Stream<Token = char>, Output>(
    parser: impl Parser<Input, Output = Output>,
) -> impl Parser<Input, Output = Output> {
    combine::between(spaces(), spaces(), parser)
}

/// A parser that returns the current [Location] and does nothing else
pub fn location<'a>() -> Box<dyn Parser<StateStream<'a>, Output = Location, PartialState = ()> + 'a>
{
    combine::parser(|parsable_state: &mut StateStream<'a>| {
        combine::ParseResult::PeekOk(parsable_state.loc()).into()
    })
    .boxed()
}

/// A parser combinator to parse a qualified type name followed by the type's contents.
pub fn type_parser<'a>(
) -> Box<dyn Parser<StateStream<'a>, Output = Ptr<TypeObj>, PartialState = ()> + 'a> {
    Ptr::<TypeObj>::parser(())
}

/// A parser combinator to parse a qualified attribute name followed by the attribute's contents.
pub fn attr_parser<'a>(
) -> Box<dyn Parser<StateStream<'a>, Output = AttrObj, PartialState = ()> + 'a> {
    AttrObj::parser(())
}

/// A parser to parse any Rust integer type, with an optional leading `-`.
pub fn int_parse<'a, IntT>(state_stream: &mut StateStream<'a>, _arg: ()) -> ParseResult<'a, IntT>
where
    IntT: FromStr,
    IntT::Err: std::error::Error + Send + Sync + 'static,
{
    optional(token('-'))
        .and(many1::<String, _, _>(digit()))
        .map(|(sign, digits)| match sign {
            Some(_) => format!("-{digits}"),
            None => digits,
        })
        .and_then(|digits| digits.parse::<IntT>())
        .parse_stream(state_stream)
        .into()
}

/// Get a parser combinator that can parse any Rust integer type.
pub fn int_parser<'a, IntT>(
) -> Box<dyn Parser<StateStream<'a>, Output = IntT, PartialState = ()> + 'a>
where
    IntT: FromStr + 'a,
    IntT::Err: std::error::Error + Send + Sync + 'static,
{
    combine::parser(move |parsable_state: &mut StateStream<'a>| int_parse(parsable_state, ()))
        .boxed()
}

/// Parse the `{hex}` part of a `\u{hex}` escape.
fn unicode_escape_parse<'a>(
    state_stream: &mut StateStream<'a>,
    loc: Location,
) -> ParseResult<'a, char> {
    let (digits, commit) = between(token('{'), token('}'), many1::<String, _, _>(hex_digit()))
        .parse_stream(state_stream)
        .into_result()?;
    let code_point = u32::from_str_radix(&digits, 16).ok();
    let res: Result<char> = match code_point.and_then(char::from_u32) {
        Some(c) => Ok(c),
        None => arg_err!(loc, "Invalid unicode escape \\u{{{}}}", digits),
    };
    res.into_parse_result().map(|(c, _)| (c, commit))
}

/// Parse a quoted string, which is a double-quoted string that may contain escaped characters.
/// The escapes are those written by [quoted](crate::irfmt::printers::quoted):
/// `\\`, `\"`, `\'`, `\n`, `\t`, `\r`, `\0` and `\u{hex}`.
pub fn quoted_string_parse<'a>(
    state_stream: &mut StateStream<'a>,
    _arg: (),
) -> ParseResult<'a, String> {
    // An escaped charater is one that is preceded by a backslash.
    let escaped_char = combine::parser(move |parsable_state: &mut StateStream<'a>| {
        let loc = parsable_state.loc();
        let mut escaped_char = token('\\').with(any()).then(move |c: char| {
            let loc = loc.clone();
            combine::parser(move |parsable_state: &mut StateStream<'a>| {
                let result = match c {
                    '\\' => Ok('\\'),
                    '\"' => Ok('\"'),
                    '\'' => Ok('\''),
                    'n' => Ok('\n'),
                    't' => Ok('\t'),
                    'r' => Ok('\r'),
                    '0' => Ok('\0'),
                    'u' => return unicode_escape_parse(parsable_state, loc.clone()),
                    _ => arg_err!(loc.clone(), "Unexpected escaped character \\{}", c),
                };
                result.into_parse_result()
            })
        });
        escaped_char.parse_stream(parsable_state).into()
    });

    let quoted_string = between(
        token('"'),
        token('"'),
        many(escaped_char.or(none_of("\"".chars()))),
    );

    quoted_string
        .map(|chars: Vec<char>| chars.into_iter().collect::<String>())
        .parse_stream(state_stream)
        .into()
}

/// A parser combinator to parse a quoted string, which is a double-quoted string that may contain escaped characters.
pub fn quoted_string_parser<'a>(
) -> Box<dyn Parser<StateStream<'a>, Output = String, PartialState = ()> + 'a> {
    combine::parser(move |parsable_state: &mut StateStream<'a>| {
        quoted_string_parse(parsable_state, ())
    })
    .boxed()
}

/// Parse an SSA name such as `%x`.
pub fn ssa_name_parser<'a>(
) -> Box<dyn Parser<StateStream<'a>, Output = Identifier, PartialState = ()> + 'a> {
    combine::parser(|parsable_state: &mut StateStream<'a>| {
        token('%')
            .with(Identifier::parser(()))
            .parse_stream(parsable_state)
            .into_result()
    })
    .boxed()
}

/// Parse a delimitted list of objects.
pub fn delimited_list_parser<Input: Stream<Token = char>, Output>(
    open: char,
    close: char,
    sep: char,
    parser: impl Parser<Input, Output = Output>,
) -> impl Parser<Input, Output = Vec<Output>> {
    between(token(open), token(close), list_parser(sep, parser))
}

/// Parse a list of objects.
pub fn list_parser<Input: Stream<Token = char>, Output>(
    sep: char,
    parser: impl Parser<Input, Output = Output>,
) -> impl Parser<Input, Output = Vec<Output>> {
    spaces().with(sep_by::<Vec<_>, _, _, _>(
        parser.skip(spaces()),
        token(sep).skip(spaces()),
    ))
}
