//! IR objects that can be parsed from their text representation.

use crate::{
    context::Context,
    location::{Located, Location},
    result::{self},
};
use combine::{
    easy,
    error::{Commit, StdParseResult2},
    stream::{
        self, buffered,
        position::{self, SourcePosition},
        IteratorStream,
    },
    Parser, Positioned, StreamOnce,
};

/// State during parsing of any [Parsable] object.
/// Every parser implemented using [Parsable] will be passed
/// a mutable reference (wrapped with [StateStream]) to this state.
pub struct State<'a> {
    pub ctx: &'a mut Context,
}

impl<'a> State<'a> {
    pub fn new(ctx: &'a mut Context) -> Self {
        State { ctx }
    }
}

/// A wrapper around any [char] [Iterator] object.
/// Buffering and positioning are automatically handled hereafter.
pub struct CharIterator<'a>(Box<dyn Iterator<Item = char> + 'a>);

impl<'a> Iterator for CharIterator<'a> {
    type Item = char;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// A [State]ful [Stream](combine::Stream). Every [Parsable::parser] gets this as input,
/// allowing for the parser to have access to a state.
pub type StateStream<'a> = stream::state::Stream<
    buffered::Stream<
        easy::Stream<
            stream::position::Stream<stream::IteratorStream<CharIterator<'a>>, SourcePosition>,
        >,
    >,
    State<'a>,
>;

/// Parse result of a [Parsable] object.
pub type ParseResult<'a, T> = StdParseResult2<T, <StateStream<'a> as StreamOnce>::Error>;

/// Result of a parser that may decline to parse.
/// `Ok((None, _))` means the parser did not recognize the input and
/// consumed nothing, `Ok((Some(t), _))` is a success and `Err` is a
/// parse or verification failure.
pub type OptionalParseResult<'a, T> = ParseResult<'a, Option<T>>;

/// Any object that can be parsed from its [Printable](crate::printable::Printable) text.
///
/// Implement [parse](Parsable::parse) and call [parser](Parsable::parser)
/// to get a parser combinator that can be combined with any other parser
/// from the [combine] library.
/// Example:
/// ```
/// use combine::{Parser, parser::char::digit, many1};
/// use dynir::{context::Context, parsable::
///     { state_stream_from_iterator, StateStream, Parsable, ParseResult, State}
/// };
/// #[derive(PartialEq, Eq)]
/// struct Number { n: u64 }
/// impl Parsable for Number {
///     type Arg = ();
///     type Parsed = Number;
///     fn parse<'a>(
///         state_stream: &mut StateStream<'a>,
///         _arg: Self::Arg,
///     ) -> ParseResult<'a, Self::Parsed> {
///         many1::<String, _, _>(digit())
///         .map(|digits| Number { n: digits.parse::<u64>().unwrap() })
///         .parse_stream(state_stream)
///         .into()
///     }
/// }
/// let mut ctx = Context::new();
/// let state_stream = state_stream_from_iterator("100".chars(), State::new(&mut ctx));
/// assert!(Number::parser(()).parse(state_stream).unwrap().0 == Number { n: 100 });
/// ```
pub trait Parsable {
    /// Type of the argument that must be passed to the parser.
    type Arg: Clone + 'static;
    /// The type of the parsed entity.
    type Parsed;

    /// Define a parser using existing combinators and call
    /// [Parser::parse_stream] to get the final [ParseResult].
    /// Use [state_stream.state](StateStream::state) as necessary.
    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed>;

    /// Get a parser combinator that can work on [StateStream] as its input.
    fn parser<'a>(
        arg: Self::Arg,
    ) -> Box<dyn Parser<StateStream<'a>, Output = Self::Parsed, PartialState = ()> + 'a> {
        combine::parser(move |parsable_state: &mut StateStream<'a>| {
            Self::parse(parsable_state, arg.clone())
        })
        .boxed()
    }
}

impl<'a> Located for StateStream<'a> {
    /// The position of the next token to be read.
    fn loc(&self) -> Location {
        Location::SrcPos {
            pos: self.stream.position(),
        }
    }

    /// Positions come from the input, there is nothing to set.
    fn set_loc(&mut self, _loc: Location) {}
}

/// Build a [StateStream] from an iterator, for use with [Parsable].
pub fn state_stream_from_iterator<'a, T: Iterator<Item = char> + 'a>(
    input: T,
    state: State<'a>,
) -> StateStream<'a> {
    StateStream {
        stream: buffered::Stream::new(
            easy::Stream::from(position::Stream::with_positioner(
                IteratorStream::new(CharIterator(Box::new(input))),
                SourcePosition::default(),
            )),
            100,
        ),
        state,
    }
}

/// Lift a [result::Result] into a [ParseResult], so that errors found while
/// building IR objects surface as committed parse errors at their location.
pub trait IntoParseResult<'a, T> {
    fn into_parse_result(self) -> ParseResult<'a, T>;
}

impl<'a, T> IntoParseResult<'a, T> for result::Result<T> {
    fn into_parse_result(self) -> ParseResult<'a, T> {
        match self {
            Ok(t) => Ok((t, Commit::Peek(()))),
            Err(err) => {
                let pos = match &err.loc {
                    Location::SrcPos { pos } => *pos,
                    Location::Unknown => SourcePosition::default(),
                };
                Err(Commit::Commit(
                    easy::Errors::new(pos, easy::Error::Other(Box::new(err))).into(),
                ))
            }
        }
    }
}
