//! [Identifier]s are strings used to name dialects, types, attributes and operations.

use std::{borrow::Borrow, fmt::Display, ops::Deref};

use combine::{token, Parser};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::{
    common_traits::Verify,
    context::Context,
    impl_printable_for_display,
    parsable::{Parsable, ParseResult, StateStream},
    result::Result,
    verify_err_noloc,
};

#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Debug)]
/// An [Identifier] must satisfy the regex `[a-zA-Z_][a-zA-Z0-9_]*`.
/// Construction does not check this, [Verify] does.
pub struct Identifier(String);

impl_printable_for_display!(Identifier);

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Identifier(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier(value.to_string())
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl Deref for Identifier {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Error)]
#[error("Malformed identifier {0}")]
pub struct MalformedIdentifierErr(pub String);

static IDENTIFIER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("valid identifier regex"));

impl Verify for Identifier {
    fn verify(&self, _ctx: &Context) -> Result<()> {
        if !IDENTIFIER_REGEX.is_match(&self.0) {
            return verify_err_noloc!(MalformedIdentifierErr(self.0.clone()));
        }
        Ok(())
    }
}

impl Parsable for Identifier {
    type Arg = ();
    type Parsed = Identifier;

    fn parse<'a>(
        state_stream: &mut StateStream<'a>,
        _arg: Self::Arg,
    ) -> ParseResult<'a, Self::Parsed> {
        use combine::{many, parser::char};
        let parser = (char::letter().or(token('_')))
            .and(many::<String, _, _>(char::alpha_num().or(char::char('_'))))
            .map(|(c, rest)| c.to_string() + &rest);

        parser
            .map(|str| str.into())
            .parse_stream(state_stream)
            .into()
    }
}
