//! Source location for diagnostics

use std::fmt::Debug;

use combine::stream::position::SourcePosition;

use crate::{
    context::Context,
    printable::{self, Printable},
};

/// Where in the textual IR something was found.
/// Unlike MLIR, [Location] is not extensible and carries no file name:
/// everything is parsed from an in-memory buffer.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub enum Location {
    /// A line / column position in the text being parsed.
    SrcPos { pos: SourcePosition },
    /// Location unknown.
    #[default]
    Unknown,
}

impl Printable for Location {
    fn fmt(
        &self,
        _ctx: &Context,
        _state: &printable::State,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::SrcPos { pos } => write!(f, "{}", pos),
            Self::Unknown => write!(f, "<unknown>"),
        }
    }
}

/// Any object that has an associated location.
pub trait Located {
    fn loc(&self) -> Location;
    fn set_loc(&mut self, loc: Location);
}
