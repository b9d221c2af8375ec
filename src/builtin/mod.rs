//! Builtin dialect: [Type](crate::type::Type)s and [Attribute](crate::attribute::Attribute)s
//! that every context has use for.

pub mod attributes;
pub mod types;

use crate::{
    context::Context,
    dialect::{Dialect, DialectName},
};

pub fn register(ctx: &mut Context) {
    let dialect = Dialect::new(DialectName::new("builtin"));
    dialect.register(ctx);
    types::register(ctx);
    attributes::register(ctx);
}
