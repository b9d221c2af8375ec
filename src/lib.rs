#![forbid(unsafe_code)]
//! Runtime-extensible dialects for an MLIR style intermediate representation.
//!
//! Types and operations belong to [dialect]s. Most are backed by Rust types,
//! but an [ExtensibleDialect](extensible::ExtensibleDialect) also accepts
//! kinds that are described entirely at runtime.

pub mod attribute;
pub mod builtin;
pub mod capability;
pub mod common_traits;
pub mod context;
pub mod dialect;
pub mod extensible;
pub mod identifier;
pub mod irfmt;
pub mod location;
pub mod op;
pub mod operation;
pub mod parsable;
pub mod printable;
pub mod result;
pub mod rewrite;
pub mod storage_uniquer;
pub mod r#type;
