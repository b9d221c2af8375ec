//! IR printing and parsing utilities

pub mod parsers;
pub mod printers;
