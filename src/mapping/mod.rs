//! Mapping specifications - declare how flat columns land in nested records
//!
//! A mapping string such as `"id, name AS people.name"` lists source columns
//! and the target path each one is written to. Every segment of a path except
//! the last names a list level.

pub mod parser;
pub mod spec;

pub use spec::{MappingEntry, MappingSpec};
