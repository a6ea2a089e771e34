//! Row nesting - materialize sorted flat rows into nested records
//!
//! This module turns the rows of a denormalized join back into a tree in a
//! single forward pass. Each row is compared with the last materialized
//! record; the shallowest changed depth decides where the new record goes.
//!
//! ## Memory
//!
//! Use `Collector` to get the whole tree back, or `GroupEmitter` to receive
//! each top-level group as soon as the next one starts. With the emitter,
//! nothing about a finished group is kept: the order check only covers
//! groups inside the open top-level group, so a top-level group that
//! reappears later is emitted again instead of being reported.

pub mod engine;
pub mod sink;
pub mod types;
pub mod writer;

pub use engine::Nester;
pub use sink::{Collector, GroupEmitter, GroupSink};
pub use types::{NestConfig, NestStats, Record, RecordExt, Row};
pub use writer::RecordWriter;
