//! Core data model for spawn-ledger: stats, value vectors, the resource
//! class taxonomy contract, and galaxy keys.
//!
//! Everything in this crate is pure in-memory data with synchronous
//! validation — no I/O, no clocks. The identity layer, matcher, and sync
//! protocol are built on top of these types.

pub mod class;
pub mod error;
pub mod galaxy;
pub mod stat;
pub mod values;

pub use class::{ClassRegistry, ResourceClass};
pub use error::{StatParseError, StatParseReport, ValidationError};
pub use galaxy::Galaxy;
pub use stat::{STAT_COUNT, Stat, StatAbbrevError};
pub use values::{MAX_STAT_VALUE, ResourceFilter, ResourceStats, StatVector, WeightVector};
