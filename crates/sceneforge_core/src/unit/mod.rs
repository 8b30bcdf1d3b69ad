//! # Unit Identifiers
//!
//! A unit is identified by the position of a single bit. Sets of units are
//! carried as [`UnitSet`], which keeps its integer backing private so the
//! universe can grow without breaking callers.

mod id;
mod set;

pub use id::UnitId;
pub use set::{UnitSet, UnitSetIter};
