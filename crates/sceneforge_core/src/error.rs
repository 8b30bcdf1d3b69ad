//! # Error Types
//!
//! Errors surfaced synchronously by the lifecycle core. Redundant requests
//! are not errors and never appear here; host failures travel through the
//! notification channels instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::unit::UnitId;

/// Errors returned by controller requests and construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// The identifier is not part of the configured catalog.
    #[error("invalid identifier: {0} is not in the catalog")]
    InvalidIdentifier(UnitId),

    /// No unit with this name exists in the catalog.
    #[error("unknown unit name: {0:?}")]
    UnknownUnitName(String),
}

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Errors raised while building or loading a [`UnitCatalog`](crate::UnitCatalog).
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A bit position does not fit in a unit set.
    #[error("unit {name:?}: bit {bit} out of range (max {max})")]
    BitOutOfRange {
        /// Offending unit name.
        name: String,
        /// Requested bit position.
        bit: u32,
        /// Largest accepted bit position.
        max: u32,
    },

    /// Two entries share a name.
    #[error("duplicate unit name: {0:?}")]
    DuplicateName(String),

    /// Two entries share a bit position.
    #[error("bit {bit} assigned to both {first:?} and {second:?}")]
    DuplicateBit {
        /// Shared bit position.
        bit: u32,
        /// Name registered first.
        first: String,
        /// Name that collided.
        second: String,
    },

    /// An entry has an empty name.
    #[error("unit at bit {0} has an empty name")]
    EmptyName(u32),

    /// The catalog text is not valid TOML for the expected schema.
    #[error("invalid catalog: {0}")]
    Parse(#[from] toml::de::Error),

    /// The catalog file could not be read.
    #[error("cannot read catalog {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised when starting a reference host.
#[derive(Error, Debug)]
pub enum HostError {
    /// The loader thread could not be spawned.
    #[error("failed to spawn loader thread: {0}")]
    Spawn(#[from] std::io::Error),
}
