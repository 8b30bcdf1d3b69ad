//! # Host Loader Contract
//!
//! The controller never performs I/O. It hands each load and unload to a
//! [`HostLoader`] together with a one-shot [`Completion`] and reacts when
//! that completion fires.
//!
//! ```text
//! Controller ──request_load(unit, mode, done)──▶ Host
//!     ▲                                          │ (any thread, any time)
//!     └────────────── done.complete(outcome) ────┘
//! ```
//!
//! ## Exclusive mode
//!
//! A host honouring [`LoadMode::Exclusive`] tears down every unit it holds as
//! part of that same load. The controller does not send separate unload
//! requests for the units an exclusive load evicts.

mod manual;
mod worker;

use std::fmt;

pub use manual::{ManualHost, PendingRequest};
pub use worker::{WorkerHost, WorkerHostConfig};

use crate::unit::UnitId;

/// How a load treats units that are already active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// Replace everything: the host evicts all loaded units.
    Exclusive,
    /// Load alongside existing units.
    Additive,
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exclusive => f.write_str("exclusive"),
            Self::Additive => f.write_str("additive"),
        }
    }
}

/// Which transition a request or failure refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionKind {
    /// A load in the given mode.
    Load(LoadMode),
    /// An unload.
    Unload,
}

/// What the host reports when a request finishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOutcome {
    /// The unit is fully loaded (or unloaded) from the host's perspective.
    Completed,
    /// The host gave up on the request.
    Failed(String),
}

type CompletionFn = Box<dyn FnOnce(HostOutcome) + Send>;

/// One-shot completion signal for a single host request.
///
/// Consumed by [`Completion::complete`], so it fires at most once. Dropping
/// it unfired leaves the request pending forever.
pub struct Completion {
    unit: UnitId,
    callback: Option<CompletionFn>,
}

impl Completion {
    /// Wraps a callback to run when the request finishes.
    pub fn new<F>(unit: UnitId, callback: F) -> Self
    where
        F: FnOnce(HostOutcome) + Send + 'static,
    {
        Self {
            unit,
            callback: Some(Box::new(callback)),
        }
    }

    /// Unit this completion belongs to.
    #[must_use]
    pub fn unit(&self) -> UnitId {
        self.unit
    }

    /// Signals the outcome.
    pub fn complete(mut self, outcome: HostOutcome) {
        if let Some(callback) = self.callback.take() {
            callback(outcome);
        }
    }

    /// Shorthand for `complete(HostOutcome::Completed)`.
    pub fn succeed(self) {
        self.complete(HostOutcome::Completed);
    }

    /// Shorthand for `complete(HostOutcome::Failed(reason))`.
    pub fn fail(self, reason: impl Into<String>) {
        self.complete(HostOutcome::Failed(reason.into()));
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.callback.is_some() {
            tracing::warn!(unit = %self.unit, "completion dropped without firing; unit stays pending");
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("unit", &self.unit)
            .field("fired", &self.callback.is_none())
            .finish()
    }
}

/// External service performing the actual load and unload work.
///
/// Implementations must return promptly and eventually fire the completion
/// exactly once, from any thread. Firing it synchronously inside the call is
/// allowed.
pub trait HostLoader: Send + Sync {
    /// Begins loading `unit` in `mode`.
    fn request_load(&self, unit: UnitId, mode: LoadMode, done: Completion);

    /// Begins unloading `unit`.
    fn request_unload(&self, unit: UnitId, done: Completion);
}
