//! Host driven by hand.
//!
//! Requests queue up until something completes them. Used by tests and
//! tooling that need to step through transitions in a chosen order.

use parking_lot::Mutex;

use super::{Completion, HostLoader, HostOutcome, LoadMode, TransitionKind};
use crate::unit::UnitId;

/// A request the host has accepted but not finished.
#[derive(Debug)]
pub struct PendingRequest {
    /// Target unit.
    pub unit: UnitId,
    /// Requested operation.
    pub kind: TransitionKind,
    done: Completion,
}

impl PendingRequest {
    /// Finishes the request with `outcome`.
    pub fn complete(self, outcome: HostOutcome) {
        self.done.complete(outcome);
    }
}

/// A [`HostLoader`] that never completes anything on its own.
#[derive(Debug, Default)]
pub struct ManualHost {
    pending: Mutex<Vec<PendingRequest>>,
    dispatched: Mutex<Vec<(UnitId, TransitionKind)>>,
}

impl ManualHost {
    /// Creates a host with no pending requests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests waiting for completion.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Pending requests in dispatch order.
    #[must_use]
    pub fn pending(&self) -> Vec<(UnitId, TransitionKind)> {
        self.pending.lock().iter().map(|p| (p.unit, p.kind)).collect()
    }

    /// Every request ever received, in dispatch order.
    #[must_use]
    pub fn dispatched(&self) -> Vec<(UnitId, TransitionKind)> {
        self.dispatched.lock().clone()
    }

    /// Removes the oldest pending request for `unit`.
    ///
    /// The caller decides when and how to complete it. The host lock is
    /// released before returning, so completing it may re-enter the host.
    #[must_use]
    pub fn take(&self, unit: UnitId) -> Option<PendingRequest> {
        let mut pending = self.pending.lock();
        let position = pending.iter().position(|p| p.unit == unit)?;
        Some(pending.remove(position))
    }

    /// Completes the oldest pending request for `unit` successfully.
    ///
    /// Returns false if nothing was pending for it.
    pub fn complete(&self, unit: UnitId) -> bool {
        self.finish(unit, HostOutcome::Completed)
    }

    /// Fails the oldest pending request for `unit`.
    pub fn fail(&self, unit: UnitId, reason: &str) -> bool {
        self.finish(unit, HostOutcome::Failed(reason.to_string()))
    }

    /// Completes every pending request in dispatch order, including ones
    /// queued by subscribers while draining. Returns how many completed.
    pub fn complete_all(&self) -> usize {
        let mut count = 0;
        loop {
            let next = {
                let mut pending = self.pending.lock();
                if pending.is_empty() {
                    None
                } else {
                    Some(pending.remove(0))
                }
            };
            match next {
                Some(request) => {
                    request.complete(HostOutcome::Completed);
                    count += 1;
                }
                None => return count,
            }
        }
    }

    fn finish(&self, unit: UnitId, outcome: HostOutcome) -> bool {
        match self.take(unit) {
            Some(request) => {
                request.complete(outcome);
                true
            }
            None => false,
        }
    }

    fn push(&self, unit: UnitId, kind: TransitionKind, done: Completion) {
        self.dispatched.lock().push((unit, kind));
        self.pending.lock().push(PendingRequest { unit, kind, done });
    }
}

impl HostLoader for ManualHost {
    fn request_load(&self, unit: UnitId, mode: LoadMode, done: Completion) {
        self.push(unit, TransitionKind::Load(mode), done);
    }

    fn request_unload(&self, unit: UnitId, done: Completion) {
        self.push(unit, TransitionKind::Unload, done);
    }
}
