//! # Notification Channels
//!
//! Ordered, synchronous broadcast of lifecycle events.
//!
//! ## Rules
//!
//! 1. Subscribers run in subscription order on the emitting thread.
//! 2. A panicking subscriber is logged and skipped; the rest still run.
//! 3. The subscriber list is snapshotted before dispatch, so a subscriber may
//!    subscribe, unsubscribe, or issue new requests from inside its callback.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::host::TransitionKind;
use crate::unit::UnitId;

/// Handle identifying one subscription on one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Outcome of a single broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Subscribers that returned normally.
    pub delivered: usize,
    /// Subscribers that panicked.
    pub failed: usize,
}

/// Multi-subscriber broadcast channel.
pub struct Channel<T> {
    name: &'static str,
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber<T>)>>,
}

impl<T> Channel<T> {
    /// Creates an empty channel. `name` only shows up in logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(0),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Channel name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registers a subscriber at the end of the dispatch order.
    pub fn subscribe<F>(&self, subscriber: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(subscriber)));
        id
    }

    /// Removes a subscriber. Returns false if it was not registered here.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Delivers `event` to every subscriber in order.
    pub fn emit(&self, event: &T) -> EmitReport {
        let snapshot: Vec<Subscriber<T>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, s)| Arc::clone(s))
            .collect();

        let mut report = EmitReport::default();
        for (position, subscriber) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| subscriber(event))) {
                Ok(()) => report.delivered += 1,
                Err(payload) => {
                    report.failed += 1;
                    tracing::error!(
                        channel = self.name,
                        position,
                        "subscriber panicked: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        report
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

/// Payload of the `failed` channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionFailure {
    /// Unit whose transition failed.
    pub unit: UnitId,
    /// What was being attempted.
    pub kind: TransitionKind,
    /// Reason reported by the host.
    pub reason: String,
}

/// The channels a controller raises.
#[derive(Debug)]
pub struct LifecycleEvents {
    /// A load was dispatched for the unit.
    pub before_load: Channel<UnitId>,
    /// The unit finished loading and is active.
    pub after_load: Channel<UnitId>,
    /// The unit is about to be unloaded or evicted.
    pub before_unload: Channel<UnitId>,
    /// The unit is no longer active.
    pub after_unload: Channel<UnitId>,
    /// The host reported a failed load or unload.
    pub failed: Channel<TransitionFailure>,
}

impl LifecycleEvents {
    /// Creates the channel bundle with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            before_load: Channel::new("before_load"),
            after_load: Channel::new("after_load"),
            before_unload: Channel::new("before_unload"),
            after_unload: Channel::new("after_unload"),
            failed: Channel::new("failed"),
        }
    }
}

impl Default for LifecycleEvents {
    fn default() -> Self {
        Self::new()
    }
}
