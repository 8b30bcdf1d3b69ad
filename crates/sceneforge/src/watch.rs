//! # Transition Watcher
//!
//! Bridges the synchronous lifecycle channels into an async stream so tasks
//! can `await` a unit reaching a state.
//!
//! ```text
//! Controller ──after_load / after_unload / failed──▶ mpsc ──▶ watcher.next().await
//! ```

use std::time::Duration;

use sceneforge_core::{SubscriptionId, TransitionKind, UnitController, UnitId};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use crate::error::{AppError, AppResult};

/// A finished transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The unit became active.
    Loaded(UnitId),
    /// The unit stopped being active.
    Unloaded(UnitId),
    /// The host failed the transition.
    Failed(UnitId, TransitionKind),
}

/// Async view of a controller's completion-time events.
///
/// Unsubscribes from the controller when dropped.
pub struct TransitionWatcher {
    controller: UnitController,
    receiver: UnboundedReceiver<Transition>,
    loaded: SubscriptionId,
    unloaded: SubscriptionId,
    failed: SubscriptionId,
}

impl TransitionWatcher {
    /// Subscribes to `controller`.
    #[must_use]
    pub fn attach(controller: &UnitController) -> Self {
        let (sender, receiver) = unbounded_channel();
        let events = controller.events();

        let tx = sender.clone();
        let loaded = events.after_load.subscribe(move |u: &UnitId| {
            let _ = tx.send(Transition::Loaded(*u));
        });
        let tx = sender.clone();
        let unloaded = events.after_unload.subscribe(move |u: &UnitId| {
            let _ = tx.send(Transition::Unloaded(*u));
        });
        let failed = events.failed.subscribe(move |f| {
            let _ = sender.send(Transition::Failed(f.unit, f.kind));
        });

        Self {
            controller: controller.clone(),
            receiver,
            loaded,
            unloaded,
            failed,
        }
    }

    /// Waits for the next transition.
    pub async fn next(&mut self) -> Option<Transition> {
        self.receiver.recv().await
    }

    /// Returns every transition already received.
    pub fn drain(&mut self) -> Vec<Transition> {
        let mut out = Vec::new();
        while let Ok(t) = self.receiver.try_recv() {
            out.push(t);
        }
        out
    }

    /// Waits until `expected` arrives, discarding anything before it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Timeout`] if it does not arrive within `timeout`.
    pub async fn wait_for(&mut self, expected: Transition, timeout: Duration) -> AppResult<()> {
        let wait = async {
            while let Some(t) = self.receiver.recv().await {
                if t == expected {
                    return true;
                }
            }
            false
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(true) => Ok(()),
            _ => Err(AppError::Timeout(format!("{expected:?}"))),
        }
    }
}

impl Drop for TransitionWatcher {
    fn drop(&mut self) {
        let events = self.controller.events();
        events.after_load.unsubscribe(self.loaded);
        events.after_unload.unsubscribe(self.unloaded);
        events.failed.unsubscribe(self.failed);
    }
}

impl std::fmt::Debug for TransitionWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionWatcher").finish_non_exhaustive()
    }
}
