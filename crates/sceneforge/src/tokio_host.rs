//! # Tokio Host
//!
//! Simulated asynchronous host: every request becomes one tokio task that
//! sleeps for the configured latency. The completion then runs on the
//! blocking pool, since it takes the controller's transition lock and runs
//! every subscriber inline.
//!
//! The host keeps its own record of held units and honours the exclusive
//! contract: a successful exclusive load drops everything else it holds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sceneforge_core::{Completion, HostLoader, LoadMode, TransitionKind, UnitId, UnitSet};
use tokio::runtime::Handle;

use crate::error::{AppError, AppResult};

/// Configuration for [`TokioHost`].
#[derive(Clone, Debug)]
pub struct TokioHostConfig {
    /// Default time per load.
    pub load_latency: Duration,
    /// Default time per unload.
    pub unload_latency: Duration,
    /// Per-unit load latency overriding the default.
    pub overrides: HashMap<UnitId, Duration>,
    /// Units whose requests always fail.
    pub failing: UnitSet,
}

impl Default for TokioHostConfig {
    fn default() -> Self {
        Self {
            load_latency: Duration::from_millis(50),
            unload_latency: Duration::from_millis(20),
            overrides: HashMap::new(),
            failing: UnitSet::empty(),
        }
    }
}

/// [`HostLoader`] that runs each request as a tokio task.
///
/// Subscribers reached from its completions run on tokio's blocking pool,
/// so they may block briefly but must not call `Handle::block_on`.
#[derive(Debug)]
pub struct TokioHost {
    handle: Handle,
    config: TokioHostConfig,
    held: Arc<Mutex<UnitSet>>,
}

impl TokioHost {
    /// Creates a host spawning onto `handle`.
    #[must_use]
    pub fn new(handle: Handle, config: TokioHostConfig) -> Self {
        Self {
            handle,
            config,
            held: Arc::new(Mutex::new(UnitSet::empty())),
        }
    }

    /// Creates a host on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NoRuntime`] outside a tokio runtime.
    pub fn current(config: TokioHostConfig) -> AppResult<Self> {
        let handle = Handle::try_current().map_err(|_| AppError::NoRuntime)?;
        Ok(Self::new(handle, config))
    }

    /// Units the host currently has loaded.
    #[must_use]
    pub fn held(&self) -> UnitSet {
        *self.held.lock()
    }

    fn spawn(&self, unit: UnitId, kind: TransitionKind, latency: Duration, done: Completion) {
        let fails = self.config.failing.contains(unit);
        let held = Arc::clone(&self.held);
        self.handle.spawn(async move {
            tokio::time::sleep(latency).await;
            let finish = move || {
                if fails {
                    done.fail(format!("{unit} rejected by host"));
                    return;
                }
                {
                    let mut held = held.lock();
                    match kind {
                        TransitionKind::Load(LoadMode::Exclusive) => {
                            let dropped = held.difference(UnitSet::single(unit));
                            if !dropped.is_empty() {
                                tracing::trace!(%unit, ?dropped, "host evicted units");
                            }
                            *held = UnitSet::single(unit);
                        }
                        TransitionKind::Load(LoadMode::Additive) => {
                            held.insert(unit);
                        }
                        TransitionKind::Unload => {
                            held.remove(unit);
                        }
                    }
                }
                done.succeed();
            };
            if let Err(err) = tokio::task::spawn_blocking(finish).await {
                tracing::error!(%unit, %err, "host completion task failed");
            }
        });
    }
}

impl HostLoader for TokioHost {
    fn request_load(&self, unit: UnitId, mode: LoadMode, done: Completion) {
        let latency = self
            .config
            .overrides
            .get(&unit)
            .copied()
            .unwrap_or(self.config.load_latency);
        tracing::trace!(%unit, %mode, ?latency, "host load scheduled");
        self.spawn(unit, TransitionKind::Load(mode), latency, done);
    }

    fn request_unload(&self, unit: UnitId, done: Completion) {
        tracing::trace!(%unit, "host unload scheduled");
        self.spawn(unit, TransitionKind::Unload, self.config.unload_latency, done);
    }
}
