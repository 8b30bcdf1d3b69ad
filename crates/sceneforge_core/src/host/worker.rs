//! # Worker Host
//!
//! A [`HostLoader`] backed by one dedicated loader thread.
//!
//! ```text
//!   Controller ──┐
//!   Controller ──┼──> [crossbeam channel] ──> [Loader Thread] ──> completion
//!   Controller ──┘        (unbounded)          (single worker)
//! ```
//!
//! Each job sleeps for the configured latency and then completes on the
//! loader thread. Units listed in `failing` complete with a failure instead.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{Completion, HostLoader, LoadMode, TransitionKind};
use crate::error::HostError;
use crate::unit::{UnitId, UnitSet};

/// Configuration for [`WorkerHost`].
#[derive(Clone, Debug)]
pub struct WorkerHostConfig {
    /// Simulated time per load.
    pub load_latency: Duration,
    /// Simulated time per unload.
    pub unload_latency: Duration,
    /// Units whose requests always fail.
    pub failing: UnitSet,
    /// Name of the loader thread.
    pub thread_name: String,
}

impl Default for WorkerHostConfig {
    fn default() -> Self {
        Self {
            load_latency: Duration::from_millis(5),
            unload_latency: Duration::from_millis(2),
            failing: UnitSet::empty(),
            thread_name: "sceneforge-loader".to_string(),
        }
    }
}

struct Job {
    unit: UnitId,
    kind: TransitionKind,
    done: Completion,
}

/// Host that completes requests on its own loader thread.
pub struct WorkerHost {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl WorkerHost {
    /// Starts the loader thread.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Spawn`] if the thread cannot be created.
    pub fn start(config: WorkerHostConfig) -> Result<Self, HostError> {
        let (sender, receiver) = unbounded();
        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run_loader(&receiver, &config))?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    fn submit(&self, job: Job) {
        let Some(sender) = &self.sender else {
            return;
        };
        if let Err(err) = sender.send(job) {
            // Loader thread is gone; the completion drops unfired.
            tracing::warn!(unit = %err.0.unit, "loader thread stopped, request dropped");
        }
    }
}

fn run_loader(receiver: &Receiver<Job>, config: &WorkerHostConfig) {
    tracing::debug!("loader thread started");
    while let Ok(job) = receiver.recv() {
        let latency = match job.kind {
            TransitionKind::Load(_) => config.load_latency,
            TransitionKind::Unload => config.unload_latency,
        };
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        if config.failing.contains(job.unit) {
            job.done.fail(format!("{} rejected by host", job.unit));
        } else {
            job.done.succeed();
        }
    }
    tracing::debug!("loader thread stopped");
}

impl HostLoader for WorkerHost {
    fn request_load(&self, unit: UnitId, mode: LoadMode, done: Completion) {
        self.submit(Job {
            unit,
            kind: TransitionKind::Load(mode),
            done,
        });
    }

    fn request_unload(&self, unit: UnitId, done: Completion) {
        self.submit(Job {
            unit,
            kind: TransitionKind::Unload,
            done,
        });
    }
}

impl Drop for WorkerHost {
    fn drop(&mut self) {
        // Disconnect so the loader drains what is queued and exits.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            // The last handle can be released by a completion running on the
            // loader thread itself.
            if worker.thread().id() == thread::current().id() {
                return;
            }
            if worker.join().is_err() {
                tracing::error!("loader thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for WorkerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHost")
            .field("running", &self.sender.is_some())
            .finish()
    }
}
