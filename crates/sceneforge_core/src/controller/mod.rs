//! # Unit Lifecycle Controller
//!
//! Tracks which units are active and which are in flight, dispatches work to
//! the [`HostLoader`], and raises lifecycle events around each transition.
//!
//! ## Per-unit states
//!
//! ```text
//!   Idle ──request──▶ Loading ──host completion──▶ Active
//!    ▲                                               │
//!    └──────────── unload + host completion ─────────┘
//! ```
//!
//! An exclusive load also moves every other active unit straight to Idle at
//! the instant the new unit becomes Active.
//!
//! ## Event order
//!
//! | Request           | At request time                          | At completion                       |
//! |-------------------|------------------------------------------|-------------------------------------|
//! | `load_exclusive`  | `before_unload(u)` per active u, `before_load` | `after_unload(u)` per evicted u, `after_load` |
//! | `load_additive`   | `before_load`                            | `after_load`                        |
//! | `unload`          | `before_unload`                          | `after_unload`                      |
//!
//! Host failures replace the completion-time events with one `failed` event.
//!
//! For an exclusive load the masks move between the announcements: the new
//! unit enters `loading` after the `before_unload` round, and `active`
//! becomes `{unit}` after the `after_unload` round. Eviction subscribers
//! therefore still see the outgoing units active and the new unit idle (at
//! request time) or loading (at completion).
//!
//! ## Concurrency
//!
//! Every request and every completion runs as one turn under a re-entrant
//! transition lock: guard, mask update, then events. Masks sit behind their
//! own lock which is never held while a subscriber runs, so subscribers on
//! the same thread may query the controller or issue further requests.

mod builder;
mod state;

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

pub use builder::ControllerBuilder;
pub use state::ControllerSnapshot;

use state::{LoadApplied, Masks, UnloadApplied};

use crate::catalog::UnitCatalog;
use crate::error::{ControllerError, ControllerResult};
use crate::host::{Completion, HostLoader, HostOutcome, LoadMode, TransitionKind};
use crate::notify::{LifecycleEvents, TransitionFailure};
use crate::unit::{UnitId, UnitSet};

struct Shared {
    catalog: UnitCatalog,
    host: Arc<dyn HostLoader>,
    transition: ReentrantMutex<()>,
    masks: Mutex<Masks>,
    events: LifecycleEvents,
}

/// Handle to the lifecycle controller.
///
/// Cloning is cheap; all clones drive the same state. The composition root
/// creates one and hands clones to whoever needs it.
#[derive(Clone)]
pub struct UnitController {
    shared: Arc<Shared>,
}

impl UnitController {
    /// Starts building a controller over `catalog`.
    #[must_use]
    pub fn builder(catalog: UnitCatalog) -> ControllerBuilder {
        ControllerBuilder::new(catalog)
    }

    fn assemble<H: HostLoader + 'static>(catalog: UnitCatalog, host: Arc<H>, seed: UnitSet) -> Self {
        let host: Arc<dyn HostLoader> = host;
        Self {
            shared: Arc::new(Shared {
                catalog,
                host,
                transition: ReentrantMutex::new(()),
                masks: Mutex::new(Masks::seeded(seed)),
                events: LifecycleEvents::new(),
            }),
        }
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Loads `unit`, replacing every active unit once the load completes.
    ///
    /// A no-op if `unit` is already active or loading.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidIdentifier`] if `unit` is not in the catalog.
    pub fn load_exclusive(&self, unit: UnitId) -> ControllerResult<()> {
        Shared::load(&self.shared, unit, LoadMode::Exclusive)
    }

    /// Loads `unit` alongside the active units.
    ///
    /// A no-op if `unit` is already active or loading.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidIdentifier`] if `unit` is not in the catalog.
    pub fn load_additive(&self, unit: UnitId) -> ControllerResult<()> {
        Shared::load(&self.shared, unit, LoadMode::Additive)
    }

    /// Unloads `unit`. A no-op if it is not active.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidIdentifier`] if `unit` is not in the catalog.
    pub fn unload(&self, unit: UnitId) -> ControllerResult<()> {
        Shared::unload(&self.shared, unit)
    }

    /// [`load_exclusive`](Self::load_exclusive) by catalog name.
    ///
    /// # Errors
    ///
    /// [`ControllerError::UnknownUnitName`] if no unit has this name.
    pub fn load_exclusive_named(&self, name: &str) -> ControllerResult<()> {
        self.load_exclusive(self.resolve(name)?)
    }

    /// [`load_additive`](Self::load_additive) by catalog name.
    ///
    /// # Errors
    ///
    /// [`ControllerError::UnknownUnitName`] if no unit has this name.
    pub fn load_additive_named(&self, name: &str) -> ControllerResult<()> {
        self.load_additive(self.resolve(name)?)
    }

    /// [`unload`](Self::unload) by catalog name.
    ///
    /// # Errors
    ///
    /// [`ControllerError::UnknownUnitName`] if no unit has this name.
    pub fn unload_named(&self, name: &str) -> ControllerResult<()> {
        self.unload(self.resolve(name)?)
    }

    fn resolve(&self, name: &str) -> ControllerResult<UnitId> {
        self.shared
            .catalog
            .id_of(name)
            .ok_or_else(|| ControllerError::UnknownUnitName(name.to_string()))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns true if `unit` is loaded and live.
    #[must_use]
    pub fn is_active(&self, unit: UnitId) -> bool {
        self.shared.masks.lock().is_active(unit)
    }

    /// Returns true if a load for `unit` is in flight.
    #[must_use]
    pub fn is_loading(&self, unit: UnitId) -> bool {
        self.shared.masks.lock().is_loading(unit)
    }

    /// Active units in ascending order, as of this call.
    #[must_use]
    pub fn active_units(&self) -> Vec<UnitId> {
        self.snapshot().active.iter().collect()
    }

    /// Units with a load in flight, in ascending order.
    #[must_use]
    pub fn loading_units(&self) -> Vec<UnitId> {
        self.snapshot().loading.iter().collect()
    }

    /// Both masks, read together.
    #[must_use]
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.shared.masks.lock().snapshot()
    }

    /// The configured universe.
    #[must_use]
    pub fn catalog(&self) -> &UnitCatalog {
        &self.shared.catalog
    }

    /// Notification channels. Subscribe and unsubscribe through these.
    #[must_use]
    pub fn events(&self) -> &LifecycleEvents {
        &self.shared.events
    }
}

impl fmt::Debug for UnitController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("UnitController")
            .field("active", &snapshot.active)
            .field("loading", &snapshot.loading)
            .finish_non_exhaustive()
    }
}

impl Shared {
    fn validate(&self, unit: UnitId) -> ControllerResult<()> {
        if self.catalog.contains(unit) {
            Ok(())
        } else {
            Err(ControllerError::InvalidIdentifier(unit))
        }
    }

    fn load(this: &Arc<Self>, unit: UnitId, mode: LoadMode) -> ControllerResult<()> {
        this.validate(unit)?;
        let _turn = this.transition.lock();

        let claimed = this.masks.lock().begin_load(unit, mode);
        let Some(evicting) = claimed else {
            tracing::debug!(unit = %this.catalog.label(unit), %mode, "load ignored: already active or loading");
            return Ok(());
        };

        evicting.for_each(|u| {
            this.events.before_unload.emit(&u);
        });
        if mode == LoadMode::Exclusive {
            this.masks.lock().mark_loading(unit);
        }
        this.events.before_load.emit(&unit);

        tracing::debug!(unit = %this.catalog.label(unit), %mode, "dispatching load");
        let done = Self::completion(this, unit, TransitionKind::Load(mode));
        this.host.request_load(unit, mode, done);
        Ok(())
    }

    fn unload(this: &Arc<Self>, unit: UnitId) -> ControllerResult<()> {
        this.validate(unit)?;
        let _turn = this.transition.lock();

        let allowed = this.masks.lock().begin_unload(unit);
        if !allowed {
            tracing::debug!(unit = %this.catalog.label(unit), "unload ignored: not active");
            return Ok(());
        }

        this.events.before_unload.emit(&unit);

        tracing::debug!(unit = %this.catalog.label(unit), "dispatching unload");
        let done = Self::completion(this, unit, TransitionKind::Unload);
        this.host.request_unload(unit, done);
        Ok(())
    }

    fn completion(this: &Arc<Self>, unit: UnitId, kind: TransitionKind) -> Completion {
        let weak: Weak<Self> = Arc::downgrade(this);
        Completion::new(unit, move |outcome| match weak.upgrade() {
            Some(shared) => match kind {
                TransitionKind::Load(mode) => shared.finish_load(unit, mode, outcome),
                TransitionKind::Unload => shared.finish_unload(unit, outcome),
            },
            None => tracing::debug!(%unit, "controller dropped before completion"),
        })
    }

    fn finish_load(&self, unit: UnitId, mode: LoadMode, outcome: HostOutcome) {
        let _turn = self.transition.lock();

        let applied = self.masks.lock().complete_load(unit, mode, outcome);
        match applied {
            LoadApplied::Activated => {
                self.events.after_load.emit(&unit);
                tracing::info!(unit = %self.catalog.label(unit), %mode, "unit loaded");
            }
            LoadApplied::Evicting { evicted } => {
                evicted.for_each(|u| {
                    self.events.after_unload.emit(&u);
                });
                // Units activated by subscribers during the announcements
                // above are evicted too.
                let removed = self.masks.lock().activate_exclusive(unit);
                removed.difference(evicted).for_each(|u| {
                    self.events.after_unload.emit(&u);
                });
                self.events.after_load.emit(&unit);
                tracing::info!(unit = %self.catalog.label(unit), %mode, evicted = removed.len(), "unit loaded");
            }
            LoadApplied::Failed { reason } => {
                tracing::warn!(unit = %self.catalog.label(unit), %mode, %reason, "host failed to load unit");
                self.events.failed.emit(&TransitionFailure {
                    unit,
                    kind: TransitionKind::Load(mode),
                    reason,
                });
            }
            LoadApplied::Stale => {
                tracing::warn!(unit = %self.catalog.label(unit), "load completion for a unit not in flight");
            }
        }
    }

    fn finish_unload(&self, unit: UnitId, outcome: HostOutcome) {
        let _turn = self.transition.lock();

        let applied = self.masks.lock().complete_unload(unit, outcome);
        match applied {
            UnloadApplied::Removed => {
                self.events.after_unload.emit(&unit);
                tracing::info!(unit = %self.catalog.label(unit), "unit unloaded");
            }
            UnloadApplied::Failed { reason } => {
                tracing::warn!(unit = %self.catalog.label(unit), %reason, "host failed to unload unit");
                self.events.failed.emit(&TransitionFailure {
                    unit,
                    kind: TransitionKind::Unload,
                    reason,
                });
            }
            UnloadApplied::Stale => {
                tracing::debug!(unit = %self.catalog.label(unit), "unload completed after eviction");
            }
        }
    }
}
