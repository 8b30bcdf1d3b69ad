//! Mask bookkeeping.
//!
//! Pure state transitions with no callbacks. Every method leaves
//! `active ∩ loading = ∅`.

use crate::host::{HostOutcome, LoadMode};
use crate::unit::{UnitId, UnitSet};

/// Point-in-time copy of the controller masks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerSnapshot {
    /// Units loaded and live.
    pub active: UnitSet,
    /// Units with a load in flight.
    pub loading: UnitSet,
}

/// Result of applying a load completion.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LoadApplied {
    /// Additive load finished; the unit is active.
    Activated,
    /// Exclusive load finished. Masks are untouched until
    /// [`Masks::activate_exclusive`] runs; `evicted` is the active set to
    /// announce first.
    Evicting { evicted: UnitSet },
    /// The unit left `loading` without becoming active.
    Failed { reason: String },
    /// The unit was not in flight; nothing changed.
    Stale,
}

/// Result of applying an unload completion.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum UnloadApplied {
    /// The unit left `active`.
    Removed,
    /// The host failed; the unit stays active.
    Failed { reason: String },
    /// The unit was no longer active (evicted meanwhile); nothing changed.
    Stale,
}

#[derive(Debug, Default)]
pub(crate) struct Masks {
    active: UnitSet,
    loading: UnitSet,
    /// Exclusive loads between the guard and `mark_loading`. Guarded against
    /// but never reported.
    claimed: UnitSet,
}

impl Masks {
    pub(crate) fn seeded(active: UnitSet) -> Self {
        Self {
            active,
            ..Self::default()
        }
    }

    pub(crate) fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            active: self.active,
            loading: self.loading,
        }
    }

    pub(crate) fn is_active(&self, unit: UnitId) -> bool {
        self.active.contains(unit)
    }

    pub(crate) fn is_loading(&self, unit: UnitId) -> bool {
        self.loading.contains(unit)
    }

    /// Claims `unit` for loading.
    ///
    /// Returns `None` if it is already active, in flight or claimed.
    /// Additive loads enter `loading` immediately and return an empty set.
    /// Exclusive loads only reserve the unit and return the active units to
    /// announce before [`mark_loading`](Self::mark_loading).
    pub(crate) fn begin_load(&mut self, unit: UnitId, mode: LoadMode) -> Option<UnitSet> {
        if self.active.contains(unit) || self.loading.contains(unit) || self.claimed.contains(unit)
        {
            return None;
        }
        match mode {
            LoadMode::Exclusive => {
                self.claimed.insert(unit);
                Some(self.active)
            }
            LoadMode::Additive => {
                self.loading.insert(unit);
                Some(UnitSet::empty())
            }
        }
    }

    /// Moves a claimed exclusive load into `loading`.
    pub(crate) fn mark_loading(&mut self, unit: UnitId) {
        if self.claimed.remove(unit) {
            self.loading.insert(unit);
        }
    }

    pub(crate) fn complete_load(
        &mut self,
        unit: UnitId,
        mode: LoadMode,
        outcome: HostOutcome,
    ) -> LoadApplied {
        if !self.loading.contains(unit) {
            return LoadApplied::Stale;
        }
        match (outcome, mode) {
            (HostOutcome::Failed(reason), _) => {
                self.loading.remove(unit);
                LoadApplied::Failed { reason }
            }
            (HostOutcome::Completed, LoadMode::Additive) => {
                self.loading.remove(unit);
                self.active.insert(unit);
                LoadApplied::Activated
            }
            (HostOutcome::Completed, LoadMode::Exclusive) => LoadApplied::Evicting {
                evicted: self.active,
            },
        }
    }

    /// Second half of an exclusive completion: `active := {unit}`.
    ///
    /// Returns every unit that left `active`.
    pub(crate) fn activate_exclusive(&mut self, unit: UnitId) -> UnitSet {
        let removed = self.active.difference(UnitSet::single(unit));
        self.loading.remove(unit);
        self.active = UnitSet::single(unit);
        removed
    }

    /// Returns true if an unload may be dispatched.
    pub(crate) fn begin_unload(&self, unit: UnitId) -> bool {
        self.active.contains(unit)
    }

    pub(crate) fn complete_unload(&mut self, unit: UnitId, outcome: HostOutcome) -> UnloadApplied {
        match outcome {
            HostOutcome::Completed if self.active.remove(unit) => UnloadApplied::Removed,
            HostOutcome::Completed => UnloadApplied::Stale,
            HostOutcome::Failed(reason) => UnloadApplied::Failed { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(i: u32) -> UnitId {
        UnitId::new(i).unwrap()
    }

    fn assert_disjoint(masks: &Masks) {
        let snap = masks.snapshot();
        assert!(snap.active.is_disjoint(snap.loading), "{snap:?}");
    }

    #[test]
    fn test_begin_load_guards_active_and_loading() {
        let mut masks = Masks::seeded(UnitSet::single(id(0)));
        assert_eq!(masks.begin_load(id(0), LoadMode::Additive), None);

        assert_eq!(masks.begin_load(id(1), LoadMode::Additive), Some(UnitSet::empty()));
        assert_eq!(masks.begin_load(id(1), LoadMode::Exclusive), None);
        assert!(masks.is_loading(id(1)));
        assert_disjoint(&masks);
    }

    #[test]
    fn test_exclusive_claim_is_hidden_until_marked() {
        let mut masks = Masks::seeded(UnitSet::single(id(0)));

        assert_eq!(masks.begin_load(id(2), LoadMode::Exclusive), Some(UnitSet::single(id(0))));
        assert!(!masks.is_loading(id(2)));
        assert_eq!(masks.begin_load(id(2), LoadMode::Additive), None);

        masks.mark_loading(id(2));
        assert!(masks.is_loading(id(2)));
        assert_eq!(masks.begin_load(id(2), LoadMode::Exclusive), None);
    }

    #[test]
    fn test_exclusive_completion_replaces_active() {
        let seed: UnitSet = [id(0), id(1)].into_iter().collect();
        let mut masks = Masks::seeded(seed);

        assert_eq!(masks.begin_load(id(2), LoadMode::Exclusive), Some(seed));
        masks.mark_loading(id(2));
        assert_disjoint(&masks);

        let applied = masks.complete_load(id(2), LoadMode::Exclusive, HostOutcome::Completed);
        assert_eq!(applied, LoadApplied::Evicting { evicted: seed });
        assert_eq!(masks.snapshot().active, seed);
        assert!(masks.is_loading(id(2)));

        assert_eq!(masks.activate_exclusive(id(2)), seed);
        assert_eq!(masks.snapshot().active, UnitSet::single(id(2)));
        assert!(masks.snapshot().loading.is_empty());
    }

    #[test]
    fn test_failed_load_clears_loading_only() {
        let mut masks = Masks::default();
        masks.begin_load(id(3), LoadMode::Additive);

        let applied =
            masks.complete_load(id(3), LoadMode::Additive, HostOutcome::Failed("io".into()));
        assert_eq!(applied, LoadApplied::Failed { reason: "io".into() });
        assert_eq!(masks.snapshot(), ControllerSnapshot::default());
    }

    #[test]
    fn test_stale_completions_change_nothing() {
        let mut masks = Masks::seeded(UnitSet::single(id(1)));
        assert_eq!(
            masks.complete_load(id(5), LoadMode::Additive, HostOutcome::Completed),
            LoadApplied::Stale
        );
        assert_eq!(masks.complete_unload(id(5), HostOutcome::Completed), UnloadApplied::Stale);
        assert_eq!(masks.snapshot().active, UnitSet::single(id(1)));
    }

    #[test]
    fn test_unload() {
        let mut masks = Masks::seeded(UnitSet::single(id(1)));
        assert!(!masks.begin_unload(id(2)));
        assert!(masks.begin_unload(id(1)));

        let failed = masks.complete_unload(id(1), HostOutcome::Failed("busy".into()));
        assert_eq!(failed, UnloadApplied::Failed { reason: "busy".into() });
        assert!(masks.is_active(id(1)));

        assert_eq!(masks.complete_unload(id(1), HostOutcome::Completed), UnloadApplied::Removed);
        assert!(!masks.is_active(id(1)));
    }
}
