//! Integration tests for the lifecycle controller driven by `ManualHost`.

use std::sync::Arc;

use parking_lot::Mutex;
use sceneforge_core::{
    Completion, ControllerError, HostLoader, LoadMode, ManualHost, TransitionKind, UnitCatalog,
    UnitController, UnitId, UnitSet,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ev {
    BeforeLoad(u32),
    AfterLoad(u32),
    BeforeUnload(u32),
    AfterUnload(u32),
    Failed(u32),
}

const A: u32 = 0;
const B: u32 = 1;
const C: u32 = 2;
const D: u32 = 3;

fn id(i: u32) -> UnitId {
    UnitId::new(i).unwrap()
}

fn catalog() -> UnitCatalog {
    UnitCatalog::builder()
        .unit("A", A)
        .unit("B", B)
        .unit("C", C)
        .unit("D", D)
        .build()
        .unwrap()
}

fn setup(seed: &[u32]) -> (UnitController, Arc<ManualHost>) {
    let host = Arc::new(ManualHost::new());
    let controller = UnitController::builder(catalog())
        .seed_active(seed.iter().copied().map(id).collect())
        .build(Arc::clone(&host))
        .unwrap();
    (controller, host)
}

fn record(controller: &UnitController) -> Arc<Mutex<Vec<Ev>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let events = controller.events();

    let l = Arc::clone(&log);
    events.before_load.subscribe(move |u: &UnitId| l.lock().push(Ev::BeforeLoad(u.index())));
    let l = Arc::clone(&log);
    events.after_load.subscribe(move |u: &UnitId| l.lock().push(Ev::AfterLoad(u.index())));
    let l = Arc::clone(&log);
    events.before_unload.subscribe(move |u: &UnitId| l.lock().push(Ev::BeforeUnload(u.index())));
    let l = Arc::clone(&log);
    events.after_unload.subscribe(move |u: &UnitId| l.lock().push(Ev::AfterUnload(u.index())));
    let l = Arc::clone(&log);
    events.failed.subscribe(move |f| l.lock().push(Ev::Failed(f.unit.index())));

    log
}

fn take(log: &Arc<Mutex<Vec<Ev>>>) -> Vec<Ev> {
    std::mem::take(&mut *log.lock())
}

fn assert_disjoint(controller: &UnitController) {
    let snap = controller.snapshot();
    assert!(snap.active.is_disjoint(snap.loading), "active and loading overlap: {snap:?}");
}

#[test]
fn test_repeated_load_dispatches_once() {
    let (controller, host) = setup(&[]);
    let log = record(&controller);

    controller.load_exclusive(id(A)).unwrap();
    controller.load_exclusive(id(A)).unwrap();
    controller.load_additive(id(A)).unwrap();
    assert_eq!(host.dispatched(), vec![(id(A), TransitionKind::Load(LoadMode::Exclusive))]);
    assert_eq!(take(&log), vec![Ev::BeforeLoad(A)]);

    controller.load_additive(id(B)).unwrap();
    controller.load_additive(id(B)).unwrap();
    assert_eq!(host.pending_count(), 2);

    host.complete_all();
    controller.load_additive(id(A)).unwrap();
    controller.load_exclusive(id(B)).unwrap();
    assert_eq!(host.pending_count(), 0);
}

#[test]
fn test_exclusive_load_replaces_all_active_units() {
    let (controller, host) = setup(&[A, B]);
    let log = record(&controller);

    controller.load_exclusive(id(C)).unwrap();
    assert_eq!(take(&log), vec![Ev::BeforeUnload(A), Ev::BeforeUnload(B), Ev::BeforeLoad(C)]);
    assert_eq!(controller.active_units(), vec![id(A), id(B)]);
    assert!(controller.is_loading(id(C)));
    assert_disjoint(&controller);

    assert!(host.complete(id(C)));
    assert_eq!(take(&log), vec![Ev::AfterUnload(A), Ev::AfterUnload(B), Ev::AfterLoad(C)]);
    assert_eq!(controller.active_units(), vec![id(C)]);
    assert!(controller.loading_units().is_empty());
}

#[test]
fn test_exclusive_load_never_sends_unloads_for_evicted_units() {
    let (controller, host) = setup(&[A, B]);
    controller.load_exclusive(id(C)).unwrap();
    host.complete_all();

    assert_eq!(host.dispatched(), vec![(id(C), TransitionKind::Load(LoadMode::Exclusive))]);
}

#[test]
fn test_additive_load_preserves_active_units() {
    let (controller, host) = setup(&[A]);
    let log = record(&controller);

    controller.load_additive(id(B)).unwrap();
    host.complete(id(B));

    assert_eq!(take(&log), vec![Ev::BeforeLoad(B), Ev::AfterLoad(B)]);
    assert_eq!(controller.active_units(), vec![id(A), id(B)]);
}

#[test]
fn test_unload_of_inactive_unit_is_noop() {
    let (controller, host) = setup(&[A]);
    let log = record(&controller);

    controller.unload(id(B)).unwrap();

    assert!(take(&log).is_empty());
    assert_eq!(host.pending_count(), 0);
    assert_eq!(controller.active_units(), vec![id(A)]);
}

#[test]
fn test_unload_may_empty_active_set() {
    let (controller, host) = setup(&[A]);
    let log = record(&controller);

    controller.unload(id(A)).unwrap();
    assert_eq!(take(&log), vec![Ev::BeforeUnload(A)]);
    assert!(controller.is_active(id(A)));

    host.complete(id(A));
    assert_eq!(take(&log), vec![Ev::AfterUnload(A)]);
    assert!(controller.active_units().is_empty());
}

#[test]
fn test_event_ordering_scenario() {
    let (controller, host) = setup(&[]);
    let log = record(&controller);

    controller.load_exclusive(id(A)).unwrap();
    host.complete(id(A));
    assert_eq!(take(&log), vec![Ev::BeforeLoad(A), Ev::AfterLoad(A)]);

    controller.load_exclusive(id(B)).unwrap();
    assert_eq!(take(&log), vec![Ev::BeforeUnload(A), Ev::BeforeLoad(B)]);
    assert!(controller.is_loading(id(B)));
    assert!(controller.is_active(id(A)));

    host.complete(id(B));
    assert_eq!(take(&log), vec![Ev::AfterUnload(A), Ev::AfterLoad(B)]);
    assert_eq!(controller.active_units(), vec![id(B)]);
}

#[test]
fn test_concurrent_additive_loads_complete_in_any_order() {
    let (controller, host) = setup(&[]);

    controller.load_additive(id(A)).unwrap();
    controller.load_additive(id(B)).unwrap();
    assert_eq!(controller.loading_units(), vec![id(A), id(B)]);

    host.complete(id(B));
    assert_disjoint(&controller);
    host.complete(id(A));

    let snap = controller.snapshot();
    assert_eq!(snap.active, [id(A), id(B)].into_iter().collect::<UnitSet>());
    assert!(snap.loading.is_empty());
}

#[test]
fn test_invalid_identifier_is_rejected_before_anything_happens() {
    let (controller, host) = setup(&[A]);
    let log = record(&controller);
    let outside = id(9);

    assert_eq!(controller.load_exclusive(outside), Err(ControllerError::InvalidIdentifier(outside)));
    assert_eq!(controller.load_additive(outside), Err(ControllerError::InvalidIdentifier(outside)));
    assert_eq!(controller.unload(outside), Err(ControllerError::InvalidIdentifier(outside)));

    assert!(take(&log).is_empty());
    assert_eq!(host.pending_count(), 0);
    assert!(!controller.is_loading(outside));
}

#[test]
fn test_seed_outside_catalog_is_rejected() {
    let err = UnitController::builder(catalog())
        .seed_active(UnitSet::single(id(12)))
        .build(Arc::new(ManualHost::new()))
        .unwrap_err();
    assert_eq!(err, ControllerError::InvalidIdentifier(id(12)));
}

#[test]
fn test_named_requests() {
    let (controller, host) = setup(&[]);

    controller.load_additive_named("C").unwrap();
    host.complete_all();
    assert!(controller.is_active(id(C)));

    controller.unload_named("C").unwrap();
    host.complete_all();
    assert!(!controller.is_active(id(C)));

    controller.load_exclusive_named("D").unwrap();
    assert!(controller.is_loading(id(D)));

    assert_eq!(
        controller.load_additive_named("Nowhere"),
        Err(ControllerError::UnknownUnitName("Nowhere".to_string()))
    );
}

#[test]
fn test_host_failure_fires_failed_instead_of_after_load() {
    let (controller, host) = setup(&[A]);
    let log = record(&controller);
    let reasons = Arc::new(Mutex::new(Vec::new()));
    let r = Arc::clone(&reasons);
    controller
        .events()
        .failed
        .subscribe(move |f| r.lock().push((f.kind, f.reason.clone())));

    controller.load_exclusive(id(B)).unwrap();
    host.fail(id(B), "missing bundle");

    assert_eq!(take(&log), vec![Ev::BeforeUnload(A), Ev::BeforeLoad(B), Ev::Failed(B)]);
    assert!(!controller.is_loading(id(B)));
    assert!(!controller.is_active(id(B)));
    assert_eq!(controller.active_units(), vec![id(A)]);
    assert_eq!(
        *reasons.lock(),
        vec![(TransitionKind::Load(LoadMode::Exclusive), "missing bundle".to_string())]
    );

    // A failed load can be retried.
    controller.load_additive(id(B)).unwrap();
    assert!(controller.is_loading(id(B)));
}

#[test]
fn test_failed_unload_keeps_unit_active() {
    let (controller, host) = setup(&[A]);
    let log = record(&controller);

    controller.unload(id(A)).unwrap();
    host.fail(id(A), "locked");

    assert_eq!(take(&log), vec![Ev::BeforeUnload(A), Ev::Failed(A)]);
    assert!(controller.is_active(id(A)));
}

#[test]
fn test_missing_completion_leaves_unit_loading() {
    let (controller, host) = setup(&[]);

    controller.load_additive(id(A)).unwrap();
    let pending = host.take(id(A)).unwrap();
    drop(pending);

    assert!(controller.is_loading(id(A)));
    assert!(!controller.is_active(id(A)));
    controller.load_additive(id(A)).unwrap();
    assert_eq!(host.pending_count(), 0);
}

#[test]
fn test_panicking_subscriber_does_not_corrupt_state() {
    let (controller, host) = setup(&[]);
    controller.events().after_load.subscribe(|_: &UnitId| panic!("subscriber bug"));
    let log = record(&controller);

    controller.load_additive(id(A)).unwrap();
    host.complete(id(A));

    assert_eq!(take(&log), vec![Ev::BeforeLoad(A), Ev::AfterLoad(A)]);
    assert!(controller.is_active(id(A)));
    assert!(!controller.is_loading(id(A)));
}

#[test]
fn test_subscribers_observe_consistent_state() {
    let (controller, host) = setup(&[A]);
    let violations = Arc::new(Mutex::new(0usize));

    let check = |controller: &UnitController, violations: &Arc<Mutex<usize>>| {
        let c = controller.clone();
        let v = Arc::clone(violations);
        move |_: &UnitId| {
            let snap = c.snapshot();
            if !snap.active.is_disjoint(snap.loading) {
                *v.lock() += 1;
            }
        }
    };
    let events = controller.events();
    events.before_load.subscribe(check(&controller, &violations));
    events.after_load.subscribe(check(&controller, &violations));
    events.before_unload.subscribe(check(&controller, &violations));
    events.after_unload.subscribe(check(&controller, &violations));

    controller.load_additive(id(B)).unwrap();
    controller.load_exclusive(id(C)).unwrap();
    host.complete(id(B));
    host.complete(id(C));
    controller.unload(id(C)).unwrap();
    host.complete_all();

    assert_eq!(*violations.lock(), 0);
    assert!(controller.active_units().is_empty());
}

#[test]
fn test_eviction_subscribers_see_outgoing_units_active() {
    let (controller, host) = setup(&[A]);
    let seen = Arc::new(Mutex::new(Vec::new()));

    let c = controller.clone();
    let s = Arc::clone(&seen);
    controller.events().before_unload.subscribe(move |u: &UnitId| {
        s.lock().push((
            "before_unload",
            c.is_active(*u),
            c.is_active(id(C)),
            c.is_loading(id(C)),
        ));
    });
    let c = controller.clone();
    let s = Arc::clone(&seen);
    controller.events().before_load.subscribe(move |_: &UnitId| {
        s.lock().push(("before_load", c.is_active(id(A)), c.is_active(id(C)), c.is_loading(id(C))));
    });
    let c = controller.clone();
    let s = Arc::clone(&seen);
    controller.events().after_unload.subscribe(move |u: &UnitId| {
        s.lock().push((
            "after_unload",
            c.is_active(*u),
            c.is_active(id(C)),
            c.is_loading(id(C)),
        ));
    });
    let c = controller.clone();
    let s = Arc::clone(&seen);
    controller.events().after_load.subscribe(move |_: &UnitId| {
        s.lock().push(("after_load", c.is_active(id(A)), c.is_active(id(C)), c.is_loading(id(C))));
    });

    controller.load_exclusive(id(C)).unwrap();
    host.complete(id(C));

    // (event, A active, C active, C loading)
    assert_eq!(
        *seen.lock(),
        vec![
            ("before_unload", true, false, false),
            ("before_load", true, false, true),
            ("after_unload", true, false, true),
            ("after_load", false, true, false),
        ]
    );
}

#[test]
fn test_repeat_exclusive_request_from_eviction_subscriber_is_ignored() {
    let (controller, host) = setup(&[A]);
    let c = controller.clone();
    controller.events().before_unload.subscribe(move |_: &UnitId| {
        c.load_exclusive(id(C)).unwrap();
    });

    controller.load_exclusive(id(C)).unwrap();
    assert_eq!(host.pending_count(), 1);
    assert!(controller.is_loading(id(C)));
}

#[test]
fn test_unit_activated_during_eviction_is_evicted_too() {
    let (controller, host) = setup(&[A]);
    let log = record(&controller);
    let c = controller.clone();
    let h = Arc::clone(&host);
    controller.events().after_unload.subscribe(move |u: &UnitId| {
        if u.index() == A {
            c.load_additive(id(B)).unwrap();
            h.complete(id(B));
        }
    });

    controller.load_exclusive(id(C)).unwrap();
    take(&log);
    host.complete(id(C));

    assert_eq!(
        take(&log),
        vec![
            Ev::AfterUnload(A),
            Ev::BeforeLoad(B),
            Ev::AfterLoad(B),
            Ev::AfterUnload(B),
            Ev::AfterLoad(C),
        ]
    );
    assert_eq!(controller.active_units(), vec![id(C)]);
}

#[test]
fn test_subscriber_can_issue_requests() {
    let (controller, host) = setup(&[]);
    let c = controller.clone();
    controller.events().after_load.subscribe(move |u: &UnitId| {
        if u.index() == A {
            c.load_additive(id(B)).unwrap();
        }
    });

    controller.load_exclusive(id(A)).unwrap();
    host.complete(id(A));
    assert!(controller.is_loading(id(B)));

    host.complete(id(B));
    assert_eq!(controller.active_units(), vec![id(A), id(B)]);
}

#[test]
fn test_unload_completing_after_eviction_fires_nothing() {
    let (controller, host) = setup(&[A]);
    let log = record(&controller);

    controller.unload(id(A)).unwrap();
    controller.load_exclusive(id(B)).unwrap();
    host.complete(id(B));
    host.complete(id(A));

    assert_eq!(
        take(&log),
        vec![
            Ev::BeforeUnload(A),
            Ev::BeforeUnload(A),
            Ev::BeforeLoad(B),
            Ev::AfterUnload(A),
            Ev::AfterLoad(B),
        ]
    );
    assert_eq!(controller.active_units(), vec![id(B)]);
}

#[test]
fn test_additive_load_in_flight_survives_exclusive_completion() {
    let (controller, host) = setup(&[A]);

    controller.load_additive(id(B)).unwrap();
    controller.load_exclusive(id(C)).unwrap();
    host.complete(id(C));
    assert_eq!(controller.active_units(), vec![id(C)]);
    assert!(controller.is_loading(id(B)));

    host.complete(id(B));
    assert_eq!(controller.active_units(), vec![id(B), id(C)]);
}

/// Completes every request before returning from the call.
struct InlineHost;

impl HostLoader for InlineHost {
    fn request_load(&self, _unit: UnitId, _mode: LoadMode, done: Completion) {
        done.succeed();
    }

    fn request_unload(&self, _unit: UnitId, done: Completion) {
        done.succeed();
    }
}

#[test]
fn test_synchronous_host_completion() {
    let controller = UnitController::builder(catalog())
        .build(Arc::new(InlineHost))
        .unwrap();
    let log = record(&controller);

    controller.load_exclusive(id(A)).unwrap();
    controller.load_additive(id(B)).unwrap();
    controller.load_exclusive(id(C)).unwrap();
    controller.unload(id(C)).unwrap();

    assert_eq!(
        take(&log),
        vec![
            Ev::BeforeLoad(A),
            Ev::AfterLoad(A),
            Ev::BeforeLoad(B),
            Ev::AfterLoad(B),
            Ev::BeforeUnload(A),
            Ev::BeforeUnload(B),
            Ev::BeforeLoad(C),
            Ev::AfterUnload(A),
            Ev::AfterUnload(B),
            Ev::AfterLoad(C),
            Ev::BeforeUnload(C),
            Ev::AfterUnload(C),
        ]
    );
    assert!(controller.active_units().is_empty());
}

#[test]
fn test_controller_dropped_before_completion() {
    let (controller, host) = setup(&[]);
    controller.load_additive(id(A)).unwrap();
    drop(controller);

    assert!(host.complete(id(A)));
}
