//! # SCENEFORGE Core
//!
//! Orchestrates the asynchronous loading and unloading of named units on top
//! of a host that only offers fire-and-forget requests with completion
//! callbacks.
//!
//! ## Architecture Rules
//!
//! 1. **The host does the work** - the controller only decides *whether* to
//!    dispatch and *who gets told when*
//! 2. **Idempotent requests** - loading an active or loading unit, or
//!    unloading an inactive one, does nothing
//! 3. **`active ∩ loading = ∅`** - at every observable instant
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sceneforge_core::{ManualHost, UnitCatalog, UnitController};
//!
//! let catalog = UnitCatalog::builder().unit("MainMenu", 0).unit("Arena", 1).build()?;
//! let menu = catalog.id_of("MainMenu").unwrap();
//!
//! let host = Arc::new(ManualHost::new());
//! let controller = UnitController::builder(catalog).build(Arc::clone(&host))?;
//!
//! controller.load_exclusive(menu)?;
//! assert!(controller.is_loading(menu));
//!
//! host.complete(menu);
//! assert_eq!(controller.active_units(), vec![menu]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::perf)]

pub mod catalog;
pub mod controller;
pub mod error;
pub mod host;
pub mod notify;
pub mod unit;

pub use catalog::{CatalogBuilder, UnitCatalog, UnitEntry};
pub use controller::{ControllerBuilder, ControllerSnapshot, UnitController};
pub use error::{CatalogError, CatalogResult, ControllerError, ControllerResult, HostError};
pub use host::{
    Completion, HostLoader, HostOutcome, LoadMode, ManualHost, PendingRequest, TransitionKind,
    WorkerHost, WorkerHostConfig,
};
pub use notify::{Channel, EmitReport, LifecycleEvents, SubscriptionId, TransitionFailure};
pub use unit::{UnitId, UnitSet, UnitSetIter};
