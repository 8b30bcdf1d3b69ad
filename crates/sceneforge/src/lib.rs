//! # SCENEFORGE
//!
//! Runtime wiring around [`sceneforge_core`]: a tokio-backed host that
//! simulates asynchronous loading, an async watcher over lifecycle events,
//! and the composition root that owns the one controller instance.
//!
//! ## Example
//!
//! ```rust,ignore
//! let app = App::build(AppConfig::default(), Handle::current())?;
//! let controller = app.controller();
//! let mut watcher = TransitionWatcher::attach(&controller);
//!
//! controller.load_exclusive_named("MainMenu")?;
//! watcher.wait_for(Transition::Loaded(menu), Duration::from_secs(1)).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod error;
pub mod logging;
pub mod tokio_host;
pub mod watch;

pub use app::{App, AppConfig, DEFAULT_CATALOG};
pub use error::{AppError, AppResult};
pub use tokio_host::{TokioHost, TokioHostConfig};
pub use watch::{Transition, TransitionWatcher};
