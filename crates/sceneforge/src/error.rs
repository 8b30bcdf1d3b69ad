//! # Application Errors

use sceneforge_core::{CatalogError, ControllerError, HostError};
use thiserror::Error;

/// Errors raised while assembling or driving the runtime.
#[derive(Error, Debug)]
pub enum AppError {
    /// The unit catalog could not be loaded.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A controller request or construction was rejected.
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// A reference host failed to start.
    #[error(transparent)]
    Host(#[from] HostError),

    /// No tokio runtime is available in the calling context.
    #[error("no tokio runtime in the current context")]
    NoRuntime,

    /// The async runtime could not be built.
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// A transition did not finish in time.
    #[error("timed out waiting for {0}")]
    Timeout(String),
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;
