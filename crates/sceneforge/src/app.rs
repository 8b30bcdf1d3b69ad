//! # Composition Root
//!
//! Owns the single controller instance and hands out clones of it. Nothing
//! else in the process constructs a controller.

use std::path::PathBuf;
use std::sync::Arc;

use sceneforge_core::{ControllerError, UnitCatalog, UnitController, UnitSet};
use tokio::runtime::Handle;

use crate::error::AppResult;
use crate::tokio_host::{TokioHost, TokioHostConfig};

/// Catalog shipped with the crate.
pub const DEFAULT_CATALOG: &str = include_str!("../data/units.toml");

/// Startup configuration.
#[derive(Clone, Debug, Default)]
pub struct AppConfig {
    /// Catalog file; the bundled catalog is used when `None`.
    pub catalog_path: Option<PathBuf>,
    /// Names of units the host already has loaded at boot.
    pub boot_units: Vec<String>,
    /// Host simulation settings.
    pub host: TokioHostConfig,
}

/// The assembled runtime.
#[derive(Debug)]
pub struct App {
    controller: UnitController,
}

impl App {
    /// Loads the catalog and builds the controller on `handle`.
    ///
    /// # Errors
    ///
    /// Fails if the catalog cannot be loaded or a boot unit is unknown.
    pub fn build(config: AppConfig, handle: Handle) -> AppResult<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => UnitCatalog::from_toml_file(path)?,
            None => UnitCatalog::from_toml_str(DEFAULT_CATALOG)?,
        };

        let mut seed = UnitSet::empty();
        for name in &config.boot_units {
            let unit = catalog
                .id_of(name)
                .ok_or_else(|| ControllerError::UnknownUnitName(name.clone()))?;
            seed.insert(unit);
        }

        tracing::info!(units = catalog.len(), boot = ?seed, "catalog loaded");

        let host = Arc::new(TokioHost::new(handle, config.host));
        let controller = UnitController::builder(catalog)
            .seed_active(seed)
            .build(host)?;

        Ok(Self { controller })
    }

    /// Handle to the controller.
    #[must_use]
    pub fn controller(&self) -> UnitController {
        self.controller.clone()
    }
}
