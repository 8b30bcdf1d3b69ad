//! Controller construction.

use std::sync::Arc;

use super::UnitController;
use crate::catalog::UnitCatalog;
use crate::error::{ControllerError, ControllerResult};
use crate::host::HostLoader;
use crate::unit::UnitSet;

/// Builder for [`UnitController`].
#[derive(Debug)]
pub struct ControllerBuilder {
    catalog: UnitCatalog,
    seed: UnitSet,
}

impl ControllerBuilder {
    pub(super) fn new(catalog: UnitCatalog) -> Self {
        Self {
            catalog,
            seed: UnitSet::empty(),
        }
    }

    /// Units the host already has loaded at boot.
    #[must_use]
    pub fn seed_active(mut self, units: UnitSet) -> Self {
        self.seed = units;
        self
    }

    /// Builds the controller on top of `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidIdentifier`] for the lowest seeded
    /// unit that is not in the catalog.
    pub fn build<H>(self, host: Arc<H>) -> ControllerResult<UnitController>
    where
        H: HostLoader + 'static,
    {
        let outside = self.seed.difference(self.catalog.universe());
        if let Some(unit) = outside.iter().next() {
            return Err(ControllerError::InvalidIdentifier(unit));
        }
        Ok(UnitController::assemble(self.catalog, host, self.seed))
    }
}
