//! # Unit Catalog
//!
//! The fixed universe of units: a name for every bit position in use.
//! Loaded once at startup, usually from TOML:
//!
//! ```toml
//! [[unit]]
//! name = "MainMenu"
//! bit = 0
//!
//! [[unit]]
//! name = "PlaceHolder"
//! bit = 1
//! ```

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{CatalogError, CatalogResult};
use crate::unit::{UnitId, UnitSet};

/// One catalog entry as written in the config file.
#[derive(Clone, Debug, Deserialize)]
pub struct UnitEntry {
    /// Human readable unit name.
    pub name: String,
    /// Bit position the unit occupies.
    pub bit: u32,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "unit")]
    units: Vec<UnitEntry>,
}

/// Name ↔ identifier mapping for every configured unit.
#[derive(Clone, Debug, Default)]
pub struct UnitCatalog {
    names: BTreeMap<UnitId, String>,
    ids: HashMap<String, UnitId>,
    universe: UnitSet,
}

impl UnitCatalog {
    /// Starts an empty catalog builder.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Parses a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Parse`] for malformed TOML and the validation
    /// errors of [`CatalogBuilder::build`] otherwise.
    pub fn from_toml_str(text: &str) -> CatalogResult<Self> {
        let file: CatalogFile = toml::from_str(text)?;
        file.units
            .into_iter()
            .fold(Self::builder(), |b, e| b.unit(e.name, e.bit))
            .build()
    }

    /// Reads and parses a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise as
    /// [`UnitCatalog::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Looks up a unit by name.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<UnitId> {
        self.ids.get(name).copied()
    }

    /// Looks up the name of a unit.
    #[must_use]
    pub fn name_of(&self, unit: UnitId) -> Option<&str> {
        self.names.get(&unit).map(String::as_str)
    }

    /// Returns true if `unit` is configured.
    #[inline]
    #[must_use]
    pub fn contains(&self, unit: UnitId) -> bool {
        self.universe.contains(unit)
    }

    /// Every configured unit.
    #[must_use]
    pub fn universe(&self) -> UnitSet {
        self.universe
    }

    /// Number of configured units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if no unit is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Entries in ascending identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (UnitId, &str)> + '_ {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    /// Name for logs, falling back to the raw identifier.
    pub(crate) fn label(&self, unit: UnitId) -> String {
        match self.name_of(unit) {
            Some(name) => name.to_string(),
            None => unit.to_string(),
        }
    }
}

/// Collects entries and validates them into a [`UnitCatalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: Vec<UnitEntry>,
}

impl CatalogBuilder {
    /// Adds a unit at `bit`.
    #[must_use]
    pub fn unit(mut self, name: impl Into<String>, bit: u32) -> Self {
        self.entries.push(UnitEntry {
            name: name.into(),
            bit,
        });
        self
    }

    /// Validates the entries.
    ///
    /// # Errors
    ///
    /// Fails on an empty name, a bit beyond [`UnitSet::CAPACITY`], or a
    /// duplicated name or bit.
    pub fn build(self) -> CatalogResult<UnitCatalog> {
        let mut catalog = UnitCatalog::default();

        for entry in self.entries {
            if entry.name.is_empty() {
                return Err(CatalogError::EmptyName(entry.bit));
            }
            let id = UnitId::new(entry.bit).ok_or_else(|| CatalogError::BitOutOfRange {
                name: entry.name.clone(),
                bit: entry.bit,
                max: UnitSet::CAPACITY - 1,
            })?;
            if catalog.ids.contains_key(&entry.name) {
                return Err(CatalogError::DuplicateName(entry.name));
            }
            if let Some(first) = catalog.names.get(&id) {
                return Err(CatalogError::DuplicateBit {
                    bit: entry.bit,
                    first: first.clone(),
                    second: entry.name,
                });
            }

            catalog.universe.insert(id);
            catalog.ids.insert(entry.name.clone(), id);
            catalog.names.insert(id, entry.name);
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[unit]]
        name = "MainMenu"
        bit = 0

        [[unit]]
        name = "PlaceHolder"
        bit = 1

        [[unit]]
        name = "Arena"
        bit = 5
    "#;

    #[test]
    fn test_parse_sample() {
        let catalog = UnitCatalog::from_toml_str(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 3);

        let arena = catalog.id_of("Arena").unwrap();
        assert_eq!(arena.index(), 5);
        assert_eq!(catalog.name_of(arena), Some("Arena"));
        assert!(catalog.contains(arena));
        assert!(!catalog.contains(UnitId::new(2).unwrap()));

        let names: Vec<&str> = catalog.iter().map(|(_, n)| n).collect();
        assert_eq!(names, vec!["MainMenu", "PlaceHolder", "Arena"]);
    }

    #[test]
    fn test_empty_file_is_empty_catalog() {
        let catalog = UnitCatalog::from_toml_str("").unwrap();
        assert!(catalog.is_empty());
        assert!(catalog.universe().is_empty());
    }

    #[test]
    fn test_rejects_duplicate_bit() {
        let err = UnitCatalog::builder()
            .unit("A", 3)
            .unit("B", 3)
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateBit { bit: 3, .. }));
    }

    #[test]
    fn test_rejects_duplicate_name() {
        let err = UnitCatalog::builder()
            .unit("A", 0)
            .unit("A", 1)
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateName(name) if name == "A"));
    }

    #[test]
    fn test_rejects_out_of_range_and_empty() {
        let err = UnitCatalog::builder().unit("Far", 64).build().unwrap_err();
        assert!(matches!(err, CatalogError::BitOutOfRange { bit: 64, max: 63, .. }));

        let err = UnitCatalog::builder().unit("", 1).build().unwrap_err();
        assert!(matches!(err, CatalogError::EmptyName(1)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = UnitCatalog::from_toml_str("[[unit]]\nname = 4").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = UnitCatalog::from_toml_file("/nonexistent/units.toml").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
