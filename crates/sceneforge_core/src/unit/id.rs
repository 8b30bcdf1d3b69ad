//! Stable unit identifier.

use std::fmt;

use super::UnitSet;

/// Identifier of a loadable unit.
///
/// Wraps the bit position the unit occupies in a [`UnitSet`]. Identifiers are
/// handed out by the catalog and stay stable for the life of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(u8);

impl UnitId {
    /// Creates an identifier for a bit position.
    ///
    /// Returns `None` if the position does not fit in a [`UnitSet`].
    #[must_use]
    pub const fn new(index: u32) -> Option<Self> {
        if index < UnitSet::CAPACITY {
            Some(Self(index as u8))
        } else {
            None
        }
    }

    /// Returns the bit position.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(UnitId::new(0).is_some());
        assert!(UnitId::new(UnitSet::CAPACITY - 1).is_some());
        assert!(UnitId::new(UnitSet::CAPACITY).is_none());
        assert!(UnitId::new(u32::MAX).is_none());
    }

    #[test]
    fn test_display() {
        let id = UnitId::new(7).unwrap();
        assert_eq!(id.to_string(), "unit#7");
        assert_eq!(id.index(), 7);
    }
}
