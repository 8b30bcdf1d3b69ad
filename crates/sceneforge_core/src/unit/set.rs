//! # Unit Set
//!
//! Fixed-universe set of [`UnitId`]s. Iteration is always in ascending
//! identifier order, which the controller relies on for event ordering.

use std::fmt;
use std::ops::{BitAnd, BitOr, Sub};

use super::UnitId;

/// A set of units.
///
/// Backed by a single machine word. Callers only see set operations.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct UnitSet {
    bits: u64,
}

impl UnitSet {
    /// Number of distinct identifiers a set can hold.
    pub const CAPACITY: u32 = u64::BITS;

    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// A set holding exactly one unit.
    #[must_use]
    pub const fn single(unit: UnitId) -> Self {
        Self {
            bits: 1u64 << unit.index(),
        }
    }

    /// Returns true if `unit` is a member.
    #[inline]
    #[must_use]
    pub const fn contains(&self, unit: UnitId) -> bool {
        self.bits & (1u64 << unit.index()) != 0
    }

    /// Adds `unit`. Returns true if it was not already present.
    pub fn insert(&mut self, unit: UnitId) -> bool {
        let was_present = self.contains(unit);
        self.bits |= 1u64 << unit.index();
        !was_present
    }

    /// Removes `unit`. Returns true if it was present.
    pub fn remove(&mut self, unit: UnitId) -> bool {
        let was_present = self.contains(unit);
        self.bits &= !(1u64 << unit.index());
        was_present
    }

    /// Members of either set.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Members of both sets.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Members of `self` that are not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// Members of `universe` that are not in `self`.
    #[must_use]
    pub const fn complement_within(self, universe: Self) -> Self {
        universe.difference(self)
    }

    /// Returns true if `self` and `other` share no member.
    #[must_use]
    pub const fn is_disjoint(self, other: Self) -> bool {
        self.bits & other.bits == 0
    }

    /// Returns true if every member of `self` is in `other`.
    #[must_use]
    pub const fn is_subset(self, other: Self) -> bool {
        self.bits & !other.bits == 0
    }

    /// Returns true if the set has no members.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of members.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Members in ascending order.
    #[must_use]
    pub const fn iter(&self) -> UnitSetIter {
        UnitSetIter { remaining: self.bits }
    }

    /// Invokes `f` for every member in ascending order.
    pub fn for_each(&self, mut f: impl FnMut(UnitId)) {
        for unit in self.iter() {
            f(unit);
        }
    }
}

impl fmt::Debug for UnitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(UnitId::index)).finish()
    }
}

impl From<UnitId> for UnitSet {
    fn from(unit: UnitId) -> Self {
        Self::single(unit)
    }
}

impl FromIterator<UnitId> for UnitSet {
    fn from_iter<I: IntoIterator<Item = UnitId>>(iter: I) -> Self {
        let mut set = Self::empty();
        for unit in iter {
            set.insert(unit);
        }
        set
    }
}

impl Extend<UnitId> for UnitSet {
    fn extend<I: IntoIterator<Item = UnitId>>(&mut self, iter: I) {
        for unit in iter {
            self.insert(unit);
        }
    }
}

impl IntoIterator for UnitSet {
    type Item = UnitId;
    type IntoIter = UnitSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &UnitSet {
    type Item = UnitId;
    type IntoIter = UnitSetIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl BitOr for UnitSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for UnitSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl Sub for UnitSet {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}

/// Ascending iterator over the members of a [`UnitSet`].
#[derive(Clone, Debug)]
pub struct UnitSetIter {
    remaining: u64,
}

impl Iterator for UnitSetIter {
    type Item = UnitId;

    fn next(&mut self) -> Option<UnitId> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.remaining.trailing_zeros();
        // Clear lowest set bit
        self.remaining &= self.remaining - 1;
        UnitId::new(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for UnitSetIter {}
