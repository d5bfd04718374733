use std::num::NonZeroU32;

/// The id associated to a package in a [`Catalog`](crate::Catalog).
///
/// Ids are handed out in catalog insertion order starting at 1, so a
/// [`PackageId`] doubles as the DIMACS variable number of the package
/// without any translation.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct PackageId(NonZeroU32);

impl PackageId {
    pub(crate) fn from_index(index: usize) -> Self {
        let id = u32::try_from(index + 1).expect("package id too big");
        // SAFETY: index + 1 is never zero
        Self(unsafe { NonZeroU32::new_unchecked(id) })
    }

    pub(crate) fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// The positive DIMACS variable number of this package.
    pub fn to_dimacs(self) -> i32 {
        self.0.get() as i32
    }
}

/// The id associated to an interned package name.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct NameId(u32);

impl NameId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn to_index(self) -> usize {
        self.0 as usize
    }
}
