//! # Haplotype, Site and Ancestor Definitions
//!
//! Index newtypes and the allele encoding shared by the builder and matcher.
//!
//! Alleles are stored as `u8`: `0` is ancestral, `1` is derived and
//! [`UNKNOWN_ALLELE`] marks sites outside an ancestor's span or unresolved
//! bases in a query.

use serde::{Deserialize, Serialize};

/// Allele value for positions with no information
pub const UNKNOWN_ALLELE: u8 = 255;

/// Zero-cost newtype for site indices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SiteIdx(pub u32);

impl SiteIdx {
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for SiteIdx {
    fn from(idx: usize) -> Self {
        Self(idx as u32)
    }
}

impl From<SiteIdx> for usize {
    fn from(idx: SiteIdx) -> usize {
        idx.0 as usize
    }
}

/// Zero-cost newtype for ancestor indices in the matcher library.
///
/// Index 0 is the implicit all-zero ancestor of everyone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AncestorIdx(pub u32);

impl AncestorIdx {
    /// The implicit root ancestor
    pub const ROOT: AncestorIdx = AncestorIdx(0);

    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for AncestorIdx {
    fn from(idx: u32) -> Self {
        Self(idx)
    }
}

impl From<usize> for AncestorIdx {
    fn from(idx: usize) -> Self {
        Self(idx as u32)
    }
}

impl From<AncestorIdx> for usize {
    fn from(idx: AncestorIdx) -> usize {
        idx.0 as usize
    }
}

impl std::fmt::Display for AncestorIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-cost newtype for sample (row) indices of the sample matrix
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SampleIdx(pub u32);

impl SampleIdx {
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for SampleIdx {
    fn from(idx: usize) -> Self {
        Self(idx as u32)
    }
}

impl From<SampleIdx> for usize {
    fn from(idx: SampleIdx) -> usize {
        idx.0 as usize
    }
}

/// True for 0, 1 and [`UNKNOWN_ALLELE`]
#[inline]
pub fn is_valid_allele(allele: u8) -> bool {
    allele <= 1 || allele == UNKNOWN_ALLELE
}

/// Half-open `[start, end)` range of known sites, or `None` if every site is unknown.
///
/// Does not check that the range is free of interior unknowns.
pub fn known_span(haplotype: &[u8]) -> Option<(usize, usize)> {
    let start = haplotype.iter().position(|&a| a != UNKNOWN_ALLELE)?;
    let last = haplotype.iter().rposition(|&a| a != UNKNOWN_ALLELE)?;
    Some((start, last + 1))
}

/// Render a haplotype as a compact string: `0`, `1`, or `.` for unknown.
pub fn haplotype_string(haplotype: &[u8]) -> String {
    haplotype
        .iter()
        .map(|&a| match a {
            0 => '0',
            1 => '1',
            UNKNOWN_ALLELE => '.',
            _ => '?',
        })
        .collect()
}
