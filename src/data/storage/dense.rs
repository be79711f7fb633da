//! # Dense Bit-Packed Sample Matrix
//!
//! Binary samples × sites matrix stored as one bit vector per site, so that
//! derived-allele frequencies are a `count_ones` per column.

use bitvec::prelude::*;

use crate::data::haplotype::{SampleIdx, SiteIdx};
use crate::error::{AncestralError, Result};

/// One site's alleles across all samples (0 = ancestral, 1 = derived)
#[derive(Clone, Debug)]
pub struct SiteColumn {
    bits: BitVec<u64, Lsb0>,
}

impl SiteColumn {
    /// Create an all-ancestral column
    pub fn new(n_samples: usize) -> Self {
        Self {
            bits: bitvec![u64, Lsb0; 0; n_samples],
        }
    }

    /// Allele carried by a sample
    #[inline]
    pub fn get(&self, sample: usize) -> u8 {
        self.bits[sample] as u8
    }

    /// Set the allele carried by a sample
    pub fn set(&mut self, sample: usize, derived: bool) {
        self.bits.set(sample, derived);
    }

    /// Number of samples carrying the derived allele
    pub fn derived_count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Iterate samples carrying the derived allele
    pub fn carriers(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    /// Number of samples in the column
    pub fn n_samples(&self) -> usize {
        self.bits.len()
    }

    /// Memory usage in bytes
    pub fn size_bytes(&self) -> usize {
        self.bits.as_raw_slice().len() * std::mem::size_of::<u64>() + std::mem::size_of::<Self>()
    }
}

/// Binary sample matrix, column-major by site
#[derive(Clone, Debug)]
pub struct SampleMatrix {
    columns: Vec<SiteColumn>,
    n_samples: usize,
}

impl SampleMatrix {
    /// Create an all-zero matrix
    pub fn zeros(n_samples: usize, n_sites: usize) -> Self {
        Self {
            columns: vec![SiteColumn::new(n_samples); n_sites],
            n_samples,
        }
    }

    /// Build from sample rows, validating the declared dimensions.
    ///
    /// Every row must have `n_sites` entries, each 0 or 1.
    pub fn from_rows<R: AsRef<[u8]>>(n_samples: usize, n_sites: usize, rows: &[R]) -> Result<Self> {
        if rows.len() != n_samples {
            return Err(AncestralError::shape("sample matrix rows", n_samples, rows.len()));
        }
        let mut matrix = Self::zeros(n_samples, n_sites);
        for (k, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_sites {
                return Err(AncestralError::shape("sample matrix columns", n_sites, row.len()));
            }
            for (l, &allele) in row.iter().enumerate() {
                match allele {
                    0 => {}
                    1 => matrix.columns[l].set(k, true),
                    value => return Err(AncestralError::InvalidAllele { site: l, value }),
                }
            }
        }
        Ok(matrix)
    }

    /// Number of samples (rows)
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of sites (columns)
    pub fn n_sites(&self) -> usize {
        self.columns.len()
    }

    /// Allele at (sample, site)
    #[inline]
    pub fn allele(&self, sample: SampleIdx, site: SiteIdx) -> u8 {
        self.columns[site.as_usize()].get(sample.as_usize())
    }

    /// Column for a site
    pub fn column(&self, site: SiteIdx) -> &SiteColumn {
        &self.columns[site.as_usize()]
    }

    /// All columns
    pub fn columns(&self) -> &[SiteColumn] {
        &self.columns
    }

    /// Derived-allele count at every site
    pub fn frequencies(&self) -> Vec<u32> {
        self.columns.iter().map(|c| c.derived_count() as u32).collect()
    }

    /// Materialize one sample's haplotype
    pub fn sample_haplotype(&self, sample: SampleIdx) -> Vec<u8> {
        let k = sample.as_usize();
        self.columns.iter().map(|c| c.get(k)).collect()
    }

    /// Total memory usage in bytes (approximate)
    pub fn size_bytes(&self) -> usize {
        self.columns.iter().map(|c| c.size_bytes()).sum::<usize>() + std::mem::size_of::<Self>()
    }
}
