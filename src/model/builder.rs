//! # Ancestor Builder
//!
//! ## Role
//! Reconstruct ancestral haplotypes from the sample matrix by consensus,
//! one focal site at a time, oldest (highest frequency) first.
//!
//! ## Algorithm
//! For a focal site, the samples carrying the derived allele there vote on
//! every other site, walking outward to the left and then to the right:
//! - only sites already resolved (built at or before this ancestor) can vote
//!   for the derived allele, so younger mutations never leak into older
//!   ancestors;
//! - the ancestor takes the derived allele when at least half of the still
//!   consistent samples carry it;
//! - a sample leaves the vote once it has shown all four
//!   `(ancestor, sample)` allele pairs against the ancestor built so far
//!   (four-gamete test). The walk stops once no sample is left, and sites
//!   beyond that point stay unknown.
//!
//! Ancestors depend on the resolved-site mask accumulated by earlier builds,
//! so [`AncestorBuilder::build`] refuses to go backwards in the frequency
//! ranking and [`AncestorBuilder::build_all`] drives the whole sequence.

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::haplotype::{known_span, SiteIdx, UNKNOWN_ALLELE};
use crate::data::storage::SampleMatrix;
use crate::error::{AncestralError, Result};

/// All four `(ancestor, sample)` pairs observed
const ALL_PAIRS: u8 = 0b1111;

/// Bit for the `(ancestor, sample)` allele pair
#[inline]
fn pair_bit(ancestor: u8, sample: u8) -> u8 {
    1 << (ancestor * 2 + sample)
}

/// Span, focal sites and age of one reconstructed ancestor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AncestorDescriptor {
    /// First known site
    pub start: SiteIdx,
    /// One past the last known site
    pub end: SiteIdx,
    /// Sites whose derived allele this ancestor introduces
    pub focal_sites: Vec<SiteIdx>,
    /// Derived-allele frequency of the focal site; larger is older
    pub time: u32,
}

/// A reconstructed haplotype together with its descriptor
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ancestor {
    pub haplotype: Vec<u8>,
    pub descriptor: AncestorDescriptor,
}

/// Builds ancestors for the non-singleton sites of a sample matrix
#[derive(Clone, Debug)]
pub struct AncestorBuilder {
    matrix: SampleMatrix,
    frequency: Vec<u32>,
    /// Sites by descending frequency
    site_order: Vec<SiteIdx>,
    /// Sites already assigned a place in time
    site_mask: BitVec<u64, Lsb0>,
    num_ancestors: usize,
    last_built: Option<usize>,
}

impl AncestorBuilder {
    /// Create a builder, checking the matrix against the declared dimensions
    pub fn new(num_samples: usize, num_sites: usize, matrix: SampleMatrix) -> Result<Self> {
        if matrix.n_samples() != num_samples {
            let found = matrix.n_samples();
            return Err(AncestralError::shape("sample matrix rows", num_samples, found));
        }
        if matrix.n_sites() != num_sites {
            return Err(AncestralError::shape("sample matrix columns", num_sites, matrix.n_sites()));
        }

        let frequency = matrix.frequencies();
        let num_ancestors = frequency.iter().filter(|&&f| f > 1).count();

        // Stable ascending sort reversed: equal frequencies rank the higher site first
        let mut order: Vec<usize> = (0..num_sites).collect();
        order.sort_by_key(|&l| frequency[l]);
        let site_order = order.into_iter().rev().map(SiteIdx::from).collect();

        Ok(Self {
            matrix,
            frequency,
            site_order,
            site_mask: bitvec![u64, Lsb0; 0; num_sites],
            num_ancestors,
            last_built: None,
        })
    }

    /// Number of samples in the matrix
    pub fn num_samples(&self) -> usize {
        self.matrix.n_samples()
    }

    /// Number of sites in the matrix
    pub fn num_sites(&self) -> usize {
        self.matrix.n_sites()
    }

    /// Number of ancestors to build (sites with frequency > 1)
    pub fn num_ancestors(&self) -> usize {
        self.num_ancestors
    }

    /// Derived-allele count per site
    pub fn frequency(&self) -> &[u32] {
        &self.frequency
    }

    /// Sites in build order
    pub fn site_order(&self) -> &[SiteIdx] {
        &self.site_order
    }

    /// The underlying sample matrix
    pub fn matrix(&self) -> &SampleMatrix {
        &self.matrix
    }

    /// Build the ancestor for the `site_index`-th site of the frequency ranking.
    ///
    /// Calls must be made in non-decreasing `site_index` order.
    pub fn build(&mut self, site_index: usize) -> Result<Vec<u8>> {
        if site_index >= self.site_order.len() {
            return Err(AncestralError::parameter(format!(
                "site index {} out of range for {} sites",
                site_index,
                self.site_order.len()
            )));
        }
        if let Some(last) = self.last_built {
            if site_index < last {
                return Err(AncestralError::OutOfOrder {
                    requested: site_index,
                    last,
                });
            }
        }
        self.last_built = Some(site_index);
        Ok(self.make_ancestor(site_index))
    }

    /// Build the ancestor and attach its descriptor
    pub fn build_ancestor(&mut self, site_index: usize) -> Result<Ancestor> {
        let haplotype = self.build(site_index)?;
        Ok(self.describe(site_index, haplotype))
    }

    /// Consume the builder, yielding the remaining non-singleton ancestors
    /// oldest first. Resumes after the last index passed to [`Self::build`].
    pub fn build_all(self) -> AncestorIter {
        let next = self.last_built.map_or(0, |last| last + 1);
        AncestorIter {
            builder: self,
            next,
        }
    }

    fn describe(&self, site_index: usize, haplotype: Vec<u8>) -> Ancestor {
        let site = self.site_order[site_index];
        // The focal site is always known
        let (start, end) =
            known_span(&haplotype).unwrap_or((site.as_usize(), site.as_usize() + 1));
        Ancestor {
            descriptor: AncestorDescriptor {
                start: SiteIdx::from(start),
                end: SiteIdx::from(end),
                focal_sites: vec![site],
                time: self.frequency[site.as_usize()],
            },
            haplotype,
        }
    }

    fn make_ancestor(&mut self, site_index: usize) -> Vec<u8> {
        let site = self.site_order[site_index].as_usize();
        let num_sites = self.num_sites();
        self.site_mask.set(site, true);

        let carriers: Vec<usize> = self.matrix.column(SiteIdx::from(site)).carriers().collect();
        let mut ancestor = vec![UNKNOWN_ALLELE; num_sites];
        ancestor[site] = 1;

        self.walk(&carriers, (0..site).rev(), &mut ancestor);
        self.walk(&carriers, site + 1..num_sites, &mut ancestor);

        debug!(
            site,
            frequency = self.frequency[site],
            carriers = carriers.len(),
            span = ?known_span(&ancestor),
            "built ancestor"
        );
        ancestor
    }

    /// Consensus walk away from the focal site over `sites`
    fn walk(&self, carriers: &[usize], sites: impl Iterator<Item = usize>, ancestor: &mut [u8]) {
        // Every carrier starts having shown (1, 1) at the focal site
        let mut patterns = vec![pair_bit(1, 1); carriers.len()];
        let mut active = bitvec![u64, Lsb0; 1; carriers.len()];
        let mut n_active = carriers.len();

        for l in sites {
            if n_active == 0 {
                break;
            }
            let column = self.matrix.column(SiteIdx::from(l));
            let resolved = self.site_mask[l];

            let derived = if resolved {
                active.iter_ones().filter(|&k| column.get(carriers[k]) == 1).count()
            } else {
                0
            };
            let allele = (2 * derived >= n_active) as u8;
            ancestor[l] = allele;

            for k in 0..carriers.len() {
                if !active[k] {
                    continue;
                }
                patterns[k] |= pair_bit(allele, column.get(carriers[k]));
                if patterns[k] == ALL_PAIRS {
                    active.set(k, false);
                    n_active -= 1;
                }
            }
        }
    }
}

/// Lazy, finite, non-restartable sequence of ancestors in build order
pub struct AncestorIter {
    builder: AncestorBuilder,
    next: usize,
}

impl AncestorIter {
    /// The builder driving this iterator
    pub fn builder(&self) -> &AncestorBuilder {
        &self.builder
    }

    /// Stop building and hand back the sample matrix
    pub fn into_matrix(self) -> SampleMatrix {
        self.builder.matrix
    }
}

impl Iterator for AncestorIter {
    type Item = Ancestor;

    fn next(&mut self) -> Option<Ancestor> {
        if self.next >= self.builder.num_ancestors {
            return None;
        }
        let site_index = self.next;
        self.next += 1;
        self.builder.last_built = Some(site_index);
        let haplotype = self.builder.make_ancestor(site_index);
        Some(self.builder.describe(site_index, haplotype))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.builder.num_ancestors.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AncestorIter {}
