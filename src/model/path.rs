//! # Copying Paths
//!
//! The decoded result of one query: which ancestor the query copies from at
//! each site of its known span.

use serde::{Deserialize, Serialize};

use crate::data::haplotype::{AncestorIdx, SiteIdx};

/// Most likely copying path for a query haplotype.
///
/// `ancestors[l]` is `Some` exactly for `start_site <= l <= end_site`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyingPath {
    /// First site with a known allele
    pub start_site: usize,
    /// Last site of the leading known span (inclusive)
    pub end_site: usize,
    /// Parent ancestor per site
    pub ancestors: Vec<Option<AncestorIdx>>,
}

/// Maximal interval of sites copied from one parent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRun {
    /// First site (inclusive)
    pub left: SiteIdx,
    /// One past the last site
    pub right: SiteIdx,
    pub parent: AncestorIdx,
}

impl CopyingPath {
    /// Number of sites the path spans (including undefined positions)
    pub fn num_sites(&self) -> usize {
        self.ancestors.len()
    }

    /// Number of sites with a defined parent
    pub fn span(&self) -> usize {
        self.end_site + 1 - self.start_site
    }

    #[inline]
    pub fn get(&self, site: usize) -> Option<AncestorIdx> {
        self.ancestors.get(site).copied().flatten()
    }

    /// Collapse the path into parent runs, left to right
    pub fn runs(&self) -> Vec<PathRun> {
        let mut runs: Vec<PathRun> = Vec::new();
        for l in self.start_site..=self.end_site {
            let Some(parent) = self.get(l) else {
                continue;
            };
            match runs.last_mut() {
                Some(run) if run.parent == parent && run.right.as_usize() == l => {
                    run.right = SiteIdx::from(l + 1);
                }
                _ => runs.push(PathRun {
                    left: SiteIdx::from(l),
                    right: SiteIdx::from(l + 1),
                    parent,
                }),
            }
        }
        runs
    }

    /// Number of parent switches along the path
    pub fn num_switches(&self) -> usize {
        self.runs().len().saturating_sub(1)
    }
}
