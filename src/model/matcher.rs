//! # Ancestor Matcher
//!
//! ## Role
//! Holds a growing library of ancestral haplotypes, stored column-wise as
//! run-length encoded chains, and finds the most likely copying path of a
//! query haplotype through that library.
//!
//! ## Storage
//! Each site owns one chain over ancestor indices `[0, num_ancestors)`. The
//! library starts with the root ancestor 0 (all zeros). Appending an
//! ancestor extends every site chain by one index, merging into the last run
//! when the allele repeats, so related ancestors added in sequence cost one
//! run per allele change rather than one entry per ancestor.
//!
//! ## Forward Pass
//! A Viterbi recursion under a Li and Stephens copying model. The likelihood
//! vector `V` over ancestors is kept as a chain too. At each known site:
//! 1. Find the maximum of `V` and the ancestor achieving it (the best
//!    recombination target), then scale `V` so its maximum is 1.
//! 2. Walk `V` intersected with the site's allele chain. On each piece,
//!    staying costs `V * qr` and recombining onto the best ancestor costs
//!    `pr`. Where recombining wins (ties included) the piece is recorded in
//!    the traceback.
//! 3. Multiply by the emission: `qm` on match, `pm` on mismatch and 0 where
//!    the ancestor is unknown at this site.
//!
//! Every step costs time proportional to the number of runs in `V` plus the
//! runs of the site chain, never the number of ancestors.

use tracing::{debug, trace};

use crate::data::haplotype::{is_valid_allele, AncestorIdx, UNKNOWN_ALLELE};
use crate::error::{AncestralError, Result};
use crate::model::parameters::ModelParams;
use crate::model::path::CopyingPath;
use crate::model::segment::{intersect, Chain, Segment, SegmentArena};
use crate::model::traceback::Traceback;
use crate::utils::workspace::MatchWorkspace;

/// Library of ancestral haplotypes with compressed per-site storage
#[derive(Clone, Debug)]
pub struct AncestorMatcher {
    num_sites: usize,
    num_ancestors: usize,
    arena: SegmentArena<u8>,
    sites: Vec<Chain>,
}

impl AncestorMatcher {
    /// Library over `num_sites` holding only the root ancestor
    pub fn new(num_sites: usize) -> Self {
        let mut arena = SegmentArena::with_capacity(num_sites);
        let sites = (0..num_sites).map(|_| arena.single(0, 1, 0u8)).collect();
        Self {
            num_sites,
            num_ancestors: 1,
            arena,
            sites,
        }
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    /// Ancestors in the library, root included
    pub fn num_ancestors(&self) -> usize {
        self.num_ancestors
    }

    /// Runs stored across all site chains
    pub fn total_segments(&self) -> usize {
        self.arena.len()
    }

    /// Allele runs at one site
    pub fn site_runs(&self, site: usize) -> impl Iterator<Item = &Segment<u8>> + '_ {
        self.arena.iter(self.sites[site])
    }

    /// Site chain rendered as `(start-end:allele)=>...`
    pub fn site_chain(&self, site: usize) -> String {
        self.arena.display(self.sites[site]).to_string()
    }

    fn check_haplotype(&self, h: &[u8]) -> Result<()> {
        if h.len() != self.num_sites {
            return Err(AncestralError::shape("haplotype length", self.num_sites, h.len()));
        }
        if let Some(site) = h.iter().position(|&a| !is_valid_allele(a)) {
            return Err(AncestralError::InvalidAllele {
                site,
                value: h[site],
            });
        }
        Ok(())
    }

    /// Append `h` as the next ancestor.
    ///
    /// Unknown entries are stored as such and never match a query allele.
    pub fn add(&mut self, h: &[u8]) -> Result<()> {
        self.check_haplotype(h)?;

        let x = self.num_ancestors as u32;
        for (chain, &allele) in self.sites.iter_mut().zip(h) {
            self.arena.extend_by_one(chain, x, allele);
        }
        self.num_ancestors += 1;

        if cfg!(debug_assertions) {
            for (l, &chain) in self.sites.iter().enumerate() {
                let covered = self.arena.last(chain).map_or(0, |s| s.end);
                if covered as usize != self.num_ancestors {
                    return Err(AncestralError::invariant(format!(
                        "site {} covers {} ancestors after add, expected {}",
                        l, covered, self.num_ancestors
                    )));
                }
            }
        }

        trace!(
            ancestor = x,
            segments = self.arena.len(),
            "Added ancestor to matcher"
        );
        Ok(())
    }

    /// Most likely copying path for `h` with a fresh workspace
    pub fn best_path(&self, h: &[u8], rho: f64, theta: f64) -> Result<CopyingPath> {
        let params = ModelParams::new(rho, theta)?;
        let mut workspace = MatchWorkspace::new();
        self.best_path_with(h, &params, &mut workspace)
    }

    /// Most likely copying path for `h`, reusing the buffers in `workspace`.
    ///
    /// The path starts at the first known site of `h` and runs until the
    /// site before the next unknown (or the last site). Fails with
    /// [`AncestralError::EmptyQuery`] when `h` has no known site.
    pub fn best_path_with(
        &self,
        h: &[u8],
        params: &ModelParams,
        workspace: &mut MatchWorkspace,
    ) -> Result<CopyingPath> {
        self.check_haplotype(h)?;
        params.validate()?;
        let start_site = h
            .iter()
            .position(|&a| a != UNKNOWN_ALLELE)
            .ok_or(AncestralError::EmptyQuery)?;

        let n = self.num_ancestors as u32;
        let probs = params.probs(self.num_ancestors);

        workspace.reset(self.num_sites);
        let mut v = workspace.fwd.single(0, n, 1.0);
        let mut end_site = start_site;

        for l in start_site..self.num_sites {
            let allele = h[l];
            if allele == UNKNOWN_ALLELE {
                break;
            }
            end_site = l;

            let (max_value, best) = Self::argmax(&workspace.fwd, v);
            workspace.fwd.for_each_value_mut(v, |value| *value /= max_value);

            let mut next = Chain::EMPTY;
            for (start, end, value, state) in
                intersect(workspace.fwd.iter(v), self.arena.iter(self.sites[l]))
            {
                let x = value * probs.qr;
                let y = probs.pr;
                let z = if y >= x {
                    workspace.traceback.add_recombination(l, start, end, best);
                    y
                } else {
                    x
                };
                let emitted = if state == UNKNOWN_ALLELE {
                    0.0
                } else if state == allele {
                    z * probs.qm
                } else {
                    z * probs.pm
                };
                workspace.fwd_next.push_coalesce(&mut next, start, end, emitted);
            }

            workspace.swap_forward();
            v = next;

            if cfg!(debug_assertions) {
                workspace.fwd.check_coverage(v, n)?;
            }
        }

        let (_, best) = Self::argmax(&workspace.fwd, v);
        let ancestors = workspace.traceback.run(start_site, end_site, best);
        Ok(CopyingPath {
            start_site,
            end_site,
            ancestors,
        })
    }

    /// Maximum likelihood and the highest ancestor index attaining it
    fn argmax(arena: &SegmentArena<f64>, v: Chain) -> (f64, AncestorIdx) {
        let mut max_value = -1.0;
        let mut best = AncestorIdx::ROOT;
        for seg in arena.iter(v) {
            if seg.value >= max_value {
                max_value = seg.value;
                best = AncestorIdx::new(seg.end - 1);
            }
        }
        (max_value, best)
    }

    /// Backtrack through `traceback` from `end_value` at `end_site`
    pub fn run_traceback(
        &self,
        traceback: &Traceback,
        start_site: usize,
        end_site: usize,
        end_value: AncestorIdx,
    ) -> Result<Vec<Option<AncestorIdx>>> {
        if traceback.num_sites() != self.num_sites {
            return Err(AncestralError::shape(
                "traceback sites",
                self.num_sites,
                traceback.num_sites(),
            ));
        }
        if start_site > end_site || end_site >= self.num_sites {
            return Err(AncestralError::parameter(format!(
                "invalid traceback span [{}, {}] for {} sites",
                start_site, end_site, self.num_sites
            )));
        }
        if end_value.as_usize() >= self.num_ancestors {
            return Err(AncestralError::parameter(format!(
                "ancestor {} out of range for {} ancestors",
                end_value, self.num_ancestors
            )));
        }
        Ok(traceback.run(start_site, end_site, end_value))
    }

    /// Expand the library to a dense `num_ancestors × num_sites` matrix
    pub fn decode_ancestors(&self) -> Result<Vec<Vec<u8>>> {
        self.check_coverage()?;
        let mut rows = vec![vec![UNKNOWN_ALLELE; self.num_sites]; self.num_ancestors];
        for (l, &chain) in self.sites.iter().enumerate() {
            for seg in self.arena.iter(chain) {
                for row in &mut rows[seg.start as usize..seg.end as usize] {
                    row[l] = seg.value;
                }
            }
        }
        Ok(rows)
    }

    /// Expand a traceback to a dense `num_ancestors × num_sites` matrix
    pub fn decode_traceback(&self, traceback: &Traceback) -> Result<Vec<Vec<AncestorIdx>>> {
        if traceback.num_sites() != self.num_sites {
            return Err(AncestralError::shape(
                "traceback sites",
                self.num_sites,
                traceback.num_sites(),
            ));
        }
        Ok(traceback.decode(self.num_ancestors))
    }

    /// Every site chain must cover exactly `[0, num_ancestors)`
    pub fn check_coverage(&self) -> Result<()> {
        for (l, &chain) in self.sites.iter().enumerate() {
            self.arena
                .check_coverage(chain, self.num_ancestors as u32)
                .map_err(|e| match e {
                    AncestralError::InvariantViolation { message } => {
                        AncestralError::invariant(format!("site {}: {}", l, message))
                    }
                    other => other,
                })?;
        }
        Ok(())
    }

    /// Log every site chain at debug level
    pub fn log_state(&self) {
        debug!(
            num_sites = self.num_sites,
            num_ancestors = self.num_ancestors,
            segments = self.arena.len(),
            "Matcher state"
        );
        for l in 0..self.num_sites {
            debug!(site = l, chain = %self.arena.display(self.sites[l]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const U: u8 = UNKNOWN_ALLELE;

    fn matcher_with(num_sites: usize, ancestors: &[&[u8]]) -> AncestorMatcher {
        let mut m = AncestorMatcher::new(num_sites);
        for h in ancestors {
            m.add(h).unwrap();
        }
        m
    }

    fn ids(path: &CopyingPath) -> Vec<Option<u32>> {
        path.ancestors.iter().map(|a| a.map(|a| a.0)).collect()
    }

    #[test]
    fn test_new_holds_root() {
        let m = AncestorMatcher::new(4);
        assert_eq!(m.num_ancestors(), 1);
        assert_eq!(m.total_segments(), 4);
        assert_eq!(m.decode_ancestors().unwrap(), vec![vec![0; 4]]);
    }

    #[test]
    fn test_add_compresses_runs() {
        let m = matcher_with(3, &[&[1, 0, 1], &[1, 0, 0]]);
        assert_eq!(m.site_chain(0), "(0-1:0)=>(1-3:1)");
        assert_eq!(m.site_chain(1), "(0-3:0)");
        assert_eq!(m.site_chain(2), "(0-1:0)=>(1-2:1)=>(2-3:0)");
        assert_eq!(m.total_segments(), 6);
    }

    #[test]
    fn test_add_rejects_bad_input() {
        let mut m = AncestorMatcher::new(3);
        assert!(matches!(
            m.add(&[0, 1]),
            Err(AncestralError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            m.add(&[0, 2, 1]),
            Err(AncestralError::InvalidAllele { site: 1, value: 2 })
        ));
        assert_eq!(m.num_ancestors(), 1);
    }

    #[test]
    fn test_decode_round_trip_with_unknowns() {
        let a: &[u8] = &[U, 1, 1, 0];
        let b: &[u8] = &[1, 1, U, U];
        let m = matcher_with(4, &[a, b]);
        let dense = m.decode_ancestors().unwrap();
        assert_eq!(dense, vec![vec![0, 0, 0, 0], a.to_vec(), b.to_vec()]);
    }

    #[test]
    fn test_root_only_library() {
        let m = AncestorMatcher::new(5);
        let path = m.best_path(&[0, 1, 0, 1, 1], 1.0, 0.01).unwrap();
        assert_eq!(path.start_site, 0);
        assert_eq!(path.end_site, 4);
        assert_eq!(ids(&path), vec![Some(0); 5]);
    }

    #[test]
    fn test_exact_copy_is_found() {
        let a1: &[u8] = &[1, 1, 0, 0, 0, 0];
        let a2: &[u8] = &[0, 0, 0, 1, 1, 1];
        let m = matcher_with(6, &[a1, a2]);

        let path = m.best_path(a2, 1.0, 1e-3).unwrap();
        assert_eq!(ids(&path), vec![Some(2); 6]);

        let path = m.best_path(a1, 1.0, 1e-3).unwrap();
        assert_eq!(ids(&path), vec![Some(1); 6]);
    }

    #[test]
    fn test_recombinant_query() {
        let a1: &[u8] = &[1, 1, 1, 0, 0, 0];
        let a2: &[u8] = &[0, 0, 0, 1, 1, 1];
        let m = matcher_with(6, &[a1, a2]);

        let path = m.best_path(&[1, 1, 1, 1, 1, 1], 1.0, 1e-3).unwrap();
        assert_eq!(
            ids(&path),
            vec![Some(1), Some(1), Some(1), Some(2), Some(2), Some(2)]
        );
        assert_eq!(path.num_switches(), 1);
    }

    #[test]
    fn test_leading_and_trailing_unknowns() {
        let m = matcher_with(6, &[&[0, 1, 1, 1, 0, 0]]);
        let path = m.best_path(&[U, 1, 1, U, 0, 0], 1.0, 1e-3).unwrap();
        assert_eq!(path.start_site, 1);
        assert_eq!(path.end_site, 2);
        assert_eq!(ids(&path), vec![None, Some(1), Some(1), None, None, None]);
    }

    #[test]
    fn test_unknown_library_entries_never_match() {
        // Ancestor 1 is unknown where the query has its derived alleles
        let m = matcher_with(4, &[&[U, U, 1, 1], &[1, 1, 1, 1]]);
        let path = m.best_path(&[1, 1, 1, 1], 1.0, 1e-3).unwrap();
        assert_eq!(ids(&path), vec![Some(2); 4]);
    }

    #[test]
    fn test_empty_query() {
        let m = AncestorMatcher::new(3);
        assert!(matches!(
            m.best_path(&[U, U, U], 1.0, 1.0),
            Err(AncestralError::EmptyQuery)
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let m = AncestorMatcher::new(2);
        assert!(m.best_path(&[0, 0], 0.0, 1.0).is_err());
        assert!(m.best_path(&[0, 0], 1.0, -1.0).is_err());
        assert!(m.best_path(&[0], 1.0, 1.0).is_err());
    }

    #[test]
    fn test_workspace_reuse_is_deterministic() {
        let m = matcher_with(5, &[&[1, 1, 0, 0, 0], &[0, 1, 1, 1, 0], &[0, 0, 0, 1, 1]]);
        let params = ModelParams::new(0.5, 1e-2).unwrap();
        let mut ws = MatchWorkspace::new();

        let queries: [&[u8]; 3] = [&[1, 1, 1, 1, 1], &[0, 1, 1, 1, 1], &[1, 1, 0, 1, 1]];
        let first: Vec<_> = queries
            .iter()
            .map(|q| m.best_path_with(q, &params, &mut ws).unwrap())
            .collect();
        let fresh: Vec<_> = queries
            .iter()
            .map(|q| m.best_path(q, 0.5, 1e-2).unwrap())
            .collect();
        assert_eq!(first, fresh);
    }

    #[test]
    fn test_decode_traceback_shape() {
        let m = matcher_with(4, &[&[1, 1, 0, 0], &[0, 0, 1, 1]]);
        let params = ModelParams::new(1.0, 1e-3).unwrap();
        let mut ws = MatchWorkspace::new();
        m.best_path_with(&[1, 1, 1, 1], &params, &mut ws).unwrap();

        let dense = m.decode_traceback(&ws.traceback).unwrap();
        assert_eq!(dense.len(), 3);
        assert!(dense.iter().all(|row| row.len() == 4));

        assert!(m.decode_traceback(&Traceback::new(2)).is_err());
    }

    #[test]
    fn test_run_traceback_validates_span() {
        let m = AncestorMatcher::new(3);
        let tb = Traceback::new(3);
        assert!(m.run_traceback(&tb, 2, 1, AncestorIdx::ROOT).is_err());
        assert!(m.run_traceback(&tb, 0, 3, AncestorIdx::ROOT).is_err());
        assert!(m.run_traceback(&tb, 0, 2, AncestorIdx(1)).is_err());
        assert_eq!(
            m.run_traceback(&tb, 0, 2, AncestorIdx::ROOT).unwrap(),
            vec![Some(AncestorIdx::ROOT); 3]
        );
    }
}
