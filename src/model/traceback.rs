//! # Compressed Traceback
//!
//! Per-site chains recording where the forward pass preferred recombining
//! onto the best lineage over staying put. A run `[start, end) -> a` at site
//! `l` means: any path sitting on an ancestor in `[start, end)` at site `l`
//! came from ancestor `a` at site `l - 1`. Ancestors not covered by any run
//! at `l` stayed on themselves.

use crate::data::haplotype::AncestorIdx;
use crate::model::segment::{Chain, Segment, SegmentArena};

/// Traceback chains for one query, reusable across queries
#[derive(Clone, Debug, Default)]
pub struct Traceback {
    arena: SegmentArena<AncestorIdx>,
    sites: Vec<Chain>,
}

impl Traceback {
    /// Create an empty traceback over `num_sites`
    pub fn new(num_sites: usize) -> Self {
        Self {
            arena: SegmentArena::new(),
            sites: vec![Chain::EMPTY; num_sites],
        }
    }

    /// Drop all recorded runs and resize to `num_sites` (keeps capacity)
    pub fn reset(&mut self, num_sites: usize) {
        self.arena.clear();
        self.sites.clear();
        self.sites.resize(num_sites, Chain::EMPTY);
    }

    pub fn num_sites(&self) -> usize {
        self.sites.len()
    }

    /// Total recorded runs across all sites
    pub fn total_segments(&self) -> usize {
        self.arena.len()
    }

    /// Record that ancestors `[start, end)` at `site` recombined from `ancestor`.
    ///
    /// Runs must arrive in increasing `start` order per site; contiguous runs
    /// with the same source ancestor are merged.
    pub fn add_recombination(&mut self, site: usize, start: u32, end: u32, ancestor: AncestorIdx) {
        self.arena.push_coalesce(&mut self.sites[site], start, end, ancestor);
    }

    /// Recorded runs at a site
    pub fn site_runs(&self, site: usize) -> impl Iterator<Item = &Segment<AncestorIdx>> + '_ {
        self.arena.iter(self.sites[site])
    }

    /// Decode the copying path ending on `end_value` at `end_site`.
    ///
    /// Returns one entry per site; sites outside `[start_site, end_site]` are `None`.
    pub fn run(
        &self,
        start_site: usize,
        end_site: usize,
        end_value: AncestorIdx,
    ) -> Vec<Option<AncestorIdx>> {
        let mut path = vec![None; self.sites.len()];
        path[end_site] = Some(end_value);

        let mut current = end_value;
        for l in (start_site + 1..=end_site).rev() {
            if let Some(seg) = self.arena.find(self.sites[l], current.0) {
                current = seg.value;
            }
            path[l - 1] = Some(current);
        }
        path
    }

    /// Dense `num_ancestors × num_sites` matrix of predecessor ancestors.
    ///
    /// Entry `[a][l]` is the ancestor at `l - 1` for a path on `a` at `l`;
    /// uncovered entries map to themselves. Site 0 has no predecessor, so its
    /// column is all root and any runs recorded there are ignored.
    pub fn decode(&self, num_ancestors: usize) -> Vec<Vec<AncestorIdx>> {
        let mut matrix: Vec<Vec<AncestorIdx>> = (0..num_ancestors)
            .map(|a| {
                let mut row = vec![AncestorIdx::from(a); self.sites.len()];
                if let Some(first) = row.first_mut() {
                    *first = AncestorIdx::ROOT;
                }
                row
            })
            .collect();
        for (l, &chain) in self.sites.iter().enumerate().skip(1) {
            for seg in self.arena.iter(chain) {
                for row in &mut matrix[seg.start as usize..seg.end as usize] {
                    row[l] = seg.value;
                }
            }
        }
        matrix
    }

    /// Human-readable chain for one site
    pub fn site_string(&self, site: usize) -> String {
        self.arena.display(self.sites[site]).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(i: u32) -> AncestorIdx {
        AncestorIdx::new(i)
    }

    #[test]
    fn test_add_recombination_coalesces() {
        let mut tb = Traceback::new(3);
        tb.add_recombination(1, 0, 2, a(4));
        tb.add_recombination(1, 2, 3, a(4));
        tb.add_recombination(1, 5, 6, a(4));
        tb.add_recombination(1, 6, 7, a(2));

        assert_eq!(tb.site_string(1), "(0-3:4)=>(5-6:4)=>(6-7:2)");
        assert_eq!(tb.total_segments(), 3);
    }

    #[test]
    fn test_run_follows_recorded_switches() {
        let mut tb = Traceback::new(5);
        // At site 3, ancestors [2, 4) came from ancestor 0
        tb.add_recombination(3, 2, 4, a(0));
        // At site 2, ancestor 0 came from ancestor 1
        tb.add_recombination(2, 0, 1, a(1));

        let path = tb.run(1, 4, a(3));
        assert_eq!(path, vec![None, Some(a(1)), Some(a(0)), Some(a(3)), Some(a(3))]);
    }

    #[test]
    fn test_run_single_site() {
        let tb = Traceback::new(3);
        assert_eq!(tb.run(2, 2, a(5)), vec![None, None, Some(a(5))]);
    }

    #[test]
    fn test_decode_identity_with_overlay() {
        let mut tb = Traceback::new(3);
        tb.add_recombination(1, 1, 3, a(0));
        let m = tb.decode(3);
        assert_eq!(m[0], vec![a(0), a(0), a(0)]);
        assert_eq!(m[1], vec![a(0), a(0), a(1)]);
        assert_eq!(m[2], vec![a(0), a(0), a(2)]);
    }

    #[test]
    fn test_decode_ignores_first_site() {
        let mut tb = Traceback::new(2);
        tb.add_recombination(0, 0, 2, a(1));
        tb.add_recombination(1, 0, 1, a(1));
        let m = tb.decode(2);
        assert_eq!(m[0], vec![a(0), a(1)]);
        assert_eq!(m[1], vec![a(0), a(1)]);
    }

    #[test]
    fn test_reset_clears() {
        let mut tb = Traceback::new(2);
        tb.add_recombination(0, 0, 1, a(0));
        tb.reset(4);
        assert_eq!(tb.num_sites(), 4);
        assert_eq!(tb.total_segments(), 0);
        assert_eq!(tb.site_runs(0).count(), 0);
    }
}
