//! # Workspace Pattern for Matcher Buffers
//!
//! Reusable arenas for the compressed forward pass so repeated queries do not
//! reallocate. The matcher itself stays immutable during a query; all
//! per-query state lives here and is passed as `&mut MatchWorkspace`.
//!
//! One workspace per worker thread: with rayon, create it through
//! `map_init` so each worker keeps its own.

use crate::model::segment::SegmentArena;
use crate::model::traceback::Traceback;

/// Per-query buffers for [`AncestorMatcher`](crate::model::matcher::AncestorMatcher)
#[derive(Clone, Debug, Default)]
pub struct MatchWorkspace {
    /// Forward likelihoods at the current site
    pub fwd: SegmentArena<f64>,

    /// Forward likelihoods being built for the next site
    pub fwd_next: SegmentArena<f64>,

    /// Recorded recombination runs for the current query
    pub traceback: Traceback,
}

impl MatchWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Workspace pre-sized for `n_sites` and roughly `runs` segments per chain
    pub fn with_capacity(n_sites: usize, runs: usize) -> Self {
        Self {
            fwd: SegmentArena::with_capacity(runs),
            fwd_next: SegmentArena::with_capacity(runs),
            traceback: Traceback::new(n_sites),
        }
    }

    /// Clear all buffers and size the traceback for `n_sites`
    pub fn reset(&mut self, n_sites: usize) {
        self.fwd.clear();
        self.fwd_next.clear();
        self.traceback.reset(n_sites);
    }

    /// Promote the next-site buffer to current and clear the old current
    pub fn swap_forward(&mut self) {
        std::mem::swap(&mut self.fwd, &mut self.fwd_next);
        self.fwd_next.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AncestorIdx;

    #[test]
    fn test_reset_sizes_traceback() {
        let mut ws = MatchWorkspace::new();
        ws.traceback.add_recombination(0, 0, 1, AncestorIdx::ROOT);
        ws.reset(7);
        assert_eq!(ws.traceback.num_sites(), 7);
        assert_eq!(ws.traceback.total_segments(), 0);
        assert!(ws.fwd.is_empty());
    }

    #[test]
    fn test_swap_forward() {
        let mut ws = MatchWorkspace::with_capacity(3, 8);
        let _ = ws.fwd.single(0, 2, 1.0);
        let next = ws.fwd_next.single(0, 2, 0.5);
        ws.swap_forward();
        assert_eq!(ws.fwd.to_runs(next), vec![(0, 2, 0.5)]);
        assert!(ws.fwd_next.is_empty());
    }
}
