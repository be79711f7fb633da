//! # Run-Length Encoded Segment Chains
//!
//! Piecewise-constant functions over ancestor indices, stored as singly-linked
//! chains of half-open `[start, end)` runs inside a shared arena.
//!
//! ## Memory Layout
//! Segments live in one growable vector per arena; a [`Chain`] is just the
//! head and tail arena indices of one list, with `next` links as indices
//! (`NIL` terminates). Chains are append-only, so the arena never needs a
//! free list; transient arenas are cleared and reused between queries.
//!
//! Every chain that represents a complete function over the ancestor
//! population is ordered, non-overlapping and contiguous from 0 to the
//! ancestor count. Appends coalesce equal neighbours so the number of runs
//! stays minimal, which is what keeps the matcher proportional to the number
//! of distinct runs rather than the number of ancestors.

use std::fmt;

use crate::error::{AncestralError, Result};

/// Arena index terminating a chain
pub(crate) const NIL: u32 = u32::MAX;

/// One run `[start, end)` of a chain carrying `value`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment<T> {
    pub start: u32,
    pub end: u32,
    pub value: T,
    next: u32,
}

impl<T> Segment<T> {
    /// Number of indices covered
    #[inline]
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[inline]
    pub fn contains(&self, x: u32) -> bool {
        self.start <= x && x < self.end
    }
}

/// Head and tail of one chain inside a [`SegmentArena`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chain {
    head: u32,
    tail: u32,
}

impl Chain {
    pub const EMPTY: Chain = Chain {
        head: NIL,
        tail: NIL,
    };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == NIL
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Arena owning the segments of any number of chains
#[derive(Clone, Debug)]
pub struct SegmentArena<T> {
    segments: Vec<Segment<T>>,
}

impl<T> Default for SegmentArena<T> {
    fn default() -> Self {
        Self {
            segments: Vec::new(),
        }
    }
}

impl<T: Copy + PartialEq> SegmentArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            segments: Vec::with_capacity(capacity),
        }
    }

    /// Drop every chain (keeps capacity)
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Total number of segments across all chains
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn alloc(&mut self, start: u32, end: u32, value: T) -> u32 {
        let idx = self.segments.len() as u32;
        self.segments.push(Segment {
            start,
            end,
            value,
            next: NIL,
        });
        idx
    }

    /// Start a new chain holding a single run
    pub fn single(&mut self, start: u32, end: u32, value: T) -> Chain {
        let idx = self.alloc(start, end, value);
        Chain {
            head: idx,
            tail: idx,
        }
    }

    /// Append a run after the tail without coalescing
    pub fn push_back(&mut self, chain: &mut Chain, start: u32, end: u32, value: T) {
        let idx = self.alloc(start, end, value);
        if chain.is_empty() {
            chain.head = idx;
        } else {
            debug_assert!(self.segments[chain.tail as usize].end <= start);
            self.segments[chain.tail as usize].next = idx;
        }
        chain.tail = idx;
    }

    /// Append a run, merging it into the tail when contiguous and equal-valued
    pub fn push_coalesce(&mut self, chain: &mut Chain, start: u32, end: u32, value: T) {
        if !chain.is_empty() {
            let tail = &mut self.segments[chain.tail as usize];
            if tail.end == start && tail.value == value {
                tail.end = end;
                return;
            }
        }
        self.push_back(chain, start, end, value);
    }

    /// Extend a complete chain over `[0, x)` to `[0, x + 1)` with `value` at `x`.
    ///
    /// The last run grows by one if it already carries `value`; otherwise a unit
    /// run is appended.
    pub fn extend_by_one(&mut self, chain: &mut Chain, x: u32, value: T) {
        self.push_coalesce(chain, x, x + 1, value);
    }

    /// Segment at an arena index
    #[inline]
    pub fn segment(&self, idx: u32) -> &Segment<T> {
        &self.segments[idx as usize]
    }

    /// Last run of a chain
    #[inline]
    pub fn last(&self, chain: Chain) -> Option<&Segment<T>> {
        (!chain.is_empty()).then(|| &self.segments[chain.tail as usize])
    }

    /// Iterate the runs of a chain in order
    pub fn iter(&self, chain: Chain) -> ChainIter<'_, T> {
        ChainIter {
            arena: self,
            cursor: chain.head,
        }
    }

    /// Apply `f` to every value of a chain in place
    pub fn for_each_value_mut(&mut self, chain: Chain, mut f: impl FnMut(&mut T)) {
        let mut cur = chain.head;
        while cur != NIL {
            let seg = &mut self.segments[cur as usize];
            f(&mut seg.value);
            cur = seg.next;
        }
    }

    /// Number of runs in a chain
    pub fn run_count(&self, chain: Chain) -> usize {
        self.iter(chain).count()
    }

    /// Run containing `x`, stopping as soon as a run starts beyond it
    pub fn find(&self, chain: Chain, x: u32) -> Option<&Segment<T>> {
        for seg in self.iter(chain) {
            if seg.contains(x) {
                return Some(seg);
            }
            if seg.start > x {
                break;
            }
        }
        None
    }

    /// Copy a chain out as `(start, end, value)` triples
    pub fn to_runs(&self, chain: Chain) -> Vec<(u32, u32, T)> {
        self.iter(chain).map(|s| (s.start, s.end, s.value)).collect()
    }

    /// Verify the chain covers exactly `[0, end)` with no gaps or overlaps
    pub fn check_coverage(&self, chain: Chain, end: u32) -> Result<()> {
        let mut expected = 0u32;
        for seg in self.iter(chain) {
            if seg.start != expected {
                return Err(AncestralError::invariant(format!(
                    "run starts at {} but previous run ended at {}",
                    seg.start, expected
                )));
            }
            if seg.is_empty() {
                return Err(AncestralError::invariant(format!(
                    "empty run [{}, {})",
                    seg.start, seg.end
                )));
            }
            expected = seg.end;
        }
        if expected != end {
            return Err(AncestralError::invariant(format!(
                "chain ends at {} instead of {}",
                expected, end
            )));
        }
        Ok(())
    }

    /// Displayable view of a chain: `(0-3:1)=>(3-6:0)`
    pub fn display(&self, chain: Chain) -> ChainDisplay<'_, T> {
        ChainDisplay { arena: self, chain }
    }
}

/// Iterator over the runs of one chain
pub struct ChainIter<'a, T> {
    arena: &'a SegmentArena<T>,
    cursor: u32,
}

impl<'a, T> Iterator for ChainIter<'a, T> {
    type Item = &'a Segment<T>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let seg = &self.arena.segments[self.cursor as usize];
        self.cursor = seg.next;
        Some(seg)
    }
}

/// Lazy intersection of two chains over the same domain.
///
/// Yields `(start, end, a_value, b_value)` for each maximal subinterval on
/// which both chains are constant, in increasing `start` order.
pub struct Intersection<'a, A, B> {
    a: ChainIter<'a, A>,
    b: ChainIter<'a, B>,
    cur_a: Option<&'a Segment<A>>,
    cur_b: Option<&'a Segment<B>>,
}

/// Intersect two chains, possibly living in different arenas
pub fn intersect<'a, A: Copy, B: Copy>(
    mut a: ChainIter<'a, A>,
    mut b: ChainIter<'a, B>,
) -> Intersection<'a, A, B> {
    let cur_a = a.next();
    let cur_b = b.next();
    Intersection { a, b, cur_a, cur_b }
}

impl<'a, A: Copy, B: Copy> Iterator for Intersection<'a, A, B> {
    type Item = (u32, u32, A, B);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let sa = self.cur_a?;
            let sb = self.cur_b?;
            let start = sa.start.max(sb.start);
            let end = sa.end.min(sb.end);

            // Advance whichever run ends first; both on a tie
            if sa.end <= sb.end {
                self.cur_a = self.a.next();
            }
            if sb.end <= sa.end {
                self.cur_b = self.b.next();
            }

            if start < end {
                return Some((start, end, sa.value, sb.value));
            }
        }
    }
}

/// Display adapter returned by [`SegmentArena::display`]
pub struct ChainDisplay<'a, T> {
    arena: &'a SegmentArena<T>,
    chain: Chain,
}

impl<T: fmt::Display> fmt::Display for ChainDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cur = self.chain.head;
        let mut first = true;
        while cur != NIL {
            let seg = &self.arena.segments[cur as usize];
            if !first {
                write!(f, "=>")?;
            }
            write!(f, "({}-{}:{})", seg.start, seg.end, seg.value)?;
            first = false;
            cur = seg.next;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_from(arena: &mut SegmentArena<char>, runs: &[(u32, u32, char)]) -> Chain {
        let mut chain = Chain::EMPTY;
        for &(s, e, v) in runs {
            arena.push_back(&mut chain, s, e, v);
        }
        chain
    }

    #[test]
    fn test_intersection_example() {
        let mut arena_a = SegmentArena::new();
        let mut arena_b = SegmentArena::new();
        let a = chain_from(&mut arena_a, &[(0, 3, 'x'), (3, 6, 'y')]);
        let b = chain_from(&mut arena_b, &[(0, 2, 'p'), (2, 4, 'q'), (4, 6, 'r')]);

        let got: Vec<_> = intersect(arena_a.iter(a), arena_b.iter(b)).collect();
        assert_eq!(
            got,
            vec![
                (0, 2, 'x', 'p'),
                (2, 3, 'x', 'q'),
                (3, 4, 'y', 'q'),
                (4, 6, 'y', 'r'),
            ]
        );
    }

    #[test]
    fn test_intersection_shared_boundaries() {
        let mut arena = SegmentArena::new();
        let a = chain_from(&mut arena, &[(0, 2, 'a'), (2, 5, 'b')]);
        let b = chain_from(&mut arena, &[(0, 2, 'c'), (2, 5, 'd')]);

        let got: Vec<_> = intersect(arena.iter(a), arena.iter(b)).collect();
        assert_eq!(got, vec![(0, 2, 'a', 'c'), (2, 5, 'b', 'd')]);
    }

    #[test]
    fn test_intersection_with_empty_chain() {
        let mut arena = SegmentArena::new();
        let a = chain_from(&mut arena, &[(0, 4, 'a')]);
        assert_eq!(intersect(arena.iter(a), arena.iter(Chain::EMPTY)).count(), 0);
    }

    #[test]
    fn test_extend_by_one_compresses() {
        let mut arena = SegmentArena::new();
        let mut chain = arena.single(0, 1, 0u8);

        arena.extend_by_one(&mut chain, 1, 0);
        assert_eq!(arena.run_count(chain), 1);

        arena.extend_by_one(&mut chain, 2, 1);
        assert_eq!(arena.run_count(chain), 2);

        arena.extend_by_one(&mut chain, 3, 1);
        assert_eq!(arena.run_count(chain), 2);
        assert_eq!(arena.to_runs(chain), vec![(0, 2, 0), (2, 4, 1)]);
        assert!(arena.check_coverage(chain, 4).is_ok());
    }

    #[test]
    fn test_check_coverage_detects_gaps() {
        let mut arena = SegmentArena::new();
        let gap = chain_from(&mut arena, &[(0, 2, 'a'), (3, 5, 'b')]);
        assert!(matches!(
            arena.check_coverage(gap, 5),
            Err(AncestralError::InvariantViolation { .. })
        ));

        let short = chain_from(&mut arena, &[(0, 2, 'a')]);
        assert!(arena.check_coverage(short, 3).is_err());

        let late_start = chain_from(&mut arena, &[(1, 3, 'a')]);
        assert!(arena.check_coverage(late_start, 3).is_err());
    }

    #[test]
    fn test_find_and_mutate() {
        let mut arena = SegmentArena::new();
        let chain = {
            let mut c = Chain::EMPTY;
            arena.push_back(&mut c, 0, 2, 1.0f64);
            arena.push_back(&mut c, 4, 6, 3.0);
            c
        };

        assert_eq!(arena.find(chain, 5).map(|s| s.value), Some(3.0));
        assert!(arena.find(chain, 3).is_none());

        arena.for_each_value_mut(chain, |v| *v /= 3.0);
        assert_eq!(arena.find(chain, 0).map(|s| s.value), Some(1.0 / 3.0));
    }

    #[test]
    fn test_display() {
        let mut arena = SegmentArena::new();
        let mut chain = arena.single(0, 3, 1u8);
        arena.push_coalesce(&mut chain, 3, 4, 0);
        assert_eq!(arena.display(chain).to_string(), "(0-3:1)=>(3-4:0)");
        assert_eq!(arena.display(Chain::EMPTY).to_string(), "");
    }
}
