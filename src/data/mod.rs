//! # Data Module
//!
//! In-memory representations of sample data and haplotypes.
//!
//! ## Design Philosophy
//! - **Zero-cost newtypes:** `SiteIdx`, `AncestorIdx`, `SampleIdx` prevent index
//!   mix-ups at compile time with no runtime overhead.
//! - **Column-major storage:** the sample matrix is stored per site so that
//!   frequency counts and carrier scans are contiguous.

pub mod haplotype;
pub mod storage;

// Re-export commonly used types
pub use haplotype::{AncestorIdx, SampleIdx, SiteIdx, UNKNOWN_ALLELE};
pub use storage::{SampleMatrix, SiteColumn};
