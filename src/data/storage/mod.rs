//! # Sample Storage
//!
//! ## Role
//! Bit-packed storage for the binary samples × sites matrix that feeds the
//! ancestor builder. Columns are per site because every consumer walks sites
//! and asks for the carriers or frequency of one site at a time.

pub mod dense;

pub use dense::{SampleMatrix, SiteColumn};
