//! # Model Module
//!
//! Ancestor reconstruction and copying-path inference.
//!
//! ## Core Algorithms
//! - `builder`: Consensus reconstruction of ancestral haplotypes, oldest first
//! - `matcher`: Compressed Viterbi forward pass over a growing ancestor library
//! - `segment`: Arena-backed run-length chains shared by both
//! - `traceback`: Per-site recombination records and path decoding
//! - `parameters`: Recombination and mutation rates

pub mod builder;
pub mod matcher;
pub mod parameters;
pub mod path;
pub mod segment;
pub mod traceback;

pub use builder::{Ancestor, AncestorBuilder, AncestorDescriptor};
pub use matcher::AncestorMatcher;
pub use parameters::{ModelParams, TransitionProbs};
pub use path::{CopyingPath, PathRun};
pub use traceback::Traceback;
