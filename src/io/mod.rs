//! # I/O Module
//!
//! File reading/writing boundaries. Converts between text formats on disk
//! and the in-memory `SampleMatrix`, ancestors and copying paths.

pub mod matrix;
pub mod writer;

pub use matrix::{parse_sample_matrix, read_sample_matrix};
pub use writer::{write_ancestors, AncestorRecord, PathKind, PathWriter};
