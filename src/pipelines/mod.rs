//! # Pipeline Module
//!
//! High-level orchestration of the inference workflow.
//! Coordinates I/O, ancestor building and matching.

pub mod inference;

pub use inference::{Inference, InferencePipeline, InferenceSummary};
