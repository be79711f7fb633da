//! # Ancestral
//!
//! Reconstruction of ancestral haplotypes from sampled haplotypes and
//! inference of the copying paths that thread samples and ancestors through
//! them.
//!
//! ## Modules
//! - `config`: CLI argument parsing and validation
//! - `data`: Index newtypes, allele encoding and the sample matrix
//! - `error`: Error types and result aliases
//! - `io`: Sample matrix reader, ancestor and path writers
//! - `model`: Ancestor builder, run-length chains and the matcher
//! - `pipelines`: End-to-end inference workflow
//! - `utils`: Telemetry and reusable workspaces

pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod model;
pub mod pipelines;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use data::haplotype::{AncestorIdx, SampleIdx, SiteIdx, UNKNOWN_ALLELE};
pub use data::storage::SampleMatrix;
pub use error::{AncestralError, Result};
pub use model::builder::{Ancestor, AncestorBuilder, AncestorDescriptor};
pub use model::matcher::AncestorMatcher;
pub use model::parameters::ModelParams;
pub use model::path::CopyingPath;
pub use model::traceback::Traceback;
pub use pipelines::InferencePipeline;
pub use utils::workspace::MatchWorkspace;
