//! # Utilities Module
//!
//! ## Role
//! Cross-cutting helpers that don't belong in domain-specific modules.
//!
//! ## Sub-modules
//! - `telemetry`: Atomic progress counters and the heartbeat thread
//! - `workspace`: Reusable per-query buffers for the matcher

pub mod telemetry;
pub mod workspace;

pub use workspace::MatchWorkspace;
