//! # Model Parameters
//!
//! ## Role
//! Copying-model hyperparameters and the per-step probabilities derived from
//! them for a library of `n` ancestors.
//!
//! ### Transition and Emission Constants
//! ```text
//! r  = 1 - exp(-rho / n)        recombination probability
//! pr = r / n                    jump to one specific ancestor
//! qr = 1 - r + r / n            stay on the current ancestor
//! pm = 0.5 * theta / (n + theta)                 allele mismatch
//! qm = n / (n + theta) + 0.5 * theta / (n + theta)   allele match
//! ```

use crate::error::{AncestralError, Result};

/// Population-scaled recombination and mutation rates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelParams {
    /// Recombination rate (rho), strictly positive
    pub rho: f64,
    /// Mutation rate (theta), strictly positive
    pub theta: f64,
}

impl ModelParams {
    /// Create validated parameters
    pub fn new(rho: f64, theta: f64) -> Result<Self> {
        let params = Self { rho, theta };
        params.validate()?;
        Ok(params)
    }

    /// Both rates must be finite and > 0
    pub fn validate(&self) -> Result<()> {
        if !(self.rho.is_finite() && self.rho > 0.0) {
            return Err(AncestralError::parameter(format!(
                "rho must be finite and > 0, got {}",
                self.rho
            )));
        }
        if !(self.theta.is_finite() && self.theta > 0.0) {
            return Err(AncestralError::parameter(format!(
                "theta must be finite and > 0, got {}",
                self.theta
            )));
        }
        Ok(())
    }

    /// Transition and emission probabilities for `n_ancestors` copy targets
    pub fn probs(&self, n_ancestors: usize) -> TransitionProbs {
        let n = n_ancestors as f64;
        let r = 1.0 - (-self.rho / n).exp();
        let mismatch = 0.5 * self.theta / (n + self.theta);
        TransitionProbs {
            pr: r / n,
            qr: 1.0 - r + r / n,
            pm: mismatch,
            qm: n / (n + self.theta) + mismatch,
        }
    }
}

/// Per-step constants of the copying model
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransitionProbs {
    /// Recombine onto a specific ancestor
    pub pr: f64,
    /// Stay on the same ancestor
    pub qr: f64,
    /// Emit a mismatching allele
    pub pm: f64,
    /// Emit a matching allele
    pub qm: f64,
}
