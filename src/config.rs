//! # Configuration Logic
//!
//! ## Role
//! CLI argument parsing and validation.
//!
//! ## Fields
//! - `input: PathBuf` - Sample matrix (one haplotype per line, `.gz` allowed)
//! - `out: PathBuf` - Output prefix
//! - `rho: f64` - Recombination rate (default: 1.0)
//! - `theta: f64` - Mutation rate (default: 0.001)
//! - `nthreads: Option<usize>` - Number of threads (default: all cores)
//! - `profile: bool` - Emit span timings
//! - `heartbeat: u64` - Seconds between progress lines, 0 disables
//! - `compress: bool` - Gzip both outputs (adds `.gz`)
//!
//! ## Example CLI
//! ```bash
//! ancestral --input samples.txt.gz --out inferred --rho 0.5 --nthreads 8
//! ```

use std::path::PathBuf;

use clap::Parser;

use crate::error::{AncestralError, Result};
use crate::model::parameters::ModelParams;

/// Ancestral haplotype reconstruction and copying-path inference
#[derive(Parser, Debug, Clone)]
#[command(name = "ancestral", version, about)]
pub struct Config {
    /// Sample haplotype matrix: one row of 0/1 per sample
    #[arg(long)]
    pub input: PathBuf,

    /// Output prefix; writes <out>.ancestors.jsonl and <out>.paths.tsv
    #[arg(long)]
    pub out: PathBuf,

    /// Population-scaled recombination rate
    #[arg(long, default_value_t = 1.0)]
    pub rho: f64,

    /// Population-scaled mutation rate
    #[arg(long, default_value_t = 0.001)]
    pub theta: f64,

    /// Worker threads (default: all cores)
    #[arg(long)]
    pub nthreads: Option<usize>,

    /// Print span timings to stderr
    #[arg(long)]
    pub profile: bool,

    /// Seconds between heartbeat lines (0 disables)
    #[arg(long, default_value_t = 30)]
    pub heartbeat: u64,

    /// Gzip the output files
    #[arg(long)]
    pub compress: bool,
}

impl Config {
    /// Parse from the process arguments and validate
    pub fn parse_and_validate() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.input.exists() {
            return Err(AncestralError::config(format!(
                "input file not found: {}",
                self.input.display()
            )));
        }
        if self.nthreads == Some(0) {
            return Err(AncestralError::config("nthreads must be at least 1"));
        }
        self.params()
            .map_err(|e| AncestralError::config(e.to_string()))?;
        Ok(())
    }

    /// Worker thread count
    pub fn nthreads(&self) -> usize {
        self.nthreads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn params(&self) -> Result<ModelParams> {
        ModelParams::new(self.rho, self.theta)
    }

    /// `<out>.ancestors.jsonl[.gz]`
    pub fn ancestors_path(&self) -> PathBuf {
        self.with_suffix("ancestors.jsonl")
    }

    /// `<out>.paths.tsv[.gz]`
    pub fn paths_path(&self) -> PathBuf {
        self.with_suffix("paths.tsv")
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = self.out.clone().into_os_string();
        name.push(".");
        name.push(suffix);
        if self.compress {
            name.push(".gz");
        }
        PathBuf::from(name)
    }
}
