//! # Inference Pipeline
//!
//! Orchestrates the full workflow:
//! 1. Load the sample matrix
//! 2. Build ancestors oldest first
//! 3. Group ancestors into epochs of equal age; match every member of an epoch
//!    against the library of strictly older ancestors, then add the epoch
//! 4. Match every sample against the complete library (in parallel)
//! 5. Write ancestors and copying paths

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, info_span, instrument};

use crate::config::Config;
use crate::data::haplotype::SampleIdx;
use crate::data::storage::SampleMatrix;
use crate::error::Result;
use crate::io::matrix::read_sample_matrix;
use crate::io::writer::{create_text, write_ancestors, PathKind, PathWriter};
use crate::model::builder::{Ancestor, AncestorBuilder};
use crate::model::matcher::AncestorMatcher;
use crate::model::parameters::ModelParams;
use crate::model::path::CopyingPath;
use crate::utils::telemetry::{Stage, TelemetryBlackboard};
use crate::utils::workspace::MatchWorkspace;

/// Everything inferred from one sample matrix
#[derive(Clone, Debug)]
pub struct Inference {
    /// Ancestors in build order; ancestor `i` is library index `i + 1`
    pub ancestors: Vec<Ancestor>,
    /// Path of each ancestor through the strictly older ones
    pub ancestor_paths: Vec<CopyingPath>,
    /// Path of each sample through the full library
    pub sample_paths: Vec<CopyingPath>,
    /// The complete library
    pub matcher: AncestorMatcher,
}

/// Counts reported at the end of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InferenceSummary {
    pub num_samples: usize,
    pub num_sites: usize,
    pub num_ancestors: usize,
    /// Runs stored by the matcher library
    pub library_segments: usize,
    pub ancestor_switches: usize,
    pub sample_switches: usize,
}

impl Inference {
    pub fn summary(&self, num_samples: usize) -> InferenceSummary {
        InferenceSummary {
            num_samples,
            num_sites: self.matcher.num_sites(),
            num_ancestors: self.ancestors.len(),
            library_segments: self.matcher.total_segments(),
            ancestor_switches: self.ancestor_paths.iter().map(|p| p.num_switches()).sum(),
            sample_switches: self.sample_paths.iter().map(|p| p.num_switches()).sum(),
        }
    }
}

/// Inference pipeline
pub struct InferencePipeline {
    config: Config,
    params: ModelParams,
    telemetry: Option<Arc<TelemetryBlackboard>>,
}

impl InferencePipeline {
    pub fn new(config: Config, telemetry: Option<Arc<TelemetryBlackboard>>) -> Result<Self> {
        let params = config.params()?;
        Ok(Self {
            config,
            params,
            telemetry,
        })
    }

    fn set_stage(&self, stage: Stage) {
        if let Some(t) = &self.telemetry {
            t.set_stage(stage);
        }
    }

    /// Load, infer and write outputs
    pub fn run(&mut self) -> Result<InferenceSummary> {
        self.set_stage(Stage::LoadingData);
        let matrix = read_sample_matrix(&self.config.input)?;
        eprintln!(
            "Loaded {} samples x {} sites ({} KB)",
            matrix.n_samples(),
            matrix.n_sites(),
            matrix.size_bytes() / 1024
        );

        let num_samples = matrix.n_samples();
        let inference = self.infer(matrix)?;

        self.set_stage(Stage::WritingOutput);
        self.write(&inference)?;

        let summary = inference.summary(num_samples);
        eprintln!(
            "Built {} ancestors ({} library runs); {} ancestor and {} sample switches",
            summary.num_ancestors,
            summary.library_segments,
            summary.ancestor_switches,
            summary.sample_switches
        );
        Ok(summary)
    }

    /// Run inference on an in-memory matrix
    #[instrument(skip_all, fields(n_samples = matrix.n_samples(), n_sites = matrix.n_sites()))]
    pub fn infer(&self, matrix: SampleMatrix) -> Result<Inference> {
        self.set_stage(Stage::BuildingAncestors);
        let num_sites = matrix.n_sites();
        let builder = AncestorBuilder::new(matrix.n_samples(), num_sites, matrix)?;

        let (ancestors, ancestor_paths, matcher, matrix) = self.match_ancestors(builder)?;
        let sample_paths = self.match_samples(&matcher, &matrix)?;

        Ok(Inference {
            ancestors,
            ancestor_paths,
            sample_paths,
            matcher,
        })
    }

    /// Build ancestors oldest first, threading each epoch through the older ones
    fn match_ancestors(
        &self,
        builder: AncestorBuilder,
    ) -> Result<(Vec<Ancestor>, Vec<CopyingPath>, AncestorMatcher, SampleMatrix)> {
        let n_ancestors = builder.num_ancestors();
        let _span = info_span!("match_ancestors", n_ancestors).entered();
        let mut matcher = AncestorMatcher::new(builder.num_sites());
        let mut workspace = MatchWorkspace::with_capacity(builder.num_sites(), n_ancestors + 1);
        let mut ancestors = Vec::with_capacity(n_ancestors);
        let mut paths = Vec::with_capacity(n_ancestors);

        if let Some(t) = &self.telemetry {
            t.set_total_ancestors(n_ancestors as u64);
        }
        self.set_stage(Stage::MatchingAncestors);

        let mut iter = builder.build_all();
        let mut epoch: Vec<Ancestor> = Vec::new();
        let mut n_epochs = 0usize;
        let mut pending = iter.next();
        while let Some(ancestor) = pending {
            if let Some(t) = &self.telemetry {
                t.inc_ancestors_built();
            }
            let time = ancestor.descriptor.time;
            epoch.push(ancestor);
            pending = iter.next();
            if matches!(&pending, Some(next) if next.descriptor.time == time) {
                continue;
            }

            // The library stays read-only until every member of the epoch is matched
            for member in &epoch {
                let path = matcher.best_path_with(&member.haplotype, &self.params, &mut workspace)?;
                paths.push(path);
                if let Some(t) = &self.telemetry {
                    t.inc_ancestors_matched();
                }
            }
            for member in &epoch {
                matcher.add(&member.haplotype)?;
            }
            debug!(time, size = epoch.len(), "matched epoch");
            ancestors.append(&mut epoch);
            n_epochs += 1;
        }
        matcher.log_state();

        info!(
            ancestors = ancestors.len(),
            epochs = n_epochs,
            segments = matcher.total_segments(),
            "Ancestor library complete"
        );
        let matrix = iter.into_matrix();
        Ok((ancestors, paths, matcher, matrix))
    }

    /// Match every sample against the full library
    fn match_samples(
        &self,
        matcher: &AncestorMatcher,
        matrix: &SampleMatrix,
    ) -> Result<Vec<CopyingPath>> {
        let _span = info_span!("match_samples", n_samples = matrix.n_samples()).entered();
        self.set_stage(Stage::MatchingSamples);
        if let Some(t) = &self.telemetry {
            t.set_total_samples(matrix.n_samples() as u64);
        }

        let num_sites = matcher.num_sites();
        let params = &self.params;
        let telemetry = self.telemetry.as_deref();
        (0..matrix.n_samples())
            .into_par_iter()
            .map_init(
                || MatchWorkspace::with_capacity(num_sites, 64),
                |workspace, k| {
                    let h = matrix.sample_haplotype(SampleIdx::from(k));
                    let path = matcher.best_path_with(&h, params, workspace);
                    if let Some(t) = telemetry {
                        t.inc_samples_matched();
                    }
                    path
                },
            )
            .collect()
    }

    /// Write ancestors and paths under the configured prefix
    fn write(&self, inference: &Inference) -> Result<()> {
        let _span = info_span!("write_output").entered();

        let mut ancestors_out = create_text(&self.config.ancestors_path())?;
        write_ancestors(&mut ancestors_out, &inference.ancestors)?;
        ancestors_out.finish()?;

        let mut paths = PathWriter::new(create_text(&self.config.paths_path())?)?;
        for (i, path) in inference.ancestor_paths.iter().enumerate() {
            paths.write_path(PathKind::Ancestor, i as u32 + 1, path)?;
        }
        for (k, path) in inference.sample_paths.iter().enumerate() {
            paths.write_path(PathKind::Sample, k as u32, path)?;
        }
        let rows = paths.rows();
        paths.finish()?.finish()?;

        eprintln!(
            "Wrote {} and {} ({} path rows)",
            self.config.ancestors_path().display(),
            self.config.paths_path().display(),
            rows
        );
        Ok(())
    }
}
