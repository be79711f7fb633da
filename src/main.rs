//! # Ancestral: Ancestor Reconstruction and Copying-Path Inference
//!
//! ## Usage
//! ```bash
//! ancestral --input samples.txt --out inferred
//!
//! # Gzipped input, custom rates, span timings
//! ancestral --input samples.txt.gz --out inferred --rho 0.5 --theta 1e-4 --profile
//! ```

use std::time::Instant;

use ancestral::config::Config;
use ancestral::pipelines::InferencePipeline;
use ancestral::utils::telemetry::{HeartbeatConfig, HeartbeatHandle, Stage, TelemetryBlackboard};
use ancestral::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing subscriber for hierarchical profiling output
fn init_profiling() {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_target(false)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Warnings only unless `RUST_LOG` says otherwise
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let start = Instant::now();

    let config = Config::parse_and_validate()?;

    if config.profile {
        init_profiling();
        eprintln!("=== Profiling enabled ===\n");
    } else {
        init_logging();
    }

    let n_threads = config.nthreads();
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
        .ok();

    eprintln!("Ancestral v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("Threads: {}", n_threads);
    eprintln!("Input: {:?}", config.input);
    eprintln!("rho={} theta={}", config.rho, config.theta);

    let telemetry = TelemetryBlackboard::new();
    let heartbeat = if config.heartbeat > 0 {
        Some(HeartbeatHandle::spawn(
            telemetry.clone(),
            HeartbeatConfig {
                interval_secs: config.heartbeat,
                ..HeartbeatConfig::default()
            },
        )?)
    } else {
        None
    };

    let mut pipeline = InferencePipeline::new(config, Some(telemetry.clone()))?;
    pipeline.run()?;

    telemetry.set_stage(Stage::Complete);
    if let Some(heartbeat) = heartbeat {
        heartbeat.shutdown();
    }

    eprintln!("\nCompleted in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}
