//! # Telemetry Blackboard
//!
//! Progress tracking for the inference pipeline. Workers bump relaxed atomic
//! counters, cheap enough to call from inside rayon closures, and a
//! background heartbeat thread samples them and reports to stderr.

use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Stage {
    Initializing = 0,
    LoadingData = 1,
    BuildingAncestors = 2,
    MatchingAncestors = 3,
    MatchingSamples = 4,
    WritingOutput = 5,
    Complete = 6,
}

impl Stage {
    const ALL: [Stage; 7] = [
        Stage::Initializing,
        Stage::LoadingData,
        Stage::BuildingAncestors,
        Stage::MatchingAncestors,
        Stage::MatchingSamples,
        Stage::WritingOutput,
        Stage::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Initializing => "Initializing",
            Stage::LoadingData => "Loading Data",
            Stage::BuildingAncestors => "Building Ancestors",
            Stage::MatchingAncestors => "Matching Ancestors",
            Stage::MatchingSamples => "Matching Samples",
            Stage::WritingOutput => "Writing Output",
            Stage::Complete => "Complete",
        }
    }

    fn from_raw(raw: u64) -> Self {
        Self::ALL
            .get(raw as usize)
            .copied()
            .unwrap_or(Stage::Complete)
    }

    /// Counter pair (done, total) that measures progress in this stage
    fn progress_counters(self) -> Option<(Counter, Counter)> {
        match self {
            Stage::BuildingAncestors => Some((Counter::AncestorsBuilt, Counter::TotalAncestors)),
            Stage::MatchingAncestors => Some((Counter::AncestorsMatched, Counter::TotalAncestors)),
            Stage::MatchingSamples => Some((Counter::SamplesMatched, Counter::TotalSamples)),
            _ => None,
        }
    }
}

/// Slots of the counter array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Counter {
    AncestorsBuilt = 0,
    AncestorsMatched = 1,
    TotalAncestors = 2,
    SamplesMatched = 3,
    TotalSamples = 4,
}

const N_COUNTERS: usize = 5;

/// Shared progress state; every read is approximate
pub struct TelemetryBlackboard {
    stage: AtomicU64,
    counters: [AtomicU64; N_COUNTERS],
    started: Instant,
    /// Nanoseconds since `started` at the last counter bump
    last_bump: AtomicU64,
    stop: AtomicBool,
}

impl Default for TelemetryBlackboard {
    fn default() -> Self {
        Self {
            stage: AtomicU64::new(Stage::Initializing as u64),
            counters: std::array::from_fn(|_| AtomicU64::new(0)),
            started: Instant::now(),
            last_bump: AtomicU64::new(0),
            stop: AtomicBool::new(false),
        }
    }
}

impl TelemetryBlackboard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn mark_activity(&self) {
        self.last_bump
            .store(self.started.elapsed().as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn set_stage(&self, stage: Stage) {
        self.stage.store(stage as u64, Ordering::Relaxed);
        self.mark_activity();
    }

    pub fn stage(&self) -> Stage {
        Stage::from_raw(self.stage.load(Ordering::Relaxed))
    }

    pub fn set(&self, counter: Counter, value: u64) {
        self.counters[counter as usize].store(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn bump(&self, counter: Counter) {
        self.counters[counter as usize].fetch_add(1, Ordering::Relaxed);
        self.mark_activity();
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter as usize].load(Ordering::Relaxed)
    }

    pub fn set_total_ancestors(&self, n: u64) {
        self.set(Counter::TotalAncestors, n);
    }

    pub fn set_total_samples(&self, n: u64) {
        self.set(Counter::TotalSamples, n);
    }

    pub fn inc_ancestors_built(&self) {
        self.bump(Counter::AncestorsBuilt);
    }

    pub fn inc_ancestors_matched(&self) {
        self.bump(Counter::AncestorsMatched);
    }

    pub fn inc_samples_matched(&self) {
        self.bump(Counter::SamplesMatched);
    }

    pub fn ancestors_built(&self) -> u64 {
        self.get(Counter::AncestorsBuilt)
    }

    pub fn ancestors_matched(&self) -> u64 {
        self.get(Counter::AncestorsMatched)
    }

    pub fn samples_matched(&self) -> u64 {
        self.get(Counter::SamplesMatched)
    }

    /// (done, total) for the current stage, zeros outside the counted stages
    pub fn progress(&self) -> (u64, u64) {
        match self.stage().progress_counters() {
            Some((done, total)) => (self.get(done), self.get(total)),
            None => (0, 0),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Seconds since any counter or the stage last changed
    fn idle_secs(&self) -> u64 {
        let now = self.started.elapsed().as_nanos() as u64;
        now.saturating_sub(self.last_bump.load(Ordering::Relaxed)) / 1_000_000_000
    }
}

/// How often and how loudly the heartbeat reports
pub struct HeartbeatConfig {
    pub interval_secs: u64,
    /// Flag the run as stalled after this long without progress
    pub stall_threshold_secs: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            stall_threshold_secs: 300,
        }
    }
}

/// Owner of the background reporting thread
pub struct HeartbeatHandle {
    thread: Option<thread::JoinHandle<()>>,
    board: Arc<TelemetryBlackboard>,
}

impl HeartbeatHandle {
    pub fn spawn(board: Arc<TelemetryBlackboard>, config: HeartbeatConfig) -> io::Result<Self> {
        let worker_board = Arc::clone(&board);
        let tty = io::stderr().is_terminal();
        let thread = thread::Builder::new()
            .name("heartbeat".into())
            .spawn(move || Reporter::new(worker_board, config, tty).run())?;
        Ok(Self {
            thread: Some(thread),
            board,
        })
    }

    /// Stop reporting and join the thread
    pub fn shutdown(mut self) {
        self.board.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.board.stop.store(true, Ordering::SeqCst);
    }
}

/// State carried between heartbeats
struct Reporter {
    board: Arc<TelemetryBlackboard>,
    config: HeartbeatConfig,
    tty: bool,
    prev_done: u64,
    prev_at: Instant,
}

impl Reporter {
    fn new(board: Arc<TelemetryBlackboard>, config: HeartbeatConfig, tty: bool) -> Self {
        Self {
            board,
            config,
            tty,
            prev_done: 0,
            prev_at: Instant::now(),
        }
    }

    fn stopped(&self) -> bool {
        self.board.stop.load(Ordering::SeqCst)
    }

    /// Sleep one interval in short ticks; false once stop is requested
    fn wait(&self) -> bool {
        let deadline = Instant::now() + Duration::from_secs(self.config.interval_secs.max(1));
        while Instant::now() < deadline {
            if self.stopped() {
                return false;
            }
            thread::sleep(Duration::from_millis(200));
        }
        !self.stopped()
    }

    fn run(mut self) {
        while self.wait() {
            self.report();
        }
        if self.tty {
            eprint!("\r\x1b[K");
            let _ = io::stderr().flush();
        }
    }

    fn report(&mut self) {
        let stage = self.board.stage();
        let (done, total) = self.board.progress();

        let now = Instant::now();
        let dt = now.duration_since(self.prev_at).as_secs_f64();
        let rate = if dt > 0.1 {
            done.saturating_sub(self.prev_done) as f64 / dt
        } else {
            0.0
        };
        self.prev_done = done;
        self.prev_at = now;

        let eta = if rate > 0.0 && total > done {
            human_duration((total - done) as f64 / rate)
        } else {
            "unknown".to_string()
        };
        let stalled = self.board.idle_secs() > self.config.stall_threshold_secs;
        let elapsed = self.board.elapsed_secs();

        if self.tty {
            let pct = if total > 0 {
                (100.0 * done as f64 / total as f64).min(100.0)
            } else {
                0.0
            };
            eprint!(
                "\r{:>5.1}% {} {}/{} | {:.0}/s | {} elapsed | ETA {}{}\x1b[K",
                pct,
                stage.as_str(),
                done,
                total,
                rate,
                human_duration(elapsed),
                eta,
                if stalled { " [STALLED]" } else { "" }
            );
            let _ = io::stderr().flush();
        } else {
            eprintln!(
                "[HEARTBEAT] stage=\"{}\" done={}/{} rate={:.0}/s elapsed={:.0}s eta={} stalled={}",
                stage.as_str(),
                done,
                total,
                rate,
                elapsed,
                eta,
                stalled
            );
        }
    }
}

/// `42s`, `3m05s` or `1.5h`
fn human_duration(secs: f64) -> String {
    let whole = secs.max(0.0).round() as u64;
    if whole < 60 {
        format!("{}s", whole)
    } else if whole < 3600 {
        format!("{}m{:02}s", whole / 60, whole % 60)
    } else {
        format!("{:.1}h", secs / 3600.0)
    }
}
