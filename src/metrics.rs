//! Verification metrics.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::types::StepOutcome;

/// Engine phases with their own timing bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Rewriting and sentence splitting.
    Segment,
    /// Categorization sampling.
    Categorize,
    /// Justification sub-step.
    Justify,
    /// Audit sub-step.
    Audit,
    /// Raw oracle round-trips.
    Oracle,
}

impl Phase {
    /// Stable name used as the timing key.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Categorize => "categorize",
            Self::Justify => "justify",
            Self::Audit => "audit",
            Self::Oracle => "oracle",
        }
    }
}

/// Snapshot of collected metrics.
#[derive(Debug, Clone, Default)]
pub struct VerificationMetrics {
    /// Oracle round-trips attempted.
    pub oracle_calls: u64,
    /// Round-trips that produced no text.
    pub no_responses: u64,
    /// Responses rejected by the parser.
    pub malformed_responses: u64,
    /// Sentences accepted as correct.
    pub accepted: u64,
    /// Sentences refuted by the oracle.
    pub refuted: u64,
    /// Sentences flagged because no round was conclusive.
    pub unresolved: u64,
    /// Sentences skipped by the category gate.
    pub skipped: u64,
    /// Per-phase timing statistics.
    pub phase_timings: HashMap<String, PhaseTiming>,
}

impl VerificationMetrics {
    /// Sentences that reached a final outcome.
    #[must_use]
    pub fn steps_checked(&self) -> u64 {
        self.accepted + self.refuted + self.unresolved + self.skipped
    }

    /// Sentences reported as mistakes.
    #[must_use]
    pub fn mistakes(&self) -> u64 {
        self.refuted + self.unresolved
    }
}

/// Timing statistics for a single phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseTiming {
    /// Total invocations.
    pub invocations: u64,
    /// Total time spent (milliseconds).
    pub total_time_ms: u64,
    /// Average time per invocation (milliseconds).
    pub avg_time_ms: f64,
    /// Minimum time (milliseconds).
    pub min_time_ms: u64,
    /// Maximum time (milliseconds).
    pub max_time_ms: u64,
}

impl PhaseTiming {
    /// Record a timing observation.
    pub fn record(&mut self, duration_ms: u64) {
        self.invocations += 1;
        self.total_time_ms += duration_ms;

        if self.invocations == 1 {
            self.min_time_ms = duration_ms;
            self.max_time_ms = duration_ms;
        } else {
            self.min_time_ms = self.min_time_ms.min(duration_ms);
            self.max_time_ms = self.max_time_ms.max(duration_ms);
        }

        #[allow(clippy::cast_precision_loss)]
        {
            self.avg_time_ms = self.total_time_ms as f64 / self.invocations as f64;
        }
    }
}

/// Thread-safe metrics collector shared by sessions of one verifier.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    oracle_calls: AtomicU64,
    no_responses: AtomicU64,
    malformed_responses: AtomicU64,
    accepted: AtomicU64,
    refuted: AtomicU64,
    unresolved: AtomicU64,
    skipped: AtomicU64,
    phase_timings: RwLock<HashMap<String, PhaseTiming>>,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one oracle round-trip.
    pub fn record_oracle_call(&self, produced_text: bool) {
        self.oracle_calls.fetch_add(1, Ordering::Relaxed);
        if !produced_text {
            self.no_responses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a response the parser rejected.
    pub fn record_malformed(&self) {
        self.malformed_responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the final outcome of one sentence.
    pub fn record_outcome(&self, outcome: StepOutcome) {
        let counter = match outcome {
            StepOutcome::Accepted => &self.accepted,
            StepOutcome::Refuted => &self.refuted,
            StepOutcome::Unresolved => &self.unresolved,
            StepOutcome::Skipped => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record time spent in a phase.
    pub fn record_phase_timing(&self, phase: Phase, duration: Duration) {
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

        if let Ok(mut timings) = self.phase_timings.write() {
            timings
                .entry(phase.name().to_string())
                .or_default()
                .record(duration_ms);
        }
    }

    /// Start timing a phase; the time is recorded when the guard drops.
    #[must_use]
    pub fn time_phase(&self, phase: Phase) -> TimingGuard<'_> {
        TimingGuard {
            collector: self,
            phase,
            start: Instant::now(),
        }
    }

    /// Get a snapshot of current metrics.
    #[must_use]
    pub fn snapshot(&self) -> VerificationMetrics {
        let phase_timings = self
            .phase_timings
            .read()
            .map(|t| t.clone())
            .unwrap_or_default();

        VerificationMetrics {
            oracle_calls: self.oracle_calls.load(Ordering::Relaxed),
            no_responses: self.no_responses.load(Ordering::Relaxed),
            malformed_responses: self.malformed_responses.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            refuted: self.refuted.load(Ordering::Relaxed),
            unresolved: self.unresolved.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            phase_timings,
        }
    }

    /// Reset all metrics.
    pub fn reset(&self) {
        self.oracle_calls.store(0, Ordering::Relaxed);
        self.no_responses.store(0, Ordering::Relaxed);
        self.malformed_responses.store(0, Ordering::Relaxed);
        self.accepted.store(0, Ordering::Relaxed);
        self.refuted.store(0, Ordering::Relaxed);
        self.unresolved.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);

        if let Ok(mut timings) = self.phase_timings.write() {
            timings.clear();
        }
    }
}

/// RAII guard that records a phase timing on drop.
pub struct TimingGuard<'a> {
    collector: &'a MetricsCollector,
    phase: Phase,
    start: Instant,
}

impl Drop for TimingGuard<'_> {
    fn drop(&mut self) {
        self.collector
            .record_phase_timing(self.phase, self.start.elapsed());
    }
}
