//! Session statistics.
//!
//! Counts what the filter decided so the operator can see at shutdown how
//! many clicks were swallowed. Counters are atomic because the Ctrl+C handler
//! reads them from its own thread.

use crate::core::Decision;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Decision counters for the current session.
#[derive(Debug)]
pub struct FilterStats {
    /// Keystrokes that (re)armed the window
    keystrokes: AtomicU64,
    /// Auto-repeat duplicates
    repeats: AtomicU64,
    /// Trackpad events let through
    trackpad_passed: AtomicU64,
    /// Trackpad events dropped
    trackpad_suppressed: AtomicU64,
    /// Events from devices holding no role
    unrelated: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl FilterStats {
    pub fn new() -> Self {
        Self {
            keystrokes: AtomicU64::new(0),
            repeats: AtomicU64::new(0),
            trackpad_passed: AtomicU64::new(0),
            trackpad_suppressed: AtomicU64::new(0),
            unrelated: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    /// Record one gate decision.
    pub fn record(&self, decision: Decision) {
        let counter = match decision {
            Decision::Keystroke => &self.keystrokes,
            Decision::Repeat => &self.repeats,
            Decision::TrackpadPassed => &self.trackpad_passed,
            Decision::TrackpadSuppressed => &self.trackpad_suppressed,
            Decision::Unrelated => &self.unrelated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            keystrokes: self.keystrokes.load(Ordering::Relaxed),
            repeats: self.repeats.load(Ordering::Relaxed),
            trackpad_passed: self.trackpad_passed.load(Ordering::Relaxed),
            trackpad_suppressed: self.trackpad_suppressed.load(Ordering::Relaxed),
            unrelated: self.unrelated.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Started: {}\n\
             - Keystrokes: {} ({} auto-repeat)\n\
             - Trackpad events passed: {}\n\
             - Trackpad events suppressed: {}\n\
             - Other devices passed through: {}\n\
             - Session duration: {} seconds",
            stats.session_start.format("%Y-%m-%d %H:%M:%S UTC"),
            stats.keystrokes + stats.repeats,
            stats.repeats,
            stats.trackpad_passed,
            stats.trackpad_suppressed,
            stats.unrelated,
            stats.session_duration_secs
        )
    }
}

impl Default for FilterStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub keystrokes: u64,
    pub repeats: u64,
    pub trackpad_passed: u64,
    pub trackpad_suppressed: u64,
    pub unrelated: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats shared with the Ctrl+C handler.
pub type SharedFilterStats = Arc<FilterStats>;

/// Create a new shared stats record.
pub fn create_shared_stats() -> SharedFilterStats {
    Arc::new(FilterStats::new())
}
