//! Run statistics and time-remaining estimation.
//!
//! Counters live only for the lifetime of the process. A resumed sweep
//! starts again from zero.

use std::fmt;
use std::time::Duration;
use sweep_core::{Candidate, CandidateRange};
use tokio::time::Instant;

/// Placeholder reported when no estimate can be made yet.
pub const NO_ESTIMATE: &str = "N/A";

/// Counters for the current run.
#[derive(Debug)]
pub struct RunStats {
    attempts: u64,
    successes: u64,
    started: Instant,
    current: Option<Candidate>,
    range: CandidateRange,
}

/// Point-in-time view of [`RunStats`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    /// Candidates attempted
    pub attempts: u64,
    /// Candidates that produced a stored record
    pub successes: u64,
    /// Successes as a percentage of attempts
    pub success_rate: f64,
    /// Mean seconds spent per attempt
    pub avg_secs: f64,
    /// Seconds since the run started
    pub elapsed_secs: f64,
    /// Formatted time remaining, or [`NO_ESTIMATE`]
    pub eta: String,
    /// Candidate most recently dispatched
    pub current: Option<String>,
}

impl RunStats {
    /// Start the clock for a run over `range`.
    #[must_use]
    pub fn new(range: CandidateRange) -> Self {
        Self {
            attempts: 0,
            successes: 0,
            started: Instant::now(),
            current: None,
            range,
        }
    }

    /// Count a candidate that produced a stored record.
    pub fn record_success(&mut self) {
        self.attempts += 1;
        self.successes += 1;
        self.emit();
    }

    /// Count a candidate that did not produce a stored record.
    pub fn record_failure(&mut self) {
        self.attempts += 1;
        self.emit();
    }

    /// Remember the candidate being worked on.
    pub fn set_current_candidate(&mut self, candidate: Candidate) {
        self.current = Some(candidate);
    }

    /// Candidates attempted so far.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Candidates that produced a stored record so far.
    #[must_use]
    pub fn successes(&self) -> u64 {
        self.successes
    }

    /// Failures so far.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.attempts - self.successes
    }

    /// Estimated time remaining, or [`NO_ESTIMATE`].
    #[must_use]
    pub fn eta(&self) -> String {
        match &self.current {
            Some(current) => eta(
                self.attempts,
                self.started.elapsed(),
                self.range.remaining_after(current),
            ),
            None => NO_ESTIMATE.to_string(),
        }
    }

    /// Capture the current counters.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot(&self) -> StatsSnapshot {
        let elapsed_secs = self.started.elapsed().as_secs_f64();
        let (success_rate, avg_secs) = if self.attempts == 0 {
            (0.0, 0.0)
        } else {
            let attempts = self.attempts as f64;
            (
                self.successes as f64 / attempts * 100.0,
                elapsed_secs / attempts,
            )
        };

        StatsSnapshot {
            attempts: self.attempts,
            successes: self.successes,
            success_rate,
            avg_secs,
            elapsed_secs,
            eta: self.eta(),
            current: self.current.as_ref().map(ToString::to_string),
        }
    }

    fn emit(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            successes = snapshot.successes,
            attempts = snapshot.attempts,
            success_rate = %format!("{:.1}", snapshot.success_rate),
            avg_secs = %format!("{:.2}", snapshot.avg_secs),
            elapsed_secs = %format!("{:.2}", snapshot.elapsed_secs),
            eta = %snapshot.eta,
            candidate = snapshot.current.as_deref().unwrap_or("-"),
            "{snapshot}"
        );
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Success: {}/{} ({:.1}%) | Avg Time: {:.2}s | Total Time: {:.2}s | Est. Remaining: {} | Current: {}",
            self.successes,
            self.attempts,
            self.success_rate,
            self.avg_secs,
            self.elapsed_secs,
            self.eta,
            self.current.as_deref().unwrap_or("-"),
        )
    }
}

/// Estimate time remaining as `"{h}h {m}m {s}s"`.
///
/// The average time per attempt so far is projected over `remaining`
/// candidates and truncated to whole seconds. Returns [`NO_ESTIMATE`] when
/// nothing has been attempted.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn eta(attempts: u64, elapsed: Duration, remaining: u64) -> String {
    if attempts == 0 {
        return NO_ESTIMATE.to_string();
    }

    let avg = elapsed.as_secs_f64() / attempts as f64;
    let total = (avg * remaining as f64) as u64;

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours}h {minutes}m {seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range() -> CandidateRange {
        CandidateRange::new("A", 100_000, 151_000, 0).expect("valid range")
    }

    #[test]
    fn test_eta_reference_value() {
        assert_eq!(eta(10, Duration::from_secs(100), 1000), "2h 46m 40s");
    }

    #[test]
    fn test_eta_truncates() {
        assert_eq!(eta(3, Duration::from_millis(1000), 2), "0h 0m 0s");
        assert_eq!(eta(1, Duration::from_millis(1500), 3), "0h 0m 4s");
    }

    #[test]
    fn test_eta_without_attempts() {
        assert_eq!(eta(0, Duration::from_secs(100), 1000), NO_ESTIMATE);
    }

    #[test]
    fn test_eta_without_candidate() {
        let mut stats = RunStats::new(range());
        stats.record_failure();
        assert_eq!(stats.eta(), NO_ESTIMATE);
    }

    #[test]
    fn test_counters() {
        let mut stats = RunStats::new(range());
        stats.record_success();
        stats.record_failure();
        stats.record_failure();

        assert_eq!(stats.attempts(), 3);
        assert_eq!(stats.successes(), 1);
        assert_eq!(stats.failures(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_uses_elapsed_time() {
        let range = CandidateRange::new("A", 100_000, 101_000, 0).expect("valid range");
        let mut stats = RunStats::new(range.clone());

        for n in 100_000..100_010 {
            stats.set_current_candidate(range.render(n));
            stats.record_success();
        }
        tokio::time::advance(Duration::from_secs(100)).await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.attempts, 10);
        assert!((snapshot.success_rate - 100.0).abs() < f64::EPSILON);
        assert!((snapshot.avg_secs - 10.0).abs() < 0.01);
        // 991 candidates left at 10s each
        assert_eq!(snapshot.eta, "2h 45m 10s");
        assert_eq!(snapshot.current.as_deref(), Some("A100009"));
        assert!(snapshot.to_string().starts_with("Success: 10/10 (100.0%)"));
    }
}
