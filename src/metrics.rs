//! Metric helpers for `replyline`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::counter;

/// Name of the counter tracking resolved and rejected waits.
pub const WAITS_TOTAL: &str = "replyline_waits_total";
/// Name of the counter tracking replies that arrived with no wait pending.
pub const REPLIES_DISCARDED: &str = "replyline_replies_discarded_total";
/// Name of the counter tracking faults that no wait claimed.
pub const FAULTS_UNCLAIMED: &str = "replyline_faults_unclaimed_total";

/// How a wait ended, or why it never started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Every expected reply arrived.
    Completed,
    /// A fault failed the wait.
    Failed,
    /// Registration collided with an outstanding wait.
    Rejected,
}

impl WaitOutcome {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            WaitOutcome::Completed => "completed",
            WaitOutcome::Failed => "failed",
            WaitOutcome::Rejected => "rejected",
        }
    }
}

/// Record a wait outcome.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_waits(outcome: WaitOutcome) {
    #[cfg(feature = "metrics")]
    counter!(WAITS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

/// Record a reply discarded for lack of a pending wait.
pub fn inc_replies_discarded() {
    #[cfg(feature = "metrics")]
    counter!(REPLIES_DISCARDED).increment(1);
}

/// Record a fault that arrived with no pending wait.
pub fn inc_faults_unclaimed() {
    #[cfg(feature = "metrics")]
    counter!(FAULTS_UNCLAIMED).increment(1);
}
