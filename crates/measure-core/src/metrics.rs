//! Global atomic counters for invocation observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a workflow).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Process-wide counters. Relaxed atomics only.
pub struct Metrics {
    invocations: AtomicU64,
    failures: AtomicU64,
    requests_accepted: AtomicU64,
    requests_rejected: AtomicU64,
    reports_gathered: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            invocations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            requests_accepted: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
            reports_gathered: AtomicU64::new(0),
        }
    }

    pub fn inc_invocations(&self) {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "invocations", "counter incremented");
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "failures", "counter incremented");
    }

    pub fn inc_requests_accepted(&self) {
        self.requests_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_requests_rejected(&self) {
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reports_gathered(&self) {
        self.reports_gathered.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            invocations = self.invocations(),
            failures = self.failures(),
            requests_accepted = self.requests_accepted(),
            requests_rejected = self.requests_rejected(),
            reports_gathered = self.reports_gathered(),
        );
    }

    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn requests_accepted(&self) -> u64 {
        self.requests_accepted.load(Ordering::Relaxed)
    }

    pub fn requests_rejected(&self) -> u64 {
        self.requests_rejected.load(Ordering::Relaxed)
    }

    pub fn reports_gathered(&self) -> u64 {
        self.reports_gathered.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.invocations.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.requests_accepted.store(0, Ordering::Relaxed);
        self.requests_rejected.store(0, Ordering::Relaxed);
        self.reports_gathered.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_counters() {
        let m = Metrics::new();
        m.inc_invocations();
        m.inc_invocations();
        m.inc_failures();
        m.inc_requests_rejected();
        assert_eq!(m.invocations(), 2);
        assert_eq!(m.failures(), 1);
        assert_eq!(m.requests_rejected(), 1);
        m.flush();
        m.reset();
        assert_eq!(m.invocations(), 0);
    }
}
