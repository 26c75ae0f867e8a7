//! Per-instance tool usage tracking, consulted by adaptive ordering
//! elsewhere in the stack.

use dashmap::DashMap;

/// Running success/failure counts for one tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolUsage {
    /// Successful invocations observed so far.
    pub successes: u64,
    /// Failed invocations observed so far.
    pub failures: u64,
}

impl ToolUsage {
    /// Fraction of calls that succeeded, or `1.0` if the tool has never
    /// been called (optimistic default so untried tools aren't penalized).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            1.0
        } else {
            self.successes as f64 / total as f64
        }
    }
}

/// Tracks `(tool_name, success)` outcomes. Recording must never delay the
/// caller, so every record is a non-blocking map update.
#[derive(Default)]
pub struct UsageTracker {
    counts: DashMap<String, ToolUsage>,
}

impl UsageTracker {
    /// An empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome for `tool_name`.
    pub fn record(&self, tool_name: &str, success: bool) {
        let mut entry = self.counts.entry(tool_name.to_string()).or_default();
        if success {
            entry.successes += 1;
        } else {
            entry.failures += 1;
        }
    }

    /// Current usage snapshot for a tool.
    #[must_use]
    pub fn get(&self, tool_name: &str) -> ToolUsage {
        self.counts.get(tool_name).map(|e| *e).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_tool_defaults_to_optimistic_rate() {
        let tracker = UsageTracker::new();
        assert_eq!(tracker.get("never_called").success_rate(), 1.0);
    }

    #[test]
    fn records_accumulate() {
        let tracker = UsageTracker::new();
        tracker.record("flaky", true);
        tracker.record("flaky", false);
        tracker.record("flaky", true);
        let usage = tracker.get("flaky");
        assert_eq!(usage.successes, 2);
        assert_eq!(usage.failures, 1);
    }
}
