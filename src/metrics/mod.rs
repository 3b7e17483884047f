//! Prometheus metrics for monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total JSON-RPC requests processed
    pub requests_total: AtomicU64,
    /// Requests answered with a result
    pub requests_success: AtomicU64,
    /// Requests answered with a JSON-RPC error
    pub requests_failed: AtomicU64,
    /// Tool calls
    pub tool_calls: AtomicU64,
    /// Tool calls that produced an error envelope
    pub tool_errors: AtomicU64,
    /// Open SSE sessions
    pub active_sessions: AtomicU64,
    /// SSE sessions opened since start
    pub sessions_opened: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_calls(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_errors(&self) {
        self.tool_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sessions_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Set active sessions.
    pub fn set_active_sessions(&self, count: u64) {
        self.active_sessions.store(count, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            tool_errors: self.tool_errors.load(Ordering::Relaxed),
            active_sessions: self.active_sessions.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP wordpress_mcp_requests_total Total number of JSON-RPC requests
# TYPE wordpress_mcp_requests_total counter
wordpress_mcp_requests_total {}

# HELP wordpress_mcp_requests_success Requests answered with a result
# TYPE wordpress_mcp_requests_success counter
wordpress_mcp_requests_success {}

# HELP wordpress_mcp_requests_failed Requests answered with a JSON-RPC error
# TYPE wordpress_mcp_requests_failed counter
wordpress_mcp_requests_failed {}

# HELP wordpress_mcp_tool_calls Tool calls count
# TYPE wordpress_mcp_tool_calls counter
wordpress_mcp_tool_calls {}

# HELP wordpress_mcp_tool_errors Tool calls returning an error envelope
# TYPE wordpress_mcp_tool_errors counter
wordpress_mcp_tool_errors {}

# HELP wordpress_mcp_active_sessions Open SSE sessions
# TYPE wordpress_mcp_active_sessions gauge
wordpress_mcp_active_sessions {}

# HELP wordpress_mcp_sessions_opened SSE sessions opened since start
# TYPE wordpress_mcp_sessions_opened counter
wordpress_mcp_sessions_opened {}
"#,
            s.requests_total,
            s.requests_success,
            s.requests_failed,
            s.tool_calls,
            s.tool_errors,
            s.active_sessions,
            s.sessions_opened
        )
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_failed: u64,
    pub tool_calls: u64,
    pub tool_errors: u64,
    pub active_sessions: u64,
    pub sessions_opened: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.inc_requests();
        metrics.inc_requests();
        metrics.inc_success();
        metrics.inc_failed();
        metrics.inc_tool_calls();
        metrics.inc_tool_errors();
        metrics.inc_sessions_opened();
        metrics.set_active_sessions(3);

        let s = metrics.snapshot();
        assert_eq!(s.requests_total, 2);
        assert_eq!(s.requests_success, 1);
        assert_eq!(s.requests_failed, 1);
        assert_eq!(s.tool_calls, 1);
        assert_eq!(s.tool_errors, 1);
        assert_eq!(s.active_sessions, 3);
        assert_eq!(s.sessions_opened, 1);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.inc_tool_calls();

        let text = metrics.to_prometheus();
        assert!(text.contains("# TYPE wordpress_mcp_tool_calls counter"));
        assert!(text.contains("wordpress_mcp_tool_calls 1"));
        assert!(text.contains("wordpress_mcp_active_sessions 0"));
    }
}
