// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Execution profiling metrics.
//!
//! [`RunMetrics`] collects per-operator timings and output sizes for one
//! `run_net_once` call.

use std::time::Duration;

/// Metrics for a single operator's execution.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OperatorMetrics {
    pub operator: String,
    /// Operator type name (`"Conv"`, `"FC"`, ...).
    pub op_type: &'static str,
    pub duration: Duration,
    /// Bytes written by the operator's outputs.
    pub output_bytes: usize,
}

/// Aggregate metrics for one graph execution.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunMetrics {
    /// Total wall-clock time for the run.
    pub total_duration: Duration,
    /// Sum of per-operator compute time.
    pub total_compute_duration: Duration,
    /// Largest workspace footprint observed after any operator.
    pub peak_workspace_bytes: usize,
    pub operator_metrics: Vec<OperatorMetrics>,
}

impl RunMetrics {
    /// Creates an empty metrics container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records metrics for a single operator.
    pub fn record_operator(
        &mut self,
        operator: String,
        op_type: &'static str,
        duration: Duration,
        output_bytes: usize,
        workspace_bytes: usize,
    ) {
        self.total_compute_duration += duration;
        self.peak_workspace_bytes = self.peak_workspace_bytes.max(workspace_bytes);
        self.operator_metrics.push(OperatorMetrics {
            operator,
            op_type,
            duration,
            output_bytes,
        });
    }

    /// Finalises metrics with the total wall-clock time.
    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Returns the `n` slowest operators, slowest first.
    pub fn slowest(&self, n: usize) -> Vec<&OperatorMetrics> {
        let mut sorted: Vec<&OperatorMetrics> = self.operator_metrics.iter().collect();
        sorted.sort_by(|a, b| b.duration.cmp(&a.duration));
        sorted.truncate(n);
        sorted
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Run: {:.2}ms total, {} operators, {:.2}ms compute, peak workspace {:.2} MB",
            self.total_duration.as_secs_f64() * 1000.0,
            self.operator_metrics.len(),
            self.total_compute_duration.as_secs_f64() * 1000.0,
            self.peak_workspace_bytes as f64 / (1024.0 * 1024.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let m = RunMetrics::new();
        assert!(m.operator_metrics.is_empty());
        assert!(m.slowest(3).is_empty());
    }

    #[test]
    fn test_record_and_finalise() {
        let mut m = RunMetrics::new();
        m.record_operator("conv1".into(), "Conv", Duration::from_millis(10), 400, 1000);
        m.record_operator("relu1".into(), "Relu", Duration::from_millis(2), 400, 1400);
        m.record_operator("fc6".into(), "FC", Duration::from_millis(5), 16, 900);
        m.finalise(Duration::from_millis(20));

        assert_eq!(m.operator_metrics.len(), 3);
        assert_eq!(m.peak_workspace_bytes, 1400);
        assert_eq!(m.total_compute_duration, Duration::from_millis(17));
        let slow: Vec<&str> = m.slowest(2).iter().map(|o| o.operator.as_str()).collect();
        assert_eq!(slow, vec!["conv1", "fc6"]);
    }

    #[test]
    fn test_summary_format() {
        let mut m = RunMetrics::new();
        m.record_operator("a".into(), "Tanh", Duration::from_millis(1), 4, 1024 * 1024);
        m.finalise(Duration::from_millis(3));
        let s = m.summary();
        assert!(s.contains("Run:"));
        assert!(s.contains("1 operators"));
        assert!(s.contains("peak workspace 1.00 MB"));
    }
}
