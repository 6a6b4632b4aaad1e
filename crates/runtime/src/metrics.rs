// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-layer profiling.
//!
//! The interpreter calls a [`BenchmarkHook`] around every invoke and every
//! node that has invoke work. Hooks only observe; they cannot change what
//! the interpreter does. [`LayerProfiler`] is the provided hook: it times
//! each layer with [`Instant`] and keeps running statistics per node.

use std::time::{Duration, Instant};

/// Observer of invoke boundaries.
///
/// Nodes whose kernel reports no invoke work (`Kernel::has_invoke` is
/// false) are skipped before `node_started`, so they get no node calls and
/// never show up as layers. A profile therefore lists only the nodes that
/// ran, not every node in the graph.
pub trait BenchmarkHook {
    fn invoke_started(&mut self) {}

    fn node_started(&mut self, node: usize, op: &str);

    fn node_finished(&mut self, node: usize, op: &str);

    fn invoke_finished(&mut self) {}
}

/// A hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl BenchmarkHook for NoopHook {
    fn node_started(&mut self, _: usize, _: &str) {}

    fn node_finished(&mut self, _: usize, _: &str) {}
}

/// Timing statistics for one layer (node) across invocations.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LayerMetrics {
    pub node: usize,
    pub op: String,
    pub calls: usize,
    pub total: Duration,
    pub last: Duration,
    pub min: Duration,
    pub max: Duration,
}

impl LayerMetrics {
    fn new(node: usize, op: &str) -> Self {
        Self {
            node,
            op: op.to_string(),
            calls: 0,
            total: Duration::ZERO,
            last: Duration::ZERO,
            min: Duration::MAX,
            max: Duration::ZERO,
        }
    }

    fn record(&mut self, elapsed: Duration) {
        self.calls += 1;
        self.total += elapsed;
        self.last = elapsed;
        self.min = self.min.min(elapsed);
        self.max = self.max.max(elapsed);
    }

    /// Mean time per call.
    pub fn mean(&self) -> Duration {
        match u32::try_from(self.calls) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total / n,
        }
    }

    /// Layer label in `Layer_<node>_<op>` form.
    pub fn label(&self) -> String {
        format!("Layer_{}_{}", self.node, self.op)
    }
}

/// Times every layer of every invoke.
///
/// The per-layer table grows during the first invoke only; later invokes
/// update it in place.
#[derive(Debug, Default)]
pub struct LayerProfiler {
    report_layers: bool,
    layers: Vec<LayerMetrics>,
    node_start: Option<Instant>,
    invoke_start: Option<Instant>,
    invocations: usize,
    total: Duration,
}

impl LayerProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes the table for `num_nodes` layers.
    pub fn with_capacity(num_nodes: usize) -> Self {
        Self {
            layers: Vec::with_capacity(num_nodes),
            ..Self::default()
        }
    }

    /// Logs each layer's time at info level as it finishes.
    pub fn report_layers(mut self, enabled: bool) -> Self {
        self.report_layers = enabled;
        self
    }

    pub fn layers(&self) -> &[LayerMetrics] {
        &self.layers
    }

    pub fn invocations(&self) -> usize {
        self.invocations
    }

    /// Wall time of all completed invokes.
    pub fn total_duration(&self) -> Duration {
        self.total
    }

    /// The layer with the largest mean time.
    pub fn slowest(&self) -> Option<&LayerMetrics> {
        self.layers.iter().max_by_key(|l| l.mean())
    }

    pub fn reset(&mut self) {
        *self = Self {
            report_layers: self.report_layers,
            layers: Vec::with_capacity(self.layers.capacity()),
            ..Self::default()
        };
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let per_invoke = match u32::try_from(self.invocations) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.total / n,
        };
        let mut s = format!(
            "Profile: {} layers, {} invokes, {:.3} ms per invoke",
            self.layers.len(),
            self.invocations,
            per_invoke.as_secs_f64() * 1000.0,
        );
        if let Some(slowest) = self.slowest() {
            s.push_str(&format!(
                ", slowest {} at {:.3} ms",
                slowest.label(),
                slowest.mean().as_secs_f64() * 1000.0
            ));
        }
        s
    }
}

impl BenchmarkHook for LayerProfiler {
    fn invoke_started(&mut self) {
        self.invoke_start = Some(Instant::now());
    }

    fn node_started(&mut self, _: usize, _: &str) {
        self.node_start = Some(Instant::now());
    }

    fn node_finished(&mut self, node: usize, op: &str) {
        let Some(start) = self.node_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let idx = match self.layers.iter().position(|l| l.node == node) {
            Some(idx) => idx,
            None => {
                self.layers.push(LayerMetrics::new(node, op));
                self.layers.len() - 1
            }
        };
        let layer = &mut self.layers[idx];
        layer.record(elapsed);
        if self.report_layers {
            tracing::info!("{}: {} us", layer.label(), elapsed.as_micros());
        }
    }

    fn invoke_finished(&mut self) {
        if let Some(start) = self.invoke_start.take() {
            self.total += start.elapsed();
            self.invocations += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_profiler() {
        let p = LayerProfiler::new();
        assert_eq!(p.invocations(), 0);
        assert!(p.slowest().is_none());
        assert!(p.summary().contains("0 layers"));
    }

    #[test]
    fn test_records_per_node() {
        let mut p = LayerProfiler::with_capacity(2);
        for _ in 0..3 {
            p.invoke_started();
            p.node_started(0, "ADD");
            p.node_finished(0, "ADD");
            p.node_started(1, "RELU");
            p.node_finished(1, "RELU");
            p.invoke_finished();
        }
        assert_eq!(p.invocations(), 3);
        assert_eq!(p.layers().len(), 2);
        assert_eq!(p.layers()[0].calls, 3);
        assert_eq!(p.layers()[1].label(), "Layer_1_RELU");
        assert!(p.layers()[0].min <= p.layers()[0].max);
    }

    #[test]
    fn test_finish_without_start_is_ignored() {
        let mut p = LayerProfiler::new();
        p.node_finished(0, "ADD");
        p.invoke_finished();
        assert!(p.layers().is_empty());
        assert_eq!(p.invocations(), 0);
    }

    #[test]
    fn test_reset_keeps_reporting_flag() {
        let mut p = LayerProfiler::new().report_layers(true);
        p.node_started(0, "ADD");
        p.node_finished(0, "ADD");
        p.reset();
        assert!(p.layers().is_empty());
        assert!(p.report_layers);
    }

    #[test]
    fn test_layer_mean() {
        let mut m = LayerMetrics::new(4, "MUL");
        assert_eq!(m.mean(), Duration::ZERO);
        m.record(Duration::from_millis(2));
        m.record(Duration::from_millis(4));
        assert_eq!(m.mean(), Duration::from_millis(3));
        assert_eq!(m.min, Duration::from_millis(2));
        assert_eq!(m.max, Duration::from_millis(4));
    }
}
