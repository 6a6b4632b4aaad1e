// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena usage statistics.
//!
//! [`ArenaStats`] reports how the fixed buffer was carved up. The numbers
//! are what you need to size the arena for a given model: the minimum
//! capacity is `persistent_bytes + head_bytes`.

/// A snapshot of arena usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ArenaStats {
    /// Total usable bytes in the arena.
    pub capacity: usize,
    /// Bytes taken by persistent buffers at the tail.
    pub persistent_bytes: usize,
    /// Bytes taken by planned buffers (tensors + scratch) at the head.
    pub head_bytes: usize,
    /// Sum of all planned buffer sizes, i.e. the head size without reuse.
    pub unpacked_bytes: usize,
    /// Number of persistent allocations served.
    pub persistent_allocations: usize,
    /// Number of scratch buffers requested.
    pub scratch_buffers: usize,
    /// Number of tensor buffers planned.
    pub tensor_buffers: usize,
    /// Number of requests refused for lack of space.
    pub failed_requests: usize,
}

impl ArenaStats {
    /// Bytes in use at either end of the arena.
    pub fn used_bytes(&self) -> usize {
        self.persistent_bytes + self.head_bytes
    }

    /// Fraction of planned bytes saved by liveness packing, in `[0.0, 1.0)`.
    ///
    /// Returns `0.0` if nothing has been planned.
    pub fn reuse_ratio(&self) -> f64 {
        if self.unpacked_bytes == 0 {
            return 0.0;
        }
        1.0 - self.head_bytes.min(self.unpacked_bytes) as f64 / self.unpacked_bytes as f64
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Arena: {} / {} bytes used ({} persistent in {} allocs, {} planned for {} tensors + {} scratch, {:.0}% saved by reuse), {} failed requests",
            self.used_bytes(),
            self.capacity,
            self.persistent_bytes,
            self.persistent_allocations,
            self.head_bytes,
            self.tensor_buffers,
            self.scratch_buffers,
            self.reuse_ratio() * 100.0,
            self.failed_requests,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = ArenaStats::default();
        assert_eq!(s.used_bytes(), 0);
        assert_eq!(s.reuse_ratio(), 0.0);
    }

    #[test]
    fn test_reuse_ratio() {
        let s = ArenaStats {
            head_bytes: 256,
            unpacked_bytes: 1024,
            ..Default::default()
        };
        assert!((s.reuse_ratio() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_summary() {
        let s = ArenaStats {
            capacity: 4096,
            persistent_bytes: 64,
            head_bytes: 512,
            unpacked_bytes: 512,
            persistent_allocations: 2,
            scratch_buffers: 1,
            tensor_buffers: 3,
            failed_requests: 0,
        };
        let summary = s.summary();
        assert!(summary.contains("576 / 4096"));
        assert!(summary.contains("3 tensors + 1 scratch"));
    }
}
