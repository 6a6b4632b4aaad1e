// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Liveness-based offset planning for non-persistent arena buffers.
//!
//! Every activation tensor and scratch buffer is live over a closed interval
//! of node indices. Two buffers whose intervals do not overlap can occupy the
//! same bytes; two buffers whose intervals overlap never do. [`plan_offsets`]
//! assigns offsets greedily:
//!
//! 1. Order buffers by size (largest first), then by first use.
//! 2. For each buffer, walk the already-placed buffers that are live at the
//!    same time, in offset order, and take the first gap that fits.
//!
//! This is the usual interval-colouring heuristic for static arenas: it is
//! not optimal, but it is deterministic and cheap enough to run once at
//! startup.

use crate::ArenaError;

/// A closed interval `[first, last]` of node indices during which a buffer
/// must keep its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct LiveRange {
    pub first: usize,
    pub last: usize,
}

impl LiveRange {
    /// Creates a range, rejecting `last < first`.
    pub fn new(first: usize, last: usize) -> Result<Self, ArenaError> {
        if last < first {
            return Err(ArenaError::InvalidLiveRange { first, last });
        }
        Ok(Self { first, last })
    }

    /// A range covering a single node.
    pub fn at(node: usize) -> Self {
        Self {
            first: node,
            last: node,
        }
    }

    /// Returns `true` if both ranges include at least one common node.
    pub fn overlaps(&self, other: &LiveRange) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    /// Returns `true` if `node` lies inside the range.
    pub fn contains(&self, node: usize) -> bool {
        self.first <= node && node <= self.last
    }
}

/// One buffer to be placed by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanItem {
    pub size: usize,
    pub live: LiveRange,
}

/// The planner's output: one offset per input item, plus the high-water mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPlan {
    /// `offsets[i]` is the byte offset of `items[i]`.
    pub offsets: Vec<usize>,
    /// Bytes needed at the head of the arena to hold every item.
    pub head_bytes: usize,
}

/// Rounds `value` up to the next multiple of `alignment` (a power of two).
/// Returns `None` if the result does not fit in `usize`.
pub fn align_up(value: usize, alignment: usize) -> Option<usize> {
    debug_assert!(alignment.is_power_of_two());
    Some(value.checked_add(alignment - 1)? & !(alignment - 1))
}

fn align_up_saturating(value: usize, alignment: usize) -> usize {
    align_up(value, alignment).unwrap_or(usize::MAX)
}

/// Assigns an aligned offset to every item so that time-overlapping items
/// never share bytes.
///
/// Offsets saturate at `usize::MAX` instead of overflowing; a plan whose
/// `head_bytes` saturated cannot fit any arena.
pub fn plan_offsets(items: &[PlanItem], alignment: usize) -> OffsetPlan {
    let mut order: Vec<usize> = (0..items.len()).collect();
    order.sort_by(|&a, &b| {
        items[b]
            .size
            .cmp(&items[a].size)
            .then(items[a].live.first.cmp(&items[b].live.first))
            .then(a.cmp(&b))
    });

    let mut offsets = vec![0usize; items.len()];
    let mut placed: Vec<usize> = Vec::with_capacity(items.len());
    let mut head_bytes: usize = 0;

    for idx in order {
        let item = items[idx];
        if item.size == 0 {
            continue;
        }

        let mut neighbours: Vec<usize> = placed
            .iter()
            .copied()
            .filter(|&p| items[p].live.overlaps(&item.live))
            .collect();
        neighbours.sort_by_key(|&p| offsets[p]);

        let mut candidate: usize = 0;
        for p in neighbours {
            if candidate.saturating_add(item.size) <= offsets[p] {
                break;
            }
            let end = offsets[p].saturating_add(items[p].size);
            candidate = candidate.max(align_up_saturating(end, alignment));
        }

        offsets[idx] = candidate;
        head_bytes = head_bytes.max(candidate.saturating_add(item.size));
        placed.push(idx);
    }

    OffsetPlan {
        offsets,
        head_bytes: align_up_saturating(head_bytes, alignment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(size: usize, first: usize, last: usize) -> PlanItem {
        PlanItem {
            size,
            live: LiveRange::new(first, last).unwrap(),
        }
    }

    fn assert_no_conflicts(items: &[PlanItem], plan: &OffsetPlan) {
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                if items[i].size == 0 || items[j].size == 0 {
                    continue;
                }
                if !items[i].live.overlaps(&items[j].live) {
                    continue;
                }
                let (a0, a1) = (plan.offsets[i], plan.offsets[i] + items[i].size);
                let (b0, b1) = (plan.offsets[j], plan.offsets[j] + items[j].size);
                assert!(a1 <= b0 || b1 <= a0, "items {i} and {j} overlap in memory");
            }
        }
    }

    #[test]
    fn test_live_range_validation() {
        assert!(LiveRange::new(3, 2).is_err());
        assert!(LiveRange::new(2, 2).is_ok());
    }

    #[test]
    fn test_overlap() {
        let a = LiveRange::new(0, 1).unwrap();
        let b = LiveRange::new(1, 3).unwrap();
        let c = LiveRange::at(2);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(b.contains(3));
    }

    #[test]
    fn test_disjoint_lifetimes_share_memory() {
        let items = [item(64, 0, 1), item(64, 2, 2)];
        let plan = plan_offsets(&items, 16);
        assert_eq!(plan.offsets, vec![0, 0]);
        assert_eq!(plan.head_bytes, 64);
    }

    #[test]
    fn test_overlapping_lifetimes_are_stacked() {
        let items = [item(64, 0, 1), item(32, 1, 2)];
        let plan = plan_offsets(&items, 16);
        assert_eq!(plan.offsets, vec![0, 64]);
        assert_eq!(plan.head_bytes, 96);
        assert_no_conflicts(&items, &plan);
    }

    #[test]
    fn test_gap_reuse() {
        // A and C are live together; B fits in the gap A leaves once it is done.
        let items = [item(100, 0, 1), item(40, 2, 3), item(60, 0, 3)];
        let plan = plan_offsets(&items, 4);
        assert_no_conflicts(&items, &plan);
        assert_eq!(plan.offsets[1], 0);
        assert_eq!(plan.head_bytes, 160);
    }

    #[test]
    fn test_alignment() {
        let items = [item(10, 0, 0), item(10, 0, 0)];
        let plan = plan_offsets(&items, 16);
        assert_eq!(plan.offsets, vec![0, 16]);
        assert_eq!(plan.head_bytes, 32);
    }

    #[test]
    fn test_chain_of_activations() {
        // A linear model: tensor i is produced by node i - 1 and consumed by node i.
        let items: Vec<_> = (0..6)
            .map(|i| item(256, i.max(1) - 1, i))
            .collect();
        let plan = plan_offsets(&items, 16);
        assert_no_conflicts(&items, &plan);
        assert_eq!(plan.head_bytes, 512);
    }

    #[test]
    fn test_align_up_overflow() {
        assert_eq!(align_up(17, 16), Some(32));
        assert_eq!(align_up(usize::MAX - 4, 16), None);
    }

    #[test]
    fn test_huge_items_saturate_head() {
        let items = [item(usize::MAX - 4, 0, 1), item(64, 1, 2)];
        let plan = plan_offsets(&items, 16);
        assert_eq!(plan.head_bytes, usize::MAX);
    }

    #[test]
    fn test_zero_sized_items_take_no_space() {
        let items = [item(0, 0, 5), item(32, 0, 5)];
        let plan = plan_offsets(&items, 16);
        assert_eq!(plan.head_bytes, 32);
    }
}
