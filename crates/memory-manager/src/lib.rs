// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! A fixed-size tensor arena for interpreters that must never touch the
//! host heap for tensor data.
//!
//! # Key Components
//!
//! - [`Arena`]: borrows one caller-owned byte buffer and serves persistent
//!   allocations from its tail and liveness-packed buffers from its head.
//! - [`LiveRange`] and [`plan_offsets`]: the offline packer. Buffers whose
//!   node ranges do not overlap share bytes.
//! - [`ArenaSize`]: human-readable arena sizes (`"60K"`, `"2MB"`).
//! - [`ArenaStats`]: usage snapshot (head, persistent, reuse ratio).
//!
//! # Lifecycle
//!
//! ```text
//! Arena::new(&mut buf)
//!       │
//!       ├── allocate_persistent(size)      ──► offset fixed now (tail)
//!       ├── plan_tensor(range, size)       ──┐
//!       ├── request_scratch(range, size)   ──┤ offsets pending
//!       │                                    │
//!       ▼                                    ▼
//!   finish_tensor_allocation()  ──► plan_offsets ──► layout frozen
//!       │
//!       ▼
//!   buffer(id) / buffer_mut(id) / carve(spans)
//! ```
//!
//! # Example
//! ```
//! use memory_manager::{Arena, LiveRange};
//!
//! let mut buf = vec![0u8; 1024];
//! let mut arena = Arena::new(&mut buf).unwrap();
//!
//! let a = arena.plan_tensor(LiveRange::new(0, 1).unwrap(), 256).unwrap();
//! let b = arena.plan_tensor(LiveRange::new(2, 3).unwrap(), 256).unwrap();
//! arena.finish_tensor_allocation().unwrap();
//!
//! // Disjoint lifetimes share the same bytes.
//! assert_eq!(arena.span(a).unwrap().offset, arena.span(b).unwrap().offset);
//! assert_eq!(arena.head_bytes(), 256);
//! ```

mod arena;
mod error;
pub mod planner;
mod size;
mod stats;

pub use arena::{Arena, BufferId, BufferKind, BufferRecord, Span, ARENA_ALIGNMENT, MAX_CARVE_SPANS};
pub use error::ArenaError;
pub use planner::{plan_offsets, LiveRange, OffsetPlan, PlanItem};
pub use size::ArenaSize;
pub use stats::ArenaStats;
