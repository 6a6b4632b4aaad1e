// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The fixed-size tensor arena.
//!
//! The [`Arena`] borrows one caller-owned byte buffer for its whole life and
//! never touches the host heap for tensor data. It serves two kinds of
//! memory from opposite ends:
//!
//! ```text
//!  0                         head            tail                  capacity
//!  ├── planned buffers ───────┤ ── free ──── ├── persistent buffers ──┤
//!      (tensors + scratch,                     (bump-allocated
//!       liveness-packed)                        downwards, never freed)
//! ```
//!
//! 1. **Persistent** buffers are bump-allocated from the tail and get their
//!    offset immediately.
//! 2. **Planned** buffers (activation tensors and scratch buffers) are only
//!    recorded with a size and a [`LiveRange`]. [`Arena::finish_tensor_allocation`]
//!    packs them all at once with [`plan_offsets`] and freezes the layout.
//!
//! Callers never see addresses. Every allocation is a [`BufferRecord`] in a
//! side table, addressed by a [`BufferId`]; the arena alone resolves ids to
//! bytes, either one at a time or several disjoint ones at once through
//! [`Arena::carve`].

use crate::planner::{align_up, plan_offsets, LiveRange, PlanItem};
use crate::{ArenaError, ArenaStats};
use std::fmt;

/// Alignment of every buffer offset handed out by the arena.
pub const ARENA_ALIGNMENT: usize = 16;

/// Maximum number of spans [`Arena::carve`] resolves in one call.
pub const MAX_CARVE_SPANS: usize = 32;

/// Opaque handle to one arena allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct BufferId(usize);

impl BufferId {
    /// Position of the record in the arena's side table.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an allocation is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum BufferKind {
    /// Lives until the arena is dropped.
    Persistent,
    /// Requested by a kernel for the nodes in its live range.
    Scratch,
    /// Backing storage of an arena-owned tensor.
    Tensor,
}

/// One entry in the arena's side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferRecord {
    pub kind: BufferKind,
    pub size: usize,
    /// Byte offset; `None` for planned buffers until allocation finishes.
    pub offset: Option<usize>,
    /// Liveness interval; `None` for persistent buffers.
    pub live: Option<LiveRange>,
}

/// A byte range inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

/// A fixed-capacity allocator over a caller-owned byte buffer.
pub struct Arena<'a> {
    buf: &'a mut [u8],
    capacity: usize,
    /// Start of the persistent region.
    tail: usize,
    /// End of the planned region (0 until allocation finishes).
    head: usize,
    records: Vec<BufferRecord>,
    frozen: bool,
    failed_requests: usize,
}

impl<'a> Arena<'a> {
    /// Creates an arena over `buf`. The usable capacity is the buffer length
    /// rounded down to [`ARENA_ALIGNMENT`].
    pub fn new(buf: &'a mut [u8]) -> Result<Self, ArenaError> {
        let capacity = buf.len() & !(ARENA_ALIGNMENT - 1);
        if capacity == 0 {
            return Err(ArenaError::ZeroSizedArena);
        }
        Ok(Self {
            buf,
            capacity,
            tail: capacity,
            head: 0,
            records: Vec::new(),
            frozen: false,
            failed_requests: 0,
        })
    }

    /// Returns the usable capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the bytes taken by persistent buffers.
    pub fn persistent_bytes(&self) -> usize {
        self.capacity - self.tail
    }

    /// Returns the bytes taken by planned buffers once allocation finished.
    pub fn head_bytes(&self) -> usize {
        self.head
    }

    /// Returns the bytes still free between head and tail.
    pub fn available_bytes(&self) -> usize {
        self.tail - self.head
    }

    /// Returns `true` once the planned layout has been committed.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Returns the number of records in the side table.
    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    /// Looks up a record.
    pub fn record(&self, id: BufferId) -> Result<&BufferRecord, ArenaError> {
        self.records
            .get(id.0)
            .ok_or(ArenaError::UnknownBuffer(id.0))
    }

    /// Bump-allocates `size` bytes from the tail. The buffer is zeroed and
    /// lives until the arena is dropped.
    pub fn allocate_persistent(&mut self, size: usize) -> Result<BufferId, ArenaError> {
        let aligned = match self.fitting_size(size) {
            Ok(aligned) => aligned,
            Err(e) => {
                self.failed_requests += 1;
                return Err(e);
            }
        };
        self.tail -= aligned;
        self.buf[self.tail..self.tail + size].fill(0);
        Ok(self.push(BufferRecord {
            kind: BufferKind::Persistent,
            size,
            offset: Some(self.tail),
            live: None,
        }))
    }

    /// Records a scratch buffer live over `live`. Its location is fixed by
    /// [`finish_tensor_allocation`](Self::finish_tensor_allocation).
    pub fn request_scratch(&mut self, live: LiveRange, size: usize) -> Result<BufferId, ArenaError> {
        self.push_planned(BufferKind::Scratch, live, size)
    }

    /// Records an arena-owned tensor live over `live`.
    pub fn plan_tensor(&mut self, live: LiveRange, size: usize) -> Result<BufferId, ArenaError> {
        self.push_planned(BufferKind::Tensor, live, size)
    }

    fn push_planned(
        &mut self,
        kind: BufferKind,
        live: LiveRange,
        size: usize,
    ) -> Result<BufferId, ArenaError> {
        if self.frozen {
            return Err(ArenaError::Frozen);
        }
        if let Err(e) = self.fitting_size(size) {
            self.failed_requests += 1;
            return Err(e);
        }
        Ok(self.push(BufferRecord {
            kind,
            size,
            offset: None,
            live: Some(live),
        }))
    }

    fn push(&mut self, record: BufferRecord) -> BufferId {
        self.records.push(record);
        BufferId(self.records.len() - 1)
    }

    /// Aligned size of a `size`-byte request, if it fits in the free gap.
    fn fitting_size(&self, size: usize) -> Result<usize, ArenaError> {
        let available = self.available_bytes();
        match align_up(size, ARENA_ALIGNMENT) {
            Some(aligned) if size <= available && aligned <= available => Ok(aligned),
            Some(aligned) => Err(self.exhausted(aligned)),
            None => Err(self.exhausted(size)),
        }
    }

    fn exhausted(&self, requested: usize) -> ArenaError {
        ArenaError::Exhausted {
            requested,
            available: self.available_bytes(),
            capacity: self.capacity,
        }
    }

    /// Packs every planned buffer, commits the offsets and freezes the layout.
    ///
    /// Calling this again once frozen is a no-op: no planned request can
    /// arrive after freezing, so nothing could move. If the packed head does
    /// not fit below the persistent tail, nothing is committed.
    pub fn finish_tensor_allocation(&mut self) -> Result<(), ArenaError> {
        if self.frozen {
            return Ok(());
        }

        let planned: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.kind != BufferKind::Persistent)
            .map(|(i, _)| i)
            .collect();
        let items: Vec<PlanItem> = planned
            .iter()
            .filter_map(|&i| {
                let r = &self.records[i];
                r.live.map(|live| PlanItem { size: r.size, live })
            })
            .collect();

        let plan = plan_offsets(&items, ARENA_ALIGNMENT);
        if plan.head_bytes > self.tail {
            self.failed_requests += 1;
            return Err(ArenaError::Exhausted {
                requested: plan.head_bytes,
                available: self.tail,
                capacity: self.capacity,
            });
        }

        for (&record_idx, &offset) in planned.iter().zip(&plan.offsets) {
            self.records[record_idx].offset = Some(offset);
        }
        self.head = plan.head_bytes;
        self.frozen = true;

        tracing::debug!(
            "arena layout frozen: {} planned buffers in {} bytes, {} persistent bytes, {} free",
            items.len(),
            self.head,
            self.persistent_bytes(),
            self.available_bytes(),
        );
        Ok(())
    }

    /// Resolves a buffer id to its byte range.
    pub fn span(&self, id: BufferId) -> Result<Span, ArenaError> {
        let record = self.record(id)?;
        let offset = record.offset.ok_or(ArenaError::NotPlanned(id.0))?;
        Ok(Span {
            offset,
            len: record.size,
        })
    }

    /// Returns the bytes of one buffer.
    pub fn buffer(&self, id: BufferId) -> Result<&[u8], ArenaError> {
        let span = self.span(id)?;
        Ok(&self.buf[span.offset..span.offset + span.len])
    }

    /// Returns the bytes of one buffer mutably.
    pub fn buffer_mut(&mut self, id: BufferId) -> Result<&mut [u8], ArenaError> {
        let span = self.span(id)?;
        Ok(&mut self.buf[span.offset..span.offset + span.len])
    }

    /// Splits the arena into one exclusive slice per span, without copying
    /// and without heap allocation.
    ///
    /// `out[i]` receives the slice for `spans[i]`. A span identical to an
    /// earlier one is not split twice: `aliases[i]` is set to the index that
    /// holds its slice and `out[i]` stays `None`. Zero-length spans get an
    /// empty slice. Any other overlap is an error.
    pub fn carve<'s>(
        &'s mut self,
        spans: &[Span],
        out: &mut [Option<&'s mut [u8]>],
        aliases: &mut [Option<usize>],
    ) -> Result<(), ArenaError> {
        let count = spans.len();
        if count > MAX_CARVE_SPANS || out.len() < count || aliases.len() < count {
            return Err(ArenaError::TooManySpans {
                count,
                max: MAX_CARVE_SPANS.min(out.len()).min(aliases.len()),
            });
        }
        let capacity = self.capacity;
        for span in spans {
            if span.offset + span.len > capacity {
                return Err(ArenaError::OutOfBounds {
                    offset: span.offset,
                    len: span.len,
                    capacity,
                });
            }
        }

        let mut order = [0usize; MAX_CARVE_SPANS];
        let order = &mut order[..count];
        for (i, slot) in order.iter_mut().enumerate() {
            *slot = i;
        }
        order.sort_unstable_by_key(|&i| (spans[i].offset, spans[i].len, i));

        let mut rest: &'s mut [u8] = &mut self.buf[..capacity];
        let mut cursor = 0;
        let mut previous: Option<usize> = None;

        for &i in order.iter() {
            let span = spans[i];
            aliases[i] = None;
            if span.len == 0 {
                out[i] = Some(Default::default());
                continue;
            }
            if let Some(p) = previous {
                if spans[p] == span {
                    aliases[i] = Some(p);
                    out[i] = None;
                    continue;
                }
            }
            if span.offset < cursor {
                return Err(ArenaError::Overlap {
                    offset: span.offset,
                });
            }
            let (_, after) = std::mem::take(&mut rest).split_at_mut(span.offset - cursor);
            let (piece, after) = after.split_at_mut(span.len);
            out[i] = Some(piece);
            rest = after;
            cursor = span.offset + span.len;
            previous = Some(i);
        }
        Ok(())
    }

    /// Drops every record and restores the full capacity. Byte contents are
    /// left as they are.
    pub fn reset(&mut self) {
        self.records.clear();
        self.tail = self.capacity;
        self.head = 0;
        self.frozen = false;
    }

    /// Returns a snapshot of arena usage.
    pub fn stats(&self) -> ArenaStats {
        let mut stats = ArenaStats {
            capacity: self.capacity,
            persistent_bytes: self.persistent_bytes(),
            head_bytes: self.head,
            failed_requests: self.failed_requests,
            ..Default::default()
        };
        for record in &self.records {
            match record.kind {
                BufferKind::Persistent => stats.persistent_allocations += 1,
                BufferKind::Scratch => stats.scratch_buffers += 1,
                BufferKind::Tensor => stats.tensor_buffers += 1,
            }
            if record.kind != BufferKind::Persistent {
                stats.unpacked_bytes = stats
                    .unpacked_bytes
                    .saturating_add(align_up(record.size, ARENA_ALIGNMENT).unwrap_or(usize::MAX));
            }
        }
        stats
    }
}

impl fmt::Debug for Arena<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("head_bytes", &self.head)
            .field("persistent_bytes", &self.persistent_bytes())
            .field("records", &self.records.len())
            .field("frozen", &self.frozen)
            .finish()
    }
}
