// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for arena management.

/// Errors that can occur while allocating from or resolving buffers in the arena.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    /// The request does not fit in the space left between the planned head
    /// and the persistent tail.
    #[error("arena exhausted: requested {requested} bytes, but only {available} available (capacity: {capacity})")]
    Exhausted {
        requested: usize,
        available: usize,
        capacity: usize,
    },

    /// The caller supplied an empty byte buffer.
    #[error("cannot build an arena over a zero-sized buffer")]
    ZeroSizedArena,

    /// A buffer id that this arena never issued.
    #[error("unknown arena buffer {0}")]
    UnknownBuffer(usize),

    /// A planned buffer was accessed before tensor allocation finished.
    #[error("arena buffer {0} has no location yet; tensor allocation has not finished")]
    NotPlanned(usize),

    /// A planned request arrived after the layout was frozen.
    #[error("arena layout is frozen; no further planned buffers can be requested")]
    Frozen,

    /// A liveness interval ends before it starts.
    #[error("invalid live range [{first}, {last}]")]
    InvalidLiveRange { first: usize, last: usize },

    /// Two spans handed to the carver share bytes.
    #[error("arena spans overlap at offset {offset}")]
    Overlap { offset: usize },

    /// A span reaches past the end of the arena.
    #[error("span [{offset}, +{len}) exceeds arena capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// More spans were requested at once than the carver supports.
    #[error("{count} spans requested at once (max {max})")]
    TooManySpans { count: usize, max: usize },

    /// A human-readable arena size could not be parsed.
    #[error("invalid arena size: {0}")]
    InvalidSize(String),
}
