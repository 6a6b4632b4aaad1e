// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Diagnostic sinks.
//!
//! Every failure the interpreter returns is also described once through an
//! [`ErrorReporter`]. Reporting never changes control flow.

use std::cell::RefCell;
use std::fmt;

/// Receives human-readable diagnostics.
///
/// Implementations must not block or panic.
pub trait ErrorReporter {
    fn report(&self, args: fmt::Arguments<'_>);
}

/// Forwards diagnostics to `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, args: fmt::Arguments<'_>) {
        tracing::error!("{args}");
    }
}

/// Keeps diagnostics in memory, for tests and for callers that surface
/// them elsewhere.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    messages: RefCell<Vec<String>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every message reported so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.borrow().is_empty()
    }

    /// Returns `true` if any message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.borrow().iter().any(|m| m.contains(needle))
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, args: fmt::Arguments<'_>) {
        self.messages.borrow_mut().push(args.to_string());
    }
}
