// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Arena size configuration and parsing.
//!
//! Microcontroller arenas are measured in kilobytes, so [`ArenaSize`]
//! parses the same suffixes the CLI and config file accept (`"60K"`,
//! `"1M"`, plain byte counts).

use crate::ArenaError;
use std::fmt;

/// The byte size of a tensor arena.
///
/// # Parsing
/// - `"60K"` or `"60KB"` → 60 × 1024 bytes
/// - `"1M"` or `"1MB"` → 1 × 1024² bytes
/// - `"4096"` or `"4096B"` → raw byte count
///
/// # Examples
/// ```
/// use memory_manager::ArenaSize;
///
/// let s = ArenaSize::parse("60K").unwrap();
/// assert_eq!(s.as_bytes(), 60 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ArenaSize {
    bytes: usize,
}

impl ArenaSize {
    /// Creates a size from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a size from kilobytes.
    pub fn from_kb(kb: usize) -> Self {
        Self { bytes: kb * 1024 }
    }

    /// Returns the size in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses a human-readable size string. Case-insensitive.
    pub fn parse(s: &str) -> Result<Self, ArenaError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ArenaError::ZeroSizedArena);
        }

        let upper = s.to_uppercase();
        let (num_str, multiplier) = if let Some(n) = upper.strip_suffix("MB") {
            (n, 1024 * 1024)
        } else if let Some(n) = upper.strip_suffix('M') {
            (n, 1024 * 1024)
        } else if let Some(n) = upper.strip_suffix("KB") {
            (n, 1024)
        } else if let Some(n) = upper.strip_suffix('K') {
            (n, 1024)
        } else if let Some(n) = upper.strip_suffix('B') {
            (n, 1)
        } else {
            (upper.as_str(), 1)
        };

        let value: usize = num_str.trim().parse().map_err(|_| {
            ArenaError::InvalidSize(format!(
                "'{s}': expected a number followed by an optional K or M suffix"
            ))
        })?;
        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| ArenaError::InvalidSize(format!("'{s}' overflows")))?;
        if bytes == 0 {
            return Err(ArenaError::ZeroSizedArena);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for ArenaSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes >= 1024 * 1024 && self.bytes % (1024 * 1024) == 0 {
            write!(f, "{} MB", self.bytes / (1024 * 1024))
        } else if self.bytes >= 1024 && self.bytes % 1024 == 0 {
            write!(f, "{} KB", self.bytes / 1024)
        } else {
            write!(f, "{} B", self.bytes)
        }
    }
}
