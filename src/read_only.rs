// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Read-only sequences: the externally-compatible (start, end) position
// pair. Round-trips with `Sequence` when both ends refer to compatible
// segment objects.

use crate::error::Result;
use crate::position::SequencePosition;
use crate::sequence::{Segments, Sequence};

/// A read-only view over a range between two positions.
pub struct ReadOnlySequence<T> {
    start: SequencePosition<T>,
    end: SequencePosition<T>,
}

impl<T> ReadOnlySequence<T> {
    /// Build from positions known to be compatible (crate-internal
    /// callers derive both from one sequence).
    pub(crate) fn from_positions_unchecked(
        start: SequencePosition<T>,
        end: SequencePosition<T>,
    ) -> ReadOnlySequence<T> {
        ReadOnlySequence { start, end }
    }

    /// Build from arbitrary positions, validating that they bound a
    /// reconstructible range.
    pub fn new(start: SequencePosition<T>, end: SequencePosition<T>) -> Result<ReadOnlySequence<T>> {
        Sequence::try_from_positions(start.clone(), end.clone())?;
        Ok(ReadOnlySequence { start, end })
    }

    /// The (normalized) start position.
    pub fn start_position(&self) -> SequencePosition<T> {
        self.start.normalized()
    }

    /// The (normalized) end position.
    pub fn end_position(&self) -> SequencePosition<T> {
        self.end.normalized()
    }

    /// Number of elements between the two positions.
    pub fn len(&self) -> usize {
        let start = self.start.logical_index();
        let end = self.end.logical_index();
        end.saturating_sub(start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reconstruct the writable descriptor for this range.
    pub fn to_sequence(&self) -> Result<Sequence<T>> {
        Sequence::try_from_read_only(self)
    }

    /// Iterate the segments of the range. An unreconstructible view
    /// yields nothing.
    pub fn segments(&self) -> Segments<T> {
        self.to_sequence()
            .unwrap_or_else(|_| Sequence::empty())
            .segments()
    }
}

impl<T> Clone for ReadOnlySequence<T> {
    fn clone(&self) -> Self {
        ReadOnlySequence {
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }
}

impl<T> std::fmt::Debug for ReadOnlySequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlySequence")
            .field("len", &self.len())
            .finish()
    }
}
