// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// References: a compact pointer-equivalent to one element inside a block
// or array chunk. Pure value; holds the storage alive via `Arc` but never
// extends the logical lifetime of arena contents.

use std::sync::Arc;

use crate::error::{ArenaError, Result};
use crate::position::{PositionTarget, SequencePosition};
use crate::sequence::SequenceSegment;

/// A reference to a single element.
///
/// Equality is identity of the referenced object plus offset equality,
/// not element value equality.
pub struct Reference<T> {
    target: PositionTarget<T>,
    offset: u32,
}

impl<T> Reference<T> {
    pub(crate) fn from_block(
        block: Arc<crate::block::Block<T>>,
        offset: u32,
    ) -> Reference<T> {
        debug_assert!(offset < block.len());
        Reference {
            target: PositionTarget::Block(block),
            offset,
        }
    }

    pub(crate) fn from_array(
        chunk: Arc<crate::block::ArrayChunk<T>>,
        offset: u32,
    ) -> Reference<T> {
        debug_assert!(offset < chunk.len());
        Reference {
            target: PositionTarget::Array(chunk),
            offset,
        }
    }

    /// Decompose a sequence segment into a reference to its `index`-th
    /// element.
    pub fn from_memory(segment: &SequenceSegment<T>, index: usize) -> Result<Reference<T>> {
        if index >= segment.len() {
            return Err(ArenaError::IndexOutOfRange {
                index,
                length: segment.len(),
            });
        }
        Ok(segment.reference_at(index as u32))
    }

    /// Build a reference to the element a position points at. Fails with
    /// `UnsupportedMemoryShape` for the empty position and with
    /// `IndexOutOfRange` for a position at the very end of its target.
    pub fn from_position(position: &SequencePosition<T>) -> Result<Reference<T>> {
        let position = position.normalized();
        let target = position
            .target
            .clone()
            .ok_or(ArenaError::UnsupportedMemoryShape)?;
        let length = match &target {
            PositionTarget::Block(b) => b.len(),
            PositionTarget::Array(a) => a.len(),
        };
        if position.index >= length {
            return Err(ArenaError::IndexOutOfRange {
                index: position.index as usize,
                length: length as usize,
            });
        }
        Ok(Reference {
            target,
            offset: position.index,
        })
    }

    /// Offset of the element within its backing object.
    pub fn offset(&self) -> usize {
        self.offset as usize
    }

    /// Whether the backing storage has a stable, reinterpretable base.
    pub fn is_pinned(&self) -> bool {
        match &self.target {
            PositionTarget::Block(b) => b.pinned(),
            PositionTarget::Array(_) => false,
        }
    }

    /// Shared access to the element.
    pub fn get(&self) -> &T {
        let ptr = match &self.target {
            PositionTarget::Block(b) => b.element_ptr(self.offset),
            PositionTarget::Array(a) => a.element_ptr(self.offset),
        };
        unsafe { &*ptr.as_ptr() }
    }

    /// Copy the element out.
    pub fn value(&self) -> T
    where
        T: Copy,
    {
        *self.get()
    }

    /// Overwrite the element. Assignment, so a replaced `Drop`-bearing
    /// value is dropped properly.
    pub fn set(&self, value: T) {
        let ptr = match &self.target {
            PositionTarget::Block(b) => b.element_ptr(self.offset),
            PositionTarget::Array(a) => a.element_ptr(self.offset),
        };
        unsafe {
            *ptr.as_ptr() = value;
        }
    }

    /// The position just before the referenced element.
    pub fn position(&self) -> SequencePosition<T> {
        SequencePosition {
            target: Some(self.target.clone()),
            index: self.offset,
        }
    }
}

impl<T> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Reference {
            target: self.target.clone(),
            offset: self.offset,
        }
    }
}

impl<T> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        let same = match (&self.target, &other.target) {
            (PositionTarget::Block(a), PositionTarget::Block(b)) => Arc::ptr_eq(a, b),
            (PositionTarget::Array(a), PositionTarget::Array(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same && self.offset == other.offset
    }
}

impl<T> Eq for Reference<T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reference")
            .field("offset", &self.offset)
            .field("value", self.get())
            .finish()
    }
}
