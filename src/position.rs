// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Positions: an (object, index) cursor into a sequence.
//
// The chain is forward-linked only, so positions can never be normalized
// backward. Producing or comparing a position rolls it forward across
// block boundaries: "just past the end of block A" and "start of block B"
// are the same position, and zero-length segments are skipped. Equality is
// always checked after rolling.

use std::sync::Arc;

use crate::block::{ArrayChunk, Block};

/// What a position points into.
pub(crate) enum PositionTarget<T> {
    Block(Arc<Block<T>>),
    Array(Arc<ArrayChunk<T>>),
}

impl<T> Clone for PositionTarget<T> {
    fn clone(&self) -> Self {
        match self {
            PositionTarget::Block(b) => PositionTarget::Block(Arc::clone(b)),
            PositionTarget::Array(a) => PositionTarget::Array(Arc::clone(a)),
        }
    }
}

/// A cursor just before the element at `index` within its target, or at
/// the very end of the addressed range.
pub struct SequencePosition<T> {
    pub(crate) target: Option<PositionTarget<T>>,
    pub(crate) index: u32,
}

impl<T> SequencePosition<T> {
    /// The position of an empty sequence.
    pub(crate) fn none() -> Self {
        SequencePosition {
            target: None,
            index: 0,
        }
    }

    pub(crate) fn block(block: Arc<Block<T>>, index: u32) -> Self {
        SequencePosition {
            target: Some(PositionTarget::Block(block)),
            index,
        }
    }

    pub(crate) fn array(chunk: Arc<ArrayChunk<T>>, index: u32) -> Self {
        SequencePosition {
            target: Some(PositionTarget::Array(chunk)),
            index,
        }
    }

    /// Offset within the target object.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Whether the position carries no target object.
    pub fn is_none(&self) -> bool {
        self.target.is_none()
    }

    /// Roll the position forward across exhausted and empty segments.
    ///
    /// For a block target at `index == len`, advance to `(next, 0)` while
    /// a next block exists; repeating the step also skips any zero-length
    /// intermediate segments. Array targets have no forward link.
    pub fn normalized(&self) -> SequencePosition<T> {
        let mut pos = self.clone();
        while let Some(PositionTarget::Block(block)) = &pos.target {
            if pos.index < block.len() {
                break;
            }
            match block.next() {
                Some(next) => {
                    pos = SequencePosition::block(next, 0);
                }
                None => break,
            }
        }
        pos
    }

    /// Element-unit offset of this position in its logical stream
    /// (running index of the block plus the in-block offset).
    pub fn logical_index(&self) -> u64 {
        match &self.target {
            Some(PositionTarget::Block(block)) => block.running_index() + u64::from(self.index),
            Some(PositionTarget::Array(_)) | None => u64::from(self.index),
        }
    }

    /// Identity comparison of the (already normalized) targets.
    fn same_target(a: &Option<PositionTarget<T>>, b: &Option<PositionTarget<T>>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(PositionTarget::Block(x)), Some(PositionTarget::Block(y))) => Arc::ptr_eq(x, y),
            (Some(PositionTarget::Array(x)), Some(PositionTarget::Array(y))) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }
}

impl<T> Clone for SequencePosition<T> {
    fn clone(&self) -> Self {
        SequencePosition {
            target: self.target.clone(),
            index: self.index,
        }
    }
}

impl<T> PartialEq for SequencePosition<T> {
    fn eq(&self, other: &Self) -> bool {
        let a = self.normalized();
        let b = other.normalized();
        SequencePosition::same_target(&a.target, &b.target) && a.index == b.index
    }
}

impl<T> Eq for SequencePosition<T> {}

impl<T> std::fmt::Debug for SequencePosition<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            None => write!(f, "SequencePosition(none, {})", self.index),
            Some(PositionTarget::Array(chunk)) => {
                write!(f, "SequencePosition(array[{}], {})", chunk.len(), self.index)
            }
            Some(PositionTarget::Block(block)) => write!(
                f,
                "SequencePosition(block#{}, {})",
                block.segment_index(),
                self.index
            ),
        }
    }
}
