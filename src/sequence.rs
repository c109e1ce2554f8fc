// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Sequence descriptors: a value type denoting a logically contiguous range
// of elements over one or more blocks.
//
// Four shapes, one per variant:
//   Empty — no storage at all
//   Array — single segment over a standalone array chunk
//   Block — single segment over one chain block
//   Chain — multi-segment: start block + offset, end block + end offset,
//           with the end reachable from the start via `next`
//
// Copying a descriptor is two `Arc` bumps and two u32s; it owns nothing
// and is invalidated (but stays memory-safe) by the arena's reset.

use std::sync::Arc;

use crate::block::{ArrayChunk, Block};
use crate::error::{ArenaError, Result};
use crate::position::{PositionTarget, SequencePosition};
use crate::read_only::ReadOnlySequence;
use crate::reference::Reference;

pub(crate) enum Repr<T> {
    Empty,
    Array {
        chunk: Arc<ArrayChunk<T>>,
        offset: u32,
        len: u32,
    },
    Block {
        block: Arc<Block<T>>,
        offset: u32,
        len: u32,
    },
    Chain {
        start: Arc<Block<T>>,
        start_offset: u32,
        end: Arc<Block<T>>,
        end_offset: u32,
    },
}

impl<T> Clone for Repr<T> {
    fn clone(&self) -> Self {
        match self {
            Repr::Empty => Repr::Empty,
            Repr::Array { chunk, offset, len } => Repr::Array {
                chunk: Arc::clone(chunk),
                offset: *offset,
                len: *len,
            },
            Repr::Block { block, offset, len } => Repr::Block {
                block: Arc::clone(block),
                offset: *offset,
                len: *len,
            },
            Repr::Chain {
                start,
                start_offset,
                end,
                end_offset,
            } => Repr::Chain {
                start: Arc::clone(start),
                start_offset: *start_offset,
                end: Arc::clone(end),
                end_offset: *end_offset,
            },
        }
    }
}

/// A zero-copy range of elements over one or more blocks.
pub struct Sequence<T> {
    pub(crate) repr: Repr<T>,
}

impl<T> Sequence<T> {
    /// The empty sequence.
    pub fn empty() -> Sequence<T> {
        Sequence { repr: Repr::Empty }
    }

    /// Take ownership of `values` as an array-backed single-segment
    /// sequence.
    pub fn from_vec(values: Vec<T>) -> Result<Sequence<T>> {
        if values.len() > u32::MAX as usize {
            return Err(ArenaError::InvalidArgument(
                "sequence length exceeds the 32-bit segment limit",
            ));
        }
        if values.is_empty() {
            return Ok(Sequence::empty());
        }
        let len = values.len() as u32;
        let chunk = ArrayChunk::from_vec(values);
        Ok(Sequence {
            repr: Repr::Array {
                chunk,
                offset: 0,
                len,
            },
        })
    }

    pub(crate) fn single_block(block: Arc<Block<T>>, offset: u32, len: u32) -> Sequence<T> {
        if len == 0 {
            return Sequence::empty();
        }
        Sequence {
            repr: Repr::Block { block, offset, len },
        }
    }

    /// Multi-segment constructor; collapses to a single-segment shape when
    /// start and end land in the same block, and to Empty on zero length.
    pub(crate) fn chain(
        start: Arc<Block<T>>,
        start_offset: u32,
        end: Arc<Block<T>>,
        end_offset: u32,
    ) -> Sequence<T> {
        if Arc::ptr_eq(&start, &end) {
            return Sequence::single_block(start, start_offset, end_offset - start_offset);
        }
        debug_assert!(end.running_index() > start.running_index());
        Sequence {
            repr: Repr::Chain {
                start,
                start_offset,
                end,
                end_offset,
            },
        }
    }

    /// Number of elements covered.
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Empty => 0,
            Repr::Array { len, .. } | Repr::Block { len, .. } => *len as usize,
            Repr::Chain {
                start,
                start_offset,
                end,
                end_offset,
            } => {
                let first = start.running_index() + u64::from(*start_offset);
                let last = end.running_index() + u64::from(*end_offset);
                (last - first) as usize
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the whole range lies in one contiguous segment.
    pub fn is_single_segment(&self) -> bool {
        !matches!(self.repr, Repr::Chain { .. })
    }

    /// Whether the range is backed by a standalone array rather than a
    /// chain block.
    pub fn is_array_backed(&self) -> bool {
        matches!(self.repr, Repr::Array { .. })
    }

    // -----------------------------------------------------------------
    // Indexing
    // -----------------------------------------------------------------

    /// Reference to the `index`-th element.
    pub fn get(&self, index: usize) -> Result<Reference<T>> {
        let length = self.len();
        if index >= length {
            return Err(ArenaError::IndexOutOfRange { index, length });
        }
        match &self.repr {
            Repr::Empty => unreachable!("empty sequences fail the bounds check"),
            Repr::Array { chunk, offset, .. } => Ok(Reference::from_array(
                Arc::clone(chunk),
                offset + index as u32,
            )),
            Repr::Block { block, offset, .. } => Ok(Reference::from_block(
                Arc::clone(block),
                offset + index as u32,
            )),
            Repr::Chain {
                start,
                start_offset,
                end,
                end_offset,
            } => {
                let (block, offset) =
                    chain_locate(start, *start_offset, end, *end_offset, index as u64)?;
                Ok(Reference::from_block(block, offset))
            }
        }
    }

    // -----------------------------------------------------------------
    // Slicing
    // -----------------------------------------------------------------

    /// Everything from `start` to the end of the sequence.
    pub fn slice(&self, start: usize) -> Result<Sequence<T>> {
        let length = self.len();
        if start > length {
            return Err(ArenaError::IndexOutOfRange {
                index: start,
                length,
            });
        }
        if start == length {
            return Ok(Sequence::empty());
        }
        match &self.repr {
            Repr::Empty => Ok(Sequence::empty()),
            Repr::Array { chunk, offset, len } => Ok(Sequence {
                repr: Repr::Array {
                    chunk: Arc::clone(chunk),
                    offset: offset + start as u32,
                    len: len - start as u32,
                },
            }),
            Repr::Block { block, offset, len } => Ok(Sequence {
                repr: Repr::Block {
                    block: Arc::clone(block),
                    offset: offset + start as u32,
                    len: len - start as u32,
                },
            }),
            Repr::Chain {
                start: first,
                start_offset,
                end,
                end_offset,
            } => {
                // Fast path: the new start stays inside the first segment,
                // so the multi-segment shape is retained exactly.
                let first_len = u64::from(first.len() - start_offset);
                if (start as u64) < first_len {
                    return Ok(Sequence::chain(
                        Arc::clone(first),
                        start_offset + start as u32,
                        Arc::clone(end),
                        *end_offset,
                    ));
                }
                let (block, offset) =
                    chain_locate(first, *start_offset, end, *end_offset, start as u64)?;
                Ok(Sequence::chain(block, offset, Arc::clone(end), *end_offset))
            }
        }
    }

    /// A bounded slice of `len` elements starting at `start`.
    pub fn slice_len(&self, start: usize, len: usize) -> Result<Sequence<T>> {
        let length = self.len();
        let end = start.checked_add(len).ok_or(ArenaError::InvalidArgument(
            "slice bounds overflow",
        ))?;
        if end > length {
            return Err(ArenaError::IndexOutOfRange { index: end, length });
        }
        if len == 0 {
            return Ok(Sequence::empty());
        }
        match &self.repr {
            Repr::Empty => Ok(Sequence::empty()),
            Repr::Array { chunk, offset, .. } => Ok(Sequence {
                repr: Repr::Array {
                    chunk: Arc::clone(chunk),
                    offset: offset + start as u32,
                    len: len as u32,
                },
            }),
            Repr::Block { block, offset, .. } => Ok(Sequence {
                repr: Repr::Block {
                    block: Arc::clone(block),
                    offset: offset + start as u32,
                    len: len as u32,
                },
            }),
            Repr::Chain {
                start: first,
                start_offset,
                end: last,
                end_offset,
            } => {
                let (start_block, start_off) =
                    chain_locate(first, *start_offset, last, *end_offset, start as u64)?;
                // Locate the block holding the final element, then step one
                // past it; positions cannot be rolled backward.
                let (end_block, end_elem) =
                    chain_locate(first, *start_offset, last, *end_offset, (end - 1) as u64)?;
                Ok(Sequence::chain(
                    start_block,
                    start_off,
                    end_block,
                    end_elem + 1,
                ))
            }
        }
    }

    // -----------------------------------------------------------------
    // Spans and copies
    // -----------------------------------------------------------------

    /// The first contiguous span of the sequence.
    pub fn first_span(&self) -> &[T] {
        match &self.repr {
            Repr::Empty => &[],
            Repr::Array { chunk, offset, len } => chunk.span(*offset, *len),
            Repr::Block { block, offset, len } => block.span(*offset, *len),
            Repr::Chain {
                start, start_offset, ..
            } => start.span(*start_offset, start.len() - start_offset),
        }
    }

    /// Copy every element into `dst`, which must hold at least `len()`
    /// elements.
    pub fn copy_to(&self, dst: &mut [T]) -> Result<()>
    where
        T: Copy,
    {
        if dst.len() < self.len() {
            return Err(ArenaError::InvalidArgument(
                "destination shorter than the sequence",
            ));
        }
        let mut written = 0;
        for span in self.spans() {
            dst[written..written + span.len()].copy_from_slice(span);
            written += span.len();
        }
        Ok(())
    }

    /// Like [`Sequence::copy_to`] but reports failure as `false`.
    pub fn try_copy_to(&self, dst: &mut [T]) -> bool
    where
        T: Copy,
    {
        self.copy_to(dst).is_ok()
    }

    /// Copy `src` into the front of the sequence. `src` must not be
    /// longer than the sequence.
    pub fn copy_from_slice(&self, src: &[T]) -> Result<()>
    where
        T: Copy,
    {
        if src.len() > self.len() {
            return Err(ArenaError::InvalidArgument(
                "source longer than the sequence",
            ));
        }
        let mut read = 0;
        for segment in self.segments() {
            if read == src.len() {
                break;
            }
            let take = segment.len().min(src.len() - read);
            segment.as_mut_slice()[..take].copy_from_slice(&src[read..read + take]);
            read += take;
        }
        Ok(())
    }

    /// Overwrite every element with `value`.
    pub fn fill(&self, value: T)
    where
        T: Copy,
    {
        for segment in self.segments() {
            segment.as_mut_slice().fill(value);
        }
    }

    /// Collect the elements into a `Vec`.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        let mut out = Vec::with_capacity(self.len());
        for span in self.spans() {
            out.extend_from_slice(span);
        }
        out
    }

    // -----------------------------------------------------------------
    // Positions
    // -----------------------------------------------------------------

    /// Normalized position of the first element.
    pub fn start(&self) -> SequencePosition<T> {
        match &self.repr {
            Repr::Empty => SequencePosition::none(),
            Repr::Array { chunk, offset, .. } => {
                SequencePosition::array(Arc::clone(chunk), *offset)
            }
            Repr::Block { block, offset, .. } => {
                SequencePosition::block(Arc::clone(block), *offset).normalized()
            }
            Repr::Chain {
                start, start_offset, ..
            } => SequencePosition::block(Arc::clone(start), *start_offset).normalized(),
        }
    }

    /// Normalized position just past the last element.
    pub fn end(&self) -> SequencePosition<T> {
        match &self.repr {
            Repr::Empty => SequencePosition::none(),
            Repr::Array { chunk, offset, len } => {
                SequencePosition::array(Arc::clone(chunk), offset + len)
            }
            Repr::Block { block, offset, len } => {
                SequencePosition::block(Arc::clone(block), offset + len).normalized()
            }
            Repr::Chain { end, end_offset, .. } => {
                SequencePosition::block(Arc::clone(end), *end_offset).normalized()
            }
        }
    }

    /// Normalized position `offset` elements past the start. `offset` may
    /// equal `len()`, in which case this is [`Sequence::end`].
    pub fn get_position(&self, offset: usize) -> Result<SequencePosition<T>> {
        let length = self.len();
        if offset > length {
            return Err(ArenaError::IndexOutOfRange {
                index: offset,
                length,
            });
        }
        if offset == length {
            return Ok(self.end());
        }
        match &self.repr {
            Repr::Empty => Ok(SequencePosition::none()),
            Repr::Array { chunk, offset: base, .. } => Ok(SequencePosition::array(
                Arc::clone(chunk),
                base + offset as u32,
            )),
            Repr::Block { block, offset: base, .. } => Ok(SequencePosition::block(
                Arc::clone(block),
                base + offset as u32,
            )
            .normalized()),
            Repr::Chain {
                start,
                start_offset,
                end,
                end_offset,
            } => {
                let (block, off) =
                    chain_locate(start, *start_offset, end, *end_offset, offset as u64)?;
                Ok(SequencePosition::block(block, off).normalized())
            }
        }
    }

    /// View this sequence through the externally-compatible read-only
    /// sequence type.
    pub fn as_read_only(&self) -> ReadOnlySequence<T> {
        ReadOnlySequence::from_positions_unchecked(self.start(), self.end())
    }

    /// Reconstruct a sequence from a read-only view. Succeeds when both
    /// ends refer to compatible segment objects; otherwise the view is
    /// not reconstructible and `UnsupportedMemoryShape` is returned.
    pub fn try_from_read_only(view: &ReadOnlySequence<T>) -> Result<Sequence<T>> {
        Sequence::try_from_positions(view.start_position(), view.end_position())
    }

    /// Rebuild a sequence spanning `start..end`.
    pub fn try_from_positions(
        start: SequencePosition<T>,
        end: SequencePosition<T>,
    ) -> Result<Sequence<T>> {
        let start = start.normalized();
        let end = end.normalized();
        match (&start.target, &end.target) {
            (None, None) => Ok(Sequence::empty()),
            (Some(PositionTarget::Array(a)), Some(PositionTarget::Array(b))) => {
                if !Arc::ptr_eq(a, b) || start.index > end.index {
                    return Err(ArenaError::UnsupportedMemoryShape);
                }
                if start.index == end.index {
                    return Ok(Sequence::empty());
                }
                Ok(Sequence {
                    repr: Repr::Array {
                        chunk: Arc::clone(a),
                        offset: start.index,
                        len: end.index - start.index,
                    },
                })
            }
            (Some(PositionTarget::Block(a)), Some(PositionTarget::Block(b))) => {
                if Arc::ptr_eq(a, b) {
                    if start.index > end.index {
                        return Err(ArenaError::UnsupportedMemoryShape);
                    }
                    return Ok(Sequence::single_block(
                        Arc::clone(a),
                        start.index,
                        end.index - start.index,
                    ));
                }
                if b.running_index() <= a.running_index() || !chain_reaches(a, b) {
                    return Err(ArenaError::UnsupportedMemoryShape);
                }
                Ok(Sequence::chain(
                    Arc::clone(a),
                    start.index,
                    Arc::clone(b),
                    end.index,
                ))
            }
            _ => Err(ArenaError::UnsupportedMemoryShape),
        }
    }

    // -----------------------------------------------------------------
    // Iteration
    // -----------------------------------------------------------------

    /// Iterate over the elements, transparently crossing segment
    /// boundaries and skipping empty segments.
    pub fn iter(&self) -> Elements<'_, T> {
        Elements {
            spans: self.spans(),
            current: Default::default(),
        }
    }

    /// Iterate over the contiguous spans that make up the sequence.
    /// Empty spans are skipped.
    pub fn spans(&self) -> Spans<'_, T> {
        Spans {
            inner: self.segments(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Iterate over the segments with their owned representation
    /// preserved. Empty segments are skipped.
    pub fn segments(&self) -> Segments<T> {
        let state = match &self.repr {
            Repr::Empty => SegmentState::Done,
            Repr::Array { chunk, offset, len } => SegmentState::Single(SequenceSegment {
                part: SegmentPart::Array(Arc::clone(chunk)),
                offset: *offset,
                len: *len,
            }),
            Repr::Block { block, offset, len } => SegmentState::Single(SequenceSegment {
                part: SegmentPart::Block(Arc::clone(block)),
                offset: *offset,
                len: *len,
            }),
            Repr::Chain {
                start,
                start_offset,
                end,
                end_offset,
            } => SegmentState::Chain {
                current: Arc::clone(start),
                offset: *start_offset,
                end: Arc::clone(end),
                end_offset: *end_offset,
            },
        };
        Segments { state }
    }
}

/// Follow `next` links to check that `end` is reachable from `start`.
fn chain_reaches<T>(start: &Arc<Block<T>>, end: &Arc<Block<T>>) -> bool {
    let mut cursor = Arc::clone(start);
    loop {
        if Arc::ptr_eq(&cursor, end) {
            return true;
        }
        match cursor.next() {
            Some(next) => cursor = next,
            None => return false,
        }
    }
}

/// Walk a chain to the block+offset of the element `pos` places past the
/// sequence start. `pos` must be strictly inside the range.
fn chain_locate<T>(
    start: &Arc<Block<T>>,
    start_offset: u32,
    end: &Arc<Block<T>>,
    end_offset: u32,
    pos: u64,
) -> Result<(Arc<Block<T>>, u32)> {
    let mut block = Arc::clone(start);
    let mut offset = start_offset;
    let mut remaining = pos;
    loop {
        let at_end = Arc::ptr_eq(&block, end);
        let span = if at_end {
            u64::from(end_offset - offset)
        } else {
            u64::from(block.len() - offset)
        };
        if remaining < span {
            return Ok((block, offset + remaining as u32));
        }
        if at_end {
            // Walked past the end block: the index is out of range for
            // this chain (or the chain was broken by a trim).
            return Err(ArenaError::IndexOutOfRange {
                index: pos as usize,
                length: 0,
            });
        }
        remaining -= span;
        offset = 0;
        block = block.next().ok_or(ArenaError::IndexOutOfRange {
            index: pos as usize,
            length: 0,
        })?;
    }
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self {
        Sequence {
            repr: self.repr.clone(),
        }
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Sequence::empty()
    }
}

impl<T> PartialEq for Sequence<T> {
    /// Descriptor equality: same storage range, compared through
    /// normalized boundary positions (the same range can be written with
    /// the end at `(block, len)` or at `(next, 0)`), not element values.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.start() == other.start() && self.end() == other.end()
    }
}

impl<T> Eq for Sequence<T> {}

impl<T: std::fmt::Debug> std::fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = match &self.repr {
            Repr::Empty => "empty",
            Repr::Array { .. } => "array",
            Repr::Block { .. } => "block",
            Repr::Chain { .. } => "chain",
        };
        f.debug_struct("Sequence")
            .field("shape", &shape)
            .field("len", &self.len())
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a Sequence<T> {
    type Item = &'a T;
    type IntoIter = Elements<'a, T>;

    fn into_iter(self) -> Elements<'a, T> {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Segments — the memory-preserving iterator
// ---------------------------------------------------------------------------

/// One contiguous piece of a sequence with its owned backing preserved.
pub struct SequenceSegment<T> {
    pub(crate) part: SegmentPart<T>,
    pub(crate) offset: u32,
    pub(crate) len: u32,
}

pub(crate) enum SegmentPart<T> {
    Block(Arc<Block<T>>),
    Array(Arc<ArrayChunk<T>>),
}

impl<T> SequenceSegment<T> {
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the backing storage has a stable reinterpretable base.
    pub fn is_pinned(&self) -> bool {
        match &self.part {
            SegmentPart::Block(b) => b.pinned(),
            SegmentPart::Array(_) => false,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match &self.part {
            SegmentPart::Block(b) => b.span(self.offset, self.len),
            SegmentPart::Array(a) => a.span(self.offset, self.len),
        }
    }

    /// Mutable view of the segment. Exclusivity is the allocation
    /// protocol's guarantee; see the block module header.
    #[allow(clippy::mut_from_ref)]
    pub fn as_mut_slice(&self) -> &mut [T] {
        match &self.part {
            SegmentPart::Block(b) => b.span_mut(self.offset, self.len),
            SegmentPart::Array(a) => a.span_mut(self.offset, self.len),
        }
    }

    pub(crate) fn reference_at(&self, index: u32) -> Reference<T> {
        match &self.part {
            SegmentPart::Block(b) => Reference::from_block(Arc::clone(b), self.offset + index),
            SegmentPart::Array(a) => Reference::from_array(Arc::clone(a), self.offset + index),
        }
    }
}

impl<T> Clone for SequenceSegment<T> {
    fn clone(&self) -> Self {
        let part = match &self.part {
            SegmentPart::Block(b) => SegmentPart::Block(Arc::clone(b)),
            SegmentPart::Array(a) => SegmentPart::Array(Arc::clone(a)),
        };
        SequenceSegment {
            part,
            offset: self.offset,
            len: self.len,
        }
    }
}

enum SegmentState<T> {
    Done,
    Single(SequenceSegment<T>),
    Chain {
        current: Arc<Block<T>>,
        offset: u32,
        end: Arc<Block<T>>,
        end_offset: u32,
    },
}

/// Iterator over a sequence's segments, skipping empty ones.
pub struct Segments<T> {
    state: SegmentState<T>,
}

impl<T> Iterator for Segments<T> {
    type Item = SequenceSegment<T>;

    fn next(&mut self) -> Option<SequenceSegment<T>> {
        loop {
            match std::mem::replace(&mut self.state, SegmentState::Done) {
                SegmentState::Done => return None,
                SegmentState::Single(segment) => {
                    return (!segment.is_empty()).then_some(segment);
                }
                SegmentState::Chain {
                    current,
                    offset,
                    end,
                    end_offset,
                } => {
                    if Arc::ptr_eq(&current, &end) {
                        let len = end_offset - offset;
                        let segment = SequenceSegment {
                            part: SegmentPart::Block(current),
                            offset,
                            len,
                        };
                        if len == 0 {
                            return None;
                        }
                        return Some(segment);
                    }
                    let len = current.len() - offset;
                    let next = match current.next() {
                        Some(next) => next,
                        // Broken chain (trimmed mid-walk): stop cleanly.
                        None => return None,
                    };
                    self.state = SegmentState::Chain {
                        current: next,
                        offset: 0,
                        end,
                        end_offset,
                    };
                    if len > 0 {
                        return Some(SequenceSegment {
                            part: SegmentPart::Block(current),
                            offset,
                            len,
                        });
                    }
                    // Zero-length intermediate segment: roll over it.
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Spans — contiguous views
// ---------------------------------------------------------------------------

/// Iterator over the contiguous `&[T]` views of a sequence.
pub struct Spans<'a, T> {
    inner: Segments<T>,
    _marker: std::marker::PhantomData<&'a Sequence<T>>,
}

impl<'a, T> Iterator for Spans<'a, T> {
    type Item = &'a [T];

    fn next(&mut self) -> Option<&'a [T]> {
        let segment = self.inner.next()?;
        let slice = segment.as_slice();
        let (ptr, len) = (slice.as_ptr(), slice.len());
        // The storage outlives 'a: the sequence borrowed for 'a holds the
        // start block, and chain links keep every later block alive.
        Some(unsafe { std::slice::from_raw_parts(ptr, len) })
    }
}

// ---------------------------------------------------------------------------
// Elements — scalar iteration
// ---------------------------------------------------------------------------

/// Iterator over individual elements across all segments.
pub struct Elements<'a, T> {
    spans: Spans<'a, T>,
    current: std::slice::Iter<'a, T>,
}

impl<'a, T> Iterator for Elements<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(item);
            }
            self.current = self.spans.next()?.iter();
        }
    }
}

