// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The typed arena: a cursor (current block + offset) over a forward-linked
// block chain. Allocation bumps the cursor and spills into the next block,
// reusing it when the chain already extends forward and allocating from the
// block source when it does not. Reset re-cursors to the head and trims
// tail blocks according to the retention policy.
//
// Failure discipline: a multi-block allocation works on local copies of
// the cursor and commits only on success. Blocks linked while the
// allocation was still progressing stay in the chain (the chain remains
// valid; they are plain spare capacity); a block that failed to allocate
// is never linked.

use std::sync::Arc;

use bytemuck::Pod;

use crate::block::Block;
use crate::error::{ArenaError, Result};
use crate::options::{ArenaFlags, ArenaOptions};
use crate::position::SequencePosition;
use crate::reference::Reference;
use crate::retention::RetentionPolicy;
use crate::sequence::Sequence;
use crate::source::{BlockSource, HeapSource, PinnedPooledSource, PooledSource};

/// An arena of `T` elements handing out [`Sequence`] and [`Reference`]
/// values over chained blocks.
pub struct TypedArena<T> {
    source: Arc<dyn BlockSource<T>>,
    head: Option<Arc<Block<T>>>,
    current: Option<Arc<Block<T>>>,
    allocated_in_current: u32,
    block_elems: usize,
    flags: ArenaFlags,
    retention: RetentionPolicy,
    retained_bytes: u64,
}

impl<T: Default + 'static> TypedArena<T> {
    /// Arena over the general pooled source, default options.
    pub fn new() -> Result<TypedArena<T>> {
        TypedArena::with_options(ArenaOptions::new())
    }

    /// Arena over the general pooled source.
    ///
    /// Element types that need `Drop` get their flags normalized: storage
    /// sharing is cleared and both clear flags are forced.
    pub fn with_options(options: ArenaOptions) -> Result<TypedArena<T>> {
        let flags = if std::mem::needs_drop::<T>() {
            options.flags.normalize_for_droppable()
        } else {
            options.flags
        };
        let source: Arc<dyn BlockSource<T>> = Arc::new(PooledSource::new());
        TypedArena::with_source_normalized(source, options, flags)
    }
}

impl<T: Pod> TypedArena<T> {
    /// Arena over the pinned pooled source: 16-byte-aligned blocks with a
    /// stable base address, suitable for reinterpreted views.
    pub fn pinned(options: ArenaOptions) -> Result<TypedArena<T>> {
        let flags = options.flags;
        let source: Arc<dyn BlockSource<T>> = Arc::new(PinnedPooledSource::new());
        TypedArena::with_source_normalized(source, options, flags)
    }

    /// Arena over raw unpooled heap blocks.
    pub fn unmanaged(options: ArenaOptions) -> Result<TypedArena<T>> {
        let flags = options.flags;
        let source: Arc<dyn BlockSource<T>> = Arc::new(HeapSource::new());
        TypedArena::with_source_normalized(source, options, flags)
    }

    /// Arena for a blittable element type, choosing the source family
    /// from the `PREFER_*` flags.
    pub fn blittable(options: ArenaOptions) -> Result<TypedArena<T>> {
        if options.flags.contains(ArenaFlags::PREFER_UNMANAGED) {
            TypedArena::unmanaged(options)
        } else {
            // Pinned covers both the explicit preference and the default:
            // blittable blocks are cheap to pin and stay reinterpretable.
            TypedArena::pinned(options)
        }
    }
}

impl<T> TypedArena<T> {
    /// Arena over a caller-supplied block source.
    pub fn with_source(
        source: Arc<dyn BlockSource<T>>,
        options: ArenaOptions,
    ) -> Result<TypedArena<T>> {
        let flags = options.flags;
        TypedArena::with_source_normalized(source, options, flags)
    }

    fn with_source_normalized(
        source: Arc<dyn BlockSource<T>>,
        options: ArenaOptions,
        flags: ArenaFlags,
    ) -> Result<TypedArena<T>> {
        let element_size = std::mem::size_of::<T>();
        if element_size == 0 {
            return Err(ArenaError::UnsupportedElementType(std::any::type_name::<T>()));
        }
        let block_elems = options.block_elements(element_size).min(u32::MAX as usize);
        let head = Block::new_owned(&source, block_elems, None)?;
        Ok(TypedArena {
            source,
            current: Some(Arc::clone(&head)),
            head: Some(head),
            allocated_in_current: 0,
            block_elems,
            flags,
            retention: options.retention,
            retained_bytes: 0,
        })
    }

    fn live(&self) -> Result<(&Arc<Block<T>>, &Arc<Block<T>>)> {
        match (&self.head, &self.current) {
            (Some(head), Some(current)) => Ok((head, current)),
            _ => Err(ArenaError::ArenaDisposed),
        }
    }

    /// Effective behaviour flags (after normalization).
    pub fn flags(&self) -> ArenaFlags {
        self.flags
    }

    /// Block size in elements.
    pub fn block_elements(&self) -> usize {
        self.block_elems
    }

    // -----------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------

    /// Allocate `n` logically contiguous elements.
    ///
    /// A zero-length allocation returns the empty sequence but still
    /// advances past a fully-filled current block. An allocation that
    /// exactly fills the current block advances to the next block
    /// immediately, so `sequence.end() == next_sequence.start()`.
    pub fn allocate(&mut self, n: usize) -> Result<Sequence<T>> {
        let (_, current) = self.live()?;
        if n > u32::MAX as usize {
            return Err(ArenaError::InvalidArgument(
                "allocation length exceeds the 32-bit segment limit",
            ));
        }
        let remaining = current.len() - self.allocated_in_current;
        if n > 0 && n as u32 <= remaining {
            let block = Arc::clone(current);
            let offset = self.allocated_in_current;
            self.allocated_in_current += n as u32;
            return Ok(Sequence::single_block(block, offset, n as u32));
        }
        self.allocate_slow(n)
    }

    fn allocate_slow(&mut self, n: usize) -> Result<Sequence<T>> {
        let mut block = Arc::clone(self.current.as_ref().expect("checked live"));
        let mut offset = self.allocated_in_current;

        if offset == block.len() {
            block = self.advance(&block)?;
            offset = 0;
        }
        let start = Arc::clone(&block);
        let start_offset = offset;

        let mut remaining = n as u64;
        while remaining > 0 {
            let room = u64::from(block.len() - offset);
            if remaining == room {
                block = self.advance(&block)?;
                offset = 0;
                break;
            }
            if remaining < room {
                offset += remaining as u32;
                break;
            }
            remaining -= room;
            block = self.advance(&block)?;
            offset = 0;
        }

        self.current = Some(Arc::clone(&block));
        self.allocated_in_current = offset;
        if n == 0 {
            return Ok(Sequence::empty());
        }
        Ok(Sequence::chain(start, start_offset, block, offset))
    }

    /// The block after `block`, extending the chain when it is the tail.
    /// Never touches the cursor; a failed extension leaves the chain as
    /// it was.
    fn advance(&mut self, block: &Arc<Block<T>>) -> Result<Arc<Block<T>>> {
        if let Some(next) = block.next() {
            return Ok(next);
        }
        let next = Block::new_owned(&self.source, self.block_elems, Some(block))?;
        block.set_next(Arc::clone(&next));
        tracing::debug!(
            segment = next.segment_index(),
            elems = self.block_elems,
            "chain extended"
        );
        Ok(next)
    }

    /// Allocate one element and hand back a reference to it.
    pub fn allocate_single(&mut self) -> Result<Reference<T>> {
        let (_, current) = self.live()?;
        let mut block = Arc::clone(current);
        let mut offset = self.allocated_in_current;
        if offset == block.len() {
            block = self.advance(&block)?;
            offset = 0;
        }
        self.current = Some(Arc::clone(&block));
        self.allocated_in_current = offset + 1;
        Ok(Reference::from_block(block, offset))
    }

    /// Cursor primitive for padded layouts: consume whatever remains of
    /// the current block and land at offset 0 of the next one. A cursor
    /// already at offset 0 stays put.
    pub fn skip_to_next_page(&mut self) -> Result<()> {
        let (_, current) = self.live()?;
        let current_len = current.len();
        if self.allocated_in_current == 0 {
            return Ok(());
        }
        self.allocated_in_current = current_len;
        // The zero-length allocation advances past the now-full block.
        self.allocate(0).map(drop)
    }

    // -----------------------------------------------------------------
    // Counters and positions
    // -----------------------------------------------------------------

    /// Elements allocated since the last reset.
    pub fn allocated_elements(&self) -> usize {
        match &self.current {
            Some(current) => {
                (current.running_index() + u64::from(self.allocated_in_current)) as usize
            }
            None => 0,
        }
    }

    /// Bytes allocated since the last reset.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_elements() * std::mem::size_of::<T>()
    }

    /// Total elements across all blocks currently in the chain.
    pub fn capacity_elements(&self) -> usize {
        let mut tail = match &self.head {
            Some(head) => Arc::clone(head),
            None => return 0,
        };
        while let Some(next) = tail.next() {
            tail = next;
        }
        (tail.running_index() + u64::from(tail.len())) as usize
    }

    /// Total bytes across all blocks currently in the chain.
    pub fn capacity_bytes(&self) -> usize {
        self.capacity_elements() * std::mem::size_of::<T>()
    }

    /// The position immediately past the last allocated element.
    pub fn position(&self) -> Result<SequencePosition<T>> {
        let (_, current) = self.live()?;
        Ok(SequencePosition::block(Arc::clone(current), self.allocated_in_current).normalized())
    }

    // -----------------------------------------------------------------
    // Reset, trim, dispose
    // -----------------------------------------------------------------

    /// Invalidate all previously returned sequences and references,
    /// re-cursor to the head, and trim tail blocks per the retention
    /// policy.
    pub fn reset(&mut self) -> Result<()> {
        let (head, current) = self.live()?;
        let head = Arc::clone(head);
        let current = Arc::clone(current);
        let used_bytes = self.allocated_bytes() as u64;

        if self.flags.contains(ArenaFlags::CLEAR_AT_RESET) {
            let mut block = Arc::clone(&head);
            loop {
                if Arc::ptr_eq(&block, &current) {
                    block.clear(self.allocated_in_current);
                    break;
                }
                block.clear(block.len());
                match block.next() {
                    Some(next) => block = next,
                    None => break,
                }
            }
        }

        self.current = Some(Arc::clone(&head));
        self.allocated_in_current = 0;

        let target = self.retention.next_target(self.retained_bytes, used_bytes);
        self.retained_bytes = target;
        tracing::debug!(used_bytes, target, "arena reset");
        self.trim_to(target);
        Ok(())
    }

    /// Release every block past the one in which the byte target falls.
    /// The head block is never released by trim.
    fn trim_to(&mut self, target_bytes: u64) {
        let Some(head) = &self.head else { return };
        let target_elems = target_bytes.div_ceil(std::mem::size_of::<T>() as u64);
        let mut cumulative = 0u64;
        let mut block = Arc::clone(head);
        loop {
            cumulative += u64::from(block.len());
            if cumulative > target_elems {
                break;
            }
            match block.next() {
                Some(next) => block = next,
                None => return,
            }
        }
        if let Some(tail) = block.detach_next() {
            tracing::debug!(
                first_released = tail.segment_index(),
                retained_elems = cumulative,
                "chain trimmed"
            );
            drop(tail);
        }
    }

    /// Tear down the whole chain and release its backing allocations.
    /// Every later operation fails with `ArenaDisposed`. Idempotent.
    pub fn dispose(&mut self) {
        let Some(head) = self.head.take() else { return };
        self.current = None;
        if self.flags.contains(ArenaFlags::CLEAR_AT_DISPOSE) {
            let mut block = Arc::clone(&head);
            loop {
                block.clear(block.len());
                match block.next() {
                    Some(next) => block = next,
                    None => break,
                }
            }
        }
        tracing::debug!("arena disposed");
        drop(head);
    }

    // -----------------------------------------------------------------
    // Crate-internal cursor access for mapped (byte-shared) arenas
    // -----------------------------------------------------------------

    pub(crate) fn head_block(&self) -> Option<Arc<Block<T>>> {
        self.head.clone()
    }

    pub(crate) fn cursor_block(&self) -> Option<Arc<Block<T>>> {
        self.current.clone()
    }

    pub(crate) fn cursor_offset(&self) -> u32 {
        self.allocated_in_current
    }
}

impl<T> Drop for TypedArena<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T> std::fmt::Debug for TypedArena<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedArena")
            .field("element", &std::any::type_name::<T>())
            .field("block_elems", &self.block_elems)
            .field("allocated", &self.allocated_elements())
            .field("capacity", &self.capacity_elements())
            .field("disposed", &self.head.is_none())
            .finish()
    }
}
