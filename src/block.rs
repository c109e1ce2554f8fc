// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Chain blocks: one owned buffer per link, forward `next` pointers only.
//
// A block is immutable after creation except for `next`, which is set once
// when the chain grows and cleared only by `detach_next` during trim or
// dispose. `running_index` and `segment_index` are fixed at creation from
// the predecessor. Blocks are shared by `Arc`: sequences and positions
// hold block handles, and the start block of a chain keeps every later
// block alive through the `next` links.
//
// Aliasing contract: element storage is handed out as plain slices, and
// exclusivity of mutable spans is guaranteed by the arena's allocation
// protocol, not by the borrow checker. A freshly allocated range has
// exactly one writer until the descriptor is cloned by the caller.

use std::cell::RefCell;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::error::{ArenaError, Result};
use crate::source::{BlockSource, OwnedBuf};

/// What keeps a block's storage alive.
pub(crate) enum Backing<T> {
    /// The block owns a buffer and returns it to its source on drop.
    Owned {
        buf: Option<OwnedBuf<T>>,
        source: Arc<dyn BlockSource<T>>,
    },
    /// A reinterpreted view over a byte block. Non-owning: the `Arc`
    /// guarantees the view never outlives the underlying storage.
    View { _owner: Arc<Block<u8>> },
}

/// One link in a typed arena's chain.
pub(crate) struct Block<T> {
    ptr: NonNull<T>,
    len: u32,
    segment_index: u32,
    running_index: u64,
    next: RefCell<Option<Arc<Block<T>>>>,
    pinned: bool,
    backing: Backing<T>,
}

impl<T> Block<T> {
    /// Allocate an owned block of `len` elements from `source`, chained
    /// after `prev` (index bookkeeping only; the caller links `next`).
    ///
    /// A zero-length rental is released and surfaces as
    /// `BlockAllocationFailed`.
    pub(crate) fn new_owned(
        source: &Arc<dyn BlockSource<T>>,
        len: usize,
        prev: Option<&Arc<Block<T>>>,
    ) -> Result<Arc<Block<T>>> {
        if len == 0 || len > u32::MAX as usize {
            return Err(ArenaError::BlockAllocationFailed { requested: len });
        }
        let buf = source.allocate(len)?;
        if buf.capacity() == 0 {
            source.release(buf);
            return Err(ArenaError::BlockAllocationFailed { requested: len });
        }
        let (segment_index, running_index) = match prev {
            Some(p) => (p.segment_index + 1, p.running_index + u64::from(p.len)),
            None => (0, 0),
        };
        let pinned = source.pinned_base(&buf).is_some();
        let ptr = buf.ptr();
        tracing::trace!(
            segment = segment_index,
            running = running_index,
            len,
            pinned,
            "block allocated"
        );
        Ok(Arc::new(Block {
            ptr,
            len: len as u32,
            segment_index,
            running_index,
            next: RefCell::new(None),
            pinned,
            backing: Backing::Owned {
                buf: Some(buf),
                source: Arc::clone(source),
            },
        }))
    }

    /// Build a typed view over a byte block. `ptr` must point inside the
    /// owner's storage and stay valid for the owner's lifetime; the view
    /// holds the owner alive to guarantee that.
    pub(crate) fn new_view(
        owner: &Arc<Block<u8>>,
        ptr: NonNull<T>,
        len: u32,
        prev: Option<&Arc<Block<T>>>,
    ) -> Arc<Block<T>> {
        let (segment_index, running_index) = match prev {
            Some(p) => (p.segment_index + 1, p.running_index + u64::from(p.len)),
            None => (0, 0),
        };
        Arc::new(Block {
            ptr,
            len,
            segment_index,
            running_index,
            next: RefCell::new(None),
            pinned: owner.pinned,
            backing: Backing::View {
                _owner: Arc::clone(owner),
            },
        })
    }

    /// Advertised length in elements.
    pub(crate) fn len(&self) -> u32 {
        self.len
    }

    pub(crate) fn segment_index(&self) -> u32 {
        self.segment_index
    }

    /// Element offset of this block's first element in the logical stream.
    pub(crate) fn running_index(&self) -> u64 {
        self.running_index
    }

    /// Whether the base address is stable and aligned for reinterpretation.
    pub(crate) fn pinned(&self) -> bool {
        self.pinned
    }

    /// Stable byte pointer to the block base, for pinned blocks only.
    pub(crate) fn base_ptr(&self) -> Option<NonNull<u8>> {
        self.pinned.then(|| self.ptr.cast::<u8>())
    }

    pub(crate) fn element_ptr(&self, offset: u32) -> NonNull<T> {
        debug_assert!(offset <= self.len);
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset as usize)) }
    }

    /// The forward link, if any. `None` means this block is the tail.
    pub(crate) fn next(&self) -> Option<Arc<Block<T>>> {
        self.next.borrow().clone()
    }

    /// Append-only chain extension. The link must not already be set.
    pub(crate) fn set_next(&self, next: Arc<Block<T>>) {
        let mut slot = self.next.borrow_mut();
        debug_assert!(slot.is_none(), "chain extension is append-only at the tail");
        debug_assert!(next.running_index > self.running_index || self.len == 0);
        *slot = Some(next);
    }

    /// Split the chain here: null the forward link and hand the former
    /// tail chain to the caller for disposal.
    pub(crate) fn detach_next(&self) -> Option<Arc<Block<T>>> {
        self.next.borrow_mut().take()
    }

    /// Shared view of `len` elements starting at `offset`.
    pub(crate) fn span(&self, offset: u32, len: u32) -> &[T] {
        debug_assert!(offset.checked_add(len).is_some_and(|end| end <= self.len));
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(offset as usize), len as usize) }
    }

    /// Mutable view of `len` elements starting at `offset`.
    ///
    /// Exclusivity is the allocation protocol's guarantee, not the borrow
    /// checker's; see the module header.
    #[allow(clippy::mut_from_ref)]
    pub(crate) fn span_mut(&self, offset: u32, len: u32) -> &mut [T] {
        debug_assert!(offset.checked_add(len).is_some_and(|end| end <= self.len));
        unsafe {
            std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(offset as usize), len as usize)
        }
    }

    /// Reinitialise the first `used` elements (owned blocks only; views
    /// are cleared through the byte arena that owns their storage).
    pub(crate) fn clear(&self, used: u32) {
        if let Backing::Owned {
            buf: Some(buf),
            source,
        } = &self.backing
        {
            source.clear(buf, used as usize);
        }
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        // Unlink the forward chain iteratively; a recursive drop would
        // overflow the stack on long chains.
        let mut next = self.next.get_mut().take();
        while let Some(arc) = next {
            match Arc::try_unwrap(arc) {
                Ok(mut block) => next = block.next.get_mut().take(),
                Err(_) => break,
            }
        }
        if let Backing::Owned { buf, source } = &mut self.backing {
            if let Some(buf) = buf.take() {
                source.release(buf);
            }
        }
    }
}

impl<T> std::fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block")
            .field("segment", &self.segment_index)
            .field("running", &self.running_index)
            .field("len", &self.len)
            .field("pinned", &self.pinned)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ArrayChunk — a standalone owned slice backing array-shaped sequences
// ---------------------------------------------------------------------------

/// An owned contiguous chunk outside any chain, used by array-backed
/// sequence descriptors (e.g. a sequence built straight from a `Vec<T>`).
pub(crate) struct ArrayChunk<T> {
    ptr: NonNull<T>,
    len: u32,
}

impl<T> ArrayChunk<T> {
    /// Take ownership of `values`. Lengths above `u32::MAX` are rejected
    /// by the callers before reaching here.
    pub(crate) fn from_vec(values: Vec<T>) -> Arc<ArrayChunk<T>> {
        let boxed = values.into_boxed_slice();
        let len = boxed.len() as u32;
        let raw = Box::into_raw(boxed);
        let ptr = unsafe { NonNull::new_unchecked(raw.cast::<T>()) };
        Arc::new(ArrayChunk { ptr, len })
    }

    pub(crate) fn len(&self) -> u32 {
        self.len
    }

    pub(crate) fn element_ptr(&self, offset: u32) -> NonNull<T> {
        debug_assert!(offset <= self.len);
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset as usize)) }
    }

    pub(crate) fn span(&self, offset: u32, len: u32) -> &[T] {
        debug_assert!(offset.checked_add(len).is_some_and(|end| end <= self.len));
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(offset as usize), len as usize) }
    }

    #[allow(clippy::mut_from_ref)]
    pub(crate) fn span_mut(&self, offset: u32, len: u32) -> &mut [T] {
        debug_assert!(offset.checked_add(len).is_some_and(|end| end <= self.len));
        unsafe {
            std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(offset as usize), len as usize)
        }
    }
}

impl<T> Drop for ArrayChunk<T> {
    fn drop(&mut self) {
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.len as usize,
            )));
        }
    }
}

impl<T> std::fmt::Debug for ArrayChunk<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayChunk").field("len", &self.len).finish()
    }
}
