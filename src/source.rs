// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Block sources: where chain blocks get their element buffers.
//
// Three families share one contract:
//   PooledSource       — default-initialised boxed slices, free-list reuse
//   PinnedPooledSource  — zeroed raw allocations, 16-byte aligned, free-list
//                         reuse, stable base address for reinterpretation
//   HeapSource          — zeroed raw allocations, released straight back to
//                         the process heap
//
// A rented buffer may exceed the requested length; the block records its
// own advertised length and the buffer remembers its true capacity so the
// source can free it exactly.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::cell::RefCell;
use std::ptr::NonNull;

use bytemuck::Pod;
use slab::Slab;

use crate::error::{ArenaError, Result};

/// Upper bound on buffers parked in a pooled source's free list.
const MAX_POOLED: usize = 64;

/// Base alignment of pinned buffers. Reinterpreted views require the block
/// base to be at least as aligned as any element type mapped onto it.
pub(crate) const PINNED_ALIGN: usize = 16;

/// A raw element buffer owned by exactly one block (or parked in a pool).
///
/// The buffer does not know how to free itself; the source that produced
/// it does. `capacity` is the true element capacity of the allocation,
/// which may exceed what the renting block advertises.
pub struct OwnedBuf<T> {
    ptr: NonNull<T>,
    capacity: usize,
}

impl<T> OwnedBuf<T> {
    /// Wrap a raw allocation so a custom [`BlockSource`] can hand it out.
    ///
    /// # Safety
    /// `ptr` must address `capacity` initialised elements that stay valid
    /// until the creating source releases the buffer.
    pub unsafe fn from_raw(ptr: NonNull<T>, capacity: usize) -> OwnedBuf<T> {
        OwnedBuf { ptr, capacity }
    }

    pub fn ptr(&self) -> NonNull<T> {
        self.ptr
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Contract required of any backing allocator.
///
/// `allocate` may block or fail; every other arena operation is
/// non-blocking. `release` and `clear` are best-effort and must not panic.
pub trait BlockSource<T> {
    /// Obtain a buffer of at least `len` elements, all initialised.
    fn allocate(&self, len: usize) -> Result<OwnedBuf<T>>;

    /// Return a buffer to the source.
    fn release(&self, buf: OwnedBuf<T>);

    /// Reinitialise the first `len` elements of a buffer.
    fn clear(&self, buf: &OwnedBuf<T>, len: usize);

    /// Stable base address of the buffer, if this source pins its
    /// allocations. `None` means the buffer must not be reinterpreted.
    fn pinned_base(&self, buf: &OwnedBuf<T>) -> Option<NonNull<u8>>;
}

// ---------------------------------------------------------------------------
// PooledSource — boxed slices of T::default(), recycled through a free list
// ---------------------------------------------------------------------------

/// The general-purpose source: rents default-initialised boxed slices and
/// parks released buffers for reuse. Works for any element type, including
/// `Drop`-bearing ones (dropping a parked buffer drops its elements).
pub struct PooledSource<T> {
    free: RefCell<Slab<OwnedBuf<T>>>,
}

impl<T: Default> PooledSource<T> {
    pub fn new() -> Self {
        Self {
            free: RefCell::new(Slab::new()),
        }
    }

    fn fresh(len: usize) -> Result<OwnedBuf<T>> {
        let mut v: Vec<T> = Vec::new();
        v.try_reserve_exact(len)
            .map_err(|_| ArenaError::BlockAllocationFailed { requested: len })?;
        v.resize_with(len, T::default);
        let boxed = v.into_boxed_slice();
        let capacity = boxed.len();
        let raw = Box::into_raw(boxed);
        // A boxed slice pointer is non-null even for len 0.
        let ptr = unsafe { NonNull::new_unchecked(raw.cast::<T>()) };
        Ok(OwnedBuf { ptr, capacity })
    }

    fn free_buf(buf: OwnedBuf<T>) {
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                buf.ptr.as_ptr(),
                buf.capacity,
            )));
        }
    }
}

impl<T: Default> Default for PooledSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> BlockSource<T> for PooledSource<T> {
    fn allocate(&self, len: usize) -> Result<OwnedBuf<T>> {
        let mut free = self.free.borrow_mut();
        let key = free
            .iter()
            .find(|(_, buf)| buf.capacity >= len)
            .map(|(key, _)| key);
        if let Some(key) = key {
            let buf = free.remove(key);
            return Ok(buf);
        }
        drop(free);
        Self::fresh(len)
    }

    fn release(&self, buf: OwnedBuf<T>) {
        let mut free = self.free.borrow_mut();
        if free.len() < MAX_POOLED {
            free.insert(buf);
        } else {
            drop(free);
            Self::free_buf(buf);
        }
    }

    fn clear(&self, buf: &OwnedBuf<T>, len: usize) {
        let len = len.min(buf.capacity);
        // Assignment (not `ptr::write`) so replaced elements drop properly.
        let slice = unsafe { std::slice::from_raw_parts_mut(buf.ptr.as_ptr(), len) };
        for slot in slice {
            *slot = T::default();
        }
    }

    fn pinned_base(&self, _buf: &OwnedBuf<T>) -> Option<NonNull<u8>> {
        None
    }
}

impl<T> Drop for PooledSource<T> {
    fn drop(&mut self) {
        for buf in self.free.borrow_mut().drain() {
            unsafe {
                drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                    buf.ptr.as_ptr(),
                    buf.capacity,
                )));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Raw allocation helpers shared by the pinned families
// ---------------------------------------------------------------------------

fn raw_layout<T>(len: usize) -> Result<Layout> {
    let bytes = std::mem::size_of::<T>()
        .checked_mul(len)
        .ok_or(ArenaError::BlockAllocationFailed { requested: len })?;
    let align = std::mem::align_of::<T>().max(PINNED_ALIGN);
    Layout::from_size_align(bytes, align)
        .map_err(|_| ArenaError::BlockAllocationFailed { requested: len })
}

fn raw_alloc_zeroed<T: Pod>(len: usize) -> Result<OwnedBuf<T>> {
    let layout = raw_layout::<T>(len)?;
    if layout.size() == 0 {
        return Err(ArenaError::BlockAllocationFailed { requested: len });
    }
    let raw = unsafe { alloc_zeroed(layout) };
    match NonNull::new(raw.cast::<T>()) {
        Some(ptr) => Ok(OwnedBuf { ptr, capacity: len }),
        None => Err(ArenaError::BlockAllocationFailed { requested: len }),
    }
}

fn raw_free<T>(buf: OwnedBuf<T>) {
    if let Ok(layout) = raw_layout::<T>(buf.capacity) {
        if layout.size() > 0 {
            unsafe { dealloc(buf.ptr.as_ptr().cast::<u8>(), layout) };
        }
    }
}

fn raw_clear<T>(buf: &OwnedBuf<T>, len: usize) {
    let len = len.min(buf.capacity);
    unsafe {
        std::ptr::write_bytes(buf.ptr.as_ptr(), 0, len);
    }
}

// ---------------------------------------------------------------------------
// PinnedPooledSource — aligned zeroed raw buffers with free-list reuse
// ---------------------------------------------------------------------------

/// Pooled source whose buffers are 16-byte-aligned raw allocations with a
/// stable base address, suitable as the backing of reinterpreted typed
/// views. Blittable elements only: zeroed memory must be valid.
pub struct PinnedPooledSource<T: Pod> {
    free: RefCell<Slab<OwnedBuf<T>>>,
}

impl<T: Pod> PinnedPooledSource<T> {
    pub fn new() -> Self {
        Self {
            free: RefCell::new(Slab::new()),
        }
    }
}

impl<T: Pod> Default for PinnedPooledSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> BlockSource<T> for PinnedPooledSource<T> {
    fn allocate(&self, len: usize) -> Result<OwnedBuf<T>> {
        let mut free = self.free.borrow_mut();
        let key = free
            .iter()
            .find(|(_, buf)| buf.capacity >= len)
            .map(|(key, _)| key);
        if let Some(key) = key {
            let buf = free.remove(key);
            // Recycled buffers come back zeroed (release clears them), so
            // the "all elements initialised" contract holds for Pod types.
            return Ok(buf);
        }
        drop(free);
        raw_alloc_zeroed::<T>(len)
    }

    fn release(&self, buf: OwnedBuf<T>) {
        raw_clear(&buf, buf.capacity);
        let mut free = self.free.borrow_mut();
        if free.len() < MAX_POOLED {
            free.insert(buf);
        } else {
            drop(free);
            raw_free(buf);
        }
    }

    fn clear(&self, buf: &OwnedBuf<T>, len: usize) {
        raw_clear(buf, len);
    }

    fn pinned_base(&self, buf: &OwnedBuf<T>) -> Option<NonNull<u8>> {
        Some(buf.ptr.cast::<u8>())
    }
}

impl<T: Pod> Drop for PinnedPooledSource<T> {
    fn drop(&mut self) {
        for buf in self.free.borrow_mut().drain() {
            raw_free(buf);
        }
    }
}

// ---------------------------------------------------------------------------
// HeapSource — raw heap blocks, no pooling
// ---------------------------------------------------------------------------

/// Unpooled source: every block is a fresh zeroed heap allocation, freed
/// on release. Always pinned.
pub struct HeapSource<T: Pod> {
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> HeapSource<T> {
    pub fn new() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: Pod> Default for HeapSource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> BlockSource<T> for HeapSource<T> {
    fn allocate(&self, len: usize) -> Result<OwnedBuf<T>> {
        raw_alloc_zeroed::<T>(len)
    }

    fn release(&self, buf: OwnedBuf<T>) {
        raw_free(buf);
    }

    fn clear(&self, buf: &OwnedBuf<T>, len: usize) {
        raw_clear(buf, len);
    }

    fn pinned_base(&self, buf: &OwnedBuf<T>) -> Option<NonNull<u8>> {
        Some(buf.ptr.cast::<u8>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pooled_source_recycles() {
        let source = PooledSource::<u64>::new();
        let a = source.allocate(16).expect("allocate");
        let ptr = a.ptr().as_ptr() as usize;
        source.release(a);
        let b = source.allocate(8).expect("allocate");
        // Smaller request is satisfied by the larger parked buffer.
        assert_eq!(b.ptr().as_ptr() as usize, ptr);
        assert_eq!(b.capacity(), 16);
        source.release(b);
    }

    #[test]
    fn pinned_source_is_aligned() {
        let source = PinnedPooledSource::<u8>::new();
        let buf = source.allocate(64).expect("allocate");
        assert_eq!(buf.ptr().as_ptr() as usize % PINNED_ALIGN, 0);
        assert!(source.pinned_base(&buf).is_some());
        source.release(buf);
    }

    #[test]
    fn heap_source_zeroes() {
        let source = HeapSource::<u32>::new();
        let buf = source.allocate(8).expect("allocate");
        let slice = unsafe { std::slice::from_raw_parts(buf.ptr().as_ptr(), 8) };
        assert!(slice.iter().all(|&x| x == 0));
        source.release(buf);
    }
}
