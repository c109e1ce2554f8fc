// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The multi-type arena: a registry of per-type arenas keyed by `TypeId`,
// with a last-used cache slot for the hot path.
//
// Sharing modes, selected by flags:
//   none       — every type gets its own dedicated typed arena
//   non-padded — types with the same (size, align) share one byte arena,
//                reinterpreted; every allocation is a whole number of
//                elements, so no padding can ever be needed
//   padded     — all blittable types share a single byte arena; the
//                allocation protocol burns bytes so every element range
//                starts at an offset divisible by size_of::<T>()
//
// A reinterpreted per-type view covers a whole byte block (length in
// element units = block bytes / element size) and is chained 1:1 with the
// byte blocks, so running indexes stay continuous even when other types
// consume the bytes in between. Mapped views hold the byte block alive
// and never outlive it.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use bytemuck::Pod;

use crate::block::Block;
use crate::error::{ArenaError, Result};
use crate::options::{ArenaFlags, ArenaOptions};
use crate::reference::Reference;
use crate::sequence::Sequence;
use crate::source::PINNED_ALIGN;
use crate::typed::TypedArena;

// ---------------------------------------------------------------------------
// MappedArena — a typed facade over a shared byte arena
// ---------------------------------------------------------------------------

/// Per-type state for a byte-shared arena: the chain of reinterpreted
/// block views, grown lazily as the byte arena's chain grows.
struct MappedArena<T> {
    bytes: Rc<RefCell<TypedArena<u8>>>,
    /// Tail of the per-type view chain. Earlier views stay alive through
    /// the sequences that reference them and the forward links between
    /// views; the mapper itself only ever appends at the tail.
    tail: Option<Arc<Block<T>>>,
    /// The byte block the tail view maps; mapping is caught up when this
    /// is the byte arena's current block.
    tail_owner: Option<Arc<Block<u8>>>,
}

impl<T: Pod> MappedArena<T> {
    fn new(bytes: Rc<RefCell<TypedArena<u8>>>) -> MappedArena<T> {
        MappedArena {
            bytes,
            tail: None,
            tail_owner: None,
        }
    }

    /// Extend the view chain until the byte arena's current block is
    /// mapped. Each view covers its whole byte block.
    fn ensure_mapped(&mut self, bytes: &TypedArena<u8>) -> Result<()> {
        let size = std::mem::size_of::<T>() as u32;
        let current = bytes.cursor_block().ok_or(ArenaError::ArenaDisposed)?;
        if let Some(owner) = &self.tail_owner {
            if Arc::ptr_eq(owner, &current) {
                return Ok(());
            }
        }
        let mut byte_block = match &self.tail_owner {
            Some(owner) => owner.next().ok_or(ArenaError::UnsupportedMemoryShape)?,
            None => bytes.head_block().ok_or(ArenaError::ArenaDisposed)?,
        };
        loop {
            let elems = byte_block.len() / size;
            // Reinterpretation requires a stable, aligned base; the shared
            // byte arenas always use the pinned source.
            let base = byte_block
                .base_ptr()
                .ok_or(ArenaError::UnsupportedMemoryShape)?;
            let view = Block::new_view(&byte_block, base.cast::<T>(), elems, self.tail.as_ref());
            if let Some(tail) = &self.tail {
                tail.set_next(Arc::clone(&view));
            }
            tracing::trace!(
                segment = view.segment_index(),
                elems,
                "byte block mapped into typed view"
            );
            self.tail = Some(view);
            self.tail_owner = Some(Arc::clone(&byte_block));
            if Arc::ptr_eq(&byte_block, &current) {
                return Ok(());
            }
            byte_block = byte_block.next().ok_or(ArenaError::UnsupportedMemoryShape)?;
        }
    }

    /// The padded allocation protocol over the byte arena.
    fn allocate(&mut self, n: usize) -> Result<Sequence<T>> {
        if n == 0 {
            return Ok(Sequence::empty());
        }
        if n > u32::MAX as usize {
            return Err(ArenaError::InvalidArgument(
                "allocation length exceeds the 32-bit segment limit",
            ));
        }
        let size = std::mem::size_of::<T>() as u32;
        let bytes_rc = Rc::clone(&self.bytes);
        let mut bytes = bytes_rc.borrow_mut();

        // Align the byte cursor to a multiple of the element size, moving
        // to the next block when the current one cannot even pad.
        loop {
            let current = bytes.cursor_block().ok_or(ArenaError::ArenaDisposed)?;
            let used = bytes.cursor_offset();
            let overlap = used % size;
            if overlap != 0 {
                let pad = size - overlap;
                if current.len() - used < pad {
                    bytes.skip_to_next_page()?;
                } else {
                    bytes.allocate(pad as usize)?;
                }
                continue;
            }
            if current.len() - used < size {
                if used == 0 {
                    // Block too small for a single element: consume it
                    // whole (the exact fill advances the cursor).
                    let whole = current.len() as usize;
                    bytes.allocate(whole)?;
                } else {
                    bytes.skip_to_next_page()?;
                }
                continue;
            }
            break;
        }

        self.ensure_mapped(&bytes)?;
        let start = Arc::clone(self.tail.as_ref().expect("mapped"));
        let start_elem = bytes.cursor_offset() / size;

        // Consume whole or partial pages of elements.
        let mut remaining = n as u64;
        loop {
            let current = bytes.cursor_block().ok_or(ArenaError::ArenaDisposed)?;
            let used = bytes.cursor_offset();
            let avail = u64::from((current.len() - used) / size);
            if avail == 0 {
                // Nothing but tail bytes (or a block shorter than one
                // element): consume and advance.
                if used == 0 {
                    let whole = current.len() as usize;
                    bytes.allocate(whole)?;
                } else {
                    bytes.skip_to_next_page()?;
                }
                self.ensure_mapped(&bytes)?;
                continue;
            }
            if remaining < avail {
                bytes.allocate((remaining * u64::from(size)) as usize)?;
                break;
            }
            if remaining == avail {
                bytes.allocate((avail * u64::from(size)) as usize)?;
                // End must coincide with the next element start.
                bytes.skip_to_next_page()?;
                break;
            }
            bytes.allocate((avail * u64::from(size)) as usize)?;
            bytes.skip_to_next_page()?;
            remaining -= avail;
            self.ensure_mapped(&bytes)?;
        }

        self.ensure_mapped(&bytes)?;
        let end = Arc::clone(self.tail.as_ref().expect("mapped"));
        let end_elem = bytes.cursor_offset() / size;
        Ok(Sequence::chain(start, start_elem, end, end_elem))
    }

    fn allocate_single(&mut self) -> Result<Reference<T>> {
        let sequence = self.allocate(1)?;
        sequence.get(0)
    }

    /// Drop the stale view chain after the byte arena was reset; views
    /// are rebuilt lazily on the next allocation.
    fn clear_maps(&mut self) {
        self.tail = None;
        self.tail_owner = None;
    }
}

// ---------------------------------------------------------------------------
// Registry entries
// ---------------------------------------------------------------------------

trait ArenaEntry {
    fn reset(&self) -> Result<()>;
    fn dispose(&self);
    /// Bytes used since the last reset. Mapped entries report zero: their
    /// usage is counted once through the shared byte arena.
    fn allocated_bytes(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
}

struct DedicatedEntry<T> {
    arena: RefCell<TypedArena<T>>,
}

impl<T: 'static> ArenaEntry for DedicatedEntry<T> {
    fn reset(&self) -> Result<()> {
        self.arena.borrow_mut().reset()
    }

    fn dispose(&self) {
        self.arena.borrow_mut().dispose();
    }

    fn allocated_bytes(&self) -> usize {
        self.arena.borrow().allocated_bytes()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MappedEntry<T> {
    mapped: RefCell<MappedArena<T>>,
}

impl<T: Pod> ArenaEntry for MappedEntry<T> {
    fn reset(&self) -> Result<()> {
        // The byte arena itself is reset once by the owning Arena; only
        // the per-type view chain is dropped here.
        self.mapped.borrow_mut().clear_maps();
        Ok(())
    }

    fn dispose(&self) {
        self.mapped.borrow_mut().clear_maps();
    }

    fn allocated_bytes(&self) -> usize {
        0
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Arena — the multi-type registry
// ---------------------------------------------------------------------------

/// A registry of per-type arenas behind one allocation surface.
///
/// Blittable types go through [`Arena::allocate`]; element types that are
/// not blittable (or that need `Drop`) go through [`Arena::allocate_owned`]
/// and always receive a dedicated arena with normalized flags.
pub struct Arena {
    options: ArenaOptions,
    entries: RefCell<HashMap<TypeId, Rc<dyn ArenaEntry>>>,
    last_used: RefCell<Option<(TypeId, Rc<dyn ArenaEntry>)>>,
    /// The single byte arena behind padded sharing, created on demand.
    padded_bytes: RefCell<Option<Rc<RefCell<TypedArena<u8>>>>>,
    /// Per-(size, align) byte arenas behind non-padded sharing.
    sized_bytes: RefCell<HashMap<(usize, usize), Rc<RefCell<TypedArena<u8>>>>>,
    disposed: Cell<bool>,
}

impl Arena {
    /// Multi-type arena with default options (no sharing).
    pub fn new() -> Arena {
        Arena::with_options(ArenaOptions::new())
    }

    pub fn with_options(options: ArenaOptions) -> Arena {
        Arena {
            options,
            entries: RefCell::new(HashMap::new()),
            last_used: RefCell::new(None),
            padded_bytes: RefCell::new(None),
            sized_bytes: RefCell::new(HashMap::new()),
            disposed: Cell::new(false),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed.get() {
            return Err(ArenaError::ArenaDisposed);
        }
        Ok(())
    }

    /// Allocate `n` elements of a blittable type, sharing byte storage
    /// with other types according to the sharing flags.
    pub fn allocate<T: Pod + 'static>(&self, n: usize) -> Result<Sequence<T>> {
        self.ensure_live()?;
        let entry = self.entry_for_blittable::<T>()?;
        if let Some(mapped) = entry.as_any().downcast_ref::<MappedEntry<T>>() {
            return mapped.mapped.borrow_mut().allocate(n);
        }
        if let Some(dedicated) = entry.as_any().downcast_ref::<DedicatedEntry<T>>() {
            return dedicated.arena.borrow_mut().allocate(n);
        }
        Err(ArenaError::UnsupportedMemoryShape)
    }

    /// Allocate a single element of a blittable type.
    pub fn allocate_single<T: Pod + 'static>(&self) -> Result<Reference<T>> {
        self.ensure_live()?;
        let entry = self.entry_for_blittable::<T>()?;
        if let Some(mapped) = entry.as_any().downcast_ref::<MappedEntry<T>>() {
            return mapped.mapped.borrow_mut().allocate_single();
        }
        if let Some(dedicated) = entry.as_any().downcast_ref::<DedicatedEntry<T>>() {
            return dedicated.arena.borrow_mut().allocate_single();
        }
        Err(ArenaError::UnsupportedMemoryShape)
    }

    /// Allocate `n` elements of an arbitrary element type through a
    /// dedicated arena. `Drop`-bearing types get their flags normalized
    /// (no sharing, forced clears).
    pub fn allocate_owned<T: Default + 'static>(&self, n: usize) -> Result<Sequence<T>> {
        self.ensure_live()?;
        let entry = self.entry_for_owned::<T>()?;
        match entry.as_any().downcast_ref::<DedicatedEntry<T>>() {
            Some(dedicated) => dedicated.arena.borrow_mut().allocate(n),
            None => Err(ArenaError::UnsupportedMemoryShape),
        }
    }

    /// Reset every registered arena: all sequences and references handed
    /// out so far become invalid, and retention trims each chain.
    pub fn reset(&self) -> Result<()> {
        self.ensure_live()?;
        let entries: Vec<Rc<dyn ArenaEntry>> =
            self.entries.borrow().values().map(Rc::clone).collect();
        for entry in entries {
            entry.reset()?;
        }
        if let Some(bytes) = &*self.padded_bytes.borrow() {
            bytes.borrow_mut().reset()?;
        }
        for bytes in self.sized_bytes.borrow().values() {
            bytes.borrow_mut().reset()?;
        }
        Ok(())
    }

    /// Dispose every registered arena. Idempotent; all later operations
    /// fail with `ArenaDisposed`.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        // Views keep byte blocks alive; drop them before the byte arenas.
        let entries: Vec<Rc<dyn ArenaEntry>> =
            self.entries.borrow().values().map(Rc::clone).collect();
        for entry in &entries {
            entry.dispose();
        }
        self.last_used.borrow_mut().take();
        if let Some(bytes) = self.padded_bytes.borrow_mut().take() {
            bytes.borrow_mut().dispose();
        }
        for (_, bytes) in self.sized_bytes.borrow_mut().drain() {
            bytes.borrow_mut().dispose();
        }
    }

    /// Number of element types registered so far.
    pub fn registered_types(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Bytes allocated since the last reset, across all backing arenas.
    pub fn allocated_bytes(&self) -> usize {
        let mut total = 0;
        if let Some(bytes) = &*self.padded_bytes.borrow() {
            total += bytes.borrow().allocated_bytes();
        }
        for bytes in self.sized_bytes.borrow().values() {
            total += bytes.borrow().allocated_bytes();
        }
        for entry in self.entries.borrow().values() {
            total += entry.allocated_bytes();
        }
        total
    }

    // -----------------------------------------------------------------
    // Registry internals
    // -----------------------------------------------------------------

    fn lookup(&self, key: TypeId) -> Option<Rc<dyn ArenaEntry>> {
        if let Some((cached_key, cached)) = &*self.last_used.borrow() {
            if *cached_key == key {
                return Some(Rc::clone(cached));
            }
        }
        let entry = self.entries.borrow().get(&key).map(Rc::clone)?;
        *self.last_used.borrow_mut() = Some((key, Rc::clone(&entry)));
        Some(entry)
    }

    fn register(&self, key: TypeId, entry: Rc<dyn ArenaEntry>) {
        self.entries.borrow_mut().insert(key, Rc::clone(&entry));
        *self.last_used.borrow_mut() = Some((key, entry));
    }

    fn entry_for_blittable<T: Pod + 'static>(&self) -> Result<Rc<dyn ArenaEntry>> {
        let key = TypeId::of::<T>();
        if let Some(entry) = self.lookup(key) {
            return Ok(entry);
        }
        let size = std::mem::size_of::<T>();
        if size == 0 {
            return Err(ArenaError::UnsupportedElementType(std::any::type_name::<T>()));
        }
        let align = std::mem::align_of::<T>();
        let flags = self.options.flags;
        let sharable = align <= PINNED_ALIGN && size <= self.options.block_elements(1);

        let entry: Rc<dyn ArenaEntry> = if flags.contains(ArenaFlags::PADDED_SHARING) && sharable {
            let bytes = self.padded_byte_arena()?;
            Rc::new(MappedEntry::<T> {
                mapped: RefCell::new(MappedArena::new(bytes)),
            })
        } else if flags.contains(ArenaFlags::NON_PADDED_SHARING) && sharable {
            let bytes = self.sized_byte_arena(size, align)?;
            Rc::new(MappedEntry::<T> {
                mapped: RefCell::new(MappedArena::new(bytes)),
            })
        } else {
            Rc::new(DedicatedEntry {
                arena: RefCell::new(TypedArena::<T>::blittable(self.options.clone())?),
            })
        };
        self.register(key, Rc::clone(&entry));
        Ok(entry)
    }

    fn entry_for_owned<T: Default + 'static>(&self) -> Result<Rc<dyn ArenaEntry>> {
        let key = TypeId::of::<T>();
        if let Some(entry) = self.lookup(key) {
            return Ok(entry);
        }
        let entry: Rc<dyn ArenaEntry> = Rc::new(DedicatedEntry {
            arena: RefCell::new(TypedArena::<T>::with_options(self.options.clone())?),
        });
        self.register(key, Rc::clone(&entry));
        Ok(entry)
    }

    fn padded_byte_arena(&self) -> Result<Rc<RefCell<TypedArena<u8>>>> {
        let mut slot = self.padded_bytes.borrow_mut();
        if let Some(bytes) = &*slot {
            return Ok(Rc::clone(bytes));
        }
        let bytes = Rc::new(RefCell::new(TypedArena::<u8>::pinned(self.options.clone())?));
        *slot = Some(Rc::clone(&bytes));
        Ok(bytes)
    }

    fn sized_byte_arena(&self, size: usize, align: usize) -> Result<Rc<RefCell<TypedArena<u8>>>> {
        let mut map = self.sized_bytes.borrow_mut();
        if let Some(bytes) = map.get(&(size, align)) {
            return Ok(Rc::clone(bytes));
        }
        // Round the block size to a whole number of elements so every
        // allocation is size-aligned without padding.
        let block_bytes = self.options.block_elements(size) * size;
        let options = self.options.clone().exact_block_size_bytes(block_bytes);
        let bytes = Rc::new(RefCell::new(TypedArena::<u8>::pinned(options)?));
        map.insert((size, align), Rc::clone(&bytes));
        Ok(bytes)
    }
}

impl Default for Arena {
    fn default() -> Arena {
        Arena::new()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("types", &self.registered_types())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}
