// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Appendable list: a thin adapter that grows element by element inside a
// dedicated typed arena and can materialize the written range as a
// sequence at any time.

use crate::error::Result;
use crate::options::ArenaOptions;
use crate::position::SequencePosition;
use crate::reference::Reference;
use crate::sequence::Sequence;
use crate::typed::TypedArena;

/// A growable list of elements stored in its own arena.
///
/// The list is the sole user of its arena, so consecutive pushes occupy
/// consecutive logical indexes and the whole list is one sequence from
/// the recorded start position to the arena cursor.
pub struct ArenaList<T> {
    arena: TypedArena<T>,
    start: SequencePosition<T>,
    len: usize,
}

impl<T: Default + 'static> ArenaList<T> {
    pub fn new() -> Result<ArenaList<T>> {
        ArenaList::with_options(ArenaOptions::new())
    }

    pub fn with_options(options: ArenaOptions) -> Result<ArenaList<T>> {
        let arena = TypedArena::with_options(options)?;
        let start = arena.position()?;
        Ok(ArenaList {
            arena,
            start,
            len: 0,
        })
    }
}

impl<T> ArenaList<T> {
    /// Append a value; returns a reference to the stored element.
    pub fn push(&mut self, value: T) -> Result<Reference<T>> {
        let slot = self.arena.allocate_single()?;
        slot.set(value);
        self.len += 1;
        Ok(slot)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reference to the `index`-th element.
    pub fn get(&self, index: usize) -> Result<Reference<T>> {
        self.as_sequence()?.get(index)
    }

    /// The written range as a sequence, from the recorded start position
    /// to the arena's current position.
    pub fn as_sequence(&self) -> Result<Sequence<T>> {
        let end = self.arena.position()?;
        Sequence::try_from_positions(self.start.clone(), end)
    }

    /// Drop all elements: reset the backing arena and re-record the start
    /// position.
    pub fn clear(&mut self) -> Result<()> {
        self.arena.reset()?;
        self.start = self.arena.position()?;
        self.len = 0;
        Ok(())
    }
}

impl<T> std::fmt::Debug for ArenaList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArenaList").field("len", &self.len).finish()
    }
}
