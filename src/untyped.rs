// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Untyped sequences: a type-erased descriptor that remembers its element
// type and can be cast back, failing loudly on a mismatch.

use std::any::Any;

use crate::error::{ArenaError, Result};
use crate::sequence::Sequence;

/// A sequence descriptor with its element type erased.
///
/// The descriptor keeps the element count and segment shape observable
/// without the type; recovering element access requires [`cast`](Self::cast)
/// with the original element type.
pub struct UntypedSequence {
    inner: Box<dyn Any>,
    element: &'static str,
    len: usize,
    single_segment: bool,
}

impl UntypedSequence {
    /// Erase the element type of `sequence`.
    pub fn new<T: 'static>(sequence: Sequence<T>) -> UntypedSequence {
        UntypedSequence {
            element: std::any::type_name::<T>(),
            len: sequence.len(),
            single_segment: sequence.is_single_segment(),
            inner: Box::new(sequence),
        }
    }

    /// Name of the erased element type.
    pub fn element_type_name(&self) -> &'static str {
        self.element
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_single_segment(&self) -> bool {
        self.single_segment
    }

    /// Recover the typed descriptor. Fails with `InvalidCast` when `T` is
    /// not the element type this descriptor was erased from.
    pub fn cast<T: 'static>(&self) -> Result<Sequence<T>> {
        match self.inner.downcast_ref::<Sequence<T>>() {
            Some(sequence) => Ok(sequence.clone()),
            None => Err(ArenaError::InvalidCast {
                actual: self.element,
                requested: std::any::type_name::<T>(),
            }),
        }
    }
}

impl std::fmt::Debug for UntypedSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UntypedSequence")
            .field("element", &self.element)
            .field("len", &self.len)
            .finish()
    }
}

impl<T: 'static> From<Sequence<T>> for UntypedSequence {
    fn from(sequence: Sequence<T>) -> UntypedSequence {
        UntypedSequence::new(sequence)
    }
}
