// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for the arena and its sequence views.
// Every fallible operation in the crate returns `Result<T, ArenaError>`;
// nothing panics across the public API.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArenaError>;

/// Errors surfaced by arenas, sequences, references, and their adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    /// A length or offset argument was outside the representable range.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An index, slice, or reference fell outside the addressed range.
    #[error("index {index} out of range for length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    /// An untyped sequence was cast to a sequence of the wrong element type.
    #[error("cannot cast sequence of `{actual}` to `{requested}`")]
    InvalidCast {
        actual: &'static str,
        requested: &'static str,
    },

    /// The element type cannot back an arena (zero-sized).
    #[error("unsupported element type `{0}`: zero-sized elements cannot back an arena")]
    UnsupportedElementType(&'static str),

    /// A memory handle had a shape the crate cannot decompose
    /// (neither an array chunk nor a known block).
    #[error("memory shape is neither an array nor a known block")]
    UnsupportedMemoryShape,

    /// The backing allocator produced an empty buffer or failed outright.
    #[error("backing allocator failed to produce a block of {requested} elements")]
    BlockAllocationFailed { requested: usize },

    /// The arena was used after `dispose`.
    #[error("arena has been disposed")]
    ArenaDisposed,

    /// A mutation was attempted through a read-only adapter.
    #[error("operation not supported on a read-only view")]
    NotSupported,
}
