// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Arena construction options: behaviour flags, block sizing, and the
// retention policy. Flags are a plain u32 bit set.

use crate::retention::RetentionPolicy;

/// Behaviour flags for an arena.
///
/// Flags are normalized at construction: element types that need `Drop`
/// never share byte storage and are always cleared (see
/// [`ArenaFlags::normalize_for_droppable`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArenaFlags(u32);

impl ArenaFlags {
    /// No special behaviour.
    pub const NONE: ArenaFlags = ArenaFlags(0);
    /// Overwrite element storage with defaults on every `reset`.
    pub const CLEAR_AT_RESET: ArenaFlags = ArenaFlags(1 << 0);
    /// Overwrite element storage with defaults on `dispose`.
    pub const CLEAR_AT_DISPOSE: ArenaFlags = ArenaFlags(1 << 1);
    /// Let blittable types of the same element size share one backing arena.
    pub const NON_PADDED_SHARING: ArenaFlags = ArenaFlags(1 << 2);
    /// Let all blittable types share one byte-backed arena, with per-type
    /// alignment padding.
    pub const PADDED_SHARING: ArenaFlags = ArenaFlags(1 << 3);
    /// Prefer pinned (stable-base-address, 16-byte-aligned) block storage.
    pub const PREFER_PINNED: ArenaFlags = ArenaFlags(1 << 4);
    /// Prefer raw unpooled heap blocks.
    pub const PREFER_UNMANAGED: ArenaFlags = ArenaFlags(1 << 5);

    /// Whether every flag in `other` is set.
    pub const fn contains(self, other: ArenaFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    pub const fn union(self, other: ArenaFlags) -> ArenaFlags {
        ArenaFlags(self.0 | other.0)
    }

    /// Difference: `self` without the flags in `other`.
    pub const fn without(self, other: ArenaFlags) -> ArenaFlags {
        ArenaFlags(self.0 & !other.0)
    }

    /// Flags as seen by a dedicated arena of a `Drop`-bearing element type:
    /// sharing and raw-storage flags are cleared, both clear flags forced.
    /// An element that may hold references must not have its storage
    /// recycled uncleared or reinterpreted.
    pub const fn normalize_for_droppable(self) -> ArenaFlags {
        self.without(ArenaFlags(
            Self::NON_PADDED_SHARING.0
                | Self::PADDED_SHARING.0
                | Self::PREFER_PINNED.0
                | Self::PREFER_UNMANAGED.0,
        ))
        .union(ArenaFlags(Self::CLEAR_AT_RESET.0 | Self::CLEAR_AT_DISPOSE.0))
    }
}

impl std::ops::BitOr for ArenaFlags {
    type Output = ArenaFlags;

    fn bitor(self, rhs: ArenaFlags) -> ArenaFlags {
        self.union(rhs)
    }
}

/// Preferred block payload size: 128 KiB of bytes per block.
pub(crate) const PREFERRED_BLOCK_BYTES: usize = 128 * 1024;

/// Minimum block payload size: 1 KiB of bytes per block.
pub(crate) const MIN_BLOCK_BYTES: usize = 1024;

/// Construction options for arenas.
#[derive(Debug, Clone, Default)]
pub struct ArenaOptions {
    pub(crate) block_size_bytes: Option<usize>,
    pub(crate) retention: RetentionPolicy,
    pub(crate) flags: ArenaFlags,
}

impl ArenaOptions {
    /// Default options: 128 KiB blocks, `Decay(0.9)` retention, no flags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block size in bytes. Values below the 1 KiB floor are
    /// raised to it. The per-type element count is `block_size / size_of::<T>()`,
    /// never less than one element.
    pub fn block_size_bytes(mut self, bytes: usize) -> Self {
        self.block_size_bytes = Some(bytes.max(MIN_BLOCK_BYTES));
        self
    }

    /// Set the block size in bytes without applying the 1 KiB floor.
    /// Intended for tests and tightly-bounded embedders.
    pub fn exact_block_size_bytes(mut self, bytes: usize) -> Self {
        self.block_size_bytes = Some(bytes);
        self
    }

    /// Set the retention policy consulted on `reset`.
    pub fn retention(mut self, policy: RetentionPolicy) -> Self {
        self.retention = policy;
        self
    }

    /// Set behaviour flags.
    pub fn flags(mut self, flags: ArenaFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Elements per block for an element size, applying the preferred size
    /// and floor. `element_size` must be nonzero.
    pub(crate) fn block_elements(&self, element_size: usize) -> usize {
        let bytes = self.block_size_bytes.unwrap_or(PREFERRED_BLOCK_BYTES);
        (bytes / element_size).max(1)
    }
}
