// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Typed arena behaviour: allocation fast/slow paths, block spilling,
// cursor primitives, counters, reset, and dispose.

use libarena::{ArenaError, ArenaFlags, ArenaOptions, RetentionPolicy, TypedArena};

/// Arena of `u32` with exactly `elems` elements per block.
fn arena_u32(elems: usize) -> TypedArena<u32> {
    TypedArena::with_options(ArenaOptions::new().exact_block_size_bytes(elems * 4))
        .expect("arena construction")
}

// ========== Allocation ==========

#[test]
fn allocate_returns_requested_length() {
    let mut a = arena_u32(8);
    for n in [0usize, 1, 3, 8, 17] {
        let s = a.allocate(n).expect("allocate");
        assert_eq!(s.len(), n);
    }
}

#[test]
fn small_allocation_is_single_segment() {
    let mut a = arena_u32(8);
    let s = a.allocate(5).expect("allocate");
    assert!(s.is_single_segment());
    assert_eq!(s.first_span().len(), 5);
}

// Three allocations of 3 over 4-element blocks: the second spans blocks
// 1→2 (offsets 3 and 2), the third spans blocks 2→3 (offsets 2 and 1).
#[test]
fn allocations_span_block_boundaries() {
    let mut a = arena_u32(4);

    let s1 = a.allocate(3).expect("allocate");
    assert!(s1.is_single_segment());
    assert_eq!(s1.start().logical_index(), 0);

    let s2 = a.allocate(3).expect("allocate");
    assert!(!s2.is_single_segment());
    assert_eq!(s2.len(), 3);
    assert_eq!(s2.start().logical_index(), 3);
    assert_eq!(s2.end().logical_index(), 6);
    let spans: Vec<usize> = s2.spans().map(<[u32]>::len).collect();
    assert_eq!(spans, [1, 2]);

    let s3 = a.allocate(3).expect("allocate");
    assert_eq!(s3.start().logical_index(), 6);
    let spans: Vec<usize> = s3.spans().map(<[u32]>::len).collect();
    assert_eq!(spans, [2, 1]);

    assert_eq!(a.allocated_elements(), 9);
    assert_eq!(a.capacity_elements(), 12);
}

#[test]
fn consecutive_allocations_are_adjacent() {
    let mut a = arena_u32(4);
    let s1 = a.allocate(2).expect("allocate");
    let s2 = a.allocate(1).expect("allocate");
    assert_eq!(s1.end(), s2.start());

    // Across a block boundary too.
    let s3 = a.allocate(3).expect("allocate");
    assert_eq!(s2.end(), s3.start());
}

#[test]
fn exact_fill_keeps_sequences_adjacent() {
    let mut a = arena_u32(4);
    let s1 = a.allocate(4).expect("allocate");
    assert!(s1.is_single_segment());

    // The next allocation advances into a new block; normalization makes
    // "end of block 1" and "start of block 2" the same position.
    let s2 = a.allocate(1).expect("allocate");
    assert_eq!(s1.end(), s2.start());
    assert_eq!(s2.start().logical_index(), 4);
    assert_eq!(s2.start().index(), 0);
}

#[test]
fn multi_block_exact_fill_extends_the_chain() {
    let mut a = arena_u32(4);
    let s = a.allocate(8).expect("allocate");
    assert_eq!(s.len(), 8);
    // The slow path's exact fill advances eagerly, so the chain already
    // holds the block the next allocation will start in.
    assert_eq!(a.capacity_elements(), 12);
    let t = a.allocate(1).expect("allocate");
    assert_eq!(s.end(), t.start());
    assert_eq!(a.capacity_elements(), 12);
}

#[test]
fn zero_length_allocation_is_empty() {
    let mut a = arena_u32(4);
    let s = a.allocate(0).expect("allocate");
    assert!(s.is_empty());
    assert_eq!(a.allocated_elements(), 0);
}

#[test]
fn sequences_are_writable_and_readable() {
    let mut a = arena_u32(4);
    let s = a.allocate(10).expect("allocate");
    let values: Vec<u32> = (100..110).collect();
    s.copy_from_slice(&values).expect("copy in");
    assert_eq!(s.to_vec(), values);

    s.fill(7);
    assert!(s.iter().all(|&x| x == 7));
}

#[test]
fn allocate_single_hands_out_consecutive_elements() {
    let mut a = arena_u32(2);
    let r1 = a.allocate_single().expect("allocate");
    let r2 = a.allocate_single().expect("allocate");
    let r3 = a.allocate_single().expect("allocate");
    r1.set(11);
    r2.set(22);
    r3.set(33);
    assert_eq!(r1.value(), 11);
    assert_eq!(r2.value(), 22);
    assert_eq!(r3.value(), 33);
    // The third landed in the second block.
    assert_eq!(r3.offset(), 0);
    assert_eq!(a.allocated_elements(), 3);
}

#[test]
fn oversized_allocation_is_rejected() {
    let mut a = arena_u32(4);
    let err = a.allocate(u32::MAX as usize + 1).unwrap_err();
    assert!(matches!(err, ArenaError::InvalidArgument(_)));
}

// ========== Cursor primitives ==========

#[test]
fn skip_to_next_page_consumes_the_remainder() {
    let mut a = arena_u32(4);
    a.allocate(2).expect("allocate");
    a.skip_to_next_page().expect("skip");

    let s = a.allocate(1).expect("allocate");
    assert_eq!(s.start().logical_index(), 4);
    assert_eq!(s.start().index(), 0);
}

#[test]
fn skip_at_page_start_is_a_no_op() {
    let mut a = arena_u32(4);
    a.skip_to_next_page().expect("skip");
    let s = a.allocate(1).expect("allocate");
    assert_eq!(s.start().logical_index(), 0);
}

#[test]
fn position_tracks_the_cursor() {
    let mut a = arena_u32(4);
    let s = a.allocate(3).expect("allocate");
    assert_eq!(a.position().expect("position"), s.end());
    a.allocate(2).expect("allocate");
    assert_eq!(a.position().expect("position").logical_index(), 5);
}

// ========== Reset and reuse ==========

#[test]
fn reset_zeroes_usage_and_reuses_blocks() {
    let mut a = TypedArena::<u32>::with_options(
        ArenaOptions::new()
            .exact_block_size_bytes(16)
            .retention(RetentionPolicy::Everything),
    )
    .expect("arena");
    a.allocate(10).expect("allocate");
    let capacity = a.capacity_elements();

    a.reset().expect("reset");
    assert_eq!(a.allocated_elements(), 0);

    a.allocate(10).expect("allocate");
    // Everything retention: the same chain serves the same workload.
    assert_eq!(a.capacity_elements(), capacity);
}

#[test]
fn clear_at_reset_wipes_used_storage() {
    let mut a = TypedArena::<u32>::with_options(
        ArenaOptions::new()
            .exact_block_size_bytes(16)
            .flags(ArenaFlags::CLEAR_AT_RESET)
            .retention(RetentionPolicy::Everything),
    )
    .expect("arena");
    let s = a.allocate(6).expect("allocate");
    s.fill(0xDEAD_BEEF);
    a.reset().expect("reset");

    let s = a.allocate(6).expect("allocate");
    assert!(s.iter().all(|&x| x == 0), "storage was not cleared");
}

#[test]
fn droppable_elements_force_clearing_flags() {
    let a = TypedArena::<String>::with_options(ArenaOptions::new()).expect("arena");
    assert!(a.flags().contains(ArenaFlags::CLEAR_AT_RESET));
    assert!(a.flags().contains(ArenaFlags::CLEAR_AT_DISPOSE));
    assert!(!a.flags().contains(ArenaFlags::PADDED_SHARING));
}

#[test]
fn droppable_elements_round_trip() {
    let mut a = TypedArena::<String>::with_options(
        ArenaOptions::new().exact_block_size_bytes(4 * std::mem::size_of::<String>()),
    )
    .expect("arena");
    let s = a.allocate(6).expect("allocate");
    for (i, segment) in s.segments().enumerate() {
        for (j, slot) in segment.as_mut_slice().iter_mut().enumerate() {
            *slot = format!("item-{i}-{j}");
        }
    }
    let collected = s.to_vec();
    assert_eq!(collected.len(), 6);
    assert_eq!(collected[0], "item-0-0");
    a.reset().expect("reset");
}

// ========== Dispose ==========

#[test]
fn dispose_poisons_the_arena() {
    let mut a = arena_u32(4);
    a.allocate(2).expect("allocate");
    a.dispose();

    assert!(matches!(a.allocate(1), Err(ArenaError::ArenaDisposed)));
    assert!(matches!(a.reset(), Err(ArenaError::ArenaDisposed)));
    assert!(matches!(a.position(), Err(ArenaError::ArenaDisposed)));
    assert_eq!(a.capacity_elements(), 0);

    // Idempotent.
    a.dispose();
}

#[test]
fn zero_sized_elements_are_rejected() {
    let err = TypedArena::<()>::with_options(ArenaOptions::new()).unwrap_err();
    assert!(matches!(err, ArenaError::UnsupportedElementType(_)));
}

// ========== Blittable source families ==========

#[test]
fn pinned_arena_allocates() {
    let mut a = TypedArena::<u64>::pinned(ArenaOptions::new().exact_block_size_bytes(64))
        .expect("arena");
    let s = a.allocate(12).expect("allocate");
    s.fill(42);
    assert!(s.iter().all(|&x| x == 42));
    let r = s.get(0).expect("get");
    assert!(r.is_pinned());
}

#[test]
fn unmanaged_arena_allocates() {
    let mut a = TypedArena::<u16>::unmanaged(ArenaOptions::new().exact_block_size_bytes(32))
        .expect("arena");
    let s = a.allocate(40).expect("allocate");
    assert_eq!(s.len(), 40);
    assert!(s.iter().all(|&x| x == 0));
}
