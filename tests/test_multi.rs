// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Multi-type arena behaviour: the registry, dedicated arenas, and the
// two byte-sharing modes with their alignment protocol.

use libarena::{Arena, ArenaError, ArenaFlags, ArenaOptions};

fn padded_arena(block_bytes: usize) -> Arena {
    Arena::with_options(
        ArenaOptions::new()
            .exact_block_size_bytes(block_bytes)
            .flags(ArenaFlags::PADDED_SHARING),
    )
}

// ========== Dedicated mode ==========

#[test]
fn each_type_gets_its_own_arena_by_default() {
    let arena = Arena::new();
    let ints = arena.allocate::<u32>(4).expect("allocate");
    let shorts = arena.allocate::<u16>(4).expect("allocate");
    ints.fill(0xAAAA_AAAA);
    shorts.fill(0x5555);
    assert!(ints.iter().all(|&x| x == 0xAAAA_AAAA));
    assert!(shorts.iter().all(|&x| x == 0x5555));
    assert_eq!(arena.registered_types(), 2);
}

#[test]
fn owned_allocation_carries_droppable_elements() {
    let arena = Arena::new();
    let seq = arena.allocate_owned::<String>(3).expect("allocate");
    for (i, segment) in seq.segments().enumerate() {
        for (j, slot) in segment.as_mut_slice().iter_mut().enumerate() {
            *slot = format!("s{i}{j}");
        }
    }
    assert_eq!(seq.to_vec(), ["s00", "s01", "s02"]);
}

#[test]
fn zero_sized_types_are_rejected() {
    let arena = Arena::new();
    let err = arena.allocate::<()>(1).unwrap_err();
    assert!(matches!(err, ArenaError::UnsupportedElementType(_)));
}

// ========== Padded sharing ==========

// Block size 8 bytes. u32 ×1, u8 ×3, u32 ×1, u16 ×1: the second u32 must
// start at absolute byte offset 8 (1 pad byte, then the next block) and
// the u16 at byte offset 12.
#[test]
fn padded_protocol_places_mixed_types() {
    let arena = padded_arena(8);

    let a = arena.allocate::<u32>(1).expect("u32");
    assert_eq!(a.start().logical_index() * 4, 0);

    let b = arena.allocate::<u8>(3).expect("u8");
    assert_eq!(b.start().logical_index(), 4);

    let c = arena.allocate::<u32>(1).expect("u32");
    assert_eq!(c.start().logical_index() * 4, 8);

    let d = arena.allocate::<u16>(1).expect("u16");
    assert_eq!(d.start().logical_index() * 2, 12);

    // 8 bytes of block 1 (4 + 3 + 1 pad) plus 6 bytes of block 2.
    assert_eq!(arena.allocated_bytes(), 14);
}

#[test]
fn padded_starts_are_size_aligned() {
    let arena = padded_arena(64);
    arena.allocate::<u8>(1).expect("u8");
    let ints = arena.allocate::<u32>(1).expect("u32");
    assert_eq!(ints.start().logical_index() * 4 % 4, 0);
    // One u8, three pad bytes, one u32.
    assert_eq!(arena.allocated_bytes(), 8);

    arena.allocate::<u8>(1).expect("u8");
    let longs = arena.allocate::<u64>(1).expect("u64");
    assert_eq!(longs.start().logical_index() * 8 % 8, 0);
    assert_eq!(arena.allocated_bytes(), 24);
}

#[test]
fn padded_sequences_hold_their_values() {
    let arena = padded_arena(16);
    let ints = arena.allocate::<u32>(6).expect("u32");
    let bytes = arena.allocate::<u8>(5).expect("u8");
    let shorts = arena.allocate::<u16>(4).expect("u16");

    ints.copy_from_slice(&[1, 2, 3, 4, 5, 6]).expect("copy");
    bytes.copy_from_slice(&[9, 8, 7, 6, 5]).expect("copy");
    shorts.copy_from_slice(&[100, 200, 300, 400]).expect("copy");

    // Interleaved writes through other views never overlap.
    assert_eq!(ints.to_vec(), [1, 2, 3, 4, 5, 6]);
    assert_eq!(bytes.to_vec(), [9, 8, 7, 6, 5]);
    assert_eq!(shorts.to_vec(), [100, 200, 300, 400]);
}

#[test]
fn padded_allocation_spans_blocks() {
    let arena = padded_arena(8);
    let seq = arena.allocate::<u32>(5).expect("u32");
    assert_eq!(seq.len(), 5);
    assert!(!seq.is_single_segment());
    seq.copy_from_slice(&[11, 22, 33, 44, 55]).expect("copy");
    assert_eq!(seq.to_vec(), [11, 22, 33, 44, 55]);
}

#[test]
fn padded_single_references_are_aligned() {
    let arena = padded_arena(16);
    arena.allocate::<u8>(1).expect("u8");
    let r = arena.allocate_single::<u64>().expect("u64");
    r.set(0x0123_4567_89AB_CDEF);
    assert_eq!(r.value(), 0x0123_4567_89AB_CDEF);
}

// ========== Non-padded sharing ==========

#[test]
fn same_size_types_share_one_arena() {
    let arena = Arena::with_options(
        ArenaOptions::new()
            .exact_block_size_bytes(16)
            .flags(ArenaFlags::NON_PADDED_SHARING),
    );
    let ints = arena.allocate::<u32>(2).expect("u32");
    let floats = arena.allocate::<f32>(2).expect("f32");
    assert_eq!(arena.registered_types(), 2);
    // Both landed in the shared 4-byte-element arena, back to back.
    assert_eq!(arena.allocated_bytes(), 16);
    assert_eq!(ints.start().logical_index(), 0);
    assert_eq!(floats.start().logical_index() * 4, 8);

    ints.fill(7);
    floats.fill(0.5);
    assert!(ints.iter().all(|&x| x == 7));
    assert!(floats.iter().all(|&x| x == 0.5));
}

// ========== Reset and dispose ==========

#[test]
fn reset_fans_out_to_every_type() {
    let arena = padded_arena(16);
    arena.allocate::<u32>(10).expect("u32");
    arena.allocate::<u16>(10).expect("u16");
    assert!(arena.allocated_bytes() > 0);

    arena.reset().expect("reset");
    assert_eq!(arena.allocated_bytes(), 0);

    // Allocation works again after the maps are rebuilt.
    let seq = arena.allocate::<u32>(3).expect("u32");
    assert_eq!(seq.start().logical_index(), 0);
}

#[test]
fn dispose_poisons_the_registry() {
    let arena = padded_arena(16);
    arena.allocate::<u32>(4).expect("u32");
    arena.dispose();
    assert!(matches!(
        arena.allocate::<u32>(1),
        Err(ArenaError::ArenaDisposed)
    ));
    assert!(matches!(arena.reset(), Err(ArenaError::ArenaDisposed)));
    // Idempotent.
    arena.dispose();
}
