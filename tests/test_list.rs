// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The appendable list adapter.

use libarena::{ArenaList, ArenaOptions};

fn small_list() -> ArenaList<u32> {
    ArenaList::with_options(ArenaOptions::new().exact_block_size_bytes(16))
        .expect("list construction")
}

#[test]
fn push_and_read_back() {
    let mut list = small_list();
    assert!(list.is_empty());

    for i in 0..10u32 {
        let r = list.push(i * 10).expect("push");
        assert_eq!(r.value(), i * 10);
    }
    assert_eq!(list.len(), 10);

    for i in 0..10usize {
        assert_eq!(list.get(i).expect("get").value(), i as u32 * 10);
    }
}

#[test]
fn list_materializes_as_one_sequence() {
    let mut list = small_list();
    for i in 1..=9u32 {
        list.push(i).expect("push");
    }
    // Nine elements over 4-element blocks: a multi-segment sequence.
    let seq = list.as_sequence().expect("sequence");
    assert_eq!(seq.len(), 9);
    assert!(!seq.is_single_segment());
    assert_eq!(seq.to_vec(), [1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

#[test]
fn empty_list_is_an_empty_sequence() {
    let list = small_list();
    let seq = list.as_sequence().expect("sequence");
    assert!(seq.is_empty());
}

#[test]
fn clear_restarts_the_list() {
    let mut list = small_list();
    for i in 0..6u32 {
        list.push(i).expect("push");
    }
    list.clear().expect("clear");
    assert_eq!(list.len(), 0);
    assert!(list.as_sequence().expect("sequence").is_empty());

    list.push(99).expect("push");
    assert_eq!(list.as_sequence().expect("sequence").to_vec(), [99]);
}

#[test]
fn droppable_elements_are_supported() {
    let mut list: ArenaList<String> = ArenaList::new().expect("list");
    list.push("alpha".to_string()).expect("push");
    list.push("beta".to_string()).expect("push");
    assert_eq!(list.get(0).expect("get").get(), "alpha");
    assert_eq!(list.get(1).expect("get").get(), "beta");
}
