// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The io stream overlay over byte sequences.

use std::io::{Read, Seek, SeekFrom, Write};

use libarena::{ArenaOptions, SequenceStream, TypedArena};

fn byte_sequence(len: usize) -> (TypedArena<u8>, libarena::Sequence<u8>) {
    let mut a = TypedArena::with_options(ArenaOptions::new().exact_block_size_bytes(4))
        .expect("arena construction");
    let s = a.allocate(len).expect("allocate");
    (a, s)
}

#[test]
fn write_then_read_back_across_blocks() {
    let (_a, s) = byte_sequence(10);
    let mut stream = SequenceStream::new(s);

    stream.write_all(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]).expect("write");
    assert_eq!(stream.position(), 10);

    stream.seek(SeekFrom::Start(0)).expect("seek");
    let mut buf = [0u8; 10];
    stream.read_exact(&mut buf).expect("read");
    assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

#[test]
fn seek_from_end_and_current() {
    let (_a, s) = byte_sequence(10);
    let mut stream = SequenceStream::new(s);
    stream.write_all(&[10, 11, 12, 13, 14, 15, 16, 17, 18, 19]).expect("write");

    stream.seek(SeekFrom::End(-2)).expect("seek");
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).expect("read");
    assert_eq!(buf, [18, 19]);

    stream.seek(SeekFrom::Current(-4)).expect("seek");
    stream.read_exact(&mut buf).expect("read");
    assert_eq!(buf, [16, 17]);
}

#[test]
fn seek_before_start_is_rejected() {
    let (_a, s) = byte_sequence(4);
    let mut stream = SequenceStream::new(s);
    assert!(stream.seek(SeekFrom::Current(-1)).is_err());
    assert!(stream.seek(SeekFrom::End(-5)).is_err());
}

#[test]
fn reads_stop_at_the_end() {
    let (_a, s) = byte_sequence(4);
    let mut stream = SequenceStream::new(s);
    let mut buf = [0u8; 8];
    let n = stream.read(&mut buf).expect("read");
    assert_eq!(n, 4);
    let n = stream.read(&mut buf).expect("read");
    assert_eq!(n, 0);
}

#[test]
fn writes_never_grow_the_sequence() {
    let (_a, s) = byte_sequence(4);
    let mut stream = SequenceStream::new(s);
    let n = stream.write(&[1, 2, 3, 4, 5, 6]).expect("write");
    assert_eq!(n, 4);
    // The stream is full: write_all cannot make progress.
    assert!(stream.write_all(&[7]).is_err());
}

#[test]
fn read_only_streams_reject_writes() {
    let (_a, s) = byte_sequence(4);
    let mut stream = SequenceStream::read_only(s);
    assert!(stream.is_read_only());
    let err = stream.write(&[1]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);

    // Reads still work.
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf).expect("read");
}

#[test]
fn flush_is_a_no_op() {
    let (_a, s) = byte_sequence(4);
    let mut stream = SequenceStream::new(s);
    stream.flush().expect("flush");
}

#[test]
fn trim_releases_the_tail() {
    let (_a, s) = byte_sequence(10);
    let mut stream = SequenceStream::new(s);
    stream.write_all(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).expect("write");

    stream.seek(SeekFrom::Start(4)).expect("seek");
    stream.trim().expect("trim");
    assert_eq!(stream.len(), 4);
    assert_eq!(stream.position(), 4);

    stream.seek(SeekFrom::Start(0)).expect("seek");
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).expect("read");
    assert_eq!(buf, [1, 2, 3, 4]);
}
