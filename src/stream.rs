// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Stream overlay: `std::io::{Read, Write, Seek}` over a byte sequence.
// The stream is a cursor over an already-allocated range; it never grows
// the sequence. `flush` is a no-op and `trim` drops the stream's handles
// on everything past the cursor.

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::error::ArenaError;
use crate::sequence::Sequence;

/// A seekable byte stream over a [`Sequence<u8>`].
pub struct SequenceStream {
    sequence: Sequence<u8>,
    position: u64,
    read_only: bool,
}

impl SequenceStream {
    /// Read-write stream over `sequence`.
    pub fn new(sequence: Sequence<u8>) -> SequenceStream {
        SequenceStream {
            sequence,
            position: 0,
            read_only: false,
        }
    }

    /// Read-only stream: writes fail with `NotSupported`.
    pub fn read_only(sequence: Sequence<u8>) -> SequenceStream {
        SequenceStream {
            sequence,
            position: 0,
            read_only: true,
        }
    }

    /// Total length of the underlying sequence in bytes.
    pub fn len(&self) -> u64 {
        self.sequence.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Current cursor position. May sit past the end after a seek; reads
    /// and writes there transfer nothing.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether writes are rejected.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The underlying sequence.
    pub fn sequence(&self) -> &Sequence<u8> {
        &self.sequence
    }

    /// Release the stream's handles on everything from the cursor
    /// onward: the stream keeps only the bytes before the current
    /// position, and the cursor moves to the new end.
    pub fn trim(&mut self) -> crate::error::Result<()> {
        let keep = (self.position.min(self.len())) as usize;
        self.sequence = self.sequence.slice_len(0, keep)?;
        self.position = keep as u64;
        Ok(())
    }
}

fn to_io_error(e: ArenaError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, e)
}

impl Read for SequenceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.len();
        if self.position >= len {
            return Ok(0);
        }
        let n = buf.len().min((len - self.position) as usize);
        let chunk = self
            .sequence
            .slice_len(self.position as usize, n)
            .map_err(to_io_error)?;
        chunk.copy_to(&mut buf[..n]).map_err(to_io_error)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for SequenceStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.read_only {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                ArenaError::NotSupported,
            ));
        }
        let len = self.len();
        if self.position >= len {
            return Ok(0);
        }
        let n = buf.len().min((len - self.position) as usize);
        let chunk = self
            .sequence
            .slice_len(self.position as usize, n)
            .map_err(to_io_error)?;
        chunk.copy_from_slice(&buf[..n]).map_err(to_io_error)?;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        // Nothing buffered: writes land in block storage directly.
        Ok(())
    }
}

impl Seek for SequenceStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        match target {
            Some(position) => {
                self.position = position;
                Ok(position)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the start of the stream",
            )),
        }
    }
}

impl std::fmt::Debug for SequenceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceStream")
            .field("position", &self.position)
            .field("len", &self.len())
            .field("read_only", &self.read_only)
            .finish()
    }
}
