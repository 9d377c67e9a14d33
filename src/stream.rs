//! Byte streams used by the serializer.
//!
//! [`WriteStream`] is an appendable in-memory buffer, [`ReadStream`] a
//! borrowed view over a byte range. Both expose typed accessors for 1, 2, 4
//! and 8 byte primitives whose byte order is controlled by a single
//! `flip_byte_order` flag: when unset values are emitted little-endian, when
//! set they are emitted big-endian. UUIDs and hashes are raw byte sequences
//! in their canonical textual order and are never swapped.
//!
//! Streams are single-threaded; a serialization pass owns its stream
//! exclusively.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use uuid::Uuid;

use crate::error::Error;
use crate::types::refs::Hash;

/// Default initial reservation of a write stream (64 MiB).
pub const INITIAL_RESERVATION: u64 = 64 * 1024 * 1024;

macro_rules! write_value_fn {
    ($name:ident, $ty:ty, $write:ident, $size:expr) => {
        /// Writes one value at the current position, honoring the byte order
        /// flag.
        pub fn $name(&mut self, value: $ty) {
            let mut buf = [0u8; $size];
            if self.flip_byte_order {
                BigEndian::$write(&mut buf, value);
            } else {
                LittleEndian::$write(&mut buf, value);
            }
            self.write_bytes(&buf);
        }
    };
}

macro_rules! read_value_fn {
    ($name:ident, $ty:ty, $read:ident, $size:expr) => {
        /// Reads one value at the current position, honoring the byte order
        /// flag.
        ///
        /// # Errors
        /// Returns [`Error::EndOfStream`] if fewer than the required bytes
        /// remain.
        pub fn $name(&mut self) -> Result<$ty, Error> {
            let bytes = self.take($size)?;
            if self.flip_byte_order {
                Ok(BigEndian::$read(bytes))
            } else {
                Ok(LittleEndian::$read(bytes))
            }
        }
    };
}

/// A write-only memory stream.
///
/// The buffer grows geometrically as data is appended, and also grows when
/// the position is moved past the current end (the gap is zero-filled).
/// Rewinding the position and writing again overwrites in place, which the
/// block codec uses to patch size slots.
pub struct WriteStream {
    data: Vec<u8>,
    position: u64,
    flip_byte_order: bool,
}

impl Default for WriteStream {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteStream {
    /// Creates a stream with the default initial reservation.
    pub fn new() -> Self {
        Self::with_reservation(INITIAL_RESERVATION)
    }

    /// Creates a stream reserving `reservation` bytes up front.
    pub fn with_reservation(reservation: u64) -> Self {
        WriteStream {
            data: Vec::with_capacity(reservation as usize),
            position: 0,
            flip_byte_order: false,
        }
    }

    /// Returns a read-only view of the written data.
    pub fn get_data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the size of the stream in bytes.
    pub fn get_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns the current write position.
    pub fn get_position(&self) -> u64 {
        self.position
    }

    /// Moves the write position. Moving past the end grows the stream and
    /// zero-fills the gap.
    pub fn set_position(&mut self, position: u64) {
        if position > self.data.len() as u64 {
            self.data.resize(position as usize, 0);
        }
        self.position = position;
    }

    /// Returns whether multi-byte values are emitted with swapped byte order.
    pub fn get_flip_byte_order(&self) -> bool {
        self.flip_byte_order
    }

    /// Sets whether multi-byte values are emitted with swapped byte order.
    pub fn set_flip_byte_order(&mut self, value: bool) {
        self.flip_byte_order = value;
    }

    /// Writes raw bytes at the current position, growing the stream as
    /// needed.
    pub fn write_bytes(&mut self, src: &[u8]) {
        let end = self.position as usize + src.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.position as usize..end].copy_from_slice(src);
        self.position = end as u64;
    }

    /// Writes one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Writes one signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.write_bytes(&[value as u8]);
    }

    write_value_fn!(write_u16, u16, write_u16, 2);
    write_value_fn!(write_i16, i16, write_i16, 2);
    write_value_fn!(write_u32, u32, write_u32, 4);
    write_value_fn!(write_i32, i32, write_i32, 4);
    write_value_fn!(write_u64, u64, write_u64, 8);
    write_value_fn!(write_i64, i64, write_i64, 8);
    write_value_fn!(write_f32, f32, write_f32, 4);
    write_value_fn!(write_f64, f64, write_f64, 8);

    /// Writes a UUID as 16 raw bytes.
    ///
    /// UUIDs are stored in the order their hex digits print, so no byte
    /// swapping is ever applied.
    pub fn write_uuid(&mut self, value: &Uuid) {
        self.write_bytes(value.as_bytes());
    }

    /// Writes a hash as 32 raw bytes, never swapped.
    pub fn write_hash(&mut self, value: &Hash) {
        self.write_bytes(value.as_bytes());
    }
}

/// A read-only view over a byte range.
///
/// Typed reads return an error when fewer bytes remain than requested;
/// [`ReadStream::read_bytes`] instead returns the number of bytes actually
/// consumed, so callers can detect short reads.
pub struct ReadStream<'a> {
    data: &'a [u8],
    position: u64,
    flip_byte_order: bool,
}

impl<'a> ReadStream<'a> {
    /// Creates a stream over `data` with byte swapping disabled.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_flip_byte_order(data, false)
    }

    /// Creates a stream over `data` with the given byte order flag.
    pub fn with_flip_byte_order(data: &'a [u8], flip_byte_order: bool) -> Self {
        ReadStream {
            data,
            position: 0,
            flip_byte_order,
        }
    }

    /// Returns the size of the stream in bytes.
    pub fn get_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns the current read position.
    pub fn get_position(&self) -> u64 {
        self.position
    }

    /// Moves the read position. Returns `false` if the position would move
    /// past the end of the stream, leaving the position unchanged.
    pub fn set_position(&mut self, position: u64) -> bool {
        if position > self.data.len() as u64 {
            return false;
        }
        self.position = position;
        true
    }

    /// Returns `true` when the position is at or past the end.
    pub fn is_eof(&self) -> bool {
        self.position >= self.data.len() as u64
    }

    /// Returns whether multi-byte values are read with swapped byte order.
    pub fn get_flip_byte_order(&self) -> bool {
        self.flip_byte_order
    }

    /// Sets whether multi-byte values are read with swapped byte order.
    pub fn set_flip_byte_order(&mut self, value: bool) {
        self.flip_byte_order = value;
    }

    /// Peeks at the next byte without moving the position. Returns 0 past
    /// the end of the stream.
    pub fn peek(&self) -> u8 {
        if self.is_eof() {
            0
        } else {
            self.data[self.position as usize]
        }
    }

    /// Reads up to `dest.len()` bytes and returns the number of bytes that
    /// were actually available. A short count means the end of the stream
    /// was reached.
    pub fn read_bytes(&mut self, dest: &mut [u8]) -> usize {
        let remaining = (self.data.len() as u64 - self.position) as usize;
        let count = dest.len().min(remaining);
        let start = self.position as usize;
        dest[..count].copy_from_slice(&self.data[start..start + count]);
        self.position += count as u64;
        count
    }

    /// Consumes `count` bytes and returns them as a slice of the underlying
    /// buffer.
    fn take(&mut self, count: usize) -> Result<&'a [u8], Error> {
        let start = self.position as usize;
        if start + count > self.data.len() {
            return Err(Error::EndOfStream(format!(
                "cannot read {} bytes at position {} of a {} byte stream",
                count,
                start,
                self.data.len()
            )));
        }
        self.position += count as u64;
        Ok(&self.data[start..start + count])
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    /// Reads one signed byte.
    pub fn read_i8(&mut self) -> Result<i8, Error> {
        Ok(self.take(1)?[0] as i8)
    }

    read_value_fn!(read_u16, u16, read_u16, 2);
    read_value_fn!(read_i16, i16, read_i16, 2);
    read_value_fn!(read_u32, u32, read_u32, 4);
    read_value_fn!(read_i32, i32, read_i32, 4);
    read_value_fn!(read_u64, u64, read_u64, 8);
    read_value_fn!(read_i64, i64, read_i64, 8);
    read_value_fn!(read_f32, f32, read_f32, 4);
    read_value_fn!(read_f64, f64, read_f64, 8);

    /// Reads a UUID as 16 raw bytes, never swapped.
    pub fn read_uuid(&mut self) -> Result<Uuid, Error> {
        let bytes = self.take(16)?;
        let mut raw = [0u8; 16];
        raw.copy_from_slice(bytes);
        Ok(Uuid::from_bytes(raw))
    }

    /// Reads a hash as 32 raw bytes, never swapped.
    pub fn read_hash(&mut self) -> Result<Hash, Error> {
        let bytes = self.take(32)?;
        let mut raw = [0u8; 32];
        raw.copy_from_slice(bytes);
        Ok(Hash::from(raw))
    }
}
