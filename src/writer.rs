//! The entity writer: keyed blocks, arrays, subsections and arrays of
//! subsections over a [`WriteStream`].
//!
//! Every value is framed as a small or large block (see the block codec
//! notes in [`crate::types::ValueType`]). Large blocks reserve their size
//! slot with a canary value and patch it when the block closes. Subsections
//! and sections arrays hand a child writer to a closure; the child mutably
//! borrows the parent's stream, so the parent cannot be written while a
//! subsection is open.

use crate::collections::IndexedVector;
use crate::error::Error;
use crate::stream::WriteStream;
use crate::types::{DataValue, ValueType, MAX_KEY_LENGTH};

// canary for unpatched size slots, wrong on purpose so a missed patch is
// caught by the reader's bounds checks
const SIZE_CANARY: u64 = i64::MAX as u64;

fn check_key(key: &str) -> Result<(), Error> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(Error::KeyMismatch(format!(
            "key \"{}\" is {} bytes, the maximum is {}",
            key,
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// Writes the header of a large block and returns the block's start
/// position, needed to patch the size slot when the block ends.
fn begin_large_block(stream: &mut WriteStream, value_type: ValueType, key: &str) -> Result<u64, Error> {
    check_key(key)?;
    let start_position = stream.get_position();
    stream.write_u8(value_type as u8);
    stream.write_u64(SIZE_CANARY);
    stream.write_u8(key.len() as u8);
    stream.write_bytes(key.as_bytes());
    debug_assert_eq!(stream.get_position(), start_position + 10 + key.len() as u64);
    Ok(start_position)
}

/// Patches the size slot of a large block started at `start_position`.
fn end_large_block(stream: &mut WriteStream, start_position: u64) -> Result<(), Error> {
    let end_position = stream.get_position();
    if end_position <= start_position {
        return Err(Error::MalformedBlock(
            "large block ended before its own header".to_string(),
        ));
    }
    // total block size minus the tag byte and the size field itself
    let block_size = end_position - start_position - 9;
    stream.set_position(start_position + 1);
    stream.write_u64(block_size);
    stream.set_position(end_position);
    Ok(())
}

/// Writes the array preamble: flags, component count and the optional
/// sparse index.
fn write_array_metadata(
    stream: &mut WriteStream,
    per_item_size: usize,
    item_count: u64,
    index: Option<&[i32]>,
) -> Result<(), Error> {
    debug_assert!(per_item_size <= 0xff);
    let has_index: u16 = if index.is_some() { 0x100 } else { 0 };
    // bit 9 (64-bit index) is reserved and never set by this revision
    let array_flags = has_index | per_item_size as u16;
    stream.write_u16(array_flags);
    stream.write_u64(item_count);
    if let Some(index) = index {
        stream.write_u64(index.len() as u64);
        for value in index {
            stream.write_i32(*value);
        }
    }
    Ok(())
}

/// A cursor writing keyed values into a stream.
///
/// Obtained from a [`WriteStream`] with [`EntityWriter::new`]; subsection
/// writers are handed to closures by [`EntityWriter::write_section`] and
/// [`EntityWriter::write_sections_array`].
pub struct EntityWriter<'a> {
    stream: &'a mut WriteStream,
}

impl<'a> EntityWriter<'a> {
    /// Creates a writer over `stream`, starting at its current position.
    pub fn new(stream: &'a mut WriteStream) -> Self {
        EntityWriter { stream }
    }

    /// Writes a single keyed value.
    pub fn write<T: DataValue>(&mut self, key: &str, value: &T) -> Result<(), Error> {
        self.write_value(key, Some(value))
    }

    /// Writes a single keyed optional value; `None` emits the empty marker.
    pub fn write_option<T: DataValue>(&mut self, key: &str, value: Option<&T>) -> Result<(), Error> {
        self.write_value(key, value)
    }

    /// Writes a keyed array of values.
    pub fn write_slice<T: DataValue>(&mut self, key: &str, items: &[T]) -> Result<(), Error> {
        self.write_array(key, Some(items), None)
    }

    /// Writes a keyed optional array; `None` emits the empty marker.
    pub fn write_option_slice<T: DataValue>(
        &mut self,
        key: &str,
        items: Option<&[T]>,
    ) -> Result<(), Error> {
        self.write_array(key, items, None)
    }

    /// Writes a keyed indexed vector (values plus sparse index).
    pub fn write_indexed<T: DataValue>(
        &mut self,
        key: &str,
        value: &IndexedVector<T>,
    ) -> Result<(), Error> {
        self.write_array(key, Some(value.values()), Some(value.index()))
    }

    /// Writes a keyed optional indexed vector; `None` emits the empty
    /// marker.
    pub fn write_option_indexed<T: DataValue>(
        &mut self,
        key: &str,
        value: Option<&IndexedVector<T>>,
    ) -> Result<(), Error> {
        match value {
            Some(value) => self.write_indexed(key, value),
            None => self.write_array::<T>(key, None, None),
        }
    }

    /// Writes a keyed subsection. The closure receives a writer for the
    /// section body; the section is closed when the closure returns.
    pub fn write_section<R>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut EntityWriter<'_>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let start_position = begin_large_block(self.stream, ValueType::Subsection, key)?;
        let result = {
            let mut section = EntityWriter::new(&mut *self.stream);
            f(&mut section)?
        };
        end_large_block(self.stream, start_position)?;
        Ok(result)
    }

    /// Writes a keyed null section (a section frame with an empty payload).
    pub fn write_null_section(&mut self, key: &str) -> Result<(), Error> {
        let start_position = begin_large_block(self.stream, ValueType::Subsection, key)?;
        end_large_block(self.stream, start_position)
    }

    /// Writes a keyed array of `count` subsections.
    ///
    /// The closure is called once per slot in order. A slot into which the
    /// closure writes nothing is stored as a null child (size zero), which
    /// is how absent values in entity tables are encoded.
    pub fn write_sections_array(
        &mut self,
        key: &str,
        count: usize,
        index: Option<&[i32]>,
        mut f: impl FnMut(usize, &mut EntityWriter<'_>) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let start_position = begin_large_block(self.stream, ValueType::ArraySubsection, key)?;
        write_array_metadata(self.stream, 0, count as u64, index)?;
        for slot in 0..count {
            let slot_start = self.stream.get_position();
            self.stream.write_u64(SIZE_CANARY);
            {
                let mut section = EntityWriter::new(&mut *self.stream);
                f(slot, &mut section)?;
            }
            let slot_end = self.stream.get_position();
            self.stream.set_position(slot_start);
            self.stream.write_u64(slot_end - slot_start - 8);
            self.stream.set_position(slot_end);
        }
        end_large_block(self.stream, start_position)
    }

    /// Writes a keyed null sections array (frame with an empty payload).
    pub fn write_null_sections_array(&mut self, key: &str) -> Result<(), Error> {
        let start_position = begin_large_block(self.stream, ValueType::ArraySubsection, key)?;
        end_large_block(self.stream, start_position)
    }

    fn write_value<T: DataValue>(&mut self, key: &str, value: Option<&T>) -> Result<(), Error> {
        if T::SMALL_BLOCK {
            self.write_small_value(key, value)
        } else {
            self.write_large_value(key, value)
        }
    }

    fn write_small_value<T: DataValue>(&mut self, key: &str, value: Option<&T>) -> Result<(), Error> {
        check_key(key)?;
        let payload_size = if value.is_some() {
            T::COMPONENT_SIZE * T::COMPONENT_COUNT
        } else {
            0
        };
        let block_size = payload_size + key.len();
        debug_assert!(block_size < 256);

        let start_position = self.stream.get_position();
        self.stream.write_u8(T::VALUE_TYPE as u8);
        self.stream.write_u8(block_size as u8);
        if let Some(value) = value {
            value.write_single(self.stream);
        }
        self.stream.write_bytes(key.as_bytes());

        let expected_end = start_position + 2 + block_size as u64;
        if self.stream.get_position() != expected_end {
            return Err(Error::MalformedBlock(format!(
                "small block for key \"{}\" ended at {} instead of {}",
                key,
                self.stream.get_position(),
                expected_end
            )));
        }
        Ok(())
    }

    fn write_large_value<T: DataValue>(&mut self, key: &str, value: Option<&T>) -> Result<(), Error> {
        let start_position = begin_large_block(self.stream, T::VALUE_TYPE, key)?;
        if let Some(value) = value {
            value.write_single(self.stream);
        }
        end_large_block(self.stream, start_position)
    }

    fn write_array<T: DataValue>(
        &mut self,
        key: &str,
        items: Option<&[T]>,
        index: Option<&[i32]>,
    ) -> Result<(), Error> {
        let start_position = begin_large_block(self.stream, T::ARRAY_VALUE_TYPE, key)?;
        if let Some(items) = items {
            write_array_metadata(self.stream, T::ARRAY_ITEM_SIZE, T::array_count(items), index)?;
            T::write_slice(items, self.stream);
        }
        end_large_block(self.stream, start_position)
    }
}
