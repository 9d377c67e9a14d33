//! The entity reader: the defensive mirror of [`crate::writer`].
//!
//! Every block read validates the value tag, the declared size against the
//! stream bounds, the key length and the key bytes, and finally that the
//! cursor lands exactly on the block's declared end. Any mismatch returns an
//! error instead of panicking; an artifact either parses exactly or not at
//! all.

use log::debug;

use crate::collections::IndexedVector;
use crate::error::Error;
use crate::stream::ReadStream;
use crate::types::{DataValue, ValueType, MAX_KEY_LENGTH};

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

/// Reads and validates the header of a large block, returning the stream
/// position of the block's end.
fn begin_large_block(stream: &mut ReadStream<'_>, value_type: ValueType, key: &str) -> Result<u64, Error> {
    check_key(key)?;

    let read_type = stream.read_u8()?;
    if read_type != value_type as u8 {
        debug!(
            "block tag {:#04x} in stream does not match expected {:#04x} for key \"{}\"",
            read_type, value_type as u8, key
        );
        return Err(Error::TypeMismatch(format!(
            "block tag {:#04x} does not match expected {:#04x} for key \"{}\"",
            read_type, value_type as u8, key
        )));
    }

    let block_size = stream.read_u64()?;
    let end_position = stream
        .get_position()
        .checked_add(block_size)
        .ok_or_else(|| Error::MalformedBlock("block size overflows the stream".to_string()))?;
    if end_position > stream.get_size() {
        return Err(Error::MalformedBlock(format!(
            "block size {} for key \"{}\" points beyond the end of the stream",
            block_size, key
        )));
    }

    let read_key_length = stream.read_u8()? as usize;
    if read_key_length != key.len() {
        return Err(Error::KeyMismatch(format!(
            "key length {} in stream does not match expected {} for key \"{}\"",
            read_key_length,
            key.len(),
            key
        )));
    }
    let mut read_key = [0u8; MAX_KEY_LENGTH];
    if stream.read_bytes(&mut read_key[..read_key_length]) != read_key_length {
        return Err(Error::EndOfStream("could not read the block key".to_string()));
    }
    if &read_key[..read_key_length] != key.as_bytes() {
        return Err(Error::KeyMismatch(format!(
            "key \"{}\" in stream does not match expected key \"{}\"",
            String::from_utf8_lossy(&read_key[..read_key_length]),
            key
        )));
    }

    Ok(end_position)
}

fn expect_end(stream: &ReadStream<'_>, end_position: u64, key: &str) -> Result<(), Error> {
    if stream.get_position() != end_position {
        return Err(Error::MalformedBlock(format!(
            "block for key \"{}\" ended at {} instead of {}",
            key,
            stream.get_position(),
            end_position
        )));
    }
    Ok(())
}

fn empty_not_allowed(key: &str) -> Error {
    Error::EmptyNotAllowed(format!(
        "the value for key \"{}\" is empty, which is not allowed here",
        key
    ))
}

/// Reads the array preamble and the optional sparse index.
///
/// The destination decides whether an index is expected; a mismatch with
/// the stream flags fails the read. The reserved 64-bit index flag is
/// rejected.
fn read_array_metadata(
    stream: &mut ReadStream<'_>,
    block_end: u64,
    want_index: bool,
) -> Result<(usize, u64, Option<Vec<i32>>), Error> {
    let array_flags = stream.read_u16()?;
    let per_item_size = (array_flags & 0xff) as usize;
    let has_index = (array_flags & 0x100) != 0;
    let index_is_64bit = (array_flags & 0x200) != 0;

    if index_is_64bit {
        return Err(Error::Unsupported(
            "the array has a 64-bit index, which is not supported".to_string(),
        ));
    }

    let item_count = stream.read_u64()?;

    let index = if has_index {
        if !want_index {
            return Err(Error::TypeMismatch(
                "the array in the stream has an index, but the destination does not".to_string(),
            ));
        }
        let index_count = stream.read_u64()?;
        let max_possible = block_end.saturating_sub(stream.get_position()) / 4;
        if index_count > max_possible {
            return Err(Error::MalformedBlock(format!(
                "index count {} does not fit in the remaining block bytes",
                index_count
            )));
        }
        let mut index = Vec::with_capacity(index_count as usize);
        for _ in 0..index_count {
            index.push(stream.read_i32()?);
        }
        Some(index)
    } else {
        if want_index {
            return Err(Error::TypeMismatch(
                "the destination expects an index, but the array in the stream has none".to_string(),
            ));
        }
        None
    };

    Ok((per_item_size, item_count, index))
}

/// A cursor reading keyed values from a stream.
///
/// The read methods mirror the writer exactly: the same keys in the same
/// order, with the same container shapes. Optional variants accept the
/// empty marker and return `None`; the plain variants fail on it.
pub struct EntityReader<'r, 'buf> {
    stream: &'r mut ReadStream<'buf>,
    end_position: u64,
}

impl<'r, 'buf> EntityReader<'r, 'buf> {
    /// Creates a reader over the whole remaining stream.
    pub fn new(stream: &'r mut ReadStream<'buf>) -> Self {
        let end_position = stream.get_size();
        EntityReader {
            stream,
            end_position,
        }
    }

    /// Returns the position one past the readable range of this cursor.
    pub fn get_end_position(&self) -> u64 {
        self.end_position
    }

    /// Reads a single keyed value. Fails on the empty marker.
    pub fn read<T: DataValue>(&mut self, key: &str) -> Result<T, Error> {
        self.read_value::<T>(key, false)?.ok_or_else(|| empty_not_allowed(key))
    }

    /// Reads a single keyed optional value; the empty marker yields `None`.
    pub fn read_option<T: DataValue>(&mut self, key: &str) -> Result<Option<T>, Error> {
        self.read_value::<T>(key, true)
    }

    /// Reads a keyed array of values. Fails on the empty marker.
    pub fn read_vec<T: DataValue>(&mut self, key: &str) -> Result<Vec<T>, Error> {
        let (items, _) = self
            .read_array::<T>(key, false, false)?
            .ok_or_else(|| empty_not_allowed(key))?;
        Ok(items)
    }

    /// Reads a keyed optional array; the empty marker yields `None`.
    pub fn read_option_vec<T: DataValue>(&mut self, key: &str) -> Result<Option<Vec<T>>, Error> {
        Ok(self.read_array::<T>(key, true, false)?.map(|(items, _)| items))
    }

    /// Reads a keyed indexed vector. Fails on the empty marker.
    pub fn read_indexed<T: DataValue>(&mut self, key: &str) -> Result<IndexedVector<T>, Error> {
        let (values, index) = self
            .read_array::<T>(key, false, true)?
            .ok_or_else(|| empty_not_allowed(key))?;
        Ok(IndexedVector::from_parts(values, index.unwrap_or_default()))
    }

    /// Reads a keyed optional indexed vector; the empty marker yields
    /// `None`.
    pub fn read_option_indexed<T: DataValue>(
        &mut self,
        key: &str,
    ) -> Result<Option<IndexedVector<T>>, Error> {
        Ok(self
            .read_array::<T>(key, true, true)?
            .map(|(values, index)| IndexedVector::from_parts(values, index.unwrap_or_default())))
    }

    /// Reads a keyed subsection. Fails if the section is null.
    pub fn read_section<R>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut EntityReader<'_, 'buf>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.read_section_impl(key, false, f)?
            .ok_or_else(|| empty_not_allowed(key))
    }

    /// Reads a keyed subsection that may be null; a null section yields
    /// `None` without invoking the closure.
    pub fn read_optional_section<R>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut EntityReader<'_, 'buf>) -> Result<R, Error>,
    ) -> Result<Option<R>, Error> {
        self.read_section_impl(key, true, f)
    }

    /// Reads a keyed array of subsections without a sparse index. The
    /// closure must consume every slot through the array reader.
    pub fn read_sections_array<R>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut SectionsArrayReader<'_, 'buf>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.read_sections_array_impl(key, false, false, f)?
            .ok_or_else(|| empty_not_allowed(key))
    }

    /// Reads a keyed array of subsections carrying a sparse index; the
    /// index is available through [`SectionsArrayReader::take_index`].
    pub fn read_indexed_sections_array<R>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut SectionsArrayReader<'_, 'buf>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        self.read_sections_array_impl(key, false, true, f)?
            .ok_or_else(|| empty_not_allowed(key))
    }

    /// Reads a keyed array of subsections that may be null as a whole.
    pub fn read_optional_sections_array<R>(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut SectionsArrayReader<'_, 'buf>) -> Result<R, Error>,
    ) -> Result<Option<R>, Error> {
        self.read_sections_array_impl(key, true, false, f)
    }

    fn read_value<T: DataValue>(&mut self, key: &str, empty_allowed: bool) -> Result<Option<T>, Error> {
        if T::SMALL_BLOCK {
            self.read_small_value(key, empty_allowed)
        } else {
            self.read_large_value(key, empty_allowed)
        }
    }

    fn read_small_value<T: DataValue>(
        &mut self,
        key: &str,
        empty_allowed: bool,
    ) -> Result<Option<T>, Error> {
        check_key(key)?;

        let start_position = self.stream.get_position();
        let read_type = self.stream.read_u8()?;
        if read_type != T::VALUE_TYPE as u8 {
            return Err(Error::TypeMismatch(format!(
                "block tag {:#04x} does not match expected {:#04x} for key \"{}\"",
                read_type,
                T::VALUE_TYPE as u8,
                key
            )));
        }

        let payload_size = T::COMPONENT_SIZE * T::COMPONENT_COUNT;
        let expected_block_size_if_empty = key.len();
        let expected_block_size = payload_size + key.len();
        debug_assert!(expected_block_size < 256);

        // any size other than the full size is treated as the empty marker,
        // then re-checked against the empty size
        let block_size = self.stream.read_u8()? as usize;
        let is_empty = block_size != expected_block_size;
        if is_empty {
            if !empty_allowed {
                return Err(empty_not_allowed(key));
            }
            if block_size != expected_block_size_if_empty {
                return Err(Error::MalformedBlock(format!(
                    "small block size {} for key \"{}\" matches neither the value size {} nor the empty size {}",
                    block_size, key, expected_block_size, expected_block_size_if_empty
                )));
            }
        }

        let value = if is_empty {
            None
        } else {
            let value_end = start_position + 2 + expected_block_size as u64;
            Some(T::read_single(self.stream, value_end)?)
        };

        let mut read_key = [0u8; MAX_KEY_LENGTH];
        if self.stream.read_bytes(&mut read_key[..key.len()]) != key.len()
            || &read_key[..key.len()] != key.as_bytes()
        {
            return Err(Error::KeyMismatch(format!(
                "key \"{}\" in stream does not match expected key \"{}\"",
                String::from_utf8_lossy(&read_key[..key.len()]),
                key
            )));
        }

        let expected_end = start_position + 2 + block_size as u64;
        expect_end(self.stream, expected_end, key)?;
        Ok(value)
    }

    fn read_large_value<T: DataValue>(
        &mut self,
        key: &str,
        empty_allowed: bool,
    ) -> Result<Option<T>, Error> {
        let block_end = begin_large_block(self.stream, T::VALUE_TYPE, key)?;
        if self.stream.get_position() == block_end {
            if !empty_allowed {
                return Err(empty_not_allowed(key));
            }
            return Ok(None);
        }
        let value = T::read_single(self.stream, block_end)?;
        expect_end(self.stream, block_end, key)?;
        Ok(Some(value))
    }

    #[allow(clippy::type_complexity)]
    fn read_array<T: DataValue>(
        &mut self,
        key: &str,
        empty_allowed: bool,
        want_index: bool,
    ) -> Result<Option<(Vec<T>, Option<Vec<i32>>)>, Error> {
        let block_end = begin_large_block(self.stream, T::ARRAY_VALUE_TYPE, key)?;
        if self.stream.get_position() == block_end {
            if !empty_allowed {
                return Err(empty_not_allowed(key));
            }
            return Ok(None);
        }

        let (per_item_size, item_count, index) =
            read_array_metadata(self.stream, block_end, want_index)?;
        if per_item_size != T::ARRAY_ITEM_SIZE {
            return Err(Error::TypeMismatch(format!(
                "per-item size {} in stream does not match expected {} for key \"{}\"",
                per_item_size,
                T::ARRAY_ITEM_SIZE,
                key
            )));
        }

        let items = T::read_slice(self.stream, item_count, block_end)?;
        expect_end(self.stream, block_end, key)?;
        Ok(Some((items, index)))
    }

    fn read_section_impl<R>(
        &mut self,
        key: &str,
        null_allowed: bool,
        f: impl FnOnce(&mut EntityReader<'_, 'buf>) -> Result<R, Error>,
    ) -> Result<Option<R>, Error> {
        let block_end = begin_large_block(self.stream, ValueType::Subsection, key)?;
        if self.stream.get_position() == block_end {
            if !null_allowed {
                return Err(empty_not_allowed(key));
            }
            return Ok(None);
        }
        let result = {
            let mut section = EntityReader {
                stream: &mut *self.stream,
                end_position: block_end,
            };
            f(&mut section)?
        };
        if self.stream.get_position() != block_end {
            return Err(Error::SyncError(format!(
                "section \"{}\" was not read to its end ({} of {})",
                key,
                self.stream.get_position(),
                block_end
            )));
        }
        Ok(Some(result))
    }

    fn read_sections_array_impl<R>(
        &mut self,
        key: &str,
        null_allowed: bool,
        want_index: bool,
        f: impl FnOnce(&mut SectionsArrayReader<'_, 'buf>) -> Result<R, Error>,
    ) -> Result<Option<R>, Error> {
        let block_end = begin_large_block(self.stream, ValueType::ArraySubsection, key)?;
        if self.stream.get_position() == block_end {
            if !null_allowed {
                return Err(empty_not_allowed(key));
            }
            return Ok(None);
        }

        let (per_item_size, count, index) = read_array_metadata(self.stream, block_end, want_index)?;
        if per_item_size != 0 {
            return Err(Error::TypeMismatch(format!(
                "sections array \"{}\" advertises per-item size {}, expected 0",
                key, per_item_size
            )));
        }

        let (result, slots_read) = {
            let mut array = SectionsArrayReader {
                stream: &mut *self.stream,
                end_position: block_end,
                count,
                next_slot: 0,
                index,
            };
            let result = f(&mut array)?;
            (result, array.next_slot)
        };

        if slots_read != count {
            return Err(Error::SyncError(format!(
                "sections array \"{}\" has {} slots but only {} were read",
                key, count, slots_read
            )));
        }
        if self.stream.get_position() != block_end {
            return Err(Error::SyncError(format!(
                "sections array \"{}\" was not read to its end",
                key
            )));
        }
        Ok(Some(result))
    }
}

/// A cursor over the slots of a sections array.
///
/// Slots must be read in order, one call per slot, covering the whole
/// array; the enclosing read fails otherwise.
pub struct SectionsArrayReader<'r, 'buf> {
    stream: &'r mut ReadStream<'buf>,
    end_position: u64,
    count: u64,
    next_slot: u64,
    index: Option<Vec<i32>>,
}

impl<'r, 'buf> SectionsArrayReader<'r, 'buf> {
    /// Number of slots in the array.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    /// Returns `true` if the array has no slots.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Takes the sparse index read from the array preamble, if any.
    pub fn take_index(&mut self) -> Option<Vec<i32>> {
        self.index.take()
    }

    /// Reads the next slot, which must not be null.
    pub fn read_section<R>(
        &mut self,
        f: impl FnOnce(&mut EntityReader<'_, 'buf>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let slot = self.next_slot;
        self.read_optional_section(f)?.ok_or_else(|| {
            Error::EmptyNotAllowed(format!(
                "slot {} of the sections array is null, which is not allowed here",
                slot
            ))
        })
    }

    /// Reads the next slot; a null slot yields `None` without invoking the
    /// closure.
    pub fn read_optional_section<R>(
        &mut self,
        f: impl FnOnce(&mut EntityReader<'_, 'buf>) -> Result<R, Error>,
    ) -> Result<Option<R>, Error> {
        if self.next_slot >= self.count {
            return Err(Error::SyncError(format!(
                "reading slot {} of a sections array with {} slots",
                self.next_slot, self.count
            )));
        }

        let section_size = self.stream.read_u64()?;
        let slot_end = self
            .stream
            .get_position()
            .checked_add(section_size)
            .filter(|end| *end <= self.end_position)
            .ok_or_else(|| {
                Error::MalformedBlock(format!(
                    "slot {} size {} points beyond the end of the sections array",
                    self.next_slot, section_size
                ))
            })?;
        self.next_slot += 1;

        if section_size == 0 {
            return Ok(None);
        }

        let result = {
            let mut section = EntityReader {
                stream: &mut *self.stream,
                end_position: slot_end,
            };
            f(&mut section)?
        };
        if self.stream.get_position() != slot_end {
            return Err(Error::SyncError(format!(
                "slot {} of the sections array was not read to its end",
                self.next_slot - 1
            )));
        }
        Ok(Some(result))
    }
}
