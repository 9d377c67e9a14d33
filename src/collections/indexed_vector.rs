//! A dense value vector paired with a sparse 32-bit index into it.

use crate::error::Error;
use crate::reader::EntityReader;
use crate::types::DataValue;
use crate::validator::{EntityValidator, ValidationErrorKind};
use crate::writer::EntityWriter;

/// An indexed sparse vector: dense `values` plus a sparse `index` whose
/// entries point into the values.
///
/// Invariants, checked by [`IndexedVector::validate`]:
/// - the values vector holds at most 2^31 - 1 entries, so every entry is
///   addressable by a 32-bit index
/// - every index entry `i` satisfies `0 <= i < values.len()`
///
/// An empty vector with an empty index is valid. Equality is pair-wise
/// over both vectors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IndexedVector<T> {
    values: Vec<T>,
    index: Vec<i32>,
}

impl<T> IndexedVector<T> {
    /// Creates an empty indexed vector.
    pub fn new() -> Self {
        IndexedVector {
            values: Vec::new(),
            index: Vec::new(),
        }
    }

    /// Creates an indexed vector from its two parts.
    pub fn from_parts(values: Vec<T>, index: Vec<i32>) -> Self {
        IndexedVector { values, index }
    }

    /// The dense values.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Mutable access to the dense values.
    pub fn values_mut(&mut self) -> &mut Vec<T> {
        &mut self.values
    }

    /// The sparse index.
    pub fn index(&self) -> &[i32] {
        &self.index
    }

    /// Mutable access to the sparse index.
    pub fn index_mut(&mut self) -> &mut Vec<i32> {
        &mut self.index
    }

    /// Removes all values and index entries.
    pub fn clear(&mut self) {
        self.values.clear();
        self.index.clear();
    }

    /// Checks the index bounds invariants, reporting every violation.
    pub fn validate(&self, validator: &mut EntityValidator) {
        if self.values.len() > i32::MAX as usize {
            validator.report_error(
                ValidationErrorKind::InvalidCount,
                format!(
                    "the values vector has {} entries, more than a 32-bit index can address",
                    self.values.len()
                ),
            );
        }
        let values_count = self.values.len().min(i32::MAX as usize) as u32;
        for (position, entry) in self.index.iter().enumerate() {
            if (*entry as u32) >= values_count {
                validator.report_error(
                    ValidationErrorKind::InvalidValue,
                    format!(
                        "index entry {} at position {} is out of bounds for {} values",
                        entry, position, values_count
                    ),
                );
            }
        }
    }
}

impl<T: DataValue> IndexedVector<T> {
    /// Writes the vector as a single indexed array block under `key`.
    pub fn write(&self, key: &str, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
        writer.write_indexed(key, self)
    }

    /// Reads a vector written by [`IndexedVector::write`].
    pub fn read(key: &str, reader: &mut EntityReader<'_, '_>) -> Result<Self, Error> {
        reader.read_indexed(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_vector_is_valid() {
        let vector = IndexedVector::<u32>::new();
        let mut validator = EntityValidator::new();
        vector.validate(&mut validator);
        assert_eq!(validator.get_error_count(), 0);
    }

    #[test]
    fn out_of_bounds_entries_are_reported() {
        let vector = IndexedVector::from_parts(vec![10u32, 20, 30], vec![0, 2, 3, -1]);
        let mut validator = EntityValidator::new();
        vector.validate(&mut validator);
        // entries 3 and -1 are both out of bounds
        assert_eq!(validator.get_error_count(), 2);
        assert!(validator.has_error(ValidationErrorKind::InvalidValue));
    }
}
