//! A keyed table of owned, optionally null, serializable items.

use std::collections::BTreeMap;

use crate::entity::ItemData;
use crate::error::Error;
use crate::reader::EntityReader;
use crate::types::{DataValue, ZeroValue};
use crate::validator::{EntityValidator, ValidationErrorKind};
use crate::writer::EntityWriter;

/// Key and null discipline flags of an [`ItemTable`] type.
pub struct ItemTableFlags;

impl ItemTableFlags {
    /// Validation accepts zero-valued keys (0, the null reference, the
    /// empty string).
    pub const ZERO_KEYS: u32 = 0x1;
    /// Validation accepts null items.
    pub const NULL_ENTITIES: u32 = 0x2;
}

/// A mapping from keys to owned items, where a slot may be null.
///
/// This is the main holder of sub-entities inside an aggregate. Iteration
/// and serialization follow key order. Unless the respective
/// [`ItemTableFlags`] bits are set, validation rejects zero-valued keys
/// and null items.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTable<K: Ord, T, const FLAGS: u32 = 0> {
    entries: BTreeMap<K, Option<T>>,
}

impl<K: Ord, T, const FLAGS: u32> Default for ItemTable<K, T, FLAGS> {
    fn default() -> Self {
        ItemTable {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, T, const FLAGS: u32> ItemTable<K, T, FLAGS> {
    /// Whether zero-valued keys pass validation.
    pub const IS_ZERO_KEYS_ALLOWED: bool = FLAGS & ItemTableFlags::ZERO_KEYS != 0;
    /// Whether null items pass validation.
    pub const IS_NULL_ENTITIES_ALLOWED: bool = FLAGS & ItemTableFlags::NULL_ENTITIES != 0;

    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, null slots included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if an entry with `key` exists, even a null one.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// The item stored under `key`, if the entry exists and is not null.
    pub fn get(&self, key: &K) -> Option<&T> {
        self.entries.get(key).and_then(|slot| slot.as_ref())
    }

    /// Mutable access to the item stored under `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut T> {
        self.entries.get_mut(key).and_then(|slot| slot.as_mut())
    }

    /// The entries in key order, null slots included.
    pub fn entries(&self) -> &BTreeMap<K, Option<T>> {
        &self.entries
    }

    /// Mutable access to the entries.
    pub fn entries_mut(&mut self) -> &mut BTreeMap<K, Option<T>> {
        &mut self.entries
    }

    /// Inserts a null entry under `key`.
    pub fn insert_null(&mut self, key: K) {
        self.entries.insert(key, None);
    }

    /// Removes the entry under `key`, returning its item if it was not
    /// null.
    pub fn remove(&mut self, key: &K) -> Option<T> {
        self.entries.remove(key).flatten()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Ord, T: Default, const FLAGS: u32> ItemTable<K, T, FLAGS> {
    /// Inserts a new empty item under `key` and returns a mutable
    /// reference to it. An existing entry is replaced.
    pub fn insert(&mut self, key: K) -> &mut T {
        let slot = self.entries.entry(key).or_insert(None);
        slot.insert(T::default())
    }

    /// Inserts `item` under `key`. An existing entry is replaced.
    pub fn insert_item(&mut self, key: K, item: T) {
        self.entries.insert(key, Some(item));
    }
}

impl<K, T, const FLAGS: u32> ItemTable<K, T, FLAGS>
where
    K: Ord + ZeroValue + std::fmt::Debug,
    T: ItemData,
{
    /// Checks the key and null discipline of the table and validates every
    /// stored item.
    pub fn validate(&self, validator: &mut EntityValidator) -> Result<(), Error> {
        if !Self::IS_ZERO_KEYS_ALLOWED && self.entries.contains_key(&K::zero()) {
            validator.report_error(
                ValidationErrorKind::NullNotAllowed,
                "the table has a zero-valued key, which is not allowed here",
            );
        }

        for (key, slot) in &self.entries {
            match slot {
                Some(item) => item.validate(validator)?,
                None => {
                    if !Self::IS_NULL_ENTITIES_ALLOWED {
                        validator.report_error(
                            ValidationErrorKind::NullNotAllowed,
                            format!("the entry {:?} is null, which is not allowed here", key),
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

impl<K: Ord, T, const FLAGS: u32> ItemTable<K, T, FLAGS> {
    /// Checks that every key of this table occurs as a key of `other`,
    /// reporting a missing object per absent key.
    pub fn validate_keys_in_table<U, const OTHER_FLAGS: u32>(
        &self,
        validator: &mut EntityValidator,
        other: &ItemTable<K, U, OTHER_FLAGS>,
        other_name: &str,
    ) where
        K: std::fmt::Debug,
    {
        for key in self.entries.keys() {
            if !other.contains_key(key) {
                validator.report_error(
                    ValidationErrorKind::MissingObject,
                    format!("the key {:?} is missing in {}", key, other_name),
                );
            }
        }
    }
}

impl<K, T, const FLAGS: u32> ItemTable<K, T, FLAGS>
where
    K: Ord + DataValue,
    T: ItemData,
{
    /// Writes the keys as a vector under "IDs" and the items as a parallel
    /// sections array under "Entities", where a null slot stores a null
    /// section.
    pub fn write(&self, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
        let keys: Vec<K> = self.entries.keys().cloned().collect();
        writer.write_slice("IDs", &keys)?;

        let slots: Vec<&Option<T>> = self.entries.values().collect();
        writer.write_sections_array("Entities", slots.len(), None, |slot, section| {
            // writing nothing into the slot stores it as a null child
            if let Some(item) = slots[slot] {
                item.write(section)?;
            }
            Ok(())
        })
    }

    /// Reads a table written by [`ItemTable::write`]. The keys and the
    /// sections array must match in size.
    pub fn read(&mut self, reader: &mut EntityReader<'_, '_>) -> Result<(), Error> {
        self.entries.clear();

        let keys: Vec<K> = reader.read_vec("IDs")?;
        reader.read_sections_array("Entities", |array| {
            if array.len() != keys.len() {
                return Err(Error::MalformedBlock(format!(
                    "the IDs and Entities arrays do not match in size, {} against {}",
                    keys.len(),
                    array.len()
                )));
            }
            for key in keys.iter() {
                let item = array.read_optional_section(|section| {
                    let mut item = T::default();
                    item.read(section)?;
                    Ok(item)
                })?;
                self.entries.insert(key.clone(), item);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Item {
        value: u32,
    }

    impl ItemData for Item {
        fn write(&self, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
            writer.write("Value", &self.value)
        }
        fn read(&mut self, reader: &mut EntityReader<'_, '_>) -> Result<(), Error> {
            self.value = reader.read("Value")?;
            Ok(())
        }
        fn validate(&self, _validator: &mut EntityValidator) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn zero_keys_and_nulls_are_rejected_by_default() {
        let mut table = ItemTable::<u32, Item>::new();
        table.insert(0).value = 1;
        table.insert_null(7);

        let mut validator = EntityValidator::new();
        table.validate(&mut validator).unwrap();
        assert_eq!(validator.get_error_count(), 2);
        assert!(validator.has_error(ValidationErrorKind::NullNotAllowed));
    }

    #[test]
    fn flags_relax_the_discipline() {
        const FLAGS: u32 = ItemTableFlags::ZERO_KEYS | ItemTableFlags::NULL_ENTITIES;
        let mut table = ItemTable::<u32, Item, FLAGS>::new();
        table.insert(0).value = 1;
        table.insert_null(7);

        let mut validator = EntityValidator::new();
        table.validate(&mut validator).unwrap();
        assert_eq!(validator.get_error_count(), 0);
    }
}
