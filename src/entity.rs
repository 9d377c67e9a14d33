//! The entity contract and the type-erased dispatch packages.
//!
//! An entity is a top-level serializable aggregate addressed by the hash of
//! its serialized bytes. Concrete entity types implement [`ItemData`] (the
//! typed operation suite) and [`Entity`] (the erased base); the
//! [`entity_type!`] macro writes the boilerplate. A [`Package`] maps type
//! tags to [`EntityTypeRecord`]s, the erased dispatch tables the handler
//! uses to create, serialize and validate entities it only knows by tag.

use std::any::Any;

use crate::error::Error;
use crate::reader::EntityReader;
use crate::validator::EntityValidator;
use crate::writer::EntityWriter;

/// The erased base of all entities.
///
/// Entities are shared across threads by the handler cache, so the trait
/// requires `Send + Sync`. Concrete access goes through [`Entity::as_any`].
pub trait Entity: Any + Send + Sync {
    /// The unique type tag stored in the artifact, a short ASCII string.
    fn entity_type(&self) -> &'static str;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The typed operation suite of serializable aggregates.
///
/// Implemented both by top-level entities and by the nested items an entity
/// table owns. `Default` provides the cleared state, `Clone` the deep copy
/// and `PartialEq` structural equality; the trait adds serialization and
/// validation.
pub trait ItemData: Default + Clone + PartialEq {
    /// Resets all fields to their defaults.
    fn clear(&mut self) {
        *self = Self::default();
    }

    /// Writes all fields as keyed blocks.
    fn write(&self, writer: &mut EntityWriter<'_>) -> Result<(), Error>;

    /// Reads all fields, in the exact order `write` emitted them.
    fn read(&mut self, reader: &mut EntityReader<'_, '_>) -> Result<(), Error>;

    /// Checks the aggregate's invariants, reporting every violation to the
    /// validator. Returns `Err` only on operational failure, not on
    /// validation errors.
    fn validate(&self, validator: &mut EntityValidator) -> Result<(), Error>;
}

/// A top-level entity type: an [`ItemData`] with an [`Entity`] base and a
/// unique type tag.
pub trait EntityData: Entity + ItemData {
    /// The type tag written into the artifact.
    const TYPE_TAG: &'static str;
}

/// Implements [`Entity`] and [`EntityData`] for a concrete type.
///
/// # Example
/// ```ignore
/// #[derive(Debug, Default, Clone, PartialEq)]
/// struct Scene { name: String }
///
/// impl ItemData for Scene { /* write/read/validate */ }
///
/// entity_type!(Scene, "Scene");
/// ```
#[macro_export]
macro_rules! entity_type {
    ($ty:ty, $tag:literal) => {
        impl $crate::entity::Entity for $ty {
            fn entity_type(&self) -> &'static str {
                $tag
            }
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
        }

        impl $crate::entity::EntityData for $ty {
            const TYPE_TAG: &'static str = $tag;
        }
    };
}

/// The erased operation table of one entity type.
///
/// Built by [`EntityTypeRecord::of`] from a concrete [`EntityData`] type;
/// all operations downcast through [`Entity::as_any`] and fail with
/// [`Error::InvalidParameter`] when handed an entity of another type.
pub struct EntityTypeRecord {
    type_tag: &'static str,
    create: fn() -> Box<dyn Entity>,
    write: fn(&dyn Entity, &mut EntityWriter<'_>) -> Result<(), Error>,
    read: fn(&mut dyn Entity, &mut EntityReader<'_, '_>) -> Result<(), Error>,
    validate: fn(&dyn Entity, &mut EntityValidator) -> Result<(), Error>,
    clear: fn(&mut dyn Entity) -> Result<(), Error>,
    deep_copy: fn(Option<&dyn Entity>) -> Result<Box<dyn Entity>, Error>,
    equals: fn(&dyn Entity, &dyn Entity) -> bool,
}

fn downcast<T: EntityData + 'static>(entity: &dyn Entity) -> Result<&T, Error> {
    entity.as_any().downcast_ref::<T>().ok_or_else(|| {
        Error::InvalidParameter(format!(
            "entity is not of the expected type \"{}\"",
            T::TYPE_TAG
        ))
    })
}

fn downcast_mut<T: EntityData + 'static>(entity: &mut dyn Entity) -> Result<&mut T, Error> {
    entity.as_any_mut().downcast_mut::<T>().ok_or_else(|| {
        Error::InvalidParameter(format!(
            "entity is not of the expected type \"{}\"",
            T::TYPE_TAG
        ))
    })
}

fn create_erased<T: EntityData + 'static>() -> Box<dyn Entity> {
    Box::<T>::default()
}

fn write_erased<T: EntityData + 'static>(
    entity: &dyn Entity,
    writer: &mut EntityWriter<'_>,
) -> Result<(), Error> {
    downcast::<T>(entity)?.write(writer)
}

fn read_erased<T: EntityData + 'static>(
    entity: &mut dyn Entity,
    reader: &mut EntityReader<'_, '_>,
) -> Result<(), Error> {
    downcast_mut::<T>(entity)?.read(reader)
}

fn validate_erased<T: EntityData + 'static>(
    entity: &dyn Entity,
    validator: &mut EntityValidator,
) -> Result<(), Error> {
    downcast::<T>(entity)?.validate(validator)
}

fn clear_erased<T: EntityData + 'static>(entity: &mut dyn Entity) -> Result<(), Error> {
    downcast_mut::<T>(entity)?.clear();
    Ok(())
}

fn deep_copy_erased<T: EntityData + 'static>(
    source: Option<&dyn Entity>,
) -> Result<Box<dyn Entity>, Error> {
    match source {
        Some(source) => Ok(Box::new(downcast::<T>(source)?.clone())),
        None => Ok(Box::<T>::default()),
    }
}

fn equals_erased<T: EntityData + 'static>(a: &dyn Entity, b: &dyn Entity) -> bool {
    match (a.as_any().downcast_ref::<T>(), b.as_any().downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl EntityTypeRecord {
    /// Builds the record of the entity type `T`.
    pub fn of<T: EntityData + 'static>() -> Self {
        EntityTypeRecord {
            type_tag: T::TYPE_TAG,
            create: create_erased::<T>,
            write: write_erased::<T>,
            read: read_erased::<T>,
            validate: validate_erased::<T>,
            clear: clear_erased::<T>,
            deep_copy: deep_copy_erased::<T>,
            equals: equals_erased::<T>,
        }
    }

    /// The type tag this record serves.
    pub fn type_tag(&self) -> &'static str {
        self.type_tag
    }

    /// Creates a new empty entity of this type.
    pub fn create(&self) -> Box<dyn Entity> {
        (self.create)()
    }

    /// Writes `entity` through the erased suite.
    pub fn write(&self, entity: &dyn Entity, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
        (self.write)(entity, writer)
    }

    /// Reads into `entity` through the erased suite.
    pub fn read(
        &self,
        entity: &mut dyn Entity,
        reader: &mut EntityReader<'_, '_>,
    ) -> Result<(), Error> {
        (self.read)(entity, reader)
    }

    /// Validates `entity` through the erased suite.
    pub fn validate(&self, entity: &dyn Entity, validator: &mut EntityValidator) -> Result<(), Error> {
        (self.validate)(entity, validator)
    }

    /// Clears `entity` through the erased suite.
    pub fn clear(&self, entity: &mut dyn Entity) -> Result<(), Error> {
        (self.clear)(entity)
    }

    /// Returns an independent deep copy of `source`; a null source yields
    /// a cleared entity.
    pub fn deep_copy(&self, source: Option<&dyn Entity>) -> Result<Box<dyn Entity>, Error> {
        (self.deep_copy)(source)
    }

    /// Structural equality through the erased suite. Entities of different
    /// concrete types are never equal.
    pub fn equals(&self, a: &dyn Entity, b: &dyn Entity) -> bool {
        (self.equals)(a, b)
    }
}

/// A set of entity type records registered with a handler.
///
/// # Example
/// ```ignore
/// let mut package = Package::new();
/// package.register::<Scene>();
/// let handler = EntityHandler::new(path, vec![package])?;
/// ```
#[derive(Default)]
pub struct Package {
    records: Vec<EntityTypeRecord>,
}

impl Package {
    /// Creates an empty package.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the entity type `T` with this package.
    pub fn register<T: EntityData + 'static>(&mut self) -> &mut Self {
        self.records.push(EntityTypeRecord::of::<T>());
        self
    }

    /// Finds the record for `type_tag`, if this package exports it.
    pub fn find(&self, type_tag: &str) -> Option<&EntityTypeRecord> {
        self.records.iter().find(|record| record.type_tag == type_tag)
    }

    /// The records of this package.
    pub fn records(&self) -> &[EntityTypeRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_type;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Marker {
        value: u32,
    }

    impl ItemData for Marker {
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

    entity_type!(Marker, "Marker");

    #[test]
    fn erased_suite_round_trips_through_any() {
        let mut package = Package::new();
        package.register::<Marker>();
        let record = package.find("Marker").unwrap();
        assert!(package.find("Other").is_none());

        let mut entity = record.create();
        assert_eq!(entity.entity_type(), "Marker");
        entity
            .as_any_mut()
            .downcast_mut::<Marker>()
            .unwrap()
            .value = 9;

        let copy = record.deep_copy(Some(entity.as_ref())).unwrap();
        assert!(record.equals(entity.as_ref(), copy.as_ref()));

        record.clear(entity.as_mut()).unwrap();
        assert!(!record.equals(entity.as_ref(), copy.as_ref()));
        assert_eq!(entity.as_any().downcast_ref::<Marker>().unwrap().value, 0);

        let cleared = record.deep_copy(None).unwrap();
        assert!(record.equals(entity.as_ref(), cleared.as_ref()));
    }
}
