//! Dynamic dispatch over the closed (scalar, container) type universe.
//!
//! A [`Varying`] holds one value of any scalar in any container shape,
//! with the concrete type chosen at run time. The dispatch is a tagged
//! enum generated over the whole universe, so the compiler checks that
//! every combination supports the full operation suite; there is no open
//! polymorphism and no unknown type can appear.

use crate::collections::IndexedVector;
use crate::entity::ItemData;
use crate::error::Error;
use crate::reader::EntityReader;
use crate::types::refs::{EntityRef, ItemRef};
use crate::types::{
    ContainerTypeIndex, DMat2, DMat3, DMat4, DataTypeIndex, DataValue, IVec2, IVec3, IVec4, Mat2,
    Mat3, Mat4, Quat, UVec2, UVec3, UVec4, Vec2, Vec3, Vec4,
};
use crate::validator::{EntityValidator, ValidationErrorKind};
use crate::writer::EntityWriter;

/// One value of scalar type `T` in one of the six container shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Container<T> {
    Single(T),
    OptionalValue(Option<T>),
    Vector(Vec<T>),
    OptionalVector(Option<Vec<T>>),
    IndexedVector(IndexedVector<T>),
    OptionalIndexedVector(Option<IndexedVector<T>>),
}

impl<T: DataValue> Container<T> {
    /// Creates a default-initialized container of the given shape.
    pub fn new(container_type: ContainerTypeIndex) -> Self {
        match container_type {
            ContainerTypeIndex::None => Container::Single(T::default_value()),
            ContainerTypeIndex::OptionalValue => Container::OptionalValue(None),
            ContainerTypeIndex::Vector => Container::Vector(Vec::new()),
            ContainerTypeIndex::OptionalVector => Container::OptionalVector(None),
            ContainerTypeIndex::IndexedVector => Container::IndexedVector(IndexedVector::new()),
            ContainerTypeIndex::OptionalIndexedVector => Container::OptionalIndexedVector(None),
        }
    }

    /// The container shape index of this value.
    pub fn container_type(&self) -> ContainerTypeIndex {
        match self {
            Container::Single(_) => ContainerTypeIndex::None,
            Container::OptionalValue(_) => ContainerTypeIndex::OptionalValue,
            Container::Vector(_) => ContainerTypeIndex::Vector,
            Container::OptionalVector(_) => ContainerTypeIndex::OptionalVector,
            Container::IndexedVector(_) => ContainerTypeIndex::IndexedVector,
            Container::OptionalIndexedVector(_) => ContainerTypeIndex::OptionalIndexedVector,
        }
    }

    /// Resets the contents, keeping the shape.
    pub fn clear(&mut self) {
        *self = Container::new(self.container_type());
    }

    /// Writes the contained value under `key`.
    pub fn write(&self, key: &str, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
        match self {
            Container::Single(value) => writer.write(key, value),
            Container::OptionalValue(value) => writer.write_option(key, value.as_ref()),
            Container::Vector(items) => writer.write_slice(key, items),
            Container::OptionalVector(items) => writer.write_option_slice(key, items.as_deref()),
            Container::IndexedVector(value) => writer.write_indexed(key, value),
            Container::OptionalIndexedVector(value) => {
                writer.write_option_indexed(key, value.as_ref())
            }
        }
    }

    /// Reads a value of this container's shape from under `key`, replacing
    /// the contents.
    pub fn read(&mut self, key: &str, reader: &mut EntityReader<'_, '_>) -> Result<(), Error> {
        *self = match self.container_type() {
            ContainerTypeIndex::None => Container::Single(reader.read(key)?),
            ContainerTypeIndex::OptionalValue => Container::OptionalValue(reader.read_option(key)?),
            ContainerTypeIndex::Vector => Container::Vector(reader.read_vec(key)?),
            ContainerTypeIndex::OptionalVector => {
                Container::OptionalVector(reader.read_option_vec(key)?)
            }
            ContainerTypeIndex::IndexedVector => {
                Container::IndexedVector(reader.read_indexed(key)?)
            }
            ContainerTypeIndex::OptionalIndexedVector => {
                Container::OptionalIndexedVector(reader.read_option_indexed(key)?)
            }
        };
        Ok(())
    }
}

macro_rules! varying_dispatch {
    ($(($variant:ident, $ty:ty)),* $(,)?) => {
        /// The payload of a varying value: one container of one scalar of
        /// the closed universe. Generated exhaustively, one variant per
        /// scalar.
        #[derive(Debug, Clone, PartialEq)]
        pub enum VaryingData {
            $( $variant(Container<$ty>), )*
        }

        impl VaryingData {
            /// Allocates a default-initialized value of the given scalar
            /// and container shape.
            pub fn new(data_type: DataTypeIndex, container_type: ContainerTypeIndex) -> Self {
                match data_type {
                    $( DataTypeIndex::$variant => VaryingData::$variant(Container::new(container_type)), )*
                }
            }

            /// The scalar index of this value.
            pub fn data_type(&self) -> DataTypeIndex {
                match self {
                    $( VaryingData::$variant(_) => DataTypeIndex::$variant, )*
                }
            }

            /// The container shape index of this value.
            pub fn container_type(&self) -> ContainerTypeIndex {
                match self {
                    $( VaryingData::$variant(container) => container.container_type(), )*
                }
            }

            /// Resets the contents, keeping the type.
            pub fn clear(&mut self) {
                match self {
                    $( VaryingData::$variant(container) => container.clear(), )*
                }
            }

            /// Writes the contained value under `key`.
            pub fn write(&self, key: &str, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
                match self {
                    $( VaryingData::$variant(container) => container.write(key, writer), )*
                }
            }

            /// Reads the contained value from under `key`.
            pub fn read(&mut self, key: &str, reader: &mut EntityReader<'_, '_>) -> Result<(), Error> {
                match self {
                    $( VaryingData::$variant(container) => container.read(key, reader), )*
                }
            }
        }
    };
}

varying_dispatch!(
    (Bool, bool),
    (I8, i8),
    (I16, i16),
    (I32, i32),
    (I64, i64),
    (U8, u8),
    (U16, u16),
    (U32, u32),
    (U64, u64),
    (F32, f32),
    (F64, f64),
    (Vec2, Vec2),
    (Vec3, Vec3),
    (Vec4, Vec4),
    (IVec2, IVec2),
    (IVec3, IVec3),
    (IVec4, IVec4),
    (UVec2, UVec2),
    (UVec3, UVec3),
    (UVec4, UVec4),
    (Mat2, Mat2),
    (Mat3, Mat3),
    (Mat4, Mat4),
    (DMat2, DMat2),
    (DMat3, DMat3),
    (DMat4, DMat4),
    (Quat, Quat),
    (ItemRef, ItemRef),
    (EntityRef, EntityRef),
    (String, String),
);

/// A value whose scalar and container type is chosen at run time.
///
/// A fresh varying is uninitialized; [`Varying::initialize`] allocates a
/// default value of a chosen type. Serialization stores the two type tags
/// followed by the payload under the key "Data". An uninitialized varying
/// cannot be written and fails validation; wrap the varying in an optional
/// field if absence is a legal state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Varying {
    data: Option<VaryingData>,
}

impl Varying {
    /// Creates an uninitialized varying.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once a type has been set.
    pub fn is_initialized(&self) -> bool {
        self.data.is_some()
    }

    /// Allocates a default value of the given type, dropping any previous
    /// contents, and returns access to it.
    pub fn initialize(
        &mut self,
        data_type: DataTypeIndex,
        container_type: ContainerTypeIndex,
    ) -> &mut VaryingData {
        self.data.insert(VaryingData::new(data_type, container_type))
    }

    /// Drops the contents and the type.
    pub fn deinitialize(&mut self) {
        self.data = None;
    }

    /// The (scalar, container) type pair, once initialized.
    pub fn type_indices(&self) -> Option<(DataTypeIndex, ContainerTypeIndex)> {
        self.data
            .as_ref()
            .map(|data| (data.data_type(), data.container_type()))
    }

    /// The contained value, once initialized.
    pub fn data(&self) -> Option<&VaryingData> {
        self.data.as_ref()
    }

    /// Mutable access to the contained value, once initialized.
    pub fn data_mut(&mut self) -> Option<&mut VaryingData> {
        self.data.as_mut()
    }
}

impl ItemData for Varying {
    /// Resets the contents but keeps the type. Use
    /// [`Varying::deinitialize`] to drop the type as well.
    fn clear(&mut self) {
        if let Some(data) = &mut self.data {
            data.clear();
        }
    }

    fn write(&self, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
        let data = self.data.as_ref().ok_or_else(|| {
            Error::InvalidState(
                "cannot write an uninitialized varying; wrap it in an optional field if absence is intended"
                    .to_string(),
            )
        })?;
        writer.write("Type", &(data.data_type() as u16))?;
        writer.write("ContainerType", &(data.container_type() as u16))?;
        data.write("Data", writer)
    }

    fn read(&mut self, reader: &mut EntityReader<'_, '_>) -> Result<(), Error> {
        let data_type = DataTypeIndex::try_from(reader.read::<u16>("Type")?)?;
        let container_type = ContainerTypeIndex::try_from(reader.read::<u16>("ContainerType")?)?;
        let mut data = VaryingData::new(data_type, container_type);
        data.read("Data", reader)?;
        self.data = Some(data);
        Ok(())
    }

    fn validate(&self, validator: &mut EntityValidator) -> Result<(), Error> {
        if self.data.is_none() {
            validator.report_error(
                ValidationErrorKind::NullNotAllowed,
                "the varying is not initialized; every varying needs a type to be valid",
            );
        }
        Ok(())
    }
}
