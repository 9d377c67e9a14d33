//! The closed type universe of the store.
//!
//! Every value an entity can hold is one of the scalars enumerated here,
//! wrapped in one of six container shapes. The universe is closed on
//! purpose: a reader either recognizes a stored type exactly or fails, and
//! the dynamic dispatch in [`crate::dynamic`] covers every (scalar,
//! container) pair exhaustively.

use crate::error::Error;
use crate::stream::{ReadStream, WriteStream};

pub mod refs;
pub mod values;

/// Maximum length of a key of a value or subsection in an entity.
pub const MAX_KEY_LENGTH: usize = 40;

/// Wire tags of the serialized value types.
///
/// Tags below 0x40 use the small block encoding (payload + key capped below
/// 256 bytes); tags at 0x40 and above use the large block encoding with a
/// 64-bit size field. The numeric values are part of the on-disk format and
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    Bool = 0x01,
    Int = 0x02,
    UInt = 0x03,
    Float = 0x04,
    Vec2 = 0x05,
    Vec3 = 0x06,
    Vec4 = 0x07,
    IVec2 = 0x08,
    IVec3 = 0x09,
    IVec4 = 0x0a,
    UVec2 = 0x0b,
    UVec3 = 0x0c,
    UVec4 = 0x0d,
    Mat2 = 0x0e,
    Mat3 = 0x0f,
    Mat4 = 0x10,
    Quat = 0x11,
    Uuid = 0x12,
    Hash = 0x13,

    ArrayBool = 0x41,
    ArrayInt = 0x42,
    ArrayUInt = 0x43,
    ArrayFloat = 0x44,
    ArrayVec2 = 0x45,
    ArrayVec3 = 0x46,
    ArrayVec4 = 0x47,
    ArrayIVec2 = 0x48,
    ArrayIVec3 = 0x49,
    ArrayIVec4 = 0x4a,
    ArrayUVec2 = 0x4b,
    ArrayUVec3 = 0x4c,
    ArrayUVec4 = 0x4d,
    ArrayMat2 = 0x4e,
    ArrayMat3 = 0x4f,
    ArrayMat4 = 0x50,
    ArrayQuat = 0x51,
    ArrayUuid = 0x52,
    ArrayHash = 0x53,

    Subsection = 0xd0,
    ArraySubsection = 0xd1,
    String = 0xe0,
    ArrayString = 0xe1,
}

impl ValueType {
    /// Returns `true` for tags encoded as small blocks.
    pub fn is_small_block(&self) -> bool {
        (*self as u8) < 0x40
    }
}

/// Container shape indices, serialized as the second `u16` tag of a varying
/// value. The numeric values are part of the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ContainerTypeIndex {
    None = 0x0,
    OptionalValue = 0x1,
    Vector = 0x10,
    OptionalVector = 0x11,
    IndexedVector = 0x20,
    OptionalIndexedVector = 0x21,
}

impl TryFrom<u16> for ContainerTypeIndex {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Error> {
        match value {
            0x0 => Ok(ContainerTypeIndex::None),
            0x1 => Ok(ContainerTypeIndex::OptionalValue),
            0x10 => Ok(ContainerTypeIndex::Vector),
            0x11 => Ok(ContainerTypeIndex::OptionalVector),
            0x20 => Ok(ContainerTypeIndex::IndexedVector),
            0x21 => Ok(ContainerTypeIndex::OptionalIndexedVector),
            _ => Err(Error::TypeMismatch(format!(
                "unknown container type index: {:#x}",
                value
            ))),
        }
    }
}

/// Scalar type indices of the closed universe, serialized as the first
/// `u16` tag of a varying value.
///
/// The wire format fixes the field width; the numbering itself is defined
/// by this crate and frozen here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum DataTypeIndex {
    Bool = 0x01,
    I8 = 0x02,
    I16 = 0x03,
    I32 = 0x04,
    I64 = 0x05,
    U8 = 0x06,
    U16 = 0x07,
    U32 = 0x08,
    U64 = 0x09,
    F32 = 0x0a,
    F64 = 0x0b,
    Vec2 = 0x0c,
    Vec3 = 0x0d,
    Vec4 = 0x0e,
    IVec2 = 0x0f,
    IVec3 = 0x10,
    IVec4 = 0x11,
    UVec2 = 0x12,
    UVec3 = 0x13,
    UVec4 = 0x14,
    Mat2 = 0x15,
    Mat3 = 0x16,
    Mat4 = 0x17,
    DMat2 = 0x18,
    DMat3 = 0x19,
    DMat4 = 0x1a,
    Quat = 0x1b,
    ItemRef = 0x1c,
    EntityRef = 0x1d,
    String = 0x1e,
}

impl TryFrom<u16> for DataTypeIndex {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Error> {
        match value {
            0x01 => Ok(DataTypeIndex::Bool),
            0x02 => Ok(DataTypeIndex::I8),
            0x03 => Ok(DataTypeIndex::I16),
            0x04 => Ok(DataTypeIndex::I32),
            0x05 => Ok(DataTypeIndex::I64),
            0x06 => Ok(DataTypeIndex::U8),
            0x07 => Ok(DataTypeIndex::U16),
            0x08 => Ok(DataTypeIndex::U32),
            0x09 => Ok(DataTypeIndex::U64),
            0x0a => Ok(DataTypeIndex::F32),
            0x0b => Ok(DataTypeIndex::F64),
            0x0c => Ok(DataTypeIndex::Vec2),
            0x0d => Ok(DataTypeIndex::Vec3),
            0x0e => Ok(DataTypeIndex::Vec4),
            0x0f => Ok(DataTypeIndex::IVec2),
            0x10 => Ok(DataTypeIndex::IVec3),
            0x11 => Ok(DataTypeIndex::IVec4),
            0x12 => Ok(DataTypeIndex::UVec2),
            0x13 => Ok(DataTypeIndex::UVec3),
            0x14 => Ok(DataTypeIndex::UVec4),
            0x15 => Ok(DataTypeIndex::Mat2),
            0x16 => Ok(DataTypeIndex::Mat3),
            0x17 => Ok(DataTypeIndex::Mat4),
            0x18 => Ok(DataTypeIndex::DMat2),
            0x19 => Ok(DataTypeIndex::DMat3),
            0x1a => Ok(DataTypeIndex::DMat4),
            0x1b => Ok(DataTypeIndex::Quat),
            0x1c => Ok(DataTypeIndex::ItemRef),
            0x1d => Ok(DataTypeIndex::EntityRef),
            0x1e => Ok(DataTypeIndex::String),
            _ => Err(Error::TypeMismatch(format!(
                "unknown data type index: {:#x}",
                value
            ))),
        }
    }
}

/// A 2-component single-precision vector.
pub type Vec2 = nalgebra::Vector2<f32>;
/// A 3-component single-precision vector.
pub type Vec3 = nalgebra::Vector3<f32>;
/// A 4-component single-precision vector.
pub type Vec4 = nalgebra::Vector4<f32>;
/// A 2-component signed integer vector.
pub type IVec2 = nalgebra::Vector2<i32>;
/// A 3-component signed integer vector.
pub type IVec3 = nalgebra::Vector3<i32>;
/// A 4-component signed integer vector.
pub type IVec4 = nalgebra::Vector4<i32>;
/// A 2-component unsigned integer vector.
pub type UVec2 = nalgebra::Vector2<u32>;
/// A 3-component unsigned integer vector.
pub type UVec3 = nalgebra::Vector3<u32>;
/// A 4-component unsigned integer vector.
pub type UVec4 = nalgebra::Vector4<u32>;
/// A 2x2 single-precision matrix.
pub type Mat2 = nalgebra::Matrix2<f32>;
/// A 3x3 single-precision matrix.
pub type Mat3 = nalgebra::Matrix3<f32>;
/// A 4x4 single-precision matrix.
pub type Mat4 = nalgebra::Matrix4<f32>;
/// A 2x2 double-precision matrix.
pub type DMat2 = nalgebra::Matrix2<f64>;
/// A 3x3 double-precision matrix.
pub type DMat3 = nalgebra::Matrix3<f64>;
/// A 4x4 double-precision matrix.
pub type DMat4 = nalgebra::Matrix4<f64>;
/// A single-precision quaternion.
pub type Quat = nalgebra::Quaternion<f32>;

/// A scalar of the closed type universe.
///
/// The trait describes how a scalar serializes: its wire tags, its
/// component layout, and how single values and packed slices move through
/// a byte stream. The entity writer and reader provide the block framing
/// around these hooks; implementations only emit and consume payload
/// bytes.
///
/// Implemented for exactly the scalars of the universe; applications do
/// not add implementations.
pub trait DataValue: Clone + PartialEq + Sized {
    /// Wire tag of a single value.
    const VALUE_TYPE: ValueType;
    /// Wire tag of an array of values.
    const ARRAY_VALUE_TYPE: ValueType;
    /// Scalar index used by varying values.
    const DATA_TYPE_INDEX: DataTypeIndex;
    /// Size in bytes of one component.
    const COMPONENT_SIZE: usize;
    /// Number of components of one value.
    const COMPONENT_COUNT: usize;
    /// Per-item byte size advertised in array flags. Zero for types whose
    /// array payload is element-framed (booleans, strings).
    const ARRAY_ITEM_SIZE: usize;
    /// Whether single values use the small block encoding.
    const SMALL_BLOCK: bool;

    /// The default a container slot is initialized with.
    fn default_value() -> Self;

    /// Writes the payload of one value.
    fn write_single(&self, stream: &mut WriteStream);

    /// Reads the payload of one value. `value_end` is the first stream
    /// position past the value, for bounds checks of self-sized payloads.
    fn read_single(stream: &mut ReadStream, value_end: u64) -> Result<Self, Error>;

    /// Writes the packed payload of a slice of values.
    fn write_slice(items: &[Self], stream: &mut WriteStream) {
        for item in items {
            item.write_single(stream);
        }
    }

    /// Reads the packed payload of an array. `array_count` is the count
    /// stored in the array preamble (components for fixed-size scalars,
    /// elements for booleans and strings); `block_end` bounds the payload.
    fn read_slice(
        stream: &mut ReadStream,
        array_count: u64,
        block_end: u64,
    ) -> Result<Vec<Self>, Error> {
        let available = block_end.saturating_sub(stream.get_position());
        if array_count > available / Self::COMPONENT_SIZE as u64 {
            return Err(Error::MalformedBlock(format!(
                "array count {} does not fit in the {} bytes left in the block",
                array_count, available
            )));
        }
        if array_count % Self::COMPONENT_COUNT as u64 != 0 {
            return Err(Error::MalformedBlock(format!(
                "array count {} is not a multiple of the component count {}",
                array_count,
                Self::COMPONENT_COUNT
            )));
        }
        let element_count = array_count / Self::COMPONENT_COUNT as u64;
        let mut items = Vec::with_capacity(element_count as usize);
        for _ in 0..element_count {
            items.push(Self::read_single(stream, block_end)?);
        }
        Ok(items)
    }

    /// The count stored in the array preamble for `items`.
    fn array_count(items: &[Self]) -> u64 {
        (items.len() * Self::COMPONENT_COUNT) as u64
    }
}

/// Ordered key types with absolute lower and upper sentinels, used for
/// range queries over ordered pair sets (graph successor enumeration).
pub trait KeyRange: Ord + Sized {
    /// A value not greater than any value occurring as a key.
    fn range_inf() -> Self;
    /// A value not less than any value occurring as a key.
    fn range_sup() -> Self;
}

/// Key types with a distinguished zero value, used by the item table's
/// zero-key discipline.
pub trait ZeroValue {
    /// The zero value of the type (0, the null reference, the empty
    /// string).
    fn zero() -> Self;

    /// Returns `true` if the value equals the zero value.
    fn is_zero(&self) -> bool;
}

macro_rules! int_key_impls {
    ($($ty:ty),*) => {
        $(
            impl KeyRange for $ty {
                fn range_inf() -> Self {
                    <$ty>::MIN
                }
                fn range_sup() -> Self {
                    <$ty>::MAX
                }
            }

            impl ZeroValue for $ty {
                fn zero() -> Self {
                    0
                }
                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }
        )*
    };
}

int_key_impls!(i8, i16, i32, i64, u8, u16, u32, u64);

impl ZeroValue for String {
    fn zero() -> Self {
        String::new()
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}
