//! [`DataValue`] implementations for every scalar of the type universe.

use crate::error::Error;
use crate::stream::{ReadStream, WriteStream};
use crate::types::refs::{EntityRef, ItemRef};
use crate::types::{
    DMat2, DMat3, DMat4, DataTypeIndex, DataValue, IVec2, IVec3, IVec4, Mat2, Mat3, Mat4, Quat,
    UVec2, UVec3, UVec4, ValueType, Vec2, Vec3, Vec4,
};

macro_rules! primitive_data_value {
    ($ty:ty, $vt:ident, $avt:ident, $dti:ident, $size:expr, $write:ident, $read:ident) => {
        impl DataValue for $ty {
            const VALUE_TYPE: ValueType = ValueType::$vt;
            const ARRAY_VALUE_TYPE: ValueType = ValueType::$avt;
            const DATA_TYPE_INDEX: DataTypeIndex = DataTypeIndex::$dti;
            const COMPONENT_SIZE: usize = $size;
            const COMPONENT_COUNT: usize = 1;
            const ARRAY_ITEM_SIZE: usize = $size;
            const SMALL_BLOCK: bool = true;

            fn default_value() -> Self {
                Default::default()
            }

            fn write_single(&self, stream: &mut WriteStream) {
                stream.$write(*self);
            }

            fn read_single(stream: &mut ReadStream, _value_end: u64) -> Result<Self, Error> {
                stream.$read()
            }
        }
    };
}

primitive_data_value!(i8, Int, ArrayInt, I8, 1, write_i8, read_i8);
primitive_data_value!(i16, Int, ArrayInt, I16, 2, write_i16, read_i16);
primitive_data_value!(i32, Int, ArrayInt, I32, 4, write_i32, read_i32);
primitive_data_value!(i64, Int, ArrayInt, I64, 8, write_i64, read_i64);
primitive_data_value!(u8, UInt, ArrayUInt, U8, 1, write_u8, read_u8);
primitive_data_value!(u16, UInt, ArrayUInt, U16, 2, write_u16, read_u16);
primitive_data_value!(u32, UInt, ArrayUInt, U32, 4, write_u32, read_u32);
primitive_data_value!(u64, UInt, ArrayUInt, U64, 8, write_u64, read_u64);
primitive_data_value!(f32, Float, ArrayFloat, F32, 4, write_f32, read_f32);
primitive_data_value!(f64, Float, ArrayFloat, F64, 8, write_f64, read_f64);

macro_rules! composite_data_value {
    ($ty:ty, $vt:ident, $avt:ident, $dti:ident, $comp:ty, $size:expr, $count:expr, $write:ident, $read:ident) => {
        impl DataValue for $ty {
            const VALUE_TYPE: ValueType = ValueType::$vt;
            const ARRAY_VALUE_TYPE: ValueType = ValueType::$avt;
            const DATA_TYPE_INDEX: DataTypeIndex = DataTypeIndex::$dti;
            const COMPONENT_SIZE: usize = $size;
            const COMPONENT_COUNT: usize = $count;
            const ARRAY_ITEM_SIZE: usize = $size;
            const SMALL_BLOCK: bool = true;

            fn default_value() -> Self {
                <$ty>::zeros()
            }

            fn write_single(&self, stream: &mut WriteStream) {
                for component in self.as_slice() {
                    stream.$write(*component);
                }
            }

            fn read_single(stream: &mut ReadStream, _value_end: u64) -> Result<Self, Error> {
                let mut components = [<$comp>::default(); $count];
                for component in components.iter_mut() {
                    *component = stream.$read()?;
                }
                Ok(<$ty>::from_column_slice(&components))
            }
        }
    };
}

composite_data_value!(Vec2, Vec2, ArrayVec2, Vec2, f32, 4, 2, write_f32, read_f32);
composite_data_value!(Vec3, Vec3, ArrayVec3, Vec3, f32, 4, 3, write_f32, read_f32);
composite_data_value!(Vec4, Vec4, ArrayVec4, Vec4, f32, 4, 4, write_f32, read_f32);
composite_data_value!(IVec2, IVec2, ArrayIVec2, IVec2, i32, 4, 2, write_i32, read_i32);
composite_data_value!(IVec3, IVec3, ArrayIVec3, IVec3, i32, 4, 3, write_i32, read_i32);
composite_data_value!(IVec4, IVec4, ArrayIVec4, IVec4, i32, 4, 4, write_i32, read_i32);
composite_data_value!(UVec2, UVec2, ArrayUVec2, UVec2, u32, 4, 2, write_u32, read_u32);
composite_data_value!(UVec3, UVec3, ArrayUVec3, UVec3, u32, 4, 3, write_u32, read_u32);
composite_data_value!(UVec4, UVec4, ArrayUVec4, UVec4, u32, 4, 4, write_u32, read_u32);
composite_data_value!(Mat2, Mat2, ArrayMat2, Mat2, f32, 4, 4, write_f32, read_f32);
composite_data_value!(Mat3, Mat3, ArrayMat3, Mat3, f32, 4, 9, write_f32, read_f32);
composite_data_value!(Mat4, Mat4, ArrayMat4, Mat4, f32, 4, 16, write_f32, read_f32);
composite_data_value!(DMat2, Mat2, ArrayMat2, DMat2, f64, 8, 4, write_f64, read_f64);
composite_data_value!(DMat3, Mat3, ArrayMat3, DMat3, f64, 8, 9, write_f64, read_f64);
composite_data_value!(DMat4, Mat4, ArrayMat4, DMat4, f64, 8, 16, write_f64, read_f64);

impl DataValue for Quat {
    const VALUE_TYPE: ValueType = ValueType::Quat;
    const ARRAY_VALUE_TYPE: ValueType = ValueType::ArrayQuat;
    const DATA_TYPE_INDEX: DataTypeIndex = DataTypeIndex::Quat;
    const COMPONENT_SIZE: usize = 4;
    const COMPONENT_COUNT: usize = 4;
    const ARRAY_ITEM_SIZE: usize = 4;
    const SMALL_BLOCK: bool = true;

    fn default_value() -> Self {
        Quat::identity()
    }

    fn write_single(&self, stream: &mut WriteStream) {
        for component in self.coords.as_slice() {
            stream.write_f32(*component);
        }
    }

    fn read_single(stream: &mut ReadStream, _value_end: u64) -> Result<Self, Error> {
        let mut components = [0f32; 4];
        for component in components.iter_mut() {
            *component = stream.read_f32()?;
        }
        Ok(Quat::from_vector(Vec4::from_column_slice(&components)))
    }
}

impl DataValue for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;
    const ARRAY_VALUE_TYPE: ValueType = ValueType::ArrayBool;
    const DATA_TYPE_INDEX: DataTypeIndex = DataTypeIndex::Bool;
    const COMPONENT_SIZE: usize = 1;
    const COMPONENT_COUNT: usize = 1;
    // bool arrays are bit-packed, the item size in the flags is zero
    const ARRAY_ITEM_SIZE: usize = 0;
    const SMALL_BLOCK: bool = true;

    fn default_value() -> Self {
        false
    }

    fn write_single(&self, stream: &mut WriteStream) {
        stream.write_u8(*self as u8);
    }

    fn read_single(stream: &mut ReadStream, _value_end: u64) -> Result<Self, Error> {
        Ok(stream.read_u8()? != 0)
    }

    fn write_slice(items: &[Self], stream: &mut WriteStream) {
        // pack 8 bools per byte, little-endian within the byte; the final
        // byte may be partially filled
        let packed_count = (items.len() + 7) / 8;
        let mut packed = vec![0u8; packed_count];
        for (bool_index, value) in items.iter().enumerate() {
            if *value {
                packed[bool_index >> 3] |= 1 << (bool_index & 0x7);
            }
        }
        stream.write_bytes(&packed);
    }

    fn read_slice(
        stream: &mut ReadStream,
        array_count: u64,
        block_end: u64,
    ) -> Result<Vec<Self>, Error> {
        let packed_count = (array_count + 7) / 8;
        let available = block_end.saturating_sub(stream.get_position());
        if packed_count > available {
            return Err(Error::MalformedBlock(format!(
                "packed bool array of {} bytes does not fit in the {} bytes left in the block",
                packed_count, available
            )));
        }
        let mut packed = vec![0u8; packed_count as usize];
        if stream.read_bytes(&mut packed) != packed.len() {
            return Err(Error::EndOfStream(
                "could not read the packed bool array".to_string(),
            ));
        }
        let mut items = Vec::with_capacity(array_count as usize);
        for bool_index in 0..array_count as usize {
            items.push(packed[bool_index >> 3] & (1 << (bool_index & 0x7)) != 0);
        }
        Ok(items)
    }

    fn array_count(items: &[Self]) -> u64 {
        items.len() as u64
    }
}

impl DataValue for String {
    const VALUE_TYPE: ValueType = ValueType::String;
    const ARRAY_VALUE_TYPE: ValueType = ValueType::ArrayString;
    const DATA_TYPE_INDEX: DataTypeIndex = DataTypeIndex::String;
    const COMPONENT_SIZE: usize = 0;
    const COMPONENT_COUNT: usize = 1;
    const ARRAY_ITEM_SIZE: usize = 0;
    const SMALL_BLOCK: bool = false;

    fn default_value() -> Self {
        String::new()
    }

    fn write_single(&self, stream: &mut WriteStream) {
        stream.write_u64(self.len() as u64);
        stream.write_bytes(self.as_bytes());
    }

    fn read_single(stream: &mut ReadStream, value_end: u64) -> Result<Self, Error> {
        let length = stream.read_u64()?;
        let available = value_end.saturating_sub(stream.get_position());
        if length > available {
            return Err(Error::MalformedBlock(format!(
                "string of {} bytes does not fit in the {} bytes left in the block",
                length, available
            )));
        }
        let mut bytes = vec![0u8; length as usize];
        if stream.read_bytes(&mut bytes) != bytes.len() {
            return Err(Error::EndOfStream("could not read the whole string".to_string()));
        }
        String::from_utf8(bytes)
            .map_err(|err| Error::MalformedBlock(format!("string is not valid UTF-8: {}", err)))
    }

    fn read_slice(
        stream: &mut ReadStream,
        array_count: u64,
        block_end: u64,
    ) -> Result<Vec<Self>, Error> {
        // plausibility floor: even an empty string takes its 8 byte length
        let available = block_end.saturating_sub(stream.get_position());
        if array_count > available / 8 {
            return Err(Error::MalformedBlock(format!(
                "string array count {} does not fit in the {} bytes left in the block",
                array_count, available
            )));
        }
        let mut items = Vec::with_capacity(array_count as usize);
        for _ in 0..array_count {
            items.push(Self::read_single(stream, block_end)?);
        }
        Ok(items)
    }

    fn array_count(items: &[Self]) -> u64 {
        items.len() as u64
    }
}

impl DataValue for ItemRef {
    const VALUE_TYPE: ValueType = ValueType::Uuid;
    const ARRAY_VALUE_TYPE: ValueType = ValueType::ArrayUuid;
    const DATA_TYPE_INDEX: DataTypeIndex = DataTypeIndex::ItemRef;
    const COMPONENT_SIZE: usize = 16;
    const COMPONENT_COUNT: usize = 1;
    const ARRAY_ITEM_SIZE: usize = 16;
    const SMALL_BLOCK: bool = true;

    fn default_value() -> Self {
        ItemRef::NULL
    }

    fn write_single(&self, stream: &mut WriteStream) {
        stream.write_uuid(self.as_uuid());
    }

    fn read_single(stream: &mut ReadStream, _value_end: u64) -> Result<Self, Error> {
        Ok(ItemRef::from_uuid(stream.read_uuid()?))
    }
}

impl DataValue for EntityRef {
    const VALUE_TYPE: ValueType = ValueType::Hash;
    const ARRAY_VALUE_TYPE: ValueType = ValueType::ArrayHash;
    const DATA_TYPE_INDEX: DataTypeIndex = DataTypeIndex::EntityRef;
    const COMPONENT_SIZE: usize = 32;
    const COMPONENT_COUNT: usize = 1;
    const ARRAY_ITEM_SIZE: usize = 32;
    const SMALL_BLOCK: bool = true;

    fn default_value() -> Self {
        EntityRef::NULL
    }

    fn write_single(&self, stream: &mut WriteStream) {
        stream.write_hash(self.as_hash());
    }

    fn read_single(stream: &mut ReadStream, _value_end: u64) -> Result<Self, Error> {
        Ok(EntityRef::from(stream.read_hash()?))
    }
}
