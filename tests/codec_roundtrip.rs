//! Round trips and boundary cases of the keyed block codec.

mod common;

use common::{sample_scene, Scene};
use hoard::entity::ItemData;
use hoard::error::Error;
use hoard::reader::EntityReader;
use hoard::stream::{ReadStream, WriteStream};
use hoard::types::refs::ItemRef;
use hoard::types::{ContainerTypeIndex, DataTypeIndex};
use hoard::writer::EntityWriter;
use hoard::IndexedVector;

fn write_with<F>(f: F) -> Vec<u8>
where
    F: FnOnce(&mut EntityWriter<'_>) -> Result<(), Error>,
{
    let mut stream = WriteStream::with_reservation(1 << 16);
    {
        let mut writer = EntityWriter::new(&mut stream);
        f(&mut writer).unwrap();
    }
    stream.get_data().to_vec()
}

/// The full sample entity reads back structurally equal, covering every
/// container shape, all four collections and the varying value.
#[test]
fn scene_round_trip_is_structurally_equal() {
    let scene = sample_scene();
    let data = write_with(|writer| scene.write(writer));

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let mut decoded = Scene::default();
    decoded.read(&mut reader).unwrap();

    assert_eq!(decoded, scene);
    assert_eq!(stream.get_position(), data.len() as u64);
}

/// Structurally equal aggregates serialize to bit-identical bytes, no
/// matter the order their ordered collections were filled in.
#[test]
fn equal_collections_serialize_identically() {
    let node_a = ItemRef::make_ref();
    let node_b = ItemRef::make_ref();
    let node_c = ItemRef::make_ref();

    let mut first = Scene::default();
    first
        .extra
        .initialize(DataTypeIndex::I64, ContainerTypeIndex::OptionalValue);
    first.aliases.insert(1, "one".to_string());
    first.aliases.insert(2, "two".to_string());
    first.hierarchy.insert_edge(node_a, node_b);
    first.hierarchy.insert_edge(node_a, node_c);
    first.nodes.insert(node_a).name = "a".to_string();
    first.nodes.insert(node_b).name = "b".to_string();

    let mut second = Scene::default();
    second
        .extra
        .initialize(DataTypeIndex::I64, ContainerTypeIndex::OptionalValue);
    second.nodes.insert(node_b).name = "b".to_string();
    second.nodes.insert(node_a).name = "a".to_string();
    second.hierarchy.insert_edge(node_a, node_c);
    second.hierarchy.insert_edge(node_a, node_b);
    second.aliases.insert(2, "two".to_string());
    second.aliases.insert(1, "one".to_string());

    assert_eq!(first, second);
    let first_bytes = write_with(|writer| first.write(writer));
    let second_bytes = write_with(|writer| second.write(writer));
    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn keys_of_length_zero_and_forty_work() {
    let long_key = "K".repeat(40);
    let data = write_with(|writer| {
        writer.write("", &1u32)?;
        writer.write(&long_key, &2u32)
    });

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    assert_eq!(reader.read::<u32>("").unwrap(), 1);
    assert_eq!(reader.read::<u32>(&long_key).unwrap(), 2);
}

#[test]
fn keys_longer_than_forty_are_rejected() {
    let too_long = "K".repeat(41);

    let mut stream = WriteStream::with_reservation(256);
    let mut writer = EntityWriter::new(&mut stream);
    assert!(matches!(
        writer.write(&too_long, &1u32),
        Err(Error::KeyMismatch(_))
    ));

    let data = [0u8; 64];
    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    assert!(matches!(
        reader.read::<u32>(&too_long),
        Err(Error::KeyMismatch(_))
    ));
}

/// An absent optional is a zero-payload small block; required reads
/// reject it, optional reads yield `None`.
#[test]
fn empty_marker_round_trip() {
    let data = write_with(|writer| writer.write_option::<u32>("Maybe", None));

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    assert_eq!(reader.read_option::<u32>("Maybe").unwrap(), None);

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    assert!(matches!(
        reader.read::<u32>("Maybe"),
        Err(Error::EmptyNotAllowed(_))
    ));
}

/// A null section is a zero-payload large block; the optional read skips
/// its closure, the required read fails.
#[test]
fn null_section_round_trip() {
    let data = write_with(|writer| writer.write_null_section("Child"));

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let result = reader.read_optional_section("Child", |_| -> Result<(), Error> {
        panic!("the closure must not run for a null section")
    });
    assert!(matches!(result, Ok(None)));

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    assert!(matches!(
        reader.read_section("Child", |_| Ok(())),
        Err(Error::EmptyNotAllowed(_))
    ));
}

/// A 7-element bool vector exercises the partially filled final packed
/// byte.
#[test]
fn seven_bools_round_trip() {
    let bools = vec![true, false, false, true, true, false, true];
    let data = write_with(|writer| writer.write_slice("Bits", &bools));

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    assert_eq!(reader.read_vec::<bool>("Bits").unwrap(), bools);
}

#[test]
fn empty_indexed_vector_round_trips() {
    let vector = IndexedVector::<u32>::new();
    let data = write_with(|writer| writer.write_indexed("Sparse", &vector));

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let decoded: IndexedVector<u32> = reader.read_indexed("Sparse").unwrap();
    assert_eq!(decoded, vector);
}

/// The reader demands an index exactly when the stream advertises one.
#[test]
fn index_expectation_mismatch_fails() {
    let plain = write_with(|writer| writer.write_slice("Data", &[1u32, 2, 3]));
    let mut stream = ReadStream::new(&plain);
    let mut reader = EntityReader::new(&mut stream);
    assert!(matches!(
        reader.read_indexed::<u32>("Data"),
        Err(Error::TypeMismatch(_))
    ));

    let indexed = write_with(|writer| {
        writer.write_indexed("Data", &IndexedVector::from_parts(vec![1u32, 2, 3], vec![0, 1]))
    });
    let mut stream = ReadStream::new(&indexed);
    let mut reader = EntityReader::new(&mut stream);
    assert!(matches!(
        reader.read_vec::<u32>("Data"),
        Err(Error::TypeMismatch(_))
    ));
}

/// The reserved 64-bit index flag bit is detected and rejected.
#[test]
fn sixty_four_bit_index_flag_is_unsupported() {
    let mut stream = WriteStream::with_reservation(256);
    stream.write_u8(0x43); // array-of-uint tag
    let size_slot = stream.get_position();
    stream.write_u64(0);
    stream.write_u8(1);
    stream.write_bytes(b"X");
    stream.write_u16(0x0204); // per-item size 4, 64-bit index bit set
    stream.write_u64(0); // item count
    let end = stream.get_position();
    stream.set_position(size_slot);
    stream.write_u64(end - size_slot - 8);
    stream.set_position(end);

    let data = stream.get_data().to_vec();
    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    assert!(matches!(
        reader.read_vec::<u32>("X"),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn wrong_value_tag_fails_the_read() {
    let data = write_with(|writer| writer.write("Count", &5u32));
    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    assert!(matches!(
        reader.read::<i32>("Count"),
        Err(Error::TypeMismatch(_))
    ));
}

#[test]
fn wrong_key_fails_the_read() {
    let data = write_with(|writer| writer.write("Count", &5u32));
    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    assert!(matches!(
        reader.read::<u32>("Town"),
        Err(Error::KeyMismatch(_))
    ));
}

/// Every slot of a sections array must be visited, in order.
#[test]
fn sections_array_demands_full_traversal() {
    let data = write_with(|writer| {
        writer.write_sections_array("Parts", 2, None, |slot, section| {
            section.write("Index", &(slot as u32))
        })
    });

    // reading only the first of two slots breaks the traversal contract
    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let result = reader.read_sections_array("Parts", |array| {
        assert_eq!(array.len(), 2);
        array.read_section(|section| section.read::<u32>("Index"))?;
        Ok(())
    });
    assert!(matches!(result, Err(Error::SyncError(_))));

    // the full traversal succeeds
    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let values = reader
        .read_sections_array("Parts", |array| {
            let mut values = Vec::new();
            for _ in 0..array.len() {
                values.push(array.read_section(|section| section.read::<u32>("Index"))?);
            }
            Ok(values)
        })
        .unwrap();
    assert_eq!(values, vec![0, 1]);
}

/// A whole sections array can be null, distinct from an array of zero
/// sections.
#[test]
fn null_sections_array_round_trip() {
    let data = write_with(|writer| writer.write_null_sections_array("Parts"));

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let result = reader.read_optional_sections_array("Parts", |_| -> Result<(), Error> {
        panic!("the closure must not run for a null array")
    });
    assert!(matches!(result, Ok(None)));
}

/// Bytes cut off mid-block surface as errors, not panics.
#[test]
fn truncated_stream_fails_cleanly() {
    let data = write_with(|writer| writer.write_slice("Data", &[1u64, 2, 3, 4]));
    for cut in [1, 9, 12, data.len() - 1] {
        let mut stream = ReadStream::new(&data[..cut]);
        let mut reader = EntityReader::new(&mut stream);
        assert!(reader.read_vec::<u64>("Data").is_err());
    }
}
