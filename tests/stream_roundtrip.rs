//! Round trips of the raw byte streams, under both byte order settings.

use hoard::stream::{ReadStream, WriteStream};
use hoard::types::refs::{EntityRef, Hash, ItemRef};
use hoard::writer::EntityWriter;
use rand::Rng;

#[derive(Clone, Copy)]
enum Item {
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Uuid,
    Hash,
}

const ITEMS: [Item; 8] = [
    Item::U8,
    Item::U16,
    Item::U32,
    Item::U64,
    Item::F32,
    Item::F64,
    Item::Uuid,
    Item::Hash,
];

/// Writes 1000 randomly ordered typed values and reads them back with the
/// same byte order flag; every value and the final position must match.
#[test]
fn typed_values_round_trip_in_random_order() {
    let mut rng = rand::thread_rng();

    for pass in 0..4 {
        let flip = pass % 2 != 0;

        let u8val: u8 = rng.gen();
        let u16val: u16 = rng.gen();
        let u32val: u32 = rng.gen();
        let u64val: u64 = rng.gen();
        let f32val: f32 = rng.gen();
        let f64val: f64 = rng.gen();
        let uuid_val = *ItemRef::make_ref().as_uuid();
        let hash_val = Hash::from(rng.gen::<[u8; 32]>());

        let mut order = Vec::with_capacity(1000);
        let mut expected_size = 0u64;

        let mut ws = WriteStream::with_reservation(64 * 1024);
        ws.set_flip_byte_order(flip);
        for _ in 0..1000 {
            let item = ITEMS[rng.gen_range(0..ITEMS.len())];
            order.push(item);
            match item {
                Item::U8 => {
                    ws.write_u8(u8val);
                    expected_size += 1;
                }
                Item::U16 => {
                    ws.write_u16(u16val);
                    expected_size += 2;
                }
                Item::U32 => {
                    ws.write_u32(u32val);
                    expected_size += 4;
                }
                Item::U64 => {
                    ws.write_u64(u64val);
                    expected_size += 8;
                }
                Item::F32 => {
                    ws.write_f32(f32val);
                    expected_size += 4;
                }
                Item::F64 => {
                    ws.write_f64(f64val);
                    expected_size += 8;
                }
                Item::Uuid => {
                    ws.write_uuid(&uuid_val);
                    expected_size += 16;
                }
                Item::Hash => {
                    ws.write_hash(&hash_val);
                    expected_size += 32;
                }
            }
        }
        assert_eq!(ws.get_size(), expected_size);

        let data = ws.get_data().to_vec();
        let mut rs = ReadStream::with_flip_byte_order(&data, flip);
        for item in order {
            match item {
                Item::U8 => {
                    assert_eq!(rs.peek(), u8val);
                    assert_eq!(rs.read_u8().unwrap(), u8val);
                }
                Item::U16 => assert_eq!(rs.read_u16().unwrap(), u16val),
                Item::U32 => assert_eq!(rs.read_u32().unwrap(), u32val),
                Item::U64 => assert_eq!(rs.read_u64().unwrap(), u64val),
                Item::F32 => assert_eq!(rs.read_f32().unwrap(), f32val),
                Item::F64 => assert_eq!(rs.read_f64().unwrap(), f64val),
                Item::Uuid => assert_eq!(rs.read_uuid().unwrap(), uuid_val),
                Item::Hash => assert_eq!(rs.read_hash().unwrap(), hash_val),
            }
        }
        assert_eq!(rs.get_position(), expected_size);
        assert!(rs.is_eof());
    }
}

/// An i32 written with flipped byte order reads back as 42 under the same
/// flag and as 0x2A000000 when the reader does not flip.
#[test]
fn flipped_write_reads_swapped_without_flip() {
    let mut ws = WriteStream::with_reservation(64);
    ws.set_flip_byte_order(true);
    {
        let mut writer = EntityWriter::new(&mut ws);
        writer.write("i", &42i32).unwrap();
    }
    let data = ws.get_data().to_vec();

    let mut flipped = ReadStream::with_flip_byte_order(&data, true);
    let mut reader = hoard::reader::EntityReader::new(&mut flipped);
    assert_eq!(reader.read::<i32>("i").unwrap(), 42);

    let mut straight = ReadStream::new(&data);
    let mut reader = hoard::reader::EntityReader::new(&mut straight);
    assert_eq!(reader.read::<i32>("i").unwrap(), 704643072);
}

/// UUIDs and hashes are raw byte sequences; the byte order flag must not
/// change their bytes.
#[test]
fn refs_are_never_swapped() {
    let item_ref = ItemRef::make_ref();
    let entity_ref = EntityRef::from(Hash::from([0x5au8; 32]));

    let mut plain = WriteStream::with_reservation(64);
    plain.write_uuid(item_ref.as_uuid());
    plain.write_hash(entity_ref.as_hash());

    let mut flipped = WriteStream::with_reservation(64);
    flipped.set_flip_byte_order(true);
    flipped.write_uuid(item_ref.as_uuid());
    flipped.write_hash(entity_ref.as_hash());

    assert_eq!(plain.get_data(), flipped.get_data());
}
