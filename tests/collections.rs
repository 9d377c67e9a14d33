//! Collection invariants: graph shapes, indexed vector bounds,
//! bidirectional maps and item tables.

mod common;

use common::Node;
use hoard::collections::{
    BidirectionalMap, DirectedGraph, GraphFlags, IndexedVector, ItemTable, ItemTableFlags,
};
use hoard::entity::ItemData;
use hoard::error::Error;
use hoard::reader::EntityReader;
use hoard::stream::{ReadStream, WriteStream};
use hoard::types::refs::ItemRef;
use hoard::validator::{EntityValidator, ValidationErrorKind};
use hoard::writer::EntityWriter;

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

fn validate<F>(f: F) -> EntityValidator
where
    F: FnOnce(&mut EntityValidator),
{
    let mut validator = EntityValidator::new();
    f(&mut validator);
    validator
}

#[test]
fn bidirectional_map_round_trip_ignores_order() {
    let mut map = BidirectionalMap::new();
    map.insert(1u32, "a".to_string());
    map.insert(2u32, "b".to_string());
    map.insert(3u32, "c".to_string());

    let data = write_with(|writer| map.write(writer));
    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let mut decoded = BidirectionalMap::new();
    decoded.read(&mut reader).unwrap();

    assert_eq!(decoded, map);
    assert_eq!(decoded.get_key(&"c".to_string()), Some(&3));
}

/// An acyclic-flagged graph with a cycle fails validation with at least
/// one InvalidSetup error.
#[test]
fn acyclic_graph_rejects_cycles() {
    let mut graph = DirectedGraph::<u32, { GraphFlags::ACYCLIC }>::new();
    graph.insert_edge(0, 1);
    graph.insert_edge(1, 2);
    graph.insert_edge(2, 3);
    graph.insert_edge(3, 1);

    let validator = validate(|v| graph.validate(v));
    assert!(validator.get_error_count() >= 1);
    assert!(validator.has_error(ValidationErrorKind::InvalidSetup));
}

#[test]
fn acyclic_graph_accepts_dags() {
    let mut graph = DirectedGraph::<u32, { GraphFlags::ACYCLIC }>::new();
    graph.insert_edge(0, 1);
    graph.insert_edge(0, 2);
    graph.insert_edge(1, 3);
    graph.insert_edge(2, 3);

    let validator = validate(|v| graph.validate(v));
    assert_eq!(validator.get_error_count(), 0);
}

/// A single-root graph validates exactly when one vertex has no incoming
/// edge.
#[test]
fn single_root_graph_counts_sources() {
    let mut one_root = DirectedGraph::<u32, { GraphFlags::SINGLE_ROOT }>::new();
    one_root.insert_edge(0, 1);
    one_root.insert_edge(0, 2);
    let validator = validate(|v| one_root.validate(v));
    assert_eq!(validator.get_error_count(), 0);

    let mut two_roots = DirectedGraph::<u32, { GraphFlags::SINGLE_ROOT }>::new();
    two_roots.insert_edge(0, 2);
    two_roots.insert_edge(1, 2);
    let validator = validate(|v| two_roots.validate(v));
    assert!(validator.has_error(ValidationErrorKind::InvalidCount));
}

/// A rooted graph requires the declared roots to equal the source
/// vertices.
#[test]
fn rooted_graph_checks_declared_roots() {
    const FLAGS: u32 = GraphFlags::ROOTED;

    // declared root matches the single source
    let mut graph = DirectedGraph::<u32, FLAGS>::new();
    graph.insert_edge(0, 1);
    graph.insert_edge(1, 2);
    graph.roots_mut().insert(0);
    let validator = validate(|v| graph.validate(v));
    assert_eq!(validator.get_error_count(), 0);

    // a source vertex missing from Roots
    let mut undeclared = DirectedGraph::<u32, FLAGS>::new();
    undeclared.insert_edge(0, 1);
    let validator = validate(|v| undeclared.validate(v));
    assert!(validator.has_error(ValidationErrorKind::MissingObject));

    // a declared root with an incoming edge
    let mut bad_root = DirectedGraph::<u32, FLAGS>::new();
    bad_root.insert_edge(0, 1);
    bad_root.roots_mut().insert(0);
    bad_root.roots_mut().insert(1);
    let validator = validate(|v| bad_root.validate(v));
    assert!(validator.has_error(ValidationErrorKind::InvalidObject));
}

/// Vertices unreachable from the declared roots are reported.
#[test]
fn rooted_graph_checks_reachability() {
    const FLAGS: u32 = GraphFlags::ROOTED;

    // 5 -> 6 -> 5 is a cycle disconnected from the root; both vertices
    // have incoming edges, so neither is a source, but neither is
    // reachable from 0
    let mut graph = DirectedGraph::<u32, FLAGS>::new();
    graph.insert_edge(0, 1);
    graph.insert_edge(5, 6);
    graph.insert_edge(6, 5);
    graph.roots_mut().insert(0);

    let validator = validate(|v| graph.validate(v));
    assert!(validator.has_error(ValidationErrorKind::InvalidSetup));
}

#[test]
fn graph_round_trip_preserves_roots_and_edges() {
    let a = ItemRef::make_ref();
    let b = ItemRef::make_ref();
    let c = ItemRef::make_ref();

    let mut graph = DirectedGraph::<ItemRef>::new();
    graph.insert_edge(a, b);
    graph.insert_edge(a, c);
    graph.insert_edge(b, c);
    graph.roots_mut().insert(a);

    let data = write_with(|writer| graph.write(writer));
    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let mut decoded = DirectedGraph::<ItemRef>::new();
    decoded.read(&mut reader).unwrap();

    assert_eq!(decoded, graph);
    let successors: Vec<ItemRef> = decoded.successors(&a).copied().collect();
    assert_eq!(successors.len(), 2);
    assert!(decoded.has_edge(&b, &c));
}

/// Indexed vector validation succeeds exactly when every index entry is
/// in bounds.
#[test]
fn indexed_vector_bounds() {
    let in_bounds = IndexedVector::from_parts(vec![1u32, 2, 3], vec![0, 1, 2, 0]);
    let validator = validate(|v| in_bounds.validate(v));
    assert_eq!(validator.get_error_count(), 0);

    let out_of_bounds = IndexedVector::from_parts(vec![1u32, 2, 3], vec![0, 3]);
    let validator = validate(|v| out_of_bounds.validate(v));
    assert_eq!(validator.get_error_count(), 1);
    assert!(validator.has_error(ValidationErrorKind::InvalidValue));

    let empty = IndexedVector::<u32>::new();
    let validator = validate(|v| empty.validate(v));
    assert_eq!(validator.get_error_count(), 0);
}

#[test]
fn item_table_round_trip_with_null_slots() {
    let first = ItemRef::make_ref();
    let second = ItemRef::make_ref();

    let mut table = ItemTable::<ItemRef, Node, { ItemTableFlags::NULL_ENTITIES }>::new();
    table.insert(first).name = "first".to_string();
    table.insert_null(second);

    let data = write_with(|writer| table.write(writer));
    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let mut decoded = ItemTable::<ItemRef, Node, { ItemTableFlags::NULL_ENTITIES }>::new();
    decoded.read(&mut reader).unwrap();

    assert_eq!(decoded, table);
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded.get(&first).map(|node| node.name.as_str()), Some("first"));
    assert!(decoded.contains_key(&second));
    assert!(decoded.get(&second).is_none());
}

/// A table whose keys must exist in another table reports each missing
/// key.
#[test]
fn cross_table_key_validation() {
    let known = ItemRef::make_ref();
    let unknown = ItemRef::make_ref();

    let mut nodes = ItemTable::<ItemRef, Node>::new();
    nodes.insert(known);

    let mut graph = DirectedGraph::<ItemRef>::new();
    graph.insert_edge(known, unknown);

    let validator = validate(|v| graph.validate_keys_in_table(v, &nodes, "Nodes"));
    assert_eq!(validator.get_error_count(), 1);
    assert!(validator.has_error(ValidationErrorKind::MissingObject));

    let mut aliases = ItemTable::<ItemRef, Node>::new();
    aliases.insert(known);
    aliases.insert(unknown);
    let validator = validate(|v| aliases.validate_keys_in_table(v, &nodes, "Nodes"));
    assert_eq!(validator.get_error_count(), 1);
}

/// The IDs and Entities arrays must agree in size; a mismatch fails the
/// read.
#[test]
fn item_table_size_mismatch_fails() {
    let data = write_with(|writer| {
        let keys = [ItemRef::make_ref(), ItemRef::make_ref()];
        writer.write_slice("IDs", &keys)?;
        writer.write_sections_array("Entities", 1, None, |_, section| {
            let node = Node::default();
            node.write(section)
        })
    });

    let mut stream = ReadStream::new(&data);
    let mut reader = EntityReader::new(&mut stream);
    let mut table = ItemTable::<ItemRef, Node>::new();
    assert!(matches!(
        table.read(&mut reader),
        Err(Error::MalformedBlock(_))
    ));
}
