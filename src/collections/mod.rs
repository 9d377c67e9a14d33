//! Structured collections with enforced invariants.
//!
//! Each collection knows how to serialize itself through an entity writer,
//! rebuild itself through an entity reader, and report invariant violations
//! to a validator. Ordered collections iterate and serialize in the natural
//! order of their key type, so structurally equal collections serialize to
//! bit-identical bytes.

mod bidirectional_map;
mod directed_graph;
mod indexed_vector;
mod item_table;

pub use bidirectional_map::BidirectionalMap;
pub use directed_graph::{DirectedGraph, GraphFlags};
pub use indexed_vector::IndexedVector;
pub use item_table::{ItemTable, ItemTableFlags};
