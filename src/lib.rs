//! hoard is a persistent, content-addressed entity store.
//!
//! Application-defined aggregates ("entities") serialize into a
//! self-describing binary format of keyed blocks, sections and arrays of
//! sections. Each serialized artifact is addressed by the SHA-256 of its
//! bytes and stored as `<hex>.dat` in one directory; an in-memory cache
//! interns loaded entities as immutable shared references and can drop
//! everything no one else holds.
//!
//! The main pieces, leaf to root:
//!
//! - [`stream`]: byte streams with an endian-swap flag
//! - [`types`]: the closed scalar universe, reference scalars, wire tags
//! - [`writer`] / [`reader`]: the keyed block, value and section codec
//! - [`collections`]: indexed vectors, bidirectional maps, directed
//!   graphs, item tables
//! - [`validator`] / [`entity`]: the entity contract and its
//!   error-accumulating validation
//! - [`dynamic`]: run-time typed values over the closed universe
//! - [`handler`]: the content-addressed store with its cache

pub mod collections;
pub mod dynamic;
pub mod entity;
pub mod error;
pub mod handler;
pub mod reader;
pub mod stream;
pub mod types;
pub mod util;
pub mod validator;
pub mod writer;

pub use collections::{BidirectionalMap, DirectedGraph, GraphFlags, IndexedVector, ItemTable, ItemTableFlags};
pub use dynamic::{Container, Varying, VaryingData};
pub use entity::{Entity, EntityData, EntityTypeRecord, ItemData, Package};
pub use error::{Error, Status};
pub use handler::{EntityHandler, HandlerOptions};
pub use reader::{EntityReader, SectionsArrayReader};
pub use stream::{ReadStream, WriteStream};
pub use types::refs::{EntityRef, Hash, ItemRef};
pub use validator::{EntityValidator, ValidationErrorKind, ValidationIssue};
pub use writer::EntityWriter;
