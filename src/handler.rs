//! The entity handler: a content-addressed store over one directory.
//!
//! Artifacts are files named `<64-lowercase-hex>.dat` whose content is the
//! exact serialized byte sequence hashing to the file name. Loaded entities
//! are interned in an in-memory cache keyed by their content address; the
//! cache holds shared references and can drop every entity no one else
//! references. Load and store operations may run concurrently on blocking
//! worker threads; the cache lock is only taken at the intern and drop
//! moments, never across I/O or while the codec runs.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::entity::{Entity, EntityTypeRecord, Package};
use crate::error::{Error, Status};
use crate::reader::EntityReader;
use crate::stream::{ReadStream, WriteStream, INITIAL_RESERVATION};
use crate::types::refs::{EntityRef, Hash};
use crate::util::sha256;
use crate::validator::EntityValidator;
use crate::writer::EntityWriter;

// an artifact can never be smaller than the hash stored in its address
const MIN_ARTIFACT_SIZE: u64 = 32;

const ARTIFACT_EXTENSION: &str = "dat";

fn default_write_reservation() -> u64 {
    INITIAL_RESERVATION
}

/// Configuration of an [`EntityHandler`].
///
/// Loadable from JSON, e.g.
/// `{ "path": "./store", "write_reservation": 1048576 }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerOptions {
    /// The store directory. Must exist.
    pub path: PathBuf,
    /// Initial reservation of the in-memory write stream used to serialize
    /// an entity.
    #[serde(default = "default_write_reservation")]
    pub write_reservation: u64,
}

impl HandlerOptions {
    /// Creates options for `path` with default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        HandlerOptions {
            path: path.into(),
            write_reservation: default_write_reservation(),
        }
    }

    /// Parses options from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text)
            .map_err(|err| Error::InvalidParameter(format!("invalid handler options: {}", err)))
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

struct HandlerInner {
    options: HandlerOptions,
    packages: Vec<Package>,
    entities: RwLock<HashMap<EntityRef, Arc<dyn Entity>>>,
}

/// The content-addressed entity store.
///
/// Cheap to clone; clones share the same store and cache. All operations
/// take `&self` and may run from multiple threads.
///
/// # Example
/// ```ignore
/// let mut package = Package::new();
/// package.register::<Scene>();
/// let handler = EntityHandler::new("./store", vec![package])?;
///
/// let (entity_ref, status) = handler.add_entity(Arc::new(scene));
/// assert!(status.is_ok());
/// assert_eq!(handler.load_entity(&entity_ref), Status::Ok);
/// ```
#[derive(Clone)]
pub struct EntityHandler {
    inner: Arc<HandlerInner>,
}

impl EntityHandler {
    /// Creates a handler over the directory `path` with the given entity
    /// packages.
    ///
    /// # Errors
    /// [`Error::InvalidParameter`] if `path` is not an existing directory
    /// or no package is given.
    pub fn new(path: impl Into<PathBuf>, packages: Vec<Package>) -> Result<Self, Error> {
        Self::with_options(HandlerOptions::new(path), packages)
    }

    /// Creates a handler from explicit [`HandlerOptions`].
    pub fn with_options(options: HandlerOptions, packages: Vec<Package>) -> Result<Self, Error> {
        if packages.is_empty() {
            return Err(Error::InvalidParameter(
                "at least one package must be registered with the handler".to_string(),
            ));
        }
        if !options.path.is_dir() {
            return Err(Error::InvalidParameter(format!(
                "the store path {:?} is not an existing directory",
                options.path
            )));
        }
        Ok(EntityHandler {
            inner: Arc::new(HandlerInner {
                options,
                packages,
                entities: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// The store directory.
    pub fn path(&self) -> &Path {
        &self.inner.options.path
    }

    /// Returns `true` if the entity is currently interned in the cache.
    pub fn is_entity_loaded(&self, entity_ref: &EntityRef) -> bool {
        self.inner.entities.read().contains_key(entity_ref)
    }

    /// Returns a loaded entity, or `None` if it is not interned.
    ///
    /// The returned strong reference pins the entity: it will survive
    /// [`EntityHandler::unload_non_referenced_entities`] for as long as the
    /// caller holds it.
    pub fn get_loaded_entity(&self, entity_ref: &EntityRef) -> Option<Arc<dyn Entity>> {
        self.inner.entities.read().get(entity_ref).cloned()
    }

    /// Drops every cached entity that no one outside the handler
    /// references.
    pub fn unload_non_referenced_entities(&self) -> Status {
        let mut entities = self.inner.entities.write();
        entities.retain(|_, entity| Arc::strong_count(entity) > 1);
        Status::Ok
    }

    /// Loads the artifact addressed by `entity_ref` and interns it.
    ///
    /// Returns `Ok` immediately when the entity is already cached. The
    /// file's bytes are re-hashed and compared against the address; a
    /// mismatch returns `Corrupted`.
    pub fn load_entity(&self, entity_ref: &EntityRef) -> Status {
        self.read_task(entity_ref)
    }

    /// Dispatches [`EntityHandler::load_entity`] onto a blocking worker
    /// and returns its future. Completion order across calls is not
    /// guaranteed; a submitted load runs to completion.
    pub fn load_entity_async(&self, entity_ref: EntityRef) -> JoinHandle<Status> {
        let handler = self.clone();
        tokio::task::spawn_blocking(move || handler.read_task(&entity_ref))
    }

    /// Validates, serializes and stores `entity`, transferring ownership to
    /// the handler.
    ///
    /// On success the entity is interned under the hash of its serialized
    /// bytes and must be treated as read-only from now on. If an artifact
    /// with the same bytes already exists, nothing is rewritten and the
    /// status is `AlreadyExists`; both submissions end up with the same
    /// reference.
    pub fn add_entity(&self, entity: Arc<dyn Entity>) -> (EntityRef, Status) {
        self.write_task(entity)
    }

    /// Dispatches [`EntityHandler::add_entity`] onto a blocking worker and
    /// returns its future.
    pub fn add_entity_async(&self, entity: Arc<dyn Entity>) -> JoinHandle<(EntityRef, Status)> {
        let handler = self.clone();
        tokio::task::spawn_blocking(move || handler.write_task(entity))
    }

    fn find_record(&self, type_tag: &str) -> Option<&EntityTypeRecord> {
        self.inner
            .packages
            .iter()
            .find_map(|package| package.find(type_tag))
    }

    fn artifact_path(&self, entity_ref: &EntityRef) -> PathBuf {
        self.inner
            .options
            .path
            .join(format!("{}.{}", entity_ref, ARTIFACT_EXTENSION))
    }

    fn insert_entity(&self, entity_ref: EntityRef, entity: Arc<dyn Entity>) {
        let mut entities = self.inner.entities.write();
        // idempotent under hash equality, a racing insert keeps the first
        entities.entry(entity_ref).or_insert(entity);
    }

    fn read_task(&self, entity_ref: &EntityRef) -> Status {
        if self.is_entity_loaded(entity_ref) {
            return Status::Ok;
        }

        let path = self.artifact_path(entity_ref);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) => {
                error!("cannot read artifact {:?}: {}", path, err);
                return match err.kind() {
                    io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => Status::CantOpen,
                    _ => Status::CantRead,
                };
            }
        };

        if (data.len() as u64) < MIN_ARTIFACT_SIZE {
            error!("artifact {} is shorter than a content hash", entity_ref);
            return Status::Corrupted;
        }

        let digest = match sha256(&data) {
            Ok(digest) => digest,
            Err(err) => {
                error!("hashing artifact {} failed: {}", entity_ref, err);
                return Status::Undefined;
            }
        };
        if &Hash::from(digest) != entity_ref.as_hash() {
            error!(
                "artifact {} hashes to {}, the file is corrupted",
                entity_ref,
                Hash::from(digest)
            );
            return Status::Corrupted;
        }

        let entity = match self.parse_artifact(&data) {
            Ok(entity) => entity,
            Err(err) => {
                error!("cannot decode artifact {}: {}", entity_ref, err);
                return err.status();
            }
        };

        self.insert_entity(*entity_ref, Arc::from(entity));
        Status::Ok
    }

    fn parse_artifact(&self, data: &[u8]) -> Result<Box<dyn Entity>, Error> {
        let mut stream = ReadStream::new(data);
        let mut reader = EntityReader::new(&mut stream);
        reader.read_section("EntityFile", |section| {
            let entity_type: String = section.read("EntityType")?;
            let record = self.find_record(&entity_type).ok_or_else(|| {
                Error::UnknownEntityType(format!(
                    "the entity type \"{}\" is not registered with any package",
                    entity_type
                ))
            })?;
            let mut entity = record.create();
            record.read(entity.as_mut(), section)?;
            Ok(entity)
        })
    }

    fn write_task(&self, entity: Arc<dyn Entity>) -> (EntityRef, Status) {
        match self.write_task_impl(&entity) {
            Ok(result) => result,
            Err(status) => (EntityRef::NULL, status),
        }
    }

    fn write_task_impl(&self, entity: &Arc<dyn Entity>) -> Result<(EntityRef, Status), Status> {
        let type_tag = entity.entity_type();
        let record = self.find_record(type_tag).ok_or_else(|| {
            error!("the entity type \"{}\" is not registered with any package", type_tag);
            Status::NotInitialized
        })?;

        // validation never aborts mid-entity; a non-zero count fails the add
        let mut validator = EntityValidator::new();
        if let Err(err) = record.validate(entity.as_ref(), &mut validator) {
            error!("validating a \"{}\" entity failed: {}", type_tag, err);
            return Err(err.status());
        }
        if validator.get_error_count() > 0 {
            warn!(
                "a \"{}\" entity failed validation with {} errors",
                type_tag,
                validator.get_error_count()
            );
            return Err(Status::Invalid);
        }

        let mut stream = WriteStream::with_reservation(self.inner.options.write_reservation);
        let mut writer = EntityWriter::new(&mut stream);
        let written = writer.write_section("EntityFile", |section| {
            section.write("EntityType", &type_tag.to_string())?;
            record.write(entity.as_ref(), section)
        });
        if let Err(err) = written {
            error!("serializing a \"{}\" entity failed: {}", type_tag, err);
            return Err(Status::Undefined);
        }

        let digest = sha256(stream.get_data()).map_err(|err| {
            error!("hashing a \"{}\" entity failed: {}", type_tag, err);
            Status::Undefined
        })?;
        let entity_ref = EntityRef::from(Hash::from(digest));

        let path = self.artifact_path(&entity_ref);
        let mut status = Status::Ok;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(err) = file.write_all(stream.get_data()) {
                    error!("cannot write artifact {:?}: {}", path, err);
                    // drop the partial file so a later submission of the
                    // same bytes can win the exclusive create again
                    let _ = fs::remove_file(&path);
                    return Err(Status::CantWrite);
                }
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                debug!("artifact {} already exists", entity_ref);
                status = Status::AlreadyExists;
            }
            Err(err) => {
                error!("cannot create artifact {:?}: {}", path, err);
                return Err(Status::CantOpen);
            }
        }

        self.insert_entity(entity_ref, entity.clone());
        Ok((entity_ref, status))
    }
}
