//! A test entity exercising the whole type universe: a small scene
//! aggregate with scalars, optionals, arrays, all four collections and a
//! varying value.

// not every test binary uses every helper
#![allow(dead_code)]

use hoard::collections::{
    BidirectionalMap, DirectedGraph, GraphFlags, IndexedVector, ItemTable, ItemTableFlags,
};
use hoard::dynamic::{Container, Varying, VaryingData};
use hoard::entity::{ItemData, Package};
use hoard::entity_type;
use hoard::error::Error;
use hoard::reader::EntityReader;
use hoard::types::refs::{EntityRef, ItemRef};
use hoard::types::{ContainerTypeIndex, DataTypeIndex, Mat4, Quat, Vec3};
use hoard::validator::EntityValidator;
use hoard::writer::EntityWriter;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Mat4,
    pub rotation: Quat,
    pub visible: bool,
}

impl Default for Node {
    fn default() -> Self {
        Node {
            name: String::new(),
            transform: Mat4::identity(),
            rotation: Quat::identity(),
            visible: true,
        }
    }
}

impl ItemData for Node {
    fn write(&self, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
        writer.write("Name", &self.name)?;
        writer.write("Transform", &self.transform)?;
        writer.write("Rotation", &self.rotation)?;
        writer.write("Visible", &self.visible)?;
        Ok(())
    }

    fn read(&mut self, reader: &mut EntityReader<'_, '_>) -> Result<(), Error> {
        self.name = reader.read("Name")?;
        self.transform = reader.read("Transform")?;
        self.rotation = reader.read("Rotation")?;
        self.visible = reader.read("Visible")?;
        Ok(())
    }

    fn validate(&self, _validator: &mut EntityValidator) -> Result<(), Error> {
        Ok(())
    }
}

pub type SceneGraph = DirectedGraph<ItemRef, { GraphFlags::ACYCLIC }>;
pub type SceneNodes = ItemTable<ItemRef, Node, { ItemTableFlags::NULL_ENTITIES }>;

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: String,
    pub revision: u32,
    pub scale: f32,
    pub origin: Vec3,
    pub tag: ItemRef,
    pub parent: Option<EntityRef>,
    pub flags: Vec<bool>,
    pub labels: Vec<String>,
    pub weights: IndexedVector<f32>,
    pub annotation: Option<String>,
    pub lod_distances: Option<Vec<f32>>,
    pub aliases: BidirectionalMap<u32, String>,
    pub hierarchy: SceneGraph,
    pub nodes: SceneNodes,
    pub extra: Varying,
}

impl Default for Scene {
    fn default() -> Self {
        Scene {
            name: String::new(),
            revision: 0,
            scale: 1.0,
            origin: Vec3::zeros(),
            tag: ItemRef::NULL,
            parent: None,
            flags: Vec::new(),
            labels: Vec::new(),
            weights: IndexedVector::new(),
            annotation: None,
            lod_distances: None,
            aliases: BidirectionalMap::new(),
            hierarchy: SceneGraph::new(),
            nodes: SceneNodes::new(),
            extra: Varying::new(),
        }
    }
}

impl ItemData for Scene {
    fn write(&self, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
        writer.write("Name", &self.name)?;
        writer.write("Revision", &self.revision)?;
        writer.write("Scale", &self.scale)?;
        writer.write("Origin", &self.origin)?;
        writer.write("Tag", &self.tag)?;
        writer.write_option("Parent", self.parent.as_ref())?;
        writer.write_slice("Flags", &self.flags)?;
        writer.write_slice("Labels", &self.labels)?;
        writer.write_indexed("Weights", &self.weights)?;
        writer.write_option("Annotation", self.annotation.as_ref())?;
        writer.write_option_slice("LodDistances", self.lod_distances.as_deref())?;
        writer.write_section("Aliases", |section| self.aliases.write(section))?;
        writer.write_section("Hierarchy", |section| self.hierarchy.write(section))?;
        writer.write_section("Nodes", |section| self.nodes.write(section))?;
        writer.write_section("Extra", |section| self.extra.write(section))?;
        Ok(())
    }

    fn read(&mut self, reader: &mut EntityReader<'_, '_>) -> Result<(), Error> {
        self.name = reader.read("Name")?;
        self.revision = reader.read("Revision")?;
        self.scale = reader.read("Scale")?;
        self.origin = reader.read("Origin")?;
        self.tag = reader.read("Tag")?;
        self.parent = reader.read_option("Parent")?;
        self.flags = reader.read_vec("Flags")?;
        self.labels = reader.read_vec("Labels")?;
        self.weights = reader.read_indexed("Weights")?;
        self.annotation = reader.read_option("Annotation")?;
        self.lod_distances = reader.read_option_vec("LodDistances")?;
        reader.read_section("Aliases", |section| self.aliases.read(section))?;
        reader.read_section("Hierarchy", |section| self.hierarchy.read(section))?;
        reader.read_section("Nodes", |section| self.nodes.read(section))?;
        reader.read_section("Extra", |section| self.extra.read(section))?;
        Ok(())
    }

    fn validate(&self, validator: &mut EntityValidator) -> Result<(), Error> {
        self.weights.validate(validator);
        self.hierarchy.validate(validator);
        self.nodes.validate(validator)?;
        self.extra.validate(validator)?;
        Ok(())
    }
}

entity_type!(Scene, "Scene");

/// A package exporting the test entity.
pub fn scene_package() -> Package {
    let mut package = Package::new();
    package.register::<Scene>();
    package
}

/// A scene with every field populated, including a NUL-bearing string, a
/// 7-element bool vector and a null node slot.
pub fn sample_scene() -> Scene {
    let mut scene = Scene {
        name: "demo\0scene".to_string(),
        revision: 7,
        scale: 0.5,
        origin: Vec3::new(1.0, -2.0, 3.5),
        tag: ItemRef::make_ref(),
        parent: Some(EntityRef::from(hoard::types::refs::Hash::from([7u8; 32]))),
        flags: vec![true, false, true, true, false, false, true],
        labels: vec!["".to_string(), "alpha".to_string(), "with\0nul".to_string()],
        weights: IndexedVector::from_parts(vec![0.25, 0.5, 1.0], vec![0, 2, 2, 1]),
        annotation: Some("latest".to_string()),
        lod_distances: None,
        aliases: BidirectionalMap::new(),
        hierarchy: SceneGraph::new(),
        nodes: SceneNodes::new(),
        extra: Varying::new(),
    };

    scene.aliases.insert(1, "one".to_string());
    scene.aliases.insert(2, "two".to_string());
    scene.aliases.insert(3, "three".to_string());

    let root = ItemRef::make_ref();
    let child_a = ItemRef::make_ref();
    let child_b = ItemRef::make_ref();
    scene.hierarchy.insert_edge(root, child_a);
    scene.hierarchy.insert_edge(root, child_b);
    scene.hierarchy.insert_edge(child_a, child_b);
    scene.hierarchy.roots_mut().insert(root);

    scene.nodes.insert(root).name = "root".to_string();
    scene.nodes.insert(child_a).name = "left".to_string();
    scene.nodes.insert_null(child_b);

    if let VaryingData::U32(Container::Vector(items)) = scene
        .extra
        .initialize(DataTypeIndex::U32, ContainerTypeIndex::Vector)
    {
        items.extend([11, 22, 33]);
    }

    scene
}
