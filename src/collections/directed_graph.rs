//! A directed graph over ordered node values, with optional shape
//! assertions checked at validation time.

use std::collections::{BTreeSet, VecDeque};
use std::fmt::Debug;

use itertools::Itertools;

use crate::collections::item_table::ItemTable;
use crate::error::Error;
use crate::reader::EntityReader;
use crate::types::{DataValue, KeyRange};
use crate::validator::{EntityValidator, ValidationErrorKind};
use crate::writer::EntityWriter;

/// Shape assertion flags of a [`DirectedGraph`] type.
pub struct GraphFlags;

impl GraphFlags {
    /// Validation rejects directed cycles.
    pub const ACYCLIC: u32 = 0x1;
    /// Validation checks that the declared roots are exactly the source
    /// vertices and that every vertex is reachable from them.
    pub const ROOTED: u32 = 0x2;
    /// Validation requires exactly one source vertex.
    pub const SINGLE_ROOT: u32 = 0x4;
}

/// A directed graph stored as an ordered set of (from, to) edges plus an
/// ordered set of declared root vertices.
///
/// Edges are unique; inserting an existing edge is a no-op. The `FLAGS`
/// const parameter carries zero or more [`GraphFlags`] bits that
/// [`DirectedGraph::validate`] enforces.
///
/// # Example
/// ```
/// use hoard::collections::{DirectedGraph, GraphFlags};
///
/// let mut graph = DirectedGraph::<u32, { GraphFlags::ACYCLIC }>::new();
/// graph.insert_edge(0, 1);
/// graph.insert_edge(1, 2);
/// assert!(graph.has_edge(&0, &1));
/// assert_eq!(graph.successors(&0).count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DirectedGraph<N, const FLAGS: u32 = 0> {
    roots: BTreeSet<N>,
    edges: BTreeSet<(N, N)>,
}

impl<N, const FLAGS: u32> Default for DirectedGraph<N, FLAGS> {
    fn default() -> Self {
        DirectedGraph {
            roots: BTreeSet::new(),
            edges: BTreeSet::new(),
        }
    }
}

impl<N, const FLAGS: u32> DirectedGraph<N, FLAGS> {
    /// Whether validation rejects cycles.
    pub const IS_ACYCLIC: bool = FLAGS & GraphFlags::ACYCLIC != 0;
    /// Whether validation checks the declared roots.
    pub const IS_ROOTED: bool = FLAGS & GraphFlags::ROOTED != 0;
    /// Whether validation requires exactly one source vertex.
    pub const IS_SINGLE_ROOT: bool = FLAGS & GraphFlags::SINGLE_ROOT != 0;

    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<N: Ord + Clone, const FLAGS: u32> DirectedGraph<N, FLAGS> {
    /// Inserts an edge, unless it already exists.
    pub fn insert_edge(&mut self, from: N, to: N) {
        self.edges.insert((from, to));
    }

    /// Returns `true` if the edge exists.
    pub fn has_edge(&self, from: &N, to: &N) -> bool {
        self.edges.contains(&(from.clone(), to.clone()))
    }

    /// The declared root vertices.
    pub fn roots(&self) -> &BTreeSet<N> {
        &self.roots
    }

    /// Mutable access to the declared root vertices.
    pub fn roots_mut(&mut self) -> &mut BTreeSet<N> {
        &mut self.roots
    }

    /// The edge set.
    pub fn edges(&self) -> &BTreeSet<(N, N)> {
        &self.edges
    }

    /// Mutable access to the edge set.
    pub fn edges_mut(&mut self) -> &mut BTreeSet<(N, N)> {
        &mut self.edges
    }

    /// Removes all edges and roots.
    pub fn clear(&mut self) {
        self.roots.clear();
        self.edges.clear();
    }
}

impl<N: Ord + Clone + KeyRange, const FLAGS: u32> DirectedGraph<N, FLAGS> {
    /// Enumerates the successors of `node`, in node order.
    ///
    /// The lookup is a range query over the ordered pair set, bounded by
    /// the key-range sentinels of the node type.
    pub fn successors<'a>(&'a self, node: &N) -> impl Iterator<Item = &'a N> {
        self.edges
            .range((node.clone(), N::range_inf())..=(node.clone(), N::range_sup()))
            .map(|(_, to)| to)
    }

    fn successor_range<'a>(
        edges: &'a BTreeSet<(N, N)>,
        node: &N,
    ) -> impl Iterator<Item = &'a N> {
        edges
            .range((node.clone(), N::range_inf())..=(node.clone(), N::range_sup()))
            .map(|(_, to)| to)
    }
}

impl<N, const FLAGS: u32> DirectedGraph<N, FLAGS>
where
    N: Ord + Clone + Debug + KeyRange,
{
    /// Checks the shape assertions carried by the type, reporting every
    /// violation.
    pub fn validate(&self, validator: &mut EntityValidator) {
        // vertices with at least one incoming edge
        let mut downstream_nodes = BTreeSet::new();
        for (_, to) in &self.edges {
            downstream_nodes.insert(to.clone());
        }

        // the rest of the vertices are sources (no incoming edge)
        let mut source_nodes = BTreeSet::new();
        for (from, _) in &self.edges {
            if !downstream_nodes.contains(from) {
                source_nodes.insert(from.clone());
            }
        }

        if Self::IS_SINGLE_ROOT && source_nodes.len() != 1 {
            validator.report_error(
                ValidationErrorKind::InvalidCount,
                format!(
                    "the graph has {} source vertices but is required to have exactly one root",
                    source_nodes.len()
                ),
            );
        }

        if Self::IS_ROOTED {
            if Self::IS_SINGLE_ROOT && self.roots.len() != 1 {
                validator.report_error(
                    ValidationErrorKind::InvalidCount,
                    format!(
                        "the graph is single rooted but declares {} roots",
                        self.roots.len()
                    ),
                );
            }

            for node in &self.roots {
                if downstream_nodes.contains(node) {
                    validator.report_error(
                        ValidationErrorKind::InvalidObject,
                        format!(
                            "the declared root {:?} has incoming edges, which makes it invalid as a root",
                            node
                        ),
                    );
                }
            }

            for node in &source_nodes {
                if !self.roots.contains(node) {
                    validator.report_error(
                        ValidationErrorKind::MissingObject,
                        format!(
                            "the vertex {:?} has no incoming edges but is not declared in Roots",
                            node
                        ),
                    );
                }
            }

            self.validate_reachability(&downstream_nodes, validator);
        }

        if Self::IS_ACYCLIC {
            self.validate_no_cycles(validator);
        }
    }

    /// Iterative depth-first search; reports the first cycle found and
    /// stops.
    fn validate_no_cycles(&self, validator: &mut EntityValidator) {
        let mut stack: Vec<N> = Vec::new();
        let mut on_stack: BTreeSet<N> = BTreeSet::new();
        let mut checked: BTreeSet<N> = BTreeSet::new();

        for (node, _) in &self.edges {
            if checked.contains(node) {
                continue;
            }
            stack.push(node.clone());

            while let Some(current) = stack.last().cloned() {
                if !checked.contains(&current) {
                    checked.insert(current.clone());
                    on_stack.insert(current.clone());
                } else {
                    on_stack.remove(&current);
                    stack.pop();
                }

                for child in Self::successor_range(&self.edges, &current) {
                    if !checked.contains(child) {
                        stack.push(child.clone());
                    } else if on_stack.contains(child) {
                        validator.report_error(
                            ValidationErrorKind::InvalidSetup,
                            format!(
                                "the vertex {:?} is part of a cycle, but the graph is acyclic",
                                child
                            ),
                        );
                        return;
                    }
                }
            }
        }
    }

    /// Breadth-first search from the declared roots; every vertex with an
    /// incoming edge must be reached.
    fn validate_reachability(&self, downstream_nodes: &BTreeSet<N>, validator: &mut EntityValidator) {
        let mut queue: VecDeque<N> = self.roots.iter().cloned().collect();
        let mut reached: BTreeSet<N> = BTreeSet::new();

        while let Some(current) = queue.pop_front() {
            if !reached.insert(current.clone()) {
                continue;
            }
            for child in Self::successor_range(&self.edges, &current) {
                if !reached.contains(child) {
                    queue.push_back(child.clone());
                }
            }
        }

        for node in downstream_nodes {
            if !reached.contains(node) {
                validator.report_error(
                    ValidationErrorKind::InvalidSetup,
                    format!(
                        "the vertex {:?} cannot be reached from any declared root",
                        node
                    ),
                );
            }
        }
    }

    /// Checks that every vertex of the graph occurs as a key of `table`,
    /// reporting a missing object per absent vertex.
    pub fn validate_keys_in_table<T, const TABLE_FLAGS: u32>(
        &self,
        validator: &mut EntityValidator,
        table: &ItemTable<N, T, TABLE_FLAGS>,
        table_name: &str,
    ) {
        let mut nodes = BTreeSet::new();
        for (from, to) in &self.edges {
            nodes.insert(from.clone());
            nodes.insert(to.clone());
        }
        for node in &nodes {
            if !table.contains_key(node) {
                validator.report_error(
                    ValidationErrorKind::MissingObject,
                    format!("the vertex {:?} is missing in {}", node, table_name),
                );
            }
        }
    }
}

impl<N: DataValue + Ord, const FLAGS: u32> DirectedGraph<N, FLAGS> {
    /// Writes the graph: the roots as a vector under "Roots", then the
    /// edges as a flat vector of interleaved endpoints under "Edges".
    pub fn write(&self, writer: &mut EntityWriter<'_>) -> Result<(), Error> {
        let roots: Vec<N> = self.roots.iter().cloned().collect();
        writer.write_slice("Roots", &roots)?;

        let mut endpoints = Vec::with_capacity(self.edges.len() * 2);
        for (from, to) in &self.edges {
            endpoints.push(from.clone());
            endpoints.push(to.clone());
        }
        writer.write_slice("Edges", &endpoints)?;
        Ok(())
    }

    /// Reads a graph written by [`DirectedGraph::write`].
    pub fn read(&mut self, reader: &mut EntityReader<'_, '_>) -> Result<(), Error> {
        self.clear();

        let roots: Vec<N> = reader.read_vec("Roots")?;
        self.roots = roots.into_iter().collect();

        let endpoints: Vec<N> = reader.read_vec("Edges")?;
        if endpoints.len() % 2 != 0 {
            return Err(Error::MalformedBlock(format!(
                "the Edges vector has an odd number of endpoints: {}",
                endpoints.len()
            )));
        }
        for (from, to) in endpoints.into_iter().tuples() {
            self.insert_edge(from, to);
        }
        Ok(())
    }
}
