//! The airport surface graph: taxiway vertices and directed taxi links.
//!
//! Vertices and edges are referenced by dense petgraph indices everywhere
//! else in the crate; names are only used at the load boundary and in log
//! output. The graph is immutable once loaded.

use super::LoadError;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Role of a vertex on the airport surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VertexKind {
    /// Departure stand; aircraft appear here
    Gate,
    /// Handover point between ramp and taxiway system
    Spot,
    /// Taxiway crossing
    Intersection,
    /// Runway entry; aircraft leave the surface here
    Runway,
}

/// A vertex of the surface graph.
#[derive(Debug, Clone)]
pub struct Vertex {
    /// Unique name, e.g. `"G12"`
    pub name: String,
    /// Role on the surface
    pub kind: VertexKind,
    /// Position, arbitrary planar units
    pub x: f64,
    /// Position, arbitrary planar units
    pub y: f64,
}

/// A directed taxi link between two vertices.
#[derive(Debug, Clone)]
pub struct TaxiEdge {
    /// Unique name, e.g. `"G12-I3"`
    pub name: String,
    /// Length in distance units
    pub length: f64,
    /// Optional speed cap on this link
    pub speed_limit: Option<f64>,
}

/// One `vertices` entry of the graph file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexSpec {
    pub name: String,
    pub kind: VertexKind,
    pub x: f64,
    pub y: f64,
}

/// One `edges` entry of the graph file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub name: String,
    pub from: String,
    pub to: String,
    pub length: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_limit: Option<f64>,
}

/// On-disk shape of a surface graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSpec {
    pub vertices: Vec<VertexSpec>,
    pub edges: Vec<EdgeSpec>,
}

/// The loaded surface graph with name lookup tables and kind rosters.
#[derive(Debug)]
pub struct AirportGraph {
    graph: DiGraph<Vertex, TaxiEdge>,
    vertex_names: HashMap<String, NodeIndex>,
    edge_names: HashMap<String, EdgeIndex>,
    gates: Vec<NodeIndex>,
    spots: Vec<NodeIndex>,
    runways: Vec<NodeIndex>,
}

impl AirportGraph {
    /// Load a graph from its YAML file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let spec: GraphSpec = serde_yaml::from_str(&content)?;
        Self::from_spec(spec)
    }

    /// Build a graph from an in-memory spec. Duplicate names and unknown
    /// endpoints are hard errors.
    pub fn from_spec(spec: GraphSpec) -> Result<Self, LoadError> {
        let mut graph = DiGraph::new();
        let mut vertex_names = HashMap::new();
        let mut edge_names = HashMap::new();
        let mut gates = vec![];
        let mut spots = vec![];
        let mut runways = vec![];

        for v in spec.vertices {
            let index = graph.add_node(Vertex {
                name: v.name.clone(),
                kind: v.kind,
                x: v.x,
                y: v.y,
            });
            if vertex_names.insert(v.name.clone(), index).is_some() {
                return Err(LoadError::Parse(format!("duplicate vertex name {}", v.name)));
            }
            match v.kind {
                VertexKind::Gate => gates.push(index),
                VertexKind::Spot => spots.push(index),
                VertexKind::Runway => runways.push(index),
                VertexKind::Intersection => {}
            }
        }

        for e in spec.edges {
            let Some(&from) = vertex_names.get(&e.from) else {
                return Err(LoadError::UnknownVertex(e.from));
            };
            let Some(&to) = vertex_names.get(&e.to) else {
                return Err(LoadError::UnknownVertex(e.to));
            };
            let index = graph.add_edge(
                from,
                to,
                TaxiEdge {
                    name: e.name.clone(),
                    length: e.length,
                    speed_limit: e.speed_limit,
                },
            );
            if edge_names.insert(e.name.clone(), index).is_some() {
                return Err(LoadError::Parse(format!("duplicate edge name {}", e.name)));
            }
        }

        Ok(AirportGraph {
            graph,
            vertex_names,
            edge_names,
            gates,
            spots,
            runways,
        })
    }

    /// Vertex lookup by name.
    pub fn vertex_by_name(&self, name: &str) -> Option<NodeIndex> {
        self.vertex_names.get(name).copied()
    }

    /// Edge lookup by name.
    pub fn edge_by_name(&self, name: &str) -> Option<EdgeIndex> {
        self.edge_names.get(name).copied()
    }

    /// The vertex record behind an index.
    pub fn vertex(&self, index: NodeIndex) -> &Vertex {
        &self.graph[index]
    }

    /// The edge record behind an index.
    pub fn edge(&self, index: EdgeIndex) -> &TaxiEdge {
        &self.graph[index]
    }

    /// Both endpoints of an edge.
    pub fn endpoints(&self, index: EdgeIndex) -> (NodeIndex, NodeIndex) {
        self.graph
            .edge_endpoints(index)
            .unwrap_or((NodeIndex::end(), NodeIndex::end()))
    }

    /// The vertex an edge leads to.
    pub fn target(&self, index: EdgeIndex) -> NodeIndex {
        self.endpoints(index).1
    }

    /// Outgoing edges of a vertex.
    pub fn out_edges(&self, vertex: NodeIndex) -> Vec<EdgeIndex> {
        self.graph.edges(vertex).map(|e| e.id()).collect()
    }

    /// The unique edge between two vertices, if any.
    pub fn edge_between(&self, from: NodeIndex, to: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(from, to)
    }

    /// All gate vertices, in load order.
    pub fn gates(&self) -> &[NodeIndex] {
        &self.gates
    }

    /// All spot vertices, in load order.
    pub fn spots(&self) -> &[NodeIndex] {
        &self.spots
    }

    /// All runway vertices, in load order.
    pub fn runways(&self) -> &[NodeIndex] {
        &self.runways
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Borrow the underlying petgraph structure (read-only).
    pub fn inner(&self) -> &DiGraph<Vertex, TaxiEdge> {
        &self.graph
    }
}

/// One `nodes` entry of the abstract-graph node file.
#[derive(Debug, Deserialize)]
struct NodeSpec {
    name: String,
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct NodeFile {
    nodes: Vec<NodeSpec>,
}

/// One `links` entry of the abstract-graph link file. A link yields one
/// directed edge per direction; the length defaults to the euclidean
/// distance between its endpoints.
#[derive(Debug, Deserialize)]
struct LinkSpec {
    from: String,
    to: String,
    #[serde(default)]
    length: Option<f64>,
    #[serde(default)]
    speed_limit: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LinkFile {
    links: Vec<LinkSpec>,
}

#[derive(Debug, Deserialize)]
struct SpotFile {
    spots: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RunwayFile {
    runways: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DepartFile {
    gates: Vec<String>,
}

/// Assemble a surface graph from the five abstract description files
/// (nodes with coordinates, undirected links, and the spot/runway/gate
/// rosters), write the combined graph to `output`, and return it.
pub fn generate_abstract_graph(
    node_path: &Path,
    link_path: &Path,
    spot_path: &Path,
    runway_path: &Path,
    depart_path: &Path,
    output: &Path,
) -> Result<AirportGraph, LoadError> {
    let nodes: NodeFile = serde_yaml::from_str(&std::fs::read_to_string(node_path)?)?;
    let links: LinkFile = serde_yaml::from_str(&std::fs::read_to_string(link_path)?)?;
    let spots: SpotFile = serde_yaml::from_str(&std::fs::read_to_string(spot_path)?)?;
    let runways: RunwayFile = serde_yaml::from_str(&std::fs::read_to_string(runway_path)?)?;
    let departs: DepartFile = serde_yaml::from_str(&std::fs::read_to_string(depart_path)?)?;

    let positions: HashMap<&str, (f64, f64)> = nodes
        .nodes
        .iter()
        .map(|n| (n.name.as_str(), (n.x, n.y)))
        .collect();

    let kind_of = |name: &str| -> VertexKind {
        if departs.gates.iter().any(|g| g == name) {
            VertexKind::Gate
        } else if spots.spots.iter().any(|s| s == name) {
            VertexKind::Spot
        } else if runways.runways.iter().any(|r| r == name) {
            VertexKind::Runway
        } else {
            VertexKind::Intersection
        }
    };

    let mut spec = GraphSpec::default();
    for n in &nodes.nodes {
        spec.vertices.push(VertexSpec {
            name: n.name.clone(),
            kind: kind_of(&n.name),
            x: n.x,
            y: n.y,
        });
    }

    for link in &links.links {
        let Some(&(fx, fy)) = positions.get(link.from.as_str()) else {
            return Err(LoadError::UnknownVertex(link.from.clone()));
        };
        let Some(&(tx, ty)) = positions.get(link.to.as_str()) else {
            return Err(LoadError::UnknownVertex(link.to.clone()));
        };
        let length = link
            .length
            .unwrap_or_else(|| ((tx - fx).powi(2) + (ty - fy).powi(2)).sqrt());

        for (from, to) in [(&link.from, &link.to), (&link.to, &link.from)] {
            spec.edges.push(EdgeSpec {
                name: format!("{}-{}", from, to),
                from: from.clone(),
                to: to.clone(),
                length,
                speed_limit: link.speed_limit,
            });
        }
    }

    std::fs::write(output, serde_yaml::to_string(&spec)?)?;
    AirportGraph::from_spec(spec)
}
