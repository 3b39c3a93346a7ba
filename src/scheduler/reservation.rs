//! Temporal reservations on vertices and edges of the surface graph.

use petgraph::graph::{EdgeIndex, NodeIndex};
use std::collections::HashMap;

/// An inclusive time interval on a vertex or edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Interval { start, end }
    }

    /// Overlap test; touching ranges are not considered overlapping.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Time intervals during which vertices and edges are held by scheduled
/// aircraft. Intervals are stored sorted by start time so the table's
/// answers do not depend on insertion order; intervals are never removed
/// during a run.
#[derive(Debug, Default)]
pub struct ReservationTable {
    vertices: HashMap<NodeIndex, Vec<Interval>>,
    edges: HashMap<EdgeIndex, Vec<Interval>>,
}

fn sorted_insert(intervals: &mut Vec<Interval>, interval: Interval) {
    let at = intervals.partition_point(|existing| {
        (existing.start, existing.end) < (interval.start, interval.end)
    });
    intervals.insert(at, interval);
}

fn is_free(intervals: Option<&Vec<Interval>>, interval: &Interval) -> bool {
    let Some(intervals) = intervals else {
        return true;
    };
    // sorted by start; stop scanning once every later interval begins
    // at or after this one ends
    for existing in intervals {
        if existing.start >= interval.end {
            break;
        }
        if existing.overlaps(interval) {
            return false;
        }
    }
    true
}

impl ReservationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all reservations (start of a scheduling run).
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.edges.clear();
    }

    /// Hold a vertex for an interval.
    pub fn reserve_vertex(&mut self, vertex: NodeIndex, interval: Interval) {
        sorted_insert(self.vertices.entry(vertex).or_default(), interval);
    }

    /// Hold an edge for an interval.
    pub fn reserve_edge(&mut self, edge: EdgeIndex, interval: Interval) {
        sorted_insert(self.edges.entry(edge).or_default(), interval);
    }

    /// Whether a vertex is unreserved over the whole interval.
    pub fn vertex_free(&self, vertex: NodeIndex, interval: &Interval) -> bool {
        is_free(self.vertices.get(&vertex), interval)
    }

    /// Whether an edge is unreserved over the whole interval.
    pub fn edge_free(&self, edge: EdgeIndex, interval: &Interval) -> bool {
        is_free(self.edges.get(&edge), interval)
    }

    /// Latest reservation end on a vertex, if any reservation exists.
    pub fn latest_end_at_vertex(&self, vertex: NodeIndex) -> Option<f64> {
        self.vertices
            .get(&vertex)?
            .iter()
            .map(|interval| interval.end)
            .fold(None, |acc: Option<f64>, end| match acc {
                Some(current) if current >= end => Some(current),
                _ => Some(end),
            })
    }

    /// Reserved intervals on a vertex, sorted by start.
    pub fn vertex_intervals(&self, vertex: NodeIndex) -> &[Interval] {
        self.vertices.get(&vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Reserved intervals on an edge, sorted by start.
    pub fn edge_intervals(&self, edge: EdgeIndex) -> &[Interval] {
        self.edges.get(&edge).map(Vec::as_slice).unwrap_or(&[])
    }
}
