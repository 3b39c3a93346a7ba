//! Single-agent space-time A* over the surface graph, constrained by the
//! reservation table.
//!
//! States are (vertex, arrival_time) pairs. From a state the search either
//! traverses an out-edge at the aircraft's cruise velocity or waits in
//! place for one `wait_time` unit. The heuristic is the remaining travel
//! time in the unconstrained graph, backed by one backward Dijkstra pass
//! per goal vertex (cached across aircraft).

use super::reservation::{Interval, ReservationTable};
use crate::airport::aircraft::{Aircraft, PathState};
use crate::airport::graph::AirportGraph;
use ordered_float::OrderedFloat;
use petgraph::graph::NodeIndex;
use petgraph::visit::{EdgeRef, Reversed};
use std::collections::{BinaryHeap, HashMap};

/// Hard budget on expansions per query. Keeps a query with an unreachable
/// goal but feasible waits from expanding the wait chain forever.
const MAX_EXPANSIONS: u64 = 100_000;

/// Planner failure modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerError {
    /// The open set emptied (or the expansion budget ran out) with no
    /// goal expansion
    NoPath,
}

impl std::fmt::Display for PlannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PlannerError::NoPath => write!(f, "No path found"),
        }
    }
}

/// A successful plan for one aircraft.
#[derive(Debug, Clone)]
pub struct PlanResult {
    /// Vertex/time sequence from start to goal, waits merged
    pub path: Vec<PathState>,
    /// Travel time plus weighted wait time
    pub cost: f64,
    /// Arrival time at the goal vertex
    pub expected_runway_time: f64,
}

struct SearchNode {
    vertex: NodeIndex,
    time: f64,
    g: f64,
    parent: Option<usize>,
}

/// Open-list entry ordered for a min-heap on (f, arrival_time).
#[derive(PartialEq, Eq)]
struct OpenEntry {
    f: OrderedFloat<f64>,
    time: OrderedFloat<f64>,
    node: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // inverted so the std max-heap pops the lowest f, then the lowest
        // arrival time
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.time.cmp(&self.time))
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Space-time path planner with per-goal heuristic cache and search
/// counters.
#[derive(Debug, Default)]
pub struct Planner {
    wait_cost: f64,
    wait_time: f64,
    safety_time: f64,
    /// goal vertex -> (vertex -> unconstrained travel distance to goal)
    goal_distances: HashMap<NodeIndex, HashMap<NodeIndex, f64>>,
    /// States popped from the open list
    pub expanded_nodes: u64,
    /// States pushed onto the open list
    pub generated_nodes: u64,
}

impl Planner {
    pub fn new(wait_cost: f64, wait_time: f64, safety_time: f64) -> Self {
        Planner {
            wait_cost,
            wait_time,
            safety_time,
            goal_distances: HashMap::new(),
            expanded_nodes: 0,
            generated_nodes: 0,
        }
    }

    /// Reset the search counters (start of a scheduling run).
    pub fn reset_counters(&mut self) {
        self.expanded_nodes = 0;
        self.generated_nodes = 0;
    }

    /// Distance-to-goal table for a goal vertex, computed on first use by
    /// a Dijkstra pass over the reversed graph.
    fn distances_to(&mut self, graph: &AirportGraph, goal: NodeIndex) -> &HashMap<NodeIndex, f64> {
        self.goal_distances.entry(goal).or_insert_with(|| {
            petgraph::algo::dijkstra(Reversed(graph.inner()), goal, None, |e| e.weight().length)
        })
    }

    /// Earliest unobstructed arrival at `goal` for an aircraft appearing
    /// at `appear_time` and cruising at `cruise_velocity`. Infinite when
    /// the goal is unreachable.
    pub fn estimated_arrival(
        &mut self,
        graph: &AirportGraph,
        start: NodeIndex,
        goal: NodeIndex,
        appear_time: f64,
        cruise_velocity: f64,
    ) -> f64 {
        match self.distances_to(graph, goal).get(&start) {
            Some(distance) if cruise_velocity > 0.0 => appear_time + distance / cruise_velocity,
            _ => f64::INFINITY,
        }
    }

    /// Plan one aircraft from its gate at `earliest_start` to its runway,
    /// honoring `reservations`.
    pub fn plan(
        &mut self,
        graph: &AirportGraph,
        aircraft: &Aircraft,
        earliest_start: f64,
        reservations: &ReservationTable,
    ) -> Result<PlanResult, PlannerError> {
        let start = aircraft.start;
        let goal = aircraft.goal;
        let cruise = aircraft.cruise_velocity;

        if cruise <= 0.0 {
            sched_error!(
                "(plan) {} has non-positive cruise velocity {}.",
                aircraft.id,
                cruise
            );
            return Err(PlannerError::NoPath);
        }

        if start == goal {
            return Ok(PlanResult {
                path: vec![PathState {
                    vertex: start,
                    earliest: earliest_start,
                    latest: earliest_start,
                }],
                cost: 0.0,
                expected_runway_time: earliest_start,
            });
        }

        // clone keeps the borrow checker out of the expansion loop; the
        // table is one f64 per vertex
        let distances = self.distances_to(graph, goal).clone();
        if !distances.contains_key(&start) {
            sched_debug!("(plan) {} cannot reach its runway at all.", aircraft.id);
            return Err(PlannerError::NoPath);
        }

        let mut arena: Vec<SearchNode> = vec![];
        let mut open: BinaryHeap<OpenEntry> = BinaryHeap::new();
        let mut best_g: HashMap<(NodeIndex, OrderedFloat<f64>), f64> = HashMap::new();
        let mut expanded: u64 = 0;
        let mut generated: u64 = 0;

        arena.push(SearchNode {
            vertex: start,
            time: earliest_start,
            g: 0.0,
            parent: None,
        });
        best_g.insert((start, OrderedFloat(earliest_start)), 0.0);
        open.push(OpenEntry {
            f: OrderedFloat(distances[&start] / cruise),
            time: OrderedFloat(earliest_start),
            node: 0,
        });
        generated += 1;

        let result = loop {
            let Some(entry) = open.pop() else {
                break Err(PlannerError::NoPath);
            };
            let (vertex, time, g) = {
                let node = &arena[entry.node];
                (node.vertex, node.time, node.g)
            };

            // stale heap entry superseded by a cheaper arrival
            match best_g.get(&(vertex, OrderedFloat(time))) {
                Some(best) if g > *best => continue,
                _ => {}
            }

            expanded += 1;
            if expanded > MAX_EXPANSIONS {
                sched_warn!(
                    "(plan) {} exceeded the expansion budget; treating as no path.",
                    aircraft.id
                );
                break Err(PlannerError::NoPath);
            }

            if vertex == goal {
                break Ok(reconstruct(&arena, entry.node, g, time));
            }

            let mut relax = |next_vertex: NodeIndex,
                             next_time: f64,
                             next_g: f64,
                             heuristic: f64,
                             arena: &mut Vec<SearchNode>| {
                let key = (next_vertex, OrderedFloat(next_time));
                match best_g.get(&key) {
                    Some(best) if *best <= next_g => return,
                    _ => {}
                }
                best_g.insert(key, next_g);
                arena.push(SearchNode {
                    vertex: next_vertex,
                    time: next_time,
                    g: next_g,
                    parent: Some(entry.node),
                });
                open.push(OpenEntry {
                    f: OrderedFloat(next_g + heuristic),
                    time: OrderedFloat(next_time),
                    node: arena.len() - 1,
                });
                generated += 1;
            };

            // traverse an out-edge
            for edge_index in graph.out_edges(vertex) {
                let edge = graph.edge(edge_index);
                let next_vertex = graph.target(edge_index);
                let Some(remaining) = distances.get(&next_vertex) else {
                    continue;
                };

                let speed = match edge.speed_limit {
                    Some(cap) => cruise.min(cap),
                    None => cruise,
                };
                let duration = edge.length / speed;
                // test the same padded interval a commitment would create,
                // so committed reservations stay pairwise disjoint
                let window = Interval::new(
                    time - self.safety_time / 2.0,
                    time + duration + self.safety_time / 2.0,
                );

                if !reservations.edge_free(edge_index, &window) {
                    continue;
                }
                if let Some(opposite) = graph.edge_between(next_vertex, vertex) {
                    // head-on conflict with an aircraft holding the
                    // opposite direction
                    if !reservations.edge_free(opposite, &window) {
                        continue;
                    }
                }
                if !reservations.vertex_free(next_vertex, &window) {
                    continue;
                }

                relax(
                    next_vertex,
                    time + duration,
                    g + duration,
                    remaining / cruise,
                    &mut arena,
                );
            }

            // wait in place
            let wait_window = Interval::new(time, time + self.wait_time);
            if reservations.vertex_free(vertex, &wait_window) {
                relax(
                    vertex,
                    time + self.wait_time,
                    g + self.wait_time * self.wait_cost,
                    distances[&vertex] / cruise,
                    &mut arena,
                );
            }
        };

        self.expanded_nodes += expanded;
        self.generated_nodes += generated;
        result
    }
}

/// Walk the parent chain and merge consecutive states on the same vertex
/// into single wait intervals.
fn reconstruct(arena: &[SearchNode], goal_node: usize, cost: f64, arrival: f64) -> PlanResult {
    let mut chain = vec![];
    let mut cursor = Some(goal_node);
    while let Some(index) = cursor {
        let node = &arena[index];
        chain.push((node.vertex, node.time));
        cursor = node.parent;
    }
    chain.reverse();

    let mut path: Vec<PathState> = vec![];
    for (vertex, time) in chain {
        match path.last_mut() {
            Some(state) if state.vertex == vertex => state.latest = time,
            _ => path.push(PathState {
                vertex,
                earliest: time,
                latest: time,
            }),
        }
    }

    PlanResult {
        path,
        cost,
        expected_runway_time: arrival,
    }
}
