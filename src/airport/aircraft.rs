//! Per-flight state: planned path, derived edge path, kinematic position
//! and the simulation command buffer.

use super::graph::AirportGraph;
use super::model::AircraftModel;
use super::LoadError;
use petgraph::graph::{EdgeIndex, NodeIndex};
use std::sync::Arc;

/// Longitudinal command issued by the intersection controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// No command pending
    No,
    /// Cleared through the next check point
    Go,
    /// Hold short of the next check point
    Stop,
}

/// One stop of a plan: a vertex together with the inclusive time interval
/// the aircraft occupies it. `earliest == latest` for a pure pass-through;
/// a wider interval is a wait.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathState {
    pub vertex: NodeIndex,
    pub earliest: f64,
    pub latest: f64,
}

/// A departing flight. Created at instance load, planned by the scheduler,
/// then driven by the simulator; the record lives until the metrics pass.
#[derive(Debug, Clone)]
pub struct Aircraft {
    /// Synthetic id, `departure_<n>`
    pub id: String,

    /// Assigned gate vertex
    pub start: NodeIndex,
    /// Target runway vertex
    pub goal: NodeIndex,

    /// Scheduled appearance time from the instance file
    pub appear_time: f64,
    /// Appearance time after the gate delay draw
    pub actual_appear_time: f64,

    /// Aircraft type
    pub model: Arc<AircraftModel>,
    /// Taxi cruise velocity drawn from the model distribution
    pub cruise_velocity: f64,

    /// Planned vertex/time sequence, empty until scheduled
    pub path: Vec<PathState>,
    /// Edge sequence derived from `path`; kept consistent by
    /// [`Aircraft::rebuild_edge_path`]
    pub edge_path: Vec<EdgeIndex>,

    /// Time the aircraft first moves off its gate
    pub pushback_time: f64,
    /// Planned arrival time at the runway
    pub expected_runway_time: f64,
    /// Simulated arrival time at the runway; 0 until reached
    pub actual_runway_time: f64,
    /// Planner-reported plan cost; +inf when no plan exists
    pub cost: f64,

    /// Simulator position: (index into `edge_path`, distance along edge)
    pub pos: (usize, f64),
    /// Current taxi velocity
    pub velocity: f64,
    /// Current acceleration
    pub acceleration: f64,
    /// Command received this tick
    pub command: Command,
    /// Command received the previous tick
    pub prev_command: Command,
    /// Set once the aircraft overshoots its final edge
    pub ready_for_runway: bool,

    /// Arena index of the nearest aircraft ahead, recomputed every tick
    pub prev_aircraft: Option<usize>,
    /// Along-path distance to `prev_aircraft`
    pub distance_to_prev: f64,
    /// Edge names crossed during the current tick
    pub passed_check_point: Vec<String>,

    /// Number of NO->STOP transitions received
    pub stop_received: u32,
    /// Ticks spent at zero velocity
    pub zero_velocity_tick: u32,
    /// Ticks spent under a STOP command
    pub wait_tick: u32,
}

impl Aircraft {
    /// A fresh, unplanned departure record.
    pub fn new(
        index: usize,
        start: NodeIndex,
        goal: NodeIndex,
        appear_time: f64,
        model: Arc<AircraftModel>,
    ) -> Self {
        Aircraft {
            id: format!("departure_{index}"),
            start,
            goal,
            appear_time,
            actual_appear_time: appear_time,
            model,
            cruise_velocity: 0.0,
            path: vec![],
            edge_path: vec![],
            pushback_time: 0.0,
            expected_runway_time: 0.0,
            actual_runway_time: 0.0,
            cost: 0.0,
            pos: (0, 0.0),
            velocity: 0.0,
            acceleration: 0.0,
            command: Command::No,
            prev_command: Command::No,
            ready_for_runway: false,
            prev_aircraft: None,
            distance_to_prev: 0.0,
            passed_check_point: vec![],
            stop_received: 0,
            zero_velocity_tick: 0,
            wait_tick: 0,
        }
    }

    /// Whether the scheduler produced a plan for this flight.
    pub fn has_plan(&self) -> bool {
        !self.edge_path.is_empty() && self.cost.is_finite()
    }

    /// Derive `edge_path` from `path`. Consecutive plan states on the same
    /// vertex are waits and produce no edge; distinct vertices must be
    /// connected by a unique graph edge.
    pub fn rebuild_edge_path(&mut self, graph: &AirportGraph) -> Result<(), LoadError> {
        self.edge_path.clear();
        for pair in self.path.windows(2) {
            if pair[0].vertex == pair[1].vertex {
                continue;
            }
            let Some(edge) = graph.edge_between(pair[0].vertex, pair[1].vertex) else {
                return Err(LoadError::UnknownEdge(format!(
                    "{} -> {}",
                    graph.vertex(pair[0].vertex).name,
                    graph.vertex(pair[1].vertex).name
                )));
            };
            self.edge_path.push(edge);
        }
        Ok(())
    }

    /// The edge the aircraft currently occupies.
    pub fn current_edge(&self) -> EdgeIndex {
        self.edge_path[self.pos.0]
    }

    /// Remaining distance to the end of the current edge.
    pub fn distance_to_next_point(&self, graph: &AirportGraph) -> f64 {
        graph.edge(self.current_edge()).length - self.pos.1
    }

    /// `"<edge name> - <distance>"` rendering for simulation logs.
    pub fn position_str(&self, graph: &AirportGraph) -> String {
        format!("{} - {}", graph.edge(self.current_edge()).name, self.pos.1)
    }

    /// Names of the edges whose end this aircraft will cross within the
    /// next `sight_length` distance units along its path.
    pub fn intersection_in_sight(&self, graph: &AirportGraph, sight_length: f64) -> Vec<String> {
        let mut edge_list = vec![];
        let mut remaining = sight_length;

        if remaining > self.distance_to_next_point(graph) {
            remaining -= self.distance_to_next_point(graph);

            let mut i = self.pos.0;
            edge_list.push(graph.edge(self.edge_path[i]).name.clone());
            i += 1;

            while remaining > 0.0 && i < self.edge_path.len() {
                let edge = graph.edge(self.edge_path[i]);
                if remaining > edge.length {
                    edge_list.push(edge.name.clone());
                }
                remaining -= edge.length;
                i += 1;
            }
        }

        edge_list
    }

    /// Hand a command to the aircraft for this tick.
    pub fn send_command(&mut self, command: Command) {
        self.command = command;
    }

    /// Reset counters and command buffers ahead of a simulation run.
    pub fn simulation_init(&mut self) {
        self.stop_received = 0;
        self.zero_velocity_tick = 0;
        self.wait_tick = 0;

        self.command = Command::No;
        self.prev_command = Command::No;
        self.ready_for_runway = false;
        self.actual_runway_time = 0.0;
        self.velocity = 0.0;
        self.acceleration = 0.0;
        self.prev_aircraft = None;
        self.distance_to_prev = 0.0;
        self.passed_check_point.clear();
    }

    /// Place the aircraft at the start of its first edge as it appears on
    /// the surface.
    pub fn simulation_begin(&mut self) {
        self.ready_for_runway = false;
        self.actual_runway_time = 0.0;
        self.pos = (0, 0.0);
    }
}
