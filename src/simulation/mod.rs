//! Discrete-time kinematic simulation of the scheduled departures.
//!
//! One tick runs a fixed protocol: appearance, two-phase intersection
//! mutex arbitration, front-vehicle discovery, car-following advancement,
//! runway removal, a fronter refresh, the separation check and command
//! clearing. All bookkeeping maps are keyed by vertex/edge name through
//! ordered maps so a run is deterministic for a given schedule.

pub mod motion;

use crate::airport::aircraft::{Aircraft, Command};
use crate::airport::graph::AirportGraph;
use crate::config::Config;
use motion::Leader;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Distance from a check point at which an aircraft starts contending
/// for the intersection mutex.
const SAFETY_DISTANCE_CHECK_POINT: f64 = 10.0;

/// Multiplier on the summed plan durations used for the default tick
/// budget.
const TICK_BUDGET_FACTOR: f64 = 10.0;

/// Result of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationOutcome {
    /// Departures that reached their runway before the tick budget ran out
    pub completed_count: usize,
    /// Departures that were scheduled onto the surface
    pub scheduled_count: usize,
    /// Separation violations observed (diagnostic, not fatal)
    pub conflict_count: usize,
    /// Ticks executed
    pub ticks: u64,
}

impl SimulationOutcome {
    /// Whether every scheduled departure reached its runway.
    pub fn finished(&self) -> bool {
        self.completed_count == self.scheduled_count
    }
}

/// Drives scheduled aircraft along their edge paths tick by tick.
#[derive(Debug)]
pub struct Simulator {
    tick_per_time_unit: u32,
    safety_distance: f64,
    simulation_time: u64,
    max_ticks: u64,

    /// edge name -> aircraft on that edge, front of deque most advanced
    traffic: BTreeMap<String, VecDeque<usize>>,
    /// vertex name -> arena index of the aircraft holding the crossing
    intersection_mutex: BTreeMap<String, usize>,
    /// appearance time unit -> arena indices appearing then
    appear_schedule: BTreeMap<u64, Vec<usize>>,
    /// arena indices of aircraft currently on the surface
    aircraft_on_graph: BTreeSet<usize>,

    completed_count: usize,
    scheduled_count: usize,
    conflict_count: usize,
}

impl Simulator {
    /// Prepare a simulation over every departure that holds a plan.
    /// Aircraft without a plan are left off the surface and keep
    /// `actual_runway_time == 0`.
    pub fn new(config: &Config, departures: &mut [Aircraft]) -> Self {
        let mut appear_schedule: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        let mut scheduled_count = 0;
        let mut total_duration = 0.0;

        for (index, aircraft) in departures.iter_mut().enumerate() {
            aircraft.simulation_init();
            if !aircraft.has_plan() {
                sim_warn!("(new) {} has no plan; left out of the run.", aircraft.id);
                continue;
            }
            scheduled_count += 1;
            total_duration += aircraft.expected_runway_time - aircraft.actual_appear_time;

            // appearance happens on whole time units
            let appear_unit = aircraft.actual_appear_time.ceil() as u64;
            appear_schedule.entry(appear_unit).or_default().push(index);
        }

        let max_ticks =
            (TICK_BUDGET_FACTOR * total_duration * f64::from(config.tick_per_time_unit)).ceil()
                as u64;

        Simulator {
            tick_per_time_unit: config.tick_per_time_unit,
            safety_distance: config.safety_distance,
            simulation_time: 0,
            max_ticks: max_ticks.max(u64::from(config.tick_per_time_unit)),
            traffic: BTreeMap::new(),
            intersection_mutex: BTreeMap::new(),
            appear_schedule,
            aircraft_on_graph: BTreeSet::new(),
            completed_count: 0,
            scheduled_count,
            conflict_count: 0,
        }
    }

    /// Override the tick budget.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Run ticks until every scheduled aircraft has reached its runway or
    /// the tick budget is exhausted.
    pub fn run(&mut self, graph: &AirportGraph, departures: &mut [Aircraft]) -> SimulationOutcome {
        sim_info!(
            "(run) simulating {} departures at {} ticks per time unit.",
            self.scheduled_count,
            self.tick_per_time_unit
        );

        while self.completed_count < self.scheduled_count && self.simulation_time < self.max_ticks {
            self.tick(graph, departures);
        }

        if self.completed_count < self.scheduled_count {
            sim_error!(
                "(run) tick budget {} exhausted with {}/{} departures completed.",
                self.max_ticks,
                self.completed_count,
                self.scheduled_count
            );
        }

        SimulationOutcome {
            completed_count: self.completed_count,
            scheduled_count: self.scheduled_count,
            conflict_count: self.conflict_count,
            ticks: self.simulation_time,
        }
    }

    /// Execute one tick of the simulation protocol.
    pub fn tick(&mut self, graph: &AirportGraph, departures: &mut [Aircraft]) {
        // 1. appearance
        if self.simulation_time % u64::from(self.tick_per_time_unit) == 0 {
            let time_unit = self.simulation_time / u64::from(self.tick_per_time_unit);
            if let Some(appearing) = self.appear_schedule.remove(&time_unit) {
                for index in appearing {
                    let aircraft = &mut departures[index];
                    aircraft.simulation_begin();
                    self.aircraft_on_graph.insert(index);
                    let edge_name = graph.edge(aircraft.edge_path[0]).name.clone();
                    self.traffic.entry(edge_name).or_default().push_back(index);
                    sim_debug!("(tick) {} appeared on the surface.", aircraft.id);
                }
            }
        }

        let active: Vec<usize> = self.aircraft_on_graph.iter().copied().collect();

        // 2. mutex candidate selection (phase I)
        let mut candidates: BTreeMap<String, usize> = BTreeMap::new();
        for &index in &active {
            let aircraft = &departures[index];
            if !self.near_check_point(graph, aircraft) {
                continue;
            }
            let vertex_name = &graph.vertex(graph.target(aircraft.current_edge())).name;
            if self.intersection_mutex.contains_key(vertex_name) {
                continue;
            }
            match candidates.get(vertex_name) {
                None => {
                    candidates.insert(vertex_name.clone(), index);
                }
                Some(&current) => {
                    let distance = departures[index].distance_to_next_point(graph);
                    let current_distance = departures[current].distance_to_next_point(graph);
                    let closer = distance < current_distance
                        || (distance == current_distance
                            && departures[index].id < departures[current].id);
                    if closer {
                        candidates.insert(vertex_name.clone(), index);
                    }
                }
            }
        }

        // 3. mutex grant and command issuance (phase II)
        for &index in &active {
            if !self.near_check_point(graph, &departures[index]) {
                continue;
            }
            let vertex_name = graph
                .vertex(graph.target(departures[index].current_edge()))
                .name
                .clone();

            if candidates.get(&vertex_name) == Some(&index)
                && !self.intersection_mutex.contains_key(&vertex_name)
            {
                self.intersection_mutex.insert(vertex_name.clone(), index);
            }

            if self.intersection_mutex.get(&vertex_name) == Some(&index) {
                departures[index].send_command(Command::Go);
            } else {
                if let Some(&owner) = self.intersection_mutex.get(&vertex_name) {
                    sim_debug!(
                        "(tick) {} held at {}, waiting for {}.",
                        departures[index].id,
                        vertex_name,
                        departures[owner].id
                    );
                }
                departures[index].send_command(Command::Stop);
            }
        }

        // 4. front-vehicle discovery
        self.update_fronter(graph, departures);

        // 5. advance
        for &index in &active {
            let leader = departures[index].prev_aircraft.map(|p| Leader {
                velocity: departures[p].velocity,
                a_brake: departures[p].model.a_brake,
            });
            motion::advance(
                &mut departures[index],
                leader,
                graph,
                self.tick_per_time_unit,
            );

            let passed = departures[index].passed_check_point.clone();
            for (hop, edge_name) in passed.iter().enumerate() {
                sim_debug!("(tick) {} passed {}.", departures[index].id, edge_name);

                let Some(edge) = graph.edge_by_name(edge_name) else {
                    continue;
                };
                let vertex_name = &graph.vertex(graph.target(edge)).name;
                // release the crossing this edge actually targets
                self.intersection_mutex.remove(vertex_name);

                if let Some(queue) = self.traffic.get_mut(edge_name) {
                    if queue.front() == Some(&index) {
                        queue.pop_front();
                    } else {
                        sim_warn!(
                            "(tick) {} crossed {} without being the queue front.",
                            departures[index].id,
                            edge_name
                        );
                        queue.retain(|&queued| queued != index);
                    }
                }

                // enter the next edge of the path before the next crossing
                // is handled, so every pop above matches an earlier push
                let entered_name = if hop + 1 < passed.len() {
                    Some(passed[hop + 1].clone())
                } else if !departures[index].ready_for_runway {
                    Some(graph.edge(departures[index].current_edge()).name.clone())
                } else {
                    None
                };
                if let Some(entered_name) = entered_name {
                    self.traffic.entry(entered_name).or_default().push_back(index);
                }
            }
        }

        // 6. runway removal
        for &index in &active {
            if departures[index].ready_for_runway {
                self.aircraft_on_graph.remove(&index);
                departures[index].actual_runway_time =
                    self.simulation_time as f64 / f64::from(self.tick_per_time_unit);
                self.completed_count += 1;
                sim_info!(
                    "(tick) {} reached its runway at {} ({} completed).",
                    departures[index].id,
                    departures[index].actual_runway_time,
                    self.completed_count
                );
            }
        }

        // 7. refresh fronts after the removals
        self.update_fronter(graph, departures);

        // 8. separation check
        let still_active: Vec<usize> = self.aircraft_on_graph.iter().copied().collect();
        for index in still_active {
            let aircraft = &departures[index];
            let Some(prev) = aircraft.prev_aircraft else {
                continue;
            };
            if !self.aircraft_on_graph.contains(&prev) {
                continue;
            }
            let leader = &departures[prev];
            if leader.current_edge() == aircraft.current_edge()
                && leader.pos.1 - aircraft.pos.1 < self.safety_distance
            {
                self.conflict_count += 1;
                self.handle_conflict(graph, aircraft, leader);
            }
        }

        // 9. clear commands
        for &index in &active {
            let aircraft = &mut departures[index];
            aircraft.prev_command = aircraft.command;
            aircraft.command = Command::No;
        }

        if log::log_enabled!(target: "app::simulation", log::Level::Debug) {
            for &index in self.aircraft_on_graph.iter() {
                let aircraft = &departures[index];
                sim_debug!(
                    "(tick) {} - loc: {} v: {} acc: {}.",
                    aircraft.id,
                    aircraft.position_str(graph),
                    aircraft.velocity,
                    aircraft.acceleration
                );
            }
        }

        // 10.
        self.simulation_time += 1;
    }

    /// Whether an aircraft is inside the mutex contention radius of its
    /// next check point.
    fn near_check_point(&self, graph: &AirportGraph, aircraft: &Aircraft) -> bool {
        aircraft.distance_to_next_point(graph) <= SAFETY_DISTANCE_CHECK_POINT
    }

    /// Set every active aircraft's `prev_aircraft` to the nearest aircraft
    /// ahead on its movement path, or none.
    ///
    /// Within an edge queue each member follows the one inserted before
    /// it. The queue front looks across the edges leaving its check
    /// point and follows the rearmost aircraft closest to the
    /// intersection.
    fn update_fronter(&mut self, graph: &AirportGraph, departures: &mut [Aircraft]) {
        for (edge_name, queue) in self.traffic.iter() {
            if queue.is_empty() {
                continue;
            }

            let mut ahead: Option<usize> = None;
            for &index in queue.iter() {
                if let Some(prev) = ahead {
                    departures[index].prev_aircraft = Some(prev);
                    departures[index].distance_to_prev =
                        departures[prev].pos.1 - departures[index].pos.1;
                }
                ahead = Some(index);
            }

            let Some(&front) = queue.front() else {
                continue;
            };
            let Some(edge) = graph.edge_by_name(edge_name) else {
                continue;
            };
            let check_point = graph.target(edge);

            let mut out_edges = graph.out_edges(check_point);
            out_edges.sort_by(|a, b| graph.edge(*a).name.cmp(&graph.edge(*b).name));

            let mut leader: Option<usize> = None;
            for out_edge in out_edges {
                let Some(queue) = self.traffic.get(&graph.edge(out_edge).name) else {
                    continue;
                };
                let Some(&candidate) = queue.back() else {
                    continue;
                };
                match leader {
                    None => leader = Some(candidate),
                    Some(current) => {
                        if departures[candidate].pos.1 < departures[current].pos.1 {
                            leader = Some(candidate);
                        }
                    }
                }
            }

            departures[front].prev_aircraft = leader;
            if let Some(leader) = leader {
                let to_check_point = graph.edge(edge).length - departures[front].pos.1;
                departures[front].distance_to_prev = to_check_point + departures[leader].pos.1;
            }
        }
    }

    /// Two aircraft on the same edge are closer than the separation
    /// minimum. Diagnostic only; the run continues.
    fn handle_conflict(&self, graph: &AirportGraph, follower: &Aircraft, leader: &Aircraft) {
        sim_warn!(
            "(handle_conflict) {} within {} of {} on {} (minimum {}).",
            follower.id,
            leader.pos.1 - follower.pos.1,
            leader.id,
            graph.edge(follower.current_edge()).name,
            self.safety_distance
        );
    }

    /// Ticks executed so far.
    pub fn simulation_time(&self) -> u64 {
        self.simulation_time
    }

    /// Aircraft currently on the surface, in arena order.
    pub fn active_aircraft(&self) -> Vec<usize> {
        self.aircraft_on_graph.iter().copied().collect()
    }

    /// The current holder of a crossing, if any.
    pub fn mutex_owner(&self, vertex_name: &str) -> Option<usize> {
        self.intersection_mutex.get(vertex_name).copied()
    }
}
