//! Departure scheduling: orders planning across aircraft and owns the
//! reservation table the planner searches against.

pub mod planner;
pub mod reservation;

use crate::airport::aircraft::Aircraft;
use crate::airport::graph::AirportGraph;
use crate::airport::model::DiscreteDistribution;
use crate::airport::LoadError;
use crate::config::Config;
use planner::Planner;
use rand::rngs::StdRng;
use reservation::{Interval, ReservationTable};

/// Insertion heuristic: the order in which aircraft are handed to the
/// planner. The two strategies differ only in their priority key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// First-come-first-served: sort by scheduled appearance time
    Fcfs,
    /// First-leave-first-served: sort by estimated unobstructed arrival
    /// at the runway
    Flfs,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Strategy::Fcfs => write!(f, "FCFS"),
            Strategy::Flfs => write!(f, "FLFS"),
        }
    }
}

/// Plans a population of departures one aircraft at a time, committing
/// each produced plan to the reservation table before the next query.
#[derive(Debug)]
pub struct Scheduler {
    safety_time: f64,
    gate_delay: DiscreteDistribution,
    runway_delay: DiscreteDistribution,
    planner: Planner,
    reservations: ReservationTable,
}

impl Scheduler {
    /// Build a scheduler from the run configuration.
    pub fn new(config: &Config) -> Result<Self, LoadError> {
        Ok(Scheduler {
            safety_time: config.safety_time,
            gate_delay: config.gate_delay()?,
            runway_delay: config.runway_delay()?,
            planner: Planner::new(config.wait_cost, config.wait_time, config.safety_time),
            reservations: ReservationTable::new(),
        })
    }

    /// Plan every departure under the given strategy. Aircraft the
    /// planner cannot serve are marked with infinite cost and skipped;
    /// scheduling continues with the rest.
    pub fn run(
        &mut self,
        graph: &AirportGraph,
        strategy: Strategy,
        departures: &mut [Aircraft],
        rng: &mut StdRng,
    ) {
        sched_info!(
            "(run) scheduling {} departures with {}.",
            departures.len(),
            strategy
        );

        self.reservations.clear();
        self.planner.reset_counters();

        // cruise velocities are drawn in arena order so the RNG stream
        // does not depend on the strategy's sort
        for aircraft in departures.iter_mut() {
            aircraft.cruise_velocity = aircraft.model.velocity.sample(rng);
        }

        for index in self.order(graph, strategy, departures) {
            let offset = self.gate_delay.sample(rng);
            let runway_hold = self.runway_delay.sample(rng);

            let aircraft = &mut departures[index];
            aircraft.actual_appear_time = aircraft.appear_time + offset;

            let earliest_start = match self.reservations.latest_end_at_vertex(aircraft.start) {
                Some(end) => aircraft.actual_appear_time.max(end),
                None => aircraft.actual_appear_time,
            };

            match self
                .planner
                .plan(graph, aircraft, earliest_start, &self.reservations)
            {
                Ok(plan) => {
                    aircraft.path = plan.path;
                    aircraft.cost = plan.cost;
                    aircraft.expected_runway_time = plan.expected_runway_time;
                    aircraft.pushback_time = aircraft.path[0].latest;

                    if let Err(e) = aircraft.rebuild_edge_path(graph) {
                        sched_error!(
                            "(run) {} produced an inconsistent plan: {}.",
                            aircraft.id,
                            e
                        );
                        aircraft.path.clear();
                        aircraft.edge_path.clear();
                        aircraft.cost = f64::INFINITY;
                        continue;
                    }

                    sched_debug!(
                        "(run) {} planned: pushback {}, runway {}, cost {}.",
                        aircraft.id,
                        aircraft.pushback_time,
                        aircraft.expected_runway_time,
                        aircraft.cost
                    );
                    self.commit(graph, &departures[index], runway_hold);
                }
                Err(e) => {
                    sched_warn!("(run) {}: {}; continuing without a plan.", aircraft.id, e);
                    aircraft.path.clear();
                    aircraft.edge_path.clear();
                    aircraft.cost = f64::INFINITY;
                    aircraft.pushback_time = 0.0;
                    aircraft.expected_runway_time = 0.0;
                }
            }
        }
    }

    /// Forget every plan and reservation so another strategy can run on
    /// the same departures.
    pub fn clear_plans(&mut self, departures: &mut [Aircraft]) {
        self.reservations.clear();
        for aircraft in departures.iter_mut() {
            aircraft.path.clear();
            aircraft.edge_path.clear();
            aircraft.cost = 0.0;
            aircraft.pushback_time = 0.0;
            aircraft.expected_runway_time = 0.0;
            aircraft.actual_appear_time = aircraft.appear_time;
        }
    }

    /// Scheduling order under a strategy; ties break by scheduled
    /// appearance time, then id.
    fn order(
        &mut self,
        graph: &AirportGraph,
        strategy: Strategy,
        departures: &[Aircraft],
    ) -> Vec<usize> {
        let mut order: Vec<usize> = (0..departures.len()).collect();
        match strategy {
            Strategy::Fcfs => {
                order.sort_by(|&a, &b| {
                    let (a, b) = (&departures[a], &departures[b]);
                    a.appear_time
                        .total_cmp(&b.appear_time)
                        .then_with(|| a.id.cmp(&b.id))
                });
            }
            Strategy::Flfs => {
                let estimates: Vec<f64> = departures
                    .iter()
                    .map(|a| {
                        self.planner.estimated_arrival(
                            graph,
                            a.start,
                            a.goal,
                            a.appear_time,
                            a.cruise_velocity,
                        )
                    })
                    .collect();
                order.sort_by(|&a, &b| {
                    estimates[a]
                        .total_cmp(&estimates[b])
                        .then_with(|| departures[a].appear_time.total_cmp(&departures[b].appear_time))
                        .then_with(|| departures[a].id.cmp(&departures[b].id))
                });
            }
        }
        order
    }

    /// Turn a committed plan into reservations: every traversal pads
    /// safety_time/2 on both sides of its edge and of the entered vertex,
    /// waits hold their vertex, the gate is held from scheduled
    /// appearance to pushback and the runway through the crossing delay.
    fn commit(&mut self, graph: &AirportGraph, aircraft: &Aircraft, runway_hold: f64) {
        let pad = self.safety_time / 2.0;

        for pair in aircraft.path.windows(2) {
            let (current, next) = (&pair[0], &pair[1]);
            if current.vertex == next.vertex {
                continue;
            }
            let Some(edge) = graph.edge_between(current.vertex, next.vertex) else {
                sched_error!(
                    "(commit) {} plan step without a connecting edge.",
                    aircraft.id
                );
                continue;
            };
            let interval = Interval::new(current.latest - pad, next.earliest + pad);
            self.reservations.reserve_edge(edge, interval);
            self.reservations.reserve_vertex(next.vertex, interval);
        }

        for state in &aircraft.path {
            if state.latest > state.earliest {
                self.reservations
                    .reserve_vertex(state.vertex, Interval::new(state.earliest, state.latest));
            }
        }

        self.reservations.reserve_vertex(
            aircraft.start,
            Interval::new(aircraft.appear_time, aircraft.pushback_time),
        );
        self.reservations.reserve_vertex(
            aircraft.goal,
            Interval::new(
                aircraft.expected_runway_time,
                aircraft.expected_runway_time + runway_hold,
            ),
        );
    }

    /// States popped by the planner during the last run.
    pub fn expanded_nodes(&self) -> u64 {
        self.planner.expanded_nodes
    }

    /// States generated by the planner during the last run.
    pub fn generated_nodes(&self) -> u64 {
        self.planner.generated_nodes
    }

    /// The reservation table of the last run (read-only).
    pub fn reservations(&self) -> &ReservationTable {
        &self.reservations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::airport::graph::{EdgeSpec, GraphSpec, VertexKind, VertexSpec};
    use crate::airport::model::{AircraftModel, DiscreteDistribution};
    use rand::SeedableRng;
    use std::sync::Arc;

    /// Two gates feeding one shared taxiway into a single runway.
    fn funnel_graph() -> AirportGraph {
        AirportGraph::from_spec(GraphSpec {
            vertices: vec![
                VertexSpec {
                    name: "G1".into(),
                    kind: VertexKind::Gate,
                    x: 0.0,
                    y: 0.0,
                },
                VertexSpec {
                    name: "G2".into(),
                    kind: VertexKind::Gate,
                    x: 0.0,
                    y: 50.0,
                },
                VertexSpec {
                    name: "S1".into(),
                    kind: VertexKind::Spot,
                    x: 50.0,
                    y: 25.0,
                },
                VertexSpec {
                    name: "R1".into(),
                    kind: VertexKind::Runway,
                    x: 150.0,
                    y: 25.0,
                },
            ],
            edges: vec![
                EdgeSpec {
                    name: "G1-S1".into(),
                    from: "G1".into(),
                    to: "S1".into(),
                    length: 50.0,
                    speed_limit: None,
                },
                EdgeSpec {
                    name: "G2-S1".into(),
                    from: "G2".into(),
                    to: "S1".into(),
                    length: 50.0,
                    speed_limit: None,
                },
                EdgeSpec {
                    name: "S1-R1".into(),
                    from: "S1".into(),
                    to: "R1".into(),
                    length: 100.0,
                    speed_limit: None,
                },
            ],
        })
        .unwrap()
    }

    fn test_config() -> Config {
        let mut config = Config::new();
        config.wait_cost = 1.0;
        config.wait_time = 1.0;
        config.safety_time = 2.0;
        config
    }

    fn departures(graph: &AirportGraph) -> Vec<Aircraft> {
        let model = Arc::new(AircraftModel {
            name: "B737".into(),
            v_max: 12.0,
            a_max: 1.0,
            a_brake: 2.0,
            safety_distance: 10.0,
            velocity: DiscreteDistribution::new(vec![10.0], vec![1.0]).unwrap(),
        });
        vec![
            Aircraft::new(
                0,
                graph.vertex_by_name("G1").unwrap(),
                graph.vertex_by_name("R1").unwrap(),
                0.0,
                model.clone(),
            ),
            Aircraft::new(
                1,
                graph.vertex_by_name("G2").unwrap(),
                graph.vertex_by_name("R1").unwrap(),
                0.0,
                model,
            ),
        ]
    }

    #[test]
    fn test_fcfs_separates_shared_edge_users() {
        let graph = funnel_graph();
        let mut fleet = departures(&graph);
        let mut scheduler = Scheduler::new(&test_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        scheduler.run(&graph, Strategy::Fcfs, &mut fleet, &mut rng);

        assert!(fleet.iter().all(|a| a.has_plan()));

        // the shared edge S1-R1 must carry disjoint padded intervals
        let shared = graph.edge_by_name("S1-R1").unwrap();
        let intervals = scheduler.reservations().edge_intervals(shared);
        assert_eq!(intervals.len(), 2);
        assert!(!intervals[0].overlaps(&intervals[1]));

        // the follower leaves the shared spot at least edge duration plus
        // safety time after the leader
        let mut spot_departures: Vec<f64> = fleet
            .iter()
            .map(|a| a.path[a.path.len() - 2].latest)
            .collect();
        spot_departures.sort_by(f64::total_cmp);
        assert!(spot_departures[1] - spot_departures[0] >= 10.0 + 2.0);
    }

    #[test]
    fn test_plans_start_and_end_where_they_should() {
        let graph = funnel_graph();
        let mut fleet = departures(&graph);
        let mut scheduler = Scheduler::new(&test_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        scheduler.run(&graph, Strategy::Flfs, &mut fleet, &mut rng);

        for aircraft in &fleet {
            assert_eq!(aircraft.path[0].vertex, aircraft.start);
            assert_eq!(aircraft.path.last().unwrap().vertex, aircraft.goal);
            assert!(aircraft
                .path
                .windows(2)
                .all(|p| p[0].latest <= p[1].earliest));
            assert!(aircraft.expected_runway_time > aircraft.pushback_time);
            assert!(aircraft.pushback_time >= aircraft.actual_appear_time);
            assert!(aircraft.actual_appear_time >= aircraft.appear_time);
        }
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let graph = funnel_graph();
        let config = test_config();

        let mut fleet_a = departures(&graph);
        let mut scheduler_a = Scheduler::new(&config).unwrap();
        let mut rng_a = StdRng::seed_from_u64(7);
        scheduler_a.run(&graph, Strategy::Fcfs, &mut fleet_a, &mut rng_a);

        let mut fleet_b = departures(&graph);
        let mut scheduler_b = Scheduler::new(&config).unwrap();
        let mut rng_b = StdRng::seed_from_u64(7);
        scheduler_b.run(&graph, Strategy::Fcfs, &mut fleet_b, &mut rng_b);

        for (a, b) in fleet_a.iter().zip(fleet_b.iter()) {
            assert_eq!(a.path, b.path);
            assert_eq!(a.cost, b.cost);
            assert_eq!(a.actual_appear_time, b.actual_appear_time);
            assert_eq!(a.expected_runway_time, b.expected_runway_time);
        }
    }

    #[test]
    fn test_unservable_aircraft_is_skipped_not_fatal() {
        let graph = funnel_graph();
        let mut fleet = departures(&graph);

        let mut config = test_config();
        config.safety_time = f64::INFINITY;
        let mut scheduler = Scheduler::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        scheduler.run(&graph, Strategy::Fcfs, &mut fleet, &mut rng);

        // the first aircraft gets an unconstrained table and plans fine;
        // the infinite padding then walls off the second
        assert!(fleet[0].has_plan());
        assert!(!fleet[1].has_plan());
        assert!(fleet[1].cost.is_infinite());
    }

    #[test]
    fn test_clear_plans_resets_everything() {
        let graph = funnel_graph();
        let mut fleet = departures(&graph);
        let mut scheduler = Scheduler::new(&test_config()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);

        scheduler.run(&graph, Strategy::Flfs, &mut fleet, &mut rng);
        scheduler.clear_plans(&mut fleet);

        for aircraft in &fleet {
            assert!(aircraft.path.is_empty());
            assert!(aircraft.edge_path.is_empty());
            assert_eq!(aircraft.cost, 0.0);
        }
        let shared = graph.edge_by_name("S1-R1").unwrap();
        assert!(scheduler.reservations().edge_intervals(shared).is_empty());
    }
}
