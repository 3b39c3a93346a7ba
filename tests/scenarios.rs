//! End-to-end scenarios: schedule, simulate and summarize small worlds
//! through the public library API.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use surface_scheduler::airport::aircraft::Aircraft;
use surface_scheduler::airport::graph::{AirportGraph, EdgeSpec, GraphSpec, VertexKind, VertexSpec};
use surface_scheduler::airport::instance::{DepartureSpec, InstanceSpec};
use surface_scheduler::airport::model::{AircraftModel, DiscreteDistribution};
use surface_scheduler::metrics::RunSummary;
use surface_scheduler::scheduler::{Scheduler, Strategy};
use surface_scheduler::simulation::Simulator;
use surface_scheduler::Config;

fn vertex(name: &str, kind: VertexKind, x: f64) -> VertexSpec {
    VertexSpec {
        name: name.into(),
        kind,
        x,
        y: 0.0,
    }
}

fn edge(from: &str, to: &str, length: f64) -> EdgeSpec {
    EdgeSpec {
        name: format!("{from}-{to}"),
        from: from.into(),
        to: to.into(),
        length,
        speed_limit: None,
    }
}

/// Two gates feeding one spot, one shared taxiway to the runway.
fn funnel_graph() -> AirportGraph {
    AirportGraph::from_spec(GraphSpec {
        vertices: vec![
            vertex("G1", VertexKind::Gate, 0.0),
            vertex("G2", VertexKind::Gate, 0.0),
            vertex("S1", VertexKind::Spot, 50.0),
            vertex("R1", VertexKind::Runway, 150.0),
        ],
        edges: vec![
            edge("G1", "S1", 50.0),
            edge("G2", "S1", 50.0),
            edge("S1", "R1", 100.0),
        ],
    })
    .unwrap()
}

fn line_graph() -> AirportGraph {
    AirportGraph::from_spec(GraphSpec {
        vertices: vec![
            vertex("G1", VertexKind::Gate, 0.0),
            vertex("I1", VertexKind::Intersection, 100.0),
            vertex("R1", VertexKind::Runway, 200.0),
        ],
        edges: vec![edge("G1", "I1", 100.0), edge("I1", "R1", 100.0)],
    })
    .unwrap()
}

fn fixed_model(cruise: f64) -> Arc<AircraftModel> {
    Arc::new(AircraftModel {
        name: "B737".into(),
        v_max: cruise * 1.2,
        a_max: 1.0,
        a_brake: 2.0,
        safety_distance: 5.0,
        velocity: DiscreteDistribution::new(vec![cruise], vec![1.0]).unwrap(),
    })
}

fn models(cruise: f64) -> HashMap<String, Arc<AircraftModel>> {
    let mut map = HashMap::new();
    map.insert("B737".to_string(), fixed_model(cruise));
    map
}

fn quiet_config() -> Config {
    let mut config = Config::new();
    config.wait_cost = 1.0;
    config.wait_time = 1.0;
    config.safety_time = 2.0;
    config.tick_per_time_unit = 10;
    config.safety_distance = 5.0;
    config
}

fn departure(gate: &str, runway: &str, appear_time: f64) -> DepartureSpec {
    DepartureSpec {
        gate: gate.into(),
        runway: runway.into(),
        appear_time,
        model: "B737".into(),
    }
}

fn shared_edge_fleet(graph: &AirportGraph) -> Vec<Aircraft> {
    InstanceSpec {
        departures: vec![departure("G1", "R1", 0.0), departure("G2", "R1", 0.0)],
    }
    .to_aircraft(graph, &models(10.0))
    .unwrap()
}

#[test]
fn scenario_shared_edge_forces_gate_wait() {
    let graph = funnel_graph();
    let config = quiet_config();

    for strategy in [Strategy::Fcfs, Strategy::Flfs] {
        let mut fleet = shared_edge_fleet(&graph);
        let mut scheduler = Scheduler::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(99);

        scheduler.run(&graph, strategy, &mut fleet, &mut rng);
        assert!(fleet.iter().all(|a| a.has_plan()), "{strategy}");

        // shared edge S1-R1: duration 10 at cruise 10, safety_time 2
        let mut leave_spot: Vec<f64> = fleet
            .iter()
            .map(|a| a.path[a.path.len() - 2].latest)
            .collect();
        leave_spot.sort_by(f64::total_cmp);
        assert!(
            leave_spot[1] - leave_spot[0] >= 10.0 + 2.0,
            "{strategy}: gap {} too small",
            leave_spot[1] - leave_spot[0]
        );

        let summary = RunSummary::from_departures(
            &strategy.to_string(),
            0.0,
            &fleet,
            scheduler.expanded_nodes(),
            scheduler.generated_nodes(),
            "shared-edge.yaml",
        );
        assert_eq!(summary.total_cost, fleet[0].cost + fleet[1].cost);
    }
}

#[test]
fn scenario_lone_aircraft_travels_without_waiting() {
    let graph = line_graph();
    let config = quiet_config();

    let mut fleet = InstanceSpec {
        departures: vec![departure("G1", "R1", 3.0)],
    }
    .to_aircraft(&graph, &models(10.0))
    .unwrap();

    let mut scheduler = Scheduler::new(&config).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    scheduler.run(&graph, Strategy::Fcfs, &mut fleet, &mut rng);

    let aircraft = &fleet[0];
    assert!(aircraft.has_plan());
    // two 100-unit edges at cruise 10
    assert_eq!(aircraft.expected_runway_time - aircraft.appear_time, 20.0);
    assert_eq!(aircraft.pushback_time, aircraft.appear_time);

    let summary = RunSummary::from_departures("FCFS", 0.0, &fleet, 0, 0, "lone.yaml");
    assert_eq!(summary.avg_wait_time, 0.0);
    assert_eq!(summary.avg_travel_time, 20.0);

    let mut simulator = Simulator::new(&config, &mut fleet);
    let outcome = simulator.run(&graph, &mut fleet);
    assert!(outcome.finished());
    assert_eq!(outcome.conflict_count, 0);
    assert!(fleet[0].actual_runway_time > 0.0);
}

#[test]
fn scenario_infeasible_aircraft_reports_infinite_cost() {
    let graph = funnel_graph();
    let mut config = quiet_config();
    config.safety_time = f64::INFINITY;

    // a nonzero appearance time on the doomed aircraft would show up as
    // a negative wait term if the averages ever counted it
    let mut fleet = InstanceSpec {
        departures: vec![departure("G1", "R1", 0.0), departure("G2", "R1", 4.0)],
    }
    .to_aircraft(&graph, &models(10.0))
    .unwrap();
    let mut scheduler = Scheduler::new(&config).unwrap();
    let mut rng = StdRng::seed_from_u64(17);
    scheduler.run(&graph, Strategy::Fcfs, &mut fleet, &mut rng);

    assert!(fleet[0].has_plan());
    assert!(!fleet[1].has_plan());
    assert!(fleet[1].cost.is_infinite());

    let summary = RunSummary::from_departures(
        "FCFS",
        0.0,
        &fleet,
        scheduler.expanded_nodes(),
        scheduler.generated_nodes(),
        "infeasible.yaml",
    );
    assert!(summary.total_cost.is_infinite());
    // only the planned aircraft is averaged
    assert_eq!(
        summary.avg_wait_time,
        fleet[0].pushback_time - fleet[0].appear_time
    );
    assert!(summary.avg_wait_time >= 0.0);
    assert_eq!(
        summary.avg_travel_time,
        fleet[0].expected_runway_time - fleet[0].pushback_time
    );
    assert_eq!(summary.makespan, fleet[0].expected_runway_time);

    let path = std::env::temp_dir().join(format!("surface-infeasible-{}.csv", std::process::id()));
    std::fs::remove_file(&path).ok();
    summary.append_to(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("inf"));
    std::fs::remove_file(path).ok();
}

#[test]
fn scenario_all_appends_flfs_then_fcfs() {
    let graph = funnel_graph();
    let config = quiet_config();
    let mut fleet = shared_edge_fleet(&graph);
    let mut scheduler = Scheduler::new(&config).unwrap();
    let mut rng = StdRng::seed_from_u64(23);

    let path = std::env::temp_dir().join(format!("surface-all-{}.csv", std::process::id()));
    std::fs::remove_file(&path).ok();

    for (round, strategy) in [Strategy::Flfs, Strategy::Fcfs].iter().enumerate() {
        if round > 0 {
            scheduler.clear_plans(&mut fleet);
        }
        scheduler.run(&graph, *strategy, &mut fleet, &mut rng);
        RunSummary::from_departures(
            &strategy.to_string(),
            0.0,
            &fleet,
            scheduler.expanded_nodes(),
            scheduler.generated_nodes(),
            "all-run.yaml",
        )
        .append_to(&path)
        .unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("FLFS,"));
    assert!(lines[1].starts_with("FCFS,"));
    assert!(lines.iter().all(|line| line.ends_with("all-run.yaml")));

    std::fs::remove_file(path).ok();
}

#[test]
fn scenario_same_seed_reruns_are_identical() {
    let graph = funnel_graph();
    let config = quiet_config();

    let run_once = |seed: u64| -> (Vec<Aircraft>, RunSummary) {
        let mut fleet = shared_edge_fleet(&graph);
        let mut scheduler = Scheduler::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        scheduler.run(&graph, Strategy::Fcfs, &mut fleet, &mut rng);

        let mut simulator = Simulator::new(&config, &mut fleet);
        simulator.run(&graph, &mut fleet);

        let summary = RunSummary::from_departures(
            "FCFS",
            0.0,
            &fleet,
            scheduler.expanded_nodes(),
            scheduler.generated_nodes(),
            "deterministic.yaml",
        );
        (fleet, summary)
    };

    let (fleet_a, summary_a) = run_once(1234);
    let (fleet_b, summary_b) = run_once(1234);

    assert_eq!(summary_a, summary_b);
    for (a, b) in fleet_a.iter().zip(fleet_b.iter()) {
        assert_eq!(a.path, b.path);
        assert_eq!(a.cost, b.cost);
        assert_eq!(a.actual_runway_time, b.actual_runway_time);
        assert_eq!(a.stop_received, b.stop_received);
        assert_eq!(a.wait_tick, b.wait_tick);
    }
}
