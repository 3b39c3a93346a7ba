//! Longitudinal control: car-following acceleration law and per-tick
//! position advancement along the planned edge path.

use crate::airport::aircraft::{Aircraft, Command};
use crate::airport::graph::AirportGraph;

/// Kinematic snapshot of the vehicle ahead, taken before the follower
/// moves.
#[derive(Debug, Clone, Copy)]
pub struct Leader {
    pub velocity: f64,
    pub a_brake: f64,
}

/// New velocity for this tick, and the acceleration behind it.
///
/// Under a STOP command the aircraft brakes flat out. With no leader it
/// accelerates flat out. Behind a leader, the available headroom assuming
/// the leader brakes to a stop is
/// `h = d + v_other^2 / (2 a_brake_other) - safety_distance`, and the
/// largest acceleration that still allows stopping within `h` solves
/// `2T^2 x^2 + (a_brake T^2 + 2vT) x + (v^2 + 2 a_brake (vT - h)) = 0`.
fn target_velocity(aircraft: &mut Aircraft, leader: Option<Leader>, t: f64) -> f64 {
    if aircraft.command == Command::Stop {
        if aircraft.prev_command != Command::Stop {
            aircraft.stop_received += 1;
        }
        aircraft.wait_tick += 1;

        aircraft.acceleration = -aircraft.model.a_brake;
        return aircraft.velocity + aircraft.acceleration * t;
    }

    let Some(leader) = leader else {
        aircraft.acceleration = aircraft.model.a_max;
        return aircraft.velocity + aircraft.acceleration * t;
    };

    let a_brake = aircraft.model.a_brake;
    let velocity = aircraft.velocity;
    let headroom = aircraft.distance_to_prev + leader.velocity * leader.velocity / (2.0 * leader.a_brake)
        - aircraft.model.safety_distance;

    let a_eq = 2.0 * t * t;
    let b_eq = a_brake * t * t + 2.0 * velocity * t;
    let c_eq = velocity * velocity + 2.0 * a_brake * (velocity * t - headroom);

    let discriminant = b_eq * b_eq - 4.0 * a_eq * c_eq;
    let acc = if discriminant < 0.0 {
        // even flat-out braking cannot keep the gap
        -a_brake
    } else {
        (-b_eq + discriminant.sqrt()) / (2.0 * a_eq)
    };

    aircraft.acceleration = acc.clamp(-a_brake, aircraft.model.a_max);
    aircraft.velocity + aircraft.acceleration * t
}

/// Advance one aircraft by one tick: apply the acceleration law, clamp
/// the velocity to `[0, v_max]`, move along the edge path and record
/// every check point crossed. Overshooting the final edge raises
/// `ready_for_runway` while the position stays on that edge.
pub fn advance(
    aircraft: &mut Aircraft,
    leader: Option<Leader>,
    graph: &AirportGraph,
    tick_per_time_unit: u32,
) {
    aircraft.passed_check_point.clear();
    let t = 1.0 / f64::from(tick_per_time_unit);

    let mut velocity = target_velocity(aircraft, leader, t);
    if velocity > aircraft.model.v_max {
        velocity = aircraft.model.v_max;
    }
    if velocity < 0.0 {
        velocity = 0.0;
    }
    if velocity == 0.0 {
        aircraft.zero_velocity_tick += 1;
    }
    aircraft.velocity = velocity;

    let mut edge_index = aircraft.pos.0;
    let mut distance = aircraft.pos.1 + velocity * t;

    while edge_index + 1 < aircraft.edge_path.len()
        && distance > graph.edge(aircraft.edge_path[edge_index]).length
    {
        distance -= graph.edge(aircraft.edge_path[edge_index]).length;
        aircraft
            .passed_check_point
            .push(graph.edge(aircraft.edge_path[edge_index]).name.clone());
        edge_index += 1;
    }
    if distance > graph.edge(aircraft.edge_path[edge_index]).length {
        aircraft
            .passed_check_point
            .push(graph.edge(aircraft.edge_path[edge_index]).name.clone());
        // arrived at the runway; keep pos on the last real edge
        aircraft.ready_for_runway = true;
    }

    aircraft.pos = (edge_index, distance);
}
