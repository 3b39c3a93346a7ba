//! Per-run summary derived from the scheduled departures, appended as one
//! CSV row per solver run.

use crate::airport::aircraft::Aircraft;
use serde::Serialize;
use std::path::Path;

/// One output row:
/// `solver,runtime,avg_wait_time,avg_travel_time,total_cost,makespan,expanded_nodes,generated_nodes,instance_file`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub solver: String,
    /// Scheduling wall time in seconds
    pub runtime: f64,
    pub avg_wait_time: f64,
    pub avg_travel_time: f64,
    pub total_cost: f64,
    pub makespan: f64,
    pub expanded_nodes: u64,
    pub generated_nodes: u64,
    pub instance_file: String,
}

impl RunSummary {
    /// Fold the scheduled departures into a summary row. Aircraft without
    /// a plan contribute their infinite cost, so a partially served
    /// instance is visible in the row; they carry no pushback or runway
    /// times and are left out of the wait/travel averages.
    pub fn from_departures(
        solver: &str,
        runtime: f64,
        departures: &[Aircraft],
        expanded_nodes: u64,
        generated_nodes: u64,
        instance_file: &str,
    ) -> Self {
        let mut wait_time = 0.0;
        let mut travel_time = 0.0;
        let mut total_cost = 0.0;
        let mut makespan = 0.0_f64;
        let mut planned = 0_usize;

        for aircraft in departures {
            total_cost += aircraft.cost;
            if aircraft.cost.is_infinite() {
                continue;
            }
            wait_time += aircraft.pushback_time - aircraft.appear_time;
            travel_time += aircraft.expected_runway_time - aircraft.pushback_time;
            makespan = makespan.max(aircraft.expected_runway_time);
            planned += 1;
        }

        let count = planned.max(1) as f64;
        RunSummary {
            solver: solver.to_string(),
            runtime,
            avg_wait_time: wait_time / count,
            avg_travel_time: travel_time / count,
            total_cost,
            makespan,
            expanded_nodes,
            generated_nodes,
            instance_file: instance_file.to_string(),
        }
    }

    /// Append this row to the output file, creating it when missing.
    pub fn append_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(self)?;
        writer.flush()?;
        Ok(())
    }
}
