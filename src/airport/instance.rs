//! Departure instance files: loading, random generation and saving.

use super::aircraft::Aircraft;
use super::graph::AirportGraph;
use super::model::AircraftModel;
use super::LoadError;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One `departures` entry of an instance file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartureSpec {
    /// Gate vertex name
    pub gate: String,
    /// Runway vertex name
    pub runway: String,
    /// Scheduled appearance time
    pub appear_time: f64,
    /// Aircraft model name
    pub model: String,
}

/// On-disk shape of a departure instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub departures: Vec<DepartureSpec>,
}

impl InstanceSpec {
    /// Load an instance from its YAML file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Write the instance to a YAML file.
    pub fn save(&self, path: &Path) -> Result<(), LoadError> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Resolve vertex and model names into departure records. Unknown
    /// names are hard errors.
    pub fn to_aircraft(
        &self,
        graph: &AirportGraph,
        models: &HashMap<String, Arc<AircraftModel>>,
    ) -> Result<Vec<Aircraft>, LoadError> {
        let mut departures = vec![];
        for (index, spec) in self.departures.iter().enumerate() {
            let Some(start) = graph.vertex_by_name(&spec.gate) else {
                sched_error!("(to_aircraft) unknown gate {}.", spec.gate);
                return Err(LoadError::UnknownVertex(spec.gate.clone()));
            };
            let Some(goal) = graph.vertex_by_name(&spec.runway) else {
                sched_error!("(to_aircraft) unknown runway {}.", spec.runway);
                return Err(LoadError::UnknownVertex(spec.runway.clone()));
            };
            let Some(model) = models.get(&spec.model) else {
                sched_error!("(to_aircraft) unknown model {}.", spec.model);
                return Err(LoadError::UnknownModel(spec.model.clone()));
            };

            departures.push(Aircraft::new(
                index,
                start,
                goal,
                spec.appear_time,
                model.clone(),
            ));
        }
        Ok(departures)
    }
}

/// Draw a random departure instance: random gate, runway and model per
/// flight; the first flight appears at time zero and each later one
/// follows its predecessor by a uniform draw from
/// `[interval_min, interval_max)`.
pub fn generate_instance(
    graph: &AirportGraph,
    models: &HashMap<String, Arc<AircraftModel>>,
    agent_num: usize,
    interval_min: u32,
    interval_max: u32,
    rng: &mut StdRng,
) -> Result<InstanceSpec, LoadError> {
    if graph.gates().is_empty() || graph.runways().is_empty() {
        return Err(LoadError::Config(String::from(
            "graph has no gates or no runways to draw from",
        )));
    }
    if models.is_empty() {
        return Err(LoadError::Config(String::from("no aircraft models loaded")));
    }

    // stable draw order for model names
    let mut model_names: Vec<&String> = models.keys().collect();
    model_names.sort();

    let mut spec = InstanceSpec::default();
    let mut appear_time = 0.0;
    for i in 0..agent_num {
        if i > 0 {
            let gap = if interval_max > interval_min {
                rng.gen_range(interval_min..interval_max)
            } else {
                interval_min
            };
            appear_time += gap as f64;
        }

        let gate = graph.gates()[rng.gen_range(0..graph.gates().len())];
        let runway = graph.runways()[rng.gen_range(0..graph.runways().len())];
        let model = model_names[rng.gen_range(0..model_names.len())];

        spec.departures.push(DepartureSpec {
            gate: graph.vertex(gate).name.clone(),
            runway: graph.vertex(runway).name.clone(),
            appear_time,
            model: model.clone(),
        });
    }

    Ok(spec)
}
