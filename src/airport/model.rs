//! Aircraft model definitions: performance envelope and taxi velocity
//! sampling.

use super::LoadError;
use rand::rngs::StdRng;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Tolerance for the probability mass sum check
const PROBABILITY_SUM_EPSILON: f64 = 1e-6;

/// A discrete categorical distribution over f64 values, stored as parallel
/// value/probability sequences. Sampling walks the cumulative distribution
/// with a single uniform draw, so one call consumes exactly one value from
/// the RNG stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteDistribution {
    values: Vec<f64>,
    probs: Vec<f64>,
}

impl DiscreteDistribution {
    /// Validate and build a distribution from parallel sequences.
    pub fn new(values: Vec<f64>, probs: Vec<f64>) -> Result<Self, LoadError> {
        if values.len() != probs.len() {
            return Err(LoadError::Distribution(format!(
                "{} values against {} probabilities",
                values.len(),
                probs.len()
            )));
        }
        if values.is_empty() {
            return Err(LoadError::Distribution(String::from("empty distribution")));
        }
        let total: f64 = probs.iter().sum();
        if (total - 1.0).abs() > PROBABILITY_SUM_EPSILON {
            return Err(LoadError::Distribution(format!(
                "probabilities sum to {total}, expected 1"
            )));
        }
        Ok(DiscreteDistribution { values, probs })
    }

    /// Draw one value. Consumes exactly one uniform draw from `rng`.
    pub fn sample(&self, rng: &mut StdRng) -> f64 {
        let u: f64 = rng.gen();
        let mut cumulative = 0.0;
        for (value, prob) in self.values.iter().zip(self.probs.iter()) {
            cumulative += prob;
            if u < cumulative {
                return *value;
            }
        }
        // rounding left the draw above the final cumulative bound
        *self.values.last().unwrap_or(&0.0)
    }

    /// The raw value sequence.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Performance envelope and taxi velocity distribution of one aircraft type.
#[derive(Debug, Clone)]
pub struct AircraftModel {
    /// Model name, unique within the model file
    pub name: String,

    /// Maximum taxi velocity, distance units per time unit
    pub v_max: f64,

    /// Maximum acceleration
    pub a_max: f64,

    /// Braking deceleration magnitude
    pub a_brake: f64,

    /// Following gap the car-following controller aims to keep
    pub safety_distance: f64,

    /// Taxi cruise velocity distribution
    pub velocity: DiscreteDistribution,
}

fn default_a_max() -> f64 {
    1.0
}

fn default_a_brake() -> f64 {
    2.0
}

fn default_safety_distance() -> f64 {
    10.0
}

/// One `models` entry as it appears in the model file.
#[derive(Debug, Deserialize)]
struct ModelSpec {
    name: String,
    v_max: f64,
    #[serde(default = "default_a_max")]
    a_max: f64,
    #[serde(default = "default_a_brake")]
    a_brake: f64,
    #[serde(default = "default_safety_distance")]
    safety_distance: f64,
    velocity: Vec<f64>,
    prob: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    models: Vec<ModelSpec>,
}

/// Load the aircraft model table from a YAML file.
///
/// Returns the models keyed by name; duplicate or malformed entries are
/// hard errors.
pub fn load_models(path: &Path) -> Result<HashMap<String, Arc<AircraftModel>>, LoadError> {
    let content = std::fs::read_to_string(path)?;
    let file: ModelFile = serde_yaml::from_str(&content)?;

    let mut models = HashMap::new();
    for spec in file.models {
        let velocity = DiscreteDistribution::new(spec.velocity, spec.prob).map_err(|e| {
            LoadError::Distribution(format!("model {}: {}", spec.name, e))
        })?;

        let model = AircraftModel {
            name: spec.name.clone(),
            v_max: spec.v_max,
            a_max: spec.a_max,
            a_brake: spec.a_brake,
            safety_distance: spec.safety_distance,
            velocity,
        };

        if models.insert(spec.name.clone(), Arc::new(model)).is_some() {
            return Err(LoadError::Parse(format!("duplicate model name {}", spec.name)));
        }
    }

    Ok(models)
}
