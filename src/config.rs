//! # Config
//!
//! Define and implement config options for a scheduling run

use crate::airport::model::DiscreteDistribution;
use crate::airport::LoadError;
use config::{Environment, File};
use dotenv::dotenv;
use serde::Deserialize;
use std::path::Path;

/// struct holding configuration options
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// planner cost of one waited time unit relative to one travelled time unit
    pub wait_cost: f64,

    /// duration of a single planner wait action, in scheduling time units
    pub wait_time: f64,

    /// temporal padding added around every reservation interval
    pub safety_time: f64,

    /// simulator resolution: ticks per scheduling time unit
    pub tick_per_time_unit: u32,

    /// minimum along-edge gap between two aircraft on the same edge
    pub safety_distance: f64,

    /// delay offsets drawn at gate pushback
    pub gate_delay_time: Vec<f64>,
    /// probabilities matching `gate_delay_time`
    pub gate_delay_prob: Vec<f64>,

    /// delay offsets drawn for the runway crossing hold
    pub runway_delay_time: Vec<f64>,
    /// probabilities matching `runway_delay_time`
    pub runway_delay_prob: Vec<f64>,

    /// path to log configuration YAML file
    #[serde(default = "default_log_config")]
    pub log_config: String,
}

fn default_log_config() -> String {
    String::from("log4rs.yaml")
}

impl Default for Config {
    fn default() -> Self {
        log::warn!("(default) Creating Config object with default values.");
        Self::new()
    }
}

impl Config {
    /// Default values for Config
    pub fn new() -> Self {
        Config {
            wait_cost: 1.0,
            wait_time: 1.0,
            safety_time: 2.0,
            tick_per_time_unit: 10,
            safety_distance: 5.0,
            gate_delay_time: vec![0.0],
            gate_delay_prob: vec![1.0],
            runway_delay_time: vec![0.0],
            runway_delay_prob: vec![1.0],
            log_config: default_log_config(),
        }
    }

    /// Create a new `Config` object from the `config` section of a YAML file,
    /// with environment variables (`CONFIG__<KEY>`) layered on top.
    pub fn try_from_file(path: &Path) -> Result<Self, LoadError> {
        // read .env file if present
        dotenv().ok();

        let settings = config::Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::default().separator("__"))
            .build()
            .map_err(|e| LoadError::Config(e.to_string()))?;

        let config: Config = settings
            .get("config")
            .map_err(|e| LoadError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Build the gate pushback delay distribution
    pub fn gate_delay(&self) -> Result<DiscreteDistribution, LoadError> {
        DiscreteDistribution::new(self.gate_delay_time.clone(), self.gate_delay_prob.clone())
    }

    /// Build the runway crossing delay distribution
    pub fn runway_delay(&self) -> Result<DiscreteDistribution, LoadError> {
        DiscreteDistribution::new(self.runway_delay_time.clone(), self.runway_delay_prob.clone())
    }

    fn validate(&self) -> Result<(), LoadError> {
        if self.gate_delay_time.len() != self.gate_delay_prob.len() {
            return Err(LoadError::Distribution(String::from(
                "gate_delay_time and gate_delay_prob differ in length",
            )));
        }
        if self.runway_delay_time.len() != self.runway_delay_prob.len() {
            return Err(LoadError::Distribution(String::from(
                "runway_delay_time and runway_delay_prob differ in length",
            )));
        }
        if self.tick_per_time_unit == 0 {
            return Err(LoadError::Config(String::from(
                "tick_per_time_unit must be positive",
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn write_config(body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("surface-config-{}.yaml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_config_from_default() {
        let config = Config::new();

        assert_eq!(config.wait_cost, 1.0);
        assert_eq!(config.tick_per_time_unit, 10);
        assert_eq!(config.gate_delay_time.len(), config.gate_delay_prob.len());
        assert_eq!(config.log_config, String::from("log4rs.yaml"));
    }

    #[test]
    #[serial]
    fn test_config_from_file() {
        let path = write_config(
            "config:\n\
            \x20 wait_cost: 2.0\n\
            \x20 wait_time: 1.0\n\
            \x20 safety_time: 3.0\n\
            \x20 tick_per_time_unit: 20\n\
            \x20 safety_distance: 4.0\n\
            \x20 gate_delay_time: [0.0, 1.0]\n\
            \x20 gate_delay_prob: [0.5, 0.5]\n\
            \x20 runway_delay_time: [0.0]\n\
            \x20 runway_delay_prob: [1.0]\n",
        );

        let config = Config::try_from_file(&path).unwrap();
        assert_eq!(config.wait_cost, 2.0);
        assert_eq!(config.tick_per_time_unit, 20);
        assert_eq!(config.log_config, String::from("log4rs.yaml"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    #[serial]
    fn test_config_rejects_length_mismatch() {
        let path = write_config(
            "config:\n\
            \x20 wait_cost: 1.0\n\
            \x20 wait_time: 1.0\n\
            \x20 safety_time: 3.0\n\
            \x20 tick_per_time_unit: 20\n\
            \x20 safety_distance: 4.0\n\
            \x20 gate_delay_time: [0.0, 1.0]\n\
            \x20 gate_delay_prob: [1.0]\n\
            \x20 runway_delay_time: [0.0]\n\
            \x20 runway_delay_prob: [1.0]\n",
        );

        let result = Config::try_from_file(&path);
        assert!(result.is_err());

        std::fs::remove_file(path).ok();
    }
}
