//! Loading and validating simulation configurations.

use crate::network::{Network, NetworkDesc};
use crate::params::{Parameters, Policy};
use crate::presets::{crossroads, three_tee, CrossroadsLayout, ThreeTeeLayout};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A complete simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub params: Parameters,
    pub network: NetworkDesc,
}

impl Config {
    /// The three T-junction reference scenario.
    pub fn three_tee() -> Self {
        let params = Parameters::default();
        let network = three_tee(&ThreeTeeLayout::default(), &params.geometry);
        Self { params, network }
    }

    /// A single signalled crossroads running a fixed-time plan.
    pub fn crossroads() -> Self {
        let mut params = Parameters::default();
        params.timing.policy = Policy::Fixed;
        let network = crossroads(&CrossroadsLayout::default(), &params.geometry);
        Self { params, network }
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialises the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the configuration without keeping the compiled network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile().map(|_| ())
    }

    /// Validates the parameters and compiles the network.
    pub fn compile(&self) -> Result<Network, ConfigError> {
        self.params.validate()?;
        Network::compile(&self.network, &self.params)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn presets_are_valid() {
        Config::three_tee().validate().unwrap();
        Config::crossroads().validate().unwrap();
    }

    #[test]
    fn json_round_trip_preserves_config() {
        let config = Config::three_tee();
        let parsed = Config::from_json_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed.params, config.params);
        assert_eq!(parsed.network.intersections, config.network.intersections);
        let names = |c: &Config| c.network.segments.iter().map(|s| s.name.clone()).collect::<Vec<_>>();
        assert_eq!(names(&parsed), names(&config));
        parsed.validate().unwrap();
    }

    #[test]
    fn params_default_when_omitted() {
        let json = r#"{
            "network": {
                "intersections": [
                    { "name": "x", "centre": { "x": 0.0, "y": 0.0 } }
                ],
                "segments": [
                    {
                        "name": "in",
                        "lane_point": { "x": -100.0, "y": -3.0 },
                        "direction": { "x": 2.0, "y": 0.0 },
                        "arrival": {
                            "rate": 0.1,
                            "spawn": { "x": -100.0, "y": -3.0 },
                            "movements": [
                                { "turn": "S", "probability": 1.0, "goal": { "x": 100.0, "y": -3.0 } }
                            ]
                        }
                    }
                ]
            }
        }"#;
        let config = Config::from_json_str(json).unwrap();
        assert_eq!(config.params, Parameters::default());
        let network = config.compile().unwrap();
        let id = network.segment_id("in").unwrap();
        assert_eq!(network.segment(id).lane().dir.x, 1.0);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Config::from_json_str("{ \"network\": 3 }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            Config::load("/nonexistent/config.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
