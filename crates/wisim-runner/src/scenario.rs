//! Scenario parameters, the scenario trait, and the built-in registry.
//!
//! A scenario turns a [`ScenarioConfig`] and an optional map document into a
//! [`Simulation`](crate::Simulation) ready for the event loop. Parameters load
//! from YAML with every field optional; unknown keys are rejected so typos
//! surface instead of silently falling back to defaults.

use std::io;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use wisim_agents::{Bounds, HandoverConfig};
use wisim_common::SimTime;
use wisim_link::{LinkEstimationError, PathLossConfig};
use wisim_metrics::{metric_defs, metrics};
use wisim_model::{build_environment, parse_file, BuildReport, DocumentError, ScenarioEnvironment};

use crate::Simulation;

/// Tunable parameters shared by all scenarios.
///
/// Defaults describe the reference hall: a 50 m by 30 m floor with five
/// access points and 25 walking stations.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Number of walking stations.
    pub pedestrians: usize,
    /// Simulated run length in seconds.
    pub duration_secs: f64,
    /// Hall width in meters.
    pub hall_width_m: f64,
    /// Hall height in meters.
    pub hall_height_m: f64,
    /// Access points to synthesize when the map provides none.
    pub access_points: usize,

    /// A candidate AP must beat the serving AP by more than this to win.
    pub hysteresis_margin_db: f64,
    /// Transmit power fed to the propagation model.
    pub tx_power_dbm: f64,
    /// Log-distance path loss exponent.
    pub path_loss_exponent: f64,
    /// Seconds between handover evaluation ticks.
    pub tick_period_secs: f64,
    /// Seconds a station stays pinned to its new AP after a handover.
    pub cooldown_secs: f64,

    /// Seconds between pedestrian movement steps.
    pub step_period_secs: f64,
    /// Random-walk speed range, lower bound.
    pub min_speed_mps: f64,
    /// Random-walk speed range, upper bound.
    pub max_speed_mps: f64,
    /// Seconds a random walker keeps its heading.
    pub direction_hold_secs: f64,

    /// Gauss-Markov memory factor in `[0, 1]`.
    pub gauss_markov_alpha: f64,
    /// Gauss-Markov mean speed.
    pub mean_speed_mps: f64,
    /// Gauss-Markov speed noise.
    pub speed_std_dev: f64,
    /// Gauss-Markov direction noise in radians.
    pub direction_std_dev: f64,

    /// Waypoint walking speed for the door-to-door scenario.
    pub walk_speed_mps: f64,
    /// Seconds spent at a seat before walking on.
    pub door_dwell_secs: f64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            pedestrians: 25,
            duration_secs: 60.0,
            hall_width_m: 50.0,
            hall_height_m: 30.0,
            access_points: 5,
            hysteresis_margin_db: 5.0,
            tx_power_dbm: 20.0,
            path_loss_exponent: 3.0,
            tick_period_secs: 1.0,
            cooldown_secs: 5.0,
            step_period_secs: 1.0,
            min_speed_mps: 0.5,
            max_speed_mps: 1.5,
            direction_hold_secs: 5.0,
            gauss_markov_alpha: 0.85,
            mean_speed_mps: 1.0,
            speed_std_dev: 0.25,
            direction_std_dev: 0.4,
            walk_speed_mps: 1.2,
            door_dwell_secs: 5.0,
        }
    }
}

impl ScenarioConfig {
    /// Simulated end of the run.
    pub fn end_time(&self) -> SimTime {
        SimTime::from_secs(self.duration_secs)
    }

    /// Hall extents as mobility bounds.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.hall_width_m, self.hall_height_m)
    }

    /// Engine configuration derived from the radio parameters.
    pub fn handover(&self) -> Result<HandoverConfig, BuildScenarioError> {
        Ok(HandoverConfig {
            hysteresis_margin_db: self.hysteresis_margin_db,
            path_loss: PathLossConfig::new(self.tx_power_dbm, self.path_loss_exponent)?,
            tick_period: SimTime::from_secs(self.tick_period_secs),
            cooldown: SimTime::from_secs(self.cooldown_secs),
            end_time: self.end_time(),
        })
    }
}

/// Failure to load a scenario parameter file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}'")]
    NotFound {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("malformed config file")]
    Malformed(#[from] serde_yaml::Error),
}

/// Load scenario parameters from a YAML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ScenarioConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::NotFound {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_yaml::from_str(&text)?)
}

/// Failure to assemble a simulation from a scenario.
#[derive(Debug, Error)]
pub enum BuildScenarioError {
    /// The scenario needs map content the environment does not provide.
    #[error("scenario requires {0}")]
    MissingEnvironment(&'static str),
    /// A parameter combination the scenario cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Link(#[from] LinkEstimationError),
}

/// A named recipe for assembling a simulation.
pub trait Scenario {
    /// Stable name used on the command line.
    fn name(&self) -> &'static str;

    /// One-line description for `wisim list`.
    fn description(&self) -> &'static str;

    /// Assemble entities and seed events for one run.
    fn build(
        &self,
        config: &ScenarioConfig,
        environment: &ScenarioEnvironment,
        seed: u64,
    ) -> Result<Simulation, BuildScenarioError>;
}

/// Lookup table of available scenarios.
pub struct ScenarioRegistry {
    scenarios: Vec<Box<dyn Scenario>>,
}

impl ScenarioRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        ScenarioRegistry {
            scenarios: Vec::new(),
        }
    }

    /// The registry with all built-in scenarios.
    pub fn builtin() -> Self {
        let mut registry = ScenarioRegistry::new();
        registry.register(Box::new(crate::scenarios::IndoorHandover));
        registry.register(Box::new(crate::scenarios::GaussMarkovHall));
        registry.register(Box::new(crate::scenarios::DoorToDoor));
        registry
    }

    /// Add a scenario. Later registrations shadow earlier ones with the same
    /// name in `get`.
    pub fn register(&mut self, scenario: Box<dyn Scenario>) {
        self.scenarios.push(scenario);
    }

    /// Find a scenario by name.
    pub fn get(&self, name: &str) -> Option<&dyn Scenario> {
        self.scenarios
            .iter()
            .rev()
            .find(|s| s.name() == name)
            .map(|s| s.as_ref())
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.scenarios.iter().map(|s| s.name()).collect()
    }

    /// Iterate registered scenarios.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Scenario> {
        self.scenarios.iter().map(|s| s.as_ref())
    }
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        ScenarioRegistry::builtin()
    }
}

/// Parse a map document and build the scenario environment from it.
///
/// Feature counts land in the scenario metrics; builder warnings are logged
/// rather than treated as fatal.
pub fn load_environment(
    path: impl AsRef<Path>,
) -> Result<(ScenarioEnvironment, BuildReport), DocumentError> {
    let outcome = parse_file(path)?;
    metrics::counter!(metric_defs::SCENARIO_FEATURES_PARSED.name)
        .increment(outcome.features.len() as u64);
    metrics::counter!(metric_defs::SCENARIO_FEATURES_DROPPED.name).increment(outcome.dropped as u64);

    let (environment, report) = build_environment(outcome.features);
    for warning in &report.warnings {
        warn!("map: {}", warning);
    }
    Ok((environment, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScenarioConfig::default();
        assert_eq!(config.pedestrians, 25);
        assert_eq!(config.duration_secs, 60.0);
        assert_eq!(config.access_points, 5);
        assert_eq!(config.hysteresis_margin_db, 5.0);
        assert_eq!(config.cooldown_secs, 5.0);

        let bounds = config.bounds();
        assert_eq!(bounds.width, 50.0);
        assert_eq!(bounds.height, 30.0);
        assert_eq!(config.end_time(), SimTime::from_secs(60.0));
    }

    #[test]
    fn test_partial_yaml_overrides_defaults() {
        let yaml = "pedestrians: 4\nduration_secs: 10\nhysteresis_margin_db: 3.5\n";
        let config: ScenarioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.pedestrians, 4);
        assert_eq!(config.duration_secs, 10.0);
        assert_eq!(config.hysteresis_margin_db, 3.5);
        // Untouched fields keep their defaults.
        assert_eq!(config.access_points, 5);
        assert_eq!(config.step_period_secs, 1.0);
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let yaml = "pedestrains: 4\n";
        assert!(serde_yaml::from_str::<ScenarioConfig>(yaml).is_err());
    }

    #[test]
    fn test_handover_config_derivation() {
        let config = ScenarioConfig::default();
        let handover = config.handover().unwrap();
        assert_eq!(handover.hysteresis_margin_db, 5.0);
        assert_eq!(handover.tick_period, SimTime::from_secs(1.0));
        assert_eq!(handover.cooldown, SimTime::from_secs(5.0));
        assert_eq!(handover.end_time, SimTime::from_secs(60.0));
    }

    #[test]
    fn test_invalid_path_loss_exponent_is_rejected() {
        let config = ScenarioConfig {
            path_loss_exponent: 0.0,
            ..ScenarioConfig::default()
        };
        assert!(matches!(
            config.handover(),
            Err(BuildScenarioError::Link(_))
        ));
    }

    #[test]
    fn test_load_config_missing_file() {
        match load_config("/nonexistent/params.yaml") {
            Err(ConfigError::NotFound { path, .. }) => {
                assert!(path.contains("params.yaml"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ScenarioRegistry::builtin();
        let names = registry.names();
        assert_eq!(names, vec!["indoor-handover", "gauss-markov", "door-to-door"]);

        assert!(registry.get("indoor-handover").is_some());
        assert!(registry.get("no-such-scenario").is_none());
    }

    #[test]
    fn test_registered_scenario_shadows_builtin() {
        struct Shadow;
        impl Scenario for Shadow {
            fn name(&self) -> &'static str {
                "indoor-handover"
            }
            fn description(&self) -> &'static str {
                "replacement"
            }
            fn build(
                &self,
                _config: &ScenarioConfig,
                _environment: &ScenarioEnvironment,
                _seed: u64,
            ) -> Result<Simulation, BuildScenarioError> {
                Err(BuildScenarioError::InvalidConfig("shadow".to_string()))
            }
        }

        let mut registry = ScenarioRegistry::builtin();
        registry.register(Box::new(Shadow));
        let found = registry.get("indoor-handover").unwrap();
        assert_eq!(found.description(), "replacement");
    }
}
