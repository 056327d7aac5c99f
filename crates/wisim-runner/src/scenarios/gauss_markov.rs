//! Gauss-Markov mobility between access points at the hall ends.

use std::f64::consts::PI;

use rand::Rng;
use wisim_agents::{GaussMarkovConfig, GaussMarkovModel, MobilityModel};
use wisim_common::Position;
use wisim_model::ScenarioEnvironment;

use super::{ap_positions_from, assemble, placement_rng};
use crate::scenario::{BuildScenarioError, Scenario, ScenarioConfig};
use crate::Simulation;

/// Offset of the default end-of-hall APs from the side walls, in meters.
const AP_WALL_OFFSET_M: f64 = 5.0;

/// Stations drift under correlated speed and heading. Half the stations
/// trend toward one end of the hall, half toward the other, producing
/// sustained traffic across the AP boundary.
pub struct GaussMarkovHall;

impl Scenario for GaussMarkovHall {
    fn name(&self) -> &'static str {
        "gauss-markov"
    }

    fn description(&self) -> &'static str {
        "correlated drift between access points at the hall ends"
    }

    fn build(
        &self,
        config: &ScenarioConfig,
        environment: &ScenarioEnvironment,
        seed: u64,
    ) -> Result<Simulation, BuildScenarioError> {
        let bounds = config.bounds();
        let ap_positions = ap_positions_from(environment, || {
            vec![
                Position::new(AP_WALL_OFFSET_M, bounds.height / 2.0),
                Position::new(bounds.width - AP_WALL_OFFSET_M, bounds.height / 2.0),
            ]
        });

        let mut rng = placement_rng(seed);
        let mut walkers: Vec<(Position, Box<dyn MobilityModel>)> =
            Vec::with_capacity(config.pedestrians);
        for index in 0..config.pedestrians {
            let start = Position::new(
                rng.gen_range(0.0..bounds.width),
                rng.gen_range(0.0..bounds.height),
            );
            let mean_direction_rad = if index % 2 == 0 { 0.0 } else { PI };
            let drift = GaussMarkovConfig {
                alpha: config.gauss_markov_alpha,
                mean_speed_mps: config.mean_speed_mps,
                mean_direction_rad,
                speed_std_dev: config.speed_std_dev,
                direction_std_dev: config.direction_std_dev,
                bounds,
            };
            walkers.push((start, Box::new(GaussMarkovModel::new(drift))));
        }

        assemble(config, ap_positions, walkers)
    }
}
