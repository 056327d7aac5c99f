//! Waypoint traffic between the doors of a mapped floor.

use wisim_agents::{MobilityModel, Waypoint, WaypointModel};
use wisim_common::Position;
use wisim_model::ScenarioEnvironment;

use super::{ap_positions_from, assemble, evenly_spaced_aps};
use crate::scenario::{BuildScenarioError, Scenario, ScenarioConfig};
use crate::Simulation;

/// Stations enter at a door, walk to a seat, dwell, and leave through the
/// next door. Requires a map document with doors; seats are optional.
pub struct DoorToDoor;

impl Scenario for DoorToDoor {
    fn name(&self) -> &'static str {
        "door-to-door"
    }

    fn description(&self) -> &'static str {
        "walk door to seat to door on a mapped floor (requires --map)"
    }

    fn build(
        &self,
        config: &ScenarioConfig,
        environment: &ScenarioEnvironment,
        _seed: u64,
    ) -> Result<Simulation, BuildScenarioError> {
        if environment.doors.is_empty() {
            return Err(BuildScenarioError::MissingEnvironment(
                "a map document with at least one door",
            ));
        }

        let ap_positions = ap_positions_from(environment, || evenly_spaced_aps(config));

        let doors = &environment.doors;
        let seats = &environment.seats;
        let mut walkers: Vec<(Position, Box<dyn MobilityModel>)> =
            Vec::with_capacity(config.pedestrians);
        for index in 0..config.pedestrians {
            let entry = doors[index % doors.len()].position;
            let exit = doors[(index + 1) % doors.len()].position;

            let mut route = Vec::new();
            if !seats.is_empty() {
                let seat = seats[index % seats.len()].position;
                route.push(Waypoint::new(seat, config.door_dwell_secs));
            }
            route.push(Waypoint::new(exit, 0.0));

            walkers.push((
                entry,
                Box::new(WaypointModel::new(route, config.walk_speed_mps)),
            ));
        }

        assemble(config, ap_positions, walkers)
    }
}
