//! # wisim-agents
//!
//! Simulation entities for wisim:
//!
//! - [`Pedestrian`] walks the floor under a pluggable [`MobilityModel`] and
//!   reports its position every step
//! - [`HandoverDecisionEngine`] tracks station associations and switches
//!   serving APs on hysteresis with a per-station cooldown
//!
//! Entities communicate only through posted events, so every run with the
//! same seed replays the same decision sequence.

mod handover;
mod mobility;
mod pedestrian;

// Mobility models
pub use mobility::{
    Bounds, GaussMarkovConfig, GaussMarkovModel, MobilityModel, RandomWalkConfig, RandomWalkModel,
    Waypoint, WaypointModel,
};

// Pedestrian agent
pub use pedestrian::{create_pedestrian, Pedestrian, PedestrianConfig, TIMER_STARTUP};

// Handover engine
pub use handover::{
    create_handover_engine, HandoverConfig, HandoverDecisionEngine, NodeState, TIMER_TICK,
};
