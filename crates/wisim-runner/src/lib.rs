//! # wisim-runner
//!
//! Discrete-event loop, built-in scenarios, and metrics export for wisim.
//!
//! The `wisim` binary lives in `main.rs`; this library exposes the pieces so
//! integration tests and benches can assemble and drive runs in process:
//!
//! - [`ScenarioRegistry`] resolves a name to a [`Scenario`], which builds a
//!   [`Simulation`] from a [`ScenarioConfig`] and an optional map document
//! - [`EventLoop`] drives the simulation and collects [`SimulationStats`]
//!   and a [`HandoverLog`]
//! - [`metrics_export`] records the `metrics` facade in memory for JSON
//!   export at the end of a run

use thiserror::Error;

pub mod event_loop;
pub mod handover_log;
pub mod metrics_export;
pub mod scenario;
pub mod scenarios;

pub use event_loop::{create_event_loop, EventLoop, Simulation, SimulationStats};
pub use handover_log::HandoverLog;
pub use scenario::{
    load_config, load_environment, BuildScenarioError, ConfigError, Scenario, ScenarioConfig,
    ScenarioRegistry,
};

// Re-exported for callers driving runs directly.
pub use wisim_common::SimTime;

/// Top-level failure of a runner invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("unknown scenario '{0}', try `wisim list`")]
    UnknownScenario(String),
    #[error(transparent)]
    Config(#[from] scenario::ConfigError),
    #[error(transparent)]
    Document(#[from] wisim_model::DocumentError),
    #[error(transparent)]
    Build(#[from] scenario::BuildScenarioError),
    #[error(transparent)]
    Sim(#[from] wisim_common::SimError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
