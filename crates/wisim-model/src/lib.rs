//! # wisim-model
//!
//! Spatial scenario document handling for wisim:
//!
//! - Parsing GeoJSON-style feature collections into typed [`Feature`]
//!   records, with per-feature failure isolation
//! - Building a [`ScenarioEnvironment`] of access points, sniffers,
//!   terminals, obstacles, seats, and doors from those features
//!
//! The parser is strict about the document envelope (a missing file, broken
//! JSON, or a wrong top-level collection type is fatal) and lenient about
//! individual entries (bad features are dropped with a diagnostic).

mod environment;
mod feature;
mod parser;

// Feature types
pub use feature::{Category, Feature, Geometry};

// Parsing
pub use parser::{parse_file, parse_str, DocumentError, FeatureError, ParseOutcome};

// Environment building
pub use environment::{
    build_environment, BuildReport, Door, Obstacle, PositionedNode, ScenarioEnvironment, Seat,
};
