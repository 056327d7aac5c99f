//! Scenario environment building.
//!
//! The builder dispatches parsed features by category into typed collections.
//! It is stateless: each call consumes its feature list and produces an
//! independent [`ScenarioEnvironment`]. Build problems are never fatal; a
//! node without usable geometry lands at the default position and the
//! [`BuildReport`] records a warning.

use crate::feature::{Category, Feature};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use wisim_common::Position;

/// Position assigned to nodes whose feature had no usable point geometry.
const DEFAULT_NODE_POSITION: Position = Position { x: 0.0, y: 0.0 };

/// A positioned radio node (access point, sniffer, or terminal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedNode {
    pub id: String,
    pub position: Position,
}

/// A blocking piece of furniture or structure. Geometry beyond the id is
/// currently unused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: String,
}

/// A seat a pedestrian can occupy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub id: String,
    pub position: Position,
    pub occupied: bool,
}

/// A doorway, used as a spawn/exit point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub id: String,
    pub position: Position,
}

/// The typed spatial entities of one scenario.
///
/// Built once per run. Immutable afterwards except for `seats[i].occupied`,
/// which scenario logic may flip as pedestrians sit down and leave.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEnvironment {
    pub access_points: Vec<PositionedNode>,
    pub sniffers: Vec<PositionedNode>,
    pub terminals: Vec<PositionedNode>,
    pub obstacles: Vec<Obstacle>,
    pub seats: Vec<Seat>,
    pub doors: Vec<Door>,
}

impl ScenarioEnvironment {
    /// Positions of all access points, in registry order. AP ids used by the
    /// handover engine are indices into this sequence.
    pub fn ap_positions(&self) -> Vec<Position> {
        self.access_points.iter().map(|ap| ap.position).collect()
    }
}

/// Non-fatal findings from a build pass.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Node features that fell back to the default position.
    pub warnings: Vec<String>,
    /// Room and Unknown features, which the builder ignores.
    pub skipped: usize,
}

/// Dispatch features by category into a new environment.
///
/// `build_environment(vec![])` yields an environment with every collection
/// empty; scenarios that run without a map document rely on that.
pub fn build_environment(features: Vec<Feature>) -> (ScenarioEnvironment, BuildReport) {
    let mut env = ScenarioEnvironment::default();
    let mut report = BuildReport::default();

    for feature in features {
        match feature.category {
            Category::AccessPoint => {
                let node = positioned_node(feature, &mut report);
                env.access_points.push(node);
            }
            Category::Sniffer => {
                let node = positioned_node(feature, &mut report);
                env.sniffers.push(node);
            }
            Category::Terminal => {
                let node = positioned_node(feature, &mut report);
                env.terminals.push(node);
            }
            Category::Wall | Category::Table => {
                env.obstacles.push(Obstacle { id: feature.id });
            }
            Category::Seat => {
                let position = point_or_origin(&feature);
                env.seats.push(Seat {
                    id: feature.id,
                    position,
                    occupied: false,
                });
            }
            Category::Door => {
                let position = point_or_origin(&feature);
                env.doors.push(Door {
                    id: feature.id,
                    position,
                });
            }
            Category::Room | Category::Unknown => {
                debug!(
                    "Ignoring {} feature '{}' during environment build",
                    feature.category, feature.id
                );
                report.skipped += 1;
            }
        }
    }

    debug!(
        "Built environment: {} APs, {} sniffers, {} terminals, {} obstacles, {} seats, {} doors ({} skipped)",
        env.access_points.len(),
        env.sniffers.len(),
        env.terminals.len(),
        env.obstacles.len(),
        env.seats.len(),
        env.doors.len(),
        report.skipped
    );

    (env, report)
}

/// Build a positioned node, falling back to the default position (with a
/// recorded warning) when the feature has no point geometry.
fn positioned_node(feature: Feature, report: &mut BuildReport) -> PositionedNode {
    match feature.geometry.as_ref().and_then(|g| g.as_point()) {
        Some(position) => PositionedNode {
            id: feature.id,
            position,
        },
        None => {
            let message = format!(
                "{} '{}' has no point geometry, placing at {}",
                feature.category, feature.id, DEFAULT_NODE_POSITION
            );
            warn!("{}", message);
            report.warnings.push(message);
            PositionedNode {
                id: feature.id,
                position: DEFAULT_NODE_POSITION,
            }
        }
    }
}

/// Point position of a seat or door feature, defaulting to the origin.
fn point_or_origin(feature: &Feature) -> Position {
    feature
        .geometry
        .as_ref()
        .and_then(|g| g.as_point())
        .unwrap_or(DEFAULT_NODE_POSITION)
}
