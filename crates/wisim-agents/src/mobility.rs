//! Pedestrian mobility models.
//!
//! A mobility model advances a position by one time step. Models are pure
//! state machines over the run's seeded RNG, so trajectories are fully
//! reproducible for a given seed.
//!
//! Three models are provided:
//!
//! - [`RandomWalkModel`]: uniform speed and heading, re-sampled on a hold
//!   interval, reflecting off the walls of a rectangular hall
//! - [`GaussMarkovModel`]: first-order autoregressive speed and direction
//!   with tunable memory, the classic corridor-walk model
//! - [`WaypointModel`]: constant-speed travel through an ordered waypoint
//!   route with per-waypoint dwell times

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use wisim_common::Position;

/// A rectangular walkable area spanning `[0, width] x [0, height]` meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Bounds { width, height }
    }

    /// Whether a position lies inside the area (inclusive).
    pub fn contains(&self, position: &Position) -> bool {
        (0.0..=self.width).contains(&position.x) && (0.0..=self.height).contains(&position.y)
    }

    /// Reflect a proposed position back inside the area.
    ///
    /// Returns the corrected position and whether either axis bounced, so
    /// the caller can mirror its heading.
    pub fn reflect(&self, proposed: Position) -> (Position, bool, bool) {
        let (x, bounced_x) = reflect_axis(proposed.x, self.width);
        let (y, bounced_y) = reflect_axis(proposed.y, self.height);
        (Position::new(x, y), bounced_x, bounced_y)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        // Reference hall: 50 m x 30 m.
        Bounds::new(50.0, 30.0)
    }
}

/// Mirror a coordinate into `[0, max]`. Loops because a single step larger
/// than the area needs repeated folding.
fn reflect_axis(mut value: f64, max: f64) -> (f64, bool) {
    let mut bounced = false;
    while value < 0.0 || value > max {
        if value < 0.0 {
            value = -value;
        } else {
            value = 2.0 * max - value;
        }
        bounced = true;
    }
    (value, bounced)
}

/// One step of pedestrian movement.
pub trait MobilityModel {
    /// Advance `dt_secs` from `position` and return the new position.
    fn step(&mut self, position: Position, dt_secs: f64, rng: &mut ChaCha8Rng) -> Position;

    /// Whether the model has exhausted its route. Unbounded models never
    /// finish.
    fn is_finished(&self) -> bool {
        false
    }

    /// Model name for logs.
    fn kind(&self) -> &'static str;
}

// ============================================================================
// Random Walk
// ============================================================================

/// Parameters for [`RandomWalkModel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomWalkConfig {
    /// Lower bound of the uniformly sampled walking speed.
    pub min_speed_mps: f64,
    /// Upper bound of the uniformly sampled walking speed.
    pub max_speed_mps: f64,
    /// How long a sampled heading is held before re-sampling.
    pub direction_hold_secs: f64,
    pub bounds: Bounds,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            min_speed_mps: 0.5,
            max_speed_mps: 1.5,
            direction_hold_secs: 5.0,
            bounds: Bounds::default(),
        }
    }
}

/// Uniform-speed random walk with reflective bounds.
#[derive(Debug, Clone)]
pub struct RandomWalkModel {
    config: RandomWalkConfig,
    heading_rad: f64,
    speed_mps: f64,
    hold_remaining_secs: f64,
}

impl RandomWalkModel {
    pub fn new(config: RandomWalkConfig) -> Self {
        Self {
            config,
            heading_rad: 0.0,
            speed_mps: 0.0,
            // Forces a sample on the first step.
            hold_remaining_secs: 0.0,
        }
    }
}

impl MobilityModel for RandomWalkModel {
    fn step(&mut self, position: Position, dt_secs: f64, rng: &mut ChaCha8Rng) -> Position {
        if self.hold_remaining_secs <= 0.0 {
            self.heading_rad = rng.gen_range(0.0..std::f64::consts::TAU);
            self.speed_mps = rng.gen_range(self.config.min_speed_mps..=self.config.max_speed_mps);
            self.hold_remaining_secs = self.config.direction_hold_secs;
        }
        self.hold_remaining_secs -= dt_secs;

        let proposed = Position::new(
            position.x + self.speed_mps * dt_secs * self.heading_rad.cos(),
            position.y + self.speed_mps * dt_secs * self.heading_rad.sin(),
        );
        let (corrected, bounced_x, bounced_y) = self.config.bounds.reflect(proposed);
        if bounced_x {
            self.heading_rad = std::f64::consts::PI - self.heading_rad;
        }
        if bounced_y {
            self.heading_rad = -self.heading_rad;
        }
        corrected
    }

    fn kind(&self) -> &'static str {
        "random-walk"
    }
}

// ============================================================================
// Gauss-Markov
// ============================================================================

/// Parameters for [`GaussMarkovModel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussMarkovConfig {
    /// Memory factor in `[0, 1]`. 0 is memoryless, 1 holds the initial
    /// velocity forever.
    pub alpha: f64,
    /// Mean walking speed the process reverts toward.
    pub mean_speed_mps: f64,
    /// Mean direction the process reverts toward, in radians.
    pub mean_direction_rad: f64,
    /// Standard deviation of the speed perturbation.
    pub speed_std_dev: f64,
    /// Standard deviation of the direction perturbation.
    pub direction_std_dev: f64,
    pub bounds: Bounds,
}

impl Default for GaussMarkovConfig {
    fn default() -> Self {
        Self {
            alpha: 0.85,
            mean_speed_mps: 1.0,
            mean_direction_rad: 0.0,
            speed_std_dev: 0.25,
            direction_std_dev: 0.4,
            bounds: Bounds::default(),
        }
    }
}

/// First-order autoregressive mobility.
///
/// Speed and direction evolve as
/// `v' = alpha * v + (1 - alpha) * mean + sqrt(1 - alpha^2) * noise`,
/// which keeps trajectories smooth for alpha near 1 while still wandering.
#[derive(Debug, Clone)]
pub struct GaussMarkovModel {
    config: GaussMarkovConfig,
    speed_mps: f64,
    direction_rad: f64,
}

impl GaussMarkovModel {
    pub fn new(config: GaussMarkovConfig) -> Self {
        Self {
            speed_mps: config.mean_speed_mps,
            direction_rad: config.mean_direction_rad,
            config,
        }
    }

    fn evolve(&mut self, rng: &mut ChaCha8Rng) {
        let alpha = self.config.alpha;
        let variance_term = (1.0 - alpha * alpha).max(0.0).sqrt();

        let speed_noise: f64 = rng.sample(StandardNormal);
        self.speed_mps = (alpha * self.speed_mps
            + (1.0 - alpha) * self.config.mean_speed_mps
            + variance_term * speed_noise * self.config.speed_std_dev)
            .max(0.0);

        let direction_noise: f64 = rng.sample(StandardNormal);
        self.direction_rad = alpha * self.direction_rad
            + (1.0 - alpha) * self.config.mean_direction_rad
            + variance_term * direction_noise * self.config.direction_std_dev;
    }
}

impl MobilityModel for GaussMarkovModel {
    fn step(&mut self, position: Position, dt_secs: f64, rng: &mut ChaCha8Rng) -> Position {
        self.evolve(rng);

        let proposed = Position::new(
            position.x + self.speed_mps * dt_secs * self.direction_rad.cos(),
            position.y + self.speed_mps * dt_secs * self.direction_rad.sin(),
        );
        let (corrected, bounced_x, bounced_y) = self.config.bounds.reflect(proposed);
        if bounced_x {
            self.direction_rad = std::f64::consts::PI - self.direction_rad;
        }
        if bounced_y {
            self.direction_rad = -self.direction_rad;
        }
        corrected
    }

    fn kind(&self) -> &'static str {
        "gauss-markov"
    }
}

// ============================================================================
// Waypoint Route
// ============================================================================

/// One stop on a waypoint route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: Position,
    /// How long to stay once the waypoint is reached.
    pub dwell_secs: f64,
}

impl Waypoint {
    pub fn new(position: Position, dwell_secs: f64) -> Self {
        Waypoint {
            position,
            dwell_secs,
        }
    }
}

/// Constant-speed travel through an ordered waypoint route.
///
/// The model walks straight toward the next waypoint, dwells there, then
/// continues. After the last dwell it reports finished and stops moving.
#[derive(Debug, Clone)]
pub struct WaypointModel {
    route: Vec<Waypoint>,
    speed_mps: f64,
    next: usize,
    dwell_remaining_secs: f64,
    finished: bool,
}

impl WaypointModel {
    pub fn new(route: Vec<Waypoint>, speed_mps: f64) -> Self {
        let finished = route.is_empty();
        Self {
            route,
            speed_mps,
            next: 0,
            dwell_remaining_secs: 0.0,
            finished,
        }
    }

    /// Index of the next waypoint to visit.
    pub fn next_waypoint(&self) -> usize {
        self.next
    }
}

impl MobilityModel for WaypointModel {
    fn step(&mut self, position: Position, dt_secs: f64, _rng: &mut ChaCha8Rng) -> Position {
        if self.finished {
            return position;
        }

        if self.dwell_remaining_secs > 0.0 {
            self.dwell_remaining_secs -= dt_secs;
            if self.dwell_remaining_secs <= 0.0 && self.next >= self.route.len() {
                self.finished = true;
            }
            return position;
        }

        if self.next >= self.route.len() {
            self.finished = true;
            return position;
        }

        let target = self.route[self.next].position;
        let distance = position.distance_to(&target);
        let step_len = self.speed_mps * dt_secs;

        if step_len >= distance {
            // Arrived; start dwelling.
            self.dwell_remaining_secs = self.route[self.next].dwell_secs;
            self.next += 1;
            if self.dwell_remaining_secs <= 0.0 && self.next >= self.route.len() {
                self.finished = true;
            }
            target
        } else {
            let fraction = step_len / distance;
            Position::new(
                position.x + (target.x - position.x) * fraction,
                position.y + (target.y - position.y) * fraction,
            )
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn kind(&self) -> &'static str {
        "waypoint"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn test_reflect_axis() {
        assert_eq!(reflect_axis(5.0, 10.0), (5.0, false));
        assert_eq!(reflect_axis(-2.0, 10.0), (2.0, true));
        assert_eq!(reflect_axis(12.0, 10.0), (8.0, true));
        assert_eq!(reflect_axis(0.0, 10.0), (0.0, false));
        assert_eq!(reflect_axis(10.0, 10.0), (10.0, false));
    }

    #[test]
    fn test_reflect_axis_folds_large_overshoot() {
        let (value, bounced) = reflect_axis(37.0, 10.0);
        assert!(bounced);
        assert!((0.0..=10.0).contains(&value));
    }

    #[test]
    fn test_random_walk_stays_in_bounds() {
        let bounds = Bounds::new(50.0, 30.0);
        let mut model = RandomWalkModel::new(RandomWalkConfig {
            bounds,
            ..Default::default()
        });
        let mut rng = rng(11);
        let mut position = Position::new(25.0, 15.0);
        for _ in 0..500 {
            position = model.step(position, 1.0, &mut rng);
            assert!(bounds.contains(&position), "escaped to {}", position);
        }
    }

    #[test]
    fn test_random_walk_is_seed_reproducible() {
        let walk = |seed: u64| {
            let mut model = RandomWalkModel::new(RandomWalkConfig::default());
            let mut rng = rng(seed);
            let mut position = Position::new(10.0, 10.0);
            let mut path = Vec::new();
            for _ in 0..50 {
                position = model.step(position, 1.0, &mut rng);
                path.push(position);
            }
            path
        };

        assert_eq!(walk(42), walk(42));
        assert_ne!(walk(42), walk(43));
    }

    #[test]
    fn test_random_walk_moves() {
        let mut model = RandomWalkModel::new(RandomWalkConfig::default());
        let mut rng = rng(3);
        let start = Position::new(25.0, 15.0);
        let after = model.step(start, 1.0, &mut rng);
        let speed = start.distance_to(&after);
        assert!(speed >= 0.5 && speed <= 1.5, "step length was {}", speed);
    }

    #[test]
    fn test_gauss_markov_full_memory_holds_velocity() {
        let config = GaussMarkovConfig {
            alpha: 1.0,
            mean_speed_mps: 1.0,
            mean_direction_rad: 0.0,
            ..Default::default()
        };
        let mut model = GaussMarkovModel::new(config);
        let mut rng = rng(5);
        let mut position = Position::new(1.0, 15.0);
        for i in 1..=10 {
            position = model.step(position, 1.0, &mut rng);
            // Straight-line march along x at exactly the mean speed.
            assert!((position.x - (1.0 + i as f64)).abs() < 1e-9);
            assert!((position.y - 15.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_gauss_markov_stays_in_bounds() {
        let bounds = Bounds::new(50.0, 30.0);
        let mut model = GaussMarkovModel::new(GaussMarkovConfig {
            bounds,
            ..Default::default()
        });
        let mut rng = rng(17);
        let mut position = Position::new(5.0, 15.0);
        for _ in 0..500 {
            position = model.step(position, 1.0, &mut rng);
            assert!(bounds.contains(&position), "escaped to {}", position);
        }
    }

    #[test]
    fn test_waypoint_route_visits_in_order_and_finishes() {
        let route = vec![
            Waypoint::new(Position::new(10.0, 0.0), 0.0),
            Waypoint::new(Position::new(10.0, 5.0), 2.0),
        ];
        let mut model = WaypointModel::new(route, 1.0);
        let mut rng = rng(0);
        let mut position = Position::new(0.0, 0.0);

        // 10 m at 1 m/s reaches the first waypoint.
        for _ in 0..10 {
            assert!(!model.is_finished());
            position = model.step(position, 1.0, &mut rng);
        }
        assert_eq!(position, Position::new(10.0, 0.0));
        assert_eq!(model.next_waypoint(), 1);

        // 5 m to the second, then a 2 s dwell before finishing.
        for _ in 0..5 {
            position = model.step(position, 1.0, &mut rng);
        }
        assert_eq!(position, Position::new(10.0, 5.0));
        assert!(!model.is_finished());

        position = model.step(position, 1.0, &mut rng);
        position = model.step(position, 1.0, &mut rng);
        assert!(model.is_finished());
        assert_eq!(position, Position::new(10.0, 5.0));
    }

    #[test]
    fn test_waypoint_empty_route_is_finished_immediately() {
        let model = WaypointModel::new(vec![], 1.0);
        assert!(model.is_finished());
    }

    #[test]
    fn test_waypoint_finished_model_does_not_move() {
        let mut model = WaypointModel::new(vec![], 1.0);
        let mut rng = rng(0);
        let position = Position::new(3.0, 4.0);
        assert_eq!(model.step(position, 1.0, &mut rng), position);
    }
}
