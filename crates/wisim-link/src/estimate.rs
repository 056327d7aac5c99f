//! Received signal strength estimation.
//!
//! Estimates the RSSI a station would observe from an access point using the
//! log-distance path-loss model:
//!
//! ```text
//! rssi = tx_power_dbm - 10 * n * log10(max(distance, 1.0))
//! ```
//!
//! where `n` is the path-loss exponent (2.0 in free space, around 3.0 for
//! indoor spaces with obstructions). The 1.0 m floor keeps the estimate
//! bounded as the distance approaches zero; within one meter of an AP the
//! station simply sees the full transmit power.
//!
//! The estimate is a pure function of the two positions and the radio
//! parameters. No fading, no randomness, no side effects.

use thiserror::Error;
use wisim_common::Position;

/// Distances below this evaluate as this, in meters.
const MIN_DISTANCE_M: f64 = 1.0;

/// Errors raised when validating radio parameters.
#[derive(Debug, Error)]
pub enum LinkEstimationError {
    /// The path-loss exponent must be positive for the model to decay.
    #[error("path-loss exponent must be positive, got {0}")]
    InvalidPathLossExponent(f64),

    /// Transmit power far outside consumer Wi-Fi range indicates a
    /// misconfigured scenario, not a real radio.
    #[error("transmit power {0} dBm is outside the accepted range [-30, 40]")]
    InvalidTxPower(f64),
}

// ============================================================================
// Path-Loss Configuration
// ============================================================================

/// Radio parameters for the path-loss estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathLossConfig {
    /// Transmit power in dBm.
    pub tx_power_dbm: f64,
    /// Path-loss exponent.
    pub path_loss_exponent: f64,
}

impl Default for PathLossConfig {
    fn default() -> Self {
        Self {
            tx_power_dbm: 20.0,
            path_loss_exponent: 3.0,
        }
    }
}

impl PathLossConfig {
    /// Create a validated configuration.
    pub fn new(tx_power_dbm: f64, path_loss_exponent: f64) -> Result<Self, LinkEstimationError> {
        if path_loss_exponent <= 0.0 {
            return Err(LinkEstimationError::InvalidPathLossExponent(
                path_loss_exponent,
            ));
        }
        if !(-30.0..=40.0).contains(&tx_power_dbm) {
            return Err(LinkEstimationError::InvalidTxPower(tx_power_dbm));
        }
        Ok(Self {
            tx_power_dbm,
            path_loss_exponent,
        })
    }

    /// Estimated RSSI at `station` from an AP at `ap`, in dBm.
    pub fn estimate_rssi(&self, station: &Position, ap: &Position) -> f64 {
        estimate_rssi(self.tx_power_dbm, self.path_loss_exponent, station, ap)
    }
}

// ============================================================================
// Estimation
// ============================================================================

/// Estimated RSSI at `station` from an AP at `ap`, in dBm.
pub fn estimate_rssi(
    tx_power_dbm: f64,
    path_loss_exponent: f64,
    station: &Position,
    ap: &Position,
) -> f64 {
    rssi_at_distance(tx_power_dbm, path_loss_exponent, station.distance_to(ap))
}

/// Estimated RSSI at a given distance, in dBm.
pub fn rssi_at_distance(tx_power_dbm: f64, path_loss_exponent: f64, distance_m: f64) -> f64 {
    let d = distance_m.max(MIN_DISTANCE_M);
    tx_power_dbm - 10.0 * path_loss_exponent * d.log10()
}

// ============================================================================
// Link Grading
// ============================================================================

/// Minimum RSSI for a link graded [`LinkGrade::Strong`].
pub const STRONG_RSSI_DBM: f64 = -55.0;
/// Minimum RSSI for a link graded [`LinkGrade::Usable`].
pub const USABLE_RSSI_DBM: f64 = -75.0;

/// Coarse link quality bucket, for trace annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkGrade {
    /// Comfortable margin over the usable floor.
    Strong,
    /// Workable, handover candidates should be considered.
    Usable,
    /// Below the floor where the association is worth keeping.
    Weak,
}

impl LinkGrade {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkGrade::Strong => "strong",
            LinkGrade::Usable => "usable",
            LinkGrade::Weak => "weak",
        }
    }
}

impl std::fmt::Display for LinkGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an RSSI value into a [`LinkGrade`].
pub fn classify_rssi(rssi_dbm: f64) -> LinkGrade {
    if rssi_dbm >= STRONG_RSSI_DBM {
        LinkGrade::Strong
    } else if rssi_dbm >= USABLE_RSSI_DBM {
        LinkGrade::Usable
    } else {
        LinkGrade::Weak
    }
}
