//! # wisim-link
//!
//! Link quality estimation for wisim.
//!
//! ## Features
//!
//! - **RSSI estimation**: log-distance path-loss model with a near-field
//!   floor, as a pure function of two positions and radio parameters
//! - **Link grading**: coarse strong/usable/weak buckets for traces
//!
//! The handover engine calls [`estimate_rssi`] once per (station, AP) pair
//! on every evaluation tick, so the model deliberately stays a couple of
//! floating point operations.

mod estimate;

// RSSI estimation
pub use estimate::{
    estimate_rssi, rssi_at_distance, LinkEstimationError, PathLossConfig,
};

// Link grading
pub use estimate::{classify_rssi, LinkGrade, STRONG_RSSI_DBM, USABLE_RSSI_DBM};
