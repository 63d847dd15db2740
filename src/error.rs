//! Error types.
//!
//! Only [CoordinatorError] ever escapes a coordinator's `act()`; everything in
//! [KinematicsError] is recoverable and handled by backing off and replanning.

use crate::{LaneId, VehicleId};
use thiserror::Error;

/// Why a kinematic plan could not be produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KinematicsError {
    #[error("cannot slow from {from:.3} m/s to {to:.3} m/s within {distance:.3} m")]
    CannotSlowInTime { from: f64, to: f64, distance: f64 },

    #[error("vehicle can never cover {distance:.3} m from rest without acceleration")]
    NeverArrives { distance: f64 },

    #[error("cannot change velocity from {from:.3} m/s to {to:.3} m/s within {duration:.3} s")]
    CannotChangeVelocityInTime { from: f64, to: f64, duration: f64 },

    #[error("would arrive too late: at most {max_distance:.3} m of {distance:.3} m coverable")]
    ArrivesTooLate { max_distance: f64, distance: f64 },

    #[error("would arrive too early: at least {min_distance:.3} m covered but only {distance:.3} m available")]
    ArrivesTooEarly { min_distance: f64, distance: f64 },

    #[error("arrival time {arrival:.3} is not after the current time {now:.3}")]
    ArrivalInPast { now: f64, arrival: f64 },

    #[error("invalid kinematic limits: accel {accel}, decel {decel}")]
    InvalidLimits { accel: f64, decel: f64 },

    #[error("acceleration schedule times must be finite and non-decreasing (at {time})")]
    UnorderedSchedule { time: f64 },
}

/// A condition that can only arise from a bug in proposal construction or a
/// disagreement between the manager and the vehicle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolViolation {
    #[error("sent a request before the next allowed communication time")]
    BeforeNextAllowedComm,

    #[error("requested an arrival time too far in the future")]
    ArrivalTimeTooLarge,

    #[error("requested an arrival time which had already passed when the manager replied")]
    ArrivalTimeTooLate,

    #[error("arrived at {actual:.5} but the reservation is for {granted:.5} (window [{earliest:.5}, {latest:.5}]), {distance_to_zone:.5} m before the zone")]
    ArrivalTime {
        granted: f64,
        earliest: f64,
        latest: f64,
        actual: f64,
        distance_to_zone: f64,
    },

    #[error("arrived at {actual:.3} m/s but the reservation is for {granted:.3} m/s")]
    ArrivalVelocity { granted: f64, actual: f64 },

    #[error("vehicle would reach the zone before the manager could reply")]
    ZoneReachedBeforeReply,

    #[error("confirmation names lane {0:?} which is not in the lane registry")]
    UnknownLane(LaneId),

    #[error("confirmation has a negative {field}: {value}")]
    InvalidGrant { field: &'static str, value: f64 },

    #[error("no reservation is held")]
    NoReservation,
}

/// A fatal coordinator failure. The run must be aborted.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("vehicle {vehicle:?} at time {time:.2} s in state {state}: {violation}")]
pub struct CoordinatorError {
    pub vehicle: VehicleId,
    pub time: f64,
    pub state: &'static str,
    pub violation: ProtocolViolation,
}

/// A rejected [ProtocolConfig](crate::ProtocolConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{field}` must be greater than zero, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("`{field}` must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[cfg(feature = "serde")]
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
