//! Manager to vehicle messages.

use super::MessageKind;
use crate::reservation::AccelProfile;
use crate::{LaneId, ManagerId, VehicleId};

/// Grants a reservation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Confirm {
    pub source: ManagerId,
    pub destination: VehicleId,
    /// The manager-assigned reservation ID, quoted in Cancel, Done and Away.
    pub reservation_id: u32,
    /// The request this answers.
    pub request_id: u32,
    pub arrival_lane: LaneId,
    pub departure_lane: LaneId,
    /// The granted arrival time in s.
    pub arrival_time: f64,
    /// How early the vehicle may arrive, in s.
    pub early_error: f64,
    /// How late the vehicle may arrive, in s.
    pub late_error: f64,
    /// The granted arrival velocity in m/s.
    pub arrival_velocity: f64,
    /// The distance past the zone the vehicle must travel before sending Away, in m.
    pub acz_distance: f64,
    /// The acceleration to follow through the zone.
    pub accel_profile: AccelProfile,
}

/// Why a request was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectReason {
    /// None of the proposals fit.
    NoClearPath,
    /// The manager already granted the vehicle another request.
    ConfirmedAnotherRequest,
    /// The vehicle sent the request too soon after a previous rejection.
    BeforeNextAllowedComm,
    /// A proposed arrival time was beyond the manager's horizon.
    ArrivalTimeTooLarge,
    /// A proposed arrival time had passed by the time it was processed.
    ArrivalTimeTooLate,
}

impl RejectReason {
    pub fn name(self) -> &'static str {
        match self {
            Self::NoClearPath => "no clear path",
            Self::ConfirmedAnotherRequest => "confirmed another request",
            Self::BeforeNextAllowedComm => "before next allowed communication",
            Self::ArrivalTimeTooLarge => "arrival time too large",
            Self::ArrivalTimeTooLate => "arrival time too late",
        }
    }
}

/// Refuses a request.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reject {
    pub source: ManagerId,
    pub destination: VehicleId,
    /// The request this answers.
    pub request_id: u32,
    /// The earliest time at which the vehicle may send another request, in s.
    pub next_allowed_communication: f64,
    pub reason: RejectReason,
}

/// A reply to a reservation request.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum I2vMessage {
    Confirm(Confirm),
    Reject(Reject),
}

impl I2vMessage {
    /// The vehicle the message is for.
    pub fn destination(&self) -> VehicleId {
        match self {
            Self::Confirm(msg) => msg.destination,
            Self::Reject(msg) => msg.destination,
        }
    }
}

impl MessageKind for I2vMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::Confirm(_) => "Confirm",
            Self::Reject(_) => "Reject",
        }
    }
}

/// Why a queue request was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueueRejectReason {
    /// The vehicle is too far from the zone to join the queue.
    TooFar,
    /// The vehicle is already queued.
    AlreadyInQueue,
    /// The vehicle ahead must join the queue first.
    VehicleInFrontNotInQueue,
}

impl QueueRejectReason {
    pub fn name(self) -> &'static str {
        match self {
            Self::TooFar => "too far",
            Self::AlreadyInQueue => "already in queue",
            Self::VehicleInFrontNotInQueue => "vehicle in front not in queue",
        }
    }
}

/// A reply to a queue request, or permission to proceed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueueI2vMessage {
    /// The vehicle has joined the queue.
    Confirm {
        source: ManagerId,
        destination: VehicleId,
    },
    /// The vehicle may not join the queue.
    Reject {
        source: ManagerId,
        destination: VehicleId,
        reason: QueueRejectReason,
    },
    /// The vehicle is at the head of the queue and may enter the zone.
    Go {
        source: ManagerId,
        destination: VehicleId,
    },
}

impl QueueI2vMessage {
    /// The vehicle the message is for.
    pub fn destination(&self) -> VehicleId {
        match *self {
            Self::Confirm { destination, .. }
            | Self::Reject { destination, .. }
            | Self::Go { destination, .. } => destination,
        }
    }
}

impl MessageKind for QueueI2vMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::Confirm { .. } => "QConfirm",
            Self::Reject { .. } => "QReject",
            Self::Go { .. } => "QGo",
        }
    }
}
