//! Vehicle to manager messages.

use super::MessageKind;
use crate::vehicle::VehicleSpec;
use crate::{LaneId, ManagerId, VehicleId};

/// The vehicle attributes a manager needs to simulate its passage.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestVehicleSpec {
    /// The maximum acceleration in m/s<sup>2</sup>.
    pub max_acceleration: f64,
    /// The maximum deceleration, a negative number in m/s<sup>2</sup>.
    pub max_deceleration: f64,
    /// The top speed in m/s.
    pub max_velocity: f64,
    /// The length in m.
    pub length: f64,
    /// The width in m.
    pub width: f64,
}

impl From<&VehicleSpec> for RequestVehicleSpec {
    fn from(spec: &VehicleSpec) -> Self {
        Self {
            max_acceleration: spec.max_acceleration,
            max_deceleration: spec.max_deceleration,
            max_velocity: spec.max_velocity,
            length: spec.length,
            width: spec.width,
        }
    }
}

/// A proposed arrival at the zone.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proposal {
    pub arrival_lane: LaneId,
    pub departure_lane: LaneId,
    /// The proposed arrival time in s.
    pub arrival_time: f64,
    /// The proposed arrival velocity in m/s.
    pub arrival_velocity: f64,
    /// The highest velocity the vehicle will travel at in the zone, in m/s.
    pub max_velocity: f64,
}

/// Asks for a reservation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Request {
    pub source: VehicleId,
    pub destination: ManagerId,
    /// Identifies the request, echoed in the reply.
    pub request_id: u32,
    pub spec: RequestVehicleSpec,
    pub proposals: Vec<Proposal>,
}

/// A message about a granted reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReservationNotice {
    pub source: VehicleId,
    pub destination: ManagerId,
    pub reservation_id: u32,
}

/// A message to a reservation manager.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum V2iMessage {
    Request(Request),
    /// Gives up a reservation.
    Cancel(ReservationNotice),
    /// The vehicle has left the zone.
    Done(ReservationNotice),
    /// The vehicle has cleared the zone's aftermath.
    Away(ReservationNotice),
}

impl V2iMessage {
    /// The manager the message is for.
    pub fn destination(&self) -> ManagerId {
        match self {
            Self::Request(msg) => msg.destination,
            Self::Cancel(msg) | Self::Done(msg) | Self::Away(msg) => msg.destination,
        }
    }
}

impl MessageKind for V2iMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "Request",
            Self::Cancel(_) => "Cancel",
            Self::Done(_) => "Done",
            Self::Away(_) => "Away",
        }
    }
}

/// A message to a queue manager.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueueV2iMessage {
    /// Asks to join the queue.
    Request {
        source: VehicleId,
        destination: ManagerId,
        /// The vehicle directly ahead, if any.
        preceding_vehicle: Option<VehicleId>,
        /// The distance to the zone in m.
        distance_to_zone: f64,
    },
    /// The vehicle has left the zone.
    Done {
        source: VehicleId,
        destination: ManagerId,
    },
}

impl QueueV2iMessage {
    /// The manager the message is for.
    pub fn destination(&self) -> ManagerId {
        match *self {
            Self::Request { destination, .. } | Self::Done { destination, .. } => destination,
        }
    }
}

impl MessageKind for QueueV2iMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::Request { .. } => "QRequest",
            Self::Done { .. } => "QDone",
        }
    }
}
