pub use arrival::{
    check_reservation, estimate_arrival, ArrivalEstimate, ArrivalQuery, ReservationQuery,
};
pub use config::ProtocolConfig;
pub use coordinator::{
    queue::{QueueCoordinator, QueueState},
    reservation::{ReservationCoordinator, ReservationState},
    uncoordinated::{UncoordinatedCoordinator, UncoordinatedState},
    Coordinator, Flow, ProtocolState,
};
pub use driver::{Context, Navigator, Pilot};
pub use error::{ConfigError, CoordinatorError, KinematicsError, ProtocolViolation};
pub use event::{CoordinatorEvent, EventKind, EventRecorder, EventSink, LogSink, NoopSink};
pub use msg::Mailbox;
pub use reservation::{AccelDirective, AccelProfile, Lane, LaneSet, ReservationParameter};
pub use schedule::{AccelChange, AccelSchedule};
use slotmap::new_key_type;
pub use slotmap::{Key, KeyData};
pub use util::Interval;
pub use vehicle::{Vehicle, VehicleModel, VehicleSpec};

mod arrival;
mod config;
pub mod coordinator;
mod driver;
mod error;
mod event;
pub mod math;
pub mod msg;
mod reservation;
mod schedule;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a vehicle.
    pub struct VehicleId;
    /// Unique ID of a lane in the [LaneSet].
    pub struct LaneId;
    /// Unique ID of an intersection or merge manager.
    pub struct ManagerId;
}
