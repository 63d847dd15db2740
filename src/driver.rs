//! The collaborators a coordinator drives each tick.

use crate::event::{CoordinatorEvent, EventKind, EventSink};
use crate::msg::{Mailbox, MessageKind};
use crate::reservation::{LaneSet, ReservationParameter};
use crate::vehicle::{VehicleModel, VehicleSpec};
use crate::{LaneId, ManagerId};

/// Route and map knowledge about the zone the vehicle is heading for.
pub trait Navigator {
    /// The lane registry.
    fn lanes(&self) -> &LaneSet;

    /// The lane the vehicle is on.
    fn current_lane(&self) -> LaneId;

    /// The lane by which the vehicle will enter the next zone.
    fn arrival_lane(&self) -> LaneId;

    /// The lane by which the vehicle will leave the next zone.
    fn departure_lane(&self) -> LaneId;

    /// The manager of the next zone.
    fn current_manager(&self) -> ManagerId;

    /// The distance to the next zone in m, if there is one ahead.
    fn distance_to_next_zone(&self) -> Option<f64>;

    /// The distance travelled since leaving the last zone in m, if known.
    fn distance_from_prev_zone(&self) -> Option<f64>;

    /// Whether the vehicle is inside a zone.
    fn in_zone(&self) -> bool;

    /// The highest velocity at which the vehicle can cross the zone, in m/s.
    fn max_turn_velocity(&self, spec: &VehicleSpec) -> f64;

    /// Moves the vehicle onto its departure lane after leaving the zone.
    fn exit_onto_departure_lane(&mut self);

    /// The highest velocity the vehicle may travel at on its current lane,
    /// the lower of its top speed and the speed limit, in m/s.
    fn max_feasible_velocity(&self, spec: &VehicleSpec) -> f64 {
        match self.lanes().get(self.current_lane()) {
            Some(lane) => f64::min(spec.max_velocity, lane.speed_limit()),
            None => spec.max_velocity,
        }
    }
}

/// Low-level steering and throttle.
pub trait Pilot {
    /// Steers to keep to the current lane.
    fn follow_current_lane(&mut self);

    /// Applies a reactive throttle based on the speed limit and traffic ahead.
    fn simple_throttle_action(&mut self);

    /// As [Pilot::simple_throttle_action], but stops short of the zone.
    fn simple_throttle_action_dont_enter_zone(&mut self);

    /// Steers along the path through the zone.
    fn steer_through_zone(&mut self);

    /// Applies the acceleration prescribed by a reservation for crossing the zone.
    fn follow_acceleration_profile(&mut self, reservation: &ReservationParameter);
}

/// Everything a coordinator touches during one tick.
pub struct Context<'a, I, O> {
    pub vehicle: &'a mut dyn VehicleModel,
    pub nav: &'a mut dyn Navigator,
    pub pilot: &'a mut dyn Pilot,
    pub mailbox: &'a mut Mailbox<I, O>,
    pub events: &'a mut dyn EventSink,
}

impl<'a, I, O: MessageKind> Context<'a, I, O> {
    /// Reports an event stamped with the vehicle's ID and clock.
    pub(crate) fn emit(&mut self, kind: EventKind) {
        let event = CoordinatorEvent {
            vehicle: self.vehicle.id(),
            time: self.vehicle.time(),
            kind,
        };
        self.events.on_event(&event);
    }

    /// Queues a message to the manager.
    pub(crate) fn send(&mut self, msg: O) {
        let message = msg.kind();
        self.mailbox.send(msg);
        self.emit(EventKind::MessageSent { message });
    }

    /// The vehicle's physical limits.
    pub(crate) fn spec(&self) -> VehicleSpec {
        *self.vehicle.spec()
    }

    /// The highest velocity the vehicle may travel at, in m/s.
    pub(crate) fn max_feasible_velocity(&self) -> f64 {
        self.nav.max_feasible_velocity(self.vehicle.spec())
    }

    /// Steers along the lane with a reactive throttle that stops short of the zone.
    pub(crate) fn drive_up_to_zone(&mut self) {
        self.pilot.follow_current_lane();
        self.pilot.simple_throttle_action_dont_enter_zone();
    }
}
