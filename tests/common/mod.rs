//! A scripted vehicle, navigator and pilot for driving coordinators in tests.

#![allow(dead_code)]

use traffic_reserve::{
    AccelSchedule, Context, Coordinator, CoordinatorError, EventRecorder, KeyData, Lane, LaneId,
    LaneSet, Mailbox, ManagerId, Navigator, Pilot, ReservationParameter, Vehicle, VehicleId,
    VehicleModel, VehicleSpec,
};

pub const DT: f64 = 0.02;

pub fn spec() -> VehicleSpec {
    VehicleSpec {
        max_acceleration: 2.0,
        max_deceleration: -4.0,
        max_velocity: 25.0,
        length: 4.0,
        width: 2.0,
    }
}

pub fn vehicle_id() -> VehicleId {
    VehicleId::from(KeyData::from_ffi(7))
}

pub fn manager_id() -> ManagerId {
    ManagerId::from(KeyData::from_ffi(3))
}

/// A [Vehicle] which remembers every schedule installed on it.
pub struct RecordingVehicle {
    pub inner: Vehicle,
    pub installed: Vec<AccelSchedule>,
    pub stop_requests: usize,
}

impl VehicleModel for RecordingVehicle {
    fn id(&self) -> VehicleId {
        self.inner.id()
    }

    fn time(&self) -> f64 {
        self.inner.time()
    }

    fn velocity(&self) -> f64 {
        self.inner.velocity()
    }

    fn spec(&self) -> &VehicleSpec {
        self.inner.spec()
    }

    fn accel_schedule(&self) -> Option<&AccelSchedule> {
        self.inner.accel_schedule()
    }

    fn set_accel_schedule(&mut self, schedule: AccelSchedule) {
        self.installed.push(schedule.clone());
        self.inner.set_accel_schedule(schedule);
    }

    fn remove_accel_schedule(&mut self) {
        self.inner.remove_accel_schedule();
    }

    fn slow_to_stop(&mut self) {
        self.stop_requests += 1;
        self.inner.slow_to_stop();
    }

    fn distance_to_car_in_front(&self) -> Option<f64> {
        self.inner.distance_to_car_in_front()
    }

    fn preceding_vehicle(&self) -> Option<VehicleId> {
        self.inner.preceding_vehicle()
    }
}

/// A zone on a straight road, from `start` to `end` in m.
#[derive(Clone, Copy, Debug)]
pub struct Track {
    pub start: f64,
    pub end: f64,
}

/// A navigator whose readings are set directly, or derived from a [Track].
pub struct MockNavigator {
    pub lanes: LaneSet,
    pub arrival_lane: LaneId,
    pub departure_lane: LaneId,
    pub current_lane: LaneId,
    pub manager: ManagerId,
    pub dist_to_zone: Option<f64>,
    pub dist_from_prev: Option<f64>,
    pub in_zone: bool,
    pub turn_velocity: f64,
    pub exits: usize,
}

impl MockNavigator {
    pub fn new(speed_limit: f64, turn_velocity: f64) -> Self {
        let mut lanes = LaneSet::with_key();
        let arrival_lane = lanes.insert_with_key(|id| Lane::new(id, speed_limit));
        let departure_lane = lanes.insert_with_key(|id| Lane::new(id, speed_limit));
        Self {
            lanes,
            arrival_lane,
            departure_lane,
            current_lane: arrival_lane,
            manager: manager_id(),
            dist_to_zone: None,
            dist_from_prev: None,
            in_zone: false,
            turn_velocity,
            exits: 0,
        }
    }

    /// Derives the readings from the vehicle's position on the track.
    pub fn place(&mut self, track: Track, pos: f64) {
        self.dist_to_zone = (pos < track.start).then(|| track.start - pos);
        self.in_zone = track.start <= pos && pos <= track.end;
        self.dist_from_prev = (pos > track.end).then(|| pos - track.end);
    }
}

impl Navigator for MockNavigator {
    fn lanes(&self) -> &LaneSet {
        &self.lanes
    }

    fn current_lane(&self) -> LaneId {
        self.current_lane
    }

    fn arrival_lane(&self) -> LaneId {
        self.arrival_lane
    }

    fn departure_lane(&self) -> LaneId {
        self.departure_lane
    }

    fn current_manager(&self) -> ManagerId {
        self.manager
    }

    fn distance_to_next_zone(&self) -> Option<f64> {
        self.dist_to_zone
    }

    fn distance_from_prev_zone(&self) -> Option<f64> {
        self.dist_from_prev
    }

    fn in_zone(&self) -> bool {
        self.in_zone
    }

    fn max_turn_velocity(&self, _spec: &VehicleSpec) -> f64 {
        self.turn_velocity
    }

    fn exit_onto_departure_lane(&mut self) {
        self.current_lane = self.departure_lane;
        self.exits += 1;
    }
}

/// A pilot which records what it was asked to do.
#[derive(Default)]
pub struct RecordingPilot {
    pub calls: Vec<&'static str>,
}

impl RecordingPilot {
    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }
}

impl Pilot for RecordingPilot {
    fn follow_current_lane(&mut self) {
        self.calls.push("follow_current_lane");
    }

    fn simple_throttle_action(&mut self) {
        self.calls.push("simple_throttle_action");
    }

    fn simple_throttle_action_dont_enter_zone(&mut self) {
        self.calls.push("simple_throttle_action_dont_enter_zone");
    }

    fn steer_through_zone(&mut self) {
        self.calls.push("steer_through_zone");
    }

    fn follow_acceleration_profile(&mut self, _reservation: &ReservationParameter) {
        self.calls.push("follow_acceleration_profile");
    }
}

/// One vehicle and everything around it.
pub struct Harness<I, O> {
    pub vehicle: RecordingVehicle,
    pub nav: MockNavigator,
    pub pilot: RecordingPilot,
    pub mailbox: Mailbox<I, O>,
    pub events: EventRecorder,
    pub track: Option<Track>,
}

impl<I, O> Harness<I, O> {
    /// A vehicle at `pos` travelling at `vel`, at time zero.
    pub fn new(pos: f64, vel: f64, speed_limit: f64, turn_velocity: f64) -> Self {
        let mut inner = Vehicle::new(vehicle_id(), &spec());
        inner.set_state(0.0, pos, vel);
        Self {
            vehicle: RecordingVehicle {
                inner,
                installed: vec![],
                stop_requests: 0,
            },
            nav: MockNavigator::new(speed_limit, turn_velocity),
            pilot: RecordingPilot::default(),
            mailbox: Mailbox::new(),
            events: EventRecorder::new(),
            track: None,
        }
    }

    /// Puts a zone on the road and takes the navigator readings from it.
    pub fn with_track(mut self, track: Track) -> Self {
        self.track = Some(track);
        self.nav.place(track, self.vehicle.inner.pos());
        self
    }

    pub fn time(&self) -> f64 {
        self.vehicle.time()
    }

    /// Runs one tick of the coordinator.
    pub fn tick<C>(&mut self, coordinator: &mut C) -> Result<(), CoordinatorError>
    where
        C: Coordinator<Inbound = I, Outbound = O>,
    {
        let mut ctx = Context {
            vehicle: &mut self.vehicle,
            nav: &mut self.nav,
            pilot: &mut self.pilot,
            mailbox: &mut self.mailbox,
            events: &mut self.events,
        };
        coordinator.act(&mut ctx)
    }

    /// Moves the vehicle on by one time step.
    pub fn advance(&mut self) {
        self.vehicle.inner.integrate(DT);
        if let Some(track) = self.track {
            self.nav.place(track, self.vehicle.inner.pos());
        }
    }

    /// Sets the vehicle's clock without moving it.
    pub fn set_time(&mut self, time: f64) {
        let (pos, vel) = (self.vehicle.inner.pos(), self.vehicle.inner.velocity());
        self.vehicle.inner.set_state(time, pos, vel);
    }
}
