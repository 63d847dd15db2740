//! Vehicle-side protocol coordinators.
//!
//! A coordinator is a tick-driven state machine. Each call to [Coordinator::act]
//! first processes every inbound message in arrival order, then runs the
//! handler of the current state until one yields. Handlers which change state
//! usually continue, so a transitional state costs no extra tick.

use crate::arrival::{estimate_arrival, ArrivalQuery};
use crate::driver::Context;
use crate::error::{CoordinatorError, ProtocolViolation};
use crate::event::EventKind;
use crate::math::distance_to_stop;
use crate::msg::MessageKind;
use crate::schedule::AccelSchedule;
use log::{debug, error, warn};
use std::fmt::Debug;

pub mod queue;
pub mod reservation;
pub mod uncoordinated;

/// What a state handler wants to happen next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Run the handler of the (possibly new) current state straight away.
    Continue,
    /// Stop for this tick.
    Yield,
}

/// A state of a coordinator.
pub trait ProtocolState: Copy + Debug + Eq {
    /// The state's name, for diagnostics.
    fn name(self) -> &'static str;

    /// Whether the coordinator has finished.
    fn is_terminal(self) -> bool;
}

/// A vehicle-side protocol state machine.
pub trait Coordinator {
    type State: ProtocolState;
    /// Messages from the manager.
    type Inbound: MessageKind;
    /// Messages to the manager.
    type Outbound: MessageKind;

    /// Runs one tick. An error means the run must be aborted.
    fn act(
        &mut self,
        ctx: &mut Context<'_, Self::Inbound, Self::Outbound>,
    ) -> Result<(), CoordinatorError>;

    /// The current state.
    fn state(&self) -> Self::State;

    /// The name of the current state.
    fn state_name(&self) -> &'static str {
        self.state().name()
    }

    /// Whether the terminal state has been reached.
    fn is_terminated(&self) -> bool {
        self.state().is_terminal()
    }
}

/// The current state and the time it was last set.
#[derive(Clone, Debug)]
pub(crate) struct StateTracker<S> {
    state: S,
    since: f64,
}

impl<S: ProtocolState> StateTracker<S> {
    pub fn new(state: S, time: f64) -> Self {
        Self { state, since: time }
    }

    pub fn get(&self) -> S {
        self.state
    }

    /// The time since the state was last set, in s.
    pub fn elapsed(&self, now: f64) -> f64 {
        now - self.since
    }

    /// Sets the state. Setting the same state again restarts its clock.
    pub fn set<I, O: MessageKind>(&mut self, ctx: &mut Context<'_, I, O>, to: S) {
        let from = self.state;
        self.state = to;
        self.since = ctx.vehicle.time();
        if from != to {
            ctx.emit(EventKind::StateChanged {
                from: from.name(),
                to: to.name(),
            });
        }
    }
}

/// Builds, logs and reports a fatal error.
pub(crate) fn fatal<I, O: MessageKind>(
    ctx: &mut Context<'_, I, O>,
    state: &'static str,
    violation: ProtocolViolation,
) -> CoordinatorError {
    let err = CoordinatorError {
        vehicle: ctx.vehicle.id(),
        time: ctx.vehicle.time(),
        state,
        violation,
    };
    error!("{}", err);
    ctx.emit(EventKind::Fatal {
        message: err.to_string(),
    });
    err
}

/// Logs and reports an inbound message which the current state does not expect.
pub(crate) fn discard<I: MessageKind, O: MessageKind>(
    ctx: &mut Context<'_, I, O>,
    msg: &I,
    state: &'static str,
    stale: bool,
) {
    let message = msg.kind();
    warn!(
        "{:?} discarded {} in state {}{}",
        ctx.vehicle.id(),
        message,
        state,
        if stale { " (stale)" } else { "" }
    );
    ctx.emit(EventKind::MessageDiscarded {
        message,
        state,
        stale,
    });
}

/// Plans a stop `stop_distance` short of the zone, if one is possible.
///
/// # Parameters
/// * `time` - The current time in s
/// * `vel` - The current velocity in m/s
/// * `dist_to_zone` - The distance to the zone in m
/// * `stop_distance` - How far short of the zone to stop, in m
/// * `v_top` - The highest velocity the vehicle may travel at, in m/s
/// * `accel` - The maximum acceleration in m/s<sup>2</sup>
/// * `decel` - The maximum deceleration, a negative number in m/s<sup>2</sup>
pub fn stop_before_zone(
    time: f64,
    vel: f64,
    dist_to_zone: f64,
    stop_distance: f64,
    v_top: f64,
    accel: f64,
    decel: f64,
) -> Option<AccelSchedule> {
    let dist = dist_to_zone - stop_distance;
    if !(dist > 0.0) {
        return None;
    }
    let query = ArrivalQuery {
        time,
        vel,
        dist,
        v_top,
        v_end_max: 0.0,
        accel,
        decel,
    };
    match estimate_arrival(&query) {
        Ok(estimate) => Some(estimate.schedule),
        Err(err) => {
            debug!("no stopping plan: {}", err);
            None
        }
    }
}

/// Whether nothing stands between the vehicle and the zone: there is no zone
/// ahead, no car ahead, or the car ahead is already within `stop_distance`
/// of the zone entrance.
pub fn is_lane_clear(
    dist_to_zone: Option<f64>,
    dist_to_car: Option<f64>,
    stop_distance: f64,
) -> bool {
    match (dist_to_zone, dist_to_car) {
        (Some(zone), Some(car)) => zone - car <= stop_distance,
        _ => true,
    }
}

/// The gap to keep to the car ahead when driving reactively, in m.
pub fn following_distance(vel: f64, decel: f64, minimum: f64) -> f64 {
    distance_to_stop(vel, decel) + minimum
}
