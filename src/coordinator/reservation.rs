//! The full reservation protocol.
//!
//! The vehicle proposes the earliest arrival it could make, and on a grant
//! re-checks it against its own limits before committing to it. Until the
//! manager replies the vehicle follows a plan which stops it short of the zone.

use super::{
    discard, fatal, following_distance, is_lane_clear, stop_before_zone, Coordinator, Flow,
    ProtocolState, StateTracker,
};
use crate::arrival::{
    check_reservation, estimate_arrival, ArrivalEstimate, ArrivalQuery, ReservationQuery,
};
use crate::config::ProtocolConfig;
use crate::driver::Context;
use crate::error::{ConfigError, CoordinatorError, ProtocolViolation};
use crate::event::EventKind;
use crate::msg::i2v::{Confirm, I2vMessage, Reject, RejectReason};
use crate::msg::v2i::{Proposal, Request, RequestVehicleSpec, ReservationNotice, V2iMessage};
use crate::reservation::ReservationParameter;
use crate::util::{approx_eq, is_zero, snap_to_zero, Interval};
use log::{debug, info, warn};

type Ctx<'a> = Context<'a, I2vMessage, V2iMessage>;

/// The states of a [ReservationCoordinator].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReservationState {
    /// Deciding whether to request a reservation.
    Planning,
    /// Driving reactively, short of the zone.
    DefaultDriving,
    /// Preparing and sending a request.
    PreparingReservation,
    /// Waiting for the manager to reply.
    AwaitingResponse,
    /// Holding a reservation, approaching the zone.
    MaintainingReservation,
    /// Inside the zone.
    Traversing,
    /// Past the zone, not yet clear of it.
    Clearing,
    /// Finished.
    Terminal,
}

impl ProtocolState for ReservationState {
    fn name(self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::DefaultDriving => "DefaultDriving",
            Self::PreparingReservation => "PreparingReservation",
            Self::AwaitingResponse => "AwaitingResponse",
            Self::MaintainingReservation => "MaintainingReservation",
            Self::Traversing => "Traversing",
            Self::Clearing => "Clearing",
            Self::Terminal => "Terminal",
        }
    }

    fn is_terminal(self) -> bool {
        self == Self::Terminal
    }
}

/// Negotiates a timed reservation of the zone with its manager.
#[derive(Clone, Debug)]
pub struct ReservationCoordinator {
    /// The protocol parameters.
    config: ProtocolConfig,
    /// The current state.
    state: StateTracker<ReservationState>,
    /// The reservation held, if any.
    reservation: Option<ReservationParameter>,
    /// The ID of the latest confirmed reservation.
    reservation_id: Option<u32>,
    /// The ID of the next request.
    next_request_id: u32,
    /// The ID of the request awaiting a reply.
    outstanding_request: Option<u32>,
    /// No request may be sent before this time, in s.
    next_allowed_request_time: f64,
}

impl ReservationCoordinator {
    /// Creates a coordinator in the Planning state, once the parameters are validated.
    ///
    /// # Parameters
    /// * `config` - The protocol parameters
    /// * `time` - The vehicle's clock in s
    pub fn new(config: ProtocolConfig, time: f64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: StateTracker::new(ReservationState::Planning, time),
            reservation: None,
            reservation_id: None,
            next_request_id: 0,
            outstanding_request: None,
            next_allowed_request_time: time,
        })
    }

    /// The protocol parameters.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// The reservation held, if any.
    pub fn reservation_parameter(&self) -> Option<&ReservationParameter> {
        self.reservation.as_ref()
    }

    /// The ID of the latest confirmed reservation.
    pub fn reservation_id(&self) -> Option<u32> {
        self.reservation_id
    }

    /// The time until the reserved arrival, in s.
    pub fn time_to_reservation(&self, now: f64) -> Option<f64> {
        self.reservation.as_ref().map(|r| r.arrival_time() - now)
    }

    /// Whether a request is awaiting a reply.
    pub fn is_awaiting_response(&self) -> bool {
        self.state.get() == ReservationState::AwaitingResponse
    }

    /// No request will be sent before this time, in s.
    pub fn next_allowed_request_time(&self) -> f64 {
        self.next_allowed_request_time
    }

    fn receive(&mut self, ctx: &mut Ctx<'_>, msg: I2vMessage) -> Result<(), CoordinatorError> {
        let state = self.state.get();
        if state != ReservationState::AwaitingResponse {
            discard(ctx, &msg, state.name(), false);
            return Ok(());
        }
        let request_id = match &msg {
            I2vMessage::Confirm(confirm) => confirm.request_id,
            I2vMessage::Reject(reject) => reject.request_id,
        };
        if self.outstanding_request != Some(request_id) {
            discard(ctx, &msg, state.name(), true);
            return Ok(());
        }
        self.outstanding_request = None;
        match msg {
            I2vMessage::Confirm(confirm) => self.on_confirm(ctx, &confirm),
            I2vMessage::Reject(reject) => self.on_reject(ctx, &reject),
        }
    }

    fn on_confirm(&mut self, ctx: &mut Ctx<'_>, msg: &Confirm) -> Result<(), CoordinatorError> {
        let state = self.state.get().name();
        self.reservation_id = Some(msg.reservation_id);
        let reservation = ReservationParameter::from_confirm(msg, ctx.nav.lanes())
            .map_err(|violation| fatal(ctx, state, violation))?;

        let spec = ctx.spec();
        let query = ReservationQuery {
            time: ctx.vehicle.time(),
            vel: ctx.vehicle.velocity(),
            arrival_time: reservation.arrival_time(),
            arrival_vel: reservation.arrival_velocity(),
            dist: ctx.nav.distance_to_next_zone().unwrap_or(f64::INFINITY),
            v_top: ctx.max_feasible_velocity(),
            accel: spec.max_acceleration,
            decel: spec.max_deceleration,
        };
        match check_reservation(&query) {
            Ok(schedule) => {
                info!(
                    "{:?} holds reservation {} arriving at {:.2}",
                    ctx.vehicle.id(),
                    msg.reservation_id,
                    reservation.arrival_time()
                );
                ctx.vehicle.set_accel_schedule(schedule);
                self.reservation = Some(reservation);
                ctx.emit(EventKind::ReservationConfirmed {
                    reservation_id: msg.reservation_id,
                });
                self.state.set(ctx, ReservationState::MaintainingReservation);
            }
            Err(err) => {
                debug!(
                    "{:?} cannot keep reservation {}: {}",
                    ctx.vehicle.id(),
                    msg.reservation_id,
                    err
                );
                self.cancel(ctx, "infeasible");
                self.state.set(ctx, ReservationState::Planning);
            }
        }
        Ok(())
    }

    fn on_reject(&mut self, ctx: &mut Ctx<'_>, msg: &Reject) -> Result<(), CoordinatorError> {
        ctx.emit(EventKind::RequestRejected {
            reason: msg.reason.name(),
        });
        let violation = match msg.reason {
            RejectReason::NoClearPath | RejectReason::ConfirmedAnotherRequest => {
                let floor = ctx.vehicle.time() + self.config.sending_request_delay;
                self.back_off(ctx, f64::max(msg.next_allowed_communication, floor));
                ctx.vehicle.remove_accel_schedule();
                self.state.set(ctx, ReservationState::Planning);
                return Ok(());
            }
            RejectReason::BeforeNextAllowedComm => ProtocolViolation::BeforeNextAllowedComm,
            RejectReason::ArrivalTimeTooLarge => ProtocolViolation::ArrivalTimeTooLarge,
            RejectReason::ArrivalTimeTooLate => ProtocolViolation::ArrivalTimeTooLate,
        };
        Err(fatal(ctx, self.state.get().name(), violation))
    }

    fn back_off(&mut self, ctx: &mut Ctx<'_>, until: f64) {
        debug!("{:?} backs off until {:.2}", ctx.vehicle.id(), until);
        self.next_allowed_request_time = until;
        ctx.emit(EventKind::Backoff { until });
    }

    /// Gives up the reservation and the plan for it.
    fn cancel(&mut self, ctx: &mut Ctx<'_>, cause: &'static str) {
        if let Some(notice) = self.notice(ctx) {
            ctx.send(V2iMessage::Cancel(notice));
        }
        ctx.emit(EventKind::ReservationCancelled {
            reservation_id: self.reservation_id,
            cause,
        });
        self.reservation = None;
        ctx.vehicle.remove_accel_schedule();
    }

    fn notice(&self, ctx: &Ctx<'_>) -> Option<ReservationNotice> {
        self.reservation_id.map(|reservation_id| ReservationNotice {
            source: ctx.vehicle.id(),
            destination: ctx.nav.current_manager(),
            reservation_id,
        })
    }

    fn lane_clear(&self, ctx: &Ctx<'_>) -> bool {
        is_lane_clear(
            ctx.nav.distance_to_next_zone(),
            ctx.vehicle.distance_to_car_in_front(),
            self.config.stop_distance_before_zone,
        )
    }

    /// Whether the vehicle has to come to the zone before it may request.
    fn must_stop_first(&self, ctx: &Ctx<'_>) -> bool {
        let limit = self.config.stop_distance_before_zone + self.config.additional_stop_distance;
        self.config.must_stop_before_zone
            && ctx.nav.distance_to_next_zone().map_or(false, |d| d > limit)
    }

    fn planning(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        self.reservation = None;
        let next = if ctx.vehicle.time() >= self.next_allowed_request_time
            && !self.must_stop_first(ctx)
        {
            ReservationState::PreparingReservation
        } else {
            ReservationState::DefaultDriving
        };
        self.state.set(ctx, next);
        Flow::Continue
    }

    fn default_driving(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        ctx.drive_up_to_zone();
        self.state.set(ctx, ReservationState::Planning);
        Flow::Yield
    }

    fn preparing_reservation(&mut self, ctx: &mut Ctx<'_>) -> Result<Flow, CoordinatorError> {
        if ctx.vehicle.accel_schedule().is_some() {
            warn!("{:?} replaces a leftover schedule", ctx.vehicle.id());
        }
        let now = ctx.vehicle.time();
        let spec = ctx.spec();
        let v_top = ctx.max_feasible_velocity();
        let vel = ctx.vehicle.velocity();
        match ctx.nav.distance_to_next_zone() {
            Some(dist) => {
                let stop = stop_before_zone(
                    now,
                    vel,
                    dist,
                    self.config.stop_distance_before_zone,
                    v_top,
                    spec.max_acceleration,
                    spec.max_deceleration,
                );
                match stop {
                    Some(schedule) => ctx.vehicle.set_accel_schedule(schedule),
                    None => {
                        ctx.vehicle.remove_accel_schedule();
                        ctx.pilot.follow_current_lane();
                        ctx.vehicle.slow_to_stop();
                    }
                }
            }
            // Nothing to stop for
            None => debug!("{:?} has no zone ahead", ctx.vehicle.id()),
        }

        let proposal = if self.lane_clear(ctx) {
            self.prepare_proposal(ctx)?
        } else {
            debug!("{:?} waits for the lane to clear", ctx.vehicle.id());
            None
        };
        match proposal {
            Some(proposal) => {
                self.send_request(ctx, proposal);
                self.state.set(ctx, ReservationState::AwaitingResponse);
            }
            None => {
                self.back_off(ctx, now + self.config.sending_request_delay);
                ctx.vehicle.remove_accel_schedule();
                self.state.set(ctx, ReservationState::Planning);
            }
        }
        Ok(Flow::Continue)
    }

    fn prepare_proposal(&self, ctx: &mut Ctx<'_>) -> Result<Option<Proposal>, CoordinatorError> {
        let spec = ctx.spec();
        let max_velocity = ctx.nav.max_turn_velocity(&spec);
        let estimate = match self.estimate_after_reply(ctx, max_velocity)? {
            Some(estimate) => estimate,
            None => return Ok(None),
        };
        let now = ctx.vehicle.time();
        let arrival_time = f64::max(
            estimate.arrival_time,
            now + self.config.minimum_future_reservation_time,
        );
        if arrival_time >= now + self.config.maximum_future_reservation_time() {
            debug!(
                "{:?} arrival at {:.2} is too far ahead",
                ctx.vehicle.id(),
                arrival_time
            );
            ctx.emit(EventKind::ProposalFailed {
                reason: format!("arrival at {:.3} is beyond the horizon", arrival_time),
            });
            return Ok(None);
        }
        Ok(Some(Proposal {
            arrival_lane: ctx.nav.arrival_lane(),
            departure_lane: ctx.nav.departure_lane(),
            arrival_time,
            arrival_velocity: estimate.arrival_velocity,
            max_velocity,
        }))
    }

    /// Estimates the arrival as if the manager's reply had already come in.
    fn estimate_after_reply(
        &self,
        ctx: &mut Ctx<'_>,
        max_arrival_velocity: f64,
    ) -> Result<Option<ArrivalEstimate>, CoordinatorError> {
        let dist = match ctx.nav.distance_to_next_zone() {
            Some(dist) => dist,
            None => return Ok(None),
        };
        let spec = ctx.spec();
        let mut query = ArrivalQuery {
            time: ctx.vehicle.time(),
            vel: ctx.vehicle.velocity(),
            dist,
            v_top: ctx.max_feasible_velocity(),
            v_end_max: max_arrival_velocity,
            accel: spec.max_acceleration,
            decel: spec.max_deceleration,
        };
        let reply = self.config.max_expected_reply_time;
        let projected = ctx.vehicle.accel_schedule().map(|schedule| {
            schedule.calc_final_distance_and_velocity(query.time, query.vel, query.time + reply)
        });
        match projected {
            Some((d, v)) if d <= dist => {
                query.time += reply;
                query.vel = snap_to_zero(v);
                query.dist -= d;
            }
            Some(_) => {
                let state = self.state.get().name();
                return Err(fatal(ctx, state, ProtocolViolation::ZoneReachedBeforeReply));
            }
            None if is_zero(query.vel) => query.time += reply,
            None => {
                // Keep a margin for the velocity the vehicle picks up while waiting
                let slack = self.config.arrival_estimate_accel_slack;
                query.accel = f64::max(query.accel - slack, 0.0);
                query.decel = f64::min(query.decel + slack, 0.0);
            }
        }
        match estimate_arrival(&query) {
            Ok(estimate) => Ok(Some(estimate)),
            Err(err) => {
                debug!("{:?} cannot propose: {}", ctx.vehicle.id(), err);
                ctx.emit(EventKind::ProposalFailed {
                    reason: err.to_string(),
                });
                Ok(None)
            }
        }
    }

    fn send_request(&mut self, ctx: &mut Ctx<'_>, proposal: Proposal) {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        self.outstanding_request = Some(request_id);
        let request = Request {
            source: ctx.vehicle.id(),
            destination: ctx.nav.current_manager(),
            request_id,
            spec: RequestVehicleSpec::from(ctx.vehicle.spec()),
            proposals: vec![proposal],
        };
        ctx.send(V2iMessage::Request(request));
    }

    fn awaiting_response(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        let now = ctx.vehicle.time();
        if let Some(timeout) = self.config.request_timeout {
            if self.state.elapsed(now) > timeout {
                debug!("{:?} gave up waiting for a reply", ctx.vehicle.id());
                self.outstanding_request = None;
                ctx.emit(EventKind::RequestTimedOut);
                self.back_off(ctx, now + self.config.sending_request_delay);
                ctx.vehicle.remove_accel_schedule();
                self.state.set(ctx, ReservationState::Planning);
                return Flow::Continue;
            }
        }
        if ctx.vehicle.accel_schedule().is_none() {
            ctx.drive_up_to_zone();
        } else if !self.lane_clear(ctx) {
            let gap = following_distance(
                ctx.vehicle.velocity(),
                ctx.spec().max_deceleration,
                self.config.minimum_following_distance,
            );
            if ctx.vehicle.distance_to_car_in_front().map_or(false, |d| d <= gap) {
                debug!("{:?} too close to the car ahead", ctx.vehicle.id());
                ctx.vehicle.remove_accel_schedule();
                ctx.drive_up_to_zone();
            }
        }
        Flow::Yield
    }

    fn maintaining_reservation(&mut self, ctx: &mut Ctx<'_>) -> Result<Flow, CoordinatorError> {
        let state = self.state.get().name();
        let reservation = match &self.reservation {
            Some(reservation) => reservation,
            None => return Err(fatal(ctx, state, ProtocolViolation::NoReservation)),
        };
        if ctx.nav.in_zone() {
            let now = ctx.vehicle.time();
            let tick = Interval::new(now - self.config.time_step, now);
            let window = reservation.arrival_window();
            if !tick.left_open_meets(&window) {
                let violation = ProtocolViolation::ArrivalTime {
                    granted: reservation.arrival_time(),
                    earliest: window.min,
                    latest: window.max,
                    actual: now,
                    distance_to_zone: ctx.nav.distance_to_next_zone().unwrap_or(0.0),
                };
                return Err(fatal(ctx, state, violation));
            }
            let vel = ctx.vehicle.velocity();
            let granted = reservation.arrival_velocity();
            if !approx_eq(vel, granted, self.config.arrival_velocity_precision) {
                let violation = ProtocolViolation::ArrivalVelocity {
                    granted,
                    actual: vel,
                };
                return Err(fatal(ctx, state, violation));
            }
            // The approach plan ends at the entrance
            ctx.vehicle.remove_accel_schedule();
            self.state.set(ctx, ReservationState::Traversing);
            Ok(Flow::Continue)
        } else if self.lane_clear(ctx) {
            ctx.pilot.follow_current_lane();
            Ok(Flow::Yield)
        } else {
            warn!(
                "{:?} cannot keep its reservation with the lane blocked",
                ctx.vehicle.id()
            );
            self.cancel(ctx, "lane blocked");
            self.state.set(ctx, ReservationState::Planning);
            Ok(Flow::Continue)
        }
    }

    fn traversing(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        if ctx.nav.in_zone() {
            ctx.pilot.steer_through_zone();
            if let Some(reservation) = &self.reservation {
                ctx.pilot.follow_acceleration_profile(reservation);
            }
            return Flow::Yield;
        }
        ctx.nav.exit_onto_departure_lane();
        ctx.pilot.follow_current_lane();
        if let Some(notice) = self.notice(ctx) {
            ctx.send(V2iMessage::Done(notice));
        }
        self.state.set(ctx, ReservationState::Clearing);
        Flow::Continue
    }

    fn clearing(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        ctx.drive_up_to_zone();
        let acz_distance = self.reservation.as_ref().map_or(0.0, |r| r.acz_distance());
        let cleared = ctx
            .nav
            .distance_from_prev_zone()
            .map_or(true, |d| d > acz_distance);
        if cleared {
            if let Some(notice) = self.notice(ctx) {
                ctx.send(V2iMessage::Away(notice));
            }
            self.reservation = None;
            self.state.set(ctx, ReservationState::Terminal);
        }
        Flow::Yield
    }
}

impl Coordinator for ReservationCoordinator {
    type State = ReservationState;
    type Inbound = I2vMessage;
    type Outbound = V2iMessage;

    fn act(&mut self, ctx: &mut Ctx<'_>) -> Result<(), CoordinatorError> {
        for msg in ctx.mailbox.drain_inbox() {
            self.receive(ctx, msg)?;
        }
        loop {
            let flow = match self.state.get() {
                ReservationState::Planning => self.planning(ctx),
                ReservationState::DefaultDriving => self.default_driving(ctx),
                ReservationState::PreparingReservation => self.preparing_reservation(ctx)?,
                ReservationState::AwaitingResponse => self.awaiting_response(ctx),
                ReservationState::MaintainingReservation => self.maintaining_reservation(ctx)?,
                ReservationState::Traversing => self.traversing(ctx),
                ReservationState::Clearing => self.clearing(ctx),
                ReservationState::Terminal => Flow::Yield,
            };
            if flow == Flow::Yield {
                return Ok(());
            }
        }
    }

    fn state(&self) -> ReservationState {
        self.state.get()
    }
}
