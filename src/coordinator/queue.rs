//! First come, first served queueing at a zone.
//!
//! The vehicle asks to join the manager's queue and enters the zone when told
//! to go. No arrival times are negotiated.

use super::{discard, Coordinator, Flow, ProtocolState, StateTracker};
use crate::config::ProtocolConfig;
use crate::driver::Context;
use crate::error::{ConfigError, CoordinatorError};
use crate::event::EventKind;
use crate::msg::i2v::{QueueI2vMessage, QueueRejectReason};
use crate::msg::v2i::QueueV2iMessage;
use log::{debug, warn};

type Ctx<'a> = Context<'a, QueueI2vMessage, QueueV2iMessage>;

/// The states of a [QueueCoordinator].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QueueState {
    Planning,
    DefaultDriving,
    PreparingRequest,
    AwaitingConfirm,
    AwaitingGo,
    MovingToZone,
    Traversing,
    Clearing,
    Terminal,
}

impl ProtocolState for QueueState {
    fn name(self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::DefaultDriving => "DefaultDriving",
            Self::PreparingRequest => "PreparingRequest",
            Self::AwaitingConfirm => "AwaitingConfirm",
            Self::AwaitingGo => "AwaitingGo",
            Self::MovingToZone => "MovingToZone",
            Self::Traversing => "Traversing",
            Self::Clearing => "Clearing",
            Self::Terminal => "Terminal",
        }
    }

    fn is_terminal(self) -> bool {
        self == Self::Terminal
    }
}

/// Queues for the zone with its manager.
#[derive(Clone, Debug)]
pub struct QueueCoordinator {
    config: ProtocolConfig,
    state: StateTracker<QueueState>,
    /// No request may be sent before this time, in s.
    next_allowed_request_time: f64,
}

impl QueueCoordinator {
    /// Creates a coordinator in the Planning state, once the parameters are validated.
    pub fn new(config: ProtocolConfig, time: f64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: StateTracker::new(QueueState::Planning, time),
            next_allowed_request_time: time,
        })
    }

    /// The protocol parameters.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// No request will be sent before this time, in s.
    pub fn next_allowed_request_time(&self) -> f64 {
        self.next_allowed_request_time
    }

    fn receive(&mut self, ctx: &mut Ctx<'_>, msg: QueueI2vMessage) {
        let state = self.state.get();
        let next = match (state, &msg) {
            (QueueState::AwaitingConfirm, QueueI2vMessage::Confirm { .. }) => QueueState::AwaitingGo,
            (QueueState::AwaitingConfirm, QueueI2vMessage::Reject { reason, .. }) => match reason {
                QueueRejectReason::TooFar => QueueState::Planning,
                QueueRejectReason::AlreadyInQueue => {
                    warn!("{:?} is already queued", ctx.vehicle.id());
                    QueueState::AwaitingGo
                }
                QueueRejectReason::VehicleInFrontNotInQueue => {
                    warn!("{:?} is ahead of the vehicle in front", ctx.vehicle.id());
                    QueueState::Planning
                }
            },
            (QueueState::AwaitingGo, QueueI2vMessage::Go { .. }) => QueueState::MovingToZone,
            _ => {
                discard(ctx, &msg, state.name(), false);
                return;
            }
        };
        if let QueueI2vMessage::Reject { reason, .. } = &msg {
            ctx.emit(EventKind::RequestRejected {
                reason: reason.name(),
            });
        }
        self.state.set(ctx, next);
    }

    fn planning(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        let next = if ctx.vehicle.time() >= self.next_allowed_request_time {
            QueueState::PreparingRequest
        } else {
            QueueState::DefaultDriving
        };
        self.state.set(ctx, next);
        Flow::Continue
    }

    fn default_driving(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        ctx.drive_up_to_zone();
        self.state.set(ctx, QueueState::Planning);
        Flow::Yield
    }

    fn preparing_request(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        let now = ctx.vehicle.time();
        self.next_allowed_request_time =
            f64::max(self.next_allowed_request_time, now) + self.config.queue_request_time_gap;
        let request = QueueV2iMessage::Request {
            source: ctx.vehicle.id(),
            destination: ctx.nav.current_manager(),
            preceding_vehicle: ctx.vehicle.preceding_vehicle(),
            distance_to_zone: ctx.nav.distance_to_next_zone().unwrap_or(0.0),
        };
        debug!("{:?} asks to join the queue", ctx.vehicle.id());
        ctx.send(request);
        self.state.set(ctx, QueueState::AwaitingConfirm);
        Flow::Continue
    }

    fn waiting(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        ctx.drive_up_to_zone();
        Flow::Yield
    }

    fn moving_to_zone(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        if ctx.nav.in_zone() {
            self.state.set(ctx, QueueState::Traversing);
            return Flow::Continue;
        }
        ctx.pilot.follow_current_lane();
        ctx.pilot.simple_throttle_action();
        Flow::Yield
    }

    fn traversing(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        if ctx.nav.in_zone() {
            ctx.pilot.steer_through_zone();
            ctx.pilot.simple_throttle_action();
            return Flow::Yield;
        }
        ctx.nav.exit_onto_departure_lane();
        ctx.pilot.follow_current_lane();
        self.state.set(ctx, QueueState::Clearing);
        Flow::Continue
    }

    fn clearing(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        let done = QueueV2iMessage::Done {
            source: ctx.vehicle.id(),
            destination: ctx.nav.current_manager(),
        };
        ctx.send(done);
        ctx.drive_up_to_zone();
        self.state.set(ctx, QueueState::Terminal);
        Flow::Yield
    }
}

impl Coordinator for QueueCoordinator {
    type State = QueueState;
    type Inbound = QueueI2vMessage;
    type Outbound = QueueV2iMessage;

    fn act(&mut self, ctx: &mut Ctx<'_>) -> Result<(), CoordinatorError> {
        for msg in ctx.mailbox.drain_inbox() {
            self.receive(ctx, msg);
        }
        loop {
            let flow = match self.state.get() {
                QueueState::Planning => self.planning(ctx),
                QueueState::DefaultDriving => self.default_driving(ctx),
                QueueState::PreparingRequest => self.preparing_request(ctx),
                QueueState::AwaitingConfirm | QueueState::AwaitingGo => self.waiting(ctx),
                QueueState::MovingToZone => self.moving_to_zone(ctx),
                QueueState::Traversing => self.traversing(ctx),
                QueueState::Clearing => self.clearing(ctx),
                QueueState::Terminal => Flow::Yield,
            };
            if flow == Flow::Yield {
                return Ok(());
            }
        }
    }

    fn state(&self) -> QueueState {
        self.state.get()
    }
}
