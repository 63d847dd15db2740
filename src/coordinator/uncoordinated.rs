//! Driving through a zone without asking anyone.

use super::{Coordinator, Flow, ProtocolState, StateTracker};
use crate::arrival::{estimate_arrival, ArrivalQuery};
use crate::config::ProtocolConfig;
use crate::driver::Context;
use crate::error::{ConfigError, CoordinatorError};
use crate::schedule::AccelSchedule;
use log::debug;
use std::convert::Infallible;

type Ctx<'a> = Context<'a, Infallible, Infallible>;

/// The states of an [UncoordinatedCoordinator].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UncoordinatedState {
    Planning,
    DefaultDriving,
    TraversingZone,
    Terminal,
}

impl ProtocolState for UncoordinatedState {
    fn name(self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::DefaultDriving => "DefaultDriving",
            Self::TraversingZone => "TraversingZone",
            Self::Terminal => "Terminal",
        }
    }

    fn is_terminal(self) -> bool {
        self == Self::Terminal
    }
}

/// Plans an arrival at the zone at no more than the maximum turn velocity,
/// then drives through it. No messages are exchanged.
#[derive(Clone, Debug)]
pub struct UncoordinatedCoordinator {
    config: ProtocolConfig,
    state: StateTracker<UncoordinatedState>,
}

impl UncoordinatedCoordinator {
    /// Creates a coordinator in the Planning state, once the parameters are validated.
    pub fn new(config: ProtocolConfig, time: f64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: StateTracker::new(UncoordinatedState::Planning, time),
        })
    }

    /// The protocol parameters.
    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// A plan arriving at the zone no faster than the vehicle can turn through it.
    fn arrival_plan(&self, ctx: &Ctx<'_>) -> Option<AccelSchedule> {
        let spec = *ctx.vehicle.spec();
        let query = ArrivalQuery {
            time: ctx.vehicle.time(),
            vel: ctx.vehicle.velocity(),
            dist: ctx.nav.distance_to_next_zone()?,
            v_top: ctx.max_feasible_velocity(),
            v_end_max: ctx.nav.max_turn_velocity(&spec),
            accel: spec.max_acceleration,
            decel: spec.max_deceleration,
        };
        match estimate_arrival(&query) {
            Ok(estimate) => Some(estimate.schedule),
            Err(err) => {
                debug!("{:?} drives without a plan: {}", ctx.vehicle.id(), err);
                None
            }
        }
    }

    fn planning(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        if ctx.vehicle.velocity() < self.config.min_max_turn_velocity {
            ctx.vehicle.remove_accel_schedule();
        } else if ctx.vehicle.accel_schedule().is_none() {
            if let Some(schedule) = self.arrival_plan(ctx) {
                ctx.vehicle.set_accel_schedule(schedule);
            }
        }
        let next = if ctx.nav.in_zone() {
            UncoordinatedState::TraversingZone
        } else {
            UncoordinatedState::DefaultDriving
        };
        self.state.set(ctx, next);
        Flow::Continue
    }

    fn default_driving(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        ctx.pilot.follow_current_lane();
        if ctx.vehicle.accel_schedule().is_none() {
            ctx.pilot.simple_throttle_action();
        }
        self.state.set(ctx, UncoordinatedState::Planning);
        Flow::Yield
    }

    fn traversing_zone(&mut self, ctx: &mut Ctx<'_>) -> Flow {
        if ctx.nav.in_zone() {
            ctx.pilot.steer_through_zone();
            if ctx.vehicle.accel_schedule().is_none() {
                ctx.pilot.simple_throttle_action();
            }
            return Flow::Yield;
        }
        ctx.nav.exit_onto_departure_lane();
        ctx.vehicle.remove_accel_schedule();
        ctx.pilot.follow_current_lane();
        ctx.pilot.simple_throttle_action();
        self.state.set(ctx, UncoordinatedState::Terminal);
        Flow::Yield
    }
}

impl Coordinator for UncoordinatedCoordinator {
    type State = UncoordinatedState;
    type Inbound = Infallible;
    type Outbound = Infallible;

    fn act(&mut self, ctx: &mut Ctx<'_>) -> Result<(), CoordinatorError> {
        for msg in ctx.mailbox.drain_inbox() {
            match msg {}
        }
        loop {
            let flow = match self.state.get() {
                UncoordinatedState::Planning => self.planning(ctx),
                UncoordinatedState::DefaultDriving => self.default_driving(ctx),
                UncoordinatedState::TraversingZone => self.traversing_zone(ctx),
                UncoordinatedState::Terminal => Flow::Yield,
            };
            if flow == Flow::Yield {
                return Ok(());
            }
        }
    }

    fn state(&self) -> UncoordinatedState {
        self.state.get()
    }
}
