use crate::error::ProtocolViolation;
use crate::msg::i2v::Confirm;
use crate::util::Interval;
use crate::LaneId;
use slotmap::SlotMap;
use smallvec::SmallVec;

/// The lane registry, keyed by [LaneId].
pub type LaneSet = SlotMap<LaneId, Lane>;

/// A lane leading into or out of a zone.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lane {
    /// The lane ID.
    id: LaneId,
    /// The speed limit in m/s.
    speed_limit: f64,
}

impl Lane {
    /// Creates a new lane.
    pub fn new(id: LaneId, speed_limit: f64) -> Self {
        Self { id, speed_limit }
    }

    /// Gets the lane ID.
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Gets the speed limit in m/s.
    pub fn speed_limit(&self) -> f64 {
        self.speed_limit
    }
}

/// Constant acceleration held for a period of time.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccelDirective {
    /// The acceleration in m/s<sup>2</sup>.
    pub acceleration: f64,
    /// How long to hold it, in s.
    pub duration: f64,
}

/// The acceleration a manager prescribes for crossing its zone, measured from
/// the moment of arrival.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccelProfile(SmallVec<[AccelDirective; 2]>);

impl AccelProfile {
    /// Creates a profile from `(acceleration, duration)` pairs.
    pub fn new(directives: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self(
            directives
                .into_iter()
                .map(|(acceleration, duration)| AccelDirective {
                    acceleration,
                    duration,
                })
                .collect(),
        )
    }

    /// The directives in order.
    pub fn directives(&self) -> &[AccelDirective] {
        &self.0
    }

    /// The total duration in s.
    pub fn duration(&self) -> f64 {
        self.0.iter().map(|d| d.duration).sum()
    }

    /// The average acceleration over the tick `[elapsed, elapsed + dt)`, where
    /// `elapsed` is the time since arrival. The last directive carries on past
    /// the end of the profile. Returns `None` once the profile is used up.
    pub fn average_acceleration(&self, elapsed: f64, dt: f64) -> Option<f64> {
        let last = self.0.last()?;
        let total = self.duration();
        if elapsed >= total || dt <= 0.0 {
            return None;
        }
        let end = elapsed + dt;
        let mut start = 0.0;
        let mut sum = 0.0;
        for directive in &self.0 {
            let stop = start + directive.duration;
            let overlap = f64::min(stop, end) - f64::max(start, elapsed);
            if overlap > 0.0 {
                sum += overlap * directive.acceleration;
            }
            start = stop;
        }
        if end > total {
            sum += (end - total) * last.acceleration;
        }
        Some(sum / dt)
    }
}

/// The terms of a confirmed reservation, held by the vehicle until it has
/// cleared the zone.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReservationParameter {
    arrival_lane: LaneId,
    departure_lane: LaneId,
    arrival_time: f64,
    early_error: f64,
    late_error: f64,
    arrival_velocity: f64,
    acz_distance: f64,
    accel_profile: AccelProfile,
}

impl ReservationParameter {
    /// Takes the terms of a confirmation, resolving its lanes in the registry.
    pub fn from_confirm(msg: &Confirm, lanes: &LaneSet) -> Result<Self, ProtocolViolation> {
        for lane in [msg.arrival_lane, msg.departure_lane] {
            if !lanes.contains_key(lane) {
                return Err(ProtocolViolation::UnknownLane(lane));
            }
        }
        let non_negative = [
            ("early error", msg.early_error),
            ("late error", msg.late_error),
            ("arrival velocity", msg.arrival_velocity),
            ("clearance distance", msg.acz_distance),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ProtocolViolation::InvalidGrant { field, value });
            }
        }
        Ok(Self {
            arrival_lane: msg.arrival_lane,
            departure_lane: msg.departure_lane,
            arrival_time: msg.arrival_time,
            early_error: msg.early_error,
            late_error: msg.late_error,
            arrival_velocity: msg.arrival_velocity,
            acz_distance: msg.acz_distance,
            accel_profile: msg.accel_profile.clone(),
        })
    }

    pub fn arrival_lane(&self) -> LaneId {
        self.arrival_lane
    }

    pub fn departure_lane(&self) -> LaneId {
        self.departure_lane
    }

    /// The granted arrival time in s.
    pub fn arrival_time(&self) -> f64 {
        self.arrival_time
    }

    /// How early the vehicle may arrive, in s.
    pub fn early_error(&self) -> f64 {
        self.early_error
    }

    /// How late the vehicle may arrive, in s.
    pub fn late_error(&self) -> f64 {
        self.late_error
    }

    /// The granted arrival velocity in m/s.
    pub fn arrival_velocity(&self) -> f64 {
        self.arrival_velocity
    }

    /// The distance past the zone the vehicle must travel before it is clear, in m.
    pub fn acz_distance(&self) -> f64 {
        self.acz_distance
    }

    pub fn accel_profile(&self) -> &AccelProfile {
        &self.accel_profile
    }

    /// The times at which the vehicle may arrive.
    pub fn arrival_window(&self) -> Interval {
        Interval::around(self.arrival_time, self.early_error, self.late_error)
    }
}
