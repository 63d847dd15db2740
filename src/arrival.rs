//! Kinematic arrival estimation.
//!
//! [estimate_arrival] is the optimistic half of the protocol: it proposes the
//! earliest, fastest arrival a vehicle could make. [check_reservation] is the
//! pessimistic half: it re-validates a granted arrival against the vehicle's
//! own limits before the vehicle commits to it.

use crate::error::KinematicsError;
use crate::math::distance_to_change;
use crate::schedule::AccelSchedule;
use crate::util::{is_zero, snap_to_zero, EPSILON};
pub use check::{check_reservation, ReservationQuery};

mod check;

/// Slack allowed on distances when testing feasibility, in m.
const DISTANCE_TOLERANCE: f64 = 1e-6;

/// Inputs into [estimate_arrival].
#[derive(Clone, Copy, Debug)]
pub struct ArrivalQuery {
    /// The time at which the estimate starts, in s.
    pub time: f64,
    /// The velocity at `time`, in m/s.
    pub vel: f64,
    /// The distance to the zone, in m.
    pub dist: f64,
    /// The highest velocity the vehicle may travel at, in m/s.
    pub v_top: f64,
    /// The highest velocity at which the vehicle may arrive, in m/s.
    pub v_end_max: f64,
    /// The maximum acceleration, a non-negative number in m/s<sup>2</sup>.
    pub accel: f64,
    /// The maximum deceleration, a negative number in m/s<sup>2</sup>.
    pub decel: f64,
}

/// An estimated arrival at the zone.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrivalEstimate {
    /// The arrival time in s.
    pub arrival_time: f64,
    /// The arrival velocity in m/s.
    pub arrival_velocity: f64,
    /// The plan which realises the arrival.
    pub schedule: AccelSchedule,
}

/// Estimates the earliest arrival at the zone, velocity first.
///
/// The arrival velocity is the highest velocity not above `min(v_top, v_end_max)`
/// which can be reached over the distance. The vehicle then accelerates to the
/// highest velocity from which it can still slow to the arrival velocity in time,
/// cruises if it hits `v_top`, and decelerates.
pub fn estimate_arrival(query: &ArrivalQuery) -> Result<ArrivalEstimate, KinematicsError> {
    let ArrivalQuery {
        time,
        vel,
        dist,
        v_top,
        v_end_max,
        accel,
        decel,
    } = *query;
    if !(accel >= 0.0 && decel < 0.0 && v_top > 0.0) {
        return Err(KinematicsError::InvalidLimits { accel, decel });
    }
    let v0 = f64::max(snap_to_zero(vel), 0.0);
    let dist = f64::max(dist, 0.0);
    let v_end_max = f64::max(f64::min(v_top, v_end_max), 0.0);

    // The arrival velocity
    let v_end = if v0 > v_end_max {
        if distance_to_change(v0, v_end_max, decel) > dist + DISTANCE_TOLERANCE {
            return Err(KinematicsError::CannotSlowInTime {
                from: v0,
                to: v_end_max,
                distance: dist,
            });
        }
        v_end_max
    } else {
        f64::min(v_end_max, (v0 * v0 + 2.0 * accel * dist).sqrt())
    };

    if is_zero(dist) {
        let schedule = AccelSchedule::new([(time, 0.0)])?;
        return Ok(ArrivalEstimate {
            arrival_time: time,
            arrival_velocity: v0,
            schedule,
        });
    }

    // The peak velocity, where accelerating from `v0` meets decelerating to `v_end`
    let v_floor = f64::max(v0, v_end);
    let v_peak = if accel > 0.0 {
        let num = dist + v0 * v0 / (2.0 * accel) - v_end * v_end / (2.0 * decel);
        let den = 1.0 / (2.0 * accel) - 1.0 / (2.0 * decel);
        (num / den).sqrt().min(v_top).max(v_floor)
    } else {
        v_floor
    };
    if is_zero(v_peak) {
        return Err(KinematicsError::NeverArrives { distance: dist });
    }

    let t_acc = if v_peak > v0 { (v_peak - v0) / accel } else { 0.0 };
    let t_dec = (v_end - v_peak) / decel;
    let d_acc = 0.5 * (v0 + v_peak) * t_acc;
    let d_dec = 0.5 * (v_peak + v_end) * t_dec;
    let t_cruise = f64::max(dist - d_acc - d_dec, 0.0) / v_peak;

    let (schedule, arrival_time) =
        schedule_from_phases(time, [(t_acc, accel), (t_cruise, 0.0), (t_dec, decel)])?;
    Ok(ArrivalEstimate {
        arrival_time,
        arrival_velocity: snap_to_zero(v_end),
        schedule,
    })
}

/// Builds a schedule from consecutive `(duration, acceleration)` phases starting
/// at `time`, ending with zero acceleration. Returns the schedule and its end time.
pub(crate) fn schedule_from_phases(
    time: f64,
    phases: [(f64, f64); 3],
) -> Result<(AccelSchedule, f64), KinematicsError> {
    let mut changes = Vec::with_capacity(phases.len() + 1);
    let mut t = time;
    for (duration, acc) in phases.into_iter().filter(|(d, _)| *d > EPSILON) {
        changes.push((t, acc));
        t += duration;
    }
    changes.push((t, 0.0));
    Ok((AccelSchedule::new(changes)?, t))
}
