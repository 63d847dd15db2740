use super::{schedule_from_phases, DISTANCE_TOLERANCE};
use crate::error::KinematicsError;
use crate::schedule::AccelSchedule;
use crate::util::snap_to_zero;

/// The number of bisection steps used to find the cruising velocity.
const BISECTION_STEPS: usize = 100;

/// Slack allowed on durations when testing feasibility, in s.
const DURATION_TOLERANCE: f64 = 1e-9;

/// Inputs into [check_reservation].
#[derive(Clone, Copy, Debug)]
pub struct ReservationQuery {
    /// The current time in s.
    pub time: f64,
    /// The current velocity in m/s.
    pub vel: f64,
    /// The granted arrival time in s.
    pub arrival_time: f64,
    /// The granted arrival velocity in m/s.
    pub arrival_vel: f64,
    /// The distance to the zone in m.
    pub dist: f64,
    /// The highest velocity the vehicle may travel at, in m/s.
    pub v_top: f64,
    /// The vehicle's maximum acceleration, a positive number in m/s<sup>2</sup>.
    pub accel: f64,
    /// The vehicle's maximum deceleration, a negative number in m/s<sup>2</sup>.
    pub decel: f64,
}

/// Checks whether the vehicle, within its own limits, can cover `dist` so as
/// to arrive exactly at the granted time and velocity, and if so returns a plan.
///
/// The plan changes velocity at full acceleration or deceleration to a
/// cruising velocity, holds it, then changes to the arrival velocity. A
/// cruising velocity of zero means waiting in place. The distance covered is
/// monotonic in the cruising velocity, which is found by bisection.
pub fn check_reservation(query: &ReservationQuery) -> Result<AccelSchedule, KinematicsError> {
    let ReservationQuery {
        time,
        vel,
        arrival_time,
        arrival_vel,
        dist,
        v_top,
        accel,
        decel,
    } = *query;
    if !(accel > 0.0 && decel < 0.0 && v_top > 0.0) {
        return Err(KinematicsError::InvalidLimits { accel, decel });
    }
    let v1 = f64::max(snap_to_zero(vel), 0.0);
    let v_end = f64::max(snap_to_zero(arrival_vel), 0.0);
    // A vehicle already over the limit may hold its velocity, as in the estimate
    let v_top = f64::max(v_top, v1);
    let duration = arrival_time - time;
    if duration <= 0.0 {
        return Err(KinematicsError::ArrivalInPast {
            now: time,
            arrival: arrival_time,
        });
    }

    // Time spent changing between two velocities, in s/(m/s)
    let rate_up = 1.0 / accel;
    let rate_down = -1.0 / decel;
    let change_time = |from: f64, to: f64| {
        if to >= from {
            (to - from) * rate_up
        } else {
            (from - to) * rate_down
        }
    };
    if v_end > v_top || change_time(v1, v_end) > duration + DURATION_TOLERANCE {
        return Err(KinematicsError::CannotChangeVelocityInTime {
            from: v1,
            to: v_end,
            duration,
        });
    }

    // The range of cruising velocities for which both ramps fit in the duration
    let v_hi = f64::min(
        (duration + v1 * rate_up + v_end * rate_down) / (rate_up + rate_down),
        v_top,
    );
    let v_lo = f64::min(
        f64::max(
            (v1 * rate_down + v_end * rate_up - duration) / (rate_up + rate_down),
            0.0,
        ),
        v_hi,
    );

    let phases = |vc: f64| {
        let ta = change_time(v1, vc);
        let tb = change_time(vc, v_end);
        let tc = f64::max(duration - ta - tb, 0.0);
        let d = 0.5 * (v1 + vc) * ta + vc * tc + 0.5 * (vc + v_end) * tb;
        (ta, tc, tb, d)
    };

    let max_distance = phases(v_hi).3;
    if dist > max_distance + DISTANCE_TOLERANCE {
        return Err(KinematicsError::ArrivesTooLate { max_distance, distance: dist });
    }
    let min_distance = phases(v_lo).3;
    if dist < min_distance - DISTANCE_TOLERANCE {
        return Err(KinematicsError::ArrivesTooEarly { min_distance, distance: dist });
    }

    let (mut lo, mut hi) = (v_lo, v_hi);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if phases(mid).3 < dist {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let vc = 0.5 * (lo + hi);
    let (ta, tc, tb, _) = phases(vc);
    let acc_a = if vc >= v1 { accel } else { decel };
    let acc_b = if v_end >= vc { accel } else { decel };
    let (schedule, _) = schedule_from_phases(time, [(ta, acc_a), (tc, 0.0), (tb, acc_b)])?;
    Ok(schedule)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn query(vel: f64, arrival_time: f64, arrival_vel: f64, dist: f64) -> ReservationQuery {
        ReservationQuery {
            time: 0.0,
            vel,
            arrival_time,
            arrival_vel,
            dist,
            v_top: 25.0,
            accel: 2.0,
            decel: -4.0,
        }
    }

    fn assert_arrives(q: &ReservationQuery, schedule: &AccelSchedule) {
        let (d, v) = schedule.calc_final_distance_and_velocity(q.time, q.vel, q.arrival_time);
        assert_approx_eq!(d, q.dist, 1e-6);
        assert_approx_eq!(v, q.arrival_vel, 1e-6);
    }

    #[test]
    fn cruise_at_constant_velocity() {
        let q = query(10.0, 10.0, 10.0, 100.0);
        let schedule = check_reservation(&q).unwrap();
        assert_arrives(&q, &schedule);
    }

    #[test]
    fn accelerate_into_arrival() {
        let q = query(5.0, 8.0, 15.0, 100.0);
        let schedule = check_reservation(&q).unwrap();
        assert_arrives(&q, &schedule);
    }

    #[test]
    fn wait_then_go() {
        // Stop, wait, then pull away to arrive slowly
        let q = query(10.0, 20.0, 4.0, 20.0);
        let schedule = check_reservation(&q).unwrap();
        assert_arrives(&q, &schedule);
    }

    #[test]
    fn too_late() {
        // Even flat out from rest only ~ (20 m/s over 10 s) is possible
        let q = query(0.0, 10.0, 20.0, 500.0);
        assert!(matches!(
            check_reservation(&q),
            Err(KinematicsError::ArrivesTooLate { .. })
        ));
    }

    #[test]
    fn too_early() {
        // At 20 m/s the vehicle cannot avoid covering ground before arriving at 20 m/s
        let q = query(20.0, 10.0, 20.0, 50.0);
        assert!(matches!(
            check_reservation(&q),
            Err(KinematicsError::ArrivesTooEarly { .. })
        ));
    }

    #[test]
    fn velocity_change_too_large() {
        let q = query(0.0, 2.0, 20.0, 20.0);
        assert!(matches!(
            check_reservation(&q),
            Err(KinematicsError::CannotChangeVelocityInTime { .. })
        ));
    }

    #[test]
    fn over_the_limit_accepts_its_own_estimate() {
        // 20 m/s on a 15 m/s lane: the estimate holds 20 m/s, then slows to 10 m/s
        let est = crate::arrival::estimate_arrival(&crate::arrival::ArrivalQuery {
            time: 0.0,
            vel: 20.0,
            dist: 100.0,
            v_top: 15.0,
            v_end_max: 10.0,
            accel: 2.0,
            decel: -4.0,
        })
        .unwrap();
        assert_approx_eq!(est.arrival_time, 5.625);
        let q = ReservationQuery {
            v_top: 15.0,
            ..query(20.0, est.arrival_time, est.arrival_velocity, 100.0)
        };
        let schedule = check_reservation(&q).unwrap();
        assert_arrives(&q, &schedule);
    }

    #[test]
    fn arrival_in_past() {
        let q = query(10.0, 0.0, 10.0, 0.0);
        assert!(matches!(
            check_reservation(&q),
            Err(KinematicsError::ArrivalInPast { .. })
        ));
    }
}
