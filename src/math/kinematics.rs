//! Closed-form formulas for motion under constant acceleration.
//!
//! Accelerations are signed: decelerations are negative numbers in m/s<sup>2</sup>.
//! Velocities never become negative; a vehicle which decelerates to a halt stays halted.

/// Calculates the distance needed to change velocity from `v1` to `v2`
/// at the constant acceleration `acc`.
///
/// Returns infinity if the change is impossible at that acceleration.
pub fn distance_to_change(v1: f64, v2: f64, acc: f64) -> f64 {
    if v1 == v2 {
        0.0
    } else if acc == 0.0 || (v2 - v1).signum() != acc.signum() {
        f64::INFINITY
    } else {
        (v2 * v2 - v1 * v1) / (2.0 * acc)
    }
}

/// Calculates the time needed to change velocity from `v1` to `v2`
/// at the constant acceleration `acc`.
///
/// Returns infinity if the change is impossible at that acceleration.
pub fn time_to_change(v1: f64, v2: f64, acc: f64) -> f64 {
    if v1 == v2 {
        0.0
    } else if acc == 0.0 || (v2 - v1).signum() != acc.signum() {
        f64::INFINITY
    } else {
        (v2 - v1) / acc
    }
}

/// Calculates the distance needed to stop from velocity `vel`
/// at the deceleration `decel` (a negative number).
pub fn distance_to_stop(vel: f64, decel: f64) -> f64 {
    distance_to_change(vel, 0.0, decel)
}

/// Calculates the distance travelled and the final velocity after `dt` seconds,
/// starting at velocity `vel` and accelerating at `acc`.
pub fn advance(vel: f64, acc: f64, dt: f64) -> (f64, f64) {
    let end_vel = vel + acc * dt;
    if end_vel >= 0.0 {
        (0.5 * (vel + end_vel) * dt, end_vel)
    } else {
        // Comes to a halt part way through
        (distance_to_stop(vel, acc), 0.0)
    }
}

/// Calculates the time taken to travel `dist`, starting at velocity `vel`
/// and accelerating at `acc`. Returns `None` if the vehicle halts first.
pub fn time_to_travel(vel: f64, acc: f64, dist: f64) -> Option<f64> {
    if dist <= 0.0 {
        return Some(0.0);
    }
    if acc == 0.0 {
        return (vel > 0.0).then(|| dist / vel);
    }
    let discr = vel * vel + 2.0 * acc * dist;
    if discr < 0.0 {
        return None;
    }
    Some((discr.sqrt() - vel) / acc)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn stopping() {
        assert_approx_eq!(distance_to_stop(20.0, -4.0), 50.0);
        assert_approx_eq!(time_to_change(20.0, 0.0, -4.0), 5.0);
        assert_eq!(distance_to_stop(0.0, -4.0), 0.0);
        assert_eq!(distance_to_change(0.0, 10.0, -4.0), f64::INFINITY);
    }

    #[test]
    fn advance_halts_at_zero() {
        let (d, v) = advance(10.0, -5.0, 3.0);
        assert_approx_eq!(d, 10.0);
        assert_eq!(v, 0.0);

        let (d, v) = advance(10.0, 2.0, 1.0);
        assert_approx_eq!(d, 11.0);
        assert_approx_eq!(v, 12.0);
    }

    #[test]
    fn travel_time() {
        assert_approx_eq!(time_to_travel(0.0, 2.0, 25.0).unwrap(), 5.0);
        assert_approx_eq!(time_to_travel(10.0, 0.0, 25.0).unwrap(), 2.5);
        assert!(time_to_travel(10.0, -5.0, 11.0).is_none());
        assert!(time_to_travel(0.0, 0.0, 1.0).is_none());
    }
}
