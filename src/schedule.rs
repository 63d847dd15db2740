use crate::error::KinematicsError;
use crate::math::{advance, time_to_travel};
use crate::util::snap_to_zero;
use itertools::Itertools;
use smallvec::SmallVec;
use std::iter::once;

/// A change in a vehicle's acceleration at an absolute point in time.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccelChange {
    /// The simulation time of the change in s.
    pub time: f64,
    /// The acceleration from `time` onwards in m/s<sup>2</sup>.
    pub acc: f64,
}

/// A time-ordered acceleration plan.
///
/// The acceleration is zero before the first change and holds the value of the
/// last change forever after it. Schedules are never edited once built;
/// a new plan replaces the old one wholesale.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccelSchedule {
    changes: SmallVec<[AccelChange; 4]>,
}

impl AccelSchedule {
    /// Creates a schedule from `(time, acceleration)` pairs,
    /// which must be finite and in non-decreasing time order.
    pub fn new(changes: impl IntoIterator<Item = (f64, f64)>) -> Result<Self, KinematicsError> {
        let changes = changes
            .into_iter()
            .map(|(time, acc)| AccelChange { time, acc })
            .collect::<SmallVec<[AccelChange; 4]>>();
        let mut last = f64::NEG_INFINITY;
        for change in &changes {
            if !change.time.is_finite() || !change.acc.is_finite() || change.time < last {
                return Err(KinematicsError::UnorderedSchedule { time: change.time });
            }
            last = change.time;
        }
        Ok(Self { changes })
    }

    /// The acceleration changes, in time order.
    pub fn changes(&self) -> &[AccelChange] {
        &self.changes
    }

    /// Whether the schedule has no changes at all.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The time of the last acceleration change, if there is one.
    pub fn end_time(&self) -> Option<f64> {
        self.changes.last().map(|c| c.time)
    }

    /// The scheduled acceleration at the given time.
    pub fn acceleration_at(&self, time: f64) -> f64 {
        self.changes
            .iter()
            .take_while(|c| c.time <= time)
            .last()
            .map(|c| c.acc)
            .unwrap_or(0.0)
    }

    /// Calculates the distance travelled and the final velocity if the vehicle
    /// follows the schedule from `(time1, vel1)` until `time_end`.
    pub fn calc_final_distance_and_velocity(
        &self,
        time1: f64,
        vel1: f64,
        time_end: f64,
    ) -> (f64, f64) {
        let mut dist = 0.0;
        let mut vel = vel1;
        for (start, end, acc) in self.segments(time1) {
            if start >= time_end {
                break;
            }
            let (d, v) = advance(vel, acc, f64::min(end, time_end) - start);
            dist += d;
            vel = v;
        }
        (dist, snap_to_zero(vel))
    }

    /// Calculates the time at which the vehicle, following the schedule from
    /// `(time1, vel1)`, will have travelled `dist`, and its velocity then.
    /// Returns `None` if the vehicle comes to a permanent halt first.
    pub fn calc_final_time_and_velocity(
        &self,
        time1: f64,
        vel1: f64,
        dist: f64,
    ) -> Option<(f64, f64)> {
        let mut remaining = dist;
        let mut vel = vel1;
        for (start, end, acc) in self.segments(time1) {
            let step = end.is_finite().then(|| advance(vel, acc, end - start));
            match step {
                Some((d, v)) if d < remaining => {
                    remaining -= d;
                    vel = v;
                }
                _ => {
                    let dt = time_to_travel(vel, acc, remaining)?;
                    let end_vel = f64::max(vel + acc * dt, 0.0);
                    return Some((start + dt, snap_to_zero(end_vel)));
                }
            }
        }
        None
    }

    /// Iterates the constant-acceleration pieces from `from` onwards,
    /// as `(start, end, acceleration)`. The last piece ends at infinity.
    fn segments(&self, from: f64) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        let first = AccelChange {
            time: from,
            acc: self.acceleration_at(from),
        };
        let last = AccelChange {
            time: f64::INFINITY,
            acc: 0.0,
        };
        once(first)
            .chain(self.changes.iter().copied().filter(move |c| c.time > from))
            .chain(once(last))
            .tuple_windows()
            .map(|(a, b)| (a.time, b.time, a.acc))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn accel_cruise_stop() -> AccelSchedule {
        // 0..5s at 2 m/s^2 to 10 m/s, cruise to 7s, stop at -5 m/s^2 by 9s
        AccelSchedule::new([(0.0, 2.0), (5.0, 0.0), (7.0, -5.0), (9.0, 0.0)]).unwrap()
    }

    #[test]
    fn rejects_unordered() {
        assert!(AccelSchedule::new([(1.0, 1.0), (0.5, 0.0)]).is_err());
        assert!(AccelSchedule::new([(f64::NAN, 1.0)]).is_err());
    }

    #[test]
    fn acceleration_lookup() {
        let s = accel_cruise_stop();
        assert_eq!(s.acceleration_at(-1.0), 0.0);
        assert_eq!(s.acceleration_at(0.0), 2.0);
        assert_eq!(s.acceleration_at(6.0), 0.0);
        assert_eq!(s.acceleration_at(8.0), -5.0);
        assert_eq!(s.end_time(), Some(9.0));
    }

    #[test]
    fn distance_and_velocity() {
        let s = accel_cruise_stop();
        let (d, v) = s.calc_final_distance_and_velocity(0.0, 0.0, 5.0);
        assert_approx_eq!(d, 25.0);
        assert_approx_eq!(v, 10.0);

        let (d, v) = s.calc_final_distance_and_velocity(0.0, 0.0, 100.0);
        assert_approx_eq!(d, 25.0 + 20.0 + 10.0);
        assert_eq!(v, 0.0);

        // Starting part way through
        let (d, v) = s.calc_final_distance_and_velocity(6.0, 10.0, 7.0);
        assert_approx_eq!(d, 10.0);
        assert_approx_eq!(v, 10.0);
    }

    #[test]
    fn time_and_velocity() {
        let s = accel_cruise_stop();
        let (t, v) = s.calc_final_time_and_velocity(0.0, 0.0, 35.0).unwrap();
        assert_approx_eq!(t, 6.0);
        assert_approx_eq!(v, 10.0);

        let (t, v) = s.calc_final_time_and_velocity(0.0, 0.0, 55.0).unwrap();
        assert_approx_eq!(t, 9.0, 1e-6);
        assert_approx_eq!(v, 0.0, 1e-6);

        assert!(s.calc_final_time_and_velocity(0.0, 0.0, 56.0).is_none());
    }
}
