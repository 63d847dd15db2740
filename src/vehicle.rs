use crate::math::advance;
use crate::schedule::AccelSchedule;
use crate::util::snap_to_zero;
use crate::VehicleId;

/// The physical limits of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleSpec {
    /// The maximum acceleration of the vehicle, in m/s<sup>2</sup>.
    pub max_acceleration: f64,
    /// The maximum deceleration of the vehicle, a negative number in m/s<sup>2</sup>.
    pub max_deceleration: f64,
    /// The top speed in m/s.
    pub max_velocity: f64,
    /// The vehicle length in m.
    pub length: f64,
    /// The vehicle width in m.
    pub width: f64,
}

/// The vehicle a coordinator drives.
pub trait VehicleModel {
    /// Gets the vehicle's ID.
    fn id(&self) -> VehicleId;

    /// The vehicle's clock in s.
    fn time(&self) -> f64;

    /// The vehicle's velocity in m/s.
    fn velocity(&self) -> f64;

    /// The vehicle's physical limits.
    fn spec(&self) -> &VehicleSpec;

    /// The installed acceleration plan, if any.
    fn accel_schedule(&self) -> Option<&AccelSchedule>;

    /// Installs an acceleration plan, replacing any previous one.
    fn set_accel_schedule(&mut self, schedule: AccelSchedule);

    /// Removes the acceleration plan, returning control to the pilot.
    fn remove_accel_schedule(&mut self);

    /// Brakes at the maximum deceleration.
    fn slow_to_stop(&mut self);

    /// The gap to the vehicle ahead in m, if one is sensed.
    fn distance_to_car_in_front(&self) -> Option<f64>;

    /// The ID of the vehicle ahead, if one is sensed.
    fn preceding_vehicle(&self) -> Option<VehicleId>;
}

/// A point-mass vehicle travelling along a single line.
///
/// While an [AccelSchedule] is installed the vehicle follows it exactly;
/// otherwise it holds whatever acceleration was last applied.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    id: VehicleId,
    /// The physical limits.
    spec: VehicleSpec,
    /// The vehicle's clock in s.
    time: f64,
    /// The longitudinal position in m.
    pos: f64,
    /// The velocity in m/s.
    vel: f64,
    /// The applied acceleration in m/s<sup>2</sup>.
    acc: f64,
    /// The installed acceleration plan.
    schedule: Option<AccelSchedule>,
    /// The vehicle ahead and the gap to it in m.
    leader: Option<(VehicleId, f64)>,
}

impl Vehicle {
    /// Creates a new vehicle at rest at the origin.
    pub fn new(id: VehicleId, spec: &VehicleSpec) -> Self {
        Self {
            id,
            spec: *spec,
            time: 0.0,
            pos: 0.0,
            vel: 0.0,
            acc: 0.0,
            schedule: None,
            leader: None,
        }
    }

    /// Places the vehicle.
    pub fn set_state(&mut self, time: f64, pos: f64, vel: f64) {
        self.time = time;
        self.pos = pos;
        self.vel = vel;
    }

    /// The longitudinal position in m.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The acceleration the vehicle is applying now, in m/s<sup>2</sup>.
    pub fn acc(&self) -> f64 {
        match &self.schedule {
            Some(schedule) => schedule.acceleration_at(self.time),
            None => self.acc,
        }
    }

    /// Applies an acceleration, clamped to the vehicle's limits.
    /// Has no effect while a schedule is installed.
    pub fn apply_acc(&mut self, acc: f64) {
        self.acc = acc.clamp(self.spec.max_deceleration, self.spec.max_acceleration);
    }

    /// Sets the vehicle ahead and the gap to it in m.
    pub fn set_leader(&mut self, leader: Option<(VehicleId, f64)>) {
        self.leader = leader;
    }

    /// Integrates the vehicle's velocity and position.
    ///
    /// # Parameters
    /// * `dt` - The time step in seconds
    pub fn integrate(&mut self, dt: f64) {
        let (dist, vel) = match &self.schedule {
            Some(schedule) => {
                schedule.calc_final_distance_and_velocity(self.time, self.vel, self.time + dt)
            }
            None => advance(self.vel, self.acc, dt),
        };
        self.pos += dist;
        self.vel = snap_to_zero(f64::min(vel, self.spec.max_velocity));
        self.time += dt;
    }
}

impl VehicleModel for Vehicle {
    fn id(&self) -> VehicleId {
        self.id
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn velocity(&self) -> f64 {
        self.vel
    }

    fn spec(&self) -> &VehicleSpec {
        &self.spec
    }

    fn accel_schedule(&self) -> Option<&AccelSchedule> {
        self.schedule.as_ref()
    }

    fn set_accel_schedule(&mut self, schedule: AccelSchedule) {
        self.schedule = Some(schedule);
    }

    fn remove_accel_schedule(&mut self) {
        self.schedule = None;
    }

    fn slow_to_stop(&mut self) {
        self.acc = self.spec.max_deceleration;
    }

    fn distance_to_car_in_front(&self) -> Option<f64> {
        self.leader.map(|(_, gap)| gap)
    }

    fn preceding_vehicle(&self) -> Option<VehicleId> {
        self.leader.map(|(id, _)| id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn spec() -> VehicleSpec {
        VehicleSpec {
            max_acceleration: 2.0,
            max_deceleration: -4.0,
            max_velocity: 25.0,
            length: 4.0,
            width: 2.0,
        }
    }

    #[test]
    fn follows_schedule() {
        let mut veh = Vehicle::new(VehicleId::default(), &spec());
        veh.set_accel_schedule(AccelSchedule::new([(0.0, 2.0), (1.0, 0.0)]).unwrap());
        for _ in 0..100 {
            veh.integrate(0.02);
        }
        assert_approx_eq!(veh.time(), 2.0, 1e-9);
        assert_approx_eq!(veh.velocity(), 2.0, 1e-9);
        assert_approx_eq!(veh.pos(), 1.0 + 2.0, 1e-9);
    }

    #[test]
    fn slow_to_stop_halts() {
        let mut veh = Vehicle::new(VehicleId::default(), &spec());
        veh.set_state(0.0, 0.0, 10.0);
        veh.slow_to_stop();
        for _ in 0..200 {
            veh.integrate(0.02);
        }
        assert_eq!(veh.velocity(), 0.0);
        assert_approx_eq!(veh.pos(), 12.5, 1e-9);
    }

    #[test]
    fn applied_acceleration_is_clamped() {
        let mut veh = Vehicle::new(VehicleId::default(), &spec());
        veh.apply_acc(10.0);
        assert_eq!(veh.acc(), 2.0);
        veh.apply_acc(-10.0);
        assert_eq!(veh.acc(), -4.0);
    }
}
