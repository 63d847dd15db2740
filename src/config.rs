//! Protocol timing and distance parameters.

use crate::error::ConfigError;

/// The parameters shared by all coordinator flavours.
///
/// The defaults match the manager implementations the protocol was designed
/// against; change them together with the manager's configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProtocolConfig {
    /// The length of a simulation tick in s.
    pub time_step: f64,
    /// The maximum error of the vehicle's clock in s.
    pub max_clock_error: f64,
    /// How far in the future, in s, the manager accepts reservations.
    pub manager_max_future_reservation_time: f64,
    /// The minimum lead time of a proposed arrival, in s. A reservation cannot
    /// be made for right now: the request must be sent, processed and answered.
    pub minimum_future_reservation_time: f64,
    /// The tolerance on the arrival velocity, in m/s.
    pub arrival_velocity_precision: f64,
    /// How long to wait for a reply before giving up and trying again, in s.
    /// `None` waits forever.
    pub request_timeout: Option<f64>,
    /// The delay before retrying after a failed attempt to prepare a request, in s.
    pub sending_request_delay: f64,
    /// The maximum expected time for the manager to reply to a request, in s.
    pub max_expected_reply_time: f64,
    /// The reduction in acceleration, in m/s<sup>2</sup>, used when estimating
    /// arrival without a stopping schedule to fall back on.
    pub arrival_estimate_accel_slack: f64,
    /// The distance before the zone at which vehicles stop, in m.
    pub stop_distance_before_zone: f64,
    /// The gap kept to the vehicle ahead on top of the stopping distance, in m.
    pub minimum_following_distance: f64,
    /// Whether vehicles must be stopped at the zone before requesting.
    pub must_stop_before_zone: bool,
    /// Extra distance allowed when `must_stop_before_zone` is set, in m.
    pub additional_stop_distance: f64,
    /// The minimum gap between two queue requests, in s.
    pub queue_request_time_gap: f64,
    /// Below this velocity, in m/s, uncoordinated vehicles drive reactively.
    pub min_max_turn_velocity: f64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            time_step: 0.02,
            max_clock_error: 0.5,
            manager_max_future_reservation_time: 10.0,
            minimum_future_reservation_time: 0.1,
            arrival_velocity_precision: 3.0,
            request_timeout: None,
            sending_request_delay: 0.02,
            max_expected_reply_time: 0.04,
            arrival_estimate_accel_slack: 1.0,
            stop_distance_before_zone: 1.0,
            minimum_following_distance: 2.0,
            must_stop_before_zone: false,
            additional_stop_distance: 0.0,
            queue_request_time_gap: 0.1,
            min_max_turn_velocity: 5.0,
        }
    }
}

impl ProtocolConfig {
    /// The latest arrival time, relative to now, the vehicle will propose.
    pub fn maximum_future_reservation_time(&self) -> f64 {
        self.manager_max_future_reservation_time - self.max_clock_error
    }

    /// Checks that the parameters can drive a live protocol.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("time_step", self.time_step),
            ("sending_request_delay", self.sending_request_delay),
            ("queue_request_time_gap", self.queue_request_time_gap),
            (
                "maximum_future_reservation_time",
                self.maximum_future_reservation_time(),
            ),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        let non_negative = [
            ("max_clock_error", self.max_clock_error),
            ("minimum_future_reservation_time", self.minimum_future_reservation_time),
            ("arrival_velocity_precision", self.arrival_velocity_precision),
            ("max_expected_reply_time", self.max_expected_reply_time),
            ("arrival_estimate_accel_slack", self.arrival_estimate_accel_slack),
            ("stop_distance_before_zone", self.stop_distance_before_zone),
            ("minimum_following_distance", self.minimum_following_distance),
            ("additional_stop_distance", self.additional_stop_distance),
            ("min_max_turn_velocity", self.min_max_turn_velocity),
            ("request_timeout", self.request_timeout.unwrap_or(0.0)),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ConfigError::Negative { field, value });
            }
        }
        Ok(())
    }

    /// Parses and validates a configuration from JSON. Missing fields take
    /// their default values.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.maximum_future_reservation_time(), 9.5);
    }

    #[test]
    fn zero_retry_delay_is_rejected() {
        let config = ProtocolConfig {
            sending_request_delay: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "sending_request_delay",
                ..
            })
        ));
    }

    #[test]
    fn negative_timeout_is_rejected() {
        let config = ProtocolConfig {
            request_timeout: Some(-1.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json() {
        let config = ProtocolConfig::from_json(r#"{ "request_timeout": 2.0 }"#).unwrap();
        assert_eq!(config.request_timeout, Some(2.0));
        assert_eq!(config.time_step, 0.02);
    }
}
