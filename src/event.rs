//! Coordinator events, for tracing and debugging protocol runs.

use crate::VehicleId;
use log::{debug, error, info, log_enabled, warn, Level};

/// Something that happened inside a coordinator.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CoordinatorEvent {
    /// The vehicle whose coordinator raised the event.
    pub vehicle: VehicleId,
    /// The vehicle's clock in s.
    pub time: f64,
    pub kind: EventKind,
}

/// The kinds of [CoordinatorEvent].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum EventKind {
    /// The state machine moved to a new state.
    StateChanged {
        from: &'static str,
        to: &'static str,
    },
    /// A message was queued for transmission.
    MessageSent { message: &'static str },
    /// An inbound message was dropped.
    MessageDiscarded {
        message: &'static str,
        state: &'static str,
        /// Whether it answered a request other than the outstanding one.
        stale: bool,
    },
    /// No proposal could be made this attempt.
    ProposalFailed { reason: String },
    /// The manager granted a reservation.
    ReservationConfirmed { reservation_id: u32 },
    /// A reservation was given up.
    ReservationCancelled {
        reservation_id: Option<u32>,
        cause: &'static str,
    },
    /// The manager refused a request.
    RequestRejected { reason: &'static str },
    /// No reply arrived in time.
    RequestTimedOut,
    /// The vehicle may not send another request until `until`.
    Backoff { until: f64 },
    /// The coordinator hit an unrecoverable condition.
    Fatal { message: String },
}

/// Receives events from coordinators.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
pub trait EventSink {
    /// Called for every event, in the order they happen.
    fn on_event(&mut self, _event: &CoordinatorEvent) {}
}

/// An [EventSink] that does nothing.
pub struct NoopSink;

impl EventSink for NoopSink {}

/// An [EventSink] which writes events to the `log` facade.
pub struct LogSink;

impl EventSink for LogSink {
    fn on_event(&mut self, event: &CoordinatorEvent) {
        let level = match &event.kind {
            EventKind::Fatal { .. } => Level::Error,
            EventKind::MessageDiscarded { .. } | EventKind::ReservationCancelled { .. } => {
                Level::Warn
            }
            EventKind::ReservationConfirmed { .. } | EventKind::RequestRejected { .. } => {
                Level::Info
            }
            _ => Level::Debug,
        };
        if log_enabled!(level) {
            let (vehicle, time, kind) = (event.vehicle, event.time, &event.kind);
            match level {
                Level::Error => error!("{vehicle:?} t={time:.2}: {kind:?}"),
                Level::Warn => warn!("{vehicle:?} t={time:.2}: {kind:?}"),
                Level::Info => info!("{vehicle:?} t={time:.2}: {kind:?}"),
                _ => debug!("{vehicle:?} t={time:.2}: {kind:?}"),
            }
        }
    }
}

/// An [EventSink] which keeps every event.
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    events: Vec<CoordinatorEvent>,
}

impl EventRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded events, oldest first.
    pub fn events(&self) -> &[CoordinatorEvent] {
        &self.events
    }

    /// Takes the recorded events, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<CoordinatorEvent> {
        std::mem::take(&mut self.events)
    }

    /// The number of recorded events matching the predicate.
    pub fn count(&self, pred: impl Fn(&EventKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }

    /// The sequence of states entered, oldest first.
    pub fn states_entered(&self) -> Vec<&'static str> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::StateChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }

    /// Exports the recorded events as JSON.
    #[cfg(feature = "debug")]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!(self.events)
    }
}

impl EventSink for EventRecorder {
    fn on_event(&mut self, event: &CoordinatorEvent) {
        self.events.push(event.clone());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn event(kind: EventKind) -> CoordinatorEvent {
        CoordinatorEvent {
            vehicle: VehicleId::default(),
            time: 1.0,
            kind,
        }
    }

    #[test]
    fn recorder() {
        let mut recorder = EventRecorder::new();
        recorder.on_event(&event(EventKind::StateChanged {
            from: "Planning",
            to: "DefaultDriving",
        }));
        recorder.on_event(&event(EventKind::RequestTimedOut));
        recorder.on_event(&event(EventKind::StateChanged {
            from: "DefaultDriving",
            to: "Planning",
        }));
        assert_eq!(recorder.states_entered(), vec!["DefaultDriving", "Planning"]);
        assert_eq!(
            recorder.count(|k| matches!(k, EventKind::RequestTimedOut)),
            1
        );
        assert_eq!(recorder.take().len(), 3);
        assert!(recorder.events().is_empty());
    }

    #[cfg(feature = "debug")]
    #[test]
    fn json_export() {
        let mut recorder = EventRecorder::new();
        recorder.on_event(&event(EventKind::Backoff { until: 2.5 }));
        let json = recorder.to_json();
        assert_eq!(json[0]["kind"]["Backoff"]["until"], 2.5);
    }
}
