use biometrics::{Collector, Counter, Moments};

pub(crate) static UPSTREAM_REQUESTS: Counter = Counter::new("chatrelay.upstream.requests");
pub(crate) static UPSTREAM_REQUEST_ERRORS: Counter =
    Counter::new("chatrelay.upstream.request_errors");
pub(crate) static UPSTREAM_REQUEST_DURATION: Moments =
    Moments::new("chatrelay.upstream.request_duration_seconds");

pub(crate) static TURNS: Counter = Counter::new("chatrelay.conversation.turns");
pub(crate) static TURN_INVALID_INPUT: Counter =
    Counter::new("chatrelay.conversation.turn_invalid_input");
pub(crate) static TURN_CONFIGURATION_ERRORS: Counter =
    Counter::new("chatrelay.conversation.turn_configuration_errors");
pub(crate) static TURN_UPSTREAM_ERRORS: Counter =
    Counter::new("chatrelay.conversation.turn_upstream_errors");
pub(crate) static TURN_TIMEOUTS: Counter = Counter::new("chatrelay.conversation.turn_timeouts");
pub(crate) static TURN_DURATION: Moments =
    Moments::new("chatrelay.conversation.turn_duration_seconds");
pub(crate) static HISTORY_TRIMMED: Counter =
    Counter::new("chatrelay.conversation.history_trimmed");

pub(crate) static SESSIONS_CLEARED: Counter = Counter::new("chatrelay.store.sessions_cleared");
pub(crate) static SESSIONS_EXPIRED: Counter = Counter::new("chatrelay.store.sessions_expired");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&UPSTREAM_REQUESTS);
    collector.register_counter(&UPSTREAM_REQUEST_ERRORS);
    collector.register_moments(&UPSTREAM_REQUEST_DURATION);

    collector.register_counter(&TURNS);
    collector.register_counter(&TURN_INVALID_INPUT);
    collector.register_counter(&TURN_CONFIGURATION_ERRORS);
    collector.register_counter(&TURN_UPSTREAM_ERRORS);
    collector.register_counter(&TURN_TIMEOUTS);
    collector.register_moments(&TURN_DURATION);
    collector.register_counter(&HISTORY_TRIMMED);

    collector.register_counter(&SESSIONS_CLEARED);
    collector.register_counter(&SESSIONS_EXPIRED);
}
