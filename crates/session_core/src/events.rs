//! Setup-event-list filter: which asynchronous events the card asked to hear
//! about, and how their cause payloads are encoded.

use shared::domain::EventKind;
use shared::protocol::{EventListSettings, EVENT_CAUSE_LEN};

/// Active event subscription set. Reflects exactly the most recent
/// SetupEventList command; replacement is wholesale, never a merge.
#[derive(Debug, Default)]
pub struct EventFilter {
    settings: Option<EventListSettings>,
}

impl EventFilter {
    pub fn is_subscribed(&self, event: EventKind) -> bool {
        self.settings
            .as_ref()
            .is_some_and(|settings| settings.events.contains(&event))
    }

    pub fn replace(&mut self, settings: EventListSettings) {
        self.settings = Some(settings);
    }

    pub fn clear(&mut self) {
        self.settings = None;
    }

    /// Fixed-size cause buffer for an event report. Browser termination puts
    /// its cause in the first byte; every other slot stays zero.
    pub fn encode_cause(event: EventKind, raw_cause: u8) -> [u8; EVENT_CAUSE_LEN] {
        let mut cause = [0u8; EVENT_CAUSE_LEN];
        if event == EventKind::BrowserTermination {
            cause[0] = raw_cause;
        }
        cause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_filter_subscribes_to_nothing() {
        let filter = EventFilter::default();
        assert!(!filter.is_subscribed(EventKind::BrowserTermination));
    }

    #[test]
    fn replace_is_wholesale() {
        let mut filter = EventFilter::default();
        filter.replace(EventListSettings {
            events: vec![EventKind::UserActivity, EventKind::BrowserTermination],
        });
        assert!(filter.is_subscribed(EventKind::UserActivity));

        filter.replace(EventListSettings {
            events: vec![EventKind::IdleScreenAvailable],
        });
        assert!(!filter.is_subscribed(EventKind::UserActivity));
        assert!(!filter.is_subscribed(EventKind::BrowserTermination));
        assert!(filter.is_subscribed(EventKind::IdleScreenAvailable));
    }

    #[test]
    fn browser_termination_cause_lands_in_first_byte() {
        let cause = EventFilter::encode_cause(EventKind::BrowserTermination, 2);
        assert_eq!(cause[0], 2);
        assert!(cause[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn other_events_encode_a_zero_buffer() {
        let cause = EventFilter::encode_cause(EventKind::UserActivity, 7);
        assert_eq!(cause, [0u8; EVENT_CAUSE_LEN]);
    }
}
