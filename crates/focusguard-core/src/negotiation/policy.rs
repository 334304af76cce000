//! Per-event-type negotiation policy.
//!
//! | event type       | ceiling (H/M/L) | counter-offer              | default |
//! |------------------|-----------------|----------------------------|---------|
//! | ScrollLoop       | 15              | min(req * 0.6, 10)         | 10      |
//! | DistractionSite  | 5 / 10 / 20     | 5 / min(req*0.7,10) / min(req*0.8,15) | 5 if High, else 10 |
//! | AdultContent     | 0               | 0                          | 0       |
//! | Other            | 15              | min(req * 0.7, 10)         | 10      |
//!
//! Every counter-offer and default stays within the ceiling for its
//! event type and severity.

use crate::event::{EventType, Severity};

/// Largest duration (minutes) accepted without a counter-offer.
pub fn ceiling_minutes(event_type: EventType, severity: Severity) -> f64 {
    match (event_type, severity) {
        (EventType::AdultContent, _) => 0.0,
        (EventType::ScrollLoop, _) => 15.0,
        (EventType::DistractionSite, Severity::High) => 5.0,
        (EventType::DistractionSite, Severity::Medium) => 10.0,
        (EventType::DistractionSite, Severity::Low) => 20.0,
        (EventType::Other, _) => 15.0,
    }
}

/// Counter-offer for a request above the ceiling.
pub fn counter_offer_minutes(event_type: EventType, severity: Severity, requested: f64) -> f64 {
    let scaled = |factor: f64, cap: f64| (requested * factor).min(cap);
    match (event_type, severity) {
        (EventType::AdultContent, _) => 0.0,
        (EventType::ScrollLoop, _) => scaled(0.6, 10.0),
        (EventType::DistractionSite, Severity::High) => 5.0,
        (EventType::DistractionSite, Severity::Medium) => scaled(0.7, 10.0),
        (EventType::DistractionSite, Severity::Low) => scaled(0.8, 15.0),
        (EventType::Other, _) => scaled(0.7, 10.0),
    }
}

/// Limit imposed when the user never names a duration.
pub fn default_limit_minutes(event_type: EventType, severity: Severity) -> f64 {
    match (event_type, severity) {
        (EventType::AdultContent, _) => 0.0,
        (EventType::ScrollLoop, _) => 10.0,
        (EventType::DistractionSite, Severity::High) => 5.0,
        (EventType::DistractionSite, _) => 10.0,
        (EventType::Other, _) => 10.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [EventType; 4] = [
        EventType::ScrollLoop,
        EventType::AdultContent,
        EventType::DistractionSite,
        EventType::Other,
    ];
    const ALL_SEVERITIES: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    #[test]
    fn distraction_ceilings_by_severity() {
        assert_eq!(ceiling_minutes(EventType::DistractionSite, Severity::High), 5.0);
        assert_eq!(ceiling_minutes(EventType::DistractionSite, Severity::Medium), 10.0);
        assert_eq!(ceiling_minutes(EventType::DistractionSite, Severity::Low), 20.0);
    }

    #[test]
    fn scroll_counter_offer() {
        assert_eq!(counter_offer_minutes(EventType::ScrollLoop, Severity::Medium, 60.0), 10.0);
        assert!((counter_offer_minutes(EventType::ScrollLoop, Severity::Medium, 16.0) - 9.6).abs() < 1e-9);
    }

    #[test]
    fn distraction_counter_offers() {
        assert_eq!(counter_offer_minutes(EventType::DistractionSite, Severity::High, 90.0), 5.0);
        assert!((counter_offer_minutes(EventType::DistractionSite, Severity::Medium, 12.0) - 8.4).abs() < 1e-9);
        assert_eq!(counter_offer_minutes(EventType::DistractionSite, Severity::Low, 60.0), 15.0);
        assert_eq!(counter_offer_minutes(EventType::DistractionSite, Severity::Low, 21.0), 15.0);
    }

    #[test]
    fn defaults() {
        assert_eq!(default_limit_minutes(EventType::ScrollLoop, Severity::Low), 10.0);
        assert_eq!(default_limit_minutes(EventType::DistractionSite, Severity::High), 5.0);
        assert_eq!(default_limit_minutes(EventType::DistractionSite, Severity::Low), 10.0);
        assert_eq!(default_limit_minutes(EventType::Other, Severity::Medium), 10.0);
        assert_eq!(default_limit_minutes(EventType::AdultContent, Severity::High), 0.0);
    }

    #[test]
    fn offers_and_defaults_never_exceed_ceiling() {
        for t in ALL_TYPES {
            for s in ALL_SEVERITIES {
                let ceiling = ceiling_minutes(t, s);
                assert!(default_limit_minutes(t, s) <= ceiling, "{t:?}/{s:?}");
                for requested in [ceiling + 0.1, 30.0, 120.0, 1_000.0] {
                    assert!(counter_offer_minutes(t, s, requested) <= ceiling, "{t:?}/{s:?}/{requested}");
                }
            }
        }
    }
}
