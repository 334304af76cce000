//! Property-based tests for the pipeline invariants.
//!
//! Properties:
//! - Intervention thresholds follow the severity table exactly
//! - Any run of unparseable replies converges to an agreement
//! - No agreement ever exceeds its per-type ceiling
//! - Time remaining on an agreement never increases unless extended

use chrono::{Duration, TimeZone, Utc};
use focusguard_core::negotiation::policy::ceiling_minutes;
use focusguard_core::{
    Agreement, BehavioralEvent, EventType, NegotiationEngine, NegotiationOutcome, Severity, Target,
};
use proptest::prelude::*;

// ============================================================================
// GENERATORS
// ============================================================================

fn arb_event_type() -> impl Strategy<Value = EventType> {
    prop_oneof![
        Just(EventType::ScrollLoop),
        Just(EventType::AdultContent),
        Just(EventType::DistractionSite),
        Just(EventType::Other),
    ]
}

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![Just(Severity::Low), Just(Severity::Medium), Just(Severity::High)]
}

/// Replies from which no duration can be read.
fn arb_vague_reply() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("whatever".to_string()),
        Just("I don't know".to_string()),
        Just("leave me alone".to_string()),
        Just("".to_string()),
        "[a-gj-z ]{0,20}",
    ]
}

/// Replies mixing vague text with explicit durations.
fn arb_reply() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_vague_reply(),
        (1u32..=600).prop_map(|n| format!("{n} minutes")),
        (1u32..=5).prop_map(|n| format!("{n} hours")),
        (1u32..=180).prop_map(|n| n.to_string()),
        Just("half an hour".to_string()),
    ]
}

fn event(event_type: EventType, severity: Severity, seconds: f64) -> BehavioralEvent {
    BehavioralEvent::new(event_type, severity, Target::url("example.com"), seconds)
}

fn expected_trigger(severity: Severity, seconds: f64) -> bool {
    match severity {
        Severity::High => true,
        Severity::Medium => seconds > 30.0,
        Severity::Low => seconds > 120.0,
    }
}

/// Drive a dialogue to completion, returning the agreement and the rounds used.
fn negotiate(
    engine: &mut NegotiationEngine,
    event: &BehavioralEvent,
    replies: &[String],
) -> Option<(Agreement, u32)> {
    engine.start_negotiation(event).ok()?;
    for reply in replies {
        match engine.process_reply(reply).ok()? {
            NegotiationOutcome::Agreed { agreement, .. } => {
                return Some((agreement, engine.current_round()))
            }
            _ => continue,
        }
    }
    None
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_threshold_table_fidelity(
        severity in arb_severity(),
        event_type in arb_event_type(),
        seconds in 0.0f64..600.0,
    ) {
        let e = event(event_type, severity, seconds);
        prop_assert_eq!(e.should_trigger_intervention(), expected_trigger(severity, seconds));
    }

    #[test]
    fn prop_vague_replies_converge(
        event_type in arb_event_type(),
        severity in arb_severity(),
        max_rounds in 1u32..6,
        replies in prop::collection::vec(arb_vague_reply(), 6),
    ) {
        let mut engine = NegotiationEngine::with_max_rounds(max_rounds);
        let e = event(event_type, severity, 60.0);
        let (_, rounds) = negotiate(&mut engine, &e, &replies)
            .expect("vague replies must converge within the round limit");
        if event_type == EventType::AdultContent {
            prop_assert_eq!(rounds, 1);
        } else {
            prop_assert_eq!(rounds, max_rounds);
        }
    }

    #[test]
    fn prop_agreement_never_exceeds_ceiling(
        event_type in arb_event_type(),
        severity in arb_severity(),
        replies in prop::collection::vec(arb_reply(), 3),
    ) {
        let mut engine = NegotiationEngine::new();
        let e = event(event_type, severity, 60.0);
        let (agreement, _) = negotiate(&mut engine, &e, &replies)
            .expect("three replies always resolve a three-round dialogue");
        prop_assert!(agreement.agreed_duration_minutes <= ceiling_minutes(event_type, severity));
        prop_assert!(agreement.agreed_duration_minutes >= 0.0);
    }

    #[test]
    fn prop_remaining_time_is_monotonic(
        minutes in 0.0f64..120.0,
        offsets in prop::collection::vec(0i64..10_000, 1..20),
    ) {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let e = event(EventType::DistractionSite, Severity::Medium, 60.0);
        let agreement = Agreement::new(&e, minutes, start, "", "");

        let mut sorted = offsets;
        sorted.sort_unstable();
        let mut previous = f64::INFINITY;
        for secs in sorted {
            let now = start + Duration::seconds(secs);
            let remaining = agreement.time_remaining_minutes_at(now);
            prop_assert!(remaining <= previous);
            prop_assert!(remaining >= 0.0);
            prop_assert_eq!(agreement.is_expired_at(now), now >= agreement.expires_at());
            previous = remaining;
        }
    }
}
