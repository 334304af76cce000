use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::EventType;
use crate::intervention::InterventionStrategy;

/// Every state change in the pipeline produces an Event.
/// The shell polls the monitor for events and decides how to surface them
/// (console, pop-up, speech).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    InterventionFired {
        event_type: EventType,
        strategy: InterventionStrategy,
        at: DateTime<Utc>,
    },
    /// Low-urgency nudge; no dialogue is opened.
    AlertRaised {
        message: String,
        at: DateTime<Utc>,
    },
    NegotiationStarted {
        message: String,
        at: DateTime<Utc>,
    },
    /// Re-prompt or counter-offer; the dialogue stays open.
    NegotiationContinued {
        message: String,
        round: u32,
        offered_minutes: Option<f64>,
        at: DateTime<Utc>,
    },
    AgreementReached {
        agreement_id: Uuid,
        minutes: f64,
        message: String,
        expires_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    AgreementWarning {
        agreement_id: Uuid,
        seconds_remaining: f64,
        at: DateTime<Utc>,
    },
    AgreementExpired {
        agreement_id: Uuid,
        at: DateTime<Utc>,
    },
    /// Expired with no continued activity; deactivated without enforcement.
    AgreementCompleted {
        agreement_id: Uuid,
        at: DateTime<Utc>,
    },
    AgreementViolated {
        agreement_id: Uuid,
        violation_count: u32,
        at: DateTime<Utc>,
    },
    GracePeriodStarted {
        agreement_id: Uuid,
        message: String,
        at: DateTime<Utc>,
    },
    /// The user left the target during the grace period.
    ComplianceRestored {
        agreement_id: Uuid,
        at: DateTime<Utc>,
    },
    EnforcementExecuted {
        agreement_id: Uuid,
        success: bool,
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::InterventionFired { at, .. }
            | Event::AlertRaised { at, .. }
            | Event::NegotiationStarted { at, .. }
            | Event::NegotiationContinued { at, .. }
            | Event::AgreementReached { at, .. }
            | Event::AgreementWarning { at, .. }
            | Event::AgreementExpired { at, .. }
            | Event::AgreementCompleted { at, .. }
            | Event::AgreementViolated { at, .. }
            | Event::GracePeriodStarted { at, .. }
            | Event::ComplianceRestored { at, .. }
            | Event::EnforcementExecuted { at, .. } => *at,
        }
    }

    /// Text meant for the user, if the event carries any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Event::AlertRaised { message, .. }
            | Event::NegotiationStarted { message, .. }
            | Event::NegotiationContinued { message, .. }
            | Event::AgreementReached { message, .. }
            | Event::GracePeriodStarted { message, .. }
            | Event::EnforcementExecuted { message, .. } => Some(message),
            _ => None,
        }
    }
}
