//! Negotiation engine implementation.
//!
//! Runs one dialogue at a time. The caller feeds user replies
//! synchronously; the engine has no timeout of its own.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> AwaitingReply -> Resolved -> (reset) -> Idle
//! ```
//!
//! Every path into `Resolved` produces exactly one [`Agreement`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::duration::{format_number, parse_requested_minutes};
use super::policy::{ceiling_minutes, counter_offer_minutes, default_limit_minutes};
use crate::agreement::Agreement;
use crate::error::{CoreError, Result};
use crate::event::{BehavioralEvent, EventType};

pub const DEFAULT_MAX_NEGOTIATION_ROUNDS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationState {
    Idle,
    AwaitingReply,
    Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningMessage {
    pub message: String,
    pub requires_response: bool,
}

/// How an agreement came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// The user's own request was within the ceiling.
    Accepted,
    /// Content that is never negotiable; zero minutes.
    Immediate,
    /// The rounds ran out without a usable duration.
    DefaultLimit,
    /// The rounds ran out with a counter-offer on the table; it stands.
    FinalCounterOffer,
}

#[derive(Debug, Clone)]
pub enum NegotiationOutcome {
    /// No duration could be read from the reply.
    Reprompt { message: String, round: u32 },
    /// The request was above the ceiling; the engine proposes less.
    CounterOffer {
        message: String,
        offered_minutes: f64,
        round: u32,
    },
    Agreed {
        message: String,
        agreement: Agreement,
        resolution: Resolution,
    },
}

impl NegotiationOutcome {
    pub fn message(&self) -> &str {
        match self {
            NegotiationOutcome::Reprompt { message, .. }
            | NegotiationOutcome::CounterOffer { message, .. }
            | NegotiationOutcome::Agreed { message, .. } => message,
        }
    }

    pub fn continue_negotiating(&self) -> bool {
        !matches!(self, NegotiationOutcome::Agreed { .. })
    }

    pub fn agreement(&self) -> Option<&Agreement> {
        match self {
            NegotiationOutcome::Agreed { agreement, .. } => Some(agreement),
            _ => None,
        }
    }

    pub fn into_agreement(self) -> Option<Agreement> {
        match self {
            NegotiationOutcome::Agreed { agreement, .. } => Some(agreement),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Dialogue {
    event: BehavioralEvent,
    opening_message: String,
    last_counter_offer: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NegotiationEngine {
    max_rounds: u32,
    current_round: u32,
    state: NegotiationState,
    dialogue: Option<Dialogue>,
}

impl Default for NegotiationEngine {
    fn default() -> Self {
        Self::with_max_rounds(DEFAULT_MAX_NEGOTIATION_ROUNDS)
    }
}

impl NegotiationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// At least one round is always allowed.
    pub fn with_max_rounds(max_rounds: u32) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
            current_round: 0,
            state: NegotiationState::Idle,
            dialogue: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.state == NegotiationState::AwaitingReply
    }

    /// The event being negotiated, until `reset()`.
    pub fn active_event(&self) -> Option<&BehavioralEvent> {
        self.dialogue.as_ref().map(|d| &d.event)
    }

    pub fn opening_message(&self) -> Option<&str> {
        self.dialogue.as_ref().map(|d| d.opening_message.as_str())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Open a dialogue about `event`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the engine is idle; a resolved engine
    /// must be `reset()` first.
    pub fn start_negotiation(&mut self, event: &BehavioralEvent) -> Result<OpeningMessage> {
        if self.state != NegotiationState::Idle {
            return Err(CoreError::invalid_state(
                "negotiation",
                format!("cannot start a new negotiation while {:?}", self.state),
            ));
        }

        let message = opening_message_for(event);
        self.current_round = 0;
        self.state = NegotiationState::AwaitingReply;
        self.dialogue = Some(Dialogue {
            event: event.clone(),
            opening_message: message.clone(),
            last_counter_offer: None,
        });

        debug!(event_type = ?event.event_type, "negotiation started");
        Ok(OpeningMessage {
            message,
            requires_response: true,
        })
    }

    pub fn process_reply(&mut self, reply: &str) -> Result<NegotiationOutcome> {
        self.process_reply_at(reply, Utc::now())
    }

    /// Feed one user reply. Agreements are created at `now`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when no dialogue is awaiting a reply.
    pub fn process_reply_at(&mut self, reply: &str, now: DateTime<Utc>) -> Result<NegotiationOutcome> {
        if self.state != NegotiationState::AwaitingReply {
            return Err(CoreError::invalid_state(
                "negotiation",
                format!("no reply expected while {:?}", self.state),
            ));
        }
        let dialogue = self
            .dialogue
            .clone()
            .ok_or_else(|| CoreError::invalid_state("negotiation", "dialogue missing"))?;
        let event = &dialogue.event;
        let site = event.target.display_name();

        self.current_round += 1;
        let round = self.current_round;
        let out_of_rounds = round >= self.max_rounds;

        if event.event_type == EventType::AdultContent {
            let message = format!("This has to stop now. I'm closing {site}.");
            return Ok(self.resolve(event, 0.0, now, reply, message, Resolution::Immediate));
        }

        let Some(requested) = parse_requested_minutes(reply) else {
            if !out_of_rounds {
                debug!(round, "reply had no usable duration");
                return Ok(NegotiationOutcome::Reprompt {
                    message: format!(
                        "I didn't catch a time there. How many minutes do you need on {site}? \
                         (for example \"10 minutes\")"
                    ),
                    round,
                });
            }
            let (minutes, message, resolution) = match dialogue.last_counter_offer {
                Some(offer) => (
                    offer,
                    format!(
                        "We've gone back and forth enough. Final offer: {} minutes on {site}.",
                        format_number(offer)
                    ),
                    Resolution::FinalCounterOffer,
                ),
                None => {
                    let limit = default_limit_minutes(event.event_type, event.severity);
                    (
                        limit,
                        format!(
                            "Let's keep it simple: you get {} minutes on {site}, then we move on.",
                            format_number(limit)
                        ),
                        Resolution::DefaultLimit,
                    )
                }
            };
            return Ok(self.resolve(event, minutes, now, reply, message, resolution));
        };

        let ceiling = ceiling_minutes(event.event_type, event.severity);
        if requested <= ceiling {
            let message = format!(
                "Deal: {} more minutes on {site}. I'll check back when time is up.",
                format_number(requested)
            );
            return Ok(self.resolve(event, requested, now, reply, message, Resolution::Accepted));
        }

        let offer = counter_offer_minutes(event.event_type, event.severity, requested);
        if out_of_rounds {
            let message = format!(
                "We've gone back and forth enough. Final offer: {} minutes on {site}.",
                format_number(offer)
            );
            return Ok(self.resolve(event, offer, now, reply, message, Resolution::FinalCounterOffer));
        }

        if let Some(ref mut d) = self.dialogue {
            d.last_counter_offer = Some(offer);
        }
        debug!(round, requested, offer, "counter-offer");
        Ok(NegotiationOutcome::CounterOffer {
            message: format!(
                "{} minutes is a lot for {site}. How about {} minutes instead?",
                format_number(requested),
                format_number(offer)
            ),
            offered_minutes: offer,
            round,
        })
    }

    /// Return to `Idle`, dropping any dialogue in progress.
    pub fn reset(&mut self) {
        self.current_round = 0;
        self.state = NegotiationState::Idle;
        self.dialogue = None;
    }

    fn resolve(
        &mut self,
        event: &BehavioralEvent,
        minutes: f64,
        now: DateTime<Utc>,
        reply: &str,
        message: String,
        resolution: Resolution,
    ) -> NegotiationOutcome {
        let agreement = Agreement::new(event, minutes, now, reply, message.clone());
        self.state = NegotiationState::Resolved;
        info!(
            agreement_id = %agreement.id,
            event_type = ?event.event_type,
            minutes,
            resolution = ?resolution,
            round = self.current_round,
            "agreement reached"
        );
        NegotiationOutcome::Agreed {
            message,
            agreement,
            resolution,
        }
    }
}

fn opening_message_for(event: &BehavioralEvent) -> String {
    let site = event.target.display_name();
    let minutes = format_number(event.duration_minutes().round());
    match event.event_type {
        EventType::ScrollLoop => format!(
            "You've been scrolling {site} for {minutes} minutes. How much longer do you need?"
        ),
        EventType::DistractionSite => {
            let category = event.metadata_str("category").unwrap_or("distraction");
            format!(
                "You're on {site}, which is on your {category} list. How many more minutes do you need?"
            )
        }
        EventType::AdultContent => {
            format!("You're on {site}. This must stop now, and it will be closed.")
        }
        EventType::Other => format!(
            "You've spent {minutes} minutes on {site}. How much more time do you need?"
        ),
    }
}
