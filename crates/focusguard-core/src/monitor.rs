//! The polling loop tying the pipeline together.
//!
//! The caller invokes [`Monitor::tick`] periodically (every
//! `monitor.tick_interval_secs`). Each tick polls the analyzer, fires
//! interventions, checks compliance, and advances enforcement. User replies
//! arrive out of band through [`Monitor::submit_reply`]. Everything the
//! shell should surface comes back as [`Event`]s.
//!
//! Ticks take `&mut self`, so at most one is in flight at a time.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agreement::Agreement;
use crate::compliance::{ComplianceHandler, ComplianceTracker};
use crate::config::Config;
use crate::enforcement::{EnforcementEngine, EnforcementHandler};
use crate::error::{CoreError, Result};
use crate::event::{BehavioralEvent, EventType};
use crate::events::Event;
use crate::integrations::{ActivityAnalyzer, BrowserController, InterventionCallback};
use crate::intervention::{InterventionGate, StrategyKind};
use crate::negotiation::duration::format_number;
use crate::negotiation::{NegotiationEngine, NegotiationOutcome};

/// A violated agreement waiting for the enforcement engine.
#[derive(Debug, Clone)]
pub struct PendingEnforcement {
    pub agreement: Agreement,
    /// Skip the grace period.
    pub force: bool,
}

pub struct Monitor<A: ActivityAnalyzer> {
    analyzer: A,
    gate: InterventionGate,
    negotiation: NegotiationEngine,
    tracker: ComplianceTracker,
    enforcement: EnforcementEngine,
    pending: IndexMap<Uuid, PendingEnforcement>,
    tick_interval: Duration,
}

impl<A: ActivityAnalyzer> std::fmt::Debug for Monitor<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("gate", &self.gate)
            .field("negotiation", &self.negotiation)
            .field("tracker", &self.tracker)
            .field("enforcement", &self.enforcement)
            .field("pending", &self.pending)
            .field("tick_interval", &self.tick_interval)
            .finish()
    }
}

/// Collects compliance and enforcement callbacks as events.
struct EventSink {
    now: DateTime<Utc>,
    events: Vec<Event>,
    enforced_message: Option<String>,
}

impl EventSink {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            events: Vec::new(),
            enforced_message: None,
        }
    }
}

impl ComplianceHandler for EventSink {
    fn on_warning(&mut self, agreement: &Agreement, seconds_remaining: f64) {
        self.events.push(Event::AgreementWarning {
            agreement_id: agreement.id,
            seconds_remaining,
            at: self.now,
        });
    }

    fn on_expired(&mut self, agreement: &Agreement) {
        self.events.push(Event::AgreementExpired {
            agreement_id: agreement.id,
            at: self.now,
        });
    }

    fn on_violation(&mut self, agreement: &Agreement) {
        self.events.push(Event::AgreementViolated {
            agreement_id: agreement.id,
            violation_count: agreement.violation_count(),
            at: self.now,
        });
    }
}

impl EnforcementHandler for EventSink {
    fn on_warning(&mut self, agreement: &Agreement, message: &str) {
        self.events.push(Event::GracePeriodStarted {
            agreement_id: agreement.id,
            message: message.to_string(),
            at: self.now,
        });
    }

    fn on_enforced(&mut self, _agreement: &Agreement, message: &str) {
        self.enforced_message = Some(message.to_string());
    }
}

fn alert_message(event: &BehavioralEvent) -> String {
    let minutes = format_number(event.duration_minutes().round());
    match event.event_type {
        EventType::ScrollLoop => {
            format!("You've been scrolling for about {minutes} minutes. Maybe take a breather?")
        }
        _ => format!(
            "Heads up: you've spent about {minutes} minutes on {}.",
            event.target.display_name()
        ),
    }
}

impl<A: ActivityAnalyzer> Monitor<A> {
    pub fn new(analyzer: A, config: &Config) -> Self {
        let mut gate =
            InterventionGate::new().with_history_capacity(config.intervention.history_capacity);
        gate.set_cooldown(config.intervention.cooldown_seconds);

        Self {
            analyzer,
            gate,
            negotiation: NegotiationEngine::with_max_rounds(config.negotiation.max_rounds),
            tracker: ComplianceTracker::with_warning_before(
                config.compliance.warning_before_seconds,
            ),
            enforcement: EnforcementEngine::with_grace_period(
                config.enforcement.grace_period_seconds,
            ),
            pending: IndexMap::new(),
            tick_interval: config.monitor.tick_interval(),
        }
    }

    pub fn with_browser(mut self, browser: impl BrowserController + 'static) -> Self {
        self.enforcement.set_browser(Some(Box::new(browser)));
        self
    }

    pub fn with_intervention_callback(
        mut self,
        callback: impl InterventionCallback + 'static,
    ) -> Self {
        self.gate.set_callback(callback);
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut A {
        &mut self.analyzer
    }

    pub fn gate(&self) -> &InterventionGate {
        &self.gate
    }

    pub fn negotiation(&self) -> &NegotiationEngine {
        &self.negotiation
    }

    pub fn tracker(&self) -> &ComplianceTracker {
        &self.tracker
    }

    pub fn enforcement(&self) -> &EnforcementEngine {
        &self.enforcement
    }

    /// Violated agreements still waiting out their grace period.
    pub fn pending_enforcements(&self) -> impl Iterator<Item = &PendingEnforcement> {
        self.pending.values()
    }

    /// Whether an agreement already covers this activity, so the gate should
    /// not interrupt it again.
    fn is_covered(&self, event: &BehavioralEvent) -> bool {
        self.tracker.active_agreements().any(|a| a.matches(event))
            || self.pending.values().any(|p| p.agreement.matches(event))
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn tick(&mut self) -> Vec<Event> {
        self.tick_at(Utc::now())
    }

    /// Run one polling cycle at `now`.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let current = self.analyzer.analyze_current_activity();
        let mut events = Vec::new();

        if let Some(ref event) = current {
            if self.negotiation.is_awaiting_reply() {
                debug!("dialogue open, skipping intervention gate");
            } else if self.is_covered(event) {
                debug!(event_type = ?event.event_type, "activity covered by an agreement");
            } else if let Some(strategy) = self.gate.evaluate_at(event, now) {
                events.push(Event::InterventionFired {
                    event_type: event.event_type,
                    strategy,
                    at: now,
                });
                match strategy.kind {
                    StrategyKind::Block | StrategyKind::Negotiate => {
                        match self.negotiation.start_negotiation(event) {
                            Ok(opening) => events.push(Event::NegotiationStarted {
                                message: opening.message,
                                at: now,
                            }),
                            Err(e) => warn!(error = %e, "could not open negotiation"),
                        }
                    }
                    StrategyKind::Alert => events.push(Event::AlertRaised {
                        message: alert_message(event),
                        at: now,
                    }),
                }
            }
        }

        let mut sink = EventSink::new(now);
        let report = self
            .tracker
            .check_compliance_at(current.as_ref(), &mut sink, now);
        events.append(&mut sink.events);

        for agreement in report.completed {
            events.push(Event::AgreementCompleted {
                agreement_id: agreement.id,
                at: now,
            });
        }
        for agreement in report.violated {
            let force = agreement.event_type == EventType::AdultContent;
            self.pending
                .insert(agreement.id, PendingEnforcement { agreement, force });
        }

        events.extend(self.advance_enforcement(current.as_ref(), now));
        events
    }

    fn advance_enforcement(
        &mut self,
        current: Option<&BehavioralEvent>,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        let mut finished = Vec::new();

        for (id, pending) in self.pending.iter_mut() {
            let still_active = current.is_some_and(|e| pending.agreement.matches(e));
            if !still_active {
                self.enforcement.cancel_grace_period(id);
                pending.agreement.deactivate();
                info!(agreement_id = %id, "compliance restored before enforcement");
                events.push(Event::ComplianceRestored {
                    agreement_id: *id,
                    at: now,
                });
                finished.push(*id);
                continue;
            }

            let mut sink = EventSink::new(now);
            let success =
                self.enforcement
                    .enforce_at(&mut pending.agreement, pending.force, &mut sink, now);
            events.append(&mut sink.events);
            if let Some(message) = sink.enforced_message {
                events.push(Event::EnforcementExecuted {
                    agreement_id: *id,
                    success,
                    message,
                    at: now,
                });
            }
            if !pending.agreement.is_active() {
                finished.push(*id);
            }
        }

        for id in finished {
            self.pending.shift_remove(&id);
        }
        events
    }

    pub fn submit_reply(&mut self, text: &str) -> Result<Vec<Event>> {
        self.submit_reply_at(text, Utc::now())
    }

    /// Feed a user reply to the open dialogue.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when no dialogue is awaiting a reply.
    pub fn submit_reply_at(&mut self, text: &str, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let outcome = self.negotiation.process_reply_at(text, now)?;
        let event = match outcome {
            NegotiationOutcome::Reprompt { message, round } => Event::NegotiationContinued {
                message,
                round,
                offered_minutes: None,
                at: now,
            },
            NegotiationOutcome::CounterOffer {
                message,
                offered_minutes,
                round,
            } => Event::NegotiationContinued {
                message,
                round,
                offered_minutes: Some(offered_minutes),
                at: now,
            },
            NegotiationOutcome::Agreed {
                message,
                agreement,
                resolution,
            } => {
                self.negotiation.reset();
                debug!(agreement_id = %agreement.id, ?resolution, "tracking negotiated agreement");
                let reached = Event::AgreementReached {
                    agreement_id: agreement.id,
                    minutes: agreement.agreed_duration_minutes,
                    message,
                    expires_at: agreement.expires_at(),
                    at: now,
                };
                self.tracker.track(agreement)?;
                reached
            }
        };
        Ok(vec![event])
    }

    /// Give a tracked agreement more time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for agreements that are not tracked, including
    /// ones already handed over to enforcement.
    pub fn extend_agreement(&mut self, id: &Uuid, minutes: f64) -> Result<()> {
        if self.pending.contains_key(id) {
            return Err(CoreError::invalid_state(
                "monitor",
                format!("agreement {id} is already being enforced"),
            ));
        }
        self.tracker.extend(id, minutes)
    }

    /// Drop the open dialogue, if any. Returns whether one was open.
    pub fn cancel_negotiation(&mut self) -> bool {
        let was_open = self.negotiation.is_awaiting_reply();
        self.negotiation.reset();
        if was_open {
            debug!("negotiation cancelled");
        }
        was_open
    }
}
