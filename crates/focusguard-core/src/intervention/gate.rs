//! Intervention gate - decides whether an observed event interrupts the user.
//!
//! The gate applies the event's own severity policy, then a global cooldown:
//! once an intervention fires, no other one fires (whatever its type or
//! target) until `cooldown_seconds` have elapsed.
//!
//! ## Strategies
//!
//! - **Block**: adult content, closed immediately after one exchange
//! - **Negotiate**: long scroll loops and distraction sites
//! - **Alert**: everything else, a low-urgency nudge

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::event::{BehavioralEvent, EventType};
use crate::integrations::InterventionCallback;

/// Default minimum spacing between fired interventions.
pub const DEFAULT_COOLDOWN_SECONDS: f64 = 60.0;

/// Default number of fired interventions kept for reporting.
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Scroll loops observed for longer than this are negotiated, not just flagged.
const SCROLL_NEGOTIATE_SECONDS: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Block,
    Negotiate,
    Alert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// What the collaborator surfacing the intervention is expected to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionAction {
    ImmediateClose,
    Negotiate,
    Notify,
}

/// Classification of a fired intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionStrategy {
    pub kind: StrategyKind,
    pub urgency: Urgency,
    pub show_avatar: bool,
    pub use_voice: bool,
    pub action: InterventionAction,
}

impl InterventionStrategy {
    fn block() -> Self {
        Self {
            kind: StrategyKind::Block,
            urgency: Urgency::High,
            show_avatar: true,
            use_voice: true,
            action: InterventionAction::ImmediateClose,
        }
    }

    fn negotiate() -> Self {
        Self {
            kind: StrategyKind::Negotiate,
            urgency: Urgency::Medium,
            show_avatar: true,
            use_voice: true,
            action: InterventionAction::Negotiate,
        }
    }

    fn alert() -> Self {
        Self {
            kind: StrategyKind::Alert,
            urgency: Urgency::Low,
            show_avatar: false,
            use_voice: false,
            action: InterventionAction::Notify,
        }
    }

    /// Strategy for an event that has already passed the gate.
    pub fn classify(event: &BehavioralEvent) -> Self {
        match event.event_type {
            EventType::AdultContent => Self::block(),
            EventType::ScrollLoop if event.duration_seconds > SCROLL_NEGOTIATE_SECONDS => {
                Self::negotiate()
            }
            EventType::ScrollLoop => Self::alert(),
            EventType::DistractionSite => Self::negotiate(),
            EventType::Other => Self::alert(),
        }
    }
}

/// One fired intervention, kept for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionRecord {
    pub fired_at: DateTime<Utc>,
    pub event: BehavioralEvent,
    pub strategy: InterventionStrategy,
}

/// Gate owning the cooldown clock and the bounded intervention history.
pub struct InterventionGate {
    cooldown_seconds: f64,
    last_fired_at: Option<DateTime<Utc>>,
    history: VecDeque<InterventionRecord>,
    history_capacity: usize,
    callback: Option<Box<dyn InterventionCallback>>,
}

impl Default for InterventionGate {
    fn default() -> Self {
        Self {
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            last_fired_at: None,
            history: VecDeque::new(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            callback: None,
        }
    }
}

impl std::fmt::Debug for InterventionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterventionGate")
            .field("cooldown_seconds", &self.cooldown_seconds)
            .field("last_fired_at", &self.last_fired_at)
            .field("history_len", &self.history.len())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

impl InterventionGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self.trim_history();
        self
    }

    pub fn with_callback(mut self, callback: impl InterventionCallback + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    pub fn set_callback(&mut self, callback: impl InterventionCallback + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Negative values are treated as no cooldown.
    pub fn set_cooldown(&mut self, seconds: f64) {
        self.cooldown_seconds = seconds.max(0.0);
    }

    pub fn cooldown_seconds(&self) -> f64 {
        self.cooldown_seconds
    }

    pub fn last_fired_at(&self) -> Option<DateTime<Utc>> {
        self.last_fired_at
    }

    pub fn history(&self) -> impl Iterator<Item = &InterventionRecord> {
        self.history.iter()
    }

    /// Seconds left before another intervention may fire.
    pub fn cooldown_remaining_at(&self, now: DateTime<Utc>) -> f64 {
        match self.last_fired_at {
            Some(last) => {
                let elapsed = (now - last).num_milliseconds() as f64 / 1000.0;
                (self.cooldown_seconds - elapsed).max(0.0)
            }
            None => 0.0,
        }
    }

    pub fn evaluate(&mut self, event: &BehavioralEvent) -> Option<InterventionStrategy> {
        self.evaluate_at(event, Utc::now())
    }

    /// Decide whether `event` interrupts the user at `now`.
    pub fn evaluate_at(
        &mut self,
        event: &BehavioralEvent,
        now: DateTime<Utc>,
    ) -> Option<InterventionStrategy> {
        if !event.should_trigger_intervention() {
            return None;
        }

        let remaining = self.cooldown_remaining_at(now);
        if remaining > 0.0 {
            debug!(
                event_type = ?event.event_type,
                cooldown_remaining_secs = remaining,
                "intervention suppressed by cooldown"
            );
            return None;
        }

        let strategy = InterventionStrategy::classify(event);
        self.last_fired_at = Some(now);
        self.history.push_back(InterventionRecord {
            fired_at: now,
            event: event.clone(),
            strategy,
        });
        self.trim_history();

        info!(
            event_type = ?event.event_type,
            severity = ?event.severity,
            strategy = ?strategy.kind,
            "intervention fired"
        );

        if let Some(ref mut callback) = self.callback {
            if let Err(e) = callback.on_intervention(event) {
                warn!(error = %e, "intervention callback failed");
            }
        }

        Some(strategy)
    }

    fn trim_history(&mut self) {
        while self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
    }
}
