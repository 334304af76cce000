//! Time-bound agreements negotiated with the user.
//!
//! ## Lifecycle
//!
//! ```text
//! create -> Active(not expired) --time--> Active(expired) -> Violated
//!                 \                              \             \
//!                  `-------------------------------`-------------`--> Deactivated
//! ```
//!
//! `expires_at` only ever moves forward (via [`Agreement::extend`]).
//! Deactivation is terminal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::event::{BehavioralEvent, EventType, Target};

/// Longest agreement accepted: one century.
pub const MAX_AGREEMENT_MINUTES: f64 = 100.0 * 365.0 * 24.0 * 60.0;

/// `None` when the span does not fit in a `Duration`.
fn minutes_to_duration(minutes: f64) -> Option<Duration> {
    let ms = (minutes * 60_000.0).round();
    if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(ms as i64)
}

/// A commitment granting the user N more minutes on a target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agreement {
    pub id: Uuid,
    pub event_type: EventType,
    pub target: Target,
    pub agreed_duration_minutes: f64,
    pub created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    /// What the user said (audit only).
    pub user_response: String,
    /// What the counselor said when the agreement was reached (audit only).
    pub counselor_message: String,
    is_active: bool,
    is_violated: bool,
    violation_count: u32,
}

impl Agreement {
    /// Create an active agreement expiring `minutes` after `created_at`.
    ///
    /// Negative or non-finite durations are treated as zero and durations
    /// are capped at [`MAX_AGREEMENT_MINUTES`]. An expiry past the last
    /// representable instant is pinned to it.
    pub fn new(
        event: &BehavioralEvent,
        minutes: f64,
        created_at: DateTime<Utc>,
        user_response: impl Into<String>,
        counselor_message: impl Into<String>,
    ) -> Self {
        let minutes = if minutes.is_finite() {
            minutes.clamp(0.0, MAX_AGREEMENT_MINUTES)
        } else {
            0.0
        };
        let expires_at = minutes_to_duration(minutes)
            .and_then(|d| created_at.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            id: Uuid::new_v4(),
            event_type: event.event_type,
            target: event.target.clone(),
            agreed_duration_minutes: minutes,
            created_at,
            expires_at,
            user_response: user_response.into(),
            counselor_message: counselor_message.into(),
            is_active: true,
            is_violated: false,
            violation_count: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn is_violated(&self) -> bool {
        self.is_violated
    }

    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn time_remaining_minutes(&self) -> f64 {
        self.time_remaining_minutes_at(Utc::now())
    }

    /// Minutes until expiry, clamped to 0 once expired.
    pub fn time_remaining_minutes_at(&self, now: DateTime<Utc>) -> f64 {
        let remaining_ms = (self.expires_at - now).num_milliseconds();
        (remaining_ms.max(0) as f64) / 60_000.0
    }

    /// Whether `event` is continued activity on this agreement's target.
    ///
    /// Url containment (case-insensitive) when both sides carry a url, else
    /// process name containment when both carry one, else event type
    /// equality. Substring containment can match short tokens inside
    /// unrelated targets; that is the observed matching behavior.
    pub fn matches(&self, event: &BehavioralEvent) -> bool {
        if let (Some(ours), Some(theirs)) = (&self.target.url, &event.target.url) {
            return theirs.to_lowercase().contains(&ours.to_lowercase());
        }
        if let (Some(ours), Some(theirs)) = (&self.target.process_name, &event.target.process_name) {
            return theirs.contains(ours.as_str());
        }
        self.event_type == event.event_type
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Push the expiry forward by `minutes`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` once deactivated and `InvalidValue` for a
    /// negative or non-finite extension, or one that would push the total past
    /// [`MAX_AGREEMENT_MINUTES`] or the last representable instant. The
    /// agreement is unchanged on error.
    pub fn extend(&mut self, minutes: f64) -> Result<()> {
        if !self.is_active {
            return Err(CoreError::invalid_state(
                "agreement",
                format!("cannot extend deactivated agreement {}", self.id),
            ));
        }
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(CoreError::invalid_value(
                "minutes",
                format!("extension must be a non-negative number, got {minutes}"),
            ));
        }
        let total = self.agreed_duration_minutes + minutes;
        let expires_at = if total <= MAX_AGREEMENT_MINUTES {
            minutes_to_duration(minutes).and_then(|d| self.expires_at.checked_add_signed(d))
        } else {
            None
        };
        let Some(expires_at) = expires_at else {
            return Err(CoreError::invalid_value(
                "minutes",
                format!("extending by {minutes} minutes puts the expiry out of range"),
            ));
        };
        self.expires_at = expires_at;
        self.agreed_duration_minutes = total;
        Ok(())
    }

    pub fn mark_violated(&mut self) {
        self.is_violated = true;
        self.violation_count += 1;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}
