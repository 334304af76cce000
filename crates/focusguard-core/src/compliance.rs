//! Compliance tracking for live agreements.
//!
//! Polled once per tick with whatever the user is doing right now. For each
//! tracked agreement the tracker:
//!
//! 1. warns once when the remaining time drops into the warning window;
//! 2. on expiry, checks the current activity against the agreement target.
//!    Continued matching activity is a violation and the agreement is handed
//!    back for enforcement. Otherwise the user stopped in time and the
//!    agreement is quietly deactivated.
//!
//! Expiry alone is never punished.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::agreement::Agreement;
use crate::error::{CoreError, Result};
use crate::event::BehavioralEvent;

/// Default size of the pre-expiry warning window.
pub const DEFAULT_WARNING_BEFORE_SECONDS: f64 = 60.0;

/// Callbacks fired while checking compliance. All methods default to no-ops.
pub trait ComplianceHandler {
    fn on_warning(&mut self, _agreement: &Agreement, _seconds_remaining: f64) {}

    fn on_expired(&mut self, _agreement: &Agreement) {}

    fn on_violation(&mut self, _agreement: &Agreement) {}
}

/// Handler that ignores every callback.
impl ComplianceHandler for () {}

/// What one compliance pass did.
#[derive(Debug, Default)]
pub struct ComplianceReport {
    /// Agreements warned during this pass.
    pub warned: Vec<Uuid>,
    /// Agreements found expired during this pass.
    pub expired: Vec<Uuid>,
    /// Expired agreements with continued activity, removed from tracking and
    /// awaiting enforcement.
    pub violated: Vec<Agreement>,
    /// Expired agreements the user honored, deactivated and removed.
    pub completed: Vec<Agreement>,
}

impl ComplianceReport {
    pub fn is_empty(&self) -> bool {
        self.warned.is_empty()
            && self.expired.is_empty()
            && self.violated.is_empty()
            && self.completed.is_empty()
    }
}

/// Holds the set of live agreements, unique by id.
#[derive(Debug)]
pub struct ComplianceTracker {
    active_agreements: IndexMap<Uuid, Agreement>,
    warned_agreement_ids: HashSet<Uuid>,
    warning_before_seconds: f64,
}

impl Default for ComplianceTracker {
    fn default() -> Self {
        Self::with_warning_before(DEFAULT_WARNING_BEFORE_SECONDS)
    }
}

impl ComplianceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warning_before(seconds: f64) -> Self {
        Self {
            active_agreements: IndexMap::new(),
            warned_agreement_ids: HashSet::new(),
            warning_before_seconds: seconds.max(0.0),
        }
    }

    pub fn warning_before_seconds(&self) -> f64 {
        self.warning_before_seconds
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.active_agreements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_agreements.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Agreement> {
        self.active_agreements.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Agreement> {
        self.active_agreements.get_mut(id)
    }

    pub fn active_agreements(&self) -> impl Iterator<Item = &Agreement> {
        self.active_agreements.values()
    }

    pub fn was_warned(&self, id: &Uuid) -> bool {
        self.warned_agreement_ids.contains(id)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start tracking an agreement.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for a deactivated agreement or an id that is
    /// already tracked.
    pub fn track(&mut self, agreement: Agreement) -> Result<()> {
        if !agreement.is_active() {
            return Err(CoreError::invalid_state(
                "compliance tracker",
                format!("agreement {} is deactivated and cannot be tracked", agreement.id),
            ));
        }
        if self.active_agreements.contains_key(&agreement.id) {
            return Err(CoreError::invalid_state(
                "compliance tracker",
                format!("agreement {} is already tracked", agreement.id),
            ));
        }
        debug!(agreement_id = %agreement.id, expires_at = %agreement.expires_at(), "tracking agreement");
        self.active_agreements.insert(agreement.id, agreement);
        Ok(())
    }

    /// Extend a tracked agreement.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` when the id is not tracked, or whatever
    /// [`Agreement::extend`] rejects.
    pub fn extend(&mut self, id: &Uuid, minutes: f64) -> Result<()> {
        let agreement = self.active_agreements.get_mut(id).ok_or_else(|| {
            CoreError::invalid_state("compliance tracker", format!("agreement {id} is not tracked"))
        })?;
        agreement.extend(minutes)?;
        info!(agreement_id = %id, minutes, "agreement extended");
        Ok(())
    }

    /// Stop tracking an agreement without touching its state.
    pub fn remove(&mut self, id: &Uuid) -> Option<Agreement> {
        self.warned_agreement_ids.remove(id);
        self.active_agreements.shift_remove(id)
    }

    pub fn check_compliance(
        &mut self,
        current_event: Option<&BehavioralEvent>,
        handler: &mut dyn ComplianceHandler,
    ) -> ComplianceReport {
        self.check_compliance_at(current_event, handler, Utc::now())
    }

    /// One compliance pass at `now`.
    pub fn check_compliance_at(
        &mut self,
        current_event: Option<&BehavioralEvent>,
        handler: &mut dyn ComplianceHandler,
        now: DateTime<Utc>,
    ) -> ComplianceReport {
        let mut report = ComplianceReport::default();
        let mut violated_ids = Vec::new();
        let mut completed_ids = Vec::new();
        let mut stale_ids = Vec::new();

        for (id, agreement) in self.active_agreements.iter_mut() {
            if !agreement.is_active() {
                stale_ids.push(*id);
                continue;
            }

            let seconds_remaining = agreement.time_remaining_minutes_at(now) * 60.0;
            if seconds_remaining > 0.0
                && seconds_remaining <= self.warning_before_seconds
                && self.warned_agreement_ids.insert(*id)
            {
                debug!(agreement_id = %id, seconds_remaining, "agreement expiring soon");
                handler.on_warning(agreement, seconds_remaining);
                report.warned.push(*id);
            }

            if !agreement.is_expired_at(now) {
                continue;
            }

            handler.on_expired(agreement);
            report.expired.push(*id);

            if current_event.is_some_and(|e| agreement.matches(e)) {
                agreement.mark_violated();
                info!(
                    agreement_id = %id,
                    violation_count = agreement.violation_count(),
                    "agreement violated"
                );
                handler.on_violation(agreement);
                violated_ids.push(*id);
            } else {
                agreement.deactivate();
                info!(agreement_id = %id, "agreement honored");
                completed_ids.push(*id);
            }
        }

        for id in stale_ids {
            self.remove(&id);
        }
        report.violated = violated_ids.iter().filter_map(|id| self.remove(id)).collect();
        report.completed = completed_ids.iter().filter_map(|id| self.remove(id)).collect();
        report
    }
}
