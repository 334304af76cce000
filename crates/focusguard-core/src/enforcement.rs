//! Enforcement of expired agreements.
//!
//! The first time an expired agreement reaches the engine a grace period
//! starts and the user is warned. Once it elapses (or when forced) the
//! target is closed, the agreement is deactivated, and the outcome is
//! reported. A deactivated agreement is never enforced again.
//!
//! The browser controller is optional. Without one the agreement is still
//! deactivated and the failure is reported through the return value and the
//! `on_enforced` message.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::agreement::Agreement;
use crate::integrations::BrowserController;
use crate::negotiation::duration::format_number;

/// Default delay between first expiry observation and enforcement.
pub const DEFAULT_GRACE_PERIOD_SECONDS: f64 = 30.0;

/// Callbacks fired during enforcement. Both default to no-ops.
pub trait EnforcementHandler {
    fn on_warning(&mut self, _agreement: &Agreement, _message: &str) {}

    fn on_enforced(&mut self, _agreement: &Agreement, _message: &str) {}
}

/// Handler that ignores every callback.
impl EnforcementHandler for () {}

pub struct EnforcementEngine {
    grace_period_seconds: f64,
    grace_period_start: HashMap<Uuid, DateTime<Utc>>,
    browser: Option<Box<dyn BrowserController>>,
}

impl Default for EnforcementEngine {
    fn default() -> Self {
        Self::with_grace_period(DEFAULT_GRACE_PERIOD_SECONDS)
    }
}

impl std::fmt::Debug for EnforcementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnforcementEngine")
            .field("grace_period_seconds", &self.grace_period_seconds)
            .field("grace_period_start", &self.grace_period_start)
            .field("browser", &self.browser.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}

impl EnforcementEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grace_period(seconds: f64) -> Self {
        Self {
            grace_period_seconds: seconds.max(0.0),
            grace_period_start: HashMap::new(),
            browser: None,
        }
    }

    pub fn with_browser(mut self, browser: impl BrowserController + 'static) -> Self {
        self.browser = Some(Box::new(browser));
        self
    }

    pub fn set_browser(&mut self, browser: Option<Box<dyn BrowserController>>) {
        self.browser = browser;
    }

    pub fn grace_period_seconds(&self) -> f64 {
        self.grace_period_seconds
    }

    pub fn has_grace_period(&self, id: &Uuid) -> bool {
        self.grace_period_start.contains_key(id)
    }

    /// Abort a running grace period. Returns whether one was running.
    pub fn cancel_grace_period(&mut self, id: &Uuid) -> bool {
        let cancelled = self.grace_period_start.remove(id).is_some();
        if cancelled {
            debug!(agreement_id = %id, "grace period cancelled");
        }
        cancelled
    }

    pub fn grace_period_remaining(&self, id: &Uuid) -> Option<f64> {
        self.grace_period_remaining_at(id, Utc::now())
    }

    /// Seconds left in the grace period, `None` when none is running.
    pub fn grace_period_remaining_at(&self, id: &Uuid, now: DateTime<Utc>) -> Option<f64> {
        self.grace_period_start.get(id).map(|start| {
            let elapsed = (now - *start).num_milliseconds() as f64 / 1000.0;
            (self.grace_period_seconds - elapsed).max(0.0)
        })
    }

    pub fn enforce(
        &mut self,
        agreement: &mut Agreement,
        force: bool,
        handler: &mut dyn EnforcementHandler,
    ) -> bool {
        self.enforce_at(agreement, force, handler, Utc::now())
    }

    /// Enforce `agreement` at `now`.
    ///
    /// Returns `true` only when an enforcement action was executed and
    /// succeeded during this call.
    pub fn enforce_at(
        &mut self,
        agreement: &mut Agreement,
        force: bool,
        handler: &mut dyn EnforcementHandler,
        now: DateTime<Utc>,
    ) -> bool {
        if !agreement.is_active() || !agreement.is_expired_at(now) {
            return false;
        }

        if !force {
            match self.grace_period_start.get(&agreement.id).copied() {
                None => {
                    self.grace_period_start.insert(agreement.id, now);
                    let message = format!(
                        "Time's up on {}. You have {} seconds to wrap up before it gets closed.",
                        agreement.target.display_name(),
                        format_number(self.grace_period_seconds)
                    );
                    info!(agreement_id = %agreement.id, "grace period started");
                    handler.on_warning(agreement, &message);
                    return false;
                }
                Some(start) => {
                    let elapsed = (now - start).num_milliseconds() as f64 / 1000.0;
                    if elapsed < self.grace_period_seconds {
                        return false;
                    }
                }
            }
        }

        let (success, message) = self.execute(agreement);
        self.grace_period_start.remove(&agreement.id);
        agreement.deactivate();
        info!(agreement_id = %agreement.id, success, forced = force, "enforcement executed");
        handler.on_enforced(agreement, &message);
        success
    }

    fn execute(&self, agreement: &Agreement) -> (bool, String) {
        if let Some(ref url) = agreement.target.url {
            let browser = match self.browser {
                Some(ref b) if b.is_available() => b,
                _ => {
                    warn!(agreement_id = %agreement.id, "no browser controller available");
                    return (
                        false,
                        format!("Could not close {url}: browser control is unavailable."),
                    );
                }
            };
            return match browser.close_tab_by_url(url) {
                Ok(true) => (true, format!("Closed {url}.")),
                Ok(false) => (false, format!("No open tab matched {url}.")),
                Err(e) => {
                    warn!(agreement_id = %agreement.id, browser = browser.name(), error = %e, "closing tab failed");
                    (false, format!("Could not close {url}: {e}"))
                }
            };
        }

        if let Some(ref process) = agreement.target.process_name {
            return (
                false,
                format!("Closing process '{process}' is not yet implemented."),
            );
        }

        (false, "Agreement has no target to enforce.".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, Result};
    use crate::event::{BehavioralEvent, EventType, Severity, Target};
    use chrono::Duration;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        warnings: Vec<String>,
        enforced: Vec<String>,
    }

    impl EnforcementHandler for Recorder {
        fn on_warning(&mut self, _a: &Agreement, message: &str) {
            self.warnings.push(message.to_string());
        }

        fn on_enforced(&mut self, _a: &Agreement, message: &str) {
            self.enforced.push(message.to_string());
        }
    }

    #[derive(Clone, Default)]
    struct FakeBrowser {
        closed: Rc<RefCell<Vec<String>>>,
    }

    impl BrowserController for FakeBrowser {
        fn is_available(&self) -> bool {
            true
        }

        fn close_tab_by_url(&self, url: &str) -> Result<bool> {
            self.closed.borrow_mut().push(url.to_string());
            Ok(true)
        }
    }

    struct BrokenBrowser;

    impl BrowserController for BrokenBrowser {
        fn is_available(&self) -> bool {
            true
        }

        fn close_tab_by_url(&self, _url: &str) -> Result<bool> {
            Err(CoreError::collaborator("browser", "extension disconnected"))
        }
    }

    fn expired(target: Target, start: DateTime<Utc>) -> Agreement {
        let e = BehavioralEvent::new(EventType::DistractionSite, Severity::Medium, target, 60.0);
        Agreement::new(&e, 0.0, start, "", "")
    }

    #[test]
    fn not_expired_is_noop() {
        let start = Utc::now();
        let e = BehavioralEvent::new(EventType::ScrollLoop, Severity::Medium, Target::url("reddit.com"), 60.0);
        let mut a = Agreement::new(&e, 5.0, start, "", "");
        let mut engine = EnforcementEngine::new();
        let mut rec = Recorder::default();
        assert!(!engine.enforce_at(&mut a, true, &mut rec, start));
        assert!(rec.warnings.is_empty() && rec.enforced.is_empty());
        assert!(a.is_active());
    }

    #[test]
    fn grace_period_then_enforce_then_noop() {
        let start = Utc::now();
        let browser = FakeBrowser::default();
        let closed = browser.closed.clone();
        let mut engine = EnforcementEngine::new().with_browser(browser);
        let mut a = expired(Target::url("https://youtube.com"), start);
        let mut rec = Recorder::default();

        assert!(!engine.enforce_at(&mut a, false, &mut rec, start));
        assert_eq!(rec.warnings.len(), 1);
        assert!(rec.warnings[0].contains("30 seconds"));
        assert_eq!(engine.grace_period_remaining_at(&a.id, start + Duration::seconds(10)), Some(20.0));

        assert!(!engine.enforce_at(&mut a, false, &mut rec, start + Duration::seconds(29)));
        assert!(rec.enforced.is_empty());

        assert!(engine.enforce_at(&mut a, false, &mut rec, start + Duration::seconds(30)));
        assert_eq!(rec.enforced, vec!["Closed https://youtube.com."]);
        assert_eq!(*closed.borrow(), vec!["https://youtube.com"]);
        assert!(!a.is_active());
        assert!(!engine.has_grace_period(&a.id));

        assert!(!engine.enforce_at(&mut a, false, &mut rec, start + Duration::seconds(60)));
        assert!(!engine.enforce_at(&mut a, true, &mut rec, start + Duration::seconds(60)));
        assert_eq!(rec.enforced.len(), 1);
        assert_eq!(rec.warnings.len(), 1);
    }

    #[test]
    fn grace_warning_reports_fractional_seconds() {
        let start = Utc::now();
        let mut engine = EnforcementEngine::with_grace_period(12.5);
        let mut a = expired(Target::url("https://youtube.com"), start);
        let mut rec = Recorder::default();

        assert!(!engine.enforce_at(&mut a, false, &mut rec, start));
        assert!(rec.warnings[0].contains("12.5 seconds"), "{}", rec.warnings[0]);
    }

    #[test]
    fn forced_enforcement_skips_grace() {
        let start = Utc::now();
        let mut engine = EnforcementEngine::new().with_browser(FakeBrowser::default());
        let mut a = expired(Target::url("https://youtube.com"), start);
        let mut rec = Recorder::default();
        assert!(engine.enforce_at(&mut a, true, &mut rec, start));
        assert!(rec.warnings.is_empty());
        assert_eq!(rec.enforced.len(), 1);
    }

    #[test]
    fn missing_browser_still_deactivates() {
        let start = Utc::now();
        let mut engine = EnforcementEngine::new();
        let mut a = expired(Target::url("https://youtube.com"), start);
        let mut rec = Recorder::default();
        assert!(!engine.enforce_at(&mut a, true, &mut rec, start));
        assert!(!a.is_active());
        assert!(rec.enforced[0].contains("unavailable"));
    }

    #[test]
    fn browser_error_is_reported_not_propagated() {
        let start = Utc::now();
        let mut engine = EnforcementEngine::new().with_browser(BrokenBrowser);
        let mut a = expired(Target::url("https://youtube.com"), start);
        let mut rec = Recorder::default();
        assert!(!engine.enforce_at(&mut a, true, &mut rec, start));
        assert!(!a.is_active());
        assert!(rec.enforced[0].contains("extension disconnected"));
    }

    #[test]
    fn process_targets_are_not_yet_implemented() {
        let start = Utc::now();
        let mut engine = EnforcementEngine::new().with_browser(FakeBrowser::default());
        let mut a = expired(Target::process("steam"), start);
        let mut rec = Recorder::default();
        assert!(!engine.enforce_at(&mut a, true, &mut rec, start));
        assert!(!a.is_active());
        assert!(rec.enforced[0].contains("not yet implemented"));
    }

    #[test]
    fn cancel_grace_period_restarts_the_clock() {
        let start = Utc::now();
        let mut engine = EnforcementEngine::new();
        let mut a = expired(Target::url("https://youtube.com"), start);
        let mut rec = Recorder::default();
        engine.enforce_at(&mut a, false, &mut rec, start);
        assert!(engine.cancel_grace_period(&a.id));
        assert!(!engine.cancel_grace_period(&a.id));
        assert_eq!(engine.grace_period_remaining_at(&a.id, start), None);

        assert!(!engine.enforce_at(&mut a, false, &mut rec, start + Duration::seconds(40)));
        assert_eq!(rec.warnings.len(), 2);
        assert!(a.is_active());
    }
}
