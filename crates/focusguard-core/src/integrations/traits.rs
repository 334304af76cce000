use crate::error::Result;
use crate::event::BehavioralEvent;

/// Source of truth for "what is the user doing right now".
///
/// Browser/window inspection lives outside the core; the monitor only
/// polls this once per tick.
pub trait ActivityAnalyzer {
    fn analyze_current_activity(&mut self) -> Option<BehavioralEvent>;
}

/// Invoked by the intervention gate each time an intervention fires
/// (typically to open the dialogue UI).
///
/// A failure is logged by the gate and never changes its state.
pub trait InterventionCallback {
    fn on_intervention(&mut self, event: &BehavioralEvent) -> Result<()>;
}

impl<F> InterventionCallback for F
where
    F: FnMut(&BehavioralEvent),
{
    fn on_intervention(&mut self, event: &BehavioralEvent) -> Result<()> {
        self(event);
        Ok(())
    }
}

/// Browser control used by enforcement to close tabs.
///
/// Optional: the enforcement engine checks `is_available()` before every
/// call and degrades to a reported failure when it is missing.
pub trait BrowserController {
    /// Human-readable name used in logs.
    fn name(&self) -> &str {
        "browser"
    }

    fn is_available(&self) -> bool;

    /// Close every tab whose url contains `url`. Returns whether anything
    /// was closed.
    fn close_tab_by_url(&self, url: &str) -> Result<bool>;
}
