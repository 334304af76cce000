pub mod check;
pub mod config;
pub mod negotiate;
pub mod replay;

use clap::Args;
use focusguard_core::{BehavioralEvent, EventType, Severity, Target};

/// Flags describing one observed behavior.
#[derive(Args, Debug)]
pub struct EventArgs {
    /// Behavior type (scroll_loop, adult_content, distraction_site, other)
    #[arg(long = "type")]
    pub event_type: EventType,
    /// Severity (low, medium, high)
    #[arg(long)]
    pub severity: Severity,
    /// Seconds the behavior has been going on
    #[arg(long, default_value = "0")]
    pub duration: f64,
    /// Url the behavior happens on
    #[arg(long)]
    pub url: Option<String>,
    /// Process the behavior happens in
    #[arg(long)]
    pub process: Option<String>,
}

impl EventArgs {
    pub fn to_event(&self) -> BehavioralEvent {
        let target = Target {
            url: self.url.clone(),
            process_name: self.process.clone(),
        };
        BehavioralEvent::new(self.event_type, self.severity, target, self.duration)
    }
}
