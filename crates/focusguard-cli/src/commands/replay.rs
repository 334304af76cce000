use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use focusguard_core::integrations::replay::run_script;
use focusguard_core::{BrowserController, Config, Event, Monitor, ReplayAnalyzer, ReplayScript};
use tracing::info;

#[derive(Args)]
pub struct ReplayArgs {
    /// JSON-lines replay script
    pub file: PathBuf,
    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Pretends to close tabs so replays exercise the success path.
struct DryRunBrowser;

impl BrowserController for DryRunBrowser {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn close_tab_by_url(&self, url: &str) -> focusguard_core::error::Result<bool> {
        info!(url, "dry run: would close tab");
        Ok(true)
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::InterventionFired {
            event_type,
            strategy,
            ..
        } => format!(
            "intervention: {} ({:?}, {:?} urgency)",
            event_type.as_str(),
            strategy.kind,
            strategy.urgency
        ),
        Event::AgreementWarning {
            seconds_remaining, ..
        } => format!("warning: {seconds_remaining:.0}s left"),
        Event::AgreementExpired { agreement_id, .. } => format!("expired: {agreement_id}"),
        Event::AgreementCompleted { agreement_id, .. } => format!("completed: {agreement_id}"),
        Event::AgreementViolated {
            agreement_id,
            violation_count,
            ..
        } => format!("violated: {agreement_id} (x{violation_count})"),
        Event::ComplianceRestored { agreement_id, .. } => format!("restored: {agreement_id}"),
        other => other.message().unwrap_or_default().to_string(),
    }
}

pub fn run(args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(&args.file)
        .map_err(|e| format!("cannot read {}: {e}", args.file.display()))?;
    let script = ReplayScript::parse(&content)?;
    let config = Config::load()?;

    let mut monitor = Monitor::new(ReplayAnalyzer::new(), &config).with_browser(DryRunBrowser);
    let start = Utc::now();
    let (events, end) = run_script(&script, &mut monitor, start)?;

    for event in &events {
        if args.json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            let offset = (event.at() - start).num_seconds();
            println!("[+{offset:>5}s] {}", describe(event));
        }
    }
    if !args.json {
        println!(
            "{} events over {}s of simulated time",
            events.len(),
            (end - start).num_seconds()
        );
    }
    Ok(())
}
