use clap::Args;
use focusguard_core::InterventionStrategy;
use serde_json::json;

use super::EventArgs;

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub event: EventArgs,
}

/// Prints whether the behavior crosses its severity threshold and, if so,
/// how the gate would classify it. The cooldown is not consulted.
pub fn run(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let event = args.event.to_event();
    let triggers = event.should_trigger_intervention();
    let strategy = triggers.then(|| InterventionStrategy::classify(&event));

    let out = json!({
        "event_type": event.event_type,
        "severity": event.severity,
        "duration_seconds": event.duration_seconds,
        "triggers": triggers,
        "strategy": strategy,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
