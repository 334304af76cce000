use std::io::{self, BufRead, Write};

use clap::Args;
use focusguard_core::{Config, NegotiationEngine, NegotiationOutcome};

use super::EventArgs;

#[derive(Args)]
pub struct NegotiateArgs {
    #[command(flatten)]
    pub event: EventArgs,
    /// Override negotiation.max_rounds from the config
    #[arg(long)]
    pub max_rounds: Option<u32>,
}

pub fn run(args: NegotiateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let max_rounds = match args.max_rounds {
        Some(n) => n,
        None => Config::load()?.negotiation.max_rounds,
    };
    let event = args.event.to_event();
    let mut engine = NegotiationEngine::with_max_rounds(max_rounds);

    let opening = engine.start_negotiation(&event)?;
    eprintln!("{}", opening.message);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        eprint!("> ");
        io::stderr().flush()?;

        let reply = match lines.next() {
            Some(line) => line?,
            None => return Err("input ended before an agreement was reached".into()),
        };

        match engine.process_reply(reply.trim())? {
            NegotiationOutcome::Agreed {
                message,
                agreement,
                resolution,
            } => {
                eprintln!("{message}");
                let mut out = serde_json::to_value(&agreement)?;
                out["resolution"] = serde_json::to_value(resolution)?;
                println!("{}", serde_json::to_string_pretty(&out)?);
                return Ok(());
            }
            other => eprintln!("{}", other.message()),
        }
    }
}
