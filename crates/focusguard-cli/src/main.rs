use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "focusguard", version, about = "FocusGuard CLI")]
struct Cli {
    /// Log pipeline decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Check whether an observed behavior would trigger an intervention
    Check(commands::check::CheckArgs),
    /// Negotiate a time limit interactively over stdin
    Negotiate(commands::negotiate::NegotiateArgs),
    /// Run a replay script through the monitor on a simulated clock
    Replay(commands::replay::ReplayArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("focusguard_core={default_level},{default_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Check(args) => commands::check::run(args),
        Commands::Negotiate(args) => commands::negotiate::run(args),
        Commands::Replay(args) => commands::replay::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
