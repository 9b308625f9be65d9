//! sszkit - SSZ fixture corpus tooling.
//!
//! CLI front-end over `sszkit-core`: audit a corpus for missing rendered
//! companions, resolve and decode a single fixture, or batch-decode every
//! companion-less blob through an external decoder.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;
mod external;

/// sszkit - SSZ fixture corpus tooling
#[derive(Parser, Debug)]
#[command(name = "sszkit")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report binary fixtures without a rendered companion
    Audit(commands::audit::AuditArgs),

    /// Resolve a single fixture and decode it through an external decoder
    Decode(commands::decode::DecodeArgs),

    /// Batch-decode every companion-less fixture in a corpus
    Missing(commands::missing::MissingArgs),
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Subcommands return precise exit codes (0=success, 1=error, and for
    // decode 2=expected skip); bypass any Result plumbing so they reach the
    // shell intact.
    let exit_code = match cli.command {
        Commands::Audit(args) => commands::audit::run(&args),
        Commands::Decode(args) => commands::decode::run(&args),
        Commands::Missing(args) => commands::missing::run(&args),
    };
    std::process::exit(i32::from(exit_code));
}
