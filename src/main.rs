//! dashsync - dashboard data sync CLI
//!
//! Runs the dashboard API service and edits the sheet and task collections
//! from the command line, falling back to local data when the API is down.

use clap::Parser;
use dashsync::cli::{Cli, Commands};
use dashsync::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    let command = infer_command_name_from_args();
    let cli = Cli::parse();

    // Tracing is opt-in via RUST_LOG, except that the server logs requests.
    // Ignore invalid/huge filters so startup never fails on them.
    let default_filter = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "off",
    };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let json = cli.json;
    if let Err(err) = cli.run().await {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}
