//! drift CLI entry point.

use clap::Parser;

use drift_cli::cli::{Cli, Command};
use drift_cli::commands;
use drift_cli::error::CliResult;
use drift_cli::logging;
use drift_cli::output;

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        output::newline();
        output::error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Reconcile(args) => commands::reconcile::run(args).await,
        Command::Diff(args) => commands::diff::run(args).await,
    }
}
