//! `drift reconcile` command - Bring the target schema in line with the source.

use drift::{CancellationToken, RunReport};

use crate::cli::{OutputFormat, ReconcileArgs};
use crate::error::{CliError, CliResult};
use crate::output;

use super::{print_endpoints, print_warnings, settings};

/// Run the reconcile command
pub async fn run(args: ReconcileArgs) -> CliResult<()> {
    let settings = settings(&args.connection, args.dry_run)?;
    let format = args.connection.format;

    if format == OutputFormat::Text {
        output::header("drift reconcile");
        print_endpoints(&settings);
        if settings.reconcile.dry_run {
            output::kv("Mode", "dry run");
        }
        output::newline();
    }

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping the run");
                cancel.cancel();
            }
        })
    };

    let result = drift::reconcile_urls_with_cancellation(
        &settings.source,
        &settings.target,
        settings.reconcile,
        cancel,
    )
    .await;
    interrupt.abort();
    let report = result?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    if report.has_failures() {
        return Err(CliError::Failures(report.failed_count()));
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    let total = report.entries.len();
    if total == 0 && !report.cancelled {
        output::success("Target schema matches source");
    }

    for (i, entry) in report.entries.iter().enumerate() {
        let title = match &entry.action {
            Some(action) => action.to_string(),
            None => entry.difference.to_string(),
        };
        output::step(i + 1, total, &title);
        output::kv("Outcome", &output::outcome(&entry.outcome));
        if report.dry_run || entry.outcome.is_failed() {
            for statement in &entry.statements {
                output::code(statement);
            }
        }
    }

    print_warnings(&report.warnings);
    output::newline();

    if report.cancelled {
        output::warn("Run cancelled; remaining actions were skipped");
    }
    if report.has_failures() {
        output::warn(&report.summary());
    } else {
        output::success(&report.summary());
    }
}
