//! `drift diff` command - Show differences without changing anything.

use drift::{DatabaseUrlProvider, DiffReport, Reconciler};

use crate::cli::{DiffArgs, OutputFormat};
use crate::error::CliResult;
use crate::output;

use super::{print_endpoints, print_warnings, settings};

/// Run the diff command
pub async fn run(args: DiffArgs) -> CliResult<()> {
    let settings = settings(&args.connection, false)?;
    let format = args.connection.format;

    let provider = DatabaseUrlProvider::new(&settings.source, &settings.target);
    let report = Reconciler::new(settings.reconcile.clone())
        .diff(&provider)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            output::header("drift diff");
            print_endpoints(&settings);
            output::newline();
            print_report(&report);
        }
    }
    Ok(())
}

fn print_report(report: &DiffReport) {
    if report.differences.is_empty() {
        output::success("Target schema matches source");
    } else {
        output::section("Differences");
        for difference in report.differences.iter() {
            output::list_item(&difference.to_string());
        }
    }

    print_warnings(&report.warnings);

    if !report.differences.is_empty() {
        output::newline();
        output::info(&report.differences.summary());
    }
}
