//! CLI command implementations.

pub mod diff;
pub mod reconcile;

use drift::IntrospectionWarning;

use crate::cli::ConnectionArgs;
use crate::config::{Config, RunSettings};
use crate::error::CliResult;
use crate::output;

/// Load `drift.toml` and merge the command-line arguments over it.
fn settings(args: &ConnectionArgs, dry_run: bool) -> CliResult<RunSettings> {
    let config = Config::load_or_default(&args.config)?;
    RunSettings::resolve(args, dry_run, &config)
}

/// Hide the password in a connection URL.
pub fn redact_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let rest = &url[scheme_end + 3..];
    let Some(at) = rest.find('@') else {
        return url.to_string();
    };
    match rest[..at].split_once(':') {
        Some((user, _)) => format!("{}{}:****{}", &url[..scheme_end + 3], user, &rest[at..]),
        None => url.to_string(),
    }
}

fn print_endpoints(settings: &RunSettings) {
    output::kv("Source", &redact_url(&settings.source));
    output::kv("Target", &redact_url(&settings.target));
}

fn print_warnings(warnings: &[IntrospectionWarning]) {
    if warnings.is_empty() {
        return;
    }
    output::newline();
    for warning in warnings {
        output::warn(&warning.to_string());
    }
}
