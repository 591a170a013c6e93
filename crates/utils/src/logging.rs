use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Crates whose events are emitted at the configured level. Everything else stays at `warn`.
const WORKSPACE_TARGETS: &[&str] = &["server", "services", "db", "utils", "tower_http"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("Global subscriber already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Builds the filter directive string, e.g. `warn,server=info,services=info,...`.
///
/// A value that is already a directive list (`server=debug`, `info,sqlx=warn`)
/// is used as given.
pub fn filter_directives(level: &str) -> String {
    let level = level.trim();
    if level.contains(['=', ',']) {
        return level.to_string();
    }

    let mut directives = String::from("warn");
    for target in WORKSPACE_TARGETS {
        directives.push(',');
        directives.push_str(target);
        directives.push('=');
        directives.push_str(level);
    }
    directives
}

/// Installs the global tracing subscriber.
///
/// `level` is usually taken from `RUST_LOG`. Must be called once, from the binary.
pub fn init(format: LogFormat, level: &str) -> Result<(), LoggingError> {
    let directives = filter_directives(level);
    let filter = EnvFilter::try_new(&directives).map_err(|source| LoggingError::Filter {
        filter: directives.clone(),
        source,
    })?;

    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
        LogFormat::Json => (
            None,
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn directives_scope_every_workspace_crate() {
        assert_eq!(
            filter_directives("debug"),
            "warn,server=debug,services=debug,db=debug,utils=debug,tower_http=debug"
        );
    }

    #[test]
    fn full_directives_are_kept_verbatim() {
        assert_eq!(filter_directives("server=debug"), "server=debug");
        assert_eq!(
            filter_directives("info,sqlx=warn,services=trace"),
            "info,sqlx=warn,services=trace"
        );
        assert!(EnvFilter::try_new(filter_directives("server=debug")).is_ok());
        assert!(EnvFilter::try_new(filter_directives(" info ")).is_ok());
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::from_str("xml").is_err());
    }
}
