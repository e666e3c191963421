//! Shared client wiring, error types and confirmation prompts for the CLI.

use std::fmt::{self, Display, Formatter};
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use clinic_console::{
    ApiTimeouts, ConsoleConfig, EditorError, GateNotice, HttpApi, KindProfile, LoadFailure,
};
use clinic_models::ResourceKind;
use url::Url;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.display_message())
    }
}

impl std::error::Error for CliError {}

impl From<LoadFailure> for CliError {
    fn from(value: LoadFailure) -> Self {
        match value {
            LoadFailure::HttpStatus { status, .. } if (400..500).contains(&status) => {
                Self::Validation(value.to_string())
            }
            other => Self::failure(anyhow!(other)),
        }
    }
}

impl From<GateNotice> for CliError {
    fn from(value: GateNotice) -> Self {
        match value {
            GateNotice::Failed { action, failure } => match Self::from(failure) {
                Self::Validation(message) => Self::Validation(format!("could not {action}: {message}")),
                Self::Failure(err) => Self::Failure(err.context(format!("could not {action}"))),
            },
            notice => Self::Validation(notice.to_string()),
        }
    }
}

impl From<EditorError> for CliError {
    fn from(value: EditorError) -> Self {
        match value {
            EditorError::Save(failure) => Self::from(failure),
            other => Self::Validation(other.to_string()),
        }
    }
}

/// Watchdog and transport overrides collected from flags and environment.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TimingOverrides {
    pub(crate) http_timeout_secs: Option<u64>,
    pub(crate) list_watchdog_ms: Option<u64>,
    pub(crate) record_watchdog_ms: Option<u64>,
    pub(crate) aggregate_watchdog_ms: Option<u64>,
}

/// Build and validate the console configuration.
pub(crate) fn build_config(base_url: Url, timing: TimingOverrides) -> CliResult<ConsoleConfig> {
    let mut config = ConsoleConfig::new(base_url);
    if let Some(secs) = timing.http_timeout_secs {
        config.timeouts = ApiTimeouts::uniform(Duration::from_secs(secs));
    }
    if let Some(ms) = timing.list_watchdog_ms {
        config.set_list_watchdog(Duration::from_millis(ms));
    }
    if let Some(ms) = timing.record_watchdog_ms {
        config.set_record_watchdog(Duration::from_millis(ms));
    }
    if let Some(ms) = timing.aggregate_watchdog_ms {
        config.aggregate_watchdog = Duration::from_millis(ms);
    }
    config
        .validate()
        .map_err(|err| CliError::validation(err.to_string()))?;
    Ok(config)
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) api: Arc<HttpApi>,
    pub(crate) config: ConsoleConfig,
}

impl AppContext {
    /// Construct the HTTP client for `config`, tagging requests with `request_id`.
    pub(crate) fn new(config: ConsoleConfig, request_id: &str) -> CliResult<Self> {
        let api = HttpApi::new(config.base_url.clone(), config.timeouts, request_id)
            .map_err(|err| CliError::failure(anyhow!(err)))?;
        Ok(Self {
            api: Arc::new(api),
            config,
        })
    }

    pub(crate) fn profile(&self, kind: ResourceKind) -> KindProfile {
        self.config.profile(kind)
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Interpret a yes/no answer; anything but an explicit yes declines.
pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Ask on stderr and read one line from stdin.
pub(crate) fn prompt_confirm(prompt: &str) -> bool {
    let mut stderr = io::stderr();
    if write!(stderr, "{prompt} [y/N] ").and_then(|()| stderr.flush()).is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(0) | Err(_) => false,
        Ok(_) => is_affirmative(&answer),
    }
}

const fn assume_confirmed(_: &str) -> bool {
    true
}

/// Decide how a one-shot destructive command is confirmed.
pub(crate) fn confirmation(assume_yes: bool) -> CliResult<fn(&str) -> bool> {
    let confirm: fn(&str) -> bool = if assume_yes {
        assume_confirmed
    } else {
        prompt_confirm
    };
    if assume_yes || io::stdin().is_terminal() {
        Ok(confirm)
    } else {
        Err(CliError::validation(
            "confirmation required; pass --yes when running non-interactively",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_url_rejects_invalid_input() {
        assert!(parse_url("not a url").is_err());
        assert!(parse_url("http://127.0.0.1:8081").is_ok());
    }

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("nope"));
    }

    #[test]
    fn assume_yes_skips_the_prompt() {
        let confirm = confirmation(true).expect("--yes");
        assert!(confirm("Delete?"));
    }

    #[test]
    fn overrides_feed_the_console_config() -> CliResult<()> {
        let config = build_config(
            parse_url("http://127.0.0.1:8081").map_err(CliError::validation)?,
            TimingOverrides {
                http_timeout_secs: Some(3),
                list_watchdog_ms: Some(4_000),
                record_watchdog_ms: None,
                aggregate_watchdog_ms: Some(10_000),
            },
        )?;
        assert_eq!(config.timeouts.list, Duration::from_secs(3));
        assert_eq!(
            config.profile(ResourceKind::Staff).list_watchdog,
            Duration::from_millis(4_000)
        );
        assert_eq!(config.aggregate_watchdog, Duration::from_millis(10_000));
        Ok(())
    }

    #[test]
    fn zero_watchdogs_are_validation_errors() {
        let err = build_config(
            parse_url("http://127.0.0.1:8081").expect("url"),
            TimingOverrides {
                list_watchdog_ms: Some(0),
                ..TimingOverrides::default()
            },
        )
        .expect_err("zero");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn client_errors_map_to_validation() {
        let err = CliError::from(GateNotice::Failed {
            action: "create",
            failure: LoadFailure::HttpStatus {
                status: 400,
                url: "http://x/api/patients".into(),
                message: "name missing".into(),
            },
        });
        assert!(matches!(&err, CliError::Validation(message) if message.contains("name missing")));

        let err = CliError::from(LoadFailure::Timeout);
        assert_eq!(err.exit_code(), 3);
    }
}
