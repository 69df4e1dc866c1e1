//! Out-of-process extraction.
//!
//! The external extractor is invoked as `<program> <args...> <url>` and must print a
//! single JSON object on stdout. Anything on stderr that reads like a failure fails the
//! run even when the process exits cleanly, since some extractors log their crash and
//! exit 0 anyway.

use crate::apis::Extractor;
use crate::common::constants::{DEFAULT_SETUP_TIMEOUT_SECS, STDERR_FAILURE_VOCABULARY};
use crate::common::error::{Result, ScraperError};
use crate::common::types::{RawExtractedRecord, SourceVariant};
use crate::config::CommandSpec;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Maps the extractor's JSON object onto a raw record
pub type PayloadMapper = fn(Value) -> Result<RawExtractedRecord>;

static STDERR_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)({})", STDERR_FAILURE_VOCABULARY.join("|")))
        .expect("valid stderr failure regex")
});

/// Longest stderr excerpt carried into an error message
const STDERR_EXCERPT_CHARS: usize = 500;

pub struct SubprocessExtractor {
    source: SourceVariant,
    command: CommandSpec,
    setup: Option<CommandSpec>,
    setup_timeout: Duration,
    setup_done: OnceCell<()>,
    map_payload: PayloadMapper,
}

impl SubprocessExtractor {
    pub fn new(
        source: SourceVariant,
        command: CommandSpec,
        setup: Option<CommandSpec>,
        map_payload: PayloadMapper,
    ) -> Self {
        Self {
            source,
            command,
            setup,
            setup_timeout: Duration::from_secs(DEFAULT_SETUP_TIMEOUT_SECS),
            setup_done: OnceCell::new(),
            map_payload,
        }
    }

    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = timeout;
        self
    }

    /// Run the setup command at most once per extractor. A failed or timed-out setup is
    /// retried on the next request.
    async fn ensure_dependencies(&self) -> Result<()> {
        let Some(setup) = &self.setup else {
            return Ok(());
        };
        self.setup_done
            .get_or_try_init(|| async {
                match tokio::time::timeout(self.setup_timeout, run_setup(setup)).await {
                    Ok(result) => result,
                    Err(_) => Err(ScraperError::DependencySetup(format!(
                        "'{}' did not finish within {}s",
                        setup.program,
                        self.setup_timeout.as_secs()
                    ))),
                }
            })
            .await
            .map(|_| ())
    }
}

async fn run_setup(setup: &CommandSpec) -> Result<()> {
    info!("Installing extractor dependencies: {} {:?}", setup.program, setup.args);
    let output = Command::new(&setup.program)
        .args(&setup.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ScraperError::DependencySetup(format!("could not run '{}': {}", setup.program, e)))?;

    if !output.status.success() {
        return Err(ScraperError::DependencySetup(format!(
            "'{}' exited with {}: {}",
            setup.program,
            output.status,
            excerpt(&String::from_utf8_lossy(&output.stderr))
        )));
    }
    debug!("Extractor dependencies ready");
    Ok(())
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= STDERR_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(STDERR_EXCERPT_CHARS).collect();
    format!("{cut}...")
}

/// Judge a finished run and return its stdout payload.
///
/// Checks run in a fixed order: failure vocabulary on stderr, exit status, empty stdout,
/// then the JSON-object contract.
pub fn evaluate_output(success: bool, stdout: &str, stderr: &str) -> Result<Value> {
    if STDERR_FAILURE.is_match(stderr) {
        return Err(ScraperError::ExtractionFailed(format!(
            "extractor reported an error: {}",
            excerpt(stderr)
        )));
    }
    if !stderr.trim().is_empty() {
        debug!("Extractor stderr: {}", excerpt(stderr));
    }
    if !success {
        return Err(ScraperError::ExtractionFailed(format!(
            "extractor exited unsuccessfully: {}",
            excerpt(stderr)
        )));
    }

    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Err(ScraperError::ExtractionFailed(
            "extractor produced no output".to_string(),
        ));
    }
    let payload: Value = serde_json::from_str(stdout).map_err(|e| {
        ScraperError::ExtractionFailed(format!("extractor output is not valid JSON: {e}"))
    })?;
    if !payload.is_object() {
        return Err(ScraperError::ExtractionFailed(
            "extractor output is not a JSON object".to_string(),
        ));
    }
    Ok(payload)
}

#[async_trait]
impl Extractor for SubprocessExtractor {
    fn source(&self) -> SourceVariant {
        self.source
    }

    async fn prepare(&self) -> Result<()> {
        self.ensure_dependencies().await
    }

    #[instrument(skip(self), fields(source = %self.source, program = %self.command.program))]
    async fn extract(&self, url: &str) -> Result<RawExtractedRecord> {
        // No-op once prepared; covers callers that skip prepare()
        self.ensure_dependencies().await?;

        debug!("Spawning extractor for {}", url);
        // Dropping this future (e.g. on timeout) kills the child
        let output = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => ScraperError::DependencySetup(format!(
                    "extractor '{}' is not installed or not on PATH",
                    self.command.program
                )),
                _ => ScraperError::ExtractionFailed(format!(
                    "could not run extractor '{}': {}",
                    self.command.program, e
                )),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let payload = evaluate_output(output.status.success(), &stdout, &stderr).map_err(|e| {
            warn!("Extractor run for {} failed: {}", url, e);
            e
        })?;

        let record = (self.map_payload)(payload)?;
        info!(
            "Extracted {} page out of process: title={:?}, {} author(s)",
            self.source,
            record.title,
            record.authors.len()
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::goodreads::map_goodreads_payload;

    #[test]
    fn test_failure_vocabulary_on_stderr_wins_over_clean_exit() {
        let err = evaluate_output(
            true,
            r#"{"title":"Dune"}"#,
            "Traceback (most recent call last):\n  File \"x.py\"",
        )
        .unwrap_err();
        assert!(matches!(err, ScraperError::ExtractionFailed(msg) if msg.contains("Traceback")));
    }

    #[test]
    fn test_vocabulary_matches_inside_words() {
        for stderr in [
            "TypeError: Cannot read properties of undefined",
            "requests.exceptions.ConnectionError: timed out",
            "ValueError",
            "3 errors occurred while scraping",
            "login failed",
            "FATAL: no page",
            "thread 'main' panicked at src/main.rs:3:5",
        ] {
            let result = evaluate_output(true, r#"{"title":"Dune"}"#, stderr);
            assert!(
                matches!(result, Err(ScraperError::ExtractionFailed(_))),
                "{stderr:?} should fail the run"
            );
        }
    }

    #[test]
    fn test_benign_stderr_is_tolerated() {
        let payload = evaluate_output(true, r#"{"title":"Dune"}"#, "warming cache\n").unwrap();
        assert_eq!(payload["title"], "Dune");
    }

    #[test]
    fn test_output_contract() {
        assert!(matches!(
            evaluate_output(true, "  \n", ""),
            Err(ScraperError::ExtractionFailed(_))
        ));
        assert!(matches!(
            evaluate_output(true, "<html>blocked</html>", ""),
            Err(ScraperError::ExtractionFailed(_))
        ));
        assert!(matches!(
            evaluate_output(true, "[1, 2]", ""),
            Err(ScraperError::ExtractionFailed(_))
        ));
        assert!(matches!(
            evaluate_output(false, r#"{"title":"Dune"}"#, ""),
            Err(ScraperError::ExtractionFailed(_))
        ));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> CommandSpec {
        // sh -c '<script>' <$0> <$1=url>
        CommandSpec::new("sh", &["-c", script, "extractor"])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extract_passes_url_and_maps_payload() {
        let extractor = SubprocessExtractor::new(
            SourceVariant::Goodreads,
            shell(r#"printf '{"title":"Dune","author":"Frank Herbert","source":"%s"}' "$1""#),
            None,
            map_goodreads_payload,
        );
        let record = extractor
            .extract("https://www.goodreads.com/book/show/1")
            .await
            .unwrap();
        assert_eq!(record.title.as_deref(), Some("Dune"));
        assert_eq!(record.authors, vec!["Frank Herbert"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_error_fails_even_with_exit_zero() {
        let extractor = SubprocessExtractor::new(
            SourceVariant::Goodreads,
            shell(r#"echo '{"title":"Dune"}'; echo 'Error: captcha page' >&2; exit 0"#),
            None,
            map_goodreads_payload,
        );
        let err = extractor.extract("https://www.goodreads.com/book/show/1").await.unwrap_err();
        assert!(matches!(err, ScraperError::ExtractionFailed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_program_is_dependency_failure() {
        let extractor = SubprocessExtractor::new(
            SourceVariant::Goodreads,
            CommandSpec::new("definitely-not-an-installed-extractor", &[]),
            None,
            map_goodreads_payload,
        );
        let err = extractor.extract("https://www.goodreads.com/book/show/1").await.unwrap_err();
        assert!(matches!(err, ScraperError::DependencySetup(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_setup_runs_once() {
        let marker = tempfile::NamedTempFile::new().unwrap();
        let marker_path = marker.path().to_str().unwrap().to_string();
        let setup = CommandSpec::new("sh", &["-c", "echo installed >> \"$0\"", &marker_path]);
        let extractor = SubprocessExtractor::new(
            SourceVariant::Goodreads,
            shell(r#"echo '{"title":"Dune"}'"#),
            Some(setup),
            map_goodreads_payload,
        );
        extractor.extract("https://www.goodreads.com/book/show/1").await.unwrap();
        extractor.extract("https://www.goodreads.com/book/show/2").await.unwrap();

        let contents = std::fs::read_to_string(marker.path()).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_setup_is_dependency_failure_not_timeout() {
        let extractor = SubprocessExtractor::new(
            SourceVariant::Goodreads,
            shell(r#"echo '{"title":"Dune"}'"#),
            Some(CommandSpec::new("sh", &["-c", "exec sleep 30"])),
            map_goodreads_payload,
        )
        .with_setup_timeout(Duration::from_millis(200));
        let err = extractor.prepare().await.unwrap_err();
        assert!(matches!(err, ScraperError::DependencySetup(msg) if msg.contains("did not finish")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_setup_is_dependency_failure() {
        let extractor = SubprocessExtractor::new(
            SourceVariant::Goodreads,
            shell(r#"echo '{"title":"Dune"}'"#),
            Some(CommandSpec::new("sh", &["-c", "exit 3"])),
            map_goodreads_payload,
        );
        let err = extractor.extract("https://www.goodreads.com/book/show/1").await.unwrap_err();
        assert!(matches!(err, ScraperError::DependencySetup(_)));
    }
}
