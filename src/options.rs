use std::time::Duration;

use serde::Deserialize;

use crate::{HarnessError, Result};

/// Retry count used when none is configured.
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Hard upper bound on attempts per logical call. There is no unbounded retry path.
pub const MAX_RETRIES_CEILING: usize = 10;

/// Configures HTTP timeout and retry behavior of a pipeline.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of dispatches per logical call, including the first one.
    pub max_retries: usize,
    /// Base retry backoff in milliseconds (exponential strategy). Zero retries at once.
    pub retry_backoff_ms: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff_ms: 0,
        }
    }
}

impl PipelineOptions {
    /// Checks the retry count against `1..=MAX_RETRIES_CEILING` and the timeout against zero.
    pub fn validate(&self) -> Result<()> {
        validate_max_retries(self.max_retries)?;
        if self.timeout_ms == 0 {
            return Err(HarnessError::Config("timeout_ms must be positive".to_owned()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Reads options from the environment.
    ///
    /// Reads, each optional:
    /// - `HARNESS_TIMEOUT_MS`
    /// - `HARNESS_MAX_RETRIES`
    /// - `HARNESS_RETRY_BACKOFF_MS`
    ///
    /// Unset variables keep their default. Set but unparsable values are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Parses options from a JSON document. Missing fields keep their default.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|err| HarnessError::Config(format!("invalid options JSON: {err}")))?;
        options.validate()?;
        Ok(options)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();
        if let Some(value) = parse_var(&lookup, "HARNESS_TIMEOUT_MS")? {
            options.timeout_ms = value;
        }
        if let Some(value) = parse_var(&lookup, "HARNESS_MAX_RETRIES")? {
            options.max_retries = value;
        }
        if let Some(value) = parse_var(&lookup, "HARNESS_RETRY_BACKOFF_MS")? {
            options.retry_backoff_ms = value;
        }
        options.validate()?;
        Ok(options)
    }
}

pub(crate) fn validate_max_retries(max_retries: usize) -> Result<()> {
    if max_retries == 0 {
        return Err(HarnessError::Config(
            "max_retries must allow at least one attempt".to_owned(),
        ));
    }
    if max_retries > MAX_RETRIES_CEILING {
        return Err(HarnessError::Config(format!(
            "max_retries {max_retries} exceeds ceiling of {MAX_RETRIES_CEILING}"
        )));
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| HarnessError::Config(format!("{key} is not a valid number: '{trimmed}'")))
}
