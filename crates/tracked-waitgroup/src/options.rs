use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::sink::{global_sink, DiagnosticSink};

/// Environment variable selecting periodic re-dumps, in milliseconds.
pub const REDUMP_ENV: &str = "TRACKED_WAITGROUP_REDUMP_MS";

/// What a bounded wait does after its first dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedumpPolicy {
    /// Dump once when the bound elapses, then stay quiet until the wait ends.
    #[default]
    Once,
    /// Dump again every period for as long as the wait stays stuck. A zero
    /// period behaves like [`RedumpPolicy::Once`].
    Every(Duration),
}

impl RedumpPolicy {
    /// Period between repeated dumps, if any.
    pub fn period(self) -> Option<Duration> {
        match self {
            Self::Once => None,
            Self::Every(period) if period.is_zero() => None,
            Self::Every(period) => Some(period),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub sink: Arc<DiagnosticSink>,
    pub redump: RedumpPolicy,
}

impl Options {
    pub fn new(sink: Arc<DiagnosticSink>) -> Self {
        Self {
            sink,
            redump: RedumpPolicy::Once,
        }
    }

    pub fn with_redump(mut self, redump: RedumpPolicy) -> Self {
        self.redump = redump;
        self
    }

    /// Global sink, with the redump policy taken from [`REDUMP_ENV`].
    pub fn from_env() -> Result<Self, OptionsError> {
        let redump = match std::env::var(REDUMP_ENV) {
            Ok(value) => parse_redump(&value)?,
            Err(std::env::VarError::NotPresent) => RedumpPolicy::Once,
            Err(std::env::VarError::NotUnicode(_)) => {
                return Err(OptionsError::InvalidRedump {
                    value: String::from("<non-unicode>"),
                });
            }
        };
        Ok(Self::default().with_redump(redump))
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new(global_sink())
    }
}

pub(crate) fn parse_redump(value: &str) -> Result<RedumpPolicy, OptionsError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(RedumpPolicy::Once);
    }
    match value.parse::<u64>() {
        Ok(0) | Err(_) => Err(OptionsError::InvalidRedump {
            value: value.to_owned(),
        }),
        Ok(ms) => Ok(RedumpPolicy::Every(Duration::from_millis(ms))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionsError {
    InvalidRedump { value: String },
}

impl fmt::Display for OptionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRedump { value } => write!(
                f,
                "{REDUMP_ENV} must be a positive number of milliseconds, got {value:?}"
            ),
        }
    }
}

impl Error for OptionsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_value_means_once() {
        assert_eq!(parse_redump(""), Ok(RedumpPolicy::Once));
        assert_eq!(parse_redump("  "), Ok(RedumpPolicy::Once));
    }

    #[test]
    fn positive_millis_means_every() {
        assert_eq!(
            parse_redump("250"),
            Ok(RedumpPolicy::Every(Duration::from_millis(250)))
        );
    }

    #[test]
    fn zero_and_garbage_are_rejected() {
        for bad in ["0", "-5", "soon"] {
            let err = parse_redump(bad).expect_err("invalid redump must fail");
            assert!(
                matches!(&err, OptionsError::InvalidRedump { value } if value == bad),
                "unexpected error {err:?}"
            );
        }
    }

    #[test]
    fn error_message_names_the_variable() {
        let err = parse_redump("soon").expect_err("invalid redump must fail");
        assert_eq!(
            err.to_string(),
            format!("{REDUMP_ENV} must be a positive number of milliseconds, got \"soon\"")
        );
    }

    #[test]
    fn zero_period_never_repeats() {
        assert_eq!(RedumpPolicy::Once.period(), None);
        assert_eq!(RedumpPolicy::Every(Duration::ZERO).period(), None);
        assert_eq!(
            RedumpPolicy::Every(Duration::from_millis(5)).period(),
            Some(Duration::from_millis(5))
        );
    }

    #[test]
    fn defaults_to_single_dump_on_global_sink() {
        let options = Options::default();
        assert_eq!(options.redump, RedumpPolicy::Once);
        assert!(Arc::ptr_eq(&options.sink, &global_sink()));
    }
}
