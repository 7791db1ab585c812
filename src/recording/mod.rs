//! Record/Replay Fixture Layer
//!
//! Captures vendor responses to disk during recording runs and serves them
//! back during replay runs, so conformance suites run without network
//! access. Activation is per request, via
//! [`RequestContext::with_recorder`](crate::context::RequestContext::with_recorder).

mod fingerprint;
mod fixture;
mod recorder;
mod store;

pub use fingerprint::*;
pub use fixture::*;
pub use recorder::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::LlmError;

/// Environment variable selecting the mode (`record` or `replay`)
pub const RECORD_MODE_ENV: &str = "UNILLM_RECORD_MODE";
/// Environment variable overriding the fixture directory
pub const FIXTURE_DIR_ENV: &str = "UNILLM_FIXTURE_DIR";
/// Fixture directory used when none is configured
pub const DEFAULT_FIXTURE_DIR: &str = "tests/fixtures/recordings";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordMode {
    /// Call the vendor and persist new responses
    Record,
    /// Serve stored responses only
    Replay,
}

impl FromStr for RecordMode {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(Self::Record),
            "replay" => Ok(Self::Replay),
            other => Err(LlmError::ConfigurationError(format!(
                "unknown record mode `{other}`, expected `record` or `replay`"
            ))),
        }
    }
}

/// Recorder settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    pub mode: RecordMode,
    pub fixture_dir: PathBuf,
}

impl RecorderConfig {
    pub fn new(mode: RecordMode) -> Self {
        Self {
            mode,
            fixture_dir: PathBuf::from(DEFAULT_FIXTURE_DIR),
        }
    }

    pub fn with_fixture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fixture_dir = dir.into();
        self
    }

    /// Read `UNILLM_RECORD_MODE` and `UNILLM_FIXTURE_DIR`.
    ///
    /// Returns `Ok(None)` when no mode is set, meaning calls go straight to
    /// the vendor.
    pub fn from_env() -> Result<Option<Self>, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, LlmError> {
        let Some(mode) = lookup(RECORD_MODE_ENV).filter(|m| !m.trim().is_empty()) else {
            return Ok(None);
        };
        let mut config = Self::new(mode.parse()?);
        if let Some(dir) = lookup(FIXTURE_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.fixture_dir = PathBuf::from(dir);
        }
        Ok(Some(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn unset_mode_means_no_recorder() {
        assert_eq!(RecorderConfig::from_lookup(lookup(&[])).unwrap(), None);
        assert_eq!(
            RecorderConfig::from_lookup(lookup(&[(FIXTURE_DIR_ENV, "/tmp/x")])).unwrap(),
            None
        );
    }

    #[test]
    fn mode_and_directory_are_read() {
        let config = RecorderConfig::from_lookup(lookup(&[
            (RECORD_MODE_ENV, "Replay"),
            (FIXTURE_DIR_ENV, "/data/fixtures"),
        ]))
        .unwrap()
        .unwrap();
        assert_eq!(config.mode, RecordMode::Replay);
        assert_eq!(config.fixture_dir, PathBuf::from("/data/fixtures"));

        let config = RecorderConfig::from_lookup(lookup(&[(RECORD_MODE_ENV, "record")]))
            .unwrap()
            .unwrap();
        assert_eq!(config.fixture_dir, PathBuf::from(DEFAULT_FIXTURE_DIR));
    }

    #[test]
    fn unknown_mode_is_a_configuration_error() {
        let err = RecorderConfig::from_lookup(lookup(&[(RECORD_MODE_ENV, "rewind")])).unwrap_err();
        assert!(matches!(err, LlmError::ConfigurationError(_)));
    }
}
