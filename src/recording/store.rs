//! Directory-backed fixture store
//!
//! Layout: `<base_dir>/<provider>/<request_hash>.json`. Reads are
//! concurrent. Writes are serialized and never overwrite: a fixture is
//! written to a temporary file and hard-linked into place, so the first
//! writer wins and readers never observe a partial file.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use super::{FixtureEntry, RecordedResponse};
use crate::error::LlmError;

lazy_static! {
    static ref UNSAFE_SEGMENT: Regex = Regex::new(r"[^A-Za-z0-9._-]").expect("valid regex");
    static ref REQUEST_HASH: Regex = Regex::new(r"^[0-9a-f]{64}$").expect("valid regex");
}

/// Fixture directory
#[derive(Debug)]
pub struct FixtureStore {
    base_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FixtureStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the fixture for `provider` and `request_hash`
    pub fn fixture_path(&self, provider: &str, request_hash: &str) -> PathBuf {
        self.base_dir
            .join(provider_dir(provider))
            .join(format!("{request_hash}.json"))
    }

    /// Load a fixture; `Ok(None)` when none was recorded
    pub async fn load(
        &self,
        provider: &str,
        request_hash: &str,
    ) -> Result<Option<RecordedResponse>, LlmError> {
        if !REQUEST_HASH.is_match(request_hash) {
            return Err(LlmError::FixtureError(format!(
                "invalid request hash `{request_hash}`"
            )));
        }
        let path = self.fixture_path(provider, request_hash);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let fixture: RecordedResponse = serde_json::from_slice(&bytes).map_err(|e| {
            LlmError::FixtureError(format!("unreadable fixture {}: {e}", path.display()))
        })?;
        if fixture.request_hash != request_hash {
            return Err(LlmError::FixtureError(format!(
                "fixture {} carries hash {}",
                path.display(),
                fixture.request_hash
            )));
        }
        Ok(Some(fixture))
    }

    /// Persist a fixture unless one already exists for its hash.
    /// Returns `true` when this call wrote it.
    pub async fn save(&self, fixture: &RecordedResponse) -> Result<bool, LlmError> {
        let path = self.fixture_path(&fixture.provider, &fixture.request_hash);
        let bytes = serde_json::to_vec_pretty(fixture)?;

        let _guard = self.write_lock.lock().await;
        if tokio::fs::try_exists(&path).await? {
            return Ok(false);
        }
        let dir = path
            .parent()
            .ok_or_else(|| LlmError::InternalError("fixture path has no parent".to_string()))?;
        tokio::fs::create_dir_all(dir).await?;

        let tmp = dir.join(format!(
            ".{}.{}.tmp",
            fixture.request_hash,
            uuid::Uuid::new_v4().simple()
        ));
        tokio::fs::write(&tmp, &bytes).await?;
        let linked = tokio::fs::hard_link(&tmp, &path).await;
        // The temporary name is private to this call.
        let _ = tokio::fs::remove_file(&tmp).await;
        match linked {
            Ok(()) => {
                tracing::debug!(
                    provider = %fixture.provider,
                    request_hash = %fixture.request_hash,
                    path = %path.display(),
                    "fixture recorded"
                );
                Ok(true)
            }
            // Another process got there first.
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Every fixture in the store, sorted by provider then hash.
    ///
    /// Fails with `FixtureError` on the first file that does not parse.
    pub async fn fixtures(&self) -> Result<Vec<RecordedResponse>, LlmError> {
        let mut fixtures = Vec::new();
        let mut providers = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(fixtures),
            Err(e) => return Err(e.into()),
        };
        let mut files = Vec::new();
        while let Some(provider) = providers.next_entry().await? {
            if !provider.file_type().await?.is_dir() {
                continue;
            }
            let mut entries = tokio::fs::read_dir(provider.path()).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let is_fixture = path.extension().is_some_and(|ext| ext == "json")
                    && !entry.file_name().to_string_lossy().starts_with('.');
                if is_fixture {
                    files.push(path);
                }
            }
        }
        files.sort();
        for path in files {
            let bytes = tokio::fs::read(&path).await?;
            let fixture = serde_json::from_slice::<RecordedResponse>(&bytes).map_err(|e| {
                LlmError::FixtureError(format!("unreadable fixture {}: {e}", path.display()))
            })?;
            fixtures.push(fixture);
        }
        Ok(fixtures)
    }

    /// Every recorded `(testName, provider, modelId)` triple, deduplicated
    pub async fn entries(&self) -> Result<Vec<FixtureEntry>, LlmError> {
        let entries: BTreeSet<FixtureEntry> = self
            .fixtures()
            .await?
            .iter()
            .map(RecordedResponse::entry)
            .collect();
        Ok(entries.into_iter().collect())
    }
}

fn provider_dir(provider: &str) -> String {
    let cleaned = UNSAFE_SEGMENT.replace_all(provider, "_");
    match cleaned.as_ref() {
        "" | "." | ".." => "_".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RequestFingerprint;
    use serde_json::json;

    fn fixture(payload: serde_json::Value) -> RecordedResponse {
        let fp = RequestFingerprint::new("openai", "gpt-4o", "greeting", json!({"q": "hi"}));
        RecordedResponse::capture(&fp, payload)
    }

    #[test]
    fn provider_names_are_made_path_safe() {
        assert_eq!(provider_dir("bedrock/anthropic"), "bedrock_anthropic");
        assert_eq!(provider_dir(".."), "_");
        assert_eq!(provider_dir("open-ai.v1"), "open-ai.v1");
    }

    #[tokio::test]
    async fn first_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FixtureStore::new(dir.path());
        let first = fixture(json!({"text": "first"}));
        let second = fixture(json!({"text": "second"}));

        assert!(store.save(&first).await.unwrap());
        assert!(!store.save(&second).await.unwrap());

        let loaded = store.load("openai", &first.request_hash).await.unwrap().unwrap();
        assert_eq!(loaded.payload, json!({"text": "first"}));
    }

    #[tokio::test]
    async fn missing_fixture_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FixtureStore::new(dir.path());
        let hash = "0".repeat(64);
        assert!(store.load("openai", &hash).await.unwrap().is_none());
        assert!(store.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_malformed_hash() {
        let store = FixtureStore::new("unused");
        let err = store.load("openai", "../secrets").await.unwrap_err();
        assert!(matches!(err, LlmError::FixtureError(_)));
    }

    #[tokio::test]
    async fn entries_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let store = FixtureStore::new(dir.path());
        for q in ["a", "b"] {
            let fp = RequestFingerprint::new("openai", "gpt-4o", "greeting", json!({"q": q}));
            store.save(&RecordedResponse::capture(&fp, json!(null))).await.unwrap();
        }
        let entries = store.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].test_name, "greeting");
        assert_eq!(store.fixtures().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn corrupt_fixture_fails_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        let store = FixtureStore::new(dir.path());
        let saved = fixture(json!({"text": "ok"}));
        store.save(&saved).await.unwrap();
        let path = store.fixture_path("openai", &saved.request_hash);
        tokio::fs::write(&path, "{ truncated").await.unwrap();

        let err = store.entries().await.unwrap_err();
        assert!(
            matches!(err, LlmError::FixtureError(ref m) if m.contains(&saved.request_hash)),
            "{err:?}"
        );
        assert!(store.fixtures().await.is_err());
    }
}
