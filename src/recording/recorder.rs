use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use super::{FixtureStore, RecordMode, RecordedResponse, RecorderConfig, RequestFingerprint};
use crate::error::LlmError;

/// Intercepts vendor calls for one test
///
/// In `Record` mode the live call runs and its payload is persisted unless a
/// fixture for the same request already exists. In `Replay` mode the stored
/// payload is returned and the live call never runs.
#[derive(Debug, Clone)]
pub struct Recorder {
    mode: RecordMode,
    store: Arc<FixtureStore>,
    test_name: String,
}

impl Recorder {
    pub fn new(mode: RecordMode, store: Arc<FixtureStore>, test_name: impl Into<String>) -> Self {
        Self {
            mode,
            store,
            test_name: test_name.into(),
        }
    }

    /// Recording recorder over a fresh store at `base_dir`
    pub fn recording(base_dir: impl Into<PathBuf>, test_name: impl Into<String>) -> Self {
        Self::new(RecordMode::Record, Arc::new(FixtureStore::new(base_dir)), test_name)
    }

    /// Replaying recorder over a fresh store at `base_dir`
    pub fn replaying(base_dir: impl Into<PathBuf>, test_name: impl Into<String>) -> Self {
        Self::new(RecordMode::Replay, Arc::new(FixtureStore::new(base_dir)), test_name)
    }

    /// Recorder described by `config`
    pub fn from_config(config: &RecorderConfig, test_name: impl Into<String>) -> Self {
        Self::new(
            config.mode,
            Arc::new(FixtureStore::new(config.fixture_dir.clone())),
            test_name,
        )
    }

    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn store(&self) -> &Arc<FixtureStore> {
        &self.store
    }

    /// Fingerprint a request in this recorder's test scope
    pub fn fingerprint(&self, provider: &str, model_id: &str, content: &Value) -> RequestFingerprint {
        RequestFingerprint::new(provider, model_id, self.test_name.clone(), content.clone())
    }

    /// Route one vendor call through the fixture store
    pub async fn intercept<F, Fut>(
        &self,
        provider: &str,
        model_id: &str,
        content: &Value,
        live: F,
    ) -> Result<Value, LlmError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, LlmError>>,
    {
        let fingerprint = self.fingerprint(provider, model_id, content);
        let request_hash = fingerprint.request_hash();

        match self.mode {
            RecordMode::Replay => {
                let fixture = self.store.load(provider, &request_hash).await?;
                match fixture {
                    Some(fixture) => {
                        tracing::debug!(
                            test = %self.test_name,
                            provider,
                            model = model_id,
                            request_hash = %request_hash,
                            "replaying fixture"
                        );
                        Ok(fixture.payload)
                    }
                    None => Err(LlmError::ReplayMiss {
                        test_name: self.test_name.clone(),
                        provider: provider.to_string(),
                        model_id: model_id.to_string(),
                        request_hash,
                    }),
                }
            }
            RecordMode::Record => {
                let payload = live().await?;
                let fixture = RecordedResponse::capture(&fingerprint, payload);
                if !self.store.save(&fixture).await? {
                    tracing::debug!(
                        test = %self.test_name,
                        provider,
                        request_hash = %request_hash,
                        "fixture already recorded, keeping the existing one"
                    );
                }
                Ok(fixture.payload)
            }
        }
    }

    /// [`intercept`](Self::intercept) for typed payloads
    pub async fn intercept_typed<T, F, Fut>(
        &self,
        provider: &str,
        model_id: &str,
        content: &Value,
        live: F,
    ) -> Result<T, LlmError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let payload = self
            .intercept(provider, model_id, content, || async move {
                let value = live().await?;
                Ok::<Value, LlmError>(serde_json::to_value(value)?)
            })
            .await?;
        serde_json::from_value(payload).map_err(|e| {
            LlmError::FixtureError(format!(
                "recorded payload for test `{}` does not match the expected shape: {e}",
                self.test_name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn replay_miss_names_the_request() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::replaying(dir.path(), "greeting");
        let err = recorder
            .intercept("openai", "gpt-4o", &json!({"q": 1}), || async {
                Err::<Value, _>(LlmError::InternalError("replay reached the vendor".into()))
            })
            .await
            .unwrap_err();
        match err {
            LlmError::ReplayMiss {
                test_name,
                provider,
                model_id,
                request_hash,
            } => {
                assert_eq!(test_name, "greeting");
                assert_eq!(provider, "openai");
                assert_eq!(model_id, "gpt-4o");
                assert_eq!(request_hash.len(), 64);
            }
            other => panic!("expected ReplayMiss, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn record_then_replay_skips_the_vendor() {
        let dir = tempfile::tempdir().unwrap();
        let calls = AtomicUsize::new(0);
        let content = json!({"q": "hi"});

        let recorder = Recorder::recording(dir.path(), "greeting");
        let recorded = recorder
            .intercept("openai", "gpt-4o", &content, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LlmError>(json!({"text": "Hello!"}))
            })
            .await
            .unwrap();

        let replayer = Recorder::new(RecordMode::Replay, recorder.store().clone(), "greeting");
        let replayed = replayer
            .intercept("openai", "gpt-4o", &content, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LlmError>(json!({"text": "live"}))
            })
            .await
            .unwrap();

        assert_eq!(recorded, replayed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn vendor_errors_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::recording(dir.path(), "failing");
        let err = recorder
            .intercept("openai", "gpt-4o", &json!({}), || async {
                Err::<Value, _>(LlmError::api_error(503, "overloaded"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(503));
        assert!(recorder.store().entries().await.unwrap().is_empty());
    }
}
