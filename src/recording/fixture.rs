use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RequestFingerprint;

/// One persisted vendor response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordedResponse {
    pub test_name: String,
    pub provider: String,
    pub model_id: String,
    pub request_hash: String,
    /// Vendor payload, replayed as-is
    pub payload: Value,
    /// When the fixture was captured; never part of the fingerprint
    pub timestamp: DateTime<Utc>,
}

impl RecordedResponse {
    /// Capture `payload` for the request identified by `fingerprint`
    pub fn capture(fingerprint: &RequestFingerprint, payload: Value) -> Self {
        Self {
            test_name: fingerprint.test_name.clone(),
            provider: fingerprint.provider.clone(),
            model_id: fingerprint.model_id.clone(),
            request_hash: fingerprint.request_hash(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// The identifying triple of this fixture
    pub fn entry(&self) -> FixtureEntry {
        FixtureEntry {
            test_name: self.test_name.clone(),
            provider: self.provider.clone(),
            model_id: self.model_id.clone(),
        }
    }
}

/// A recorded `(testName, provider, modelId)` triple
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FixtureEntry {
    pub test_name: String,
    pub provider: String,
    pub model_id: String,
}
