//! Per-request context
//!
//! Carries the caller's cancellation signal, an optional deadline and an
//! optional fixture recorder into every generation call. Adapters observe
//! all three; the unified layer never retries on its own.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::recording::Recorder;

/// Cancellation, deadline and recording scope of one call
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    recorder: Option<Arc<Recorder>>,
}

impl RequestContext {
    /// Context with no deadline and no recorder
    pub fn background() -> Self {
        Self::default()
    }

    /// Observe an existing cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fail with `Timeout` once `timeout` has elapsed from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Fail with `Timeout` at `deadline`; an earlier existing deadline wins
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Route vendor calls through a fixture recorder
    pub fn with_recorder(mut self, recorder: Arc<Recorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Derived context whose cancellation also fires when this one does
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            recorder: self.recorder.clone(),
        }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn recorder(&self) -> Option<&Arc<Recorder>> {
        self.recorder.as_ref()
    }

    /// Fail fast if the context is already cancelled or past its deadline
    pub fn check(&self) -> Result<(), LlmError> {
        if self.cancel.is_cancelled() {
            return Err(LlmError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(deadline_error());
            }
        }
        Ok(())
    }

    /// Drive `future` to completion unless the context is cancelled or its
    /// deadline passes first; in that case the future is dropped.
    pub async fn run<F, T>(&self, future: F) -> Result<T, LlmError>
    where
        F: Future<Output = Result<T, LlmError>>,
    {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(LlmError::Cancelled),
            _ = deadline => Err(deadline_error()),
            result = future => result,
        }
    }
}

fn deadline_error() -> LlmError {
    LlmError::Timeout("request deadline exceeded".to_string())
}
