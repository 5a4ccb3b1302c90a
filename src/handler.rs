//! Error classification and the error/halt entry points.
//!
//! The dispatcher never classifies its own failures; this module owns
//! the retry policy. Classification switches on the typed error kind
//! and numeric status, never on message text.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::context::ExecutionContext;
use crate::dispatch::{Dispatcher, SendRequest, SendResult};
use crate::error::DispatchError;

/// What to do with a failed invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry once locally after the fixed rate-limit backoff.
    RetryAfterDelay,
    /// Signal the caller to reschedule with its own backoff policy.
    RetryRequested,
    /// Re-raise unchanged; retrying cannot help.
    Fatal,
}

/// Classify a dispatch failure into a retry policy.
pub fn classify(error: &DispatchError) -> RetryPolicy {
    match error {
        DispatchError::Transport { status: 429, .. } => RetryPolicy::RetryAfterDelay,
        DispatchError::Transport {
            status: 502 | 503 | 504,
            ..
        } => RetryPolicy::RetryRequested,
        DispatchError::Transport {
            status: 401 | 403, ..
        } => RetryPolicy::Fatal,
        DispatchError::Platform { code }
            if code == "invalid_auth" || code == "channel_not_found" =>
        {
            RetryPolicy::Fatal
        }
        DispatchError::Validation(_)
        | DispatchError::Configuration(_)
        | DispatchError::AuthExchange(_)
        | DispatchError::RetryFailed { .. } => RetryPolicy::Fatal,
        // Optimistic default: unknown statuses, unknown platform codes,
        // transport-level failures, and malformed bodies.
        DispatchError::Transport { .. }
        | DispatchError::Platform { .. }
        | DispatchError::Http(_)
        | DispatchError::Parse(_) => RetryPolicy::RetryRequested,
    }
}

/// Outcome of the error entry point when it does not re-raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorOutcome {
    /// The one-shot retry succeeded; its result replaces the failure.
    Recovered(SendResult),
    /// Structured `{"status": "retry_requested"}` value for the
    /// caller's backoff machinery.
    RetryRequested,
}

impl Serialize for ErrorOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Recovered(result) => result.serialize(serializer),
            Self::RetryRequested => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("status", "retry_requested")?;
                map.end()
            }
        }
    }
}

impl Dispatcher {
    /// The error entry point: classify a prior failure and either
    /// retry once after the fixed backoff, signal retry-requested, or
    /// re-raise as fatal.
    ///
    /// The retry is one-shot: a failing retry is wrapped and raised,
    /// never retried again.
    ///
    /// # Errors
    ///
    /// Re-raises fatal errors unchanged and wraps a failed retry in
    /// [`DispatchError::RetryFailed`].
    pub async fn on_error(
        &self,
        error: DispatchError,
        request: &SendRequest,
        ctx: &ExecutionContext,
    ) -> Result<ErrorOutcome, DispatchError> {
        match classify(&error) {
            RetryPolicy::RetryAfterDelay => {
                warn!(
                    backoff_secs = self.retry_delay().as_secs(),
                    "rate limited, retrying once after backoff"
                );
                tokio::time::sleep(self.retry_delay()).await;
                match self.invoke(request, ctx).await {
                    Ok(result) => Ok(ErrorOutcome::Recovered(result)),
                    Err(retry_error) => Err(DispatchError::RetryFailed {
                        source: Box::new(retry_error),
                    }),
                }
            }
            RetryPolicy::RetryRequested => {
                info!(error = %error, "deferring retry to the caller");
                Ok(ErrorOutcome::RetryRequested)
            }
            RetryPolicy::Fatal => Err(error),
        }
    }
}

// ---------------------------------------------------------------------------
// Halt
// ---------------------------------------------------------------------------

/// Acknowledgment returned by the halt entry point.
#[derive(Debug, Clone, Serialize)]
pub struct HaltAck {
    /// Always `"halted"`.
    pub status: HaltStatus,
    /// Shutdown reason supplied by the caller, if any.
    pub reason: Option<String>,
    /// When the halt was acknowledged.
    pub halted_at: DateTime<Utc>,
}

/// Status discriminant for [`HaltAck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HaltStatus {
    /// Graceful-shutdown acknowledgment.
    Halted,
}

/// The halt entry point. There are no open resources to release, so
/// this only acknowledges the shutdown.
pub fn halt(reason: Option<String>) -> HaltAck {
    info!(reason = reason.as_deref(), "halt acknowledged");
    HaltAck {
        status: HaltStatus::Halted,
        reason,
        halted_at: Utc::now(),
    }
}
