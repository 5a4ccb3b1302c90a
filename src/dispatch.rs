//! The dispatcher: request/result types and the single-shot send.
//!
//! One invocation performs at most one delivery round trip (webhook or
//! API), plus at most one token-exchange call when the
//! client-credentials scheme is selected. No retries happen here; the
//! error handler in [`crate::handler`] owns retry policy.

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address;
use crate::auth::{self, CredentialScheme};
use crate::context::ExecutionContext;
use crate::error::DispatchError;

/// Fixed identifying user agent sent on every outbound call.
pub const USER_AGENT: &str = concat!("courier/", env!("CARGO_PKG_VERSION"));

/// Platform API path for posting a message.
pub const API_POST_MESSAGE_PATH: &str = "/api/chat.postMessage";

/// Maximum message length accepted by the platform.
pub const MAX_TEXT_CHARS: usize = 4000;

/// Backoff before the one-shot rate-limit retry.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// HTTP connect timeout for the reqwest client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// HTTP request timeout for delivery and token-exchange calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Webhook acknowledgment body.
const WEBHOOK_ACK_BODY: &str = "ok";

// ---------------------------------------------------------------------------
// Request / Result
// ---------------------------------------------------------------------------

/// Delivery mode for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Pre-authorized single-purpose URL; no credential resolution.
    Webhook,
    /// Authenticated general-purpose endpoint with explicit channel
    /// targeting.
    Api,
}

/// One outbound message to deliver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    /// Message text. Must be non-blank and at most 4000 chars.
    pub text: String,
    /// Target channel. Required in API mode, ignored in webhook mode.
    #[serde(default)]
    pub channel: Option<String>,
    /// Delivery mode.
    pub mode: DeliveryMode,
    /// Explicit address override; falls back to the `ADDRESS`
    /// environment key when absent.
    #[serde(default)]
    pub address: Option<String>,
}

/// Mode-specific delivery detail, flattened into [`SendResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Delivery {
    /// Webhook delivery detail.
    Webhook {
        /// Whether the response body was the literal acknowledgment
        /// `"ok"`. Independent of HTTP success.
        ok: bool,
    },
    /// API delivery detail.
    Api {
        /// The channel echoed back from the request.
        channel: String,
        /// Platform-assigned message timestamp, when reported.
        ts: Option<String>,
        /// Platform `ok` flag (always true on success).
        ok: bool,
    },
}

/// Structured result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendResult {
    /// Always `"success"`; failures are raised, not returned.
    pub status: SendStatus,
    /// The message text that was delivered.
    pub text: String,
    /// Mode-specific detail (serialized alongside a `mode` tag).
    #[serde(flatten)]
    pub delivery: Delivery,
}

/// Status discriminant for [`SendResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    /// The delivery round trip completed.
    Success,
}

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Webhook request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct WebhookBody<'a> {
    /// Message text.
    pub text: &'a str,
}

/// API request body for `chat.postMessage`.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ApiBody<'a> {
    /// Message text.
    pub text: &'a str,
    /// Target channel.
    pub channel: &'a str,
}

/// API response body for `chat.postMessage`.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    /// Platform success flag.
    pub ok: bool,
    /// Platform error code when `ok` is false.
    pub error: Option<String>,
    /// Platform-assigned message timestamp.
    pub ts: Option<String>,
}

/// Parse a 2xx API response body and apply the platform `ok` check.
///
/// # Errors
///
/// Returns [`DispatchError::Parse`] when the body is not the expected
/// JSON shape and [`DispatchError::Platform`] when the platform reports
/// `ok: false`.
#[doc(hidden)]
pub fn parse_api_response(body: &str) -> Result<ApiResponse, DispatchError> {
    let resp: ApiResponse =
        serde_json::from_str(body).map_err(|e| DispatchError::Parse(e.to_string()))?;
    if !resp.ok {
        return Err(DispatchError::Platform {
            code: resp
                .error
                .clone()
                .unwrap_or_else(|| "Unknown error".to_owned()),
        });
    }
    Ok(resp)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate request inputs before any I/O.
///
/// # Errors
///
/// Returns [`DispatchError::Validation`] for blank or over-long text,
/// or a blank channel in API mode.
pub fn validate(request: &SendRequest) -> Result<(), DispatchError> {
    if request.text.trim().is_empty() {
        return Err(DispatchError::Validation("text is required".to_owned()));
    }
    if request.text.chars().count() > MAX_TEXT_CHARS {
        return Err(DispatchError::Validation(format!(
            "text exceeds {MAX_TEXT_CHARS} characters"
        )));
    }
    if request.mode == DeliveryMode::Api
        && request
            .channel
            .as_deref()
            .is_none_or(|channel| channel.trim().is_empty())
    {
        return Err(DispatchError::Validation("channel is required".to_owned()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Error-body sanitization
// ---------------------------------------------------------------------------

/// Collapse, redact, and truncate an HTTP error body before it enters
/// an error message or log line.
#[doc(hidden)]
pub fn sanitize_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"xox[bpoas]-[A-Za-z0-9\-]{10,}",
        r"Bearer [A-Za-z0-9._\-]{10,}",
        r"Basic [A-Za-z0-9+/=]{8,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

/// Build a [`DispatchError::Transport`] from a non-2xx response,
/// consuming its body for diagnostics.
async fn transport_error(response: reqwest::Response) -> DispatchError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    DispatchError::Transport {
        status: status.as_u16(),
        status_text: status
            .canonical_reason()
            .unwrap_or("Unknown Status")
            .to_owned(),
        body: sanitize_error_body(&body),
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Single-shot message dispatcher.
///
/// Holds only the HTTP client and the fixed rate-limit backoff; no
/// state survives an invocation.
pub struct Dispatcher {
    client: reqwest::Client,
    retry_delay: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create a dispatcher with connect/request timeouts applied.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self {
            client,
            retry_delay: RATE_LIMIT_BACKOFF,
        }
    }

    /// Override the rate-limit backoff. Exposed for tests only.
    #[doc(hidden)]
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// The backoff applied before the one-shot rate-limit retry.
    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Validate inputs, resolve address/credentials, and perform the
    /// send. At most one delivery round trip; no retries.
    ///
    /// # Errors
    ///
    /// Propagates the full [`DispatchError`] taxonomy; classification
    /// is the error handler's job, never this function's.
    pub async fn invoke(
        &self,
        request: &SendRequest,
        ctx: &ExecutionContext,
    ) -> Result<SendResult, DispatchError> {
        validate(request)?;
        match request.mode {
            DeliveryMode::Webhook => self.send_webhook(request, ctx).await,
            DeliveryMode::Api => self.send_api(request, ctx).await,
        }
    }

    /// Deliver via the pre-authorized webhook URL.
    async fn send_webhook(
        &self,
        request: &SendRequest,
        ctx: &ExecutionContext,
    ) -> Result<SendResult, DispatchError> {
        let url = address::resolve(request.address.as_deref(), ctx)?;

        let response = self
            .client
            .post(&url)
            .json(&WebhookBody {
                text: &request.text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(transport_error(response).await);
        }

        let body = response.text().await.unwrap_or_default();
        let acknowledged = body == WEBHOOK_ACK_BODY;
        if !acknowledged {
            debug!(body = %sanitize_error_body(&body), "webhook answered 2xx without ok body");
        }
        debug!("message delivered via webhook");

        Ok(SendResult {
            status: SendStatus::Success,
            text: request.text.clone(),
            delivery: Delivery::Webhook { ok: acknowledged },
        })
    }

    /// Deliver via the authenticated platform API.
    async fn send_api(
        &self,
        request: &SendRequest,
        ctx: &ExecutionContext,
    ) -> Result<SendResult, DispatchError> {
        // validate() guarantees channel presence in API mode.
        let channel = request
            .channel
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| DispatchError::Validation("channel is required".to_owned()))?;

        let scheme = CredentialScheme::resolve(ctx)?;
        let authorization = auth::authorization_header(&scheme, ctx, &self.client).await?;
        let base = address::resolve(request.address.as_deref(), ctx)?;
        let url = format!("{base}{API_POST_MESSAGE_PATH}");

        let response = self
            .client
            .post(&url)
            .header("Authorization", authorization)
            .json(&ApiBody {
                text: &request.text,
                channel,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(transport_error(response).await);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed = parse_api_response(&body)?;
        debug!(channel, ts = parsed.ts.as_deref(), "message delivered via API");

        Ok(SendResult {
            status: SendStatus::Success,
            text: request.text.clone(),
            delivery: Delivery::Api {
                channel: channel.to_owned(),
                ts: parsed.ts,
                ok: true,
            },
        })
    }
}
