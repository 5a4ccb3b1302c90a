//! Error taxonomy for the dispatcher.
//!
//! Every failure carries a typed kind so the error handler in
//! [`crate::handler`] can classify it without inspecting message text.
//! Display messages still carry the status code or platform code so the
//! calling framework sees a useful human-readable line.

/// Errors raised by a single dispatch invocation.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Request inputs failed validation (missing/blank text or channel).
    /// Never retried.
    #[error("{0}")]
    Validation(String),

    /// Required configuration is absent (target address, credentials).
    /// Never retried.
    #[error("{0}")]
    Configuration(String),

    /// The delivery endpoint answered with a non-2xx HTTP status.
    #[error("request failed: {status} {status_text}")]
    Transport {
        /// Numeric HTTP status code.
        status: u16,
        /// Canonical status text ("Too Many Requests", ...).
        status_text: String,
        /// Sanitized response body, for diagnostics only.
        body: String,
    },

    /// The platform answered 2xx but reported `ok: false` in its body.
    #[error("platform error: {code}")]
    Platform {
        /// Platform-reported error code (e.g. `channel_not_found`).
        code: String,
    },

    /// OAuth2 client-credentials token exchange failed.
    #[error("token exchange failed: {0}")]
    AuthExchange(String),

    /// Transport-level failure before any HTTP status was received
    /// (connect refused, DNS, timeout).
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A 2xx response body did not match the expected schema.
    #[error("response parse error: {0}")]
    Parse(String),

    /// The one-shot rate-limit retry itself failed.
    #[error("retry after rate limit failed: {source}")]
    RetryFailed {
        /// The error raised by the retried invocation.
        source: Box<DispatchError>,
    },
}
