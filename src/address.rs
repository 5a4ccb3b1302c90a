//! Target address resolution.
//!
//! Pure precedence chain: explicit request override, then the
//! `ADDRESS` environment key. No I/O.

use crate::context::ExecutionContext;
use crate::error::DispatchError;

/// Environment key holding the default delivery address.
pub const ADDRESS_ENV_KEY: &str = "ADDRESS";

/// Resolve the delivery address for one invocation.
///
/// The explicit override wins over the environment default. Exactly one
/// trailing slash is stripped so path segments can be appended safely.
///
/// # Errors
///
/// Returns [`DispatchError::Configuration`] when neither source
/// provides a non-blank value.
pub fn resolve(
    explicit: Option<&str>,
    ctx: &ExecutionContext,
) -> Result<String, DispatchError> {
    let raw = explicit
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| ctx.env_non_blank(ADDRESS_ENV_KEY).map(str::trim))
        .ok_or_else(|| DispatchError::Configuration("no URL specified".to_owned()))?;

    Ok(raw.strip_suffix('/').unwrap_or(raw).to_owned())
}
