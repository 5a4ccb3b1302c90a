//! Credential scheme resolution and authorization header rendering.
//!
//! Callers supply exactly one scheme's secrets; when several are
//! present the fixed precedence below decides deterministically:
//! bearer > basic > pre-issued OAuth2 > client-credentials.
//!
//! The scheme is resolved into an explicit [`CredentialScheme`] union
//! once per invocation before any header is rendered. Only the
//! client-credentials variant performs I/O (one token-exchange POST).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::error::DispatchError;

/// Secret key for a direct bearer token.
pub const BEARER_TOKEN_KEY: &str = "BEARER_AUTH_TOKEN";
/// Secret key for the basic-auth username.
pub const BASIC_USERNAME_KEY: &str = "BASIC_USERNAME";
/// Secret key for the basic-auth password.
pub const BASIC_PASSWORD_KEY: &str = "BASIC_PASSWORD";
/// Secret key for a pre-issued OAuth2 access token.
pub const OAUTH2_ACCESS_TOKEN_KEY: &str = "OAUTH2_AUTHORIZATION_CODE_ACCESS_TOKEN";
/// Secret key for the OAuth2 client-credentials client secret.
pub const CLIENT_CREDENTIALS_SECRET_KEY: &str = "OAUTH2_CLIENT_CREDENTIALS_CLIENT_SECRET";

/// Environment key for the client-credentials token endpoint.
pub const CLIENT_CREDENTIALS_TOKEN_URL_KEY: &str = "OAUTH2_CLIENT_CREDENTIALS_TOKEN_URL";
/// Environment key for the client-credentials client id.
pub const CLIENT_CREDENTIALS_CLIENT_ID_KEY: &str = "OAUTH2_CLIENT_CREDENTIALS_CLIENT_ID";
/// Environment key for the optional token-exchange scope.
pub const CLIENT_CREDENTIALS_SCOPE_KEY: &str = "OAUTH2_CLIENT_CREDENTIALS_SCOPE";
/// Environment key for the optional token-exchange audience.
pub const CLIENT_CREDENTIALS_AUDIENCE_KEY: &str = "OAUTH2_CLIENT_CREDENTIALS_AUDIENCE";
/// Environment key selecting how client id/secret are transmitted
/// during the exchange: `basic_header` for an HTTP Basic header, any
/// other value (or absence) embeds them in the form body.
pub const CLIENT_CREDENTIALS_AUTH_STYLE_KEY: &str = "OAUTH2_CLIENT_CREDENTIALS_AUTH_STYLE";

const BASIC_HEADER_STYLE: &str = "basic_header";

/// One resolved credential scheme.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialScheme {
    /// Direct bearer token, sent as `Authorization: Bearer`.
    Bearer {
        /// The token value (may already carry the `Bearer ` prefix).
        token: String,
    },
    /// Username/password pair, sent as `Authorization: Basic`.
    Basic {
        /// Basic-auth username.
        username: String,
        /// Basic-auth password.
        password: String,
    },
    /// Pre-issued OAuth2 access token, sent as a bearer.
    PreIssuedOAuth {
        /// The access token value.
        token: String,
    },
    /// OAuth2 client-credentials grant; the access token is exchanged
    /// at render time.
    ClientCredentials {
        /// The client secret used for the exchange.
        client_secret: String,
    },
}

impl std::fmt::Debug for CredentialScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer { .. } => f.debug_struct("Bearer").field("token", &"[REDACTED]").finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::PreIssuedOAuth { .. } => f
                .debug_struct("PreIssuedOAuth")
                .field("token", &"[REDACTED]")
                .finish(),
            Self::ClientCredentials { .. } => f
                .debug_struct("ClientCredentials")
                .field("client_secret", &"[REDACTED]")
                .finish(),
        }
    }
}

impl CredentialScheme {
    /// Resolve the credential scheme from the secret bag.
    ///
    /// Precedence: bearer > basic > pre-issued OAuth2 >
    /// client-credentials. Blank values are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Configuration`] when no scheme's
    /// secrets are present.
    pub fn resolve(ctx: &ExecutionContext) -> Result<Self, DispatchError> {
        if let Some(token) = ctx.secret_non_blank(BEARER_TOKEN_KEY) {
            debug!("using direct bearer credentials");
            return Ok(Self::Bearer {
                token: token.to_owned(),
            });
        }

        if let (Some(username), Some(password)) = (
            ctx.secret_non_blank(BASIC_USERNAME_KEY),
            ctx.secret_non_blank(BASIC_PASSWORD_KEY),
        ) {
            debug!("using basic credentials");
            return Ok(Self::Basic {
                username: username.to_owned(),
                password: password.to_owned(),
            });
        }

        if let Some(token) = ctx.secret_non_blank(OAUTH2_ACCESS_TOKEN_KEY) {
            debug!("using pre-issued OAuth2 access token");
            return Ok(Self::PreIssuedOAuth {
                token: token.to_owned(),
            });
        }

        if let Some(client_secret) = ctx.secret_non_blank(CLIENT_CREDENTIALS_SECRET_KEY) {
            debug!("using OAuth2 client-credentials grant");
            return Ok(Self::ClientCredentials {
                client_secret: client_secret.to_owned(),
            });
        }

        Err(DispatchError::Configuration(
            "no authentication configured".to_owned(),
        ))
    }
}

/// Token endpoint response for the client-credentials exchange.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Render the `Authorization` header value for a resolved scheme.
///
/// Pure for every scheme except client-credentials, which performs one
/// synchronous token-exchange POST against the environment-supplied
/// token endpoint.
///
/// # Errors
///
/// Returns [`DispatchError::Configuration`] when the client-credentials
/// endpoint or client id is missing, and
/// [`DispatchError::AuthExchange`] when the exchange answers non-2xx or
/// omits `access_token`.
pub async fn authorization_header(
    scheme: &CredentialScheme,
    ctx: &ExecutionContext,
    client: &reqwest::Client,
) -> Result<String, DispatchError> {
    match scheme {
        CredentialScheme::Bearer { token } | CredentialScheme::PreIssuedOAuth { token } => {
            Ok(bearer(token))
        }
        CredentialScheme::Basic { username, password } => {
            Ok(format!("Basic {}", BASE64.encode(format!("{username}:{password}"))))
        }
        CredentialScheme::ClientCredentials { client_secret } => {
            exchange_client_credentials(client_secret, ctx, client).await
        }
    }
}

/// Prefix a token with `Bearer `, leaving already-prefixed values
/// untouched.
fn bearer(token: &str) -> String {
    if token.starts_with("Bearer ") {
        token.to_owned()
    } else {
        format!("Bearer {token}")
    }
}

/// Perform the OAuth2 client-credentials token exchange.
async fn exchange_client_credentials(
    client_secret: &str,
    ctx: &ExecutionContext,
    client: &reqwest::Client,
) -> Result<String, DispatchError> {
    let token_url = ctx
        .env_non_blank(CLIENT_CREDENTIALS_TOKEN_URL_KEY)
        .ok_or_else(|| {
            DispatchError::Configuration(format!(
                "missing {CLIENT_CREDENTIALS_TOKEN_URL_KEY} for client-credentials exchange"
            ))
        })?;
    let client_id = ctx
        .env_non_blank(CLIENT_CREDENTIALS_CLIENT_ID_KEY)
        .ok_or_else(|| {
            DispatchError::Configuration(format!(
                "missing {CLIENT_CREDENTIALS_CLIENT_ID_KEY} for client-credentials exchange"
            ))
        })?;

    let mut form: Vec<(&str, String)> = vec![("grant_type", "client_credentials".to_owned())];
    if let Some(scope) = ctx.env_non_blank(CLIENT_CREDENTIALS_SCOPE_KEY) {
        form.push(("scope", scope.to_owned()));
    }
    if let Some(audience) = ctx.env_non_blank(CLIENT_CREDENTIALS_AUDIENCE_KEY) {
        form.push(("audience", audience.to_owned()));
    }

    let use_basic_header = ctx
        .env_non_blank(CLIENT_CREDENTIALS_AUTH_STYLE_KEY)
        .is_some_and(|style| style.eq_ignore_ascii_case(BASIC_HEADER_STYLE));

    let mut builder = client.post(token_url);
    if use_basic_header {
        builder = builder.basic_auth(client_id, Some(client_secret));
    } else {
        form.push(("client_id", client_id.to_owned()));
        form.push(("client_secret", client_secret.to_owned()));
    }

    let response = builder.form(&form).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DispatchError::AuthExchange(format!(
            "token endpoint answered {}",
            status.as_u16()
        )));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| DispatchError::AuthExchange(format!("invalid token response: {e}")))?;

    let token = body
        .access_token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| {
            DispatchError::AuthExchange("token response missing access_token".to_owned())
        })?;

    debug!("client-credentials exchange succeeded");
    Ok(bearer(&token))
}
