// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Configuration
//!
//! Settings for a [`SessionAuthenticator`](crate::auth::SessionAuthenticator).
//! A config is validated once, when the authenticator is built; an invalid
//! config never reaches the per-request path.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CORBADO_PROJECT_ID` | Project identifier (`pro-...`) | Required |
//! | `CORBADO_FRONTEND_API` | Frontend API base URL | `https://<project>.frontendapi.corbado.io` |
//! | `CORBADO_JWT_ISSUER` | Expected `iss` claim | Frontend API URL |
//! | `CORBADO_JWKS_URI` | JWKS endpoint | `<frontend api>/.well-known/jwks` |
//! | `CORBADO_JWKS_REFRESH_INTERVAL_SECS` | Scheduled refresh period | `3600` |
//! | `CORBADO_JWKS_REFRESH_RATE_LIMIT_SECS` | Minimum gap between fetches | `300` |
//! | `CORBADO_JWKS_REFRESH_TIMEOUT_SECS` | Per-fetch timeout | `10` |
//! | `CORBADO_SHORT_SESSION_COOKIE` | Cookie carrying the session token | `cbo_short_session` |
//! | `HOST` | Demo server bind address | `0.0.0.0` |
//! | `PORT` | Demo server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::time::Duration;

use url::Url;

/// Environment variable name for the project identifier.
pub const PROJECT_ID_ENV: &str = "CORBADO_PROJECT_ID";
/// Environment variable name for the Frontend API base URL.
pub const FRONTEND_API_ENV: &str = "CORBADO_FRONTEND_API";
/// Environment variable name for the expected token issuer.
pub const JWT_ISSUER_ENV: &str = "CORBADO_JWT_ISSUER";
/// Environment variable name for the JWKS endpoint.
pub const JWKS_URI_ENV: &str = "CORBADO_JWKS_URI";
pub const JWKS_REFRESH_INTERVAL_ENV: &str = "CORBADO_JWKS_REFRESH_INTERVAL_SECS";
pub const JWKS_REFRESH_RATE_LIMIT_ENV: &str = "CORBADO_JWKS_REFRESH_RATE_LIMIT_SECS";
pub const JWKS_REFRESH_TIMEOUT_ENV: &str = "CORBADO_JWKS_REFRESH_TIMEOUT_SECS";
pub const SHORT_SESSION_COOKIE_ENV: &str = "CORBADO_SHORT_SESSION_COOKIE";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Frontend API host template; `{}` is replaced with the project id.
const DEFAULT_FRONTEND_API: &str = "https://{}.frontendapi.corbado.io";

/// Default scheduled JWKS refresh period (1 hour).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

/// Default minimum gap between two JWKS fetches (5 minutes).
pub const DEFAULT_REFRESH_RATE_LIMIT: Duration = Duration::from_secs(300);

/// Default JWKS fetch timeout (10 seconds).
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cookie name carrying the short session.
pub const DEFAULT_SHORT_SESSION_COOKIE: &str = "cbo_short_session";

/// Configuration errors. Always fatal at construction time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid project id '{0}': must start with 'pro-'")]
    InvalidProjectId(String),

    #[error("Invalid {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid {0}: duration must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("Invalid short session cookie name: must not be empty")]
    EmptyCookieName,

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Per-authenticator session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Project identifier, sent as `X-Corbado-ProjectID` on JWKS fetches.
    pub project_id: String,
    /// Primary accepted `iss` value.
    pub jwt_issuer: String,
    /// JWKS endpoint.
    pub jwks_uri: String,
    /// Scheduled refresh period.
    pub refresh_interval: Duration,
    /// Minimum gap between two fetches, scheduled or on-demand.
    pub refresh_rate_limit: Duration,
    /// Upper bound on a single fetch.
    pub refresh_timeout: Duration,
    /// Refresh (rate-limited) when a token names an unknown `kid`.
    pub refresh_unknown_kid: bool,
    /// Also accept the current and pre-migration Frontend API hosts as issuer.
    pub accept_legacy_issuers: bool,
    /// Cookie carrying the short session on incoming HTTP requests.
    pub short_session_cookie: String,
}

impl SessionConfig {
    /// Create a config with the default Frontend API for `project_id`.
    ///
    /// Issuer and JWKS URI are derived from the Frontend API URL; timers use
    /// the defaults above.
    pub fn new(project_id: impl Into<String>) -> Self {
        let project_id = project_id.into();
        let frontend_api = DEFAULT_FRONTEND_API.replace("{}", &project_id);
        Self::with_frontend_api(project_id, frontend_api)
    }

    /// Create a config for a custom Frontend API (e.g. a CNAME).
    pub fn with_frontend_api(project_id: impl Into<String>, frontend_api: impl Into<String>) -> Self {
        let frontend_api = frontend_api.into();
        let frontend_api = frontend_api.trim_end_matches('/').to_string();

        Self {
            project_id: project_id.into(),
            jwks_uri: format!("{frontend_api}/.well-known/jwks"),
            jwt_issuer: frontend_api,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            refresh_rate_limit: DEFAULT_REFRESH_RATE_LIMIT,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            refresh_unknown_kid: true,
            accept_legacy_issuers: true,
            short_session_cookie: DEFAULT_SHORT_SESSION_COOKIE.to_string(),
        }
    }

    /// Load the config from `CORBADO_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_id = env::var(PROJECT_ID_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingEnv(PROJECT_ID_ENV))?;

        let mut config = match env_non_empty(FRONTEND_API_ENV) {
            Some(frontend_api) => Self::with_frontend_api(project_id, frontend_api),
            None => Self::new(project_id),
        };

        if let Some(issuer) = env_non_empty(JWT_ISSUER_ENV) {
            config.jwt_issuer = issuer;
        }
        if let Some(jwks_uri) = env_non_empty(JWKS_URI_ENV) {
            config.jwks_uri = jwks_uri;
        }
        if let Some(secs) = env_secs(JWKS_REFRESH_INTERVAL_ENV)? {
            config.refresh_interval = secs;
        }
        if let Some(secs) = env_secs(JWKS_REFRESH_RATE_LIMIT_ENV)? {
            config.refresh_rate_limit = secs;
        }
        if let Some(secs) = env_secs(JWKS_REFRESH_TIMEOUT_ENV)? {
            config.refresh_timeout = secs;
        }
        if let Some(cookie) = env_non_empty(SHORT_SESSION_COOKIE_ENV) {
            config.short_session_cookie = cookie;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_jwt_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.jwt_issuer = issuer.into();
        self
    }

    pub fn with_jwks_uri(mut self, uri: impl Into<String>) -> Self {
        self.jwks_uri = uri.into();
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_refresh_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.refresh_rate_limit = rate_limit;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn with_refresh_unknown_kid(mut self, enabled: bool) -> Self {
        self.refresh_unknown_kid = enabled;
        self
    }

    pub fn with_legacy_issuers(mut self, enabled: bool) -> Self {
        self.accept_legacy_issuers = enabled;
        self
    }

    pub fn with_short_session_cookie(mut self, name: impl Into<String>) -> Self {
        self.short_session_cookie = name.into();
        self
    }

    /// Check every field. Called by the authenticator constructor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_id.len() < 5 || !self.project_id.starts_with("pro-") {
            return Err(ConfigError::InvalidProjectId(self.project_id.clone()));
        }

        validate_endpoint("jwt_issuer", &self.jwt_issuer)?;
        validate_endpoint("jwks_uri", &self.jwks_uri)?;

        if self.refresh_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("refresh_interval"));
        }
        if self.refresh_rate_limit.is_zero() {
            return Err(ConfigError::ZeroDuration("refresh_rate_limit"));
        }
        if self.refresh_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("refresh_timeout"));
        }
        if self.short_session_cookie.is_empty() {
            return Err(ConfigError::EmptyCookieName);
        }

        Ok(())
    }
}

/// An endpoint must be an absolute http(s) URL with a host and no credentials.
fn validate_endpoint(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(value).map_err(|e| invalid(&e.to_string()))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(invalid("scheme must be 'http' or 'https'"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("host must not be empty"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("credentials are not allowed"));
    }

    Ok(())
}

fn env_non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_secs(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match env_non_empty(name) {
        Some(value) => value
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
        None => Ok(None),
    }
}
