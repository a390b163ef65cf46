// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session authenticator: the public entry point for token validation.

use std::future::Future;

use tracing::{debug, info};

use super::claims::User;
use super::error::{SessionError, ValidationCode};
use super::jwks::KeySetCache;
use super::verifier::{IssuerPolicy, TokenVerifier};
use crate::config::{ConfigError, SessionConfig};

/// Anything that can turn a session token into a [`User`].
pub trait SessionValidator: Send + Sync {
    /// Validate `token` and return the authenticated user.
    fn validate_token(&self, token: &str) -> impl Future<Output = Result<User, SessionError>> + Send;
}

/// Validates short-session tokens for one project.
///
/// Safe to share across request handlers (`Arc<SessionAuthenticator>`). The
/// first validation pays for the initial JWKS fetch.
pub struct SessionAuthenticator {
    config: SessionConfig,
    keys: KeySetCache,
    verifier: TokenVerifier,
}

impl SessionAuthenticator {
    /// Build an authenticator. An invalid config is rejected here, never
    /// on a validation call.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any config field is invalid.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let keys = KeySetCache::new(&config)?;
        let verifier = TokenVerifier::new(IssuerPolicy::from_config(&config));

        info!(
            project_id = %config.project_id,
            issuer = %config.jwt_issuer,
            jwks_uri = %config.jwks_uri,
            "Session authenticator configured"
        );

        Ok(Self {
            config,
            keys,
            verifier,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn keys(&self) -> &KeySetCache {
        &self.keys
    }

    /// Validate a session token.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Validation`] if the token is rejected
    /// - [`SessionError::KeySourceUnreachable`] if no key set could be fetched
    pub async fn validate_token(&self, token: &str) -> Result<User, SessionError> {
        if token.is_empty() {
            return Err(SessionError::validation(
                "Session token is empty",
                ValidationCode::General,
            ));
        }

        self.keys.ensure_initialized().await?;

        match self.verifier.verify(token, &self.keys).await {
            Ok(claims) => {
                debug!(user_id = %claims.sub, kid = %claims.kid, "Session token accepted");
                Ok(User::from(claims))
            }
            Err(e) => {
                debug!(error_code = e.error_code(), error = %e, "Session token rejected");
                Err(e)
            }
        }
    }

    /// Like [`validate_token`](Self::validate_token), but an empty or invalid
    /// token yields [`User::guest`].
    ///
    /// # Errors
    ///
    /// Still returns [`SessionError::KeySourceUnreachable`]: "cannot check" is
    /// not the same as "not logged in".
    pub async fn current_user(&self, token: &str) -> Result<User, SessionError> {
        match self.validate_token(token).await {
            Ok(user) => Ok(user),
            Err(SessionError::Validation(_)) => Ok(User::guest()),
            Err(e) => Err(e),
        }
    }

    /// Stop the background JWKS refresher.
    pub fn shutdown(&self) {
        self.keys.shutdown();
    }
}

impl SessionValidator for SessionAuthenticator {
    async fn validate_token(&self, token: &str) -> Result<User, SessionError> {
        SessionAuthenticator::validate_token(self, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_config_at_construction() {
        let result = SessionAuthenticator::new(SessionConfig::new("project-1"));
        assert!(matches!(result, Err(ConfigError::InvalidProjectId(_))));
    }

    #[tokio::test]
    async fn empty_token_is_general_error_without_fetch() {
        let auth = SessionAuthenticator::new(SessionConfig::new("pro-123")).unwrap();
        let err = auth.validate_token("").await.unwrap_err();
        assert_eq!(err.validation_code(), Some(ValidationCode::General));
        assert!(!auth.keys().is_ready().await);
    }

    #[tokio::test]
    async fn empty_token_is_guest_for_current_user() {
        let auth = SessionAuthenticator::new(SessionConfig::new("pro-123")).unwrap();
        let user = auth.current_user("").await.unwrap();
        assert!(user.is_guest());
    }
}
