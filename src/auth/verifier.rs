// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token verification.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. structure (three base64url segments, JSON header and payload)
//! 2. signature (key resolved by `kid`)
//! 3. `nbf`, then `exp`
//! 4. issuer
//!
//! Temporal and issuer checks are done here rather than by `jsonwebtoken`,
//! so each failure maps to exactly one [`ValidationCode`]. No clock-skew
//! leeway is applied.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Header, Validation};

use super::claims::TokenClaims;
use super::error::{SessionError, ValidationCode};
use super::jwks::{KeySetCache, SigningKey};
use crate::config::SessionConfig;

/// Frontend API host before the `.cloud.` migration.
const LEGACY_FRONTEND_API: &str = "https://{}.frontendapi.corbado.io";

/// Frontend API host after the `.cloud.` migration.
const CLOUD_FRONTEND_API: &str = "https://{}.frontendapi.cloud.corbado.io";

/// Accepted values for the `iss` claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerPolicy {
    primary: String,
    alternates: Vec<String>,
}

impl IssuerPolicy {
    /// Accept exactly `primary`.
    pub fn exact(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            alternates: Vec::new(),
        }
    }

    /// Also accept both Frontend API host forms for `project_id`.
    pub fn with_project_hosts(mut self, project_id: &str) -> Self {
        for template in [LEGACY_FRONTEND_API, CLOUD_FRONTEND_API] {
            let issuer = template.replace("{}", project_id);
            if issuer != self.primary && !self.alternates.contains(&issuer) {
                self.alternates.push(issuer);
            }
        }
        self
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        let policy = Self::exact(&config.jwt_issuer);
        if config.accept_legacy_issuers {
            policy.with_project_hosts(&config.project_id)
        } else {
            policy
        }
    }

    pub fn accepts(&self, issuer: &str) -> bool {
        issuer == self.primary || self.alternates.iter().any(|alt| alt == issuer)
    }

    pub fn check(&self, issuer: &str) -> Result<(), SessionError> {
        if issuer.is_empty() {
            return Err(SessionError::validation(
                "JWT issuer is empty",
                ValidationCode::IssuerEmpty,
            ));
        }

        if !self.accepts(issuer) {
            return Err(SessionError::validation(
                format!(
                    "JWT issuer mismatch (configured: '{}', actual JWT: '{}')",
                    self.primary, issuer
                ),
                ValidationCode::IssuerMismatch,
            ));
        }

        Ok(())
    }
}

/// Verifies session tokens against a [`KeySetCache`].
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    issuers: IssuerPolicy,
}

impl TokenVerifier {
    pub fn new(issuers: IssuerPolicy) -> Self {
        Self { issuers }
    }

    /// Verify `token` against the current wall-clock time.
    pub async fn verify(&self, token: &str, keys: &KeySetCache) -> Result<TokenClaims, SessionError> {
        self.verify_at(token, keys, Utc::now().timestamp()).await
    }

    /// Verify `token` as of `now` (Unix seconds).
    ///
    /// `KeySourceUnreachable` is returned only when the cache holds no key set.
    pub async fn verify_at(
        &self,
        token: &str,
        keys: &KeySetCache,
        now: i64,
    ) -> Result<TokenClaims, SessionError> {
        if token.is_empty() {
            return Err(SessionError::validation(
                "Session token is empty",
                ValidationCode::General,
            ));
        }

        let header = parse_structure(token)?;

        // Unknown and missing key ids look the same to the caller.
        let key = match header.kid.as_deref() {
            Some(kid) => keys.resolve(kid).await?,
            None => None,
        };
        let Some(key) = key else {
            return Err(SessionError::validation(
                "Token signature is invalid",
                ValidationCode::InvalidSignature,
            ));
        };

        let mut claims = verify_signature(token, &header, &key)?;
        claims.kid = key.kid.clone();

        check_time(&claims, now)?;
        self.issuers.check(&claims.iss)?;

        Ok(claims)
    }
}

/// Structural check: `header.payload.signature`, each base64url, header and
/// payload JSON.
fn parse_structure(token: &str) -> Result<Header, SessionError> {
    let malformed = |detail: String| {
        SessionError::validation(format!("Token is malformed: {detail}"), ValidationCode::InvalidData)
    };

    let segments: Vec<&str> = token.split('.').collect();
    let [_, payload, signature] = segments.as_slice() else {
        return Err(malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    let header = decode_header(token).map_err(|e| malformed(format!("header: {e}")))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| malformed(format!("payload: {e}")))?;
    serde_json::from_slice::<serde_json::Map<String, serde_json::Value>>(&payload)
        .map_err(|e| malformed(format!("payload: {e}")))?;

    URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|e| malformed(format!("signature: {e}")))?;

    Ok(header)
}

/// Verify the signature and decode the claims. Nothing else is validated here.
fn verify_signature(token: &str, header: &Header, key: &SigningKey) -> Result<TokenClaims, SessionError> {
    let invalid_signature = || {
        SessionError::validation("Token signature is invalid", ValidationCode::InvalidSignature)
    };

    if header.alg != key.algorithm {
        return Err(invalid_signature());
    }

    let mut validation = Validation::new(key.algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TokenClaims>(token, &key.key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::Json(_) | ErrorKind::Base64(_) | ErrorKind::InvalidToken => {
                SessionError::validation(
                    format!("Token claims are invalid: {e}"),
                    ValidationCode::InvalidData,
                )
            }
            _ => invalid_signature(),
        })
}

fn check_time(claims: &TokenClaims, now: i64) -> Result<(), SessionError> {
    if let Some(nbf) = claims.nbf {
        if now < nbf {
            return Err(SessionError::validation(
                format!("Token is not valid yet (nbf: {nbf}, now: {now})"),
                ValidationCode::NotYetValid,
            ));
        }
    }

    if now >= claims.exp {
        return Err(SessionError::validation(
            format!("Token has expired (exp: {}, now: {now})", claims.exp),
            ValidationCode::Expired,
        ));
    }

    Ok(())
}
