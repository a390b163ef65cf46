// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session validation errors.
//!
//! [`ValidationError`] is a statement about the presented token.
//! [`SessionError::KeySourceUnreachable`] is a statement about the
//! infrastructure: no key material was available to check anything.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Closed set of reasons a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    /// Empty input or an otherwise unclassified failure
    General,
    /// `iss` does not match any accepted issuer
    IssuerMismatch,
    /// `iss` is missing or empty
    IssuerEmpty,
    /// Token structure or claims could not be decoded
    InvalidData,
    /// Signature does not verify under any known key
    InvalidSignature,
    /// `nbf` is in the future
    NotYetValid,
    /// `exp` is not in the future
    Expired,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::General => "general",
            ValidationCode::IssuerMismatch => "issuer_mismatch",
            ValidationCode::IssuerEmpty => "issuer_empty",
            ValidationCode::InvalidData => "invalid_data",
            ValidationCode::InvalidSignature => "invalid_signature",
            ValidationCode::NotYetValid => "not_yet_valid",
            ValidationCode::Expired => "expired",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected token: human-readable message plus a branchable code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (code: {code})")]
pub struct ValidationError {
    pub message: String,
    pub code: ValidationCode,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, code: ValidationCode) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }
}

/// Error returned across the authenticator boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// The token itself is invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No key set could be obtained from the key source.
    #[error("JWKS key source unreachable: {0}")]
    KeySourceUnreachable(String),
}

#[derive(Serialize, ToSchema)]
pub struct SessionErrorBody {
    pub error: String,
    pub error_code: String,
}

impl SessionError {
    pub(crate) fn validation(message: impl Into<String>, code: ValidationCode) -> Self {
        SessionError::Validation(ValidationError::new(message, code))
    }

    /// The validation code, if this is a token rejection.
    pub fn validation_code(&self) -> Option<ValidationCode> {
        match self {
            SessionError::Validation(e) => Some(e.code),
            SessionError::KeySourceUnreachable(_) => None,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::Validation(e) => e.code.as_str(),
            SessionError::KeySourceUnreachable(_) => "key_source_unreachable",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::Validation(_) => StatusCode::UNAUTHORIZED,
            SessionError::KeySourceUnreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(SessionErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
