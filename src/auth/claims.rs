// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and the user identity derived from them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by a short-session token.
///
/// `sub` and `exp` are required; a token without them fails to decode.
/// The remaining fields default when absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Issuer (the project's Frontend API URL)
    #[serde(default)]
    pub iss: String,

    /// Expiration timestamp
    pub exp: i64,

    /// Not before timestamp
    #[serde(default)]
    pub nbf: Option<i64>,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: Option<i64>,

    /// Full name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub phone_number: String,

    /// Login identifier the session was created with
    #[serde(default)]
    pub orig: String,

    /// Token format version
    #[serde(default)]
    pub version: i64,

    /// Key ID from the token header; filled in by the verifier.
    #[serde(skip)]
    pub kid: String,
}

/// Identity of the caller, as established by a session token.
///
/// A guest has `authenticated == false` and empty fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub authenticated: bool,

    /// Canonical user ID (`sub` claim)
    pub id: String,

    pub full_name: String,

    pub email: String,

    pub phone_number: String,
}

impl User {
    /// Unauthenticated "guest" user.
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn is_guest(&self) -> bool {
        !self.authenticated
    }
}

impl From<TokenClaims> for User {
    fn from(claims: TokenClaims) -> Self {
        Self {
            authenticated: true,
            id: claims.sub,
            full_name: claims.name,
            email: claims.email,
            phone_number: claims.phone_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> TokenClaims {
        serde_json::from_value(serde_json::json!({
            "sub": "usr-1234567890",
            "iss": "https://auth.acme.com",
            "iat": 1700000000,
            "exp": 1700003600,
            "nbf": 1700000000,
            "name": "Jane Doe",
            "email": "jane@acme.com",
            "phone_number": "+4915090000000",
            "orig": "jane@acme.com",
            "version": 2
        }))
        .unwrap()
    }

    #[test]
    fn user_from_claims_maps_identity_fields() {
        let user = User::from(sample_claims());
        assert!(user.authenticated);
        assert_eq!(user.id, "usr-1234567890");
        assert_eq!(user.full_name, "Jane Doe");
        assert_eq!(user.email, "jane@acme.com");
        assert_eq!(user.phone_number, "+4915090000000");
    }

    #[test]
    fn optional_claims_default() {
        let claims: TokenClaims =
            serde_json::from_value(serde_json::json!({ "sub": "usr-1", "exp": 1 })).unwrap();
        assert_eq!(claims.iss, "");
        assert_eq!(claims.nbf, None);
        assert_eq!(claims.name, "");
        assert_eq!(claims.version, 0);
    }

    #[test]
    fn missing_exp_fails_to_decode() {
        let result: Result<TokenClaims, _> =
            serde_json::from_value(serde_json::json!({ "sub": "usr-1" }));
        assert!(result.is_err());
    }

    #[test]
    fn guest_is_unauthenticated() {
        let guest = User::guest();
        assert!(guest.is_guest());
        assert!(guest.id.is_empty());
    }
}
