// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared helpers for integration tests: fixture keys, token minting and a
//! mock JWKS endpoint.

#![allow(dead_code)]

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use corbado_session::{auth::jwks::PROJECT_ID_HEADER, SessionAuthenticator, SessionConfig};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const PROJECT_ID: &str = "pro-4711";
pub const ISSUER: &str = "https://auth.acme.test";
pub const JWKS_PATH: &str = "/.well-known/jwks";

pub const KID_A: &str = "kid-a";
pub const KID_B: &str = "kid-b";

const KEY_A_PEM: &[u8] = include_bytes!("../fixtures/signing_key_a.pem");
const KEY_B_PEM: &[u8] = include_bytes!("../fixtures/signing_key_b.pem");

/// Modulus of `signing_key_a.pem`, base64url.
const KEY_A_N: &str = "tcycs02CpfOyanrjBNNktzApa3m0MSUMhTT3jWPvDenx6sTbDZopZXfJr1cNI5mqf8DTw35shtHVCTg3Upncz1mn6BtKrh3irrqU84NKiJM8n-xFCBTqmfIMeUqZuJ5NjRB83JZI211D80z2Nf-S1ZQCSd-5qqKhh7oShsS3rJXLu0eIZrlhoRjxQO6RiIlG0VNwJZ1oD7EuUhrZReFxQ_eoTebPVj_rHmVKfFfajZMZqlCJdjlGuHidHyKN7Z-C38rw2AhGmSZomjs2wqUNR8hWEdjmSaktAQXTrqsNUhhddG93Z67nrOEKucfelQQlBsWdCivuMuc0dto2UL4dKw";

/// Modulus of `signing_key_b.pem`, base64url.
const KEY_B_N: &str = "zpwlwL81hCGmxtIyfN9ns4hL25G9WV1IjKWzDXieGOrI6o0_jW67ow7EDbWsR0mPguhAQLAdB9H9FnZea9M_P0SU2-FVqjQWBPKHF9Zhzfg8U9rV2ALYVsvCuf24qmrIn48WjxByMGEcojS83_MkhG2ljC9iSOhUvTEx92pZM0-yoy_s9ti6yV5ARmBAlotxeMC-0lQ3ug-yyc1zHV_XwaFG8YsyUQNbbPPUVRq6YWYgqHMWh2BwQxyMgdZHatYi3B499UJgLwNWyxpTYtAWC5893oh_bjg4yB4jmpCrJ11H-pNS0RnacI4inDYYZXlifUh7cizXO5NxZllZrQgUJQ";

/// One of the two fixture key pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKey {
    A,
    B,
}

impl TestKey {
    fn pem(self) -> &'static [u8] {
        match self {
            TestKey::A => KEY_A_PEM,
            TestKey::B => KEY_B_PEM,
        }
    }

    fn modulus(self) -> &'static str {
        match self {
            TestKey::A => KEY_A_N,
            TestKey::B => KEY_B_N,
        }
    }

    /// Public JWK for this key under `kid`.
    pub fn jwk(self, kid: &str) -> Value {
        json!({
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": kid,
            "n": self.modulus(),
            "e": "AQAB",
        })
    }
}

/// JWKS document with the given keys.
pub fn jwks(keys: &[(TestKey, &str)]) -> Value {
    json!({
        "keys": keys.iter().map(|(key, kid)| key.jwk(kid)).collect::<Vec<_>>(),
    })
}

/// Get current Unix timestamp
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs() as i64
}

/// Claims of a valid session for `sub`, issued by [`ISSUER`].
pub fn session_claims(sub: &str) -> Value {
    let now = now();
    json!({
        "iss": ISSUER,
        "sub": sub,
        "iat": now,
        "nbf": now - 5,
        "exp": now + 300,
        "name": "Ada Lovelace",
        "email": "ada@acme.test",
        "phone_number": "+4915100000000",
        "orig": "ada@acme.test",
        "version": 2,
    })
}

/// Sign `claims` with `key` (RS256) and put `kid` in the header.
pub fn mint(key: TestKey, kid: &str, claims: &Value) -> String {
    let encoding_key = EncodingKey::from_rsa_pem(key.pem()).expect("Invalid RSA key");

    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.kid = Some(kid.to_string());

    encode(&header, claims, &encoding_key).expect("Failed to encode test JWT")
}

/// A valid session token for `sub`, signed with key A.
pub fn valid_token(sub: &str) -> String {
    mint(TestKey::A, KID_A, &session_claims(sub))
}

/// Mock JWKS endpoint.
pub struct KeySource {
    pub server: MockServer,
}

impl KeySource {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn jwks_uri(&self) -> String {
        format!("{}{JWKS_PATH}", self.server.uri())
    }

    /// Mock matching JWKS requests that carry the project header.
    pub fn jwks_mock(&self, response: ResponseTemplate) -> Mock {
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .and(header(PROJECT_ID_HEADER, PROJECT_ID))
            .respond_with(response)
    }

    /// Serve `document` on every request.
    pub async fn serve(&self, document: Value) {
        self.jwks_mock(ResponseTemplate::new(200).set_body_json(document))
            .mount(&self.server)
            .await;
    }

    /// Number of JWKS requests received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| {
                requests
                    .iter()
                    .filter(|request| request.url.path() == JWKS_PATH)
                    .count()
            })
    }

    /// Config pointing at this mock. The rate limit is short so tests can
    /// trigger refreshes without waiting minutes.
    pub fn config(&self) -> SessionConfig {
        SessionConfig::with_frontend_api(PROJECT_ID, ISSUER)
            .with_jwks_uri(self.jwks_uri())
            .with_refresh_rate_limit(Duration::from_millis(1))
            .with_refresh_timeout(Duration::from_secs(2))
    }

    pub fn authenticator(&self) -> SessionAuthenticator {
        self.authenticator_with(self.config())
    }

    pub fn authenticator_with(&self, config: SessionConfig) -> SessionAuthenticator {
        SessionAuthenticator::new(config).expect("Invalid test config")
    }
}
