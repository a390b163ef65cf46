// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Authentication
//!
//! Verifies short-session JWTs issued by the project's Frontend API.
//!
//! ## Flow
//!
//! 1. Client presents the session token (cookie `cbo_short_session` or
//!    `Authorization: Bearer <token>`)
//! 2. [`SessionAuthenticator`]:
//!    - fetches the project JWKS on first use (header `X-Corbado-ProjectID`)
//!    - verifies structure, signature, `nbf`/`exp`, and issuer, in that order
//!    - maps `sub`, `name`, `email`, `phone_number` → [`User`]
//! 3. Failures come back as [`SessionError`]: either a [`ValidationError`]
//!    with a [`ValidationCode`], or `KeySourceUnreachable`
//!
//! ## Key Management
//!
//! - JWKS is refreshed in the background every `refresh_interval`
//! - Unknown `kid` triggers a rate-limited refresh
//! - Stale key set is kept when a refresh fails

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod session;
pub mod verifier;

pub use claims::{TokenClaims, User};
pub use error::{SessionError, ValidationCode, ValidationError};
pub use extractor::{CurrentUser, Session};
pub use jwks::{KeySet, KeySetCache, SigningKey};
pub use session::{SessionAuthenticator, SessionValidator};
pub use verifier::{IssuerPolicy, TokenVerifier};
