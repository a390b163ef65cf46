// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Corbado Session - short-session token verification
//!
//! Verifies session JWTs against the project's JWKS and returns typed user
//! identities or classified validation errors.
//!
//! ## Modules
//!
//! - `auth` - JWKS cache, token verifier, session authenticator, extractors
//! - `config` - Session configuration and environment loading
//! - `api` - HTTP API handlers (Axum) for the demo server
//! - `telemetry` - Logging setup

pub mod api;
pub mod auth;
pub mod config;
pub mod state;
pub mod telemetry;

pub use auth::{
    SessionAuthenticator, SessionError, SessionValidator, User, ValidationCode, ValidationError,
};
pub use config::{ConfigError, SessionConfig};
