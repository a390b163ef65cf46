// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session endpoints.

use axum::Json;

use crate::auth::{CurrentUser, Session, User};

/// Get the user of a valid session.
///
/// Rejects missing, invalid, or expired session tokens.
#[utoipa::path(
    get,
    path = "/v1/session",
    tag = "Session",
    security(("bearer" = []), ("cookie" = [])),
    responses(
        (status = 200, description = "Authenticated user", body = User),
        (status = 401, description = "Invalid or missing session token", body = crate::auth::error::SessionErrorBody),
        (status = 503, description = "Session keys unavailable", body = crate::auth::error::SessionErrorBody),
    )
)]
pub async fn get_session(Session(user): Session) -> Json<User> {
    Json(user)
}

/// Get the current user, or a guest if there is no valid session.
#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Session",
    responses(
        (status = 200, description = "Authenticated user or guest", body = User),
        (status = 503, description = "Session keys unavailable", body = crate::auth::error::SessionErrorBody),
    )
)]
pub async fn get_current_user(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}
