// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for session users.
//!
//! The session token is read from the short-session cookie first, then from
//! an `Authorization: Bearer` header.
//!
//! ```rust,ignore
//! async fn profile(Session(user): Session) -> Json<User> {
//!     Json(user)
//! }
//!
//! async fn landing(CurrentUser(user): CurrentUser) -> impl IntoResponse {
//!     if user.is_guest() { /* redirect to login */ }
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};

use super::{SessionAuthenticator, SessionError, User};

/// Find the session token in request headers.
///
/// Returns `None` if neither the cookie nor a bearer token is present.
pub fn session_token_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string());

    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Extractor for authenticated users. Rejects with [`SessionError`].
pub struct Session(pub User);

impl<S> FromRequestParts<S> for Session
where
    Arc<SessionAuthenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already validated by an earlier extractor on this request
        if let Some(user) = parts.extensions.get::<User>().filter(|u| u.authenticated) {
            return Ok(Session(user.clone()));
        }

        let auth = Arc::<SessionAuthenticator>::from_ref(state);
        let token = session_token_from_headers(&parts.headers, &auth.config().short_session_cookie)
            .unwrap_or_default();

        let user = auth.validate_token(&token).await?;
        parts.extensions.insert(user.clone());

        Ok(Session(user))
    }
}

/// Extractor that yields a guest instead of rejecting invalid sessions.
///
/// Only rejects when the key source is unreachable.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<SessionAuthenticator>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Session::from_request_parts(parts, state).await {
            Ok(Session(user)) => Ok(CurrentUser(user)),
            Err(SessionError::Validation(_)) => Ok(CurrentUser(User::guest())),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::state::AppState;
    use axum::http::{HeaderValue, Request};

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn create_test_state() -> AppState {
        let auth = SessionAuthenticator::new(SessionConfig::new("pro-123")).unwrap();
        AppState::new(Arc::new(auth))
    }

    #[test]
    fn token_from_cookie() {
        let map = headers(&[("cookie", "theme=dark; cbo_short_session=abc.def.ghi; lang=en")]);
        assert_eq!(
            session_token_from_headers(&map, "cbo_short_session").as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn token_from_bearer_header() {
        let map = headers(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(
            session_token_from_headers(&map, "cbo_short_session").as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn cookie_takes_precedence_over_header() {
        let map = headers(&[
            ("authorization", "Bearer from-header"),
            ("cookie", "cbo_short_session=from-cookie"),
        ]);
        assert_eq!(
            session_token_from_headers(&map, "cbo_short_session").as_deref(),
            Some("from-cookie")
        );
    }

    #[test]
    fn empty_cookie_falls_back_to_header() {
        let map = headers(&[
            ("cookie", "cbo_short_session="),
            ("authorization", "Bearer from-header"),
        ]);
        assert_eq!(
            session_token_from_headers(&map, "cbo_short_session").as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn no_token() {
        let map = headers(&[("authorization", "Basic dXNlcjpwdw=="), ("cookie", "other=1")]);
        assert!(session_token_from_headers(&map, "cbo_short_session").is_none());
    }

    #[tokio::test]
    async fn session_extractor_rejects_missing_token() {
        let state = create_test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let result = Session::from_request_parts(&mut parts, &state).await;
        assert!(matches!(
            result,
            Err(SessionError::Validation(ref e)) if e.code == crate::auth::ValidationCode::General
        ));
    }

    #[tokio::test]
    async fn session_extractor_prefers_extensions() {
        let state = create_test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let user = User {
            authenticated: true,
            id: "usr-from-earlier-extractor".to_string(),
            ..User::default()
        };
        parts.extensions.insert(user);

        let result = Session::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap().0.id, "usr-from-earlier-extractor");
    }

    #[tokio::test]
    async fn current_user_returns_guest_without_token() {
        let state = create_test_state();
        let mut parts = Request::builder()
            .uri("/test")
            .body(())
            .unwrap()
            .into_parts()
            .0;

        let CurrentUser(user) = CurrentUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
        assert!(user.is_guest());
    }
}
