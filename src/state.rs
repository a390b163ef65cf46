// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::SessionAuthenticator;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionAuthenticator>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionAuthenticator>) -> Self {
        Self { sessions }
    }
}

impl FromRef<AppState> for Arc<SessionAuthenticator> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
