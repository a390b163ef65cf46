// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, sync::Arc};

use corbado_session::{
    api::router,
    auth::SessionAuthenticator,
    config::SessionConfig,
    state::AppState,
    telemetry::{init_tracing, LogFormat},
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    init_tracing(LogFormat::from_env());

    let config = match SessionConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid session configuration");
            std::process::exit(1);
        }
    };

    let sessions = match SessionAuthenticator::new(config) {
        Ok(sessions) => Arc::new(sessions),
        Err(e) => {
            error!(error = %e, "Failed to create session authenticator");
            std::process::exit(1);
        }
    };

    // Warm the key cache so the first request does not pay for the fetch.
    if let Err(e) = sessions.keys().ensure_initialized().await {
        warn!(error = %e, "Initial JWKS fetch failed, will retry in background");
    }

    let app = router(AppState::new(sessions.clone()));

    // Parse bind address
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let addr: SocketAddr = match format!("{host}:{port}").parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(error = %e, host = %host, port, "Failed to parse bind address");
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, %addr, "Failed to bind");
            std::process::exit(1);
        }
    };

    info!(%addr, "Session server listening (docs at /docs)");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server failed");
    }

    sessions.shutdown();
    info!("Session server stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
