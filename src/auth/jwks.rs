// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Behavior
//!
//! - The first validation fetches the key set synchronously; later calls reuse it
//! - A background task refreshes the key set every `refresh_interval`
//! - An unknown `kid` triggers an on-demand refresh
//! - All fetches go through one rate-limited, single-flight gate
//! - Stale key set is kept on fetch failure (fail-open for availability)
//!
//! Readers never see a half-built key set: a refresh builds a new [`KeySet`]
//! and swaps the `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::SessionError;
use crate::config::{ConfigError, SessionConfig};

/// Header scoping the JWKS response to one project.
pub const PROJECT_ID_HEADER: &str = "X-Corbado-ProjectID";

/// A public verification key from the key set.
#[derive(Clone)]
pub struct SigningKey {
    pub kid: String,
    pub algorithm: Algorithm,
    pub key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// One fetched key set. Never mutated after construction.
#[derive(Debug)]
pub struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    fetched_at: Instant,
    source: String,
}

impl KeySet {
    /// Parse a JWKS document.
    ///
    /// Keys without a `kid` or with unusable parameters are skipped. A
    /// document without any usable key is an error. If a `kid` appears twice,
    /// the later entry wins.
    pub fn from_document(source: &str, body: &[u8]) -> Result<Self, String> {
        #[derive(Deserialize)]
        struct JwksDocument {
            keys: Vec<serde_json::Value>,
        }

        let document: JwksDocument =
            serde_json::from_slice(body).map_err(|e| format!("malformed JWKS document: {e}"))?;

        let mut keys = HashMap::with_capacity(document.keys.len());
        for raw in document.keys {
            let jwk: Jwk = match serde_json::from_value(raw) {
                Ok(jwk) => jwk,
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable JWK");
                    continue;
                }
            };

            match signing_key_from_jwk(&jwk) {
                Ok(key) => {
                    keys.insert(key.kid.clone(), Arc::new(key));
                }
                Err(e) => {
                    warn!(kid = ?jwk.common.key_id, error = %e, "Skipping unusable JWK");
                }
            }
        }

        if keys.is_empty() {
            return Err("JWKS document contains no usable keys".to_string());
        }

        Ok(Self {
            keys,
            fetched_at: Instant::now(),
            source: source.to_string(),
        })
    }

    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Rate-limit and outcome of the most recent fetch attempt.
#[derive(Default)]
struct RefreshState {
    last_attempt: Option<Instant>,
    last_error: Option<String>,
}

/// State shared with the background refresher.
struct Shared {
    jwks_uri: String,
    project_id: String,
    client: reqwest::Client,
    refresh_timeout: Duration,
    refresh_rate_limit: Duration,
    refresh_interval: Duration,
    refresh_unknown_kid: bool,
    current: RwLock<Option<Arc<KeySet>>>,
    /// Held for the whole duration of a fetch, which makes refreshes single-flight.
    refresh: Mutex<RefreshState>,
    /// Bumped after every completed fetch attempt, successful or not.
    fetch_generation: AtomicU64,
    /// Refreshes requested because a token named an unknown `kid`.
    unknown_kid_refreshes: AtomicU64,
}

impl Shared {
    async fn current(&self) -> Option<Arc<KeySet>> {
        self.current.read().await.clone()
    }

    /// Rate-limited, single-flight refresh.
    ///
    /// Returns the key set now in use, which is the previous one if the fetch
    /// failed. Errors only when no key set has ever been fetched.
    async fn refresh(&self) -> Result<Arc<KeySet>, SessionError> {
        let seen = self.fetch_generation.load(Ordering::Acquire);
        let mut state = self.refresh.lock().await;

        // A fetch finished while we waited for the lock: reuse its result.
        if self.fetch_generation.load(Ordering::Acquire) != seen {
            debug!(jwks_uri = %self.jwks_uri, "Reusing result of concurrent JWKS fetch");
            return self.current_or_unreachable(&state).await;
        }

        if let Some(last) = state.last_attempt {
            if last.elapsed() < self.refresh_rate_limit {
                debug!(
                    jwks_uri = %self.jwks_uri,
                    since_last_ms = last.elapsed().as_millis() as u64,
                    "JWKS refresh rate limited, reusing last result"
                );
                return self.current_or_unreachable(&state).await;
            }
        }

        state.last_attempt = Some(Instant::now());
        let fetched = self.fetch().await;
        self.fetch_generation.fetch_add(1, Ordering::Release);

        match fetched {
            Ok(key_set) => {
                info!(
                    jwks_uri = %self.jwks_uri,
                    keys = key_set.len(),
                    "JWKS refreshed"
                );
                let key_set = Arc::new(key_set);
                *self.current.write().await = Some(key_set.clone());
                state.last_error = None;
                Ok(key_set)
            }
            Err(e) => {
                warn!(
                    jwks_uri = %self.jwks_uri,
                    error = %e,
                    "JWKS refresh failed, keeping previous key set"
                );
                state.last_error = Some(e);
                self.current_or_unreachable(&state).await
            }
        }
    }

    async fn current_or_unreachable(&self, state: &RefreshState) -> Result<Arc<KeySet>, SessionError> {
        self.current().await.ok_or_else(|| {
            SessionError::KeySourceUnreachable(
                state
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "no key set fetched yet".to_string()),
            )
        })
    }

    /// Fetch and parse the key set, bounded by `refresh_timeout`.
    async fn fetch(&self) -> Result<KeySet, String> {
        debug!(jwks_uri = %self.jwks_uri, "Fetching JWKS");

        let request = async {
            let response = self
                .client
                .get(&self.jwks_uri)
                .header(PROJECT_ID_HEADER, &self.project_id)
                .send()
                .await
                .map_err(|e| e.to_string())?;

            if !response.status().is_success() {
                return Err(format!("HTTP {} from JWKS endpoint", response.status()));
            }

            response.bytes().await.map_err(|e| e.to_string())
        };

        let body = tokio::time::timeout(self.refresh_timeout, request)
            .await
            .map_err(|_| {
                format!(
                    "JWKS fetch timed out after {}ms",
                    self.refresh_timeout.as_millis()
                )
            })??;

        KeySet::from_document(&self.jwks_uri, &body)
    }
}

/// Eventually-fresh cache of the project's verification keys.
///
/// Owns the background refresher; it is stopped by [`KeySetCache::shutdown`]
/// or when the cache is dropped.
pub struct KeySetCache {
    shared: Arc<Shared>,
    init: OnceCell<()>,
    shutdown: CancellationToken,
}

impl KeySetCache {
    /// Create an empty cache. Nothing is fetched until first use.
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.refresh_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            shared: Arc::new(Shared {
                jwks_uri: config.jwks_uri.clone(),
                project_id: config.project_id.clone(),
                client,
                refresh_timeout: config.refresh_timeout,
                refresh_rate_limit: config.refresh_rate_limit,
                refresh_interval: config.refresh_interval,
                refresh_unknown_kid: config.refresh_unknown_kid,
                current: RwLock::new(None),
                refresh: Mutex::new(RefreshState::default()),
                fetch_generation: AtomicU64::new(0),
                unknown_kid_refreshes: AtomicU64::new(0),
            }),
            init: OnceCell::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Get the JWKS URL.
    pub fn jwks_uri(&self) -> &str {
        &self.shared.jwks_uri
    }

    /// Fetch the first key set and start the background refresher.
    ///
    /// Only the first call fetches, concurrent first calls included. If no
    /// key set is available afterwards, a rate-limited refresh is attempted
    /// and `KeySourceUnreachable` is returned if that yields nothing either.
    pub async fn ensure_initialized(&self) -> Result<(), SessionError> {
        self.init
            .get_or_init(|| async {
                info!(jwks_uri = %self.shared.jwks_uri, "Fetching initial JWKS");
                // A failure is recorded in the refresh state and reported below.
                let _ = self.shared.refresh().await;
                self.spawn_refresher();
            })
            .await;

        if self.shared.current().await.is_some() {
            return Ok(());
        }

        self.shared.refresh().await.map(|_| ())
    }

    /// Look up a key by id.
    ///
    /// On a miss, and if enabled, refreshes the key set (rate-limited) and
    /// checks once more. Errors only if no key set is available at all.
    pub async fn resolve(&self, kid: &str) -> Result<Option<Arc<SigningKey>>, SessionError> {
        let key_set = match self.shared.current().await {
            Some(key_set) => key_set,
            None => self.shared.refresh().await?,
        };

        if let Some(key) = key_set.get(kid) {
            return Ok(Some(key));
        }

        if !self.shared.refresh_unknown_kid {
            return Ok(None);
        }

        self.shared.unknown_kid_refreshes.fetch_add(1, Ordering::Relaxed);
        debug!(kid, "Unknown key id, refreshing JWKS");
        let refreshed = self.shared.refresh().await?;
        Ok(refreshed.get(kid))
    }

    /// Force a refresh, subject to the rate limit.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, SessionError> {
        self.shared.refresh().await
    }

    /// The key set currently in use, if any.
    pub async fn current(&self) -> Option<Arc<KeySet>> {
        self.shared.current().await
    }

    /// Check if a key set is available.
    pub async fn is_ready(&self) -> bool {
        self.shared.current().await.is_some()
    }

    /// Number of refreshes triggered by unknown key ids, rate-limited or not.
    pub fn unknown_kid_refreshes(&self) -> u64 {
        self.shared.unknown_kid_refreshes.load(Ordering::Relaxed)
    }

    /// Stop the background refresher. Cached keys stay usable.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn spawn_refresher(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tokio::spawn(run_refresher(self.shared.clone(), self.shutdown.clone()));
    }
}

impl Drop for KeySetCache {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Refresh loop. Runs until the cancellation token is triggered.
async fn run_refresher(shared: Arc<Shared>, shutdown: CancellationToken) {
    info!(
        jwks_uri = %shared.jwks_uri,
        interval_secs = shared.refresh_interval.as_secs(),
        "JWKS refresher starting"
    );

    loop {
        tokio::select! {
            _ = tokio::time::sleep(shared.refresh_interval) => {},
            _ = shutdown.cancelled() => {
                info!(jwks_uri = %shared.jwks_uri, "JWKS refresher shutting down");
                return;
            }
        }

        // Failures are logged inside and never reach validations.
        let _ = shared.refresh().await;
    }
}

/// Convert a JWK to a signing key.
fn signing_key_from_jwk(jwk: &Jwk) -> Result<SigningKey, String> {
    let kid = jwk
        .common
        .key_id
        .clone()
        .filter(|kid| !kid.is_empty())
        .ok_or_else(|| "JWK has no key id".to_string())?;

    let (key, algorithm) = match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| format!("Failed to create RSA key: {e}"))?;

            let alg = match jwk.common.key_algorithm {
                None | Some(KeyAlgorithm::RS256) => Algorithm::RS256,
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                Some(KeyAlgorithm::PS256) => Algorithm::PS256,
                Some(KeyAlgorithm::PS384) => Algorithm::PS384,
                Some(KeyAlgorithm::PS512) => Algorithm::PS512,
                Some(other) => return Err(format!("algorithm {other:?} not usable with an RSA key")),
            };

            (key, alg)
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| format!("Failed to create EC key: {e}"))?;

            let alg = match (jwk.common.key_algorithm, &ec.curve) {
                (Some(KeyAlgorithm::ES256), _) | (None, EllipticCurve::P256) => Algorithm::ES256,
                (Some(KeyAlgorithm::ES384), _) | (None, EllipticCurve::P384) => Algorithm::ES384,
                (alg, curve) => {
                    return Err(format!("unsupported EC key (alg {alg:?}, curve {curve:?})"))
                }
            };

            (key, alg)
        }
        _ => return Err("Unsupported key type in JWKS".to_string()),
    };

    Ok(SigningKey { kid, algorithm, key })
}
