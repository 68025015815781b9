//! Signing-key cache for the identity provider.
//!
//! Fetches the provider's JWK set, keeps it for as long as the response's
//! `Cache-Control: max-age` allows, and falls back to the previous set when a
//! refresh fails.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use parking_lot::RwLock;
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::verifier::VerifyError;

/// Used when the provider sends no usable `max-age`.
const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// How long an expired set may still be used while the provider is unreachable.
const STALE_GRACE_PERIOD: Duration = Duration::from_secs(86400);

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// After a failed refresh, the stale set is served without refetching for this long.
const REFRESH_RETRY_AFTER: Duration = Duration::from_secs(30);

/// A JSON Web Key (only the RSA members are read)
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default, rename = "use")]
    pub use_: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

impl Jwk {
    fn is_rsa_signing_key(&self) -> bool {
        self.kty == "RSA"
            && self.use_.as_deref() != Some("enc")
            && self.alg.as_deref().is_none_or(|alg| alg == "RS256")
            && self.n.is_some()
            && self.e.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

struct CachedKeys {
    by_kid: HashMap<String, DecodingKey>,
    fetched_at: Instant,
    max_age: Duration,
    retry_at: Option<Instant>,
}

impl CachedKeys {
    fn from_set(set: JwkSet, max_age: Duration) -> Self {
        let by_kid = set
            .keys
            .into_iter()
            .filter(Jwk::is_rsa_signing_key)
            .filter_map(|jwk| {
                let kid = jwk.kid?;
                let n = jwk.n?;
                let e = jwk.e?;
                match DecodingKey::from_rsa_components(&n, &e) {
                    Ok(key) => Some((kid, key)),
                    Err(err) => {
                        warn!(kid = %kid, error = %err, "skipping unusable JWK");
                        None
                    }
                }
            })
            .collect();

        Self {
            by_kid,
            fetched_at: Instant::now(),
            max_age,
            retry_at: None,
        }
    }

    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.max_age
    }

    fn is_usable_when_stale(&self) -> bool {
        self.fetched_at.elapsed() < self.max_age + STALE_GRACE_PERIOD
    }

    fn is_backing_off(&self) -> bool {
        self.retry_at.is_some_and(|at| Instant::now() < at)
    }
}

/// Key cache for one JWKS endpoint; shared by every in-flight verification.
pub struct JwksCache {
    url: String,
    client: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
    // Serializes refreshes so concurrent misses trigger a single fetch
    refresh_lock: Mutex<()>,
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("url", &self.url)
            .field("cached_keys", &self.cache.read().as_ref().map(|c| c.by_kid.len()))
            .finish()
    }
}

impl JwksCache {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
        Ok(Self::with_client(url, client))
    }

    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Returns the decoding key for `kid`.
    ///
    /// Fetches the key set first when the cache is cold or expired. While one
    /// task refreshes, or after a refresh failed, lookups are answered from the
    /// stale set as long as it is within the grace period.
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, VerifyError> {
        if let Some(found) = self.lookup(kid) {
            return found;
        }

        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                // A kid missing from the stale set waits for the refresh (key rotation)
                if let Some(Ok(key)) = self.lookup_stale(kid) {
                    return Ok(key);
                }
                self.refresh_lock.lock().await
            }
        };

        // Another task may have refreshed while we waited
        if let Some(found) = self.lookup(kid) {
            return found;
        }

        match self.fetch().await {
            Ok(fresh) => {
                let result = find_key(&fresh, kid);
                *self.cache.write() = Some(fresh);
                result
            }
            Err(err) => {
                let mut cache = self.cache.write();
                match cache.as_mut() {
                    Some(stale) if stale.is_usable_when_stale() => {
                        stale.retry_at = Some(Instant::now() + REFRESH_RETRY_AFTER);
                        warn!(
                            url = %self.url,
                            error = %err,
                            retry_after_secs = REFRESH_RETRY_AFTER.as_secs(),
                            "JWKS refresh failed, using stale keys"
                        );
                        find_key(stale, kid)
                    }
                    _ => Err(err),
                }
            }
        }
    }

    /// Answers from the cache when it is fresh, or stale but inside a refresh backoff.
    fn lookup(&self, kid: &str) -> Option<Result<DecodingKey, VerifyError>> {
        let cache = self.cache.read();
        cache
            .as_ref()
            .filter(|cached| {
                cached.is_fresh() || (cached.is_backing_off() && cached.is_usable_when_stale())
            })
            .map(|cached| find_key(cached, kid))
    }

    fn lookup_stale(&self, kid: &str) -> Option<Result<DecodingKey, VerifyError>> {
        let cache = self.cache.read();
        cache
            .as_ref()
            .filter(|cached| cached.is_usable_when_stale())
            .map(|cached| find_key(cached, kid))
    }

    async fn fetch(&self) -> Result<CachedKeys, VerifyError> {
        debug!(url = %self.url, "fetching JWKS");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| VerifyError::ProviderUnavailable(format!("JWKS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(VerifyError::ProviderUnavailable(format!(
                "JWKS endpoint returned HTTP {}",
                response.status()
            )));
        }

        let max_age = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(DEFAULT_MAX_AGE);

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| VerifyError::ProviderUnavailable(format!("invalid JWKS body: {}", e)))?;

        let cached = CachedKeys::from_set(set, max_age);
        info!(
            url = %self.url,
            key_count = cached.by_kid.len(),
            max_age_secs = max_age.as_secs(),
            "JWKS fetched"
        );

        Ok(cached)
    }
}

fn find_key(cached: &CachedKeys, kid: &str) -> Result<DecodingKey, VerifyError> {
    cached
        .by_kid
        .get(kid)
        .cloned()
        .ok_or_else(|| VerifyError::UnknownKeyId(kid.to_string()))
}

/// Extracts `max-age` from a `Cache-Control` header value.
pub fn parse_max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .map(str::trim)
        .find_map(|directive| {
            let (name, value) = directive.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("max-age") {
                value.trim().trim_matches('"').parse::<u64>().ok()
            } else {
                None
            }
        })
        .map(Duration::from_secs)
}
