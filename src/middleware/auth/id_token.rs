//! ID token gate: `Authorization: Bearer <id token>` → verify → claims in request extensions
//!
//! Steps (each one short-circuits with a 401, `next` is never reached on failure):
//! 1. Authorization header missing or empty → `No ID token`
//! 2. Not prefixed with `Bearer ` (case-sensitive) → `Invalid ID token`
//! 3. Strip the prefix
//! 4. Ask the verifier (bounded by the verify timeout) → `Invalid ID token` on any error
//! 5. Store the claims under this gate's private slot and run `next`
//!
//! Slots are keyed by the gate's `GateKey` marker type, so two groups guarded by
//! different gates never see each other's claims.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Request, State},
    http::{Extensions, HeaderMap, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::{IdTokenClaims, IdTokenVerifier, VerifyError};

pub const BEARER_PREFIX: &str = "Bearer ";

/// Names the claims slot of one gate. Implement it on an uninhabited marker type.
pub trait GateKey: Send + Sync + 'static {}

/// Slot used by the single gate this service installs by default.
pub enum DefaultGate {}

impl GateKey for DefaultGate {}

// Only this module can build one; only `claims` reads it back.
struct ClaimsSlot<K> {
    claims: Arc<IdTokenClaims>,
    _key: PhantomData<fn() -> K>,
}

impl<K> Clone for ClaimsSlot<K> {
    fn clone(&self) -> Self {
        Self {
            claims: self.claims.clone(),
            _key: PhantomData,
        }
    }
}

/// Looks up the claims the gate `K` stored for this request.
pub fn claims<K: GateKey>(extensions: &Extensions) -> Option<Arc<IdTokenClaims>> {
    extensions
        .get::<ClaimsSlot<K>>()
        .map(|slot| slot.claims.clone())
}

pub struct AuthGate<K: GateKey = DefaultGate> {
    verifier: Arc<dyn IdTokenVerifier>,
    verify_timeout: Duration,
    _key: PhantomData<fn() -> K>,
}

impl<K: GateKey> Clone for AuthGate<K> {
    fn clone(&self) -> Self {
        Self {
            verifier: self.verifier.clone(),
            verify_timeout: self.verify_timeout,
            _key: PhantomData,
        }
    }
}

impl<K: GateKey> std::fmt::Debug for AuthGate<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("slot", &std::any::type_name::<K>())
            .field("verify_timeout", &self.verify_timeout)
            .finish_non_exhaustive()
    }
}

impl<K: GateKey> AuthGate<K> {
    pub fn new(verifier: Arc<dyn IdTokenVerifier>, verify_timeout: Duration) -> Self {
        Self {
            verifier,
            verify_timeout,
            _key: PhantomData,
        }
    }

    /// Guards every route currently registered on `router`.
    ///
    /// `route_layer` keeps unmatched paths answering 404 instead of 401.
    pub fn apply<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, id_token_middleware::<K>))
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<IdTokenClaims, AppError> {
        let token = bearer_token(headers)?;

        let verified = tokio::time::timeout(self.verify_timeout, self.verifier.verify(token))
            .await
            .unwrap_or(Err(VerifyError::TimedOut(self.verify_timeout)));

        match verified {
            Ok(claims) => {
                tracing::info!(uid = %claims.uid(), "id token verified");
                Ok(claims)
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    provider_failure = err.is_provider_failure(),
                    "id token verification failed"
                );
                Err(AppError::VerificationFailed)
            }
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingCredential)?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .ok_or(AppError::MalformedCredential)
}

async fn id_token_middleware<K: GateKey>(
    State(gate): State<AuthGate<K>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = match gate.authenticate(req.headers()).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                reason = %err,
                path = %req.uri().path(),
                "request rejected by auth gate"
            );
            return Err(err);
        }
    };

    // middleware → extractor
    req.extensions_mut().insert(ClaimsSlot::<K> {
        claims: Arc::new(claims),
        _key: PhantomData,
    });

    Ok(next.run(req).await)
}
