use std::convert::Infallible;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::request::Parts;

use crate::error::AppError;
use crate::middleware::auth::{DefaultGate, GateKey, id_token};
use crate::services::auth::IdTokenClaims;

/// Claims verified by the gate `K` for the current request.
///
/// Requires `AuthGate<K>` on the route group; without it the extractor rejects
/// with 401. Use `Option<VerifiedClaims<K>>` on routes that may run ungated.
pub struct VerifiedClaims<K: GateKey = DefaultGate> {
    claims: Arc<IdTokenClaims>,
    _key: PhantomData<fn() -> K>,
}

impl<K: GateKey> VerifiedClaims<K> {
    fn from_parts(parts: &Parts) -> Option<Self> {
        id_token::claims::<K>(&parts.extensions).map(|claims| Self {
            claims,
            _key: PhantomData,
        })
    }
}

impl<K: GateKey> Deref for VerifiedClaims<K> {
    type Target = IdTokenClaims;

    fn deref(&self) -> &Self::Target {
        &self.claims
    }
}

impl<S, K> FromRequestParts<S> for VerifiedClaims<K>
where
    S: Send + Sync,
    K: GateKey,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts).ok_or(AppError::MissingCredential)
    }
}

impl<S, K> OptionalFromRequestParts<S> for VerifiedClaims<K>
where
    S: Send + Sync,
    K: GateKey,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
