//! Verifier seam between the auth gate and the identity provider.
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::Algorithm;
use thiserror::Error;

use super::claims::IdTokenClaims;

/// Reasons a credential string did not turn into verified claims.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("id token must be a non-empty string")]
    EmptyToken,
    #[error("malformed id token: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
    #[error("unexpected signing algorithm {0:?} (expected RS256)")]
    UnexpectedAlgorithm(Algorithm),
    #[error("id token has no 'kid' header")]
    MissingKeyId,
    #[error("no public key matches kid '{0}'")]
    UnknownKeyId(String),
    #[error("id token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
    #[error("invalid '{claim}' claim: {reason}")]
    InvalidClaim {
        claim: &'static str,
        reason: &'static str,
    },
    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("verification timed out after {0:?}")]
    TimedOut(Duration),
}

impl VerifyError {
    /// True when the failure is on the provider side rather than the token itself.
    pub fn is_provider_failure(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::TimedOut(_))
    }
}

/// Turns a raw ID token into the claims the provider vouches for.
///
/// Implementations are shared by every in-flight request, so they must handle
/// their own internal synchronization (key caches etc.).
#[async_trait]
pub trait IdTokenVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<IdTokenClaims, VerifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failures_are_told_apart() {
        assert!(VerifyError::ProviderUnavailable("connect refused".into()).is_provider_failure());
        assert!(VerifyError::TimedOut(Duration::from_secs(1)).is_provider_failure());

        assert!(!VerifyError::EmptyToken.is_provider_failure());
        assert!(!VerifyError::MissingKeyId.is_provider_failure());
        assert!(!VerifyError::UnknownKeyId("k1".into()).is_provider_failure());
    }
}
