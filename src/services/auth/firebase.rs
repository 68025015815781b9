use async_trait::async_trait;
use jsonwebtoken::{Algorithm, Validation};

use super::claims::IdTokenClaims;
use super::jwks::JwksCache;
use super::verifier::{IdTokenVerifier, VerifyError};

const ISSUER_PREFIX: &str = "https://securetoken.google.com/";
const MAX_UID_LEN: usize = 128;

/// Verifies Firebase Auth ID tokens (RS256, signed by Google's securetoken keys).
///
/// `jsonwebtoken::Validation` checks the signature, `exp`, `iss` and `aud`.
/// On top of that this checks the Firebase rules for `sub`, `iat` and `auth_time`.
pub struct FirebaseVerifier {
    project_id: String,
    keys: JwksCache,
    validation: Validation,
    leeway_seconds: u64,
}

impl std::fmt::Debug for FirebaseVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseVerifier")
            .field("project_id", &self.project_id)
            .field("keys", &self.keys)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish()
    }
}

impl FirebaseVerifier {
    pub fn new(project_id: impl Into<String>, keys: JwksCache, leeway_seconds: u64) -> Self {
        let project_id = project_id.into();
        let issuer = format!("{ISSUER_PREFIX}{project_id}");

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[project_id.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "aud", "iss", "sub"]);
        validation.leeway = leeway_seconds;

        Self {
            project_id,
            keys,
            validation,
            leeway_seconds,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn check_firebase_claims(&self, claims: &IdTokenClaims, now: u64) -> Result<(), VerifyError> {
        if claims.sub.is_empty() {
            return Err(VerifyError::InvalidClaim {
                claim: "sub",
                reason: "must be a non-empty string",
            });
        }
        if claims.sub.len() > MAX_UID_LEN {
            return Err(VerifyError::InvalidClaim {
                claim: "sub",
                reason: "must be at most 128 characters",
            });
        }

        let latest = now.saturating_add(self.leeway_seconds);
        if claims.iat > latest {
            return Err(VerifyError::InvalidClaim {
                claim: "iat",
                reason: "issued in the future",
            });
        }
        if claims.auth_time.is_some_and(|t| t > latest) {
            return Err(VerifyError::InvalidClaim {
                claim: "auth_time",
                reason: "authenticated in the future",
            });
        }

        Ok(())
    }
}

#[async_trait]
impl IdTokenVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> Result<IdTokenClaims, VerifyError> {
        if token.is_empty() {
            return Err(VerifyError::EmptyToken);
        }

        let header = jsonwebtoken::decode_header(token).map_err(VerifyError::Malformed)?;
        if header.alg != Algorithm::RS256 {
            return Err(VerifyError::UnexpectedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(VerifyError::MissingKeyId)?;

        let key = self.keys.get_key(&kid).await?;

        let data = jsonwebtoken::decode::<IdTokenClaims>(token, &key, &self.validation)
            .map_err(VerifyError::Rejected)?;

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.check_firebase_claims(&data.claims, now)?;

        Ok(data.claims)
    }
}
