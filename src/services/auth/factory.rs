/// Factory: build the ID-token verifier from the application `FirebaseConfig`.
use std::sync::Arc;

use thiserror::Error;

use crate::config::FirebaseConfig;
use crate::services::auth::{
    FirebaseVerifier, IdTokenVerifier, JwksCache,
    credentials::{CredentialsError, ServiceAccountKey},
};

#[derive(Debug, Error)]
pub enum BuildVerifierError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("failed to build JWKS http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub fn build_verifier(
    config: &FirebaseConfig,
) -> Result<Arc<dyn IdTokenVerifier>, BuildVerifierError> {
    let credentials = ServiceAccountKey::from_json(&config.credential_json)?;
    let project_id = credentials.resolve_project_id(config.project_id_override.as_deref())?;

    let keys = JwksCache::new(config.jwks_url.clone())?;
    let verifier = FirebaseVerifier::new(project_id, keys, config.leeway_seconds);

    tracing::info!(
        project_id = %verifier.project_id(),
        service_account = ?credentials.client_email,
        key_id = ?credentials.private_key_id(),
        "firebase id token verifier ready"
    );

    Ok(Arc::new(verifier))
}
