//! Service-account credential blob (the JSON downloaded from the Firebase console).
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("credential is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("credential type must be 'service_account', got '{0}'")]
    UnexpectedType(String),
    #[error("credential has no project_id and FIREBASE_PROJECT_ID is not set")]
    MissingProjectId,
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_struct("ServiceAccountKey")
            .field("kind", &self.kind)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("has_private_key", &self.private_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, CredentialsError> {
        let key: Self = serde_json::from_str(raw)?;
        if key.kind != "service_account" {
            return Err(CredentialsError::UnexpectedType(key.kind));
        }
        Ok(key)
    }

    /// Project id to verify tokens against; an explicit override wins over the blob.
    pub fn resolve_project_id(
        &self,
        project_override: Option<&str>,
    ) -> Result<String, CredentialsError> {
        project_override
            .or(Some(self.project_id.as_str()))
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or(CredentialsError::MissingProjectId)
    }

    pub fn private_key_id(&self) -> Option<&str> {
        self.private_key_id.as_deref()
    }
}
