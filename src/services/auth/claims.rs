use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Decoded claims of a verified Firebase ID token.
///
/// - `sub` is the Firebase uid
/// - `auth_time` is when the user actually signed in (may be older than `iat`)
/// - every claim not listed here (custom claims, `email`, `name`...) lands in `custom`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: u64,
    pub exp: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firebase: Option<FirebaseInfo>,

    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl IdTokenClaims {
    pub fn uid(&self) -> &str {
        &self.sub
    }
}

/// The `firebase` claim block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirebaseInfo {
    pub sign_in_provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,

    #[serde(default)]
    pub identities: HashMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_claims_are_kept_as_custom() {
        let claims: IdTokenClaims = serde_json::from_value(json!({
            "iss": "https://securetoken.google.com/demo",
            "aud": "demo",
            "sub": "uid-1",
            "iat": 1_700_000_000u64,
            "exp": 1_700_003_600u64,
            "auth_time": 1_699_999_000u64,
            "email": "ada@example.com",
            "admin": true,
            "firebase": {
                "sign_in_provider": "password",
                "identities": { "email": ["ada@example.com"] }
            }
        }))
        .unwrap();

        assert_eq!(claims.uid(), "uid-1");
        assert_eq!(claims.auth_time, Some(1_699_999_000));
        assert_eq!(claims.custom.get("admin"), Some(&json!(true)));
        assert_eq!(claims.custom.get("email"), Some(&json!("ada@example.com")));
        assert!(claims.custom.get("iss").is_none());

        let firebase = claims.firebase.unwrap();
        assert_eq!(firebase.sign_in_provider, "password");
        assert!(firebase.tenant.is_none());
        assert!(firebase.identities.contains_key("email"));
    }
}
