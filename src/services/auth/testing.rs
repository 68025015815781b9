//! Test doubles and key material shared by the unit tests.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;

use super::claims::{FirebaseInfo, IdTokenClaims};
use super::verifier::{IdTokenVerifier, VerifyError};

pub const TEST_KID: &str = "test-key-1";
pub const TEST_PROJECT: &str = "demo-project";

/// Public half of `testdata/signing_key.pem` as JWK members.
pub const TEST_KEY_N: &str = "rGHqe-EBhq9sOO2naktHEpUWTzNobyoccirLotsoNBKKf6qR2_nbfyjDm_JR4jUtx-LSzmcetQoNH_w9QAcZc-7XBwYxMnQFP5c5mFEMa-rNDFGCXB5ncNGmx-FN9iQTNfJczV3UhoWVlkLXwU30E4vyR4tOy7wvCjRWJGXMe9B6S9WFD-vPcFAGNr_sRQCSyFGQ-fiZkacuKgnrcEYtbXF9ETTS50uIXZikNb8MlnlRBKSt2gIIk9kNxKCW-pTRtIC-Bz62XheiM4VXgRlI18kFdZYZQuV5TZ2ULR1B5DrNWLKhwu89PwOKNqfTp2uAciadKtrmN5j5UC1R9gb8Dw";
pub const TEST_KEY_E: &str = "AQAB";

const SIGNING_KEY_PEM: &str = include_str!("testdata/signing_key.pem");
const ROGUE_KEY_PEM: &str = include_str!("testdata/rogue_key.pem");

pub fn now() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

/// Claims a Firebase-issued token for `uid` would carry right now.
pub fn claims_for(uid: &str) -> IdTokenClaims {
    let iat = now();
    let mut custom = serde_json::Map::new();
    custom.insert("email".into(), serde_json::json!(format!("{uid}@example.com")));

    IdTokenClaims {
        iss: format!("https://securetoken.google.com/{TEST_PROJECT}"),
        aud: TEST_PROJECT.to_string(),
        sub: uid.to_string(),
        iat,
        exp: iat + 3600,
        auth_time: Some(iat - 60),
        firebase: Some(FirebaseInfo {
            sign_in_provider: "password".into(),
            tenant: None,
            identities: HashMap::new(),
        }),
        custom,
    }
}

fn rs256_header(kid: Option<&str>) -> Header {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    header
}

/// Signs `claims` with the test key under `kid`.
pub fn sign(claims: &IdTokenClaims, kid: Option<&str>) -> String {
    let key = EncodingKey::from_rsa_pem(SIGNING_KEY_PEM.as_bytes()).unwrap();
    jsonwebtoken::encode(&rs256_header(kid), claims, &key).unwrap()
}

/// Signs `claims` with a key the provider never published, claiming the published `kid`.
pub fn sign_with_rogue_key(claims: &IdTokenClaims) -> String {
    let key = EncodingKey::from_rsa_pem(ROGUE_KEY_PEM.as_bytes()).unwrap();
    jsonwebtoken::encode(&rs256_header(Some(TEST_KID)), claims, &key).unwrap()
}

/// Scripted verifier: knows a fixed token → claims table and records every call.
#[derive(Default)]
pub struct StaticVerifier {
    tokens: HashMap<String, IdTokenClaims>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: &str, claims: IdTokenClaims) -> Self {
        self.tokens.insert(token.to_string(), claims);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl IdTokenVerifier for StaticVerifier {
    async fn verify(&self, token: &str) -> Result<IdTokenClaims, VerifyError> {
        self.calls.lock().push(token.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if token.is_empty() {
            return Err(VerifyError::EmptyToken);
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(VerifyError::InvalidClaim {
                claim: "sub",
                reason: "unknown test token",
            })
    }
}
