pub mod claims;
pub mod credentials;
pub mod factory;
pub mod firebase;
pub mod jwks;
pub mod verifier;

#[cfg(test)]
pub mod testing;

pub use claims::IdTokenClaims;
pub use factory::build_verifier;
pub use firebase::FirebaseVerifier;
pub use jwks::JwksCache;
pub use verifier::{IdTokenVerifier, VerifyError};
