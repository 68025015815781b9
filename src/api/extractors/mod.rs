pub mod verified_claims;

pub use verified_claims::VerifiedClaims;
