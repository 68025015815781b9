/*
 * Responsibility
 * - Authentication gates for route groups (ID token → verified claims)
 */
pub mod id_token;

pub use id_token::{AuthGate, DefaultGate, GateKey};
