/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 * - Built once at startup, read-only afterwards
 * - Clone is cheap (the gate holds an Arc'd verifier)
 */
use crate::middleware::auth::AuthGate;

#[derive(Clone, Debug, Default)]
pub struct AppState {
    // None => the protected group is served without a gate (AUTH_GATE=off)
    pub auth: Option<AuthGate>,
}

impl AppState {
    pub fn new(auth: Option<AuthGate>) -> Self {
        Self { auth }
    }
}
