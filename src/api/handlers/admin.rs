/*
 * Responsibility
 * - GET /admin (protected group)
 * - Reads the claims the gate verified; never runs before the gate succeeded
 */
use crate::api::extractors::VerifiedClaims;

pub async fn admin(claims: Option<VerifiedClaims>) -> &'static str {
    match claims {
        Some(claims) => tracing::info!(
            uid = %claims.uid(),
            sign_in_provider = ?claims.firebase.as_ref().map(|f| f.sign_in_provider.as_str()),
            "admin page requested"
        ),
        // Only reachable when the service runs with AUTH_GATE=off
        None => tracing::info!("admin page requested without auth gate"),
    }

    "admin page"
}
