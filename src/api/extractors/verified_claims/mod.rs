/*!
 * Verified claims extractor
 *
 * Responsibility:
 * - Hand the claims stored by an auth gate to handlers
 * - axum glue lives in core; the slot itself is private to the gate
 *
 * Public API:
 * - VerifiedClaims
 */

mod core;

pub use self::core::VerifiedClaims;
