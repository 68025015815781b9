/*
 * Responsibility
 * - middleware public interface (re-exports)
 * - http::apply (cross-cutting chain), auth::AuthGate (protected groups)
 */
pub mod auth;
pub mod http;
