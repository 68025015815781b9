/*
 * Responsibility
 * - URL structure: public group (/) and protected group (/admin)
 * - The protected group gets the auth gate from AppState (or none when it is switched off)
 */
use axum::{Router, routing::get};

use crate::api::handlers::{admin::admin, root::root};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/", get(root));

    let protected = Router::new().route("/admin", get(admin));
    let protected = match state.auth.clone() {
        Some(gate) => gate.apply(protected),
        None => protected,
    };

    public.merge(protected)
}
