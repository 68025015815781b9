/*
 * Responsibility
 * - Load Config -> build the verifier / gate -> assemble the Router
 * - Apply middleware (cross-cutting chain, auth gate on the protected group)
 * - Serve with graceful shutdown
 */
use std::{panic, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::middleware::{self, auth::AuthGate};
use crate::services::auth::build_verifier;
use crate::state::AppState;
use crate::{api, server};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,id_token_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook() {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    // Never abort here: CatchPanicLayer turns a handler panic into a 500 after unwinding.
    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;

    init_panic_hook();

    tracing::info!(
        "starting in {:?} mode on {} (auth gate: {})",
        config.app_env,
        config.addr,
        if config.gate_enabled() { "on" } else { "off" }
    );

    let state = build_state(&config)?;
    let app = build_router(state, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!("server is ready to handle requests at {}", config.addr);

    server::serve(listener, app, server::shutdown_signal(), config.shutdown_grace).await
}

fn build_state(config: &Config) -> Result<AppState> {
    // The verifier is built once here and shared (Arc) by every request.
    let auth = match &config.firebase {
        Some(firebase) => {
            let verifier =
                build_verifier(firebase).context("failed to initialize id token verifier")?;
            Some(AuthGate::new(verifier, firebase.verify_timeout))
        }
        None => {
            tracing::warn!("AUTH_GATE is off: /admin is served without authentication");
            None
        }
    };

    Ok(AppState::new(auth))
}

fn build_router(state: AppState, request_timeout: Duration) -> Router {
    let router = api::routes(&state).with_state(state);
    middleware::http::apply(router, request_timeout)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::config::ConfigError;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(move |key| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn startup_fails_without_credential() {
        assert!(matches!(
            config_from(&[]),
            Err(ConfigError::Missing("FB_SECRET_CREDENTIAL"))
        ));
    }

    #[test]
    fn startup_fails_on_unusable_credential() {
        let config = config_from(&[("FB_SECRET_CREDENTIAL", r#"{"type":"authorized_user"}"#)]).unwrap();
        assert!(build_state(&config).is_err());
    }

    #[test]
    fn gate_follows_configuration() {
        let config = config_from(&[(
            "FB_SECRET_CREDENTIAL",
            r#"{"type":"service_account","project_id":"demo"}"#,
        )])
        .unwrap();
        assert!(build_state(&config).unwrap().auth.is_some());

        let config = config_from(&[("AUTH_GATE", "off")]).unwrap();
        assert!(build_state(&config).unwrap().auth.is_none());
    }

    #[tokio::test]
    async fn assembled_router_serves_public_and_gates_admin() {
        let config = config_from(&[(
            "FB_SECRET_CREDENTIAL",
            r#"{"type":"service_account","project_id":"demo"}"#,
        )])
        .unwrap();
        let app = build_router(build_state(&config).unwrap(), config.request_timeout);

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Hello, world!");

        let res = app
            .oneshot(Request::builder().uri("/admin").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"No ID token");
    }

    #[tokio::test]
    async fn handler_panic_is_answered_with_500_under_the_installed_hook() {
        async fn boom() -> &'static str {
            panic!("handler bug")
        }

        init_panic_hook();
        let app = middleware::http::apply(
            Router::new().route("/boom", get(boom)),
            Duration::from_secs(5),
        );

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // The process is still serving afterwards
        let res = app
            .oneshot(Request::builder().uri("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
