/*
 * Responsibility
 * - App-wide error type for the HTTP surface
 * - IntoResponse (status + plain-text body)
 * - Every auth rejection is a 401; the internal cause only goes to the logs
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub const NO_ID_TOKEN: &str = "No ID token";
pub const INVALID_ID_TOKEN: &str = "Invalid ID token";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no credential in Authorization header")]
    MissingCredential,
    #[error("Authorization header is not a bearer credential")]
    MalformedCredential,
    #[error("id token verification failed")]
    VerificationFailed,
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::MissingCredential => (StatusCode::UNAUTHORIZED, NO_ID_TOKEN),
            AppError::MalformedCredential | AppError::VerificationFailed => {
                (StatusCode::UNAUTHORIZED, INVALID_ID_TOKEN)
            }
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal server error"),
        };

        (status, body).into_response()
    }
}
