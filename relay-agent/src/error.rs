//! Error types surfaced to callers of the print agent
//!
//! Attempt failures, directory fetch failures and preference write failures
//! are absorbed where they happen (see `failover`, `directory`,
//! `preferences`); only the variants below reach a caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::failover::FailoverError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Unknown printer id
    #[error("Printer {0} does not exist")]
    NotFound(String),

    #[error("Printer {0} already exists")]
    AlreadyExists(String),

    /// Definition failed validation
    #[error("Invalid printer: {0}")]
    InvalidPrinter(String),

    /// Print payload could not be decoded
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// No candidates, or every candidate failed
    #[error(transparent)]
    Failover(#[from] FailoverError),
}

pub type AgentResult<T> = Result<T, AgentError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AgentError::NotFound(_) => (StatusCode::NOT_FOUND, "E0003"),
            AgentError::AlreadyExists(_) => (StatusCode::CONFLICT, "E0004"),
            AgentError::InvalidPrinter(_) | AgentError::InvalidPayload(_) => {
                (StatusCode::BAD_REQUEST, "E0002")
            }
            AgentError::Failover(FailoverError::NoCandidates) => {
                (StatusCode::SERVICE_UNAVAILABLE, "E4001")
            }
            AgentError::Failover(FailoverError::Exhausted { .. }) => {
                warn!(error = %self, "Print request failed on every printer");
                (StatusCode::BAD_GATEWAY, "E4002")
            }
        };

        let body = Json(ErrorBody {
            code,
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}
