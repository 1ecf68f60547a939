use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    application::fetch::FetchError, domain::UnknownResultSet, infra::error::InfraError,
};

/// Structured description of a failed request, attached to the response
/// extensions so the logging middleware can emit the full error chain
/// without leaking it to the client.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

pub mod codes {
    pub const UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
    pub const UNKNOWN_RESULT_SET: &str = "unknown_result_set";
}

/// JSON error body served to clients. The `code` is stable so the dashboard
/// can branch on it; the message is the only other detail exposed.
#[derive(Debug, Serialize)]
pub struct HttpErrorBody {
    pub error: HttpErrorMessage,
}

#[derive(Debug, Serialize)]
pub struct HttpErrorMessage {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    code: &'static str,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        code: &'static str,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            code,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        code: &'static str,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            code,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = HttpErrorBody {
            error: HttpErrorMessage {
                code: self.code.to_string(),
                message: self.public_message.to_string(),
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<FetchError> for HttpError {
    fn from(error: FetchError) -> Self {
        match &error {
            FetchError::AllProducersFailed { .. } => HttpError::from_error(
                "infra::http::fetch_error_to_http_error",
                StatusCode::BAD_GATEWAY,
                codes::UPSTREAM_UNAVAILABLE,
                "Upstream donor source unavailable",
                &error,
            ),
        }
    }
}

impl From<UnknownResultSet> for HttpError {
    fn from(error: UnknownResultSet) -> Self {
        HttpError::new(
            "infra::http::result_set_to_http_error",
            StatusCode::BAD_REQUEST,
            codes::UNKNOWN_RESULT_SET,
            "Unknown result set",
            error.to_string(),
        )
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
