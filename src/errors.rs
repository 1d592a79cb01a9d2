use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest { message: &'static str },
    #[error("not found: {message}")]
    NotFound { message: &'static str },
    #[error("internal error: {message}")]
    Internal {
        public_message: &'static str,
        message: String,
    },
}

impl AppError {
    pub fn bad_request(message: &'static str) -> Self {
        Self::BadRequest { message }
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::NotFound { message }
    }

    /// `public_message` is what the client sees; `message` is only logged.
    pub fn internal(public_message: &'static str, message: impl Into<String>) -> Self {
        Self::Internal {
            public_message,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            Self::NotFound { message } => (StatusCode::NOT_FOUND, message),
            Self::Internal {
                public_message,
                message,
            } => {
                tracing::error!(error = %message, "request failed with internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, public_message)
            }
        };

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::header, response::IntoResponse};

    use super::*;

    #[test]
    fn bodies_are_plain_text() {
        let response = AppError::not_found("Session not found").into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/plain"));
    }

    #[test]
    fn internal_hides_details_from_status_mapping() {
        let error = AppError::internal("Error handling request", "handler exploded");
        assert!(error.to_string().contains("handler exploded"));

        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
