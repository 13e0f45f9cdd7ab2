use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use core_service::{CoreError, GatewayError};
use serde::Serialize;
use tracing::{debug, error};

pub type Result<T> = core::result::Result<T, AppError>;

/// A [`CoreError`] on its way to the browser.
#[derive(Debug)]
pub struct AppError(pub CoreError);

impl<E> From<E> for AppError
where
    E: Into<CoreError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub error: &'static str,
    pub message: String,
    /// Where to sign in again, when that is the way out
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            CoreError::AuthenticationRequired(_) => (StatusCode::UNAUTHORIZED, "authentication_required"),
            CoreError::Gateway(err) => match err {
                GatewayError::InvalidQuery(_) => (StatusCode::BAD_REQUEST, "invalid_query"),
                GatewayError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
                GatewayError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
                GatewayError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
                GatewayError::RemoteFailure { .. } => (StatusCode::BAD_GATEWAY, "remote_failure"),
                GatewayError::Parse(_) | GatewayError::Network(_) => {
                    (StatusCode::BAD_GATEWAY, "remote_unavailable")
                }
            },
            CoreError::Auth(_) => (StatusCode::BAD_REQUEST, "authorization_failed"),
            CoreError::InvalidSetting { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_setting"),
            CoreError::InitializationFailed(_) | CoreError::Config(_) | CoreError::Settings(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %self.0, "Request rejected");
        }

        let auth_url = match &self.0 {
            CoreError::AuthenticationRequired(directive) => Some(directive.as_str().to_string()),
            CoreError::Gateway(GatewayError::Unauthorized) => Some("/auth/login".to_string()),
            _ => None,
        };

        let body = ErrorBody {
            error: code,
            message: self.0.to_string(),
            auth_url,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_mapping() {
        let cases = [
            (GatewayError::InvalidQuery("empty".into()), StatusCode::BAD_REQUEST),
            (GatewayError::Unauthorized, StatusCode::UNAUTHORIZED),
            (GatewayError::NotFound { file_id: "x".into() }, StatusCode::NOT_FOUND),
            (GatewayError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (
                GatewayError::RemoteFailure {
                    status: 500,
                    message: "Backend Error".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }

    #[test]
    fn test_invalid_setting_is_unprocessable() {
        let err = AppError(CoreError::InvalidSetting {
            field: "language".into(),
            message: "expected one of nl, en".into(),
        });
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
