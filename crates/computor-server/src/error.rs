//! Maps [`ComputorError`] onto HTTP status codes for every handler in
//! this crate. The mapping mirrors the retryability taxonomy from §7:
//! client-caused kinds get 4xx, provider/transient kinds get 502/504,
//! and anything left over is a 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use computor_core::error::{ComputorError, ErrorKind};
use serde_json::json;

pub struct ApiError(pub ComputorError);

impl From<ComputorError> for ApiError {
    fn from(err: ComputorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation
            | ErrorKind::UnknownSlug
            | ErrorKind::UnknownTag
            | ErrorKind::NoMatchingVersion
            | ErrorKind::DependencyCycle => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::ProviderAuth => StatusCode::BAD_GATEWAY,
            ErrorKind::ProviderTransient => StatusCode::BAD_GATEWAY,
            ErrorKind::Integrity => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::TimeoutExceeded => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::CancelRequested => StatusCode::CONFLICT,
        };
        let body = Json(json!({
            "error": {
                "kind": format!("{:?}", self.0.kind()),
                "message": self.0.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
