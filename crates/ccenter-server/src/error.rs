use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ccenter_core::error::CenterError;

// ---------------------------------------------------------------------------
// Internal sentinel for explicit 404s
// ---------------------------------------------------------------------------

/// Carries an explicit HTTP 404 through the `anyhow::Error` chain.
#[derive(Debug)]
struct NotFoundError(String);

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for NotFoundError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(NotFoundError(msg.into()).into())
    }
}

fn status_for(e: &CenterError) -> StatusCode {
    match e {
        CenterError::NotInitialized
        | CenterError::InvalidName(_)
        | CenterError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
        CenterError::SkillNotFound(_) | CenterError::ExecutionNotFound(_) => StatusCode::NOT_FOUND,
        CenterError::InvalidSkill { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CenterError::Rpc(_) => StatusCode::BAD_GATEWAY,
        CenterError::HomeNotFound
        | CenterError::Io(_)
        | CenterError::Yaml(_)
        | CenterError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(n) = self.0.downcast_ref::<NotFoundError>() {
            let body = serde_json::json!({ "error": n.0.clone() });
            return (StatusCode::NOT_FOUND, axum::Json(body)).into_response();
        }

        let status = self
            .0
            .downcast_ref::<CenterError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
