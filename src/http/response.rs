//! JSON error responses.
//!
//! Every rejection, whether from the pipeline or a handler, has the same
//! body shape: `{"code": "...", "detail": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub detail: String,
}

/// Build a JSON error response.
pub fn json_error(status: StatusCode, code: &str, detail: String) -> Response {
    (
        status,
        Json(ErrorBody {
            code: code.to_string(),
            detail,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[tokio::test]
    async fn renders_code_and_detail() {
        let resp = json_error(StatusCode::FORBIDDEN, "csrf_mismatch", "nope".into());
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, "csrf_mismatch");
        assert_eq!(body.detail, "nope");
    }
}
