use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{info, warn};

use super::RemoteReportGenerator;
use crate::wizard::pointer::Node;

/// Report generation endpoint plus the expiring download route.
pub fn report_router(generator: Arc<RemoteReportGenerator>) -> Router {
    Router::new()
        .route("/api/generateReport", post(generate_handler))
        .route("/api/generateReport/:token", get(download_handler))
        .with_state(generator)
}

fn error_body(status: StatusCode, message: &str) -> Response {
    let payload = json!({
        "status": "error",
        "message": message,
    });
    (status, Json(payload)).into_response()
}

async fn generate_handler(
    State(generator): State<Arc<RemoteReportGenerator>>,
    body: Bytes,
) -> Response {
    let payload: Node = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "report request body is not JSON");
            return error_body(StatusCode::BAD_REQUEST, "Invalid JSON payload.");
        }
    };

    match generator.generate_from_node(&payload).await {
        Ok(descriptor) => {
            let payload = json!({
                "status": "success",
                "reportUrl": descriptor.report_url,
                "filename": descriptor.filename,
                "expiresAt": descriptor.expires_at,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(issues) => {
            let payload = json!({
                "status": "error",
                "message": "Validation failed.",
                "issues": issues,
            });
            (StatusCode::BAD_REQUEST, Json(payload)).into_response()
        }
    }
}

async fn download_handler(
    State(generator): State<Arc<RemoteReportGenerator>>,
    Path(token): Path<String>,
) -> Response {
    let Some(artifact) = generator.store().get(&token) else {
        return error_body(StatusCode::NOT_FOUND, "Report link expired or invalid.");
    };

    info!(filename = %artifact.filename, bytes = artifact.bytes.len(), "report downloaded");
    let disposition = format!("attachment; filename=\"{}\"", artifact.filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, artifact.content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        artifact.bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TempReportStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let store = Arc::new(TempReportStore::default());
        report_router(Arc::new(RemoteReportGenerator::local(store)))
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let response = app()
            .oneshot(
                Request::post("/api/generateReport")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .expect("request"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Invalid JSON payload.");
    }

    #[tokio::test]
    async fn incomplete_document_lists_issue_paths() {
        let response = app()
            .oneshot(
                Request::post("/api/generateReport")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .expect("request"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Validation failed.");
        let issues = body["issues"].as_array().expect("issues array");
        assert!(issues
            .iter()
            .any(|issue| issue["path"] == "programInfo/institutionName"));
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let response = app()
            .oneshot(
                Request::get("/api/generateReport/missing")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["message"], "Report link expired or invalid.");
    }
}
