//! MathBoard Storage Server
//!
//! A reference HTTP storage gateway for MathBoard documents: blobs keyed by
//! owner and file name, plus a metadata table of file records.
//!
//! ## Routes
//!
//! ```text
//! GET    /health
//! PUT    /storage/{owner}/{file}     store a document blob
//! GET    /storage/{owner}/{file}     fetch a document blob
//! DELETE /storage/{owner}/{file}     remove a document blob
//! GET    /files/{owner}              list file records
//! PUT    /files/{owner}/{id}         upsert a file record
//! GET    /files/{owner}/{id}         fetch a file record
//! DELETE /files/{owner}/{id}         delete a file record
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use dashmap::DashMap;
use mathboard_core::FileRecord;
use mathboard_core::persistence::detect_version;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Default listen address.
const DEFAULT_ADDR: &str = "0.0.0.0:3030";

/// Shared application state
#[derive(Default)]
struct AppState {
    /// Document blobs keyed by `owner/file`.
    blobs: DashMap<String, Bytes>,
    /// File records keyed by owner and id.
    records: DashMap<(String, String), FileRecord>,
}

impl AppState {
    fn new() -> Self {
        Self::default()
    }

    /// Record the format version of a stored blob on its metadata row.
    fn note_version(&self, owner: &str, file: &str, blob: &[u8]) {
        let id = file.strip_suffix(".json").unwrap_or(file);
        let Some(version) = std::str::from_utf8(blob).ok().and_then(detect_version) else {
            return;
        };
        if let Some(mut record) = self.records.get_mut(&(owner.to_string(), id.to_string())) {
            record.version = version.major();
        }
    }
}

/// Errors returned by the API.
#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("not found: {}", what)).into_response(),
            ApiError::BadRequest(why) => (StatusCode::BAD_REQUEST, why).into_response(),
        }
    }
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/storage/{owner}/{file}",
            get(download_blob).put(upload_blob).delete(remove_blob),
        )
        .route("/files/{owner}", get(list_records))
        .route(
            "/files/{owner}/{id}",
            get(select_record).put(upsert_record).delete(delete_record),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn listen_addr() -> SocketAddr {
    let configured = std::env::var("MATHBOARD_ADDR").ok();
    if let Some(addr) = configured.as_deref().and_then(|a| a.parse().ok()) {
        return addr;
    }
    if let Some(raw) = configured {
        warn!("invalid MATHBOARD_ADDR {:?}, using {}", raw, DEFAULT_ADDR);
    }
    SocketAddr::from(([0, 0, 0, 0], 3030))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mathboard_server=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());
    let addr = listen_addr();
    info!("MathBoard storage server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn upload_blob(
    State(state): State<Arc<AppState>>,
    Path((owner, file)): Path<(String, String)>,
    body: Bytes,
) -> StatusCode {
    info!("upload {}/{} ({} bytes)", owner, file, body.len());
    state.note_version(&owner, &file, &body);
    state.blobs.insert(format!("{}/{}", owner, file), body);
    StatusCode::NO_CONTENT
}

async fn download_blob(
    State(state): State<Arc<AppState>>,
    Path((owner, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let key = format!("{}/{}", owner, file);
    let blob = state
        .blobs
        .get(&key)
        .map(|b| b.clone())
        .ok_or(ApiError::NotFound(key))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], blob).into_response())
}

async fn remove_blob(
    State(state): State<Arc<AppState>>,
    Path((owner, file)): Path<(String, String)>,
) -> StatusCode {
    state.blobs.remove(&format!("{}/{}", owner, file));
    StatusCode::NO_CONTENT
}

async fn list_records(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Json<Vec<FileRecord>> {
    let mut records: Vec<FileRecord> = state
        .records
        .iter()
        .filter(|entry| entry.key().0 == owner)
        .map(|entry| entry.value().clone())
        .collect();
    records.sort_by(|a, b| a.file_name.cmp(&b.file_name).then_with(|| a.id.cmp(&b.id)));
    Json(records)
}

async fn upsert_record(
    State(state): State<Arc<AppState>>,
    Path((owner, id)): Path<(String, String)>,
    Json(record): Json<FileRecord>,
) -> Result<Json<FileRecord>, ApiError> {
    if record.user_id != owner || record.id != id {
        return Err(ApiError::BadRequest(format!(
            "record {}/{} does not match path {}/{}",
            record.user_id, record.id, owner, id
        )));
    }
    state.records.insert((owner, id), record.clone());
    Ok(Json(record))
}

async fn select_record(
    State(state): State<Arc<AppState>>,
    Path((owner, id)): Path<(String, String)>,
) -> Result<Json<FileRecord>, ApiError> {
    let key = (owner, id);
    state
        .records
        .get(&key)
        .map(|r| Json(r.clone()))
        .ok_or_else(|| ApiError::NotFound(format!("{}/{}", key.0, key.1)))
}

async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path((owner, id)): Path<(String, String)>,
) -> StatusCode {
    state.records.remove(&(owner, id));
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn send(state: &Arc<AppState>, method: &str, uri: &str, body: Body) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap();
        app(state.clone()).oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = Arc::new(AppState::new());
        let response = send(&state, "GET", "/health", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn test_blob_round_trip() {
        let state = Arc::new(AppState::new());
        let doc = r#"{"version":"3.0","groups":[]}"#;

        let response = send(&state, "PUT", "/storage/alice/doc-1.json", Body::from(doc)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = send(&state, "GET", "/storage/alice/doc-1.json", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, doc);

        let response = send(&state, "DELETE", "/storage/alice/doc-1.json", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&state, "GET", "/storage/alice/doc-1.json", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_records() {
        let state = Arc::new(AppState::new());
        let record = FileRecord::new("alice", "doc-1", "Homework", 2);
        let json = serde_json::to_string(&record).unwrap();

        let response = send(&state, "PUT", "/files/alice/doc-1", Body::from(json.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&state, "GET", "/files/alice/doc-1", Body::empty()).await;
        let loaded: FileRecord = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(loaded, record);

        let response = send(&state, "GET", "/files/alice", Body::empty()).await;
        let list: Vec<FileRecord> = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(list.len(), 1);
        let response = send(&state, "GET", "/files/bob", Body::empty()).await;
        assert_eq!(body_text(response).await, "[]");

        let response = send(&state, "DELETE", "/files/alice/doc-1", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = send(&state, "GET", "/files/alice/doc-1", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_record_path_mismatch() {
        let state = Arc::new(AppState::new());
        let record = FileRecord::new("alice", "doc-1", "Homework", 2);
        let json = serde_json::to_string(&record).unwrap();
        let response = send(&state, "PUT", "/files/bob/doc-1", Body::from(json)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_records_version() {
        let state = Arc::new(AppState::new());
        let record = FileRecord::new("alice", "doc-1", "Homework", 2);
        send(&state, "PUT", "/files/alice/doc-1", Body::from(serde_json::to_string(&record).unwrap())).await;

        let doc = r#"{"version":"3.0","groups":[]}"#;
        send(&state, "PUT", "/storage/alice/doc-1.json", Body::from(doc)).await;
        let version = state
            .records
            .get(&("alice".to_string(), "doc-1".to_string()))
            .map(|r| r.version);
        assert_eq!(version, Some(3));

        // Unreadable blobs are stored but leave the row alone.
        send(&state, "PUT", "/storage/alice/doc-1.json", Body::from("not json")).await;
        let version = state
            .records
            .get(&("alice".to_string(), "doc-1".to_string()))
            .map(|r| r.version);
        assert_eq!(version, Some(3));
    }
}
