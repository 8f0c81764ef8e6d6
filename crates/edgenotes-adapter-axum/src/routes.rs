//! The EdgeNotes HTTP surface wired into an axum router.
//!
//! Core service futures are `?Send` (the seams are shared with the
//! wasm adapter), so handlers drive them to completion with
//! `task::block_in_place` + `Handle::current().block_on` instead of
//! awaiting them directly. This requires the multi-thread runtime.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use serde_json::json;
use tokio::runtime::Handle;
use tokio::task;

use edgenotes_core::bindings::Bindings;
use edgenotes_core::blob::BlobStore;
use edgenotes_core::db::Database;
use edgenotes_core::error::NoteError;
use edgenotes_core::schema::SchemaBootstrap;
use edgenotes_core::service::{CreateNoteForm, NotesApp, UploadedImage, MAX_IMAGE_BYTES};

use crate::blob::MemoryBlobStore;
use crate::db::SqliteDatabase;

/// Shared state behind every route: the concrete local backends plus
/// the schema memo. Concrete types (not trait objects) so the state
/// stays `Send + Sync` for axum.
#[derive(Clone)]
pub struct AppState {
    db: Arc<SqliteDatabase>,
    blobs: Arc<MemoryBlobStore>,
    schema: Arc<SchemaBootstrap>,
}

impl AppState {
    pub fn new(db: Arc<SqliteDatabase>, blobs: Arc<MemoryBlobStore>) -> Self {
        Self {
            db,
            blobs,
            schema: SchemaBootstrap::shared(),
        }
    }

    /// State with a fresh schema memo, so tests do not share the
    /// process-wide one across isolated databases.
    pub fn with_fresh_schema(db: Arc<SqliteDatabase>, blobs: Arc<MemoryBlobStore>) -> Self {
        Self {
            db,
            blobs,
            schema: Arc::new(SchemaBootstrap::new()),
        }
    }
}

fn notes_app(state: &AppState) -> NotesApp {
    let bindings = Bindings::new(
        Some(state.db.clone() as Arc<dyn Database>),
        Some(state.blobs.clone() as Arc<dyn BlobStore>),
    );
    NotesApp::with_schema(bindings, state.schema.clone())
}

/// Build the dev router. The body limit sits above the 5 MiB image
/// ceiling so oversized uploads reach the descriptive validation error
/// instead of a bare 413.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/hello", get(hello))
        .route("/api/notes", get(list_notes).post(create_note))
        .route("/api/images/{*key}", get(serve_image))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024))
        .with_state(state)
}

fn error_response(err: &NoteError) -> Response {
    (err.status(), Json(err.to_json())).into_response()
}

async fn index() -> &'static str {
    "EdgeNotes dev server"
}

async fn hello(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = notes_app(&state).status();
    Json(json!({
        "message": "Hello from EdgeNotes!",
        "docs": {
            "workers": "https://developers.cloudflare.com/workers/",
            "d1": "https://developers.cloudflare.com/d1/",
            "r2": "https://developers.cloudflare.com/r2/",
        },
        "bindings": status,
    }))
}

async fn list_notes(State(state): State<AppState>) -> Response {
    let result = task::block_in_place(|| {
        Handle::current().block_on(async { notes_app(&state).list_notes().await })
    });
    match result {
        Ok(notes) => Json(json!({ "notes": notes })).into_response(),
        Err(err) => error_response(&err),
    }
}

async fn create_note(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let form = match read_create_form(&mut multipart).await {
        Ok(form) => form,
        Err(err) => return error_response(&err),
    };
    let action = task::block_in_place(|| {
        Handle::current().block_on(async { notes_app(&state).create_note(form).await })
    });
    Json(action).into_response()
}

async fn serve_image(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let result = task::block_in_place(|| {
        Handle::current().block_on(async { notes_app(&state).fetch_image(&key).await })
    });
    let object = match result {
        Ok(object) => object,
        Err(err) => return error_response(&err),
    };

    let mut response = Response::new(Body::from(object.bytes));
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&object.content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );
    if let Some(etag) = object.etag.as_deref() {
        if let Ok(value) = HeaderValue::from_str(etag) {
            headers.insert(header::ETAG, value);
        }
    }
    response
}

/// Collect the multipart fields into a [`CreateNoteForm`]. An `image`
/// field without a filename is not a file upload and is left unset.
async fn read_create_form(multipart: &mut Multipart) -> Result<CreateNoteForm, NoteError> {
    let mut form = CreateNoteForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| NoteError::bad_request(format!("invalid multipart payload: {err}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "type" => {
                form.kind = Some(field.text().await.map_err(invalid_field)?);
            }
            "content" => {
                form.content = Some(field.text().await.map_err(invalid_field)?);
            }
            "caption" => {
                form.caption = Some(field.text().await.map_err(invalid_field)?);
            }
            "image" => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(invalid_field)?;
                if let Some(filename) = filename {
                    form.image = Some(UploadedImage {
                        filename,
                        content_type,
                        bytes: Bytes::from(bytes),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

fn invalid_field(err: axum::extract::multipart::MultipartError) -> NoteError {
    NoteError::bad_request(format!("invalid multipart field: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use tower::ServiceExt;

    const BOUNDARY: &str = "edgenotes-test-boundary";

    fn test_router() -> Router {
        let db = Arc::new(SqliteDatabase::open_in_memory().unwrap());
        let blobs = Arc::new(MemoryBlobStore::new());
        router(AppState::with_fresh_schema(db, blobs))
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File {
            name: &'a str,
            filename: &'a str,
            content_type: &'a str,
            bytes: &'a [u8],
        },
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File {
                    name,
                    filename,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; \
                             filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn post_note(parts: &[Part<'_>]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/notes")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn hello_reports_available_bindings() {
        let response = test_router()
            .oneshot(Request::builder().uri("/api/hello").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let payload = json_body(response).await;
        assert_eq!(payload["bindings"]["database"], true);
        assert_eq!(payload["bindings"]["images"], true);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn text_note_round_trips_through_the_api() {
        let app = test_router();

        let response = app
            .clone()
            .oneshot(post_note(&[
                Part::Text("type", "text"),
                Part::Text("content", "hello"),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["success"], true);

        let response = app
            .oneshot(Request::builder().uri("/api/notes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let payload = json_body(response).await;
        let notes = payload["notes"].as_array().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0]["type"], "text");
        assert_eq!(notes[0]["content"], "hello");
        assert_eq!(notes[0]["imageKey"], serde_json::Value::Null);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn empty_text_note_is_rejected() {
        let response = test_router()
            .oneshot(post_note(&[
                Part::Text("type", "text"),
                Part::Text("content", "   "),
            ]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"], "Text notes cannot be empty.");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn image_note_is_stored_and_served_back() {
        let app = test_router();

        let response = app
            .clone()
            .oneshot(post_note(&[
                Part::Text("type", "image"),
                Part::Text("caption", "a pic"),
                Part::File {
                    name: "image",
                    filename: "pic.png",
                    content_type: "image/png",
                    bytes: b"0123456789",
                },
            ]))
            .await
            .unwrap();
        let payload = json_body(response).await;
        assert_eq!(payload["success"], true);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/notes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let payload = json_body(response).await;
        let notes = payload["notes"].as_array().unwrap();
        assert_eq!(notes[0]["content"], "a pic");
        let key = notes[0]["imageKey"].as_str().unwrap().to_string();
        assert!(key.starts_with("notes/"));
        assert!(key.ends_with("pic.png"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/images/{key}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=3600"
        );
        assert!(response.headers().get(header::ETAG).is_some());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes.as_ref(), b"0123456789");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn empty_image_payload_is_rejected() {
        let response = test_router()
            .oneshot(post_note(&[
                Part::Text("type", "image"),
                Part::File {
                    name: "image",
                    filename: "pic.png",
                    content_type: "image/png",
                    bytes: b"",
                },
            ]))
            .await
            .unwrap();
        let payload = json_body(response).await;
        assert_eq!(payload["success"], false);
        assert_eq!(payload["error"], "The selected image appears to be empty.");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn absent_image_returns_not_found() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/images/notes/absent.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let payload = json_body(response).await;
        assert_eq!(payload["error"]["status"], 404);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn malformed_multipart_is_a_bad_request() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/notes")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from("this is not multipart"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn index_serves_a_banner() {
        let response = test_router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
