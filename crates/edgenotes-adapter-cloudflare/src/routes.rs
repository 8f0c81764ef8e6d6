//! The EdgeNotes HTTP surface on Cloudflare Workers.
//!
//! Routing is a plain match on method and path; the worker runtime
//! hands every invocation its own `Env`, so bindings are resolved per
//! request and the schema memo lives in a process-wide static that
//! survives for the lifetime of the isolate.

use std::sync::Arc;

use percent_encoding::percent_decode_str;
use serde_json::json;
use worker::{Context, Env, FormEntry, Headers, Method, Request, Response};

use edgenotes_core::bindings::Bindings;
use edgenotes_core::blob::BlobStore;
use edgenotes_core::db::Database;
use edgenotes_core::error::NoteError;
use edgenotes_core::service::{CreateNoteForm, NotesApp, UploadedImage};

use crate::blob::R2Store;
use crate::db::D1Store;

const IMAGES_ROUTE_PREFIX: &str = "/api/images/";

/// Resolve whichever bindings this deployment configured. Missing ones
/// stay `None`; the app reports them instead of crashing.
pub fn bindings_from_env(env: &Env) -> Bindings {
    let database = D1Store::from_env(env).map(|store| Arc::new(store) as Arc<dyn Database>);
    let images = R2Store::from_env(env).map(|store| Arc::new(store) as Arc<dyn BlobStore>);
    Bindings::new(database, images)
}

/// Entry point called from the `fetch` event.
pub async fn handle(mut req: Request, env: Env, _ctx: Context) -> worker::Result<Response> {
    let app = NotesApp::new(bindings_from_env(&env));
    let url = req.url()?;
    let path = url.path().to_string();

    match (req.method(), path.as_str()) {
        (Method::Get, "/") => Response::ok("EdgeNotes worker"),
        (Method::Get, "/api/hello") => hello(&app),
        (Method::Get, "/api/notes") => list_notes(&app).await,
        (Method::Post, "/api/notes") => create_note(&app, &mut req).await,
        (Method::Get, path) if path.starts_with(IMAGES_ROUTE_PREFIX) => {
            serve_image(&app, &path[IMAGES_ROUTE_PREFIX.len()..]).await
        }
        // A bare /api/images has no key to serve.
        (Method::Get, "/api/images") => serve_image(&app, "").await,
        _ => Response::error("Not Found", 404),
    }
}

fn error_response(err: &NoteError) -> worker::Result<Response> {
    Ok(Response::from_json(&err.to_json())?.with_status(err.status().as_u16()))
}

fn hello(app: &NotesApp) -> worker::Result<Response> {
    Response::from_json(&json!({
        "message": "Hello from EdgeNotes!",
        "docs": {
            "workers": "https://developers.cloudflare.com/workers/",
            "d1": "https://developers.cloudflare.com/d1/",
            "r2": "https://developers.cloudflare.com/r2/",
        },
        "bindings": app.status(),
    }))
}

async fn list_notes(app: &NotesApp) -> worker::Result<Response> {
    match app.list_notes().await {
        Ok(notes) => Response::from_json(&json!({ "notes": notes })),
        Err(err) => error_response(&err),
    }
}

async fn create_note(app: &NotesApp, req: &mut Request) -> worker::Result<Response> {
    let form = match read_create_form(req).await {
        Ok(form) => form,
        Err(err) => return error_response(&err),
    };
    Response::from_json(&app.create_note(form).await)
}

async fn serve_image(app: &NotesApp, raw_key: &str) -> worker::Result<Response> {
    let key = match percent_decode_str(raw_key).decode_utf8() {
        Ok(key) => key.into_owned(),
        Err(_) => {
            return error_response(&NoteError::bad_request("image key is not valid UTF-8"))
        }
    };

    let object = match app.fetch_image(&key).await {
        Ok(object) => object,
        Err(err) => return error_response(&err),
    };

    let mut headers = Headers::new();
    headers.set("Content-Type", &object.content_type)?;
    headers.set("Cache-Control", "public, max-age=3600")?;
    if let Some(etag) = object.etag.as_deref() {
        headers.set("ETag", etag)?;
    }
    Ok(Response::from_bytes(object.bytes.to_vec())?.with_headers(headers))
}

/// Collect the multipart fields into a [`CreateNoteForm`]. An `image`
/// entry that is a plain field rather than a file is left unset.
async fn read_create_form(req: &mut Request) -> Result<CreateNoteForm, NoteError> {
    let form_data = req
        .form_data()
        .await
        .map_err(|err| NoteError::bad_request(format!("invalid multipart payload: {err}")))?;

    let mut form = CreateNoteForm::default();
    if let Some(FormEntry::Field(value)) = form_data.get("type") {
        form.kind = Some(value);
    }
    if let Some(FormEntry::Field(value)) = form_data.get("content") {
        form.content = Some(value);
    }
    if let Some(FormEntry::Field(value)) = form_data.get("caption") {
        form.caption = Some(value);
    }
    if let Some(FormEntry::File(file)) = form_data.get("image") {
        let filename = file.name();
        let bytes = file
            .bytes()
            .await
            .map_err(|err| NoteError::bad_request(format!("unreadable image upload: {err}")))?;
        let content_type = crate::mime::content_type_for(&filename).to_string();
        form.image = Some(UploadedImage {
            filename,
            content_type,
            bytes: bytes.into(),
        });
    }
    Ok(form)
}
