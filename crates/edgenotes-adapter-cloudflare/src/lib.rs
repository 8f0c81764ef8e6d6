//! Cloudflare Workers adapter: D1 and R2 behind the core seams, plus
//! the `fetch` entry point.
//!
//! The worker-facing modules are gated to `wasm32`; on native targets
//! only the platform-free helpers compile, so the workspace still
//! builds and tests as a whole. End-to-end coverage of the worker
//! itself runs through `wrangler dev` against the deployed bundle, not
//! through cargo.

#![cfg_attr(target_arch = "wasm32", no_main)]

#[cfg(target_arch = "wasm32")]
mod blob;
#[cfg(target_arch = "wasm32")]
mod db;
pub mod mime;
#[cfg(target_arch = "wasm32")]
mod routes;

#[cfg(target_arch = "wasm32")]
pub use blob::R2Store;
#[cfg(target_arch = "wasm32")]
pub use db::D1Store;
#[cfg(target_arch = "wasm32")]
pub use routes::{bindings_from_env, handle};

#[cfg(target_arch = "wasm32")]
use worker::{event, Context, Env, Request, Response};

#[cfg(target_arch = "wasm32")]
#[event(fetch)]
pub async fn main(req: Request, env: Env, ctx: Context) -> worker::Result<Response> {
    routes::handle(req, env, ctx).await
}
