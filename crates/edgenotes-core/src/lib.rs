//! Platform-neutral core for the EdgeNotes starter: data model, storage
//! seams, and the request-handling logic shared by every adapter.

pub mod bindings;
pub mod blob;
pub mod db;
pub mod error;
pub mod note;
pub mod repo;
pub mod schema;
pub mod service;
