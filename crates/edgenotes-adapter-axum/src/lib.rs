//! Local development adapter: the EdgeNotes HTTP surface served by
//! axum, backed by SQLite and an in-memory blob store.

pub mod blob;
pub mod db;
pub mod routes;
pub mod server;

pub use blob::MemoryBlobStore;
pub use db::SqliteDatabase;
pub use routes::{router, AppState};
pub use server::{DevServer, DevServerConfig};
