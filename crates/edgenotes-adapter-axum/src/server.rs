//! Blocking dev-server runner around the axum router.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Builder as RuntimeBuilder;
use tokio::signal;

use crate::blob::MemoryBlobStore;
use crate::db::SqliteDatabase;
use crate::routes::{router, AppState};

/// Configuration for the dev server.
///
/// `EDGENOTES_ADDR` overrides the listen address and `EDGENOTES_DB`
/// the database path (`:memory:` for a throwaway database).
#[derive(Clone, Debug)]
pub struct DevServerConfig {
    pub addr: SocketAddr,
    /// `None` means an in-memory database.
    pub db_path: Option<PathBuf>,
    pub enable_ctrl_c: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            db_path: Some(PathBuf::from("edgenotes.sqlite3")),
            enable_ctrl_c: true,
        }
    }
}

impl DevServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("EDGENOTES_ADDR") {
            config.addr = addr
                .parse()
                .with_context(|| format!("invalid EDGENOTES_ADDR: {addr}"))?;
        }
        if let Ok(db) = std::env::var("EDGENOTES_DB") {
            config.db_path = if db == ":memory:" {
                None
            } else {
                Some(PathBuf::from(db))
            };
        }
        Ok(config)
    }
}

/// Blocking runner used by the dev binary.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    pub fn run(self) -> anyhow::Result<()> {
        // block_in_place in the routes requires the multi-thread runtime.
        let runtime = RuntimeBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;
        runtime.block_on(self.run_async())
    }

    async fn run_async(self) -> anyhow::Result<()> {
        let DevServer { config } = self;

        let db = match &config.db_path {
            Some(path) => SqliteDatabase::open(path)
                .with_context(|| format!("failed to open database at {}", path.display()))?,
            None => SqliteDatabase::open_in_memory().context("failed to open database")?,
        };
        let state = AppState::new(Arc::new(db), Arc::new(MemoryBlobStore::new()));

        let listener = StdTcpListener::bind(config.addr)
            .with_context(|| format!("failed to bind dev server to {}", config.addr))?;
        listener
            .set_nonblocking(true)
            .context("failed to set listener to non-blocking")?;
        let listener = tokio::net::TcpListener::from_std(listener)
            .context("failed to adopt std listener into tokio")?;

        log::info!("edgenotes dev server listening on http://{}", config.addr);

        let app = router(state);
        if config.enable_ctrl_c {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = signal::ctrl_c().await;
                })
                .await
                .context("dev server failed")
        } else {
            axum::serve(listener, app).await.context("dev server failed")
        }
    }
}
