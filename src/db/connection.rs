//! Database connection management
//!
//! Connections come from an r2d2 pool and every statement runs on tokio's
//! blocking pool, so a slow write never stalls the async runtime. SQLite's
//! own locking (WAL + busy_timeout) serialises writers; there is no
//! application-level mutex around the connection.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{info, warn};

use super::error::StoreError;
use super::schema::SCHEMA;

const POOL_SIZE: u32 = 8;
const BUSY_TIMEOUT_MS: u32 = 5_000;

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    path: String,
}

impl Database {
    /// Open (or create) the database at `path` and initialise the schema
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {:?}", parent))?;
            }
        }

        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(&format!(
                "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
                BUSY_TIMEOUT_MS
            ))
        });

        let pool = Pool::builder()
            .max_size(POOL_SIZE)
            .connection_timeout(Duration::from_secs(5))
            .build(manager)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        {
            let conn = pool.get().context("Failed to get database connection")?;
            let mode: String = conn
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                .context("Failed to enable WAL journal")?;
            if !mode.eq_ignore_ascii_case("wal") {
                warn!("SQLite refused WAL journal mode, using {}", mode);
            }
            conn.execute_batch(SCHEMA)
                .context("Failed to initialise schema")?;
        }

        info!("Database initialized at {:?}", path);

        Ok(Self {
            pool,
            path: path.to_string_lossy().to_string(),
        })
    }

    /// Run `f` against a pooled connection on the blocking thread pool
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&*conn)
        })
        .await?
    }

    /// Get the database path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check if database is accessible (for health checks)
    pub async fn health_check(&self) -> bool {
        let probe = self
            .with_conn(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(StoreError::from)
            })
            .await;

        match probe {
            Ok(_) => true,
            Err(e) => {
                warn!("Database health check failed: {}", e);
                false
            }
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            path: self.path.clone(),
        }
    }
}
