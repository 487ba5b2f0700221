//! Application state: the shared SQLite connection.
//!
//! rusqlite is synchronous, so handlers hand their storage work to `run`,
//! which takes the lock on tokio's blocking pool and releases it as soon as
//! the closure returns.

use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::config::{load_config_from_env, AppConfig};
use crate::db::open_database;
use crate::error::{ApiError, DatabaseError};
use crate::seeds::apply_seeds;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Build state from env: load config, open + migrate the database, apply seeds.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, DatabaseError> {
        Self::with_config(&load_config_from_env())
    }

    pub fn with_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        let mut conn = open_database(&config.database_path)?;
        let summary = apply_seeds(&mut conn, config)?;
        info!(
            target: "haven_backend",
            database_path = %config.database_path,
            instruments = summary.instruments,
            recommendations = summary.recommendations,
            hotlines = summary.hotlines,
            challenges = summary.challenges,
            "Storage ready"
        );
        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Fresh in-memory database with the built-in seeds (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Self {
        let config = AppConfig {
            database_path: ":memory:".into(),
            ..AppConfig::default()
        };
        Self::with_config(&config).expect("in-memory state")
    }

    /// Run `f` with exclusive access to the connection on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db.blocking_lock();
            f(&mut conn)
        })
        .await
        .map_err(ApiError::internal)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_serializes_access_to_the_connection() {
        let state = AppState::in_memory();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = state.clone();
                tokio::spawn(async move {
                    state
                        .run(move |conn| {
                            conn.execute(
                                "INSERT INTO schema_version (version) VALUES (?1)",
                                [100 + i],
                            )?;
                            Ok(())
                        })
                        .await
                })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let count: i64 = state
            .run(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM schema_version WHERE version >= 100",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(count, 8);
    }

    #[tokio::test]
    async fn run_propagates_closure_errors() {
        let state = AppState::in_memory();
        let err = state
            .run(|_| Err::<(), _>(ApiError::bad_request("nope")))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
