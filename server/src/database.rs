//! Document database connection.
//!
//! Startup initiates exactly one connection attempt and moves on without
//! waiting for it. The attempt runs in a background task that fills a
//! [`DatabaseHandle`] once the cluster answers a ping. A failed attempt is
//! absorbed: it is never retried or reported to clients, only traced at
//! `debug`, and resolvers see a handle that stays empty.

use crate::config::DatabaseConfig;
use mongodb::{bson::doc, Client, Database};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Starts the connection attempt.
///
/// Implementations must return immediately; any I/O happens in the
/// background.
pub trait DatabaseConnector: Send + Sync {
    /// Initiate one connection attempt for `config`.
    fn initiate(&self, config: &DatabaseConfig) -> DatabaseHandle;
}

/// Shared slot for the database, written at most once.
///
/// Cloned into the schema data so resolvers can reach it with
/// `ctx.data::<DatabaseHandle>()`.
#[derive(Debug, Clone, Default)]
pub struct DatabaseHandle {
    database: Arc<OnceCell<Database>>,
}

impl DatabaseHandle {
    /// An empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The database, once the connection attempt has succeeded.
    #[must_use]
    pub fn get(&self) -> Option<&Database> {
        self.database.get()
    }

    /// Whether the connection attempt has succeeded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.database.initialized()
    }

    /// Fill the handle. Returns `false` if it was already filled.
    pub fn fill(&self, database: Database) -> bool {
        self.database.set(database).is_ok()
    }
}

/// Connects to MongoDB Atlas with the official driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

impl DatabaseConnector for MongoConnector {
    fn initiate(&self, config: &DatabaseConfig) -> DatabaseHandle {
        let handle = DatabaseHandle::new();
        let slot = handle.clone();
        let uri = config.uri();
        let name = config.name.clone();
        let cluster = config.cluster.clone();

        tokio::spawn(async move {
            match connect(&uri, &name).await {
                Ok(database) => {
                    slot.fill(database);
                    tracing::info!(database = %name, cluster = %cluster, "Database connected");
                }
                Err(e) => {
                    tracing::debug!(
                        database = %name,
                        cluster = %cluster,
                        error = %e,
                        "Database connection failed"
                    );
                }
            }
        });

        tracing::debug!(database = %config.name, cluster = %config.cluster, "Database connection initiated");
        handle
    }
}

async fn connect(uri: &str, name: &str) -> mongodb::error::Result<Database> {
    let client = Client::with_uri_str(uri).await?;
    let database = client.database(name);
    database.run_command(doc! { "ping": 1 }).await?;
    Ok(database)
}
