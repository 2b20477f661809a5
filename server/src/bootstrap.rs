//! Startup sequence.
//!
//! The process has two states, starting and listening, and moves from one to
//! the other exactly once:
//!
//! 1. Initiate the database connection (fire-and-forget)
//! 2. Read the SDL file
//! 3. Compile it against the MongoDB directive set and the resolver map
//! 4. Build the HTTP application
//! 5. Bind the listener and announce it
//!
//! Any failure before the listener is bound aborts startup.
//!
//! # Example
//!
//! ```rust,ignore
//! Bootstrap::new(Config::from_env()?, MongoConnector, resolver_map())
//!     .prepare()?
//!     .bind()
//!     .await?
//!     .serve()
//!     .await?;
//! ```

use crate::config::{Config, ConfigError};
use crate::database::{DatabaseConnector, DatabaseHandle, MongoConnector};
use crate::resolvers::resolver_map;
use axum::Router;
use sdl_gateway_schema::{compile_schema, ResolverMap, SchemaError, MONGODB_DIRECTIVES};
use sdl_gateway_web::{graphql_router, JwtVerifier};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::net::TcpListener;

/// Startup failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The SDL file cannot be read.
    #[error("cannot read schema file {path}: {source}")]
    SchemaFile {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The SDL does not compile.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The listener cannot be bound.
    #[error("cannot bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// The two lines announced once the listener is bound.
#[must_use]
pub fn startup_messages(port: u16) -> [String; 2] {
    [
        format!("Server started on port {port}."),
        format!("http://localhost:{port}/"),
    ]
}

/// Startup inputs.
pub struct Bootstrap<C> {
    config: Config,
    connector: C,
    resolvers: ResolverMap,
}

impl<C: DatabaseConnector> Bootstrap<C> {
    /// Collect everything startup needs.
    #[must_use]
    pub const fn new(config: Config, connector: C, resolvers: ResolverMap) -> Self {
        Self {
            config,
            connector,
            resolvers,
        }
    }

    /// Run steps 1 to 4: connect, read, compile, build the application.
    ///
    /// The connection attempt is initiated first, so it happens even when
    /// the schema turns out to be unusable.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::SchemaFile`] if the SDL file cannot be read
    /// and [`BootstrapError::Schema`] if it does not compile.
    pub fn prepare(self) -> Result<Prepared, BootstrapError> {
        let Self {
            config,
            connector,
            resolvers,
        } = self;

        let database = connector.initiate(&config.database);

        let path = &config.server.schema_file;
        let sdl = std::fs::read_to_string(path).map_err(|source| BootstrapError::SchemaFile {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = sdl.len(), "Schema file loaded");

        let resolvers = resolvers.data(database.clone());
        let schema = compile_schema(MONGODB_DIRECTIVES, &sdl, resolvers)?;
        tracing::debug!(query = schema.query_type(), "Schema compiled");

        let verifier = JwtVerifier::hs256(config.auth.jwt_secret.as_bytes());
        let router = graphql_router(schema, verifier);

        Ok(Prepared {
            config,
            router,
            database,
        })
    }

    /// Prepare, bind and serve until the process is terminated.
    ///
    /// # Errors
    ///
    /// Returns the first [`BootstrapError`] encountered.
    pub async fn run(self) -> Result<(), BootstrapError> {
        self.prepare()?.bind().await?.serve().await
    }
}

impl<C> std::fmt::Debug for Bootstrap<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("config", &self.config)
            .field("resolvers", &self.resolvers)
            .finish_non_exhaustive()
    }
}

/// A fully built application that is not listening yet.
#[derive(Debug)]
pub struct Prepared {
    config: Config,
    router: Router,
    database: DatabaseHandle,
}

impl Prepared {
    /// The HTTP application.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The database handle shared with resolvers.
    #[must_use]
    pub const fn database(&self) -> &DatabaseHandle {
        &self.database
    }

    /// Bind the listener and log the startup messages.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Bind`] if the address cannot be bound.
    pub async fn bind(self) -> Result<Listening, BootstrapError> {
        let addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| BootstrapError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| BootstrapError::Bind { addr, source })?;

        for line in startup_messages(local_addr.port()) {
            tracing::info!("{line}");
        }

        Ok(Listening {
            listener,
            router: self.router,
            local_addr,
        })
    }
}

/// A bound listener with its application.
#[derive(Debug)]
pub struct Listening {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
}

impl Listening {
    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests until the process is terminated.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Serve`] if the server stops with an error.
    pub async fn serve(self) -> Result<(), BootstrapError> {
        axum::serve(self.listener, self.router)
            .await
            .map_err(BootstrapError::Serve)
    }
}

/// Load configuration from the environment and run the gateway with the
/// MongoDB connector and the bundled resolvers.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] encountered.
pub async fn run() -> Result<(), BootstrapError> {
    let config = Config::from_env()?;
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        schema = %config.server.schema_file.display(),
        "Configuration loaded"
    );

    Bootstrap::new(config, MongoConnector, resolver_map())
        .run()
        .await
}
