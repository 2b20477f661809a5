//! # SDL Gateway Testing
//!
//! Fixtures shared by the gateway's integration tests.
//!
//! This crate provides:
//! - Sample SDL documents, valid and broken
//! - Schema files on disk that clean up after themselves
//! - A database connector that only counts how often it was asked to connect
//! - Token minting for the HS256 bearer policy
//! - A log capture for asserting on startup messages
//!
//! ## Example
//!
//! ```ignore
//! use sdl_gateway::{resolver_map, Bootstrap};
//! use sdl_gateway_testing::{test_config, CountingConnector, SchemaFile, SAMPLE_SCHEMA};
//!
//! #[tokio::test]
//! async fn test_startup() {
//!     let schema = SchemaFile::new(SAMPLE_SCHEMA).unwrap();
//!     let connector = CountingConnector::default();
//!
//!     let prepared = Bootstrap::new(test_config(schema.path()), connector.clone(), resolver_map())
//!         .prepare()
//!         .unwrap();
//!
//!     assert_eq!(connector.calls(), 1);
//! }
//! ```

/// Secret used by [`test_config`] and [`mint_token`] callers.
pub const TEST_SECRET: &str = "test-jwt-secret";

/// Valid SDL served by the bundled resolvers, using the MongoDB directives.
pub const SAMPLE_SCHEMA: &str = r#"
"""Arbitrary JSON value."""
scalar JSON

type Viewer @entity(embedded: true) {
  claims: JSON
}

type Query {
  viewer: Viewer
  databaseReady: Boolean!
}
"#;

/// SDL with a syntax error (unterminated type body).
pub const BROKEN_SCHEMA: &str = r"
type Query {
  viewer: Viewer
";

/// Mock implementations.
pub mod mocks {
    use sdl_gateway::{DatabaseConfig, DatabaseConnector, DatabaseHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Connector that records connection attempts and never connects.
    ///
    /// Clones share the counter, so keep one clone to inspect after handing
    /// the other to the bootstrap.
    #[derive(Debug, Clone, Default)]
    pub struct CountingConnector {
        calls: Arc<AtomicUsize>,
    }

    impl CountingConnector {
        /// Number of connection attempts so far.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl DatabaseConnector for CountingConnector {
        fn initiate(&self, _config: &DatabaseConfig) -> DatabaseHandle {
            self.calls.fetch_add(1, Ordering::SeqCst);
            DatabaseHandle::new()
        }
    }
}

/// Test helpers and utilities.
pub mod helpers {
    use super::TEST_SECRET;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use sdl_gateway::{AuthConfig, Config, DatabaseConfig, ServerConfig};
    use std::path::{Path, PathBuf};

    /// Configuration for tests: loopback host, ephemeral port, fixed secret.
    #[must_use]
    pub fn test_config(schema_file: &Path) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                schema_file: schema_file.to_path_buf(),
            },
            database: DatabaseConfig {
                name: "test".to_string(),
                cluster: "cluster0.test".to_string(),
                username: "tester".to_string(),
                password: "secret".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: TEST_SECRET.to_string(),
            },
        }
    }

    /// Sign `claims` with HS256.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialised.
    pub fn mint_token(
        secret: &str,
        claims: &serde_json::Value,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// An SDL file in the temp directory, removed on drop.
    #[derive(Debug)]
    pub struct SchemaFile {
        path: PathBuf,
    }

    impl SchemaFile {
        /// Write `sdl` to a fresh file.
        ///
        /// # Errors
        ///
        /// Returns an error if the file cannot be written.
        pub fn new(sdl: &str) -> std::io::Result<Self> {
            let path = std::env::temp_dir().join(format!("sdl-gateway-{}.gql", uuid::Uuid::new_v4()));
            std::fs::write(&path, sdl)?;
            Ok(Self { path })
        }

        /// A path that does not exist.
        #[must_use]
        pub fn missing() -> Self {
            Self {
                path: std::env::temp_dir().join(format!("sdl-gateway-missing-{}.gql", uuid::Uuid::new_v4())),
            }
        }

        /// Location of the file.
        #[must_use]
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl Drop for SchemaFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Log capture.
pub mod logs {
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory sink for formatted log lines.
    ///
    /// ```ignore
    /// let logs = CapturedLogs::default();
    /// let _guard = tracing::subscriber::set_default(logs.subscriber());
    /// // ...
    /// assert!(logs.contents().contains("Server started on port"));
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct CapturedLogs {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl CapturedLogs {
        /// Everything written so far.
        #[must_use]
        pub fn contents(&self) -> String {
            self.buffer
                .lock()
                .map(|buffer| String::from_utf8_lossy(&buffer).into_owned())
                .unwrap_or_default()
        }

        /// A subscriber writing plain `INFO` and above into this sink.
        #[must_use]
        pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
            tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::INFO)
                .finish()
        }
    }

    /// Writer handed out by [`CapturedLogs`].
    #[derive(Debug)]
    pub struct CapturedWriter {
        buffer: Arc<Mutex<Vec<u8>>>,
    }

    impl io::Write for CapturedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut buffer = self
                .buffer
                .lock()
                .map_err(|_| io::Error::other("log buffer poisoned"))?;
            buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedWriter;

        fn make_writer(&'a self) -> Self::Writer {
            CapturedWriter {
                buffer: Arc::clone(&self.buffer),
            }
        }
    }
}

pub use helpers::{mint_token, test_config, SchemaFile};
pub use logs::CapturedLogs;
pub use mocks::CountingConnector;
