//! SDL Gateway server.
//!
//! # Usage
//!
//! ```bash
//! # PORT, DB_NAME, DB_CLUSTER, DB_USERNAME, DB_PASSWORD and JWT_SECRET
//! # are required (a .env file in the working directory is honoured)
//! cargo run --bin sdl-gateway
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    sdl_gateway::run().await?;
    Ok(())
}
