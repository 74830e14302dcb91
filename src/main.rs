//! hyp - command-line access to a Hypothes.is annotation store.
//!
//! Searches, publishes private annotations to the public group and manages
//! group membership on top of the `hypothesis_client` library.

mod cli;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let default_filter = if cli::is_verbose() {
        "hypothesis_client=info,hyp=info"
    } else {
        "hypothesis_client=warn,hyp=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    cli::run().await
}
