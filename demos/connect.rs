//! Connect to a node and report the negotiated session.
//!
//! Usage:
//!
//! ```text
//! cargo run --example connect -- ws://127.0.0.1:8180 [--debug] [--token <token>]
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use secure_api::{FileStore, Result, SecureApi};
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    endpoint: String,
    debug: bool,
    token: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();

        let endpoint = args
            .iter()
            .find(|a| a.starts_with("ws://") || a.starts_with("wss://"))
            .cloned()
            .unwrap_or_else(|| "ws://127.0.0.1:8180".to_string());

        let token = args
            .iter()
            .position(|a| a == "--token")
            .and_then(|i| args.get(i + 1))
            .cloned();

        Self {
            endpoint,
            debug: args.iter().any(|a| a == "--debug"),
            token,
        }
    }
}

// ============================================================================
// Functions
// ============================================================================

fn init_logging(debug: bool) {
    let default = if debug { "secure_api=debug" } else { "secure_api=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let api = SecureApi::builder()
        .endpoint(&args.endpoint)
        .store(FileStore::default_location()?)
        .connect()?;

    if let Some(token) = &args.token {
        api.update_token(token);
    }

    let mut status = api.subscribe();
    let settled = timeout(
        Duration::from_secs(30),
        status.wait_for(|session| !session.is_connecting),
    )
    .await
    .map(|r| r.map(drop));

    if settled.is_err() {
        println!("Still connecting after 30s, giving up");
    } else if api.needs_token() {
        println!("The node refused to issue a token. Re-run with --token <token>.");
    } else {
        let _ = timeout(
            Duration::from_secs(5),
            status.wait_for(|session| session.metadata.is_some()),
        )
        .await;

        println!("Connected with token {}", api.secure_token());
        println!("Dapps:  {}", api.dapps_url());
        println!("Signer: port {}", api.signer_port());
    }

    api.shutdown();
    Ok(())
}
