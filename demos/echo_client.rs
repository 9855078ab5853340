//! Echo client against a running server.
//!
//! Demonstrates:
//! - Building a Socket from a base URL
//! - Correlated request/reply over whichever transport is available
//! - Unsolicited server events
//! - Graceful shutdown with the disconnect notice
//!
//! Usage:
//!   cargo run --example echo_client -- http://localhost:8080/api
//!   cargo run --example echo_client -- http://localhost:8080/api --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use echo_socket::{ConnectionState, Result, Socket};
use serde_json::json;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    base_url: String,
    debug: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        Self {
            base_url: args
                .iter()
                .find(|a| !a.starts_with("--"))
                .cloned()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            debug: args.iter().any(|a| a == "--debug"),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "echo_socket=debug"
    } else {
        "echo_socket=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== Echo Client ===\n");

    let socket = Socket::builder()
        .base_url(args.base_url.as_str())
        .request_timeout(Duration::from_secs(5))
        .build()?;

    println!("[Setup] Client id: {}", socket.client_id());
    println!("        WebSocket: {}", socket.endpoints().websocket);
    println!("        HTTP:      {}\n", socket.endpoints().http);

    socket.set_unsolicited_handler(|frame| {
        println!("[Server] {} {}", frame.event, frame.data);
    });

    // Give the persistent connection a moment; requests fall back to HTTP meanwhile
    let mut state = socket.subscribe_state();
    let _ = tokio::time::timeout(
        Duration::from_secs(2),
        state.wait_for(|s| *s == ConnectionState::Open),
    )
    .await;
    println!("[State] {}\n", socket.state());

    for n in 1..=3 {
        match socket.send("echo", json!({ "n": n, "text": "hello" })).await {
            Ok(reply) => println!("[Echo {n}] {reply}"),
            Err(e) => println!("[Echo {n}] failed: {e}"),
        }
    }

    println!(
        "\n[Stats] connection attempts: {}, fallback calls: {}",
        socket.connection_attempts(),
        socket.fallback_calls()
    );

    socket.shutdown().await;
    println!("[Done] Socket shut down");

    Ok(())
}
