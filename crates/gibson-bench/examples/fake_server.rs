//! Local stand-in for a Gibson server, for trying the benchmark by hand:
//!
//! ```text
//! cargo run --example fake_server
//! cargo run -- -d tcp://127.0.0.1:10128 -c 10 -r 1000
//! ```

use std::error::Error;

use tokio::net::TcpListener;

#[path = "../tests/support/fake_server.rs"]
mod fake_server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:10128".to_string());
    let listener = TcpListener::bind(&addr).await?;

    println!("🚀 Fake Gibson server listening on {}", addr);

    fake_server::accept_loop(listener).await?;
    Ok(())
}
