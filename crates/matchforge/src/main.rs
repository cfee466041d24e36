//! Matchforge server binary.
//!
//! Takes exactly one argument: the listen port.

use matchforge::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("matchforge <port>");
        std::process::exit(1);
    }
    let port: u16 = match args[1].parse() {
        Ok(port) => port,
        Err(_) => {
            eprintln!("matchforge <port>");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = match Server::builder()
        .bind(&format!("0.0.0.0:{port}"))
        .build()
        .await
    {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "failed to start server");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "server terminated");
        std::process::exit(1);
    }
}
