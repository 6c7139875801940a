mod client;
mod markdown;
mod session;
mod ui;

use client::ChatClient;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Diagnostics go to stderr and stay off unless RUST_LOG asks for them;
    // the conversation itself never shows raw errors.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let client = ChatClient::new();

    ui::run_tui(client)
}
