//! Courier terminal client entry point.

use std::{num::NonZeroUsize, time::Duration};

use clap::Parser;
use courier_cli::{CliError, Runtime, SocketDriver, console};
use courier_client::{ClientConfig, DEFAULT_PAGE_SIZE, RoomId, transport::TransportConfig};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Courier chat client
#[derive(Parser, Debug)]
#[command(name = "courier")]
#[command(about = "Terminal client for Courier real-time chat")]
#[command(version)]
struct Args {
    /// HTTP base URL of the chat API; the socket endpoint is derived from it
    #[arg(long, env = "COURIER_BASE_URL")]
    base_url: Url,

    /// Messages per history page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: NonZeroUsize,

    /// Delay before reconnecting after an unexpected closure
    #[arg(long, default_value_t = 1000)]
    reconnect_delay_ms: u64,

    /// Room to join on connect
    #[arg(long)]
    room: Option<RoomId>,

    /// Session token sent as the `jwt` cookie
    #[arg(long, env = "COURIER_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Start authorized instead of waiting for /login
    #[arg(long)]
    authorized: bool,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn client_config(&self) -> Result<ClientConfig, CliError> {
        let mut config = ClientConfig::from_base_url(&self.base_url)?;
        config.page_size = self.page_size;
        config.initial_room = self.room;
        config.connection.reconnect_delay = Duration::from_millis(self.reconnect_delay_ms);
        Ok(config)
    }

    fn transport_config(&self) -> TransportConfig {
        TransportConfig { session_token: self.session_token.clone(), ..TransportConfig::default() }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = args.client_config()?;
    tracing::info!(endpoint = %config.connection.endpoint, "courier starting");

    let (auth_tx, auth_rx) = mpsc::unbounded_channel();
    auth_tx.send(args.authorized)?;
    let driver = SocketDriver::new(args.transport_config());
    let (mut runtime, handle) = Runtime::new(driver, config, auth_rx);
    console::attach(runtime.client_mut());

    let runtime_task = tokio::spawn(runtime.run());
    console::run(handle, auth_tx).await?;
    runtime_task.await??;

    Ok(())
}
