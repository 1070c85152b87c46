mod client;
mod native_host;

use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::client::RelayClient;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "ois",
    about = "ois — guest-side companion for the Open in Safari relay",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RelayArgs {
    /// Relay base URL, e.g. http://10.211.55.2:51888
    #[arg(long, env = "OIS_SERVER", default_value = "http://10.211.55.2:51888")]
    server: String,
    /// Shared token sent as X-OpenInSafari-Token
    #[arg(long, env = "OIS_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// Request timeout (e.g. 5s, 500ms)
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    timeout: Duration,
}

impl RelayArgs {
    fn client(self) -> Result<RelayClient> {
        RelayClient::new(&self.server, self.token, self.timeout)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Native-messaging host: read one JSON message from stdin, open its url
    NativeHost,
    /// Ask the relay whether this machine is authorized
    Ping {
        #[command(flatten)]
        relay: RelayArgs,
    },
    /// Ask the relay to open a URL in Safari on the host
    Open {
        /// http:// or https:// URL
        url: String,
        #[command(flatten)]
        relay: RelayArgs,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // stdout belongs to the reply in native-host mode, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("OIS_LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::NativeHost => native_host::run(),
        Commands::Ping { relay } => cmd_ping(relay).await,
        Commands::Open { url, relay } => cmd_open(relay, &url).await,
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_ping(relay: RelayArgs) -> Result<()> {
    let ping = relay.client()?.ping().await?;
    println!("relay version  {}", ping.version);
    println!("seen as        {}", ping.client_ip);
    println!("ip allowed     {}", ping.allowed);
    println!("token ok       {}", ping.token_ok);
    if !ping.ok {
        bail!("relay would refuse requests from this machine");
    }
    Ok(())
}

async fn cmd_open(relay: RelayArgs, url: &str) -> Result<()> {
    let reply = relay.client()?.open(url).await?;
    if !reply.ok {
        bail!(
            "{}",
            reply.error.unwrap_or_else(|| "relay reported failure".into())
        );
    }
    println!("{}", reply.message.unwrap_or_default());
    Ok(())
}
