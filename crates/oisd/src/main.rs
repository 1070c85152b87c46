use anyhow::Result;
use clap::{Parser, Subcommand};
use ois_server::ServerConfig;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "oisd",
    about = "oisd — relays URLs from a VM guest to Safari on the host",
    version
)]
struct Cli {
    /// Log level filter, e.g. info or debug (default: derived from $OIS_VERBOSE)
    #[arg(long, global = true, env = "OIS_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay HTTP server (default)
    Serve {
        /// Port to listen on (overrides $OIS_PORT, default 51888)
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind (overrides $OIS_BIND, default 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
        /// Log URLs instead of opening them (same as OIS_DRY_RUN=true)
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective configuration with the token redacted
    Config,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal; the LaunchAgent sets the environment directly.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let cfg = ServerConfig::from_env();

    let filter = cli
        .log_level
        .clone()
        .unwrap_or_else(|| default_filter(cfg.verbose).to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        bind: None,
        dry_run: false,
    }) {
        Commands::Serve {
            port,
            bind,
            dry_run,
        } => cmd_serve(cfg, port, bind, dry_run).await,
        Commands::Config => {
            cmd_config(&cfg);
            Ok(())
        }
    }
}

/// Quiet mode still shows the startup banner.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn,ois_server::server=info"
    }
}

// ── Command implementations ───────────────────────────────────────────────────

async fn cmd_serve(
    mut cfg: ServerConfig,
    port: Option<u16>,
    bind: Option<String>,
    dry_run: bool,
) -> Result<()> {
    if let Some(port) = port {
        cfg.port = port;
    }
    if let Some(bind) = bind {
        cfg.bind = bind;
    }
    cfg.dry_run |= dry_run;

    ois_server::run(cfg).await
}

fn cmd_config(cfg: &ServerConfig) {
    println!("version          {}", ois_server::VERSION);
    println!("listen           {}:{}", cfg.bind, cfg.port);
    println!("allowed subnets  {}", cfg.subnets_display());
    println!("token            {}", cfg.redacted_token());
    println!("browser          {}", cfg.browser);
    println!("dry run          {}", cfg.dry_run);
    println!("verbose          {}", cfg.verbose);
    println!("open timeout     {}s", cfg.open_timeout.as_secs());
}
