//! Coordinator service entry point.

use clap::Parser;
use coordinator::http::build_routes;
use coordinator::{AppState, CoordinatorConfig};
use ledger::FakeLedgerAdapter;
use repository::InMemoryRepository;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warp::Filter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bind address. Overrides `COORDINATOR_BIND_ADDRESS` when set.
    #[arg(long)]
    bind_address: Option<String>,

    /// Port. Overrides `COORDINATOR_PORT` when set.
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory for the repository journal and file-fallback pool index.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Enable permissive CORS (demo/dev use).
    #[arg(long)]
    enable_cors: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = CoordinatorConfig::from_env();
    if let Some(bind_address) = args.bind_address {
        config.bind_address = bind_address;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir.to_string_lossy().into_owned();
    }
    config.validate().map_err(|e| format!("invalid configuration: {e}"))?;

    init_tracing(&config.log_format);

    info!("Starting AMM coordinator");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(bind_address = %config.bind_address, port = config.port, "configuration loaded");

    std::fs::create_dir_all(&config.data_dir)?;

    // No concrete RPC-backed ledger client ships in this workspace (§4.2's
    // adapter boundary is the only thing above it may depend on); the
    // bundled fake implementation and in-process repository back the
    // runnable binary until a real client is wired in behind the same
    // traits.
    let adapter: Arc<dyn ledger::LedgerAdapter> = Arc::new(FakeLedgerAdapter::new());
    let repository: Arc<dyn repository::Repository> =
        Arc::new(InMemoryRepository::with_journal(PathBuf::from(&config.data_dir).join("journal.log")));

    let state = AppState::new(adapter, repository, config.clone());
    state.initialize().await?;

    let addr: std::net::SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .map_err(|e| format!("invalid bind address: {e}"))?;

    let routes = build_routes(state);
    let enable_cors = args.enable_cors;

    let server_handle = tokio::spawn(async move {
        if enable_cors {
            let routes = routes.with(warp::cors().allow_any_origin());
            warp::serve(routes).run(addr).await;
        } else {
            warp::serve(routes).run(addr).await;
        }
    });

    let shutdown_signal = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL+C signal handler");
        info!("shutdown signal received");
    };

    tokio::select! {
        result = server_handle => {
            if let Err(e) = result {
                error!("HTTP server task failed: {e}");
                return Err(e.into());
            }
        }
        _ = shutdown_signal => {
            info!("shutting down coordinator");
        }
    }

    Ok(())
}

fn init_tracing(log_format: &str) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "coordinator=info,warn".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
