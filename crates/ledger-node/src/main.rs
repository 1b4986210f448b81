mod constants;
mod routes;

use axum::http::HeaderValue;
use clap::Parser;
use constants::{DEFAULT_LISTEN, DEFAULT_MINE_TIMEOUT_SECS};
use ledger_core::{constants::DEFAULT_DIFFICULTY, Ledger, LedgerConfig};
use routes::AppState;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:5001
    #[arg(long, env = "LEDGER_LISTEN", default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Difficulty used when a mine request does not name one
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Cancel a nonce search after this many seconds
    #[arg(long, default_value_t = DEFAULT_MINE_TIMEOUT_SECS)]
    mine_timeout_secs: u64,

    /// Allow several clients to share a name
    #[arg(long)]
    allow_duplicate_names: bool,

    /// Refuse to mine when no transactions are pending
    #[arg(long)]
    refuse_empty_blocks: bool,

    /// Skip transaction signature checks during validation
    #[arg(long)]
    skip_signature_check: bool,

    /// Comma separated list of allowed origins, or "*"
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    cors_origins: String,
}

impl Args {
    fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            default_difficulty: self.difficulty,
            unique_names: !self.allow_duplicate_names,
            allow_empty_blocks: !self.refuse_empty_blocks,
            verify_signatures: !self.skip_signature_check,
            ..LedgerConfig::default()
        }
    }

    fn cors(&self) -> anyhow::Result<CorsLayer> {
        let origin = if self.cors_origins.trim() == "*" {
            AllowOrigin::any()
        } else {
            let origins = self
                .cors_origins
                .split(',')
                .map(|o| o.trim().parse::<HeaderValue>())
                .collect::<Result<Vec<_>, _>>()?;
            AllowOrigin::list(origins)
        };
        Ok(CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = args.ledger_config();
    ledger_core::pow::check_difficulty(config.default_difficulty, config.max_difficulty)?;

    let state = AppState {
        ledger: Arc::new(Ledger::new(config)),
        mine_timeout: Duration::from_secs(args.mine_timeout_secs),
    };

    let app = routes::router(state)
        .layer(args.cors()?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
