//! finmemod - finmemo HTTP daemon.
//!
//! Serves `POST /getData` and `POST /chat` over the two-tier cache.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use finmemo::FinmemoError;
use finmemo::server::{AppContext, AppState, Config, Endpoints, PROJECT_NAME, router};

/// finmemo daemon - financial data and chat API.
#[derive(Parser)]
#[command(name = "finmemod")]
#[command(version = finmemo::PKG_VERSION)]
#[command(about = "Financial data and chat API with a memoizing cache")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Volatile tier URL (`memory://` for in-process).
    #[arg(long, env = "REDIS_URL")]
    redis_url: String,

    /// Durable tier URL (`memory://` for in-process).
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// API key for the completion endpoint.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    groq_api_key: Option<String>,

    /// Base URL of the statements service.
    #[arg(long, env = "FINMEMO_STATEMENTS_URL")]
    statements_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    let addr: SocketAddr = config
        .server
        .address
        .parse()
        .map_err(|e| FinmemoError::Configuration(format!("Invalid address: {e}")))?;

    let endpoints = Endpoints {
        redis_url: args.redis_url,
        database_url: args.database_url,
        groq_api_key: args.groq_api_key,
        statements_url: args.statements_url,
    };
    let ctx = Arc::new(AppContext::connect(&config, &endpoints).await?);

    let app = router(AppState {
        ctx: Arc::clone(&ctx),
        request_timeout: config.server.limits.request_timeout(),
    });

    info!(
        version = finmemo::version_string(),
        project = PROJECT_NAME,
        %addr,
        "finmemod starting"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    ctx.close();
    Ok(())
}
