use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_default;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes::{self, ServerState};
use service::{
    bookings::{BookingRules, BookingStore},
    file::bookings::BookingFileStore,
    runtime,
};

/// Initialize logging via shared common utils
fn init_logging() {
    init_logging_default();
}

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Resolve the bind address: env vars win over config, with fallbacks.
fn load_bind_addr(cfg: &configs::AppConfig) -> anyhow::Result<SocketAddr> {
    let host = env::var("SERVER_HOST").unwrap_or_else(|_| cfg.server.host.clone());
    let port = env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(cfg.server.port);
    Ok(format!("{}:{}", host, port).parse()?)
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging();

    let cfg = configs::AppConfig::load_and_validate().unwrap_or_else(|e| {
        info!(reason = %e, "config not loaded, using defaults");
        configs::AppConfig::default()
    });

    runtime::ensure_env(&cfg.storage.data_dir).await?;

    let rules = BookingRules {
        unique_food_names: cfg.bookings.unique_food_names,
        delivered_flag: cfg.bookings.delivered_flag,
    };
    let bookings: Arc<dyn BookingStore> =
        BookingFileStore::new(&cfg.storage.bookings_file, rules).await?;
    let state = ServerState { bookings };

    // Build router
    let cors = build_cors();
    let app: Router = routes::build_router(state, cors);

    // Bind and serve
    let addr = load_bind_addr(&cfg)?;
    info!(%addr, "starting booking server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
