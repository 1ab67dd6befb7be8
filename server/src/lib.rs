//! # Train of Enlightenment — backend
//!
//! Daily fun-fact service. A scheduled trigger hits `/api/sendDailyFact`,
//! which generates one fact per subscriber category through an
//! OpenRouter-compatible completion endpoint and pushes it to that
//! category's tokens. Everything else is thin reads and writes over the
//! document store.
//!
//! # Endpoints
//!
//! | Route                     | Method | Purpose                                |
//! |---------------------------|--------|----------------------------------------|
//! | `/api/getFacts`           | GET    | Paginated fact archive                 |
//! | `/api/getLatestFact`      | GET    | Newest fact                            |
//! | `/api/getFavorites`       | GET    | Paginated favorites for a token        |
//! | `/api/getSharedFavorites` | GET    | All favorites for a shared user id     |
//! | `/api/saveFavorite`       | POST   | Upsert a favorite                      |
//! | `/api/removeFavorite`     | POST   | Delete a favorite                      |
//! | `/api/saveToken`          | POST   | Upsert a push token + category         |
//! | `/api/sendDailyFact`      | POST   | Run the daily broadcast job            |
//!
//! Mutations reject non-POST with 405. Missing required fields are 400 with
//! an `{error}` body; anything downstream failing is a generic 500, detail
//! goes to the log only.
//!
//! # Setup
//!
//! Needs a Redis instance (`REDIS_URL`) and two secrets under
//! `/run/secrets/`: `OPENROUTER_API_KEY` and `PUSH_API_KEY`.
//!
//! ```sh
//! RUST_LOG=info cargo run -p server
//! ```
//!
//! One-off broadcast run without the server:
//!
//! ```sh
//! cargo run -p broadcast -- --push-endpoint http://localhost:8200/send
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod utils;

use routes::{
    get_facts, get_favorites, get_latest_fact, get_shared_favorites, remove_favorite,
    save_favorite, save_token, send_daily_fact,
};
use state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/getFacts", get(get_facts))
        .route("/api/getLatestFact", get(get_latest_fact))
        .route("/api/getFavorites", get(get_favorites))
        .route("/api/getSharedFavorites", get(get_shared_favorites))
        .route("/api/saveFavorite", post(save_favorite))
        .route("/api/removeFavorite", post(remove_favorite))
        .route("/api/saveToken", post(save_token))
        .route("/api/sendDailyFact", post(send_daily_fact))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");
    let app = app(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
