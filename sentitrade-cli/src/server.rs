use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, AppState};

pub struct ApiServer {
    bot: AppState,
}

impl ApiServer {
    pub fn new(bot: AppState) -> Self {
        Self { bot }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/status", get(handlers::status))
            .route("/api/start", post(handlers::start))
            .route("/api/stop", post(handlers::stop))
            .route("/api/sentiment", get(handlers::sentiment))
            .route("/api/portfolio", get(handlers::portfolio))
            .route("/api/cycle", post(handlers::cycle))
            .route("/api/backtest", post(handlers::backtest))
            .route("/api/price/:symbol", get(handlers::price))
            .route("/api/trade", post(handlers::trade))
            .route("/api/options", post(handlers::option_order))
            .route("/api/options/:symbol", get(handlers::options))
            .route("/api/trades", get(handlers::trades))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.bot.clone())
    }

    /// Bind and serve until the listener fails.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("HTTP API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
