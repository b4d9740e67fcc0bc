pub mod backend;
pub mod config;
pub mod http;

use backend::state::AppState;
use config::ServerConfig;

/// Monta a aplicação completa (rotas, CORS e tracing) para o estado dado.
pub fn app(state: AppState, server: &ServerConfig) -> anyhow::Result<axum::Router> {
    let cors = http::cors_layer(&server.cors_origins)?;
    Ok(http::router(state, cors))
}
