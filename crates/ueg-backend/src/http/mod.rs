//! Camada HTTP: rotas axum sobre os serviços do backend.

mod alunos;
mod cursos;
pub mod error;
mod turmas;

use crate::backend::error::ServiceResult;
use crate::backend::state::AppState;
use anyhow::Context;
use axum::http::{HeaderValue, Method};
use axum::Router;
use error::ApiError;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .merge(cursos::rotas())
        .merge(turmas::rotas())
        .merge(alunos::rotas())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `"*"` (ou lista vazia) libera qualquer origem.
pub fn cors_layer(origens: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origens.is_empty() || origens.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let valores = origens
            .iter()
            .map(|origem| {
                HeaderValue::from_str(origem)
                    .with_context(|| format!("Origem CORS inválida: '{origem}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        AllowOrigin::list(valores)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any))
}

/// Executa uma operação de serviço (síncrona) no pool de threads bloqueantes.
async fn bloqueante<T, F>(operacao: F) -> Result<T, ApiError>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(operacao)
        .await
        .context("tarefa do serviço interrompida")
        .map_err(ApiError::interno)?
        .map_err(ApiError::from)
}
