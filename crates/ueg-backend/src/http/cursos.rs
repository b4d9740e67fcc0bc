use super::bloqueante;
use super::error::ApiError;
use crate::backend::model::{Curso, CursoPayload};
use crate::backend::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::error;

pub(super) fn rotas() -> Router<AppState> {
    Router::new()
        .route("/cursos", get(listar).post(salvar))
        .route("/cursos/cadastrar-inicial", post(cadastrar_iniciais))
        .route("/cursos/:id", get(consultar).put(editar).delete(excluir))
}

async fn listar(State(state): State<AppState>) -> Result<Json<Vec<Curso>>, ApiError> {
    let cursos = bloqueante(move || state.cursos.listar()).await?;
    Ok(Json(cursos))
}

async fn salvar(
    State(state): State<AppState>,
    payload: Result<Json<CursoPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Curso>), ApiError> {
    let Json(payload) = payload?;
    let curso = bloqueante(move || state.cursos.salvar(payload)).await?;
    Ok((StatusCode::CREATED, Json(curso)))
}

/// Responde em texto puro, inclusive na falha.
async fn cadastrar_iniciais(State(state): State<AppState>) -> (StatusCode, String) {
    match bloqueante(move || state.cursos.cadastrar_iniciais()).await {
        Ok(mensagem) => (StatusCode::OK, mensagem),
        Err(err) => {
            error!(?err, "falha ao cadastrar cursos iniciais");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Erro ao cadastrar cursos: {}", err.mensagem()),
            )
        }
    }
}

async fn consultar(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Curso>, ApiError> {
    let Path(id) = id?;
    let curso = bloqueante(move || state.cursos.consultar(id)).await?;
    Ok(Json(curso))
}

async fn editar(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CursoPayload>, JsonRejection>,
) -> Result<Json<Curso>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let curso = bloqueante(move || state.cursos.editar(id, payload)).await?;
    Ok(Json(curso))
}

async fn excluir(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    bloqueante(move || state.cursos.excluir(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
