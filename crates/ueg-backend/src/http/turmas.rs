use super::bloqueante;
use super::error::ApiError;
use crate::backend::model::{Turma, TurmaPayload};
use crate::backend::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

pub(super) fn rotas() -> Router<AppState> {
    Router::new()
        .route("/turmas", get(listar).post(salvar))
        .route("/turmas/:id", get(consultar).put(editar).delete(excluir))
        .route(
            "/turmas/:id/cursos/:id_curso",
            post(adicionar_curso).delete(remover_curso),
        )
}

async fn listar(State(state): State<AppState>) -> Result<Json<Vec<Turma>>, ApiError> {
    let turmas = bloqueante(move || state.turmas.listar()).await?;
    Ok(Json(turmas))
}

async fn salvar(
    State(state): State<AppState>,
    payload: Result<Json<TurmaPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Turma>), ApiError> {
    let Json(payload) = payload?;
    let turma = bloqueante(move || state.turmas.salvar(payload)).await?;
    Ok((StatusCode::CREATED, Json(turma)))
}

async fn consultar(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Turma>, ApiError> {
    let Path(id) = id?;
    let turma = bloqueante(move || state.turmas.consultar(id)).await?;
    Ok(Json(turma))
}

async fn editar(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TurmaPayload>, JsonRejection>,
) -> Result<Json<Turma>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let turma = bloqueante(move || state.turmas.editar(id, payload)).await?;
    Ok(Json(turma))
}

async fn excluir(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    bloqueante(move || state.turmas.excluir(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn adicionar_curso(
    State(state): State<AppState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<Turma>, ApiError> {
    let Path((id_turma, id_curso)) = ids?;
    let turma = bloqueante(move || state.turmas.adicionar_curso(id_turma, id_curso)).await?;
    Ok(Json(turma))
}

async fn remover_curso(
    State(state): State<AppState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Json<Turma>, ApiError> {
    let Path((id_turma, id_curso)) = ids?;
    let turma = bloqueante(move || state.turmas.remover_curso(id_turma, id_curso)).await?;
    Ok(Json(turma))
}
