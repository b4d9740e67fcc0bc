use super::bloqueante;
use super::error::ApiError;
use crate::backend::model::{Aluno, AlunoPayload};
use crate::backend::state::AppState;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

/// `/caluno/aluno` é o caminho usado pelos clientes antigos.
const PREFIXOS: [&str; 2] = ["/alunos", "/caluno/aluno"];

pub(super) fn rotas() -> Router<AppState> {
    PREFIXOS.iter().fold(Router::new(), |router, prefixo| {
        router
            .route(prefixo, get(listar).post(salvar))
            .route(
                &format!("{prefixo}/:id"),
                get(consultar).put(editar).delete(excluir),
            )
    })
}

async fn listar(State(state): State<AppState>) -> Result<Json<Vec<Aluno>>, ApiError> {
    let alunos = bloqueante(move || state.alunos.listar()).await?;
    Ok(Json(alunos))
}

async fn salvar(
    State(state): State<AppState>,
    payload: Result<Json<AlunoPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Aluno>), ApiError> {
    let Json(payload) = payload?;
    let aluno = bloqueante(move || state.alunos.salvar(payload)).await?;
    Ok((StatusCode::CREATED, Json(aluno)))
}

async fn consultar(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Aluno>, ApiError> {
    let Path(id) = id?;
    let aluno = bloqueante(move || state.alunos.consultar(id)).await?;
    Ok(Json(aluno))
}

async fn editar(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AlunoPayload>, JsonRejection>,
) -> Result<Json<Aluno>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let aluno = bloqueante(move || state.alunos.editar(id, payload)).await?;
    Ok(Json(aluno))
}

async fn excluir(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    bloqueante(move || state.alunos.excluir(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
