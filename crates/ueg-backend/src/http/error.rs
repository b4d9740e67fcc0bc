use crate::backend::error::ServiceError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
struct ErroBody {
    erro: String,
}

/// Resposta de erro da API: status HTTP e corpo `{"erro": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    mensagem: String,
}

impl ApiError {
    pub fn new(status: StatusCode, mensagem: impl Into<String>) -> Self {
        Self {
            status,
            mensagem: mensagem.into(),
        }
    }

    pub fn interno(err: anyhow::Error) -> Self {
        error!(erro = %format!("{err:#}"), "falha interna");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn mensagem(&self) -> &str {
        &self.mensagem
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match err {
            ServiceError::Repositorio(err) => return Self::interno(err),
            ServiceError::NaoEncontrado(_) => StatusCode::NOT_FOUND,
            ServiceError::Invalido(_) | ServiceError::CursoNaoEncontrado { .. } => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Conflito(_) => StatusCode::CONFLICT,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErroBody { erro: self.mensagem })).into_response()
    }
}
