use thiserror::Error;

/// Erros das regras de negócio. Falhas de infraestrutura chegam como
/// `Repositorio` e viram HTTP 500 na camada web.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NaoEncontrado(String),

    #[error("{0}")]
    Invalido(String),

    #[error("Curso não encontrado: '{nome}'. Cursos disponíveis no banco: {disponiveis}")]
    CursoNaoEncontrado { nome: String, disponiveis: String },

    #[error("{0}")]
    Conflito(String),

    #[error(transparent)]
    Repositorio(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
