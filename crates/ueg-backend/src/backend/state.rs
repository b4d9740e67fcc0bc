use super::alunos::AlunoService;
use super::cursos::CursoService;
use super::repository::{EscolaRepository, InMemoryRepository};
use super::sqlite::SqliteRepository;
use super::turmas::TurmaService;
use crate::config::{DatabaseConfig, StorageBackend};
use std::sync::Arc;
use tracing::info;

/// Estado compartilhado entre os handlers: os serviços sobre um único repositório.
#[derive(Clone)]
pub struct AppState {
    pub cursos: CursoService,
    pub turmas: TurmaService,
    pub alunos: AlunoService,
}

impl AppState {
    pub fn new(repo: Arc<dyn EscolaRepository>) -> Self {
        let cursos = CursoService::new(repo.clone());
        Self {
            turmas: TurmaService::new(repo.clone(), cursos.clone()),
            alunos: AlunoService::new(repo, cursos.clone()),
            cursos,
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let repo: Arc<dyn EscolaRepository> = match config.backend {
            StorageBackend::Sqlite => {
                info!(path = %config.path.display(), "usando banco SQLite");
                Arc::new(SqliteRepository::open(&config.path)?)
            }
            StorageBackend::Memory => {
                info!("usando repositório em memória; os dados não serão persistidos");
                Arc::new(InMemoryRepository::new())
            }
        };
        Ok(Self::new(repo))
    }
}
