use super::error::{ServiceError, ServiceResult};
use super::model::{Curso, CursoPayload, CursoRef, ExclusaoCurso, NovoCurso};
use super::repository::EscolaRepository;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Catálogo cadastrado por `POST /cursos/cadastrar-inicial` (nome, carga horária).
pub const CURSOS_INICIAIS: [(&str, u32); 5] = [
    ("Manutenção de Computadores e Celulares", 120),
    ("Excel Avançado", 90),
    ("Marketing Digital", 110),
    ("Introdução à IA", 80),
    ("Informática Básica", 60),
];

#[derive(Clone)]
pub struct CursoService {
    repo: Arc<dyn EscolaRepository>,
}

impl CursoService {
    pub fn new(repo: Arc<dyn EscolaRepository>) -> Self {
        Self { repo }
    }

    pub fn listar(&self) -> ServiceResult<Vec<Curso>> {
        Ok(self.repo.list_cursos()?)
    }

    pub fn salvar(&self, payload: CursoPayload) -> ServiceResult<Curso> {
        let nome = nome_obrigatorio(payload.nome)?;
        let curso = self.repo.insert_curso(NovoCurso {
            nome,
            carga_horaria: payload.carga_horaria.unwrap_or(0),
        })?;
        info!(id = curso.id, nome = %curso.nome, "curso cadastrado");
        Ok(curso)
    }

    pub fn consultar(&self, id: i64) -> ServiceResult<Curso> {
        self.repo
            .get_curso(id)?
            .ok_or_else(|| ServiceError::NaoEncontrado("Curso não encontrado".to_string()))
    }

    /// Campos presentes no payload sobrescrevem os atuais.
    pub fn editar(&self, id: i64, payload: CursoPayload) -> ServiceResult<Curso> {
        let mut curso = self.repo.get_curso(id)?.ok_or_else(|| {
            ServiceError::NaoEncontrado("Curso não encontrado para atualização".to_string())
        })?;
        if payload.nome.is_some() {
            curso.nome = nome_obrigatorio(payload.nome)?;
        }
        if let Some(carga) = payload.carga_horaria {
            curso.carga_horaria = carga;
        }
        self.repo.update_curso(&curso)?;
        info!(id, "curso atualizado");
        Ok(curso)
    }

    /// Recusa a exclusão enquanto houver turmas ou alunos vinculados.
    pub fn excluir(&self, id: i64) -> ServiceResult<()> {
        match self.repo.delete_curso_if_unused(id)? {
            ExclusaoCurso::Excluido => {
                info!(id, "curso excluído");
                Ok(())
            }
            ExclusaoCurso::NaoEncontrado => Err(ServiceError::NaoEncontrado(
                "Curso não encontrado para exclusão".to_string(),
            )),
            ExclusaoCurso::EmUso(uso) => Err(ServiceError::Conflito(format!(
                "Curso em uso por {} turma(s) e {} aluno(s)",
                uso.turmas, uso.alunos
            ))),
        }
    }

    /// Cadastra o catálogo inicial se ainda não houver nenhum curso.
    pub fn cadastrar_iniciais(&self) -> ServiceResult<String> {
        let existentes = self.repo.list_cursos()?;
        if !existentes.is_empty() {
            return Ok(format!("Cursos já cadastrados. Total: {}", existentes.len()));
        }

        for (nome, carga_horaria) in CURSOS_INICIAIS {
            self.repo.insert_curso(NovoCurso {
                nome: nome.to_string(),
                carga_horaria,
            })?;
        }
        info!(total = CURSOS_INICIAIS.len(), "catálogo inicial de cursos cadastrado");
        Ok(format!(
            "{} cursos cadastrados com sucesso!",
            CURSOS_INICIAIS.len()
        ))
    }

    /// Resolve referências enviadas pelo cliente em cursos completos.
    ///
    /// Com `id`: busca pelo id e ignora se não existir. Sem `id` mas com
    /// `nome`: busca exata pelo nome aparado, depois sem distinção de caixa;
    /// se nada bater, falha listando os cursos disponíveis. Referências sem
    /// id nem nome são ignoradas.
    pub fn resolver(&self, refs: &[CursoRef]) -> ServiceResult<Vec<Curso>> {
        let mut cursos = Vec::with_capacity(refs.len());

        for referencia in refs {
            if let Some(id) = referencia.id {
                match self.repo.get_curso(id)? {
                    Some(curso) => cursos.push(curso),
                    None => debug!(id, "curso referenciado por id não existe; ignorado"),
                }
                continue;
            }

            let Some(nome) = referencia
                .nome
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
            else {
                continue;
            };

            let encontrado = match self.repo.find_curso_by_nome(nome)? {
                Some(curso) => Some(curso),
                None => self.repo.find_curso_by_nome_ignore_case(nome)?,
            };

            match encontrado {
                Some(curso) => cursos.push(curso),
                None => {
                    let disponiveis = self
                        .repo
                        .list_cursos()?
                        .into_iter()
                        .map(|c| c.nome)
                        .collect::<Vec<_>>()
                        .join(", ");
                    warn!(nome, "curso não encontrado ao resolver referência");
                    return Err(ServiceError::CursoNaoEncontrado {
                        nome: nome.to_string(),
                        disponiveis,
                    });
                }
            }
        }

        Ok(cursos)
    }
}

fn nome_obrigatorio(nome: Option<String>) -> ServiceResult<String> {
    match nome {
        Some(nome) if !nome.trim().is_empty() => Ok(nome),
        _ => Err(ServiceError::Invalido(
            "Nome do curso é obrigatório".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::model::TurmaDados;
    use crate::backend::repository::InMemoryRepository;

    fn service() -> (Arc<InMemoryRepository>, CursoService) {
        let repo = Arc::new(InMemoryRepository::new());
        let service = CursoService::new(repo.clone());
        (repo, service)
    }

    fn payload(nome: &str, carga: u32) -> CursoPayload {
        CursoPayload {
            nome: Some(nome.to_string()),
            carga_horaria: Some(carga),
        }
    }

    #[test]
    fn test_cadastrar_iniciais_e_idempotente() {
        let (_, service) = service();
        assert_eq!(
            service.cadastrar_iniciais().unwrap(),
            "5 cursos cadastrados com sucesso!"
        );
        assert_eq!(
            service.cadastrar_iniciais().unwrap(),
            "Cursos já cadastrados. Total: 5"
        );

        let cursos = service.listar().unwrap();
        assert_eq!(cursos[0].nome, "Manutenção de Computadores e Celulares");
        assert_eq!(cursos[0].carga_horaria, 120);
        assert_eq!(cursos[4].nome, "Informática Básica");
    }

    #[test]
    fn test_salvar_exige_nome() {
        let (_, service) = service();
        let err = service
            .salvar(CursoPayload {
                nome: Some("   ".to_string()),
                carga_horaria: Some(10),
            })
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalido(_)));

        let curso = service
            .salvar(CursoPayload {
                nome: Some("Robótica".to_string()),
                carga_horaria: None,
            })
            .unwrap();
        assert_eq!(curso.carga_horaria, 0);
    }

    #[test]
    fn test_editar_mescla_campos() {
        let (_, service) = service();
        let curso = service.salvar(payload("Excel", 40)).unwrap();

        let editado = service
            .editar(
                curso.id,
                CursoPayload {
                    nome: None,
                    carga_horaria: Some(90),
                },
            )
            .unwrap();
        assert_eq!(editado.nome, "Excel");
        assert_eq!(editado.carga_horaria, 90);
        assert_eq!(service.consultar(curso.id).unwrap(), editado);

        let err = service.editar(999, payload("X", 1)).unwrap_err();
        assert!(matches!(err, ServiceError::NaoEncontrado(_)));
    }

    #[test]
    fn test_excluir_curso_em_uso() {
        let (repo, service) = service();
        let curso = service.salvar(payload("Excel", 40)).unwrap();
        let turma = repo
            .insert_turma(TurmaDados {
                curso_ids: vec![curso.id],
                ..Default::default()
            })
            .unwrap();

        let err = service.excluir(curso.id).unwrap_err();
        assert_eq!(err.to_string(), "Curso em uso por 1 turma(s) e 0 aluno(s)");
        assert!(service.consultar(curso.id).is_ok());

        repo.delete_turma(turma.id).unwrap();
        service.excluir(curso.id).unwrap();
        assert!(matches!(
            service.consultar(curso.id),
            Err(ServiceError::NaoEncontrado(_))
        ));
        assert!(matches!(
            service.excluir(curso.id),
            Err(ServiceError::NaoEncontrado(_))
        ));
    }

    #[test]
    fn test_resolver_por_id_e_por_nome() {
        let (_, service) = service();
        service.cadastrar_iniciais().unwrap();

        let cursos = service
            .resolver(&[
                CursoRef::por_id(2),
                CursoRef::por_id(404),
                CursoRef::por_nome("  Marketing Digital "),
                CursoRef::por_nome("introdução à ia"),
                CursoRef::default(),
                CursoRef::por_nome("   "),
            ])
            .unwrap();

        let nomes: Vec<&str> = cursos.iter().map(|c| c.nome.as_str()).collect();
        assert_eq!(nomes, ["Excel Avançado", "Marketing Digital", "Introdução à IA"]);
    }

    #[test]
    fn test_resolver_id_tem_precedencia_sobre_nome() {
        let (_, service) = service();
        service.cadastrar_iniciais().unwrap();

        let referencia = CursoRef {
            id: Some(999),
            nome: Some("Excel Avançado".to_string()),
        };
        assert!(service.resolver(&[referencia]).unwrap().is_empty());
    }

    #[test]
    fn test_resolver_nome_desconhecido_lista_disponiveis() {
        let (_, service) = service();
        service.salvar(payload("Excel Avançado", 90)).unwrap();
        service.salvar(payload("Marketing Digital", 110)).unwrap();

        let err = service
            .resolver(&[CursoRef::por_nome(" Culinária ")])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Curso não encontrado: 'Culinária'. Cursos disponíveis no banco: \
             Excel Avançado, Marketing Digital"
        );
    }
}
