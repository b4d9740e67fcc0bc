use super::cursos::CursoService;
use super::error::{ServiceError, ServiceResult};
use super::model::{Aluno, AlunoDados, AlunoPayload, AlunoRecord, TurmaRef, TurmaResumo};
use super::repository::EscolaRepository;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AlunoService {
    repo: Arc<dyn EscolaRepository>,
    cursos: CursoService,
}

impl AlunoService {
    pub fn new(repo: Arc<dyn EscolaRepository>, cursos: CursoService) -> Self {
        Self { repo, cursos }
    }

    pub fn listar(&self) -> ServiceResult<Vec<Aluno>> {
        self.repo
            .list_alunos()?
            .into_iter()
            .map(|record| self.montar(record))
            .collect()
    }

    pub fn consultar(&self, codigo: i64) -> ServiceResult<Aluno> {
        validar_codigo(codigo)?;
        let record = self.repo.get_aluno(codigo)?.ok_or_else(|| {
            ServiceError::NaoEncontrado(format!("Aluno não encontrado com ID: {codigo}"))
        })?;
        self.montar(record)
    }

    pub fn salvar(&self, payload: AlunoPayload) -> ServiceResult<Aluno> {
        let nome = nome_obrigatorio(payload.nome)?;
        let turma_id = self.turma_existente(payload.turma)?;
        let curso_ids = match payload.cursos {
            Some(refs) => self.cursos.resolver(&refs)?.iter().map(|c| c.id).collect(),
            None => Vec::new(),
        };

        let record = self.repo.insert_aluno(AlunoDados {
            nome,
            turma_id,
            curso_ids,
            data_matricula: payload.data_matricula,
            mensalidade: payload.mensalidade,
            semestre: payload.semestre,
            bolsista: payload.bolsista,
        })?;
        info!(codigo = record.codigo, "aluno cadastrado");
        self.montar(record)
    }

    /// Campos presentes sobrescrevem os atuais. A turma só muda se o id
    /// enviado existir; os cursos só mudam com uma lista não vazia.
    pub fn editar(&self, codigo: i64, payload: AlunoPayload) -> ServiceResult<Aluno> {
        validar_codigo(codigo)?;
        let mut record = self.repo.get_aluno(codigo)?.ok_or_else(|| {
            ServiceError::NaoEncontrado(format!("Aluno não encontrado com ID: {codigo}"))
        })?;
        let dados = &mut record.dados;

        if let Some(nome) = payload.nome {
            dados.nome = nome;
        }
        if let Some(data) = payload.data_matricula {
            dados.data_matricula = Some(data);
        }
        if let Some(mensalidade) = payload.mensalidade {
            dados.mensalidade = Some(mensalidade);
        }
        if let Some(semestre) = payload.semestre {
            dados.semestre = Some(semestre);
        }
        if let Some(bolsista) = payload.bolsista {
            dados.bolsista = Some(bolsista);
        }
        if let Some(turma_id) = self.turma_existente(payload.turma)? {
            dados.turma_id = Some(turma_id);
        }
        if let Some(refs) = payload.cursos.filter(|refs| !refs.is_empty()) {
            dados.curso_ids = self.cursos.resolver(&refs)?.iter().map(|c| c.id).collect();
        }
        dados.nome = nome_obrigatorio(Some(std::mem::take(&mut dados.nome)))?;

        self.repo.update_aluno(&record)?;
        info!(codigo, "aluno atualizado");
        self.montar(record)
    }

    pub fn excluir(&self, codigo: i64) -> ServiceResult<()> {
        validar_codigo(codigo)?;
        if !self.repo.delete_aluno(codigo)? {
            return Err(ServiceError::NaoEncontrado(format!(
                "Aluno não encontrado para exclusão com ID: {codigo}"
            )));
        }
        info!(codigo, "aluno excluído");
        Ok(())
    }

    /// Id da turma referenciada, se existir.
    fn turma_existente(&self, turma: Option<TurmaRef>) -> ServiceResult<Option<i64>> {
        let Some(id) = turma.and_then(|t| t.id) else {
            return Ok(None);
        };
        if self.repo.get_turma(id)?.is_some() {
            Ok(Some(id))
        } else {
            debug!(id, "turma referenciada pelo aluno não existe; ignorada");
            Ok(None)
        }
    }

    fn montar(&self, record: AlunoRecord) -> ServiceResult<Aluno> {
        let turma = match record.dados.turma_id {
            Some(id) => self.repo.get_turma(id)?.as_ref().map(TurmaResumo::from),
            None => None,
        };
        let mut cursos = Vec::with_capacity(record.dados.curso_ids.len());
        for id in &record.dados.curso_ids {
            if let Some(curso) = self.repo.get_curso(*id)? {
                cursos.push(curso);
            }
        }
        let dados = record.dados;
        Ok(Aluno {
            codigo: record.codigo,
            nome: dados.nome,
            turma,
            cursos,
            data_matricula: dados.data_matricula,
            mensalidade: dados.mensalidade,
            semestre: dados.semestre,
            bolsista: dados.bolsista,
        })
    }
}

fn validar_codigo(codigo: i64) -> ServiceResult<()> {
    if codigo <= 0 {
        return Err(ServiceError::Invalido("ID do aluno inválido".to_string()));
    }
    Ok(())
}

fn nome_obrigatorio(nome: Option<String>) -> ServiceResult<String> {
    match nome {
        Some(nome) if !nome.trim().is_empty() => Ok(nome),
        _ => Err(ServiceError::Invalido(
            "Nome do aluno é obrigatório".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::model::{CursoRef, TurmaDados};
    use crate::backend::repository::InMemoryRepository;
    use chrono::NaiveDate;

    fn service() -> (Arc<InMemoryRepository>, AlunoService) {
        let repo = Arc::new(InMemoryRepository::new());
        let cursos = CursoService::new(repo.clone());
        cursos.cadastrar_iniciais().unwrap();
        (repo.clone(), AlunoService::new(repo, cursos))
    }

    fn nomeado(nome: &str) -> AlunoPayload {
        AlunoPayload {
            nome: Some(nome.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_salvar_completo() {
        let (repo, service) = service();
        let turma = repo
            .insert_turma(TurmaDados {
                turno: Some("Noturno".to_string()),
                ..Default::default()
            })
            .unwrap();

        let aluno = service
            .salvar(AlunoPayload {
                nome: Some("Daniela".to_string()),
                turma: Some(TurmaRef { id: Some(turma.id) }),
                cursos: Some(vec![CursoRef::por_nome("informática básica")]),
                data_matricula: NaiveDate::from_ymd_opt(2025, 2, 10),
                mensalidade: Some(250.0),
                semestre: Some(1),
                bolsista: Some(false),
            })
            .unwrap();

        assert_eq!(aluno.codigo, 1);
        assert_eq!(aluno.turma.as_ref().map(|t| t.id), Some(turma.id));
        assert_eq!(aluno.cursos[0].nome, "Informática Básica");
        assert_eq!(service.consultar(aluno.codigo).unwrap(), aluno);
    }

    #[test]
    fn test_salvar_exige_nome_e_ignora_turma_inexistente() {
        let (_, service) = service();
        let err = service.salvar(AlunoPayload::default()).unwrap_err();
        assert_eq!(err.to_string(), "Nome do aluno é obrigatório");

        let aluno = service
            .salvar(AlunoPayload {
                turma: Some(TurmaRef { id: Some(50) }),
                ..nomeado("Eduardo")
            })
            .unwrap();
        assert!(aluno.turma.is_none());
        assert!(aluno.cursos.is_empty());
    }

    #[test]
    fn test_editar_mescla_campos_presentes() {
        let (_, service) = service();
        let aluno = service
            .salvar(AlunoPayload {
                mensalidade: Some(100.0),
                semestre: Some(1),
                cursos: Some(vec![CursoRef::por_id(1)]),
                ..nomeado("Fernanda")
            })
            .unwrap();

        let editado = service
            .editar(
                aluno.codigo,
                AlunoPayload {
                    semestre: Some(2),
                    bolsista: Some(true),
                    cursos: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(editado.nome, "Fernanda");
        assert_eq!(editado.mensalidade, Some(100.0));
        assert_eq!(editado.semestre, Some(2));
        assert_eq!(editado.bolsista, Some(true));
        // lista vazia não apaga os cursos
        assert_eq!(editado.cursos.len(), 1);

        let editado = service
            .editar(
                aluno.codigo,
                AlunoPayload {
                    cursos: Some(vec![CursoRef::por_id(2), CursoRef::por_id(3)]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(editado.cursos.len(), 2);

        let err = service.editar(aluno.codigo, nomeado("  ")).unwrap_err();
        assert!(matches!(err, ServiceError::Invalido(_)));
    }

    #[test]
    fn test_codigo_invalido_e_inexistente() {
        let (_, service) = service();
        assert_eq!(
            service.consultar(0).unwrap_err().to_string(),
            "ID do aluno inválido"
        );
        assert!(matches!(service.excluir(-3), Err(ServiceError::Invalido(_))));
        assert!(matches!(
            service.consultar(8),
            Err(ServiceError::NaoEncontrado(_))
        ));
        assert!(matches!(
            service.editar(8, nomeado("X")),
            Err(ServiceError::NaoEncontrado(_))
        ));
        assert!(matches!(service.excluir(8), Err(ServiceError::NaoEncontrado(_))));
    }

    #[test]
    fn test_excluir() {
        let (_, service) = service();
        let aluno = service.salvar(nomeado("Gabriel")).unwrap();
        service.excluir(aluno.codigo).unwrap();
        assert!(service.listar().unwrap().is_empty());
    }
}
